//! Outbound network access.

mod client;

pub use client::{FetchRequest, FetchResponse, Fetcher, HttpFetcher, IpProtocol};
