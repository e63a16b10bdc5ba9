//! Metainfo sources accepted by `torrent_add`.
//!
//! Only the handful of keys the engine model needs are read (`name`,
//! `length`, `files`, `announce`, `announce-list`); piece data is not
//! validated. The info-hash is derived from the raw bytes of the `info`
//! dictionary.

use crate::{Result, SeedboxError};
use sha2::{Digest, Sha256};
use std::path::PathBuf;

const MAX_DEPTH: usize = 32;
const HASH_BYTES: usize = 20;

/// Where a new torrent's metainfo comes from.
#[derive(Debug, Clone)]
pub enum MetainfoSource {
    /// Raw `.torrent` bytes (decoded from base64 or fetched over HTTP).
    Bytes(Vec<u8>),
    /// A `magnet:?` link.
    Magnet(String),
    /// A `.torrent` file on the local filesystem.
    File(PathBuf),
}

/// One file inside a torrent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetainfoFile {
    pub path: String,
    pub length: u64,
}

/// The parts of a torrent's metainfo the engine tracks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metainfo {
    pub hash_string: String,
    pub name: String,
    pub files: Vec<MetainfoFile>,
    pub trackers: Vec<String>,
    /// False for magnet links until metadata arrives from peers.
    pub has_metadata: bool,
}

impl Metainfo {
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.length).sum()
    }
}

/// Resolve a source into metainfo.
pub fn load(source: &MetainfoSource) -> Result<Metainfo> {
    match source {
        MetainfoSource::Bytes(bytes) => parse_torrent(bytes),
        MetainfoSource::Magnet(link) => parse_magnet(link),
        MetainfoSource::File(path) => {
            let bytes = std::fs::read(path).map_err(|e| SeedboxError::io_with_path(e, path))?;
            parse_torrent(&bytes)
        }
    }
}

enum Node<'a> {
    Int(i64),
    Bytes(&'a [u8]),
    List(Vec<Node<'a>>),
    Dict(Vec<(&'a [u8], Node<'a>)>),
}

impl<'a> Node<'a> {
    fn get(&self, key: &str) -> Option<&Node<'a>> {
        match self {
            Node::Dict(entries) => entries
                .iter()
                .find(|(k, _)| *k == key.as_bytes())
                .map(|(_, v)| v),
            _ => None,
        }
    }

    fn as_str(&self) -> Option<String> {
        match self {
            Node::Bytes(b) => Some(String::from_utf8_lossy(b).into_owned()),
            _ => None,
        }
    }

    fn as_int(&self) -> Option<i64> {
        match self {
            Node::Int(i) => Some(*i),
            _ => None,
        }
    }

    fn as_list(&self) -> Option<&[Node<'a>]> {
        match self {
            Node::List(items) => Some(items),
            _ => None,
        }
    }
}

struct Decoder<'a> {
    input: &'a [u8],
    pos: usize,
    info_span: Option<(usize, usize)>,
}

impl<'a> Decoder<'a> {
    fn peek(&self) -> Result<u8> {
        self.input
            .get(self.pos)
            .copied()
            .ok_or(SeedboxError::CorruptTorrent)
    }

    fn read_until(&mut self, stop: u8) -> Result<&'a str> {
        let rest = self.input.get(self.pos..).ok_or(SeedboxError::CorruptTorrent)?;
        let len = rest
            .iter()
            .position(|b| *b == stop)
            .ok_or(SeedboxError::CorruptTorrent)?;
        let text = std::str::from_utf8(&rest[..len]).map_err(|_| SeedboxError::CorruptTorrent)?;
        self.pos += len + 1;
        Ok(text)
    }

    fn node(&mut self, depth: usize) -> Result<Node<'a>> {
        if depth > MAX_DEPTH {
            return Err(SeedboxError::CorruptTorrent);
        }
        match self.peek()? {
            b'i' => {
                self.pos += 1;
                let digits = self.read_until(b'e')?;
                digits
                    .parse::<i64>()
                    .map(Node::Int)
                    .map_err(|_| SeedboxError::CorruptTorrent)
            }
            b'l' => {
                self.pos += 1;
                let mut items = Vec::new();
                while self.peek()? != b'e' {
                    items.push(self.node(depth + 1)?);
                }
                self.pos += 1;
                Ok(Node::List(items))
            }
            b'd' => {
                self.pos += 1;
                let mut entries = Vec::new();
                while self.peek()? != b'e' {
                    let key = self.bytes()?;
                    let start = self.pos;
                    let value = self.node(depth + 1)?;
                    if depth == 0 && key == b"info" {
                        self.info_span = Some((start, self.pos));
                    }
                    entries.push((key, value));
                }
                self.pos += 1;
                Ok(Node::Dict(entries))
            }
            b'0'..=b'9' => self.bytes().map(Node::Bytes),
            _ => Err(SeedboxError::CorruptTorrent),
        }
    }

    fn bytes(&mut self) -> Result<&'a [u8]> {
        let len: usize = self
            .read_until(b':')?
            .parse()
            .map_err(|_| SeedboxError::CorruptTorrent)?;
        let end = self.pos.checked_add(len).ok_or(SeedboxError::CorruptTorrent)?;
        let bytes = self
            .input
            .get(self.pos..end)
            .ok_or(SeedboxError::CorruptTorrent)?;
        self.pos = end;
        Ok(bytes)
    }
}

fn hash_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    hex::encode(&digest[..HASH_BYTES])
}

/// A single path segment that stays inside the directory it is joined to.
fn is_safe_component(part: &str) -> bool {
    !part.is_empty()
        && part != "."
        && part != ".."
        && !part.contains(['/', '\\', '\0'])
}

/// Parse `.torrent` bytes.
///
/// Names and path segments that could escape the download directory
/// (empty, `.`, `..`, or containing a separator) are rejected as corrupt.
pub fn parse_torrent(bytes: &[u8]) -> Result<Metainfo> {
    let mut decoder = Decoder {
        input: bytes,
        pos: 0,
        info_span: None,
    };
    let root = decoder.node(0)?;
    if decoder.pos != bytes.len() {
        return Err(SeedboxError::CorruptTorrent);
    }

    let info = root.get("info").ok_or(SeedboxError::CorruptTorrent)?;
    let (start, end) = decoder.info_span.ok_or(SeedboxError::CorruptTorrent)?;
    let name = info
        .get("name")
        .and_then(Node::as_str)
        .filter(|n| is_safe_component(n))
        .ok_or(SeedboxError::CorruptTorrent)?;

    let files = match info.get("files").and_then(Node::as_list) {
        Some(entries) => entries
            .iter()
            .map(|entry| {
                let length = entry.get("length").and_then(Node::as_int).unwrap_or(0);
                let parts = entry
                    .get("path")
                    .and_then(Node::as_list)
                    .filter(|parts| !parts.is_empty())
                    .ok_or(SeedboxError::CorruptTorrent)?
                    .iter()
                    .map(|part| {
                        part.as_str()
                            .filter(|p| is_safe_component(p))
                            .ok_or(SeedboxError::CorruptTorrent)
                    })
                    .collect::<Result<Vec<String>>>()?;
                Ok(MetainfoFile {
                    path: format!("{}/{}", name, parts.join("/")),
                    length: u64::try_from(length).map_err(|_| SeedboxError::CorruptTorrent)?,
                })
            })
            .collect::<Result<Vec<_>>>()?,
        None => {
            let length = info
                .get("length")
                .and_then(Node::as_int)
                .ok_or(SeedboxError::CorruptTorrent)?;
            vec![MetainfoFile {
                path: name.clone(),
                length: u64::try_from(length).map_err(|_| SeedboxError::CorruptTorrent)?,
            }]
        }
    };

    let mut trackers: Vec<String> = Vec::new();
    if let Some(tiers) = root.get("announce-list").and_then(Node::as_list) {
        for tier in tiers {
            for url in tier.as_list().unwrap_or_default().iter().filter_map(Node::as_str) {
                if !trackers.contains(&url) {
                    trackers.push(url);
                }
            }
        }
    }
    if let Some(announce) = root.get("announce").and_then(Node::as_str) {
        if !trackers.contains(&announce) {
            trackers.insert(0, announce);
        }
    }

    Ok(Metainfo {
        hash_string: hash_hex(&bytes[start..end]),
        name,
        files,
        trackers,
        has_metadata: true,
    })
}

/// Parse a `magnet:?xt=urn:btih:<hex>` link.
pub fn parse_magnet(link: &str) -> Result<Metainfo> {
    let url = url::Url::parse(link.trim()).map_err(|_| SeedboxError::CorruptTorrent)?;
    if url.scheme() != "magnet" {
        return Err(SeedboxError::CorruptTorrent);
    }

    let mut hash = None;
    let mut name = None;
    let mut trackers = Vec::new();
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "xt" => {
                if let Some(h) = value.strip_prefix("urn:btih:") {
                    if h.len() == 2 * HASH_BYTES && h.chars().all(|c| c.is_ascii_hexdigit()) {
                        hash = Some(h.to_ascii_lowercase());
                    }
                }
            }
            "dn" => name = Some(value.into_owned()),
            "tr" => trackers.push(value.into_owned()),
            _ => {}
        }
    }

    let hash_string = hash.ok_or(SeedboxError::CorruptTorrent)?;
    Ok(Metainfo {
        name: name.unwrap_or_else(|| hash_string.clone()),
        hash_string,
        files: Vec::new(),
        trackers,
        has_metadata: false,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A single-file torrent named `name` with `length` bytes.
    pub(crate) fn single_file_torrent(name: &str, length: u64) -> Vec<u8> {
        format!(
            "d8:announce18:http://tracker/ann4:infod6:lengthi{}e4:name{}:{}12:piece lengthi16384eee",
            length,
            name.len(),
            name
        )
        .into_bytes()
    }

    #[test]
    fn test_parse_single_file() {
        let meta = parse_torrent(&single_file_torrent("ubuntu.iso", 4096)).unwrap();
        assert_eq!(meta.name, "ubuntu.iso");
        assert_eq!(meta.total_size(), 4096);
        assert_eq!(meta.trackers, vec!["http://tracker/ann".to_string()]);
        assert_eq!(meta.hash_string.len(), 40);
    }

    #[test]
    fn test_parse_multi_file() {
        let bytes = b"d4:infod5:filesld6:lengthi10e4:pathl1:aeed6:lengthi20e4:pathl3:sub1:beee4:name3:diree";
        let meta = parse_torrent(bytes).unwrap();
        assert_eq!(meta.files.len(), 2);
        assert_eq!(meta.files[1].path, "dir/sub/b");
        assert_eq!(meta.total_size(), 30);
    }

    #[test]
    fn test_hash_depends_only_on_info() {
        let a = parse_torrent(b"d8:announce1:x4:infod6:lengthi1e4:name1:nee").unwrap();
        let b = parse_torrent(b"d8:announce1:y4:infod6:lengthi1e4:name1:nee").unwrap();
        assert_eq!(a.hash_string, b.hash_string);
    }

    #[test]
    fn test_corrupt_inputs() {
        assert!(matches!(parse_torrent(b"not bencode"), Err(SeedboxError::CorruptTorrent)));
        assert!(matches!(parse_torrent(b"d4:infod"), Err(SeedboxError::CorruptTorrent)));
        assert!(matches!(parse_torrent(b"de"), Err(SeedboxError::CorruptTorrent)));
    }

    #[test]
    fn test_escaping_names_are_rejected() {
        for name in ["/etc/passwd", "..", ".", "a/../b", "dir\\file"] {
            assert!(
                matches!(
                    parse_torrent(&single_file_torrent(name, 1)),
                    Err(SeedboxError::CorruptTorrent)
                ),
                "{}",
                name
            );
        }
        let empty = b"d4:infod6:lengthi1e4:name0:ee";
        assert!(matches!(parse_torrent(empty), Err(SeedboxError::CorruptTorrent)));
    }

    #[test]
    fn test_escaping_file_paths_are_rejected() {
        let dotdot = b"d4:infod5:filesld6:lengthi1e4:pathl2:..6:victimeee4:name3:diree";
        assert!(matches!(parse_torrent(dotdot), Err(SeedboxError::CorruptTorrent)));

        let absolute = b"d4:infod5:filesld6:lengthi1e4:pathl4:/tmpeee4:name3:diree";
        assert!(matches!(parse_torrent(absolute), Err(SeedboxError::CorruptTorrent)));

        let no_path = b"d4:infod5:filesld6:lengthi1e4:pathleee4:name3:diree";
        assert!(matches!(parse_torrent(no_path), Err(SeedboxError::CorruptTorrent)));
    }

    #[test]
    fn test_parse_magnet() {
        let link = "magnet:?xt=urn:btih:0123456789ABCDEF0123456789ABCDEF01234567&dn=Some+Name&tr=udp%3A%2F%2Ftracker";
        let meta = parse_magnet(link).unwrap();
        assert_eq!(meta.hash_string, "0123456789abcdef0123456789abcdef01234567");
        assert_eq!(meta.name, "Some Name");
        assert_eq!(meta.trackers, vec!["udp://tracker".to_string()]);
        assert!(!meta.has_metadata);
    }

    #[test]
    fn test_magnet_without_hash_is_rejected() {
        assert!(parse_magnet("magnet:?dn=nothing").is_err());
    }
}
