//! Torrent state tracked by the session.

use crate::metainfo::Metainfo;
use crate::{Result, SeedboxError};
use serde::Serialize;
use std::path::PathBuf;

/// File and bandwidth priority.
pub const PRIORITY_LOW: i64 = -1;
pub const PRIORITY_NORMAL: i64 = 0;
pub const PRIORITY_HIGH: i64 = 1;

pub fn is_priority(value: i64) -> bool {
    (PRIORITY_LOW..=PRIORITY_HIGH).contains(&value)
}

/// What a torrent is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Activity {
    Stopped = 0,
    CheckWait = 1,
    Check = 2,
    DownloadWait = 3,
    Download = 4,
    SeedWait = 5,
    Seed = 6,
}

impl Activity {
    pub fn as_i64(self) -> i64 {
        self as i64
    }

    pub fn is_queued(self) -> bool {
        matches!(self, Activity::DownloadWait | Activity::SeedWait)
    }
}

/// One file inside a torrent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TorrentFile {
    pub name: String,
    pub length: u64,
    pub bytes_completed: u64,
    pub wanted: bool,
    pub priority: i64,
}

/// One announce URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tracker {
    pub id: i64,
    pub announce: String,
    pub tier: i64,
}

/// A torrent known to the session.
#[derive(Debug, Clone)]
pub struct Torrent {
    pub id: i64,
    pub hash_string: String,
    pub name: String,
    pub download_dir: PathBuf,
    pub files: Vec<TorrentFile>,
    pub trackers: Vec<Tracker>,
    next_tracker_id: i64,
    pub labels: Vec<String>,
    pub queue_position: i64,
    pub status: Activity,
    pub has_metadata: bool,
    pub added_date: i64,
    pub activity_date: i64,
    pub done_date: i64,
    pub manual_announce_time: i64,
    pub bandwidth_priority: i64,
    pub peer_limit: i64,
    pub download_limit: i64,
    pub download_limited: bool,
    pub upload_limit: i64,
    pub upload_limited: bool,
    pub honors_session_limits: bool,
    pub seed_ratio_limit: f64,
    pub seed_ratio_mode: i64,
    pub seed_idle_limit: i64,
    pub seed_idle_mode: i64,
    pub uploaded_ever: u64,
    pub downloaded_ever: u64,
    pub error: i64,
    pub error_string: String,
}

impl Torrent {
    pub fn new(id: i64, meta: Metainfo, download_dir: PathBuf, now: i64) -> Self {
        let files = meta
            .files
            .into_iter()
            .map(|f| TorrentFile {
                name: f.path,
                length: f.length,
                bytes_completed: 0,
                wanted: true,
                priority: PRIORITY_NORMAL,
            })
            .collect();
        let mut torrent = Self {
            id,
            hash_string: meta.hash_string,
            name: meta.name,
            download_dir,
            files,
            trackers: Vec::new(),
            next_tracker_id: 0,
            labels: Vec::new(),
            queue_position: 0,
            status: Activity::Stopped,
            has_metadata: meta.has_metadata,
            added_date: now,
            activity_date: now,
            done_date: 0,
            manual_announce_time: 0,
            bandwidth_priority: PRIORITY_NORMAL,
            peer_limit: 50,
            download_limit: 100,
            download_limited: false,
            upload_limit: 100,
            upload_limited: false,
            honors_session_limits: true,
            seed_ratio_limit: 2.0,
            seed_ratio_mode: 0,
            seed_idle_limit: 30,
            seed_idle_mode: 0,
            uploaded_ever: 0,
            downloaded_ever: 0,
            error: 0,
            error_string: String::new(),
        };
        for (tier, url) in meta.trackers.into_iter().enumerate() {
            torrent.push_tracker(url, tier as i64);
        }
        torrent
    }

    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.length).sum()
    }

    pub fn size_when_done(&self) -> u64 {
        self.files.iter().filter(|f| f.wanted).map(|f| f.length).sum()
    }

    pub fn left_until_done(&self) -> u64 {
        self.files
            .iter()
            .filter(|f| f.wanted)
            .map(|f| f.length.saturating_sub(f.bytes_completed))
            .sum()
    }

    pub fn percent_done(&self) -> f64 {
        let wanted = self.size_when_done();
        if wanted == 0 {
            return if self.has_metadata { 1.0 } else { 0.0 };
        }
        (wanted - self.left_until_done()) as f64 / wanted as f64
    }

    pub fn is_finished(&self) -> bool {
        self.has_metadata && self.left_until_done() == 0
    }

    pub fn is_running(&self) -> bool {
        !matches!(self.status, Activity::Stopped)
    }

    pub fn touch(&mut self, now: i64) {
        self.activity_date = now;
    }

    /// Status a running torrent settles into once it leaves any queue.
    pub fn active_status(&self) -> Activity {
        if self.is_finished() {
            Activity::Seed
        } else {
            Activity::Download
        }
    }

    pub fn check_file_index(&self, index: i64) -> Result<usize> {
        usize::try_from(index)
            .ok()
            .filter(|i| *i < self.files.len())
            .ok_or(SeedboxError::FileIndexOutOfRange(index))
    }

    /// Mark files wanted or unwanted. An empty list means every file.
    pub fn set_files_wanted(&mut self, indices: &[i64], wanted: bool) -> Result<()> {
        let targets = self.resolve_file_indices(indices)?;
        for i in targets {
            if let Some(file) = self.files.get_mut(i) {
                file.wanted = wanted;
            }
        }
        Ok(())
    }

    /// Set file priorities. An empty list means every file.
    pub fn set_file_priorities(&mut self, indices: &[i64], priority: i64) -> Result<()> {
        let targets = self.resolve_file_indices(indices)?;
        for i in targets {
            if let Some(file) = self.files.get_mut(i) {
                file.priority = priority;
            }
        }
        Ok(())
    }

    fn resolve_file_indices(&self, indices: &[i64]) -> Result<Vec<usize>> {
        if indices.is_empty() {
            return Ok((0..self.files.len()).collect());
        }
        indices.iter().map(|i| self.check_file_index(*i)).collect()
    }

    /// Replace the label set, rejecting empty, comma-bearing, or duplicate labels.
    pub fn set_labels(&mut self, labels: &[String]) -> std::result::Result<(), &'static str> {
        let mut cleaned: Vec<String> = Vec::with_capacity(labels.len());
        for label in labels {
            let label = label.trim();
            if label.is_empty() {
                return Err("labels cannot be empty");
            }
            if label.contains(',') {
                return Err("labels cannot contain comma (,) character");
            }
            if cleaned.iter().any(|l| l == label) {
                return Err("labels cannot contain duplicates");
            }
            cleaned.push(label.to_string());
        }
        self.labels = cleaned;
        Ok(())
    }

    fn push_tracker(&mut self, announce: String, tier: i64) {
        self.trackers.push(Tracker {
            id: self.next_tracker_id,
            announce,
            tier,
        });
        self.next_tracker_id += 1;
    }

    /// Append announce URLs, each on its own new tier. Known URLs are skipped.
    pub fn add_trackers(&mut self, urls: &[String]) -> Result<()> {
        if !urls.iter().all(|u| is_valid_announce_url(u)) {
            return Err(SeedboxError::InvalidTrackerList);
        }
        let mut tier = self.trackers.iter().map(|t| t.tier + 1).max().unwrap_or(0);
        for url in urls {
            if self.trackers.iter().any(|t| &t.announce == url) {
                continue;
            }
            self.push_tracker(url.clone(), tier);
            tier += 1;
        }
        Ok(())
    }

    /// Remove trackers by id. Unknown ids fail the whole call.
    pub fn remove_trackers(&mut self, ids: &[i64]) -> Result<()> {
        if !ids.iter().all(|id| self.trackers.iter().any(|t| t.id == *id)) {
            return Err(SeedboxError::InvalidTrackerList);
        }
        self.trackers.retain(|t| !ids.contains(&t.id));
        Ok(())
    }

    /// Replace announce URLs given `(tracker id, new url)` pairs.
    pub fn replace_trackers(&mut self, pairs: &[(i64, String)]) -> Result<()> {
        for (id, url) in pairs {
            if !is_valid_announce_url(url) || self.trackers.iter().any(|t| &t.announce == url) {
                return Err(SeedboxError::InvalidTrackerList);
            }
            let tracker = self
                .trackers
                .iter_mut()
                .find(|t| t.id == *id)
                .ok_or(SeedboxError::InvalidTrackerList)?;
            tracker.announce = url.clone();
        }
        Ok(())
    }

    /// Replace the whole announce list from its text form: one URL per
    /// line, blank lines separate tiers.
    pub fn set_tracker_list(&mut self, text: &str) -> Result<()> {
        let mut tiers: Vec<Vec<String>> = vec![Vec::new()];
        for line in text.lines().map(str::trim) {
            if line.is_empty() {
                if tiers.last().is_some_and(|t| !t.is_empty()) {
                    tiers.push(Vec::new());
                }
                continue;
            }
            if !is_valid_announce_url(line) {
                return Err(SeedboxError::AnnounceList);
            }
            if let Some(tier) = tiers.last_mut() {
                tier.push(line.to_string());
            }
        }

        self.trackers.clear();
        for (tier, urls) in tiers.into_iter().filter(|t| !t.is_empty()).enumerate() {
            for url in urls {
                self.push_tracker(url, tier as i64);
            }
        }
        Ok(())
    }

    /// Text form of the announce list, as accepted by [`Torrent::set_tracker_list`].
    pub fn tracker_list(&self) -> String {
        let mut out = String::new();
        let mut current_tier = None;
        for tracker in &self.trackers {
            if current_tier.is_some_and(|t| t != tracker.tier) {
                out.push('\n');
            }
            current_tier = Some(tracker.tier);
            out.push_str(&tracker.announce);
            out.push('\n');
        }
        out
    }
}

fn is_valid_announce_url(text: &str) -> bool {
    url::Url::parse(text)
        .map(|u| matches!(u.scheme(), "http" | "https" | "udp") && u.host_str().is_some())
        .unwrap_or(false)
}
