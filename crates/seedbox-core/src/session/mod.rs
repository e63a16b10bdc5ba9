//! In-memory engine session.
//!
//! The [`Session`] owns every torrent, the queue order, session settings,
//! transfer statistics and the installed blocklist. The daemon keeps it
//! behind one `tokio::sync::Mutex`; nothing in here suspends, so each call
//! runs to completion while the caller holds that lock.

mod torrent;

pub use torrent::{
    is_priority, Activity, Torrent, TorrentFile, Tracker, PRIORITY_HIGH, PRIORITY_LOW,
    PRIORITY_NORMAL,
};

use crate::blocklist::AddressRange;
use crate::config::SessionConfig;
use crate::metainfo::Metainfo;
use crate::network::Fetcher;
use crate::{Result, SeedboxError};
use std::collections::{BTreeMap, HashSet};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

const EVENT_CAPACITY: usize = 64;

/// `relative` under `base`, or `None` when it is empty or would leave `base`.
pub fn contained_path(base: &Path, relative: &str) -> Option<PathBuf> {
    let rel = Path::new(relative);
    let inside = !relative.is_empty()
        && rel
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    inside.then(|| base.join(rel))
}

/// Seconds since the Unix epoch.
pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Notifications published by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    TorrentAdded(i64),
    TorrentStarted(i64),
    TorrentStopped(i64),
    TorrentRemoving(i64),
    TorrentTrashing(i64),
    TorrentMoved(i64),
    TorrentChanged(i64),
    QueuePositionsChanged,
    SessionClose,
}

/// Which torrents an operation targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TorrentSelector {
    All,
    RecentlyActive,
    List(Vec<TorrentRef>),
}

/// One entry of an explicit torrent list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TorrentRef {
    Id(i64),
    Hash(String),
}

/// Runtime-adjustable session settings.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub config_dir: PathBuf,
    pub download_dir: PathBuf,
    pub incomplete_dir: PathBuf,
    pub incomplete_dir_enabled: bool,
    pub peer_port: u16,
    pub peer_limit_global: i64,
    pub peer_limit_per_torrent: i64,
    pub download_queue_enabled: bool,
    pub download_queue_size: i64,
    pub seed_queue_enabled: bool,
    pub seed_queue_size: i64,
    pub speed_limit_down: i64,
    pub speed_limit_down_enabled: bool,
    pub speed_limit_up: i64,
    pub speed_limit_up_enabled: bool,
    pub alt_speed_enabled: bool,
    pub blocklist_enabled: bool,
    pub blocklist_url: String,
    pub start_added_torrents: bool,
    pub rename_partial_files: bool,
    pub idle_seeding_limit: i64,
    pub idle_seeding_limit_enabled: bool,
    pub seed_ratio_limit: f64,
    pub seed_ratio_limited: bool,
    pub dht_enabled: bool,
    pub pex_enabled: bool,
    pub encryption: String,
}

impl SessionSettings {
    pub fn new(config_dir: PathBuf, download_dir: PathBuf) -> Self {
        Self {
            incomplete_dir: download_dir.clone(),
            config_dir,
            download_dir,
            incomplete_dir_enabled: false,
            peer_port: SessionConfig::DEFAULT_PEER_PORT,
            peer_limit_global: SessionConfig::DEFAULT_PEER_LIMIT_GLOBAL,
            peer_limit_per_torrent: SessionConfig::DEFAULT_PEER_LIMIT_PER_TORRENT,
            download_queue_enabled: true,
            download_queue_size: SessionConfig::DEFAULT_DOWNLOAD_QUEUE_SIZE,
            seed_queue_enabled: false,
            seed_queue_size: SessionConfig::DEFAULT_SEED_QUEUE_SIZE,
            speed_limit_down: 100,
            speed_limit_down_enabled: false,
            speed_limit_up: 100,
            speed_limit_up_enabled: false,
            alt_speed_enabled: false,
            blocklist_enabled: false,
            blocklist_url: SessionConfig::DEFAULT_BLOCKLIST_URL.to_string(),
            start_added_torrents: true,
            rename_partial_files: true,
            idle_seeding_limit: 30,
            idle_seeding_limit_enabled: false,
            seed_ratio_limit: 2.0,
            seed_ratio_limited: false,
            dht_enabled: true,
            pex_enabled: true,
            encryption: "preferred".to_string(),
        }
    }
}

/// Transfer counters for one span of time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub uploaded_bytes: u64,
    pub downloaded_bytes: u64,
    pub files_added: u64,
    pub session_count: u64,
    pub seconds_active: i64,
}

/// Options accepted when adding a torrent.
#[derive(Debug, Clone, Default)]
pub struct AddOptions {
    pub download_dir: Option<PathBuf>,
    pub paused: Option<bool>,
    pub peer_limit: Option<i64>,
    pub bandwidth_priority: Option<i64>,
    pub files_wanted: Vec<i64>,
    pub files_unwanted: Vec<i64>,
    pub priority_high: Vec<i64>,
    pub priority_low: Vec<i64>,
    pub priority_normal: Vec<i64>,
    pub labels: Vec<String>,
}

/// Result of [`Session::add_torrent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added(i64),
    Duplicate(i64),
}

impl AddOutcome {
    pub fn id(&self) -> i64 {
        match self {
            AddOutcome::Added(id) | AddOutcome::Duplicate(id) => *id,
        }
    }
}

/// A validated rename of one path inside a torrent.
///
/// Produced under the session lock by [`Session::rename_plan`]; the disk
/// work in [`RenamePlan::execute`] runs without it, and the result is
/// folded back in with [`Session::apply_rename`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenamePlan {
    pub id: i64,
    pub old_path: String,
    pub new_name: String,
    pub source: PathBuf,
    pub target: PathBuf,
}

impl RenamePlan {
    /// Rename on disk. Missing source data is not an error.
    pub fn execute(&self) -> Result<()> {
        match std::fs::rename(&self.source, &self.target) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("rename: {} not on disk yet", self.source.display());
                Ok(())
            }
            Err(e) => Err(SeedboxError::io_with_path(e, &self.source)),
        }
    }

    fn new_path(&self) -> String {
        match self.old_path.rsplit_once('/') {
            Some((parent, _)) => format!("{}/{}", parent, self.new_name),
            None => self.new_name.clone(),
        }
    }
}

/// The engine session.
pub struct Session {
    settings: SessionSettings,
    torrents: BTreeMap<i64, Torrent>,
    queue: Vec<i64>,
    next_id: i64,
    removed: Vec<(i64, i64)>,
    blocklist: Vec<AddressRange>,
    cumulative: SessionStats,
    current: SessionStats,
    started_at: i64,
    events: broadcast::Sender<SessionEvent>,
    fetcher: Arc<dyn Fetcher>,
}

impl Session {
    pub fn new(settings: SessionSettings, fetcher: Arc<dyn Fetcher>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let blocklist = load_blocklist(&settings.config_dir);
        let current = SessionStats {
            session_count: 1,
            ..SessionStats::default()
        };
        Self {
            settings,
            torrents: BTreeMap::new(),
            queue: Vec::new(),
            next_id: 1,
            removed: Vec::new(),
            blocklist,
            cumulative: current,
            current,
            started_at: now(),
            events,
            fetcher,
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut SessionSettings {
        &mut self.settings
    }

    /// The fetch primitive used by asynchronous operations.
    pub fn fetcher(&self) -> Arc<dyn Fetcher> {
        Arc::clone(&self.fetcher)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    pub fn close(&self) {
        info!("session close requested");
        self.emit(SessionEvent::SessionClose);
    }

    pub fn torrent(&self, id: i64) -> Option<&Torrent> {
        self.torrents.get(&id)
    }

    pub fn torrent_mut(&mut self, id: i64) -> Option<&mut Torrent> {
        self.torrents.get_mut(&id)
    }

    /// Record an external edit of a torrent's attributes.
    pub fn mark_changed(&mut self, id: i64) {
        if let Some(tor) = self.torrents.get_mut(&id) {
            tor.touch(now());
            self.emit(SessionEvent::TorrentChanged(id));
        }
    }

    pub fn torrent_count(&self) -> usize {
        self.torrents.len()
    }

    pub fn find_by_hash(&self, hash: &str) -> Option<i64> {
        self.torrents
            .values()
            .find(|t| t.hash_string.eq_ignore_ascii_case(hash))
            .map(|t| t.id)
    }

    /// Resolve a selector to torrent ids. Unknown entries are skipped.
    pub fn select(&self, selector: &TorrentSelector) -> Vec<i64> {
        match selector {
            TorrentSelector::All => self.torrents.keys().copied().collect(),
            TorrentSelector::RecentlyActive => {
                let cutoff = now() - SessionConfig::RECENTLY_ACTIVE_SECONDS;
                self.torrents
                    .values()
                    .filter(|t| t.activity_date >= cutoff)
                    .map(|t| t.id)
                    .collect()
            }
            TorrentSelector::List(refs) => {
                let mut ids = Vec::with_capacity(refs.len());
                for r in refs {
                    let id = match r {
                        TorrentRef::Id(id) => self.torrents.contains_key(id).then_some(*id),
                        TorrentRef::Hash(hash) => self.find_by_hash(hash),
                    };
                    if let Some(id) = id.filter(|id| !ids.contains(id)) {
                        ids.push(id);
                    }
                }
                ids
            }
        }
    }

    /// Ids removed within the "recently active" window.
    pub fn recently_removed(&self) -> Vec<i64> {
        let cutoff = now() - SessionConfig::RECENTLY_ACTIVE_SECONDS;
        self.removed
            .iter()
            .filter(|(_, at)| *at >= cutoff)
            .map(|(id, _)| *id)
            .collect()
    }

    // Queue

    fn renumber_queue(&mut self) {
        for (position, id) in self.queue.iter().enumerate() {
            if let Some(tor) = self.torrents.get_mut(id) {
                tor.queue_position = position as i64;
            }
        }
        self.emit(SessionEvent::QueuePositionsChanged);
    }

    /// Move the given torrents to the front, keeping their relative order.
    pub fn queue_move_top(&mut self, ids: &[i64]) {
        let (mut moved, rest): (Vec<i64>, Vec<i64>) =
            self.queue.iter().copied().partition(|id| ids.contains(id));
        moved.extend(rest);
        self.queue = moved;
        self.renumber_queue();
    }

    /// Move the given torrents to the back, keeping their relative order.
    pub fn queue_move_bottom(&mut self, ids: &[i64]) {
        let (moved, mut rest): (Vec<i64>, Vec<i64>) =
            self.queue.iter().copied().partition(|id| ids.contains(id));
        rest.extend(moved);
        self.queue = rest;
        self.renumber_queue();
    }

    /// Move each given torrent one step toward the front.
    pub fn queue_move_up(&mut self, ids: &[i64]) {
        for i in 1..self.queue.len() {
            if ids.contains(&self.queue[i]) && !ids.contains(&self.queue[i - 1]) {
                self.queue.swap(i - 1, i);
            }
        }
        self.renumber_queue();
    }

    /// Move each given torrent one step toward the back.
    pub fn queue_move_down(&mut self, ids: &[i64]) {
        for i in (0..self.queue.len().saturating_sub(1)).rev() {
            if ids.contains(&self.queue[i]) && !ids.contains(&self.queue[i + 1]) {
                self.queue.swap(i, i + 1);
            }
        }
        self.renumber_queue();
    }

    /// Put one torrent at an absolute queue position, clamped to the queue.
    pub fn set_queue_position(&mut self, id: i64, position: i64) {
        let Some(current) = self.queue.iter().position(|q| *q == id) else {
            return;
        };
        self.queue.remove(current);
        let target = usize::try_from(position).unwrap_or(0).min(self.queue.len());
        self.queue.insert(target, id);
        self.renumber_queue();
    }

    /// Ids sorted by queue position.
    pub fn sort_by_queue(&self, ids: &[i64]) -> Vec<i64> {
        self.queue.iter().filter(|id| ids.contains(id)).copied().collect()
    }

    // Lifecycle

    fn running_count(&self, seeding: bool) -> i64 {
        self.torrents
            .values()
            .filter(|t| {
                if seeding {
                    t.status == Activity::Seed
                } else {
                    t.status == Activity::Download
                }
            })
            .count() as i64
    }

    fn has_free_slot(&self, seeding: bool) -> bool {
        let (enabled, size) = if seeding {
            (self.settings.seed_queue_enabled, self.settings.seed_queue_size)
        } else {
            (self.settings.download_queue_enabled, self.settings.download_queue_size)
        };
        !enabled || self.running_count(seeding) < size
    }

    /// Start torrents in queue order. `bypass_queue` starts them immediately.
    pub fn start(&mut self, ids: &[i64], bypass_queue: bool) {
        let stamp = now();
        for id in self.sort_by_queue(ids) {
            let Some(seeding) = self.torrents.get(&id).map(|t| t.is_finished()) else {
                continue;
            };
            let free = bypass_queue || self.has_free_slot(seeding);
            let Some(tor) = self.torrents.get_mut(&id) else {
                continue;
            };
            if tor.is_running() && !(bypass_queue && tor.status.is_queued()) {
                continue;
            }
            tor.status = match (free, seeding) {
                (true, _) => tor.active_status(),
                (false, true) => Activity::SeedWait,
                (false, false) => Activity::DownloadWait,
            };
            tor.touch(stamp);
            debug!("torrent {} -> {:?}", id, tor.status);
            self.emit(SessionEvent::TorrentStarted(id));
        }
    }

    pub fn stop(&mut self, ids: &[i64]) {
        let stamp = now();
        for id in ids {
            if let Some(tor) = self.torrents.get_mut(id) {
                if tor.is_running() {
                    tor.status = Activity::Stopped;
                    tor.touch(stamp);
                    self.emit(SessionEvent::TorrentStopped(*id));
                }
            }
        }
        self.promote_waiting();
    }

    /// Fill freed queue slots with waiting torrents, in queue order.
    fn promote_waiting(&mut self) {
        let waiting: Vec<i64> = self
            .queue
            .iter()
            .filter(|id| self.torrents.get(id).is_some_and(|t| t.status.is_queued()))
            .copied()
            .collect();
        for id in waiting {
            let Some(seeding) = self.torrents.get(&id).map(|t| t.is_finished()) else {
                continue;
            };
            if !self.has_free_slot(seeding) {
                continue;
            }
            if let Some(tor) = self.torrents.get_mut(&id) {
                tor.status = tor.active_status();
                self.emit(SessionEvent::TorrentChanged(id));
            }
        }
    }

    /// Recompute completed bytes from what is present on disk.
    pub fn verify(&mut self, ids: &[i64]) {
        let stamp = now();
        for id in ids {
            let Some(tor) = self.torrents.get_mut(id) else {
                continue;
            };
            let dir = tor.download_dir.clone();
            for file in &mut tor.files {
                let on_disk = contained_path(&dir, &file.name)
                    .and_then(|path| std::fs::metadata(path).ok())
                    .map(|m| m.len())
                    .unwrap_or(0);
                file.bytes_completed = on_disk.min(file.length);
            }
            if tor.is_finished() && tor.done_date == 0 {
                tor.done_date = stamp;
            }
            tor.touch(stamp);
            self.emit(SessionEvent::TorrentChanged(*id));
        }
    }

    pub fn reannounce(&mut self, ids: &[i64]) {
        let stamp = now();
        for id in ids {
            if let Some(tor) = self.torrents.get_mut(id) {
                tor.manual_announce_time = stamp;
                self.emit(SessionEvent::TorrentChanged(*id));
            }
        }
    }

    /// Remove torrents, optionally deleting their downloaded files.
    pub fn remove(&mut self, ids: &[i64], delete_local_data: bool) {
        let stamp = now();
        for id in ids {
            let Some(tor) = self.torrents.remove(id) else {
                continue;
            };
            if delete_local_data {
                self.emit(SessionEvent::TorrentTrashing(*id));
                for file in &tor.files {
                    let Some(path) = contained_path(&tor.download_dir, &file.name) else {
                        warn!("not deleting {}: outside the download directory", file.name);
                        continue;
                    };
                    match std::fs::remove_file(&path) {
                        Ok(()) => debug!("deleted {}", path.display()),
                        Err(e) if e.kind() == ErrorKind::NotFound => {}
                        Err(e) => warn!("failed to delete {}: {}", path.display(), e),
                    }
                }
            } else {
                self.emit(SessionEvent::TorrentRemoving(*id));
            }
            self.queue.retain(|q| q != id);
            self.removed.push((*id, stamp));
            info!("removed torrent {} ({})", id, tor.name);
        }
        self.renumber_queue();
        self.promote_waiting();
    }

    /// Point torrents at a new directory, moving existing data if asked.
    pub fn set_location(&mut self, ids: &[i64], location: &Path, move_data: bool) -> Result<()> {
        if !location.is_absolute() {
            return Err(SeedboxError::PathNotAbsolute(location.to_path_buf()));
        }
        for id in ids {
            let Some(tor) = self.torrents.get_mut(id) else {
                continue;
            };
            if move_data && tor.download_dir != location {
                move_files(tor, location)?;
            }
            tor.download_dir = location.to_path_buf();
            self.emit(SessionEvent::TorrentMoved(*id));
        }
        Ok(())
    }

    // Rename

    /// Validate a rename of `old_path` (the torrent root, a file, or a
    /// directory inside the torrent) to `new_name`.
    pub fn rename_plan(&self, id: i64, old_path: &str, new_name: &str) -> Result<RenamePlan> {
        let tor = self.torrents.get(&id).ok_or(SeedboxError::TorrentNotFound(id))?;
        let invalid = || {
            SeedboxError::io_with_path(std::io::Error::from(ErrorKind::InvalidInput), old_path)
        };

        let old_path = old_path.trim_end_matches('/');
        if new_name.is_empty() || new_name.contains('/') || new_name == "." || new_name == ".." {
            return Err(invalid());
        }
        let prefix = format!("{}/", old_path);
        let known = tor
            .files
            .iter()
            .any(|f| f.name == old_path || f.name.starts_with(&prefix));
        if old_path.is_empty() || !known {
            return Err(invalid());
        }

        let mut plan = RenamePlan {
            id,
            old_path: old_path.to_string(),
            new_name: new_name.to_string(),
            source: contained_path(&tor.download_dir, old_path).ok_or_else(invalid)?,
            target: PathBuf::new(),
        };
        plan.target = contained_path(&tor.download_dir, &plan.new_path()).ok_or_else(invalid)?;
        Ok(plan)
    }

    /// Fold a completed rename back into the torrent's file list.
    pub fn apply_rename(&mut self, plan: &RenamePlan) -> Result<()> {
        let tor = self
            .torrents
            .get_mut(&plan.id)
            .ok_or(SeedboxError::TorrentNotFound(plan.id))?;
        let new_path = plan.new_path();
        let prefix = format!("{}/", plan.old_path);
        for file in &mut tor.files {
            if file.name == plan.old_path {
                file.name = new_path.clone();
            } else if let Some(rest) = file.name.strip_prefix(&prefix) {
                file.name = format!("{}/{}", new_path, rest);
            }
        }
        if !plan.old_path.contains('/') && (tor.files.len() > 1 || tor.name == plan.old_path) {
            tor.name = plan.new_name.clone();
        }
        tor.touch(now());
        self.emit(SessionEvent::TorrentChanged(plan.id));
        Ok(())
    }

    // Add

    /// Add a torrent. A torrent whose info-hash is already known is
    /// reported as a duplicate and left untouched.
    pub fn add_torrent(&mut self, meta: Metainfo, options: AddOptions) -> Result<AddOutcome> {
        if let Some(existing) = self.find_by_hash(&meta.hash_string) {
            debug!("duplicate torrent {}", meta.hash_string);
            return Ok(AddOutcome::Duplicate(existing));
        }

        let download_dir = options
            .download_dir
            .unwrap_or_else(|| self.settings.download_dir.clone());
        if !download_dir.is_absolute() {
            return Err(SeedboxError::PathNotAbsolute(download_dir));
        }

        let id = self.next_id;
        let mut tor = Torrent::new(id, meta, download_dir, now());
        tor.peer_limit = options
            .peer_limit
            .unwrap_or(self.settings.peer_limit_per_torrent);
        if let Some(priority) = options.bandwidth_priority.filter(|p| is_priority(*p)) {
            tor.bandwidth_priority = priority;
        }
        if !options.files_unwanted.is_empty() {
            tor.set_files_wanted(&options.files_unwanted, false)?;
        }
        if !options.files_wanted.is_empty() {
            tor.set_files_wanted(&options.files_wanted, true)?;
        }
        for (indices, priority) in [
            (&options.priority_low, PRIORITY_LOW),
            (&options.priority_normal, PRIORITY_NORMAL),
            (&options.priority_high, PRIORITY_HIGH),
        ] {
            if !indices.is_empty() {
                tor.set_file_priorities(indices, priority)?;
            }
        }
        tor.set_labels(&options.labels)
            .map_err(|message| SeedboxError::Validation {
                field: "labels".into(),
                message: message.into(),
            })?;
        tor.queue_position = self.queue.len() as i64;

        info!("added torrent {} ({})", id, tor.name);
        self.next_id += 1;
        self.queue.push(id);
        self.torrents.insert(id, tor);
        self.current.files_added += 1;
        self.cumulative.files_added += 1;
        self.emit(SessionEvent::TorrentAdded(id));

        let paused = options.paused.unwrap_or(!self.settings.start_added_torrents);
        if !paused {
            self.start(&[id], false);
        }
        Ok(AddOutcome::Added(id))
    }

    // Stats and blocklist

    pub fn current_stats(&self) -> SessionStats {
        SessionStats {
            seconds_active: now() - self.started_at,
            ..self.current
        }
    }

    pub fn cumulative_stats(&self) -> SessionStats {
        SessionStats {
            seconds_active: self.cumulative.seconds_active + now() - self.started_at,
            ..self.cumulative
        }
    }

    pub fn active_count(&self) -> usize {
        self.torrents.values().filter(|t| t.is_running()).count()
    }

    pub fn paused_count(&self) -> usize {
        self.torrents.len() - self.active_count()
    }

    pub fn blocklist_size(&self) -> usize {
        self.blocklist.len()
    }

    pub fn set_blocklist(&mut self, rules: Vec<AddressRange>) {
        self.blocklist = rules;
    }

    pub fn is_blocked(&self, addr: std::net::Ipv4Addr) -> bool {
        self.settings.blocklist_enabled && self.blocklist.iter().any(|r| r.contains(addr))
    }
}

fn move_files(tor: &Torrent, location: &Path) -> Result<()> {
    let roots: HashSet<&str> = tor
        .files
        .iter()
        .map(|f| f.name.split('/').next().unwrap_or(&f.name))
        .collect();
    std::fs::create_dir_all(location).map_err(|e| SeedboxError::io_with_path(e, location))?;
    for root in roots {
        let (Some(from), Some(to)) = (
            contained_path(&tor.download_dir, root),
            contained_path(location, root),
        ) else {
            warn!("not moving {}: outside the download directory", root);
            continue;
        };
        match std::fs::rename(&from, &to) {
            Ok(()) => debug!("moved {} -> {}", from.display(), to.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(SeedboxError::io_with_path(e, &from)),
        }
    }
    Ok(())
}

fn load_blocklist(config_dir: &Path) -> Vec<AddressRange> {
    let path = crate::blocklist::blocklist_path(config_dir);
    match std::fs::read_to_string(&path) {
        Ok(text) => text.lines().filter_map(crate::blocklist::parse_rule).collect(),
        Err(_) => Vec::new(),
    }
}
