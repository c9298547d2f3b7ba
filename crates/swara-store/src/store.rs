//! Artifact registry with time-limited entries.
//!
//! Each exported note table is registered under an id with its creation
//! time. Entries older than the store TTL are invisible to [`ArtifactStore::get`]
//! and are evicted (file and entry) by [`ArtifactStore::sweep`].

use dashmap::DashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::clock::{Clock, SystemClock};

/// Default time an artifact stays retrievable.
pub const DEFAULT_TTL: Duration = Duration::from_secs(600);

/// A registered file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    /// When the entry was registered.
    pub created_at: Instant,
    /// How old the file already was when registered.
    pub prior_age: Duration,
}

/// Storage for exported artifacts, keyed by id.
pub trait ArtifactStore: Send + Sync {
    /// Register `path` under `id`, replacing any previous entry.
    fn insert(&self, id: &str, path: PathBuf) {
        self.insert_aged(id, path, Duration::ZERO);
    }

    /// Register a file that has already existed for `age`. It expires once
    /// `age` plus its time in the store exceeds the TTL.
    fn insert_aged(&self, id: &str, path: PathBuf, age: Duration);

    /// Path of a live artifact. Expired entries are never returned.
    fn get(&self, id: &str) -> Option<PathBuf>;

    /// Drop an entry and delete its file. Returns whether the id was known.
    fn remove(&self, id: &str) -> bool;

    /// Evict every expired entry, deleting its file.
    /// Returns the number of entries evicted.
    fn sweep(&self) -> usize;

    /// Number of registered entries, expired or not.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory artifact store using DashMap.
#[derive(Debug)]
pub struct TtlArtifactStore<C: Clock = SystemClock> {
    entries: DashMap<String, Artifact>,
    ttl: Duration,
    clock: C,
}

impl TtlArtifactStore<SystemClock> {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, SystemClock)
    }

    /// Create a new store wrapped in Arc for sharing with the sweep task.
    pub fn new_shared(ttl: Duration) -> Arc<Self> {
        Arc::new(Self::new(ttl))
    }
}

impl Default for TtlArtifactStore<SystemClock> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl<C: Clock> TtlArtifactStore<C> {
    pub fn with_clock(ttl: Duration, clock: C) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_expired(&self, artifact: &Artifact, now: Instant) -> bool {
        now.saturating_duration_since(artifact.created_at)
            .saturating_add(artifact.prior_age)
            > self.ttl
    }
}

fn delete_file(id: &str, path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!(artifact_id = %id, path = %path.display(), "Deleted artifact file")
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!(artifact_id = %id, path = %path.display(), "Artifact file already gone")
        }
        Err(e) => tracing::warn!(
            artifact_id = %id,
            path = %path.display(),
            error = %e,
            "Failed to delete artifact file"
        ),
    }
}

impl<C: Clock> ArtifactStore for TtlArtifactStore<C> {
    fn insert_aged(&self, id: &str, path: PathBuf, age: Duration) {
        tracing::info!(
            artifact_id = %id,
            path = %path.display(),
            age_secs = age.as_secs(),
            "Registered artifact"
        );
        let artifact = Artifact {
            path: path.clone(),
            created_at: self.clock.now(),
            prior_age: age,
        };
        if let Some(previous) = self.entries.insert(id.to_string(), artifact) {
            if previous.path != path {
                delete_file(id, &previous.path);
            }
        }
    }

    fn get(&self, id: &str) -> Option<PathBuf> {
        let now = self.clock.now();
        self.entries
            .get(id)
            .filter(|entry| !self.is_expired(entry.value(), now))
            .map(|entry| entry.path.clone())
    }

    fn remove(&self, id: &str) -> bool {
        match self.entries.remove(id) {
            Some((_, artifact)) => {
                delete_file(id, &artifact.path);
                tracing::info!(artifact_id = %id, "Artifact removed");
                true
            }
            None => false,
        }
    }

    fn sweep(&self) -> usize {
        let now = self.clock.now();
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| self.is_expired(entry.value(), now))
            .map(|entry| entry.key().clone())
            .collect();

        let mut evicted = 0;
        for id in expired {
            // Re-check under the shard lock; the entry may have been replaced.
            if let Some((_, artifact)) = self
                .entries
                .remove_if(&id, |_, artifact| self.is_expired(artifact, now))
            {
                delete_file(&id, &artifact.path);
                evicted += 1;
            }
        }

        if evicted > 0 {
            tracing::info!(
                evicted = evicted,
                remaining = self.entries.len(),
                "Artifact sweep completed"
            );
        }

        evicted
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use pretty_assertions::assert_eq;

    fn store(dir: &Path) -> (TtlArtifactStore<Arc<ManualClock>>, Arc<ManualClock>, PathBuf) {
        let clock = Arc::new(ManualClock::new());
        let store = TtlArtifactStore::with_clock(Duration::from_secs(600), clock.clone());
        let path = dir.join("a.csv");
        std::fs::write(&path, "start,end,note\r\n").unwrap();
        (store, clock, path)
    }

    #[test]
    fn live_entry_is_visible() {
        let dir = tempfile::tempdir().unwrap();
        let (store, clock, path) = store(dir.path());
        store.insert("a", path.clone());

        clock.advance(Duration::from_secs(600));
        assert_eq!(store.get("a"), Some(path));
        assert_eq!(store.get("b"), None);
    }

    #[test]
    fn expired_entry_is_invisible_before_sweep() {
        let dir = tempfile::tempdir().unwrap();
        let (store, clock, path) = store(dir.path());
        store.insert("a", path.clone());

        clock.advance(Duration::from_secs(601));
        assert_eq!(store.get("a"), None);
        // Still registered and on disk until swept
        assert_eq!(store.len(), 1);
        assert!(path.exists());
    }

    #[test]
    fn sweep_evicts_and_deletes_only_expired() {
        let dir = tempfile::tempdir().unwrap();
        let (store, clock, old) = store(dir.path());
        store.insert("old", old.clone());

        clock.advance(Duration::from_secs(400));
        let fresh = dir.path().join("fresh.csv");
        std::fs::write(&fresh, "x").unwrap();
        store.insert("fresh", fresh.clone());

        clock.advance(Duration::from_secs(201));
        assert_eq!(store.sweep(), 1);
        assert!(!old.exists());
        assert!(fresh.exists());
        assert_eq!(store.get("fresh"), Some(fresh));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn sweep_survives_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let (store, clock, path) = store(dir.path());
        store.insert("a", path.clone());
        store.insert("ghost", dir.path().join("never-written.csv"));
        std::fs::remove_file(&path).unwrap();

        clock.advance(Duration::from_secs(700));
        assert_eq!(store.sweep(), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn prior_age_counts_toward_expiry() {
        let dir = tempfile::tempdir().unwrap();
        let (store, clock, stale) = store(dir.path());
        store.insert_aged("stale", stale.clone(), Duration::from_secs(3600));

        let recent = dir.path().join("recent.csv");
        std::fs::write(&recent, "x").unwrap();
        store.insert_aged("recent", recent.clone(), Duration::from_secs(590));

        assert_eq!(store.get("stale"), None);
        assert_eq!(store.get("recent"), Some(recent.clone()));
        assert_eq!(store.sweep(), 1);
        assert!(!stale.exists());

        clock.advance(Duration::from_secs(11));
        assert_eq!(store.sweep(), 1);
        assert!(!recent.exists());
        assert!(store.is_empty());
    }

    #[test]
    fn remove_deletes_file() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _clock, path) = store(dir.path());
        store.insert("a", path.clone());

        assert!(store.remove("a"));
        assert!(!path.exists());
        assert!(!store.remove("a"));
    }

    #[test]
    fn reinsert_replaces_old_file() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _clock, first) = store(dir.path());
        store.insert("a", first.clone());

        let second = dir.path().join("b.csv");
        std::fs::write(&second, "x").unwrap();
        store.insert("a", second.clone());

        assert!(!first.exists());
        assert_eq!(store.get("a"), Some(second));
        assert_eq!(store.len(), 1);
    }
}
