//! Time-limited storage for exported note tables.
//!
//! Artifacts live in a concurrent map keyed by id. The clock is injected
//! so expiry can be tested without waiting, and eviction happens either on
//! an explicit [`ArtifactStore::sweep`] call or from the background task
//! started by [`spawn_sweep_task`].

pub mod clock;
pub mod persist;
pub mod store;
pub mod sweep;

pub use clock::{Clock, ManualClock, SystemClock};
pub use persist::{adopt_existing, persist_csv, PersistedArtifact};
pub use store::{Artifact, ArtifactStore, TtlArtifactStore, DEFAULT_TTL};
pub use sweep::{spawn_sweep_task, DEFAULT_SWEEP_INTERVAL};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("artifact I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to keep artifact file: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("artifact id {0:?} must not contain path separators")]
    InvalidId(String),
}
