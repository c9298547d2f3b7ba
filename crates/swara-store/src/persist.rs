//! Writing note tables to disk and registering them.

use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use swara::Transcription;
use uuid::Uuid;

use crate::store::ArtifactStore;
use crate::StoreError;

const FILE_PREFIX: &str = "subtitles_";
const FILE_SUFFIX: &str = ".csv";

/// A note table written to disk and registered in a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedArtifact {
    pub id: String,
    pub path: PathBuf,
}

/// Write the transcription's CSV into `dir` and register it under `id`.
///
/// The file is named `subtitles_<id>_<random>.csv` and outlives this call;
/// the store deletes it on removal or expiry. An empty `id` is replaced by a
/// fresh UUID.
pub fn persist_csv(
    store: &dyn ArtifactStore,
    dir: &Path,
    id: &str,
    transcription: &Transcription,
) -> Result<PersistedArtifact, StoreError> {
    let id = if id.is_empty() {
        Uuid::new_v4().to_string()
    } else {
        id.to_string()
    };
    if id.contains(['/', '\\']) {
        return Err(StoreError::InvalidId(id));
    }

    std::fs::create_dir_all(dir)?;
    let mut file = tempfile::Builder::new()
        .prefix(&format!("{}{}_", FILE_PREFIX, id))
        .suffix(FILE_SUFFIX)
        .tempfile_in(dir)?;

    {
        let mut writer = BufWriter::new(file.as_file_mut());
        transcription.write_csv(&mut writer)?;
        writer.flush()?;
    }

    // Dropping the handle would delete the file; keep it for the store.
    let (_, path) = file.keep()?;
    tracing::info!(
        artifact_id = %id,
        path = %path.display(),
        rows = transcription.notes.len(),
        "Persisted note table"
    );

    store.insert(&id, path.clone());
    Ok(PersistedArtifact { id, path })
}

/// Register note tables left in `dir` by earlier processes.
///
/// Each `subtitles_*.csv` file is keyed by its name without prefix and
/// suffix, and enters the store already as old as its modification time,
/// so the next sweep evicts the stale ones. A missing `dir` adopts
/// nothing. Returns the number of files registered.
pub fn adopt_existing(store: &dyn ArtifactStore, dir: &Path) -> Result<usize, StoreError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    let now = SystemTime::now();
    let mut adopted = 0;
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        let Some(id) = name
            .to_str()
            .and_then(|n| n.strip_prefix(FILE_PREFIX))
            .and_then(|n| n.strip_suffix(FILE_SUFFIX))
        else {
            continue;
        };

        let modified = match entry.metadata().and_then(|m| {
            if m.is_file() {
                m.modified().map(Some)
            } else {
                Ok(None)
            }
        }) {
            Ok(Some(modified)) => modified,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(
                    path = %entry.path().display(),
                    error = %e,
                    "Skipping unreadable artifact"
                );
                continue;
            }
        };

        // A modification time in the future counts as brand new.
        let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
        store.insert_aged(id, entry.path(), age);
        adopted += 1;
    }

    if adopted > 0 {
        tracing::info!(adopted, dir = %dir.display(), "Adopted existing artifacts");
    }
    Ok(adopted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TtlArtifactStore;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use swara::{FrameSequence, QuantizePolicy, Transcriber};

    fn transcription() -> Transcription {
        let frames = FrameSequence::new(vec![0.45; 50], vec![1.0; 50]).unwrap();
        Transcriber::new(QuantizePolicy::default())
            .unwrap()
            .transcribe(&frames, 1.6)
            .unwrap()
    }

    #[test]
    fn writes_csv_and_registers_it() {
        let dir = tempfile::tempdir().unwrap();
        let store = TtlArtifactStore::new(Duration::from_secs(600));
        let result = transcription();

        let artifact = persist_csv(&store, dir.path(), "take-1", &result).unwrap();

        assert_eq!(artifact.id, "take-1");
        assert_eq!(store.get("take-1"), Some(artifact.path.clone()));
        let name = artifact.path.file_name().unwrap().to_string_lossy();
        assert!(name.starts_with("subtitles_take-1_"));
        assert!(name.ends_with(".csv"));

        let mut expected = Vec::new();
        result.write_csv(&mut expected).unwrap();
        assert_eq!(std::fs::read(&artifact.path).unwrap(), expected);
    }

    #[test]
    fn empty_id_gets_a_uuid() {
        let dir = tempfile::tempdir().unwrap();
        let store = TtlArtifactStore::new(Duration::from_secs(600));

        let artifact = persist_csv(&store, dir.path(), "", &transcription()).unwrap();
        assert!(Uuid::parse_str(&artifact.id).is_ok());
        assert!(store.get(&artifact.id).is_some());
    }

    #[test]
    fn creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        let store = TtlArtifactStore::new(Duration::from_secs(600));

        let artifact = persist_csv(&store, &nested, "x", &transcription()).unwrap();
        assert!(artifact.path.starts_with(&nested));
    }

    fn backdate(path: &Path, age: Duration) {
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
    }

    #[test]
    fn adopted_stale_tables_are_swept() {
        let dir = tempfile::tempdir().unwrap();
        let stale = dir.path().join("subtitles_old_abc123.csv");
        let fresh = dir.path().join("subtitles_new_def456.csv");
        let unrelated = dir.path().join("notes.csv");
        for path in [&stale, &fresh, &unrelated] {
            std::fs::write(path, "start,end,note\r\n").unwrap();
        }
        backdate(&stale, Duration::from_secs(3600));
        backdate(&unrelated, Duration::from_secs(3600));
        std::fs::create_dir(dir.path().join("subtitles_dir.csv")).unwrap();

        let store = TtlArtifactStore::new(Duration::from_secs(600));
        assert_eq!(adopt_existing(&store, dir.path()).unwrap(), 2);
        assert_eq!(store.get("old_abc123"), None);
        assert_eq!(store.get("new_def456"), Some(fresh.clone()));

        assert_eq!(store.sweep(), 1);
        assert!(!stale.exists());
        assert!(fresh.exists());
        assert!(unrelated.exists());
    }

    #[test]
    fn adopting_a_missing_directory_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let store = TtlArtifactStore::new(Duration::from_secs(600));
        assert_eq!(adopt_existing(&store, &dir.path().join("absent")).unwrap(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn rejects_path_like_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = TtlArtifactStore::new(Duration::from_secs(600));
        assert!(matches!(
            persist_csv(&store, dir.path(), "../escape", &transcription()),
            Err(StoreError::InvalidId(_))
        ));
        assert!(store.is_empty());
    }
}
