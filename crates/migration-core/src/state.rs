//! C8 — State Store. One file per tenant-id set under `Config::state_dir`,
//! named by [`migration_connector::model::state_key`]. Writes go through
//! a temp file plus rename for atomicity (spec.md §5 "Shared resources");
//! reads tolerate a missing or corrupt file, falling back to an empty
//! state with a `tracing::warn!` rather than aborting the run (spec.md
//! §4.8).

use migration_connector::model::{state_key, MigrationState};
use std::path::{Path, PathBuf};

pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, customer_ids: &[i64]) -> PathBuf {
        self.dir.join(format!("{}.json", state_key(customer_ids)))
    }

    /// Load the checkpoint for `customer_ids`. Returns a fresh,
    /// empty-but-timestamped state if the file is absent or unreadable —
    /// this is never a fatal error for the run (spec.md §4.8).
    pub fn load(&self, customer_ids: &[i64]) -> MigrationState {
        let path = self.path_for(customer_ids);

        match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(state) => state,
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "state file is corrupt, starting fresh");
                    fresh_state()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => fresh_state(),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "could not read state file, starting fresh");
                fresh_state()
            }
        }
    }

    /// Persist `state` for `customer_ids`. Write-temp-then-rename keeps a
    /// crash mid-write from corrupting the previous checkpoint. Called
    /// once per table/routine transition, never from the per-row insert
    /// loop (spec.md §4.8).
    pub fn save(&self, customer_ids: &[i64], state: &mut MigrationState) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;

        let now = chrono::Utc::now();
        if state.created_at.is_none() {
            state.created_at = Some(now);
        }
        state.updated_at = Some(now);

        let serialized = serde_json::to_string_pretty(state).map_err(std::io::Error::other)?;

        let final_path = self.path_for(customer_ids);
        let tmp_path = tmp_path_for(&final_path);
        std::fs::write(&tmp_path, serialized)?;
        std::fs::rename(&tmp_path, &final_path)?;

        Ok(())
    }
}

fn tmp_path_for(final_path: &Path) -> PathBuf {
    let mut tmp = final_path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

fn fresh_state() -> MigrationState {
    MigrationState::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use migration_connector::model::{DatabaseState, Status, TableStatusEntry};

    #[test]
    fn load_missing_file_returns_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        let state = store.load(&[1, 7]);
        assert!(state.databases.is_empty());
    }

    #[test]
    fn save_then_load_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());

        let mut state = MigrationState::default();
        let mut db_state = DatabaseState::default();
        db_state.tables.insert(
            "ROLE".to_string(),
            TableStatusEntry {
                status: Status::Completed,
                rows: 2,
                timestamp: chrono::Utc::now(),
                reason: None,
            },
        );
        state.databases.insert("STARFOX".to_string(), db_state);

        store.save(&[1, 7], &mut state).unwrap();

        let reloaded = store.load(&[7, 1]);
        let entry = reloaded.table_status("STARFOX", "ROLE").unwrap();
        assert_eq!(entry.status, Status::Completed);
        assert_eq!(entry.rows, 2);
    }

    #[test]
    fn corrupt_file_falls_back_to_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        std::fs::write(dir.path().join(format!("{}.json", state_key(&[3]))), "not json").unwrap();

        let state = store.load(&[3]);
        assert!(state.databases.is_empty());
    }

    #[test]
    fn state_key_is_order_and_duplicate_independent() {
        assert_eq!(state_key(&[7, 1, 7]), state_key(&[1, 7]));
    }
}
