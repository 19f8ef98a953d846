//! Notes/session snapshots over a key-value medium.
//!
//! # Responsibility
//! - Read the notes array and session state records, degrading to defaults
//!   on absence, read failure, or corruption.
//! - Write both records as JSON blobs.
//!
//! # Invariants
//! - `load_*` never fails; the returned status says what was degraded.
//! - `try_load_*` fails only when the medium itself cannot be read.
//! - The two records are read and written independently.

use super::{KeyValueStore, StoreError, StoreResult};
use crate::model::record::{
    decode_notes, decode_session, encode_notes, encode_session, NoteRecord, SessionStateRecord,
};
use log::{info, warn};

/// How a load resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    /// Key absent; defaults used.
    Missing,
    /// Blob decoded; `skipped` elements were not objects.
    Loaded { skipped: usize },
    /// Blob present but not decodable; defaults used.
    Corrupt,
    /// Medium read failed; defaults used.
    ReadFailed,
}

/// Notes read at startup plus how the read went.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedNotes {
    pub records: Vec<NoteRecord>,
    pub status: LoadStatus,
}

/// Session record read at startup plus how the read went.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadedSession {
    pub record: SessionStateRecord,
    pub status: LoadStatus,
}

/// Persistence adapter owning the key-value medium.
pub struct SnapshotStore<S: KeyValueStore> {
    store: S,
    notes_key: String,
    session_key: String,
}

impl<S: KeyValueStore> SnapshotStore<S> {
    pub fn new(store: S, notes_key: impl Into<String>, session_key: impl Into<String>) -> Self {
        Self {
            store,
            notes_key: notes_key.into(),
            session_key: session_key.into(),
        }
    }

    pub fn medium(&self) -> &S {
        &self.store
    }

    pub fn medium_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Reads the notes array; never fails.
    pub fn load_notes(&self) -> LoadedNotes {
        self.try_load_notes().unwrap_or_else(|err| {
            warn!(
                "event=record_read module=repo status=error key={} error={err}",
                self.notes_key
            );
            LoadedNotes {
                records: Vec::new(),
                status: LoadStatus::ReadFailed,
            }
        })
    }

    /// Reads the notes array, surfacing medium failures.
    ///
    /// Absent and corrupt blobs still degrade to an empty list.
    pub fn try_load_notes(&self) -> StoreResult<LoadedNotes> {
        let Some(raw) = self.store.get(&self.notes_key)? else {
            return Ok(LoadedNotes {
                records: Vec::new(),
                status: LoadStatus::Missing,
            });
        };

        let loaded = match decode_notes(&raw) {
            Ok(decoded) => {
                if decoded.skipped > 0 {
                    warn!(
                        "event=record_skip module=repo status=skip key={} skipped={}",
                        self.notes_key, decoded.skipped
                    );
                }
                LoadedNotes {
                    records: decoded.records,
                    status: LoadStatus::Loaded {
                        skipped: decoded.skipped,
                    },
                }
            }
            Err(err) => {
                warn!(
                    "event=record_parse module=repo status=fallback key={} bytes={} error={err}",
                    self.notes_key,
                    raw.len()
                );
                LoadedNotes {
                    records: Vec::new(),
                    status: LoadStatus::Corrupt,
                }
            }
        };
        Ok(loaded)
    }

    /// Reads the session record; never fails.
    pub fn load_session(&self) -> LoadedSession {
        self.try_load_session().unwrap_or_else(|err| {
            warn!(
                "event=record_read module=repo status=error key={} error={err}",
                self.session_key
            );
            LoadedSession {
                record: SessionStateRecord::default(),
                status: LoadStatus::ReadFailed,
            }
        })
    }

    pub fn try_load_session(&self) -> StoreResult<LoadedSession> {
        let defaults = SessionStateRecord::default();
        let Some(raw) = self.store.get(&self.session_key)? else {
            return Ok(LoadedSession {
                record: defaults,
                status: LoadStatus::Missing,
            });
        };

        let loaded = match decode_session(&raw) {
            Ok(record) => LoadedSession {
                record,
                status: LoadStatus::Loaded { skipped: 0 },
            },
            Err(err) => {
                warn!(
                    "event=record_parse module=repo status=fallback key={} error={err}",
                    self.session_key
                );
                LoadedSession {
                    record: defaults,
                    status: LoadStatus::Corrupt,
                }
            }
        };
        Ok(loaded)
    }

    /// Writes the notes array in the given order.
    pub fn save_notes(&mut self, records: &[NoteRecord]) -> StoreResult<()> {
        let blob = encode_notes(records).map_err(StoreError::Encode)?;
        self.store.set(&self.notes_key, &blob)?;
        info!(
            "event=record_write module=repo status=ok key={} notes={} bytes={}",
            self.notes_key,
            records.len(),
            blob.len()
        );
        Ok(())
    }

    pub fn save_session(&mut self, record: &SessionStateRecord) -> StoreResult<()> {
        let blob = encode_session(record).map_err(StoreError::Encode)?;
        self.store.set(&self.session_key, &blob)?;
        Ok(())
    }
}
