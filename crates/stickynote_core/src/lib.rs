//! Core domain logic for floating sticky notes.
//! The host renders and forwards input; this crate owns every invariant.

pub mod config;
pub mod db;
pub mod geometry;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, NoteConfig};
pub use geometry::{Geometry, Point, ResizeEdge, Size, SizeLimits};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::note::{Note, NoteColor, NoteDraft, NoteId, NotePatch};
pub use repo::{KeyValueStore, MemoryKeyValueStore, SqliteKeyValueStore, StoreError};
pub use service::autosave::{Clock, ManualClock, SystemClock};
pub use service::note_registry::{NoteRegistry, RegistryError};
pub use service::session::{
    NoteView, SessionController, SessionError, SessionPhase, SessionResult, SessionState,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
