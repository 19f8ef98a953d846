//! Note domain model and persisted record shapes.
//!
//! # Responsibility
//! - Define the canonical note entity used by every service.
//! - Define the wire shapes written to the key-value store.
//!
//! # Invariants
//! - Every note is identified by a stable `NoteId`.
//! - Records are decoded leniently; the registry normalizes them.

pub mod note;
pub mod record;
