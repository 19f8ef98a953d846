//! Note, panel and session services.
//!
//! # Responsibility
//! - Own the in-memory note set and its ordering rules.
//! - Orchestrate host commands into persisted state changes.
//! - Keep host surfaces decoupled from storage details.

pub mod autosave;
pub mod gesture;
pub mod note_registry;
pub mod panel;
pub mod session;
pub mod zorder;
