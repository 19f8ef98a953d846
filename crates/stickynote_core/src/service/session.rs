//! Session orchestration: load, bootstrap, host commands, autosave, shutdown.
//!
//! # Responsibility
//! - Drive the `Uninitialized -> Loaded -> Running -> Stopped` lifecycle.
//! - Translate host commands and pointer gestures into registry/panel
//!   mutations, each followed by an immediate or debounced persist.
//! - Project registry state into canvas and panel views for the host.
//!
//! # Invariants
//! - Loading never fails on bad storage; an empty result is bootstrapped
//!   with exactly one default note.
//! - Storage failures are logged and never undo in-memory state.
//! - One gesture slot serves every note, the panel and the control bar.
//! - Delete and panel reorder treat unknown ids as silent no-ops.

use crate::config::NoteConfig;
use crate::geometry::{Point, ResizeEdge, Size, SizeLimits};
use crate::model::note::{Note, NoteColor, NoteDraft, NoteId, NotePatch};
use crate::model::record::SessionStateRecord;
use crate::repo::snapshot::{LoadStatus, SnapshotStore};
use crate::repo::{KeyValueStore, StoreResult};
use crate::service::autosave::{AutosaveScheduler, Clock, PersistUrgency, SystemClock};
use crate::service::gesture::{ActiveGesture, DragTarget, GestureSample};
use crate::service::note_registry::{NoteRegistry, RegistryError, RestoreReport};
use crate::service::panel::{EffectKind, PanelItem, PanelSynchronizer};
use log::{debug, error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Uninitialized,
    Loaded,
    Running,
    Stopped,
}

impl Display for SessionPhase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Loaded => "loaded",
            Self::Running => "running",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Errors surfaced to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// New-note request over the limit; the message is user-facing.
    CapacityExceeded { limit: usize },
    NotFound(NoteId),
    DuplicateId(NoteId),
    /// Command issued in the wrong lifecycle phase.
    InvalidState {
        operation: &'static str,
        phase: SessionPhase,
    },
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CapacityExceeded { limit } => write!(f, "Max {limit} notes allowed."),
            Self::NotFound(id) => write!(f, "note not found: {id}"),
            Self::DuplicateId(id) => write!(f, "note id already in use: {id}"),
            Self::InvalidState { operation, phase } => {
                write!(f, "`{operation}` is not allowed while session is {phase}")
            }
        }
    }
}

impl Error for SessionError {}

impl From<RegistryError> for SessionError {
    fn from(value: RegistryError) -> Self {
        match value {
            RegistryError::CapacityExceeded { limit } => Self::CapacityExceeded { limit },
            RegistryError::NotFound(id) => Self::NotFound(id),
            RegistryError::DuplicateId(id) => Self::DuplicateId(id),
        }
    }
}

pub type SessionResult<T> = Result<T, SessionError>;

/// What `load` found and did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    pub notes_status: LoadStatus,
    pub session_status: LoadStatus,
    pub restore: RestoreReport,
    /// A default note was synthesized because nothing was restored.
    pub bootstrapped: bool,
}

/// Process-wide state outside the notes themselves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionState {
    pub next_color_index: usize,
    pub panel_open: bool,
    /// `None` until the panel is first dragged; the host picks a default.
    pub panel_position: Option<Point>,
    pub control_position: Option<Point>,
}

/// Render-ready projection of one visible note.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteView {
    pub id: NoteId,
    pub position: Point,
    /// Effective size (collapsed notes report the collapsed height).
    pub size: Size,
    pub title: String,
    pub body: String,
    /// Resolved `#rrggbb` background.
    pub color: String,
    pub opacity: f64,
    pub z_order: u64,
    pub collapsed: bool,
    pub highlighted: bool,
    pub emphasized: bool,
}

/// Summary of a finished gesture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndedGesture {
    pub kind: &'static str,
    pub note_id: Option<NoteId>,
}

pub struct SessionController<S: KeyValueStore, C: Clock = SystemClock> {
    registry: NoteRegistry,
    panel: PanelSynchronizer,
    gesture: ActiveGesture,
    autosave: AutosaveScheduler,
    snapshot: SnapshotStore<S>,
    clock: C,
    phase: SessionPhase,
    panel_position: Option<Point>,
    control_position: Option<Point>,
    last_persist_error: Option<String>,
    /// Records whose load read failed; re-read before the first write.
    notes_unread: bool,
    session_unread: bool,
}

impl<S: KeyValueStore, C: Clock> SessionController<S, C> {
    pub fn new(store: S, config: NoteConfig, clock: C) -> Self {
        Self::with_registry(store, NoteRegistry::new(config), clock)
    }

    /// Like `new`, with reproducible random placement.
    pub fn with_seed(store: S, config: NoteConfig, clock: C, seed: u64) -> Self {
        Self::with_registry(store, NoteRegistry::with_seed(config, seed), clock)
    }

    fn with_registry(store: S, registry: NoteRegistry, clock: C) -> Self {
        let config = registry.config();
        let snapshot = SnapshotStore::new(store, config.notes_key(), config.session_key());
        Self {
            registry,
            panel: PanelSynchronizer::new(),
            gesture: ActiveGesture::None,
            autosave: AutosaveScheduler::new(),
            snapshot,
            clock,
            phase: SessionPhase::Uninitialized,
            panel_position: None,
            control_position: None,
            last_persist_error: None,
            notes_unread: false,
            session_unread: false,
        }
    }

    // ---- lifecycle -------------------------------------------------------

    /// Reads persisted state into the registry.
    ///
    /// Corrupt or unreadable blobs count as empty. When no note survives, one
    /// default note is created and persisted. A record whose read failed is
    /// read again before the first write and, if it now holds notes, replaces
    /// what this session has in memory instead of being overwritten.
    ///
    /// # Errors
    /// - `InvalidState` unless the session is `Uninitialized`.
    pub fn load(&mut self) -> SessionResult<LoadSummary> {
        self.ensure_phase("load", SessionPhase::Uninitialized)?;
        info!("event=session_load module=session status=start");

        let session = self.snapshot.load_session();
        self.apply_session_record(&session.record);
        self.session_unread = session.status == LoadStatus::ReadFailed;

        let notes = self.snapshot.load_notes();
        if matches!(notes.status, LoadStatus::Corrupt | LoadStatus::ReadFailed) {
            warn!(
                "event=session_load module=session status=fallback reason={:?}",
                notes.status
            );
        }
        self.notes_unread = notes.status == LoadStatus::ReadFailed;
        let restore = self.registry.deserialize(notes.records);
        self.panel.reset();

        let bootstrapped = self.registry.is_empty();
        if bootstrapped {
            // First palette color; the round-robin cursor is left alone.
            let draft = NoteDraft {
                color: Some(NoteColor::Palette(0)),
                ..NoteDraft::default()
            };
            let id = self.registry.create(draft)?.id.clone();
            info!("event=note_bootstrap module=session status=ok id={id}");
        }
        self.panel.rebuild_from_registry(&self.registry);
        if bootstrapped {
            self.persist(PersistUrgency::Immediate);
        }

        self.phase = SessionPhase::Loaded;
        info!(
            "event=session_load module=session status=ok notes={} bootstrapped={bootstrapped}",
            self.registry.len()
        );
        Ok(LoadSummary {
            notes_status: notes.status,
            session_status: session.status,
            restore,
            bootstrapped,
        })
    }

    /// Enters steady state; host surfaces may now render and send commands.
    pub fn start(&mut self) -> SessionResult<()> {
        self.ensure_phase("start", SessionPhase::Loaded)?;
        self.phase = SessionPhase::Running;
        info!(
            "event=session_start module=session status=ok notes={}",
            self.registry.len()
        );
        Ok(())
    }

    /// Fires a due autosave and expires transient effects.
    ///
    /// Returns `true` when a write was attempted.
    pub fn tick(&mut self) -> bool {
        let now = self.clock.now_ms();
        let expired = self.panel.expire(now);
        if expired > 0 {
            debug!("event=effects_expire module=session status=ok expired={expired}");
        }
        if self.autosave.is_due(now) {
            self.persist_now();
            return true;
        }
        false
    }

    /// Writes pending changes now. Returns `false` only if a write failed.
    pub fn flush(&mut self) -> bool {
        if !self.autosave.is_dirty() {
            return true;
        }
        self.persist_now()
    }

    /// Ends any gesture, flushes, and stops accepting commands.
    ///
    /// Returns whether the final flush succeeded.
    pub fn shutdown(&mut self) -> SessionResult<bool> {
        if !matches!(self.phase, SessionPhase::Loaded | SessionPhase::Running) {
            return Err(SessionError::InvalidState {
                operation: "shutdown",
                phase: self.phase,
            });
        }
        if self.gesture.is_active() {
            self.finish_gesture("shutdown");
        }
        let flushed = self.flush();
        self.phase = SessionPhase::Stopped;
        info!("event=session_stop module=session status=ok flushed={flushed}");
        Ok(flushed)
    }

    // ---- note commands ---------------------------------------------------

    /// Creates a default note.
    ///
    /// # Errors
    /// - `CapacityExceeded` at the note limit; nothing changes.
    pub fn new_note(&mut self) -> SessionResult<NoteId> {
        self.new_note_with(NoteDraft::default())
    }

    pub fn new_note_with(&mut self, draft: NoteDraft) -> SessionResult<NoteId> {
        self.ensure_running("new_note")?;
        let id = self.registry.create(draft)?.id.clone();
        self.panel.rebuild_from_registry(&self.registry);
        self.persist(PersistUrgency::Immediate);
        Ok(id)
    }

    /// Deletes a note; returns whether one was removed.
    pub fn delete_note(&mut self, id: &NoteId) -> SessionResult<bool> {
        self.ensure_running("delete_note")?;
        if self.gesture.note_id() == Some(id) {
            let cancelled = self.gesture.take();
            debug!(
                "event=gesture_cancel module=session status=ok kind={} reason=deleted",
                cancelled.kind()
            );
        }
        if self.registry.delete(id).is_none() {
            debug!("event=note_delete module=session status=skip id={id} reason=not_found");
            return Ok(false);
        }
        self.panel.rebuild_from_registry(&self.registry);
        self.persist(PersistUrgency::Immediate);
        Ok(true)
    }

    /// Flips collapse state; returns the new state.
    pub fn toggle_collapse(&mut self, id: &NoteId) -> SessionResult<bool> {
        self.ensure_running("toggle_collapse")?;
        let collapsed = !self.require(id)?.collapsed;
        self.registry.update(
            id,
            NotePatch {
                collapsed: Some(collapsed),
                ..NotePatch::default()
            },
        )?;
        self.persist(PersistUrgency::Immediate);
        Ok(collapsed)
    }

    /// Sets a palette or custom color; invalid choices fall back to palette 0.
    pub fn set_color(&mut self, id: &NoteId, color: NoteColor) -> SessionResult<NoteColor> {
        self.ensure_running("set_color")?;
        let stored = self
            .registry
            .update(
                id,
                NotePatch {
                    color: Some(color),
                    ..NotePatch::default()
                },
            )?
            .color
            .clone();
        self.persist(PersistUrgency::Immediate);
        Ok(stored)
    }

    /// Sets opacity, clamped into range; returns the stored value.
    pub fn set_opacity(&mut self, id: &NoteId, opacity: f64) -> SessionResult<f64> {
        self.ensure_running("set_opacity")?;
        let stored = self
            .registry
            .update(
                id,
                NotePatch {
                    opacity: Some(opacity),
                    ..NotePatch::default()
                },
            )?
            .opacity;
        self.persist(PersistUrgency::Debounced);
        Ok(stored)
    }

    pub fn set_title(&mut self, id: &NoteId, title: impl Into<String>) -> SessionResult<()> {
        self.ensure_running("set_title")?;
        self.registry.update(
            id,
            NotePatch {
                title: Some(title.into()),
                ..NotePatch::default()
            },
        )?;
        self.persist(PersistUrgency::Debounced);
        Ok(())
    }

    pub fn set_body(&mut self, id: &NoteId, body: impl Into<String>) -> SessionResult<()> {
        self.ensure_running("set_body")?;
        self.registry.update(
            id,
            NotePatch {
                body: Some(body.into()),
                ..NotePatch::default()
            },
        )?;
        self.persist(PersistUrgency::Debounced);
        Ok(())
    }

    /// Hides one note from the canvas; it stays in the panel.
    pub fn minimize(&mut self, id: &NoteId) -> SessionResult<()> {
        self.ensure_running("minimize")?;
        self.set_visible(id, false)
    }

    /// Hides every note; returns how many were visible.
    pub fn close_all(&mut self) -> SessionResult<usize> {
        self.ensure_running("close_all")?;
        let hidden = self.registry.hide_all();
        info!("event=notes_close_all module=session status=ok hidden={hidden}");
        Ok(hidden)
    }

    /// Stacks a note on top, as on pointer-down anywhere on it.
    pub fn focus_note(&mut self, id: &NoteId) -> SessionResult<u64> {
        self.ensure_running("focus_note")?;
        Ok(self.registry.bring_to_front(id)?)
    }

    /// Plain-text rendering of a note for the host clipboard.
    pub fn clipboard_text(&self, id: &NoteId) -> SessionResult<String> {
        Ok(self.require(id)?.clipboard_text())
    }

    // ---- panel commands --------------------------------------------------

    /// Opens or closes the side panel; returns the new open state.
    pub fn toggle_panel(&mut self) -> SessionResult<bool> {
        self.ensure_running("toggle_panel")?;
        let open = self.panel.toggle();
        if open {
            self.panel.rebuild_from_registry(&self.registry);
        }
        Ok(open)
    }

    /// Moves `dragged` before/after `target` in the panel and canonical
    /// order. Unknown or equal ids are a silent no-op returning `false`.
    pub fn reorder_panel(
        &mut self,
        dragged: &NoteId,
        target: &NoteId,
        insert_after: bool,
    ) -> SessionResult<bool> {
        self.ensure_running("reorder_panel")?;
        if !self.panel.reorder(dragged, target, insert_after) {
            return Ok(false);
        }
        self.registry.reorder_to(self.panel.order());
        self.persist(PersistUrgency::Immediate);
        Ok(true)
    }

    /// Drop of one panel row onto another, sided by drag direction.
    pub fn drop_on_panel(&mut self, dragged: &NoteId, target: &NoteId) -> SessionResult<bool> {
        self.ensure_running("drop_on_panel")?;
        match self.panel.drop_side(dragged, target) {
            Some(insert_after) => self.reorder_panel(dragged, target, insert_after),
            None => Ok(false),
        }
    }

    /// Single click on a panel row: bring to front and pulse a highlight.
    pub fn panel_click(&mut self, id: &NoteId) -> SessionResult<()> {
        self.ensure_running("panel_click")?;
        self.registry.bring_to_front(id)?;
        let now = self.clock.now_ms();
        let duration = self.registry.config().highlight_ms;
        self.panel.highlight(id, now, duration);
        Ok(())
    }

    /// Double click or menu "open": un-hide and pulse an emphasis.
    pub fn open_note(&mut self, id: &NoteId) -> SessionResult<()> {
        self.ensure_running("open_note")?;
        self.set_visible(id, true)?;
        let now = self.clock.now_ms();
        let duration = self.registry.config().emphasis_ms;
        self.panel.emphasize(id, now, duration);
        Ok(())
    }

    // ---- gestures --------------------------------------------------------

    /// Starts a drag (`edge == None`) or edge resize on a note.
    ///
    /// An already-active gesture is ended (and persisted) first. The note is
    /// brought to front.
    pub fn begin_gesture(
        &mut self,
        id: &NoteId,
        edge: Option<ResizeEdge>,
        pointer: Point,
    ) -> SessionResult<()> {
        self.ensure_running("begin_gesture")?;
        self.require(id)?;
        self.preempt_gesture();
        self.registry.bring_to_front(id)?;

        let note = self.require(id)?;
        self.gesture = match edge {
            None => ActiveGesture::Dragging {
                target: DragTarget::Note(id.clone()),
                start_pointer: pointer,
                start_position: note.position,
            },
            Some(edge) => ActiveGesture::Resizing {
                note_id: id.clone(),
                edge,
                start_pointer: pointer,
                start_geometry: note.geometry(),
            },
        };
        debug!(
            "event=gesture_begin module=session status=ok kind={} id={id}",
            self.gesture.kind()
        );
        Ok(())
    }

    /// Starts dragging the panel. `fallback` is where the host currently
    /// shows it when no position has been stored yet.
    pub fn begin_panel_drag(&mut self, pointer: Point, fallback: Point) -> SessionResult<()> {
        self.ensure_running("begin_panel_drag")?;
        self.preempt_gesture();
        self.gesture = ActiveGesture::Dragging {
            target: DragTarget::Panel,
            start_pointer: pointer,
            start_position: self.panel_position.unwrap_or(fallback),
        };
        Ok(())
    }

    /// Starts dragging the floating control bar.
    pub fn begin_control_bar_drag(&mut self, pointer: Point, fallback: Point) -> SessionResult<()> {
        self.ensure_running("begin_control_bar_drag")?;
        self.preempt_gesture();
        self.gesture = ActiveGesture::Dragging {
            target: DragTarget::ControlBar,
            start_pointer: pointer,
            start_position: self.control_position.unwrap_or(fallback),
        };
        Ok(())
    }

    /// Applies one pointer-move sample to the active gesture.
    ///
    /// Returns `None` when no gesture is active, or when its note vanished
    /// (the gesture is then dropped).
    pub fn update_gesture(&mut self, pointer: Point) -> SessionResult<Option<GestureSample>> {
        self.ensure_running("update_gesture")?;
        let note_limits = self
            .gesture
            .note_id()
            .map(|id| self.registry.get(id).map(|note| self.limits_for(note)));
        let limits = match note_limits {
            Some(Some(limits)) => limits,
            Some(None) => {
                let dropped = self.gesture.take();
                debug!(
                    "event=gesture_cancel module=session status=ok kind={} reason=note_missing",
                    dropped.kind()
                );
                return Ok(None);
            }
            None => self.limits_for_expanded(),
        };
        let Some(sample) = self.gesture.sample(pointer, limits) else {
            return Ok(None);
        };

        match (&self.gesture, sample) {
            (
                ActiveGesture::Dragging {
                    target: DragTarget::Note(id),
                    ..
                },
                GestureSample::Moved(position),
            ) => {
                let id = id.clone();
                self.registry.update(
                    &id,
                    NotePatch {
                        position: Some(position),
                        ..NotePatch::default()
                    },
                )?;
            }
            (
                ActiveGesture::Dragging {
                    target: DragTarget::Panel,
                    ..
                },
                GestureSample::Moved(position),
            ) => self.panel_position = Some(position),
            (
                ActiveGesture::Dragging {
                    target: DragTarget::ControlBar,
                    ..
                },
                GestureSample::Moved(position),
            ) => self.control_position = Some(position),
            (ActiveGesture::Resizing { note_id, .. }, GestureSample::Resized(geometry)) => {
                let id = note_id.clone();
                self.registry.update(
                    &id,
                    NotePatch {
                        position: Some(geometry.position),
                        size: Some(geometry.size),
                        ..NotePatch::default()
                    },
                )?;
            }
            _ => {}
        }
        Ok(Some(sample))
    }

    /// Ends the active gesture (pointer-up) and persists its result.
    pub fn end_gesture(&mut self) -> SessionResult<Option<EndedGesture>> {
        self.ensure_running("end_gesture")?;
        Ok(self.finish_gesture("pointer_up"))
    }

    // ---- views and queries -----------------------------------------------

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn config(&self) -> &NoteConfig {
        self.registry.config()
    }

    pub fn registry(&self) -> &NoteRegistry {
        &self.registry
    }

    pub fn note(&self, id: &NoteId) -> Option<&Note> {
        self.registry.get(id)
    }

    pub fn active_gesture(&self) -> &ActiveGesture {
        &self.gesture
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.autosave.is_dirty()
    }

    /// Deadline of the pending debounced write, if any.
    pub fn autosave_deadline_ms(&self) -> Option<u64> {
        self.autosave.deadline_ms()
    }

    /// Message of the most recent failed write, cleared by the next success.
    pub fn last_persist_error(&self) -> Option<&str> {
        self.last_persist_error.as_deref()
    }

    pub fn store(&self) -> &S {
        self.snapshot.medium()
    }

    pub fn store_mut(&mut self) -> &mut S {
        self.snapshot.medium_mut()
    }

    pub fn session_state(&self) -> SessionState {
        SessionState {
            next_color_index: self.registry.next_color_index(),
            panel_open: self.panel.is_open(),
            panel_position: self.panel_position,
            control_position: self.control_position,
        }
    }

    /// Visible notes in paint order (lowest z first).
    pub fn canvas_view(&self) -> Vec<NoteView> {
        let config = self.registry.config();
        let mut views: Vec<NoteView> = self
            .registry
            .iter()
            .filter(|note| note.visible)
            .map(|note| NoteView {
                id: note.id.clone(),
                position: note.position,
                size: note.effective_size(config),
                title: note.title.clone(),
                body: note.body.clone(),
                color: note.color.resolve(config).to_string(),
                opacity: note.opacity,
                z_order: note.z_order,
                collapsed: note.collapsed,
                highlighted: self.panel.has_effect(&note.id, EffectKind::Highlight),
                emphasized: self.panel.has_effect(&note.id, EffectKind::Emphasis),
            })
            .collect();
        views.sort_by_key(|view| view.z_order);
        views
    }

    /// Panel rows in panel order, hidden notes included.
    pub fn panel_view(&self) -> Vec<PanelItem> {
        self.panel.items(&self.registry)
    }

    // ---- internals -------------------------------------------------------

    fn ensure_phase(&self, operation: &'static str, expected: SessionPhase) -> SessionResult<()> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(SessionError::InvalidState {
                operation,
                phase: self.phase,
            })
        }
    }

    fn ensure_running(&self, operation: &'static str) -> SessionResult<()> {
        self.ensure_phase(operation, SessionPhase::Running)
    }

    fn require(&self, id: &NoteId) -> SessionResult<&Note> {
        self.registry
            .get(id)
            .ok_or_else(|| SessionError::NotFound(id.clone()))
    }

    fn set_visible(&mut self, id: &NoteId, visible: bool) -> SessionResult<()> {
        self.registry.update(
            id,
            NotePatch {
                visible: Some(visible),
                ..NotePatch::default()
            },
        )?;
        Ok(())
    }

    fn preempt_gesture(&mut self) {
        if self.gesture.is_active() {
            self.finish_gesture("preempted");
        }
    }

    fn finish_gesture(&mut self, reason: &'static str) -> Option<EndedGesture> {
        let ended = self.gesture.take();
        if !ended.is_active() {
            return None;
        }
        debug!(
            "event=gesture_end module=session status=ok kind={} reason={reason}",
            ended.kind()
        );
        self.persist(PersistUrgency::Immediate);
        Some(EndedGesture {
            kind: ended.kind(),
            note_id: ended.note_id().cloned(),
        })
    }

    fn limits_for(&self, note: &Note) -> SizeLimits {
        let config = self.registry.config();
        SizeLimits {
            min_width: config.min_width,
            min_height: config.min_height_for(note.collapsed),
        }
    }

    fn limits_for_expanded(&self) -> SizeLimits {
        let config = self.registry.config();
        SizeLimits {
            min_width: config.min_width,
            min_height: config.min_height,
        }
    }

    fn apply_session_record(&mut self, record: &SessionStateRecord) {
        self.registry
            .set_next_color_index(record.next_color_index.unwrap_or(0));
        self.panel_position = point_from(record.panel_left, record.panel_top);
        self.control_position = point_from(record.control_left, record.control_top);
    }

    fn session_record(&self) -> SessionStateRecord {
        SessionStateRecord {
            next_color_index: Some(self.registry.next_color_index()),
            panel_left: self.panel_position.map(|p| p.x),
            panel_top: self.panel_position.map(|p| p.y),
            control_left: self.control_position.map(|p| p.x),
            control_top: self.control_position.map(|p| p.y),
        }
    }

    fn persist(&mut self, urgency: PersistUrgency) {
        match urgency {
            PersistUrgency::Immediate => {
                self.persist_now();
            }
            PersistUrgency::Debounced => {
                let now = self.clock.now_ms();
                let window = self.registry.config().content_debounce_ms;
                self.autosave.schedule(now, window);
            }
        }
    }

    fn persist_now(&mut self) -> bool {
        match self.write_snapshot() {
            Ok(count) => {
                self.autosave.mark_saved();
                self.last_persist_error = None;
                info!("event=persist module=session status=ok notes={count}");
                true
            }
            Err(err) => {
                self.autosave.mark_failed();
                error!("event=persist module=session status=error error={err}");
                self.last_persist_error = Some(err.to_string());
                false
            }
        }
    }

    fn write_snapshot(&mut self) -> StoreResult<usize> {
        self.reread_unread_records()?;
        let records = self.registry.serialize();
        self.snapshot.save_notes(&records)?;
        self.snapshot.save_session(&self.session_record())?;
        Ok(records.len())
    }

    // A key that could not be read is never written blind.
    fn reread_unread_records(&mut self) -> StoreResult<()> {
        if self.session_unread {
            let session = self.snapshot.try_load_session()?;
            if matches!(session.status, LoadStatus::Loaded { .. }) {
                self.apply_session_record(&session.record);
            }
            self.session_unread = false;
        }
        if self.notes_unread {
            let notes = self.snapshot.try_load_notes()?;
            self.notes_unread = false;
            if !notes.records.is_empty() {
                let discarded = self.registry.len();
                let restore = self.registry.deserialize(notes.records);
                self.panel.reset();
                self.panel.rebuild_from_registry(&self.registry);
                warn!(
                    "event=session_recover module=session status=ok restored={} discarded={discarded}",
                    restore.restored
                );
            }
        }
        Ok(())
    }
}

fn point_from(x: Option<f64>, y: Option<f64>) -> Option<Point> {
    Some(Point::new(x?, y?))
}
