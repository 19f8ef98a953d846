//! Side panel list mirroring the note registry.
//!
//! # Responsibility
//! - Keep an explicit, user-orderable sequence of note ids.
//! - Track transient presentation effects (highlight, emphasis) with expiry.
//!
//! # Invariants
//! - After `rebuild_from_registry`, `order` holds exactly the live ids,
//!   survivors in their previous relative order and new ids appended.
//! - Reordering never touches z-order or geometry.
//! - Effects are presentation only and never persisted.

use crate::model::note::NoteId;
use crate::service::note_registry::NoteRegistry;
use log::debug;
use std::collections::HashSet;

/// Kind of timed visual pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectKind {
    /// Outline after a single click on a panel item.
    Highlight,
    /// Glow after opening a note from the panel.
    Emphasis,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransientEffect {
    pub note_id: NoteId,
    pub kind: EffectKind,
    pub expires_at_ms: u64,
}

/// One row of the side panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelItem {
    pub id: NoteId,
    pub label: String,
    pub visible: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PanelSynchronizer {
    order: Vec<NoteId>,
    reconciled: bool,
    open: bool,
    effects: Vec<TransientEffect>,
}

impl PanelSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current panel order.
    pub fn order(&self) -> &[NoteId] {
        &self.order
    }

    /// Whether a manual reorder has happened since the last reset.
    pub fn is_reconciled(&self) -> bool {
        self.reconciled
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Flips the open flag and returns the new value.
    pub fn toggle(&mut self) -> bool {
        self.open = !self.open;
        self.open
    }

    /// Forgets order and effects, e.g. before a wholesale restore.
    pub fn reset(&mut self) {
        self.order.clear();
        self.effects.clear();
        self.reconciled = false;
    }

    /// Syncs `order` with the registry's live ids.
    pub fn rebuild_from_registry(&mut self, registry: &NoteRegistry) {
        let live: HashSet<&NoteId> = registry.iter().map(|note| &note.id).collect();
        self.order.retain(|id| live.contains(id));
        self.effects.retain(|effect| live.contains(&effect.note_id));

        let known: HashSet<NoteId> = self.order.iter().cloned().collect();
        for note in registry.iter() {
            if !known.contains(&note.id) {
                self.order.push(note.id.clone());
            }
        }
    }

    /// Moves `dragged` directly before or after `target`.
    ///
    /// Returns `false` without changes when either id is missing or both are
    /// the same.
    pub fn reorder(&mut self, dragged: &NoteId, target: &NoteId, insert_after: bool) -> bool {
        if dragged == target {
            return false;
        }
        let (Some(from), Some(_)) = (self.position(dragged), self.position(target)) else {
            return false;
        };

        let moved = self.order.remove(from);
        // Target index shifts once `dragged` is out of the list.
        let Some(target_index) = self.position(target) else {
            self.order.insert(from, moved);
            return false;
        };
        let insert_at = if insert_after {
            target_index + 1
        } else {
            target_index
        };
        self.order.insert(insert_at, moved);
        self.reconciled = true;
        debug!(
            "event=panel_reorder module=panel status=ok dragged={dragged} target={target} after={insert_after}"
        );
        true
    }

    /// Insert side for a drop of `dragged` onto `target`: after the target
    /// when dragging downward, before it when dragging upward.
    pub fn drop_side(&self, dragged: &NoteId, target: &NoteId) -> Option<bool> {
        let from = self.position(dragged)?;
        let to = self.position(target)?;
        if from == to {
            return None;
        }
        Some(from < to)
    }

    /// Rows in panel order.
    pub fn items(&self, registry: &NoteRegistry) -> Vec<PanelItem> {
        self.order
            .iter()
            .filter_map(|id| registry.get(id))
            .map(|note| PanelItem {
                id: note.id.clone(),
                label: note.panel_label().to_string(),
                visible: note.visible,
            })
            .collect()
    }

    /// Highlights `id`, clearing any other highlight.
    pub fn highlight(&mut self, id: &NoteId, now_ms: u64, duration_ms: u64) {
        self.effects
            .retain(|effect| effect.kind != EffectKind::Highlight);
        self.effects.push(TransientEffect {
            note_id: id.clone(),
            kind: EffectKind::Highlight,
            expires_at_ms: now_ms.saturating_add(duration_ms),
        });
    }

    /// Emphasizes `id`, restarting its emphasis if one is running.
    pub fn emphasize(&mut self, id: &NoteId, now_ms: u64, duration_ms: u64) {
        self.effects
            .retain(|effect| !(effect.kind == EffectKind::Emphasis && &effect.note_id == id));
        self.effects.push(TransientEffect {
            note_id: id.clone(),
            kind: EffectKind::Emphasis,
            expires_at_ms: now_ms.saturating_add(duration_ms),
        });
    }

    /// Drops effects whose deadline has passed; returns how many.
    pub fn expire(&mut self, now_ms: u64) -> usize {
        let before = self.effects.len();
        self.effects.retain(|effect| effect.expires_at_ms > now_ms);
        before - self.effects.len()
    }

    pub fn has_effect(&self, id: &NoteId, kind: EffectKind) -> bool {
        self.effects
            .iter()
            .any(|effect| effect.kind == kind && &effect.note_id == id)
    }

    pub fn effects(&self) -> &[TransientEffect] {
        &self.effects
    }

    fn position(&self, id: &NoteId) -> Option<usize> {
        self.order.iter().position(|candidate| candidate == id)
    }
}
