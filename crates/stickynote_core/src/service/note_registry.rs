//! Authoritative in-memory set of note windows.
//!
//! # Responsibility
//! - Create, delete, mutate and look up notes.
//! - Serialize to and restore from persisted records.
//! - Own palette round-robin and z-order allocation for new notes.
//!
//! # Invariants
//! - Ids are unique; at most `max_notes` notes are live.
//! - Width/height never fall below the minimum for the note's collapse
//!   state; opacity is always inside the configured range.
//! - Iteration order is canonical order: insertion order until the panel
//!   reconciles a manual reorder through `reorder_to`.
//! - Mutations never change z-order except `bring_to_front`.

use crate::config::NoteConfig;
use crate::geometry::{Point, Size, SizeLimits};
use crate::model::note::{Note, NoteColor, NoteDraft, NoteId, NotePatch};
use crate::model::record::NoteRecord;
use crate::service::zorder::ZOrderAllocator;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors from registry operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Live note count already at the configured limit.
    CapacityExceeded { limit: usize },
    /// No live note has this id.
    NotFound(NoteId),
    /// A draft asked for an id that is already live.
    DuplicateId(NoteId),
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CapacityExceeded { limit } => write!(f, "note limit of {limit} reached"),
            Self::NotFound(id) => write!(f, "note not found: {id}"),
            Self::DuplicateId(id) => write!(f, "note id already in use: {id}"),
        }
    }
}

impl Error for RegistryError {}

/// Outcome of `NoteRegistry::deserialize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RestoreReport {
    pub restored: usize,
    /// Records whose id was missing or duplicated and got a fresh one.
    pub reassigned_ids: usize,
    /// Records beyond `max_notes`.
    pub dropped: usize,
}

pub struct NoteRegistry {
    config: NoteConfig,
    notes: Vec<Note>,
    zorder: ZOrderAllocator,
    next_color_index: usize,
    rng: StdRng,
}

impl NoteRegistry {
    /// Creates an empty registry with entropy-seeded placement.
    pub fn new(config: NoteConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Creates an empty registry with reproducible placement.
    pub fn with_seed(config: NoteConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: NoteConfig, rng: StdRng) -> Self {
        Self {
            zorder: ZOrderAllocator::new(config.z_order_base),
            config,
            notes: Vec::new(),
            next_color_index: 0,
            rng,
        }
    }

    pub fn config(&self) -> &NoteConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.notes.len() >= self.config.max_notes
    }

    pub fn get(&self, id: &NoteId) -> Option<&Note> {
        self.notes.iter().find(|note| &note.id == id)
    }

    pub fn contains(&self, id: &NoteId) -> bool {
        self.get(id).is_some()
    }

    /// Notes in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = &Note> {
        self.notes.iter()
    }

    pub fn ids(&self) -> Vec<NoteId> {
        self.notes.iter().map(|note| note.id.clone()).collect()
    }

    /// Palette index the next created note will take.
    pub fn next_color_index(&self) -> usize {
        self.next_color_index
    }

    /// Restores the round-robin cursor, wrapping into the palette.
    pub fn set_next_color_index(&mut self, index: usize) {
        self.next_color_index = index % self.config.palette.len().max(1);
    }

    /// Creates one note from `draft`.
    ///
    /// # Errors
    /// - `CapacityExceeded` when `max_notes` notes are live; nothing changes.
    /// - `DuplicateId` when `draft.id` is already live.
    pub fn create(&mut self, draft: NoteDraft) -> RegistryResult<&Note> {
        if self.is_full() {
            warn!(
                "event=note_create module=registry status=rejected reason=capacity limit={}",
                self.config.max_notes
            );
            return Err(RegistryError::CapacityExceeded {
                limit: self.config.max_notes,
            });
        }

        let id = match draft.id {
            Some(id) if self.contains(&id) => return Err(RegistryError::DuplicateId(id)),
            Some(id) => id,
            None => self.fresh_id(),
        };
        let color = match draft.color {
            Some(color) => color.normalized(&self.config),
            None => self.take_round_robin_color(),
        };
        let position = match draft.position {
            Some(position) => position,
            None => self.random_position(),
        };
        let collapsed = draft.collapsed;
        let size = draft
            .size
            .unwrap_or_else(|| self.default_size(collapsed))
            .clamped(self.limits(collapsed));
        let opacity = self
            .config
            .clamp_opacity(draft.opacity.unwrap_or(self.config.default_opacity));

        let note = Note {
            id,
            position,
            size,
            title: draft.title.unwrap_or_default(),
            body: draft.body.unwrap_or_default(),
            color,
            opacity,
            collapsed,
            z_order: self.zorder.allocate(),
            visible: true,
        };
        info!(
            "event=note_create module=registry status=ok id={} count={}",
            note.id,
            self.notes.len() + 1
        );
        self.notes.push(note);
        Ok(&self.notes[self.notes.len() - 1])
    }

    /// Removes a note; an unknown id is a silent no-op returning `None`.
    pub fn delete(&mut self, id: &NoteId) -> Option<Note> {
        let index = self.index_of(id)?;
        let removed = self.notes.remove(index);
        info!(
            "event=note_delete module=registry status=ok id={} count={}",
            removed.id,
            self.notes.len()
        );
        Some(removed)
    }

    /// Applies a partial mutation, clamping out-of-range values.
    ///
    /// Collapse changes apply first: collapsing sets the height to
    /// `collapsed_height`, expanding restores `default_height`. A size in
    /// the same patch is then clamped against the new state.
    ///
    /// # Errors
    /// - `NotFound` when `id` is not live.
    pub fn update(&mut self, id: &NoteId, patch: NotePatch) -> RegistryResult<&Note> {
        let index = self
            .index_of(id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))?;
        let config = &self.config;
        let note = &mut self.notes[index];

        if let Some(collapsed) = patch.collapsed {
            if collapsed != note.collapsed {
                note.collapsed = collapsed;
                note.size.height = if collapsed {
                    config.collapsed_height
                } else {
                    config.default_height
                };
            }
        }
        if let Some(position) = patch.position.filter(|p| p.x.is_finite() && p.y.is_finite()) {
            note.position = position;
        }
        if let Some(size) = patch.size {
            let size = Size::new(
                finite_or(size.width, note.size.width),
                finite_or(size.height, note.size.height),
            );
            note.size = size.clamped(SizeLimits {
                min_width: config.min_width,
                min_height: config.min_height_for(note.collapsed),
            });
        }
        if let Some(title) = patch.title {
            note.title = title;
        }
        if let Some(body) = patch.body {
            note.body = body;
        }
        if let Some(color) = patch.color {
            note.color = color.normalized(config);
        }
        if let Some(opacity) = patch.opacity {
            note.opacity = config.clamp_opacity(opacity);
        }
        if let Some(visible) = patch.visible {
            note.visible = visible;
        }

        debug!("event=note_update module=registry status=ok id={}", note.id);
        Ok(&self.notes[index])
    }

    /// Stacks `id` above every other note.
    pub fn bring_to_front(&mut self, id: &NoteId) -> RegistryResult<u64> {
        let index = self
            .index_of(id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))?;
        Ok(self.zorder.bring_to_front(&mut self.notes[index]))
    }

    /// Hides every note without deleting any; returns how many were visible.
    pub fn hide_all(&mut self) -> usize {
        let mut hidden = 0;
        for note in self.notes.iter_mut().filter(|note| note.visible) {
            note.visible = false;
            hidden += 1;
        }
        hidden
    }

    /// Rearranges canonical order to follow `order`.
    ///
    /// Ids in `order` that are not live are ignored; live notes missing from
    /// `order` keep their relative order after the listed ones.
    pub fn reorder_to(&mut self, order: &[NoteId]) {
        let mut remaining = std::mem::take(&mut self.notes);
        let mut reordered = Vec::with_capacity(remaining.len());
        for id in order {
            if let Some(index) = remaining.iter().position(|note| &note.id == id) {
                reordered.push(remaining.remove(index));
            }
        }
        reordered.append(&mut remaining);
        self.notes = reordered;
    }

    /// Persisted records in canonical order.
    ///
    /// Z-order and visibility are not part of the record.
    pub fn serialize(&self) -> Vec<NoteRecord> {
        self.notes
            .iter()
            .map(|note| NoteRecord {
                id: Some(note.id.as_str().to_string()),
                left: Some(note.position.x),
                top: Some(note.position.y),
                width: Some(note.size.width),
                height: Some(note.size.height),
                content: note.body.clone(),
                title: note.title.clone(),
                color_index: Some(note.color.palette_index()),
                custom_color: note.color.custom_value().map(str::to_string),
                is_collapsed: note.collapsed,
                opacity: Some(note.opacity),
            })
            .collect()
    }

    /// Replaces every note with the given records.
    ///
    /// Missing fields default: color index 0, `default_opacity`, randomized
    /// position, default size. Missing or duplicate ids get fresh ones.
    /// Records past `max_notes` are dropped. Z-order restarts at its base.
    pub fn deserialize(&mut self, records: Vec<NoteRecord>) -> RestoreReport {
        self.notes.clear();
        self.zorder = ZOrderAllocator::new(self.config.z_order_base);

        let mut report = RestoreReport::default();
        let mut seen = HashSet::new();
        for record in records {
            if self.is_full() {
                report.dropped += 1;
                continue;
            }
            let id = match record.id.as_deref().and_then(NoteId::parse) {
                Some(id) if !seen.contains(&id) => id,
                _ => {
                    report.reassigned_ids += 1;
                    self.fresh_id()
                }
            };
            seen.insert(id.clone());
            let note = self.note_from_record(id, record);
            self.notes.push(note);
            report.restored += 1;
        }

        if report.dropped > 0 {
            warn!(
                "event=note_restore module=registry status=truncated dropped={} limit={}",
                report.dropped, self.config.max_notes
            );
        }
        info!(
            "event=note_restore module=registry status=ok restored={} reassigned_ids={}",
            report.restored, report.reassigned_ids
        );
        report
    }

    fn note_from_record(&mut self, id: NoteId, record: NoteRecord) -> Note {
        let collapsed = record.is_collapsed;
        let position = match (record.left, record.top) {
            (Some(x), Some(y)) => Point::new(x, y),
            (x, y) => {
                let random = self.random_position();
                Point::new(x.unwrap_or(random.x), y.unwrap_or(random.y))
            }
        };
        let defaults = self.default_size(collapsed);
        let size = Size::new(
            record.width.unwrap_or(defaults.width),
            record.height.unwrap_or(defaults.height),
        )
        .clamped(self.limits(collapsed));
        let color = match record.custom_color {
            Some(custom) => NoteColor::Custom(custom),
            None => NoteColor::Palette(record.color_index.unwrap_or(0)),
        }
        .normalized(&self.config);
        let opacity = self
            .config
            .clamp_opacity(record.opacity.unwrap_or(self.config.default_opacity));

        Note {
            id,
            position,
            size,
            title: record.title,
            body: record.content,
            color,
            opacity,
            collapsed,
            z_order: self.zorder.allocate(),
            visible: true,
        }
    }

    fn index_of(&self, id: &NoteId) -> Option<usize> {
        self.notes.iter().position(|note| &note.id == id)
    }

    fn fresh_id(&self) -> NoteId {
        loop {
            let id = NoteId::generate();
            if !self.contains(&id) {
                return id;
            }
        }
    }

    fn take_round_robin_color(&mut self) -> NoteColor {
        let palette_len = self.config.palette.len().max(1);
        let index = self.next_color_index % palette_len;
        self.next_color_index = (index + 1) % palette_len;
        NoteColor::Palette(index)
    }

    fn random_position(&mut self) -> Point {
        let origin = self.config.spawn_origin;
        let jitter = self.config.spawn_jitter;
        if jitter <= 0.0 {
            return Point::new(origin, origin);
        }
        Point::new(
            origin + self.rng.gen_range(0.0..jitter),
            origin + self.rng.gen_range(0.0..jitter),
        )
    }

    fn default_size(&self, collapsed: bool) -> Size {
        let height = if collapsed {
            self.config.collapsed_height
        } else {
            self.config.default_height
        };
        Size::new(self.config.default_width, height)
    }

    fn limits(&self, collapsed: bool) -> SizeLimits {
        SizeLimits {
            min_width: self.config.min_width,
            min_height: self.config.min_height_for(collapsed),
        }
    }
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}
