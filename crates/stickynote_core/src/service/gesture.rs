//! Single active-gesture slot shared by every draggable surface.
//!
//! # Invariants
//! - At most one drag or resize is active across all notes, the panel and
//!   the control bar.
//! - Each sample is computed from the snapshot taken at `begin`, never from
//!   the previous sample.

use crate::geometry::{resize, translate, Geometry, Point, ResizeEdge, SizeLimits};
use crate::model::note::NoteId;

/// What a drag gesture moves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragTarget {
    Note(NoteId),
    Panel,
    ControlBar,
}

impl DragTarget {
    pub fn note_id(&self) -> Option<&NoteId> {
        match self {
            Self::Note(id) => Some(id),
            Self::Panel | Self::ControlBar => None,
        }
    }
}

/// The one in-flight pointer gesture.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ActiveGesture {
    #[default]
    None,
    Dragging {
        target: DragTarget,
        start_pointer: Point,
        start_position: Point,
    },
    Resizing {
        note_id: NoteId,
        edge: ResizeEdge,
        start_pointer: Point,
        start_geometry: Geometry,
    },
}

/// Result of applying one pointer sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureSample {
    Moved(Point),
    Resized(Geometry),
}

impl ActiveGesture {
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// Note the gesture acts on, if any.
    pub fn note_id(&self) -> Option<&NoteId> {
        match self {
            Self::None => None,
            Self::Dragging { target, .. } => target.note_id(),
            Self::Resizing { note_id, .. } => Some(note_id),
        }
    }

    /// Short name used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Dragging {
                target: DragTarget::Note(_),
                ..
            } => "drag_note",
            Self::Dragging {
                target: DragTarget::Panel,
                ..
            } => "drag_panel",
            Self::Dragging {
                target: DragTarget::ControlBar,
                ..
            } => "drag_controls",
            Self::Resizing { .. } => "resize_note",
        }
    }

    /// Computes the geometry for `pointer`. `limits` only matters for
    /// resizes and must reflect the note's current collapse state.
    pub fn sample(&self, pointer: Point, limits: SizeLimits) -> Option<GestureSample> {
        match self {
            Self::None => None,
            Self::Dragging {
                start_pointer,
                start_position,
                ..
            } => Some(GestureSample::Moved(translate(
                *start_position,
                *start_pointer,
                pointer,
            ))),
            Self::Resizing {
                edge,
                start_pointer,
                start_geometry,
                ..
            } => Some(GestureSample::Resized(resize(
                *edge,
                *start_geometry,
                *start_pointer,
                pointer,
                limits,
            ))),
        }
    }

    /// Empties the slot and returns what was in it.
    pub fn take(&mut self) -> ActiveGesture {
        std::mem::take(self)
    }
}

#[cfg(test)]
mod tests {
    use super::{ActiveGesture, DragTarget, GestureSample};
    use crate::geometry::{Geometry, Point, ResizeEdge, Size, SizeLimits};
    use crate::model::note::NoteId;

    const LIMITS: SizeLimits = SizeLimits {
        min_width: 150.0,
        min_height: 150.0,
    };

    #[test]
    fn drag_sample_translates_from_start_snapshot() {
        let gesture = ActiveGesture::Dragging {
            target: DragTarget::Panel,
            start_pointer: Point::new(5.0, 5.0),
            start_position: Point::new(100.0, 100.0),
        };
        assert_eq!(
            gesture.sample(Point::new(15.0, -5.0), LIMITS),
            Some(GestureSample::Moved(Point::new(110.0, 90.0)))
        );
        assert_eq!(gesture.note_id(), None);
    }

    #[test]
    fn take_leaves_slot_empty() {
        let id = NoteId::generate();
        let mut slot = ActiveGesture::Resizing {
            note_id: id.clone(),
            edge: ResizeEdge::Right,
            start_pointer: Point::new(0.0, 0.0),
            start_geometry: Geometry::new(Point::new(0.0, 0.0), Size::new(250.0, 200.0)),
        };
        let taken = slot.take();
        assert_eq!(taken.note_id(), Some(&id));
        assert!(!slot.is_active());
        assert_eq!(slot.sample(Point::new(1.0, 1.0), LIMITS), None);
    }
}
