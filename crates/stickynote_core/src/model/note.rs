//! Note window domain model.
//!
//! # Responsibility
//! - Define the canonical in-memory note entity and its identifiers.
//! - Provide creation drafts and partial-update patches.
//! - Derive host-independent projections (effective size, clipboard text).
//!
//! # Invariants
//! - `id` is stable for the note lifetime and never reused.
//! - `body` is an opaque blob; only the clipboard projection looks inside it.
//! - Geometry and opacity bounds are enforced by the registry, which is the
//!   only writer of `Note` values.

use crate::config::{is_hex_color, NoteConfig};
use crate::geometry::{Geometry, Point, Size};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

static BREAK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").expect("valid break regex"));
static BLOCK_END_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)</(p|div|li|h[1-6]|blockquote|pre)\s*>").expect("valid block regex")
});
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));
static BLANK_RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("valid blank-run regex"));

/// Opaque stable note identifier.
///
/// Fresh ids look like `note-<uuid>`; ids restored from storage are kept
/// verbatim whatever their shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    /// Creates a new globally unique id.
    pub fn generate() -> Self {
        Self(format!("note-{}", Uuid::new_v4().simple()))
    }

    /// Wraps an externally supplied id; blank values are rejected.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for NoteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Chosen background color, persisted explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteColor {
    /// Index into the configured palette.
    Palette(usize),
    /// Custom `#rrggbb` value picked outside the palette.
    Custom(String),
}

impl NoteColor {
    /// Coerces invalid choices to palette entry 0.
    ///
    /// Custom values are lowercased so equal colors compare equal.
    pub fn normalized(self, config: &NoteConfig) -> Self {
        match self {
            Self::Palette(index) if index < config.palette.len() => Self::Palette(index),
            Self::Palette(_) => Self::Palette(0),
            Self::Custom(value) if is_hex_color(value.trim()) => {
                Self::Custom(value.trim().to_ascii_lowercase())
            }
            Self::Custom(_) => Self::Palette(0),
        }
    }

    /// Resolved `#rrggbb` value for rendering.
    pub fn resolve<'a>(&'a self, config: &'a NoteConfig) -> &'a str {
        match self {
            Self::Palette(index) => config.palette_color(*index),
            Self::Custom(value) => value.as_str(),
        }
    }

    /// Palette index to persist; custom colors persist index 0 next to the
    /// custom value.
    pub fn palette_index(&self) -> usize {
        match self {
            Self::Palette(index) => *index,
            Self::Custom(_) => 0,
        }
    }

    pub fn custom_value(&self) -> Option<&str> {
        match self {
            Self::Palette(_) => None,
            Self::Custom(value) => Some(value.as_str()),
        }
    }
}

impl Default for NoteColor {
    fn default() -> Self {
        Self::Palette(0)
    }
}

/// One floating note window.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub id: NoteId,
    pub position: Point,
    /// Stored size; see [`Note::effective_size`] for what is shown.
    pub size: Size,
    pub title: String,
    /// Rich content blob, stored and persisted as-is.
    pub body: String,
    pub color: NoteColor,
    pub opacity: f64,
    pub collapsed: bool,
    /// Stacking key; higher renders above lower. Not persisted.
    pub z_order: u64,
    /// `false` when minimized or closed. Not persisted.
    pub visible: bool,
}

impl Note {
    pub fn geometry(&self) -> Geometry {
        Geometry::new(self.position, self.size)
    }

    /// Size as rendered: collapsed notes are forced to the collapsed height.
    pub fn effective_size(&self, config: &NoteConfig) -> Size {
        if self.collapsed {
            Size::new(self.size.width, config.collapsed_height)
        } else {
            self.size
        }
    }

    /// Label shown in the side panel.
    pub fn panel_label(&self) -> &str {
        if self.title.trim().is_empty() {
            "(untitled)"
        } else {
            self.title.as_str()
        }
    }

    /// Text placed on the clipboard by the copy command.
    ///
    /// Format: `[<title or Untitled>]`, a blank line, then the body as plain
    /// text.
    pub fn clipboard_text(&self) -> String {
        let title = if self.title.is_empty() {
            "Untitled"
        } else {
            self.title.as_str()
        };
        format!("[{title}]\n\n{}", plain_text(&self.body))
    }
}

/// Optional fields supplied when creating a note.
///
/// Unset fields take configured defaults; an unset position is randomized
/// and an unset color comes from the palette round-robin.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteDraft {
    pub id: Option<NoteId>,
    pub position: Option<Point>,
    pub size: Option<Size>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub color: Option<NoteColor>,
    pub opacity: Option<f64>,
    pub collapsed: bool,
}

impl NoteDraft {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }
}

/// Partial mutation applied by `NoteRegistry::update`.
///
/// Out-of-range values are clamped, never rejected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotePatch {
    pub position: Option<Point>,
    pub size: Option<Size>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub color: Option<NoteColor>,
    pub opacity: Option<f64>,
    pub collapsed: Option<bool>,
    pub visible: Option<bool>,
}

/// Converts a markup body into the text a reader would see.
pub fn plain_text(body: &str) -> String {
    let with_breaks = BREAK_RE.replace_all(body, "\n");
    let with_blocks = BLOCK_END_RE.replace_all(&with_breaks, "\n");
    let stripped = TAG_RE.replace_all(&with_blocks, "");
    let decoded = decode_entities(&stripped);
    let collapsed = BLANK_RUN_RE.replace_all(&decoded, "\n\n");
    collapsed.trim_end().to_string()
}

fn decode_entities(value: &str) -> String {
    value
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
