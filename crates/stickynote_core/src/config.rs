//! Tunable limits and presets for the note window manager.
//!
//! # Responsibility
//! - Hold every capacity, size, opacity and timing constant in one place.
//! - Provide the version-3 default profile and the legacy version-2 profile.
//! - Load and validate JSON config files.
//!
//! # Invariants
//! - A validated config has a non-empty palette of `#rrggbb` entries.
//! - `0 < min_opacity <= max_opacity <= 1`.
//! - Default sizes are never below their minimums.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

static HEX_COLOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").expect("valid hex color regex"));

/// Overlay layer z-index reserved by the host; notes stack above it.
const OVERLAY_Z_INDEX: u64 = 2_147_483_647;

const V3_PALETTE: [&str; 8] = [
    "#fff899", "#c1e7ff", "#d0f0c0", "#ffdbea", "#ffe0b3", "#d9a7ff", "#a8dadc", "#fca311",
];
const V2_PALETTE: [&str; 5] = ["#fff899", "#c1e7ff", "#d0f0c0", "#ffdbea", "#ffe0b3"];

/// Errors raised while loading or validating a config.
#[derive(Debug)]
pub enum ConfigError {
    /// Config file could not be read.
    Io(std::io::Error),
    /// Config text is not valid JSON for `NoteConfig`.
    Json(serde_json::Error),
    /// A field value breaks a config invariant.
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read config: {err}"),
            Self::Json(err) => write!(f, "failed to parse config: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

/// Runtime configuration for registry, geometry, panel and autosave.
///
/// Every field is optional in JSON; missing fields take the version-3
/// defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoteConfig {
    pub max_notes: usize,
    pub palette: Vec<String>,
    pub min_opacity: f64,
    pub max_opacity: f64,
    /// Opacity for new notes and records without one; clamped on use.
    pub default_opacity: f64,
    pub min_width: f64,
    pub min_height: f64,
    pub collapsed_height: f64,
    pub default_width: f64,
    /// Height of new notes, also restored when a note is expanded.
    pub default_height: f64,
    pub spawn_origin: f64,
    pub spawn_jitter: f64,
    pub z_order_base: u64,
    pub content_debounce_ms: u64,
    pub highlight_ms: u64,
    pub emphasis_ms: u64,
    /// Notes record key; the session record uses `<storage_key>_state`.
    pub storage_key: String,
}

impl Default for NoteConfig {
    fn default() -> Self {
        Self {
            max_notes: 10,
            palette: V3_PALETTE.iter().map(|color| color.to_string()).collect(),
            min_opacity: 0.01,
            max_opacity: 0.99,
            default_opacity: 1.0,
            min_width: 150.0,
            min_height: 150.0,
            collapsed_height: 30.0,
            default_width: 250.0,
            default_height: 200.0,
            spawn_origin: 50.0,
            spawn_jitter: 100.0,
            z_order_base: OVERLAY_Z_INDEX + 10,
            content_debounce_ms: 500,
            highlight_ms: 1500,
            emphasis_ms: 1000,
            storage_key: "sticky_notes_global_v2".to_string(),
        }
    }
}

impl NoteConfig {
    /// Version-2 profile: five colors and a [0.1, 0.9] opacity range.
    pub fn legacy_v2() -> Self {
        Self {
            palette: V2_PALETTE.iter().map(|color| color.to_string()).collect(),
            min_opacity: 0.1,
            max_opacity: 0.9,
            ..Self::default()
        }
    }

    /// Parses and validates a JSON config document.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw).map_err(ConfigError::Json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_json_str(&raw)
    }

    /// Checks config invariants.
    ///
    /// # Errors
    /// - Returns `ConfigError::Invalid` naming the first broken field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_notes == 0 {
            return Err(invalid("max_notes must be at least 1"));
        }
        if self.palette.is_empty() {
            return Err(invalid("palette must not be empty"));
        }
        if let Some(entry) = self.palette.iter().find(|entry| !is_hex_color(entry)) {
            return Err(invalid(format!(
                "palette entry `{entry}` is not a #rrggbb color"
            )));
        }
        if !(self.min_opacity > 0.0
            && self.min_opacity <= self.max_opacity
            && self.max_opacity <= 1.0)
        {
            return Err(invalid(format!(
                "opacity range [{}, {}] must satisfy 0 < min <= max <= 1",
                self.min_opacity, self.max_opacity
            )));
        }
        if self.min_width <= 0.0 || self.min_height <= 0.0 || self.collapsed_height <= 0.0 {
            return Err(invalid("minimum sizes must be positive"));
        }
        if self.collapsed_height > self.min_height {
            return Err(invalid("collapsed_height must not exceed min_height"));
        }
        if self.default_width < self.min_width || self.default_height < self.min_height {
            return Err(invalid("default size must not be below the minimum size"));
        }
        if self.spawn_jitter < 0.0 {
            return Err(invalid("spawn_jitter must not be negative"));
        }
        if self.storage_key.trim().is_empty() {
            return Err(invalid("storage_key must not be blank"));
        }
        Ok(())
    }

    /// Key of the notes array record.
    pub fn notes_key(&self) -> &str {
        self.storage_key.as_str()
    }

    /// Key of the session state record.
    pub fn session_key(&self) -> String {
        format!("{}_state", self.storage_key)
    }

    /// Minimum height for the given collapse state.
    pub fn min_height_for(&self, collapsed: bool) -> f64 {
        if collapsed {
            self.collapsed_height
        } else {
            self.min_height
        }
    }

    /// Clamps any real value into `[min_opacity, max_opacity]`.
    ///
    /// NaN maps to the upper bound (fully opaque within range).
    pub fn clamp_opacity(&self, value: f64) -> f64 {
        if value.is_nan() {
            return self.max_opacity;
        }
        value.clamp(self.min_opacity, self.max_opacity)
    }

    /// Palette entry for `index`, or entry 0 when out of range.
    pub fn palette_color(&self, index: usize) -> &str {
        self.palette
            .get(index)
            .or_else(|| self.palette.first())
            .map(String::as_str)
            .unwrap_or("#fff899")
    }
}

/// Returns whether `value` is a `#rrggbb` color literal.
pub fn is_hex_color(value: &str) -> bool {
    HEX_COLOR_RE.is_match(value)
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}
