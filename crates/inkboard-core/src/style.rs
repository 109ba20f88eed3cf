//! Drawing style configuration.

use crate::tools::ToolKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Smallest accepted stroke width in logical pixels.
pub const MIN_STROKE_WIDTH: f64 = 1.0;
/// Largest accepted stroke width in logical pixels.
pub const MAX_STROKE_WIDTH: f64 = 30.0;
/// Smallest accepted font size in logical pixels.
pub const MIN_FONT_SIZE: f64 = 8.0;
/// Largest accepted font size in logical pixels.
pub const MAX_FONT_SIZE: f64 = 48.0;

/// Style errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StyleError {
    #[error("Invalid color: {0}")]
    InvalidColor(String),
}

/// Serializable color representation (RGBA8), written as a hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }

    pub fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa` (the leading `#` is optional).
    pub fn from_hex(text: &str) -> Result<Self, StyleError> {
        let invalid = || StyleError::InvalidColor(text.to_string());
        let hex = text.trim().trim_start_matches('#');
        if !hex.is_ascii() {
            return Err(invalid());
        }

        let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());
        match hex.len() {
            3 => {
                let mut rgb = [0u8; 3];
                for (i, slot) in rgb.iter_mut().enumerate() {
                    let v = channel(&hex[i..i + 1])?;
                    *slot = v * 17;
                }
                Ok(Self::new(rgb[0], rgb[1], rgb[2], 255))
            }
            6 => Ok(Self::new(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
                255,
            )),
            8 => Ok(Self::new(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
                channel(&hex[6..8])?,
            )),
            _ => Err(invalid()),
        }
    }

    /// Format as `#rrggbb`, or `#rrggbbaa` when not fully opaque.
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl TryFrom<String> for SerializableColor {
    type Error = StyleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<SerializableColor> for String {
    fn from(color: SerializableColor) -> Self {
        color.to_hex()
    }
}

/// Style applied to the next drawing operation.
///
/// The engine snapshots the style when a gesture begins, so changes made while
/// a gesture is in progress only affect the following gesture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StyleConfig {
    /// Active tool.
    pub tool: ToolKind,
    /// Stroke and fill color.
    pub stroke_color: SerializableColor,
    /// Stroke width in logical pixels (1-30).
    pub stroke_width: f64,
    /// Font size in logical pixels (8-48).
    pub font_size: f64,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            tool: ToolKind::Brush,
            stroke_color: SerializableColor::black(),
            stroke_width: 3.0,
            font_size: 16.0,
        }
    }
}

impl StyleConfig {
    /// Bring numeric values into range. Non-finite values fall back to the
    /// defaults.
    pub fn clamped(mut self) -> Self {
        let defaults = Self::default();
        self.stroke_width = if self.stroke_width.is_finite() {
            self.stroke_width.clamp(MIN_STROKE_WIDTH, MAX_STROKE_WIDTH)
        } else {
            defaults.stroke_width
        };
        self.font_size = if self.font_size.is_finite() {
            self.font_size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE)
        } else {
            defaults.font_size
        };
        self
    }

    /// Apply a partial update. Numeric values are clamped to their ranges and an
    /// unparsable color leaves the current one untouched.
    /// Returns true if anything changed.
    pub fn apply(&mut self, patch: &StylePatch) -> bool {
        let before = self.clone();

        if let Some(tool) = patch.tool {
            self.tool = tool;
        }
        if let Some(color) = &patch.stroke_color {
            match SerializableColor::from_hex(color) {
                Ok(color) => self.stroke_color = color,
                Err(e) => log::warn!("Ignoring style color: {}", e),
            }
        }
        if let Some(width) = patch.stroke_width.filter(|w| w.is_finite()) {
            self.stroke_width = width.clamp(MIN_STROKE_WIDTH, MAX_STROKE_WIDTH);
        }
        if let Some(size) = patch.font_size.filter(|s| s.is_finite()) {
            self.font_size = size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
        }

        *self != before
    }
}

/// Partial style update supplied by the toolbar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StylePatch {
    pub tool: Option<ToolKind>,
    /// Hex color string.
    pub stroke_color: Option<String>,
    pub stroke_width: Option<f64>,
    pub font_size: Option<f64>,
}

impl StylePatch {
    pub fn tool(tool: ToolKind) -> Self {
        Self {
            tool: Some(tool),
            ..Default::default()
        }
    }

    pub fn with_color(mut self, color: &str) -> Self {
        self.stroke_color = Some(color.to_string());
        self
    }

    pub fn with_stroke_width(mut self, width: f64) -> Self {
        self.stroke_width = Some(width);
        self
    }

    pub fn with_font_size(mut self, size: f64) -> Self {
        self.font_size = Some(size);
        self
    }
}
