//! Tool kinds and gesture tracking.

use crate::style::StyleConfig;
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Available tools.
///
/// Tool names are kebab-case (`filled-rectangle`). Names that do not match a
/// known tool parse as [`ToolKind::Unsupported`], which draws nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum ToolKind {
    #[default]
    Brush,
    Eraser,
    Line,
    Rectangle,
    FilledRectangle,
    Circle,
    FilledCircle,
    Arrow,
    Text,
    Unsupported,
}

/// How the live preview of a tool is composited while a gesture is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositionStrategy {
    /// Draw each segment straight onto the live buffer and advance the anchor.
    Accumulate,
    /// Repaint the last committed frame, then draw from the fixed anchor.
    RestoreAndRedraw,
    /// No stroke events; the tool opens a text entry instead.
    TextEntry,
}

impl ToolKind {
    /// All tools that produce drawing output.
    pub const ALL: [ToolKind; 9] = [
        ToolKind::Brush,
        ToolKind::Eraser,
        ToolKind::Line,
        ToolKind::Rectangle,
        ToolKind::FilledRectangle,
        ToolKind::Circle,
        ToolKind::FilledCircle,
        ToolKind::Arrow,
        ToolKind::Text,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ToolKind::Brush => "brush",
            ToolKind::Eraser => "eraser",
            ToolKind::Line => "line",
            ToolKind::Rectangle => "rectangle",
            ToolKind::FilledRectangle => "filled-rectangle",
            ToolKind::Circle => "circle",
            ToolKind::FilledCircle => "filled-circle",
            ToolKind::Arrow => "arrow",
            ToolKind::Text => "text",
            ToolKind::Unsupported => "unsupported",
        }
    }

    pub fn strategy(self) -> CompositionStrategy {
        match self {
            // Unsupported tools draw nothing, so they need no restore either.
            ToolKind::Brush | ToolKind::Eraser | ToolKind::Unsupported => {
                CompositionStrategy::Accumulate
            }
            ToolKind::Line
            | ToolKind::Rectangle
            | ToolKind::FilledRectangle
            | ToolKind::Circle
            | ToolKind::FilledCircle
            | ToolKind::Arrow => CompositionStrategy::RestoreAndRedraw,
            ToolKind::Text => CompositionStrategy::TextEntry,
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ToolKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tool = ToolKind::ALL
            .into_iter()
            .find(|tool| tool.name() == s)
            .unwrap_or(ToolKind::Unsupported);
        Ok(tool)
    }
}

impl From<String> for ToolKind {
    fn from(value: String) -> Self {
        let Ok(tool) = value.parse::<ToolKind>();
        tool
    }
}

impl From<ToolKind> for &'static str {
    fn from(tool: ToolKind) -> Self {
        tool.name()
    }
}

/// A single in-progress drawing action, from pointer-down to pointer-up.
#[derive(Debug, Clone)]
pub struct Gesture {
    /// Anchor point. Fixed for anchor-relative tools, advanced to the last
    /// processed point for accumulating tools.
    pub anchor: Point,
    /// Most recent pointer position.
    pub current: Point,
    /// Style captured when the gesture began.
    pub style: StyleConfig,
    /// Number of move events processed so far.
    pub moves: usize,
}

impl Gesture {
    pub fn new(point: Point, style: StyleConfig) -> Self {
        Self {
            anchor: point,
            current: point,
            style,
            moves: 0,
        }
    }

    pub fn tool(&self) -> ToolKind {
        self.style.tool
    }

    pub fn strategy(&self) -> CompositionStrategy {
        self.style.tool.strategy()
    }

    /// Process a move and return the `(from, to)` pair the tool should be
    /// rendered with.
    pub fn advance(&mut self, point: Point) -> (Point, Point) {
        self.current = point;
        self.moves += 1;
        match self.strategy() {
            CompositionStrategy::Accumulate => {
                let from = self.anchor;
                self.anchor = point;
                (from, point)
            }
            CompositionStrategy::RestoreAndRedraw | CompositionStrategy::TextEntry => {
                (self.anchor, point)
            }
        }
    }
}

/// Tracks the (at most one) active gesture on a surface.
#[derive(Debug, Clone, Default)]
pub struct GestureTracker {
    active: Option<Gesture>,
}

impl GestureTracker {
    /// Create a new, idle tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a gesture. A stray begin while another gesture is active is
    /// ignored and returns false.
    pub fn begin(&mut self, point: Point, style: &StyleConfig) -> bool {
        if self.active.is_some() {
            log::debug!("Ignoring begin at {:?}: gesture already active", point);
            return false;
        }
        self.active = Some(Gesture::new(point, style.clone()));
        true
    }

    /// Update the active gesture. Returns the gesture and the segment to draw,
    /// or `None` when no gesture is active.
    pub fn update(&mut self, point: Point) -> Option<(&Gesture, Point, Point)> {
        let gesture = self.active.as_mut()?;
        let (from, to) = gesture.advance(point);
        Some((&*gesture, from, to))
    }

    /// End the active gesture and hand it back to the caller.
    pub fn end(&mut self) -> Option<Gesture> {
        self.active.take()
    }

    /// Drop the active gesture without producing anything.
    pub fn cancel(&mut self) {
        self.active = None;
    }

    /// Check if a gesture is active.
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn active(&self) -> Option<&Gesture> {
        self.active.as_ref()
    }
}
