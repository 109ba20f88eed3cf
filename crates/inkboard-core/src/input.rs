//! Input normalization for mouse and touch events.
//!
//! Raw device events arrive in client (window) coordinates. The normalizer
//! converts them to surface-local logical coordinates and folds mouse and
//! single-finger touch input into one Begin/Move/End stream.

use crate::tools::{CompositionStrategy, ToolKind};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    /// Get the action modifier (Ctrl on Windows/Linux, Cmd on macOS).
    pub fn action_mod(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// One touch contact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TouchPoint {
    /// Platform identifier of the contact, stable for its lifetime.
    pub id: u64,
    /// Position in client coordinates.
    pub position: Point,
}

/// Raw device event in client coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum RawInput {
    MouseDown { position: Point },
    MouseMove { position: Point },
    MouseUp { position: Point },
    /// The pointer left the surface.
    MouseLeave,
    /// Contacts that started touching the surface.
    TouchStart { touches: Vec<TouchPoint> },
    /// Contacts that moved.
    TouchMove { touches: Vec<TouchPoint> },
    /// Contacts that were lifted.
    TouchEnd { touches: Vec<TouchPoint> },
    /// Contacts the platform took away (e.g. a system gesture).
    TouchCancel { touches: Vec<TouchPoint> },
}

/// Normalized gesture lifecycle event in surface-local logical coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureEvent {
    Begin(Point),
    Move(Point),
    End,
}

/// Result of normalizing a raw event.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Normalized {
    /// The gesture event to dispatch, if any.
    pub event: Option<GestureEvent>,
    /// Whether the host should suppress its default handling (scrolling,
    /// pull-to-refresh, text selection) for this event.
    pub suppress_default: bool,
}

impl Normalized {
    fn ignored() -> Self {
        Self::default()
    }
}

/// Which device owns the active gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PointerSource {
    Mouse,
    Touch(u64),
}

/// Converts heterogeneous pointer events into a uniform gesture stream.
#[derive(Debug, Clone, Default)]
pub struct InputNormalizer {
    /// On-screen origin of the surface in client coordinates.
    origin: Point,
    /// Device driving the active gesture.
    source: Option<PointerSource>,
}

impl InputNormalizer {
    /// Create a new normalizer with the surface at the client origin.
    pub fn new() -> Self {
        Self::default()
    }

    /// Update the on-screen origin of the surface.
    pub fn set_surface_origin(&mut self, origin: Point) {
        self.origin = origin;
    }

    pub fn surface_origin(&self) -> Point {
        self.origin
    }

    /// Convert a client position to surface-local coordinates.
    pub fn to_local(&self, client: Point) -> Point {
        Point::new(client.x - self.origin.x, client.y - self.origin.y)
    }

    /// Check if a gesture is being tracked.
    pub fn is_tracking(&self) -> bool {
        self.source.is_some()
    }

    /// Forget the tracked gesture (e.g. when the engine abandons it).
    pub fn reset(&mut self) {
        self.source = None;
    }

    /// Normalize a raw event for the given active tool.
    ///
    /// The text tool only ever produces `Begin`: it opens a text entry rather
    /// than a stroke, so no gesture is tracked for it.
    pub fn normalize(&mut self, input: &RawInput, tool: ToolKind) -> Normalized {
        let was_tracking = self.is_tracking();
        let event = match input {
            RawInput::MouseDown { position } => self.begin(PointerSource::Mouse, *position, tool),
            RawInput::MouseMove { position } => self.track(PointerSource::Mouse, *position),
            RawInput::MouseUp { .. } | RawInput::MouseLeave => self.finish(PointerSource::Mouse),
            RawInput::TouchStart { touches } => match touches.first() {
                Some(touch) => self.begin(PointerSource::Touch(touch.id), touch.position, tool),
                None => None,
            },
            RawInput::TouchMove { touches } => self
                .tracked_touch(touches)
                .and_then(|touch| self.track(PointerSource::Touch(touch.id), touch.position)),
            RawInput::TouchEnd { touches } | RawInput::TouchCancel { touches } => self
                .tracked_touch(touches)
                .and_then(|touch| self.finish(PointerSource::Touch(touch.id))),
        };

        let suppress_default = was_tracking
            || self.is_tracking()
            || (tool == ToolKind::Text && matches!(event, Some(GestureEvent::Begin(_))));

        if event.is_none() && !suppress_default {
            return Normalized::ignored();
        }
        Normalized {
            event,
            suppress_default,
        }
    }

    fn tracked_touch(&self, touches: &[TouchPoint]) -> Option<TouchPoint> {
        let Some(PointerSource::Touch(id)) = self.source else {
            return None;
        };
        touches.iter().copied().find(|touch| touch.id == id)
    }

    fn begin(&mut self, source: PointerSource, client: Point, tool: ToolKind) -> Option<GestureEvent> {
        if self.source.is_some() {
            // Additional contacts (or a second button press) are not new gestures.
            log::trace!("Ignoring {:?} begin while a gesture is tracked", source);
            return None;
        }
        if tool.strategy() != CompositionStrategy::TextEntry {
            self.source = Some(source);
        }
        Some(GestureEvent::Begin(self.to_local(client)))
    }

    fn track(&mut self, source: PointerSource, client: Point) -> Option<GestureEvent> {
        (self.source == Some(source)).then(|| GestureEvent::Move(self.to_local(client)))
    }

    fn finish(&mut self, source: PointerSource) -> Option<GestureEvent> {
        if self.source != Some(source) {
            return None;
        }
        self.source = None;
        Some(GestureEvent::End)
    }
}
