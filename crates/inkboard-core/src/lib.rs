//! InkBoard Core Library
//!
//! Platform-agnostic data structures and logic for the InkBoard drawing engine:
//! style configuration, input normalization, gesture tracking, tool geometry
//! and the committed-frame history.

pub mod frame;
pub mod history;
pub mod input;
pub mod rasterizer;
pub mod style;
pub mod text_entry;
pub mod tools;

pub use frame::Frame;
pub use history::History;
pub use input::{GestureEvent, InputNormalizer, Modifiers, Normalized, RawInput, TouchPoint};
pub use rasterizer::{CompositeMode, DrawOp, PaintMode, Primitive};
pub use style::{SerializableColor, StyleConfig, StyleError, StylePatch};
pub use text_entry::{TextEditResult, TextEntry, TextKey};
pub use tools::{CompositionStrategy, Gesture, GestureTracker, ToolKind};
