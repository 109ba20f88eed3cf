//! Tool geometry.
//!
//! A pure mapping from `(tool, style, from, to)` to a [`DrawOp`] describing
//! what to draw and how to composite it. Nothing here touches pixels; the
//! render crate executes the operations against a raster surface.

use crate::style::{SerializableColor, StyleConfig};
use crate::tools::ToolKind;
use kurbo::{Arc, BezPath, Circle, Line, Point, Rect, Shape, Vec2};
use std::f64::consts::{FRAC_PI_6, TAU};

/// Tolerance used when flattening curves to paths.
pub const PATH_TOLERANCE: f64 = 0.1;

/// How an operation combines with existing pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeMode {
    /// Paint over existing content.
    Normal,
    /// Clear covered pixels to transparent.
    Erase,
}

/// Whether path primitives are stroked or filled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PaintMode {
    /// Stroke with round caps and joins.
    Stroke { width: f64 },
    Fill,
}

/// A single geometric element of a draw operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Segment(Line),
    Rect(Rect),
    Arc(Arc),
    /// Circular dab, always filled.
    Dab(Circle),
    /// Glyph run with its origin (left end of the baseline) at `origin`.
    Text {
        origin: Point,
        content: String,
        font_size: f64,
    },
}

impl Primitive {
    /// Path for the primitive, or `None` for text.
    pub fn to_path(&self) -> Option<BezPath> {
        match self {
            Primitive::Segment(line) => Some(line.to_path(PATH_TOLERANCE)),
            Primitive::Rect(rect) => Some(rect.to_path(PATH_TOLERANCE)),
            Primitive::Arc(arc) => Some(arc.to_path(PATH_TOLERANCE)),
            Primitive::Dab(circle) => Some(circle.to_path(PATH_TOLERANCE)),
            Primitive::Text { .. } => None,
        }
    }
}

/// A complete drawing operation.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawOp {
    pub composite: CompositeMode,
    pub paint: PaintMode,
    pub color: SerializableColor,
    pub primitives: Vec<Primitive>,
}

impl DrawOp {
    fn stroke(style: &StyleConfig, primitives: Vec<Primitive>) -> Self {
        Self {
            composite: CompositeMode::Normal,
            paint: PaintMode::Stroke {
                width: style.stroke_width,
            },
            color: style.stroke_color,
            primitives,
        }
    }

    fn fill(style: &StyleConfig, primitives: Vec<Primitive>) -> Self {
        Self {
            composite: CompositeMode::Normal,
            paint: PaintMode::Fill,
            color: style.stroke_color,
            primitives,
        }
    }
}

/// Geometry for `tool` between `from` and `to`.
///
/// For accumulating tools `from` is the previous point of the gesture; for
/// anchor-relative tools it is the fixed anchor. Text is committed through
/// [`render_text`] and unsupported tools draw nothing, so both return `None`.
pub fn render(tool: ToolKind, style: &StyleConfig, from: Point, to: Point) -> Option<DrawOp> {
    let op = match tool {
        ToolKind::Brush | ToolKind::Line => {
            DrawOp::stroke(style, vec![Primitive::Segment(Line::new(from, to))])
        }
        ToolKind::Eraser => DrawOp {
            composite: CompositeMode::Erase,
            paint: PaintMode::Fill,
            color: style.stroke_color,
            primitives: vec![Primitive::Dab(Circle::new(to, style.stroke_width / 2.0))],
        },
        ToolKind::Rectangle => {
            DrawOp::stroke(style, vec![Primitive::Rect(Rect::from_points(from, to))])
        }
        ToolKind::FilledRectangle => {
            DrawOp::fill(style, vec![Primitive::Rect(Rect::from_points(from, to))])
        }
        ToolKind::Circle => DrawOp::stroke(style, vec![Primitive::Arc(full_circle(from, to))]),
        ToolKind::FilledCircle => DrawOp::fill(style, vec![Primitive::Arc(full_circle(from, to))]),
        ToolKind::Arrow => {
            let [left, right] = arrow_head(from, to, style.stroke_width);
            DrawOp::stroke(
                style,
                vec![
                    Primitive::Segment(Line::new(from, to)),
                    Primitive::Segment(left),
                    Primitive::Segment(right),
                ],
            )
        }
        ToolKind::Text | ToolKind::Unsupported => return None,
    };
    Some(op)
}

/// A text run at `origin`, filled with the stroke color.
pub fn render_text(style: &StyleConfig, origin: Point, content: &str) -> Option<DrawOp> {
    if content.is_empty() {
        return None;
    }
    Some(DrawOp::fill(
        style,
        vec![Primitive::Text {
            origin,
            content: content.to_string(),
            font_size: style.font_size,
        }],
    ))
}

/// Circle centered at `center` passing through `edge`, as a full 0..2π arc.
pub fn full_circle(center: Point, edge: Point) -> Arc {
    let radius = center.distance(edge);
    Arc {
        center,
        radii: Vec2::new(radius, radius),
        start_angle: 0.0,
        sweep_angle: TAU,
        x_rotation: 0.0,
    }
}

/// The two head segments of an arrow pointing from `tail` to `tip`.
///
/// Each segment starts at `tip` and runs back toward the shaft at ±30° from
/// the reversed shaft direction.
pub fn arrow_head(tail: Point, tip: Point, length: f64) -> [Line; 2] {
    let angle = (tip.y - tail.y).atan2(tip.x - tail.x);
    let barb = |offset: f64| {
        let a = angle + offset;
        Line::new(tip, Point::new(tip.x - length * a.cos(), tip.y - length * a.sin()))
    };
    [barb(-FRAC_PI_6), barb(FRAC_PI_6)]
}
