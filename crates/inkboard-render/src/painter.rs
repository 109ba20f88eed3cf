//! Executes tool draw operations against a raster surface.

use crate::surface::{DrawContext, DrawingSurface};
use crate::text::TextRenderer;
use inkboard_core::{CompositeMode, DrawOp, PaintMode, Primitive, SerializableColor};
use kurbo::{BezPath, PathEl};
use tiny_skia::{BlendMode, FillRule, LineCap, LineJoin, Paint, Path, PathBuilder, Stroke};

/// Paints [`DrawOp`]s with anti-aliased strokes and fills.
#[derive(Clone)]
pub struct Painter {
    text: TextRenderer,
    /// What the eraser leaves behind.
    background: SerializableColor,
}

impl Painter {
    pub fn new(text: TextRenderer) -> Self {
        Self {
            text,
            background: SerializableColor::transparent(),
        }
    }

    /// Erase to `background` instead of transparency, matching a cleared
    /// surface.
    pub fn with_background(mut self, background: SerializableColor) -> Self {
        self.background = background;
        self
    }

    /// Paint `op` onto `surface`. Uninitialized surfaces are left alone.
    pub fn paint(&self, surface: &mut impl DrawingSurface, op: &DrawOp) {
        if let Some(mut ctx) = surface.draw_context() {
            self.paint_into(&mut ctx, op);
        }
    }

    pub fn paint_into(&self, ctx: &mut DrawContext<'_>, op: &DrawOp) {
        let mut paint = Paint::default();
        paint.anti_alias = true;
        let color = match op.composite {
            CompositeMode::Normal => {
                paint.blend_mode = BlendMode::SourceOver;
                op.color
            }
            CompositeMode::Erase if self.background.a == 0 => {
                paint.blend_mode = BlendMode::Clear;
                op.color
            }
            CompositeMode::Erase => {
                paint.blend_mode = BlendMode::Source;
                self.background
            }
        };
        paint.set_color_rgba8(color.r, color.g, color.b, color.a);

        for primitive in &op.primitives {
            if let Primitive::Text {
                origin,
                content,
                font_size,
            } = primitive
            {
                if let Err(e) = self.text.draw(
                    ctx.pixmap,
                    ctx.transform,
                    *origin,
                    content,
                    *font_size,
                    op.color,
                ) {
                    log::warn!("Failed to draw text run: {}", e);
                }
                continue;
            }

            let Some(path) = primitive.to_path().and_then(|p| to_skia_path(&p)) else {
                log::trace!("Skipping degenerate primitive {:?}", primitive);
                continue;
            };

            // Dabs are always filled, whatever the op's paint mode.
            let paint_mode = if matches!(primitive, Primitive::Dab(_)) {
                PaintMode::Fill
            } else {
                op.paint
            };
            match paint_mode {
                PaintMode::Stroke { width } => {
                    let stroke = Stroke {
                        width: width as f32,
                        line_cap: LineCap::Round,
                        line_join: LineJoin::Round,
                        ..Default::default()
                    };
                    ctx.pixmap.stroke_path(&path, &paint, &stroke, ctx.transform, None);
                }
                PaintMode::Fill => {
                    ctx.pixmap
                        .fill_path(&path, &paint, FillRule::Winding, ctx.transform, None);
                }
            }
        }
    }
}

/// Convert a kurbo path into a tiny-skia path. Returns `None` for paths
/// tiny-skia considers empty.
fn to_skia_path(path: &BezPath) -> Option<Path> {
    let mut builder = PathBuilder::new();
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => builder.move_to(p.x as f32, p.y as f32),
            PathEl::LineTo(p) => builder.line_to(p.x as f32, p.y as f32),
            PathEl::QuadTo(p1, p2) => {
                builder.quad_to(p1.x as f32, p1.y as f32, p2.x as f32, p2.y as f32)
            }
            PathEl::CurveTo(p1, p2, p3) => builder.cubic_to(
                p1.x as f32,
                p1.y as f32,
                p2.x as f32,
                p2.y as f32,
                p3.x as f32,
                p3.y as f32,
            ),
            PathEl::ClosePath => builder.close(),
        }
    }
    builder.finish()
}
