//! Glyph runs rendered through an SVG text tree.

use inkboard_core::SerializableColor;
use kurbo::Point;
use std::sync::Arc;
use thiserror::Error;
use tiny_skia::{Pixmap, Transform};
use usvg::fontdb;

/// Text rendering errors.
#[derive(Debug, Error)]
pub enum TextError {
    #[error("Text tree build failed: {0}")]
    Svg(#[from] usvg::Error),
}

/// Renders single-line text runs onto a pixmap.
#[derive(Clone)]
pub struct TextRenderer {
    fontdb: Arc<fontdb::Database>,
}

impl TextRenderer {
    /// A renderer backed by the fonts installed on the system.
    pub fn with_system_fonts() -> Self {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();

        // Fall back to any installed face when the generic sans-serif family
        // (Arial by default) is missing.
        let query = fontdb::Query {
            families: &[fontdb::Family::SansSerif],
            weight: fontdb::Weight::NORMAL,
            stretch: fontdb::Stretch::Normal,
            style: fontdb::Style::Normal,
        };
        if db.query(&query).is_none() {
            let fallback = db
                .faces()
                .find_map(|face| face.families.first().map(|(name, _)| name.clone()));
            if let Some(name) = fallback {
                log::debug!("Using '{}' as sans-serif fallback", name);
                db.set_sans_serif_family(name);
            }
        }

        log::debug!("Loaded {} font faces", db.len());
        Self { fontdb: Arc::new(db) }
    }

    /// A renderer without fonts. Text runs draw nothing.
    pub fn without_fonts() -> Self {
        Self {
            fontdb: Arc::new(fontdb::Database::new()),
        }
    }

    pub fn face_count(&self) -> usize {
        self.fontdb.len()
    }

    /// Draw `content` with the left end of its baseline at `origin` (logical
    /// coordinates, mapped through `transform`).
    pub fn draw(
        &self,
        pixmap: &mut Pixmap,
        transform: Transform,
        origin: Point,
        content: &str,
        font_size: f64,
        color: SerializableColor,
    ) -> Result<(), TextError> {
        let svg = text_document(pixmap.width(), pixmap.height(), origin, content, font_size, color);
        let options = usvg::Options {
            fontdb: self.fontdb.clone(),
            ..Default::default()
        };
        let tree = usvg::Tree::from_str(&svg, &options)?;
        resvg::render(&tree, transform, &mut pixmap.as_mut());
        Ok(())
    }
}

fn text_document(
    width: u32,
    height: u32,
    origin: Point,
    content: &str,
    font_size: f64,
    color: SerializableColor,
) -> String {
    let rgb = format!("#{:02x}{:02x}{:02x}", color.r, color.g, color.b);
    let opacity = f64::from(color.a) / 255.0;
    format!(
        concat!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}">"#,
            r#"<text x="{x}" y="{y}" font-family="sans-serif" font-size="{size}" "#,
            r#"fill="{fill}" fill-opacity="{opacity}" xml:space="preserve">{text}</text></svg>"#
        ),
        w = width.max(1),
        h = height.max(1),
        x = origin.x,
        y = origin.y,
        size = font_size,
        fill = rgb,
        opacity = opacity,
        text = escape_xml(content),
    )
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
