//! PNG encoding and decoding of committed frames.

use image::ImageFormat;
use inkboard_core::Frame;
use thiserror::Error;
use tiny_skia::{ColorU8, Pixmap};

/// Frame codec errors.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Frame has no encoded content")]
    Empty,
    #[error("PNG encoding failed: {0}")]
    Encode(#[from] png::EncodingError),
    #[error("Frame decoding failed: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Frame has unusable dimensions {width}x{height}")]
    Dimensions { width: u32, height: u32 },
}

/// Result type for frame operations.
pub type FrameResult<T> = Result<T, FrameError>;

/// Encode a premultiplied pixmap as a straight-alpha RGBA PNG frame.
pub fn encode_frame(pixmap: &Pixmap) -> FrameResult<Frame> {
    let (width, height) = (pixmap.width(), pixmap.height());
    let mut rgba = Vec::with_capacity(pixmap.data().len());
    for pixel in pixmap.pixels() {
        let c = pixel.demultiply();
        rgba.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }

    let mut png_data = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut png_data, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&rgba)?;
        writer.finish()?;
    }

    log::trace!("Encoded {}x{} frame ({} bytes)", width, height, png_data.len());
    Ok(Frame::from_bytes(png_data))
}

/// Decode a frame back into a premultiplied pixmap.
pub fn decode_frame(frame: &Frame) -> FrameResult<Pixmap> {
    if frame.is_empty() {
        return Err(FrameError::Empty);
    }
    let decoded = image::load_from_memory_with_format(frame.as_bytes(), ImageFormat::Png)?.into_rgba8();
    let (width, height) = decoded.dimensions();
    let mut pixmap = Pixmap::new(width, height).ok_or(FrameError::Dimensions { width, height })?;

    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(decoded.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Ok(pixmap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiny_skia::Color;

    #[test]
    fn test_encode_decode_opaque() {
        let mut pixmap = Pixmap::new(6, 4).unwrap();
        pixmap.fill(Color::from_rgba8(10, 200, 30, 255));

        let frame = encode_frame(&pixmap).unwrap();
        assert!(frame.as_bytes().starts_with(&[0x89, b'P', b'N', b'G']));

        let decoded = decode_frame(&frame).unwrap();
        assert_eq!(decoded.width(), 6);
        assert_eq!(decoded.height(), 4);
        assert_eq!(decoded.data(), pixmap.data());
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let mut pixmap = Pixmap::new(3, 3).unwrap();
        pixmap.fill(Color::from_rgba8(1, 2, 3, 128));
        let a = encode_frame(&pixmap).unwrap();
        let b = encode_frame(&pixmap).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_decode_empty_frame() {
        assert!(matches!(decode_frame(&Frame::empty()), Err(FrameError::Empty)));
    }

    #[test]
    fn test_decode_corrupt_frame() {
        let frame = Frame::from_bytes(vec![0x89, b'P', b'N', b'G', 0, 1, 2, 3]);
        assert!(matches!(decode_frame(&frame), Err(FrameError::Decode(_))));
    }
}
