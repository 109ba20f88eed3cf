//! Raster backing store with physical-to-logical pixel scaling.

use crate::codec::{FrameResult, encode_frame};
use inkboard_core::{Frame, SerializableColor};
use kurbo::Size;
use thiserror::Error;
use tiny_skia::{Color, Pixmap, PixmapPaint, Transform};

/// Surface errors.
#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("Surface not initialized")]
    NotInitialized,
    #[error("Invalid device pixel ratio: {0}")]
    InvalidScale(f64),
    #[error("Cannot allocate a {width}x{height} backing store")]
    Allocation { width: u32, height: u32 },
}

/// Result type for surface operations.
pub type SurfaceResult<T> = Result<T, SurfaceError>;

/// Borrowed drawing target: the backing store plus the logical-to-physical
/// transform every drawing operation must use.
pub struct DrawContext<'a> {
    pub pixmap: &'a mut Pixmap,
    pub transform: Transform,
}

/// The capabilities other components need from a drawing surface.
pub trait DrawingSurface {
    /// Logical (CSS-equivalent) dimensions, or `None` before initialization.
    fn logical_size(&self) -> Option<Size>;

    /// Acquire a drawing context, or `None` before initialization.
    fn draw_context(&mut self) -> Option<DrawContext<'_>>;

    /// Encode the full current content as a frame.
    fn encode_snapshot(&self) -> FrameResult<Frame>;
}

/// A CPU raster surface sized `viewport × device pixel ratio` physical pixels.
pub struct RasterSurface {
    pixmap: Option<Pixmap>,
    viewport: Size,
    scale: f64,
}

impl Default for RasterSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl RasterSurface {
    /// Create an uninitialized surface.
    pub fn new() -> Self {
        Self {
            pixmap: None,
            viewport: Size::ZERO,
            scale: 1.0,
        }
    }

    /// Allocate the backing store for `viewport` logical pixels at `scale`.
    pub fn initialize(&mut self, viewport: Size, scale: f64) -> SurfaceResult<()> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(SurfaceError::InvalidScale(scale));
        }
        let (width, height) = physical_dimensions(viewport, scale);
        let pixmap = Pixmap::new(width, height).ok_or(SurfaceError::Allocation { width, height })?;

        log::debug!(
            "Surface {}x{} logical @ {}x -> {}x{} physical",
            viewport.width,
            viewport.height,
            scale,
            width,
            height
        );
        self.pixmap = Some(pixmap);
        self.viewport = viewport;
        self.scale = scale;
        Ok(())
    }

    /// Re-derive the backing store for a new viewport size.
    ///
    /// The previous raster content is discarded, not rescaled.
    pub fn handle_resize(&mut self, viewport: Size) -> SurfaceResult<()> {
        if self.pixmap.is_none() {
            return Err(SurfaceError::NotInitialized);
        }
        self.initialize(viewport, self.scale)
    }

    /// Re-derive the backing store for a new device pixel ratio. Like a resize,
    /// this discards the raster content.
    pub fn set_device_pixel_ratio(&mut self, scale: f64) -> SurfaceResult<()> {
        if self.pixmap.is_none() {
            return Err(SurfaceError::NotInitialized);
        }
        self.initialize(self.viewport, scale)
    }

    pub fn is_initialized(&self) -> bool {
        self.pixmap.is_some()
    }

    pub fn device_pixel_ratio(&self) -> f64 {
        self.scale
    }

    /// Backing store dimensions in physical pixels.
    pub fn physical_size(&self) -> Option<(u32, u32)> {
        self.pixmap.as_ref().map(|p| (p.width(), p.height()))
    }

    /// Logical-to-physical transform.
    pub fn transform(&self) -> Transform {
        Transform::from_scale(self.scale as f32, self.scale as f32)
    }

    pub fn pixmap(&self) -> Option<&Pixmap> {
        self.pixmap.as_ref()
    }

    /// Fill the whole backing store with `color`.
    pub fn fill(&mut self, color: SerializableColor) {
        if let Some(pixmap) = self.pixmap.as_mut() {
            pixmap.fill(Color::from_rgba8(color.r, color.g, color.b, color.a));
        }
    }

    /// Replace the content with `source`, anchored at the top-left corner.
    pub fn restore(&mut self, source: &Pixmap) {
        let Some(pixmap) = self.pixmap.as_mut() else {
            return;
        };
        if pixmap.width() == source.width() && pixmap.height() == source.height() {
            pixmap.data_mut().copy_from_slice(source.data());
            return;
        }
        pixmap.fill(Color::TRANSPARENT);
        pixmap.draw_pixmap(
            0,
            0,
            source.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
    }
}

impl DrawingSurface for RasterSurface {
    fn logical_size(&self) -> Option<Size> {
        self.pixmap.as_ref().map(|_| self.viewport)
    }

    fn draw_context(&mut self) -> Option<DrawContext<'_>> {
        let transform = self.transform();
        self.pixmap.as_mut().map(|pixmap| DrawContext { pixmap, transform })
    }

    fn encode_snapshot(&self) -> FrameResult<Frame> {
        match self.pixmap.as_ref() {
            Some(pixmap) => encode_frame(pixmap),
            None => Err(crate::codec::FrameError::Empty),
        }
    }
}

fn physical_dimensions(viewport: Size, scale: f64) -> (u32, u32) {
    let to_px = |v: f64| {
        let px = (v * scale).round();
        if px.is_finite() && px > 0.0 { px.min(u32::MAX as f64) as u32 } else { 0 }
    };
    (to_px(viewport.width), to_px(viewport.height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uninitialized_surface() {
        let mut surface = RasterSurface::new();
        assert!(!surface.is_initialized());
        assert!(surface.logical_size().is_none());
        assert!(surface.draw_context().is_none());
        assert!(surface.encode_snapshot().is_err());
        assert!(matches!(
            surface.handle_resize(Size::new(10.0, 10.0)),
            Err(SurfaceError::NotInitialized)
        ));
    }

    #[test]
    fn test_hidpi_backing_store() {
        let mut surface = RasterSurface::new();
        surface.initialize(Size::new(100.0, 50.0), 2.0).unwrap();
        assert_eq!(surface.physical_size(), Some((200, 100)));
        assert_eq!(surface.logical_size(), Some(Size::new(100.0, 50.0)));
        assert_eq!(surface.transform(), Transform::from_scale(2.0, 2.0));
    }

    #[test]
    fn test_invalid_initialization() {
        let mut surface = RasterSurface::new();
        assert!(matches!(
            surface.initialize(Size::new(10.0, 10.0), 0.0),
            Err(SurfaceError::InvalidScale(_))
        ));
        assert!(matches!(
            surface.initialize(Size::new(0.0, 10.0), 1.0),
            Err(SurfaceError::Allocation { width: 0, height: 10 })
        ));
        assert!(!surface.is_initialized());
    }

    #[test]
    fn test_resize_discards_content() {
        let mut surface = RasterSurface::new();
        surface.initialize(Size::new(20.0, 20.0), 1.0).unwrap();
        surface.fill(SerializableColor::black());
        assert_eq!(surface.pixmap().unwrap().pixel(5, 5).unwrap().alpha(), 255);

        surface.handle_resize(Size::new(30.0, 10.0)).unwrap();
        assert_eq!(surface.physical_size(), Some((30, 10)));
        assert!(surface.pixmap().unwrap().data().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_dpr_change_rescales_backing_store() {
        let mut surface = RasterSurface::new();
        surface.initialize(Size::new(40.0, 30.0), 1.0).unwrap();
        surface.set_device_pixel_ratio(1.5).unwrap();
        assert_eq!(surface.physical_size(), Some((60, 45)));
    }

    #[test]
    fn test_restore_other_size() {
        let mut surface = RasterSurface::new();
        surface.initialize(Size::new(8.0, 8.0), 1.0).unwrap();
        let mut source = Pixmap::new(4, 4).unwrap();
        source.fill(Color::from_rgba8(255, 0, 0, 255));

        surface.restore(&source);
        let pixmap = surface.pixmap().unwrap();
        assert_eq!(pixmap.pixel(2, 2).unwrap().red(), 255);
        assert_eq!(pixmap.pixel(6, 6).unwrap().alpha(), 0);
    }
}
