//! InkBoard Render Library
//!
//! The raster side of the engine: a HiDPI backing store, the PNG frame codec,
//! execution of tool draw operations, the live preview compositor and the
//! [`Session`] that wires them to the core's input and history.

mod codec;
mod compositor;
mod painter;
mod session;
mod surface;
mod text;

pub use codec::{FrameError, FrameResult, decode_frame, encode_frame};
pub use compositor::{Compositor, RestoreOutcome, RestoreStrategy, RestoreTicket};
pub use painter::Painter;
pub use session::{InputResponse, Session, SessionConfig, SessionStatus};
pub use surface::{DrawContext, DrawingSurface, RasterSurface, SurfaceError, SurfaceResult};
pub use text::{TextError, TextRenderer};

pub use tiny_skia;
