//! InkBoard Application
//!
//! A headless shell around the drawing session: recorded scripts stand in for
//! a windowing event loop, keyboard shortcuts map to history operations and
//! the exported frame is written to disk.

mod runner;
mod script;
mod shortcuts;

pub use runner::{ReplaySummary, Runner, default_output_path, write_frame};
pub use script::{Script, ScriptError, Step, load_config};
pub use shortcuts::{Shortcut, ShortcutAction, ShortcutRegistry};
