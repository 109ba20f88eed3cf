//! Recorded session scripts.
//!
//! A script is a JSON document with an optional session configuration and a
//! list of steps, each tagged by `"op"`:
//!
//! ```json
//! {
//!   "config": { "width": 400, "height": 300 },
//!   "steps": [
//!     { "op": "style", "tool": "rectangle", "strokeColor": "#ff0000" },
//!     { "op": "input", "event": { "kind": "mouse-down", "position": { "x": 10, "y": 10 } } },
//!     { "op": "input", "event": { "kind": "mouse-up", "position": { "x": 10, "y": 10 } } },
//!     { "op": "key", "key": "z", "modifiers": { "ctrl": true } }
//!   ]
//! }
//! ```

use inkboard_core::{Modifiers, RawInput, StylePatch};
use inkboard_render::{SessionConfig, SurfaceError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading or replaying a script.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("IO error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Surface error: {0}")]
    Surface(#[from] SurfaceError),
}

impl ScriptError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// One recorded action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum Step {
    /// Toolbar style change.
    Style(StylePatch),
    /// Move the surface within the client area.
    Origin { x: f64, y: f64 },
    /// Raw pointer or touch event in client coordinates.
    Input { event: RawInput },
    /// Key press: routed to an open text entry, otherwise matched against the
    /// shortcut registry.
    Key {
        key: String,
        #[serde(default)]
        modifiers: Modifiers,
    },
    /// Typed text for an open text entry.
    Text { text: String },
    Undo,
    Redo,
    Clear,
    /// Viewport change, optionally with a new device pixel ratio.
    Resize {
        width: f64,
        height: f64,
        #[serde(default)]
        dpr: Option<f64>,
    },
    /// Complete the deferred restores collected so far, oldest first or
    /// newest first.
    Flush {
        #[serde(default)]
        reverse: bool,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub config: Option<SessionConfig>,
    pub steps: Vec<Step>,
}

impl Script {
    pub fn from_json(json: &str) -> Result<Self, ScriptError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, ScriptError> {
        let json = std::fs::read_to_string(path).map_err(|e| ScriptError::io(path, e))?;
        let script = Self::from_json(&json)?;
        log::debug!("Loaded {} step(s) from {}", script.steps.len(), path.display());
        Ok(script)
    }
}

/// Load a standalone session configuration file.
pub fn load_config(path: &Path) -> Result<SessionConfig, ScriptError> {
    let json = std::fs::read_to_string(path).map_err(|e| ScriptError::io(path, e))?;
    Ok(serde_json::from_str(&json)?)
}
