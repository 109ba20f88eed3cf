//! Replays a script against a drawing session.

use crate::script::{Script, ScriptError, Step};
use crate::shortcuts::{ShortcutAction, ShortcutRegistry};
use inkboard_core::{Frame, Modifiers, TextKey};
use inkboard_render::{RestoreOutcome, RestoreTicket, Session, SessionConfig};
use kurbo::{Point, Size};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Counters collected during a replay.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaySummary {
    pub steps: usize,
    pub commits: usize,
    pub shortcuts: usize,
    pub restores_applied: usize,
    pub restores_degraded: usize,
    pub restores_discarded: usize,
}

/// Drives a [`Session`] from recorded steps.
pub struct Runner {
    session: Session,
    /// Deferred restores not yet flushed.
    tickets: Vec<RestoreTicket>,
    summary: ReplaySummary,
}

impl Runner {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            tickets: Vec::new(),
            summary: ReplaySummary::default(),
        }
    }

    /// Create and initialize a session from `config`, then replay `script`.
    pub fn replay(script: &Script, config: SessionConfig) -> Result<Self, ScriptError> {
        let mut session = Session::new(config.clone());
        session.initialize(config.viewport(), config.device_pixel_ratio)?;
        let mut runner = Self::new(session);
        runner.run(&script.steps);
        Ok(runner)
    }

    pub fn run(&mut self, steps: &[Step]) -> &ReplaySummary {
        for step in steps {
            self.apply(step);
        }
        // Restores still outstanding at the end complete in issue order.
        self.flush(false);
        &self.summary
    }

    pub fn apply(&mut self, step: &Step) {
        log::trace!("Step {}: {:?}", self.summary.steps, step);
        self.summary.steps += 1;
        match step {
            Step::Style(patch) => self.session.set_style(patch),
            Step::Origin { x, y } => self.session.set_surface_origin(Point::new(*x, *y)),
            Step::Input { event } => {
                let response = self.session.handle_input(event);
                if let Some(ticket) = response.ticket {
                    self.tickets.push(ticket);
                }
                self.count_commit(response.committed);
            }
            Step::Key { key, modifiers } => self.key(key, *modifiers),
            Step::Text { text } => self.session.insert_text(text),
            Step::Undo => {
                self.session.undo();
            }
            Step::Redo => {
                self.session.redo();
            }
            Step::Clear => self.session.clear(),
            Step::Resize { width, height, dpr } => {
                if let Some(dpr) = dpr {
                    self.session.set_device_pixel_ratio(*dpr);
                }
                self.session.handle_resize(Size::new(*width, *height));
            }
            Step::Flush { reverse } => self.flush(*reverse),
        }
    }

    fn key(&mut self, key: &str, modifiers: Modifiers) {
        let action = ShortcutRegistry::lookup(key, modifiers);
        if self.session.text_entry().is_some() {
            // An open entry takes every key; undo and redo are not processed.
            match (action, TextKey::from_key_name(key)) {
                (Some(ShortcutAction::ConfirmText), _) => {
                    let committed = self.session.confirm_text_entry();
                    self.count_commit(committed);
                }
                (Some(ShortcutAction::CancelText), _) => self.session.cancel_text_entry(),
                (Some(ShortcutAction::Undo | ShortcutAction::Redo), _) => {
                    log::trace!("Shortcut '{}' ignored during text entry", key);
                }
                (None, Some(text_key)) => {
                    let committed = self.session.handle_text_key(&text_key, modifiers);
                    self.count_commit(committed);
                }
                (None, None) => log::trace!("Key '{}' ignored by text entry", key),
            }
            return;
        }

        match action {
            Some(ShortcutAction::Undo) => {
                self.summary.shortcuts += 1;
                self.session.undo();
            }
            Some(ShortcutAction::Redo) => {
                self.summary.shortcuts += 1;
                self.session.redo();
            }
            Some(ShortcutAction::ConfirmText | ShortcutAction::CancelText) | None => {
                log::trace!("Key '{}' has no effect", key);
            }
        }
    }

    fn flush(&mut self, reverse: bool) {
        let mut tickets = std::mem::take(&mut self.tickets);
        if reverse {
            tickets.reverse();
        }
        for ticket in tickets {
            match self.session.complete_restore(ticket) {
                RestoreOutcome::Applied => self.summary.restores_applied += 1,
                RestoreOutcome::Degraded => self.summary.restores_degraded += 1,
                RestoreOutcome::Discarded => self.summary.restores_discarded += 1,
            }
        }
    }

    fn count_commit(&mut self, committed: bool) {
        if committed {
            self.summary.commits += 1;
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn summary(&self) -> &ReplaySummary {
        &self.summary
    }
}

/// `whiteboard-<unix millis>.png` in the working directory.
pub fn default_output_path() -> PathBuf {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    PathBuf::from(format!("whiteboard-{}.png", millis))
}

/// Write an exported frame, creating parent directories as needed.
pub fn write_frame(path: &Path, frame: &Frame) -> Result<(), ScriptError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ScriptError::io(parent, e))?;
    }
    std::fs::write(path, frame.as_bytes()).map_err(|e| ScriptError::io(path, e))?;
    log::info!("Wrote {} bytes to {}", frame.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkboard_render::{RestoreStrategy, decode_frame};

    fn config(strategy: RestoreStrategy) -> SessionConfig {
        SessionConfig {
            width: 100.0,
            height: 80.0,
            restore_strategy: strategy,
            load_system_fonts: false,
            ..Default::default()
        }
    }

    fn script(json: &str) -> Script {
        Script::from_json(json).unwrap()
    }

    const STROKES: &str = r#"{ "steps": [
        { "op": "input", "event": { "kind": "mouse-down", "position": { "x": 10, "y": 20 } } },
        { "op": "input", "event": { "kind": "mouse-move", "position": { "x": 90, "y": 20 } } },
        { "op": "input", "event": { "kind": "mouse-up", "position": { "x": 90, "y": 20 } } },
        { "op": "input", "event": { "kind": "mouse-down", "position": { "x": 10, "y": 60 } } },
        { "op": "input", "event": { "kind": "mouse-move", "position": { "x": 90, "y": 60 } } },
        { "op": "input", "event": { "kind": "mouse-leave" } }
    ] }"#;

    #[test]
    fn test_replay_commits_strokes() {
        let runner = Runner::replay(&script(STROKES), config(RestoreStrategy::Cached)).unwrap();
        assert_eq!(runner.summary().steps, 6);
        assert_eq!(runner.summary().commits, 2);
        assert_eq!(runner.session().history().len(), 2);
    }

    #[test]
    fn test_shortcuts_undo_and_redo() {
        let mut runner = Runner::replay(&script(STROKES), config(RestoreStrategy::Cached)).unwrap();
        let ctrl = Modifiers {
            ctrl: true,
            ..Default::default()
        };

        runner.apply(&Step::Key {
            key: "z".to_string(),
            modifiers: ctrl,
        });
        assert_eq!(runner.session().history().cursor(), Some(0));

        runner.apply(&Step::Key {
            key: "Z".to_string(),
            modifiers: Modifiers { shift: true, ..ctrl },
        });
        assert_eq!(runner.session().history().cursor(), Some(1));
        assert_eq!(runner.summary().shortcuts, 2);
    }

    #[test]
    fn test_text_entry_swallows_shortcuts() {
        let json = r#"{ "steps": [
            { "op": "style", "tool": "text" },
            { "op": "input", "event": { "kind": "mouse-down", "position": { "x": 10, "y": 30 } } },
            { "op": "text", "text": "hi" },
            { "op": "key", "key": "z", "modifiers": { "ctrl": true } },
            { "op": "key", "key": "y", "modifiers": { "meta": true } }
        ] }"#;
        let mut runner = Runner::replay(&script(json), config(RestoreStrategy::Cached)).unwrap();
        assert_eq!(runner.summary().shortcuts, 0);
        assert_eq!(runner.session().text_entry().unwrap().text(), "hi");

        runner.apply(&Step::Key {
            key: "!".to_string(),
            modifiers: Modifiers::default(),
        });
        runner.apply(&Step::Key {
            key: "Enter".to_string(),
            modifiers: Modifiers::default(),
        });
        assert_eq!(runner.summary().commits, 1);
        assert!(runner.session().text_entry().is_none());
        assert_eq!(runner.session().history().len(), 1);
    }

    #[test]
    fn test_escape_discards_text_entry() {
        let json = r#"{ "steps": [
            { "op": "style", "tool": "text" },
            { "op": "input", "event": { "kind": "mouse-down", "position": { "x": 10, "y": 30 } } },
            { "op": "text", "text": "draft" },
            { "op": "key", "key": "Escape" }
        ] }"#;
        let runner = Runner::replay(&script(json), config(RestoreStrategy::Cached)).unwrap();
        assert!(runner.session().text_entry().is_none());
        assert_eq!(runner.summary().commits, 0);
        assert!(runner.session().history().is_empty());
    }

    #[test]
    fn test_flush_reverse_applies_latest_only() {
        let json = r#"{ "steps": [
            { "op": "style", "tool": "filled-rectangle" },
            { "op": "input", "event": { "kind": "touch-start", "touches": [ { "id": 1, "position": { "x": 0, "y": 0 } } ] } },
            { "op": "input", "event": { "kind": "touch-move", "touches": [ { "id": 1, "position": { "x": 30, "y": 30 } } ] } },
            { "op": "input", "event": { "kind": "touch-move", "touches": [ { "id": 1, "position": { "x": 60, "y": 60 } } ] } },
            { "op": "input", "event": { "kind": "touch-move", "touches": [ { "id": 1, "position": { "x": 20, "y": 20 } } ] } },
            { "op": "flush", "reverse": true }
        ] }"#;
        let runner = Runner::replay(&script(json), config(RestoreStrategy::Deferred)).unwrap();
        let summary = runner.summary();
        assert_eq!(summary.restores_applied, 1);
        assert_eq!(summary.restores_discarded, 2);
        assert_eq!(summary.commits, 0);

        let pixmap = runner.session().surface().pixmap().unwrap();
        assert_eq!(pixmap.pixel(10, 10).unwrap().alpha(), 255);
        assert_eq!(pixmap.pixel(40, 40).unwrap().alpha(), 0);
    }

    #[test]
    fn test_resize_step() {
        let json = r#"{ "steps": [ { "op": "resize", "width": 50, "height": 40, "dpr": 2 } ] }"#;
        let runner = Runner::replay(&script(json), config(RestoreStrategy::Cached)).unwrap();
        assert_eq!(runner.session().surface().physical_size(), Some((100, 80)));
    }

    #[test]
    fn test_write_exported_frame() {
        let runner = Runner::replay(&script(STROKES), config(RestoreStrategy::Cached)).unwrap();
        let frame = runner.session().export_raster().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("board.png");
        write_frame(&path, &frame).unwrap();

        let written = Frame::from_bytes(std::fs::read(&path).unwrap());
        let pixmap = decode_frame(&written).unwrap();
        assert_eq!((pixmap.width(), pixmap.height()), (100, 80));
        assert_eq!(pixmap.pixel(50, 60).unwrap().alpha(), 255);
    }

    #[test]
    fn test_default_output_path() {
        let name = default_output_path().to_string_lossy().into_owned();
        assert!(name.starts_with("whiteboard-"));
        assert!(name.ends_with(".png"));
    }
}
