//! Linear, branch-truncating history of committed frames.

use crate::frame::Frame;

/// Committed frames plus a cursor pointing at the displayed one.
///
/// `cursor == None` means nothing has been committed yet, which is distinct
/// from a cleared surface (one blank frame at cursor 0).
#[derive(Debug, Clone, Default)]
pub struct History {
    frames: Vec<Frame>,
    cursor: Option<usize>,
}

impl History {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit a new frame. Frames after the cursor (the redo branch) are
    /// discarded first. Returns the index of the new frame.
    pub fn commit(&mut self, frame: Frame) -> usize {
        let keep = self.cursor.map_or(0, |c| c + 1);
        if keep < self.frames.len() {
            log::debug!("Discarding {} redo frame(s)", self.frames.len() - keep);
            self.frames.truncate(keep);
        }
        self.frames.push(frame);
        let index = self.frames.len() - 1;
        self.cursor = Some(index);
        index
    }

    /// Step back one frame. Returns the frame to display, or `None` if the
    /// cursor is already at the first frame (or nothing was committed).
    pub fn undo(&mut self) -> Option<&Frame> {
        let cursor = self.cursor.filter(|&c| c > 0)?;
        self.cursor = Some(cursor - 1);
        self.frames.get(cursor - 1)
    }

    /// Step forward one frame. Returns the frame to display, or `None` if the
    /// cursor is already at the newest frame.
    pub fn redo(&mut self) -> Option<&Frame> {
        let next = self.cursor.map_or(0, |c| c + 1);
        if self.cursor.is_none() || next >= self.frames.len() {
            return None;
        }
        self.cursor = Some(next);
        self.frames.get(next)
    }

    /// Replace the whole history with a single blank frame.
    pub fn clear(&mut self, blank: Frame) {
        self.frames.clear();
        self.frames.push(blank);
        self.cursor = Some(0);
    }

    /// The frame at the cursor.
    pub fn current(&self) -> Option<&Frame> {
        self.cursor.and_then(|c| self.frames.get(c))
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Check if undo is available.
    pub fn can_undo(&self) -> bool {
        self.cursor.is_some_and(|c| c > 0)
    }

    /// Check if redo is available.
    pub fn can_redo(&self) -> bool {
        self.cursor.is_some_and(|c| c + 1 < self.frames.len())
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }
}
