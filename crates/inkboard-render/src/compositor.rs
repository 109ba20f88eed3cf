//! Live preview compositing for restore-and-redraw tools.
//!
//! Anchor-relative tools (rectangles, circles, arrows, lines) repaint the last
//! committed frame before drawing their geometry on every move. Two strategies
//! are available:
//!
//! - [`RestoreStrategy::Cached`] keeps the committed frame as a decoded bitmap,
//!   so a restore is a plain buffer copy and moves apply in order.
//! - [`RestoreStrategy::Deferred`] hands out a [`RestoreTicket`] per move and
//!   applies the restore when the ticket is completed. Completions may arrive
//!   in any order; only the latest ticket of the active gesture is ever drawn.

use crate::codec::decode_frame;
use crate::painter::Painter;
use crate::surface::RasterSurface;
use inkboard_core::{DrawOp, Frame, SerializableColor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tiny_skia::Pixmap;

/// How the committed frame is brought back before each preview draw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestoreStrategy {
    #[default]
    Cached,
    Deferred,
}

/// Handle for a restore issued in [`RestoreStrategy::Deferred`] mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RestoreTicket {
    sequence: u64,
}

impl RestoreTicket {
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

/// What happened to a restore request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// The committed frame was restored and the geometry drawn on top.
    Applied,
    /// The committed frame could not be decoded; the geometry was drawn on the
    /// current buffer content instead.
    Degraded,
    /// A newer move or the end of the gesture superseded the request.
    Discarded,
}

enum Baseline {
    /// Needs decoding from the committed frame.
    Stale,
    /// Nothing committed: restore means filling with the background.
    Blank,
    Decoded(Pixmap),
    Undecodable,
}

pub struct Compositor {
    strategy: RestoreStrategy,
    background: SerializableColor,
    baseline: Baseline,
    next_sequence: u64,
    pending: BTreeSet<u64>,
    latest: Option<(u64, DrawOp)>,
}

impl Compositor {
    pub fn new(strategy: RestoreStrategy, background: SerializableColor) -> Self {
        Self {
            strategy,
            background,
            baseline: Baseline::Stale,
            next_sequence: 1,
            pending: BTreeSet::new(),
            latest: None,
        }
    }

    pub fn strategy(&self) -> RestoreStrategy {
        self.strategy
    }

    /// Drop the cached bitmap. The next restore decodes the committed frame.
    pub fn invalidate_baseline(&mut self) {
        self.baseline = Baseline::Stale;
    }

    /// Re-derive the cached bitmap from the newly committed (or restored)
    /// frame. Deferred compositors decode on completion instead.
    pub fn refresh_baseline(&mut self, committed: Option<&Frame>) {
        self.baseline = Baseline::Stale;
        if self.strategy == RestoreStrategy::Cached {
            self.baseline = decode_baseline(committed);
        }
    }

    /// Restore the committed frame and draw `op` on top of it.
    ///
    /// Cached compositors apply immediately and return `None`. Deferred
    /// compositors return a ticket; nothing is drawn until it is completed.
    pub fn redraw(
        &mut self,
        surface: &mut RasterSurface,
        painter: &Painter,
        committed: Option<&Frame>,
        op: DrawOp,
    ) -> Option<RestoreTicket> {
        match self.strategy {
            RestoreStrategy::Cached => {
                if matches!(self.baseline, Baseline::Stale) {
                    self.baseline = decode_baseline(committed);
                }
                apply(&self.baseline, self.background, surface, painter, &op);
                None
            }
            RestoreStrategy::Deferred => {
                let sequence = self.next_sequence;
                self.next_sequence += 1;
                self.pending.insert(sequence);
                self.latest = Some((sequence, op));
                log::trace!("Issued restore ticket {}", sequence);
                Some(RestoreTicket { sequence })
            }
        }
    }

    /// Complete a deferred restore. Anything but the latest ticket of the
    /// active gesture is discarded without touching the surface.
    pub fn complete(
        &mut self,
        ticket: RestoreTicket,
        surface: &mut RasterSurface,
        painter: &Painter,
        committed: Option<&Frame>,
    ) -> RestoreOutcome {
        if !self.pending.remove(&ticket.sequence) {
            log::trace!("Restore ticket {} no longer pending", ticket.sequence);
            return RestoreOutcome::Discarded;
        }
        match self.latest.take() {
            Some((sequence, op)) if sequence == ticket.sequence => {
                // Older tickets can never be applied once the latest has been.
                self.pending.clear();
                let baseline = decode_baseline(committed);
                apply(&baseline, self.background, surface, painter, &op)
            }
            other => {
                self.latest = other;
                log::trace!("Discarding superseded restore ticket {}", ticket.sequence);
                RestoreOutcome::Discarded
            }
        }
    }

    /// End of gesture: apply the latest deferred restore synchronously if it is
    /// still outstanding, then retire every ticket.
    pub fn finish_gesture(
        &mut self,
        surface: &mut RasterSurface,
        painter: &Painter,
        committed: Option<&Frame>,
    ) -> Option<RestoreOutcome> {
        let outcome = self.latest.take().map(|(_, op)| {
            let baseline = decode_baseline(committed);
            apply(&baseline, self.background, surface, painter, &op)
        });
        self.pending.clear();
        outcome
    }

    /// Retire every outstanding ticket without drawing.
    pub fn abandon_gesture(&mut self) {
        if !self.pending.is_empty() {
            log::debug!("Abandoning {} pending restore(s)", self.pending.len());
        }
        self.pending.clear();
        self.latest = None;
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

fn decode_baseline(committed: Option<&Frame>) -> Baseline {
    let Some(frame) = committed else {
        return Baseline::Blank;
    };
    match decode_frame(frame) {
        Ok(pixmap) => Baseline::Decoded(pixmap),
        Err(e) => {
            log::warn!("Cannot decode committed frame, drawing without restore: {}", e);
            Baseline::Undecodable
        }
    }
}

fn apply(
    baseline: &Baseline,
    background: SerializableColor,
    surface: &mut RasterSurface,
    painter: &Painter,
    op: &DrawOp,
) -> RestoreOutcome {
    let outcome = match baseline {
        Baseline::Decoded(pixmap) => {
            surface.restore(pixmap);
            RestoreOutcome::Applied
        }
        Baseline::Blank | Baseline::Stale => {
            surface.fill(background);
            RestoreOutcome::Applied
        }
        Baseline::Undecodable => RestoreOutcome::Degraded,
    };
    painter.paint(surface, op);
    outcome
}
