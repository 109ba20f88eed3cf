//! The drawing session: one surface, its input stream and its history.

use crate::codec::decode_frame;
use crate::compositor::{Compositor, RestoreOutcome, RestoreStrategy, RestoreTicket};
use crate::painter::Painter;
use crate::surface::{DrawingSurface, RasterSurface, SurfaceResult};
use crate::text::TextRenderer;
use inkboard_core::rasterizer::{render, render_text};
use inkboard_core::{
    CompositionStrategy, Frame, GestureEvent, GestureTracker, History, InputNormalizer, Modifiers,
    RawInput,
    SerializableColor, StyleConfig, StylePatch, TextEditResult, TextEntry, TextKey, ToolKind,
};
use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};

/// Session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    /// Initial viewport width in logical pixels.
    pub width: f64,
    /// Initial viewport height in logical pixels.
    pub height: f64,
    pub device_pixel_ratio: f64,
    /// Color of a blank surface, both at startup and after `clear()`.
    pub background: SerializableColor,
    pub restore_strategy: RestoreStrategy,
    /// Style in effect before the first `set_style`.
    pub style: StyleConfig,
    /// Load installed fonts for the text tool.
    pub load_system_fonts: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
            device_pixel_ratio: 1.0,
            background: SerializableColor::transparent(),
            restore_strategy: RestoreStrategy::Cached,
            style: StyleConfig::default(),
            load_system_fonts: true,
        }
    }
}

impl SessionConfig {
    pub fn viewport(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// What the host should know after an input event.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputResponse {
    /// Suppress the platform's default handling of the event.
    pub suppress_default: bool,
    /// Outstanding restore, in deferred mode.
    pub ticket: Option<RestoreTicket>,
    /// A frame was committed.
    pub committed: bool,
}

/// Serializable snapshot of the session state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub initialized: bool,
    pub physical_size: Option<(u32, u32)>,
    pub device_pixel_ratio: f64,
    pub history_len: usize,
    pub cursor: Option<usize>,
    pub can_undo: bool,
    pub can_redo: bool,
    pub tool: ToolKind,
    pub gesture_active: bool,
    pub text_entry_open: bool,
    pub pending_restores: usize,
}

/// Wires the input normalizer, rasterizer, compositor and history to a single
/// raster surface.
///
/// Every operation is a no-op until [`Session::initialize`] has succeeded, and
/// no operation reports failure to the caller: problems are logged and the
/// session carries on.
pub struct Session {
    config: SessionConfig,
    surface: RasterSurface,
    painter: Painter,
    compositor: Compositor,
    history: History,
    normalizer: InputNormalizer,
    gestures: GestureTracker,
    style: StyleConfig,
    text_entry: Option<TextEntry>,
}

impl Session {
    pub fn new(mut config: SessionConfig) -> Self {
        config.style = config.style.clamped();
        let text = if config.load_system_fonts {
            TextRenderer::with_system_fonts()
        } else {
            TextRenderer::without_fonts()
        };
        Self {
            surface: RasterSurface::new(),
            painter: Painter::new(text).with_background(config.background),
            compositor: Compositor::new(config.restore_strategy, config.background),
            history: History::new(),
            normalizer: InputNormalizer::new(),
            gestures: GestureTracker::new(),
            style: config.style.clone(),
            text_entry: None,
            config,
        }
    }

    /// Allocate the backing store and show a blank surface.
    pub fn initialize(&mut self, viewport: Size, device_pixel_ratio: f64) -> SurfaceResult<()> {
        self.surface.initialize(viewport, device_pixel_ratio)?;
        self.abandon_interaction();
        self.surface.fill(self.config.background);
        self.compositor.refresh_baseline(self.history.current());
        log::info!(
            "Session initialized at {}x{} @ {}x",
            viewport.width,
            viewport.height,
            device_pixel_ratio
        );
        Ok(())
    }

    /// Viewport changed. The raster content is discarded; history is kept.
    pub fn handle_resize(&mut self, viewport: Size) {
        if !self.surface.is_initialized() {
            return;
        }
        self.abandon_interaction();
        if let Err(e) = self.surface.handle_resize(viewport) {
            log::warn!("Resize to {}x{} failed: {}", viewport.width, viewport.height, e);
            return;
        }
        self.after_backing_store_change();
    }

    /// Device pixel ratio changed. Same effect as a resize.
    pub fn set_device_pixel_ratio(&mut self, device_pixel_ratio: f64) {
        if !self.surface.is_initialized() {
            return;
        }
        self.abandon_interaction();
        if let Err(e) = self.surface.set_device_pixel_ratio(device_pixel_ratio) {
            log::warn!("Device pixel ratio change failed: {}", e);
            return;
        }
        self.after_backing_store_change();
    }

    fn after_backing_store_change(&mut self) {
        self.surface.fill(self.config.background);
        self.compositor.invalidate_baseline();
    }

    /// Position of the surface in client coordinates.
    pub fn set_surface_origin(&mut self, origin: Point) {
        self.normalizer.set_surface_origin(origin);
    }

    /// Update the style for the next gesture. An active gesture keeps the style
    /// it started with.
    pub fn set_style(&mut self, patch: &StylePatch) {
        if self.style.apply(patch) {
            log::debug!("Style updated: {:?}", self.style);
        }
    }

    /// Feed a raw device event.
    pub fn handle_input(&mut self, input: &RawInput) -> InputResponse {
        if !self.surface.is_initialized() {
            return InputResponse::default();
        }
        let normalized = self.normalizer.normalize(input, self.style.tool);
        let mut response = match normalized.event {
            Some(event) => self.dispatch(event),
            None => InputResponse::default(),
        };
        response.suppress_default |= normalized.suppress_default;
        response
    }

    /// Feed an already-normalized gesture event in surface-local coordinates.
    pub fn handle_gesture(&mut self, event: GestureEvent) -> InputResponse {
        if !self.surface.is_initialized() {
            return InputResponse::default();
        }
        self.dispatch(event)
    }

    fn dispatch(&mut self, event: GestureEvent) -> InputResponse {
        match event {
            GestureEvent::Begin(point) => self.begin(point),
            GestureEvent::Move(point) => self.update(point),
            GestureEvent::End => self.end(),
        }
    }

    fn begin(&mut self, point: Point) -> InputResponse {
        // A pointer-down anywhere takes focus from an open entry.
        let committed = self.confirm_text_entry();

        if self.style.tool.strategy() == CompositionStrategy::TextEntry {
            if self.gestures.is_active() {
                log::debug!("Ignoring text placement during an active gesture");
                return InputResponse {
                    committed,
                    ..Default::default()
                };
            }
            log::debug!("Text entry opened at {:?}", point);
            self.text_entry = Some(TextEntry::new(point, self.style.clone()));
            return InputResponse {
                suppress_default: true,
                committed,
                ..Default::default()
            };
        }

        if self.gestures.begin(point, &self.style) {
            log::trace!("{} gesture began at {:?}", self.style.tool, point);
            self.compositor.abandon_gesture();
        }
        InputResponse {
            suppress_default: true,
            committed,
            ..Default::default()
        }
    }

    fn update(&mut self, point: Point) -> InputResponse {
        let Some((gesture, from, to)) = self.gestures.update(point) else {
            return InputResponse::default();
        };
        let strategy = gesture.strategy();
        let mut response = InputResponse {
            suppress_default: true,
            ..Default::default()
        };
        let Some(op) = render(gesture.tool(), &gesture.style, from, to) else {
            return response;
        };

        match strategy {
            CompositionStrategy::Accumulate => self.painter.paint(&mut self.surface, &op),
            CompositionStrategy::RestoreAndRedraw => {
                response.ticket =
                    self.compositor
                        .redraw(&mut self.surface, &self.painter, self.history.current(), op);
            }
            CompositionStrategy::TextEntry => {}
        }
        response
    }

    fn end(&mut self) -> InputResponse {
        let Some(gesture) = self.gestures.end() else {
            return InputResponse::default();
        };
        if let Some(outcome) =
            self.compositor
                .finish_gesture(&mut self.surface, &self.painter, self.history.current())
        {
            log::trace!("Final restore at gesture end: {:?}", outcome);
        }
        log::debug!("{} gesture ended after {} move(s)", gesture.tool(), gesture.moves);
        InputResponse {
            suppress_default: true,
            ticket: None,
            committed: self.commit(),
        }
    }

    /// Complete a deferred restore issued by an earlier move.
    pub fn complete_restore(&mut self, ticket: RestoreTicket) -> RestoreOutcome {
        if !self.surface.is_initialized() {
            return RestoreOutcome::Discarded;
        }
        self.compositor
            .complete(ticket, &mut self.surface, &self.painter, self.history.current())
    }

    /// Route a key to the open text entry. Returns true if a frame was
    /// committed.
    pub fn handle_text_key(&mut self, key: &TextKey, modifiers: Modifiers) -> bool {
        let Some(entry) = self.text_entry.as_mut() else {
            return false;
        };
        let result = entry.handle_key(key, modifiers);
        self.finish_text_edit(result)
    }

    /// Append typed text to the open entry.
    pub fn insert_text(&mut self, text: &str) {
        if let Some(entry) = self.text_entry.as_mut() {
            entry.insert(text);
        }
    }

    /// Confirm the open entry. Returns true if a frame was committed.
    pub fn confirm_text_entry(&mut self) -> bool {
        let Some(entry) = self.text_entry.as_ref() else {
            return false;
        };
        let result = entry.confirm();
        self.finish_text_edit(result)
    }

    /// Dismiss the open entry without committing.
    pub fn cancel_text_entry(&mut self) {
        if self.text_entry.take().is_some() {
            log::debug!("Text entry canceled");
        }
    }

    fn finish_text_edit(&mut self, result: TextEditResult) -> bool {
        match result {
            TextEditResult::Handled => false,
            TextEditResult::Dismissed => {
                self.cancel_text_entry();
                false
            }
            TextEditResult::Confirmed { anchor, text } => {
                let Some(entry) = self.text_entry.take() else {
                    return false;
                };
                if let Some(op) = render_text(entry.style(), anchor, &text) {
                    self.painter.paint(&mut self.surface, &op);
                }
                self.commit()
            }
        }
    }

    fn commit(&mut self) -> bool {
        match self.surface.encode_snapshot() {
            Ok(frame) => {
                let index = self.history.commit(frame);
                log::debug!("Committed frame {}", index);
                self.compositor.refresh_baseline(self.history.current());
                true
            }
            Err(e) => {
                log::warn!("Failed to commit frame: {}", e);
                false
            }
        }
    }

    /// Step back one committed frame.
    pub fn undo(&mut self) -> bool {
        if !self.surface.is_initialized() {
            return false;
        }
        let discarded_preview = self.abandon_interaction();
        match self.history.undo().cloned() {
            Some(frame) => {
                self.show(&frame);
                true
            }
            None => {
                if discarded_preview {
                    self.show_current();
                }
                false
            }
        }
    }

    /// Step forward one committed frame.
    pub fn redo(&mut self) -> bool {
        if !self.surface.is_initialized() {
            return false;
        }
        let discarded_preview = self.abandon_interaction();
        match self.history.redo().cloned() {
            Some(frame) => {
                self.show(&frame);
                true
            }
            None => {
                if discarded_preview {
                    self.show_current();
                }
                false
            }
        }
    }

    /// Replace the history with a single blank frame.
    pub fn clear(&mut self) {
        if !self.surface.is_initialized() {
            return;
        }
        self.abandon_interaction();
        self.surface.fill(self.config.background);
        match self.surface.encode_snapshot() {
            Ok(blank) => {
                self.history.clear(blank);
                self.compositor.refresh_baseline(self.history.current());
                log::debug!("History cleared");
            }
            Err(e) => log::warn!("Failed to encode blank frame: {}", e),
        }
    }

    /// The committed frame at the cursor. In-progress previews are never
    /// included.
    pub fn export_raster(&self) -> Option<Frame> {
        self.history.current().cloned()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    fn show(&mut self, frame: &Frame) {
        match decode_frame(frame) {
            Ok(pixmap) => self.surface.restore(&pixmap),
            Err(e) => log::warn!("Cannot display committed frame: {}", e),
        }
        self.compositor.refresh_baseline(Some(frame));
    }

    fn show_current(&mut self) {
        match self.history.current().cloned() {
            Some(frame) => self.show(&frame),
            None => self.surface.fill(self.config.background),
        }
    }

    /// Drop any in-progress gesture and open text entry. Returns true if a
    /// gesture was active (its pixels are still on the surface).
    fn abandon_interaction(&mut self) -> bool {
        self.cancel_text_entry();
        self.normalizer.reset();
        self.compositor.abandon_gesture();
        let active = self.gestures.is_active();
        if active {
            log::debug!("Abandoning active gesture");
            self.gestures.cancel();
        }
        active
    }

    pub fn is_initialized(&self) -> bool {
        self.surface.is_initialized()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn style(&self) -> &StyleConfig {
        &self.style
    }

    pub fn surface(&self) -> &RasterSurface {
        &self.surface
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn text_entry(&self) -> Option<&TextEntry> {
        self.text_entry.as_ref()
    }

    pub fn logical_size(&self) -> Option<Size> {
        self.surface.logical_size()
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            initialized: self.surface.is_initialized(),
            physical_size: self.surface.physical_size(),
            device_pixel_ratio: self.surface.device_pixel_ratio(),
            history_len: self.history.len(),
            cursor: self.history.cursor(),
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
            tool: self.style.tool,
            gesture_active: self.gestures.is_active(),
            text_entry_open: self.text_entry.is_some(),
            pending_restores: self.compositor.pending_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkboard_core::TouchPoint;

    fn config(strategy: RestoreStrategy) -> SessionConfig {
        SessionConfig {
            width: 100.0,
            height: 100.0,
            restore_strategy: strategy,
            load_system_fonts: false,
            ..Default::default()
        }
    }

    fn session_with(strategy: RestoreStrategy) -> Session {
        let config = config(strategy);
        let mut session = Session::new(config.clone());
        session.initialize(config.viewport(), 1.0).unwrap();
        session
    }

    fn session() -> Session {
        session_with(RestoreStrategy::Cached)
    }

    fn use_tool(session: &mut Session, tool: ToolKind) {
        session.set_style(&StylePatch::tool(tool));
    }

    fn gesture(session: &mut Session, points: &[(f64, f64)]) -> InputResponse {
        let (x, y) = points[0];
        session.handle_gesture(GestureEvent::Begin(Point::new(x, y)));
        for &(x, y) in &points[1..] {
            session.handle_gesture(GestureEvent::Move(Point::new(x, y)));
        }
        session.handle_gesture(GestureEvent::End)
    }

    fn alpha(session: &Session, x: u32, y: u32) -> u8 {
        session.surface().pixmap().unwrap().pixel(x, y).unwrap().alpha()
    }

    fn key(text: &str) -> TextKey {
        TextKey::Character(text.to_string())
    }

    #[test]
    fn test_operations_before_initialize_are_noops() {
        let mut session = Session::new(config(RestoreStrategy::Cached));
        let response = session.handle_input(&RawInput::MouseDown {
            position: Point::new(5.0, 5.0),
        });
        assert_eq!(response, InputResponse::default());
        session.handle_gesture(GestureEvent::Move(Point::new(9.0, 9.0)));
        session.handle_gesture(GestureEvent::End);
        session.clear();
        assert!(!session.undo());
        assert!(!session.redo());
        session.handle_resize(Size::new(50.0, 50.0));

        assert!(session.export_raster().is_none());
        assert!(session.history().is_empty());
        assert!(!session.status().initialized);
    }

    #[test]
    fn test_brush_gesture_commits_once() {
        let mut session = session();
        let response = gesture(&mut session, &[(10.0, 50.0), (50.0, 50.0), (90.0, 50.0)]);

        assert!(response.committed);
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.history().cursor(), Some(0));
        assert_eq!(alpha(&session, 30, 50), 255);
        assert_eq!(alpha(&session, 70, 50), 255);

        let frame = session.export_raster().unwrap();
        let decoded = decode_frame(&frame).unwrap();
        assert_eq!(decoded.pixel(30, 50).unwrap().alpha(), 255);
    }

    #[test]
    fn test_n_gestures_commit_n_frames() {
        let mut session = session();
        for n in 1..=4 {
            let y = 10.0 * n as f64;
            gesture(&mut session, &[(10.0, y), (80.0, y)]);
            assert_eq!(session.history().len(), n);
            assert_eq!(session.history().cursor(), Some(n - 1));
        }
    }

    #[test]
    fn test_brush_accumulates_segments() {
        let mut session = session();
        session.handle_gesture(GestureEvent::Begin(Point::new(10.0, 10.0)));
        session.handle_gesture(GestureEvent::Move(Point::new(50.0, 10.0)));
        session.handle_gesture(GestureEvent::Move(Point::new(50.0, 50.0)));

        assert_eq!(alpha(&session, 30, 10), 255);
        assert_eq!(alpha(&session, 50, 30), 255);
        assert!(session.history().is_empty());
    }

    #[test]
    fn test_rectangle_preview_is_superseded() {
        let mut session = session();
        use_tool(&mut session, ToolKind::Rectangle);
        session.handle_gesture(GestureEvent::Begin(Point::new(10.0, 10.0)));
        session.handle_gesture(GestureEvent::Move(Point::new(80.0, 80.0)));
        assert_eq!(alpha(&session, 80, 50), 255);

        session.handle_gesture(GestureEvent::Move(Point::new(30.0, 30.0)));
        assert_eq!(alpha(&session, 80, 50), 0);
        assert_eq!(alpha(&session, 30, 20), 255);
        assert!(session.history().is_empty());

        session.handle_gesture(GestureEvent::End);
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn test_rectangle_preview_keeps_committed_content() {
        let mut session = session();
        gesture(&mut session, &[(5.0, 90.0), (95.0, 90.0)]);

        use_tool(&mut session, ToolKind::FilledCircle);
        gesture(&mut session, &[(50.0, 40.0), (70.0, 40.0), (60.0, 40.0)]);

        assert_eq!(alpha(&session, 50, 90), 255);
        assert_eq!(alpha(&session, 50, 40), 255);
        // The first, larger preview radius is gone.
        assert_eq!(alpha(&session, 50, 57), 0);
    }

    fn rectangle_moves() -> Vec<Point> {
        (1..=5).map(|n| Point::new(10.0 + 15.0 * n as f64, 10.0 + 12.0 * n as f64)).collect()
    }

    #[test]
    fn test_deferred_out_of_order_matches_cached() {
        let mut cached = session();
        gesture(&mut cached, &[(40.0, 80.0), (90.0, 95.0)]);
        use_tool(&mut cached, ToolKind::Rectangle);
        cached.handle_gesture(GestureEvent::Begin(Point::new(10.0, 10.0)));
        for point in rectangle_moves() {
            assert!(cached.handle_gesture(GestureEvent::Move(point)).ticket.is_none());
        }

        let mut deferred = session_with(RestoreStrategy::Deferred);
        gesture(&mut deferred, &[(40.0, 80.0), (90.0, 95.0)]);
        use_tool(&mut deferred, ToolKind::Rectangle);
        deferred.handle_gesture(GestureEvent::Begin(Point::new(10.0, 10.0)));
        let tickets: Vec<_> = rectangle_moves()
            .into_iter()
            .map(|point| deferred.handle_gesture(GestureEvent::Move(point)).ticket.unwrap())
            .collect();
        assert_eq!(deferred.status().pending_restores, 5);

        assert_eq!(deferred.complete_restore(tickets[4]), RestoreOutcome::Applied);
        for index in [2, 0, 3, 1] {
            assert_eq!(deferred.complete_restore(tickets[index]), RestoreOutcome::Discarded);
        }
        assert_eq!(
            deferred.surface().pixmap().unwrap().data(),
            cached.surface().pixmap().unwrap().data()
        );

        cached.handle_gesture(GestureEvent::End);
        deferred.handle_gesture(GestureEvent::End);
        assert_eq!(
            deferred.export_raster().unwrap().as_bytes(),
            cached.export_raster().unwrap().as_bytes()
        );
    }

    #[test]
    fn test_gesture_end_supersedes_pending_restores() {
        let mut session = session_with(RestoreStrategy::Deferred);
        use_tool(&mut session, ToolKind::FilledRectangle);
        session.handle_gesture(GestureEvent::Begin(Point::new(0.0, 0.0)));
        let tickets: Vec<_> = [(90.0, 90.0), (20.0, 20.0), (50.0, 50.0)]
            .into_iter()
            .map(|(x, y)| session.handle_gesture(GestureEvent::Move(Point::new(x, y))).ticket.unwrap())
            .collect();
        // Nothing drawn until a restore completes.
        assert_eq!(alpha(&session, 10, 10), 0);

        assert!(session.handle_gesture(GestureEvent::End).committed);
        assert_eq!(alpha(&session, 40, 40), 255);
        assert_eq!(alpha(&session, 70, 70), 0);

        let committed = session.export_raster().unwrap();
        for ticket in tickets {
            assert_eq!(session.complete_restore(ticket), RestoreOutcome::Discarded);
        }
        assert_eq!(alpha(&session, 70, 70), 0);
        assert_eq!(session.status().pending_restores, 0);
        assert!(session.export_raster().unwrap().ptr_eq(&committed));
    }

    #[test]
    fn test_corrupt_committed_frame_degrades() {
        let mut session = session();
        gesture(&mut session, &[(10.0, 10.0), (90.0, 10.0)]);
        session.history.commit(Frame::from_bytes(vec![0x89, b'P', b'N', b'G']));
        session.compositor.invalidate_baseline();

        use_tool(&mut session, ToolKind::FilledRectangle);
        let response = gesture(&mut session, &[(20.0, 40.0), (60.0, 80.0)]);

        assert!(response.committed);
        assert_eq!(session.history().len(), 3);
        // Drawn over the existing buffer: the brush stroke survives.
        assert_eq!(alpha(&session, 50, 10), 255);
        assert_eq!(alpha(&session, 40, 60), 255);
    }

    #[test]
    fn test_undo_redo_roundtrip() {
        let mut session = session();
        for y in [20.0, 50.0, 80.0] {
            gesture(&mut session, &[(10.0, y), (90.0, y)]);
        }
        let before = session.export_raster().unwrap();
        let before_pixels = session.surface().pixmap().unwrap().data().to_vec();

        assert!(session.undo());
        assert_eq!(session.history().cursor(), Some(1));
        assert_eq!(alpha(&session, 50, 80), 0);
        assert_eq!(alpha(&session, 50, 50), 255);
        assert!(session.can_redo());

        assert!(session.redo());
        assert_eq!(session.export_raster().unwrap().as_bytes(), before.as_bytes());
        assert_eq!(session.surface().pixmap().unwrap().data(), &before_pixels[..]);
        assert!(!session.redo());
    }

    #[test]
    fn test_commit_after_undo_truncates_redo_branch() {
        let mut session = session();
        for y in [20.0, 50.0, 80.0] {
            gesture(&mut session, &[(10.0, y), (90.0, y)]);
        }
        session.undo();
        session.undo();
        gesture(&mut session, &[(50.0, 5.0), (50.0, 95.0)]);

        assert_eq!(session.history().len(), 2);
        assert_eq!(session.history().cursor(), Some(1));
        assert!(!session.can_redo());
        assert!(!session.redo());
    }

    #[test]
    fn test_cannot_undo_past_first_frame() {
        let mut session = session();
        gesture(&mut session, &[(10.0, 20.0), (90.0, 20.0)]);
        assert!(!session.undo());
        assert_eq!(alpha(&session, 50, 20), 255);
    }

    #[test]
    fn test_clear() {
        let config = SessionConfig {
            background: SerializableColor::white(),
            ..config(RestoreStrategy::Cached)
        };
        let mut session = Session::new(config);
        session.initialize(Size::new(40.0, 40.0), 1.0).unwrap();
        for y in [10.0, 20.0] {
            gesture(&mut session, &[(0.0, y), (40.0, y)]);
        }

        session.clear();
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.history().cursor(), Some(0));
        assert!(!session.can_undo());
        assert!(!session.can_redo());

        let blank = decode_frame(&session.export_raster().unwrap()).unwrap();
        assert!(blank.pixels().iter().all(|p| p.red() == 255 && p.alpha() == 255));
        assert_eq!(session.surface().pixmap().unwrap().data(), blank.data());
    }

    #[test]
    fn test_resize_discards_content_keeps_history() {
        let mut session = session();
        gesture(&mut session, &[(10.0, 10.0), (90.0, 10.0)]);

        session.handle_resize(Size::new(60.0, 40.0));
        assert_eq!(session.surface().physical_size(), Some((60, 40)));
        assert!(session.surface().pixmap().unwrap().data().iter().all(|&b| b == 0));
        assert_eq!(session.history().len(), 1);

        // The next restore decodes the committed frame at its native size.
        use_tool(&mut session, ToolKind::Rectangle);
        gesture(&mut session, &[(20.0, 20.0), (30.0, 30.0)]);
        assert_eq!(alpha(&session, 50, 10), 255);
        assert_eq!(session.history().len(), 2);
    }

    #[test]
    fn test_hidpi_mapping() {
        let mut session = Session::new(config(RestoreStrategy::Cached));
        session.initialize(Size::new(100.0, 50.0), 2.0).unwrap();
        assert_eq!(session.surface().physical_size(), Some((200, 100)));
        assert_eq!(session.logical_size(), Some(Size::new(100.0, 50.0)));

        gesture(&mut session, &[(5.0, 10.0), (15.0, 10.0)]);
        assert_eq!(alpha(&session, 20, 20), 255);
        assert_eq!(alpha(&session, 10, 10), 0);
    }

    #[test]
    fn test_unsupported_tool_commits_unchanged_frame() {
        let mut session = session();
        use_tool(&mut session, ToolKind::Unsupported);
        let response = gesture(&mut session, &[(10.0, 10.0), (90.0, 90.0)]);

        assert!(response.committed);
        assert_eq!(session.history().len(), 1);
        let frame = decode_frame(&session.export_raster().unwrap()).unwrap();
        assert!(frame.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_eraser_clears_committed_pixels() {
        let mut session = session();
        session.set_style(&StylePatch::default().with_stroke_width(10.0));
        gesture(&mut session, &[(10.0, 50.0), (90.0, 50.0)]);

        session.set_style(&StylePatch::tool(ToolKind::Eraser).with_stroke_width(20.0));
        gesture(&mut session, &[(50.0, 50.0), (50.0, 50.0)]);

        assert_eq!(alpha(&session, 50, 50), 0);
        assert_eq!(alpha(&session, 20, 50), 255);
        assert_eq!(session.history().len(), 2);
    }

    #[test]
    fn test_eraser_matches_background() {
        let config = SessionConfig {
            background: SerializableColor::white(),
            ..config(RestoreStrategy::Cached)
        };
        let mut session = Session::new(config.clone());
        session.initialize(config.viewport(), 1.0).unwrap();
        session.set_style(&StylePatch::default().with_stroke_width(10.0));
        gesture(&mut session, &[(10.0, 50.0), (90.0, 50.0)]);

        session.set_style(&StylePatch::tool(ToolKind::Eraser).with_stroke_width(20.0));
        gesture(&mut session, &[(50.0, 50.0), (50.0, 50.0)]);

        let pixmap = session.surface().pixmap().unwrap();
        let erased = pixmap.pixel(50, 50).unwrap();
        let untouched = pixmap.pixel(50, 90).unwrap();
        assert_eq!(erased, untouched);
        assert_eq!((erased.red(), erased.alpha()), (255, 255));
        assert_eq!(pixmap.pixel(20, 50).unwrap().red(), 0);
    }

    #[test]
    fn test_style_snapshot_at_begin() {
        let mut session = session();
        session.handle_gesture(GestureEvent::Begin(Point::new(10.0, 50.0)));
        session.set_style(&StylePatch::default().with_color("#ff0000"));
        session.handle_gesture(GestureEvent::Move(Point::new(90.0, 50.0)));

        let pixel = session.surface().pixmap().unwrap().pixel(50, 50).unwrap();
        assert_eq!(pixel.red(), 0);
        assert_eq!(session.style().stroke_color, SerializableColor::new(255, 0, 0, 255));
    }

    #[test]
    fn test_stray_begin_ignored() {
        let mut session = session();
        session.handle_gesture(GestureEvent::Begin(Point::new(10.0, 10.0)));
        session.handle_gesture(GestureEvent::Begin(Point::new(80.0, 80.0)));
        session.handle_gesture(GestureEvent::Move(Point::new(30.0, 10.0)));
        session.handle_gesture(GestureEvent::End);

        assert_eq!(alpha(&session, 20, 10), 255);
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn test_moves_without_gesture_ignored() {
        let mut session = session();
        let response = session.handle_gesture(GestureEvent::Move(Point::new(10.0, 10.0)));
        assert!(!response.suppress_default);
        assert!(!session.handle_gesture(GestureEvent::End).committed);
        assert!(session.history().is_empty());
    }

    #[test]
    fn test_mouse_input_with_surface_origin() {
        let mut session = session();
        session.set_surface_origin(Point::new(100.0, 200.0));

        let down = session.handle_input(&RawInput::MouseDown {
            position: Point::new(110.0, 250.0),
        });
        assert!(down.suppress_default);
        session.handle_input(&RawInput::MouseMove {
            position: Point::new(190.0, 250.0),
        });
        let up = session.handle_input(&RawInput::MouseUp {
            position: Point::new(190.0, 250.0),
        });

        assert!(up.committed);
        assert_eq!(alpha(&session, 50, 50), 255);
    }

    #[test]
    fn test_mouse_leave_commits() {
        let mut session = session();
        session.handle_input(&RawInput::MouseDown {
            position: Point::new(10.0, 10.0),
        });
        session.handle_input(&RawInput::MouseMove {
            position: Point::new(60.0, 10.0),
        });
        assert!(session.handle_input(&RawInput::MouseLeave).committed);
        assert_eq!(session.history().len(), 1);
        assert!(!session.status().gesture_active);
    }

    #[test]
    fn test_touch_uses_first_contact() {
        let mut session = session();
        let touch = |id, x, y| TouchPoint {
            id,
            position: Point::new(x, y),
        };
        session.handle_input(&RawInput::TouchStart {
            touches: vec![touch(7, 10.0, 30.0), touch(8, 10.0, 70.0)],
        });
        session.handle_input(&RawInput::TouchMove {
            touches: vec![touch(8, 90.0, 70.0)],
        });
        session.handle_input(&RawInput::TouchMove {
            touches: vec![touch(7, 90.0, 30.0)],
        });
        let end = session.handle_input(&RawInput::TouchEnd {
            touches: vec![touch(7, 90.0, 30.0)],
        });

        assert!(end.committed);
        assert_eq!(alpha(&session, 50, 30), 255);
        assert_eq!(alpha(&session, 50, 70), 0);
    }

    #[test]
    fn test_text_confirm_commits() {
        let mut session = session();
        use_tool(&mut session, ToolKind::Text);
        let response = session.handle_input(&RawInput::MouseDown {
            position: Point::new(10.0, 30.0),
        });
        assert!(response.suppress_default);
        assert!(!session.status().gesture_active);
        assert_eq!(session.text_entry().unwrap().anchor(), Point::new(10.0, 30.0));

        // Moves and releases do nothing for the text tool.
        session.handle_input(&RawInput::MouseMove {
            position: Point::new(50.0, 50.0),
        });
        assert!(!session.handle_input(&RawInput::MouseUp {
            position: Point::new(50.0, 50.0)
        })
        .committed);

        assert!(!session.handle_text_key(&key("H"), Modifiers::default()));
        assert!(!session.handle_text_key(&key("i"), Modifiers::default()));
        let ctrl = Modifiers {
            ctrl: true,
            ..Default::default()
        };
        assert!(!session.handle_text_key(&key("z"), ctrl));
        assert_eq!(session.text_entry().unwrap().text(), "Hi");
        assert!(session.handle_text_key(&TextKey::Enter, Modifiers::default()));
        assert_eq!(session.history().len(), 1);
        assert!(session.text_entry().is_none());
    }

    #[test]
    fn test_text_escape_and_empty_commit_nothing() {
        let mut session = session();
        use_tool(&mut session, ToolKind::Text);

        session.handle_gesture(GestureEvent::Begin(Point::new(10.0, 30.0)));
        session.insert_text("draft");
        assert!(!session.handle_text_key(&TextKey::Escape, Modifiers::default()));
        assert!(session.text_entry().is_none());

        session.handle_gesture(GestureEvent::Begin(Point::new(10.0, 30.0)));
        session.insert_text("   ");
        assert!(!session.handle_text_key(&TextKey::Enter, Modifiers::default()));
        assert!(session.text_entry().is_none());

        assert!(session.history().is_empty());
    }

    #[test]
    fn test_pointer_down_confirms_open_text_entry() {
        let mut session = session();
        use_tool(&mut session, ToolKind::Text);
        session.handle_gesture(GestureEvent::Begin(Point::new(10.0, 30.0)));
        session.insert_text("note");

        let response = session.handle_gesture(GestureEvent::Begin(Point::new(40.0, 60.0)));
        assert!(response.committed);
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.text_entry().unwrap().anchor(), Point::new(40.0, 60.0));
    }

    #[test]
    fn test_undo_during_gesture_discards_preview() {
        let mut session = session();
        gesture(&mut session, &[(10.0, 20.0), (90.0, 20.0)]);
        session.handle_gesture(GestureEvent::Begin(Point::new(10.0, 60.0)));
        session.handle_gesture(GestureEvent::Move(Point::new(90.0, 60.0)));
        assert_eq!(alpha(&session, 50, 60), 255);

        assert!(!session.undo());
        assert!(!session.status().gesture_active);
        assert_eq!(alpha(&session, 50, 60), 0);
        assert_eq!(alpha(&session, 50, 20), 255);
        assert!(!session.handle_gesture(GestureEvent::End).committed);
    }

    #[test]
    fn test_status_serializes() {
        let mut session = session();
        gesture(&mut session, &[(10.0, 20.0), (90.0, 20.0)]);
        let status = serde_json::to_value(session.status()).unwrap();
        assert_eq!(status["historyLen"], 1);
        assert_eq!(status["cursor"], 0);
        assert_eq!(status["tool"], "brush");
        assert_eq!(status["textEntryOpen"], false);
    }

    #[test]
    fn test_config_from_json() {
        let config: SessionConfig = serde_json::from_str(
            r##"{"width": 320, "devicePixelRatio": 2, "background": "#ffffff",
                "restoreStrategy": "deferred", "style": {"tool": "arrow", "strokeWidth": 5}}"##,
        )
        .unwrap();
        assert_eq!(config.width, 320.0);
        assert_eq!(config.height, 720.0);
        assert_eq!(config.background, SerializableColor::white());
        assert_eq!(config.restore_strategy, RestoreStrategy::Deferred);
        assert_eq!(config.style.tool, ToolKind::Arrow);
        assert_eq!(config.style.stroke_width, 5.0);
        assert!(config.load_system_fonts);
    }

    #[test]
    fn test_config_style_is_clamped() {
        let config: SessionConfig = serde_json::from_str(
            r#"{"width": 100, "height": 100, "loadSystemFonts": false,
                "style": {"strokeWidth": 100, "fontSize": 2}}"#,
        )
        .unwrap();
        let mut session = Session::new(config);
        assert_eq!(session.style().stroke_width, 30.0);
        assert_eq!(session.style().font_size, 8.0);
        assert_eq!(session.config().style.stroke_width, 30.0);

        session.initialize(Size::new(100.0, 100.0), 1.0).unwrap();
        gesture(&mut session, &[(10.0, 50.0), (90.0, 50.0)]);
        assert_eq!(alpha(&session, 50, 60), 255);
        assert_eq!(alpha(&session, 50, 90), 0);
    }
}
