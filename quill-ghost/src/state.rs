use std::time::{Duration, Instant};

use quill_client::{CompletionResult, CompletionStatus, RequestId};

use crate::anchor::{wrap_to_surface, RenderSurface};
use crate::diff::incremental_diff;
use crate::format::format_suggestion;

/// Cursor movement within this many chars of the anchor keeps the overlay
/// alive.
const CURSOR_TOLERANCE: usize = 5;
/// Accept is refused once the cursor drifts this far from the anchor.
const ACCEPT_ANCHOR_TOLERANCE: usize = 50;
/// Default auto-hide window; extended by user activity.
const DEFAULT_AUTO_HIDE: Duration = Duration::from_secs(25);
/// How much a space keypress extends the auto-hide timer.
const SPACE_EXTENSION: Duration = Duration::from_secs(3);
/// How much an in-range text edit extends the auto-hide timer before the
/// overlay clears, which also extends the auto-hide timer by a few seconds
/// note on the TextChange-inside-anchor-range row.
const EDIT_GRACE_EXTENSION: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq)]
pub struct DisplayedOverlay {
    pub request_id: RequestId,
    pub anchor_pos: usize,
    pub suffix: String,
    pub wrapped_lines: Vec<String>,
    expires_at: Instant,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GhostTextState {
    Idle,
    Requesting(RequestId),
    Displayed(DisplayedOverlay),
    Accepted,
    Error(String),
}

/// A side effect the host should perform in response to a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    None,
    ShowThinking,
    ClearIndicator,
    RenderOverlay,
    /// The overlay was cleared. `grace_extension`, when set, is how much
    /// longer the host should hold off re-triggering a completion on this
    /// surface - set on the `TextChange`-inside-anchor-range transition
    /// (spec §4.7's state table), since an edit landing inside the just-
    /// cleared suggestion is a strong signal the user is still revising
    /// that spot rather than ready for a new one.
    ClearOverlay { grace_extension: Option<Duration> },
    /// The suffix to insert at `at` and the new cursor position after
    /// insertion; the host applies this via `quill-doc::Document::insert`.
    Accept { suffix: String, at: usize },
    SurfaceError(String),
}

/// Keys the overlay reacts to while `Displayed`. Everything else falls
/// through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Tab,
    EnterOnEmptyLine,
    Escape,
    Space,
    /// A printable character typed outside the anchor range.
    PrintableOutsideAnchor,
}

/// Owns one surface's ghost-text lifecycle: request tracking, the
/// incremental diff, anchored wrapping, and the accept/reject/invalidate
/// transitions for a single overlay's lifetime.
pub struct GhostTextMachine {
    state: GhostTextState,
}

impl Default for GhostTextMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl GhostTextMachine {
    pub fn new() -> Self {
        Self { state: GhostTextState::Idle }
    }

    pub fn state(&self) -> &GhostTextState {
        &self.state
    }

    /// `Idle | * -> Requesting(rid)`. Launching a new request always wins;
    /// the in-flight slot above this machine is responsible for cancelling
    /// whatever was previously outstanding.
    pub fn start_request(&mut self, request_id: RequestId) -> Outcome {
        self.state = GhostTextState::Requesting(request_id);
        Outcome::ShowThinking
    }

    /// Applies a [`CompletionResult`], given the buffer immediately before
    /// the cursor at the moment of display and the surface used to wrap a
    /// multi-line overlay. Results for any id other than the current
    /// in-flight one are discarded silently, matching the invariant that a
    /// stale result never produces a visible side effect.
    pub fn receive_result(
        &mut self,
        result: CompletionResult,
        buffer_before_cursor: &str,
        cursor_pos: usize,
        surface: &dyn RenderSurface,
        now: Instant,
    ) -> Outcome {
        let GhostTextState::Requesting(in_flight) = self.state else {
            return Outcome::None;
        };
        if in_flight != result.request_id {
            return Outcome::None;
        }

        match result.status {
            CompletionStatus::Ok => {
                let Some(raw) = result.text else {
                    self.state = GhostTextState::Idle;
                    return Outcome::ClearIndicator;
                };
                let formatted = format_suggestion(&raw, buffer_before_cursor);
                let Some(suffix) = incremental_diff(buffer_before_cursor, &formatted) else {
                    self.state = GhostTextState::Idle;
                    return Outcome::ClearIndicator;
                };
                let wrapped_lines = wrap_to_surface(&suffix, surface);
                self.state = GhostTextState::Displayed(DisplayedOverlay {
                    request_id: result.request_id,
                    anchor_pos: cursor_pos,
                    suffix,
                    wrapped_lines,
                    expires_at: now + DEFAULT_AUTO_HIDE,
                });
                Outcome::RenderOverlay
            }
            CompletionStatus::Cancelled | CompletionStatus::Timeout => {
                self.state = GhostTextState::Idle;
                Outcome::ClearIndicator
            }
            CompletionStatus::Error(kind) => {
                self.state = GhostTextState::Idle;
                Outcome::SurfaceError(format!("completion failed: {kind:?}"))
            }
        }
    }

    /// A viewport resize re-wraps the stored anchor and display text
    /// without moving the anchor or re-running the diff.
    pub fn rewrap(&mut self, surface: &dyn RenderSurface) {
        if let GhostTextState::Displayed(overlay) = &mut self.state {
            overlay.wrapped_lines = wrap_to_surface(&overlay.suffix, surface);
        }
    }

    pub fn cursor_moved(&mut self, new_cursor_pos: usize) -> Outcome {
        let GhostTextState::Displayed(overlay) = &self.state else {
            return Outcome::None;
        };
        let delta = new_cursor_pos.abs_diff(overlay.anchor_pos);
        let moved_far_left = new_cursor_pos < overlay.anchor_pos && delta > CURSOR_TOLERANCE;
        if delta <= CURSOR_TOLERANCE && !moved_far_left {
            Outcome::None
        } else {
            self.state = GhostTextState::Idle;
            Outcome::ClearOverlay { grace_extension: None }
        }
    }

    /// A text mutation while `Displayed`. `change_start..change_end` is the
    /// half-open char range touched by the edit. When the edit lands
    /// inside the overlay's own anchor range, the cleared overlay carries
    /// a grace extension so the host's re-trigger debounce waits a little
    /// longer before firing again on the same spot (spec §4.7's state
    /// table, "TextChange inside anchor range").
    pub fn text_changed(&mut self, change_start: usize, change_end: usize, _now: Instant) -> Outcome {
        let GhostTextState::Displayed(overlay) = &self.state else {
            return Outcome::None;
        };
        let anchor_range = overlay.anchor_pos..(overlay.anchor_pos + overlay.suffix.chars().count());
        let inside = change_start < anchor_range.end && change_end > anchor_range.start;
        self.state = GhostTextState::Idle;
        Outcome::ClearOverlay { grace_extension: inside.then_some(EDIT_GRACE_EXTENSION) }
    }

    pub fn key(&mut self, key: Key, cursor_pos: usize, now: Instant) -> Outcome {
        let GhostTextState::Displayed(overlay) = &self.state else {
            return Outcome::None;
        };

        match key {
            Key::Tab | Key::EnterOnEmptyLine => self.accept(cursor_pos),
            Key::Escape | Key::PrintableOutsideAnchor => {
                self.state = GhostTextState::Idle;
                Outcome::ClearOverlay { grace_extension: None }
            }
            Key::Space => {
                let anchor_pos = overlay.anchor_pos;
                let suffix = overlay.suffix.clone();
                let wrapped_lines = overlay.wrapped_lines.clone();
                let request_id = overlay.request_id;
                self.state = GhostTextState::Displayed(DisplayedOverlay {
                    request_id,
                    anchor_pos,
                    suffix,
                    wrapped_lines,
                    expires_at: now + SPACE_EXTENSION,
                });
                Outcome::None
            }
        }
    }

    /// Accept is refused (overlay cleared instead) if the cursor has
    /// drifted more than [`ACCEPT_ANCHOR_TOLERANCE`] chars from the
    /// anchor.
    pub fn accept(&mut self, cursor_pos: usize) -> Outcome {
        let GhostTextState::Displayed(overlay) = &self.state else {
            return Outcome::None;
        };
        if cursor_pos.abs_diff(overlay.anchor_pos) > ACCEPT_ANCHOR_TOLERANCE {
            self.state = GhostTextState::Idle;
            return Outcome::ClearOverlay { grace_extension: None };
        }
        let suffix = overlay.suffix.clone();
        let at = overlay.anchor_pos;
        self.state = GhostTextState::Accepted;
        Outcome::Accept { suffix, at }
    }

    pub fn reject(&mut self) -> Outcome {
        if matches!(self.state, GhostTextState::Displayed(_)) {
            self.state = GhostTextState::Idle;
            Outcome::ClearOverlay { grace_extension: None }
        } else {
            Outcome::None
        }
    }

    /// Call periodically (or on a timer fire) to clear overlays whose
    /// auto-hide window has elapsed.
    pub fn check_auto_hide(&mut self, now: Instant) -> Outcome {
        let expired = match &self.state {
            GhostTextState::Displayed(overlay) => now >= overlay.expires_at,
            _ => false,
        };
        if expired {
            self.state = GhostTextState::Idle;
            Outcome::ClearOverlay { grace_extension: None }
        } else {
            Outcome::None
        }
    }

    /// After an `Accepted`/`Error` transition has been observed by the
    /// host, return to `Idle` so the machine is ready for the next
    /// request.
    pub fn acknowledge(&mut self) {
        if matches!(self.state, GhostTextState::Accepted | GhostTextState::Error(_)) {
            self.state = GhostTextState::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchor::FixedWidthSurface;

    fn surface() -> FixedWidthSurface {
        FixedWidthSurface { char_width: 1.0, line_height: 1.0, available_width: 1000.0 }
    }

    #[test]
    fn full_cycle_from_request_to_accept() {
        let mut machine = GhostTextMachine::new();
        let rid = RequestId::from_raw(1);
        assert_eq!(machine.start_request(rid), Outcome::ShowThinking);

        let result = CompletionResult::ok(rid, "stepped into the garden.".to_string(), None);
        let outcome = machine.receive_result(result, "Alice opened the door and ", 27, &surface(), Instant::now());
        assert_eq!(outcome, Outcome::RenderOverlay);

        let GhostTextState::Displayed(overlay) = machine.state() else { panic!("expected Displayed") };
        assert_eq!(overlay.suffix, "stepped into the garden.");
        assert_eq!(overlay.anchor_pos, 27);

        let outcome = machine.accept(27);
        assert_eq!(outcome, Outcome::Accept { suffix: "stepped into the garden.".to_string(), at: 27 });
        assert_eq!(machine.state(), &GhostTextState::Accepted);
    }

    #[test]
    fn stale_result_is_discarded_silently() {
        let mut machine = GhostTextMachine::new();
        machine.start_request(RequestId::from_raw(5));
        let stale = CompletionResult::ok(RequestId::from_raw(4), "ignored".to_string(), None);
        let outcome = machine.receive_result(stale, "", 0, &surface(), Instant::now());
        assert_eq!(outcome, Outcome::None);
        assert_eq!(machine.state(), &GhostTextState::Requesting(RequestId::from_raw(5)));
    }

    #[test]
    fn text_change_inside_anchor_range_clears_overlay_with_a_grace_extension() {
        let mut machine = GhostTextMachine::new();
        let rid = RequestId::from_raw(1);
        machine.start_request(rid);
        machine.receive_result(
            CompletionResult::ok(rid, "more text".to_string(), None),
            "buffer ",
            7,
            &surface(),
            Instant::now(),
        );
        // anchor is at 7, suffix is "more text" (9 chars) -> anchor range 7..16
        let outcome = machine.text_changed(8, 9, Instant::now());
        assert_eq!(outcome, Outcome::ClearOverlay { grace_extension: Some(EDIT_GRACE_EXTENSION) });
        assert_eq!(machine.state(), &GhostTextState::Idle);
    }

    #[test]
    fn text_change_outside_anchor_range_clears_overlay_without_a_grace_extension() {
        let mut machine = GhostTextMachine::new();
        let rid = RequestId::from_raw(1);
        machine.start_request(rid);
        machine.receive_result(
            CompletionResult::ok(rid, "more text".to_string(), None),
            "buffer ",
            7,
            &surface(),
            Instant::now(),
        );
        let outcome = machine.text_changed(0, 1, Instant::now());
        assert_eq!(outcome, Outcome::ClearOverlay { grace_extension: None });
    }

    #[test]
    fn cursor_move_within_tolerance_keeps_overlay() {
        let mut machine = GhostTextMachine::new();
        let rid = RequestId::from_raw(1);
        machine.start_request(rid);
        machine.receive_result(
            CompletionResult::ok(rid, "more text".to_string(), None),
            "buffer ",
            7,
            &surface(),
            Instant::now(),
        );
        assert_eq!(machine.cursor_moved(9), Outcome::None);
        assert!(matches!(machine.state(), GhostTextState::Displayed(_)));
    }

    #[test]
    fn cursor_move_beyond_tolerance_clears_overlay() {
        let mut machine = GhostTextMachine::new();
        let rid = RequestId::from_raw(1);
        machine.start_request(rid);
        machine.receive_result(
            CompletionResult::ok(rid, "more text".to_string(), None),
            "buffer ",
            7,
            &surface(),
            Instant::now(),
        );
        assert_eq!(machine.cursor_moved(50), Outcome::ClearOverlay { grace_extension: None });
        assert_eq!(machine.state(), &GhostTextState::Idle);
    }

    #[test]
    fn accept_refused_once_cursor_drifts_past_tolerance() {
        let mut machine = GhostTextMachine::new();
        let rid = RequestId::from_raw(1);
        machine.start_request(rid);
        machine.receive_result(
            CompletionResult::ok(rid, "more text".to_string(), None),
            "buffer ",
            7,
            &surface(),
            Instant::now(),
        );
        let outcome = machine.accept(7 + ACCEPT_ANCHOR_TOLERANCE + 1);
        assert_eq!(outcome, Outcome::ClearOverlay { grace_extension: None });
        assert_eq!(machine.state(), &GhostTextState::Idle);
    }

    #[test]
    fn auto_hide_clears_after_expiry() {
        let mut machine = GhostTextMachine::new();
        let rid = RequestId::from_raw(1);
        machine.start_request(rid);
        let start = Instant::now();
        machine.receive_result(CompletionResult::ok(rid, "more text".to_string(), None), "buffer ", 7, &surface(), start);
        assert_eq!(machine.check_auto_hide(start + Duration::from_secs(10)), Outcome::None);
        assert_eq!(machine.check_auto_hide(start + DEFAULT_AUTO_HIDE + Duration::from_secs(1)), Outcome::ClearOverlay { grace_extension: None });
    }

    #[test]
    fn error_result_surfaces_message_and_returns_to_idle() {
        let mut machine = GhostTextMachine::new();
        let rid = RequestId::from_raw(1);
        machine.start_request(rid);
        let result = CompletionResult::error(rid, quill_client::ClientErrorKind::Provider);
        let outcome = machine.receive_result(result, "buffer ", 7, &surface(), Instant::now());
        assert!(matches!(outcome, Outcome::SurfaceError(_)));
        assert_eq!(machine.state(), &GhostTextState::Idle);
    }
}
