//! Completion session: the authoritative per-request lifecycle
//!
//! One session per provider instance owns all mutable completion state:
//! the active request id, the current preview, acceptance bookkeeping, and
//! the abort handle of the in-flight stream. At most one request id is
//! active; starting a new request invalidates the previous id and aborts
//! its stream in one synchronous step, before any suspension point.
//! Collaborators never mutate state directly, they go through methods that
//! check "is my id still the active one" first.
//!
//! Locks are released before any observer or UI callback runs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::AbortHandle;
use parking_lot::Mutex;
use tracing::debug;

use crate::types::{CompletionPreview, RequestId};

/// Minimum interval between remainder-driven redraw requests
pub const REDRAW_DEBOUNCE: Duration = Duration::from_millis(50);

/// Lifecycle phase of the current request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompletionPhase {
    /// Nothing in flight, nothing previewed
    #[default]
    Idle,
    /// Request created, waiting for the first chunk
    Loading,
    /// Chunks arriving, no newline seen yet
    Streaming,
    /// First line frozen and visible
    PreviewingFirstLine,
    /// First line accepted, remainder on offer
    PreviewingRemainder,
    /// Completion fully accepted
    Accepted,
    /// Dismissed by the user
    Dismissed,
    /// Cancelled by supersession, edits, or cursor movement
    Cancelled,
}

/// Typed lifecycle notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionEvent {
    /// A request became the active one
    Started { request_id: RequestId },
    /// The first line froze and is ready to show
    FirstLineReady { request_id: RequestId },
    /// The preview text changed
    PreviewUpdated { request_id: RequestId },
    /// The stream finished and the preview is final
    Finished { request_id: RequestId },
    /// The request was cancelled or dismissed
    Cancelled { request_id: RequestId },
    /// The model client failed; no completion this time
    Failed { request_id: RequestId },
}

/// Observer for lifecycle events
pub trait CompletionEventSink: Send + Sync {
    fn on_event(&self, event: CompletionEvent);
}

/// Narrow capability interface to the host editor's chrome
pub trait UiSurface: Send + Sync {
    /// Show the "generating" indicator
    fn show_indicator(&self);
    /// Hide the "generating" indicator
    fn hide_indicator(&self);
    /// Ask the editor to repaint the ghost text
    fn request_redraw(&self);
}

/// Event sink that drops everything
#[derive(Debug, Default)]
pub struct NullEventSink;

impl CompletionEventSink for NullEventSink {
    fn on_event(&self, _event: CompletionEvent) {}
}

/// UI surface that does nothing, for tests and headless use
#[derive(Debug, Default)]
pub struct NullUiSurface;

impl UiSurface for NullUiSurface {
    fn show_indicator(&self) {}
    fn hide_indicator(&self) {}
    fn request_redraw(&self) {}
}

/// What an acceptance inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acceptance {
    /// The whole completion, single acceptance
    Whole(String),
    /// The first line of a two-stage completion
    FirstLine(String),
    /// The remainder of a two-stage completion
    Remainder(String),
}

impl Acceptance {
    /// The text this acceptance inserts
    pub fn text(&self) -> &str {
        match self {
            Acceptance::Whole(t) | Acceptance::FirstLine(t) | Acceptance::Remainder(t) => t,
        }
    }
}

#[derive(Default)]
struct SessionState {
    active_id: RequestId,
    phase: CompletionPhase,
    preview: CompletionPreview,
    first_line_frozen: bool,
    two_stage: bool,
    pending_remainder: Option<String>,
    expected_insertion: Option<String>,
    selection_grace: bool,
    abort_handle: Option<AbortHandle>,
    last_redraw: Option<Instant>,
}

enum UiAction {
    ShowIndicator,
    HideIndicator,
    RequestRedraw,
}

/// Owns the mutable state of one provider instance
pub struct CompletionSession {
    counter: AtomicU64,
    state: Mutex<SessionState>,
    events: Arc<dyn CompletionEventSink>,
    ui: Arc<dyn UiSurface>,
}

impl Default for CompletionSession {
    fn default() -> Self {
        Self::new(Arc::new(NullEventSink), Arc::new(NullUiSurface))
    }
}

impl CompletionSession {
    /// Create a session with the given observers
    pub fn new(events: Arc<dyn CompletionEventSink>, ui: Arc<dyn UiSurface>) -> Self {
        Self {
            counter: AtomicU64::new(0),
            state: Mutex::new(SessionState::default()),
            events,
            ui,
        }
    }

    fn dispatch(&self, event: Option<CompletionEvent>, actions: Vec<UiAction>) {
        for action in actions {
            match action {
                UiAction::ShowIndicator => self.ui.show_indicator(),
                UiAction::HideIndicator => self.ui.hide_indicator(),
                UiAction::RequestRedraw => self.ui.request_redraw(),
            }
        }
        if let Some(event) = event {
            self.events.on_event(event);
        }
    }

    /// Start a new request, invalidating and aborting any previous one
    ///
    /// Everything here happens before the caller can reach an await point,
    /// so no two requests' stream loops ever interleave visible effects.
    pub fn begin_request(&self) -> RequestId {
        let id = RequestId(self.counter.fetch_add(1, Ordering::SeqCst) + 1);
        let (event, actions) = {
            let mut state = self.state.lock();
            if let Some(handle) = state.abort_handle.take() {
                handle.abort();
            }
            state.active_id = id;
            state.phase = CompletionPhase::Loading;
            state.preview = CompletionPreview::default();
            state.first_line_frozen = false;
            state.two_stage = false;
            state.pending_remainder = None;
            state.expected_insertion = None;
            state.selection_grace = false;
            state.last_redraw = None;
            (
                Some(CompletionEvent::Started { request_id: id }),
                vec![UiAction::ShowIndicator],
            )
        };
        self.dispatch(event, actions);
        id
    }

    /// Whether this id is still the active request
    pub fn is_active(&self, id: RequestId) -> bool {
        self.state.lock().active_id == id
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> CompletionPhase {
        self.state.lock().phase
    }

    /// Current preview, if any
    pub fn preview(&self) -> CompletionPreview {
        self.state.lock().preview.clone()
    }

    /// Register the abort handle of the request's stream
    ///
    /// If the request was superseded while the stream was being opened,
    /// the handle is aborted on the spot.
    pub fn attach_abort(&self, id: RequestId, handle: AbortHandle) {
        let mut state = self.state.lock();
        if state.active_id == id {
            state.abort_handle = Some(handle);
        } else {
            handle.abort();
        }
    }

    /// Apply a streamed preview update
    ///
    /// Returns `false` (and mutates nothing) when the id is no longer
    /// active. Once the first newline appears the first line freezes: an
    /// explicit redraw fires and later updates only touch the remainder,
    /// rate-limited to the redraw cadence.
    pub fn update_preview(&self, id: RequestId, preview: CompletionPreview) -> bool {
        let (applied, event, actions) = {
            let mut state = self.state.lock();
            if state.active_id != id {
                (false, None, Vec::new())
            } else {
                let event;
                let mut actions = Vec::new();
                state.phase = match state.phase {
                    CompletionPhase::Loading => CompletionPhase::Streaming,
                    other => other,
                };

                if !state.first_line_frozen && preview.raw_text.contains('\n') {
                    state.first_line_frozen = true;
                    state.phase = CompletionPhase::PreviewingFirstLine;
                    state.preview = preview;
                    state.last_redraw = Some(Instant::now());
                    event = Some(CompletionEvent::FirstLineReady { request_id: id });
                    actions.push(UiAction::RequestRedraw);
                } else {
                    if state.first_line_frozen {
                        // only the remainder moves once the first line froze
                        state.preview.remaining_lines = preview.remaining_lines;
                        state.preview.raw_text = preview.raw_text;
                    } else {
                        state.preview = preview;
                    }
                    event = Some(CompletionEvent::PreviewUpdated { request_id: id });
                    let due = state
                        .last_redraw
                        .map(|at| at.elapsed() >= REDRAW_DEBOUNCE)
                        .unwrap_or(true);
                    if due {
                        state.last_redraw = Some(Instant::now());
                        actions.push(UiAction::RequestRedraw);
                    }
                }
                (true, event, actions)
            }
        };
        self.dispatch(event, actions);
        applied
    }

    /// Install the final preview after the stream completed
    ///
    /// The final cleaned text is split one last time so the preview
    /// reflects the complete response, frozen first line included.
    pub fn finish_request(&self, id: RequestId, preview: CompletionPreview, two_stage: bool) -> bool {
        let (finished, event, actions) = {
            let mut state = self.state.lock();
            if state.active_id != id {
                (false, None, Vec::new())
            } else {
                state.preview = preview;
                state.first_line_frozen = true;
                state.two_stage = two_stage && !state.preview.is_single_line();
                state.phase = CompletionPhase::PreviewingFirstLine;
                state.abort_handle = None;
                (
                    true,
                    Some(CompletionEvent::Finished { request_id: id }),
                    vec![UiAction::HideIndicator, UiAction::RequestRedraw],
                )
            }
        };
        self.dispatch(event, actions);
        finished
    }

    /// Resolve a failed request to "no completion"
    pub fn fail_request(&self, id: RequestId) {
        let (event, actions) = {
            let mut state = self.state.lock();
            if state.active_id != id {
                (None, Vec::new())
            } else {
                state.active_id = RequestId::NONE;
                state.phase = CompletionPhase::Idle;
                state.preview = CompletionPreview::default();
                state.abort_handle = None;
                (
                    Some(CompletionEvent::Failed { request_id: id }),
                    vec![UiAction::HideIndicator],
                )
            }
        };
        self.dispatch(event, actions);
    }

    /// Cancel whatever is in flight and clear the preview
    ///
    /// Used for supersession, cursor movement, and document edits.
    pub fn cancel(&self) {
        self.clear_with_phase(CompletionPhase::Cancelled);
    }

    /// Dismiss the preview at the user's request
    pub fn dismiss(&self) {
        self.clear_with_phase(CompletionPhase::Dismissed);
    }

    fn clear_with_phase(&self, phase: CompletionPhase) {
        let (event, actions) = {
            let mut state = self.state.lock();
            if state.active_id == RequestId::NONE && state.pending_remainder.is_none() {
                (None, Vec::new())
            } else {
                let id = state.active_id;
                if let Some(handle) = state.abort_handle.take() {
                    handle.abort();
                }
                state.active_id = RequestId::NONE;
                state.phase = phase;
                state.preview = CompletionPreview::default();
                state.first_line_frozen = false;
                state.two_stage = false;
                state.pending_remainder = None;
                state.expected_insertion = None;
                state.selection_grace = false;
                (
                    Some(CompletionEvent::Cancelled { request_id: id }),
                    vec![UiAction::HideIndicator, UiAction::RequestRedraw],
                )
            }
        };
        self.dispatch(event, actions);
    }

    /// Accept the current preview
    ///
    /// Single-line (or auto-mode) completions resolve in one acceptance.
    /// Two-stage completions hand out the first line, then the remainder
    /// on the second call.
    pub fn accept(&self) -> Option<Acceptance> {
        let (outcome, actions) = {
            let mut state = self.state.lock();
            match state.phase {
                CompletionPhase::PreviewingFirstLine => {
                    if state.two_stage {
                        let first = state.preview.first_line.clone();
                        let remainder = state.preview.remaining_lines.clone();
                        state.pending_remainder = Some(remainder);
                        state.expected_insertion = Some(first.clone());
                        state.phase = CompletionPhase::PreviewingRemainder;
                        (Some(Acceptance::FirstLine(first)), Vec::new())
                    } else {
                        let whole = state.preview.raw_text.clone();
                        state.expected_insertion = Some(whole.clone());
                        Self::reset_after_acceptance(&mut state);
                        (Some(Acceptance::Whole(whole)), vec![UiAction::RequestRedraw])
                    }
                }
                CompletionPhase::PreviewingRemainder => {
                    let remainder = state.pending_remainder.take()?;
                    state.expected_insertion = Some(remainder.clone());
                    Self::reset_after_acceptance(&mut state);
                    (
                        Some(Acceptance::Remainder(remainder)),
                        vec![UiAction::RequestRedraw],
                    )
                }
                _ => (None, Vec::new()),
            }
        };
        self.dispatch(None, actions);
        outcome
    }

    fn reset_after_acceptance(state: &mut SessionState) {
        state.active_id = RequestId::NONE;
        state.phase = CompletionPhase::Accepted;
        state.preview = CompletionPreview::default();
        state.first_line_frozen = false;
        state.two_stage = false;
        state.pending_remainder = None;
    }

    /// The remainder waiting to be served after a first-line acceptance
    pub fn pending_remainder(&self) -> Option<(RequestId, String)> {
        let state = self.state.lock();
        match (&state.phase, &state.pending_remainder) {
            (CompletionPhase::PreviewingRemainder, Some(remainder)) => {
                Some((state.active_id, remainder.clone()))
            }
            _ => None,
        }
    }

    /// Whether a document change is the insertion we just produced
    ///
    /// The editor reports the inserted text after an acceptance; matching
    /// it means the change must not cancel the session or the cache.
    pub fn consume_expected_insertion(&self, inserted: &str) -> bool {
        let mut state = self.state.lock();
        match state.expected_insertion.take() {
            Some(expected) if expected == inserted => {
                // the cursor lands after the insert; that selection change
                // must not cancel a pending remainder
                state.selection_grace = true;
                true
            }
            Some(expected) => {
                debug!("document change does not match accepted text");
                state.expected_insertion = Some(expected);
                false
            }
            None => false,
        }
    }

    /// Consume the one-shot grace period after an acceptance insertion
    pub fn take_selection_grace(&self) -> bool {
        let mut state = self.state.lock();
        std::mem::take(&mut state.selection_grace)
    }
}
