//! Callback routing and the single-fire completion guarantee.

use tracing::trace;

use crate::error::FlowError;
use crate::session::{SessionEvent, SessionPhase};
use crate::types::{
    Message, NodeFinished, NodeStarted, TextChunk, WorkflowEvent, WorkflowFinished,
    WorkflowStarted,
};

/// Consumer-supplied handler set.
///
/// Every entry is optional and treated as a no-op if absent. Text-bearing
/// handlers additionally receive the session's first-emission flag.
#[derive(Default)]
pub struct WorkflowCallbacks {
    on_workflow_started: Option<Box<dyn FnMut(&WorkflowStarted) + Send>>,
    on_workflow_finished: Option<Box<dyn FnMut(&WorkflowFinished) + Send>>,
    on_node_started: Option<Box<dyn FnMut(&NodeStarted) + Send>>,
    on_node_finished: Option<Box<dyn FnMut(&NodeFinished) + Send>>,
    on_text_chunk: Option<Box<dyn FnMut(&TextChunk, bool) + Send>>,
    on_message: Option<Box<dyn FnMut(&Message, bool) + Send>>,
    on_ping: Option<Box<dyn FnMut() + Send>>,
    on_error: Option<Box<dyn FnMut(&str, Option<&str>) + Send>>,
    on_completed: Option<Box<dyn FnMut(bool) + Send>>,
}

impl WorkflowCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_workflow_started(
        mut self,
        f: impl FnMut(&WorkflowStarted) + Send + 'static,
    ) -> Self {
        self.on_workflow_started = Some(Box::new(f));
        self
    }

    pub fn on_workflow_finished(
        mut self,
        f: impl FnMut(&WorkflowFinished) + Send + 'static,
    ) -> Self {
        self.on_workflow_finished = Some(Box::new(f));
        self
    }

    pub fn on_node_started(mut self, f: impl FnMut(&NodeStarted) + Send + 'static) -> Self {
        self.on_node_started = Some(Box::new(f));
        self
    }

    pub fn on_node_finished(mut self, f: impl FnMut(&NodeFinished) + Send + 'static) -> Self {
        self.on_node_finished = Some(Box::new(f));
        self
    }

    /// Handler for incremental text; the second argument is true only for
    /// the first fragment of the session.
    pub fn on_text_chunk(mut self, f: impl FnMut(&TextChunk, bool) + Send + 'static) -> Self {
        self.on_text_chunk = Some(Box::new(f));
        self
    }

    /// Handler for legacy completion messages; the second argument is true
    /// only for the first message of the session.
    pub fn on_message(mut self, f: impl FnMut(&Message, bool) + Send + 'static) -> Self {
        self.on_message = Some(Box::new(f));
        self
    }

    pub fn on_ping(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.on_ping = Some(Box::new(f));
        self
    }

    /// Handler for every failure, recoverable or fatal: `(message, code)`.
    pub fn on_error(mut self, f: impl FnMut(&str, Option<&str>) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    /// Terminal handler; fires exactly once per session with `has_error`.
    pub fn on_completed(mut self, f: impl FnMut(bool) + Send + 'static) -> Self {
        self.on_completed = Some(Box::new(f));
        self
    }

    /// Deliver an error through `on_error`, splitting out message and code.
    pub fn report_error(&mut self, err: &FlowError) {
        if let Some(f) = self.on_error.as_mut() {
            match err {
                FlowError::Protocol { message, code } | FlowError::Api { message, code, .. } => {
                    f(message, code.as_deref());
                }
                other => f(&other.to_string(), None),
            }
        }
    }

    fn fire_completed(&mut self, has_error: bool) {
        if let Some(f) = self.on_completed.as_mut() {
            f(has_error);
        }
    }
}

/// Route one decorated event to the single matching handler.
///
/// Never invokes more than one handler per event. Unknown kinds dispatch to
/// nothing; `error` events are converted to [`FlowError::Protocol`] upstream
/// of the dispatcher and never reach it through the normal path.
pub fn dispatch(event: &SessionEvent, callbacks: &mut WorkflowCallbacks) {
    match &event.event {
        WorkflowEvent::WorkflowStarted(e) => {
            if let Some(f) = callbacks.on_workflow_started.as_mut() {
                f(e);
            }
        }
        WorkflowEvent::WorkflowFinished(e) => {
            if let Some(f) = callbacks.on_workflow_finished.as_mut() {
                f(e);
            }
        }
        WorkflowEvent::NodeStarted(e) => {
            if let Some(f) = callbacks.on_node_started.as_mut() {
                f(e);
            }
        }
        WorkflowEvent::NodeFinished(e) => {
            if let Some(f) = callbacks.on_node_finished.as_mut() {
                f(e);
            }
        }
        WorkflowEvent::TextChunk(e) => {
            if let Some(f) = callbacks.on_text_chunk.as_mut() {
                f(e, event.is_first_chunk);
            }
        }
        WorkflowEvent::Message(e) => {
            if let Some(f) = callbacks.on_message.as_mut() {
                f(e, event.is_first_message);
            }
        }
        WorkflowEvent::Ping => {
            if let Some(f) = callbacks.on_ping.as_mut() {
                f();
            }
        }
        WorkflowEvent::Error(e) => {
            // Reached only if a caller dispatches a hand-built event; the
            // pipeline converts error events to `FlowError::Protocol` first.
            if let Some(f) = callbacks.on_error.as_mut() {
                f(&e.message, e.code.as_deref());
            }
        }
        WorkflowEvent::Unknown => trace!("dropping unrecognized event"),
    }
}

/// Guarantees the terminal completion callback fires exactly once.
///
/// State machine: `Idle → Streaming → {Completed, Failed}`. Both terminal
/// states route through the same single fire.
#[derive(Debug)]
pub struct CompletionGuard {
    phase: SessionPhase,
}

impl Default for CompletionGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionGuard {
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Idle,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Mark the session as streaming (a readable body was obtained).
    pub fn start_streaming(&mut self) {
        if self.phase == SessionPhase::Idle {
            self.phase = SessionPhase::Streaming;
        }
    }

    /// Finalize after graceful stream end. Idempotent.
    pub fn complete(&mut self, callbacks: &mut WorkflowCallbacks, has_error: bool) {
        self.finish(SessionPhase::Completed, callbacks, has_error);
    }

    /// Finalize after a fatal error. Idempotent.
    pub fn fail(&mut self, callbacks: &mut WorkflowCallbacks) {
        self.finish(SessionPhase::Failed, callbacks, true);
    }

    fn finish(
        &mut self,
        terminal: SessionPhase,
        callbacks: &mut WorkflowCallbacks,
        has_error: bool,
    ) {
        if self.phase.is_terminal() {
            return;
        }
        self.phase = terminal;
        callbacks.fire_completed(has_error);
    }
}
