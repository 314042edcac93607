//! Per-invocation session state and the typed event pipeline.

use futures::stream::{BoxStream, Stream};
use futures::StreamExt;
use tracing::{debug, warn};

use crate::classify::{classify_line, Classified};
use crate::decode::FrameDecoder;
use crate::error::FlowError;
use crate::types::WorkflowEvent;

/// Mutable state owned by one streaming invocation.
///
/// The first-emission flags transition `true → false` exactly once,
/// immediately after the first successfully parsed `message` / `text_chunk`
/// event, and never revert. Sessions are never shared between invocations.
#[derive(Debug)]
pub struct StreamSession {
    first_message: bool,
    first_chunk: bool,
}

impl Default for StreamSession {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamSession {
    pub fn new() -> Self {
        Self {
            first_message: true,
            first_chunk: true,
        }
    }

    /// Decorate a classified event with first-emission metadata, flipping
    /// the matching flag.
    ///
    /// Must be called exactly once per qualifying event, in emission order;
    /// reordering would corrupt the first-chunk semantics callers rely on.
    pub fn annotate(&mut self, event: WorkflowEvent) -> SessionEvent {
        let (is_first_message, is_first_chunk) = match &event {
            WorkflowEvent::Message(_) => (std::mem::replace(&mut self.first_message, false), false),
            WorkflowEvent::TextChunk(_) => (false, std::mem::replace(&mut self.first_chunk, false)),
            _ => (false, false),
        };
        SessionEvent {
            event,
            is_first_message,
            is_first_chunk,
        }
    }
}

/// A classified event decorated with session metadata the raw stream does
/// not carry.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEvent {
    pub event: WorkflowEvent,
    /// True only for the first `message` event of the session.
    pub is_first_message: bool,
    /// True only for the first `text_chunk` event of the session.
    pub is_first_chunk: bool,
}

/// Lifecycle of a driven session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Streaming,
    /// The stream ended gracefully.
    Completed,
    /// A fatal error terminated the session.
    Failed,
}

impl SessionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Turn a raw byte stream into an ordered stream of session events.
///
/// Items are yielded in line-completion order, which is the order the
/// upstream emitted them. Recoverable frame errors are yielded as
/// [`FlowError::Frame`] and the stream continues; a transport failure or a
/// protocol `error` event is yielded and ends the stream with no further
/// lines processed. A truncated trailing line at stream end is dropped, not
/// parsed.
pub fn event_stream<B, S>(bytes: S) -> BoxStream<'static, Result<SessionEvent, FlowError>>
where
    B: AsRef<[u8]> + Send + 'static,
    S: Stream<Item = Result<B, FlowError>> + Send + 'static,
{
    let out = async_stream::stream! {
        let mut decoder = FrameDecoder::new();
        let mut session = StreamSession::new();
        let mut fatal = false;
        futures::pin_mut!(bytes);

        while let Some(chunk) = bytes.next().await {
            let chunk = match chunk {
                Ok(c) => c,
                Err(e) => {
                    yield Err(e);
                    fatal = true;
                    break;
                }
            };

            for line in decoder.feed(chunk.as_ref()) {
                match classify_line(&line) {
                    Classified::Ignored => {}
                    Classified::Malformed { line, source } => {
                        warn!(%source, "malformed data line");
                        yield Err(FlowError::Frame { line, source });
                    }
                    Classified::Event(WorkflowEvent::Error(err)) => {
                        yield Err(FlowError::Protocol {
                            message: err.message,
                            code: err.code,
                        });
                        fatal = true;
                        break;
                    }
                    Classified::Event(event) => yield Ok(session.annotate(event)),
                }
            }
            if fatal {
                break;
            }
        }

        if !fatal && !decoder.residue().is_empty() {
            debug!(
                len = decoder.residue().len(),
                "dropping truncated trailing line at stream end"
            );
        }
    };
    Box::pin(out)
}
