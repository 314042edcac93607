//! Maps complete protocol lines to typed workflow events.

use tracing::trace;

use crate::normalize::normalize_escapes;
use crate::types::WorkflowEvent;

/// Marker prefix of a significant protocol line.
const DATA_MARKER: &str = "data:";

/// Outcome of classifying one decoded line.
#[derive(Debug)]
pub enum Classified {
    /// A protocol-relevant event.
    Event(WorkflowEvent),
    /// Blank line, comment, or other non-data framing; skipped silently.
    Ignored,
    /// A data line whose JSON payload failed to parse. Recoverable: the
    /// session continues with the next line. Carries the offending line for
    /// diagnostics.
    Malformed {
        line: String,
        source: serde_json::Error,
    },
}

/// Classify one complete line.
///
/// Non-data lines are [`Classified::Ignored`]. For data lines the marker is
/// stripped and the JSON payload parsed; text-bearing fields pass through
/// the escape normalizer before the event leaves the classifier.
pub fn classify_line(line: &str) -> Classified {
    let line = line.trim();
    let Some(payload) = line.strip_prefix(DATA_MARKER) else {
        if !line.is_empty() {
            trace!(line, "skipping non-data line");
        }
        return Classified::Ignored;
    };
    let payload = payload.trim_start();

    match serde_json::from_str::<WorkflowEvent>(payload) {
        Ok(mut event) => {
            if matches!(event, WorkflowEvent::Unknown) {
                trace!(payload, "unrecognized event kind");
            }
            normalize_text_fields(&mut event);
            Classified::Event(event)
        }
        Err(source) => Classified::Malformed {
            line: line.to_string(),
            source,
        },
    }
}

fn normalize_text_fields(event: &mut WorkflowEvent) {
    match event {
        WorkflowEvent::Message(message) => {
            message.answer = normalize_escapes(&message.answer);
        }
        WorkflowEvent::TextChunk(chunk) => {
            if let Some(data) = chunk.data.as_mut() {
                data.text = normalize_escapes(&data.text);
            }
            if let Some(text) = chunk.text.as_mut() {
                *text = normalize_escapes(text);
            }
        }
        _ => {}
    }
}
