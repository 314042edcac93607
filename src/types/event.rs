//! Workflow event payloads, keyed by the `event` discriminator field.

use serde::Deserialize;
use serde_json::Value;

/// One event decoded from a `data:` frame.
///
/// The wire payload is a JSON object whose `event` field selects the shape.
/// Unrecognized discriminators deserialize to [`WorkflowEvent::Unknown`] so
/// future event kinds never fail classification.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WorkflowEvent {
    WorkflowStarted(WorkflowStarted),
    WorkflowFinished(WorkflowFinished),
    NodeStarted(NodeStarted),
    NodeFinished(NodeFinished),
    TextChunk(TextChunk),
    /// Legacy non-workflow completion mode.
    Message(Message),
    Error(ErrorEvent),
    Ping,
    #[serde(other)]
    Unknown,
}

/// Correlation identifiers shared by workflow-scoped events.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventMeta {
    pub task_id: Option<String>,
    pub workflow_run_id: Option<String>,
}

impl WorkflowEvent {
    /// Correlation identifiers, where the event kind carries them.
    pub fn meta(&self) -> EventMeta {
        match self {
            Self::WorkflowStarted(e) => EventMeta {
                task_id: Some(e.task_id.clone()),
                workflow_run_id: Some(e.workflow_run_id.clone()),
            },
            Self::WorkflowFinished(e) => EventMeta {
                task_id: Some(e.task_id.clone()),
                workflow_run_id: Some(e.workflow_run_id.clone()),
            },
            Self::NodeStarted(e) => EventMeta {
                task_id: Some(e.task_id.clone()),
                workflow_run_id: Some(e.workflow_run_id.clone()),
            },
            Self::NodeFinished(e) => EventMeta {
                task_id: Some(e.task_id.clone()),
                workflow_run_id: Some(e.workflow_run_id.clone()),
            },
            Self::TextChunk(e) => EventMeta {
                task_id: e.task_id.clone(),
                workflow_run_id: e.workflow_run_id.clone(),
            },
            Self::Message(e) => EventMeta {
                task_id: e.task_id.clone(),
                workflow_run_id: None,
            },
            Self::Error(_) | Self::Ping | Self::Unknown => EventMeta::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WorkflowStarted {
    pub task_id: String,
    pub workflow_run_id: String,
    pub data: WorkflowStartedData,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WorkflowStartedData {
    pub id: String,
    pub workflow_id: String,
    #[serde(default)]
    pub sequence_number: Option<u64>,
    #[serde(default)]
    pub created_at: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WorkflowFinished {
    pub task_id: String,
    pub workflow_run_id: String,
    pub data: WorkflowFinishedData,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WorkflowFinishedData {
    pub id: String,
    #[serde(default)]
    pub workflow_id: Option<String>,
    /// Terminal status reported by the upstream (`succeeded`, `failed`, ...).
    #[serde(default)]
    pub status: Option<String>,
    /// Aggregate outputs of the run.
    #[serde(default)]
    pub outputs: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub elapsed_time: Option<f64>,
    #[serde(default)]
    pub total_tokens: Option<u64>,
    #[serde(default)]
    pub total_steps: Option<u64>,
    #[serde(default)]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub finished_at: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NodeStarted {
    pub task_id: String,
    pub workflow_run_id: String,
    pub data: NodeStartedData,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NodeStartedData {
    pub id: String,
    pub node_id: String,
    #[serde(default)]
    pub node_type: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    /// Ordinal position of the node within the run.
    #[serde(default)]
    pub index: Option<u64>,
    #[serde(default)]
    pub predecessor_node_id: Option<String>,
    #[serde(default)]
    pub inputs: Option<Value>,
    #[serde(default)]
    pub created_at: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NodeFinished {
    pub task_id: String,
    pub workflow_run_id: String,
    pub data: NodeFinishedData,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NodeFinishedData {
    pub id: String,
    pub node_id: String,
    #[serde(default)]
    pub index: Option<u64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub inputs: Option<Value>,
    #[serde(default)]
    pub outputs: Option<Value>,
    #[serde(default)]
    pub process_data: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub elapsed_time: Option<f64>,
    #[serde(default)]
    pub execution_metadata: Option<ExecutionMetadata>,
    #[serde(default)]
    pub created_at: Option<i64>,
}

/// Token and cost counters attached to a finished node.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExecutionMetadata {
    #[serde(default)]
    pub total_tokens: Option<u64>,
    /// Decimal cost; the upstream emits either a number or a string.
    #[serde(default)]
    pub total_price: Option<Value>,
    #[serde(default)]
    pub currency: Option<String>,
}

/// Incremental text fragment.
///
/// Two wire shapes exist: the current one nests the fragment under `data`,
/// the legacy one carries a top-level `text` field. [`TextChunk::fragment`]
/// resolves either.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TextChunk {
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub workflow_run_id: Option<String>,
    #[serde(default)]
    pub data: Option<TextChunkData>,
    #[serde(default)]
    pub text: Option<String>,
}

impl TextChunk {
    /// The incremental fragment, regardless of wire shape.
    pub fn fragment(&self) -> &str {
        self.data
            .as_ref()
            .map(|d| d.text.as_str())
            .or(self.text.as_deref())
            .unwrap_or("")
    }

    /// Identifier of the variable the fragment was produced from.
    pub fn from_variable_selector(&self) -> Option<&[String]> {
        self.data.as_ref()?.from_variable_selector.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TextChunkData {
    pub text: String,
    #[serde(default)]
    pub from_variable_selector: Option<Vec<String>>,
}

/// Complete answer message from the legacy completion mode.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub conversation_id: Option<String>,
    pub answer: String,
    #[serde(default)]
    pub created_at: Option<i64>,
}

/// Protocol-level failure reported inside the stream.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ErrorEvent {
    #[serde(default)]
    pub task_id: Option<String>,
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
}
