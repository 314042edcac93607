//! Convenience re-exports for common usage.

pub use crate::client::{WorkflowClient, WorkflowRequest};
pub use crate::dispatch::{CompletionGuard, WorkflowCallbacks};
pub use crate::error::{FlowError, Result};
pub use crate::session::{SessionEvent, SessionPhase};
pub use crate::types::WorkflowEvent;
