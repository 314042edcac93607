//! Flowstream — streaming workflow-event client
//!
//! Consumes the chunked HTTP response of a long-running workflow execution
//! service and reconstructs a well-ordered sequence of typed events from raw,
//! arbitrarily fragmented bytes. One logical event may arrive split across
//! several transport chunks, or several events may share a single chunk; the
//! crate buffers, classifies, and decorates them so callers never see a
//! partial frame.
//!
//! # Quick Start
//!
//! ```no_run
//! use flowstream::prelude::*;
//! use futures::StreamExt;
//!
//! # async fn example() -> flowstream::error::Result<()> {
//! let client = WorkflowClient::new("app-key", "https://workflows.example.com/v1");
//! let request = WorkflowRequest::new(serde_json::json!({"topic": "intro"}), "user-1");
//!
//! let mut events = client.stream_events(&request).await?;
//! while let Some(event) = events.next().await {
//!     println!("{event:?}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod client;
pub mod decode;
pub mod dispatch;
pub mod error;
pub mod normalize;
pub mod prelude;
pub mod session;
pub mod types;
