//! Wire types for the workflow event protocol.

mod event;

pub use event::*;
