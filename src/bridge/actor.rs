//! Actor components for the bridge connection.
//!
//! # Components
//!
//! - `ResponseRouter`: pending-request table, completes waiters by request ID
//! - `Reader`: background task that reads stdout and dispatches to the router
//! - `Writer`: background task that drains the outbound queue into stdin

mod outbound_message;
mod reader;
mod response_router;
mod writer;

pub(crate) use outbound_message::OutboundMessage;
pub(crate) use reader::{ReaderEvent, ReaderTaskHandle, spawn_reader_task};
pub use response_router::{CallOutcome, ResponseRouter, RouteResult};
pub(crate) use writer::{OUTBOUND_QUEUE_CAPACITY, WriterTaskHandle, spawn_writer_task};
