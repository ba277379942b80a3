//! sketchdock-router: typed, bidirectional message dispatch between the
//! extension process and the hosted panel, with connection-liveness
//! tracking.
//!
//! Dispatch is synchronous and in arrival order: one message at a time
//! per router instance, so two rapid messages can never interleave
//! canvas-state mutations. Handler faults are contained per message.

pub mod defaults;
pub mod router;

pub use router::{HandlerError, MessageRouter, RouterCx, RouterDeps};
