//! sketchdock-core: shared wire/domain types, the connection-liveness state
//! machine, and the host-capability traits the embedding editor implements.
//!
//! Pure and IO-free: every time-dependent operation takes `now` as a
//! parameter, so the higher layers stay deterministic under test.

pub mod host;
pub mod liveness;
pub mod types;
