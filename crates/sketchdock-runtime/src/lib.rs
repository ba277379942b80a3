//! Activation wiring and async plumbing for the canvas subsystem.
//!
//! Ties the lifecycle manager to a tokio-driven liveness ticker and
//! gives hosts a single activate/deactivate surface.

pub mod activation;
pub mod logging;
pub mod ticker;

pub use activation::Activation;
pub use logging::init_tracing;
pub use ticker::{LivenessTicker, SharedManager};
