//! sketchdock-panel: the panel lifecycle manager — the single authority
//! for whether the hosted canvas UI is currently displayed, and where.
//!
//! One explicitly constructed manager instance lives for the host's
//! activation scope; it owns the panel handle, the panel state, the
//! fallback options, and the message router attached to the live panel.

pub mod error;
pub mod manager;

pub use error::PanelError;
pub use manager::{ManagerDeps, PanelManager};
