//! Lifecycle-manager errors. All of them are recoverable at the feature
//! level; none should take the host process down.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PanelError {
    /// An operation that requires a live surface found none.
    #[error("no panel exists")]
    NoPanelExists,

    #[error("panel creation failed: {0}")]
    CreationFailed(String),

    #[error("sidebar focus failed: {0}")]
    SidebarFailed(String),

    /// Both the primary surface and the sidebar fallback failed.
    #[error("panel and sidebar both unavailable: panel: {panel}; sidebar: {sidebar}")]
    FallbackExhausted { panel: String, sidebar: String },
}
