//! Host-capability traits.
//!
//! The embedding editor supplies these at activation time; nothing in the
//! subsystem reaches for ambient host state. Creation and navigation
//! primitives either fail immediately or succeed synchronously — the host
//! owns any deeper asynchrony behind the trait boundary.

use std::sync::{Arc, Mutex};

use crate::types::{CanvasConfig, DisplayMethod, FallbackOptions};
use serde_json::Value;

// ─── Errors ───────────────────────────────────────────────────────

/// Failure reported by a host primitive (panel creation, sidebar focus,
/// message delivery).
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct HostError(pub String);

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

// ─── Panel primitives ─────────────────────────────────────────────

/// A live host-embedded UI surface.
pub trait PanelHandle: Send {
    /// Bring the surface to foreground focus.
    fn reveal(&mut self);

    /// Replace the surface's HTML content.
    fn set_html(&mut self, html: String);

    /// Deliver a JSON message to the hosted script.
    fn post_json(&mut self, message: Value) -> Result<(), HostError>;

    /// Release the surface. Idempotent on the host side.
    fn dispose(&mut self);
}

/// A panel handle shared between its owner (the lifecycle manager) and
/// the message router attached to it. The router reads the handle it was
/// given; ownership and disposal stay with the manager.
pub type SharedPanel = Arc<Mutex<Box<dyn PanelHandle>>>;

/// Surface creation and navigation primitives.
pub trait PanelHost: Send {
    /// Create a new panel surface.
    fn create_panel(&mut self, title: &str) -> Result<Box<dyn PanelHandle>, HostError>;

    /// Focus the sidebar view and hand back its surface handle.
    fn focus_sidebar(&mut self) -> Result<Box<dyn PanelHandle>, HostError>;
}

// ─── Notifications & prompts ──────────────────────────────────────

/// Notification severity for user-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// User-facing notifications and choice prompts.
///
/// Action methods return the index of the chosen action, or `None` when
/// the notification was dismissed. Dismissal is treated as cancellation
/// with no state change.
pub trait Notifier: Send + Sync {
    fn notify(&self, level: NoticeLevel, message: &str, actions: &[&str]) -> Option<usize>;

    /// Quick-pick style prompt over a list of items.
    fn pick(&self, prompt: &str, items: &[&str]) -> Option<usize>;
}

// ─── Configuration ────────────────────────────────────────────────

/// Host key/value settings mapped onto the subsystem's configuration.
pub trait ConfigStore: Send + Sync {
    /// Current fallback options, re-read on change notification.
    fn fallback_options(&self) -> FallbackOptions;

    /// Persist the user's display-method preference.
    fn persist_display_method(&self, method: DisplayMethod);

    /// Persist silencing of the fallback notification.
    fn set_show_fallback_message(&self, show: bool);

    /// Canvas/tablet settings for the initial-config payload.
    fn canvas_config(&self) -> CanvasConfig;
}

// ─── Issue reporting ──────────────────────────────────────────────

/// External issue-reporting flow, pre-filled with captured context.
pub trait IssueReporter: Send + Sync {
    fn open_report(&self, summary: &str, body: &str);
}
