//! The message router: handler registry, dispatch, fault boundary, and
//! liveness bookkeeping.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use sketchdock_core::host::{ConfigStore, IssueReporter, Notifier, SharedPanel};
use sketchdock_core::liveness::{ConnectionTracker, ConnectionTransition};
use sketchdock_core::types::{CommandKind, Envelope, Inbound, Payload, decode_inbound};

// ─── Handler plumbing ─────────────────────────────────────────────

/// Failure returned by a message handler. Contained by the router's
/// fault boundary; never escapes dispatch.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Per-dispatch handler context: queued replies and the readiness signal.
#[derive(Debug, Default)]
pub struct RouterCx {
    replies: Vec<Payload>,
    ready: bool,
}

impl RouterCx {
    /// Queue a reply to the panel, sent after the handler returns.
    pub fn reply(&mut self, payload: Payload) {
        self.replies.push(payload);
    }

    /// Mark the hosted script as having completed startup.
    pub fn mark_ready(&mut self) {
        self.ready = true;
    }
}

type Handler = Box<dyn FnMut(&Envelope, &mut RouterCx) -> Result<(), HandlerError> + Send>;

/// Host capabilities the default handlers need.
#[derive(Clone)]
pub struct RouterDeps {
    pub notifier: Arc<dyn Notifier>,
    pub config: Arc<dyn ConfigStore>,
    pub issues: Arc<dyn IssueReporter>,
}

// ─── Router ───────────────────────────────────────────────────────

/// Typed dispatch of messages in both directions across the host/panel
/// boundary.
///
/// Owned by the lifecycle manager and re-created whenever the panel is
/// re-created. The periodic liveness check is driven externally (see the
/// runtime crate's ticker); the router itself carries no timer, so there
/// is nothing to leak when it is dropped.
pub struct MessageRouter {
    panel: Option<SharedPanel>,
    handlers: HashMap<CommandKind, Handler>,
    tracker: ConnectionTracker,
    ready: bool,
}

impl MessageRouter {
    /// Create an empty router with no handlers registered.
    pub fn new() -> Self {
        Self {
            panel: None,
            handlers: HashMap::new(),
            tracker: ConnectionTracker::new(),
            ready: false,
        }
    }

    /// Create a router with the default handlers pre-registered.
    pub fn with_defaults(deps: &RouterDeps) -> Self {
        let mut router = Self::new();
        crate::defaults::register(&mut router, deps);
        router
    }

    /// Bind to a concrete panel and reset connection state.
    ///
    /// Registered handlers survive re-attachment; liveness starts over
    /// as disconnected.
    pub fn attach(&mut self, panel: SharedPanel) {
        self.panel = Some(panel);
        self.tracker.reset();
        self.ready = false;
    }

    /// Associate `handler` with a command, overwriting any prior handler
    /// for the same command. Registration itself never fails.
    pub fn register_handler<F>(&mut self, kind: CommandKind, handler: F)
    where
        F: FnMut(&Envelope, &mut RouterCx) -> Result<(), HandlerError> + Send + 'static,
    {
        if self.handlers.insert(kind, Box::new(handler)).is_some() {
            tracing::debug!(command = %kind, "handler overwritten");
        }
    }

    /// Send a message to the panel, stamping a timestamp if absent.
    ///
    /// With no panel attached this logs and no-ops; it never fails.
    pub fn send(&mut self, message: Envelope, now: DateTime<Utc>) {
        let Some(panel) = &self.panel else {
            tracing::debug!(
                command = %message.payload.kind(),
                "send with no panel attached, dropping message"
            );
            return;
        };

        let mut message = message;
        if message.timestamp.is_none() {
            message.timestamp = Some(now.to_rfc3339());
        }

        let value = match serde_json::to_value(&message) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize outbound message");
                return;
            }
        };

        let Ok(mut handle) = panel.lock() else {
            tracing::warn!("panel handle lock poisoned, dropping message");
            return;
        };
        if let Err(e) = handle.post_json(value) {
            tracing::warn!(error = %e, "panel rejected outbound message");
        }
    }

    /// Process one raw inbound message from the panel.
    ///
    /// Updates liveness first (a disconnected→connected flip announces
    /// itself with a `connectionStatus` message), then dispatches by
    /// command. Unknown commands are logged and echoed back; a handler
    /// fault is caught, logged, and answered with an `errorResponse`
    /// naming the original command.
    pub fn handle_raw(&mut self, raw: &str, now: DateTime<Utc>) {
        let inbound = match decode_inbound(raw) {
            Ok(inbound) => inbound,
            Err(e) => {
                tracing::warn!(error = %e, "undecodable panel message");
                return;
            }
        };

        if let Some(transition) = self.tracker.record_inbound(epoch_ms(now)) {
            self.announce(transition, now);
        }

        match inbound {
            Inbound::Unknown { command } => {
                tracing::warn!(%command, "unknown panel command");
                self.send(Envelope::new(Payload::UnknownCommand { command }), now);
            }
            Inbound::Malformed { command, detail } => {
                tracing::warn!(%command, %detail, "malformed panel command payload");
                self.send(
                    Envelope::new(Payload::ErrorResponse {
                        command,
                        message: detail,
                    }),
                    now,
                );
            }
            Inbound::Known(envelope) => self.dispatch(envelope, now),
        }
    }

    fn dispatch(&mut self, envelope: Envelope, now: DateTime<Utc>) {
        let kind = envelope.payload.kind();
        let mut cx = RouterCx::default();

        if !self.handlers.contains_key(&kind) {
            tracing::warn!(command = %kind, "no handler registered");
            self.send(
                Envelope::new(Payload::UnknownCommand {
                    command: kind.as_str().to_owned(),
                }),
                now,
            );
            return;
        }

        let outcome = {
            let Some(handler) = self.handlers.get_mut(&kind) else {
                return;
            };
            catch_unwind(AssertUnwindSafe(|| handler(&envelope, &mut cx)))
        };

        match outcome {
            Ok(Ok(())) => {
                if cx.ready {
                    self.ready = true;
                }
                for payload in cx.replies {
                    self.send(Envelope::new(payload), now);
                }
            }
            Ok(Err(e)) => {
                tracing::error!(command = %kind, error = %e, "handler failed");
                self.send(
                    Envelope::new(Payload::ErrorResponse {
                        command: kind.as_str().to_owned(),
                        message: e.to_string(),
                    }),
                    now,
                );
            }
            Err(panic) => {
                let message = panic_message(panic);
                tracing::error!(command = %kind, %message, "handler panicked");
                self.send(
                    Envelope::new(Payload::ErrorResponse {
                        command: kind.as_str().to_owned(),
                        message,
                    }),
                    now,
                );
            }
        }
    }

    /// Periodic liveness check; announces a connected→disconnected flip.
    pub fn run_liveness_check(&mut self, now: DateTime<Utc>) {
        if let Some(transition) = self.tracker.check(epoch_ms(now)) {
            self.announce(transition, now);
        }
    }

    fn announce(&mut self, transition: ConnectionTransition, now: DateTime<Utc>) {
        let connected = matches!(transition, ConnectionTransition::Connected);
        tracing::info!(connected, "panel connection status changed");
        self.send(
            Envelope::new(Payload::ConnectionStatus { connected }),
            now,
        );
    }

    /// Release the panel reference, clear all handlers, and reset
    /// connection state. Idempotent.
    pub fn dispose(&mut self) {
        self.panel = None;
        self.handlers.clear();
        self.tracker.reset();
        self.ready = false;
    }

    // ── Queries ──────────────────────────────────────────────────

    pub fn is_attached(&self) -> bool {
        self.panel.is_some()
    }

    /// Whether the hosted script has signaled startup complete.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn is_connected(&self) -> bool {
        self.tracker.is_connected()
    }
}

impl Default for MessageRouter {
    fn default() -> Self {
        Self::new()
    }
}

fn epoch_ms(now: DateTime<Utc>) -> u64 {
    u64::try_from(now.timestamp_millis()).unwrap_or(0)
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_owned()
    }
}

// ─── Tests ────────────────────────────────────────────────────────
