//! The panel lifecycle manager.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use sketchdock_content::renderer::PanelEnvironment;
use sketchdock_content::{render_content, render_error_content};
use sketchdock_core::host::{
    ConfigStore, IssueReporter, Notifier, NoticeLevel, PanelHost, SharedPanel,
};
use sketchdock_core::types::{DisplayMethod, FallbackOptions, PanelState, Payload};
use sketchdock_router::{MessageRouter, RouterDeps};

use crate::error::PanelError;

/// Title shown on the primary panel surface.
const PANEL_TITLE: &str = "Sketchdock Canvas";

/// Fallback notification shown when the panel surface is unavailable.
const FALLBACK_MESSAGE: &str =
    "The canvas panel could not be opened; showing it in the sidebar instead.";
const FALLBACK_ACTIONS: [&str; 2] = ["Retry Panel", "Don't Show Again"];

/// Quick-pick items for an explicit display-method choice.
const DISPLAY_CHOICES: [&str; 2] = ["Editor Panel", "Sidebar"];

/// Everything the manager needs from the embedding host, injected at
/// activation time.
pub struct ManagerDeps {
    pub host: Box<dyn PanelHost>,
    pub environment: Box<dyn PanelEnvironment + Send>,
    pub notifier: Arc<dyn Notifier>,
    pub config: Arc<dyn ConfigStore>,
    pub issues: Arc<dyn IssueReporter>,
}

/// Single authority for "is the hosted UI currently displayed, and where".
///
/// Owns the (zero-or-one) live panel handle, the panel state, the
/// fallback options, and the message router attached to the live panel.
/// The router is re-created whenever the panel is.
pub struct PanelManager {
    host: Box<dyn PanelHost>,
    environment: Box<dyn PanelEnvironment + Send>,
    notifier: Arc<dyn Notifier>,
    config: Arc<dyn ConfigStore>,
    router_deps: RouterDeps,
    router: MessageRouter,
    panel: Option<SharedPanel>,
    state: PanelState,
    method: DisplayMethod,
    options: FallbackOptions,
    /// Creation-in-flight guard: treated as "panel exists" so re-entrant
    /// calls can never race a second handle into existence.
    creating: bool,
    fallback_notice_shown: bool,
}

impl PanelManager {
    pub fn new(deps: ManagerDeps) -> Self {
        let options = deps.config.fallback_options();
        let router_deps = RouterDeps {
            notifier: Arc::clone(&deps.notifier),
            config: Arc::clone(&deps.config),
            issues: Arc::clone(&deps.issues),
        };
        let router = MessageRouter::with_defaults(&router_deps);
        Self {
            host: deps.host,
            environment: deps.environment,
            notifier: deps.notifier,
            config: deps.config,
            router_deps,
            router,
            panel: None,
            state: PanelState::default(),
            method: DisplayMethod::None,
            options,
            creating: false,
            fallback_notice_shown: false,
        }
    }

    // ── Commands ─────────────────────────────────────────────────

    /// Idempotent entry point: show the canvas on the preferred surface.
    ///
    /// With a surface already live (or creation in flight) this reveals
    /// it rather than creating a second handle. A panel-creation failure
    /// falls back to the sidebar when enabled; if both fail, the error
    /// names both causes.
    pub fn show_panel(&mut self, now: DateTime<Utc>) -> Result<DisplayMethod, PanelError> {
        if self.panel.is_some() {
            let method = self.method;
            self.reveal_panel(now)?;
            return Ok(method);
        }
        if self.creating {
            return Ok(self.method);
        }

        if self.options.preferred_display_method == DisplayMethod::Sidebar {
            self.establish(DisplayMethod::Sidebar, now)?;
            return Ok(DisplayMethod::Sidebar);
        }

        match self.establish(DisplayMethod::Panel, now) {
            Ok(()) => Ok(DisplayMethod::Panel),
            Err(primary) => {
                if !self.options.enable_sidebar_fallback {
                    return Err(primary);
                }
                tracing::warn!(error = %primary, "panel creation failed, trying sidebar");
                match self.establish(DisplayMethod::Sidebar, now) {
                    Ok(()) => {
                        self.notify_fallback(now);
                        Ok(self.method)
                    }
                    Err(secondary) => Err(PanelError::FallbackExhausted {
                        panel: primary.to_string(),
                        sidebar: secondary.to_string(),
                    }),
                }
            }
        }
    }

    /// Bring the existing surface to foreground focus.
    pub fn reveal_panel(&mut self, now: DateTime<Utc>) -> Result<(), PanelError> {
        let Some(panel) = &self.panel else {
            return Err(PanelError::NoPanelExists);
        };
        if let Ok(mut handle) = panel.lock() {
            handle.reveal();
        }
        self.state.on_view_change(true, true, now);
        Ok(())
    }

    /// Re-establish the surface after an external disposal. No-op when a
    /// handle already exists.
    pub fn recreate_panel(&mut self, now: DateTime<Utc>) -> Result<DisplayMethod, PanelError> {
        if self.panel.is_some() {
            return Ok(self.method);
        }
        self.show_panel(now)
    }

    /// Release the surface and the attached router.
    ///
    /// Explicit calls and host-originated "panel closed" signals both
    /// land here; the dispose counter moves once per real disposal.
    pub fn dispose(&mut self) {
        self.cleanup();
    }

    /// Host signal: the surface was closed outside our control.
    pub fn on_panel_disposed(&mut self) {
        self.cleanup();
    }

    fn cleanup(&mut self) -> bool {
        self.router.dispose();
        let Some(panel) = self.panel.take() else {
            self.method = DisplayMethod::None;
            return false;
        };
        if let Ok(mut handle) = panel.lock() {
            handle.dispose();
        }
        self.method = DisplayMethod::None;
        self.state.on_disposed();
        tracing::info!(dispose_count = self.state.dispose_count, "panel disposed");
        true
    }

    /// Move the canvas to `method`, persisting the new preference.
    /// No-op when already there.
    pub fn switch_display_method(
        &mut self,
        method: DisplayMethod,
        now: DateTime<Utc>,
    ) -> Result<(), PanelError> {
        if method == self.method {
            return Ok(());
        }
        self.cleanup();
        if method != DisplayMethod::None {
            self.establish(method, now)?;
        }
        self.options.preferred_display_method = method;
        self.config.persist_display_method(method);
        Ok(())
    }

    /// Prompt the user for a display method and switch to it.
    ///
    /// Dismissing the prompt cancels the operation with no state change.
    pub fn choose_display_method(
        &mut self,
        now: DateTime<Utc>,
    ) -> Result<Option<DisplayMethod>, PanelError> {
        let method = match self
            .notifier
            .pick("Where should the canvas open?", &DISPLAY_CHOICES)
        {
            Some(0) => DisplayMethod::Panel,
            Some(1) => DisplayMethod::Sidebar,
            _ => return Ok(None),
        };
        self.switch_display_method(method, now)?;
        Ok(Some(method))
    }

    /// Replace the surface content with the rendered error page.
    pub fn show_error_page(&mut self, message: &str) -> Result<(), PanelError> {
        let Some(panel) = &self.panel else {
            return Err(PanelError::NoPanelExists);
        };
        if let Ok(mut handle) = panel.lock() {
            handle.set_html(render_error_content(message));
        }
        Ok(())
    }

    // ── Events ───────────────────────────────────────────────────

    /// One raw inbound message from the panel.
    pub fn handle_panel_message(&mut self, raw: &str, now: DateTime<Utc>) {
        self.router.handle_raw(raw, now);
        // Readiness is only meaningful while a handle exists.
        if self.panel.is_some() && self.router.is_ready() {
            self.state.on_ready();
        }
    }

    /// Periodic liveness tick, driven by the runtime layer.
    pub fn run_liveness_check(&mut self, now: DateTime<Utc>) {
        self.router.run_liveness_check(now);
    }

    /// Host visibility/focus change for the live surface.
    pub fn on_view_state_change(&mut self, visible: bool, active: bool, now: DateTime<Utc>) {
        self.state.on_view_change(visible, active, now);
    }

    /// Host configuration change notification.
    pub fn on_config_change(&mut self) {
        self.options = self.config.fallback_options();
    }

    /// Send a message to the panel (no-op without one).
    pub fn post_message(&mut self, payload: Payload, now: DateTime<Utc>) {
        self.router.send(payload.into(), now);
    }

    // ── Queries ──────────────────────────────────────────────────

    pub fn exists(&self) -> bool {
        self.panel.is_some()
    }

    pub fn is_visible(&self) -> bool {
        self.state.is_visible
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active
    }

    pub fn is_ready(&self) -> bool {
        self.panel.is_some() && self.router.is_ready()
    }

    /// Read-only snapshot of the panel state.
    pub fn panel_state(&self) -> PanelState {
        self.state.clone()
    }

    pub fn current_display_method(&self) -> DisplayMethod {
        self.method
    }

    /// Router access for host-side feature code (handler registration,
    /// outbound sends).
    pub fn router_mut(&mut self) -> &mut MessageRouter {
        &mut self.router
    }

    // ── Internals ────────────────────────────────────────────────

    fn establish(&mut self, method: DisplayMethod, now: DateTime<Utc>) -> Result<(), PanelError> {
        debug_assert!(self.panel.is_none(), "establish with a live handle");
        debug_assert!(method != DisplayMethod::None);

        self.creating = true;
        let created = match method {
            DisplayMethod::Sidebar => self
                .host
                .focus_sidebar()
                .map_err(|e| PanelError::SidebarFailed(e.to_string())),
            _ => self
                .host
                .create_panel(PANEL_TITLE)
                .map_err(|e| PanelError::CreationFailed(e.to_string())),
        };
        self.creating = false;

        let mut handle = created?;
        handle.set_html(render_content(
            self.environment.as_ref(),
            &self.config.canvas_config(),
        ));

        let shared: SharedPanel = Arc::new(Mutex::new(handle));
        self.router = MessageRouter::with_defaults(&self.router_deps);
        self.router.attach(Arc::clone(&shared));
        self.panel = Some(shared);
        self.method = method;
        self.state.on_created(now);
        tracing::info!(method = %method, "canvas surface established");
        Ok(())
    }

    fn notify_fallback(&mut self, now: DateTime<Utc>) {
        if !self.options.show_fallback_message || self.fallback_notice_shown {
            return;
        }
        self.fallback_notice_shown = true;

        match self
            .notifier
            .notify(NoticeLevel::Warning, FALLBACK_MESSAGE, &FALLBACK_ACTIONS)
        {
            Some(0) => {
                if let Err(e) = self.switch_display_method(DisplayMethod::Panel, now) {
                    tracing::warn!(error = %e, "panel retry failed, staying in sidebar");
                    if let Err(e) = self.establish(DisplayMethod::Sidebar, now) {
                        tracing::warn!(error = %e, "could not re-establish sidebar");
                    }
                }
            }
            Some(1) => {
                self.options.show_fallback_message = false;
                self.config.set_show_fallback_message(false);
            }
            _ => {}
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────
