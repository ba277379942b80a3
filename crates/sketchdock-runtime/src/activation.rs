//! Subsystem activation wiring.

use std::sync::{Arc, Mutex};

use sketchdock_panel::{ManagerDeps, PanelManager};

use crate::ticker::{LivenessTicker, SharedManager};

/// The activated canvas subsystem: one manager, one liveness ticker.
///
/// Hosts construct this once at extension activation with their
/// capability implementations and tear it down at deactivation. Must be
/// created inside a tokio runtime.
pub struct Activation {
    manager: SharedManager,
    ticker: LivenessTicker,
}

impl Activation {
    pub fn activate(deps: ManagerDeps) -> Self {
        let manager = Arc::new(Mutex::new(PanelManager::new(deps)));
        let ticker = LivenessTicker::spawn(Arc::clone(&manager));
        tracing::info!("canvas subsystem activated");
        Self { manager, ticker }
    }

    /// Handle for host callbacks (commands, message delivery, view
    /// events) to reach the manager.
    pub fn manager(&self) -> SharedManager {
        Arc::clone(&self.manager)
    }

    /// Stop the ticker, then dispose the panel. After this resolves no
    /// timer fires and no handle survives.
    pub async fn deactivate(self) {
        self.ticker.stop().await;
        if let Ok(mut manager) = self.manager.lock() {
            manager.dispose();
        }
        tracing::info!("canvas subsystem deactivated");
    }
}

// ─── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::Value;
    use sketchdock_content::renderer::{ContentError, PanelEnvironment};
    use sketchdock_core::host::{
        ConfigStore, HostError, IssueReporter, Notifier, NoticeLevel, PanelHandle, PanelHost,
    };
    use sketchdock_core::types::{CanvasConfig, DisplayMethod, FallbackOptions};

    #[derive(Default, Clone)]
    struct Probe {
        disposals: Arc<Mutex<u32>>,
    }

    struct StubHandle {
        probe: Probe,
    }

    impl PanelHandle for StubHandle {
        fn reveal(&mut self) {}

        fn set_html(&mut self, _html: String) {}

        fn post_json(&mut self, _message: Value) -> Result<(), HostError> {
            Ok(())
        }

        fn dispose(&mut self) {
            *self.probe.disposals.lock().expect("probe lock") += 1;
        }
    }

    struct StubHost {
        probe: Probe,
    }

    impl PanelHost for StubHost {
        fn create_panel(&mut self, _title: &str) -> Result<Box<dyn PanelHandle>, HostError> {
            Ok(Box::new(StubHandle {
                probe: self.probe.clone(),
            }))
        }

        fn focus_sidebar(&mut self) -> Result<Box<dyn PanelHandle>, HostError> {
            Ok(Box::new(StubHandle {
                probe: self.probe.clone(),
            }))
        }
    }

    struct StubEnv;

    impl PanelEnvironment for StubEnv {
        fn panel_uri(&self, relative: &str) -> Result<String, ContentError> {
            Ok(format!("panel://ext/{relative}"))
        }

        fn csp_source(&self) -> String {
            "panel://ext".to_owned()
        }

        fn read_template(&self) -> Result<String, ContentError> {
            Err(ContentError::TemplateRead("not on disk".to_owned()))
        }
    }

    struct StubNotifier;

    impl Notifier for StubNotifier {
        fn notify(&self, _level: NoticeLevel, _message: &str, _actions: &[&str]) -> Option<usize> {
            None
        }

        fn pick(&self, _prompt: &str, _items: &[&str]) -> Option<usize> {
            None
        }
    }

    struct StubConfig;

    impl ConfigStore for StubConfig {
        fn fallback_options(&self) -> FallbackOptions {
            FallbackOptions::default()
        }

        fn persist_display_method(&self, _method: DisplayMethod) {}

        fn set_show_fallback_message(&self, _show: bool) {}

        fn canvas_config(&self) -> CanvasConfig {
            CanvasConfig::default()
        }
    }

    struct StubReporter;

    impl IssueReporter for StubReporter {
        fn open_report(&self, _summary: &str, _body: &str) {}
    }

    fn deps(probe: Probe) -> ManagerDeps {
        ManagerDeps {
            host: Box::new(StubHost { probe }),
            environment: Box::new(StubEnv),
            notifier: Arc::new(StubNotifier),
            config: Arc::new(StubConfig),
            issues: Arc::new(StubReporter),
        }
    }

    #[tokio::test]
    async fn activation_exposes_a_working_manager() {
        let probe = Probe::default();
        let activation = Activation::activate(deps(probe));

        {
            let manager = activation.manager();
            let mut manager = manager.lock().expect("manager lock");
            let method = manager.show_panel(Utc::now()).expect("show panel");
            assert_eq!(method, DisplayMethod::Panel);
            assert!(manager.exists());
        }

        activation.deactivate().await;
    }

    #[tokio::test]
    async fn deactivate_disposes_the_panel() {
        let probe = Probe::default();
        let activation = Activation::activate(deps(probe.clone()));

        activation
            .manager()
            .lock()
            .expect("manager lock")
            .show_panel(Utc::now())
            .expect("show panel");

        activation.deactivate().await;
        assert_eq!(*probe.disposals.lock().expect("probe lock"), 1);
    }

    #[tokio::test]
    async fn deactivate_without_panel_is_clean() {
        let probe = Probe::default();
        let activation = Activation::activate(deps(probe.clone()));
        activation.deactivate().await;
        assert_eq!(*probe.disposals.lock().expect("probe lock"), 0);
    }
}
