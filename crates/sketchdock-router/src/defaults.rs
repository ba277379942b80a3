//! Default handlers pre-registered on every router instance.

use std::sync::Arc;

use sketchdock_core::types::{CommandKind, Payload};

use crate::router::{HandlerError, MessageRouter, RouterDeps};
use sketchdock_core::host::NoticeLevel;

/// Recovery actions offered on a canvas-reported error.
const ERROR_ACTIONS: [&str; 3] = ["Show Details", "Export Logs", "Report Issue"];

/// Register the default handlers on `router`.
///
/// Feature code can overwrite any of these afterwards via
/// [`MessageRouter::register_handler`].
pub fn register(router: &mut MessageRouter, deps: &RouterDeps) {
    let config = Arc::clone(&deps.config);
    router.register_handler(CommandKind::CanvasReady, move |_env, cx| {
        cx.mark_ready();
        cx.reply(Payload::InitConfig(config.canvas_config()));
        Ok(())
    });

    let notifier = Arc::clone(&deps.notifier);
    let issues = Arc::clone(&deps.issues);
    router.register_handler(CommandKind::Error, move |env, _cx| {
        let Payload::Error(report) = &env.payload else {
            return Err(HandlerError::new("error handler got a non-error payload"));
        };
        tracing::error!(
            message = %report.message,
            source = report.source.as_deref().unwrap_or("canvas"),
            "canvas reported an error"
        );
        let text = format!("Canvas error: {}", report.message);
        match notifier.notify(NoticeLevel::Error, &text, &ERROR_ACTIONS) {
            Some(0) => {
                let details = report.stack.as_deref().unwrap_or("no stack captured");
                notifier.notify(NoticeLevel::Info, details, &[]);
            }
            Some(1) => {
                tracing::info!("log export requested from error notification");
            }
            Some(2) => {
                issues.open_report(
                    &report.message,
                    report.stack.as_deref().unwrap_or("no stack captured"),
                );
            }
            _ => {}
        }
        Ok(())
    });

    // Informational drawing events: logged only.
    router.register_handler(CommandKind::ToolChanged, |env, _cx| {
        if let Payload::ToolChanged { tool } = &env.payload {
            tracing::debug!(%tool, "tool changed");
        }
        Ok(())
    });
    router.register_handler(CommandKind::DrawingStarted, |env, _cx| {
        if let Payload::DrawingStarted { tool } = &env.payload {
            tracing::debug!(tool = tool.as_deref().unwrap_or("current"), "drawing started");
        }
        Ok(())
    });
    router.register_handler(CommandKind::DrawingEnded, |_env, _cx| {
        tracing::debug!("drawing ended");
        Ok(())
    });
    router.register_handler(CommandKind::CanvasCleared, |_env, _cx| {
        tracing::debug!("canvas cleared");
        Ok(())
    });

    let issues = Arc::clone(&deps.issues);
    router.register_handler(CommandKind::ReportIssue, move |env, _cx| {
        let Payload::ReportIssue(request) = &env.payload else {
            return Err(HandlerError::new(
                "reportIssue handler got a mismatched payload",
            ));
        };
        let summary = request
            .description
            .as_deref()
            .unwrap_or("Canvas panel issue report");
        let body = request.context.as_deref().unwrap_or("no context captured");
        issues.open_report(summary, body);
        Ok(())
    });

    router.register_handler(CommandKind::ConnectionPing, |_env, cx| {
        cx.reply(Payload::ConnectionPong);
        Ok(())
    });
}

// ─── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use serde_json::Value;
    use sketchdock_core::host::{
        ConfigStore, HostError, IssueReporter, Notifier, PanelHandle, SharedPanel,
    };
    use sketchdock_core::types::{CanvasConfig, DisplayMethod, FallbackOptions};
    use std::sync::Mutex;

    // ── Fixtures ─────────────────────────────────────────────────

    struct RecordingPanel {
        posted: Arc<Mutex<Vec<Value>>>,
    }

    impl PanelHandle for RecordingPanel {
        fn reveal(&mut self) {}
        fn set_html(&mut self, _html: String) {}
        fn post_json(&mut self, message: Value) -> Result<(), HostError> {
            self.posted.lock().expect("posted lock").push(message);
            Ok(())
        }
        fn dispose(&mut self) {}
    }

    /// Notifier that records every notification and replies with a
    /// scripted action choice.
    struct ScriptedNotifier {
        notices: Mutex<Vec<(NoticeLevel, String)>>,
        choice: Option<usize>,
    }

    impl ScriptedNotifier {
        fn new(choice: Option<usize>) -> Self {
            Self {
                notices: Mutex::new(Vec::new()),
                choice,
            }
        }
    }

    impl Notifier for ScriptedNotifier {
        fn notify(&self, level: NoticeLevel, message: &str, _actions: &[&str]) -> Option<usize> {
            self.notices
                .lock()
                .expect("notices lock")
                .push((level, message.to_owned()));
            self.choice
        }

        fn pick(&self, _prompt: &str, _items: &[&str]) -> Option<usize> {
            self.choice
        }
    }

    struct FixedConfig;

    impl ConfigStore for FixedConfig {
        fn fallback_options(&self) -> FallbackOptions {
            FallbackOptions::default()
        }
        fn persist_display_method(&self, _method: DisplayMethod) {}
        fn set_show_fallback_message(&self, _show: bool) {}
        fn canvas_config(&self) -> CanvasConfig {
            CanvasConfig {
                theme: "light".to_owned(),
                ..CanvasConfig::default()
            }
        }
    }

    #[derive(Default)]
    struct RecordingReporter {
        reports: Mutex<Vec<(String, String)>>,
    }

    impl IssueReporter for RecordingReporter {
        fn open_report(&self, summary: &str, body: &str) {
            self.reports
                .lock()
                .expect("reports lock")
                .push((summary.to_owned(), body.to_owned()));
        }
    }

    struct Rig {
        router: MessageRouter,
        posted: Arc<Mutex<Vec<Value>>>,
        notifier: Arc<ScriptedNotifier>,
        reporter: Arc<RecordingReporter>,
    }

    fn rig_with_choice(choice: Option<usize>) -> Rig {
        let notifier = Arc::new(ScriptedNotifier::new(choice));
        let reporter = Arc::new(RecordingReporter::default());
        let deps = RouterDeps {
            notifier: Arc::clone(&notifier) as Arc<dyn Notifier>,
            config: Arc::new(FixedConfig) as Arc<dyn ConfigStore>,
            issues: Arc::clone(&reporter) as Arc<dyn IssueReporter>,
        };
        let mut router = MessageRouter::with_defaults(&deps);

        let posted = Arc::new(Mutex::new(Vec::new()));
        let handle: Box<dyn PanelHandle> = Box::new(RecordingPanel {
            posted: Arc::clone(&posted),
        });
        let panel: SharedPanel = Arc::new(Mutex::new(handle));
        router.attach(panel);

        Rig {
            router,
            posted,
            notifier,
            reporter,
        }
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
            .expect("valid RFC3339 timestamp")
            .with_timezone(&Utc)
    }

    // ── canvasReady ──────────────────────────────────────────────

    #[test]
    fn canvas_ready_marks_ready_and_replies_with_config() {
        let mut rig = rig_with_choice(None);
        rig.router.handle_raw(r#"{"command":"canvasReady"}"#, now());

        assert!(rig.router.is_ready());
        let posted = rig.posted.lock().expect("posted lock");
        let config = posted
            .iter()
            .find(|v| v["command"] == "initConfig")
            .expect("initConfig reply");
        assert_eq!(config["data"]["theme"], "light");
    }

    // ── error ────────────────────────────────────────────────────

    #[test]
    fn error_surfaces_notification() {
        let mut rig = rig_with_choice(None);
        rig.router.handle_raw(
            r#"{"command":"error","data":{"message":"context lost"}}"#,
            now(),
        );

        let notices = rig.notifier.notices.lock().expect("notices lock");
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].0, NoticeLevel::Error);
        assert!(notices[0].1.contains("context lost"));
    }

    #[test]
    fn error_show_details_choice_shows_stack() {
        let mut rig = rig_with_choice(Some(0));
        rig.router.handle_raw(
            r#"{"command":"error","data":{"message":"boom","stack":"at draw()"}}"#,
            now(),
        );

        let notices = rig.notifier.notices.lock().expect("notices lock");
        assert_eq!(notices.len(), 2);
        assert_eq!(notices[1].1, "at draw()");
    }

    #[test]
    fn error_report_choice_opens_issue_flow() {
        let mut rig = rig_with_choice(Some(2));
        rig.router.handle_raw(
            r#"{"command":"error","data":{"message":"boom","stack":"at draw()"}}"#,
            now(),
        );

        let reports = rig.reporter.reports.lock().expect("reports lock");
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].0, "boom");
        assert_eq!(reports[0].1, "at draw()");
    }

    // ── informational events ─────────────────────────────────────

    #[test]
    fn drawing_events_produce_no_replies() {
        let mut rig = rig_with_choice(None);
        rig.router.handle_raw(
            r#"{"command":"toolChanged","data":{"tool":"eraser"}}"#,
            now(),
        );
        rig.router.handle_raw(r#"{"command":"drawingStarted"}"#, now());
        rig.router.handle_raw(r#"{"command":"drawingEnded"}"#, now());
        rig.router.handle_raw(r#"{"command":"canvasCleared"}"#, now());

        let posted = rig.posted.lock().expect("posted lock");
        // Only the initial connectionStatus flip, no per-event replies.
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0]["command"], "connectionStatus");
    }

    // ── reportIssue ──────────────────────────────────────────────

    #[test]
    fn report_issue_forwards_captured_context() {
        let mut rig = rig_with_choice(None);
        rig.router.handle_raw(
            r#"{"command":"reportIssue","data":{"description":"pen lag","context":"while zoomed"}}"#,
            now(),
        );

        let reports = rig.reporter.reports.lock().expect("reports lock");
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0], ("pen lag".to_owned(), "while zoomed".to_owned()));
    }

    #[test]
    fn report_issue_defaults_when_fields_missing() {
        let mut rig = rig_with_choice(None);
        rig.router
            .handle_raw(r#"{"command":"reportIssue","data":{}}"#, now());

        let reports = rig.reporter.reports.lock().expect("reports lock");
        assert_eq!(reports[0].0, "Canvas panel issue report");
    }

    // ── connectionPing ───────────────────────────────────────────

    #[test]
    fn ping_gets_pong() {
        let mut rig = rig_with_choice(None);
        rig.router
            .handle_raw(r#"{"command":"connectionPing"}"#, now());

        let posted = rig.posted.lock().expect("posted lock");
        assert!(posted.iter().any(|v| v["command"] == "connectionPong"));
    }
}
