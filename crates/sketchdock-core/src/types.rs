//! Shared domain and wire types for the canvas panel subsystem.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ─── Display Method ───────────────────────────────────────────────

/// Where the hosted canvas UI is currently displayed.
///
/// Exactly one method is current at any time; `None` is the only state
/// in which no panel handle exists.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMethod {
    #[default]
    None,
    Panel,
    Sidebar,
}

impl DisplayMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Panel => "panel",
            Self::Sidebar => "sidebar",
        }
    }
}

impl fmt::Display for DisplayMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DisplayMethod {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "panel" => Ok(Self::Panel),
            "sidebar" => Ok(Self::Sidebar),
            _ => Err(WireError::InvalidDisplayMethod(s.to_owned())),
        }
    }
}

// ─── Panel State ──────────────────────────────────────────────────

/// Lifecycle status of a single hosted-UI surface.
///
/// Created with defaults when the lifecycle manager is constructed and
/// mutated on every creation, visibility/focus transition, readiness
/// signal, and disposal. Never destroyed — it lives as long as the
/// manager does.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelState {
    pub is_visible: bool,
    /// Panel has input focus.
    pub is_active: bool,
    /// Hosted script has signaled startup complete.
    pub is_ready: bool,
    pub creation_time: Option<DateTime<Utc>>,
    pub last_focus_time: Option<DateTime<Utc>>,
    pub dispose_count: u32,
}

impl PanelState {
    /// Record a fresh panel creation.
    pub fn on_created(&mut self, now: DateTime<Utc>) {
        self.is_visible = true;
        self.is_active = true;
        self.is_ready = false;
        self.creation_time = Some(now);
        self.last_focus_time = Some(now);
    }

    /// Record a host visibility/focus change event.
    pub fn on_view_change(&mut self, visible: bool, active: bool, now: DateTime<Utc>) {
        self.is_visible = visible;
        self.is_active = active;
        if active {
            self.last_focus_time = Some(now);
        }
    }

    /// Record the hosted script's readiness signal.
    pub fn on_ready(&mut self) {
        self.is_ready = true;
    }

    /// Record a real disposal: resets the live flags and increments the
    /// dispose counter exactly once.
    pub fn on_disposed(&mut self) {
        self.is_visible = false;
        self.is_active = false;
        self.is_ready = false;
        self.dispose_count = self.dispose_count.saturating_add(1);
    }
}

// ─── Fallback Options ─────────────────────────────────────────────

/// Display-surface preferences, owned by the lifecycle manager and
/// refreshed from the host configuration store on change notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FallbackOptions {
    /// Whether a panel-creation failure attempts the sidebar surface.
    pub enable_sidebar_fallback: bool,
    /// Whether the user is notified when fallback occurs.
    pub show_fallback_message: bool,
    /// The surface tried first.
    pub preferred_display_method: DisplayMethod,
}

impl Default for FallbackOptions {
    fn default() -> Self {
        Self {
            enable_sidebar_fallback: true,
            show_fallback_message: true,
            preferred_display_method: DisplayMethod::Panel,
        }
    }
}

// ─── Canvas Config ────────────────────────────────────────────────

/// Initial configuration pushed to the canvas when it signals ready.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CanvasConfig {
    pub theme: String,
    pub grid_enabled: bool,
    pub snap_to_grid: bool,
    pub tablet_pressure: bool,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            theme: "dark".to_owned(),
            grid_enabled: true,
            snap_to_grid: false,
            tablet_pressure: true,
        }
    }
}

// ─── Wire Format ──────────────────────────────────────────────────

/// Structured details reported by the hosted script's error hook.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ErrorReport {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Context captured alongside a user-initiated issue report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IssueRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// Closed set of message payloads exchanged between host and panel.
///
/// One variant per recognized `command` discriminator; the payload
/// travels under the adjacent `data` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", content = "data", rename_all = "camelCase")]
pub enum Payload {
    // Panel → host
    CanvasReady,
    Error(ErrorReport),
    ToolChanged {
        tool: String,
    },
    DrawingStarted {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool: Option<String>,
    },
    DrawingEnded,
    CanvasCleared,
    ReportIssue(IssueRequest),
    ConnectionPing,
    // Host → panel
    InitConfig(CanvasConfig),
    ConnectionPong,
    ConnectionStatus {
        connected: bool,
    },
    UnknownCommand {
        command: String,
    },
    ErrorResponse {
        command: String,
        message: String,
    },
}

impl Payload {
    /// The command discriminator for this payload.
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::CanvasReady => CommandKind::CanvasReady,
            Self::Error(_) => CommandKind::Error,
            Self::ToolChanged { .. } => CommandKind::ToolChanged,
            Self::DrawingStarted { .. } => CommandKind::DrawingStarted,
            Self::DrawingEnded => CommandKind::DrawingEnded,
            Self::CanvasCleared => CommandKind::CanvasCleared,
            Self::ReportIssue(_) => CommandKind::ReportIssue,
            Self::ConnectionPing => CommandKind::ConnectionPing,
            Self::InitConfig(_) => CommandKind::InitConfig,
            Self::ConnectionPong => CommandKind::ConnectionPong,
            Self::ConnectionStatus { .. } => CommandKind::ConnectionStatus,
            Self::UnknownCommand { .. } => CommandKind::UnknownCommand,
            Self::ErrorResponse { .. } => CommandKind::ErrorResponse,
        }
    }
}

/// Fieldless mirror of [`Payload`], used as the handler-registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommandKind {
    CanvasReady,
    Error,
    ToolChanged,
    DrawingStarted,
    DrawingEnded,
    CanvasCleared,
    ReportIssue,
    ConnectionPing,
    InitConfig,
    ConnectionPong,
    ConnectionStatus,
    UnknownCommand,
    ErrorResponse,
}

impl CommandKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CanvasReady => "canvasReady",
            Self::Error => "error",
            Self::ToolChanged => "toolChanged",
            Self::DrawingStarted => "drawingStarted",
            Self::DrawingEnded => "drawingEnded",
            Self::CanvasCleared => "canvasCleared",
            Self::ReportIssue => "reportIssue",
            Self::ConnectionPing => "connectionPing",
            Self::InitConfig => "initConfig",
            Self::ConnectionPong => "connectionPong",
            Self::ConnectionStatus => "connectionStatus",
            Self::UnknownCommand => "unknownCommand",
            Self::ErrorResponse => "errorResponse",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandKind {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "canvasReady" => Ok(Self::CanvasReady),
            "error" => Ok(Self::Error),
            "toolChanged" => Ok(Self::ToolChanged),
            "drawingStarted" => Ok(Self::DrawingStarted),
            "drawingEnded" => Ok(Self::DrawingEnded),
            "canvasCleared" => Ok(Self::CanvasCleared),
            "reportIssue" => Ok(Self::ReportIssue),
            "connectionPing" => Ok(Self::ConnectionPing),
            "initConfig" => Ok(Self::InitConfig),
            "connectionPong" => Ok(Self::ConnectionPong),
            "connectionStatus" => Ok(Self::ConnectionStatus),
            "unknownCommand" => Ok(Self::UnknownCommand),
            "errorResponse" => Ok(Self::ErrorResponse),
            _ => Err(WireError::UnknownCommand(s.to_owned())),
        }
    }
}

/// The full wire message: a tagged payload plus optional envelope fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(flatten)]
    pub payload: Payload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Envelope {
    /// Wrap a payload with no envelope fields; the router stamps a
    /// timestamp on send if one is absent.
    pub fn new(payload: Payload) -> Self {
        Self {
            payload,
            timestamp: None,
            id: None,
        }
    }
}

impl From<Payload> for Envelope {
    fn from(payload: Payload) -> Self {
        Self::new(payload)
    }
}

// ─── Inbound Decoding ─────────────────────────────────────────────

/// Decoded classification of a raw inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// A recognized command with a well-formed payload.
    Known(Envelope),
    /// A command string nothing in the protocol recognizes.
    Unknown { command: String },
    /// A recognized command whose payload failed to parse.
    Malformed { command: String, detail: String },
}

/// Decode a raw JSON message from the panel.
///
/// Unrecognized and malformed commands are classified rather than
/// rejected, so the router can log and acknowledge them; only messages
/// that are not JSON objects with a string `command` are errors.
pub fn decode_inbound(raw: &str) -> Result<Inbound, WireError> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    let command = value
        .get("command")
        .and_then(|c| c.as_str())
        .ok_or(WireError::MissingCommand)?
        .to_owned();

    if CommandKind::from_str(&command).is_err() {
        return Ok(Inbound::Unknown { command });
    }

    // Struct-carrying commands may legally arrive without a `data` key
    // when every payload field defaults; retry those with an empty
    // object before classifying as malformed. Unit variants decode
    // without `data` on the first pass and never reach the retry.
    let retry = if value.get("data").is_none() {
        Some(value.clone())
    } else {
        None
    };

    match serde_json::from_value::<Envelope>(value) {
        Ok(envelope) => Ok(Inbound::Known(envelope)),
        Err(e) => {
            if let Some(mut with_data) = retry {
                if let Some(map) = with_data.as_object_mut() {
                    map.insert("data".to_owned(), serde_json::Value::Object(Default::default()));
                }
                if let Ok(envelope) = serde_json::from_value::<Envelope>(with_data) {
                    return Ok(Inbound::Known(envelope));
                }
            }
            Ok(Inbound::Malformed {
                command,
                detail: e.to_string(),
            })
        }
    }
}

// ─── Errors ───────────────────────────────────────────────────────

/// Wire-level decoding failures.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("message is not valid JSON: {0}")]
    NotJson(#[from] serde_json::Error),

    #[error("message has no string `command` field")]
    MissingCommand,

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("invalid display method: {0}")]
    InvalidDisplayMethod(String),
}

// ─── Tests ────────────────────────────────────────────────────────
