//! Content renderer: resolves resources, builds the CSP, and splices the
//! style/script/overlay fragments into the base template.

use std::fmt::Write as _;

use sketchdock_core::types::CanvasConfig;

use crate::template::{
    BASE_TEMPLATE, ERROR_OVERLAY, INIT_SCRIPT, LOADING_OVERLAY, MARKER_CSP, MARKER_OVERLAYS,
    MARKER_SCRIPTS, MARKER_STYLES, SCRIPT_FILES, STYLE_FILES,
};

// ─── Environment ──────────────────────────────────────────────────

/// Panel capabilities the renderer needs from the host: resource-URI
/// resolution, the panel's CSP origin token, and the base template.
pub trait PanelEnvironment {
    /// Resolve an extension-relative path into a panel-addressable URI.
    fn panel_uri(&self, relative: &str) -> Result<String, ContentError>;

    /// The panel's own origin token for CSP source lists.
    fn csp_source(&self) -> String;

    /// Read the host-side base template. Errors fall back to the
    /// embedded copy.
    fn read_template(&self) -> Result<String, ContentError>;
}

/// Failure while assembling panel content.
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("failed to resolve resource {path}: {detail}")]
    ResourceResolution { path: String, detail: String },

    #[error("failed to read base template: {0}")]
    TemplateRead(String),
}

// ─── Rendering ────────────────────────────────────────────────────

/// Build the full HTML document for the panel.
///
/// Never fails: resource-resolution errors degrade into the rendered
/// error page, and an unreadable host template falls back to the
/// embedded copy.
pub fn render_content(env: &dyn PanelEnvironment, config: &CanvasConfig) -> String {
    match try_render(env, config) {
        Ok(html) => html,
        Err(e) => {
            tracing::error!(error = %e, "content rendering failed, serving error page");
            render_error_content(&e.to_string())
        }
    }
}

fn try_render(env: &dyn PanelEnvironment, config: &CanvasConfig) -> Result<String, ContentError> {
    let template = match env.read_template() {
        Ok(t) => t,
        Err(e) => {
            tracing::warn!(error = %e, "host template unreadable, using embedded template");
            BASE_TEMPLATE.to_owned()
        }
    };

    let nonce = new_nonce();
    let csp_meta = format!(
        r#"<meta http-equiv="Content-Security-Policy" content="{}">"#,
        build_csp(&env.csp_source(), &nonce)
    );

    let mut styles = String::with_capacity(128);
    for path in STYLE_FILES {
        let uri = env.panel_uri(path)?;
        let _ = writeln!(styles, r#"<link rel="stylesheet" href="{uri}">"#);
    }

    // Scripts in fixed dependency order, then the inline init script.
    let mut scripts = String::with_capacity(512);
    for path in SCRIPT_FILES {
        let uri = env.panel_uri(path)?;
        let _ = writeln!(scripts, r#"<script nonce="{nonce}" src="{uri}"></script>"#);
    }
    let config_json =
        serde_json::to_string(config).unwrap_or_else(|_| "{}".to_owned());
    let _ = writeln!(
        scripts,
        "<script nonce=\"{nonce}\">window.__sketchdockConfig = {config_json};</script>"
    );
    let _ = writeln!(scripts, "<script nonce=\"{nonce}\">{INIT_SCRIPT}</script>");

    let mut overlays = String::new();
    if !template.contains(r#"id="loading-overlay""#) {
        overlays.push_str(LOADING_OVERLAY);
        overlays.push('\n');
    }
    if !template.contains(r#"id="error-overlay""#) {
        overlays.push_str(ERROR_OVERLAY);
        overlays.push('\n');
    }

    let html = splice(&template, MARKER_CSP, "</head>", &csp_meta);
    let html = splice(&html, MARKER_STYLES, "</head>", &styles);
    let html = splice(&html, MARKER_OVERLAYS, "</body>", &overlays);
    let html = splice(&html, MARKER_SCRIPTS, "</body>", &scripts);
    Ok(html)
}

/// Replace `marker` with `fragment`, or insert the fragment just before
/// `anchor` in templates without the marker.
fn splice(html: &str, marker: &str, anchor: &str, fragment: &str) -> String {
    if html.contains(marker) {
        return html.replacen(marker, fragment, 1);
    }
    match html.find(anchor) {
        Some(pos) => {
            let mut out = String::with_capacity(html.len() + fragment.len());
            out.push_str(&html[..pos]);
            out.push_str(fragment);
            out.push_str(&html[pos..]);
            out
        }
        // No anchor either: append, keeping the fragment in the document.
        None => {
            let mut out = html.to_owned();
            out.push_str(fragment);
            out
        }
    }
}

/// Content-Security-Policy scoped to the panel's own origin token, with
/// nonce-gated scripts and no default sources.
fn build_csp(source: &str, nonce: &str) -> String {
    format!(
        "default-src 'none'; img-src {source} data: blob:; \
         style-src {source} 'unsafe-inline'; font-src {source}; \
         script-src 'nonce-{nonce}'; connect-src {source};"
    )
}

fn new_nonce() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

// ─── Error page ───────────────────────────────────────────────────

/// Render the standalone error page for `message`.
///
/// Pure; the message is HTML-escaped so hosted errors cannot inject
/// markup. Used internally on render failure and by the lifecycle
/// manager to show a failure state directly.
pub fn render_error_content(message: &str) -> String {
    let mut escaped = String::with_capacity(message.len());
    escape_html_into(&mut escaped, message);

    let mut out = String::with_capacity(1_024 + escaped.len());
    out.push_str(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<title>Canvas Error</title>
</head>
<body>
<div class="overlay-box overlay-error">
<h2>Canvas failed to load</h2>
<p class="error-message">"#,
    );
    out.push_str(&escaped);
    out.push_str(
        r#"</p>
<h3>Troubleshooting</h3>
<ul>
<li>Reload the editor window and reopen the canvas.</li>
<li>Check that the extension installed completely.</li>
<li>Disable other canvas or drawing extensions and retry.</li>
<li>Review the extension logs for details.</li>
</ul>
<div class="overlay-actions">
<button onclick="window.location.reload()">Retry</button>
<button onclick="window.parent.postMessage({command:'reportIssue',data:{context:'error page'}},'*')">Report Issue</button>
</div>
</div>
</body>
</html>
"#,
    );
    out
}

/// HTML-escape `s` into the output buffer.
fn escape_html_into(out: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────
