//! Embedded base template, overlay fragments, and the hosted init script.
//!
//! The renderer splices fragments at the `<!-- sketchdock:* -->` markers
//! when present, and falls back to `</head>` / `</body>` anchors for
//! host-supplied templates that don't carry them.

/// Splice markers recognized in base templates.
pub const MARKER_CSP: &str = "<!-- sketchdock:csp -->";
pub const MARKER_STYLES: &str = "<!-- sketchdock:styles -->";
pub const MARKER_OVERLAYS: &str = "<!-- sketchdock:overlays -->";
pub const MARKER_SCRIPTS: &str = "<!-- sketchdock:scripts -->";

/// Stylesheet resources, relative to the extension root.
pub const STYLE_FILES: &[&str] = &["media/canvas.css"];

/// Script resources in load order. The error-handling script must load
/// first so later failures are caught; the drawing-state script loads
/// last because it assumes the engine and palette are registered.
pub const SCRIPT_FILES: &[&str] = &[
    "media/error-handler.js",
    "media/canvas-engine.js",
    "media/tool-palette.js",
    "media/drawing-state.js",
];

/// Embedded copy of the base HTML template, used when the host-side
/// template cannot be read.
pub const BASE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<!-- sketchdock:csp -->
<title>Sketchdock Canvas</title>
<!-- sketchdock:styles -->
</head>
<body>
<!-- sketchdock:overlays -->
<div id="canvas-root">
  <canvas id="drawing-canvas"></canvas>
</div>
<!-- sketchdock:scripts -->
</body>
</html>
"#;

/// Loading overlay shown until the canvas signals ready.
pub const LOADING_OVERLAY: &str = r#"<div id="loading-overlay" class="overlay">
  <div class="overlay-box">
    <div class="spinner"></div>
    <p>Loading canvas&hellip;</p>
  </div>
</div>"#;

/// Error overlay, hidden by default; the init script fills in the
/// message and reveals it on failure.
pub const ERROR_OVERLAY: &str = r#"<div id="error-overlay" class="overlay" hidden>
  <div class="overlay-box overlay-error">
    <h2>Canvas failed to load</h2>
    <p id="error-overlay-message"></p>
    <div class="overlay-actions">
      <button id="error-overlay-retry">Retry</button>
      <button id="error-overlay-report">Report Issue</button>
    </div>
  </div>
</div>"#;

/// Hosted init script.
///
/// Contract: install global error hooks before anything else, bound the
/// initialization sequence at 10s, emit `canvasReady` on success, and run
/// a local heartbeat that mirrors the host-side 30s liveness threshold.
pub const INIT_SCRIPT: &str = r#"(function () {
  'use strict';
  var INIT_TIMEOUT_MS = 10000;
  var CONNECTION_TIMEOUT_MS = 30000;
  var HEARTBEAT_INTERVAL_MS = 5000;

  var bridge = typeof acquireHostApi === 'function'
    ? acquireHostApi()
    : { postMessage: function () {} };

  var initialized = false;
  var disposed = false;
  var initTimer = null;
  var lastHostMessage = 0;

  function send(command, data) {
    bridge.postMessage({
      command: command,
      data: data,
      timestamp: new Date().toISOString()
    });
  }

  function showError(message) {
    var overlay = document.getElementById('error-overlay');
    var text = document.getElementById('error-overlay-message');
    if (text) { text.textContent = message; }
    if (overlay) { overlay.hidden = false; }
    var loading = document.getElementById('loading-overlay');
    if (loading) { loading.hidden = true; }
  }

  function reportError(message, stack) {
    if (initialized) {
      send('error', { message: message, stack: stack || null, source: 'canvas' });
    } else {
      showError(message);
    }
  }

  window.addEventListener('error', function (event) {
    reportError(String(event.message || 'unknown error'),
      event.error && event.error.stack);
  });
  window.addEventListener('unhandledrejection', function (event) {
    var reason = event.reason || 'unhandled rejection';
    reportError(String(reason.message || reason), reason.stack);
  });
  window.addEventListener('message', function () {
    lastHostMessage = Date.now();
  });

  var retry = document.getElementById('error-overlay-retry');
  if (retry) {
    retry.addEventListener('click', function () { window.location.reload(); });
  }
  var report = document.getElementById('error-overlay-report');
  if (report) {
    report.addEventListener('click', function () {
      send('reportIssue', { context: 'error overlay' });
    });
  }

  initTimer = setTimeout(function () {
    initTimer = null;
    if (!initialized && !disposed) {
      showError('Canvas initialization timed out after 10 seconds.');
    }
  }, INIT_TIMEOUT_MS);

  function finishInit() {
    if (disposed) { return; }
    initialized = true;
    if (initTimer !== null) {
      clearTimeout(initTimer);
      initTimer = null;
    }
    var loading = document.getElementById('loading-overlay');
    if (loading) { loading.hidden = true; }
    send('canvasReady');

    setInterval(function () {
      var indicator = document.getElementById('connection-indicator');
      if (indicator) {
        var alive = lastHostMessage > 0 &&
          (Date.now() - lastHostMessage) < CONNECTION_TIMEOUT_MS;
        indicator.classList.toggle('connected', alive);
        indicator.classList.toggle('disconnected', !alive);
      }
      send('connectionPing');
    }, HEARTBEAT_INTERVAL_MS);
  }

  window.addEventListener('unload', function () { disposed = true; });

  if (document.readyState === 'loading') {
    document.addEventListener('DOMContentLoaded', finishInit);
  } else {
    finishInit();
  }
})();"#;
