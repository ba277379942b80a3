//! sketchdock-content: builds the HTML/CSS/script bundle loaded into the
//! hosted panel, including the loading and error overlays and the
//! Content-Security-Policy string.
//!
//! Failures never propagate out of this crate: anything that goes wrong
//! while resolving resources degrades into a rendered error page.

pub mod renderer;
pub mod template;

pub use renderer::{ContentError, PanelEnvironment, render_content, render_error_content};
