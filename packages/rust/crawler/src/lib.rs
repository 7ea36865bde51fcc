//! Page rendering, content extraction, and interactive-feature detection.
//!
//! This crate provides:
//! - [`renderer`] — Browser (WebDriver) and plain HTTP page renderers
//! - [`extract`] — Reduces rendered HTML to a [`PageSnapshot`](linkscout_shared::PageSnapshot)
//! - [`features`] — Declarative interactive-signal detection table
//! - [`engine`] — [`PageFetcher`], which ties rendering and extraction together

pub mod engine;
pub mod extract;
pub mod features;
pub mod renderer;

pub use engine::PageFetcher;
pub use extract::snapshot;
pub use renderer::{
    HttpRenderer, PageRenderer, RenderResult, RenderedPage, Renderer, WebDriverRenderer,
};
