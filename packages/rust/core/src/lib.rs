//! Core pipeline orchestration and domain logic for LinkScout.
//!
//! This crate ties together discovery, page fetching, and classification
//! into end-to-end workflows:
//! - [`classifier`] — the language-model gateway and verdict parsing
//! - [`pipeline`] — the discovery-crawl-analyze run and single-page crawl
//! - [`export`] — the offline JSON export of a run

pub mod classifier;
pub mod export;
pub mod pipeline;

pub use classifier::{
    Classification, Classifier, OllamaClassifier, ParseTier, ParsedVerdict, analyze_content,
    parse_verdict,
};
pub use export::{ExportDocument, export_filename};
pub use pipeline::{Pipeline, ProgressReporter, RunReport, SilentProgress};
