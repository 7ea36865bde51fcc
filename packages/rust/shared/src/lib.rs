//! Shared types, error model, and configuration for LinkScout.
//!
//! This crate is the foundation depended on by all other LinkScout crates.
//! It provides:
//! - [`LinkScoutError`] — the unified error type, plus the per-page
//!   [`FetchError`] and [`ClassificationError`]
//! - Domain types ([`KeywordSet`], [`DiscoveredPage`], [`PageSnapshot`],
//!   [`ClassificationVerdict`], [`AnalysisResult`], [`RunSummary`])
//! - Wire responses ([`DiscoveryResponse`], [`CrawlResponse`], [`AnalyzeResponse`],
//!   [`PipelineResponse`])
//! - Configuration ([`AppConfig`], [`PipelineConfig`], config loading)

pub mod config;
pub mod error;
pub mod responses;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AnalysisSection, AppConfig, ClassifierConfig, ClassifierSection, DEFAULT_USER_AGENT,
    DiscoveryConfig, DiscoverySection, FetcherBackend, FetcherConfig, FetcherSection,
    PipelineConfig, config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{ClassificationError, FetchError, LinkScoutError, Result};
pub use responses::{
    AnalyzeResponse, CrawlResponse, DiscoveryResponse, ErrorResponse, PipelineResponse,
};
pub use types::{
    AnalysisResult, ClassificationVerdict, Difficulty, DiscoveredPage, InteractiveFeatures,
    KeywordSet, PageSnapshot, PageSource, RunId, RunSummary, Signal, TargetUrl,
};
