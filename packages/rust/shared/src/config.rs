//! Application configuration for LinkScout.
//!
//! User config lives at `~/.linkscout/linkscout.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LinkScoutError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "linkscout.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".linkscout";

/// Desktop Chrome identity presented to search engines and candidate sites.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

// ---------------------------------------------------------------------------
// Config structs (matching linkscout.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub discovery: DiscoverySection,

    #[serde(default)]
    pub analysis: AnalysisSection,

    #[serde(default)]
    pub fetcher: FetcherSection,

    #[serde(default)]
    pub classifier: ClassifierSection,
}

/// `[discovery]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoverySection {
    /// Number of generated queries actually sent to the search engine.
    #[serde(default = "default_query_budget")]
    pub query_budget: usize,

    /// Result entries examined per search results page.
    #[serde(default = "default_results_per_query")]
    pub results_per_query: usize,

    /// Cap on discovered pages after deduplication.
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Pause between consecutive search queries.
    #[serde(default = "default_inter_query_delay")]
    pub inter_query_delay_ms: u64,

    /// Search URL with a `{query}` placeholder.
    #[serde(default = "default_search_url_template")]
    pub search_url_template: String,
}

impl Default for DiscoverySection {
    fn default() -> Self {
        Self {
            query_budget: default_query_budget(),
            results_per_query: default_results_per_query(),
            max_results: default_max_results(),
            inter_query_delay_ms: default_inter_query_delay(),
            search_url_template: default_search_url_template(),
        }
    }
}

fn default_query_budget() -> usize {
    8
}
fn default_results_per_query() -> usize {
    5
}
fn default_max_results() -> usize {
    20
}
fn default_inter_query_delay() -> u64 {
    3000
}
fn default_search_url_template() -> String {
    "https://duckduckgo.com/?q={query}".into()
}

/// `[analysis]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSection {
    /// Maximum number of discovered pages analyzed per run.
    #[serde(default = "default_analysis_cap")]
    pub analysis_cap: usize,

    /// Pause between consecutive page analyses.
    #[serde(default = "default_inter_analysis_delay")]
    pub inter_analysis_delay_ms: u64,
}

impl Default for AnalysisSection {
    fn default() -> Self {
        Self {
            analysis_cap: default_analysis_cap(),
            inter_analysis_delay_ms: default_inter_analysis_delay(),
        }
    }
}

fn default_analysis_cap() -> usize {
    5
}
fn default_inter_analysis_delay() -> u64 {
    2000
}

/// Which rendering engine backs the fetcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetcherBackend {
    /// Real browser through a WebDriver server (renders client-side content).
    #[default]
    Webdriver,
    /// Plain HTTP GET, no script execution.
    Http,
}

impl std::str::FromStr for FetcherBackend {
    type Err = LinkScoutError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "webdriver" => Ok(Self::Webdriver),
            "http" => Ok(Self::Http),
            other => Err(LinkScoutError::config(format!(
                "unknown fetcher backend '{other}': expected 'webdriver' or 'http'"
            ))),
        }
    }
}

/// `[fetcher]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherSection {
    #[serde(default)]
    pub backend: FetcherBackend,

    /// WebDriver server (chromedriver, geckodriver, selenium).
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Wall-clock budget for fetching a candidate page.
    #[serde(default = "default_page_timeout")]
    pub page_timeout_secs: u64,

    /// Wall-clock budget for fetching a search results page.
    #[serde(default = "default_search_timeout")]
    pub search_timeout_secs: u64,

    /// Time given to client-side scripts after navigation completes.
    #[serde(default = "default_settle")]
    pub settle_ms: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_true")]
    pub headless: bool,
}

impl Default for FetcherSection {
    fn default() -> Self {
        Self {
            backend: FetcherBackend::default(),
            webdriver_url: default_webdriver_url(),
            page_timeout_secs: default_page_timeout(),
            search_timeout_secs: default_search_timeout(),
            settle_ms: default_settle(),
            user_agent: default_user_agent(),
            headless: true,
        }
    }
}

fn default_webdriver_url() -> String {
    "http://localhost:4444".into()
}
fn default_page_timeout() -> u64 {
    30
}
fn default_search_timeout() -> u64 {
    15
}
fn default_settle() -> u64 {
    2000
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.into()
}
fn default_true() -> bool {
    true
}

/// `[classifier]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierSection {
    /// Base URL of the local Ollama server.
    #[serde(default = "default_classifier_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_classifier_timeout")]
    pub timeout_secs: u64,
}

impl Default for ClassifierSection {
    fn default() -> Self {
        Self {
            base_url: default_classifier_url(),
            model: default_model(),
            timeout_secs: default_classifier_timeout(),
        }
    }
}

fn default_classifier_url() -> String {
    "http://127.0.0.1:11434".into()
}
fn default_model() -> String {
    "qwen2.5:32b-instruct-q4_K_M".into()
}
fn default_classifier_timeout() -> u64 {
    120
}

// ---------------------------------------------------------------------------
// Runtime config (merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime discovery-stage policy.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    pub query_budget: usize,
    pub results_per_query: usize,
    pub max_results: usize,
    pub inter_query_delay: Duration,
    pub search_url_template: String,
    pub search_timeout: Duration,
}

/// Runtime renderer settings.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub backend: FetcherBackend,
    pub webdriver_url: String,
    pub page_timeout: Duration,
    pub settle: Duration,
    pub user_agent: String,
    pub headless: bool,
}

/// Runtime classifier settings.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

/// Everything one run needs.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub discovery: DiscoveryConfig,
    pub fetcher: FetcherConfig,
    pub classifier: ClassifierConfig,
    pub analysis_cap: usize,
    pub inter_analysis_delay: Duration,
}

impl From<&AppConfig> for PipelineConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            discovery: DiscoveryConfig {
                query_budget: config.discovery.query_budget,
                results_per_query: config.discovery.results_per_query,
                max_results: config.discovery.max_results,
                inter_query_delay: Duration::from_millis(config.discovery.inter_query_delay_ms),
                search_url_template: config.discovery.search_url_template.clone(),
                search_timeout: Duration::from_secs(config.fetcher.search_timeout_secs),
            },
            fetcher: FetcherConfig {
                backend: config.fetcher.backend,
                webdriver_url: config.fetcher.webdriver_url.clone(),
                page_timeout: Duration::from_secs(config.fetcher.page_timeout_secs),
                settle: Duration::from_millis(config.fetcher.settle_ms),
                user_agent: config.fetcher.user_agent.clone(),
                headless: config.fetcher.headless,
            },
            classifier: ClassifierConfig {
                base_url: config.classifier.base_url.clone(),
                model: config.classifier.model.clone(),
                timeout: Duration::from_secs(config.classifier.timeout_secs),
            },
            analysis_cap: config.analysis.analysis_cap,
            inter_analysis_delay: Duration::from_millis(config.analysis.inter_analysis_delay_ms),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl PipelineConfig {
    /// Reject settings that cannot produce a meaningful run.
    pub fn validate(&self) -> Result<()> {
        if !self.discovery.search_url_template.contains("{query}") {
            return Err(LinkScoutError::config(
                "search_url_template must contain a {query} placeholder",
            ));
        }
        if self.discovery.max_results == 0 {
            return Err(LinkScoutError::config("max_results must be at least 1"));
        }
        if self.fetcher.page_timeout.is_zero() || self.discovery.search_timeout.is_zero() {
            return Err(LinkScoutError::config("fetch timeouts must be non-zero"));
        }
        if self.classifier.timeout.is_zero() {
            return Err(LinkScoutError::config("classifier timeout must be non-zero"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.linkscout/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| LinkScoutError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.linkscout/linkscout.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| LinkScoutError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| LinkScoutError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| LinkScoutError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| LinkScoutError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| LinkScoutError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
