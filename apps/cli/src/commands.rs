//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::info;

use linkscout_core::classifier::{OllamaClassifier, analyze_content};
use linkscout_core::export::ExportDocument;
use linkscout_core::pipeline::{Pipeline, ProgressReporter};
use linkscout_shared::{
    AnalysisResult, AppConfig, ErrorResponse, FetcherBackend, KeywordSet, LinkScoutError,
    PipelineConfig, RunId, RunSummary, TargetUrl, init_config, load_config, load_config_from,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// LinkScout — find pages that accept backlinks.
#[derive(Parser)]
#[command(
    name = "linkscout",
    version,
    about = "Discover, crawl, and classify backlink opportunities for a set of keywords.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.linkscout/linkscout.toml).
    #[arg(long, env = "LINKSCOUT_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Flags shared by every command that runs part of the pipeline.
#[derive(Args, Debug, Clone, Default)]
pub(crate) struct RunOverrides {
    /// Number of search queries to send.
    #[arg(long)]
    pub query_budget: Option<usize>,

    /// Maximum number of discovered pages to analyze.
    #[arg(long)]
    pub analysis_cap: Option<usize>,

    /// Rendering backend: webdriver or http.
    #[arg(long)]
    pub backend: Option<FetcherBackend>,

    /// WebDriver server URL.
    #[arg(long, env = "LINKSCOUT_WEBDRIVER_URL")]
    pub webdriver_url: Option<String>,

    /// Ollama model to classify with.
    #[arg(long)]
    pub model: Option<String>,
}

impl RunOverrides {
    fn apply(&self, config: &mut PipelineConfig) {
        if let Some(budget) = self.query_budget {
            config.discovery.query_budget = budget;
        }
        if let Some(cap) = self.analysis_cap {
            config.analysis_cap = cap;
        }
        if let Some(backend) = self.backend {
            config.fetcher.backend = backend;
        }
        if let Some(url) = &self.webdriver_url {
            config.fetcher.webdriver_url = url.clone();
        }
        if let Some(model) = &self.model {
            config.classifier.model = model.clone();
        }
    }
}

/// Where the content to classify comes from.
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub(crate) struct ContentSource {
    /// Page content as text.
    #[arg(long)]
    pub content: Option<String>,

    /// Read page content from a file.
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,
}

impl ContentSource {
    fn read(&self) -> linkscout_shared::Result<String> {
        match (&self.content, &self.file) {
            (Some(text), _) => Ok(text.clone()),
            (None, Some(path)) => {
                std::fs::read_to_string(path).map_err(|e| LinkScoutError::io(path, e))
            }
            (None, None) => Err(LinkScoutError::validation("content is required")),
        }
    }
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Discover candidate pages without analyzing them.
    Search {
        /// Keywords (space or comma separated).
        keywords: String,

        /// URL the backlinks should point to.
        #[arg(short, long)]
        target: String,

        #[command(flatten)]
        overrides: RunOverrides,
    },

    /// Fetch and classify a single page.
    Crawl {
        /// Page to analyze.
        url: String,

        /// Keywords (space or comma separated).
        keywords: String,

        /// URL the backlinks should point to.
        #[arg(short, long)]
        target: String,

        #[command(flatten)]
        overrides: RunOverrides,
    },

    /// Classify page content supplied directly.
    Analyze {
        /// Keywords (space or comma separated).
        keywords: String,

        /// URL the backlinks should point to.
        #[arg(short, long)]
        target: String,

        #[command(flatten)]
        source: ContentSource,

        #[command(flatten)]
        overrides: RunOverrides,
    },

    /// Discover pages and analyze the first few of them.
    Discover {
        /// Keywords (space or comma separated).
        keywords: String,

        /// URL the backlinks should point to.
        #[arg(short, long)]
        target: String,

        #[command(flatten)]
        overrides: RunOverrides,
    },

    /// Run discovery (and analysis) and write a JSON export file.
    Export {
        /// Keywords (space or comma separated).
        keywords: String,

        /// URL the backlinks should point to.
        #[arg(short, long)]
        target: String,

        /// Output directory.
        #[arg(short, long, default_value = ".")]
        out: PathBuf,

        /// Skip page analysis; export discovered pages only.
        #[arg(long)]
        discovery_only: bool,

        #[command(flatten)]
        overrides: RunOverrides,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr; stdout carries JSON.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "linkscout=info",
        1 => "linkscout=debug",
        _ => "linkscout=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Search {
            keywords,
            target,
            overrides,
        } => cmd_search(config_path, &keywords, &target, &overrides).await,
        Command::Crawl {
            url,
            keywords,
            target,
            overrides,
        } => cmd_crawl(config_path, &url, &keywords, &target, &overrides).await,
        Command::Analyze {
            keywords,
            target,
            source,
            overrides,
        } => cmd_analyze(config_path, &keywords, &target, &source, &overrides).await,
        Command::Discover {
            keywords,
            target,
            overrides,
        } => cmd_discover(config_path, &keywords, &target, &overrides).await,
        Command::Export {
            keywords,
            target,
            out,
            discovery_only,
            overrides,
        } => cmd_export(config_path, &keywords, &target, &out, discovery_only, &overrides).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn resolve_config(path: Option<&Path>, overrides: &RunOverrides) -> Result<PipelineConfig> {
    let app: AppConfig = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    let mut config = PipelineConfig::from(&app);
    overrides.apply(&mut config);
    Ok(config)
}

fn parse_inputs(keywords: &str, target: &str) -> linkscout_shared::Result<(KeywordSet, TargetUrl)> {
    Ok((KeywordSet::parse(keywords)?, TargetUrl::parse(target)?))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print the failure response on stdout and turn the error into a report.
fn fail(headline: &str, err: LinkScoutError) -> color_eyre::Report {
    let response = ErrorResponse::from_error(headline, &err);
    match serde_json::to_string_pretty(&response) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("failed to serialize error response: {e}"),
    }
    eyre!(err).wrap_err(headline.to_string())
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_search(
    config_path: Option<&Path>,
    keywords: &str,
    target: &str,
    overrides: &RunOverrides,
) -> Result<()> {
    const HEADLINE: &str = "Failed to discover pages";

    let config = resolve_config(config_path, overrides)?;
    let (keywords, target) = parse_inputs(keywords, target).map_err(|e| fail(HEADLINE, e))?;
    let pipeline = Pipeline::from_config(&config).map_err(|e| fail(HEADLINE, e))?;

    let spinner = CliProgress::new();
    spinner.phase("Discovering pages");
    let response = pipeline.search(&keywords, &target).await;
    spinner.finish();

    let response = response.map_err(|e| fail(HEADLINE, e))?;
    info!(found = response.total_found, "discovery finished");
    print_json(&response)
}

async fn cmd_crawl(
    config_path: Option<&Path>,
    url: &str,
    keywords: &str,
    target: &str,
    overrides: &RunOverrides,
) -> Result<()> {
    const HEADLINE: &str = "Failed to crawl page";

    let config = resolve_config(config_path, overrides)?;
    let (keywords, target) = parse_inputs(keywords, target).map_err(|e| fail(HEADLINE, e))?;
    let pipeline = Pipeline::from_config(&config).map_err(|e| fail(HEADLINE, e))?;

    let spinner = CliProgress::new();
    spinner.phase(&format!("Analyzing {url}"));
    let response = pipeline.crawl_page(url, &keywords, &target).await;
    spinner.finish();

    print_json(&response.map_err(|e| fail(HEADLINE, e))?)
}

async fn cmd_analyze(
    config_path: Option<&Path>,
    keywords: &str,
    target: &str,
    source: &ContentSource,
    overrides: &RunOverrides,
) -> Result<()> {
    const HEADLINE: &str = "Failed to analyze content";

    let config = resolve_config(config_path, overrides)?;
    let (keywords, target) = parse_inputs(keywords, target).map_err(|e| fail(HEADLINE, e))?;
    let content = source.read().map_err(|e| fail(HEADLINE, e))?;
    let classifier = OllamaClassifier::new(&config.classifier).map_err(|e| fail(HEADLINE, e))?;

    let spinner = CliProgress::new();
    spinner.phase("Classifying content");
    let response = analyze_content(&classifier, &content, &keywords, &target).await;
    spinner.finish();

    print_json(&response.map_err(|e| fail(HEADLINE, e))?)
}

async fn cmd_discover(
    config_path: Option<&Path>,
    keywords: &str,
    target: &str,
    overrides: &RunOverrides,
) -> Result<()> {
    const HEADLINE: &str = "Failed to discover and analyze pages";

    let config = resolve_config(config_path, overrides)?;
    let (keywords, target) = parse_inputs(keywords, target).map_err(|e| fail(HEADLINE, e))?;
    let pipeline = Pipeline::from_config(&config).map_err(|e| fail(HEADLINE, e))?;

    let reporter = CliProgress::new();
    let report = pipeline
        .run(&keywords, &target, &reporter)
        .await
        .map_err(|e| {
            reporter.finish();
            fail(HEADLINE, e)
        })?;

    print_json(&report.to_response())
}

async fn cmd_export(
    config_path: Option<&Path>,
    keywords: &str,
    target: &str,
    out: &Path,
    discovery_only: bool,
    overrides: &RunOverrides,
) -> Result<()> {
    const HEADLINE: &str = "Failed to generate download";

    let config = resolve_config(config_path, overrides)?;
    let (keywords, target) = parse_inputs(keywords, target).map_err(|e| fail(HEADLINE, e))?;
    let pipeline = Pipeline::from_config(&config).map_err(|e| fail(HEADLINE, e))?;

    let reporter = CliProgress::new();
    let document = if discovery_only {
        reporter.phase("Discovering pages");
        let outcome = pipeline.discover(&keywords, &target).await;
        reporter.finish();
        let outcome = outcome.map_err(|e| fail(HEADLINE, e))?;
        ExportDocument::new(RunId::new(), &keywords, &target, &outcome, &[], &config)
    } else {
        let report = pipeline
            .run(&keywords, &target, &reporter)
            .await
            .map_err(|e| {
                reporter.finish();
                fail(HEADLINE, e)
            })?;
        ExportDocument::new(
            report.run_id,
            &keywords,
            &target,
            &report.discovery,
            &report.results,
            &config,
        )
    };

    let path = document.write_to(out).map_err(|e| fail(HEADLINE, e))?;
    println!("{}", path.display());
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config: AppConfig = match config_path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Progress display
// ---------------------------------------------------------------------------

/// Spinner on stderr implementing [`ProgressReporter`].
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn page_started(&self, url: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Analyzing [{current}/{total}] {url}"));
    }

    fn page_finished(&self, result: &AnalysisResult, current: usize, total: usize) {
        let status = if !result.success {
            "failed"
        } else if result.analysis.is_opportunity {
            "opportunity"
        } else {
            "no opportunity"
        };
        self.spinner.println(format!(
            "[{current}/{total}] {} — {status} ({}%)",
            result.discovery_info.url, result.analysis.confidence
        ));
    }

    fn done(&self, summary: &RunSummary) {
        self.finish();
        eprintln!(
            "Analyzed {} of {} discovered pages: {} opportunities, average confidence {}%",
            summary.analyzed_count,
            summary.discovered_count,
            summary.opportunity_count,
            summary.average_confidence
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn discover_flags_override_config() {
        let cli = Cli::parse_from([
            "linkscout",
            "discover",
            "web development programming",
            "--target",
            "https://my-dev-blog.com",
            "--analysis-cap",
            "3",
            "--query-budget",
            "2",
            "--backend",
            "http",
        ]);

        let Command::Discover { overrides, .. } = cli.command else {
            panic!("expected discover");
        };
        let mut config = PipelineConfig::default();
        overrides.apply(&mut config);

        assert_eq!(config.analysis_cap, 3);
        assert_eq!(config.discovery.query_budget, 2);
        assert_eq!(config.fetcher.backend, FetcherBackend::Http);
        // untouched values keep their defaults
        assert_eq!(config.discovery.max_results, 20);
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let parsed = Cli::try_parse_from([
            "linkscout",
            "search",
            "seo",
            "--target",
            "https://example.com",
            "--backend",
            "carrier-pigeon",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn export_defaults() {
        let cli = Cli::parse_from(["linkscout", "export", "gold kosmetik", "-t", "https://x.de"]);
        let Command::Export {
            out,
            discovery_only,
            ..
        } = cli.command
        else {
            panic!("expected export");
        };
        assert_eq!(out, PathBuf::from("."));
        assert!(!discovery_only);
    }

    #[test]
    fn analyze_takes_exactly_one_content_source() {
        let cli = Cli::parse_from([
            "linkscout",
            "analyze",
            "gold kosmetik",
            "-t",
            "https://x.de",
            "--content",
            "Forum mit Registrierung",
        ]);
        let Command::Analyze { source, .. } = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(source.read().unwrap(), "Forum mit Registrierung");

        let missing = Cli::try_parse_from(["linkscout", "analyze", "seo", "-t", "https://x.de"]);
        assert!(missing.is_err());

        let both = Cli::try_parse_from([
            "linkscout",
            "analyze",
            "seo",
            "-t",
            "https://x.de",
            "--content",
            "a",
            "--file",
            "b.txt",
        ]);
        assert!(both.is_err());
    }

    #[test]
    fn unreadable_content_file_is_io_error() {
        let source = ContentSource {
            content: None,
            file: Some(PathBuf::from("/nonexistent/linkscout/page.txt")),
        };
        assert_eq!(source.read().unwrap_err().kind(), "io");
    }

    #[tokio::test]
    async fn analyze_command_classifies_file_content() {
        use wiremock::matchers::{body_partial_json, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(serde_json::json!({ "model": "test-model" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message": {
                    "role": "assistant",
                    "content": r#"{"isOpportunity": true, "confidence": 77}"#
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = std::env::temp_dir().join(format!("linkscout-analyze-{}", RunId::new()));
        std::fs::create_dir_all(&dir).unwrap();
        let config_path = dir.join("linkscout.toml");
        std::fs::write(
            &config_path,
            format!("[classifier]\nbase_url = \"{}\"\nmodel = \"test-model\"\n", server.uri()),
        )
        .unwrap();
        let page = dir.join("page.txt");
        std::fs::write(&page, "Title: Beauty Forum\nContent: Jetzt registrieren").unwrap();

        let source = ContentSource {
            content: None,
            file: Some(page),
        };
        cmd_analyze(
            Some(&config_path),
            "gold kosmetik",
            "https://x.de",
            &source,
            &RunOverrides::default(),
        )
        .await
        .unwrap();

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn invalid_inputs_are_validation_errors() {
        let err = parse_inputs(" , ", "https://x.de").unwrap_err();
        assert_eq!(err.kind(), "validation");
        let err = parse_inputs("seo", "mailto:me@x.de").unwrap_err();
        assert_eq!(err.kind(), "validation");
    }
}
