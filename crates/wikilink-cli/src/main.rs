//! wikilink: converts `[[wikilinks]]` in Trilium notes into native links.
//!
//! Runs against either a Trilium `document.db` file or a live server through
//! ETAPI. Processor settings come from `WIKILINK_*` environment variables
//! (a `.env` file is honored); flags given here override them.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wikilink_core::{parse, LinkFormat, NoteStore, ProcessorConfig, ReportFormat};
use wikilink_db::{Database, PoolConfig};
use wikilink_etapi::{EtapiConfig, EtapiNoteStore};
use wikilink_jobs::{demo, render, ReportTotals, WikilinkProcessor};

#[derive(Parser)]
#[command(name = "wikilink")]
#[command(author, version, about = "Convert [[wikilinks]] in Trilium notes into native links")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process candidate notes and publish a report
    Run {
        #[command(flatten)]
        store: StoreArgs,

        /// Resolve links without writing note content or creating notes
        #[arg(long)]
        dry_run: bool,

        /// Only process the subtree under this note id
        #[arg(long)]
        scope: Option<String>,

        /// Report markup
        #[arg(long, value_enum)]
        report_format: Option<FormatArg>,

        /// Output syntax for rewritten links
        #[arg(long, value_enum)]
        link_format: Option<LinkFormatArg>,

        /// Skip publishing the report note
        #[arg(long)]
        no_report: bool,

        /// Print the rendered report to stdout instead of the summary
        #[arg(long)]
        print_report: bool,

        /// Log every resolution decision at info level
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print the wikilinks found in a file as JSON
    Parse {
        /// File to scan
        file: PathBuf,
    },

    /// Create or remove the demo notes
    Demo {
        #[command(flatten)]
        store: StoreArgs,

        #[command(subcommand)]
        action: DemoAction,
    },
}

#[derive(Subcommand, Clone, Copy)]
enum DemoAction {
    /// Create the demo notes under root
    Seed,
    /// Delete every note labelled demoWikilink
    Cleanup,
}

#[derive(Args, Debug, Clone, Default)]
struct StoreArgs {
    /// Trilium document.db (default: $TRILIUM_DB_PATH)
    #[arg(long, conflicts_with = "etapi")]
    db: Option<PathBuf>,

    /// Trilium server URL for ETAPI access (default: $TRILIUM_ETAPI_URL)
    #[arg(long, requires = "token")]
    etapi: Option<String>,

    /// ETAPI token (default: $TRILIUM_ETAPI_TOKEN)
    #[arg(long)]
    token: Option<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum FormatArg {
    Html,
    Markdown,
    Json,
}

impl From<FormatArg> for ReportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Html => ReportFormat::Html,
            FormatArg::Markdown => ReportFormat::Markdown,
            FormatArg::Json => ReportFormat::Json,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum LinkFormatArg {
    Internal,
    Markdown,
}

impl From<LinkFormatArg> for LinkFormat {
    fn from(arg: LinkFormatArg) -> Self {
        match arg {
            LinkFormatArg::Internal => LinkFormat::Internal,
            LinkFormatArg::Markdown => LinkFormat::Markdown,
        }
    }
}

/// Where notes are read from and written to.
#[derive(Debug, Clone, PartialEq, Eq)]
enum StoreTarget {
    Sqlite(PathBuf),
    Etapi { url: String, token: String },
}

impl StoreArgs {
    /// Flags first, then `TRILIUM_DB_PATH`, then the ETAPI variables.
    fn target(&self) -> anyhow::Result<StoreTarget> {
        if let Some(path) = &self.db {
            return Ok(StoreTarget::Sqlite(path.clone()));
        }
        if let Some(url) = &self.etapi {
            let token = self
                .token
                .clone()
                .or_else(|| std::env::var("TRILIUM_ETAPI_TOKEN").ok())
                .context("--etapi requires --token or TRILIUM_ETAPI_TOKEN")?;
            return Ok(StoreTarget::Etapi {
                url: url.clone(),
                token,
            });
        }
        if let Ok(path) = std::env::var("TRILIUM_DB_PATH") {
            if !path.trim().is_empty() {
                return Ok(StoreTarget::Sqlite(PathBuf::from(path)));
            }
        }
        if let Some(config) = EtapiConfig::from_env() {
            return Ok(StoreTarget::Etapi {
                url: config.base_url,
                token: self.token.clone().unwrap_or(config.token),
            });
        }
        bail!("no note store configured: pass --db or --etapi, or set TRILIUM_DB_PATH or TRILIUM_ETAPI_URL")
    }
}

async fn open_store(
    target: &StoreTarget,
    config: &ProcessorConfig,
) -> anyhow::Result<Arc<dyn NoteStore>> {
    match target {
        StoreTarget::Sqlite(path) => {
            let pool_config = PoolConfig::new().query_timeout(config.query_timeout());
            let db = Database::open_with_config(path, pool_config)
                .await
                .with_context(|| format!("failed to open {}", path.display()))?;
            Ok(Arc::new(db.notes))
        }
        StoreTarget::Etapi { url, token } => {
            let etapi = EtapiConfig::new(url.clone(), token.clone())
                .with_timeout(config.query_timeout());
            let store = EtapiNoteStore::new(etapi).context("failed to build ETAPI client")?;
            Ok(Arc::new(store))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let _log_guard = init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            store,
            dry_run,
            scope,
            report_format,
            link_format,
            no_report,
            print_report,
            verbose,
        } => {
            let mut config = ProcessorConfig::from_env();
            apply_run_overrides(
                &mut config,
                RunOverrides {
                    dry_run,
                    scope,
                    report_format,
                    link_format,
                    no_report,
                    verbose,
                },
            );
            config.validate()?;
            cmd_run(&store.target()?, config, print_report).await
        }
        Commands::Parse { file } => {
            println!("{}", cmd_parse(&file)?);
            Ok(())
        }
        Commands::Demo { store, action } => {
            let config = ProcessorConfig::from_env();
            let notes = open_store(&store.target()?, &config).await?;
            cmd_demo(notes.as_ref(), action).await
        }
    }
}

/// Flags of `wikilink run` that override the environment configuration.
#[derive(Debug, Default)]
struct RunOverrides {
    dry_run: bool,
    scope: Option<String>,
    report_format: Option<FormatArg>,
    link_format: Option<LinkFormatArg>,
    no_report: bool,
    verbose: bool,
}

fn apply_run_overrides(config: &mut ProcessorConfig, overrides: RunOverrides) {
    if overrides.dry_run {
        config.dry_run = true;
    }
    if let Some(scope) = overrides.scope {
        config.scope_to_parent_note = Some(scope);
    }
    if let Some(format) = overrides.report_format {
        config.report.format = format.into();
    }
    if let Some(format) = overrides.link_format {
        config.link_format = format.into();
    }
    if overrides.no_report {
        config.report.generate = false;
    }
    if overrides.verbose {
        config.verbose_logging = true;
    }
}

async fn cmd_run(
    target: &StoreTarget,
    config: ProcessorConfig,
    print_report: bool,
) -> anyhow::Result<()> {
    let store = open_store(target, &config).await?;
    let processor = WikilinkProcessor::new(store, config)?;
    let outcome = processor.run().await?;

    if print_report {
        let report = outcome.report(processor.config());
        println!("{}", render(&report, processor.config().report.format)?);
        return Ok(());
    }

    let totals = ReportTotals::from_results(&outcome.results);
    let output = serde_json::json!({
        "totals": totals,
        "execution_time_ms": outcome.execution_time_ms,
        "report_note_id": outcome.report_note_id,
        "dry_run": processor.config().dry_run,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

fn cmd_parse(path: &Path) -> anyhow::Result<String> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let links = parse(&content);
    Ok(serde_json::to_string_pretty(&links)?)
}

async fn cmd_demo(store: &dyn NoteStore, action: DemoAction) -> anyhow::Result<()> {
    let output = match action {
        DemoAction::Seed => serde_json::to_value(demo::seed(store).await?)?,
        DemoAction::Cleanup => serde_json::json!({ "deleted": demo::cleanup(store).await? }),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Initialize tracing. Logs go to stderr (or `LOG_FILE`) so stdout stays
/// machine-readable.
///
/// Environment variables:
///   LOG_FORMAT  - "json" or "text" (default: "text")
///   LOG_FILE    - path to log file (optional, enables daily-rolling file logging)
///   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
///   RUST_LOG    - standard env filter (default: "wikilink=info")
fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "wikilink=info,sqlx=warn".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    let guard = if let Some(ref path) = log_file {
        let file_dir = Path::new(path).parent().unwrap_or(Path::new("."));
        let file_name = Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("wikilink.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false));
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        subsystem = "cli",
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stderr)"),
        "Logging initialized"
    );
    guard
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_run_flags_parse() {
        let cli = Cli::try_parse_from([
            "wikilink",
            "run",
            "--db",
            "/tmp/document.db",
            "--dry-run",
            "--scope",
            "proj",
            "--report-format",
            "markdown",
        ])
        .unwrap();

        match cli.command {
            Commands::Run {
                store,
                dry_run,
                scope,
                report_format,
                ..
            } => {
                assert_eq!(
                    store.target().unwrap(),
                    StoreTarget::Sqlite(PathBuf::from("/tmp/document.db"))
                );
                assert!(dry_run);
                assert_eq!(scope.as_deref(), Some("proj"));
                assert_eq!(report_format, Some(FormatArg::Markdown));
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_db_and_etapi_conflict() {
        let parsed = Cli::try_parse_from([
            "wikilink", "run", "--db", "a.db", "--etapi", "http://x", "--token", "t",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_etapi_requires_token() {
        let parsed = Cli::try_parse_from(["wikilink", "run", "--etapi", "http://localhost:8080"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_etapi_target_from_flags() {
        let args = StoreArgs {
            db: None,
            etapi: Some("http://localhost:8080".to_string()),
            token: Some("secret".to_string()),
        };
        assert_eq!(
            args.target().unwrap(),
            StoreTarget::Etapi {
                url: "http://localhost:8080".to_string(),
                token: "secret".to_string(),
            }
        );
    }

    #[test]
    fn test_demo_subcommands_parse() {
        let cli = Cli::try_parse_from(["wikilink", "demo", "--db", "x.db", "cleanup"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Demo {
                action: DemoAction::Cleanup,
                ..
            }
        ));
    }

    #[test]
    fn test_overrides_apply_on_top_of_config() {
        let mut config = ProcessorConfig::default();
        apply_run_overrides(
            &mut config,
            RunOverrides {
                dry_run: true,
                scope: Some("proj".to_string()),
                report_format: Some(FormatArg::Json),
                link_format: Some(LinkFormatArg::Markdown),
                no_report: true,
                verbose: true,
            },
        );

        assert!(config.dry_run);
        assert_eq!(config.scope_to_parent_note.as_deref(), Some("proj"));
        assert_eq!(config.report.format, ReportFormat::Json);
        assert_eq!(config.link_format, LinkFormat::Markdown);
        assert!(!config.report.generate);
        assert!(config.verbose_logging);
    }

    #[test]
    fn test_no_overrides_keep_config() {
        let mut config = ProcessorConfig::default();
        apply_run_overrides(&mut config, RunOverrides::default());
        assert_eq!(config, ProcessorConfig::default());
    }

    #[test]
    fn test_parse_file_outputs_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "See [[Timeline|Project Schedule]] and [[Technical Requirements#Security]]")
            .unwrap();

        let json = cmd_parse(file.path()).unwrap();
        let links: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(links.as_array().unwrap().len(), 2);
        assert_eq!(links[0]["title"], "Timeline");
        assert_eq!(links[0]["alias"], "Project Schedule");
        assert_eq!(links[1]["heading"], "Security");
        assert_eq!(links[0]["position"], 4);
    }

    #[test]
    fn test_parse_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = cmd_parse(&dir.path().join("absent.md")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
