//! Processor configuration.
//!
//! A [`ProcessorConfig`] is built once per run (defaults, then environment,
//! then caller overrides), validated with [`ProcessorConfig::validate`] and
//! passed by reference to every component afterwards.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::error::{Error, Result};

/// Output syntax for rewritten links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkFormat {
    /// Native reference: `~noteId`.
    #[default]
    Internal,
    /// Display form: `[alias or title](~noteId)`.
    Markdown,
}

impl LinkFormat {
    /// Parse from a string, accepting common aliases.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "internal" | "native" | "reference" => Some(Self::Internal),
            "markdown" | "md" | "display" => Some(Self::Markdown),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::Markdown => "markdown",
        }
    }
}

impl fmt::Display for LinkFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Markup used for the rendered report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Html,
    Markdown,
    Json,
}

impl ReportFormat {
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "html" => Some(Self::Html),
            "markdown" | "md" => Some(Self::Markdown),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Markdown => "markdown",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Report note settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Publish a report note after the run.
    pub generate: bool,
    pub note_title: String,
    pub note_parent: String,
    /// Label identifying an existing report note to update in place.
    pub note_label: String,
    pub format: ReportFormat,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            generate: true,
            note_title: defaults::REPORT_NOTE_TITLE.to_string(),
            note_parent: defaults::REPORT_NOTE_PARENT.to_string(),
            note_label: defaults::REPORT_NOTE_LABEL.to_string(),
            format: ReportFormat::Html,
        }
    }
}

/// Configuration for one processing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessorConfig {
    pub enabled: bool,

    // Scope
    /// Limit processing to the subtree under this note.
    pub scope_to_parent_note: Option<String>,
    pub exclude_system_notes: bool,
    pub exclude_note_ids: Vec<String>,

    // Resolution
    pub fuzzy_search: bool,
    pub case_sensitive: bool,
    /// Minimum similarity for fuzzy candidates, in `[0, 1]`.
    pub min_match_score: f64,
    pub max_search_results: usize,

    // Note creation
    pub auto_create_orphaned_links: bool,
    pub default_parent_for_new_notes: String,
    pub default_template_for_new_notes: Option<String>,

    // Rewriting
    /// Keep the original token in an HTML comment after the replacement.
    pub preserve_original_text: bool,
    pub link_format: LinkFormat,

    // Performance
    pub batch_size: usize,
    pub max_notes_per_run: usize,
    pub query_timeout_ms: u64,
    pub batch_pause_ms: u64,

    // Diagnostics
    pub verbose_logging: bool,
    /// Resolve everything but never write note content.
    pub dry_run: bool,

    pub report: ReportConfig,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            scope_to_parent_note: None,
            exclude_system_notes: true,
            exclude_note_ids: Vec::new(),
            fuzzy_search: true,
            case_sensitive: false,
            min_match_score: defaults::MIN_MATCH_SCORE,
            max_search_results: defaults::MAX_SEARCH_RESULTS,
            auto_create_orphaned_links: true,
            default_parent_for_new_notes: defaults::DEFAULT_PARENT_NOTE.to_string(),
            default_template_for_new_notes: None,
            preserve_original_text: true,
            link_format: LinkFormat::Internal,
            batch_size: defaults::BATCH_SIZE,
            max_notes_per_run: defaults::MAX_NOTES_PER_RUN,
            query_timeout_ms: defaults::QUERY_TIMEOUT_MS,
            batch_pause_ms: defaults::BATCH_PAUSE_MS,
            verbose_logging: false,
            dry_run: false,
            report: ReportConfig::default(),
        }
    }
}

impl ProcessorConfig {
    /// Load configuration from environment variables with fallback to defaults.
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `WIKILINK_ENABLED` | `true` | Enable/disable processing |
    /// | `WIKILINK_SCOPE_NOTE` | unset | Limit processing to this subtree |
    /// | `WIKILINK_EXCLUDE_SYSTEM` | `true` | Skip `_`-prefixed system notes |
    /// | `WIKILINK_EXCLUDE_IDS` | empty | Comma-separated note ids to skip |
    /// | `WIKILINK_FUZZY` | `true` | Enable fuzzy title matching |
    /// | `WIKILINK_CASE_SENSITIVE` | `false` | Case-sensitive title matching |
    /// | `WIKILINK_MIN_SCORE` | `0.6` | Minimum fuzzy similarity |
    /// | `WIKILINK_MAX_RESULTS` | `5` | Fuzzy candidates considered |
    /// | `WIKILINK_AUTO_CREATE` | `true` | Create notes for orphaned links |
    /// | `WIKILINK_DEFAULT_PARENT` | `root` | Parent of created notes |
    /// | `WIKILINK_TEMPLATE` | unset | Template note id for created notes |
    /// | `WIKILINK_PRESERVE_ORIGINAL` | `true` | Keep original token as a comment |
    /// | `WIKILINK_LINK_FORMAT` | `internal` | `internal` or `markdown` |
    /// | `WIKILINK_BATCH_SIZE` | `50` | Notes per batch |
    /// | `WIKILINK_MAX_NOTES` | `1000` | Notes per run |
    /// | `WIKILINK_QUERY_TIMEOUT_MS` | `30000` | Store query timeout |
    /// | `WIKILINK_BATCH_PAUSE_MS` | `100` | Pause between batches |
    /// | `WIKILINK_VERBOSE` | `false` | Log every resolution decision at info |
    /// | `WIKILINK_DRY_RUN` | `false` | Never write note content |
    /// | `WIKILINK_REPORT` | `true` | Publish a report note |
    /// | `WIKILINK_REPORT_TITLE` | `Wikilink Processing Report` | Report note title |
    /// | `WIKILINK_REPORT_PARENT` | `root` | Report note parent |
    /// | `WIKILINK_REPORT_LABEL` | `wikilinkReport` | Report note label |
    /// | `WIKILINK_REPORT_FORMAT` | `html` | `html`, `markdown` or `json` |
    ///
    /// Unparseable values are logged and ignored; range checks happen in
    /// [`validate`](Self::validate).
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(v) = env_bool("WIKILINK_ENABLED") {
            config.enabled = v;
        }
        if let Ok(v) = std::env::var("WIKILINK_SCOPE_NOTE") {
            let v = v.trim();
            config.scope_to_parent_note = (!v.is_empty()).then(|| v.to_string());
        }
        if let Some(v) = env_bool("WIKILINK_EXCLUDE_SYSTEM") {
            config.exclude_system_notes = v;
        }
        if let Ok(v) = std::env::var("WIKILINK_EXCLUDE_IDS") {
            config.exclude_note_ids = split_list(&v);
        }
        if let Some(v) = env_bool("WIKILINK_FUZZY") {
            config.fuzzy_search = v;
        }
        if let Some(v) = env_bool("WIKILINK_CASE_SENSITIVE") {
            config.case_sensitive = v;
        }
        if let Some(v) = env_parse::<f64>("WIKILINK_MIN_SCORE") {
            config.min_match_score = v;
        }
        if let Some(v) = env_parse::<usize>("WIKILINK_MAX_RESULTS") {
            config.max_search_results = v;
        }
        if let Some(v) = env_bool("WIKILINK_AUTO_CREATE") {
            config.auto_create_orphaned_links = v;
        }
        if let Ok(v) = std::env::var("WIKILINK_DEFAULT_PARENT") {
            config.default_parent_for_new_notes = v.trim().to_string();
        }
        if let Ok(v) = std::env::var("WIKILINK_TEMPLATE") {
            let v = v.trim();
            config.default_template_for_new_notes = (!v.is_empty()).then(|| v.to_string());
        }
        if let Some(v) = env_bool("WIKILINK_PRESERVE_ORIGINAL") {
            config.preserve_original_text = v;
        }
        if let Ok(val) = std::env::var("WIKILINK_LINK_FORMAT") {
            match LinkFormat::from_str_loose(&val) {
                Some(format) => config.link_format = format,
                None => {
                    tracing::warn!(value = %val, "Invalid WIKILINK_LINK_FORMAT, using default")
                }
            }
        }
        if let Some(v) = env_parse::<usize>("WIKILINK_BATCH_SIZE") {
            config.batch_size = v;
        }
        if let Some(v) = env_parse::<usize>("WIKILINK_MAX_NOTES") {
            config.max_notes_per_run = v;
        }
        if let Some(v) = env_parse::<u64>("WIKILINK_QUERY_TIMEOUT_MS") {
            config.query_timeout_ms = v;
        }
        if let Some(v) = env_parse::<u64>("WIKILINK_BATCH_PAUSE_MS") {
            config.batch_pause_ms = v;
        }
        if let Some(v) = env_bool("WIKILINK_VERBOSE") {
            config.verbose_logging = v;
        }
        if let Some(v) = env_bool("WIKILINK_DRY_RUN") {
            config.dry_run = v;
        }
        if let Some(v) = env_bool("WIKILINK_REPORT") {
            config.report.generate = v;
        }
        if let Ok(v) = std::env::var("WIKILINK_REPORT_TITLE") {
            config.report.note_title = v;
        }
        if let Ok(v) = std::env::var("WIKILINK_REPORT_PARENT") {
            config.report.note_parent = v.trim().to_string();
        }
        if let Ok(v) = std::env::var("WIKILINK_REPORT_LABEL") {
            config.report.note_label = v.trim().to_string();
        }
        if let Ok(val) = std::env::var("WIKILINK_REPORT_FORMAT") {
            match ReportFormat::from_str_loose(&val) {
                Some(format) => config.report.format = format,
                None => {
                    tracing::warn!(value = %val, "Invalid WIKILINK_REPORT_FORMAT, using default")
                }
            }
        }

        config
    }

    /// Check every value that would make a run meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size < 1 || self.batch_size > defaults::BATCH_SIZE_MAX {
            return Err(Error::ConfigValidation(format!(
                "batch_size must be between 1 and {}",
                defaults::BATCH_SIZE_MAX
            )));
        }
        if !(0.0..=1.0).contains(&self.min_match_score) {
            return Err(Error::ConfigValidation(
                "min_match_score must be between 0.0 and 1.0".to_string(),
            ));
        }
        if self.max_notes_per_run < 1 {
            return Err(Error::ConfigValidation(
                "max_notes_per_run must be at least 1".to_string(),
            ));
        }
        if self.max_search_results < 1 {
            return Err(Error::ConfigValidation(
                "max_search_results must be at least 1".to_string(),
            ));
        }
        if self.default_parent_for_new_notes.trim().is_empty() {
            return Err(Error::ConfigValidation(
                "default_parent_for_new_notes must not be empty".to_string(),
            ));
        }
        if self.report.generate && self.report.note_label.trim().is_empty() {
            return Err(Error::ConfigValidation(
                "report note label must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    pub fn batch_pause(&self) -> Duration {
        Duration::from_millis(self.batch_pause_ms)
    }

    /// Apply the configured case rule to a title before comparison.
    pub fn normalize_title(&self, title: &str) -> String {
        if self.case_sensitive {
            title.to_string()
        } else {
            title.to_lowercase()
        }
    }

    /// Set dry-run mode.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Set the link output format.
    pub fn with_link_format(mut self, format: LinkFormat) -> Self {
        self.link_format = format;
        self
    }

    /// Limit processing to a subtree.
    pub fn with_scope(mut self, root: impl Into<String>) -> Self {
        self.scope_to_parent_note = Some(root.into());
        self
    }
}

fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .map(|v| !matches!(v.trim().to_lowercase().as_str(), "false" | "0" | "no" | "off"))
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let val = std::env::var(key).ok()?;
    match val.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %val, "Invalid numeric setting, using default");
            None
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
