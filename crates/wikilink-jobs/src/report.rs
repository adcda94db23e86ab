//! Run report: aggregation into a [`Report`] and rendering to HTML,
//! Markdown or JSON.
//!
//! Building and rendering are pure. The generation timestamp is an input so
//! the same results always render to the same text.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wikilink_core::defaults::REPORT_GENERATOR;
use wikilink_core::{LinkFormat, ProcessingResult, ProcessorConfig, ReportFormat, Result};

/// Sums over every processed note.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportTotals {
    pub notes_processed: usize,
    pub notes_with_wikilinks: usize,
    pub wikilinks_found: usize,
    pub wikilinks_processed: usize,
    pub links_created: usize,
    pub notes_created: usize,
    pub errors: usize,
}

impl ReportTotals {
    pub fn from_results(results: &[ProcessingResult]) -> Self {
        results.iter().fold(Self::default(), |mut t, r| {
            t.notes_processed += 1;
            if r.wikilinks_found > 0 {
                t.notes_with_wikilinks += 1;
            }
            t.wikilinks_found += r.wikilinks_found;
            t.wikilinks_processed += r.wikilinks_processed;
            t.links_created += r.links_created;
            t.notes_created += r.notes_created;
            t.errors += r.errors.len();
            t
        })
    }
}

/// One line of the per-note table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    pub note_id: String,
    pub note_title: String,
    pub wikilinks_found: usize,
    pub wikilinks_processed: usize,
    pub links_created: usize,
    pub notes_created: usize,
    pub processing_time_ms: u64,
    pub has_errors: bool,
}

/// One recorded error with its note context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportError {
    pub note_id: String,
    pub note_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wikilink: Option<String>,
    pub error: String,
}

/// Settings echoed in the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSettings {
    /// Heading of the rendered report; matches the report note title.
    pub report_title: String,
    pub fuzzy_search: bool,
    pub auto_create_orphaned_links: bool,
    pub min_match_score: f64,
    pub link_format: LinkFormat,
    pub batch_size: usize,
    pub dry_run: bool,
}

impl From<&ProcessorConfig> for ReportSettings {
    fn from(config: &ProcessorConfig) -> Self {
        Self {
            report_title: config.report.note_title.clone(),
            fuzzy_search: config.fuzzy_search,
            auto_create_orphaned_links: config.auto_create_orphaned_links,
            min_match_score: config.min_match_score,
            link_format: config.link_format,
            batch_size: config.batch_size,
            dry_run: config.dry_run,
        }
    }
}

/// Structured run report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub title: String,
    pub generated_at: DateTime<Utc>,
    pub execution_time_ms: u64,
    pub totals: ReportTotals,
    pub settings: ReportSettings,
    /// Notes with at least one wikilink, most wikilinks first.
    pub rows: Vec<ReportRow>,
    /// Every recorded error, in processing order.
    pub errors: Vec<ReportError>,
    pub generator: String,
}

impl Report {
    /// Aggregate per-note results. `generated_at` defaults to now.
    pub fn build(
        results: &[ProcessingResult],
        execution_time_ms: u64,
        settings: ReportSettings,
        generated_at: Option<DateTime<Utc>>,
    ) -> Self {
        let mut rows: Vec<ReportRow> = results
            .iter()
            .filter(|r| r.wikilinks_found > 0)
            .map(|r| ReportRow {
                note_id: r.note_id.clone(),
                note_title: r.note_title.clone(),
                wikilinks_found: r.wikilinks_found,
                wikilinks_processed: r.wikilinks_processed,
                links_created: r.links_created,
                notes_created: r.notes_created,
                processing_time_ms: r.processing_time_ms,
                has_errors: r.has_errors(),
            })
            .collect();
        // Stable, so equal counts keep processing order.
        rows.sort_by(|a, b| b.wikilinks_found.cmp(&a.wikilinks_found));

        let errors = results
            .iter()
            .flat_map(|r| {
                r.errors.iter().map(move |e| ReportError {
                    note_id: r.note_id.clone(),
                    note_title: r.note_title.clone(),
                    wikilink: e.wikilink.clone(),
                    error: e.error.clone(),
                })
            })
            .collect();

        Self {
            title: settings.report_title.clone(),
            generated_at: generated_at.unwrap_or_else(Utc::now),
            execution_time_ms,
            totals: ReportTotals::from_results(results),
            settings,
            rows,
            errors,
            generator: REPORT_GENERATOR.to_string(),
        }
    }

    /// Execution time in seconds with two decimals.
    pub fn execution_seconds(&self) -> String {
        format!("{:.2}", self.execution_time_ms as f64 / 1000.0)
    }

    /// The closing summary line.
    pub fn footer(&self) -> String {
        format!(
            "Total: {} wikilinks found, {} processed, {} notes created",
            self.totals.wikilinks_found, self.totals.wikilinks_processed, self.totals.notes_created
        )
    }
}

/// Render a report in the requested markup.
pub fn render(report: &Report, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Html => Ok(render_html(report)),
        ReportFormat::Markdown => Ok(render_markdown(report)),
        ReportFormat::Json => Ok(serde_json::to_string_pretty(report)?),
    }
}

fn enabled(flag: bool) -> &'static str {
    if flag {
        "Enabled"
    } else {
        "Disabled"
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

fn timestamp(report: &Report) -> String {
    report.generated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Escape text for HTML element content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const CARD: &str =
    "background: #2d2d2d; padding: 15px; border-radius: 6px; border: 1px solid #404040;";
const CELL: &str = "padding: 8px; border-bottom: 1px solid #404040;";

fn render_html(report: &Report) -> String {
    let t = &report.totals;
    let s = &report.settings;
    let mut html = String::new();

    let _ = write!(
        html,
        "<div style=\"font-family: system-ui, sans-serif; padding: 20px; background: #1e1e1e; color: #d4d4d4;\">\n\
         <h1 style=\"color: #61afef;\">{}</h1>\n\
         <p style=\"color: #abb2bf;\">Generated on {} &bull; Execution time: {}s</p>\n",
        escape_html(&report.title),
        timestamp(report),
        report.execution_seconds()
    );

    html.push_str("<div style=\"display: grid; grid-template-columns: repeat(auto-fit, minmax(200px, 1fr)); gap: 15px;\">\n");
    for (value, label, color) in [
        (t.notes_processed, "Notes Processed", "#61afef"),
        (t.notes_with_wikilinks, "Notes with Wikilinks", "#98c379"),
        (t.wikilinks_processed, "Wikilinks Processed", "#e5c07b"),
        (t.notes_created, "New Notes Created", "#c678dd"),
        (t.errors, "Errors", "#e06c75"),
    ] {
        let _ = writeln!(
            html,
            "<div style=\"{CARD} text-align: center;\"><div style=\"font-size: 24px; font-weight: bold; color: {color};\">{value}</div><div style=\"font-size: 12px;\">{label}</div></div>"
        );
    }
    html.push_str("</div>\n");

    let _ = write!(
        html,
        "<div style=\"{CARD} margin-top: 20px; font-size: 12px;\">\n<h3>Configuration</h3>\n<ul>\n\
         <li><strong>Fuzzy Search:</strong> {}</li>\n\
         <li><strong>Auto-create Orphaned:</strong> {}</li>\n\
         <li><strong>Min Match Score:</strong> {}</li>\n\
         <li><strong>Link Format:</strong> {}</li>\n\
         <li><strong>Batch Size:</strong> {}</li>\n\
         <li><strong>Dry Run:</strong> {}</li>\n</ul>\n</div>\n",
        enabled(s.fuzzy_search),
        enabled(s.auto_create_orphaned_links),
        s.min_match_score,
        s.link_format,
        s.batch_size,
        yes_no(s.dry_run)
    );

    if !report.rows.is_empty() {
        let _ = write!(
            html,
            "<div style=\"{CARD} margin-top: 20px;\">\n<h3>Detailed Results</h3>\n\
             <table style=\"width: 100%; border-collapse: collapse; font-size: 12px;\">\n\
             <thead><tr><th style=\"{CELL} text-align: left;\">Note</th><th style=\"{CELL}\">Wikilinks Found</th>\
             <th style=\"{CELL}\">Processed</th><th style=\"{CELL}\">Links Created</th>\
             <th style=\"{CELL}\">Notes Created</th><th style=\"{CELL}\">Time (ms)</th></tr></thead>\n<tbody>\n"
        );
        for row in &report.rows {
            let background = if row.has_errors { "#3f2d2d" } else { "#2a3f2f" };
            let _ = writeln!(
                html,
                "<tr style=\"background: {background};\">\
                 <td style=\"{CELL}\"><a href=\"#root/{}\">{}</a></td>\
                 <td style=\"{CELL} text-align: center;\">{}</td>\
                 <td style=\"{CELL} text-align: center;\">{}</td>\
                 <td style=\"{CELL} text-align: center;\">{}</td>\
                 <td style=\"{CELL} text-align: center;\">{}</td>\
                 <td style=\"{CELL} text-align: center;\">{}</td></tr>",
                escape_html(&row.note_id),
                escape_html(&row.note_title),
                row.wikilinks_found,
                row.wikilinks_processed,
                row.links_created,
                row.notes_created,
                row.processing_time_ms
            );
        }
        html.push_str("</tbody>\n</table>\n</div>\n");
    }

    if !report.errors.is_empty() {
        let _ = writeln!(
            html,
            "<div style=\"background: #3f2d2d; padding: 15px; border-radius: 6px; margin-top: 20px;\">\n\
             <h3 style=\"color: #e06c75;\">Errors ({})</h3>\n<ul>",
            report.errors.len()
        );
        for error in &report.errors {
            let link = error
                .wikilink
                .as_deref()
                .map(|w| format!("<code>{}</code>: ", escape_html(w)))
                .unwrap_or_default();
            let _ = writeln!(
                html,
                "<li><strong>{}</strong> &bull; {}{}</li>",
                escape_html(&error.note_title),
                link,
                escape_html(&error.error)
            );
        }
        html.push_str("</ul>\n</div>\n");
    }

    let _ = write!(
        html,
        "<div style=\"{CARD} margin-top: 20px; text-align: center; font-size: 12px; color: #5c6370;\">\
         Generated by <strong>{}</strong> &bull; {}</div>\n</div>\n",
        escape_html(&report.generator),
        report.footer()
    );

    html
}

/// Escape `|` so note titles do not break table cells.
fn md_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

fn render_markdown(report: &Report) -> String {
    let t = &report.totals;
    let s = &report.settings;
    let mut md = String::new();

    let _ = writeln!(md, "# {}\n", report.title);
    let _ = writeln!(
        md,
        "Generated on {} • Execution time: {}s\n",
        timestamp(report),
        report.execution_seconds()
    );

    md.push_str("## Summary\n\n");
    let _ = writeln!(md, "- Notes processed: {}", t.notes_processed);
    let _ = writeln!(md, "- Notes with wikilinks: {}", t.notes_with_wikilinks);
    let _ = writeln!(md, "- Wikilinks found: {}", t.wikilinks_found);
    let _ = writeln!(md, "- Wikilinks processed: {}", t.wikilinks_processed);
    let _ = writeln!(md, "- Links created: {}", t.links_created);
    let _ = writeln!(md, "- Notes created: {}", t.notes_created);
    let _ = writeln!(md, "- Errors: {}\n", t.errors);

    md.push_str("## Configuration\n\n");
    let _ = writeln!(md, "- Fuzzy search: {}", enabled(s.fuzzy_search));
    let _ = writeln!(md, "- Auto-create orphaned: {}", enabled(s.auto_create_orphaned_links));
    let _ = writeln!(md, "- Min match score: {}", s.min_match_score);
    let _ = writeln!(md, "- Link format: {}", s.link_format);
    let _ = writeln!(md, "- Batch size: {}", s.batch_size);
    let _ = writeln!(md, "- Dry run: {}\n", yes_no(s.dry_run));

    if !report.rows.is_empty() {
        md.push_str("## Detailed Results\n\n");
        md.push_str("| Note | Wikilinks Found | Processed | Links Created | Notes Created | Time (ms) |\n");
        md.push_str("|------|-----------------|-----------|---------------|---------------|-----------|\n");
        for row in &report.rows {
            let _ = writeln!(
                md,
                "| {} | {} | {} | {} | {} | {} |",
                md_cell(&row.note_title),
                row.wikilinks_found,
                row.wikilinks_processed,
                row.links_created,
                row.notes_created,
                row.processing_time_ms
            );
        }
        md.push('\n');
    }

    if !report.errors.is_empty() {
        let _ = writeln!(md, "## Errors ({})\n", report.errors.len());
        for error in &report.errors {
            match &error.wikilink {
                Some(link) => {
                    let _ = writeln!(md, "- **{}**: `{}`: {}", error.note_title, link, error.error);
                }
                None => {
                    let _ = writeln!(md, "- **{}**: {}", error.note_title, error.error);
                }
            }
        }
        md.push('\n');
    }

    let _ = writeln!(md, "---\n\nGenerated by {} • {}", report.generator, report.footer());
    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use wikilink_core::LinkError;

    fn result(id: &str, title: &str, found: usize, processed: usize) -> ProcessingResult {
        ProcessingResult {
            note_id: id.to_string(),
            note_title: title.to_string(),
            wikilinks_found: found,
            wikilinks_processed: processed,
            links_created: processed,
            notes_created: 0,
            errors: Vec::new(),
            processing_time_ms: 3,
        }
    }

    fn sample() -> Vec<ProcessingResult> {
        let mut failing = result("n3", "Broken <Note>", 2, 1);
        failing.errors.push(LinkError {
            wikilink: Some("[[Missing]]".to_string()),
            error: "Resolution error: No matching note found for wikilink: [[Missing]]".to_string(),
        });
        failing.notes_created = 1;
        let mut unreadable = result("n4", "", 0, 0);
        unreadable.errors.push(LinkError::for_note("Note access error: Note not found: n4"));
        vec![
            result("n1", "Small", 1, 1),
            result("n2", "Empty", 0, 0),
            failing,
            result("n5", "Large", 5, 5),
            unreadable,
        ]
    }

    fn settings() -> ReportSettings {
        ReportSettings::from(&ProcessorConfig::default())
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_totals_are_sums() {
        let results = sample();
        let report = Report::build(&results, 1234, settings(), Some(at()));
        let found: usize = results.iter().map(|r| r.wikilinks_found).sum();
        let errors: usize = results.iter().map(|r| r.errors.len()).sum();
        assert_eq!(report.totals.wikilinks_found, found);
        assert_eq!(report.totals.errors, errors);
        assert_eq!(report.totals.notes_processed, 5);
        assert_eq!(report.totals.notes_with_wikilinks, 3);
        assert_eq!(report.totals.notes_created, 1);
        assert_eq!(report.errors.len(), errors);
    }

    #[test]
    fn test_rows_sorted_by_found_and_skip_empty_notes() {
        let report = Report::build(&sample(), 0, settings(), Some(at()));
        let ids: Vec<&str> = report.rows.iter().map(|r| r.note_id.as_str()).collect();
        assert_eq!(ids, vec!["n5", "n3", "n1"]);
        assert!(report.rows[1].has_errors);
    }

    #[test]
    fn test_heading_uses_configured_title() {
        let mut config = ProcessorConfig::default();
        config.report.note_title = "Link Audit".to_string();
        let report = Report::build(&sample(), 0, ReportSettings::from(&config), Some(at()));
        assert_eq!(report.title, "Link Audit");
        let md = render(&report, ReportFormat::Markdown).unwrap();
        assert!(md.starts_with("# Link Audit\n"));
    }

    #[test]
    fn test_footer_line() {
        let report = Report::build(&sample(), 0, settings(), Some(at()));
        assert_eq!(
            report.footer(),
            "Total: 8 wikilinks found, 7 processed, 1 notes created"
        );
    }

    #[test]
    fn test_render_is_idempotent() {
        let report = Report::build(&sample(), 1500, settings(), Some(at()));
        for format in [ReportFormat::Html, ReportFormat::Markdown, ReportFormat::Json] {
            assert_eq!(
                render(&report, format).unwrap(),
                render(&report, format).unwrap()
            );
        }
    }

    #[test]
    fn test_html_escapes_note_text() {
        let report = Report::build(&sample(), 1500, settings(), Some(at()));
        let html = render(&report, ReportFormat::Html).unwrap();
        assert!(html.contains("Broken &lt;Note&gt;"));
        assert!(!html.contains("Broken <Note>"));
        assert!(html.contains("<code>[[Missing]]</code>"));
        assert!(html.contains("Execution time: 1.50s"));
        assert!(html.contains(&report.footer()));
    }

    #[test]
    fn test_markdown_lists_every_error() {
        let report = Report::build(&sample(), 0, settings(), Some(at()));
        let md = render(&report, ReportFormat::Markdown).unwrap();
        assert!(md.contains("## Errors (2)"));
        assert!(md.contains("`[[Missing]]`"));
        assert!(md.contains("Note access error: Note not found: n4"));
        assert!(md.starts_with("# Wikilink Processing Report\n"));
    }

    #[test]
    fn test_json_roundtrips() {
        let report = Report::build(&sample(), 0, settings(), Some(at()));
        let json = render(&report, ReportFormat::Json).unwrap();
        let back: Report = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn test_empty_results() {
        let report = Report::build(&[], 0, settings(), Some(at()));
        assert_eq!(report.totals, ReportTotals::default());
        let html = render(&report, ReportFormat::Html).unwrap();
        assert!(!html.contains("Detailed Results"));
        assert!(!html.contains("Errors ("));
    }
}
