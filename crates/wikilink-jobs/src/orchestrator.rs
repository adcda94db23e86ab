//! Batch orchestration of a processing run.

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

use wikilink_core::{CandidateQuery, Error, NoteStore, ProcessingResult, ProcessorConfig, Result};

use crate::processor::process_note;
use crate::publish::publish_report;
use crate::report::{render, Report, ReportSettings, ReportTotals};

/// What a run produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunOutcome {
    /// Per-note results in batch order.
    pub results: Vec<ProcessingResult>,
    pub execution_time_ms: u64,
    /// Id of the report note when one was published.
    pub report_note_id: Option<String>,
}

impl RunOutcome {
    /// Build the structured report for this outcome.
    pub fn report(&self, config: &ProcessorConfig) -> Report {
        Report::build(
            &self.results,
            self.execution_time_ms,
            ReportSettings::from(config),
            None,
        )
    }

    pub fn total_errors(&self) -> usize {
        self.results.iter().map(|r| r.errors.len()).sum()
    }
}

/// Runs the wikilink processor over a note store.
pub struct WikilinkProcessor {
    store: Arc<dyn NoteStore>,
    config: ProcessorConfig,
}

impl WikilinkProcessor {
    /// Create a processor; fails when the configuration is invalid.
    pub fn new(store: Arc<dyn NoteStore>, config: ProcessorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { store, config })
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Ids of the notes this run will process, most recently modified first.
    pub async fn select_candidates(&self) -> Result<Vec<String>> {
        let failed = |e: Error| Error::Run(format!("Failed to get candidate notes: {e}"));

        if let Some(root) = &self.config.scope_to_parent_note {
            debug!(scope_root = %root, "Scoped candidate selection");
        }

        let mut exclude_ids = self.config.exclude_note_ids.clone();
        // Error rows quote raw wikilinks; the report note must not be rewritten.
        if let Some(report) = self
            .store
            .find_note_with_label(&self.config.report.note_label)
            .await
            .map_err(failed)?
        {
            exclude_ids.push(report.note_id);
        }

        let query = CandidateQuery {
            scope_root: self.config.scope_to_parent_note.clone(),
            exclude_system: self.config.exclude_system_notes,
            exclude_ids,
            limit: self.config.max_notes_per_run,
            order_by_recency: true,
        };

        self.store
            .query_candidate_note_ids(&query)
            .await
            .map_err(failed)
    }

    /// Process notes in batches. Notes of one batch run concurrently; every
    /// note settles before the next batch starts.
    pub async fn process_batches(&self, note_ids: &[String]) -> Vec<ProcessingResult> {
        let mut results = Vec::with_capacity(note_ids.len());
        let batch_count = note_ids.len().div_ceil(self.config.batch_size);

        for (index, batch) in note_ids.chunks(self.config.batch_size).enumerate() {
            let started = Instant::now();
            let store = self.store.as_ref();
            let batch_results =
                join_all(batch.iter().map(|id| process_note(store, &self.config, id))).await;

            if self.config.verbose_logging {
                info!(
                    batch = index + 1,
                    batch_count,
                    notes = batch.len(),
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Batch processed"
                );
            } else {
                debug!(
                    batch = index + 1,
                    batch_count,
                    notes = batch.len(),
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Batch processed"
                );
            }

            results.extend(batch_results);

            if index + 1 < batch_count {
                sleep(self.config.batch_pause()).await;
            }
        }

        results
    }

    /// Run the processor end to end.
    #[instrument(skip(self), fields(subsystem = "jobs", component = "orchestrator", dry_run = self.config.dry_run))]
    pub async fn run(&self) -> Result<RunOutcome> {
        let start = Instant::now();

        if !self.config.enabled {
            info!("Wikilink processor is disabled in configuration");
            return Ok(RunOutcome::default());
        }
        if self.config.dry_run {
            info!("Dry run, note content will not be modified");
        }

        let candidates = self.select_candidates().await?;
        info!(
            result_count = candidates.len(),
            "Found candidate notes to process"
        );
        if candidates.is_empty() {
            return Ok(RunOutcome {
                execution_time_ms: start.elapsed().as_millis() as u64,
                ..Default::default()
            });
        }

        let results = self.process_batches(&candidates).await;
        let mut outcome = RunOutcome {
            results,
            execution_time_ms: start.elapsed().as_millis() as u64,
            report_note_id: None,
        };

        if self.config.report.generate {
            if self.config.dry_run {
                info!("Dry run, report note not written");
            } else {
                outcome.report_note_id = self.publish(&outcome).await;
            }
        }

        let totals = ReportTotals::from_results(&outcome.results);
        info!(
            duration_ms = outcome.execution_time_ms,
            notes = totals.notes_processed,
            wikilinks_found = totals.wikilinks_found,
            wikilinks_processed = totals.wikilinks_processed,
            notes_created = totals.notes_created,
            errors = totals.errors,
            "Processing completed"
        );
        if totals.errors > 0 {
            warn!(
                errors = totals.errors,
                "Completed with errors, see the report for details"
            );
        }

        Ok(outcome)
    }

    /// Render and store the report note. Failures are logged, never raised.
    async fn publish(&self, outcome: &RunOutcome) -> Option<String> {
        let report = outcome.report(&self.config);
        let content = match render(&report, self.config.report.format) {
            Ok(content) => content,
            Err(e) => {
                warn!(error = %e, "Failed to render report");
                return None;
            }
        };

        match publish_report(self.store.as_ref(), &self.config.report, &content).await {
            Ok(note_id) => Some(note_id),
            Err(e) => {
                warn!(error = %e, "Failed to create or update report note");
                None
            }
        }
    }
}
