use crate::config::Settings;
use crate::core::record::{
    BatchItemResult, ContentKind, ItemOutcome, PendingNote, ResolutionMethod,
};
use crate::core::redirect::RedirectResolver;
use crate::core::resolver::MetadataResolver;
use crate::core::template;
use crate::core::writer::{NoteWriter, WriteOutcome};
use crate::host::{Diagnostics, DuplicateChoice, ProgressSink};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Cooldown before a bulk retry of failed items re-enters the loop.
const RETRY_COOLDOWN: Duration = Duration::from_secs(2);

/// Headroom added on top of the configured per-URL timeout for the full
/// expand-resolve-write race.
const ITEM_TIMEOUT_HEADROOM: Duration = Duration::from_secs(5);

#[derive(Debug, Default)]
pub struct BatchReport {
    pub items: Vec<BatchItemResult>,
}

impl BatchReport {
    pub fn created(&self) -> usize {
        self.count(ItemOutcome::Created)
    }

    pub fn duplicates(&self) -> Vec<&BatchItemResult> {
        self.items
            .iter()
            .filter(|i| i.outcome == ItemOutcome::DuplicatePending)
            .collect()
    }

    pub fn failed_urls(&self) -> Vec<String> {
        self.items
            .iter()
            .filter(|i| i.outcome == ItemOutcome::Failed)
            .map(|i| i.url.clone())
            .collect()
    }

    pub fn fallbacks(&self) -> usize {
        self.items
            .iter()
            .filter(|i| i.resolution_method == Some(ResolutionMethod::Fallback))
            .count()
    }

    pub fn slideshows(&self) -> usize {
        self.items
            .iter()
            .filter(|i| i.content_kind == Some(ContentKind::Slideshow))
            .count()
    }

    pub fn skipped_private(&self) -> usize {
        self.count(ItemOutcome::SkippedPrivate)
    }

    fn count(&self, outcome: ItemOutcome) -> usize {
        self.items.iter().filter(|i| i.outcome == outcome).count()
    }

    /// True when any bucket warrants the interactive results review.
    pub fn needs_review(&self) -> bool {
        !self.duplicates().is_empty()
            || !self.failed_urls().is_empty()
            || self.fallbacks() > 0
            || self.slideshows() > 0
            || self.skipped_private() > 0
    }

    pub fn summary_text(&self) -> String {
        format!(
            "Processed {} URLs: {} created, {} duplicates, {} fallback, {} slideshows, {} private skipped, {} failed",
            self.items.len(),
            self.created(),
            self.duplicates().len(),
            self.fallbacks(),
            self.slideshows(),
            self.skipped_private(),
            self.failed_urls().len(),
        )
    }
}

/// Drives the expand-resolve-write pipeline over a FIFO worklist, one
/// item at a time, racing each item against a timeout and requeueing
/// timed-out items until the loop-prevention bound is hit.
pub struct BatchOrchestrator {
    redirect: RedirectResolver,
    resolver: MetadataResolver,
    writer: NoteWriter,
    settings: Settings,
    diagnostics: Arc<dyn Diagnostics>,
    progress: Arc<dyn ProgressSink>,
    item_timeout: Duration,
}

impl BatchOrchestrator {
    pub fn new(
        redirect: RedirectResolver,
        resolver: MetadataResolver,
        writer: NoteWriter,
        settings: Settings,
        diagnostics: Arc<dyn Diagnostics>,
        progress: Arc<dyn ProgressSink>,
    ) -> Self {
        let item_timeout =
            Duration::from_secs(settings.url_timeout_secs) + ITEM_TIMEOUT_HEADROOM;
        Self {
            redirect,
            resolver,
            writer,
            settings,
            diagnostics,
            progress,
            item_timeout,
        }
    }

    pub async fn run(&self, urls: Vec<String>) -> BatchReport {
        let requeue_limit = urls.len() * 2;
        let mut requeued = 0usize;
        let mut queue: VecDeque<String> = urls.into();
        let mut report = BatchReport::default();

        while let Some(url) = queue.pop_front() {
            let current = report.items.len() + 1;
            let total = current + queue.len();
            if self.settings.show_bulk_progress {
                self.progress
                    .update(current, total, &format!("Processing {}", url));
            }

            match tokio::time::timeout(self.item_timeout, self.process_one(&url)).await {
                Ok(result) => report.items.push(result),
                Err(_) if requeued < requeue_limit => {
                    requeued += 1;
                    warn!("Timed out, requeueing {}", url);
                    queue.push_back(url);
                }
                Err(_) => {
                    report
                        .items
                        .push(BatchItemResult::failed(url, "timed out"));
                }
            }
        }

        self.diagnostics.notify(&report.summary_text());
        report
    }

    /// Failures are converted to results at this boundary; nothing
    /// propagates out of the batch loop.
    async fn process_one(&self, url: &str) -> BatchItemResult {
        let canonical = self.redirect.expand(url).await;

        let Some(record) = self.resolver.resolve(url, &canonical).await else {
            return BatchItemResult::skipped_private(url);
        };

        let file_name = template::render_file_name(&self.settings.file_name_template, &record);
        let title = template::render_title(&self.settings.note_title_template, &record);
        let body = template::render_body(&record, &self.settings);

        match self.writer.write(&file_name, &title, &body, true).await {
            Ok(WriteOutcome::Created { .. }) => BatchItemResult {
                url: url.to_string(),
                outcome: ItemOutcome::Created,
                file_name: Some(file_name),
                note_title: Some(title),
                resolution_method: Some(record.resolution_method),
                content_kind: Some(record.content_kind),
                error: None,
                pending: None,
            },
            Ok(WriteOutcome::DuplicatePending { .. }) => BatchItemResult {
                url: url.to_string(),
                outcome: ItemOutcome::DuplicatePending,
                file_name: Some(file_name.clone()),
                note_title: Some(title.clone()),
                resolution_method: Some(record.resolution_method),
                content_kind: Some(record.content_kind),
                error: None,
                pending: Some(PendingNote {
                    file_name,
                    title,
                    body,
                }),
            },
            // Batch mode never prompts, so a skip cannot happen here.
            Ok(WriteOutcome::Skipped) => {
                BatchItemResult::failed(url, "unexpected interactive skip in batch mode")
            }
            Err(e) => BatchItemResult::failed(url, e.to_string()),
        }
    }

    /// Applies a post-run duplicate resolution using the note content
    /// retained on the result.
    pub async fn resolve_duplicate(
        &self,
        item: &BatchItemResult,
        choice: DuplicateChoice,
    ) -> anyhow::Result<WriteOutcome> {
        let Some(pending) = &item.pending else {
            anyhow::bail!("item has no pending note content: {}", item.url);
        };
        self.writer
            .apply_choice(&pending.file_name, &pending.body, choice)
            .await
    }

    /// Re-runs just the failed subset after a short cooldown.
    pub async fn retry_failed(&self, report: &BatchReport) -> BatchReport {
        let urls = report.failed_urls();
        tokio::time::sleep(RETRY_COOLDOWN).await;
        self.run(urls).await
    }
}
