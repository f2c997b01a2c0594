use crate::config::Settings;
use crate::core::batch::{BatchOrchestrator, BatchReport};
use crate::core::discover::UrlDiscovery;
use crate::core::record::ItemOutcome;
use crate::core::redirect::RedirectResolver;
use crate::core::resolver::MetadataResolver;
use crate::core::template;
use crate::core::writer::{NoteWriter, WriteOutcome};
use crate::host::{
    self, ClipboardSource, ConsoleDiagnostics, Diagnostics, DuplicatePrompt, HttpClient,
    LocalFileStore, ProgressSink, ReqwestClient, StdinClipboard, TerminalPicker, TerminalProgress,
    TerminalPrompt, UrlPicker,
};
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

#[derive(Parser)]
#[command(name = "toknote")]
#[command(about = "Turn TikTok links from pasted text into Markdown notes")]
#[command(version)]
pub struct Cli {
    /// Text to scan for TikTok URLs (reads piped stdin when omitted)
    #[arg(value_name = "TEXT")]
    pub text: Option<String>,

    /// Settings file
    #[arg(short, long, default_value = "toknote.toml")]
    pub config: PathBuf,

    /// Directory the output folder lives under
    #[arg(short, long, default_value = ".")]
    pub root: PathBuf,

    /// Process every discovered URL without the selection prompt
    #[arg(short, long)]
    pub all: bool,

    /// Write the merged settings back to the settings file and exit
    #[arg(long)]
    pub save_config: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub async fn run(&self) -> Result<()> {
        let settings = Settings::load(&self.config)?;

        if self.save_config {
            settings.save(&self.config)?;
            println!("Settings written to {}", self.config.display());
            return Ok(());
        }

        if self.verbose {
            println!("Verbose mode enabled");
        }

        let diagnostics: Arc<dyn Diagnostics> = Arc::new(ConsoleDiagnostics);

        let text = match &self.text {
            Some(text) => text.clone(),
            None => match StdinClipboard.read_text().await {
                Ok(text) => text,
                Err(e) => {
                    diagnostics.notify("Could not read input text.");
                    error!("Input read failed: {}", e);
                    return Ok(());
                }
            },
        };

        let urls = UrlDiscovery::new().discover(&text);
        if urls.is_empty() {
            diagnostics.notify("No TikTok URLs found in the input text.");
            return Ok(());
        }

        let http: Arc<dyn HttpClient> = Arc::new(ReqwestClient::new());
        let timeout = Duration::from_secs(settings.url_timeout_secs);
        let redirect = RedirectResolver::new(http.clone(), timeout);
        let resolver =
            MetadataResolver::new(http.clone(), settings.private_video_policy, timeout);
        let store = Arc::new(LocalFileStore::new(&self.root));
        let prompt: Arc<dyn DuplicatePrompt> = Arc::new(TerminalPrompt);
        let writer = NoteWriter::new(store, prompt.clone(), settings.output_folder.clone());

        if urls.len() == 1 && settings.bypass_picker_for_single {
            return self
                .run_single(&urls[0], &redirect, &resolver, &writer, &settings, &diagnostics)
                .await;
        }

        if !settings.bulk_enabled {
            if urls.len() > 1 {
                diagnostics.notify("Bulk processing is disabled; processing the first URL only.");
            }
            return self
                .run_single(&urls[0], &redirect, &resolver, &writer, &settings, &diagnostics)
                .await;
        }

        let selected = if self.all {
            urls.clone()
        } else {
            TerminalPicker.pick(&urls).await?
        };

        if selected.len() == 1 {
            return self
                .run_single(
                    &selected[0],
                    &redirect,
                    &resolver,
                    &writer,
                    &settings,
                    &diagnostics,
                )
                .await;
        }

        let progress: Arc<dyn ProgressSink> = Arc::new(TerminalProgress);
        let orchestrator = BatchOrchestrator::new(
            redirect,
            resolver,
            writer,
            settings,
            diagnostics.clone(),
            progress,
        );
        let report = orchestrator.run(selected).await;
        self.review(&orchestrator, report, &prompt, &diagnostics)
            .await
    }

    /// Single-item flow. Terminal failures become one user-visible notice
    /// plus one diagnostic log entry; they never bubble further.
    async fn run_single(
        &self,
        url: &str,
        redirect: &RedirectResolver,
        resolver: &MetadataResolver,
        writer: &NoteWriter,
        settings: &Settings,
        diagnostics: &Arc<dyn Diagnostics>,
    ) -> Result<()> {
        let canonical = redirect.expand(url).await;

        let Some(record) = resolver.resolve(url, &canonical).await else {
            diagnostics.notify(&format!("Skipped private video: {}", url));
            return Ok(());
        };

        let file_name = template::render_file_name(&settings.file_name_template, &record);
        let title = template::render_title(&settings.note_title_template, &record);
        let body = template::render_body(&record, settings);

        match writer.write(&file_name, &title, &body, false).await {
            Ok(WriteOutcome::Created { path }) => {
                diagnostics.notify(&format!("Created note: {}", path));
            }
            Ok(WriteOutcome::Skipped) => {
                diagnostics.notify(&format!("Skipped existing note: {}", file_name));
            }
            // Single mode resolves collisions through the prompt, so a
            // pending duplicate cannot come back here.
            Ok(WriteOutcome::DuplicatePending { .. }) => {}
            Err(e) => {
                diagnostics.notify(&format!("Could not create note for {}: {}", url, e));
                error!("Note creation failed for {}: {}", url, e);
            }
        }

        Ok(())
    }

    /// Post-run results surface: per-item duplicate resolution plus a bulk
    /// retry of the failed subset.
    async fn review(
        &self,
        orchestrator: &BatchOrchestrator,
        report: BatchReport,
        prompt: &Arc<dyn DuplicatePrompt>,
        diagnostics: &Arc<dyn Diagnostics>,
    ) -> Result<()> {
        let mut report = report;

        for item in &report.items {
            match item.outcome {
                ItemOutcome::SkippedPrivate => {
                    diagnostics.notify(&format!("Skipped private: {}", item.url));
                }
                ItemOutcome::Failed => {
                    diagnostics.notify(&format!(
                        "Failed: {} ({})",
                        item.url,
                        item.error.as_deref().unwrap_or("unknown error")
                    ));
                }
                _ => {}
            }
        }

        loop {
            if !report.needs_review() {
                return Ok(());
            }

            for item in report.duplicates() {
                let file_name = item.file_name.as_deref().unwrap_or(item.url.as_str());
                let choice = prompt.ask(file_name).await?;
                match orchestrator.resolve_duplicate(item, choice).await {
                    Ok(WriteOutcome::Created { path }) => {
                        diagnostics.notify(&format!("Created note: {}", path));
                    }
                    Ok(_) => {}
                    Err(e) => {
                        diagnostics
                            .notify(&format!("Could not resolve duplicate for {}: {}", item.url, e));
                        error!("Duplicate resolution failed for {}: {}", item.url, e);
                    }
                }
            }

            let failed = report.failed_urls();
            if failed.is_empty() {
                return Ok(());
            }
            if !host::confirm(&format!("Retry {} failed URLs?", failed.len())).await? {
                return Ok(());
            }
            report = orchestrator.retry_failed(&report).await;
        }
    }
}
