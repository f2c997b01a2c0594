use crate::host::{DuplicateChoice, DuplicatePrompt, FileStore};
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Created { path: String },
    /// Batch mode never prompts; collisions are reported for later
    /// resolution instead.
    DuplicatePending { path: String },
    Skipped,
}

/// Persists rendered notes, resolving filename collisions per mode:
/// interactively in single mode, deferred in batch mode.
pub struct NoteWriter {
    store: Arc<dyn FileStore>,
    prompt: Arc<dyn DuplicatePrompt>,
    output_folder: String,
}

impl NoteWriter {
    pub fn new(
        store: Arc<dyn FileStore>,
        prompt: Arc<dyn DuplicatePrompt>,
        output_folder: impl Into<String>,
    ) -> Self {
        Self {
            store,
            prompt,
            output_folder: output_folder.into(),
        }
    }

    fn note_path(&self, file_name: &str) -> String {
        if self.output_folder.is_empty() {
            format!("{}.md", file_name)
        } else {
            format!("{}/{}.md", self.output_folder, file_name)
        }
    }

    pub async fn write(
        &self,
        file_name: &str,
        title: &str,
        body: &str,
        batch_mode: bool,
    ) -> Result<WriteOutcome> {
        if !self.output_folder.is_empty() && !self.store.exists(&self.output_folder).await {
            self.store.create_folder(&self.output_folder).await?;
        }

        let path = self.note_path(file_name);
        if !self.store.exists(&path).await {
            self.store.create(&path, body).await?;
            info!("Created note \"{}\" at {}", title, path);
            return Ok(WriteOutcome::Created { path });
        }

        if batch_mode {
            return Ok(WriteOutcome::DuplicatePending { path });
        }

        let choice = self.prompt.ask(file_name).await?;
        self.apply_choice(file_name, body, choice).await
    }

    /// Applies a duplicate resolution to an already-colliding file name.
    /// Also used by the batch results review, which collects choices after
    /// the run instead of prompting mid-loop.
    pub async fn apply_choice(
        &self,
        file_name: &str,
        body: &str,
        choice: DuplicateChoice,
    ) -> Result<WriteOutcome> {
        let path = self.note_path(file_name);
        match choice {
            DuplicateChoice::Replace => {
                self.store.delete(&path).await?;
                self.store.create(&path, body).await?;
                info!("Replaced note at {}", path);
                Ok(WriteOutcome::Created { path })
            }
            DuplicateChoice::Duplicate => {
                // Probe -1, -2, ... until a free path turns up. Never
                // overwrites an existing note.
                let mut n = 1;
                let path = loop {
                    let candidate = self.note_path(&format!("{}-{}", file_name, n));
                    if !self.store.exists(&candidate).await {
                        break candidate;
                    }
                    n += 1;
                };
                self.store.create(&path, body).await?;
                info!("Created duplicate note at {}", path);
                Ok(WriteOutcome::Created { path })
            }
            DuplicateChoice::Skip => Ok(WriteOutcome::Skipped),
        }
    }
}
