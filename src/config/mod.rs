use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrivateVideoPolicy {
    CreateEmpty,
    Skip,
    ShowError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    Replace,
    Duplicate,
    Skip,
}

/// Transcription backend selector. Recognized but inert: the pipeline
/// substitutes an empty string for `{{transcription}}` regardless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptionApi {
    None,
    Whisper,
    AssemblyAi,
}

/// Process-wide settings, loaded once at startup and threaded through the
/// pipeline. Missing keys take the documented defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub output_folder: String,
    pub file_name_template: String,
    pub note_title_template: String,
    pub note_body_template: String,
    pub enable_properties: bool,
    pub property_author: bool,
    pub property_description: bool,
    pub property_source: bool,
    pub property_video_id: bool,
    pub property_posted_date: bool,
    pub property_hashtags: bool,
    pub hashtag_display_format: String,
    pub transcription_api: TranscriptionApi,
    pub api_key: String,
    pub private_video_policy: PrivateVideoPolicy,
    /// Informational default; single mode always asks interactively.
    pub duplicate_policy: DuplicatePolicy,
    pub url_timeout_secs: u64,
    pub bulk_enabled: bool,
    pub bypass_picker_for_single: bool,
    pub show_bulk_progress: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_folder: "TikToks".to_string(),
            file_name_template: "{{author}} - {{date}} - {{videoId}}".to_string(),
            note_title_template: "{{author}} - {{title}}".to_string(),
            note_body_template: "{{iframe}}\n\n{{description}}\n\n{{hashtags}}\n\n{{transcription}}"
                .to_string(),
            enable_properties: true,
            property_author: true,
            property_description: true,
            property_source: true,
            property_video_id: true,
            property_posted_date: true,
            property_hashtags: true,
            hashtag_display_format: "#{{tag}}".to_string(),
            transcription_api: TranscriptionApi::None,
            api_key: String::new(),
            private_video_policy: PrivateVideoPolicy::CreateEmpty,
            duplicate_policy: DuplicatePolicy::Duplicate,
            url_timeout_secs: 10,
            bulk_enabled: true,
            bypass_picker_for_single: true,
            show_bulk_progress: true,
        }
    }
}

impl Settings {
    /// Loads settings from a TOML file, merged over defaults. A missing
    /// file is not an error; it just means all defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        let mut settings: Settings = toml::from_str(&text)?;
        settings.url_timeout_secs = settings.url_timeout_secs.clamp(5, 30);
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let text = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, text)?;
        Ok(())
    }
}
