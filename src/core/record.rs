use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionMethod {
    Primary,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Video,
    Slideshow,
    Private,
}

/// Canonical metadata for one resolved TikTok URL.
///
/// Immutable once constructed; the template engine only reads it.
/// `created_date` and `posted_date` are always well-formed ISO dates
/// (YYYY-MM-DD), even when every network call failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoRecord {
    pub source_url: String,
    pub canonical_url: String,
    /// Platform numeric id, always `\d+` when present.
    pub video_id: Option<String>,
    /// Resolved author handle, "Unknown" when unresolvable.
    pub author: String,
    /// Raw resolved title/caption text. Hashtag stripping happens in the
    /// template engine, which needs both forms.
    pub description: String,
    /// Leading `#` retained, first-occurrence order, no duplicates.
    pub hashtags: Vec<String>,
    /// Iframe, image reference, or plain link standing in for the media.
    pub embed_markup: String,
    pub created_date: String,
    pub posted_date: String,
    pub resolution_method: ResolutionMethod,
    pub content_kind: ContentKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Created,
    DuplicatePending,
    SkippedPrivate,
    Failed,
}

/// Rendered note content retained for a duplicate-pending item so the
/// results review can materialize it after the user picks a resolution.
#[derive(Debug, Clone)]
pub struct PendingNote {
    pub file_name: String,
    pub title: String,
    pub body: String,
}

/// Per-item classification produced by the batch orchestrator and
/// consumed once by the results aggregation step. Never persisted.
#[derive(Debug, Clone)]
pub struct BatchItemResult {
    pub url: String,
    pub outcome: ItemOutcome,
    pub file_name: Option<String>,
    pub note_title: Option<String>,
    pub resolution_method: Option<ResolutionMethod>,
    pub content_kind: Option<ContentKind>,
    pub error: Option<String>,
    pub pending: Option<PendingNote>,
}

impl BatchItemResult {
    pub fn failed(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            outcome: ItemOutcome::Failed,
            file_name: None,
            note_title: None,
            resolution_method: None,
            content_kind: None,
            error: Some(error.into()),
            pending: None,
        }
    }

    pub fn skipped_private(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            outcome: ItemOutcome::SkippedPrivate,
            file_name: None,
            note_title: None,
            resolution_method: None,
            content_kind: Some(ContentKind::Private),
            error: None,
            pending: None,
        }
    }
}
