use crate::config::PrivateVideoPolicy;
use crate::core::record::{ContentKind, ResolutionMethod, VideoRecord};
use crate::host::HttpClient;
use chrono::{DateTime, Local, Utc};
use regex::Regex;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const OEMBED_ENDPOINT: &str = "https://www.tiktok.com/oembed";
const EMBED_BASE: &str = "https://www.tiktok.com/embed/v2";

/// Timeout for the secondary last-modified lookup only.
const LAST_MODIFIED_TIMEOUT: Duration = Duration::from_secs(5);

// Accepted range for timestamps decoded out of a video id:
// [2010-01-01, 2030-01-01) as Unix seconds.
const MIN_DECODED_TS: i64 = 1_262_304_000;
const MAX_DECODED_TS: i64 = 1_893_456_000;

#[derive(Debug, Deserialize)]
struct OEmbedResponse {
    #[serde(default)]
    author_name: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    thumbnail_url: Option<String>,
    #[serde(default)]
    html: Option<String>,
}

/// Resolves a canonical TikTok URL to a `VideoRecord` through a layered
/// fallback chain: oEmbed endpoint, then URL heuristics, with dedicated
/// handling for slideshow and private content.
pub struct MetadataResolver {
    http: Arc<dyn HttpClient>,
    private_policy: PrivateVideoPolicy,
    timeout: Duration,
    hashtag_re: Regex,
    id_attr_re: Regex,
    url_id_re: Regex,
    handle_re: Regex,
}

impl MetadataResolver {
    pub fn new(
        http: Arc<dyn HttpClient>,
        private_policy: PrivateVideoPolicy,
        timeout: Duration,
    ) -> Self {
        // `#` followed by a word-character run, extended Latin included.
        let hashtag_re = Regex::new(r"#[\wÀ-ɏ]+").expect("valid hashtag pattern");
        let id_attr_re = Regex::new(r#"data-video-id="(\d+)""#).expect("valid id pattern");
        let url_id_re = Regex::new(r"/(?:video|photo)/(\d+)").expect("valid url id pattern");
        let handle_re = Regex::new(r"/@([\w.-]+)").expect("valid handle pattern");

        Self {
            http,
            private_policy,
            timeout,
            hashtag_re,
            id_attr_re,
            url_id_re,
            handle_re,
        }
    }

    /// Total except for the private-skip policy: every other path yields a
    /// record with well-formed dates, even when all network calls fail.
    pub async fn resolve(&self, source_url: &str, canonical_url: &str) -> Option<VideoRecord> {
        let created_date = Local::now().format("%Y-%m-%d").to_string();
        let video_id = self.id_from_url(canonical_url);

        // The oEmbed endpoint does not serve slideshow posts reliably, so
        // photo URLs skip it entirely.
        if canonical_url.contains("/photo/") {
            return Some(
                self.slideshow_record(source_url, canonical_url, video_id, created_date)
                    .await,
            );
        }

        let oembed_url = format!(
            "{}?url={}",
            OEMBED_ENDPOINT,
            urlencoding::encode(canonical_url)
        );

        match self.http.get(&oembed_url, self.timeout).await {
            Ok(response) if response.is_success() => {
                match serde_json::from_str::<OEmbedResponse>(&response.body) {
                    Ok(payload) => Some(
                        self.primary_record(
                            source_url,
                            canonical_url,
                            video_id,
                            created_date,
                            payload,
                        )
                        .await,
                    ),
                    Err(e) => {
                        warn!("oEmbed payload parse failed for {}: {}", canonical_url, e);
                        Some(
                            self.fallback_record(source_url, canonical_url, video_id, created_date)
                                .await,
                        )
                    }
                }
            }
            Ok(response) => {
                if looks_access_denied(response.status, &response.body) {
                    self.private_record(source_url, canonical_url, video_id, created_date)
                        .await
                } else {
                    warn!(
                        "oEmbed endpoint returned HTTP {} for {}",
                        response.status, canonical_url
                    );
                    Some(
                        self.fallback_record(source_url, canonical_url, video_id, created_date)
                            .await,
                    )
                }
            }
            Err(e) => {
                let message = e.to_string();
                if looks_access_denied(0, &message) {
                    self.private_record(source_url, canonical_url, video_id, created_date)
                        .await
                } else {
                    warn!("oEmbed request failed for {}: {}", canonical_url, message);
                    Some(
                        self.fallback_record(source_url, canonical_url, video_id, created_date)
                            .await,
                    )
                }
            }
        }
    }

    async fn primary_record(
        &self,
        source_url: &str,
        canonical_url: &str,
        url_video_id: Option<String>,
        created_date: String,
        payload: OEmbedResponse,
    ) -> VideoRecord {
        let title = payload.title.unwrap_or_default();
        let hashtags = self.extract_hashtags(&title);
        let video_id = url_video_id.or_else(|| {
            payload
                .html
                .as_deref()
                .and_then(|html| self.id_from_embed_html(html))
        });

        // Prefer the dedicated embed player; fall back to the thumbnail
        // image, then to a plain link.
        let embed_markup = match (&video_id, payload.thumbnail_url.as_deref()) {
            (Some(id), _) => iframe_markup(id),
            (None, Some(thumbnail)) => format!("![{}]({})", title, thumbnail),
            (None, None) => link_markup(canonical_url),
        };

        let author = payload
            .author_name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| self.author_from_url(canonical_url));

        let posted_date = self
            .derive_posted_date(video_id.as_deref(), canonical_url, &created_date)
            .await;

        VideoRecord {
            source_url: source_url.to_string(),
            canonical_url: canonical_url.to_string(),
            video_id,
            author,
            description: title,
            hashtags,
            embed_markup,
            created_date,
            posted_date,
            resolution_method: ResolutionMethod::Primary,
            content_kind: ContentKind::Video,
        }
    }

    async fn fallback_record(
        &self,
        source_url: &str,
        canonical_url: &str,
        video_id: Option<String>,
        created_date: String,
    ) -> VideoRecord {
        let embed_markup = match &video_id {
            Some(id) => iframe_markup(id),
            None => link_markup(canonical_url),
        };

        let posted_date = self
            .derive_posted_date(video_id.as_deref(), canonical_url, &created_date)
            .await;

        VideoRecord {
            source_url: source_url.to_string(),
            canonical_url: canonical_url.to_string(),
            video_id,
            author: self.author_from_url(canonical_url),
            description: "TikTok video".to_string(),
            hashtags: Vec::new(),
            embed_markup,
            created_date,
            posted_date,
            resolution_method: ResolutionMethod::Fallback,
            content_kind: ContentKind::Video,
        }
    }

    async fn slideshow_record(
        &self,
        source_url: &str,
        canonical_url: &str,
        video_id: Option<String>,
        created_date: String,
    ) -> VideoRecord {
        let posted_date = self
            .derive_posted_date(video_id.as_deref(), canonical_url, &created_date)
            .await;

        VideoRecord {
            source_url: source_url.to_string(),
            canonical_url: canonical_url.to_string(),
            video_id,
            author: self.author_from_url(canonical_url),
            description: "TikTok slideshow".to_string(),
            hashtags: Vec::new(),
            embed_markup: format!("![TikTok slideshow]({})", canonical_url),
            created_date,
            posted_date,
            resolution_method: ResolutionMethod::Fallback,
            content_kind: ContentKind::Slideshow,
        }
    }

    /// Policy branch for content the endpoint refused to serve. Callers
    /// surface the skip notice; this only logs.
    async fn private_record(
        &self,
        source_url: &str,
        canonical_url: &str,
        video_id: Option<String>,
        created_date: String,
    ) -> Option<VideoRecord> {
        let embed_markup = match self.private_policy {
            PrivateVideoPolicy::Skip => {
                info!("Skipping private video: {}", canonical_url);
                return None;
            }
            PrivateVideoPolicy::ShowError => format!(
                "> [!warning] This video is private or unavailable.\n> {}",
                link_markup(canonical_url)
            ),
            PrivateVideoPolicy::CreateEmpty => link_markup(canonical_url),
        };

        // The id is usually still extractable from the URL, so the posted
        // date derives the same way as for any other record.
        let posted_date = self
            .derive_posted_date(video_id.as_deref(), canonical_url, &created_date)
            .await;

        Some(VideoRecord {
            source_url: source_url.to_string(),
            canonical_url: canonical_url.to_string(),
            video_id,
            author: self.author_from_url(canonical_url),
            description: "Private TikTok video".to_string(),
            hashtags: Vec::new(),
            embed_markup,
            created_date,
            posted_date,
            resolution_method: ResolutionMethod::Fallback,
            content_kind: ContentKind::Private,
        })
    }

    /// First-occurrence order, no duplicates, leading `#` retained.
    fn extract_hashtags(&self, text: &str) -> Vec<String> {
        let mut hashtags: Vec<String> = Vec::new();
        for m in self.hashtag_re.find_iter(text) {
            let tag = m.as_str().to_string();
            if !hashtags.contains(&tag) {
                hashtags.push(tag);
            }
        }
        hashtags
    }

    fn id_from_url(&self, url: &str) -> Option<String> {
        self.url_id_re
            .captures(url)
            .map(|c| c[1].to_string())
    }

    fn id_from_embed_html(&self, html: &str) -> Option<String> {
        self.id_attr_re
            .captures(html)
            .map(|c| c[1].to_string())
    }

    fn author_from_url(&self, url: &str) -> String {
        self.handle_re
            .captures(url)
            .map(|c| format!("@{}", &c[1]))
            .unwrap_or_else(|| "Unknown".to_string())
    }

    /// Posted-date chain: timestamp embedded in the id's upper 32 bits,
    /// then a transport last-modified signal, then the created date.
    async fn derive_posted_date(
        &self,
        video_id: Option<&str>,
        url: &str,
        created_date: &str,
    ) -> String {
        if let Some(date) = video_id.and_then(decode_id_timestamp) {
            return date;
        }

        match self.http.head(url, LAST_MODIFIED_TIMEOUT).await {
            Ok(response) => {
                if let Some(date) = response
                    .last_modified
                    .as_deref()
                    .and_then(parse_last_modified)
                {
                    return date;
                }
            }
            Err(e) => debug!("last-modified lookup failed for {}: {}", url, e),
        }

        created_date.to_string()
    }
}

/// Decodes the Unix timestamp a video id carries in its upper 32 bits.
/// Rejected outside the sane calendar range so garbage ids fall through
/// to the next derivation method.
pub fn decode_id_timestamp(video_id: &str) -> Option<String> {
    let id: i64 = video_id.parse().ok()?;
    let ts = id >> 32;
    if !(MIN_DECODED_TS..MAX_DECODED_TS).contains(&ts) {
        return None;
    }
    DateTime::<Utc>::from_timestamp(ts, 0).map(|dt| dt.format("%Y-%m-%d").to_string())
}

fn parse_last_modified(value: &str) -> Option<String> {
    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|dt| dt.format("%Y-%m-%d").to_string())
}

fn iframe_markup(video_id: &str) -> String {
    format!(
        "<iframe src=\"{}/{}\" width=\"325\" height=\"580\" frameborder=\"0\" allowfullscreen></iframe>",
        EMBED_BASE, video_id
    )
}

fn link_markup(url: &str) -> String {
    format!("[{}]({})", url, url)
}

/// Best-effort classifier for access-denied failures. The endpoint gives
/// no structured signal, so this stays a heuristic over status and text.
fn looks_access_denied(status: u16, text: &str) -> bool {
    if status == 403 {
        return true;
    }
    let lower = text.to_lowercase();
    ["forbidden", "private", "unavailable"]
        .iter()
        .any(|marker| lower.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_timestamp_from_id_upper_bits() {
        // 1700000000 (2023-11-14 UTC) << 32
        let id = (1_700_000_000i64 << 32).to_string();
        assert_eq!(decode_id_timestamp(&id), Some("2023-11-14".to_string()));
    }

    #[test]
    fn rejects_timestamps_outside_calendar_range() {
        // Upper bits decode to 1970.
        assert_eq!(decode_id_timestamp("12345"), None);
        // 2035 is past the accepted range.
        let id = (2_051_222_400i64 << 32).to_string();
        assert_eq!(decode_id_timestamp(&id), None);
        assert_eq!(decode_id_timestamp("not-a-number"), None);
    }

    #[test]
    fn access_denied_heuristic_matches_status_and_text() {
        assert!(looks_access_denied(403, ""));
        assert!(looks_access_denied(400, "Video is private"));
        assert!(looks_access_denied(0, "This post is unavailable"));
        assert!(!looks_access_denied(500, "internal error"));
    }

    #[test]
    fn last_modified_parses_rfc2822() {
        assert_eq!(
            parse_last_modified("Tue, 02 Jan 2024 10:30:00 GMT"),
            Some("2024-01-02".to_string())
        );
        assert_eq!(parse_last_modified("garbage"), None);
    }
}
