//! Pure string templating over a `VideoRecord`. Three independent
//! templates are consumed: file name, note title, and note body.
//! Unrecognized placeholders are left verbatim.

use crate::config::Settings;
use crate::core::record::VideoRecord;
use crate::utils::sanitize_filename;
use regex::Regex;
use std::sync::OnceLock;

const FILE_DESCRIPTION_LIMIT: usize = 100;
const TITLE_LIMIT: usize = 50;

/// Trailing marker tag appended to every `{{hashtags}}` substitution.
const MARKER_TAG: &str = "#tiktok";

/// Fixed tags that open every frontmatter tag list.
const PLUGIN_TAG: &str = "tiktok";
const REVIEW_TAG: &str = "needs-review";

pub fn render_file_name(pattern: &str, record: &VideoRecord) -> String {
    let rendered = pattern
        .replace("{{author}}", &record.author.replace('@', ""))
        .replace("{{date}}", &record.created_date)
        .replace("{{videoId}}", video_id_or_unknown(record))
        .replace(
            "{{description}}",
            &strip_non_word(&truncate(&record.description, FILE_DESCRIPTION_LIMIT)),
        )
        .replace("{{title}}", &short_title(record))
        .replace("{{hashtags}}", &joined_hashtags(record))
        .replace("{{iframe}}", &record.embed_markup)
        .replace("{{transcription}}", "");

    sanitize_filename(rendered.trim())
}

pub fn render_title(pattern: &str, record: &VideoRecord) -> String {
    pattern
        .replace("{{author}}", &record.author)
        .replace("{{date}}", &record.created_date)
        .replace("{{videoId}}", video_id_or_unknown(record))
        .replace("{{description}}", &record.description)
        .replace("{{title}}", &short_title(record))
        .replace("{{hashtags}}", &joined_hashtags(record))
        .replace("{{iframe}}", &record.embed_markup)
        .replace("{{transcription}}", "")
}

/// Renders the note body, prepending a frontmatter block when properties
/// are enabled.
pub fn render_body(record: &VideoRecord, settings: &Settings) -> String {
    let body = settings
        .note_body_template
        .replace("{{author}}", &record.author)
        .replace("{{date}}", &record.created_date)
        .replace("{{videoId}}", video_id_or_unknown(record))
        .replace("{{description}}", &body_description(record))
        .replace("{{title}}", &short_title(record))
        .replace("{{hashtags}}", &formatted_hashtags(record, settings))
        .replace("{{iframe}}", &record.embed_markup)
        .replace("{{transcription}}", "");

    if settings.enable_properties {
        format!("{}\n{}", frontmatter(record, settings), body)
    } else {
        body
    }
}

fn video_id_or_unknown(record: &VideoRecord) -> &str {
    record.video_id.as_deref().unwrap_or("unknown")
}

fn truncate(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

fn strip_non_word(text: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"[^\w\s]").expect("valid strip pattern"));
    re.replace_all(text, "").trim().to_string()
}

fn collapse_whitespace(text: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace pattern"));
    re.replace_all(text, " ").trim().to_string()
}

fn short_title(record: &VideoRecord) -> String {
    strip_non_word(&truncate(&record.description, TITLE_LIMIT))
}

/// Description with every recognized hashtag removed and whitespace
/// collapsed; used for the note body.
fn body_description(record: &VideoRecord) -> String {
    let mut text = record.description.clone();
    for tag in &record.hashtags {
        text = text.replace(tag.as_str(), "");
    }
    collapse_whitespace(&text)
}

fn joined_hashtags(record: &VideoRecord) -> String {
    let mut tags = record.hashtags.clone();
    tags.push(MARKER_TAG.to_string());
    tags.join(" ")
}

/// Like `joined_hashtags` but honoring the configured display format,
/// which sees each tag without its marker.
fn formatted_hashtags(record: &VideoRecord, settings: &Settings) -> String {
    record
        .hashtags
        .iter()
        .map(|tag| tag.trim_start_matches('#'))
        .chain(std::iter::once(MARKER_TAG.trim_start_matches('#')))
        .map(|tag| settings.hashtag_display_format.replace("{{tag}}", tag))
        .collect::<Vec<_>>()
        .join(" ")
}

fn yaml_escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

fn frontmatter(record: &VideoRecord, settings: &Settings) -> String {
    let mut lines = vec!["---".to_string()];

    if settings.property_author {
        lines.push(format!("author: \"{}\"", yaml_escape(&record.author)));
    }
    if settings.property_description {
        lines.push(format!(
            "description: \"{}\"",
            yaml_escape(&body_description(record))
        ));
    }
    if settings.property_source {
        lines.push(format!("source: {}", record.canonical_url));
    }
    if settings.property_video_id {
        lines.push(format!("video-id: \"{}\"", video_id_or_unknown(record)));
    }
    if settings.property_posted_date {
        lines.push(format!("posted: {}", record.posted_date));
    }
    lines.push(format!("created: {}", record.created_date));

    lines.push("tags:".to_string());
    lines.push(format!("  - {}", PLUGIN_TAG));
    lines.push(format!("  - {}", REVIEW_TAG));
    if settings.property_hashtags {
        for tag in &record.hashtags {
            lines.push(format!("  - {}", tag.trim_start_matches('#')));
        }
    }

    lines.push("---".to_string());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::{ContentKind, ResolutionMethod};

    fn record() -> VideoRecord {
        VideoRecord {
            source_url: "https://vm.tiktok.com/ZMabc/".to_string(),
            canonical_url: "https://www.tiktok.com/@abc/video/123".to_string(),
            video_id: Some("123".to_string()),
            author: "@abc".to_string(),
            description: "Hello #fun".to_string(),
            hashtags: vec!["#fun".to_string()],
            embed_markup: "<iframe src=\"https://www.tiktok.com/embed/v2/123\"></iframe>"
                .to_string(),
            created_date: "2024-01-01".to_string(),
            posted_date: "2023-12-25".to_string(),
            resolution_method: ResolutionMethod::Primary,
            content_kind: ContentKind::Video,
        }
    }

    #[test]
    fn file_name_strips_author_marker_and_resolves_all_placeholders() {
        let rendered = render_file_name("{{author}} - {{date}} - {{videoId}}", &record());
        assert_eq!(rendered, "abc - 2024-01-01 - 123");
        assert!(!rendered.contains("{{"));
    }

    #[test]
    fn file_name_description_is_truncated_and_stripped() {
        let mut rec = record();
        rec.description = format!("{}!?", "x".repeat(120));
        let rendered = render_file_name("{{description}}", &rec);
        assert_eq!(rendered, "x".repeat(100));
    }

    #[test]
    fn title_keeps_raw_author_marker() {
        assert_eq!(
            render_title("{{author}} - {{title}}", &record()),
            "@abc - Hello fun"
        );
    }

    #[test]
    fn unknown_placeholders_are_left_verbatim() {
        assert_eq!(
            render_title("{{author}} {{mystery}}", &record()),
            "@abc {{mystery}}"
        );
    }

    #[test]
    fn missing_video_id_renders_literal_unknown() {
        let mut rec = record();
        rec.video_id = None;
        assert_eq!(render_title("{{videoId}}", &rec), "unknown");
    }

    #[test]
    fn body_strips_hashtags_from_description_and_appends_marker_tag() {
        let mut settings = Settings::default();
        settings.enable_properties = false;
        settings.note_body_template = "{{description}}|{{hashtags}}|{{transcription}}".to_string();
        let body = render_body(&record(), &settings);
        assert_eq!(body, "Hello|#fun #tiktok|");
    }

    #[test]
    fn hashtag_display_format_is_applied_per_tag() {
        let mut settings = Settings::default();
        settings.enable_properties = false;
        settings.note_body_template = "{{hashtags}}".to_string();
        settings.hashtag_display_format = "[[{{tag}}]]".to_string();
        assert_eq!(render_body(&record(), &settings), "[[fun]] [[tiktok]]");
    }

    #[test]
    fn frontmatter_opens_with_fixed_tags() {
        let settings = Settings::default();
        let body = render_body(&record(), &settings);
        assert!(body.starts_with("---\n"));
        let tags_at = body.find("tags:").unwrap();
        let tiktok_at = body.find("  - tiktok").unwrap();
        let review_at = body.find("  - needs-review").unwrap();
        let fun_at = body.find("  - fun").unwrap();
        assert!(tags_at < tiktok_at && tiktok_at < review_at && review_at < fun_at);
    }

    #[test]
    fn frontmatter_toggles_drop_fields() {
        let mut settings = Settings::default();
        settings.property_author = false;
        settings.property_hashtags = false;
        let body = render_body(&record(), &settings);
        assert!(!body.contains("author:"));
        assert!(!body.contains("  - fun"));
        assert!(body.contains("  - needs-review"));
    }
}
