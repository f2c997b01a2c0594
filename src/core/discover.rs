use regex::Regex;
use std::collections::HashSet;

/// Scans arbitrary pasted text for TikTok URLs. No network I/O; results
/// are unique and ordered by first occurrence.
pub struct UrlDiscovery {
    candidate: Regex,
    accepted: Vec<Regex>,
}

impl UrlDiscovery {
    pub fn new() -> Self {
        let candidate = Regex::new(r#"https?://(?:www\.|m\.|vm\.|vt\.)?tiktok\.com/[^\s<>"']+"#)
            .expect("valid candidate pattern");

        // A candidate only counts when it matches one of the recognized
        // platform URL shapes.
        let accepted = [
            r"^https?://(?:www\.|m\.)?tiktok\.com/@[\w.-]+/(?:video|photo)/\d+",
            r"^https?://(?:www\.|m\.)?tiktok\.com/t/\w+",
            r"^https?://(?:vm|vt)\.tiktok\.com/\w+",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("valid acceptance pattern"))
        .collect();

        Self { candidate, accepted }
    }

    pub fn discover(&self, text: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut urls = Vec::new();

        for m in self.candidate.find_iter(text) {
            let url = trim_trailing_punctuation(m.as_str());
            if url.is_empty() || !self.is_accepted(url) {
                continue;
            }
            if seen.insert(url.to_string()) {
                urls.push(url.to_string());
            }
        }

        urls
    }

    fn is_accepted(&self, url: &str) -> bool {
        self.accepted.iter().any(|re| re.is_match(url))
    }
}

impl Default for UrlDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

/// Strips characters that commonly terminate a URL inside prose or
/// markdown: sentence punctuation, closing quotes and brackets.
fn trim_trailing_punctuation(url: &str) -> &str {
    url.trim_end_matches(|c| {
        matches!(
            c,
            '.' | ',' | ';' | ':' | '!' | '?' | ')' | ']' | '}' | '"' | '\'' | '>' | '*' | '`'
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_video_urls_in_prose() {
        let discovery = UrlDiscovery::new();
        let text = "check this out https://www.tiktok.com/@user/video/7123456789012345678 so good";
        assert_eq!(
            discovery.discover(text),
            vec!["https://www.tiktok.com/@user/video/7123456789012345678"]
        );
    }

    #[test]
    fn strips_trailing_markdown_punctuation() {
        let discovery = UrlDiscovery::new();
        let text = "(see https://www.tiktok.com/@user/video/7123456789012345678).";
        assert_eq!(
            discovery.discover(text),
            vec!["https://www.tiktok.com/@user/video/7123456789012345678"]
        );
    }

    #[test]
    fn accepts_short_link_forms() {
        let discovery = UrlDiscovery::new();
        let text = "https://vm.tiktok.com/ZMabc123/ and https://www.tiktok.com/t/ZTxyz789/";
        let urls = discovery.discover(text);
        assert_eq!(urls.len(), 2);
        assert!(urls[0].starts_with("https://vm.tiktok.com/"));
    }

    #[test]
    fn rejects_non_platform_and_malformed_urls() {
        let discovery = UrlDiscovery::new();
        let text = "https://example.com/video/123 https://www.tiktok.com/about";
        assert!(discovery.discover(text).is_empty());
    }

    #[test]
    fn rejects_bare_profile_urls() {
        let discovery = UrlDiscovery::new();
        let text =
            "profile https://www.tiktok.com/@user but post https://www.tiktok.com/@user/video/123";
        assert_eq!(
            discovery.discover(text),
            vec!["https://www.tiktok.com/@user/video/123"]
        );
    }

    #[test]
    fn deduplicates_preserving_first_occurrence_order() {
        let discovery = UrlDiscovery::new();
        let a = "https://www.tiktok.com/@a/video/111";
        let b = "https://www.tiktok.com/@b/video/222";
        let text = format!("{} then {} then {} again", a, b, a);
        assert_eq!(discovery.discover(&text), vec![a.to_string(), b.to_string()]);
    }

    #[test]
    fn discovery_is_idempotent() {
        let discovery = UrlDiscovery::new();
        let text = "https://www.tiktok.com/@a/video/111 https://vm.tiktok.com/ZMaaa/";
        assert_eq!(discovery.discover(text), discovery.discover(text));
    }

    #[test]
    fn empty_input_yields_empty_set() {
        let discovery = UrlDiscovery::new();
        assert!(discovery.discover("").is_empty());
        assert!(discovery.discover("no links here").is_empty());
    }
}
