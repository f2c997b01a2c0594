use crate::host::HttpClient;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Returns true for the short-link forms that need a redirect hop before
/// metadata resolution: `vm.`/`vt.` hosts and the `/t/` path.
pub fn is_short_link(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    match parsed.host_str() {
        Some("vm.tiktok.com") | Some("vt.tiktok.com") => true,
        Some(host) if host.ends_with("tiktok.com") => parsed.path().starts_with("/t/"),
        _ => false,
    }
}

/// Expands short-link URLs to their canonical long form by following
/// redirects. Expansion failure is silent and non-fatal: the metadata
/// resolver can still try the unexpanded URL.
pub struct RedirectResolver {
    http: Arc<dyn HttpClient>,
    timeout: Duration,
}

impl RedirectResolver {
    pub fn new(http: Arc<dyn HttpClient>, timeout: Duration) -> Self {
        Self { http, timeout }
    }

    pub async fn expand(&self, url: &str) -> String {
        if !is_short_link(url) {
            return url.to_string();
        }

        match self.http.head(url, self.timeout).await {
            Ok(response) => response.final_url,
            Err(e) => {
                debug!("Redirect expansion failed for {}: {}", url, e);
                url.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_short_link_forms() {
        assert!(is_short_link("https://vm.tiktok.com/ZMabc/"));
        assert!(is_short_link("https://vt.tiktok.com/ZTxyz/"));
        assert!(is_short_link("https://www.tiktok.com/t/ZTxyz/"));
        assert!(!is_short_link(
            "https://www.tiktok.com/@user/video/7123456789012345678"
        ));
        assert!(!is_short_link("not a url"));
    }
}
