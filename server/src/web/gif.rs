use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use tracing::debug;

/// Live validation of GIF URLs before they are attached to a message.
/// Unlike geolocation this check fails closed: a URL whose probe fails is
/// rejected with a client error.
pub struct GifProbe {
    client: reqwest::Client,
}

impl GifProbe {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(5))
                .build()
                .expect("failed to build gif probe http client"),
        }
    }

    /// True if `url` is an http(s) URL that serves `image/gif` (or at least
    /// names a .gif). Issues a HEAD request; invoked before any engine lock.
    pub async fn is_gif_url(&self, url: &str) -> bool {
        let Ok(parsed) = reqwest::Url::parse(url) else {
            return false;
        };
        if !matches!(parsed.scheme(), "http" | "https") {
            return false;
        }
        if parsed.host_str().is_none() {
            return false;
        }

        let response = match self.client.head(parsed).send().await {
            Ok(r) => r,
            Err(e) => {
                debug!(%url, error = %e, "gif probe failed");
                return false;
            }
        };

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        content_type.contains("image/gif") || url.to_lowercase().ends_with(".gif")
    }
}

impl Default for GifProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejects_bad_schemes() {
        let probe = GifProbe::new();
        assert!(!probe.is_gif_url("ftp://example.com/a.gif").await);
        assert!(!probe.is_gif_url("javascript:alert(1)").await);
        assert!(!probe.is_gif_url("not a url at all").await);
        assert!(!probe.is_gif_url("").await);
    }
}
