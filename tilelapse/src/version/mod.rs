//! Current-version discovery
//!
//! The tile server does not advertise its version history; the most recent
//! version number is embedded in a public HTML page. Discovery scans that
//! page and falls back to a hardcoded known-good version on any failure, so
//! it can never abort a run.

use regex::bytes::Regex;
use tracing::{debug, warn};

use crate::config::ServerConfig;
use crate::fetch::HttpClient;

const VERSION_PATTERN: &str = r"khms0\.google\.com/kh/v\\u003d([0-9]+)";

/// Determines the most recent imagery version, falling back to
/// `config.fallback_version` when the page cannot be fetched or the version
/// marker is not found.
pub async fn detect_current_version(client: &dyn HttpClient, config: &ServerConfig) -> u32 {
    let body = match client.get(&config.version_page).await {
        Ok(body) => body,
        Err(error) => {
            warn!(
                error = %error,
                fallback = config.fallback_version,
                "unable to load version page, proceeding with fallback version"
            );
            return config.fallback_version;
        }
    };

    match scan_version(&body) {
        Some(version) => {
            debug!(version, "detected current imagery version");
            version
        }
        None => {
            warn!(
                fallback = config.fallback_version,
                "unable to extract current version, proceeding with fallback version"
            );
            config.fallback_version
        }
    }
}

fn scan_version(body: &[u8]) -> Option<u32> {
    let pattern = Regex::new(VERSION_PATTERN).expect("version pattern is valid");
    let captures = pattern.captures(body)?;
    std::str::from_utf8(captures.get(1)?.as_bytes())
        .ok()?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::MockHttpClient;
    use crate::fetch::HttpError;

    #[test]
    fn test_scan_version_finds_marker() {
        // The page embeds the URL inside a JS string with a \u-escaped '='.
        let body = br#"...["https://khms0.google.com/kh/v\u003d917",...]..."#;
        assert_eq!(scan_version(body), Some(917));
    }

    #[test]
    fn test_scan_version_misses_on_garbage() {
        assert_eq!(scan_version(b"<html>nothing here</html>"), None);
    }

    #[tokio::test]
    async fn test_detection_parses_page() {
        let client = MockHttpClient::new(|_, _| {
            Ok(br#"https://khms0.google.com/kh/v\u003d931"#.to_vec())
        });
        let config = ServerConfig::default();
        assert_eq!(detect_current_version(&client, &config).await, 931);
    }

    #[tokio::test]
    async fn test_detection_falls_back_on_pattern_miss() {
        let client = MockHttpClient::new(|_, _| Ok(b"no version here".to_vec()));
        let config = ServerConfig::default();
        assert_eq!(
            detect_current_version(&client, &config).await,
            config.fallback_version
        );
    }

    #[tokio::test]
    async fn test_detection_falls_back_on_network_error() {
        let client = MockHttpClient::new(|_, _| Err(HttpError::Connection("down".to_string())));
        let config = ServerConfig::default();
        assert_eq!(
            detect_current_version(&client, &config).await,
            config.fallback_version
        );
    }
}
