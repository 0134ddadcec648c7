//! Server configuration
//!
//! All knowledge about the remote tile server lives here as immutable
//! values: endpoint templates, the version-discovery page, the fallback
//! version and the request headers. Components receive a `ServerConfig` at
//! construction time instead of reading ambient globals.

use std::time::Duration;

use crate::grid::TileAddress;

/// Default current-version fallback, used when discovery fails.
/// Current as of mid-2021; outdated values still resolve, just further back
/// in the history.
pub const DEFAULT_FALLBACK_VERSION: u32 = 904;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_9_3) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/35.0.1916.47 Safari/537.36";

/// Immutable description of the targeted tile server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Base URL of the top-down tile endpoint; query parameters are appended.
    pub tile_endpoint: String,

    /// Base URL of the oblique tile endpoint (takes an extra angle parameter).
    pub oblique_endpoint: String,

    /// Page scanned for the embedded current version number.
    pub version_page: String,

    /// Version assumed when discovery fails.
    pub fallback_version: u32,

    /// Browser-like User-Agent sent with every request.
    pub user_agent: String,

    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tile_endpoint: "https://khms2.google.com/kh".to_string(),
            oblique_endpoint: "https://khms2.google.com/kh/flatten".to_string(),
            version_page: "https://www.google.com/maps/".to_string(),
            fallback_version: DEFAULT_FALLBACK_VERSION,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl ServerConfig {
    /// Builds the request URL for a tile address. The top-down view uses the
    /// standard endpoint; the oblique views carry their camera angle.
    pub fn tile_url(&self, address: &TileAddress) -> String {
        match address.direction.oblique_angle() {
            None => format!(
                "{}?x={}&y={}&z={}&v={}",
                self.tile_endpoint, address.x, address.y, address.zoom, address.version
            ),
            Some(angle) => format!(
                "{}?x={}&y={}&z={}&v={}&deg={}",
                self.oblique_endpoint, address.x, address.y, address.zoom, address.version, angle
            ),
        }
    }
}
