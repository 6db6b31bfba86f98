//! Client settings types.
//!
//! Nothing is read from disk. Callers who keep settings in a file can
//! deserialize these types themselves; every field has a default.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level client settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Gmail REST endpoints.
    pub gmail: GmailEndpoints,
    /// Microsoft Graph endpoints.
    pub outlook: OutlookEndpoints,
    /// HTTP transport options.
    pub transport: TransportSettings,
}

/// Gmail REST API endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GmailEndpoints {
    /// API root, without a trailing slash.
    pub api_base: String,
    /// OAuth token introspection URL.
    pub token_info_url: String,
}

impl Default for GmailEndpoints {
    fn default() -> Self {
        Self {
            api_base: "https://www.googleapis.com/gmail/v1".to_string(),
            token_info_url: "https://www.googleapis.com/oauth2/v3/tokeninfo".to_string(),
        }
    }
}

/// Microsoft Graph endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlookEndpoints {
    /// API root, without a trailing slash.
    pub api_base: String,
    /// `$top` sent with search requests.
    pub search_page_size: u32,
}

impl Default for OutlookEndpoints {
    fn default() -> Self {
        Self {
            api_base: "https://graph.microsoft.com/v1.0".to_string(),
            search_page_size: 50,
        }
    }
}

/// Options for the default reqwest transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSettings {
    /// `User-Agent` header value.
    pub user_agent: String,
    /// Whole-request timeout in seconds. `None` leaves requests unbounded.
    pub timeout_secs: Option<u64>,
}

impl TransportSettings {
    /// Returns the timeout as a [`Duration`].
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: None,
        }
    }
}
