//! Client configuration and base address normalisation.

use serde::Deserialize;
use url::Url;

/// Path every request is relative to.
pub const API_ROOT: &str = "/api";

const DEFAULT_BASE_URL: &str = "http://localhost:9000";

/// Settings for building a `StackClient` with the default HTTP transport.
///
/// Deserializable so a calling layer can load it from whatever source it
/// uses; every field has a default.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    /// Address of the service. Only scheme, host and port are kept.
    pub base_url: String,
    /// Per-request timeout. `None` leaves requests unbounded.
    pub timeout_secs: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: None,
        }
    }
}

/// Replace the path of `raw` with `API_ROOT`.
///
/// Query and fragment are dropped. An address that does not parse is
/// returned unchanged; requests against it fail at the transport.
pub fn normalize_base_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) => {
            url.set_path(API_ROOT);
            url.set_query(None);
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => raw.to_string(),
    }
}
