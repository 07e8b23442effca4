//! Fetch cache key composition.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::DirectiveError;

/// Key identifying a fetch call's target: the URL with its query, without fragment.
///
/// Two calls to the same resource with different query strings have
/// different keys. The key is also the diagnostic dedup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FetchKey(String);

impl FetchKey {
    /// Parse a fetch URL into a key.
    ///
    /// The URL must be absolute with a host. Paths and queries are
    /// percent-encoded the way fetch sends them.
    pub fn parse(url: &str) -> Result<Self, DirectiveError> {
        let trimmed = url.trim();
        if trimmed.is_empty() {
            return Err(DirectiveError::MissingUrl);
        }

        let mut parsed = Url::parse(trimmed).map_err(|e| DirectiveError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        if !parsed.has_host() {
            return Err(DirectiveError::InvalidUrl {
                url: url.to_string(),
                reason: "URL must be absolute".to_string(),
            });
        }

        parsed.set_fragment(None);
        Ok(Self(parsed.into()))
    }

    /// Get the key string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FetchKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
