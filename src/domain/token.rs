//! Access token introspection result.

use serde::{Deserialize, Serialize};

/// Whether an access token is accepted by its provider.
///
/// A rejected token is reported as [`TokenInfo::Invalid`], never as an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TokenInfo {
    /// The provider accepted the token for this account.
    Valid {
        /// Account email the token belongs to.
        email: String,
    },
    /// The provider rejected the token, or could not be asked.
    Invalid,
}

impl TokenInfo {
    /// Returns `true` for [`TokenInfo::Valid`].
    pub fn is_valid(&self) -> bool {
        matches!(self, TokenInfo::Valid { .. })
    }

    /// Returns the account email for a valid token.
    pub fn email(&self) -> Option<&str> {
        match self {
            TokenInfo::Valid { email } => Some(email),
            TokenInfo::Invalid => None,
        }
    }
}
