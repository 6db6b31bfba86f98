//! Mail client trait definition.
//!
//! This module defines the [`MailClient`] trait which abstracts over the
//! supported webmail APIs, the [`Provider`] selector and the error type shared
//! by every client operation.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{MessageBody, MessageId, MessageMeta, MimeType, OutgoingMessage, TokenInfo};

/// Result type alias for mail client operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Errors that can occur during mail client operations.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The factory was asked for a provider it does not know.
    #[error("unsupported provider: {0}")]
    UnsupportedProvider(String),

    /// The message has no body part with the requested MIME type.
    #[error("no parts with the mime-type \"{0}\" found")]
    ContentNotFound(MimeType),

    /// The provider answered with its structured error envelope.
    #[error("{message}")]
    Api {
        /// Provider supplied message.
        message: String,
        /// Provider error code, if one was given.
        code: Option<ErrorCode>,
        /// Detail entries (Gmail only).
        errors: Vec<ApiSubError>,
    },

    /// Non-success HTTP status without a recognizable error envelope.
    #[error("request failed with status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// Network or connection error.
    #[error("transport error: {0}")]
    Transport(String),

    /// A response could not be interpreted.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Invalid request or parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ProviderError {
    /// Returns the provider error code for [`ProviderError::Api`] errors.
    pub fn code(&self) -> Option<&ErrorCode> {
        match self {
            ProviderError::Api { code, .. } => code.as_ref(),
            _ => None,
        }
    }
}

/// Provider error code from an API error envelope.
///
/// Gmail reports the HTTP status as an integer, Graph reports a symbolic name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorCode {
    /// Numeric code, e.g. `404`.
    Status(i64),
    /// Symbolic code, e.g. `ErrorItemNotFound`.
    Name(String),
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::Status(code) => write!(f, "{}", code),
            ErrorCode::Name(name) => f.write_str(name),
        }
    }
}

/// One entry of Gmail's `error.errors` list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSubError {
    /// Error domain, e.g. `global`.
    #[serde(default)]
    pub domain: Option<String>,
    /// Machine readable reason, e.g. `notFound`.
    #[serde(default)]
    pub reason: Option<String>,
    /// Human readable message.
    #[serde(default)]
    pub message: Option<String>,
}

/// Supported webmail providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Gmail REST API.
    Gmail,
    /// Microsoft Graph (Outlook) API.
    Outlook,
}

impl Provider {
    /// Returns the provider name accepted by [`FromStr`].
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Gmail => "gmail",
            Provider::Outlook => "outlook",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "gmail" => Ok(Provider::Gmail),
            "outlook" => Ok(Provider::Outlook),
            other => Err(ProviderError::UnsupportedProvider(other.to_string())),
        }
    }
}

/// Trait for webmail client implementations.
///
/// A client is bound to one provider and one access token. It keeps no other
/// state, so a single instance can serve any number of concurrent calls.
///
/// # Example
///
/// ```no_run
/// use webmail::{create_client, MailClient, MimeType};
///
/// # async fn example() -> webmail::Result<()> {
/// let client = create_client("gmail", "ya29.token")?;
///
/// for id in client.search("subject:invoice").await? {
///     let meta = client.fetch_message_meta(&id).await?;
///     let body = client.fetch_message_body(&id, MimeType::TextPlain).await?;
///     println!("{:?}: {}", meta.subject, body.len());
/// }
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait MailClient: Send + Sync {
    /// Returns the provider this client talks to.
    fn provider(&self) -> Provider;

    /// Removes a message from the inbox without deleting it.
    ///
    /// Archiving an already archived message succeeds.
    async fn archive_message(&self, id: &MessageId) -> Result<()>;

    /// Fetches the body of a message rendered as `mime_type`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::ContentNotFound`] if the message has no body
    /// in that MIME type.
    async fn fetch_message_body(&self, id: &MessageId, mime_type: MimeType)
        -> Result<MessageBody>;

    /// Fetches date, sender and subject of a message.
    async fn fetch_message_meta(&self, id: &MessageId) -> Result<MessageMeta>;

    /// Reads the provider's clock from the `Date` header of an API response.
    ///
    /// Does not need a valid token.
    async fn get_server_time(&self) -> Result<DateTime<Utc>>;

    /// Asks the provider whether the bound token is usable.
    ///
    /// Never fails: any error is reported as [`TokenInfo::Invalid`].
    async fn get_token_info(&self) -> TokenInfo;

    /// Runs a provider search query and returns the first page of ids.
    async fn search(&self, query: &str) -> Result<Vec<MessageId>>;

    /// Sends a plain text message.
    async fn send(&self, message: &OutgoingMessage) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn provider_from_str() {
        assert_eq!("gmail".parse::<Provider>().unwrap(), Provider::Gmail);
        assert_eq!("outlook".parse::<Provider>().unwrap(), Provider::Outlook);
    }

    #[test]
    fn provider_from_str_is_exact() {
        for name in ["Gmail", "yahoo", "", " outlook"] {
            let err = name.parse::<Provider>().unwrap_err();
            assert!(matches!(err, ProviderError::UnsupportedProvider(ref n) if n == name));
        }
    }

    #[test]
    fn error_code_deserializes_both_shapes() {
        let numeric: ErrorCode = serde_json::from_str("404").unwrap();
        let named: ErrorCode = serde_json::from_str("\"ErrorItemNotFound\"").unwrap();

        assert_eq!(numeric, ErrorCode::Status(404));
        assert_eq!(named, ErrorCode::Name("ErrorItemNotFound".to_string()));
        assert_eq!(named.to_string(), "ErrorItemNotFound");
    }

    #[test]
    fn provider_error_display() {
        let not_found = ProviderError::ContentNotFound(MimeType::TextHtml);
        assert_eq!(
            not_found.to_string(),
            "no parts with the mime-type \"text/html\" found"
        );

        let api = ProviderError::Api {
            message: "Requested entity was not found.".to_string(),
            code: Some(ErrorCode::Status(404)),
            errors: vec![],
        };
        assert_eq!(api.to_string(), "Requested entity was not found.");
        assert_eq!(api.code(), Some(&ErrorCode::Status(404)));

        let unsupported = ProviderError::UnsupportedProvider("yahoo".to_string());
        assert!(unsupported.to_string().contains("yahoo"));
    }
}
