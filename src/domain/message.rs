//! Message domain types.
//!
//! The provider-neutral shapes every client returns or accepts: addresses,
//! body MIME types, message metadata and outgoing messages.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Decoded message body text.
pub type MessageBody = String;

/// An email address with optional display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress {
    /// Display name (e.g., "Jane Doe"), absent when the provider omits it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Email address.
    pub address: String,
}

impl EmailAddress {
    /// Creates a new address without a display name.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            name: None,
            address: address.into(),
        }
    }

    /// Creates a new address with a display name.
    pub fn with_name(address: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            address: address.into(),
        }
    }
}

/// Body rendering a caller can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MimeType {
    /// `text/plain`
    #[serde(rename = "text/plain")]
    TextPlain,
    /// `text/html`
    #[serde(rename = "text/html")]
    TextHtml,
}

impl MimeType {
    /// Returns the MIME type as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            MimeType::TextPlain => "text/plain",
            MimeType::TextHtml => "text/html",
        }
    }
}

impl fmt::Display for MimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MimeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text/plain" => Ok(MimeType::TextPlain),
            "text/html" => Ok(MimeType::TextHtml),
            other => Err(format!("unsupported mime type: {}", other)),
        }
    }
}

/// Header-level summary of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageMeta {
    /// When the provider received the message.
    pub date: DateTime<Utc>,
    /// Sender, if the message carries one.
    pub from: Option<EmailAddress>,
    /// Subject line, if the message carries one.
    pub subject: Option<String>,
}

/// A single-recipient plain text message to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    /// Sender address.
    pub from: EmailAddress,
    /// Recipient address.
    pub to: EmailAddress,
    /// Subject line.
    pub subject: String,
    /// Plain text body.
    pub body: String,
}
