//! Gmail API client implementation.
//!
//! This module provides a [`MailClient`] implementation on top of the Gmail
//! REST API v1.
//!
//! # Wire format
//!
//! Gmail returns messages as a MIME tree: `payload` is either a single part
//! carrying `body.data` directly or a container with `parts`. Body data is
//! base64url encoded. Sender and subject only exist as raw RFC 5322 headers,
//! and outgoing mail is submitted as a complete base64url encoded RFC 5322
//! message built with `lettre`.
//!
//! # API Usage
//!
//! - `users.messages.get` with field masks for bodies and metadata
//! - `users.messages.list` for search
//! - `users.messages.modify` for archiving (removes the `INBOX` label)
//! - `users.messages.send` for sending
//! - the OAuth 2 `tokeninfo` endpoint for token checks

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use base64::prelude::*;
use chrono::{DateTime, Utc};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::{Address, Message};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use super::transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
use super::{ApiSubError, ErrorCode, MailClient, Provider, ProviderError, Result};
use crate::config::GmailEndpoints;
use crate::domain::{
    EmailAddress, MessageBody, MessageId, MessageMeta, MimeType, OutgoingMessage, TokenInfo,
};

const BODY_FIELDS: &str = "payload/parts/mimeType,payload/parts/body,payload/parts/parts/mimeType,payload/parts/parts/body,payload/mimeType,payload/body";
const META_FIELDS: &str = "internalDate,payload/headers";
const MULTIPART_RELATED: &str = "multipart/related";

/// Gmail API message, reduced to the fields requested by the field masks.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GmailMessage {
    internal_date: Option<String>,
    payload: Option<GmailPart>,
}

/// Gmail message part. The top-level payload has the same shape.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GmailPart {
    mime_type: Option<String>,
    headers: Option<Vec<GmailHeader>>,
    body: Option<GmailBody>,
    parts: Option<Vec<GmailPart>>,
}

impl GmailPart {
    fn is(&self, mime_type: &str) -> bool {
        self.mime_type.as_deref() == Some(mime_type)
    }
}

/// Gmail message header.
#[derive(Debug, Deserialize)]
struct GmailHeader {
    name: String,
    value: String,
}

/// Gmail message body.
#[derive(Debug, Deserialize)]
struct GmailBody {
    data: Option<String>,
}

/// Gmail messages list response.
#[derive(Debug, Deserialize)]
struct MessageListResponse {
    messages: Option<Vec<MessageRef>>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

/// OAuth tokeninfo response.
#[derive(Debug, Deserialize)]
struct TokenInfoResponse {
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    id: Option<String>,
}

/// Gmail error envelope: `{"error": {"code", "message", "errors"}}`.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
    code: Option<ErrorCode>,
    #[serde(default)]
    errors: Vec<ApiSubError>,
}

/// Gmail REST API client.
///
/// Bound to one access token; cheap to clone.
///
/// # Example
///
/// ```no_run
/// use webmail::{GmailClient, MailClient, MessageId, MimeType};
///
/// # async fn example() -> webmail::Result<()> {
/// let client = GmailClient::new("ya29.token");
/// let body = client
///     .fetch_message_body(&MessageId::from("18c2f0a1b2c3d4e5"), MimeType::TextPlain)
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct GmailClient<T = ReqwestTransport> {
    access_token: String,
    endpoints: GmailEndpoints,
    transport: Arc<T>,
}

impl GmailClient<ReqwestTransport> {
    /// Creates a client for the public Gmail API.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self::with_transport(
            access_token,
            GmailEndpoints::default(),
            Arc::new(ReqwestTransport::new()),
        )
    }
}

impl<T: HttpTransport> GmailClient<T> {
    /// Creates a client with explicit endpoints and transport.
    pub fn with_transport(
        access_token: impl Into<String>,
        endpoints: GmailEndpoints,
        transport: Arc<T>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            endpoints,
            transport,
        }
    }

    /// Returns the configured endpoints.
    pub fn endpoints(&self) -> &GmailEndpoints {
        &self.endpoints
    }

    fn user_url(&self, path: &str) -> String {
        format!("{}/users/me{}", self.endpoints.api_base, path)
    }

    fn user_url_with_params(&self, path: &str, params: &[(&str, &str)]) -> Result<String> {
        Url::parse_with_params(&self.user_url(path), params)
            .map(String::from)
            .map_err(|e| ProviderError::InvalidRequest(format!("invalid url: {}", e)))
    }

    /// Builds authorization headers for API requests.
    fn auth_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.access_token))
                .map_err(|e| ProviderError::InvalidRequest(format!("invalid header: {}", e)))?,
        );
        Ok(headers)
    }

    /// Makes an authenticated GET request to the Gmail API.
    async fn get<R: DeserializeOwned>(&self, url: String) -> Result<R> {
        let mut request = HttpRequest::get(url);
        request.headers = self.auth_headers()?;

        let response = self.send_request(request).await?;
        self.handle_response(response)
    }

    /// Makes an authenticated POST request with a JSON body.
    async fn post(&self, url: String, body: serde_json::Value) -> Result<HttpResponse> {
        let mut request = HttpRequest::post(url).with_json(body);
        request.headers = self.auth_headers()?;

        let response = self.send_request(request).await?;
        if !response.is_success() {
            return Err(handle_error(response));
        }
        Ok(response)
    }

    async fn send_request(&self, request: HttpRequest) -> Result<HttpResponse> {
        tracing::debug!(method = ?request.method, url = %request.url, "Gmail API request");
        self.transport.execute(request).await
    }

    /// Handles API response, checking for errors.
    fn handle_response<R: DeserializeOwned>(&self, response: HttpResponse) -> Result<R> {
        if !response.is_success() {
            return Err(handle_error(response));
        }
        response.json()
    }

    async fn check_token(&self) -> Result<String> {
        let url = Url::parse_with_params(
            &self.endpoints.token_info_url,
            &[("access_token", self.access_token.as_str())],
        )
        .map_err(|e| ProviderError::InvalidRequest(format!("invalid url: {}", e)))?;

        // The token travels in the query string, so only the endpoint is logged.
        tracing::debug!(url = %self.endpoints.token_info_url, "Gmail token check");
        let response = self.transport.execute(HttpRequest::get(String::from(url))).await?;
        let info: TokenInfoResponse = self.handle_response(response)?;

        info.email
            .ok_or_else(|| ProviderError::InvalidResponse("tokeninfo without email".to_string()))
    }
}

impl<T> Clone for GmailClient<T> {
    fn clone(&self) -> Self {
        Self {
            access_token: self.access_token.clone(),
            endpoints: self.endpoints.clone(),
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<T> fmt::Debug for GmailClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GmailClient")
            .field("endpoints", &self.endpoints)
            .finish_non_exhaustive()
    }
}

/// Converts a failed response into a [`ProviderError`].
///
/// Only Gmail's structured envelope is normalized; anything else is reported
/// with its raw status and body.
fn handle_error(response: HttpResponse) -> ProviderError {
    match serde_json::from_slice::<ErrorEnvelope>(&response.body) {
        Ok(ErrorEnvelope { error }) => {
            tracing::warn!(
                status = response.status,
                code = ?error.code,
                message = %error.message,
                "Gmail API error"
            );
            ProviderError::Api {
                message: error.message,
                code: error.code,
                errors: error.errors,
            }
        }
        Err(_) => ProviderError::Status {
            status: response.status,
            body: response.text(),
        },
    }
}

/// Decodes base64url body data into text.
///
/// Accepts both alphabets and missing padding.
fn decode_body_data(data: &str) -> Result<String> {
    let normalized: String = data
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && *c != '=')
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            c => c,
        })
        .collect();

    let bytes = BASE64_URL_SAFE_NO_PAD
        .decode(normalized)
        .map_err(|e| ProviderError::InvalidResponse(format!("invalid body data: {}", e)))?;

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn decode_part(part: &GmailPart) -> Result<String> {
    match part.body.as_ref().and_then(|b| b.data.as_deref()) {
        Some(data) => decode_body_data(data),
        None => Ok(String::new()),
    }
}

/// Finds the body matching `mime_type`.
///
/// Looks at the payload itself, then its direct children, then the children
/// of the first `multipart/related` child. Nothing deeper is searched.
fn extract_body(message: &GmailMessage, mime_type: MimeType) -> Result<MessageBody> {
    let wanted = mime_type.as_str();
    let payload = message
        .payload
        .as_ref()
        .ok_or(ProviderError::ContentNotFound(mime_type))?;

    if payload.body.is_some() && payload.is(wanted) {
        return decode_part(payload);
    }

    if let Some(parts) = &payload.parts {
        if let Some(part) = parts.iter().find(|p| p.is(wanted)) {
            return decode_part(part);
        }

        let nested = parts
            .iter()
            .find(|p| p.is(MULTIPART_RELATED))
            .and_then(|related| related.parts.as_ref());

        if let Some(part) = nested.and_then(|children| children.iter().find(|p| p.is(wanted))) {
            return decode_part(part);
        }
    }

    Err(ProviderError::ContentNotFound(mime_type))
}

/// Maps a message fetched with [`META_FIELDS`] to [`MessageMeta`].
fn map_meta(message: &GmailMessage) -> Result<MessageMeta> {
    let date = message
        .internal_date
        .as_deref()
        .and_then(|d| d.parse::<i64>().ok())
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .ok_or_else(|| {
            ProviderError::InvalidResponse(format!(
                "invalid internalDate: {:?}",
                message.internal_date
            ))
        })?;

    let headers = message
        .payload
        .as_ref()
        .and_then(|p| p.headers.as_deref())
        .unwrap_or_default();

    let header = |name: &str| {
        headers
            .iter()
            .find(|h| h.name == name)
            .map(|h| h.value.as_str())
    };

    Ok(MessageMeta {
        date,
        from: header("From").and_then(parse_address),
        subject: header("Subject").map(str::to_string),
    })
}

/// Parses an RFC 5322 address header value like `"Jane Doe" <jane@example.com>`.
///
/// RFC 2047 encoded words in the display name are decoded. Returns the first
/// mailbox; for a group, its first member.
pub fn parse_address(value: &str) -> Option<EmailAddress> {
    // mailparse expects a full "Key: value" header line
    let line = format!("From: {}\r\n", value);
    let list = match mailparse::parse_header(line.as_bytes())
        .and_then(|(header, _)| mailparse::addrparse_header(&header))
    {
        Ok(list) => list,
        Err(e) => {
            tracing::debug!(header = value, error = %e, "unparseable address header");
            return None;
        }
    };

    let single = list.iter().find_map(|addr| match addr {
        mailparse::MailAddr::Single(info) => Some(info.clone()),
        mailparse::MailAddr::Group(group) => group.addrs.first().cloned(),
    })?;

    Some(EmailAddress {
        name: single.display_name.filter(|n| !n.is_empty()),
        address: single.addr,
    })
}

/// Formats an address as an RFC 5322 header fragment.
///
/// A missing or blank display name yields the bare address.
///
/// # Errors
///
/// Returns [`ProviderError::InvalidRequest`] if the address is not a valid
/// mailbox.
pub fn format_address(address: &EmailAddress) -> Result<String> {
    mailbox(address).map(|m| m.to_string())
}

fn mailbox(address: &EmailAddress) -> Result<Mailbox> {
    let email = address.address.parse::<Address>().map_err(|e| {
        ProviderError::InvalidRequest(format!("invalid address {:?}: {}", address.address, e))
    })?;

    // Line breaks cannot be represented in a display name.
    let name = address
        .name
        .as_deref()
        .map(|n| n.replace(['\r', '\n'], " ").trim().to_string())
        .filter(|n| !n.is_empty());

    Ok(Mailbox::new(name, email))
}

/// Builds the RFC 5322 message submitted through `users.messages.send`.
fn build_raw_message(message: &OutgoingMessage) -> Result<Vec<u8>> {
    let email = Message::builder()
        .from(mailbox(&message.from)?)
        .to(mailbox(&message.to)?)
        .subject(message.subject.replace(['\r', '\n'], " "))
        .header(ContentType::TEXT_PLAIN)
        .body(message.body.clone())
        .map_err(|e| ProviderError::InvalidRequest(format!("failed to build message: {}", e)))?;

    Ok(email.formatted())
}

#[async_trait]
impl<T: HttpTransport> MailClient for GmailClient<T> {
    fn provider(&self) -> Provider {
        Provider::Gmail
    }

    async fn archive_message(&self, id: &MessageId) -> Result<()> {
        let url = self.user_url(&format!("/messages/{}/modify", id));
        self.post(url, json!({ "removeLabelIds": ["INBOX"] })).await?;

        tracing::info!(message_id = %id, "Message archived via Gmail API");
        Ok(())
    }

    async fn fetch_message_body(
        &self,
        id: &MessageId,
        mime_type: MimeType,
    ) -> Result<MessageBody> {
        let url =
            self.user_url_with_params(&format!("/messages/{}", id), &[("fields", BODY_FIELDS)])?;
        let message: GmailMessage = self.get(url).await?;
        extract_body(&message, mime_type)
    }

    async fn fetch_message_meta(&self, id: &MessageId) -> Result<MessageMeta> {
        let url =
            self.user_url_with_params(&format!("/messages/{}", id), &[("fields", META_FIELDS)])?;
        let message: GmailMessage = self.get(url).await?;
        map_meta(&message)
    }

    async fn get_server_time(&self) -> Result<DateTime<Utc>> {
        // The API root answers 404 without auth, which still carries a Date.
        let response = self
            .send_request(HttpRequest::get(self.endpoints.api_base.clone()))
            .await?;
        response.date()
    }

    async fn get_token_info(&self) -> TokenInfo {
        match self.check_token().await {
            Ok(email) => TokenInfo::Valid { email },
            Err(e) => {
                tracing::debug!(error = %e, "Gmail token rejected");
                TokenInfo::Invalid
            }
        }
    }

    async fn search(&self, query: &str) -> Result<Vec<MessageId>> {
        // TODO: follow nextPageToken once callers need more than the first page.
        let url =
            self.user_url_with_params("/messages", &[("q", query), ("fields", "messages/id")])?;
        let response: MessageListResponse = self.get(url).await?;

        Ok(response
            .messages
            .unwrap_or_default()
            .into_iter()
            .map(|m| MessageId::from(m.id))
            .collect())
    }

    async fn send(&self, message: &OutgoingMessage) -> Result<()> {
        let raw = build_raw_message(message)?;
        let payload = json!({ "raw": BASE64_URL_SAFE_NO_PAD.encode(raw) });

        let response = self.post(self.user_url("/messages/send"), payload).await?;

        let sent_id = response.json::<SentMessage>().ok().and_then(|m| m.id);
        tracing::info!(message_id = ?sent_id, "Message sent via Gmail API");
        Ok(())
    }
}
