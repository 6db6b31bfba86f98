//! Microsoft Graph (Outlook) client implementation.
//!
//! This module provides a [`MailClient`] implementation on top of the
//! Microsoft Graph v1.0 mail API.
//!
//! Unlike Gmail, Graph returns one flat `body` per message whose
//! `contentType` is either `text` or `html`; the rendering is chosen with the
//! `Prefer: outlook.body-content-type` request header. Addresses are already
//! structured. Sending is a two step operation: a draft is created, then the
//! draft's `send` action is invoked. A failure of the second step leaves the
//! draft in the mailbox.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
use super::{ErrorCode, MailClient, Provider, ProviderError, Result};
use crate::config::OutlookEndpoints;
use crate::domain::{
    EmailAddress, MessageBody, MessageId, MessageMeta, MimeType, OutgoingMessage, TokenInfo,
};

const PREFER: HeaderName = HeaderName::from_static("prefer");

/// Graph message resource, reduced to the selected fields.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphMessage {
    body: Option<ItemBody>,
    subject: Option<String>,
    from: Option<Recipient>,
    received_date_time: Option<String>,
}

/// Graph `itemBody`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemBody {
    content_type: Option<String>,
    content: Option<String>,
}

/// Graph `recipient`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Recipient {
    email_address: GraphEmailAddress,
}

/// Graph `emailAddress`.
#[derive(Debug, Deserialize)]
struct GraphEmailAddress {
    name: Option<String>,
    address: Option<String>,
}

impl GraphEmailAddress {
    /// A sender without an address has no domain counterpart.
    fn into_address(self) -> Option<EmailAddress> {
        let address = self.address.filter(|a| !a.is_empty())?;
        Some(EmailAddress {
            name: self.name,
            address,
        })
    }
}

/// Graph message collection.
#[derive(Debug, Deserialize)]
struct MessageCollection {
    value: Option<Vec<MessageRef>>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

/// Graph `user` resource, reduced to the principal name.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct User {
    user_principal_name: Option<String>,
}

/// Draft message body for `POST /me/messages`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct Draft<'a> {
    subject: &'a str,
    body: DraftBody<'a>,
    from: DraftRecipient<'a>,
    to_recipients: Vec<DraftRecipient<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct DraftBody<'a> {
    content_type: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct DraftRecipient<'a> {
    email_address: DraftAddress<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct DraftAddress<'a> {
    address: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

impl<'a> From<&'a EmailAddress> for DraftRecipient<'a> {
    fn from(addr: &'a EmailAddress) -> Self {
        DraftRecipient {
            email_address: DraftAddress {
                address: &addr.address,
                name: addr.name.as_deref(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreatedMessage {
    id: String,
}

/// Graph error envelope: `{"error": {"code", "message"}}`.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    code: Option<String>,
    #[serde(default)]
    message: String,
}

/// Microsoft Graph mail client.
///
/// Bound to one access token; cheap to clone.
pub struct OutlookClient<T = ReqwestTransport> {
    access_token: String,
    endpoints: OutlookEndpoints,
    transport: Arc<T>,
}

impl OutlookClient<ReqwestTransport> {
    /// Creates a client for the public Graph API.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self::with_transport(
            access_token,
            OutlookEndpoints::default(),
            Arc::new(ReqwestTransport::new()),
        )
    }
}

impl<T: HttpTransport> OutlookClient<T> {
    /// Creates a client with explicit endpoints and transport.
    pub fn with_transport(
        access_token: impl Into<String>,
        endpoints: OutlookEndpoints,
        transport: Arc<T>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            endpoints,
            transport,
        }
    }

    /// Returns the configured endpoints.
    pub fn endpoints(&self) -> &OutlookEndpoints {
        &self.endpoints
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoints.api_base, path)
    }

    fn auth_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.access_token))
                .map_err(|e| ProviderError::InvalidRequest(format!("invalid header: {}", e)))?,
        );
        Ok(headers)
    }

    async fn get<R: DeserializeOwned>(&self, url: String, extra: HeaderMap) -> Result<R> {
        let mut request = HttpRequest::get(url);
        request.headers = self.auth_headers()?;
        request.headers.extend(extra);

        let response = self.send_request(request).await?;
        self.handle_response(response)
    }

    async fn post(&self, url: String, body: Option<serde_json::Value>) -> Result<HttpResponse> {
        let mut request = HttpRequest::post(url);
        request.headers = self.auth_headers()?;
        request.body = body;

        let response = self.send_request(request).await?;
        if !response.is_success() {
            return Err(handle_error(response));
        }
        Ok(response)
    }

    async fn send_request(&self, request: HttpRequest) -> Result<HttpResponse> {
        tracing::debug!(method = ?request.method, url = %request.url, "Graph API request");
        self.transport.execute(request).await
    }

    fn handle_response<R: DeserializeOwned>(&self, response: HttpResponse) -> Result<R> {
        if !response.is_success() {
            return Err(handle_error(response));
        }
        response.json()
    }

    async fn check_token(&self) -> Result<String> {
        let user: User = self.get(self.url("/me"), HeaderMap::new()).await?;
        user.user_principal_name
            .ok_or_else(|| ProviderError::InvalidResponse("user without principal name".to_string()))
    }
}

impl<T> Clone for OutlookClient<T> {
    fn clone(&self) -> Self {
        Self {
            access_token: self.access_token.clone(),
            endpoints: self.endpoints.clone(),
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<T> fmt::Debug for OutlookClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutlookClient")
            .field("endpoints", &self.endpoints)
            .finish_non_exhaustive()
    }
}

/// Converts a failed response into a [`ProviderError`].
fn handle_error(response: HttpResponse) -> ProviderError {
    match serde_json::from_slice::<ErrorEnvelope>(&response.body) {
        Ok(ErrorEnvelope { error }) => {
            tracing::warn!(
                status = response.status,
                code = ?error.code,
                message = %error.message,
                "Graph API error"
            );
            ProviderError::Api {
                message: error.message,
                code: error.code.map(ErrorCode::Name),
                errors: Vec::new(),
            }
        }
        Err(_) => ProviderError::Status {
            status: response.status,
            body: response.text(),
        },
    }
}

/// Graph's name for a body rendering.
fn body_content_type(mime_type: MimeType) -> &'static str {
    match mime_type {
        MimeType::TextPlain => "text",
        MimeType::TextHtml => "html",
    }
}

fn extract_body(message: GraphMessage, mime_type: MimeType) -> Result<MessageBody> {
    let body = message
        .body
        .ok_or(ProviderError::ContentNotFound(mime_type))?;

    let matches = body
        .content_type
        .as_deref()
        .is_some_and(|ct| ct.eq_ignore_ascii_case(body_content_type(mime_type)));

    if !matches {
        return Err(ProviderError::ContentNotFound(mime_type));
    }
    Ok(body.content.unwrap_or_default())
}

fn map_meta(message: GraphMessage) -> Result<MessageMeta> {
    let received = message
        .received_date_time
        .as_deref()
        .ok_or_else(|| ProviderError::InvalidResponse("missing receivedDateTime".to_string()))?;

    let date = DateTime::parse_from_rfc3339(received)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| {
            ProviderError::InvalidResponse(format!("invalid receivedDateTime {:?}: {}", received, e))
        })?;

    Ok(MessageMeta {
        date,
        from: message.from.and_then(|r| r.email_address.into_address()),
        subject: message.subject,
    })
}

fn encode_draft(message: &OutgoingMessage) -> Result<serde_json::Value> {
    let draft = Draft {
        subject: &message.subject,
        body: DraftBody {
            content_type: "Text",
            content: &message.body,
        },
        from: DraftRecipient::from(&message.from),
        to_recipients: vec![DraftRecipient::from(&message.to)],
    };

    serde_json::to_value(&draft)
        .map_err(|e| ProviderError::InvalidRequest(format!("serialize draft: {}", e)))
}

#[async_trait]
impl<T: HttpTransport> MailClient for OutlookClient<T> {
    fn provider(&self) -> Provider {
        Provider::Outlook
    }

    async fn archive_message(&self, id: &MessageId) -> Result<()> {
        let url = self.url(&format!("/me/messages/{}/move", id));
        self.post(url, Some(json!({ "destinationId": "archive" })))
            .await?;

        tracing::info!(message_id = %id, "Message archived via Graph API");
        Ok(())
    }

    async fn fetch_message_body(
        &self,
        id: &MessageId,
        mime_type: MimeType,
    ) -> Result<MessageBody> {
        let url = self.url(&format!("/me/messages/{}?$select=body", id));

        let preference = format!("outlook.body-content-type=\"{}\"", body_content_type(mime_type));
        let mut extra = HeaderMap::new();
        extra.insert(
            PREFER,
            HeaderValue::from_str(&preference)
                .map_err(|e| ProviderError::InvalidRequest(format!("invalid header: {}", e)))?,
        );

        let message: GraphMessage = self.get(url, extra).await?;
        extract_body(message, mime_type)
    }

    async fn fetch_message_meta(&self, id: &MessageId) -> Result<MessageMeta> {
        let url = self.url(&format!(
            "/me/messages/{}?$select=subject,from,receivedDateTime",
            id
        ));
        let message: GraphMessage = self.get(url, HeaderMap::new()).await?;
        map_meta(message)
    }

    async fn get_server_time(&self) -> Result<DateTime<Utc>> {
        let response = self
            .send_request(HttpRequest::get(self.endpoints.api_base.clone()))
            .await?;
        response.date()
    }

    async fn get_token_info(&self) -> TokenInfo {
        match self.check_token().await {
            Ok(email) => TokenInfo::Valid { email },
            Err(e) => {
                tracing::debug!(error = %e, "Graph token rejected");
                TokenInfo::Invalid
            }
        }
    }

    async fn search(&self, query: &str) -> Result<Vec<MessageId>> {
        let quoted = format!("\"{}\"", query);
        let search: String = url::form_urlencoded::byte_serialize(quoted.as_bytes()).collect();
        let url = self.url(&format!(
            "/me/messages?$top={}&$select=id&$search={}",
            self.endpoints.search_page_size, search
        ));

        let collection: MessageCollection = self.get(url, HeaderMap::new()).await?;
        Ok(collection
            .value
            .unwrap_or_default()
            .into_iter()
            .map(|m| MessageId::from(m.id))
            .collect())
    }

    async fn send(&self, message: &OutgoingMessage) -> Result<()> {
        let draft = encode_draft(message)?;
        let response = self.post(self.url("/me/messages"), Some(draft)).await?;
        let created: CreatedMessage = response.json()?;

        let send_url = self.url(&format!("/me/messages/{}/send", created.id));
        if let Err(e) = self.post(send_url, None).await {
            tracing::warn!(draft_id = %created.id, error = %e, "draft created but not sent");
            return Err(e);
        }

        tracing::info!(draft_id = %created.id, "Message sent via Graph API");
        Ok(())
    }
}
