//! Client construction by provider name.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::transport::{HttpTransport, ReqwestTransport};
use super::{GmailClient, MailClient, OutlookClient, Provider, Result};
use crate::config::ClientSettings;
use crate::domain::{MessageBody, MessageId, MessageMeta, MimeType, OutgoingMessage, TokenInfo};

/// A mail client for any supported provider.
///
/// Returned by [`create_client`]; dispatches to the concrete client without
/// boxing.
pub enum Client<T = ReqwestTransport> {
    /// Gmail REST API client.
    Gmail(GmailClient<T>),
    /// Microsoft Graph client.
    Outlook(OutlookClient<T>),
}

impl<T> Clone for Client<T> {
    fn clone(&self) -> Self {
        match self {
            Client::Gmail(c) => Client::Gmail(c.clone()),
            Client::Outlook(c) => Client::Outlook(c.clone()),
        }
    }
}

impl<T> fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Client::Gmail(c) => f.debug_tuple("Gmail").field(c).finish(),
            Client::Outlook(c) => f.debug_tuple("Outlook").field(c).finish(),
        }
    }
}

/// Creates a client for `provider` ("gmail" or "outlook") bound to `access_token`.
///
/// # Errors
///
/// Returns [`ProviderError::UnsupportedProvider`](super::ProviderError::UnsupportedProvider)
/// for any other provider name. Uses [`ClientSettings::default`]; see
/// [`create_client_with`] to change endpoints or transport.
pub fn create_client(provider: &str, access_token: impl Into<String>) -> Result<Client> {
    let provider: Provider = provider.parse()?;
    let settings = ClientSettings::default();
    let transport = Arc::new(ReqwestTransport::with_settings(&settings.transport)?);

    Ok(Client::new(provider, access_token, &settings, transport))
}

/// Creates a client with explicit settings and transport.
pub fn create_client_with<T: HttpTransport>(
    provider: &str,
    access_token: impl Into<String>,
    settings: &ClientSettings,
    transport: Arc<T>,
) -> Result<Client<T>> {
    let provider: Provider = provider.parse()?;
    Ok(Client::new(provider, access_token, settings, transport))
}

impl<T: HttpTransport> Client<T> {
    /// Builds the client for an already resolved provider.
    pub fn new(
        provider: Provider,
        access_token: impl Into<String>,
        settings: &ClientSettings,
        transport: Arc<T>,
    ) -> Self {
        tracing::debug!(%provider, "creating mail client");
        match provider {
            Provider::Gmail => Client::Gmail(GmailClient::with_transport(
                access_token,
                settings.gmail.clone(),
                transport,
            )),
            Provider::Outlook => Client::Outlook(OutlookClient::with_transport(
                access_token,
                settings.outlook.clone(),
                transport,
            )),
        }
    }
}

#[async_trait]
impl<T: HttpTransport> MailClient for Client<T> {
    fn provider(&self) -> Provider {
        match self {
            Client::Gmail(c) => c.provider(),
            Client::Outlook(c) => c.provider(),
        }
    }

    async fn archive_message(&self, id: &MessageId) -> Result<()> {
        match self {
            Client::Gmail(c) => c.archive_message(id).await,
            Client::Outlook(c) => c.archive_message(id).await,
        }
    }

    async fn fetch_message_body(
        &self,
        id: &MessageId,
        mime_type: MimeType,
    ) -> Result<MessageBody> {
        match self {
            Client::Gmail(c) => c.fetch_message_body(id, mime_type).await,
            Client::Outlook(c) => c.fetch_message_body(id, mime_type).await,
        }
    }

    async fn fetch_message_meta(&self, id: &MessageId) -> Result<MessageMeta> {
        match self {
            Client::Gmail(c) => c.fetch_message_meta(id).await,
            Client::Outlook(c) => c.fetch_message_meta(id).await,
        }
    }

    async fn get_server_time(&self) -> Result<DateTime<Utc>> {
        match self {
            Client::Gmail(c) => c.get_server_time().await,
            Client::Outlook(c) => c.get_server_time().await,
        }
    }

    async fn get_token_info(&self) -> TokenInfo {
        match self {
            Client::Gmail(c) => c.get_token_info().await,
            Client::Outlook(c) => c.get_token_info().await,
        }
    }

    async fn search(&self, query: &str) -> Result<Vec<MessageId>> {
        match self {
            Client::Gmail(c) => c.search(query).await,
            Client::Outlook(c) => c.search(query).await,
        }
    }

    async fn send(&self, message: &OutgoingMessage) -> Result<()> {
        match self {
            Client::Gmail(c) => c.send(message).await,
            Client::Outlook(c) => c.send(message).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::transport::testing::*;
    use crate::providers::transport::MockHttpTransport;
    use crate::providers::ProviderError;

    #[test]
    fn create_client_selects_provider() {
        let gmail = create_client("gmail", "token").unwrap();
        assert_eq!(gmail.provider(), Provider::Gmail);
        assert!(matches!(gmail, Client::Gmail(_)));

        let outlook = create_client("outlook", "token").unwrap();
        assert_eq!(outlook.provider(), Provider::Outlook);
    }

    #[test]
    fn create_client_rejects_unknown_provider() {
        let err = create_client("yahoo", "token").unwrap_err();
        assert!(matches!(err, ProviderError::UnsupportedProvider(ref p) if p == "yahoo"));
    }

    #[test]
    fn client_debug_hides_token() {
        let client = create_client("outlook", "secret-token").unwrap();
        assert!(!format!("{:?}", client).contains("secret-token"));
    }

    #[tokio::test]
    async fn settings_route_requests() {
        let mut settings = ClientSettings::default();
        settings.outlook.api_base = "http://localhost:8080/graph".to_string();
        settings.outlook.search_page_size = 5;

        let mut mock = MockHttpTransport::new();
        mock.expect_execute()
            .times(1)
            .withf(|req| {
                req.url.starts_with("http://localhost:8080/graph/me/messages?$top=5&")
            })
            .returning(|_| Ok(json_response(200, serde_json::json!({ "value": [] }))));

        let client = create_client_with("outlook", "t", &settings, Arc::new(mock)).unwrap();
        assert!(client.search("anything").await.unwrap().is_empty());
    }
}
