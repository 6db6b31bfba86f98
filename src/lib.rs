//! webmail - one mailbox API over Gmail and Outlook
//!
//! This crate exposes a single [`MailClient`] contract for common mailbox
//! operations (fetch, search, send, archive, token and clock checks) and
//! translates it to the Gmail REST API or the Microsoft Graph mail API.
//!
//! ```no_run
//! use webmail::{create_client, EmailAddress, MailClient, OutgoingMessage};
//!
//! # async fn example() -> webmail::Result<()> {
//! let client = create_client("outlook", "eyJ0eXAi...")?;
//!
//! if client.get_token_info().await.is_valid() {
//!     client
//!         .send(&OutgoingMessage {
//!             from: EmailAddress::with_name("me@outlook.com", "Me"),
//!             to: EmailAddress::new("you@example.com"),
//!             subject: "Hello".to_string(),
//!             body: "Hi there".to_string(),
//!         })
//!         .await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod domain;
pub mod providers;

pub use config::ClientSettings;
pub use domain::{
    EmailAddress, MessageBody, MessageId, MessageMeta, MimeType, OutgoingMessage, TokenInfo,
};
pub use providers::{
    create_client, create_client_with, Client, GmailClient, HttpRequest, HttpResponse,
    HttpTransport, MailClient, Method, OutlookClient, Provider, ProviderError, ReqwestTransport,
    Result,
};
