//! Webmail provider implementations.
//!
//! This module contains the [`MailClient`] trait and its implementations:
//!
//! - [`GmailClient`] - Gmail REST API v1
//! - [`OutlookClient`] - Microsoft Graph v1.0
//!
//! # Architecture
//!
//! Each client translates between its provider's wire format and the shared
//! domain types:
//!
//! - addresses (RFC 5322 header strings vs. structured objects)
//! - message bodies (MIME part tree vs. a single typed body)
//! - metadata (raw headers vs. direct fields)
//! - error envelopes
//!
//! HTTP goes through an injected [`HttpTransport`]; [`ReqwestTransport`] is
//! the default. [`create_client`] picks a client by provider name.

mod factory;
mod gmail;
mod outlook;
mod traits;
mod transport;

pub use factory::{create_client, create_client_with, Client};
pub use gmail::{format_address, parse_address, GmailClient};
pub use outlook::OutlookClient;
pub use traits::{ApiSubError, ErrorCode, MailClient, Provider, ProviderError, Result};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Method, ReqwestTransport};
