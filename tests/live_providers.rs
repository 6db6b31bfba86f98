//! Live tests against real provider accounts.
//!
//! Enabled with `--features live-provider-tests`. The token-free checks always
//! run; the mailbox scenario for a provider runs only when both
//! `WEBMAIL_<PROVIDER>_ADDRESS` and `WEBMAIL_<PROVIDER>_TOKEN` are set.

#![cfg(feature = "live-provider-tests")]

use std::time::Duration;

use anyhow::{ensure, Context};
use chrono::Utc;
use webmail::{create_client, EmailAddress, MailClient, MimeType, OutgoingMessage, TokenInfo};

const PROVIDERS: [&str; 2] = ["gmail", "outlook"];

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn account(provider: &str) -> Option<(String, String)> {
    let prefix = format!("WEBMAIL_{}", provider.to_uppercase());
    let address = std::env::var(format!("{}_ADDRESS", prefix)).ok()?;
    let token = std::env::var(format!("{}_TOKEN", prefix)).ok()?;
    Some((address, token))
}

#[tokio::test]
async fn server_time_is_close_to_local_time() -> anyhow::Result<()> {
    init_tracing();

    for provider in PROVIDERS {
        let client = create_client(provider, "x")?;
        let server = client.get_server_time().await?;
        let skew = (server - Utc::now()).num_seconds().abs();
        ensure!(skew < 5, "{} clock is {}s off", provider, skew);
    }
    Ok(())
}

#[tokio::test]
async fn garbage_token_is_invalid() -> anyhow::Result<()> {
    init_tracing();

    for provider in PROVIDERS {
        let client = create_client(provider, "x")?;
        assert_eq!(client.get_token_info().await, TokenInfo::Invalid);
    }
    Ok(())
}

#[tokio::test]
async fn mailbox_scenario() -> anyhow::Result<()> {
    init_tracing();

    for provider in PROVIDERS {
        let Some((address, token)) = account(provider) else {
            eprintln!("skipping {}: no account configured", provider);
            continue;
        };
        let client = create_client(provider, token)?;

        let info = client.get_token_info().await;
        assert_eq!(info.email(), Some(address.as_str()));

        let subject = uuid::Uuid::new_v4().simple().to_string();
        let body = format!("This is the body id: {}", uuid::Uuid::new_v4());

        client
            .send(&OutgoingMessage {
                from: EmailAddress::with_name(address.clone(), "Sender"),
                to: EmailAddress::with_name(address.clone(), "Receiver"),
                subject: subject.clone(),
                body: body.clone(),
            })
            .await
            .with_context(|| format!("{}: send", provider))?;

        // Search indexes catch up asynchronously.
        let mut ids = Vec::new();
        for _ in 0..30 {
            ids = client.search(&format!("subject:{}", subject)).await?;
            if !ids.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_secs(2)).await;
        }
        ensure!(ids.len() == 1, "{}: expected one hit, got {:?}", provider, ids);
        let id = &ids[0];

        let fetched = client.fetch_message_body(id, MimeType::TextPlain).await?;
        assert_eq!(fetched, body);

        let meta = client.fetch_message_meta(id).await?;
        let from = meta.from.context("sender missing")?;
        assert_eq!(from.address, address);
        assert_eq!(meta.subject.as_deref(), Some(subject.as_str()));
        if provider == "gmail" {
            assert_eq!(from.name.as_deref(), Some("Sender"));
        }

        client.archive_message(id).await?;
        if provider == "gmail" {
            // Graph assigns a new id on move, so only Gmail can archive twice.
            client.archive_message(id).await?;
        }
    }
    Ok(())
}
