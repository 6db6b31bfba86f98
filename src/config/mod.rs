//! Client configuration.
//!
//! Endpoint roots and transport options. Defaults point at the public
//! provider APIs.

mod settings;

pub use settings::{ClientSettings, GmailEndpoints, OutlookEndpoints, TransportSettings};
