//! Domain layer types.
//!
//! Provider-neutral value types shared by every mail client: identifiers,
//! addresses, message metadata, outgoing messages and token status.

mod message;
mod token;
mod types;

pub use message::{EmailAddress, MessageBody, MessageMeta, MimeType, OutgoingMessage};
pub use token::TokenInfo;
pub use types::MessageId;
