//! Reads Outlook Email Message (.msg) files into a structured [`Message`].
//!
//! A .msg file is a compound file whose message storage holds one stream per
//! property. Each stream name encodes a tag and a wire type; the bytes are
//! decoded by wire type and routed by tag into [`Message`] fields, and every
//! property also lands in [`Message::properties`].
//!
//! ```no_run
//! use msg_extract::Message;
//!
//! let message = Message::from_path("sample.msg")?;
//! println!("Subject: {:?}", message.subject);
//! for (name, values) in message.parse_headers()?.iter() {
//!     println!("{name}: {values:?}");
//! }
//! # Ok::<(), msg_extract::MsgError>(())
//! ```

mod error;
pub mod headers;
mod message;
mod options;
pub mod property;
mod reader;
pub mod time;
mod value;

pub use error::{MsgError, Result};
pub use headers::Headers;
pub use message::{Mailbox, Message, MessageBuilder, Recipient, RecipientKind, build_message};
pub use options::{DecodeOptions, TimestampPolicy};
pub use property::{MessageProperty, PropertyId};
pub use reader::{Attachment, MsgReader};
pub use value::{PropertyValue, decode_narrow, decode_wide};
