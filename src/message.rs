//! The message record and the router that fills it from decoded properties.

use std::{
    collections::HashMap,
    io::{self, Read},
};

use chrono::{DateTime, FixedOffset};
use compressed_rtf::decompress_rtf;
use tracing::{debug, trace, warn};

use crate::{
    error::Result,
    headers::Headers,
    options::{DecodeOptions, TimestampPolicy},
    property::{MessageProperty, PT_BINARY, PropertyId},
    time::parse_text_timestamp,
    value::{PropertyValue, decode_narrow},
};

/// Tags looked up once the pass is over, for fields no routed tag filled.
mod fallback {
    pub const SENDER_EMAIL_ADDRESS: u16 = 0x0C1F;
    pub const SENDER_SMTP_ADDRESS: u16 = 0x5D01;
    pub const SENT_REPRESENTING_EMAIL_ADDRESS: u16 = 0x0065;
    pub const SENDER_NAME: u16 = 0x0C1A;
}

/// An address with its display name. Either half may be missing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Mailbox {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl Mailbox {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Recipient {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecipientKind {
    To,
    Cc,
    Bcc,
    Unknown,
}

/// Everything extracted from one message storage.
///
/// Fields a property never filled (or whose value failed to decode) stay
/// `None`. `properties` holds the text form of the last value seen for every
/// tag, routed or not.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Message {
    pub message_class: Option<String>,
    pub message_id: Option<String>,
    pub subject: Option<String>,
    pub from: Mailbox,
    pub to: Mailbox,
    pub reply_to: Mailbox,
    pub display_to: Option<String>,
    pub display_cc: Option<String>,
    pub display_bcc: Option<String>,
    pub body_text: Option<String>,
    pub body_rtf: Option<String>,
    pub body_html: Option<String>,
    /// HTML rendered from the RTF body. No property feeds it; left for
    /// callers that convert RTF themselves.
    pub converted_body_html: Option<String>,
    pub headers: Option<String>,
    pub date: Option<DateTime<FixedOffset>>,
    pub client_submit_time: Option<DateTime<FixedOffset>>,
    pub creation_date: Option<DateTime<FixedOffset>>,
    pub last_modification_date: Option<DateTime<FixedOffset>>,
    pub properties: HashMap<u16, String>,
}

impl Message {
    /// Splits the raw transport headers into a multi-valued map.
    pub fn parse_headers(&self) -> Result<Headers> {
        Headers::parse(self.headers.as_deref().unwrap_or_default())
    }

    /// Text form of the last value seen for `tag`.
    pub fn property(&self, tag: u16) -> Option<&str> {
        self.properties.get(&tag).map(String::as_str)
    }

    /// Places a recipient in To, Cc or Bcc by matching its display name
    /// against the display lists.
    pub fn recipient_kind(&self, recipient: &Recipient) -> RecipientKind {
        let Some(name) = recipient.name.as_deref().map(str::trim) else {
            return RecipientKind::Unknown;
        };
        let listed = |list: &Option<String>| {
            list.as_deref()
                .is_some_and(|l| l.split(';').any(|n| n.trim() == name))
        };
        if listed(&self.display_to) {
            RecipientKind::To
        } else if listed(&self.display_cc) {
            RecipientKind::Cc
        } else if listed(&self.display_bcc) {
            RecipientKind::Bcc
        } else {
            RecipientKind::Unknown
        }
    }
}

/// Where a tag's value lands in [`Message`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Field {
    MessageClass,
    MessageId,
    Subject,
    FromEmail,
    /// Other sender address tags; recognized but not written.
    FromEmailAlias,
    FromName,
    ToEmail,
    ToName,
    DisplayTo,
    DisplayCc,
    DisplayBcc,
    BodyHtml,
    BodyText,
    BodyRtf,
    Headers,
    CreationDate,
    LastModificationDate,
    ClientSubmitTime,
}

impl Field {
    fn for_tag(tag: u16) -> Option<Self> {
        Some(match tag {
            0x001A => Self::MessageClass,
            0x1035 => Self::MessageId,
            0x0037 | 0x0E1D => Self::Subject,
            0x8008 => Self::FromEmail,
            0x0C1F | 0x0065 | 0x3FFA | 0x800D => Self::FromEmailAlias,
            0x0042 => Self::FromName,
            0x0076 | 0x8000 => Self::ToEmail,
            0x3001 => Self::ToName,
            0x0E04 => Self::DisplayTo,
            0x0E03 => Self::DisplayCc,
            0x0E02 => Self::DisplayBcc,
            0x1013 => Self::BodyHtml,
            0x1000 => Self::BodyText,
            0x1009 => Self::BodyRtf,
            0x007D => Self::Headers,
            0x3007 => Self::CreationDate,
            0x3008 => Self::LastModificationDate,
            0x0039 => Self::ClientSubmitTime,
            _ => return None,
        })
    }
}

/// Assembles a [`Message`] one property at a time, in enumeration order.
#[derive(Debug, Default)]
pub struct MessageBuilder {
    message: Message,
    values: HashMap<u16, PropertyValue>,
    options: DecodeOptions,
}

impl MessageBuilder {
    pub fn new(options: DecodeOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Reads one named stream of `len` bytes and routes it.
    ///
    /// Streams that are not property streams are ignored, and streams with a
    /// malformed name are skipped with a warning. Only read failures are
    /// errors.
    pub fn push_stream<R: Read>(&mut self, name: &str, source: R, len: u64) -> io::Result<()> {
        let id = match PropertyId::from_stream_name(name) {
            Ok(Some(id)) => id,
            Ok(None) => return Ok(()),
            Err(e) => {
                warn!("Skipping stream: {e}");
                return Ok(());
            }
        };
        let mut data = Vec::with_capacity(usize::try_from(len).unwrap_or(0).min(1 << 20));
        source.take(len).read_to_end(&mut data)?;
        self.push(MessageProperty { id, data });
        Ok(())
    }

    /// Decodes a property, writes it to its field (if its tag is routed) and
    /// records it in the property table.
    pub fn push(&mut self, property: MessageProperty) {
        let MessageProperty { id, data } = property;
        let value = PropertyValue::decode(id.wire_type, &data, self.options.narrow_charset);
        if let PropertyValue::Unsupported(marker) = &value {
            trace!(property = %id, %marker, "Property left undecoded");
        }
        let text = value.to_string();
        if let Some(field) = Field::for_tag(id.tag) {
            debug!(property = %id, ?field, "Routing property");
            self.apply(field, id, &data, &value, &text);
        }
        self.message.properties.insert(id.tag, text);
        self.values.insert(id.tag, value);
    }

    /// The last decoded value seen for `tag`.
    pub fn value(&self, tag: u16) -> Option<&PropertyValue> {
        self.values.get(&tag)
    }

    pub fn text(&self, tag: u16) -> Option<&str> {
        self.value(tag).and_then(PropertyValue::as_text)
    }

    /// The message as routed so far, before any fallbacks.
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// Fills still-empty sender and date fields from secondary properties
    /// and the transport headers, and hands the message over.
    pub fn finish(mut self) -> Message {
        if self.message.from.email.is_none() {
            self.message.from.email = [
                fallback::SENDER_EMAIL_ADDRESS,
                fallback::SENDER_SMTP_ADDRESS,
                fallback::SENT_REPRESENTING_EMAIL_ADDRESS,
            ]
            .into_iter()
            .find_map(|tag| non_empty(self.text(tag)));
        }
        if self.message.from.name.is_none() {
            self.message.from.name = non_empty(self.text(fallback::SENDER_NAME));
        }
        if self.message.date.is_none() || self.message.reply_to.is_empty() {
            self.apply_transport_headers();
        }
        self.message
    }

    fn apply_transport_headers(&mut self) {
        let headers = match self.message.parse_headers() {
            Ok(headers) => headers,
            Err(e) => {
                debug!("Transport headers unusable: {e}");
                return;
            }
        };
        if self.message.date.is_none() {
            self.message.date = headers.get("Date").and_then(|date| {
                parse_text_timestamp(date).or_else(|| DateTime::parse_from_rfc2822(date).ok())
            });
        }
        if self.message.reply_to.is_empty() {
            if let Some(reply_to) = headers.get("Reply-To").and_then(first_mailbox) {
                self.message.reply_to = reply_to;
            }
        }
    }

    fn apply(
        &mut self,
        field: Field,
        id: PropertyId,
        data: &[u8],
        value: &PropertyValue,
        text: &str,
    ) {
        let message = &mut self.message;
        let owned = || Some(text.to_string());
        match field {
            Field::MessageClass => message.message_class = owned(),
            Field::MessageId => message.message_id = owned(),
            Field::Subject => message.subject = owned(),
            Field::FromEmail => message.from.email = owned(),
            Field::FromEmailAlias => {}
            Field::FromName => message.from.name = owned(),
            Field::ToEmail => message.to.email = owned(),
            Field::ToName => message.to.name = owned(),
            Field::DisplayTo => message.display_to = owned(),
            Field::DisplayCc => message.display_cc = owned(),
            Field::DisplayBcc => message.display_bcc = owned(),
            Field::BodyText => message.body_text = owned(),
            Field::Headers => message.headers = owned(),
            Field::BodyHtml if id.wire_type == PT_BINARY => {
                message.body_html = Some(
                    String::from_utf8(data.to_vec())
                        .unwrap_or_else(|_| decode_narrow(data, self.options.narrow_charset)),
                );
            }
            Field::BodyHtml => message.body_html = owned(),
            Field::BodyRtf if id.wire_type == PT_BINARY => {
                message.body_rtf = match decompress_rtf(data) {
                    Ok(rtf) => Some(rtf),
                    Err(_) => {
                        warn!(property = %id, "Could not decompress RTF body");
                        owned()
                    }
                };
            }
            Field::BodyRtf => message.body_rtf = owned(),
            Field::CreationDate => {
                message.creation_date = resolve_date(self.options.timestamp_policy, value)
            }
            Field::LastModificationDate => {
                message.last_modification_date = resolve_date(self.options.timestamp_policy, value)
            }
            Field::ClientSubmitTime => {
                message.client_submit_time = resolve_date(self.options.timestamp_policy, value)
            }
        }
    }
}

fn resolve_date(policy: TimestampPolicy, value: &PropertyValue) -> Option<DateTime<FixedOffset>> {
    match (policy, value) {
        (TimestampPolicy::ByWireType, PropertyValue::Timestamp(ts)) => Some(ts.fixed_offset()),
        _ => parse_text_timestamp(&value.to_string()),
    }
}

fn non_empty(text: Option<&str>) -> Option<String> {
    text.map(|t| t.trim_end_matches('\0').trim())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

fn first_mailbox(header: &str) -> Option<Mailbox> {
    let addresses = mailparse::addrparse(header).ok()?;
    addresses.iter().find_map(|addr| match addr {
        mailparse::MailAddr::Single(info) => Some(Mailbox {
            name: info.display_name.clone(),
            email: Some(info.addr.clone()),
        }),
        mailparse::MailAddr::Group(group) => group.addrs.first().map(|info| Mailbox {
            name: info.display_name.clone(),
            email: Some(info.addr.clone()),
        }),
    })
}

/// Builds a message from `(name, len, source)` stream entries, in order.
pub fn build_message<I, R>(streams: I, options: DecodeOptions) -> io::Result<Message>
where
    I: IntoIterator<Item = (String, u64, R)>,
    R: Read,
{
    let mut builder = MessageBuilder::new(options);
    for (name, len, source) in streams {
        builder.push_stream(&name, source, len)?;
    }
    Ok(builder.finish())
}
