use std::{
    fmt::Debug,
    fs::File,
    io::{Read, Seek},
    path::{Path, PathBuf},
};

use cfb::CompoundFile;
use tracing::debug;

use crate::{
    error::Result,
    message::{Message, MessageBuilder, Recipient},
    options::DecodeOptions,
    property::{MessageProperty, PT_BINARY, PT_OBJECT, PropertyId},
};

const RECIPIENT_STORAGE_PREFIX: &str = "__recip_version1.0_";
const ATTACHMENT_STORAGE_PREFIX: &str = "__attach_version1.0_";

const PR_DISPLAY_NAME: u16 = 0x3001;
const PR_EMAIL_ADDRESS: u16 = 0x3003;
const PR_SMTP_ADDRESS: u16 = 0x39FE;
const PR_ATTACH_DATA: u16 = 0x3701;
const PR_ATTACH_FILENAME: u16 = 0x3704;
const PR_ATTACH_LONG_FILENAME: u16 = 0x3707;

pub struct MsgReader<'c, 'p, F> {
    inner: &'c mut CompoundFile<F>,
    path: &'p Path,
    options: DecodeOptions,
}

pub struct Attachment {
    pub name: String,
    pub data: Vec<u8>,
}

impl Debug for Attachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attachment")
            .field("name", &self.name)
            .field("data", &self.data.len())
            .finish()
    }
}

struct Child {
    name: String,
    path: PathBuf,
    len: u64,
    is_storage: bool,
}

impl<'c, 'p, F> MsgReader<'c, 'p, F>
where
    F: Read + Seek,
{
    /// Reads the message stored at `path` (`/` for the top-level message).
    pub fn new(inner: &'c mut CompoundFile<F>, path: &'p Path) -> Self {
        Self {
            inner,
            path,
            options: DecodeOptions::default(),
        }
    }

    pub fn with_options(mut self, options: DecodeOptions) -> Self {
        self.options = options;
        self
    }

    fn children(&mut self, path: &Path) -> Result<Vec<Child>> {
        Ok(self
            .inner
            .read_storage(path)?
            .map(|e| Child {
                name: e.name().to_string(),
                path: e.path().to_owned(),
                len: e.len(),
                is_storage: e.is_storage(),
            })
            .collect())
    }

    fn storages_with_prefix(&mut self, prefix: &str) -> Result<Vec<PathBuf>> {
        Ok(self
            .children(self.path)?
            .into_iter()
            .filter(|c| c.is_storage && c.name.starts_with(prefix))
            .map(|c| c.path)
            .collect())
    }

    fn push_child(&mut self, builder: &mut MessageBuilder, child: &Child) -> Result<()> {
        let stream = self.inner.open_stream(&child.path)?;
        builder.push_stream(&child.name, stream, child.len)?;
        Ok(())
    }

    /// Runs every property stream directly under `storage` through `builder`.
    fn push_storage(&mut self, builder: &mut MessageBuilder, storage: &Path) -> Result<()> {
        for child in self.children(storage)? {
            if !child.is_storage {
                self.push_child(builder, &child)?;
            }
        }
        Ok(())
    }

    /// Decodes the message's properties, and those of its recipient
    /// storages, in container order.
    ///
    /// Attachment storages and the named-property map are not part of the
    /// pass. Recipient properties share the tag space of the message, so a
    /// recipient tag (`0x3001`, `0x3002`, `0x0FFF`...) replaces any
    /// message-level entry for that tag in [`Message::properties`].
    pub fn message(&mut self) -> Result<Message> {
        let mut builder = MessageBuilder::new(self.options);
        for child in self.children(self.path)? {
            if !child.is_storage {
                self.push_child(&mut builder, &child)?;
            } else if child.name.starts_with(RECIPIENT_STORAGE_PREFIX) {
                self.push_storage(&mut builder, &child.path)?;
            } else {
                debug!(storage = %child.path.display(), "Not part of the message pass");
            }
        }
        Ok(builder.finish())
    }

    pub fn recipients(&mut self) -> Result<Vec<Recipient>> {
        let mut recipients = vec![];
        for storage in self.storages_with_prefix(RECIPIENT_STORAGE_PREFIX)? {
            let mut builder = MessageBuilder::new(self.options);
            self.push_storage(&mut builder, &storage)?;
            recipients.push(Recipient {
                name: builder.text(PR_DISPLAY_NAME).map(str::to_string),
                email: builder
                    .text(PR_SMTP_ADDRESS)
                    .or_else(|| builder.text(PR_EMAIL_ADDRESS))
                    .map(str::to_string),
            });
        }
        Ok(recipients)
    }

    /// Attachments carrying file data. Attached messages are listed by
    /// [`MsgReader::embedded_messages`] instead.
    pub fn attachments(&mut self) -> Result<Vec<Attachment>> {
        let mut attachments = vec![];
        for storage in self.storages_with_prefix(ATTACHMENT_STORAGE_PREFIX)? {
            let mut builder = MessageBuilder::new(self.options);
            let mut data = None;
            for child in self.children(&storage)? {
                if child.is_storage {
                    continue;
                }
                match PropertyId::from_stream_name(&child.name) {
                    Ok(Some(id)) if id == PropertyId::new(PR_ATTACH_DATA, PT_BINARY) => {
                        let mut buf = vec![];
                        self.inner
                            .open_stream(&child.path)?
                            .take(child.len)
                            .read_to_end(&mut buf)?;
                        data = Some(buf);
                    }
                    _ => self.push_child(&mut builder, &child)?,
                }
            }
            let Some(data) = data else {
                debug!(storage = %storage.display(), "Attachment has no file data");
                continue;
            };
            let name = [PR_ATTACH_LONG_FILENAME, PR_ATTACH_FILENAME, PR_DISPLAY_NAME]
                .into_iter()
                .find_map(|tag| builder.text(tag).filter(|n| !n.is_empty()))
                .unwrap_or("attachment")
                .to_string();
            attachments.push(Attachment { name, data });
        }
        Ok(attachments)
    }

    /// Storage paths of attached messages, each readable with its own
    /// [`MsgReader`].
    pub fn embedded_messages(&mut self) -> Result<Vec<PathBuf>> {
        let embedded = PropertyId::new(PR_ATTACH_DATA, PT_OBJECT).stream_name();
        let res = self
            .storages_with_prefix(ATTACHMENT_STORAGE_PREFIX)?
            .into_iter()
            .map(|a| a.join(&embedded))
            .filter(|a| self.inner.is_storage(a))
            .collect();
        Ok(res)
    }

    /// Raw bytes of one property stream of this message.
    pub fn raw_property(&mut self, tag: u16, wire_type: u16) -> Result<MessageProperty> {
        let id = PropertyId::new(tag, wire_type);
        let mut data = vec![];
        self.inner
            .open_stream(self.path.join(id.stream_name()))?
            .read_to_end(&mut data)?;
        Ok(MessageProperty { id, data })
    }
}

impl Message {
    /// Opens a .msg file and decodes its top-level message.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_reader(File::open(path)?)
    }

    /// Decodes the top-level message of a compound file held by `inner`.
    pub fn from_reader<F: Read + Seek>(inner: F) -> Result<Self> {
        Self::from_reader_with(inner, DecodeOptions::default())
    }

    pub fn from_reader_with<F: Read + Seek>(inner: F, options: DecodeOptions) -> Result<Self> {
        let mut compound_file = CompoundFile::open(inner)?;
        MsgReader::new(&mut compound_file, Path::new("/"))
            .with_options(options)
            .message()
    }
}
