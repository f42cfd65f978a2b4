use thiserror::Error;

#[derive(Error, Debug)]
pub enum MsgError {
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
    #[error("Malformed property stream name {name:?}: {reason}")]
    PropertyName { name: String, reason: String },
    #[error("Header block error: {0}")]
    Headers(#[from] mailparse::MailParseError),
}

pub type Result<S> = std::result::Result<S, MsgError>;
