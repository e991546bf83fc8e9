use thiserror::Error;

pub mod codes;
pub mod decoder;
pub mod driver;
pub mod framer;
pub mod message;
pub mod structs;
pub mod tracker;

pub use codes::CodeRegistry;
pub use driver::PublishDriver;
pub use framer::{LineSource, TelegramFramer};
pub use message::{MessageAssembler, OutboundMessage};
pub use structs::{CodeEntry, Reading, Telegram, TypedValue, ValueKind};
pub use tracker::ChangeTracker;

#[derive(Error, Debug)]
pub enum P1Error {
    #[error("Invalid data line: {0}")]
    InvalidDataLine(String),
    #[error("Invalid {kind:?} value '{value}'")]
    InvalidValue { kind: ValueKind, value: String },
    #[error("Invalid code registry: {0}")]
    InvalidRegistry(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Line source closed")]
    SourceClosed,
    #[error("Publish failed: {0}")]
    Publish(String),
    #[error("Unable to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Anything that can take a finished message off our hands without waiting
/// for the broker.
pub trait Publisher {
    fn publish(&mut self, message: OutboundMessage) -> Result<(), P1Error>;
}
