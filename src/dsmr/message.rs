use super::{structs::{Reading, TypedValue, ValueKind}, tracker::ChangeTracker, P1Error};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub topic: String,
    pub payload: String,
}

#[derive(Serialize)]
struct Payload<'a> {
    value: &'a TypedValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    time: Option<&'a str>,
}

pub struct MessageAssembler {
    base_topic: String,
}

impl MessageAssembler {
    /// `base_topic` is prepended as is, so it should carry its own trailing `/`.
    pub fn new(base_topic: &str) -> Self {
        Self { base_topic: base_topic.to_string() }
    }

    pub fn assemble(&self, reading: &Reading, tracker: &ChangeTracker) -> Result<OutboundMessage, P1Error> {
        let payload = Payload {
            value: &reading.value,
            time: match reading.kind {
                ValueKind::Timestamp => None,
                _ => Some(tracker.last_timestamp()),
            },
        };

        Ok(OutboundMessage {
            topic: format!("{}{}", self.base_topic, reading.topic),
            payload: serde_json::to_string(&payload)?,
        })
    }
}
