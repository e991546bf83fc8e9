use serde::Serialize;

/// One complete P1 transmission without its checksum line.
pub type Telegram = Vec<String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Timestamp,
    Energy,
    Power,
    Voltage,
    Boolean,
    Opaque,
}

impl ValueKind {
    /// Live measurements are republished on every telegram.
    pub fn is_live(&self) -> bool {
        matches!(self, ValueKind::Power | ValueKind::Voltage)
    }

    /// Length of the unit suffix (`*kWh`, `*kW`, `*V`) behind numeric values.
    pub fn unit_suffix_len(&self) -> Option<usize> {
        match self {
            ValueKind::Energy => Some(4),
            ValueKind::Power => Some(3),
            ValueKind::Voltage => Some(2),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CodeEntry {
    pub identifier: String,
    pub topic: String,
    pub kind: ValueKind,
}

impl CodeEntry {
    pub fn new(identifier: &str, topic: &str, kind: ValueKind) -> Self {
        Self {
            identifier: identifier.to_string(),
            topic: topic.to_string(),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TypedValue {
    Number(f64),
    Text(String),
    Timestamp(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub topic: String,
    pub kind: ValueKind,
    pub value: TypedValue,
}
