use super::{structs::{CodeEntry, ValueKind}, P1Error};
use std::collections::HashSet;

/// Ordered allow-list of the OBIS codes we forward.
#[derive(Debug, Clone)]
pub struct CodeRegistry {
    entries: Vec<CodeEntry>,
}

pub fn get_dsmr_codes() -> Vec<CodeEntry> {
    vec![
        // Telegram timestamp
        CodeEntry::new("0-0:1.0.0", "timestamp", ValueKind::Timestamp),

        // Meter readings per tariff
        CodeEntry::new("1-0:1.8.1", "electricity_delivered_1", ValueKind::Energy),
        CodeEntry::new("1-0:1.8.2", "electricity_delivered_2", ValueKind::Energy),
        CodeEntry::new("1-0:2.8.1", "electricity_returned_1", ValueKind::Energy),
        CodeEntry::new("1-0:2.8.2", "electricity_returned_2", ValueKind::Energy),
        CodeEntry::new("0-0:96.14.0", "tariff_indicator", ValueKind::Boolean),

        // Actual power
        CodeEntry::new("1-0:1.7.0", "electricity_currently_delivered", ValueKind::Power),
        CodeEntry::new("1-0:2.7.0", "electricity_currently_returned", ValueKind::Power),
        CodeEntry::new("1-0:21.7.0", "phase_currently_delivered_l1", ValueKind::Power),
        CodeEntry::new("1-0:41.7.0", "phase_currently_delivered_l2", ValueKind::Power),
        CodeEntry::new("1-0:61.7.0", "phase_currently_delivered_l3", ValueKind::Power),
        CodeEntry::new("1-0:22.7.0", "phase_currently_returned_l1", ValueKind::Power),
        CodeEntry::new("1-0:42.7.0", "phase_currently_returned_l2", ValueKind::Power),
        CodeEntry::new("1-0:62.7.0", "phase_currently_returned_l3", ValueKind::Power),

        // Instantaneous voltage
        CodeEntry::new("1-0:32.7.0", "phase_voltage_l1", ValueKind::Voltage),
        CodeEntry::new("1-0:52.7.0", "phase_voltage_l2", ValueKind::Voltage),
        CodeEntry::new("1-0:72.7.0", "phase_voltage_l3", ValueKind::Voltage),
    ]
}

fn validate_entries(entries: &[CodeEntry]) -> Result<(), P1Error> {
    let mut topics = HashSet::new();

    for (i, entry) in entries.iter().enumerate() {
        if entry.identifier.is_empty() {
            return Err(P1Error::InvalidRegistry(format!("empty identifier for topic {}", entry.topic)));
        }

        if !topics.insert(entry.topic.as_str()) {
            return Err(P1Error::InvalidRegistry(format!("topic {} registered twice", entry.topic)));
        }

        for other in &entries[i + 1..] {
            if other.identifier.starts_with(&entry.identifier) || entry.identifier.starts_with(&other.identifier) {
                return Err(P1Error::InvalidRegistry(format!(
                    "identifiers {} and {} overlap", entry.identifier, other.identifier
                )));
            }
        }
    }

    Ok(())
}

impl CodeRegistry {
    /// Builds a registry, refusing tables where a lookup could be ambiguous.
    pub fn new(entries: Vec<CodeEntry>) -> Result<Self, P1Error> {
        validate_entries(&entries)?;
        Ok(Self { entries })
    }

    pub fn dsmr() -> Result<Self, P1Error> {
        Self::new(get_dsmr_codes())
    }

    pub fn lookup(&self, raw_line: &str) -> Option<&CodeEntry> {
        self.entries.iter().find(|entry| raw_line.starts_with(entry.identifier.as_str()))
    }

    pub fn is_interesting(&self, raw_line: &str) -> bool {
        self.lookup(raw_line).is_some()
    }

    pub fn entries(&self) -> &[CodeEntry] {
        &self.entries
    }

    /// Topic carrying the telegram timestamp, if the table has one.
    pub fn timestamp_topic(&self) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.kind == ValueKind::Timestamp)
            .map(|entry| entry.topic.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dsmr_registry_is_valid() {
        let registry = CodeRegistry::dsmr().unwrap();
        assert_eq!(registry.entries().len(), 17);
        assert_eq!(registry.timestamp_topic(), Some("timestamp"));
    }

    #[test]
    fn test_lookup() {
        let registry = CodeRegistry::dsmr().unwrap();

        let entry = registry.lookup("1-0:1.8.1(003382.357*kWh)").unwrap();
        assert_eq!(entry.topic, "electricity_delivered_1");
        assert_eq!(entry.kind, ValueKind::Energy);

        let entry = registry.lookup("1-0:22.7.0(00.000*kW)").unwrap();
        assert_eq!(entry.topic, "phase_currently_returned_l1");

        let entry = registry.lookup("0-0:96.14.0(0002)").unwrap();
        assert_eq!(entry.kind, ValueKind::Boolean);
    }

    #[test]
    fn test_uninteresting_rows() {
        let registry = CodeRegistry::dsmr().unwrap();

        assert!(!registry.is_interesting("/ISK5\\2M550T-1012"));
        assert!(!registry.is_interesting(""));
        assert!(!registry.is_interesting("1-3:0.2.8(50)"));
        assert!(!registry.is_interesting("0-0:96.1.1(4530303434303037313331363130363137)"));
        assert!(!registry.is_interesting("0-1:24.2.1(211216104000W)(02042.197*m3)"));
        // Codes only match at the start of the line
        assert!(!registry.is_interesting(" 1-0:1.8.1(003382.357*kWh)"));
        assert!(registry.lookup("1-0:31.7.0(001*A)").is_none());
    }

    #[test]
    fn test_overlapping_identifiers_are_rejected() {
        let result = CodeRegistry::new(vec![
            CodeEntry::new("1-0:1.8", "total", ValueKind::Energy),
            CodeEntry::new("1-0:1.8.1", "tariff_1", ValueKind::Energy),
        ]);
        assert!(matches!(result, Err(P1Error::InvalidRegistry(_))));

        let result = CodeRegistry::new(vec![
            CodeEntry::new("1-0:1.8.1", "a", ValueKind::Energy),
            CodeEntry::new("1-0:1.8.1", "b", ValueKind::Energy),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_duplicate_topics_are_rejected() {
        let result = CodeRegistry::new(vec![
            CodeEntry::new("1-0:1.8.1", "energy", ValueKind::Energy),
            CodeEntry::new("1-0:1.8.2", "energy", ValueKind::Energy),
        ]);
        assert!(result.is_err());

        let result = CodeRegistry::new(vec![CodeEntry::new("", "energy", ValueKind::Energy)]);
        assert!(result.is_err());
    }
}
