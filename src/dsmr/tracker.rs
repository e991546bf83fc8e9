use super::{codes::CodeRegistry, structs::{Reading, TypedValue}};
use log::debug;
use std::collections::HashMap;

/// Remembers the last published value per topic so unchanged readings can be
/// dropped. Live kinds (power, voltage) bypass the comparison entirely.
pub struct ChangeTracker {
    last_values: HashMap<String, Option<TypedValue>>,
    timestamp_topic: Option<String>,
}

impl ChangeTracker {
    pub fn new(registry: &CodeRegistry) -> Self {
        let last_values = registry
            .entries()
            .iter()
            .map(|entry| (entry.topic.clone(), None))
            .collect();

        Self {
            last_values,
            timestamp_topic: registry.timestamp_topic().map(str::to_string),
        }
    }

    pub fn should_publish(&mut self, reading: &Reading) -> bool {
        if reading.kind.is_live() {
            return true;
        }

        match self.last_values.get_mut(&reading.topic) {
            Some(last) if last.as_ref() != Some(&reading.value) => {
                *last = Some(reading.value.clone());
                true
            }
            Some(_) => false,
            None => {
                debug!("Topic {} is not tracked, ignoring", reading.topic);
                false
            }
        }
    }

    /// Timestamp of the last telegram we published, empty before the first one.
    pub fn last_timestamp(&self) -> &str {
        let value = self
            .timestamp_topic
            .as_ref()
            .and_then(|topic| self.last_values.get(topic))
            .and_then(Option::as_ref);

        match value {
            Some(TypedValue::Timestamp(ts)) | Some(TypedValue::Text(ts)) => ts.as_str(),
            _ => "",
        }
    }

    pub fn last_value(&self, topic: &str) -> Option<&TypedValue> {
        self.last_values.get(topic).and_then(Option::as_ref)
    }

    pub fn reset(&mut self) {
        for value in self.last_values.values_mut() {
            *value = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsmr::structs::ValueKind;

    fn reading(topic: &str, kind: ValueKind, value: TypedValue) -> Reading {
        Reading { topic: topic.to_string(), kind, value }
    }

    fn tracker() -> ChangeTracker {
        ChangeTracker::new(&CodeRegistry::dsmr().unwrap())
    }

    #[test]
    fn test_first_reading_is_published() {
        let mut tracker = tracker();
        let r = reading("electricity_delivered_1", ValueKind::Energy, TypedValue::Number(0.0));

        assert!(tracker.last_value("electricity_delivered_1").is_none());
        assert!(tracker.should_publish(&r));
        assert_eq!(tracker.last_value("electricity_delivered_1"), Some(&TypedValue::Number(0.0)));
    }

    #[test]
    fn test_repeated_reading_is_suppressed() {
        let mut tracker = tracker();
        let r = reading("electricity_delivered_1", ValueKind::Energy, TypedValue::Number(3382.357));

        assert!(tracker.should_publish(&r));
        assert!(!tracker.should_publish(&r));

        let changed = reading("electricity_delivered_1", ValueKind::Energy, TypedValue::Number(3382.358));
        assert!(tracker.should_publish(&changed));
        assert_eq!(tracker.last_value("electricity_delivered_1"), Some(&TypedValue::Number(3382.358)));
        assert!(!tracker.should_publish(&changed));
    }

    #[test]
    fn test_empty_tariff_is_still_a_value() {
        let mut tracker = tracker();
        let r = reading("tariff_indicator", ValueKind::Boolean, TypedValue::Text(String::new()));

        assert!(tracker.should_publish(&r));
        assert!(!tracker.should_publish(&r));
    }

    #[test]
    fn test_live_readings_always_publish() {
        let mut tracker = tracker();
        let power = reading("electricity_currently_delivered", ValueKind::Power, TypedValue::Number(0.412));
        let voltage = reading("phase_voltage_l1", ValueKind::Voltage, TypedValue::Number(229.8));

        for _ in 0..3 {
            assert!(tracker.should_publish(&power));
            assert!(tracker.should_publish(&voltage));
        }
        // Live readings never touch the stored state
        assert!(tracker.last_value("electricity_currently_delivered").is_none());
    }

    #[test]
    fn test_untracked_topic() {
        let mut tracker = tracker();
        let r = reading("gas_delivered", ValueKind::Opaque, TypedValue::Text("1".to_string()));
        assert!(!tracker.should_publish(&r));
    }

    #[test]
    fn test_last_timestamp() {
        let mut tracker = tracker();
        assert_eq!(tracker.last_timestamp(), "");

        let ts = TypedValue::Timestamp("2021-12-16T09:40:26.000Z".to_string());
        assert!(tracker.should_publish(&reading("timestamp", ValueKind::Timestamp, ts)));
        assert_eq!(tracker.last_timestamp(), "2021-12-16T09:40:26.000Z");
    }

    #[test]
    fn test_reset() {
        let mut tracker = tracker();
        let r = reading("electricity_returned_2", ValueKind::Energy, TypedValue::Number(1.5));
        let ts = reading("timestamp", ValueKind::Timestamp, TypedValue::Timestamp("x".to_string()));

        assert!(tracker.should_publish(&r));
        assert!(tracker.should_publish(&ts));
        tracker.reset();

        assert_eq!(tracker.last_timestamp(), "");
        assert!(tracker.should_publish(&r));
    }
}
