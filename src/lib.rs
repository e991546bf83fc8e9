//! DSMR P1 to MQTT bridge
//!
//! Reads telegrams from a smart meter's P1 port, decodes a fixed set of OBIS
//! codes and publishes the values that changed to an MQTT broker.

pub mod config;
pub mod dsmr;
pub mod mqtt;
pub mod serial;

// Re-export common types for easier access
pub use config::{Config, ConfigError};
pub use dsmr::{CodeRegistry, P1Error, PublishDriver, Publisher};
pub use mqtt::{MqttError, MqttManager, MqttPublisher};
pub use serial::SerialPort;
