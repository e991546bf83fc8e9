use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_ENV: &str = "DSMR2MQTT_CONFIG";
const CONFIG_PATHS: [&str; 2] = ["config/dsmr2mqtt.yaml", "dsmr2mqtt.yaml"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unable to find a config on {0}")]
    NotFound(String),
    #[error("Unable to read config file {path}: {source}")]
    Io { path: String, source: std::io::Error },
    #[error("Unable to parse config file: {0}")]
    Parse(#[from] serde_yml::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

fn mqtt_port_default() -> u16 { 1883 }
fn mqtt_user_default() -> String { String::new() }
fn mqtt_pass_default() -> String { String::new() }
fn mqtt_client_name_default() -> String { "dsmr2mqtt".to_string() }
fn mqtt_base_topic_default() -> String { "dsmr/reading/".to_string() }
fn mqtt_qos_default() -> u8 { 0 }
fn mqtt_retain_default() -> bool { false }
fn mqtt_keep_alive_default() -> u64 { 5 }

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct MqttConfig {
    pub host: String,
    #[serde(default="mqtt_port_default")]
    pub port: u16,
    #[serde(default="mqtt_user_default")]
    pub user: String,
    #[serde(default="mqtt_pass_default")]
    pub pass: String,
    #[serde(default="mqtt_client_name_default")]
    pub client_name: String,
    /// Prepended to every topic, including its trailing `/`
    #[serde(default="mqtt_base_topic_default")]
    pub base_topic: String,
    #[serde(default="mqtt_qos_default")]
    pub qos: u8,
    #[serde(default="mqtt_retain_default")]
    pub retain: bool,
    #[serde(default="mqtt_keep_alive_default")]
    pub keep_alive: u64,        // Seconds
}

fn serial_baud_rate_default() -> u32 { 115200 }
fn serial_read_timeout_default() -> u64 { 12 }

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct SerialConfig {
    pub port: String,
    #[serde(default="serial_baud_rate_default")]
    pub baud_rate: u32,
    #[serde(default="serial_read_timeout_default")]
    pub read_timeout: u64,      // Seconds per line
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct Config {
    pub mqtt: MqttConfig,
    pub serial: SerialConfig,
}

impl Config {
    /// Loads the config from `$DSMR2MQTT_CONFIG`, `config/dsmr2mqtt.yaml` or
    /// `dsmr2mqtt.yaml`, whichever exists first.
    pub fn load() -> Result<Self, ConfigError> {
        let mut candidates: Vec<PathBuf> = Vec::new();
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            candidates.push(PathBuf::from(path));
        }
        candidates.extend(CONFIG_PATHS.iter().map(PathBuf::from));

        match candidates.iter().find(|path| path.is_file()) {
            Some(path) => Self::load_from_path(path),
            None => Err(ConfigError::NotFound(
                candidates.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(" or "),
            )),
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        info!("Loading config from {}", path.display());
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yml::from_str(contents)?;
        config.validate()?;
        debug!("Config loaded for broker {}:{}", config.mqtt.host, config.mqtt.port);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mqtt.host.is_empty() {
            return Err(ConfigError::Invalid("mqtt.host must not be empty".to_string()));
        }
        if self.mqtt.qos > 2 {
            return Err(ConfigError::Invalid(format!("mqtt.qos {} is not one of 0, 1, 2", self.mqtt.qos)));
        }
        if self.mqtt.base_topic.is_empty() {
            return Err(ConfigError::Invalid("mqtt.base_topic must not be empty".to_string()));
        }
        if self.serial.port.is_empty() {
            return Err(ConfigError::Invalid("serial.port must not be empty".to_string()));
        }
        if self.serial.read_timeout == 0 {
            return Err(ConfigError::Invalid("serial.read_timeout must be at least one second".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = "
mqtt:
  host: broker.local
serial:
  port: /dev/ttyUSB0
";

    #[test]
    fn test_defaults() {
        let config = Config::from_yaml(MINIMAL).unwrap();
        assert_eq!(config.mqtt.host, "broker.local");
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.mqtt.user, "");
        assert_eq!(config.mqtt.client_name, "dsmr2mqtt");
        assert_eq!(config.mqtt.base_topic, "dsmr/reading/");
        assert_eq!(config.mqtt.qos, 0);
        assert!(!config.mqtt.retain);
        assert_eq!(config.serial.port, "/dev/ttyUSB0");
        assert_eq!(config.serial.baud_rate, 115200);
        assert_eq!(config.serial.read_timeout, 12);
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_yaml("
mqtt:
  host: 10.0.0.2
  port: 8883
  user: meter
  pass: secret
  client_name: p1-reader
  base_topic: home/energy/
  qos: 1
  retain: true
  keep_alive: 30
serial:
  port: /dev/ttyAMA0
  baud_rate: 9600
  read_timeout: 20
").unwrap();

        assert_eq!(config.mqtt.port, 8883);
        assert_eq!(config.mqtt.pass, "secret");
        assert_eq!(config.mqtt.base_topic, "home/energy/");
        assert_eq!(config.mqtt.qos, 1);
        assert!(config.mqtt.retain);
        assert_eq!(config.mqtt.keep_alive, 30);
        assert_eq!(config.serial.baud_rate, 9600);
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(Config::from_yaml("mqtt:\n  host: x\n"), Err(ConfigError::Parse(_))));

        let bad_qos = format!("{MINIMAL}\n").replace("host: broker.local", "host: broker.local\n  qos: 3");
        assert!(matches!(Config::from_yaml(&bad_qos), Err(ConfigError::Invalid(_))));

        let no_topic = MINIMAL.replace("host: broker.local", "host: broker.local\n  base_topic: \"\"");
        assert!(matches!(Config::from_yaml(&no_topic), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();

        let config = Config::load_from_path(file.path()).unwrap();
        assert_eq!(config.serial.port, "/dev/ttyUSB0");

        let missing = Config::load_from_path(Path::new("/nonexistent/dsmr2mqtt.yaml"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}
