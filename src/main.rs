use dsmr2mqtt::{CodeRegistry, Config, MqttManager, MqttPublisher, P1Error, PublishDriver, SerialPort};
use log::{error, info};
use std::process::exit;

#[tokio::main]
async fn main() {
    // Initialize logging
    let default_filter = std::env::var("DSMR2MQTT_LOG_LEVEL").unwrap_or("info".to_string());
    env_logger::init_from_env(env_logger::Env::new().default_filter_or(default_filter));

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            exit(1);
        }
    };

    let registry = match CodeRegistry::dsmr() {
        Ok(registry) => registry,
        Err(e) => {
            error!("{}", e);
            exit(1);
        }
    };

    let (mut mqtt, tx) = match MqttManager::new(&config.mqtt).await {
        Ok(manager) => manager,
        Err(e) => {
            error!("{}", e);
            exit(1);
        }
    };
    let mqtt_thread = tokio::spawn(async move {
        mqtt.start_thread().await;
    });

    let port = match SerialPort::open(&config.serial) {
        Ok(port) => port,
        Err(e) => {
            error!("{}", e);
            exit(1);
        }
    };

    let publisher = MqttPublisher::new(tx, &config.mqtt);
    let mut driver = PublishDriver::new(port, registry, &config.mqtt.base_topic, publisher);

    info!("Waiting for telegrams");
    loop {
        match driver.handle_new_telegram().await {
            Ok(_) => {}
            Err(P1Error::SourceClosed) => {
                error!("Serial port closed, exiting");
                break;
            }
            Err(e) => error!("Telegram handling failed: {}", e),
        }
    }

    // Dropping the driver closes the queue so the MQTT thread can drain and stop
    drop(driver);
    if let Err(e) = mqtt_thread.await {
        error!("MQTT thread failed: {}", e);
    }
}
