use crate::config::MqttConfig;
use crate::dsmr::{OutboundMessage, P1Error, Publisher};
use log::{debug, error, info, warn};
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::{error::TrySendError, Receiver, Sender};

const QUEUE_SIZE: usize = 100;
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq)]
pub struct PublishData {
    pub topic: String,
    pub payload: String,
    pub qos: u8,
    pub retain: bool,
}

pub fn qos_from_u8(qos: u8) -> QoS {
    match qos {
        0 => QoS::AtMostOnce,
        1 => QoS::AtLeastOnce,
        2 => QoS::ExactlyOnce,
        _ => QoS::AtMostOnce,
    }
}

#[derive(Error, Debug)]
pub enum MqttError {
    #[error("Failed to connect to {host}:{port} ({reason})")]
    Connect { host: String, port: u16, reason: String },
}

/// Owns the broker connection and drains the publish queue into it.
pub struct MqttManager {
    rx: Receiver<PublishData>,
    client: AsyncClient,
}

impl MqttManager {
    /// Connects to the broker and only returns once the first ConnAck is in.
    /// Later disconnects are retried by the spawned event loop.
    pub async fn new(config: &MqttConfig) -> Result<(Self, Sender<PublishData>), MqttError> {
        let (mtx, mrx) = tokio::sync::mpsc::channel(QUEUE_SIZE);

        info!("Publishing MQTT messages to host {} on port {} with client id {}",
              config.host, config.port, config.client_name);
        let mut mqttoptions = MqttOptions::new(config.client_name.clone(), config.host.clone(), config.port);
        mqttoptions.set_keep_alive(Duration::from_secs(config.keep_alive));
        if !config.user.is_empty() {
            mqttoptions.set_credentials(config.user.clone(), config.pass.clone());
        }

        let (client, mut eventloop) = AsyncClient::new(mqttoptions, 10);

        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    info!("Connected to MQTT broker");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    error!("Failed to connect to {}:{} ({})", config.host, config.port, e);
                    return Err(MqttError::Connect {
                        host: config.host.clone(),
                        port: config.port,
                        reason: e.to_string(),
                    });
                }
            }
        }

        tokio::spawn(async move {
            info!("MQTT Eventloop started");
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!("Reconnected to MQTT broker");
                    }
                    Ok(Event::Incoming(Packet::Disconnect)) => {
                        warn!("Broker closed the connection");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!("Error in MQTT {:?}, reconnecting", e);
                        tokio::time::sleep(RECONNECT_DELAY).await;
                    }
                }
            }
        });

        Ok((MqttManager { rx: mrx, client }, mtx))
    }

    pub async fn start_thread(&mut self) {
        while let Some(data) = self.rx.recv().await {
            match self.client.publish(data.topic, qos_from_u8(data.qos), data.retain, data.payload).await {
                Err(e) => { error!("Error publishing: {}", e); }
                Ok(_) => { debug!("Published successfully"); }
            }
        }

        info!("Publish queue closed, MQTT thread exits");
    }
}

/// Hands messages to the [`MqttManager`] queue without waiting for the broker.
pub struct MqttPublisher {
    sender: Sender<PublishData>,
    qos: u8,
    retain: bool,
}

impl MqttPublisher {
    pub fn new(sender: Sender<PublishData>, config: &MqttConfig) -> Self {
        Self { sender, qos: config.qos, retain: config.retain }
    }
}

impl Publisher for MqttPublisher {
    fn publish(&mut self, message: OutboundMessage) -> Result<(), P1Error> {
        let data = PublishData {
            topic: message.topic,
            payload: message.payload,
            qos: self.qos,
            retain: self.retain,
        };

        self.sender.try_send(data).map_err(|e| match e {
            TrySendError::Full(data) => P1Error::Publish(format!("queue full, dropped {}", data.topic)),
            TrySendError::Closed(_) => P1Error::Publish("MQTT thread is gone".to_string()),
        })
    }
}
