use super::{
    codes::CodeRegistry,
    decoder,
    framer::{LineSource, TelegramFramer},
    message::{MessageAssembler, OutboundMessage},
    structs::Reading,
    tracker::ChangeTracker,
    P1Error, Publisher,
};
use log::{debug, info, warn};

/// Runs the read, decode, filter and publish cycle for one meter.
pub struct PublishDriver<S: LineSource, P: Publisher> {
    framer: TelegramFramer<S>,
    registry: CodeRegistry,
    tracker: ChangeTracker,
    assembler: MessageAssembler,
    publisher: P,
}

impl<S: LineSource, P: Publisher> PublishDriver<S, P> {
    pub fn new(source: S, registry: CodeRegistry, base_topic: &str, publisher: P) -> Self {
        info!("Handling telegrams on port {}", source.port_name());
        let tracker = ChangeTracker::new(&registry);

        Self {
            framer: TelegramFramer::new(source),
            registry,
            tracker,
            assembler: MessageAssembler::new(base_topic),
            publisher,
        }
    }

    /// Handles exactly one telegram and returns how many messages went out.
    pub async fn handle_new_telegram(&mut self) -> Result<usize, P1Error> {
        let telegram = self.framer.next_telegram().await?;
        debug!("Handling telegram containing {} rows", telegram.len());

        let messages = self.convert_to_messages(&telegram);
        let total = messages.len();

        let mut published = 0;
        for message in messages {
            debug!("Publishing payload {} to topic {}", message.payload, message.topic);
            match self.publisher.publish(message) {
                Ok(_) => published += 1,
                Err(e) => warn!("Dropping message: {}", e),
            }
        }

        info!("Published {} of {} messages", published, total);
        Ok(published)
    }

    /// Turns the rows of a telegram into the messages that need to go out,
    /// keeping the row order.
    pub fn convert_to_messages(&mut self, telegram: &[String]) -> Vec<OutboundMessage> {
        let mut messages = Vec::new();

        for row in telegram {
            let reading = match self.read_row(row) {
                Some(Ok(reading)) => reading,
                Some(Err(e)) => {
                    warn!("Failed to decode row '{}': {}", row, e);
                    continue;
                }
                None => continue,
            };

            if !self.tracker.should_publish(&reading) {
                debug!("Value of {} did not change, skipping", reading.topic);
                continue;
            }

            match self.assembler.assemble(&reading, &self.tracker) {
                Ok(message) => messages.push(message),
                Err(e) => warn!("Failed to build message for {}: {}", reading.topic, e),
            }
        }

        messages
    }

    fn read_row(&self, row: &str) -> Option<Result<Reading, P1Error>> {
        let entry = self.registry.lookup(row)?;

        Some(decoder::decode(row, entry.kind).map(|value| Reading {
            topic: entry.topic.clone(),
            kind: entry.kind,
            value,
        }))
    }

    pub fn tracker(&self) -> &ChangeTracker {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut ChangeTracker {
        &mut self.tracker
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }
}
