use super::{structs::Telegram, P1Error};
use async_trait::async_trait;
use log::{debug, error};

/// Blocking source of raw P1 lines, usually a serial port.
#[async_trait]
pub trait LineSource: Send {
    /// Waits for the next line. `Ok(None)` means the source is closed for good.
    async fn read_line(&mut self) -> Result<Option<String>, P1Error>;

    fn port_name(&self) -> &str;
}

pub struct TelegramFramer<S: LineSource> {
    source: S,
}

impl<S: LineSource> TelegramFramer<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn port_name(&self) -> &str {
        self.source.port_name()
    }

    /// Collects lines up to the next checksum line (`!XXXX`).
    pub async fn next_telegram(&mut self) -> Result<Telegram, P1Error> {
        let mut telegram = Vec::new();
        debug!("Reading telegram from {}", self.source.port_name());

        loop {
            let line = match self.source.read_line().await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    debug!("Source closed with {} unframed lines", telegram.len());
                    return Err(P1Error::SourceClosed);
                }
                Err(e) => {
                    error!("Cannot read serial data: {}", e);
                    continue;
                }
            };

            if line.starts_with('!') {
                debug!("End of telegram found, {} rows", telegram.len());
                return Ok(telegram);
            }

            telegram.push(line);
        }
    }
}
