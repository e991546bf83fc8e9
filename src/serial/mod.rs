use crate::config::SerialConfig;
use crate::dsmr::{LineSource, P1Error};
use async_trait::async_trait;
use log::{debug, error, info};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, SerialStream, StopBits};

pub type SerialPort = SerialLineReader<SerialStream>;

/// P1 lines are well below this, anything longer is line noise.
pub const MAX_LINE_LENGTH: usize = 1024;

/// Splits a byte stream into trimmed ASCII lines.
pub struct SerialLineReader<R> {
    port: String,
    reader: BufReader<R>,
    read_timeout: Duration,
    buffer: Vec<u8>,
}

impl SerialLineReader<SerialStream> {
    /// Opens the P1 port, 8N1 without flow control.
    pub fn open(config: &SerialConfig) -> Result<Self, P1Error> {
        let stream = tokio_serial::new(&config.port, config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .open_native_async()
            .map_err(|e| {
                error!("Could not open port {}", config.port);
                P1Error::Transport(format!("Failed to open serial port {}: {}", config.port, e))
            })?;

        info!("Opened {} at {} baud", config.port, config.baud_rate);
        Ok(Self::new(&config.port, stream, Duration::from_secs(config.read_timeout)))
    }
}

impl<R: AsyncRead + Unpin + Send> SerialLineReader<R> {
    pub fn new(port: &str, inner: R, read_timeout: Duration) -> Self {
        Self {
            port: port.to_string(),
            reader: BufReader::new(inner),
            read_timeout,
            buffer: Vec::new(),
        }
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> LineSource for SerialLineReader<R> {
    async fn read_line(&mut self) -> Result<Option<String>, P1Error> {
        // A timed out read leaves its partial line in the buffer for the next call
        let remaining = MAX_LINE_LENGTH.saturating_sub(self.buffer.len()) as u64;
        let mut limited = (&mut self.reader).take(remaining);
        let read = tokio::time::timeout(self.read_timeout, limited.read_until(b'\n', &mut self.buffer))
            .await
            .map_err(|_| P1Error::Transport(format!("No data on {} within {:?}", self.port, self.read_timeout)))?
            .map_err(|e| P1Error::Transport(e.to_string()))?;

        if self.buffer.len() >= MAX_LINE_LENGTH && self.buffer.last() != Some(&b'\n') {
            self.buffer.clear();
            return Err(P1Error::Transport(format!(
                "Line on {} exceeds {} bytes, discarded", self.port, MAX_LINE_LENGTH
            )));
        }

        if read == 0 && self.buffer.is_empty() {
            debug!("End of stream on {}", self.port);
            return Ok(None);
        }

        let line = decode_line(&self.buffer);
        self.buffer.clear();
        line.map(Some)
    }

    fn port_name(&self) -> &str {
        &self.port
    }
}

pub fn decode_line(raw: &[u8]) -> Result<String, P1Error> {
    if !raw.is_ascii() {
        return Err(P1Error::Transport(format!("Non ASCII data received: {:02X?}", raw)));
    }

    // ASCII is valid UTF-8
    Ok(String::from_utf8_lossy(raw).trim().to_string())
}
