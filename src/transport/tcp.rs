// MIT License - Copyright (c) 2026 Peter Wright
// TCP line source for mochad

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tracing::debug;

use crate::error::{BridgeError, Result};
use crate::transport::LineSource;

/// Reads mochad's status stream over a plain TCP connection.
pub struct TcpLineSource {
    host: String,
    port: u16,
    reader: Option<BufReader<TcpStream>>,
    buf: Vec<u8>,
}

impl TcpLineSource {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            reader: None,
            buf: Vec::new(),
        }
    }

    #[cfg(test)]
    fn is_open(&self) -> bool {
        self.reader.is_some()
    }
}

impl LineSource for TcpLineSource {
    async fn open(&mut self) -> Result<()> {
        self.close();
        let stream = TcpStream::connect((self.host.as_str(), self.port))
            .await
            .map_err(|source| BridgeError::Connection {
                host: self.host.clone(),
                port: self.port,
                source,
            })?;
        debug!("TCP socket connected to {}", self.peer());
        self.reader = Some(BufReader::new(stream));
        Ok(())
    }

    async fn read_line(&mut self) -> Result<Option<String>> {
        let reader = self.reader.as_mut().ok_or(BridgeError::NotConnected)?;
        self.buf.clear();
        let n = reader.read_until(b'\n', &mut self.buf).await?;
        if n == 0 {
            debug!("Reader: connection closed");
            return Ok(None);
        }
        // Invalid UTF-8 is a bad line, not a read error.
        let line = String::from_utf8_lossy(&self.buf);
        Ok(Some(line.trim_end().to_string()))
    }

    fn close(&mut self) {
        if self.reader.take().is_some() {
            debug!("Closed connection to {}", self.peer());
        }
    }

    fn peer(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
