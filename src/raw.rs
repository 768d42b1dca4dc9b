// src/raw.rs
// Byte-level transport for deliberately malformed requests

use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::error::HarnessError;

const CONNECT_TIMEOUT: Duration = Duration::from_millis(500);
const READ_TIMEOUT: Duration = Duration::from_secs(2);

/// Byte-level client that writes a literal request and captures everything
/// the peer sends back.
///
/// Well-behaved client libraries refuse to construct the request lines some
/// conformance scenarios need — a path with a literal space, a stray control
/// byte, an unterminated percent escape, several pipelined blocks in one
/// write. This transport performs no normalization and no parsing: the
/// payload goes out verbatim and the response comes back as unparsed text.
pub struct RawClient {
    host: String,
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl RawClient {
    pub fn new(host: &str) -> Self {
        RawClient {
            host: host.to_string(),
            connect_timeout: CONNECT_TIMEOUT,
            read_timeout: READ_TIMEOUT,
        }
    }

    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Send `payload` to the configured host on `port`.
    pub async fn send(&self, port: u16, payload: &str) -> Result<String, HarnessError> {
        self.send_to(&self.host, port, payload).await
    }

    /// Send `payload` verbatim and read until the peer closes the connection
    /// or the read deadline passes.
    ///
    /// A deadline with bytes already captured returns the partial text, so a
    /// server that answers but keeps the connection open cannot hang the
    /// harness. A deadline before the first byte is a `ResponseTimeout`.
    pub async fn send_to(
        &self,
        host: &str,
        port: u16,
        payload: &str,
    ) -> Result<String, HarnessError> {
        let addr = format!("{}:{}", host, port);

        let mut stream = timeout(self.connect_timeout, TcpStream::connect(addr.as_str()))
            .await
            .map_err(|_| HarnessError::ConnectFailure(format!("{}: connect timed out", addr)))?
            .map_err(|e| HarnessError::ConnectFailure(format!("{}: {}", addr, e)))?;

        stream.write_all(payload.as_bytes()).await?;
        stream.flush().await?;

        let mut captured = BytesMut::with_capacity(4096);
        loop {
            match timeout(self.read_timeout, stream.read_buf(&mut captured)).await {
                Ok(Ok(0)) => break,
                Ok(Ok(_)) => continue,
                Ok(Err(e)) => {
                    // A reset after the response is how some servers reject a
                    // connection; whatever arrived first is still the answer.
                    if captured.is_empty() {
                        return Err(e.into());
                    }
                    break;
                }
                Err(_) => {
                    if captured.is_empty() {
                        return Err(HarnessError::ResponseTimeout(format!(
                            "{}: no data before read deadline",
                            addr
                        )));
                    }
                    break;
                }
            }
        }

        Ok(String::from_utf8_lossy(&captured).into_owned())
    }

    /// Compose a minimal CRLF-terminated GET request for a literal target.
    ///
    /// The target is spliced into the request line without any escaping.
    pub fn get_request(target: &str, host: &str, port: u16) -> String {
        format!(
            "GET {} HTTP/1.1\r\nHost: {}:{}\r\nConnection: close\r\n\r\n",
            target, host, port
        )
    }
}
