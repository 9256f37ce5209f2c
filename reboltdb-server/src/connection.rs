//! Per-connection protocol state machine.
//!
//! Wire order: version magic, server greeting, SCRAM client-first,
//! server-first, client-final, server-final, then the query loop. The
//! handshake is strictly sequential; each phase has its own deadline.

use crate::auth::{ScramCredentials, ScramExchange};
use crate::dispatcher::QueryDispatcher;
use crate::error::ServerError;
use bytes::{Buf, BytesMut};
use reboltdb_protocol::{
    decode_nul_message, encode_nul_json, ClientAuthMessage, HandshakeError, QueryFrame,
    ServerAuthMessage, ServerGreeting, Version, PROTOCOL_VERSION,
};
use reboltdb_storage::Storage;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::broadcast;

const READ_BUF_SIZE: usize = 8192;

/// Connection phases, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Version,
    ClientFirst,
    ClientFinal,
    Query,
}

/// One client connection: a read buffer, the current phase, the SCRAM
/// exchange in flight, and the dispatcher owning this connection's tokens.
/// The exchange is discarded once authentication completes.
struct Connection<S> {
    stream: S,
    addr: SocketAddr,
    buf: BytesMut,
    phase: Phase,
    exchange: Option<ScramExchange>,
    dispatcher: QueryDispatcher,
    handshake_timeout: Duration,
}

/// Runs a connection to completion. On a handshake failure a best-effort
/// JSON error body is written before the connection is torn down.
pub(crate) async fn handle_connection<S>(
    stream: S,
    addr: SocketAddr,
    credentials: Arc<ScramCredentials>,
    storage: Arc<Storage>,
    handshake_timeout: Duration,
    shutdown: &mut broadcast::Receiver<()>,
) -> Result<(), ServerError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut connection = Connection {
        stream,
        addr,
        buf: BytesMut::with_capacity(READ_BUF_SIZE),
        phase: Phase::Version,
        exchange: Some(ScramExchange::new(credentials)),
        dispatcher: QueryDispatcher::new(storage),
        handshake_timeout,
    };

    match connection.run(shutdown).await {
        Ok(()) => Ok(()),
        Err(err) => {
            if connection.phase != Phase::Query && !matches!(err, ServerError::Io(_)) {
                connection.write_handshake_error(&err).await;
            }
            Err(err)
        }
    }
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    async fn run(&mut self, shutdown: &mut broadcast::Receiver<()>) -> Result<(), ServerError> {
        let mut read_buf = [0u8; READ_BUF_SIZE];
        let mut deadline = tokio::time::Instant::now() + self.handshake_timeout;

        loop {
            let phase_before = self.phase;
            self.advance().await?;
            if self.phase != phase_before {
                deadline = tokio::time::Instant::now() + self.handshake_timeout;
            }

            tokio::select! {
                biased;

                _ = shutdown.recv() => {
                    tracing::debug!("[{}] shutdown signal received", self.addr);
                    return Err(ServerError::ShuttingDown);
                }

                _ = tokio::time::sleep_until(deadline), if self.phase != Phase::Query => {
                    return Err(ServerError::HandshakeTimeout);
                }

                result = self.stream.read(&mut read_buf) => {
                    match result {
                        Ok(0) => {
                            tracing::debug!("[{}] connection closed by peer", self.addr);
                            return Ok(());
                        }
                        Ok(n) => {
                            tracing::trace!("[{}] received {} bytes", self.addr, n);
                            self.buf.extend_from_slice(&read_buf[..n]);
                        }
                        Err(err) => return Err(ServerError::Io(err)),
                    }
                }
            }
        }
    }

    /// Processes everything decodable at the current phase, advancing
    /// through phases as the client's pipelined data allows.
    async fn advance(&mut self) -> Result<(), ServerError> {
        loop {
            let progressed = match self.phase {
                Phase::Version => self.try_version().await?,
                Phase::ClientFirst => self.try_client_first().await?,
                Phase::ClientFinal => self.try_client_final().await?,
                Phase::Query => self.try_query()?,
            };
            if !progressed {
                return Ok(());
            }
        }
    }

    async fn try_version(&mut self) -> Result<bool, ServerError> {
        if self.buf.len() < 4 {
            return Ok(false);
        }
        let magic = u32::from_le_bytes([self.buf[0], self.buf[1], self.buf[2], self.buf[3]]);
        self.buf.advance(4);

        match Version::from_magic(magic) {
            Some(Version::V1_0) => {}
            Some(version) => {
                return Err(reboltdb_protocol::ProtocolError::UnsupportedVersion(version).into());
            }
            None => {
                return Err(reboltdb_protocol::ProtocolError::UnrecognizedMagic(magic).into());
            }
        }

        self.stream
            .write_all(&encode_nul_json(&ServerGreeting::new())?)
            .await?;
        tracing::debug!("[{}] greeting sent", self.addr);
        self.phase = Phase::ClientFirst;
        Ok(true)
    }

    async fn try_client_first(&mut self) -> Result<bool, ServerError> {
        let Some(message) = decode_nul_message(&mut self.buf)? else {
            return Ok(false);
        };
        let message: ClientAuthMessage = serde_json::from_slice(&message).map_err(|e| {
            ServerError::AuthFormat(format!("unable to decode client authentication message: {e}"))
        })?;

        if message.protocol_version != PROTOCOL_VERSION {
            return Err(ServerError::AuthFormat(format!(
                "unrecognized protocol version: {}",
                message.protocol_version
            )));
        }
        if message.authentication_method != "SCRAM-SHA-256" {
            return Err(ServerError::AuthFormat(format!(
                "unrecognized authentication method: {:?}",
                message.authentication_method
            )));
        }

        let Some(exchange) = self.exchange.as_mut() else {
            return Err(ServerError::Internal("authentication state missing".into()));
        };
        exchange.client_first(&message.authentication)?;
        let server_first = exchange.server_first();
        self.stream
            .write_all(&encode_nul_json(&ServerAuthMessage::new(server_first))?)
            .await?;
        self.phase = Phase::ClientFinal;
        Ok(true)
    }

    async fn try_client_final(&mut self) -> Result<bool, ServerError> {
        let Some(message) = decode_nul_message(&mut self.buf)? else {
            return Ok(false);
        };
        let message: ClientAuthMessage = serde_json::from_slice(&message).map_err(|e| {
            ServerError::AuthFormat(format!(
                "unable to decode client authentication proof message: {e}"
            ))
        })?;

        let Some(exchange) = self.exchange.as_mut() else {
            return Err(ServerError::Internal("authentication state missing".into()));
        };
        let server_final = exchange.client_final(&message.authentication)?;
        self.stream
            .write_all(&encode_nul_json(&ServerAuthMessage::new(server_final))?)
            .await?;
        // The exchange's nonces and auth-message are no longer needed.
        self.exchange = None;
        self.phase = Phase::Query;
        tracing::info!("[{}] authenticated", self.addr);
        Ok(true)
    }

    fn try_query(&mut self) -> Result<bool, ServerError> {
        match QueryFrame::decode(&mut self.buf)? {
            Some(frame) => {
                let token = frame.token;
                tracing::debug!(
                    "[{}] request: token={} size={}",
                    self.addr,
                    token,
                    frame.payload.len()
                );
                self.dispatcher.dispatch(frame).map_err(|err| {
                    tracing::debug!("[{}] query {} failed: {}", self.addr, token, err);
                    err
                })?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn write_handshake_error(&mut self, err: &ServerError) {
        let body = HandshakeError::new(err.error_code(), err.to_string());
        match encode_nul_json(&body) {
            Ok(encoded) => {
                if let Err(write_err) = self.stream.write_all(&encoded).await {
                    tracing::debug!(
                        "[{}] failed to write handshake error: {}",
                        self.addr,
                        write_err
                    );
                }
            }
            Err(encode_err) => {
                tracing::debug!("[{}] failed to encode handshake error: {}", self.addr, encode_err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;
    use tempfile::TempDir;
    use tokio::io::duplex;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:12345".parse().unwrap()
    }

    fn test_credentials() -> Arc<ScramCredentials> {
        Arc::new(ScramCredentials::from_config(&AuthConfig::default()).unwrap())
    }

    fn test_storage(dir: &TempDir) -> Arc<Storage> {
        Arc::new(Storage::open(dir.path().join(".boltdb")).unwrap())
    }

    /// Reads one NUL-terminated JSON message from the client side.
    async fn read_nul_json(
        stream: &mut tokio::io::DuplexStream,
    ) -> serde_json::Value {
        let mut body = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            stream.read_exact(&mut byte).await.unwrap();
            if byte[0] == 0 {
                break;
            }
            body.push(byte[0]);
        }
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_zero_magic_rejected() {
        let dir = TempDir::new().unwrap();
        let (mut client, server) = duplex(4096);
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);

        let credentials = test_credentials();
        let storage = test_storage(&dir);
        let task = tokio::spawn(async move {
            handle_connection(
                server,
                test_addr(),
                credentials,
                storage,
                Duration::from_secs(5),
                &mut shutdown_rx,
            )
            .await
        });

        client.write_all(&[0, 0, 0, 0]).await.unwrap();

        let body = read_nul_json(&mut client).await;
        assert_eq!(body["success"], serde_json::json!(false));
        assert_eq!(body["error_code"], serde_json::json!(10));

        let result = task.await.unwrap();
        assert!(matches!(
            result,
            Err(ServerError::Protocol(
                reboltdb_protocol::ProtocolError::UnrecognizedMagic(0)
            ))
        ));
        drop(shutdown_tx);
    }

    #[tokio::test]
    async fn test_older_version_rejected() {
        let dir = TempDir::new().unwrap();
        let (mut client, server) = duplex(4096);
        let (_shutdown_tx, mut shutdown_rx) = broadcast::channel(1);

        let credentials = test_credentials();
        let storage = test_storage(&dir);
        let task = tokio::spawn(async move {
            handle_connection(
                server,
                test_addr(),
                credentials,
                storage,
                Duration::from_secs(5),
                &mut shutdown_rx,
            )
            .await
        });

        client
            .write_all(&Version::V0_4.magic().to_le_bytes())
            .await
            .unwrap();

        let body = read_nul_json(&mut client).await;
        assert_eq!(body["success"], serde_json::json!(false));

        let result = task.await.unwrap();
        assert!(matches!(
            result,
            Err(ServerError::Protocol(
                reboltdb_protocol::ProtocolError::UnsupportedVersion(Version::V0_4)
            ))
        ));
    }

    #[tokio::test]
    async fn test_greeting_after_valid_magic() {
        let dir = TempDir::new().unwrap();
        let (mut client, server) = duplex(4096);
        let (_shutdown_tx, mut shutdown_rx) = broadcast::channel(1);

        let credentials = test_credentials();
        let storage = test_storage(&dir);
        let _task = tokio::spawn(async move {
            handle_connection(
                server,
                test_addr(),
                credentials,
                storage,
                Duration::from_secs(5),
                &mut shutdown_rx,
            )
            .await
        });

        client
            .write_all(&Version::V1_0.magic().to_le_bytes())
            .await
            .unwrap();

        let greeting = read_nul_json(&mut client).await;
        assert_eq!(greeting["success"], serde_json::json!(true));
        assert_eq!(greeting["min_protocol_version"], serde_json::json!(0));
        assert_eq!(greeting["max_protocol_version"], serde_json::json!(0));
        assert_eq!(
            greeting["server_version"],
            serde_json::json!("ReboltDB 0.1.0")
        );
    }

    #[tokio::test]
    async fn test_wrong_auth_method_rejected() {
        let dir = TempDir::new().unwrap();
        let (mut client, server) = duplex(4096);
        let (_shutdown_tx, mut shutdown_rx) = broadcast::channel(1);

        let credentials = test_credentials();
        let storage = test_storage(&dir);
        let task = tokio::spawn(async move {
            handle_connection(
                server,
                test_addr(),
                credentials,
                storage,
                Duration::from_secs(5),
                &mut shutdown_rx,
            )
            .await
        });

        client
            .write_all(&Version::V1_0.magic().to_le_bytes())
            .await
            .unwrap();
        let _greeting = read_nul_json(&mut client).await;

        client
            .write_all(
                br#"{"protocol_version":0,"authentication_method":"SCRAM-SHA-1","authentication":"n,,n=admin,r=abc"}"#,
            )
            .await
            .unwrap();
        client.write_all(&[0]).await.unwrap();

        let body = read_nul_json(&mut client).await;
        assert_eq!(body["success"], serde_json::json!(false));
        assert_eq!(body["error_code"], serde_json::json!(13));

        let result = task.await.unwrap();
        assert!(matches!(result, Err(ServerError::AuthFormat(_))));
    }

    #[tokio::test]
    async fn test_wrong_protocol_version_rejected() {
        let dir = TempDir::new().unwrap();
        let (mut client, server) = duplex(4096);
        let (_shutdown_tx, mut shutdown_rx) = broadcast::channel(1);

        let credentials = test_credentials();
        let storage = test_storage(&dir);
        let task = tokio::spawn(async move {
            handle_connection(
                server,
                test_addr(),
                credentials,
                storage,
                Duration::from_secs(5),
                &mut shutdown_rx,
            )
            .await
        });

        client
            .write_all(&Version::V1_0.magic().to_le_bytes())
            .await
            .unwrap();
        let _greeting = read_nul_json(&mut client).await;

        client
            .write_all(
                br#"{"protocol_version":7,"authentication_method":"SCRAM-SHA-256","authentication":"n,,n=admin,r=abc"}"#,
            )
            .await
            .unwrap();
        client.write_all(&[0]).await.unwrap();

        let result = task.await.unwrap();
        assert!(matches!(result, Err(ServerError::AuthFormat(_))));
    }

    #[tokio::test]
    async fn test_handshake_timeout() {
        let dir = TempDir::new().unwrap();
        let (client, server) = duplex(4096);
        let (_shutdown_tx, mut shutdown_rx) = broadcast::channel(1);

        let credentials = test_credentials();
        let storage = test_storage(&dir);
        let task = tokio::spawn(async move {
            handle_connection(
                server,
                test_addr(),
                credentials,
                storage,
                Duration::from_millis(50),
                &mut shutdown_rx,
            )
            .await
        });

        // Send nothing; the version phase must time out.
        let result = task.await.unwrap();
        assert!(matches!(result, Err(ServerError::HandshakeTimeout)));
        drop(client);
    }

    #[tokio::test]
    async fn test_shutdown_cancels_connection() {
        let dir = TempDir::new().unwrap();
        let (client, server) = duplex(4096);
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);

        let credentials = test_credentials();
        let storage = test_storage(&dir);
        let task = tokio::spawn(async move {
            handle_connection(
                server,
                test_addr(),
                credentials,
                storage,
                Duration::from_secs(30),
                &mut shutdown_rx,
            )
            .await
        });

        shutdown_tx.send(()).unwrap();
        let result = task.await.unwrap();
        assert!(matches!(result, Err(ServerError::ShuttingDown)));
        drop(client);
    }
}
