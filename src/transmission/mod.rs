//! Raw transmission engine.
//!
//! Owns one already-open connection and pushes a prebuilt request through it
//! in two back-to-back writes: everything but the terminator, then the
//! terminator. Only the status line prefix of the reply is read.

pub mod connector;
pub mod payload;
pub mod status;

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::io::AsyncWriteExt;

use crate::config::{DEFAULT_STATUS_PREFIX_LEN, MAX_STATUS_PREFIX_LEN};
use crate::error::{ClaimError, ClaimResult};
use crate::scheduler::{Clock, SystemClock};

pub use connector::{ClaimStream, Connector, NativeTlsConnector};
pub use payload::{ClaimPayload, RequestShape, TERMINATOR};
pub use status::{parse_status_code, read_status_prefix};

/// What came back over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawExchange {
    pub status: u16,
    pub sent_at: DateTime<Utc>,
    pub received_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct RawTransmissionEngine {
    prefix_len: usize,
    clock: Arc<dyn Clock>,
}

impl RawTransmissionEngine {
    /// `prefix_len` is clamped to the range a status line can occupy.
    pub fn new(prefix_len: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            prefix_len: prefix_len.clamp(DEFAULT_STATUS_PREFIX_LEN, MAX_STATUS_PREFIX_LEN),
            clock,
        }
    }

    /// Fire the payload and close the stream, whatever the outcome.
    pub async fn transmit(
        &self,
        mut stream: Box<dyn ClaimStream>,
        payload: &ClaimPayload,
    ) -> ClaimResult<RawExchange> {
        let result = self.fire(&mut stream, payload).await;
        if let Err(err) = stream.shutdown().await {
            log::debug!("closing claim connection: {err}");
        }
        result
    }

    /// Two writes, then a bounded read of the status line.
    pub async fn fire<S>(&self, stream: &mut S, payload: &ClaimPayload) -> ClaimResult<RawExchange>
    where
        S: ClaimStream + ?Sized,
    {
        stream.write_all(payload.head()).await?;
        stream.write_all(payload.tail()).await?;
        stream.flush().await?;
        let sent_at = self.clock.now();
        let sent = Instant::now();

        let prefix = read_status_prefix(stream, self.prefix_len).await?;
        // Monotonic offset from the send instant, immune to wall-clock steps.
        let received_at = sent_at + TimeDelta::from_std(sent.elapsed()).unwrap_or(TimeDelta::zero());

        let status = parse_status_code(&prefix).ok_or_else(|| ClaimError::MalformedResponse {
            sent_at: Some(sent_at),
            prefix: prefix.clone(),
        })?;

        Ok(RawExchange {
            status,
            sent_at,
            received_at,
        })
    }
}

impl Default for RawTransmissionEngine {
    fn default() -> Self {
        Self::new(DEFAULT_STATUS_PREFIX_LEN, Arc::new(SystemClock))
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::pin::Pin;
    use std::sync::Mutex;
    use std::task::{Context, Poll};

    use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, ReadBuf};

    use super::*;
    use crate::config::ClaimerConfig;
    use crate::error::ErrorKind;

    /// Records each write call and replays a canned response.
    struct RecordingStream {
        writes: Arc<Mutex<Vec<Vec<u8>>>>,
        response: io::Cursor<Vec<u8>>,
        shut_down: Arc<Mutex<bool>>,
    }

    impl RecordingStream {
        fn new(response: &[u8]) -> Self {
            Self {
                writes: Arc::new(Mutex::new(Vec::new())),
                response: io::Cursor::new(response.to_vec()),
                shut_down: Arc::new(Mutex::new(false)),
            }
        }
    }

    impl AsyncWrite for RecordingStream {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            self.writes.lock().unwrap().push(buf.to_vec());
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            *self.shut_down.lock().unwrap() = true;
            Poll::Ready(Ok(()))
        }
    }

    impl AsyncRead for RecordingStream {
        fn poll_read(
            mut self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Pin::new(&mut self.response).poll_read(cx, buf)
        }
    }

    /// Fails every write like a reset connection.
    struct ResetStream;

    impl AsyncWrite for ResetStream {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    impl AsyncRead for ResetStream {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    fn payload() -> ClaimPayload {
        ClaimPayload::build(RequestShape::Rename, "api.minecraftservices.com", "Notch", "abc")
            .unwrap()
    }

    #[tokio::test]
    async fn writes_head_then_terminator() {
        let stream = RecordingStream::new(b"HTTP/1.1 200 OK\r\n\r\n");
        let writes = stream.writes.clone();
        let shut_down = stream.shut_down.clone();
        let payload = payload();

        let exchange = RawTransmissionEngine::default()
            .transmit(Box::new(stream), &payload)
            .await
            .unwrap();

        assert_eq!(exchange.status, 200);
        assert!(exchange.sent_at <= exchange.received_at);
        let writes = writes.lock().unwrap();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0], payload.head());
        assert_eq!(writes[1], b"\r\n");
        assert!(*shut_down.lock().unwrap());
    }

    #[tokio::test]
    async fn reports_forbidden_status() {
        let mut stream = RecordingStream::new(b"HTTP/1.1 403 Forbidden\r\n");
        let exchange = RawTransmissionEngine::default()
            .fire(&mut stream, &payload())
            .await
            .unwrap();
        assert_eq!(exchange.status, 403);
    }

    #[tokio::test]
    async fn malformed_reply_keeps_send_time() {
        let stream = RecordingStream::new(b"SSH-2.0-OpenSSH");
        let err = RawTransmissionEngine::default()
            .transmit(Box::new(stream), &payload())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
        assert!(err.sent_at().is_some());
    }

    #[tokio::test]
    async fn truncated_reply_is_malformed() {
        let stream = RecordingStream::new(b"HTTP/1.1 2");
        let err = RawTransmissionEngine::default()
            .transmit(Box::new(stream), &payload())
            .await
            .unwrap_err();
        match err {
            ClaimError::MalformedResponse { sent_at, prefix } => {
                assert!(sent_at.is_some());
                assert_eq!(prefix, b"HTTP/1.1 2");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn reset_connection_has_no_timestamps() {
        let err = RawTransmissionEngine::default()
            .transmit(Box::new(ResetStream), &payload())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransportFailure);
        assert_eq!(err.sent_at(), None);
    }

    /// Steps an hour backwards on every reading.
    struct SteppingBackClock(Mutex<DateTime<Utc>>);

    #[async_trait::async_trait]
    impl Clock for SteppingBackClock {
        fn now(&self) -> DateTime<Utc> {
            let mut now = self.0.lock().unwrap();
            let current = *now;
            *now -= TimeDelta::hours(1);
            current
        }

        async fn sleep(&self, _duration: std::time::Duration) {}
    }

    #[tokio::test]
    async fn receive_time_never_precedes_send_time() {
        let clock = Arc::new(SteppingBackClock(Mutex::new(Utc::now())));
        let engine = RawTransmissionEngine::new(DEFAULT_STATUS_PREFIX_LEN, clock);
        let mut stream = RecordingStream::new(b"HTTP/1.1 200 OK\r\n\r\n");

        let exchange = engine.fire(&mut stream, &payload()).await.unwrap();
        assert!(exchange.sent_at <= exchange.received_at);
    }

    #[tokio::test]
    async fn keep_alive_peer_does_not_stall_wide_prefix() {
        let config = ClaimerConfig::from_json_str(r#"{"status_prefix_len": 64}"#).unwrap();
        let engine = RawTransmissionEngine::new(config.status_prefix_len, Arc::new(SystemClock));
        let (client, mut server) = tokio::io::duplex(1024);
        tokio::spawn(async move {
            let mut received = Vec::new();
            let mut buf = [0u8; 256];
            while !received.ends_with(b"\r\n\r\n") {
                match server.read(&mut buf).await {
                    Ok(0) | Err(_) => return,
                    Ok(read) => received.extend_from_slice(&buf[..read]),
                }
            }
            let _ = server.write_all(b"HTTP/1.1 204 No Content\r\n\r\n").await;
            std::future::pending::<()>().await;
        });

        let exchange = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            engine.transmit(Box::new(client), &payload()),
        )
        .await
        .expect("claim read stalled on an open connection")
        .unwrap();
        assert_eq!(exchange.status, 204);
    }

    #[test]
    fn clamps_prefix_length() {
        let engine = RawTransmissionEngine::new(usize::MAX, Arc::new(SystemClock));
        assert_eq!(engine.prefix_len, MAX_STATUS_PREFIX_LEN);
        let engine = RawTransmissionEngine::new(0, Arc::new(SystemClock));
        assert_eq!(engine.prefix_len, DEFAULT_STATUS_PREFIX_LEN);
    }

    #[tokio::test]
    async fn server_sees_complete_request_over_duplex() {
        let (client, mut server) = tokio::io::duplex(1024);
        let payload = payload();
        let expected = payload.as_bytes().to_vec();

        let server_task = tokio::spawn(async move {
            let mut received = Vec::new();
            let mut buf = [0u8; 256];
            while !received.ends_with(b"\r\n\r\n") {
                let read = server.read(&mut buf).await.unwrap();
                assert!(read > 0);
                received.extend_from_slice(&buf[..read]);
            }
            server
                .write_all(b"HTTP/1.1 204 No Content\r\nContent-Length: 0\r\n\r\n")
                .await
                .unwrap();
            received
        });

        let exchange = RawTransmissionEngine::default()
            .transmit(Box::new(client), &payload)
            .await
            .unwrap();
        assert_eq!(exchange.status, 204);
        assert_eq!(server_task.await.unwrap(), expected);
    }
}
