//! Connection factories for the raw claim socket.

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::error::TransportError;

/// Byte stream the claim is written to.
pub trait ClaimStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T> ClaimStream for T where T: AsyncRead + AsyncWrite + Unpin + Send {}

/// Opens the single connection a claim attempt uses.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, host: &str, port: u16) -> Result<Box<dyn ClaimStream>, TransportError>;
}

/// TLS over TCP using the platform TLS stack.
#[derive(Clone)]
pub struct NativeTlsConnector {
    tls: tokio_native_tls::TlsConnector,
}

impl NativeTlsConnector {
    pub fn new() -> Result<Self, TransportError> {
        let tls = native_tls::TlsConnector::builder().build()?;
        Ok(Self { tls: tls.into() })
    }
}

#[async_trait]
impl Connector for NativeTlsConnector {
    async fn connect(&self, host: &str, port: u16) -> Result<Box<dyn ClaimStream>, TransportError> {
        let tcp = TcpStream::connect((host, port)).await?;
        // The terminator is a two-byte write; Nagle would hold it back.
        tcp.set_nodelay(true)?;
        let stream = self.tls.connect(host, tcp).await?;
        log::debug!("tls established with {host}:{port}");
        Ok(Box::new(stream))
    }
}
