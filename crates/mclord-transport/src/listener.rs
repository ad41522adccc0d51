//! The TCP listener.

use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};

use crate::TransportError;

/// Accepts raw TCP connections.
pub struct TcpTransport {
    listener: TcpListener,
}

impl TcpTransport {
    /// Binds a listener to `addr`. Port `0` lets the OS pick one.
    pub async fn bind(addr: impl ToSocketAddrs) -> Result<Self, TransportError> {
        let listener =
            TcpListener::bind(addr).await.map_err(TransportError::Bind)?;
        if let Ok(local) = listener.local_addr() {
            tracing::info!(%local, "listening");
        }
        Ok(Self { listener })
    }

    /// The address actually bound.
    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        self.listener.local_addr().map_err(TransportError::Bind)
    }

    /// Waits for the next connection. Nagle is disabled on accepted
    /// sockets; every frame is a small interactive message.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr), TransportError> {
        let (stream, addr) =
            self.listener.accept().await.map_err(TransportError::Accept)?;
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(%addr, error = %e, "failed to set TCP_NODELAY");
        }
        tracing::trace!(%addr, "accepted TCP connection");
        Ok((stream, addr))
    }
}
