//! Production datagram sink over a tokio UDP socket.

use crate::error::EnvError;
use crate::DatagramSink;
use async_trait::async_trait;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio::net::UdpSocket;
use tracing::debug;

/// A UDP socket aimed at a single fixed destination.
///
/// The destination is resolved once, when the sink is created, and the
/// socket is held until the sink is dropped.
pub struct UdpSink {
    socket: UdpSocket,
    target: SocketAddr,
    label: String,
}

impl UdpSink {
    /// Creates a sink that sends to `localhost:<port>`.
    pub async fn connect_localhost(port: u16) -> Result<Self, EnvError> {
        Self::connect("localhost", port).await
    }

    /// Creates a sink that sends to `host:<port>`.
    ///
    /// IPv4 addresses are preferred when the host resolves to both families.
    /// The local socket is bound to an ephemeral port of the same family.
    ///
    /// # Errors
    ///
    /// `EnvError::Resolve` if the host has no address, `EnvError::Io` if the
    /// socket cannot be bound.
    pub async fn connect(host: &str, port: u16) -> Result<Self, EnvError> {
        let label = format!("{}:{}", host, port);

        let target = tokio::net::lookup_host((host, port))
            .await
            .map_err(|_| EnvError::resolve(&label))?
            .min_by_key(|addr| addr.is_ipv6())
            .ok_or_else(|| EnvError::resolve(&label))?;

        let local: SocketAddr = if target.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local).await?;
        debug!("UDP sink bound to {:?} -> {}", socket.local_addr().ok(), target);

        Ok(Self { socket, target, label })
    }

    /// Returns the resolved destination address.
    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

#[async_trait]
impl DatagramSink for UdpSink {
    async fn send(&self, payload: &[u8]) -> Result<usize, EnvError> {
        self.socket
            .send_to(payload, self.target)
            .await
            .map_err(|e| EnvError::network(format!("{}: {}", self.label, e)))
    }

    fn destination(&self) -> String {
        self.label.clone()
    }
}
