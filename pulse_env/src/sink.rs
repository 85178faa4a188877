//! Datagram sink abstraction for heartbeat emission.

use async_trait::async_trait;
use crate::error::EnvError;

/// Abstraction for fire-and-forget datagram output.
///
/// # Implementations
///
/// - **Production**: `UdpSink` - one UDP socket aimed at `localhost:<port>`
/// - **Simulation**: `RecordingSink` - captures payloads with virtual timestamps
///
/// # Delivery
///
/// ```text
/// Simulator                 Sink                   Supervisor
///   |                        |                          |
///   |-- send(b"p4242") ----->|                          |
///   |                        |-- datagram (no ack) ---->|
///   |<- Ok(5) / Err(..) -----|                          |
/// ```
#[async_trait]
pub trait DatagramSink: Send + Sync + 'static {
    /// Emits one datagram.
    ///
    /// # Returns
    /// * `Ok(n)` - `n` bytes handed to the transport
    /// * `Err(EnvError::Network)` - Immediate send failure
    ///
    /// # Note
    /// Success does not guarantee delivery. Callers never retry.
    async fn send(&self, payload: &[u8]) -> Result<usize, EnvError>;

    /// Human-readable destination (for logging).
    fn destination(&self) -> String;
}
