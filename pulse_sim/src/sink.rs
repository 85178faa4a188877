//! Recording datagram sink with fault injection.

use crate::context::SimContext;
use async_trait::async_trait;
use pulse_env::{DatagramSink, EnvError, PulseContext};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One captured datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentDatagram {
    /// Virtual time of the send
    pub at: Duration,

    pub bytes: Vec<u8>,
}

/// Sink that stores every datagram instead of sending it.
///
/// Clones share the same record, so a test can keep one handle while the
/// simulator owns another.
#[derive(Clone)]
pub struct RecordingSink {
    context: Arc<SimContext>,

    port: u16,

    sent: Arc<Mutex<Vec<SentDatagram>>>,

    /// When set, every send fails as if the port were unreachable
    unreachable: Arc<AtomicBool>,

    /// Fail every n-th attempt (0 = never)
    fail_every: u64,

    attempts: Arc<AtomicU64>,

    failures: Arc<AtomicU64>,
}

impl RecordingSink {
    pub fn new(context: Arc<SimContext>, port: u16) -> Self {
        Self {
            context,
            port,
            sent: Arc::new(Mutex::new(Vec::new())),
            unreachable: Arc::new(AtomicBool::new(false)),
            fail_every: 0,
            attempts: Arc::new(AtomicU64::new(0)),
            failures: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Makes every n-th send attempt fail.
    pub fn with_fail_every(mut self, n: u64) -> Self {
        self.fail_every = n;
        self
    }

    /// Toggles a full outage of the destination port.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Returns a copy of everything delivered so far.
    pub fn sent(&self) -> Vec<SentDatagram> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DatagramSink for RecordingSink {
    async fn send(&self, payload: &[u8]) -> Result<usize, EnvError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let dropped = self.fail_every > 0 && attempt % self.fail_every == 0;

        if self.unreachable.load(Ordering::SeqCst) || dropped {
            self.failures.fetch_add(1, Ordering::SeqCst);
            return Err(EnvError::network(format!(
                "{}: Connection refused",
                self.destination()
            )));
        }

        self.sent.lock().unwrap().push(SentDatagram {
            at: self.context.now(),
            bytes: payload.to_vec(),
        });
        Ok(payload.len())
    }

    fn destination(&self) -> String {
        format!("sim:{}", self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_with_virtual_timestamp() {
        let ctx = SimContext::shared(1);
        let sink = RecordingSink::new(ctx.clone(), 12345);

        ctx.advance_time(Duration::from_secs(3));
        assert_eq!(sink.send(b"p1001").await.unwrap(), 5);

        let sent = sink.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].at, Duration::from_secs(3));
        assert_eq!(sent[0].bytes, b"p1001");
        assert_eq!(sink.destination(), "sim:12345");
    }

    #[tokio::test]
    async fn test_outage_and_periodic_loss() {
        let ctx = SimContext::shared(1);
        let sink = RecordingSink::new(ctx, 9).with_fail_every(2);

        assert!(sink.send(b"a").await.is_ok());
        assert!(sink.send(b"b").await.is_err());
        assert!(sink.send(b"c").await.is_ok());

        sink.set_unreachable(true);
        assert!(matches!(sink.send(b"d").await, Err(EnvError::Network(_))));
        sink.set_unreachable(false);

        assert_eq!(sink.sent_count(), 2);
        assert_eq!(sink.failure_count(), 2);
    }

    #[tokio::test]
    async fn test_clones_share_record() {
        let ctx = SimContext::shared(1);
        let sink = RecordingSink::new(ctx, 9);
        let handle = sink.clone();

        sink.send(b"p1").await.unwrap();
        assert_eq!(handle.sent_count(), 1);
    }
}
