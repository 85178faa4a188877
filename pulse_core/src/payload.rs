//! Heartbeat datagram payload: ASCII `p` followed by the decimal pid.

/// Prefix the supervisor uses to recognise a heartbeat.
pub const HEARTBEAT_PREFIX: char = 'p';

/// An encoded heartbeat, e.g. `p4242`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload(String);

impl Payload {
    pub fn heartbeat(pid: u32) -> Self {
        Self(format!("{}{}", HEARTBEAT_PREFIX, pid))
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Recovers the sender's pid from a captured datagram.
    ///
    /// Returns `None` for anything that is not exactly `p<digits>`.
    pub fn parse(bytes: &[u8]) -> Option<u32> {
        let text = std::str::from_utf8(bytes).ok()?;
        let digits = text.strip_prefix(HEARTBEAT_PREFIX)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }
}

impl std::fmt::Display for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
