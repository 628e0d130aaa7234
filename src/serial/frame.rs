//! Line framing and frame classification for the device link.
//!
//! The device speaks newline-delimited text. Two frame kinds carry data:
//! `SIGNAL:<int>` and `Clients:<int>`. Everything else is chatter from the
//! firmware (boot banners, debug prints) and never reaches the dispatcher.

use std::num::IntErrorKind;

use crate::config;

/// Typed event handed from a producer (reader or simulation) to the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialEvent {
    /// Device selected a page. Range checking happens at dispatch.
    SignalChanged { id: i64 },
    /// Number of clients connected to the device's access point
    ClientCountChanged { count: u64 },
}

/// Result of classifying one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A recognized frame with a valid integer payload
    Event(SerialEvent),
    /// Recognized prefix, unparsable payload
    Malformed,
    /// Any other line
    Other,
}

/// Classify a single line received from the device
pub fn classify(line: &str) -> Frame {
    let line = line.trim();

    if let Some(payload) = line.strip_prefix(config::SIGNAL_PREFIX) {
        return match payload.trim().parse::<i64>() {
            Ok(id) => Frame::Event(SerialEvent::SignalChanged { id }),
            Err(_) => Frame::Malformed,
        };
    }

    if let Some(payload) = line.strip_prefix(config::CLIENTS_PREFIX) {
        return match payload.trim().parse::<u64>() {
            Ok(count) => Frame::Event(SerialEvent::ClientCountChanged { count }),
            // Counts are unbounded; anything past u64 saturates
            Err(e) if *e.kind() == IntErrorKind::PosOverflow => {
                Frame::Event(SerialEvent::ClientCountChanged { count: u64::MAX })
            }
            Err(_) => Frame::Malformed,
        };
    }

    Frame::Other
}

/// Buffers raw serial bytes and yields complete lines.
///
/// Lines are split on `\n`; a trailing `\r` is dropped. Invalid UTF-8 is
/// replaced rather than rejected so one corrupted byte cannot wedge the link.
pub struct LineFramer {
    buffer: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(256),
        }
    }

    /// Feed bytes, returning every line completed by this chunk
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();

        for &b in bytes {
            if b == b'\n' {
                if self.buffer.last() == Some(&b'\r') {
                    self.buffer.pop();
                }
                lines.push(String::from_utf8_lossy(&self.buffer).into_owned());
                self.buffer.clear();
            } else {
                self.buffer.push(b);
            }
        }

        lines
    }

    /// Drop any partial line
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Number of bytes waiting for a newline
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_signal() {
        assert_eq!(
            classify("SIGNAL:3"),
            Frame::Event(SerialEvent::SignalChanged { id: 3 })
        );
        assert_eq!(
            classify("SIGNAL: 7 "),
            Frame::Event(SerialEvent::SignalChanged { id: 7 })
        );
        // Out-of-range ids pass framing; the dispatcher rejects them
        assert_eq!(
            classify("SIGNAL:11"),
            Frame::Event(SerialEvent::SignalChanged { id: 11 })
        );
        assert_eq!(
            classify("SIGNAL:-1"),
            Frame::Event(SerialEvent::SignalChanged { id: -1 })
        );
    }

    #[test]
    fn test_classify_clients() {
        assert_eq!(
            classify("Clients:2"),
            Frame::Event(SerialEvent::ClientCountChanged { count: 2 })
        );
        assert_eq!(
            classify("Clients: 0\r"),
            Frame::Event(SerialEvent::ClientCountChanged { count: 0 })
        );
    }

    #[test]
    fn test_classify_large_client_counts() {
        assert_eq!(
            classify("Clients:4294967296"),
            Frame::Event(SerialEvent::ClientCountChanged { count: 4_294_967_296 })
        );
        assert_eq!(
            classify("Clients:99999999999999999999999"),
            Frame::Event(SerialEvent::ClientCountChanged { count: u64::MAX })
        );
        assert_eq!(classify("Clients:-99999999999999999999999"), Frame::Malformed);
    }

    #[test]
    fn test_classify_malformed() {
        assert_eq!(classify("SIGNAL:abc"), Frame::Malformed);
        assert_eq!(classify("SIGNAL:"), Frame::Malformed);
        assert_eq!(classify("Clients:"), Frame::Malformed);
        assert_eq!(classify("Clients:-3"), Frame::Malformed);
    }

    #[test]
    fn test_classify_other() {
        assert_eq!(classify("WiFi AP started"), Frame::Other);
        assert_eq!(classify(""), Frame::Other);
        // Prefixes are case-sensitive
        assert_eq!(classify("signal:3"), Frame::Other);
    }

    #[test]
    fn test_framer_split_chunks() {
        let mut framer = LineFramer::new();
        assert!(framer.push(b"SIG").is_empty());
        assert_eq!(framer.pending(), 3);

        let lines = framer.push(b"NAL:4\nClients:1\n");
        assert_eq!(lines, vec!["SIGNAL:4".to_string(), "Clients:1".to_string()]);
        assert_eq!(framer.pending(), 0);
    }

    #[test]
    fn test_framer_crlf() {
        let mut framer = LineFramer::new();
        let lines = framer.push(b"SIGNAL:2\r\n");
        assert_eq!(lines, vec!["SIGNAL:2".to_string()]);
    }

    #[test]
    fn test_framer_invalid_utf8() {
        let mut framer = LineFramer::new();
        let lines = framer.push(b"\xff\xfe\nSIGNAL:1\n");
        assert_eq!(lines.len(), 2);
        assert_eq!(classify(&lines[0]), Frame::Other);
        assert_eq!(
            classify(&lines[1]),
            Frame::Event(SerialEvent::SignalChanged { id: 1 })
        );
    }

    #[test]
    fn test_framer_reset() {
        let mut framer = LineFramer::new();
        framer.push(b"partial");
        framer.reset();
        assert_eq!(framer.push(b"SIGNAL:5\n"), vec!["SIGNAL:5".to_string()]);
    }
}
