//! Reply Correlator (spec.md §4.6): arms on `REPLY`/caret, delivers on
//! queue-low, snapshotting the peer address so the reply reaches whoever
//! asked for it even if other clients interleave.

use std::net::SocketAddr;

/// Style of the pending reply — controls the leading `h` (spec.md §6.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyStyle {
    /// Armed by an explicit `<ESC>h` REPLY request.
    Explicit,
    /// Armed by a caret inside plain text.
    Caret,
}

struct Armed {
    payload: Vec<u8>,
    peer: SocketAddr,
    style: ReplyStyle,
}

#[derive(Default)]
pub struct ReplyCorrelator {
    armed: Option<Armed>,
}

impl ReplyCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Arm (or re-arm, overwriting) the reply slot.
    pub fn arm(&mut self, payload: Vec<u8>, peer: SocketAddr, style: ReplyStyle) {
        self.armed = Some(Armed { payload, peer, style });
    }

    /// ABORT/RESET: drop whatever was armed without sending it.
    pub fn clear(&mut self) {
        self.armed = None;
    }

    /// Queue-low delivery: returns the framed datagram and destination,
    /// clearing the slot. `None` if nothing was armed.
    pub fn deliver(&mut self) -> Option<(Vec<u8>, SocketAddr)> {
        let armed = self.armed.take()?;
        let mut framed = Vec::with_capacity(armed.payload.len() + 3);
        if armed.style == ReplyStyle::Explicit {
            framed.push(b'h');
        }
        framed.extend_from_slice(&armed.payload);
        framed.extend_from_slice(b"\r\n");
        Some((framed, armed.peer))
    }

    /// ABORT's `break\r\n` reply, sent only when ECHO was pending.
    pub fn abort_reply(&mut self) -> Option<(Vec<u8>, SocketAddr)> {
        let armed = self.armed.take()?;
        Some((b"break\r\n".to_vec(), armed.peer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> SocketAddr {
        "127.0.0.1:6789".parse().unwrap()
    }

    #[test]
    fn explicit_reply_gets_leading_h() {
        let mut c = ReplyCorrelator::new();
        c.arm(b"ack".to_vec(), peer(), ReplyStyle::Explicit);
        let (framed, dest) = c.deliver().unwrap();
        assert_eq!(framed, b"hack\r\n");
        assert_eq!(dest, peer());
        assert!(!c.is_armed());
    }

    #[test]
    fn caret_reply_has_no_leading_h() {
        let mut c = ReplyCorrelator::new();
        c.arm(b"22 crows, 1 stork?".to_vec(), peer(), ReplyStyle::Caret);
        let (framed, _) = c.deliver().unwrap();
        assert_eq!(framed, b"22 crows, 1 stork?\r\n");
    }

    #[test]
    fn rearming_overwrites_prior_arm() {
        let mut c = ReplyCorrelator::new();
        c.arm(b"first".to_vec(), peer(), ReplyStyle::Explicit);
        c.arm(b"second".to_vec(), peer(), ReplyStyle::Caret);
        let (framed, _) = c.deliver().unwrap();
        assert_eq!(framed, b"second\r\n");
    }

    #[test]
    fn deliver_without_arm_is_none() {
        let mut c = ReplyCorrelator::new();
        assert!(c.deliver().is_none());
    }

    #[test]
    fn abort_reply_is_literal_break() {
        let mut c = ReplyCorrelator::new();
        c.arm(b"ack".to_vec(), peer(), ReplyStyle::Explicit);
        let (framed, _) = c.abort_reply().unwrap();
        assert_eq!(framed, b"break\r\n");
        assert!(!c.is_armed());
    }

    #[test]
    fn clear_drops_without_sending() {
        let mut c = ReplyCorrelator::new();
        c.arm(b"ack".to_vec(), peer(), ReplyStyle::Explicit);
        c.clear();
        assert!(c.deliver().is_none());
    }
}
