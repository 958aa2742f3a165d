//! PTT state machine (spec.md §3, §4.3).
//!
//! Three independent flags — more than one may be set at once — mirroring
//! the bitset style of the teacher's `protocol::types::ModeRegister`.

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PttFlags: u8 {
        /// Raised by the Player at the first character of a burst, when a
        /// nonzero PTT delay is configured.
        const AUTO   = 0b001;
        /// Raised/lowered directly by a `PTT_STATE` control request.
        const MANUAL = 0b010;
        /// Raised while echoing received audio back out (device-specific,
        /// tracked here only so ABORT/reset can clear it uniformly).
        const ECHO   = 0b100;
    }
}

/// Owns the PTT bitset and the one piece of device access it needs. Pushed
/// and pulled only from the Event Loop thread — never mutated from a tone
/// engine callback directly (spec.md §5).
pub struct PttController {
    flags: PttFlags,
    delay_ms: u32,
}

/// What the caller should additionally do as a result of a PTT
/// transition — queuing a delay tone is the tone engine's job, not this
/// controller's, so it's handed back rather than performed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PttEffect {
    None,
    /// Raise PTT now, then key a silent delay of `micros` microseconds
    /// before the real tone is allowed to start.
    RaiseWithDelay { micros: u32 },
}

impl PttController {
    pub fn new(delay_ms: u32) -> Self {
        Self {
            flags: PttFlags::empty(),
            delay_ms,
        }
    }

    pub fn flags(&self) -> PttFlags {
        self.flags
    }

    pub fn is_active(&self) -> bool {
        !self.flags.is_empty()
    }

    pub fn set_delay_ms(&mut self, delay_ms: u32) {
        self.delay_ms = delay_ms;
    }

    /// Player calls this at the first character of a burst. Returns the
    /// effect the caller must apply to the device/tone engine.
    pub fn auto_activate(&mut self) -> PttEffect {
        if self.delay_ms == 0 || self.flags.contains(PttFlags::AUTO) {
            return PttEffect::None;
        }
        self.flags.insert(PttFlags::AUTO);
        PttEffect::RaiseWithDelay {
            micros: self.delay_ms * 20,
        }
    }

    /// `PTT_STATE=1`. Returns `true` if this transitioned the device line
    /// (i.e. no other flag was already holding PTT up).
    pub fn manual_activate(&mut self) -> bool {
        let was_active = self.is_active();
        self.flags.insert(PttFlags::MANUAL);
        !was_active
    }

    /// `PTT_STATE=0`. `still_sending` reflects whether the Player still has
    /// pending text or the tone engine's queue hasn't drained — if so, PTT
    /// is promoted to AUTO instead of dropped, so the line stays up until
    /// the burst actually finishes and [`queue_low`] releases it (spec.md
    /// §4.3: a manual release may never cut PTT out from under a send still
    /// in progress). Returns `true` if this should drop the device line
    /// right now.
    pub fn manual_release(&mut self, still_sending: bool) -> bool {
        self.flags.remove(PttFlags::MANUAL);
        if still_sending {
            self.flags.insert(PttFlags::AUTO);
        }
        !self.is_active()
    }

    /// Player's queue-low callback: AUTO, if set, drops on its own once the
    /// queue empties out from under it. Returns `true` if this should drop
    /// the device line.
    pub fn queue_low(&mut self) -> bool {
        if !self.flags.contains(PttFlags::AUTO) {
            return false;
        }
        self.flags.remove(PttFlags::AUTO);
        !self.is_active()
    }

    /// ABORT / RESET: clear everything unconditionally and drop PTT.
    pub fn abort(&mut self) {
        self.flags = PttFlags::empty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_activate_noop_without_delay() {
        let mut ptt = PttController::new(0);
        assert_eq!(ptt.auto_activate(), PttEffect::None);
        assert!(!ptt.flags().contains(PttFlags::AUTO));
    }

    #[test]
    fn auto_activate_raises_with_scaled_delay() {
        let mut ptt = PttController::new(10);
        assert_eq!(ptt.auto_activate(), PttEffect::RaiseWithDelay { micros: 200 });
        assert!(ptt.flags().contains(PttFlags::AUTO));
        // second call within the same burst is a no-op
        assert_eq!(ptt.auto_activate(), PttEffect::None);
    }

    #[test]
    fn manual_activate_and_release_round_trip() {
        let mut ptt = PttController::new(0);
        assert!(ptt.manual_activate());
        assert!(!ptt.manual_activate()); // already active, no transition
        assert!(ptt.manual_release(false));
        assert!(!ptt.is_active());
    }

    #[test]
    fn manual_release_promotes_to_auto_when_still_sending() {
        let mut ptt = PttController::new(0);
        ptt.manual_activate();
        assert!(!ptt.manual_release(true)); // still sending, line stays up
        assert!(ptt.is_active());
        assert!(ptt.flags().contains(PttFlags::AUTO));

        // later, the queue actually drains and releases it
        assert!(ptt.queue_low());
        assert!(!ptt.is_active());
    }

    #[test]
    fn manual_release_keeps_line_up_if_auto_still_set() {
        let mut ptt = PttController::new(10);
        ptt.auto_activate();
        ptt.manual_activate();
        assert!(!ptt.manual_release(false)); // AUTO still holds PTT up
        assert!(ptt.is_active());
    }

    #[test]
    fn queue_low_drops_only_when_auto_was_set() {
        let mut ptt = PttController::new(0);
        assert!(!ptt.queue_low());

        let mut ptt = PttController::new(10);
        ptt.auto_activate();
        assert!(ptt.queue_low());
        assert!(!ptt.is_active());
    }

    #[test]
    fn queue_low_leaves_manual_hold_in_place() {
        let mut ptt = PttController::new(10);
        ptt.auto_activate();
        ptt.manual_activate();
        assert!(!ptt.queue_low());
        assert!(ptt.is_active());
    }

    #[test]
    fn abort_clears_every_flag() {
        let mut ptt = PttController::new(10);
        ptt.auto_activate();
        ptt.manual_activate();
        ptt.abort();
        assert!(!ptt.is_active());
    }
}
