//! Parameter set shared by `defaults` and `current` (spec.md §3).

use crate::error::{Error, Result};

pub const MIN_MORSE_SPEED: u8 = 4;
pub const MAX_MORSE_SPEED: u8 = 60;
pub const DEFAULT_MORSE_SPEED: u8 = 24;

pub const MIN_TONE_HZ: u16 = 1;
pub const MAX_TONE_HZ: u16 = 4000;
pub const DEFAULT_TONE_HZ: u16 = 800;

pub const DEFAULT_VOLUME_PCT: u8 = 70;

pub const MIN_WEIGHTING: i8 = -50;
pub const MAX_WEIGHTING: i8 = 50;
pub const DEFAULT_WEIGHTING: i8 = 0;

pub const MIN_PTT_DELAY_MS: u32 = 0;
pub const MAX_PTT_DELAY_MS: u32 = 50;
pub const DEFAULT_PTT_DELAY_MS: u32 = 0;

pub const DEFAULT_NETWORK_PORT: u16 = 6789;

pub const PENDING_TEXT_CAPACITY: usize = 4000;

/// CW tone-generation backend, selected by `-x`/`--system` or `SOUND_SYSTEM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SoundSystem {
    #[default]
    None,
    Console,
    Oss,
    Alsa,
    PulseAudio,
    Soundcard,
}

impl SoundSystem {
    /// Parse the single-letter selector used on the wire and on the CLI:
    /// `n,c,o,a,p,s`.
    pub fn from_letter(c: u8) -> Option<Self> {
        match c {
            b'n' => Some(Self::None),
            b'c' => Some(Self::Console),
            b'o' => Some(Self::Oss),
            b'a' => Some(Self::Alsa),
            b'p' => Some(Self::PulseAudio),
            b's' => Some(Self::Soundcard),
            _ => None,
        }
    }
}

/// Morse speed, tone, volume, weighting, PTT turn-on delay, and sound
/// backend. Two instances of this type exist: `defaults` (set once at
/// startup from the CLI, never mutated) and `current` (mutated by control
/// requests, restored to `defaults` by RESET).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parameters {
    pub speed_wpm: u8,
    pub tone_hz: u16,
    pub volume_pct: u8,
    pub weighting: i8,
    pub ptt_delay_ms: u32,
    pub sound_system: SoundSystem,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            speed_wpm: DEFAULT_MORSE_SPEED,
            tone_hz: DEFAULT_TONE_HZ,
            volume_pct: DEFAULT_VOLUME_PCT,
            weighting: DEFAULT_WEIGHTING,
            ptt_delay_ms: DEFAULT_PTT_DELAY_MS,
            sound_system: SoundSystem::None,
        }
    }
}

impl Parameters {
    /// Apply a SPEED request if `wpm` is within the accepted range.
    /// Out-of-range values silently no-op (spec.md §4.1).
    pub fn set_speed(&mut self, wpm: u8) -> bool {
        if (MIN_MORSE_SPEED..=MAX_MORSE_SPEED).contains(&wpm) {
            self.speed_wpm = wpm;
            true
        } else {
            false
        }
    }

    /// Raise speed by `step` WPM, clamped to the library max.
    pub fn raise_speed(&mut self, step: u8) {
        self.speed_wpm = self.speed_wpm.saturating_add(step).min(MAX_MORSE_SPEED);
    }

    /// Lower speed by `step` WPM, clamped to the library min.
    pub fn lower_speed(&mut self, step: u8) {
        self.speed_wpm = self.speed_wpm.saturating_sub(step).max(MIN_MORSE_SPEED);
    }

    /// Apply a TONE request. 0 means "sidetone off" (volume forced to 0);
    /// a positive in-range value updates the tone and restores default
    /// volume (spec.md §4.1, §9 "surprising coupling").
    pub fn set_tone(&mut self, hz: u16, default_volume: u8) -> bool {
        if hz == 0 {
            self.volume_pct = 0;
            true
        } else if (MIN_TONE_HZ..=MAX_TONE_HZ).contains(&hz) {
            self.tone_hz = hz;
            self.volume_pct = default_volume;
            true
        } else {
            false
        }
    }

    pub fn set_volume(&mut self, pct: u8) -> bool {
        if pct <= 100 {
            self.volume_pct = pct;
            true
        } else {
            false
        }
    }

    /// Translate user-facing weighting (-50..50) to the library's 20..80
    /// range, as described in spec.md §3.
    pub fn set_weighting(&mut self, weighting: i8) -> bool {
        if (MIN_WEIGHTING..=MAX_WEIGHTING).contains(&weighting) {
            self.weighting = weighting;
            true
        } else {
            false
        }
    }

    pub fn weighting_library_units(&self) -> u8 {
        (50 + self.weighting as i32).clamp(20, 80) as u8
    }

    /// TX_DELAY: clamps out-of-range values instead of rejecting them
    /// (spec.md §4.1, §7).
    pub fn set_ptt_delay_ms(&mut self, ms: u32) -> u32 {
        let clamped = ms.min(MAX_PTT_DELAY_MS);
        self.ptt_delay_ms = clamped;
        clamped
    }
}

/// Strict decimal parsing: rejects empty strings and any trailing
/// non-digit byte (spec.md §4.1).
pub fn parse_decimal(bytes: &[u8]) -> Result<u32> {
    if bytes.is_empty() {
        return Err(Error::Config("empty operand".into()));
    }
    let s = std::str::from_utf8(bytes).map_err(|_| Error::Config("non-UTF8 operand".into()))?;
    s.parse::<u32>()
        .map_err(|_| Error::Config(format!("invalid decimal operand: {s:?}")))
}

/// As [`parse_decimal`], but signed (used by WEIGHTING).
pub fn parse_signed_decimal(bytes: &[u8]) -> Result<i32> {
    if bytes.is_empty() {
        return Err(Error::Config("empty operand".into()));
    }
    let s = std::str::from_utf8(bytes).map_err(|_| Error::Config("non-UTF8 operand".into()))?;
    s.parse::<i32>()
        .map_err(|_| Error::Config(format!("invalid signed decimal operand: {s:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speed_in_range_applies() {
        let mut p = Parameters::default();
        assert!(p.set_speed(40));
        assert_eq!(p.speed_wpm, 40);
    }

    #[test]
    fn speed_out_of_range_noop() {
        let mut p = Parameters::default();
        let before = p.speed_wpm;
        assert!(!p.set_speed(200));
        assert_eq!(p.speed_wpm, before);
    }

    #[test]
    fn speed_clamps_on_raise_lower() {
        let mut p = Parameters {
            speed_wpm: MAX_MORSE_SPEED - 1,
            ..Parameters::default()
        };
        p.raise_speed(2);
        assert_eq!(p.speed_wpm, MAX_MORSE_SPEED);

        let mut p = Parameters {
            speed_wpm: MIN_MORSE_SPEED + 1,
            ..Parameters::default()
        };
        p.lower_speed(2);
        assert_eq!(p.speed_wpm, MIN_MORSE_SPEED);
    }

    #[test]
    fn tone_zero_mutes_volume() {
        let mut p = Parameters::default();
        p.volume_pct = 70;
        assert!(p.set_tone(0, 70));
        assert_eq!(p.volume_pct, 0);
    }

    #[test]
    fn tone_nonzero_restores_default_volume() {
        let mut p = Parameters::default();
        p.volume_pct = 0;
        assert!(p.set_tone(700, 70));
        assert_eq!(p.tone_hz, 700);
        assert_eq!(p.volume_pct, 70);
    }

    #[test]
    fn weighting_translates_to_library_range() {
        let mut p = Parameters::default();
        p.set_weighting(-50);
        assert_eq!(p.weighting_library_units(), 20);
        p.set_weighting(50);
        assert_eq!(p.weighting_library_units(), 80);
        p.set_weighting(0);
        assert_eq!(p.weighting_library_units(), 50);
    }

    #[test]
    fn ptt_delay_clamps_to_50ms() {
        let mut p = Parameters::default();
        assert_eq!(p.set_ptt_delay_ms(999), 50);
        assert_eq!(p.ptt_delay_ms, 50);
    }

    #[test]
    fn decimal_rejects_empty_and_trailing_garbage() {
        assert!(parse_decimal(b"").is_err());
        assert!(parse_decimal(b"12x").is_err());
        assert_eq!(parse_decimal(b"42").unwrap(), 42);
    }

    #[test]
    fn sound_system_letters() {
        assert_eq!(SoundSystem::from_letter(b'n'), Some(SoundSystem::None));
        assert_eq!(SoundSystem::from_letter(b'a'), Some(SoundSystem::Alsa));
        assert_eq!(SoundSystem::from_letter(b'z'), None);
    }
}
