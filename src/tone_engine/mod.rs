//! Tone-generation adapter (spec.md §4.4, §6.4) — the narrow interface the
//! core uses to talk to an external CW library. The real cwdaemon links a
//! C library that owns its own playback thread and calls back into the
//! daemon; this crate's `SoftwareToneEngine` is a drop-in stand-in that
//! paces the same interval sequence on a `tokio` task and reports back
//! over a channel instead of a raw callback, which is the idiomatic
//! realization of that contract in this codebase (see the teacher's
//! `IoHandle`/event-channel pattern in `io.rs`).

pub mod morse;
pub mod software;

pub use software::SoftwareToneEngine;

use async_trait::async_trait;

use crate::error::Result;
use crate::params::SoundSystem;

/// Message posted back from the tone engine's own thread/task to the
/// Event Loop. Never mutates engine state directly (spec.md §5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineMessage {
    /// The keying line should flip to `on`.
    KeyEdge(bool),
    /// The queue has drained to at or below its low-water mark.
    QueueLow,
}

/// The operations the core needs from a tone-generation library.
#[async_trait]
pub trait ToneEngine: Send + Sync {
    /// Tear down and recreate the underlying generator against a new
    /// sound backend (`SOUND_SYSTEM`/`-x`).
    async fn reopen(&mut self, backend: SoundSystem) -> Result<()>;

    async fn set_speed(&mut self, wpm: u8) -> Result<()>;
    async fn set_tone(&mut self, hz: u16) -> Result<()>;
    async fn set_volume(&mut self, pct: u8) -> Result<()>;
    /// `library_units` is already translated to the library's 20..=80
    /// range (see [`crate::params::Parameters::weighting_library_units`]).
    async fn set_weighting(&mut self, library_units: u8) -> Result<()>;
    /// One-shot extra gap (in dot-times) applied before the *next* queued
    /// character only — realizes the `^` pending-text marker.
    async fn set_temporary_gap(&mut self, dot_times: u8) -> Result<()>;

    /// Queue one character for keying.
    async fn enqueue_char(&mut self, c: char) -> Result<()>;
    /// Queue a silent or sounding tone of a fixed duration — used for the
    /// PTT turn-on delay and for `+n` pending-text delay markers.
    async fn enqueue_tone(&mut self, duration_us: u32, freq_hz: u16) -> Result<()>;

    /// Discard everything queued and in flight, dropping the key line
    /// immediately if it was up (ABORT, spec.md §4.3).
    async fn flush(&mut self) -> Result<()>;
    /// Block until the queue has fully drained.
    async fn wait_for_empty(&mut self) -> Result<()>;
    /// Number of items (characters/tones) still queued or in flight.
    fn queue_length(&self) -> usize;
}
