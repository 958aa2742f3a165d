//! Central coordinator: owns every piece of shared state named in
//! spec.md §3 and is the single point where it is mutated. Only the Event
//! Loop touches an `Engine` — tone engine callbacks arrive as
//! [`crate::tone_engine::EngineMessage`]s and are applied here, never from
//! the callback's own task.

use std::net::SocketAddr;
use std::time::Duration;

use crate::device::CwDevice;
use crate::error::Result;
use crate::params::{parse_decimal, parse_signed_decimal, Parameters, SoundSystem};
use crate::ptt::{PttController, PttEffect, PttFlags};
use crate::reply::{ReplyCorrelator, ReplyStyle};
use crate::text_queue::{PlayerEvent, TextQueue};
use crate::tone_engine::ToneEngine;

/// Low-water mark for the queue-low callback (spec.md §4.4 `watermark=1`).
/// §9's open question resolves the *PTT-drop* comparison to `<= 1`, which
/// this same watermark realizes.
pub const QUEUE_LOW_WATERMARK: usize = 1;

/// What the Event Loop must do as a result of handling one datagram or
/// one tone-engine message.
#[derive(Debug, Default)]
pub struct Outcome {
    pub exit: bool,
    pub reply: Option<(Vec<u8>, SocketAddr)>,
}

impl Outcome {
    fn reply(payload: Vec<u8>, peer: SocketAddr) -> Self {
        Self {
            exit: false,
            reply: Some((payload, peer)),
        }
    }
}

pub struct Engine {
    defaults: Parameters,
    current: Parameters,
    ptt: PttController,
    text: TextQueue,
    reply: ReplyCorrelator,
    device: Box<dyn CwDevice>,
    tone: Box<dyn ToneEngine>,
    word_mode: bool,
    sending: bool,
    reply_accum: Vec<u8>,
    footswitch_pressed: bool,
}

impl Engine {
    pub fn new(defaults: Parameters, device: Box<dyn CwDevice>, tone: Box<dyn ToneEngine>) -> Self {
        Self {
            current: defaults,
            defaults,
            ptt: PttController::new(defaults.ptt_delay_ms),
            text: TextQueue::new(crate::params::PENDING_TEXT_CAPACITY),
            reply: ReplyCorrelator::new(),
            device,
            tone,
            word_mode: false,
            sending: false,
            reply_accum: Vec::new(),
            footswitch_pressed: false,
        }
    }

    pub fn current(&self) -> &Parameters {
        &self.current
    }

    /// Initialize the device and tone engine to the startup parameters.
    pub async fn init(&mut self) -> Result<()> {
        self.device.init().await?;
        self.device.reset().await?;
        self.tone.reopen(self.current.sound_system).await?;
        self.tone.set_speed(self.current.speed_wpm).await?;
        self.tone.set_tone(self.current.tone_hz).await?;
        self.tone.set_volume(self.current.volume_pct).await?;
        self.tone.set_weighting(self.current.weighting_library_units()).await?;
        Ok(())
    }

    /// One full plain-text or control datagram, already CRLF-stripped and
    /// classified (spec.md §4.1).
    pub async fn handle_plain_text(&mut self, bytes: &[u8], peer: SocketAddr) -> Result<Outcome> {
        self.text.append(bytes);
        self.drive_player(peer).await?;
        Ok(Outcome::default())
    }

    pub async fn handle_control(&mut self, code: u8, operand: &[u8], peer: SocketAddr) -> Result<Outcome> {
        crate::dispatch::dispatch(self, code, operand, peer).await
    }

    /// Consume everything currently pending and push it into the tone
    /// engine, applying inline markers as they're encountered.
    async fn drive_player(&mut self, peer: SocketAddr) -> Result<()> {
        while let Some(event) = self.text.take_next() {
            match event {
                PlayerEvent::RaiseSpeed => {
                    self.current.raise_speed(2);
                    self.tone.set_speed(self.current.speed_wpm).await?;
                }
                PlayerEvent::LowerSpeed => {
                    self.current.lower_speed(2);
                    self.tone.set_speed(self.current.speed_wpm).await?;
                }
                PlayerEvent::TemporaryGap => {
                    self.tone.set_temporary_gap(2).await?;
                }
                PlayerEvent::EndOfMessage => {
                    let payload = std::mem::take(&mut self.reply_accum);
                    self.reply.arm(payload, peer, ReplyStyle::Caret);
                }
                PlayerEvent::Char(c) => {
                    if !self.sending {
                        self.sending = true;
                        self.activate_auto_ptt().await?;
                    }
                    self.reply_accum.push(c as u8);
                    self.tone.enqueue_char(c).await?;
                }
            }
        }
        Ok(())
    }

    async fn activate_auto_ptt(&mut self) -> Result<()> {
        match self.ptt.auto_activate() {
            PttEffect::None => Ok(()),
            PttEffect::RaiseWithDelay { micros } => {
                self.device.ptt(true).await?;
                if self.tone.enqueue_tone(micros, 0).await.is_err() {
                    tokio::time::sleep(Duration::from_micros(micros as u64)).await;
                }
                Ok(())
            }
        }
    }

    /// Applied whenever the tone engine's keying callback fires. Resets
    /// the Event Loop's inactivity counter as a side effect of being
    /// called at all (spec.md §4.4) — the counter itself lives in the
    /// Event Loop, not here.
    pub async fn on_key_edge(&mut self, on: bool) -> Result<()> {
        self.device.cw(on).await
    }

    /// Applied when the tone engine reports the queue has drained to the
    /// watermark (spec.md §4.3, §4.6).
    pub async fn on_queue_low(&mut self) -> Result<Outcome> {
        let queue_len = self.tone.queue_length();

        if self.text.is_empty() && queue_len <= QUEUE_LOW_WATERMARK {
            if self.ptt.queue_low() {
                self.device.ptt(false).await?;
            }
            self.sending = false;
        }

        if self.reply.is_armed() && self.text.is_empty() && queue_len <= QUEUE_LOW_WATERMARK {
            if let Some((framed, dest)) = self.reply.deliver() {
                if self.ptt.flags().contains(PttFlags::AUTO) {
                    self.tone.enqueue_tone(1, 0).await?;
                    self.tone.enqueue_tone(1, 0).await?;
                }
                return Ok(Outcome::reply(framed, dest));
            }
        }

        Ok(Outcome::default())
    }

    /// Event Loop's per-tick footswitch poll (spec.md §4.7, §6.3). A no-op
    /// on devices that don't report the capability. Edge-triggered: only
    /// acts when the pressed/released state actually changes, driving PTT
    /// through the same manual activate/release path as `PTT_STATE`.
    pub async fn poll_footswitch(&mut self) -> Result<()> {
        if !self.device.has_footswitch() {
            return Ok(());
        }
        let pressed = self.device.footswitch_read().await?;
        if pressed == self.footswitch_pressed {
            return Ok(());
        }
        self.footswitch_pressed = pressed;

        if pressed {
            if self.ptt.manual_activate() {
                self.device.ptt(true).await?;
            }
        } else {
            let still_sending = !self.text.is_empty() || self.tone.queue_length() > QUEUE_LOW_WATERMARK;
            if self.ptt.manual_release(still_sending) {
                self.device.ptt(false).await?;
            } else if still_sending {
                self.sending = true;
            }
        }
        Ok(())
    }

    pub async fn reset(&mut self) -> Result<Outcome> {
        self.text.clear();
        self.reply_accum.clear();
        self.reply.clear();
        self.current = self.defaults;
        self.ptt.abort();
        self.ptt.set_delay_ms(self.current.ptt_delay_ms);
        self.sending = false;
        self.device.reset().await?;
        self.tone.flush().await?;
        self.tone.set_speed(self.current.speed_wpm).await?;
        self.tone.set_tone(self.current.tone_hz).await?;
        self.tone.set_volume(self.current.volume_pct).await?;
        self.tone.set_weighting(self.current.weighting_library_units()).await?;
        Ok(Outcome::default())
    }

    pub async fn abort(&mut self, peer: SocketAddr) -> Result<Outcome> {
        if self.word_mode {
            return Ok(Outcome::default());
        }

        let was_armed = self.reply.is_armed();
        let break_reply = if was_armed {
            self.reply.abort_reply()
        } else {
            None
        };

        self.text.clear();
        self.reply_accum.clear();
        self.tone.flush().await?;
        self.tone.wait_for_empty().await?;
        if self.ptt.is_active() {
            self.device.ptt(false).await?;
        }
        self.ptt.abort();
        self.sending = false;

        Ok(match break_reply {
            Some((payload, _)) => Outcome::reply(payload, peer),
            None => Outcome::default(),
        })
    }

    pub fn set_word_mode(&mut self) {
        self.word_mode = true;
    }

    pub async fn set_speed(&mut self, operand: &[u8]) -> Result<()> {
        if let Ok(value) = parse_decimal(operand) {
            if let Ok(wpm) = u8::try_from(value) {
                if self.current.set_speed(wpm) {
                    self.tone.set_speed(wpm).await?;
                }
            }
        }
        Ok(())
    }

    pub async fn set_tone(&mut self, operand: &[u8]) -> Result<()> {
        if let Ok(value) = parse_decimal(operand) {
            if let Ok(hz) = u16::try_from(value) {
                if self.current.set_tone(hz, self.defaults.volume_pct) {
                    self.tone.set_tone(self.current.tone_hz).await?;
                    self.tone.set_volume(self.current.volume_pct).await?;
                }
            }
        }
        Ok(())
    }

    pub async fn set_volume(&mut self, operand: &[u8]) -> Result<()> {
        if let Ok(value) = parse_decimal(operand) {
            if let Ok(pct) = u8::try_from(value) {
                if self.current.set_volume(pct) {
                    self.tone.set_volume(pct).await?;
                }
            }
        }
        Ok(())
    }

    pub async fn set_weighting(&mut self, operand: &[u8]) -> Result<()> {
        if let Ok(value) = parse_signed_decimal(operand) {
            if let Ok(weighting) = i8::try_from(value) {
                if self.current.set_weighting(weighting) {
                    self.tone.set_weighting(self.current.weighting_library_units()).await?;
                }
            }
        }
        Ok(())
    }

    pub async fn set_ptt_delay(&mut self, operand: &[u8]) -> Result<()> {
        if let Ok(value) = parse_decimal(operand) {
            let ms = self.current.set_ptt_delay_ms(value);
            self.ptt.set_delay_ms(ms);
            if ms == 0 && self.ptt.is_active() {
                self.device.ptt(false).await?;
                self.ptt.abort();
                self.sending = false;
            }
        }
        Ok(())
    }

    pub async fn set_ptt_state(&mut self, operand: &[u8]) -> Result<()> {
        match operand.first() {
            Some(b'1') => {
                if self.ptt.manual_activate() {
                    self.device.ptt(true).await?;
                }
            }
            Some(b'0') => {
                let still_sending = !self.text.is_empty() || self.tone.queue_length() > QUEUE_LOW_WATERMARK;
                if self.ptt.manual_release(still_sending) {
                    self.device.ptt(false).await?;
                } else if still_sending {
                    self.sending = true;
                }
            }
            _ => {}
        }
        Ok(())
    }

    pub async fn set_ssb_way(&mut self, operand: &[u8]) -> Result<()> {
        use crate::device::SsbRoute;
        let route = match operand.first() {
            Some(b'1') => SsbRoute::Soundcard,
            Some(b'0') => SsbRoute::Microphone,
            _ => return Ok(()),
        };
        let _ = self.device.ssb_route(route).await;
        Ok(())
    }

    pub async fn band_switch(&mut self, operand: &[u8]) -> Result<()> {
        if let Ok(value) = parse_decimal(operand) {
            if value <= 15 {
                let _ = self.device.band_switch(value as u8).await;
            }
        }
        Ok(())
    }

    pub async fn set_sound_system(&mut self, operand: &[u8]) -> Result<()> {
        if let Some(&letter) = operand.first() {
            if let Some(system) = SoundSystem::from_letter(letter) {
                self.current.sound_system = system;
                self.tone.reopen(system).await?;
                self.tone.set_speed(self.current.speed_wpm).await?;
                self.tone.set_tone(self.current.tone_hz).await?;
                self.tone.set_volume(self.current.volume_pct).await?;
                self.tone.set_weighting(self.current.weighting_library_units()).await?;
            }
        }
        Ok(())
    }

    /// TUNE (spec.md §4.5): `n` one-second tones followed by a single `e`
    /// to end at a natural character boundary, implemented as ordinary
    /// queue entries so it stays interruptible by ABORT.
    pub async fn tune(&mut self, operand: &[u8]) -> Result<()> {
        let Ok(seconds) = parse_decimal(operand) else {
            return Ok(());
        };
        if seconds == 0 || seconds > 10 {
            return Ok(());
        }

        self.tone.flush().await?;
        if !self.sending {
            self.sending = true;
            self.activate_auto_ptt().await?;
        }
        for _ in 0..seconds {
            self.tone.enqueue_tone(1_000_000, self.current.tone_hz).await?;
        }
        self.tone.enqueue_char('E').await?;
        Ok(())
    }

    pub async fn swap_device(&mut self, name_or_path: &str) -> Result<()> {
        let mut probed = crate::device::probe_device(
            name_or_path,
            crate::device::PinAssignment::default_cw(),
            crate::device::PinAssignment::default_ptt(),
        )
        .await;
        probed.init().await?;
        self.device.release().await?;
        self.device = probed;
        Ok(())
    }

    /// EXIT (`<ESC>5`): release the device before the Event Loop tears
    /// down, so the line is left in a safe state and the fd/port doesn't
    /// leak past process exit (spec.md §4.1).
    pub async fn shutdown(&mut self) -> Result<()> {
        self.device.release().await
    }

    /// REPLY (`<ESC>h` + payload): arm the reply slot under the peer that
    /// sent this datagram (spec.md §4.6).
    pub fn arm_explicit_reply(&mut self, payload: &[u8], peer: SocketAddr) {
        self.reply.arm(payload.to_vec(), peer, ReplyStyle::Explicit);
    }
}
