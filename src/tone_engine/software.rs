//! Software stand-in for the external CW tone-generation library: paces
//! the same on/off interval sequence a hardware sidetone generator would,
//! on a background `tokio` task, and reports key edges and the queue-low
//! condition back over an unbounded channel — mirroring the teacher's
//! `IoHandle` background-task-plus-channel shape (`io.rs`).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Notify};

use crate::error::Result;
use crate::params::SoundSystem;

use super::morse::{char_elements, Timing};
use super::{EngineMessage, ToneEngine};

enum ToneCommand {
    EnqueueChar(char),
    EnqueueTone { duration_us: u32, freq_hz: u16 },
    SetSpeed(u8),
    SetWeighting(u8),
    SetTemporaryGap(u8),
    Flush,
    Reopen,
    Shutdown,
}

struct QueuedElement {
    on: bool,
    dur: Duration,
    /// True on the last element belonging to one `enqueue_char`/
    /// `enqueue_tone` call — decrements the item counter when it finishes.
    item_done: bool,
}

/// Handle held by the Engine. Cheap to clone the counters it reads, but
/// the handle itself is not `Clone` — only the Event Loop owns it.
pub struct SoftwareToneEngine {
    tx: mpsc::UnboundedSender<ToneCommand>,
    pending_items: Arc<AtomicUsize>,
    empty_notify: Arc<Notify>,
}

impl SoftwareToneEngine {
    /// `events` is the channel the Event Loop selects on for key-edge and
    /// queue-low notifications. `watermark` is the item count at or below
    /// which a queue-low event fires (spec.md §9 resolves this to "<= 1",
    /// not "== 0" — so the caller gets a head start before the line
    /// actually goes silent).
    pub fn new(events: mpsc::UnboundedSender<EngineMessage>, watermark: usize) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let pending_items = Arc::new(AtomicUsize::new(0));
        let empty_notify = Arc::new(Notify::new());

        tokio::spawn(run(rx, events, pending_items.clone(), empty_notify.clone(), watermark));

        Self {
            tx,
            pending_items,
            empty_notify,
        }
    }

    fn send(&self, cmd: ToneCommand) -> Result<()> {
        self.tx
            .send(cmd)
            .map_err(|_| crate::error::Error::ToneEngine("tone engine task is gone".into()))
    }
}

async fn run(
    mut rx: mpsc::UnboundedReceiver<ToneCommand>,
    events: mpsc::UnboundedSender<EngineMessage>,
    pending_items: Arc<AtomicUsize>,
    empty_notify: Arc<Notify>,
    watermark: usize,
) {
    let mut timing = Timing::from_wpm_and_weighting(24, 50);
    let mut temp_gap_dot_times: Option<u8> = None;
    let mut queue: std::collections::VecDeque<QueuedElement> = std::collections::VecDeque::new();

    loop {
        let Some(current) = queue.pop_front() else {
            match rx.recv().await {
                Some(ToneCommand::Shutdown) | None => return,
                Some(ToneCommand::Flush) => {
                    pending_items.store(0, Ordering::Release);
                    empty_notify.notify_waiters();
                }
                Some(ToneCommand::Reopen) => {
                    queue.clear();
                    pending_items.store(0, Ordering::Release);
                }
                Some(ToneCommand::SetSpeed(wpm)) => {
                    timing = Timing::from_wpm_and_weighting(wpm, weighting_units(&timing));
                }
                Some(ToneCommand::SetWeighting(units)) => {
                    timing = Timing::from_wpm_and_weighting(wpm_from(&timing), units);
                }
                Some(ToneCommand::SetTemporaryGap(dots)) => temp_gap_dot_times = Some(dots),
                Some(ToneCommand::EnqueueChar(c)) => {
                    let elements = char_elements_with_gap(c, &timing, &mut temp_gap_dot_times);
                    push_item(elements, &mut queue, &pending_items);
                }
                Some(ToneCommand::EnqueueTone { duration_us, freq_hz }) => {
                    let on = freq_hz > 0;
                    push_item(vec![(on, Duration::from_micros(duration_us as u64))], &mut queue, &pending_items);
                }
            }
            continue;
        };

        let _ = events.send(EngineMessage::KeyEdge(current.on));
        let sleep = tokio::time::sleep(current.dur);
        tokio::pin!(sleep);

        tokio::select! {
            _ = &mut sleep => {
                if current.item_done {
                    pending_items.fetch_sub(1, Ordering::AcqRel);
                    notify_if_low(&pending_items, &events, &empty_notify, watermark);
                }
            }
            cmd = rx.recv() => {
                match cmd {
                    Some(ToneCommand::Flush) => {
                        if current.on {
                            let _ = events.send(EngineMessage::KeyEdge(false));
                        }
                        queue.clear();
                        pending_items.store(0, Ordering::Release);
                        empty_notify.notify_waiters();
                        let _ = events.send(EngineMessage::QueueLow);
                    }
                    Some(ToneCommand::Shutdown) | None => return,
                    Some(ToneCommand::Reopen) => {
                        queue.clear();
                        pending_items.store(0, Ordering::Release);
                        queue.push_front(current);
                    }
                    Some(ToneCommand::SetSpeed(wpm)) => {
                        timing = Timing::from_wpm_and_weighting(wpm, weighting_units(&timing));
                        queue.push_front(current);
                    }
                    Some(ToneCommand::SetWeighting(units)) => {
                        timing = Timing::from_wpm_and_weighting(wpm_from(&timing), units);
                        queue.push_front(current);
                    }
                    Some(ToneCommand::SetTemporaryGap(dots)) => {
                        temp_gap_dot_times = Some(dots);
                        queue.push_front(current);
                    }
                    Some(ToneCommand::EnqueueChar(c)) => {
                        let elements = char_elements_with_gap(c, &timing, &mut temp_gap_dot_times);
                        queue.push_front(current);
                        push_item(elements, &mut queue, &pending_items);
                    }
                    Some(ToneCommand::EnqueueTone { duration_us, freq_hz }) => {
                        let on = freq_hz > 0;
                        queue.push_front(current);
                        push_item(vec![(on, Duration::from_micros(duration_us as u64))], &mut queue, &pending_items);
                    }
                }
            }
        }
    }
}

fn push_item(
    elements: Vec<(bool, Duration)>,
    queue: &mut std::collections::VecDeque<QueuedElement>,
    pending_items: &Arc<AtomicUsize>,
) {
    if elements.is_empty() {
        return;
    }
    pending_items.fetch_add(1, Ordering::AcqRel);
    let last = elements.len() - 1;
    for (i, (on, dur)) in elements.into_iter().enumerate() {
        queue.push_back(QueuedElement {
            on,
            dur,
            item_done: i == last,
        });
    }
}

fn notify_if_low(
    pending_items: &Arc<AtomicUsize>,
    events: &mpsc::UnboundedSender<EngineMessage>,
    empty_notify: &Arc<Notify>,
    watermark: usize,
) {
    let remaining = pending_items.load(Ordering::Acquire);
    if remaining == 0 {
        empty_notify.notify_waiters();
    }
    if remaining <= watermark {
        let _ = events.send(EngineMessage::QueueLow);
    }
}

/// Consumes the one-shot temporary gap (the `^` pending-text marker) as a
/// leading silence before the character's own elements.
fn char_elements_with_gap(c: char, timing: &Timing, temp_gap_dot_times: &mut Option<u8>) -> Vec<(bool, Duration)> {
    let mut elements = Vec::new();
    if let Some(dots) = temp_gap_dot_times.take() {
        elements.push((false, timing.dot.mul_f64(dots as f64)));
    }
    elements.extend(char_elements(c, timing));
    elements
}

/// `Timing` doesn't store the wpm/weighting it was built from; recover an
/// equivalent wpm from the dot length rather than threading extra state
/// through every command arm.
fn wpm_from(timing: &Timing) -> u8 {
    let dot_ms = timing.dot.as_secs_f64() * 1000.0;
    if dot_ms <= 0.0 {
        24
    } else {
        ((1200.0 / dot_ms).round() as u8).clamp(4, 60)
    }
}

fn weighting_units(_timing: &Timing) -> u8 {
    50
}

#[async_trait]
impl ToneEngine for SoftwareToneEngine {
    async fn reopen(&mut self, _backend: SoundSystem) -> Result<()> {
        self.send(ToneCommand::Reopen)
    }

    async fn set_speed(&mut self, wpm: u8) -> Result<()> {
        self.send(ToneCommand::SetSpeed(wpm))
    }

    async fn set_tone(&mut self, _hz: u16) -> Result<()> {
        // Frequency only matters to a real audio backend; the software
        // stand-in only paces on/off intervals.
        Ok(())
    }

    async fn set_volume(&mut self, _pct: u8) -> Result<()> {
        Ok(())
    }

    async fn set_weighting(&mut self, library_units: u8) -> Result<()> {
        self.send(ToneCommand::SetWeighting(library_units))
    }

    async fn set_temporary_gap(&mut self, dot_times: u8) -> Result<()> {
        self.send(ToneCommand::SetTemporaryGap(dot_times))
    }

    async fn enqueue_char(&mut self, c: char) -> Result<()> {
        self.send(ToneCommand::EnqueueChar(c))
    }

    async fn enqueue_tone(&mut self, duration_us: u32, freq_hz: u16) -> Result<()> {
        self.send(ToneCommand::EnqueueTone { duration_us, freq_hz })
    }

    async fn flush(&mut self) -> Result<()> {
        self.send(ToneCommand::Flush)
    }

    async fn wait_for_empty(&mut self) -> Result<()> {
        while self.pending_items.load(Ordering::Acquire) > 0 {
            self.empty_notify.notified().await;
        }
        Ok(())
    }

    fn queue_length(&self) -> usize {
        self.pending_items.load(Ordering::Acquire)
    }
}

impl Drop for SoftwareToneEngine {
    fn drop(&mut self) {
        let _ = self.tx.send(ToneCommand::Shutdown);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    #[tokio::test]
    async fn enqueued_char_produces_key_edges_and_drains() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut engine = SoftwareToneEngine::new(tx, 1);
        engine.set_speed(60).await.unwrap();
        engine.enqueue_char('E').await.unwrap();

        let first = timeout(Duration::from_millis(200), rx.recv()).await.unwrap().unwrap();
        assert_eq!(first, EngineMessage::KeyEdge(true));

        timeout(Duration::from_millis(500), engine.wait_for_empty()).await.unwrap().unwrap();
        assert_eq!(engine.queue_length(), 0);
    }

    #[tokio::test]
    async fn flush_drops_key_line_and_clears_queue() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut engine = SoftwareToneEngine::new(tx, 1);
        engine.set_speed(4).await.unwrap(); // slow, so flush lands mid-element
        engine.enqueue_char('M').await.unwrap(); // two dashes, long enough to interrupt

        let first = timeout(Duration::from_millis(500), rx.recv()).await.unwrap().unwrap();
        assert_eq!(first, EngineMessage::KeyEdge(true));

        engine.flush().await.unwrap();

        let mut saw_key_off = false;
        let mut saw_queue_low = false;
        for _ in 0..4 {
            if let Ok(Some(msg)) = timeout(Duration::from_millis(200), rx.recv()).await {
                match msg {
                    EngineMessage::KeyEdge(false) => saw_key_off = true,
                    EngineMessage::QueueLow => saw_queue_low = true,
                    _ => {}
                }
            }
        }
        assert!(saw_key_off);
        assert!(saw_queue_low);
        assert_eq!(engine.queue_length(), 0);
    }

    #[tokio::test]
    async fn zero_hz_enqueue_tone_stays_silent() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut engine = SoftwareToneEngine::new(tx, 1);
        engine.enqueue_tone(1_000, 0).await.unwrap();

        let first = timeout(Duration::from_millis(200), rx.recv()).await.unwrap().unwrap();
        assert_eq!(first, EngineMessage::KeyEdge(false));
    }

    #[tokio::test]
    async fn queue_low_fires_at_watermark() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut engine = SoftwareToneEngine::new(tx, 1);
        engine.set_speed(60).await.unwrap();
        engine.enqueue_char('E').await.unwrap();
        engine.enqueue_char('E').await.unwrap();

        let mut saw_queue_low = false;
        for _ in 0..10 {
            match timeout(Duration::from_millis(300), rx.recv()).await {
                Ok(Some(EngineMessage::QueueLow)) => {
                    saw_queue_low = true;
                    break;
                }
                Ok(Some(_)) => continue,
                _ => break,
            }
        }
        assert!(saw_queue_low);
    }
}
