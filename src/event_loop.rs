//! Event Loop (spec.md §4.7): owns the UDP socket, multiplexes receive
//! readiness against tone-engine callback messages and an inactivity
//! backoff, exactly as the teacher's `io_loop` multiplexes its RT/BG
//! channels against the serial port (`io.rs`).

use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::Engine;
use crate::error::Result;
use crate::parser::{self, Request};
use crate::tone_engine::EngineMessage;

const ACTIVE_POLL: Duration = Duration::from_secs(1);
const IDLE_POLL: Duration = Duration::from_secs(86_400);
const IDLE_AFTER: Duration = Duration::from_secs(30);
const MAX_DATAGRAM: usize = 256;

/// Runs until EXIT or a fatal socket error. Never panics on a malformed
/// or truncated datagram (spec.md §4.1, §7).
pub async fn run(
    socket: UdpSocket,
    mut engine: Engine,
    mut tone_events: mpsc::UnboundedReceiver<EngineMessage>,
) -> Result<()> {
    let mut buf = [0u8; MAX_DATAGRAM];
    let mut last_activity = tokio::time::Instant::now();

    info!("event loop starting");

    loop {
        let idle_for = last_activity.elapsed();
        let poll = if idle_for < IDLE_AFTER { ACTIVE_POLL } else { IDLE_POLL };

        tokio::select! {
            biased;

            msg = tone_events.recv() => {
                match msg {
                    Some(EngineMessage::KeyEdge(on)) => {
                        last_activity = tokio::time::Instant::now();
                        if let Err(e) = engine.on_key_edge(on).await {
                            warn!(error = %e, "device error applying key edge");
                        }
                    }
                    Some(EngineMessage::QueueLow) => {
                        match engine.on_queue_low().await {
                            Ok(outcome) => {
                                if let Some((payload, dest)) = outcome.reply {
                                    if let Err(e) = socket.send_to(&payload, dest).await {
                                        warn!(error = %e, "failed to send reply datagram");
                                    }
                                }
                            }
                            Err(e) => warn!(error = %e, "device error on queue-low"),
                        }
                    }
                    None => {
                        warn!("tone engine event channel closed, exiting");
                        return Ok(());
                    }
                }
            }

            result = socket.recv_from(&mut buf) => {
                match result {
                    Ok((0, _)) => {
                        // Connectionless UDP: zero-length read is "no data",
                        // not a peer shutdown indication (spec.md §7).
                    }
                    Ok((n, peer)) => {
                        last_activity = tokio::time::Instant::now();
                        match handle_datagram(&mut engine, &buf[..n], peer, &socket).await {
                            Ok(true) => {
                                info!("EXIT requested, shutting down");
                                return Ok(());
                            }
                            Ok(false) => {}
                            Err(e) => warn!(error = %e, "error handling datagram"),
                        }
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        // normal for a non-blocking socket
                    }
                    Err(e) => {
                        warn!(error = %e, "socket receive error, continuing after back-off");
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                }
            }

            _ = tokio::time::sleep(poll) => {
                debug!(idle_for_secs = idle_for.as_secs(), "inactivity tick");
                if let Err(e) = engine.poll_footswitch().await {
                    warn!(error = %e, "device error polling footswitch");
                }
            }
        }
    }
}

/// Dispatch one datagram. Returns `true` if the caller should exit.
async fn handle_datagram(
    engine: &mut Engine,
    bytes: &[u8],
    peer: std::net::SocketAddr,
    socket: &UdpSocket,
) -> Result<bool> {
    let outcome = match parser::parse(bytes) {
        Request::PlainText(text) => engine.handle_plain_text(text, peer).await?,
        Request::Control { code, operand } => engine.handle_control(code, operand, peer).await?,
    };

    if let Some((payload, dest)) = outcome.reply {
        if let Err(e) = socket.send_to(&payload, dest).await {
            warn!(error = %e, "failed to send reply datagram");
        }
    }

    Ok(outcome.exit)
}
