//! Control-request dispatch (spec.md §4.1). A `match` on the request-code
//! byte is Rust's natural realization of the "256-entry jump table"
//! design note — the compiler lowers a dense byte match to exactly that,
//! without hand-rolling a function-pointer array.

use std::net::SocketAddr;

use crate::engine::{Engine, Outcome};
use crate::error::Result;

pub async fn dispatch(engine: &mut Engine, code: u8, operand: &[u8], peer: SocketAddr) -> Result<Outcome> {
    match code {
        b'0' => engine.reset().await,
        b'2' => {
            engine.set_speed(operand).await?;
            Ok(Outcome::default())
        }
        b'3' => {
            engine.set_tone(operand).await?;
            Ok(Outcome::default())
        }
        b'4' => engine.abort(peer).await,
        b'5' => {
            engine.shutdown().await?;
            Ok(Outcome {
                exit: true,
                reply: None,
            })
        }
        b'6' => {
            engine.set_word_mode();
            Ok(Outcome::default())
        }
        b'7' => {
            engine.set_weighting(operand).await?;
            Ok(Outcome::default())
        }
        b'8' => {
            if let Ok(name) = std::str::from_utf8(operand) {
                engine.swap_device(name).await?;
            }
            Ok(Outcome::default())
        }
        b'9' => Ok(Outcome::default()), // obsolete, no-op
        b'a' => {
            engine.set_ptt_state(operand).await?;
            Ok(Outcome::default())
        }
        b'b' => {
            engine.set_ssb_way(operand).await?;
            Ok(Outcome::default())
        }
        b'c' => {
            engine.tune(operand).await?;
            Ok(Outcome::default())
        }
        b'd' => {
            engine.set_ptt_delay(operand).await?;
            Ok(Outcome::default())
        }
        b'e' => {
            engine.band_switch(operand).await?;
            Ok(Outcome::default())
        }
        b'f' => {
            engine.set_sound_system(operand).await?;
            Ok(Outcome::default())
        }
        b'g' => {
            engine.set_volume(operand).await?;
            Ok(Outcome::default())
        }
        b'h' => {
            engine.arm_explicit_reply(operand, peer);
            Ok(Outcome::default())
        }
        unknown => {
            tracing::debug!(code = unknown, "unrecognized control request, ignoring");
            Ok(Outcome::default())
        }
    }
}
