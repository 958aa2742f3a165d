//! Serial (TTY) keying device: toggles DTR/RTS modem-control lines.
//!
//! Grounded on the teacher crate's `transport::open_serial` (same
//! `tokio-serial` builder pattern); the pin-assignment scheme (`key=`,
//! `ptt=` mapping to DTR/RTS/none, rejecting a shared assignment) mirrors
//! the original C driver's `ttys.c`.

use async_trait::async_trait;
use tokio_serial::SerialPort;

use crate::error::{Error, Result};

use super::CwDevice;

/// Which modem-control line (if any) a logical signal is wired to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinAssignment {
    Dtr,
    Rts,
    None,
}

impl PinAssignment {
    pub fn default_cw() -> Self {
        Self::Dtr
    }

    pub fn default_ptt() -> Self {
        Self::Rts
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "dtr" => Some(Self::Dtr),
            "rts" => Some(Self::Rts),
            "none" => Some(Self::None),
            _ => None,
        }
    }
}

pub struct SerialDevice {
    path: String,
    cw_pin: PinAssignment,
    ptt_pin: PinAssignment,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialDevice {
    /// Open `path` and assign `cw_pin`/`ptt_pin`. Rejects assigning both
    /// signals to the same pin at configuration time (spec.md §6.3).
    pub fn open(path: &str, cw_pin: PinAssignment, ptt_pin: PinAssignment) -> Result<Self> {
        if cw_pin != PinAssignment::None && cw_pin == ptt_pin {
            return Err(Error::Device(format!(
                "cw and ptt cannot both be assigned to {cw_pin:?}"
            )));
        }

        let port = tokio_serial::new(path, 1200)
            .open()
            .map_err(|e| Error::Device(format!("failed to open {path}: {e}")))?;

        Ok(Self {
            path: path.to_string(),
            cw_pin,
            ptt_pin,
            port: Some(port),
        })
    }

    fn set_pin(&mut self, pin: PinAssignment, on: bool) -> Result<()> {
        let Some(port) = self.port.as_mut() else {
            return Err(Error::Device(format!("{} is not open", self.path)));
        };
        let result = match pin {
            PinAssignment::Dtr => port.write_data_terminal_ready(on),
            PinAssignment::Rts => port.write_request_to_send(on),
            PinAssignment::None => return Ok(()),
        };
        result.map_err(|e| Error::Device(format!("failed to toggle {pin:?} on {}: {e}", self.path)))
    }
}

#[async_trait]
impl CwDevice for SerialDevice {
    fn name(&self) -> &str {
        &self.path
    }

    async fn init(&mut self) -> Result<()> {
        if self.port.is_none() {
            let port = tokio_serial::new(&self.path, 1200)
                .open()
                .map_err(|e| Error::Device(format!("failed to reopen {}: {e}", self.path)))?;
            self.port = Some(port);
        }
        Ok(())
    }

    async fn release(&mut self) -> Result<()> {
        self.port = None;
        Ok(())
    }

    async fn reset(&mut self) -> Result<()> {
        self.set_pin(self.cw_pin, false)?;
        self.set_pin(self.ptt_pin, false)
    }

    async fn cw(&mut self, on: bool) -> Result<()> {
        self.set_pin(self.cw_pin, on)
    }

    async fn ptt(&mut self, on: bool) -> Result<()> {
        self.set_pin(self.ptt_pin, on)
    }
}
