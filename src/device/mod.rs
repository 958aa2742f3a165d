//! Keying-device capability interface (spec.md §6.3).
//!
//! The device drivers themselves (serial DTR/RTS toggling, parallel-port
//! pin toggling) are out of core scope; the core only depends on this
//! trait. `cw` and `ptt` are mandatory, the rest are optional capabilities
//! with a default no-op/unsupported implementation.

pub mod null;
pub mod serial;

pub use null::NullDevice;
pub use serial::{PinAssignment, SerialDevice};

use async_trait::async_trait;

use crate::error::{Error, Result};

/// SSB audio routing, for devices that support it (§4.1 SSB_WAY).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SsbRoute {
    Microphone,
    Soundcard,
}

/// Backend-agnostic keying device.
///
/// No concrete driver detail leaks through this trait — the core (PTT
/// controller, BAND_SWITCH/SSB_WAY handlers) programs against `dyn
/// CwDevice` only.
#[async_trait]
pub trait CwDevice: Send + Sync {
    /// Human-readable name, used in logs and in the CWDEVICE reply path.
    fn name(&self) -> &str;

    /// Initialize the device (open the underlying fd/port).
    async fn init(&mut self) -> Result<()>;

    /// Release the device. Called before a device swap and at shutdown.
    async fn release(&mut self) -> Result<()>;

    /// Drive all outputs to a safe baseline (key up, PTT down).
    async fn reset(&mut self) -> Result<()>;

    /// Toggle the keying line.
    async fn cw(&mut self, on: bool) -> Result<()>;

    /// Toggle the PTT line.
    async fn ptt(&mut self, on: bool) -> Result<()>;

    /// Route audio through mic or soundcard, if the device supports it.
    async fn ssb_route(&mut self, _route: SsbRoute) -> Result<()> {
        Err(Error::Unsupported(format!("{} has no SSB routing", self.name())))
    }

    /// Drive four band-select pins from the low nibble of `bits`.
    async fn band_switch(&mut self, _bits: u8) -> Result<()> {
        Err(Error::Unsupported(format!("{} has no band switch", self.name())))
    }

    /// Read the footswitch line, if wired. `true` = depressed.
    async fn footswitch_read(&mut self) -> Result<bool> {
        Ok(false)
    }

    /// Whether `footswitch_read` is backed by real hardware (the Event
    /// Loop only polls it when this is true).
    fn has_footswitch(&self) -> bool {
        false
    }
}

/// Probe `name_or_path` as TTY, then (if built) parallel, then null, per
/// spec.md §4.1 CWDEVICE. `cw_pin`/`ptt_pin` come from the `-o key=.../
/// ptt=...` CLI options (spec.md §6.2, §6.3), defaulting to DTR/RTS when
/// unset or unparseable. This crate builds only the TTY and null
/// backends; parallel-port ioctl plumbing is out of core scope (spec.md
/// §1), so a path that looks like a parallel device falls through to
/// null with a logged warning.
pub async fn probe_device(name_or_path: &str, cw_pin: PinAssignment, ptt_pin: PinAssignment) -> Box<dyn CwDevice> {
    if looks_like_parallel_port(name_or_path) {
        tracing::warn!(device = name_or_path, "parallel port driver not built, falling back to null device");
        return Box::new(NullDevice::new());
    }

    match SerialDevice::open(name_or_path, cw_pin, ptt_pin) {
        Ok(dev) => Box::new(dev),
        Err(err) => {
            tracing::warn!(device = name_or_path, error = %err, "unknown device, falling back to null device");
            Box::new(NullDevice::new())
        }
    }
}

/// Resolve `key=`/`ptt=` pin overrides out of the parsed `-o` options,
/// falling back to the driver defaults when absent or unparseable.
pub fn resolve_pin_assignments(options: &[(String, String)]) -> (PinAssignment, PinAssignment) {
    let mut cw_pin = PinAssignment::default_cw();
    let mut ptt_pin = PinAssignment::default_ptt();
    for (key, value) in options {
        match key.as_str() {
            "key" => {
                if let Some(pin) = PinAssignment::parse(value) {
                    cw_pin = pin;
                } else {
                    tracing::warn!(value, "unrecognized key= pin assignment, keeping default");
                }
            }
            "ptt" => {
                if let Some(pin) = PinAssignment::parse(value) {
                    ptt_pin = pin;
                } else {
                    tracing::warn!(value, "unrecognized ptt= pin assignment, keeping default");
                }
            }
            _ => {}
        }
    }
    (cw_pin, ptt_pin)
}

fn looks_like_parallel_port(name: &str) -> bool {
    name.starts_with("/dev/parport") || name.starts_with("lp")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_pin_assignments_applies_overrides() {
        let options = vec![("key".to_string(), "rts".to_string()), ("ptt".to_string(), "dtr".to_string())];
        assert_eq!(resolve_pin_assignments(&options), (PinAssignment::Rts, PinAssignment::Dtr));
    }

    #[test]
    fn resolve_pin_assignments_falls_back_to_defaults() {
        let options = vec![("key".to_string(), "garbage".to_string())];
        assert_eq!(
            resolve_pin_assignments(&options),
            (PinAssignment::default_cw(), PinAssignment::default_ptt())
        );
        assert_eq!(resolve_pin_assignments(&[]), (PinAssignment::default_cw(), PinAssignment::default_ptt()));
    }
}
