//! Null keying device: accepts every operation, drives nothing.
//!
//! Used as the startup default and as the fallback target whenever a real
//! device fails to probe (spec.md §4.1 CWDEVICE, §7 device-error policy).

use async_trait::async_trait;

use crate::error::Result;

use super::CwDevice;

#[derive(Debug, Default)]
pub struct NullDevice {
    cw_on: bool,
    ptt_on: bool,
}

impl NullDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cw_state(&self) -> bool {
        self.cw_on
    }

    pub fn ptt_state(&self) -> bool {
        self.ptt_on
    }
}

#[async_trait]
impl CwDevice for NullDevice {
    fn name(&self) -> &str {
        "null"
    }

    async fn init(&mut self) -> Result<()> {
        Ok(())
    }

    async fn release(&mut self) -> Result<()> {
        Ok(())
    }

    async fn reset(&mut self) -> Result<()> {
        self.cw_on = false;
        self.ptt_on = false;
        Ok(())
    }

    async fn cw(&mut self, on: bool) -> Result<()> {
        self.cw_on = on;
        Ok(())
    }

    async fn ptt(&mut self, on: bool) -> Result<()> {
        self.ptt_on = on;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reset_clears_both_lines() {
        let mut dev = NullDevice::new();
        dev.cw(true).await.unwrap();
        dev.ptt(true).await.unwrap();
        dev.reset().await.unwrap();
        assert!(!dev.cw_state());
        assert!(!dev.ptt_state());
    }
}
