// src/common/config.rs

use super::timing;
use core::time::Duration;

/// Serial line settings applied when a [`Network`](crate::network::Network) opens its port.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SerialConfig {
    pub baud_rate: u32,
    /// Bound on every single byte read.
    pub read_timeout: Duration,
}

impl SerialConfig {
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        SerialConfig {
            baud_rate: timing::DEFAULT_BAUD_RATE,
            read_timeout: timing::DEFAULT_READ_TIMEOUT,
        }
    }
}

/// Whether the transport lets only one party talk at a time.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Duplex {
    /// RS485 two-wire: one poll cycle owns the bus from sync to the last leaf.
    Half,
    /// No cycle-wide exclusivity. Cycles may overlap; individual exchanges
    /// are still serialized.
    Full,
}

/// Poll scheduler settings.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SystemConfig {
    pub mode: Duplex,
    /// Bound on waiting for the bus lock.
    pub lock_timeout: Duration,
    /// Pause between the sync broadcast and the first fetch.
    pub settle_delay: Duration,
}

impl SystemConfig {
    pub fn new(mode: Duplex) -> Self {
        SystemConfig { mode, ..Default::default() }
    }

    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        SystemConfig {
            mode: Duplex::Half,
            lock_timeout: timing::DEFAULT_LOCK_TIMEOUT,
            settle_delay: timing::SYNC_SETTLE_DELAY,
        }
    }
}
