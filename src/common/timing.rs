// src/common/timing.rs

use core::time::Duration;

// === Serial line ===

/// Baud rate leaves ship with.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;
/// Bits per character on the wire: start, 8 data, stop.
pub const BITS_PER_BYTE: u32 = 10;
/// How long a single read may wait for the next byte.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(20);
/// Slack added on top of the nominal transmit time of a frame.
pub const WRITE_TIMEOUT_MARGIN: Duration = Duration::from_millis(20);
/// Upper bound for the driver to drain its transmit buffer.
pub const FLUSH_TIMEOUT: Duration = Duration::from_millis(10);
/// Back-off between polls of a non-blocking operation.
pub const IO_POLL_INTERVAL_US: u32 = 100;

// === Poll cycle ===

/// Time leaves need to finish a measurement after the sync broadcast.
pub const SYNC_SETTLE_DELAY: Duration = Duration::from_millis(100);
/// Default bound for acquiring exclusive access to the bus.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(1);

/// Nominal time to shift one byte out at the given baud rate.
pub fn byte_duration(baud_rate: u32) -> Duration {
    let baud = u64::from(baud_rate.max(1));
    Duration::from_nanos(u64::from(BITS_PER_BYTE) * 1_000_000_000 / baud)
}
