// src/common/hal_traits.rs

use super::config::SerialConfig;
use core::fmt::Debug;
use core::ops::{Add, Sub};
use core::time::Duration;

/// Monotonic point in time as reported by an [`XerxesTimer`].
///
/// Implemented automatically for anything with the right arithmetic,
/// `std::time::Instant` included.
pub trait XerxesInstant:
    Copy + Ord + Add<Duration, Output = Self> + Sub<Self, Output = Duration>
{
}

impl<T> XerxesInstant for T where
    T: Copy + Ord + Add<Duration, Output = T> + Sub<T, Output = Duration>
{
}

/// Abstraction for clock and delay operations needed to bound bus I/O.
pub trait XerxesTimer {
    type Instant: XerxesInstant;

    /// Current point in time.
    fn now(&self) -> Self::Instant;

    /// Delay for at least the specified number of microseconds.
    fn delay_us(&mut self, us: u32);

    /// Delay for at least the specified number of milliseconds.
    fn delay_ms(&mut self, ms: u32);
}

/// Abstraction for non-blocking RS485 byte I/O.
///
/// The interface is not expected to be thread-safe. Whoever owns it (a
/// [`Network`](crate::network::Network), usually behind the poll scheduler's
/// lock) serializes access.
pub trait XerxesSerial {
    /// Associated error type for communication errors.
    type Error: Debug;

    /// Attempts to read a single byte from the serial interface.
    ///
    /// Returns `Ok(byte)` if a byte was read, or `Err(nb::Error::WouldBlock)`
    /// if no byte is available yet. Other errors are returned as `Err(nb::Error::Other(Self::Error))`.
    fn read_byte(&mut self) -> nb::Result<u8, Self::Error>;

    /// Attempts to write a single byte to the serial interface.
    ///
    /// Returns `Ok(())` if the byte was accepted for transmission, or `Err(nb::Error::WouldBlock)`
    /// if the write buffer is full.
    fn write_byte(&mut self, byte: u8) -> nb::Result<(), Self::Error>;

    /// Attempts to flush the transmit buffer, ensuring all written bytes have been sent.
    ///
    /// On a half-duplex line the driver must not return `Ok` before the
    /// transmitter is released, or the reply will collide with our tail.
    fn flush(&mut self) -> nb::Result<(), Self::Error>;

    /// Opens or reconfigures the port (baud rate, read timeout).
    fn set_config(&mut self, config: &SerialConfig) -> Result<(), Self::Error>;
}
