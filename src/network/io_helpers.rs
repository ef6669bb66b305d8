// src/network/io_helpers.rs

use super::Network;
use crate::common::{
    error::XerxesError,
    hal_traits::{XerxesSerial, XerxesTimer},
    timing,
};
use core::time::Duration;
use nb::Result as NbResult;

impl<IF> Network<IF>
where
    IF: XerxesSerial + XerxesTimer,
{
    /// Executes a non-blocking I/O operation (`f`) repeatedly until it
    /// stops returning `WouldBlock`, returning the final result or a timeout error.
    pub(super) fn execute_blocking_io_with_timeout<FN, T>(
        &mut self,
        timeout: Duration,
        mut f: FN,
    ) -> Result<T, XerxesError<IF::Error>>
    where
        FN: FnMut(&mut IF) -> NbResult<T, IF::Error>,
    {
        let deadline = self.interface.now() + timeout;

        loop {
            match f(&mut self.interface) {
                Ok(result) => return Ok(result),
                Err(nb::Error::WouldBlock) => {
                    if self.interface.now() >= deadline {
                        return Err(XerxesError::Timeout);
                    }
                    self.interface.delay_us(timing::IO_POLL_INTERVAL_US);
                }
                Err(nb::Error::Other(e)) => return Err(XerxesError::Io(e)),
            }
        }
    }

    /// Pushes an encoded frame onto the line and waits for the transmitter to drain.
    pub(super) fn write_frame(&mut self, frame: &[u8]) -> Result<(), XerxesError<IF::Error>> {
        let write_duration = timing::byte_duration(self.config.baud_rate) * frame.len() as u32;
        let write_timeout = write_duration + timing::WRITE_TIMEOUT_MARGIN;

        for byte in frame {
            self.execute_blocking_io_with_timeout(write_timeout, |iface| iface.write_byte(*byte))?;
        }

        self.execute_blocking_io_with_timeout(timing::FLUSH_TIMEOUT, |iface| iface.flush())
    }

    /// Reads one byte, giving up after the configured read timeout.
    pub(super) fn read_byte_timed(&mut self) -> Result<u8, XerxesError<IF::Error>> {
        let timeout = self.config.read_timeout;
        self.execute_blocking_io_with_timeout(timeout, |iface| iface.read_byte())
    }
}
