// src/common/error.rs

use super::address::XerxesAddr;
use core::convert::Infallible;

/// Everything that can go wrong talking to the bus.
///
/// `E` is the error type of the underlying serial interface. Operations that
/// never touch the interface (address validation, averaging) leave it at
/// `Infallible`.
#[derive(Debug, thiserror::Error)]
pub enum XerxesError<E = Infallible>
where
    E: core::fmt::Debug,
{
    /// Underlying I/O error from the serial interface.
    #[error("I/O error: {0:?}")]
    Io(E),

    /// Integer does not fit a single-byte bus address.
    #[error("address {0} out of range 0..=255")]
    AddressRange(i32),

    /// A single byte operation (read, write or flush) did not finish in time.
    #[error("Operation timed out")]
    Timeout,

    /// The stream ran dry before a start-of-frame sentinel showed up.
    #[error("No message in queue")]
    FrameSyncTimeout,

    /// Start-of-frame seen, but a fixed-size field could not be read in full.
    #[error("Message is incomplete")]
    MessageIncomplete,

    /// Length byte too small to hold the frame header.
    #[error("Invalid message length: {0}")]
    InvalidLength(u8),

    /// Payload would not fit into the length byte.
    #[error("Payload too long: {len} bytes, at most {max}")]
    PayloadTooLong { len: usize, max: usize },

    /// Byte sum of the received frame is not zero.
    #[error("Invalid checksum received (residue {residue:#04x})")]
    Checksum { residue: u8 },

    /// Message id is not in the registry.
    #[error("Unknown message id: {0:#06x}")]
    UnknownMessageId(u16),

    /// Reply carried a different message id than the request calls for.
    #[error("Invalid reply received ({got:#06x}, expected {expected:#06x})")]
    UnexpectedReply { expected: u16, got: u16 },

    /// Reply was addressed to someone else.
    #[error("Invalid destination address received ({0})")]
    WrongDestination(XerxesAddr),

    /// Exclusive bus access could not be obtained.
    #[error("Network is busy, previous poll is still in progress")]
    NetworkBusy,

    /// Reply body has the wrong size for the device type.
    #[error("Invalid payload length: expected {expected} bytes, got {got}")]
    DecodeShape { expected: usize, got: usize },

    /// Nothing to average.
    #[error("Unable to calculate average from empty list")]
    EmptyInput,

    /// Every reading in the batch was unusable.
    #[error("No valid data received")]
    AllInvalid,

    /// Readings buffer has nothing to pop.
    #[error("Readings buffer is empty")]
    EmptyBuffer,

    /// Bounded readings buffer is full and set to reject new readings.
    #[error("Readings buffer is full (capacity {capacity})")]
    BufferFull { capacity: usize },

    /// Address is not part of the data set.
    #[error("No data for address {0}")]
    UnknownAddress(XerxesAddr),

    /// Background poll worker could not be started.
    #[cfg(feature = "std")]
    #[error("Poll worker failed: {0}")]
    Worker(String),
}

impl XerxesError<Infallible> {
    /// Lifts an error from an operation that never touches the interface
    /// into a context with a concrete interface error.
    pub fn widen<F: core::fmt::Debug>(self) -> XerxesError<F> {
        match self {
            XerxesError::Io(never) => match never {},
            XerxesError::AddressRange(v) => XerxesError::AddressRange(v),
            XerxesError::Timeout => XerxesError::Timeout,
            XerxesError::FrameSyncTimeout => XerxesError::FrameSyncTimeout,
            XerxesError::MessageIncomplete => XerxesError::MessageIncomplete,
            XerxesError::InvalidLength(l) => XerxesError::InvalidLength(l),
            XerxesError::PayloadTooLong { len, max } => XerxesError::PayloadTooLong { len, max },
            XerxesError::Checksum { residue } => XerxesError::Checksum { residue },
            XerxesError::UnknownMessageId(id) => XerxesError::UnknownMessageId(id),
            XerxesError::UnexpectedReply { expected, got } => {
                XerxesError::UnexpectedReply { expected, got }
            }
            XerxesError::WrongDestination(a) => XerxesError::WrongDestination(a),
            XerxesError::NetworkBusy => XerxesError::NetworkBusy,
            XerxesError::DecodeShape { expected, got } => XerxesError::DecodeShape { expected, got },
            XerxesError::EmptyInput => XerxesError::EmptyInput,
            XerxesError::AllInvalid => XerxesError::AllInvalid,
            XerxesError::EmptyBuffer => XerxesError::EmptyBuffer,
            XerxesError::BufferFull { capacity } => XerxesError::BufferFull { capacity },
            XerxesError::UnknownAddress(a) => XerxesError::UnknownAddress(a),
            #[cfg(feature = "std")]
            XerxesError::Worker(msg) => XerxesError::Worker(msg),
        }
    }
}
