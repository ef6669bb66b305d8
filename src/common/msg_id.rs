// src/common/msg_id.rs

//! Closed registry of message ids understood by this master.
//!
//! A message id is the first two bytes (big-endian) of every frame payload.
//! Anything not listed here is rejected by the decoder.

use super::error::XerxesError;
use core::convert::TryFrom;
use core::fmt;

/// Registry revision. Bump whenever an id is added or changes meaning.
pub const REGISTRY_VERSION: u8 = 1;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u16)]
pub enum MsgId {
    /// Liveness probe, answered by `PingReply`.
    Ping = 0x0000,
    /// Body is one byte: the device type.
    PingReply = 0x0001,
    AckOk = 0x0002,
    AckNok = 0x0003,
    /// Ask a leaf for its latched measurement.
    FetchMeasurement = 0x0100,
    MeasurementReply = 0x0101,
    /// Broadcast: every leaf latches a measurement now.
    Sync = 0x0200,
}

impl MsgId {
    #[inline]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Big-endian wire representation.
    #[inline]
    pub const fn to_bytes(self) -> [u8; 2] {
        (self as u16).to_be_bytes()
    }

    /// Looks up a raw id in the registry.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x0000 => Some(MsgId::Ping),
            0x0001 => Some(MsgId::PingReply),
            0x0002 => Some(MsgId::AckOk),
            0x0003 => Some(MsgId::AckNok),
            0x0100 => Some(MsgId::FetchMeasurement),
            0x0101 => Some(MsgId::MeasurementReply),
            0x0200 => Some(MsgId::Sync),
            _ => None,
        }
    }
}

impl TryFrom<u16> for MsgId {
    type Error = XerxesError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::from_u16(value).ok_or(XerxesError::UnknownMessageId(value))
    }
}

impl From<MsgId> for u16 {
    fn from(value: MsgId) -> Self {
        value.as_u16()
    }
}

impl fmt::Display for MsgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({:#06x})", self, self.as_u16())
    }
}
