// src/leaves/mod.rs

//! Addressable end devices on the bus.

pub mod leaf;
pub mod pleaf;
pub mod readings;
pub mod units;

pub use leaf::{Leaf, LeafData};
pub use pleaf::{AveragePLeafData, PLeaf, PLeafData, PLeafSummary};
pub use readings::{Overflow, ReadingsBuffer};
pub use units::{Conversion, Linear, Temperature};

use crate::common::{address::XerxesAddr, error::XerxesError, msg_id::MsgId};
use crate::network::Channel;
use core::fmt;
use std::time::{Duration, Instant};

/// Device type reported in a ping reply.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceType(pub u8);

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x}", self.0)
    }
}

/// A leaf as seen by a poll cycle.
///
/// Implementors are shared between the scheduler's worker and the caller
/// draining readings, hence `&self` receivers and the `Send + Sync` bound.
pub trait Node<C: Channel>: Send + Sync {
    fn address(&self) -> XerxesAddr;

    /// Reads one measurement and buffers it.
    fn fetch(&self, channel: &mut C) -> Result<(), XerxesError<C::Error>>;

    fn ping(&self, channel: &mut C) -> Result<(Duration, DeviceType), XerxesError<C::Error>> {
        ping(channel, self.address())
    }
}

/// Pings `address`, returning the round trip time and the reported device type.
///
/// The reply must be a `PingReply` addressed to the channel's own address.
pub fn ping<C: Channel>(
    channel: &mut C,
    address: XerxesAddr,
) -> Result<(Duration, DeviceType), XerxesError<C::Error>> {
    let start = Instant::now();
    let reply = channel.exchange(address, &MsgId::Ping.to_bytes())?;
    let latency = start.elapsed();

    if reply.message_id != MsgId::PingReply {
        return Err(XerxesError::UnexpectedReply {
            expected: MsgId::PingReply.as_u16(),
            got: reply.message_id.as_u16(),
        });
    }
    if reply.destination != channel.addr() {
        return Err(XerxesError::WrongDestination(reply.destination));
    }

    let device = reply
        .payload()
        .first()
        .copied()
        .ok_or(XerxesError::DecodeShape { expected: 1, got: 0 })?;
    Ok((latency, DeviceType(device)))
}
