// src/leaves/leaf.rs

use super::readings::ReadingsBuffer;
use super::Node;
use crate::common::{address::XerxesAddr, error::XerxesError, frame::Frame, msg_id::MsgId};
use crate::network::Channel;

/// One fetch from a generic leaf: the raw reply, undecoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafData {
    pub address: XerxesAddr,
    pub reply: Frame,
}

/// Generic leaf. Knows how to fetch a measurement, not what it means.
#[derive(Debug)]
pub struct Leaf {
    address: XerxesAddr,
    readings: ReadingsBuffer<LeafData>,
}

impl Leaf {
    pub fn new(address: XerxesAddr) -> Self {
        Leaf { address, readings: ReadingsBuffer::unbounded() }
    }

    pub fn with_buffer(address: XerxesAddr, readings: ReadingsBuffer<LeafData>) -> Self {
        Leaf { address, readings }
    }

    pub fn address(&self) -> XerxesAddr {
        self.address
    }

    /// Sends `payload` to this leaf and waits for the reply.
    pub fn exchange<C: Channel>(
        &self,
        channel: &mut C,
        payload: &[u8],
    ) -> Result<Frame, XerxesError<C::Error>> {
        channel.exchange(self.address, payload)
    }

    /// Requests the latched measurement and returns the raw reply.
    pub fn read<C: Channel>(&self, channel: &mut C) -> Result<Frame, XerxesError<C::Error>> {
        self.exchange(channel, &MsgId::FetchMeasurement.to_bytes())
    }

    pub fn pop(&self) -> Result<LeafData, XerxesError> {
        self.readings.pop()
    }

    pub fn pop_all(&self) -> Vec<LeafData> {
        self.readings.pop_all()
    }

    pub fn readings(&self) -> &ReadingsBuffer<LeafData> {
        &self.readings
    }
}

impl<C: Channel> Node<C> for Leaf {
    fn address(&self) -> XerxesAddr {
        self.address
    }

    fn fetch(&self, channel: &mut C) -> Result<(), XerxesError<C::Error>> {
        let reply = self.read(channel)?;
        self.readings
            .push(LeafData { address: self.address, reply })
            .map_err(XerxesError::widen)
    }
}
