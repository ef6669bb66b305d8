// src/network/mod.rs

//! Request/reply exchange over the shared bus.

mod io_helpers;

use crate::common::{
    address::XerxesAddr,
    config::SerialConfig,
    error::XerxesError,
    frame::{self, Frame},
    hal_traits::{XerxesSerial, XerxesTimer},
    msg_id::MsgId,
};
use core::fmt::Debug;
use log::{debug, trace};

/// Anything that can put a frame on the bus and take one off it.
///
/// Leaves talk to the network exclusively through this trait, so any
/// conforming implementation can stand in for the real [`Network`].
pub trait Channel {
    type Error: Debug;

    /// Our own bus address, used as the source of every outgoing frame.
    fn addr(&self) -> XerxesAddr;

    /// Encodes and writes one frame.
    fn send(&mut self, destination: XerxesAddr, payload: &[u8]) -> Result<(), XerxesError<Self::Error>>;

    /// Blocks for one decoded frame.
    fn receive(&mut self) -> Result<Frame, XerxesError<Self::Error>>;

    /// Sends a request and waits for its reply. The bus is half-duplex and
    /// unpipelined: exactly one request is outstanding at a time.
    fn exchange(
        &mut self,
        destination: XerxesAddr,
        payload: &[u8],
    ) -> Result<Frame, XerxesError<Self::Error>> {
        self.send(destination, payload)?;
        self.receive()
    }

    /// Broadcasts the sync command. Leaves latch a measurement and stay silent.
    fn sync(&mut self) -> Result<(), XerxesError<Self::Error>> {
        self.send(XerxesAddr::BROADCAST, &MsgId::Sync.to_bytes())
    }
}

/// Bus master endpoint on top of a serial interface.
#[derive(Debug)]
pub struct Network<IF>
where
    IF: XerxesSerial + XerxesTimer,
{
    interface: IF,
    addr: XerxesAddr,
    config: SerialConfig,
}

impl<IF> Network<IF>
where
    IF: XerxesSerial + XerxesTimer,
{
    /// Applies `config` to the interface and takes ownership of it.
    pub fn open(
        mut interface: IF,
        my_addr: XerxesAddr,
        config: SerialConfig,
    ) -> Result<Self, XerxesError<IF::Error>> {
        interface.set_config(&config).map_err(XerxesError::Io)?;
        debug!("network opened at {} baud, master address {my_addr}", config.baud_rate);
        Ok(Network { interface, addr: my_addr, config })
    }

    pub fn config(&self) -> &SerialConfig {
        &self.config
    }

    pub fn interface(&self) -> &IF {
        &self.interface
    }

    pub fn interface_mut(&mut self) -> &mut IF {
        &mut self.interface
    }

    /// Gives the interface back, closing the network.
    pub fn release(self) -> IF {
        self.interface
    }
}

impl<IF> Channel for Network<IF>
where
    IF: XerxesSerial + XerxesTimer,
{
    type Error = IF::Error;

    fn addr(&self) -> XerxesAddr {
        self.addr
    }

    fn send(&mut self, destination: XerxesAddr, payload: &[u8]) -> Result<(), XerxesError<IF::Error>> {
        let message = frame::encode(self.addr, destination, payload).map_err(XerxesError::widen)?;
        trace!("tx {destination}: {:02x?}", message.as_slice());
        self.write_frame(&message)
    }

    fn receive(&mut self) -> Result<Frame, XerxesError<IF::Error>> {
        let reply = frame::decode(|| self.read_byte_timed())?;
        trace!("rx {} -> {}: {} {:02x?}", reply.source, reply.destination, reply.message_id, reply.payload());
        Ok(reply)
    }
}
