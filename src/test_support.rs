// src/test_support.rs

//! Scripted channel shared by the leaf and scheduler tests.

use crate::common::{
    address::XerxesAddr,
    error::XerxesError,
    frame::{decode_slice, encode, Frame},
    msg_id::MsgId,
};
use crate::network::Channel;
use std::collections::HashMap;
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MockCommError;

/// How a scripted leaf answers.
#[derive(Debug, Clone)]
pub enum Behaviour {
    /// Reply with this message id and body, addressed to the master.
    Reply(MsgId, Vec<u8>),
    /// Reply addressed to somebody else.
    Misrouted(MsgId, Vec<u8>, XerxesAddr),
    Checksum,
    Incomplete,
    Silent,
    Io,
}

pub struct ScriptedChannel {
    pub addr: XerxesAddr,
    behaviours: HashMap<XerxesAddr, Behaviour>,
    last_destination: Option<XerxesAddr>,
    /// Every destination written to, in order, broadcast included.
    pub sent: Arc<Mutex<Vec<XerxesAddr>>>,
    /// Every payload written, in order.
    pub payloads: Arc<Mutex<Vec<Vec<u8>>>>,
    /// When set, the next receive blocks until the sender side signals.
    gate: Option<Receiver<()>>,
}

impl ScriptedChannel {
    pub fn new() -> Self {
        ScriptedChannel {
            addr: XerxesAddr::MASTER,
            behaviours: HashMap::new(),
            last_destination: None,
            sent: Arc::default(),
            payloads: Arc::default(),
            gate: None,
        }
    }

    pub fn with(mut self, address: u8, behaviour: Behaviour) -> Self {
        self.behaviours.insert(XerxesAddr::from_byte(address), behaviour);
        self
    }

    pub fn gated(mut self, gate: Receiver<()>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn destinations(&self) -> Vec<u8> {
        self.sent.lock().unwrap().iter().map(|a| a.as_u8()).collect()
    }
}

pub fn frame(source: XerxesAddr, destination: XerxesAddr, id: MsgId, body: &[u8]) -> Frame {
    let mut payload = Vec::from(id.to_bytes());
    payload.extend_from_slice(body);
    let bytes = encode(source, destination, &payload).unwrap();
    decode_slice(&bytes).unwrap()
}

/// Sixteen byte pressure leaf body from four register words.
pub fn pleaf_body(words: [u32; 4]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_be_bytes()).collect()
}

impl Channel for ScriptedChannel {
    type Error = MockCommError;

    fn addr(&self) -> XerxesAddr {
        self.addr
    }

    fn send(&mut self, destination: XerxesAddr, payload: &[u8]) -> Result<(), XerxesError<MockCommError>> {
        self.sent.lock().unwrap().push(destination);
        self.payloads.lock().unwrap().push(payload.to_vec());
        self.last_destination = Some(destination);
        Ok(())
    }

    fn receive(&mut self) -> Result<Frame, XerxesError<MockCommError>> {
        if let Some(gate) = self.gate.take() {
            let _ = gate.recv_timeout(Duration::from_secs(5));
        }
        let destination = self.last_destination.take().ok_or(XerxesError::FrameSyncTimeout)?;
        match self.behaviours.get(&destination).cloned().unwrap_or(Behaviour::Silent) {
            Behaviour::Reply(id, body) => Ok(frame(destination, self.addr, id, &body)),
            Behaviour::Misrouted(id, body, to) => Ok(frame(destination, to, id, &body)),
            Behaviour::Checksum => Err(XerxesError::Checksum { residue: 0x10 }),
            Behaviour::Incomplete => Err(XerxesError::MessageIncomplete),
            Behaviour::Silent => Err(XerxesError::FrameSyncTimeout),
            Behaviour::Io => Err(XerxesError::Io(MockCommError)),
        }
    }
}
