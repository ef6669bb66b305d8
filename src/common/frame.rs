// src/common/frame.rs

//! Xerxes wire frame.
//!
//! ```text
//! START LEN SRC DST MSGID(2) BODY(LEN-7) CHK
//! ```
//!
//! `LEN` counts the whole frame, START and CHK included, i.e. it is the
//! payload (`MSGID || BODY`) length plus five. All multi-byte fields are
//! big-endian. The byte sum of a valid frame is zero modulo 256.

use super::address::XerxesAddr;
use super::checksum::{calculate_checksum, residue};
use super::error::XerxesError;
use super::msg_id::MsgId;
use arrayvec::ArrayVec;
use core::fmt::Debug;

/// Start-of-frame sentinel.
pub const SOH: u8 = 0x01;
/// START, LEN, SRC, DST, MSGID and CHK.
pub const OVERHEAD_LEN: usize = 7;
/// Largest frame the length byte can describe.
pub const MAX_FRAME_LEN: usize = u8::MAX as usize;
/// Largest `MSGID || BODY` payload accepted by [`encode`].
pub const MAX_PAYLOAD_LEN: usize = MAX_FRAME_LEN - 5;
/// Largest body a received frame can carry.
pub const MAX_BODY_LEN: usize = MAX_FRAME_LEN - OVERHEAD_LEN;

/// Encoded frame, ready for the wire.
pub type FrameBuffer = ArrayVec<u8, MAX_FRAME_LEN>;
/// Frame body following the message id.
pub type Body = ArrayVec<u8, MAX_BODY_LEN>;

/// A decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub source: XerxesAddr,
    pub destination: XerxesAddr,
    /// Raw length byte as received.
    pub length: u8,
    pub message_id: MsgId,
    /// Body bytes after the message id.
    pub payload: Body,
    /// Checksum byte as received.
    pub checksum: u8,
}

impl Frame {
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Re-encodes the frame into its wire form.
    pub fn to_bytes(&self) -> FrameBuffer {
        assemble(self.source, self.destination, &self.message_id.to_bytes(), &self.payload)
    }
}

fn assemble(source: XerxesAddr, destination: XerxesAddr, head: &[u8], tail: &[u8]) -> FrameBuffer {
    let mut message = FrameBuffer::new();
    message.push(SOH);
    message.push((head.len() + tail.len() + 5) as u8);
    message.push(source.as_u8());
    message.push(destination.as_u8());
    message.extend(head.iter().copied());
    message.extend(tail.iter().copied());
    let checksum = calculate_checksum(&message);
    message.push(checksum);
    message
}

/// Builds a frame around a raw payload and appends its checksum.
///
/// The payload is sent as-is; for regular messages it starts with the two
/// message id bytes. Device specific commands may be shorter.
///
/// # Returns
///
/// * `Ok(FrameBuffer)` with the complete frame.
/// * `Err(XerxesError::PayloadTooLong)` if the frame would not fit the length byte.
pub fn encode(
    source: XerxesAddr,
    destination: XerxesAddr,
    payload: &[u8],
) -> Result<FrameBuffer, XerxesError> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(XerxesError::PayloadTooLong { len: payload.len(), max: MAX_PAYLOAD_LEN });
    }
    Ok(assemble(source, destination, &[], payload))
}

/// Decodes one frame from a byte source.
///
/// `read_byte` yields the next byte, or `Err(XerxesError::Timeout)` once the
/// stream runs dry. Bytes preceding the start sentinel are discarded.
///
/// # Returns
///
/// * `Err(XerxesError::FrameSyncTimeout)` if the stream ends before a sentinel.
/// * `Err(XerxesError::MessageIncomplete)` if it ends inside the frame.
/// * `Err(XerxesError::InvalidLength)` if the length byte is below the frame overhead.
/// * `Err(XerxesError::Checksum)` if the byte sum is not zero.
/// * `Err(XerxesError::UnknownMessageId)` for ids outside the registry.
/// * Any other error from `read_byte` unchanged.
pub fn decode<E, R>(mut read_byte: R) -> Result<Frame, XerxesError<E>>
where
    E: Debug,
    R: FnMut() -> Result<u8, XerxesError<E>>,
{
    // wait for start of message
    loop {
        match read_byte() {
            Ok(SOH) => break,
            Ok(_) => continue,
            Err(XerxesError::Timeout) => return Err(XerxesError::FrameSyncTimeout),
            Err(e) => return Err(e),
        }
    }

    let mut next = || match read_byte() {
        Err(XerxesError::Timeout) => Err(XerxesError::MessageIncomplete),
        other => other,
    };

    let length = next()?;
    if (length as usize) < OVERHEAD_LEN {
        return Err(XerxesError::InvalidLength(length));
    }
    let source = next()?;
    let destination = next()?;
    let id = [next()?, next()?];

    let mut payload = Body::new();
    for _ in 0..(length as usize - OVERHEAD_LEN) {
        payload.push(next()?);
    }
    let checksum = next()?;

    let sum = residue(&[SOH, length, source, destination, id[0], id[1], checksum])
        .wrapping_add(residue(&payload));
    if sum != 0 {
        return Err(XerxesError::Checksum { residue: sum });
    }

    let raw_id = u16::from_be_bytes(id);
    let message_id = MsgId::from_u16(raw_id).ok_or(XerxesError::UnknownMessageId(raw_id))?;

    Ok(Frame {
        source: XerxesAddr::from_byte(source),
        destination: XerxesAddr::from_byte(destination),
        length,
        message_id,
        payload,
        checksum,
    })
}

/// Decodes one frame from an in-memory buffer. The end of the buffer acts as
/// a read timeout.
pub fn decode_slice(bytes: &[u8]) -> Result<Frame, XerxesError> {
    let mut bytes = bytes.iter().copied();
    decode(|| bytes.next().ok_or(XerxesError::Timeout))
}
