// src/common/mod.rs

pub mod address;
pub mod checksum;
pub mod config;
pub mod error;
pub mod frame;
pub mod hal_traits;
pub mod msg_id;
pub mod timing;

// --- Re-export key types/traits/functions for easier access ---

pub use address::XerxesAddr;
pub use checksum::{calculate_checksum, residue, verify_checksum};
pub use config::{Duplex, SerialConfig, SystemConfig};
pub use error::XerxesError;
pub use frame::{decode, decode_slice, encode, Frame, FrameBuffer};
pub use hal_traits::{XerxesInstant, XerxesSerial, XerxesTimer};
pub use msg_id::MsgId;
