// src/lib.rs

#![cfg_attr(not(feature = "std"), no_std)] // Codec and network build without std

#[cfg(all(test, not(feature = "std")))]
extern crate std;

pub mod common;
pub mod network;

#[cfg(feature = "std")]
pub mod branch;
#[cfg(feature = "std")]
pub mod leaves;
#[cfg(feature = "std")]
pub mod system;

#[cfg(all(test, feature = "std"))]
mod test_support;

// Re-export key types for convenience
pub use common::{Duplex, MsgId, SerialConfig, SystemConfig, XerxesAddr, XerxesError};
pub use network::{Channel, Network};

#[cfg(feature = "std")]
pub use branch::Branch;
#[cfg(feature = "std")]
pub use leaves::{Leaf, Node, PLeaf};
#[cfg(feature = "std")]
pub use system::{CycleReport, Phase, PollScheduler};
