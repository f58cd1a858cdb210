//! Schema module - Configuration, target data and network types.

mod config;
mod evolution;
mod network;
mod target;

pub use config::*;
pub use evolution::*;
pub use network::{Network, Reaction, Species};
pub use target::*;
