//! Shared utilities: peer endpoint normalization and duration parsing.

pub mod addr;
pub mod duration;

pub use addr::{normalize_peer_address, peer_port};
pub use duration::parse_duration_to_seconds;
