//! WebSocket game channel

pub mod handler;
pub mod protocol;
pub mod session;
pub mod sink;
