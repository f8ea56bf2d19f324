//! WebSocket transport: upgrade handling and the JSON wire protocol

pub mod handler;
pub mod protocol;
