//! Game simulation modules

pub mod anticheat;
pub mod combat;
pub mod economy;
pub mod hostage;
pub mod map;
pub mod physics;
pub mod room;
pub mod runtime;
pub mod world;

pub use runtime::GameHandle;
pub use world::{RoomDirectory, World};

use tokio::sync::mpsc;

use crate::ws::protocol::{ClientMsg, ServerMsg};

/// Monotonic per-connection identity, assigned on connect
pub type ClientId = u32;

/// Monotonic room identity
pub type RoomId = u32;

/// Broadcast/physics tick period
pub const TICK_MILLIS: u64 = 50;

/// Fixed physics step in seconds
pub const TICK_DT: f32 = TICK_MILLIS as f32 / 1000.0;

/// Command from a connection task into the game task
#[derive(Debug)]
pub enum Command {
    /// A connection opened; `tx` is its outbound message channel
    Connect {
        id: ClientId,
        tx: mpsc::UnboundedSender<ServerMsg>,
    },
    /// A decoded inbound message
    Message { id: ClientId, msg: ClientMsg },
    /// The connection closed (socket close, error, or kick)
    Disconnect { id: ClientId },
}
