//! The game task: a single tokio task owning the [`World`], driven by
//! connection commands and a fixed 50 ms tick.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{error, info};

use super::world::{RoomDirectory, World};
use super::{ClientId, Command, TICK_MILLIS};

/// Command channel depth. Inputs beyond this during a stall are backpressured
/// at the session task.
const COMMAND_BUFFER: usize = 1024;

/// Handle held by connection tasks and the HTTP layer
#[derive(Clone)]
pub struct GameHandle {
    cmd_tx: mpsc::Sender<Command>,
    next_client_id: Arc<AtomicU32>,
}

impl GameHandle {
    /// Spawn the game task and return a handle to it
    pub fn spawn(directory: Arc<RoomDirectory>, anticheat: bool) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);
        let world = World::new(directory, anticheat);

        tokio::spawn(run(world, cmd_rx));

        Self {
            cmd_tx,
            next_client_id: Arc::new(AtomicU32::new(1)),
        }
    }

    pub fn allocate_client_id(&self) -> ClientId {
        self.next_client_id.fetch_add(1, Ordering::Relaxed)
    }

    pub async fn send(&self, cmd: Command) -> bool {
        if self.cmd_tx.send(cmd).await.is_err() {
            error!("Game task is gone, dropping command");
            return false;
        }
        true
    }
}

async fn run(mut world: World, mut cmd_rx: mpsc::Receiver<Command>) {
    let mut ticker = tokio::time::interval(Duration::from_millis(TICK_MILLIS));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    info!(tick_ms = TICK_MILLIS, "Game task started");

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(cmd) => world.apply(cmd),
                    // All handles dropped: the server is shutting down
                    None => break,
                }
            }
            _ = ticker.tick() => {
                world.tick();
            }
        }
    }

    info!("Game task stopped");
}
