//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::{GameHandle, RoomDirectory};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Room summaries mirrored out of the game task for HTTP reads
    pub directory: Arc<RoomDirectory>,
    pub game: GameHandle,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);
        let directory = Arc::new(RoomDirectory::new());
        let game = GameHandle::spawn(directory.clone(), config.anticheat);

        Self {
            config,
            directory,
            game,
        }
    }
}
