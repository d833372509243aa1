//! Server-level commands driven by timers and admins.

use hiroba_shared::time::now_seconds;
use serde::Deserialize;

use crate::{
    domain::ServerMessage,
    usecase::{error::CommandError, manager::Manager},
};

use super::Execute;

/// Broadcast how long the server has been up. `start` is in seconds since the epoch.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BroadcastCurrentUptime {
    pub start: f64,
}

impl Execute for BroadcastCurrentUptime {
    fn execute(self, manager: &mut Manager) -> Result<(), CommandError> {
        manager.broadcast(ServerMessage::current_uptime(self.start, now_seconds()));
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StopServer;

impl Execute for StopServer {
    fn execute(self, manager: &mut Manager) -> Result<(), CommandError> {
        manager.stop();
        Ok(())
    }
}

/// Pop at most one job from the external queue and work it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GetJob;

impl Execute for GetJob {
    fn execute(self, manager: &mut Manager) -> Result<(), CommandError> {
        manager.poll_queue()
    }
}

/// Drain the commands queued with `Manager::next`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunQueuedCommands;

impl Execute for RunQueuedCommands {
    fn execute(self, manager: &mut Manager) -> Result<(), CommandError> {
        manager.run_queued();
        Ok(())
    }
}
