//! Key events to player commands.
//!
//! Key hooks and UI callbacks are producers on one [`flume`] channel; the
//! player loop is its only consumer. Producers never touch audio or display
//! state directly.

use std::{collections::HashSet, sync::Arc};

use crate::{Keymap, Result};

/// Work queued for the player loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerCommand {
    Play(String),
    Stop,
    Shutdown,
}

pub type CommandSender = flume::Sender<PlayerCommand>;
pub type CommandReceiver = flume::Receiver<PlayerCommand>;

/// Creates the player's command queue.
pub fn command_queue() -> (CommandSender, CommandReceiver) {
    flume::unbounded()
}

/// Source of global key events, e.g. an OS-level hook. Installing it starts
/// delivery; every event is passed to [`KeyRouter::route`] as a key token
/// from the same vocabulary the editor records.
pub trait KeyHook {
    fn install(self, router: KeyRouter) -> Result<()>;
}

/// Maps raw key tokens to commands. Cheap to clone into hook threads.
#[derive(Debug, Clone)]
pub struct KeyRouter {
    stop_keys: Arc<HashSet<String>>,
    keymap: Arc<Keymap>,
    commands: CommandSender,
}

impl KeyRouter {
    pub fn new<I>(stop_keys: I, keymap: Arc<Keymap>, commands: CommandSender) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            stop_keys: Arc::new(stop_keys.into_iter().collect()),
            keymap,
            commands,
        }
    }

    /// Stop keys win over any binding; unbound keys produce nothing.
    pub fn resolve(&self, token: &str) -> Option<PlayerCommand> {
        if self.stop_keys.contains(token) {
            Some(PlayerCommand::Stop)
        } else if self.keymap.contains_key(token) {
            Some(PlayerCommand::Play(token.to_string()))
        } else {
            None
        }
    }

    /// Enqueues the command for `token`, if any. Returns whether something was
    /// queued.
    pub fn route(&self, token: &str) -> bool {
        let Some(command) = self.resolve(token) else {
            tracing::trace!(token, "ignoring unbound key");
            return false;
        };
        self.submit(command)
    }

    /// Enqueues a command directly, e.g. from a click on a tile.
    pub fn submit(&self, command: PlayerCommand) -> bool {
        match self.commands.send(command) {
            Ok(()) => true,
            Err(flume::SendError(command)) => {
                tracing::warn!(?command, "player loop has stopped; dropping command");
                false
            }
        }
    }
}
