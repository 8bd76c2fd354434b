use std::{path::Path, sync::Arc};

use crate::{Keymap, Result};

/// Single-voice audio output used by the [`PlaybackEngine`].
///
/// Load and play failures must come back as [`crate::SoundboardError::Playback`]
/// rather than aborting the process.
pub trait AudioBackend {
    fn load(&mut self, path: &Path) -> Result<()>;
    fn play(&mut self) -> Result<()>;
    fn stop(&mut self);
    fn is_playing(&self) -> bool;
}

/// Plays the sound bound to a key. At most one sound plays at a time; a new
/// request cuts off whatever is playing.
#[derive(Debug)]
pub struct PlaybackEngine<B> {
    backend: B,
    keymap: Arc<Keymap>,
}

impl<B: AudioBackend> PlaybackEngine<B> {
    pub fn new(backend: B, keymap: Arc<Keymap>) -> Self {
        Self { backend, keymap }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn keymap(&self) -> &Arc<Keymap> {
        &self.keymap
    }

    /// Starts the sound bound to `key`. Unknown keys are ignored.
    pub fn play(&mut self, key: &str) -> Result<()> {
        let keymap = Arc::clone(&self.keymap);
        let Some(record) = keymap.get(key) else {
            tracing::debug!(key, "no sound bound to key");
            return Ok(());
        };

        self.stop();
        self.backend.load(&record.path)?;
        self.backend.play()?;
        tracing::info!(key, path = ?record.path, "playing");
        Ok(())
    }

    pub fn stop(&mut self) {
        if self.backend.is_playing() {
            self.backend.stop();
            tracing::debug!("stopped playback");
        }
    }
}
