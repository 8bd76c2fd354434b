use std::{
    ops::ControlFlow,
    sync::Arc,
    time::{Duration, Instant},
};

use crate::{
    assets::{decode_frames, AssetKind},
    audio::{AudioBackend, PlaybackEngine},
    input::{CommandReceiver, PlayerCommand},
    render::{GridCell, ThumbnailRenderer, ThumbnailSurface, Tile},
    timeline::{AnimationScheduler, AnimationState, TickClock},
    Keymap, KeymapRecord, KeymapStore, Result, SoundboardConfig, SoundboardError,
};

/// The player process: one keymap, one voice, one scheduler, one surface.
#[derive(Debug)]
pub struct Player<B, S> {
    engine: PlaybackEngine<B>,
    scheduler: AnimationScheduler,
    renderer: ThumbnailRenderer,
    surface: S,
    columns: usize,
    period: Duration,
}

impl<B: AudioBackend, S: ThumbnailSurface> Player<B, S> {
    /// Loads the keymap and puts every binding on the surface. A missing
    /// keymap shows a notice and leaves the player empty; a corrupt one is an
    /// error.
    ///
    /// Tiles fill the grid in key order (the keymap is sorted by key), not
    /// in the order the bindings were created in the editor.
    pub fn launch(config: &SoundboardConfig, backend: B, surface: S) -> Result<Self> {
        let store = KeymapStore::new(&config.keymap_path);
        let (keymap, missing) = match store.load() {
            Ok(keymap) => (keymap, false),
            Err(SoundboardError::StoreNotFound(path)) => {
                tracing::warn!(?path, "no keymap yet");
                (Keymap::new(), true)
            }
            Err(err) => return Err(err),
        };

        let mut player = Self {
            engine: PlaybackEngine::new(backend, Arc::new(keymap)),
            scheduler: AnimationScheduler::new(),
            renderer: ThumbnailRenderer::from_config(config),
            surface,
            columns: config.grid_columns,
            period: config.tick_interval(),
        };

        if missing {
            let name = config
                .keymap_path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "keymap".to_string());
            player.surface.notice(&format!("No {name} found!"));
        } else {
            player.populate();
        }
        Ok(player)
    }

    pub fn keymap(&self) -> &Arc<Keymap> {
        self.engine.keymap()
    }

    pub fn engine(&self) -> &PlaybackEngine<B> {
        &self.engine
    }

    pub fn scheduler(&self) -> &AnimationScheduler {
        &self.scheduler
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    fn populate(&mut self) {
        let keymap = Arc::clone(self.engine.keymap());
        for (slot, (key, record)) in keymap.iter().enumerate() {
            let tile = Tile {
                key: key.to_string(),
                cell: GridCell::for_slot(slot, self.columns),
            };
            self.show_binding(tile, record);
        }
        tracing::info!(
            bindings = keymap.len(),
            animations = self.scheduler.len(),
            "thumbnails ready"
        );
    }

    fn show_binding(&mut self, tile: Tile, record: &KeymapRecord) {
        let Some(path) = record.thumbnail.as_deref().filter(|path| path.exists()) else {
            self.surface.show(&tile, &self.renderer.placeholder());
            return;
        };

        let frames = match decode_frames(path) {
            Ok(frames) => frames,
            Err(err) => {
                tracing::warn!(%err, key = %tile.key, "showing placeholder");
                self.surface.show(&tile, &self.renderer.placeholder());
                return;
            }
        };

        let frames = frames
            .iter()
            .map(|frame| self.renderer.prepare(&frame.image))
            .collect::<Vec<_>>();

        match AssetKind::of_path(path) {
            AssetKind::Animated => {
                if let Some(state) = AnimationState::new(tile, frames) {
                    self.scheduler.register(state, &mut self.surface);
                }
            }
            AssetKind::Static => {
                if let Some(frame) = frames.first() {
                    self.surface.show(&tile, frame);
                }
            }
        }
    }

    /// Executes one queued command.
    pub fn dispatch(&mut self, command: PlayerCommand) -> ControlFlow<()> {
        match command {
            PlayerCommand::Play(key) => {
                if let Err(err) = self.engine.play(&key) {
                    tracing::warn!(%err, key = %key, "dropping play request");
                }
            }
            PlayerCommand::Stop => self.engine.stop(),
            PlayerCommand::Shutdown => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    /// Cooperative loop: waits for commands until the next tick is due, then
    /// ticks the animations. Returns on [`PlayerCommand::Shutdown`] or once
    /// every producer is gone.
    pub fn run(&mut self, commands: &CommandReceiver) {
        let mut clock = TickClock::start(self.period, Instant::now());
        loop {
            let now = Instant::now();
            if clock.is_due(now) {
                self.scheduler.tick(&mut self.surface);
                clock.reschedule(now);
            }

            match commands.recv_deadline(clock.deadline()) {
                Ok(command) => {
                    if self.dispatch(command).is_break() {
                        break;
                    }
                }
                Err(flume::RecvTimeoutError::Timeout) => {}
                Err(flume::RecvTimeoutError::Disconnected) => break,
            }
        }

        self.engine.stop();
        tracing::info!(ticks = self.scheduler.ticks(), "player loop finished");
    }
}
