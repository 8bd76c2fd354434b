//! Terminal-side collaborators shared by the editor and player binaries.

use std::{
    collections::HashSet,
    io::BufRead,
    path::{Path, PathBuf},
};

use image::RgbaImage;
use soundboard_core::{
    AudioBackend, KeyHook, KeyRouter, PlayerCommand, Result, SoundboardError, ThumbnailSurface,
    Tile,
};
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

/// Reads one key token per line from stdin on its own thread.
///
/// Lines starting with `:` stand in for the player's buttons:
/// `:click <key>` plays a tile, `:stop` is the stop button and `:quit` closes
/// the player. End of input also closes it.
#[derive(Debug, Default)]
pub struct StdinKeyHook;

impl KeyHook for StdinKeyHook {
    fn install(self, router: KeyRouter) -> Result<()> {
        std::thread::Builder::new()
            .name("key-hook".to_string())
            .spawn(move || {
                for line in std::io::stdin().lock().lines() {
                    let Ok(line) = line else {
                        break;
                    };
                    if !handle_line(&router, line.trim()) {
                        return;
                    }
                }
                router.submit(PlayerCommand::Shutdown);
            })?;
        Ok(())
    }
}

// Returns false once the player should shut down.
fn handle_line(router: &KeyRouter, line: &str) -> bool {
    match line.split_once(' ').unwrap_or((line, "")) {
        ("", _) => true,
        (":quit", _) => {
            router.submit(PlayerCommand::Shutdown);
            false
        }
        (":stop", _) => router.submit(PlayerCommand::Stop),
        (":click", key) if !key.trim().is_empty() => {
            router.submit(PlayerCommand::Play(key.trim().to_string()))
        }
        _ => {
            router.route(line);
            true
        }
    }
}

/// Surface that reports tiles in the terminal instead of drawing them.
#[derive(Debug, Default)]
pub struct TerminalSurface {
    tiles: HashSet<String>,
}

impl ThumbnailSurface for TerminalSurface {
    fn show(&mut self, tile: &Tile, frame: &RgbaImage) {
        if self.tiles.insert(tile.key.clone()) {
            let (width, height) = frame.dimensions();
            println!(
                "[{}] row {} col {} ({width}x{height})",
                tile.key, tile.cell.row, tile.cell.column
            );
        } else {
            tracing::trace!(key = %tile.key, "frame");
        }
    }

    fn notice(&mut self, text: &str) {
        println!("{text}");
    }
}

/// Headless output: validates that the sound file is readable and tracks the
/// voice state without producing audio.
#[derive(Debug, Default)]
pub struct SilentBackend {
    loaded: Option<PathBuf>,
    playing: bool,
}

impl AudioBackend for SilentBackend {
    fn load(&mut self, path: &Path) -> Result<()> {
        std::fs::File::open(path).map_err(|err| SoundboardError::playback(path, err))?;
        self.loaded = Some(path.to_path_buf());
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        let path = self
            .loaded
            .as_ref()
            .ok_or_else(|| SoundboardError::msg("no sound loaded"))?;
        tracing::info!(?path, "playing (no audio output)");
        self.playing = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.playing = false;
    }

    fn is_playing(&self) -> bool {
        self.playing
    }
}

#[cfg(feature = "rodio")]
mod output {
    use std::{fs::File, io::BufReader, path::Path};

    use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
    use soundboard_core::{AudioBackend, Result, SoundboardError};

    /// Audio output through the default device.
    pub struct RodioBackend {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        source: Option<Decoder<BufReader<File>>>,
        sink: Option<Sink>,
    }

    impl RodioBackend {
        pub fn new() -> Result<Self> {
            let (stream, handle) = OutputStream::try_default()
                .map_err(|err| SoundboardError::msg(format!("no audio output device: {err}")))?;
            Ok(Self {
                _stream: stream,
                handle,
                source: None,
                sink: None,
            })
        }
    }

    impl AudioBackend for RodioBackend {
        fn load(&mut self, path: &Path) -> Result<()> {
            let file = File::open(path).map_err(|err| SoundboardError::playback(path, err))?;
            let source = Decoder::new(BufReader::new(file))
                .map_err(|err| SoundboardError::playback(path, err))?;
            self.source = Some(source);
            Ok(())
        }

        fn play(&mut self) -> Result<()> {
            let source = self
                .source
                .take()
                .ok_or_else(|| SoundboardError::msg("no sound loaded"))?;
            let sink = Sink::try_new(&self.handle)
                .map_err(|err| SoundboardError::msg(format!("cannot open audio sink: {err}")))?;
            sink.append(source);
            self.sink = Some(sink);
            Ok(())
        }

        fn stop(&mut self) {
            if let Some(sink) = self.sink.take() {
                sink.stop();
            }
        }

        fn is_playing(&self) -> bool {
            self.sink.as_ref().is_some_and(|sink| !sink.empty())
        }
    }
}

#[cfg(feature = "rodio")]
pub use output::RodioBackend;

#[cfg(feature = "rodio")]
pub type DefaultBackend = RodioBackend;
#[cfg(not(feature = "rodio"))]
pub type DefaultBackend = SilentBackend;

/// Audio backend selected at build time.
pub fn default_backend() -> Result<DefaultBackend> {
    #[cfg(feature = "rodio")]
    {
        RodioBackend::new()
    }
    #[cfg(not(feature = "rodio"))]
    {
        Ok(SilentBackend::default())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use soundboard_core::{command_queue, Keymap, KeymapRecord};

    use super::*;

    fn router() -> (KeyRouter, soundboard_core::CommandReceiver) {
        let mut keymap = Keymap::new();
        keymap.insert("a", KeymapRecord::new("kick.wav", None));
        let (tx, rx) = command_queue();
        (KeyRouter::new(["minus".to_string()], Arc::new(keymap), tx), rx)
    }

    #[test]
    fn lines_map_to_commands() {
        let (router, rx) = router();
        assert!(handle_line(&router, "a"));
        assert!(handle_line(&router, "minus"));
        assert!(handle_line(&router, ":click a"));
        assert!(handle_line(&router, ":stop"));
        assert!(handle_line(&router, ""));
        assert!(!handle_line(&router, ":quit"));

        let received: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            received,
            vec![
                PlayerCommand::Play("a".to_string()),
                PlayerCommand::Stop,
                PlayerCommand::Play("a".to_string()),
                PlayerCommand::Stop,
                PlayerCommand::Shutdown,
            ]
        );
    }

    #[test]
    fn silent_backend_rejects_missing_files() {
        let mut backend = SilentBackend::default();
        let err = backend
            .load(Path::new("/definitely/not/here.wav"))
            .unwrap_err();
        assert!(matches!(err, SoundboardError::Playback { .. }));
        assert!(backend.play().is_err());
        assert!(!backend.is_playing());
    }
}
