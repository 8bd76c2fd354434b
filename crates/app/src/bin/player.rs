use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use soundboard_app::{default_backend, init_tracing, StdinKeyHook, TerminalSurface};
use soundboard_core::{command_queue, KeyHook, KeyRouter, Player, SoundboardConfig};

fn main() -> soundboard_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = SoundboardConfig::load(&cli.config)?;
    tracing::info!(keymap = ?config.keymap_path, "starting player");

    let mut player = Player::launch(&config, default_backend()?, TerminalSurface::default())?;

    let (commands, queue) = command_queue();
    let router = KeyRouter::new(config.stop_keys.clone(), Arc::clone(player.keymap()), commands);
    StdinKeyHook.install(router)?;

    player.run(&queue);
    Ok(())
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Plays the sound bound to each key press",
    long_about = "Plays the sound bound to each key press. Thumbnails are laid out in key \
                  order, three per row by default."
)]
struct Cli {
    /// Optional config file; defaults apply when it does not exist.
    #[arg(long, default_value = "soundboard.json")]
    config: PathBuf,
}
