use std::{io::BufRead, ops::ControlFlow, path::PathBuf};

use clap::{Parser, Subcommand};
use soundboard_app::init_tracing;
use soundboard_core::{
    assets::{has_extension, IMAGE_EXTENSIONS, SOUND_EXTENSIONS},
    AssetStore, EditorSession, KeymapStore, SoundboardConfig, SoundboardError,
};

fn main() -> soundboard_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = SoundboardConfig::load(&cli.config)?;
    let mut session = EditorSession::open(
        AssetStore::new(&config.thumbnail_dir),
        KeymapStore::new(&config.keymap_path),
    )?;
    print_rows(&session);

    for line in std::io::stdin().lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let command = match Line::try_parse_from(line.split_whitespace()) {
            Ok(parsed) => parsed.command,
            Err(err) => {
                println!("{err}");
                continue;
            }
        };

        match execute(&mut session, command) {
            Ok(ControlFlow::Break(())) => break,
            Ok(ControlFlow::Continue(())) => {}
            Err(SoundboardError::KeyConflict { key, .. }) => {
                println!("The key '{key}' is already taken. Try another key.");
            }
            Err(err) => println!("error: {err}"),
        }
    }

    if session.pending_count() > 0 {
        tracing::warn!(pending = session.pending_count(), "discarding unsaved thumbnails");
    }
    Ok(())
}

fn execute(
    session: &mut EditorSession,
    command: EditorCommand,
) -> soundboard_core::Result<ControlFlow<()>> {
    match command {
        EditorCommand::Add { path } => {
            let Some(path) = picked(path) else {
                return Ok(ControlFlow::Continue(()));
            };
            if !has_extension(&path, SOUND_EXTENSIONS) {
                tracing::warn!(?path, "not an .mp3 or .wav file");
            }
            session.add_sound(path);
            print_rows(session);
        }
        EditorCommand::Thumb { index, path } => {
            let Some(path) = picked(path) else {
                return Ok(ControlFlow::Continue(()));
            };
            if !has_extension(&path, IMAGE_EXTENSIONS) {
                tracing::warn!(?path, "not a .jpg, .jpeg, .png or .gif file");
            }
            session.assign_thumbnail(index, &path)?;
            print_rows(session);
        }
        EditorCommand::Key { index, key } => {
            session.assign_key(index, &key)?;
            println!("Assigned key '{key}'");
            print_rows(session);
        }
        EditorCommand::Remove { index } => {
            session.remove_sound(index)?;
            print_rows(session);
        }
        EditorCommand::List => print_rows(session),
        EditorCommand::Save => {
            session.commit()?;
            println!("Key assignments saved!");
            print_rows(session);
        }
        EditorCommand::Quit => return Ok(ControlFlow::Break(())),
    }
    Ok(ControlFlow::Continue(()))
}

// An empty selection is a cancelled pick.
fn picked(parts: Vec<String>) -> Option<PathBuf> {
    let joined = parts.join(" ");
    (!joined.is_empty()).then(|| PathBuf::from(joined))
}

fn print_rows(session: &EditorSession) {
    for (index, row) in session.rows().iter().enumerate() {
        println!("{index:>3}  {row}");
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Binds sounds and thumbnails to keys", long_about = None)]
struct Cli {
    /// Optional config file; defaults apply when it does not exist.
    #[arg(long, default_value = "soundboard.json")]
    config: PathBuf,
}

#[derive(Parser, Debug)]
#[command(no_binary_name = true)]
struct Line {
    #[command(subcommand)]
    command: EditorCommand,
}

#[derive(Subcommand, Debug)]
enum EditorCommand {
    /// Add a sound file as a new binding without a key.
    Add {
        #[arg(num_args = 0.., trailing_var_arg = true)]
        path: Vec<String>,
    },
    /// Pick a thumbnail image for a binding.
    Thumb {
        index: usize,
        #[arg(num_args = 0.., trailing_var_arg = true)]
        path: Vec<String>,
    },
    /// Bind a key token to a binding.
    Key { index: usize, key: String },
    /// Delete a binding and its thumbnail.
    Remove { index: usize },
    /// Show all bindings.
    List,
    /// Write thumbnails and the keymap.
    Save,
    /// Leave the editor without saving.
    Quit,
}
