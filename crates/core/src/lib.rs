//! Core library for the soundboard editor and player.
//!
//! The editor builds bindings in an [`EditorSession`], materializes their
//! thumbnails through the [`AssetStore`] and writes the [`Keymap`] with a
//! [`KeymapStore`]. The player reads the same keymap, renders thumbnails
//! (animating GIFs through the [`AnimationScheduler`]) and turns key events
//! into [`PlayerCommand`]s that the [`Player`] loop feeds to the
//! [`PlaybackEngine`]. Windowing, audio output and the OS key hook are
//! supplied by the caller through [`ThumbnailSurface`], [`AudioBackend`] and
//! [`KeyHook`].

pub mod assets;
pub mod audio;
pub mod config;
pub mod error;
pub mod input;
pub mod keymap;
pub mod player;
pub mod render;
pub mod session;
pub mod timeline;

#[cfg(test)]
mod testing;

pub use assets::{AssetKind, AssetStore, NormalizedAsset, ThumbnailFrame};
pub use audio::{AudioBackend, PlaybackEngine};
pub use config::SoundboardConfig;
pub use error::{Result, SoundboardError};
pub use input::{command_queue, CommandReceiver, CommandSender, KeyHook, KeyRouter, PlayerCommand};
pub use keymap::{Binding, BindingId, Keymap, KeymapRecord, KeymapStore, ThumbnailState};
pub use player::Player;
pub use render::{GridCell, ThumbnailRenderer, ThumbnailSurface, Tile};
pub use session::EditorSession;
pub use timeline::{AnimationScheduler, AnimationState, TickClock};
