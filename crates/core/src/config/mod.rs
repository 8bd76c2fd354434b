use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{Result, SoundboardError};

/// Top-level configuration shared by the editor and the player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundboardConfig {
    /// Keymap artifact shared between the two processes.
    pub keymap_path: PathBuf,
    /// Directory that receives materialized thumbnails.
    pub thumbnail_dir: PathBuf,
    /// Edge length of a rendered thumbnail in the player, in pixels.
    pub display_size: u32,
    pub corner_radius: u32,
    pub grid_columns: usize,
    pub tick_interval_ms: u64,
    /// Key tokens that always stop playback, whatever the keymap says.
    pub stop_keys: Vec<String>,
}

impl Default for SoundboardConfig {
    fn default() -> Self {
        Self {
            keymap_path: PathBuf::from("keymap.json"),
            thumbnail_dir: PathBuf::from("thumbnails"),
            display_size: 150,
            corner_radius: 10,
            grid_columns: 3,
            tick_interval_ms: 100,
            stop_keys: vec!["minus".to_string(), "subtract".to_string(), "-".to_string()],
        }
    }
}

impl SoundboardConfig {
    /// Reads a JSON config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(err) => return Err(err.into()),
        };

        serde_json::from_str(&text).map_err(|err| {
            SoundboardError::msg(format!("invalid config `{}`: {err}", path.display()))
        })
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}
