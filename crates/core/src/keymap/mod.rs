//! Binding records and the keymap artifact shared by the editor and the player.
//!
//! The editor works on [`Binding`] values, which may be incomplete (no key yet,
//! a thumbnail still pending). Only keyed bindings become [`KeymapRecord`]s in
//! the persisted [`Keymap`], which [`KeymapStore`] writes as a JSON object of
//! `key -> { "path", "thumbnail" }`.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{Result, SoundboardError};

/// Stable identity of a binding for the lifetime of an editor session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(u64);

impl BindingId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Where a binding's thumbnail currently lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThumbnailState {
    Absent,
    /// Normalized in memory, waiting for the next commit. Carries the source
    /// extension (with the leading dot) used to pick the encoder.
    Pending { extension: String },
    Materialized(PathBuf),
}

/// One editable association between a key, a sound and a thumbnail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    id: BindingId,
    key: Option<String>,
    sound_path: PathBuf,
    thumbnail: ThumbnailState,
}

impl Binding {
    pub(crate) fn new(id: BindingId, sound_path: PathBuf) -> Self {
        Self {
            id,
            key: None,
            sound_path,
            thumbnail: ThumbnailState::Absent,
        }
    }

    pub(crate) fn from_record(id: BindingId, key: &str, record: &KeymapRecord) -> Self {
        Self {
            id,
            key: Some(key.to_string()),
            sound_path: record.path.clone(),
            thumbnail: match &record.thumbnail {
                Some(path) => ThumbnailState::Materialized(path.clone()),
                None => ThumbnailState::Absent,
            },
        }
    }

    pub fn id(&self) -> BindingId {
        self.id
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn sound_path(&self) -> &Path {
        &self.sound_path
    }

    pub fn thumbnail(&self) -> &ThumbnailState {
        &self.thumbnail
    }

    pub(crate) fn set_key(&mut self, key: String) {
        self.key = Some(key);
    }

    pub(crate) fn set_thumbnail(&mut self, thumbnail: ThumbnailState) {
        self.thumbnail = thumbnail;
    }

    /// Converts a keyed binding into its persisted form. Unkeyed bindings are
    /// not part of the keymap.
    pub fn to_record(&self) -> Option<(String, KeymapRecord)> {
        let key = self.key.as_ref().filter(|key| !key.is_empty())?;
        let thumbnail = match &self.thumbnail {
            ThumbnailState::Materialized(path) => Some(path.clone()),
            ThumbnailState::Absent | ThumbnailState::Pending { .. } => None,
        };
        Some((key.clone(), KeymapRecord::new(self.sound_path.clone(), thumbnail)))
    }

    /// Single-line description used by the editor listing, e.g.
    /// `a | kick.wav | thumb_0.png`.
    pub fn display_row(&self, index: usize) -> String {
        let key = self.key().unwrap_or("(unassigned)");
        let sound = file_name(&self.sound_path);
        let thumb = match &self.thumbnail {
            ThumbnailState::Absent => "(no thumb)".to_string(),
            ThumbnailState::Pending { extension } => format!("thumb_{index}{extension} (pending)"),
            ThumbnailState::Materialized(path) => file_name(path),
        };
        format!("{key} | {sound} | {thumb}")
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Persisted value for one key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeymapRecord {
    pub path: PathBuf,
    /// Written as an empty string when absent; absent, null and empty all read
    /// back as `None`.
    #[serde(default, with = "empty_as_none")]
    pub thumbnail: Option<PathBuf>,
}

impl KeymapRecord {
    pub fn new(path: impl Into<PathBuf>, thumbnail: Option<PathBuf>) -> Self {
        Self {
            path: path.into(),
            thumbnail: thumbnail.filter(|path| !path.as_os_str().is_empty()),
        }
    }
}

mod empty_as_none {
    use std::path::PathBuf;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<PathBuf>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(path) => serializer.serialize_str(&path.to_string_lossy()),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<PathBuf>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.filter(|path| !path.is_empty()).map(PathBuf::from))
    }
}

/// Full set of persisted bindings, ordered by key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Keymap {
    entries: BTreeMap<String, KeymapRecord>,
}

impl Keymap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, record: KeymapRecord) -> Option<KeymapRecord> {
        self.entries.insert(key.into(), record)
    }

    pub fn get(&self, key: &str) -> Option<&KeymapRecord> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &KeymapRecord)> {
        self.entries.iter().map(|(key, record)| (key.as_str(), record))
    }

    fn validate(&self) -> std::result::Result<(), String> {
        for (key, record) in &self.entries {
            if key.is_empty() {
                return Err("binding with an empty key".to_string());
            }
            if record.path.as_os_str().is_empty() {
                return Err(format!("binding `{key}` has no sound path"));
            }
        }
        Ok(())
    }
}

impl FromIterator<(String, KeymapRecord)> for Keymap {
    fn from_iter<I: IntoIterator<Item = (String, KeymapRecord)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Durable home of the [`Keymap`]. The editor is the only writer.
#[derive(Debug, Clone)]
pub struct KeymapStore {
    path: PathBuf,
}

impl KeymapStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the keymap. Returns [`SoundboardError::StoreNotFound`] when
    /// nothing has been saved yet and [`SoundboardError::StoreCorrupt`] when
    /// the file does not parse.
    pub fn load(&self) -> Result<Keymap> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(SoundboardError::StoreNotFound(self.path.clone()));
            }
            Err(err) => return Err(err.into()),
        };

        let keymap: Keymap =
            serde_json::from_str(&text).map_err(|err| SoundboardError::corrupt(&self.path, err))?;
        keymap
            .validate()
            .map_err(|reason| SoundboardError::corrupt(&self.path, reason))?;

        tracing::debug!(path = ?self.path, bindings = keymap.len(), "loaded keymap");
        Ok(keymap)
    }

    /// Like [`KeymapStore::load`], but a missing artifact is an empty keymap.
    pub fn load_or_default(&self) -> Result<Keymap> {
        match self.load() {
            Err(SoundboardError::StoreNotFound(_)) => Ok(Keymap::new()),
            other => other,
        }
    }

    /// Overwrites the artifact. The JSON is written next to the target and
    /// renamed over it so readers never see a partial file.
    pub fn save(&self, keymap: &Keymap) -> Result<()> {
        let json = serde_json::to_string_pretty(keymap)
            .map_err(|err| SoundboardError::msg(format!("failed to serialize keymap: {err}")))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);

        std::fs::write(&staging, json)?;
        std::fs::rename(&staging, &self.path)?;

        tracing::info!(path = ?self.path, bindings = keymap.len(), "saved keymap");
        Ok(())
    }
}
