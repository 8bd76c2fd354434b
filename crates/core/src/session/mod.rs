//! Editing state for the keymap editor.
//!
//! Bindings are kept in display order. Pending thumbnails are tracked by
//! [`BindingId`], so removing or reordering bindings never attaches a pending
//! image to the wrong sound. The list index is only used where it is visible:
//! in the listing and in the materialized file name. Every commit moves
//! committed thumbnails back to `thumb_<index><ext>` for their current index,
//! so no two bindings ever share a file.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use crate::{
    assets::{extension_of, AssetStore, NormalizedAsset},
    keymap::{Binding, BindingId, Keymap, KeymapStore, ThumbnailState},
    Result, SoundboardError,
};

#[derive(Debug)]
struct PendingThumbnail {
    asset: NormalizedAsset,
    /// Committed file this thumbnail supersedes.
    replaces: Option<PathBuf>,
}

/// In-memory editor state between two saves.
#[derive(Debug)]
pub struct EditorSession {
    bindings: Vec<Binding>,
    pending: HashMap<BindingId, PendingThumbnail>,
    next_id: u64,
    assets: AssetStore,
    store: KeymapStore,
}

impl EditorSession {
    /// Starts an empty session.
    pub fn new(assets: AssetStore, store: KeymapStore) -> Self {
        Self {
            bindings: Vec::new(),
            pending: HashMap::new(),
            next_id: 0,
            assets,
            store,
        }
    }

    /// Starts a session seeded from the saved keymap. A missing keymap gives
    /// an empty session; a corrupt one is an error.
    pub fn open(assets: AssetStore, store: KeymapStore) -> Result<Self> {
        let keymap = store.load_or_default()?;
        let mut session = Self::new(assets, store);
        for (key, record) in keymap.iter() {
            let id = session.allocate_id();
            session.bindings.push(Binding::from_record(id, key, record));
        }
        tracing::info!(bindings = session.bindings.len(), "opened editor session");
        Ok(session)
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn binding(&self, index: usize) -> Result<&Binding> {
        self.bindings.get(index).ok_or(SoundboardError::NoSuchBinding(index))
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Listing lines, one per binding.
    pub fn rows(&self) -> Vec<String> {
        self.bindings
            .iter()
            .enumerate()
            .map(|(index, binding)| binding.display_row(index))
            .collect()
    }

    /// Appends a binding for `path` with no key. Returns its index.
    pub fn add_sound(&mut self, path: impl Into<PathBuf>) -> usize {
        let id = self.allocate_id();
        let path = path.into();
        tracing::debug!(?path, "added sound");
        self.bindings.push(Binding::new(id, path));
        self.bindings.len() - 1
    }

    /// Normalizes `source` and holds it until the next commit. On a decode
    /// failure nothing changes.
    pub fn assign_thumbnail(&mut self, index: usize, source: &Path) -> Result<()> {
        let id = self.binding(index)?.id();
        let asset = self.assets.normalize(source)?;

        let replaces = match self.bindings[index].thumbnail() {
            ThumbnailState::Materialized(path) => Some(path.clone()),
            ThumbnailState::Absent | ThumbnailState::Pending { .. } => {
                self.pending.get(&id).and_then(|pending| pending.replaces.clone())
            }
        };

        let extension = asset.extension().to_string();
        self.pending.insert(id, PendingThumbnail { asset, replaces });
        self.bindings[index].set_thumbnail(ThumbnailState::Pending { extension });
        tracing::debug!(index, ?source, "thumbnail pending");
        Ok(())
    }

    /// Binds `key` to the binding at `index`, unless another binding already
    /// holds it.
    pub fn assign_key(&mut self, index: usize, key: &str) -> Result<()> {
        self.binding(index)?;
        if key.is_empty() {
            return Err(SoundboardError::msg("key token must not be empty"));
        }

        if let Some(holder) = self
            .bindings
            .iter()
            .enumerate()
            .position(|(i, binding)| i != index && binding.key() == Some(key))
        {
            tracing::warn!(key, index, holder, "key already assigned");
            return Err(SoundboardError::KeyConflict {
                key: key.to_string(),
                holder,
            });
        }

        self.bindings[index].set_key(key.to_string());
        tracing::debug!(key, index, "assigned key");
        Ok(())
    }

    /// Deletes the binding at `index`, dropping its pending thumbnail and
    /// cleaning up its materialized one.
    pub fn remove_sound(&mut self, index: usize) -> Result<Binding> {
        self.binding(index)?;
        let binding = self.bindings.remove(index);
        let replaced = self
            .pending
            .remove(&binding.id())
            .and_then(|pending| pending.replaces);

        let file = match binding.thumbnail() {
            ThumbnailState::Materialized(path) => Some(path.clone()),
            ThumbnailState::Absent | ThumbnailState::Pending { .. } => replaced,
        };
        if let Some(path) = file.filter(|path| !self.is_held(path)) {
            self.assets.remove(&path);
        }
        tracing::debug!(index, "removed sound");
        Ok(binding)
    }

    /// Materializes every pending thumbnail, then overwrites the keymap with
    /// all keyed bindings. Files superseded by a new thumbnail are deleted
    /// once the keymap is written.
    ///
    /// Stops at the first thumbnail that fails to encode: thumbnails already
    /// written keep their final path, the rest stay pending, and the keymap
    /// is not written.
    pub fn commit(&mut self) -> Result<Keymap> {
        self.rehome_thumbnails()?;

        let mut superseded = Vec::new();
        for index in 0..self.bindings.len() {
            let id = self.bindings[index].id();
            let Some(pending) = self.pending.get(&id) else {
                continue;
            };

            let path = self.assets.materialize(index, &pending.asset)?;
            if let Some(old) = self.pending.remove(&id).and_then(|pending| pending.replaces) {
                if old != path {
                    superseded.push(old);
                }
            }
            self.bindings[index].set_thumbnail(ThumbnailState::Materialized(path));
        }
        self.pending.clear();

        let keymap: Keymap = self.bindings.iter().filter_map(Binding::to_record).collect();
        self.store.save(&keymap)?;

        for path in superseded {
            if !self.is_held(&path) {
                self.assets.remove(&path);
            }
        }
        Ok(keymap)
    }

    /// Moves every committed thumbnail in the thumbnail directory to the name
    /// for its binding's current index. Bindings whose file has vanished lose
    /// their thumbnail.
    fn rehome_thumbnails(&mut self) -> Result<()> {
        let mut moves = Vec::new();
        for (index, binding) in self.bindings.iter_mut().enumerate() {
            let ThumbnailState::Materialized(path) = binding.thumbnail() else {
                continue;
            };
            if !self.assets.owns(path) {
                continue;
            }
            if !path.exists() {
                tracing::warn!(?path, index, "thumbnail file missing; dropping it");
                binding.set_thumbnail(ThumbnailState::Absent);
                continue;
            }

            let target = self.assets.destination(index, &extension_of(path));
            if *path != target {
                moves.push((index, path.clone(), target));
            }
        }

        // Staged in two steps so that files trading names never overwrite
        // each other.
        let mut staged = Vec::with_capacity(moves.len());
        for (index, from, target) in moves {
            let staging = self
                .assets
                .root()
                .join(format!(".rehome_{index}{}", extension_of(&from)));
            self.assets.relocate(&from, &staging)?;
            self.bindings[index].set_thumbnail(ThumbnailState::Materialized(staging.clone()));
            staged.push((index, staging, target));
        }
        for (index, staging, target) in staged {
            self.assets.relocate(&staging, &target)?;
            self.bindings[index].set_thumbnail(ThumbnailState::Materialized(target));
        }
        Ok(())
    }

    fn is_held(&self, path: &Path) -> bool {
        self.bindings
            .iter()
            .any(|binding| binding.thumbnail() == &ThumbnailState::Materialized(path.to_path_buf()))
    }

    fn allocate_id(&mut self) -> BindingId {
        let id = BindingId::new(self.next_id);
        self.next_id += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        testing::{write_gif, write_png, write_solid_png, TempDir},
        KeymapRecord,
    };

    fn session(tmp: &TempDir) -> EditorSession {
        EditorSession::new(
            AssetStore::new(tmp.path().join("thumbnails")),
            KeymapStore::new(tmp.path().join("keymap.json")),
        )
    }

    #[test]
    fn commit_without_thumbnail_writes_empty_thumbnail() {
        let tmp = TempDir::new("session_plain");
        let mut session = session(&tmp);

        let index = session.add_sound("kick.wav");
        session.assign_key(index, "a").unwrap();
        session.commit().unwrap();

        let text = std::fs::read_to_string(tmp.path().join("keymap.json")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "a": { "path": "kick.wav", "thumbnail": "" } })
        );
    }

    #[test]
    fn duplicate_key_is_rejected_and_state_kept() {
        let tmp = TempDir::new("session_conflict");
        let mut session = session(&tmp);

        session.add_sound("kick.wav");
        session.add_sound("snare.wav");
        session.assign_key(0, "a").unwrap();

        let err = session.assign_key(1, "a").unwrap_err();
        assert!(matches!(err, SoundboardError::KeyConflict { holder: 0, .. }));
        assert_eq!(session.binding(1).unwrap().key(), None);
        assert_eq!(session.binding(0).unwrap().key(), Some("a"));
    }

    #[test]
    fn reassigning_own_key_is_allowed() {
        let tmp = TempDir::new("session_reassign");
        let mut session = session(&tmp);
        session.add_sound("kick.wav");
        session.assign_key(0, "a").unwrap();
        session.assign_key(0, "a").unwrap();
        session.assign_key(0, "b").unwrap();
        assert_eq!(session.binding(0).unwrap().key(), Some("b"));
    }

    #[test]
    fn keys_stay_unique_across_assignment_sequences() {
        let tmp = TempDir::new("session_unique");
        let mut session = session(&tmp);
        for _ in 0..4 {
            session.add_sound("s.wav");
        }

        let attempts = [(0, "a"), (1, "a"), (1, "b"), (2, "b"), (0, "c"), (2, "a"), (3, "c"), (3, "a")];
        for (index, key) in attempts {
            let _ = session.assign_key(index, key);
        }

        let keys: Vec<_> = session.bindings().iter().filter_map(Binding::key).collect();
        let mut unique = keys.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(keys.len(), unique.len());
    }

    #[test]
    fn sound_paths_may_repeat() {
        let tmp = TempDir::new("session_repeat");
        let mut session = session(&tmp);
        session.add_sound("kick.wav");
        session.add_sound("kick.wav");
        assert_eq!(session.bindings().len(), 2);
    }

    #[test]
    fn pending_thumbnail_is_materialized_on_commit() {
        let tmp = TempDir::new("session_thumb");
        let source = tmp.path().join("cover.png");
        write_png(&source, 8, 4);
        let mut session = session(&tmp);

        session.add_sound("kick.wav");
        session.assign_key(0, "a").unwrap();
        session.assign_thumbnail(0, &source).unwrap();
        assert_eq!(session.rows(), vec!["a | kick.wav | thumb_0.png (pending)"]);
        assert_eq!(session.pending_count(), 1);

        let keymap = session.commit().unwrap();
        let expected = tmp.path().join("thumbnails").join("thumb_0.png");
        assert_eq!(keymap.get("a").unwrap().thumbnail, Some(expected.clone()));
        assert!(expected.exists());
        assert_eq!(session.pending_count(), 0);
        assert_eq!(
            session.binding(0).unwrap().thumbnail(),
            &ThumbnailState::Materialized(expected)
        );
    }

    #[test]
    fn pending_thumbnail_follows_binding_after_removal() {
        let tmp = TempDir::new("session_follow");
        let source = tmp.path().join("loop.gif");
        write_gif(&source, 4, 4, 2);
        let mut session = session(&tmp);

        session.add_sound("first.wav");
        session.add_sound("second.wav");
        session.assign_key(1, "b").unwrap();
        session.assign_thumbnail(1, &source).unwrap();
        session.remove_sound(0).unwrap();

        let keymap = session.commit().unwrap();
        let record = keymap.get("b").unwrap();
        assert_eq!(record.path, PathBuf::from("second.wav"));
        assert_eq!(
            record.thumbnail,
            Some(tmp.path().join("thumbnails").join("thumb_0.gif"))
        );
    }

    #[test]
    fn failed_decode_leaves_binding_untouched() {
        let tmp = TempDir::new("session_bad_thumb");
        let source = tmp.path().join("bad.png");
        std::fs::write(&source, b"garbage").unwrap();
        let mut session = session(&tmp);

        session.add_sound("kick.wav");
        let err = session.assign_thumbnail(0, &source).unwrap_err();
        assert!(matches!(err, SoundboardError::AssetDecode { .. }));
        assert_eq!(session.binding(0).unwrap().thumbnail(), &ThumbnailState::Absent);
        assert_eq!(session.pending_count(), 0);
    }

    #[test]
    fn failed_materialization_aborts_save() {
        let tmp = TempDir::new("session_abort");
        let source = tmp.path().join("cover.png");
        write_png(&source, 4, 4);

        // A regular file where the thumbnail directory should be.
        let blocked = tmp.path().join("thumbnails");
        std::fs::write(&blocked, b"").unwrap();

        let mut session = session(&tmp);
        session.add_sound("kick.wav");
        session.assign_key(0, "a").unwrap();
        session.assign_thumbnail(0, &source).unwrap();

        assert!(session.commit().is_err());
        assert!(!tmp.path().join("keymap.json").exists());
        assert_eq!(session.pending_count(), 1);
    }

    #[test]
    fn unkeyed_bindings_are_not_saved() {
        let tmp = TempDir::new("session_unkeyed");
        let mut session = session(&tmp);
        session.add_sound("kick.wav");
        session.add_sound("snare.wav");
        session.assign_key(1, "s").unwrap();

        let keymap = session.commit().unwrap();
        assert_eq!(keymap.len(), 1);
        assert!(keymap.contains_key("s"));
    }

    #[test]
    fn remove_deletes_materialized_thumbnail() {
        let tmp = TempDir::new("session_remove");
        let source = tmp.path().join("cover.png");
        write_png(&source, 4, 4);
        let mut session = session(&tmp);

        session.add_sound("kick.wav");
        session.assign_key(0, "a").unwrap();
        session.assign_thumbnail(0, &source).unwrap();
        session.commit().unwrap();
        let thumb = tmp.path().join("thumbnails").join("thumb_0.png");
        assert!(thumb.exists());

        session.remove_sound(0).unwrap();
        assert!(!thumb.exists());
        assert!(session.bindings().is_empty());
    }

    fn pixel_at(path: &Path) -> [u8; 4] {
        image::open(path).unwrap().to_rgba8().get_pixel(0, 0).0
    }

    fn materialized(session: &EditorSession, index: usize) -> PathBuf {
        match session.binding(index).unwrap().thumbnail() {
            ThumbnailState::Materialized(path) => path.clone(),
            other => panic!("expected a materialized thumbnail, got {other:?}"),
        }
    }

    #[test]
    fn new_thumbnail_after_removal_keeps_other_bindings_intact() {
        const RED: [u8; 4] = [255, 0, 0, 255];
        const BLUE: [u8; 4] = [0, 0, 255, 255];
        const GREEN: [u8; 4] = [0, 255, 0, 255];

        let tmp = TempDir::new("session_rehome");
        let colors = [("red.png", RED), ("blue.png", BLUE), ("green.png", GREEN)];
        for (name, color) in colors {
            write_solid_png(&tmp.path().join(name), 4, 4, color);
        }
        let mut session = session(&tmp);

        session.add_sound("x.wav");
        session.add_sound("y.wav");
        session.assign_key(0, "x").unwrap();
        session.assign_key(1, "y").unwrap();
        session.assign_thumbnail(0, &tmp.path().join("red.png")).unwrap();
        session.assign_thumbnail(1, &tmp.path().join("blue.png")).unwrap();
        session.commit().unwrap();

        session.remove_sound(0).unwrap();
        let z = session.add_sound("z.wav");
        assert_eq!(z, 1);
        session.assign_key(z, "z").unwrap();
        session.assign_thumbnail(z, &tmp.path().join("green.png")).unwrap();
        let keymap = session.commit().unwrap();

        let thumbs = tmp.path().join("thumbnails");
        let y_thumb = materialized(&session, 0);
        let z_thumb = materialized(&session, 1);
        assert_eq!(y_thumb, thumbs.join("thumb_0.png"));
        assert_eq!(z_thumb, thumbs.join("thumb_1.png"));
        assert_eq!(pixel_at(&y_thumb), BLUE);
        assert_eq!(pixel_at(&z_thumb), GREEN);
        assert_eq!(keymap.get("y").unwrap().thumbnail, Some(y_thumb.clone()));

        session.remove_sound(1).unwrap();
        assert!(y_thumb.exists());
        assert!(!z_thumb.exists());
    }

    #[test]
    fn shifted_thumbnails_follow_their_bindings() {
        let tmp = TempDir::new("session_shift");
        write_solid_png(&tmp.path().join("a.png"), 2, 2, [10, 0, 0, 255]);
        write_solid_png(&tmp.path().join("b.png"), 2, 2, [20, 0, 0, 255]);
        write_solid_png(&tmp.path().join("c.png"), 2, 2, [30, 0, 0, 255]);
        let mut session = session(&tmp);

        for (index, (sound, image)) in [("a.wav", "a.png"), ("b.wav", "b.png"), ("c.wav", "c.png")]
            .into_iter()
            .enumerate()
        {
            session.add_sound(sound);
            session.assign_key(index, &index.to_string()).unwrap();
            session.assign_thumbnail(index, &tmp.path().join(image)).unwrap();
        }
        session.commit().unwrap();

        session.remove_sound(0).unwrap();
        session.commit().unwrap();

        assert_eq!(pixel_at(&materialized(&session, 0))[0], 20);
        assert_eq!(pixel_at(&materialized(&session, 1))[0], 30);
        let names: Vec<_> = std::fs::read_dir(tmp.path().join("thumbnails"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 2, "{names:?}");
    }

    #[test]
    fn replaced_thumbnail_file_is_deleted_on_commit() {
        let tmp = TempDir::new("session_replace");
        let still = tmp.path().join("cover.png");
        let animated = tmp.path().join("loop.gif");
        write_png(&still, 4, 4);
        write_gif(&animated, 4, 4, 2);
        let mut session = session(&tmp);

        session.add_sound("kick.wav");
        session.assign_key(0, "a").unwrap();
        session.assign_thumbnail(0, &still).unwrap();
        session.commit().unwrap();
        let old = tmp.path().join("thumbnails").join("thumb_0.png");
        assert!(old.exists());

        session.assign_thumbnail(0, &animated).unwrap();
        let keymap = session.commit().unwrap();

        let new = tmp.path().join("thumbnails").join("thumb_0.gif");
        assert_eq!(keymap.get("a").unwrap().thumbnail, Some(new.clone()));
        assert!(new.exists());
        assert!(!old.exists());
    }

    #[test]
    fn same_extension_replacement_keeps_the_new_file() {
        let tmp = TempDir::new("session_replace_same");
        let first = tmp.path().join("first.png");
        let second = tmp.path().join("second.png");
        write_solid_png(&first, 2, 2, [1, 0, 0, 255]);
        write_solid_png(&second, 2, 2, [2, 0, 0, 255]);
        let mut session = session(&tmp);

        session.add_sound("kick.wav");
        session.assign_key(0, "a").unwrap();
        session.assign_thumbnail(0, &first).unwrap();
        session.commit().unwrap();
        session.assign_thumbnail(0, &second).unwrap();
        session.commit().unwrap();

        let thumb = materialized(&session, 0);
        assert!(thumb.exists());
        assert_eq!(pixel_at(&thumb)[0], 2);
    }

    #[test]
    fn open_seeds_from_saved_keymap() {
        let tmp = TempDir::new("session_open");
        let store = KeymapStore::new(tmp.path().join("keymap.json"));
        let mut keymap = Keymap::new();
        keymap.insert("a", KeymapRecord::new("kick.wav", None));
        keymap.insert(
            "b",
            KeymapRecord::new("snare.wav", Some(PathBuf::from("thumbnails/thumb_1.png"))),
        );
        store.save(&keymap).unwrap();

        let session = EditorSession::open(AssetStore::new(tmp.path().join("thumbnails")), store).unwrap();
        assert_eq!(
            session.rows(),
            vec!["a | kick.wav | (no thumb)", "b | snare.wav | thumb_1.png"]
        );
    }

    #[test]
    fn open_without_keymap_is_empty() {
        let tmp = TempDir::new("session_open_empty");
        let session = EditorSession::open(
            AssetStore::new(tmp.path().join("thumbnails")),
            KeymapStore::new(tmp.path().join("keymap.json")),
        )
        .unwrap();
        assert!(session.bindings().is_empty());
    }

    #[test]
    fn out_of_range_index_is_reported() {
        let tmp = TempDir::new("session_range");
        let mut session = session(&tmp);
        assert!(matches!(
            session.assign_key(3, "a"),
            Err(SoundboardError::NoSuchBinding(3))
        ));
        assert!(matches!(session.remove_sound(0), Err(SoundboardError::NoSuchBinding(0))));
    }
}
