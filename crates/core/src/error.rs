use std::path::PathBuf;

/// Result alias that carries the custom [`SoundboardError`] type.
pub type Result<T> = std::result::Result<T, SoundboardError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum SoundboardError {
    /// A source image could not be read or decoded. Nothing was changed.
    #[error("failed to decode asset `{}`: {reason}", path.display())]
    AssetDecode { path: PathBuf, reason: String },
    /// Normalized frames could not be written to their destination.
    #[error("failed to encode thumbnail `{}`: {source}", path.display())]
    AssetEncode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    /// The proposed key is already held by another binding.
    #[error("key `{key}` is already assigned to binding {holder}")]
    KeyConflict { key: String, holder: usize },
    /// The editor was asked about a binding that does not exist.
    #[error("no binding at index {0}")]
    NoSuchBinding(usize),
    /// No keymap has been saved yet.
    #[error("keymap `{}` does not exist", .0.display())]
    StoreNotFound(PathBuf),
    /// A keymap exists but is not in the expected shape.
    #[error("keymap `{}` is corrupt: {reason}", path.display())]
    StoreCorrupt { path: PathBuf, reason: String },
    /// The audio backend rejected a sound.
    #[error("playback failed for `{}`: {reason}", path.display())]
    Playback { path: PathBuf, reason: String },
    /// Free-form message for conditions without a dedicated variant.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl SoundboardError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    pub fn decode(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::AssetDecode {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn corrupt(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::StoreCorrupt {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn playback(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Playback {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<&str> for SoundboardError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for SoundboardError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_names_key_and_holder() {
        let err = SoundboardError::KeyConflict {
            key: "a".to_string(),
            holder: 0,
        };
        let text = err.to_string();
        assert!(text.contains("`a`"));
        assert!(text.contains("binding 0"));
    }

    #[test]
    fn io_errors_convert() {
        let err: SoundboardError = std::io::Error::other("boom").into();
        assert!(matches!(err, SoundboardError::Io(_)));
        assert!(err.to_string().contains("boom"));
    }
}
