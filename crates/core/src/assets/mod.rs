//! Thumbnail normalization and on-disk materialization.
//!
//! Source images are decoded into frames (one for still images, all of them for
//! GIF animations), each centre-cropped to a square. Materialized thumbnails are
//! written under the store root as `thumb_<index><ext>`.

use std::{
    fs::File,
    io::{BufReader, Cursor},
    path::{Path, PathBuf},
};

use image::{
    codecs::gif::{GifDecoder, GifEncoder, Repeat},
    imageops, AnimationDecoder, Delay, DynamicImage, Frame, ImageFormat, ImageReader, RgbaImage,
};

use crate::{Result, SoundboardError};

/// Extensions offered when picking a sound file.
pub const SOUND_EXTENSIONS: &[&str] = &["mp3", "wav"];
/// Extensions offered when picking a thumbnail.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "png", "jpeg", "gif"];

const FALLBACK_EXTENSION: &str = ".png";

/// Whether a thumbnail file is decoded as an animation or a still image.
/// Decided by file extension alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Static,
    Animated,
}

impl AssetKind {
    pub fn from_extension(extension: &str) -> Self {
        if extension.trim_start_matches('.').eq_ignore_ascii_case("gif") {
            Self::Animated
        } else {
            Self::Static
        }
    }

    pub fn of_path(path: &Path) -> Self {
        Self::from_extension(&extension_of(path))
    }
}

/// Lower-cased extension of `path` including the leading dot, or an empty
/// string when there is none.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

/// Returns true when `path` carries one of the `allowed` extensions.
pub fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    let ext = extension_of(path);
    allowed
        .iter()
        .any(|candidate| ext.trim_start_matches('.') == *candidate)
}

/// One decoded frame and how long it stays on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailFrame {
    pub image: RgbaImage,
    pub delay: Delay,
}

impl ThumbnailFrame {
    pub fn still(image: RgbaImage) -> Self {
        Self {
            image,
            delay: Delay::from_numer_denom_ms(0, 1),
        }
    }
}

/// Square frames ready to be materialized. Never empty.
#[derive(Debug, Clone)]
pub struct NormalizedAsset {
    frames: Vec<ThumbnailFrame>,
    kind: AssetKind,
    extension: String,
}

impl NormalizedAsset {
    pub fn frames(&self) -> &[ThumbnailFrame] {
        &self.frames
    }

    pub fn kind(&self) -> AssetKind {
        self.kind
    }

    /// Extension of the source file, with the leading dot.
    pub fn extension(&self) -> &str {
        &self.extension
    }
}

/// Owner of the thumbnail directory.
#[derive(Debug, Clone)]
pub struct AssetStore {
    root: PathBuf,
}

impl AssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Decodes `source` and centre-crops every frame to a square of side
    /// `min(width, height)`. No scaling happens here.
    pub fn normalize(&self, source: &Path) -> Result<NormalizedAsset> {
        let mut extension = extension_of(source);
        let kind = AssetKind::from_extension(&extension);

        let frames = decode_frames(source)?
            .into_iter()
            .map(|frame| ThumbnailFrame {
                image: crop_to_square(&frame.image),
                delay: frame.delay,
            })
            .collect::<Vec<_>>();

        if kind == AssetKind::Static && ImageFormat::from_extension(extension.trim_start_matches('.')).is_none() {
            extension = FALLBACK_EXTENSION.to_string();
        }

        tracing::debug!(?source, frames = frames.len(), ?kind, "normalized thumbnail");
        Ok(NormalizedAsset {
            frames,
            kind,
            extension,
        })
    }

    /// Destination for the thumbnail of the binding at `index`.
    pub fn destination(&self, index: usize, extension: &str) -> PathBuf {
        let extension = if extension.is_empty() {
            FALLBACK_EXTENSION
        } else {
            extension
        };
        self.root.join(format!("thumb_{index}{extension}"))
    }

    /// Encodes `asset` to its destination, replacing any previous file for
    /// the same index, and returns the path written.
    pub fn materialize(&self, index: usize, asset: &NormalizedAsset) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.root)?;
        let path = self.destination(index, &asset.extension);

        let bytes = match asset.kind {
            AssetKind::Animated => encode_animation(&asset.frames),
            AssetKind::Static => encode_still(&asset.frames[0].image, &asset.extension),
        }
        .map_err(|source| SoundboardError::AssetEncode {
            path: path.clone(),
            source,
        })?;

        std::fs::write(&path, bytes)?;
        tracing::info!(?path, index, frames = asset.frames.len(), "materialized thumbnail");
        Ok(path)
    }

    /// Whether `path` is a file directly inside the thumbnail directory.
    pub fn owns(&self, path: &Path) -> bool {
        path.parent() == Some(self.root.as_path())
    }

    /// Moves a materialized thumbnail, replacing whatever is at `to`.
    pub fn relocate(&self, from: &Path, to: &Path) -> Result<()> {
        std::fs::rename(from, to)?;
        tracing::debug!(?from, ?to, "moved thumbnail");
        Ok(())
    }

    /// Best-effort delete of a materialized thumbnail. Failures are logged.
    pub fn remove(&self, path: &Path) {
        match std::fs::remove_file(path) {
            Ok(()) => tracing::debug!(?path, "removed thumbnail"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(?path, "thumbnail already gone");
            }
            Err(err) => tracing::warn!(?path, %err, "failed to remove thumbnail"),
        }
    }
}

/// Decodes every frame of an image file. Still images yield one frame; GIFs
/// yield all of theirs, composited to full canvas size. A GIF without frames
/// is a decode failure.
pub fn decode_frames(path: &Path) -> Result<Vec<ThumbnailFrame>> {
    match AssetKind::of_path(path) {
        AssetKind::Animated => {
            let reader = BufReader::new(File::open(path).map_err(|err| SoundboardError::decode(path, err))?);
            let frames = GifDecoder::new(reader)
                .and_then(|decoder| decoder.into_frames().collect_frames())
                .map_err(|err| SoundboardError::decode(path, err))?;
            if frames.is_empty() {
                return Err(SoundboardError::decode(path, "animation has no frames"));
            }
            Ok(frames
                .into_iter()
                .map(|frame| ThumbnailFrame {
                    delay: frame.delay(),
                    image: frame.into_buffer(),
                })
                .collect())
        }
        AssetKind::Static => {
            let image = ImageReader::open(path)
                .map_err(|err| SoundboardError::decode(path, err))?
                .with_guessed_format()
                .map_err(|err| SoundboardError::decode(path, err))?
                .decode()
                .map_err(|err| SoundboardError::decode(path, err))?;
            Ok(vec![ThumbnailFrame::still(image.to_rgba8())])
        }
    }
}

/// Centred square crop with side `min(width, height)`.
pub fn crop_to_square(image: &RgbaImage) -> RgbaImage {
    let (width, height) = image.dimensions();
    let side = width.min(height);
    let x = (width - side) / 2;
    let y = (height - side) / 2;
    imageops::crop_imm(image, x, y, side, side).to_image()
}

fn encode_animation(frames: &[ThumbnailFrame]) -> image::ImageResult<Vec<u8>> {
    let mut buf = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut buf);
        encoder.set_repeat(Repeat::Infinite)?;
        encoder.encode_frames(
            frames
                .iter()
                .map(|frame| Frame::from_parts(frame.image.clone(), 0, 0, frame.delay)),
        )?;
    }
    Ok(buf)
}

fn encode_still(image: &RgbaImage, extension: &str) -> image::ImageResult<Vec<u8>> {
    let format = ImageFormat::from_extension(extension.trim_start_matches('.')).unwrap_or(ImageFormat::Png);
    let image = DynamicImage::ImageRgba8(image.clone());
    // JPEG has no alpha channel.
    let image = if format == ImageFormat::Jpeg {
        DynamicImage::ImageRgb8(image.to_rgb8())
    } else {
        image
    };

    let mut buf = Vec::new();
    image.write_to(&mut Cursor::new(&mut buf), format)?;
    Ok(buf)
}
