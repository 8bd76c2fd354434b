use std::{
    io::Cursor,
    path::{Path, PathBuf},
};

use image::{codecs::gif::GifEncoder, Delay, Frame, Rgba, RgbaImage};

/// Scratch directory removed on drop.
pub struct TempDir {
    path: PathBuf,
}

impl TempDir {
    pub fn new(name: &str) -> Self {
        let path = std::env::temp_dir().join(format!(
            "soundboard_{name}_{}_{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        std::fs::create_dir_all(&path).unwrap();
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        std::fs::remove_dir_all(&self.path).ok();
    }
}

pub fn solid(width: u32, height: u32, color: [u8; 4]) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba(color))
}

pub fn write_png(path: &Path, width: u32, height: u32) {
    write_solid_png(path, width, height, [200, 10, 10, 255]);
}

pub fn write_solid_png(path: &Path, width: u32, height: u32, color: [u8; 4]) {
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(solid(width, height, color))
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    std::fs::write(path, &buf).unwrap();
}

pub fn write_gif(path: &Path, width: u32, height: u32, frames: usize) {
    let mut buf = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut buf);
        let frames = (0..frames).map(|i| {
            let shade = (i * 40 % 256) as u8;
            Frame::from_parts(
                solid(width, height, [shade, 255 - shade, 0, 255]),
                0,
                0,
                Delay::from_numer_denom_ms(100, 1),
            )
        });
        encoder.encode_frames(frames).unwrap();
    }
    std::fs::write(path, &buf).unwrap();
}
