use image::{imageops, imageops::FilterType, Rgba, RgbaImage};

use crate::SoundboardConfig;

const PLACEHOLDER_GRAY: Rgba<u8> = Rgba([128, 128, 128, 255]);

/// Position of a tile in the player's thumbnail grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridCell {
    pub row: usize,
    pub column: usize,
}

impl GridCell {
    /// Cell of the `slot`-th binding, filling rows left to right.
    pub fn for_slot(slot: usize, columns: usize) -> Self {
        let columns = columns.max(1);
        Self {
            row: slot / columns,
            column: slot % columns,
        }
    }
}

/// Reference to one on-screen thumbnail element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tile {
    pub key: String,
    pub cell: GridCell,
}

/// Display side of the player. Implementations own the actual widgets; the
/// core only pushes ready-to-show frames.
pub trait ThumbnailSurface {
    /// Shows `frame` on `tile`, creating the element on first use.
    fn show(&mut self, tile: &Tile, frame: &RgbaImage);

    /// Shows a text notice instead of the grid.
    fn notice(&mut self, text: &str);
}

/// Turns normalized thumbnails into what the player puts on screen.
#[derive(Debug, Clone)]
pub struct ThumbnailRenderer {
    size: u32,
    corner_radius: u32,
}

impl ThumbnailRenderer {
    pub fn new(size: u32, corner_radius: u32) -> Self {
        Self {
            size: size.max(1),
            corner_radius,
        }
    }

    pub fn from_config(config: &SoundboardConfig) -> Self {
        Self::new(config.display_size, config.corner_radius)
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Resizes to the display size and rounds the corners.
    pub fn prepare(&self, frame: &RgbaImage) -> RgbaImage {
        let mut out = imageops::resize(frame, self.size, self.size, FilterType::Triangle);
        round_corners(&mut out, self.corner_radius);
        out
    }

    /// Gray tile for bindings without a usable thumbnail.
    pub fn placeholder(&self) -> RgbaImage {
        let mut out = RgbaImage::from_pixel(self.size, self.size, PLACEHOLDER_GRAY);
        round_corners(&mut out, self.corner_radius);
        out
    }
}

/// Clears the alpha of every pixel outside a rounded rectangle covering the
/// whole image.
pub fn round_corners(image: &mut RgbaImage, radius: u32) {
    let (width, height) = image.dimensions();
    let radius = radius.min(width / 2).min(height / 2);
    if radius == 0 {
        return;
    }

    let r = radius as f32;
    let right = (width - radius) as f32;
    let bottom = (height - radius) as f32;

    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let px = x as f32 + 0.5;
        let py = y as f32 + 0.5;
        let cx = if px < r {
            r
        } else if px > right {
            right
        } else {
            continue;
        };
        let cy = if py < r {
            r
        } else if py > bottom {
            bottom
        } else {
            continue;
        };

        let (dx, dy) = (px - cx, py - cy);
        if dx * dx + dy * dy > r * r {
            pixel.0[3] = 0;
        }
    }
}
