use std::time::{Duration, Instant};

use image::RgbaImage;

use crate::render::{ThumbnailSurface, Tile};

/// Looping frame sequence bound to one tile.
#[derive(Debug, Clone)]
pub struct AnimationState {
    tile: Tile,
    frames: Vec<RgbaImage>,
    index: usize,
}

impl AnimationState {
    /// Returns `None` for an empty frame sequence.
    pub fn new(tile: Tile, frames: Vec<RgbaImage>) -> Option<Self> {
        if frames.is_empty() {
            return None;
        }
        Some(Self {
            tile,
            frames,
            index: 0,
        })
    }

    pub fn tile(&self) -> &Tile {
        &self.tile
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn current(&self) -> &RgbaImage {
        &self.frames[self.index]
    }

    /// Moves to the next frame, wrapping around at the end.
    pub fn advance(&mut self) {
        self.index = (self.index + 1) % self.frames.len();
    }
}

/// Fixed-period tick deadline. Each tick is rescheduled relative to the
/// moment it actually ran, so a late tick never triggers a burst.
#[derive(Debug, Clone)]
pub struct TickClock {
    period: Duration,
    next: Instant,
}

impl TickClock {
    pub fn start(period: Duration, now: Instant) -> Self {
        Self {
            period,
            next: now + period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn deadline(&self) -> Instant {
        self.next
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.next
    }

    pub fn reschedule(&mut self, now: Instant) {
        self.next = now + self.period;
    }
}

/// Drives every registered animation from one tick source. Still thumbnails
/// are shown once by the caller and never registered here.
#[derive(Debug, Default)]
pub struct AnimationScheduler {
    animations: Vec<AnimationState>,
    ticks: u64,
}

impl AnimationScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.animations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.animations.is_empty()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Adds an animation and shows its first frame right away.
    pub fn register<S>(&mut self, state: AnimationState, surface: &mut S)
    where
        S: ThumbnailSurface + ?Sized,
    {
        surface.show(state.tile(), state.current());
        tracing::debug!(key = %state.tile().key, frames = state.frame_count(), "registered animation");
        self.animations.push(state);
    }

    /// Advances every animation by one frame and pushes the new frames.
    pub fn tick<S>(&mut self, surface: &mut S)
    where
        S: ThumbnailSurface + ?Sized,
    {
        self.ticks += 1;
        for state in &mut self.animations {
            state.advance();
            surface.show(&state.tile, state.current());
        }
    }

    pub fn frame_index(&self, key: &str) -> Option<usize> {
        self.animations
            .iter()
            .find(|state| state.tile.key == key)
            .map(AnimationState::index)
    }
}
