//! Coarse video mosaic whose cells light up near the body.

use glam::Vec2;
use rand::{rngs::SmallRng, Rng};

use super::{FrameInput, Layer};
use crate::{
    config::MosaicConfig,
    math::{remap, Bounds},
    pose::BONES,
    render::{Canvas, Color},
    timeline::{Countdown, RandomCountdown},
};

#[derive(Debug, Clone, PartialEq)]
pub struct MosaicCell {
    /// Top-left corner in frame coordinates.
    pub origin: Vec2,
    pub size: f32,
    pub color: Color,
    pub alpha: f32,
    /// Colour refresh schedule. The random start offset only spreads the
    /// refreshes out when the interval is above one frame.
    pub refresh: Countdown,
    pub active: bool,
    pub toggle: Option<RandomCountdown>,
}

impl MosaicCell {
    pub fn center(&self) -> Vec2 {
        self.origin + Vec2::splat(self.size * 0.5)
    }
}

#[derive(Debug, Clone)]
pub struct Mosaic {
    config: MosaicConfig,
    cells: Vec<MosaicCell>,
}

impl Mosaic {
    pub fn new(config: MosaicConfig, bounds: Bounds, rng: &mut SmallRng) -> Self {
        let mut mosaic = Self {
            config,
            cells: Vec::new(),
        };
        mosaic.build_grid(bounds, rng);
        mosaic
    }

    pub fn cells(&self) -> &[MosaicCell] {
        &self.cells
    }

    /// Samples a random share of the regular grid.
    fn build_grid(&mut self, bounds: Bounds, rng: &mut SmallRng) {
        let config = &self.config;
        let size = config.cell_size;
        let columns = (bounds.width / size).ceil() as u32;
        let rows = (bounds.height / size).ceil() as u32;

        let mut cells = Vec::new();
        for column in 0..columns {
            for row in 0..rows {
                if rng.gen::<f32>() >= config.density {
                    continue;
                }
                let stagger = rng.gen_range(0..=config.stagger);
                cells.push(MosaicCell {
                    origin: Vec2::new(column as f32 * size, row as f32 * size),
                    size,
                    color: Color::BLACK,
                    alpha: config.far_alpha,
                    refresh: Countdown::staggered(config.refresh_interval, stagger),
                    active: true,
                    toggle: config.toggle.then(|| {
                        RandomCountdown::new(config.min_toggle_frames, config.max_toggle_frames, rng)
                    }),
                });
            }
        }
        tracing::debug!(cells = cells.len(), columns, rows, "mosaic grid built");
        self.cells = cells;
    }

    /// Opacity for a cell centre given the distance to the nearest body
    /// feature. Beyond the falloff distance the floor opacity applies.
    pub fn opacity_at(&self, distance: Option<f32>) -> f32 {
        let config = &self.config;
        match distance {
            Some(d) if d < config.falloff_distance => remap(
                d,
                0.0,
                config.falloff_distance,
                config.near_alpha,
                config.far_alpha,
            ),
            _ => config.far_alpha,
        }
    }
}

impl Layer for Mosaic {
    fn name(&self) -> &'static str {
        "mosaic"
    }

    fn update(&mut self, input: &FrameInput<'_>, rng: &mut SmallRng) {
        let confidence = self.config.confidence;
        let alphas: Vec<f32> = self
            .cells
            .iter()
            .map(|cell| {
                let distance = input
                    .skeleton
                    .and_then(|s| s.nearest_feature_distance(cell.origin, &BONES, confidence));
                self.opacity_at(distance)
            })
            .collect();

        for (cell, alpha) in self.cells.iter_mut().zip(alphas) {
            cell.alpha = alpha;
            if let Some(toggle) = cell.toggle.as_mut() {
                if toggle.tick(rng) {
                    cell.active = !cell.active;
                }
            }
            if cell.refresh.tick() {
                if let Some(video) = input.video {
                    cell.color = video.sample(cell.origin, input.bounds, true);
                }
            }
        }
    }

    fn draw(&self, _input: &FrameInput<'_>, canvas: &mut dyn Canvas) {
        for cell in self.cells.iter().filter(|cell| cell.active) {
            canvas.fill_rect(
                cell.origin,
                Vec2::splat(cell.size),
                cell.color.with_alpha(cell.alpha),
            );
        }
    }

    fn resize(&mut self, bounds: Bounds, rng: &mut SmallRng) {
        self.build_grid(bounds, rng);
    }
}
