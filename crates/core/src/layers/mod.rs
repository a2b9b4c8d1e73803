//! Independent visual generators. Each owns its private state and reads the
//! same per-tick skeleton snapshot; no layer looks at another's state.

pub mod constellation;
pub mod mosaic;
pub mod painting;
pub mod portals;
pub mod skeleton;

use rand::rngs::SmallRng;

use crate::{math::Bounds, pose::Skeleton, render::Canvas, video::VideoFrame};

pub use constellation::{Constellation, FieldPoint};
pub use mosaic::{Mosaic, MosaicCell};
pub use painting::Painting;
pub use portals::{Portal, PortalField, PortalState};
pub use skeleton::SkeletonOverlay;

/// Everything a layer may read during one tick.
#[derive(Debug, Clone, Copy)]
pub struct FrameInput<'a> {
    /// Display-space skeleton snapshot for this tick (already mirrored).
    pub skeleton: Option<&'a Skeleton>,
    pub video: Option<&'a VideoFrame>,
    pub bounds: Bounds,
    pub frame: u64,
}

impl<'a> FrameInput<'a> {
    pub fn new(bounds: Bounds, frame: u64) -> Self {
        Self {
            skeleton: None,
            video: None,
            bounds,
            frame,
        }
    }

    pub fn with_skeleton(mut self, skeleton: Option<&'a Skeleton>) -> Self {
        self.skeleton = skeleton;
        self
    }

    pub fn with_video(mut self, video: Option<&'a VideoFrame>) -> Self {
        self.video = video;
        self
    }
}

pub trait Layer: Send {
    fn name(&self) -> &'static str;

    /// Advances the layer's private state by one frame.
    fn update(&mut self, input: &FrameInput<'_>, rng: &mut SmallRng);

    fn draw(&self, input: &FrameInput<'_>, canvas: &mut dyn Canvas);

    /// Rebinds the layer to a new frame size.
    fn resize(&mut self, _bounds: Bounds, _rng: &mut SmallRng) {}
}
