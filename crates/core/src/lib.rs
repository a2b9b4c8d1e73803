//! Core library for posefield, a family of pose-reactive generative sketches.
//!
//! A detector publishes skeletons into a latest-value slot; each frame a
//! [`Sketch`] takes one snapshot, mirrors it into display space and hands it
//! to its layers (particle swarms steered by a force field, a drifting point
//! graph, a video mosaic, portals, painting) and to an optional audio
//! reactor. Drawing goes through the [`Canvas`] trait and sound through the
//! [`AudioSink`] trait, so the whole simulation runs headless.

pub mod audio;
pub mod config;
pub mod error;
pub mod field;
pub mod layers;
pub mod mapping;
pub mod math;
pub mod particles;
pub mod pose;
pub mod record;
pub mod render;
pub mod scene;
pub mod timeline;
pub mod video;

pub use audio::{AudioCommand, AudioGate, AudioReactor, AudioSink, CommandLog, Flavour};
pub use config::{AppConfig, AudioConfig};
pub use error::{Result, SketchError};
pub use field::{BoneOrbit, ForceField, KeypointRepel};
pub use layers::{FrameInput, Layer};
pub use mapping::{MappingRange, MotionTracker, PoseFeatures};
pub use math::Bounds;
pub use particles::{Particle, ParticleSystem};
pub use pose::{
    BodyPart, Detector, DetectorHandle, Keypoint, LatestSkeleton, PoseRecording, PoseSource,
    Skeleton,
};
pub use record::{Recorder, RecordingSettings};
pub use render::{Canvas, Color, DrawCommand, DrawList, Raster};
pub use scene::{SceneKind, Sketch};
pub use timeline::{Countdown, FrameClock, RandomCountdown};
pub use video::VideoFrame;
