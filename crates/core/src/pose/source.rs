use std::f32::consts::TAU;

use glam::Vec2;

use super::{BodyPart, Keypoint, PoseRecording, Skeleton};
use crate::math::Bounds;

/// Anything that yields body detections, one batch per call.
///
/// `None` means the source is exhausted; an empty batch means nobody is in
/// view this cycle.
pub trait PoseSource: Send {
    fn detect(&mut self) -> Option<Vec<Skeleton>>;
}

impl<S: PoseSource + ?Sized> PoseSource for Box<S> {
    fn detect(&mut self) -> Option<Vec<Skeleton>> {
        (**self).detect()
    }
}

/// Stands in for a camera that never produced a frame (permission denied,
/// model failed to load). Every cycle reports nobody in view.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPose;

impl PoseSource for NoPose {
    fn detect(&mut self) -> Option<Vec<Skeleton>> {
        Some(Vec::new())
    }
}

/// Replays a [`PoseRecording`], rescaled into the target frame.
#[derive(Debug, Clone)]
pub struct RecordedPoses {
    frames: Vec<Vec<Skeleton>>,
    cursor: usize,
    looping: bool,
}

impl RecordedPoses {
    pub fn new(recording: &PoseRecording, target: Bounds, looping: bool) -> Self {
        let scale = if recording.width > 0.0 && recording.height > 0.0 {
            Vec2::new(
                target.width / recording.width,
                target.height / recording.height,
            )
        } else {
            Vec2::ONE
        };

        let frames = recording
            .frames
            .iter()
            .map(|poses| {
                poses
                    .iter()
                    .map(|pose| {
                        Skeleton::from_keypoints(pose.to_skeleton().keypoints().map(|kp| {
                            Keypoint {
                                position: kp.position * scale,
                                ..*kp
                            }
                        }))
                    })
                    .collect()
            })
            .collect();

        Self {
            frames,
            cursor: 0,
            looping,
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl PoseSource for RecordedPoses {
    fn detect(&mut self) -> Option<Vec<Skeleton>> {
        if self.cursor >= self.frames.len() {
            if !self.looping || self.frames.is_empty() {
                return None;
            }
            self.cursor = 0;
        }
        let batch = self.frames[self.cursor].clone();
        self.cursor += 1;
        Some(batch)
    }
}

/// Procedural dancer: a figure centred in the frame that sways, waves both
/// arms out of phase and steps in place. Fully determined by its frame count.
#[derive(Debug, Clone)]
pub struct SyntheticDancer {
    bounds: Bounds,
    frame: u64,
    fps: f32,
    confidence: f32,
}

impl SyntheticDancer {
    pub fn new(bounds: Bounds, fps: f32) -> Self {
        Self {
            bounds,
            frame: 0,
            fps: fps.max(1.0),
            confidence: 0.9,
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    /// Skeleton at an arbitrary time, in seconds.
    pub fn pose_at(&self, seconds: f32) -> Skeleton {
        let h = self.bounds.height;
        let w = self.bounds.width;
        let sway = (seconds * TAU * 0.25).sin() * w * 0.06;
        let center = Vec2::new(w * 0.5 + sway, h * 0.5);
        let unit = h * 0.1;

        let left_wave = (seconds * TAU * 0.5).sin();
        let right_wave = (seconds * TAU * 0.5 + TAU * 0.5).sin();
        let step = (seconds * TAU * 0.75).sin() * unit * 0.3;

        let at = |dx: f32, dy: f32| center + Vec2::new(dx * unit, dy * unit);
        let points = [
            (BodyPart::Nose, at(0.0, -3.2)),
            (BodyPart::LeftEye, at(-0.25, -3.4)),
            (BodyPart::RightEye, at(0.25, -3.4)),
            (BodyPart::LeftEar, at(-0.5, -3.3)),
            (BodyPart::RightEar, at(0.5, -3.3)),
            (BodyPart::LeftShoulder, at(-1.0, -2.2)),
            (BodyPart::RightShoulder, at(1.0, -2.2)),
            (BodyPart::LeftElbow, at(-1.8, -1.6 - left_wave * 1.2)),
            (BodyPart::RightElbow, at(1.8, -1.6 - right_wave * 1.2)),
            (BodyPart::LeftWrist, at(-2.4, -1.0 - left_wave * 2.4)),
            (BodyPart::RightWrist, at(2.4, -1.0 - right_wave * 2.4)),
            (BodyPart::LeftHip, at(-0.7, 0.4)),
            (BodyPart::RightHip, at(0.7, 0.4)),
            (BodyPart::LeftKnee, at(-0.8, 1.8) + Vec2::new(0.0, -step.max(0.0))),
            (BodyPart::RightKnee, at(0.8, 1.8) + Vec2::new(0.0, step.min(0.0))),
            (BodyPart::LeftAnkle, at(-0.85, 3.2) + Vec2::new(0.0, -step.max(0.0))),
            (BodyPart::RightAnkle, at(0.85, 3.2) + Vec2::new(0.0, step.min(0.0))),
        ];

        Skeleton::from_keypoints(
            points
                .into_iter()
                .map(|(part, p)| Keypoint::new(part, p.x, p.y, self.confidence)),
        )
    }
}

impl PoseSource for SyntheticDancer {
    fn detect(&mut self) -> Option<Vec<Skeleton>> {
        let seconds = self.frame as f32 / self.fps;
        self.frame += 1;
        Some(vec![self.pose_at(seconds)])
    }
}
