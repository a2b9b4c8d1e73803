//! Body landmarks as produced by the pose detector, and the static bone
//! catalogs the layers measure distances against.

mod slot;
mod source;

use std::{fmt, path::Path, str::FromStr};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::{math::distance_to_segment, Result, SketchError};

pub use slot::{Detector, DetectorHandle, LatestSkeleton};
pub use source::{NoPose, PoseSource, RecordedPoses, SyntheticDancer};

/// The 17 COCO body landmarks, in detector order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyPart {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

pub const BODY_PART_COUNT: usize = 17;

impl BodyPart {
    pub const ALL: [BodyPart; BODY_PART_COUNT] = [
        BodyPart::Nose,
        BodyPart::LeftEye,
        BodyPart::RightEye,
        BodyPart::LeftEar,
        BodyPart::RightEar,
        BodyPart::LeftShoulder,
        BodyPart::RightShoulder,
        BodyPart::LeftElbow,
        BodyPart::RightElbow,
        BodyPart::LeftWrist,
        BodyPart::RightWrist,
        BodyPart::LeftHip,
        BodyPart::RightHip,
        BodyPart::LeftKnee,
        BodyPart::RightKnee,
        BodyPart::LeftAnkle,
        BodyPart::RightAnkle,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            BodyPart::Nose => "nose",
            BodyPart::LeftEye => "left_eye",
            BodyPart::RightEye => "right_eye",
            BodyPart::LeftEar => "left_ear",
            BodyPart::RightEar => "right_ear",
            BodyPart::LeftShoulder => "left_shoulder",
            BodyPart::RightShoulder => "right_shoulder",
            BodyPart::LeftElbow => "left_elbow",
            BodyPart::RightElbow => "right_elbow",
            BodyPart::LeftWrist => "left_wrist",
            BodyPart::RightWrist => "right_wrist",
            BodyPart::LeftHip => "left_hip",
            BodyPart::RightHip => "right_hip",
            BodyPart::LeftKnee => "left_knee",
            BodyPart::RightKnee => "right_knee",
            BodyPart::LeftAnkle => "left_ankle",
            BodyPart::RightAnkle => "right_ankle",
        }
    }

    pub fn is_wrist(self) -> bool {
        matches!(self, BodyPart::LeftWrist | BodyPart::RightWrist)
    }

    pub fn is_hand(self) -> bool {
        matches!(
            self,
            BodyPart::LeftWrist | BodyPart::RightWrist | BodyPart::LeftElbow | BodyPart::RightElbow
        )
    }

    pub fn is_head(self) -> bool {
        matches!(self, BodyPart::Nose | BodyPart::LeftEye | BodyPart::RightEye)
    }
}

impl fmt::Display for BodyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BodyPart {
    type Err = SketchError;

    fn from_str(s: &str) -> Result<Self> {
        BodyPart::ALL
            .into_iter()
            .find(|part| part.name() == s)
            .ok_or_else(|| SketchError::UnknownBodyPart(s.to_string()))
    }
}

/// A named, confidence-scored landmark in frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub part: BodyPart,
    pub position: Vec2,
    pub confidence: f32,
}

impl Keypoint {
    pub fn new(part: BodyPart, x: f32, y: f32, confidence: f32) -> Self {
        Self {
            part,
            position: Vec2::new(x, y),
            confidence,
        }
    }
}

/// A skeletal segment between two landmarks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bone {
    pub a: BodyPart,
    pub b: BodyPart,
}

const fn bone(a: BodyPart, b: BodyPart) -> Bone {
    Bone { a, b }
}

/// Full connection catalog: face, shoulders, arms, torso and legs.
pub const BONES: [Bone; 16] = [
    bone(BodyPart::Nose, BodyPart::LeftEye),
    bone(BodyPart::Nose, BodyPart::RightEye),
    bone(BodyPart::LeftEye, BodyPart::LeftEar),
    bone(BodyPart::RightEye, BodyPart::RightEar),
    bone(BodyPart::LeftShoulder, BodyPart::RightShoulder),
    bone(BodyPart::LeftShoulder, BodyPart::LeftElbow),
    bone(BodyPart::LeftElbow, BodyPart::LeftWrist),
    bone(BodyPart::RightShoulder, BodyPart::RightElbow),
    bone(BodyPart::RightElbow, BodyPart::RightWrist),
    bone(BodyPart::LeftShoulder, BodyPart::LeftHip),
    bone(BodyPart::RightShoulder, BodyPart::RightHip),
    bone(BodyPart::LeftHip, BodyPart::RightHip),
    bone(BodyPart::LeftHip, BodyPart::LeftKnee),
    bone(BodyPart::LeftKnee, BodyPart::LeftAnkle),
    bone(BodyPart::RightHip, BodyPart::RightKnee),
    bone(BodyPart::RightKnee, BodyPart::RightAnkle),
];

/// Limbs and girdles only, without the face.
pub const LIMB_BONES: [Bone; 10] = [
    bone(BodyPart::LeftShoulder, BodyPart::RightShoulder),
    bone(BodyPart::LeftShoulder, BodyPart::LeftElbow),
    bone(BodyPart::LeftElbow, BodyPart::LeftWrist),
    bone(BodyPart::RightShoulder, BodyPart::RightElbow),
    bone(BodyPart::RightElbow, BodyPart::RightWrist),
    bone(BodyPart::LeftHip, BodyPart::RightHip),
    bone(BodyPart::LeftHip, BodyPart::LeftKnee),
    bone(BodyPart::LeftKnee, BodyPart::LeftAnkle),
    bone(BodyPart::RightHip, BodyPart::RightKnee),
    bone(BodyPart::RightKnee, BodyPart::RightAnkle),
];

/// Landmarks that can knock a portal loose.
pub const STRIKING_PARTS: [BodyPart; 9] = [
    BodyPart::LeftWrist,
    BodyPart::RightWrist,
    BodyPart::LeftAnkle,
    BodyPart::RightAnkle,
    BodyPart::LeftElbow,
    BodyPart::RightElbow,
    BodyPart::LeftKnee,
    BodyPart::RightKnee,
    BodyPart::Nose,
];

/// Keypoints of one detected body, indexed by [`BodyPart`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Skeleton {
    keypoints: [Option<Keypoint>; BODY_PART_COUNT],
}

impl Skeleton {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_keypoints(keypoints: impl IntoIterator<Item = Keypoint>) -> Self {
        let mut skeleton = Self::new();
        for keypoint in keypoints {
            skeleton.insert(keypoint);
        }
        skeleton
    }

    /// Takes the first detected body; additional bodies are ignored.
    pub fn from_poses(poses: &[Pose]) -> Option<Self> {
        poses.first().map(Pose::to_skeleton)
    }

    pub fn insert(&mut self, keypoint: Keypoint) {
        self.keypoints[keypoint.part.index()] = Some(keypoint);
    }

    pub fn get(&self, part: BodyPart) -> Option<&Keypoint> {
        self.keypoints[part.index()].as_ref()
    }

    pub fn len(&self) -> usize {
        self.keypoints.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn keypoints(&self) -> impl Iterator<Item = &Keypoint> {
        self.keypoints.iter().flatten()
    }

    /// Position of `part` when its confidence is strictly above `threshold`.
    pub fn confident(&self, part: BodyPart, threshold: f32) -> Option<Vec2> {
        self.get(part)
            .filter(|kp| kp.confidence > threshold)
            .map(|kp| kp.position)
    }

    pub fn confident_keypoints(&self, threshold: f32) -> impl Iterator<Item = &Keypoint> {
        self.keypoints().filter(move |kp| kp.confidence > threshold)
    }

    /// Endpoints of `bone` when both are confidently detected.
    pub fn segment(&self, bone: &Bone, threshold: f32) -> Option<(Vec2, Vec2)> {
        Some((
            self.confident(bone.a, threshold)?,
            self.confident(bone.b, threshold)?,
        ))
    }

    pub fn segments<'a>(
        &'a self,
        bones: &'a [Bone],
        threshold: f32,
    ) -> impl Iterator<Item = (Vec2, Vec2)> + 'a {
        bones
            .iter()
            .filter_map(move |bone| self.segment(bone, threshold))
    }

    /// Nearest confident keypoint to `point`, with its distance.
    pub fn nearest_keypoint(&self, point: Vec2, threshold: f32) -> Option<(Vec2, f32)> {
        self.confident_keypoints(threshold)
            .map(|kp| (kp.position, kp.position.distance(point)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Distance from `point` to the nearest confident keypoint or bone.
    pub fn nearest_feature_distance(
        &self,
        point: Vec2,
        bones: &[Bone],
        threshold: f32,
    ) -> Option<f32> {
        let keypoints = self
            .confident_keypoints(threshold)
            .map(|kp| kp.position.distance(point));
        let segments = self
            .segments(bones, threshold)
            .map(|(a, b)| distance_to_segment(point, a, b));
        keypoints.chain(segments).min_by(f32::total_cmp)
    }

    /// Flips the skeleton horizontally to match a mirrored display.
    pub fn mirrored(&self, width: f32) -> Self {
        let mut mirrored = self.clone();
        for keypoint in mirrored.keypoints.iter_mut().flatten() {
            keypoint.position.x = width - keypoint.position.x;
        }
        mirrored
    }
}

/// Detector output for one body, as serialised in pose recordings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub keypoints: Vec<PoseKeypoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseKeypoint {
    pub name: BodyPart,
    pub x: f32,
    pub y: f32,
    pub confidence: f32,
}

impl Pose {
    pub fn to_skeleton(&self) -> Skeleton {
        Skeleton::from_keypoints(
            self.keypoints
                .iter()
                .map(|kp| Keypoint::new(kp.name, kp.x, kp.y, kp.confidence)),
        )
    }
}

impl From<&Skeleton> for Pose {
    fn from(skeleton: &Skeleton) -> Self {
        Self {
            keypoints: skeleton
                .keypoints()
                .map(|kp| PoseKeypoint {
                    name: kp.part,
                    x: kp.position.x,
                    y: kp.position.y,
                    confidence: kp.confidence,
                })
                .collect(),
        }
    }
}

/// A captured detector session: every frame holds zero or more poses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoseRecording {
    pub width: f32,
    pub height: f32,
    pub frames: Vec<Vec<Pose>>,
}

impl PoseRecording {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}
