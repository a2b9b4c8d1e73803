use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::{
    math::remap_clamped,
    pose::{BodyPart, Skeleton, BODY_PART_COUNT},
};

/// Clamped linear route from a pose feature range to a parameter range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MappingRange {
    pub input: [f32; 2],
    pub output: [f32; 2],
}

impl MappingRange {
    pub const fn new(input: [f32; 2], output: [f32; 2]) -> Self {
        Self { input, output }
    }

    pub fn apply(&self, value: f32) -> f32 {
        remap_clamped(
            value,
            self.input[0],
            self.input[1],
            self.output[0],
            self.output[1],
        )
    }
}

/// Remembers where each landmark was last seen so per-frame movement speed
/// can be measured.
#[derive(Debug, Clone)]
pub struct MotionTracker {
    previous: [Option<Vec2>; BODY_PART_COUNT],
    threshold: f32,
}

impl MotionTracker {
    pub fn new(threshold: f32) -> Self {
        Self {
            previous: [None; BODY_PART_COUNT],
            threshold,
        }
    }

    /// Mean displacement since the previous frame over confident landmarks.
    ///
    /// Landmarks seen for the first time contribute nothing this frame but
    /// are remembered for the next. Returns `None` when nothing contributed.
    pub fn update(&mut self, skeleton: &Skeleton) -> Option<f32> {
        let mut total = 0.0;
        let mut count = 0;

        for keypoint in skeleton.confident_keypoints(self.threshold) {
            let slot = &mut self.previous[keypoint.part.index()];
            if let Some(previous) = *slot {
                total += previous.distance(keypoint.position);
                count += 1;
            }
            *slot = Some(keypoint.position);
        }

        (count > 0).then(|| total / count as f32)
    }

    pub fn previous(&self, part: BodyPart) -> Option<Vec2> {
        self.previous[part.index()]
    }
}

/// Skeleton geometry the audio mappings are driven by, computed once per
/// frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PoseFeatures {
    /// Mean landmark displacement in units per frame.
    pub movement: Option<f32>,
    pub hand_distance: Option<f32>,
    /// Mean wrist height as a fraction of the frame height (0 = top).
    pub hand_height: Option<f32>,
    /// Mean landmark height as a fraction of the frame height (0 = top).
    pub body_height: Option<f32>,
    /// Elbow-to-elbow distance over shoulder-to-shoulder distance.
    pub spread_ratio: Option<f32>,
}

impl PoseFeatures {
    pub fn measure(
        skeleton: &Skeleton,
        threshold: f32,
        frame_height: f32,
        movement: Option<f32>,
    ) -> Self {
        let height = frame_height.max(f32::EPSILON);
        let wrists = skeleton
            .confident(BodyPart::LeftWrist, threshold)
            .zip(skeleton.confident(BodyPart::RightWrist, threshold));

        let (sum_y, count) = skeleton
            .confident_keypoints(threshold)
            .fold((0.0, 0), |(sum, n), kp| (sum + kp.position.y, n + 1));

        let spread_ratio = (|| {
            let shoulders = skeleton
                .confident(BodyPart::LeftShoulder, threshold)?
                .distance(skeleton.confident(BodyPart::RightShoulder, threshold)?);
            let elbows = skeleton
                .confident(BodyPart::LeftElbow, threshold)?
                .distance(skeleton.confident(BodyPart::RightElbow, threshold)?);
            (shoulders > 0.0).then(|| elbows / shoulders)
        })();

        Self {
            movement,
            hand_distance: wrists.map(|(l, r)| l.distance(r)),
            hand_height: wrists.map(|(l, r)| (l.y + r.y) * 0.5 / height),
            body_height: (count > 0).then(|| sum_y / count as f32 / height),
            spread_ratio,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::Keypoint;

    fn body(offset: f32) -> Skeleton {
        Skeleton::from_keypoints([
            Keypoint::new(BodyPart::LeftShoulder, 100.0 + offset, 100.0, 0.9),
            Keypoint::new(BodyPart::RightShoulder, 200.0 + offset, 100.0, 0.9),
            Keypoint::new(BodyPart::LeftElbow, 50.0 + offset, 150.0, 0.9),
            Keypoint::new(BodyPart::RightElbow, 250.0 + offset, 150.0, 0.9),
            Keypoint::new(BodyPart::LeftWrist, 0.0 + offset, 200.0, 0.9),
            Keypoint::new(BodyPart::RightWrist, 300.0 + offset, 200.0, 0.1),
        ])
    }

    #[test]
    fn movement_skips_first_sighting() {
        let mut tracker = MotionTracker::new(0.3);
        assert_eq!(tracker.update(&body(0.0)), None);
        let speed = tracker.update(&body(3.0)).unwrap();
        assert!((speed - 3.0).abs() < 1e-5);
        // The unconfident wrist is never tracked.
        assert!(tracker.previous(BodyPart::RightWrist).is_none());
    }

    #[test]
    fn newly_seen_landmark_joins_next_frame() {
        let mut tracker = MotionTracker::new(0.3);
        tracker.update(&body(0.0));
        let mut next = body(2.0);
        next.insert(Keypoint::new(BodyPart::Nose, 500.0, 500.0, 0.9));
        let speed = tracker.update(&next).unwrap();
        assert!((speed - 2.0).abs() < 1e-5);
        assert_eq!(tracker.previous(BodyPart::Nose), Some(Vec2::new(500.0, 500.0)));
    }

    #[test]
    fn features_require_both_hands() {
        let features = PoseFeatures::measure(&body(0.0), 0.3, 400.0, None);
        assert_eq!(features.hand_distance, None);
        assert!((features.spread_ratio.unwrap() - 2.0).abs() < 1e-5);

        let mut both = body(0.0);
        both.insert(Keypoint::new(BodyPart::RightWrist, 300.0, 200.0, 0.9));
        let features = PoseFeatures::measure(&both, 0.3, 400.0, Some(1.0));
        assert_eq!(features.hand_distance, Some(300.0));
        assert_eq!(features.hand_height, Some(0.5));
    }

    #[test]
    fn ranges_clamp_both_directions() {
        let tempo = MappingRange::new([0.0, 30.0], [60.0, 180.0]);
        assert_eq!(tempo.apply(-4.0), 60.0);
        assert_eq!(tempo.apply(15.0), 120.0);
        assert_eq!(tempo.apply(90.0), 180.0);
        let degree = MappingRange::new([0.0, 1.0], [7.0, 0.0]);
        assert_eq!(degree.apply(2.0), 0.0);
    }
}
