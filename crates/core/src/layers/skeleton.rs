use rand::rngs::SmallRng;

use super::{FrameInput, Layer};
use crate::{
    pose::BONES,
    render::{Canvas, Color},
};

const GLOW_OUTER: Color = Color::rgba(255, 100, 200, 150);
const GLOW_INNER: Color = Color::rgba(255, 200, 255, 200);
const BONE: Color = Color::rgba(100, 255, 200, 200);

/// Glowing landmarks and bone lines drawn over the scene.
#[derive(Debug, Clone)]
pub struct SkeletonOverlay {
    confidence: f32,
}

impl SkeletonOverlay {
    pub fn new(confidence: f32) -> Self {
        Self { confidence }
    }
}

impl Layer for SkeletonOverlay {
    fn name(&self) -> &'static str {
        "skeleton"
    }

    fn update(&mut self, _input: &FrameInput<'_>, _rng: &mut SmallRng) {}

    fn draw(&self, input: &FrameInput<'_>, canvas: &mut dyn Canvas) {
        let Some(skeleton) = input.skeleton else {
            return;
        };
        for keypoint in skeleton.confident_keypoints(self.confidence) {
            canvas.fill_circle(keypoint.position, 20.0, GLOW_OUTER);
            canvas.fill_circle(keypoint.position, 10.0, GLOW_INNER);
        }
        for (a, b) in skeleton.segments(&BONES, self.confidence) {
            canvas.line(a, b, 3.0, BONE);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        math::Bounds,
        pose::{BodyPart, Keypoint, Skeleton},
        render::{DrawCommand, DrawList},
    };

    #[test]
    fn draws_only_confident_parts() {
        let skeleton = Skeleton::from_keypoints([
            Keypoint::new(BodyPart::LeftShoulder, 10.0, 10.0, 0.9),
            Keypoint::new(BodyPart::RightShoulder, 50.0, 10.0, 0.9),
            Keypoint::new(BodyPart::LeftElbow, 5.0, 40.0, 0.1),
        ]);
        let bounds = Bounds::new(100.0, 100.0);
        let input = FrameInput::new(bounds, 0).with_skeleton(Some(&skeleton));
        let mut list = DrawList::new(bounds);
        SkeletonOverlay::new(0.2).draw(&input, &mut list);

        assert_eq!(list.count(|c| matches!(c, DrawCommand::Circle { .. })), 4);
        assert_eq!(list.count(|c| matches!(c, DrawCommand::Line { .. })), 1);
    }
}
