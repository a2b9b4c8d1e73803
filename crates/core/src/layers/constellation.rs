//! Drifting point graph: noise-steered nodes drawn toward the body, linked
//! into edges and triangles by proximity.

use glam::Vec2;
use rand::{rngs::SmallRng, Rng};

use super::{FrameInput, Layer};
use crate::{
    config::ConstellationConfig,
    math::{limit, remap, Bounds, Noise},
    render::{Canvas, Color},
};

#[derive(Debug, Clone, PartialEq)]
pub struct FieldPoint {
    pub position: Vec2,
    pub velocity: Vec2,
    /// Independent noise phases for the x and y steering terms.
    pub noise_offset: Vec2,
    pub noise_speed: f32,
    pub hue: f32,
}

#[derive(Debug, Clone)]
pub struct Constellation {
    config: ConstellationConfig,
    points: Vec<FieldPoint>,
    noise: Noise,
}

impl Constellation {
    pub fn new(config: ConstellationConfig, bounds: Bounds, rng: &mut SmallRng) -> Self {
        let speed = config.initial_speed;
        let points = (0..config.points)
            .map(|_| FieldPoint {
                position: bounds.random_point(rng),
                velocity: crate::math::jitter(rng, speed),
                noise_offset: Vec2::new(rng.gen_range(0.0..1000.0), rng.gen_range(0.0..1000.0)),
                noise_speed: if config.max_noise_speed > config.min_noise_speed {
                    rng.gen_range(config.min_noise_speed..config.max_noise_speed)
                } else {
                    config.min_noise_speed
                },
                hue: rng.gen_range(0.0..360.0),
            })
            .collect();
        let noise = Noise::new(rng);
        Self {
            config,
            points,
            noise,
        }
    }

    pub fn points(&self) -> &[FieldPoint] {
        &self.points
    }

    pub fn points_mut(&mut self) -> &mut [FieldPoint] {
        &mut self.points
    }

    /// Pairs closer than the link distance, with their distance.
    pub fn edges(&self) -> Vec<(usize, usize, f32)> {
        let link = self.config.link_distance;
        let mut edges = Vec::new();
        for (i, a) in self.points.iter().enumerate() {
            for (j, b) in self.points.iter().enumerate().skip(i + 1) {
                let d = a.position.distance(b.position);
                if d < link {
                    edges.push((i, j, d));
                }
            }
        }
        edges
    }

    /// Triples whose three sides are all shorter than the link distance.
    /// Cubic in the point count; fine for a few dozen points.
    pub fn triangles(&self) -> Vec<[usize; 3]> {
        let link = self.config.link_distance;
        let close = |i: usize, j: usize| {
            self.points[i].position.distance(self.points[j].position) < link
        };
        let n = self.points.len();
        let mut triangles = Vec::new();
        for i in 0..n {
            for j in i + 1..n {
                if !close(i, j) {
                    continue;
                }
                for k in j + 1..n {
                    if close(j, k) && close(i, k) {
                        triangles.push([i, j, k]);
                    }
                }
            }
        }
        triangles
    }

    fn step_point(
        point: &mut FieldPoint,
        config: &ConstellationConfig,
        noise: &Noise,
        input: &FrameInput<'_>,
    ) {
        let steer = Vec2::new(
            noise.signed(point.noise_offset.x),
            noise.signed(point.noise_offset.y),
        );
        point.velocity += steer * config.noise_gain;
        point.noise_offset += Vec2::splat(point.noise_speed);

        let nearest = input
            .skeleton
            .and_then(|s| s.nearest_keypoint(point.position, config.confidence));
        if let Some((target, distance)) = nearest {
            if distance < config.attraction_range {
                let strength = remap(
                    distance,
                    0.0,
                    config.attraction_range,
                    config.near_attraction,
                    config.far_attraction,
                );
                point.velocity += (target - point.position).normalize_or_zero() * strength;
            }
        }

        point.velocity = limit(point.velocity * config.damping, config.max_speed);

        let bounds = input.bounds;
        point.position += point.velocity;
        if point.position.x < 0.0 || point.position.x > bounds.width {
            point.velocity.x = -point.velocity.x;
        }
        if point.position.y < 0.0 || point.position.y > bounds.height {
            point.velocity.y = -point.velocity.y;
        }
        point.position = bounds.clamp(point.position);
    }
}

impl Layer for Constellation {
    fn name(&self) -> &'static str {
        "constellation"
    }

    fn update(&mut self, input: &FrameInput<'_>, _rng: &mut SmallRng) {
        for point in &mut self.points {
            Self::step_point(point, &self.config, &self.noise, input);
        }
    }

    fn draw(&self, input: &FrameInput<'_>, canvas: &mut dyn Canvas) {
        let config = &self.config;

        for [i, j, k] in self.triangles() {
            canvas.fill_triangle(
                self.points[i].position,
                self.points[j].position,
                self.points[k].position,
                Color::rgba(255, 255, 255, 15),
            );
        }

        for (i, j, d) in self.edges() {
            let alpha = remap(d, 0.0, config.link_distance, 120.0, 10.0);
            canvas.line(
                self.points[i].position,
                self.points[j].position,
                2.0,
                Color::WHITE.with_alpha(alpha),
            );
        }

        for point in &self.points {
            canvas.fill_circle(point.position, 12.0, Color::hsba(point.hue, 12.0, 80.0, 255.0));
        }

        let Some(skeleton) = input.skeleton else {
            return;
        };
        for point in &self.points {
            for keypoint in skeleton.confident_keypoints(config.tether_confidence) {
                let d = point.position.distance(keypoint.position);
                if d < config.tether_range {
                    let alpha = remap(d, 0.0, config.tether_range, 150.0, 10.0);
                    canvas.line(
                        point.position,
                        keypoint.position,
                        2.0,
                        Color::WHITE.with_alpha(alpha),
                    );
                }
            }
        }
    }

    fn resize(&mut self, bounds: Bounds, _rng: &mut SmallRng) {
        for point in &mut self.points {
            point.position = bounds.clamp(point.position);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        pose::{BodyPart, Keypoint, Skeleton},
        render::{DrawCommand, DrawList},
    };
    use rand::SeedableRng;

    fn layer_with(positions: &[Vec2]) -> Constellation {
        let mut rng = SmallRng::seed_from_u64(8);
        let config = ConstellationConfig {
            points: positions.len(),
            ..Default::default()
        };
        let mut layer = Constellation::new(config, Bounds::new(1000.0, 1000.0), &mut rng);
        for (point, position) in layer.points_mut().iter_mut().zip(positions) {
            point.position = *position;
        }
        layer
    }

    #[test]
    fn speed_never_exceeds_clamp() {
        let bounds = Bounds::new(400.0, 300.0);
        let mut rng = SmallRng::seed_from_u64(21);
        let mut layer = Constellation::new(ConstellationConfig::default(), bounds, &mut rng);
        for point in layer.points_mut() {
            point.velocity = Vec2::new(500.0, -900.0);
        }
        let skeleton = Skeleton::from_keypoints([Keypoint::new(BodyPart::Nose, 200.0, 150.0, 0.9)]);
        for frame in 0..200 {
            let input = FrameInput::new(bounds, frame).with_skeleton(Some(&skeleton));
            layer.update(&input, &mut rng);
            for point in layer.points() {
                assert!(point.velocity.length() <= 3.0 + 1e-4);
                assert!(bounds.contains(point.position));
            }
        }
    }

    #[test]
    fn reflects_at_edges() {
        let bounds = Bounds::new(100.0, 100.0);
        let mut layer = layer_with(&[Vec2::new(99.0, 50.0)]);
        layer.config.noise_gain = 0.0;
        layer.points_mut()[0].velocity = Vec2::new(2.0, 0.0);
        layer.update(&FrameInput::new(bounds, 0), &mut SmallRng::seed_from_u64(0));
        let point = &layer.points()[0];
        assert!(point.velocity.x < 0.0);
        assert_eq!(point.position.x, 100.0);
    }

    #[test]
    fn graph_links_only_close_points() {
        let layer = layer_with(&[
            Vec2::new(0.0, 0.0),
            Vec2::new(100.0, 0.0),
            Vec2::new(0.0, 100.0),
            Vec2::new(900.0, 900.0),
        ]);
        let edges = layer.edges();
        assert_eq!(edges.len(), 3);
        assert_eq!(layer.triangles(), vec![[0, 1, 2]]);
    }

    #[test]
    fn tethers_reach_nearby_keypoints() {
        let layer = layer_with(&[Vec2::new(0.0, 0.0), Vec2::new(900.0, 900.0)]);
        let skeleton = Skeleton::from_keypoints([
            Keypoint::new(BodyPart::RightWrist, 50.0, 0.0, 0.9),
            Keypoint::new(BodyPart::LeftWrist, 60.0, 0.0, 0.25),
        ]);
        let bounds = Bounds::new(1000.0, 1000.0);
        let input = FrameInput::new(bounds, 0).with_skeleton(Some(&skeleton));
        let mut list = DrawList::new(bounds);
        layer.draw(&input, &mut list);
        // No edges between the two nodes; one tether to the confident wrist.
        assert_eq!(list.count(|c| matches!(c, DrawCommand::Line { .. })), 1);
    }
}
