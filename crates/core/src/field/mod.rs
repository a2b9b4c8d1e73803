//! Steering fields: map a query position and the current skeleton to an
//! acceleration.

use glam::Vec2;

use crate::{
    config::{BoneOrbitConfig, KeypointRepelConfig},
    math::{closest_point_on_segment, jitter, remap},
    pose::{Skeleton, BONES},
};

/// Deterministic part of a field evaluation plus the size of the random
/// jitter to add on top.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Steering {
    pub force: Vec2,
    pub jitter: f32,
}

pub trait ForceField: Send + Sync {
    /// Pure function of position and skeleton.
    fn steering(&self, position: Vec2, skeleton: Option<&Skeleton>) -> Steering;

    fn acceleration(
        &self,
        position: Vec2,
        skeleton: Option<&Skeleton>,
        rng: &mut dyn rand::RngCore,
    ) -> Vec2 {
        let steering = self.steering(position, skeleton);
        steering.force + jitter(rng, steering.jitter)
    }
}

/// Keeps particles orbiting the skeleton at a set distance from the nearest
/// bone: pulled in from afar, pushed out when too close, always swirling
/// tangentially.
#[derive(Debug, Clone)]
pub struct BoneOrbit {
    config: BoneOrbitConfig,
}

impl BoneOrbit {
    pub fn new(config: BoneOrbitConfig) -> Self {
        Self { config }
    }

    /// Closest point on any confidently detected bone.
    pub fn closest_bone_point(&self, position: Vec2, skeleton: &Skeleton) -> Option<Vec2> {
        skeleton
            .segments(&BONES, self.config.confidence)
            .map(|(a, b)| closest_point_on_segment(position, a, b))
            .min_by(|p, q| {
                p.distance_squared(position)
                    .total_cmp(&q.distance_squared(position))
            })
    }
}

impl Default for BoneOrbit {
    fn default() -> Self {
        Self::new(BoneOrbitConfig::default())
    }
}

impl ForceField for BoneOrbit {
    fn steering(&self, position: Vec2, skeleton: Option<&Skeleton>) -> Steering {
        let config = &self.config;
        let Some(target) = skeleton.and_then(|s| self.closest_bone_point(position, s)) else {
            return Steering {
                force: Vec2::ZERO,
                jitter: config.idle_jitter,
            };
        };

        let toward = target - position;
        let distance = toward.length();
        let radial = if distance > config.target_distance + config.tolerance {
            toward.normalize_or_zero() * config.radial_strength
        } else if distance < config.target_distance - config.tolerance {
            toward.normalize_or_zero() * -config.radial_strength
        } else {
            Vec2::ZERO
        };

        let reference = if radial == Vec2::ZERO { toward } else { radial };
        let tangent = reference.perp().normalize_or_zero() * config.tangential_strength;

        Steering {
            force: radial + tangent,
            jitter: config.jitter,
        }
    }
}

/// Pushes particles away from every confident landmark in range, harder the
/// closer they are.
#[derive(Debug, Clone)]
pub struct KeypointRepel {
    config: KeypointRepelConfig,
}

impl KeypointRepel {
    pub fn new(config: KeypointRepelConfig) -> Self {
        Self { config }
    }
}

impl Default for KeypointRepel {
    fn default() -> Self {
        Self::new(KeypointRepelConfig::default())
    }
}

impl ForceField for KeypointRepel {
    fn steering(&self, position: Vec2, skeleton: Option<&Skeleton>) -> Steering {
        let config = &self.config;
        let force = skeleton
            .into_iter()
            .flat_map(|s| s.confident_keypoints(config.confidence))
            .filter_map(|kp| {
                let away = position - kp.position;
                let distance = away.length();
                (distance < config.radius).then(|| {
                    away.normalize_or_zero()
                        * remap(distance, 0.0, config.radius, config.strength, 0.0)
                })
            })
            .sum();

        Steering {
            force,
            jitter: config.jitter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{BodyPart, Keypoint};
    use rand::{rngs::SmallRng, SeedableRng};

    /// Horizontal forearm along y = 100 from x = 100 to x = 300.
    fn forearm() -> Skeleton {
        Skeleton::from_keypoints([
            Keypoint::new(BodyPart::LeftElbow, 100.0, 100.0, 0.9),
            Keypoint::new(BodyPart::LeftWrist, 300.0, 100.0, 0.9),
        ])
    }

    fn radial_component(force: Vec2, position: Vec2, target: Vec2) -> f32 {
        force.dot((target - position).normalize())
    }

    #[test]
    fn pulls_in_from_far_away() {
        let field = BoneOrbit::default();
        let position = Vec2::new(200.0, 300.0);
        let steering = field.steering(position, Some(&forearm()));
        let toward = radial_component(steering.force, position, Vec2::new(200.0, 100.0));
        assert!((toward - 0.5).abs() < 1e-5);
    }

    #[test]
    fn pushes_out_when_too_close() {
        let field = BoneOrbit::default();
        let position = Vec2::new(200.0, 110.0);
        let steering = field.steering(position, Some(&forearm()));
        let toward = radial_component(steering.force, position, Vec2::new(200.0, 100.0));
        assert!((toward + 0.5).abs() < 1e-5);
    }

    #[test]
    fn dead_band_is_purely_tangential() {
        let field = BoneOrbit::default();
        for offset in [21.0, 30.0, 39.0] {
            let position = Vec2::new(150.0, 100.0 + offset);
            let steering = field.steering(position, Some(&forearm()));
            let toward = radial_component(steering.force, position, Vec2::new(150.0, 100.0));
            assert!(toward.abs() < 1e-5);
            assert!((steering.force.length() - 0.3).abs() < 1e-5);
        }
    }

    #[test]
    fn tangent_is_perpendicular_to_radial_force() {
        let field = BoneOrbit::default();
        let position = Vec2::new(250.0, 400.0);
        let steering = field.steering(position, Some(&forearm()));
        let radial = Vec2::new(0.0, -0.5);
        let tangent = steering.force - radial;
        assert!(tangent.dot(radial).abs() < 1e-5);
        assert!((tangent.length() - 0.3).abs() < 1e-5);
    }

    #[test]
    fn absent_skeleton_is_jitter_only() {
        let field = BoneOrbit::default();
        let steering = field.steering(Vec2::new(5.0, 5.0), None);
        assert_eq!(steering.force, Vec2::ZERO);
        assert_eq!(steering.jitter, 0.2);

        let mut rng = SmallRng::seed_from_u64(1);
        for _ in 0..100 {
            let a = field.acceleration(Vec2::ZERO, None, &mut rng);
            assert!(a.x.abs() <= 0.2 && a.y.abs() <= 0.2);
        }
    }

    #[test]
    fn unconfident_bones_do_not_attract() {
        let field = BoneOrbit::default();
        let faint = Skeleton::from_keypoints([
            Keypoint::new(BodyPart::LeftElbow, 100.0, 100.0, 0.9),
            Keypoint::new(BodyPart::LeftWrist, 300.0, 100.0, 0.1),
        ]);
        let steering = field.steering(Vec2::new(200.0, 300.0), Some(&faint));
        assert_eq!(steering.force, Vec2::ZERO);
    }

    #[test]
    fn repel_falls_off_with_distance() {
        let field = KeypointRepel::default();
        let skeleton =
            Skeleton::from_keypoints([Keypoint::new(BodyPart::Nose, 0.0, 0.0, 0.9)]);
        let near = field.steering(Vec2::new(15.0, 0.0), Some(&skeleton)).force;
        let far = field.steering(Vec2::new(135.0, 0.0), Some(&skeleton)).force;
        let out = field.steering(Vec2::new(151.0, 0.0), Some(&skeleton)).force;
        assert!(near.x > far.x && far.x > 0.0);
        assert!((near.x - 0.9).abs() < 1e-5);
        assert_eq!(out, Vec2::ZERO);
    }
}
