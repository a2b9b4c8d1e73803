//! Pulsating portals that get knocked out of the frame by a strike.
//!
//! A portal is either idle (drifting, pulsing, bouncing off a soft margin) or
//! hit (flying along the strike direction under gravity until it leaves the
//! frame). Hit portals that have left are replaced by fresh idle ones; on top
//! of that a population timer randomly grows or shrinks the set.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::{rngs::SmallRng, Rng};

use super::{FrameInput, Layer};
use crate::{
    config::PortalConfig,
    math::Bounds,
    pose::{BodyPart, Skeleton, STRIKING_PARTS},
    render::{Canvas, Color},
    timeline::{Countdown, RandomCountdown},
};

const BOLT_SEGMENTS: usize = 8;
const BOLT_JAGGEDNESS: f32 = 18.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PortalState {
    Idle,
    /// Struck: flying with its own velocity, pulsing suspended.
    Hit { velocity: Vec2 },
}

/// A short-lived lightning arc from a portal to a hand.
#[derive(Debug, Clone, PartialEq)]
pub struct Bolt {
    pub points: Vec<Vec2>,
    pub frames_left: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Portal {
    pub position: Vec2,
    pub radius: f32,
    pub target_radius: f32,
    pub rotation: f32,
    pub angular_velocity: f32,
    pub hue: f32,
    pub target_hue: f32,
    pub layers: u32,
    pub drift: Vec2,
    pub state: PortalState,
    pub bolt: Option<Bolt>,
    pulse: RandomCountdown,
    lightning: RandomCountdown,
}

impl Portal {
    pub fn spawn(config: &PortalConfig, bounds: Bounds, rng: &mut SmallRng) -> Self {
        let target_radius = rng.gen_range(config.min_radius..=config.max_radius);
        let margin = Vec2::splat(target_radius.min(bounds.width * 0.5).min(bounds.height * 0.5));
        let span = (bounds.size() - margin * 2.0).max(Vec2::ZERO);
        let position = margin + Vec2::new(rng.gen::<f32>() * span.x, rng.gen::<f32>() * span.y);
        let heading = rng.gen_range(0.0..TAU);
        let speed = config.drift_speed * rng.gen_range(0.3..=1.0);
        let hue = rng.gen_range(0.0..360.0);

        Self {
            position,
            radius: target_radius * 0.2,
            target_radius,
            rotation: rng.gen_range(0.0..TAU),
            angular_velocity: rng.gen_range(-config.max_spin..=config.max_spin),
            hue,
            target_hue: hue,
            layers: rng.gen_range(config.min_layers..=config.max_layers.max(config.min_layers)),
            drift: Vec2::from_angle(heading) * speed,
            state: PortalState::Idle,
            bolt: None,
            pulse: RandomCountdown::new(config.min_pulse_frames, config.max_pulse_frames, rng),
            lightning: RandomCountdown::new(
                config.min_lightning_interval,
                config.max_lightning_interval,
                rng,
            ),
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self.state, PortalState::Hit { .. })
    }

    /// Checks the striking landmarks against the portal. Returns `true` only
    /// on the frame the portal becomes hit; an already hit portal is never
    /// struck again.
    pub fn strike(&mut self, skeleton: &Skeleton, config: &PortalConfig) -> bool {
        if self.is_hit() {
            return false;
        }
        let reach = config.hit_ratio * self.radius;
        let striker = STRIKING_PARTS
            .iter()
            .filter_map(|part| skeleton.get(*part))
            .filter(|kp| kp.confidence >= config.confidence)
            .find(|kp| kp.position.distance(self.position) < reach);

        let Some(striker) = striker else {
            return false;
        };
        let incidence = (self.position - striker.position)
            .try_normalize()
            .unwrap_or(Vec2::NEG_Y);
        self.state = PortalState::Hit {
            velocity: incidence * config.launch_speed,
        };
        self.angular_velocity = self.angular_velocity.signum() * (config.max_spin * 6.0);
        self.bolt = None;
        tracing::debug!(part = %striker.part, position = ?self.position, "portal struck");
        true
    }

    /// Idle motion: drift, soft-margin bounce, eased pulsing.
    fn drift(&mut self, bounds: Bounds, config: &PortalConfig, rng: &mut SmallRng) {
        self.position += self.drift;
        let r = self.radius;
        if (self.position.x - r < 0.0 && self.drift.x < 0.0)
            || (self.position.x + r > bounds.width && self.drift.x > 0.0)
        {
            self.drift.x = -self.drift.x;
        }
        if (self.position.y - r < 0.0 && self.drift.y < 0.0)
            || (self.position.y + r > bounds.height && self.drift.y > 0.0)
        {
            self.drift.y = -self.drift.y;
        }
        self.position = bounds.clamp(self.position);

        if self.pulse.tick(rng) {
            self.target_radius = rng.gen_range(config.min_radius..=config.max_radius);
            self.target_hue = rng.gen_range(0.0..360.0);
        }
        self.radius += (self.target_radius - self.radius) * config.ease;
        let hue_gap = (self.target_hue - self.hue + 540.0).rem_euclid(360.0) - 180.0;
        self.hue = (self.hue + hue_gap * config.ease).rem_euclid(360.0);
        self.rotation = (self.rotation + self.angular_velocity).rem_euclid(TAU);
    }

    /// Flight after a strike: gravity, friction, spin. Radius and hue freeze.
    fn fly(&mut self, config: &PortalConfig) {
        if let PortalState::Hit { velocity } = &mut self.state {
            velocity.y += config.gravity;
            *velocity *= config.friction;
            self.position += *velocity;
            self.rotation = (self.rotation + self.angular_velocity).rem_euclid(TAU);
        }
    }

    fn update_lightning(
        &mut self,
        skeleton: Option<&Skeleton>,
        config: &PortalConfig,
        rng: &mut SmallRng,
    ) {
        if let Some(bolt) = self.bolt.as_mut() {
            bolt.frames_left = bolt.frames_left.saturating_sub(1);
            if bolt.frames_left == 0 {
                self.bolt = None;
            }
        }
        if self.is_hit() || !self.lightning.tick(rng) {
            return;
        }
        let target = skeleton.and_then(|s| {
            [BodyPart::LeftWrist, BodyPart::RightWrist]
                .into_iter()
                .filter_map(|part| s.get(part))
                .filter(|kp| kp.confidence >= config.confidence)
                .map(|kp| kp.position)
                .filter(|p| p.distance(self.position) < config.lightning_range)
                .min_by(|a, b| {
                    a.distance_squared(self.position)
                        .total_cmp(&b.distance_squared(self.position))
                })
        });
        if let Some(target) = target {
            self.bolt = Some(Bolt {
                points: jagged_path(self.position, target, rng),
                frames_left: config.lightning_frames.max(1),
            });
        }
    }

    pub fn has_left(&self, bounds: Bounds) -> bool {
        self.is_hit() && !bounds.overlaps_circle(self.position, self.radius)
    }

    fn draw(&self, canvas: &mut dyn Canvas) {
        let layers = self.layers.max(1);
        for layer in 0..layers {
            let shrink = layer as f32 / layers as f32;
            let radius = self.radius * (1.0 - shrink * 0.85);
            let color = Color::hsba(
                self.hue + layer as f32 * 24.0,
                80.0,
                95.0 - shrink * 40.0,
                70.0,
            );
            canvas.fill_circle(self.position, radius * 2.0, color);
        }
        for spoke in 0..3 {
            let angle = self.rotation + spoke as f32 * TAU / 3.0;
            let tip = self.position + Vec2::from_angle(angle) * self.radius;
            canvas.line(
                self.position,
                tip,
                2.0,
                Color::hsba(self.hue + 180.0, 40.0, 100.0, 160.0),
            );
        }
        if let Some(bolt) = &self.bolt {
            canvas.polyline(&bolt.points, 2.0, Color::rgba(190, 220, 255, 220));
        }
    }
}

fn jagged_path(from: Vec2, to: Vec2, rng: &mut SmallRng) -> Vec<Vec2> {
    let normal = (to - from).perp().normalize_or_zero();
    (0..=BOLT_SEGMENTS)
        .map(|i| {
            let t = i as f32 / BOLT_SEGMENTS as f32;
            let base = from.lerp(to, t);
            if i == 0 || i == BOLT_SEGMENTS {
                base
            } else {
                base + normal * rng.gen_range(-BOLT_JAGGEDNESS..BOLT_JAGGEDNESS)
            }
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct PortalField {
    config: PortalConfig,
    portals: Vec<Portal>,
    population: Countdown,
}

impl PortalField {
    pub fn new(config: PortalConfig, bounds: Bounds, rng: &mut SmallRng) -> Self {
        let portals = (0..config.initial_count)
            .map(|_| Portal::spawn(&config, bounds, rng))
            .collect();
        let population = Countdown::new(config.population_interval);
        Self {
            config,
            portals,
            population,
        }
    }

    pub fn portals(&self) -> &[Portal] {
        &self.portals
    }

    pub fn portals_mut(&mut self) -> &mut Vec<Portal> {
        &mut self.portals
    }

    /// Soft-bounded random walk of the population size.
    fn adjust_population(&mut self, bounds: Bounds, rng: &mut SmallRng) {
        let config = &self.config;
        if rng.gen_bool(config.spawn_probability.clamp(0.0, 1.0)) {
            if self.portals.len() < config.max_count {
                self.portals.push(Portal::spawn(config, bounds, rng));
                tracing::debug!(count = self.portals.len(), "portal added");
            }
        } else if self.portals.len() > config.min_count {
            let index = rng.gen_range(0..self.portals.len());
            self.portals.remove(index);
            tracing::debug!(count = self.portals.len(), "portal removed");
        }
    }
}

impl Layer for PortalField {
    fn name(&self) -> &'static str {
        "portals"
    }

    fn update(&mut self, input: &FrameInput<'_>, rng: &mut SmallRng) {
        let config = &self.config;
        for portal in &mut self.portals {
            if let Some(skeleton) = input.skeleton {
                portal.strike(skeleton, config);
            }
            if portal.is_hit() {
                portal.fly(config);
            } else {
                portal.drift(input.bounds, config, rng);
            }
            portal.update_lightning(input.skeleton, config, rng);
        }

        let before = self.portals.len();
        self.portals.retain(|portal| !portal.has_left(input.bounds));
        for _ in self.portals.len()..before {
            self.portals.push(Portal::spawn(&self.config, input.bounds, rng));
            tracing::debug!("portal respawned after leaving the frame");
        }

        if self.population.tick() {
            self.adjust_population(input.bounds, rng);
        }
    }

    fn draw(&self, _input: &FrameInput<'_>, canvas: &mut dyn Canvas) {
        for portal in &self.portals {
            portal.draw(canvas);
        }
    }

    fn resize(&mut self, bounds: Bounds, _rng: &mut SmallRng) {
        for portal in self.portals.iter_mut().filter(|p| !p.is_hit()) {
            portal.position = bounds.clamp(portal.position);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{pose::Keypoint, render::DrawList};
    use rand::SeedableRng;

    fn bounds() -> Bounds {
        Bounds::new(800.0, 600.0)
    }

    fn portal_at(position: Vec2, radius: f32, rng: &mut SmallRng) -> Portal {
        let mut portal = Portal::spawn(&PortalConfig::default(), bounds(), rng);
        portal.position = position;
        portal.radius = radius;
        portal.target_radius = radius;
        portal
    }

    fn wrist_at(x: f32, y: f32, confidence: f32) -> Skeleton {
        Skeleton::from_keypoints([Keypoint::new(BodyPart::RightWrist, x, y, confidence)])
    }

    #[test]
    fn strike_inside_reach_flips_once() {
        let config = PortalConfig::default();
        let mut rng = SmallRng::seed_from_u64(1);
        let mut portal = portal_at(Vec2::new(400.0, 300.0), 50.0, &mut rng);

        // Reach is 0.6 * 50 = 30.
        assert!(!portal.strike(&wrist_at(435.0, 300.0, 0.9), &config));
        assert!(!portal.is_hit());
        assert!(!portal.strike(&wrist_at(420.0, 300.0, 0.29), &config));

        let close = wrist_at(420.0, 300.0, 0.3);
        assert!(portal.strike(&close, &config));
        assert!(portal.is_hit());
        for _ in 0..10 {
            assert!(!portal.strike(&close, &config));
        }
    }

    #[test]
    fn hit_portal_flies_away_from_the_striker() {
        let config = PortalConfig::default();
        let mut rng = SmallRng::seed_from_u64(2);
        let mut portal = portal_at(Vec2::new(400.0, 300.0), 50.0, &mut rng);
        portal.strike(&wrist_at(390.0, 300.0, 0.9), &config);
        match portal.state {
            PortalState::Hit { velocity } => assert!(velocity.x > 0.0 && velocity.y.abs() < 1e-4),
            PortalState::Idle => panic!("portal should be hit"),
        }
    }

    #[test]
    fn pulsing_stops_once_hit() {
        let config = PortalConfig {
            min_pulse_frames: 1,
            max_pulse_frames: 1,
            ..Default::default()
        };
        let mut rng = SmallRng::seed_from_u64(3);
        let mut portal = portal_at(Vec2::new(400.0, 300.0), 50.0, &mut rng);
        portal.pulse = RandomCountdown::new(1, 1, &mut rng);
        portal.strike(&wrist_at(400.0, 310.0, 0.9), &config);
        let (radius, target, hue) = (portal.radius, portal.target_radius, portal.hue);

        let mut field = PortalField::new(config, bounds(), &mut rng);
        field.portals_mut().clear();
        field.portals_mut().push(portal);
        for frame in 0..5 {
            field.update(&FrameInput::new(bounds(), frame), &mut rng);
            let portal = &field.portals()[0];
            assert!(portal.is_hit());
            assert_eq!(portal.radius, radius);
            assert_eq!(portal.target_radius, target);
            assert_eq!(portal.hue, hue);
        }
    }

    #[test]
    fn departed_portals_are_replaced() {
        let config = PortalConfig::default();
        let mut rng = SmallRng::seed_from_u64(4);
        let mut field = PortalField::new(config.clone(), bounds(), &mut rng);
        let count = field.portals().len();
        let skeleton = {
            let target = field.portals()[0].position;
            wrist_at(target.x - 1.0, target.y, 0.9)
        };
        field.portals_mut()[0].radius = 60.0;

        let mut respawned = false;
        for frame in 0..400 {
            let input = if frame == 0 {
                FrameInput::new(bounds(), frame).with_skeleton(Some(&skeleton))
            } else {
                FrameInput::new(bounds(), frame)
            };
            field.update(&input, &mut rng);
            if frame < 250 && field.portals().iter().all(|p| !p.is_hit()) {
                respawned = true;
                assert_eq!(field.portals().len(), count);
                break;
            }
        }
        assert!(respawned);
    }

    #[test]
    fn idle_portals_stay_in_frame() {
        let mut rng = SmallRng::seed_from_u64(5);
        let mut field = PortalField::new(PortalConfig::default(), bounds(), &mut rng);
        for frame in 0..2000 {
            field.update(&FrameInput::new(bounds(), frame), &mut rng);
            for portal in field.portals() {
                assert!(bounds().contains(portal.position));
            }
        }
    }

    #[test]
    fn population_stays_within_limits() {
        let config = PortalConfig {
            population_interval: 1,
            ..Default::default()
        };
        let mut rng = SmallRng::seed_from_u64(6);
        let mut field = PortalField::new(config.clone(), bounds(), &mut rng);
        let mut sizes = std::collections::BTreeSet::new();
        for frame in 0..500 {
            field.update(&FrameInput::new(bounds(), frame), &mut rng);
            let n = field.portals().len();
            assert!((config.min_count..=config.max_count).contains(&n));
            sizes.insert(n);
        }
        assert!(sizes.len() > 1, "population should wander");
    }

    #[test]
    fn lightning_reaches_a_nearby_wrist() {
        let config = PortalConfig {
            min_lightning_interval: 1,
            max_lightning_interval: 1,
            ..Default::default()
        };
        let mut rng = SmallRng::seed_from_u64(7);
        let mut portal = portal_at(Vec2::new(400.0, 300.0), 10.0, &mut rng);
        portal.lightning = RandomCountdown::new(1, 1, &mut rng);
        let skeleton = wrist_at(500.0, 300.0, 0.9);
        portal.update_lightning(Some(&skeleton), &config, &mut rng);

        let bolt = portal.bolt.as_ref().expect("bolt should fire");
        assert_eq!(bolt.points.first(), Some(&portal.position));
        assert_eq!(bolt.points.last(), Some(&Vec2::new(500.0, 300.0)));

        let mut list = DrawList::new(bounds());
        portal.draw(&mut list);
        assert!(list
            .commands()
            .iter()
            .any(|c| matches!(c, crate::render::DrawCommand::Polyline { .. })));
    }
}
