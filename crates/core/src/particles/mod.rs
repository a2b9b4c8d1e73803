//! Wrapping particle swarms pushed around by a [`ForceField`](crate::field::ForceField).

use glam::Vec2;
use rand::{rngs::SmallRng, Rng};

use crate::{
    config::SwarmConfig,
    field::ForceField,
    layers::{FrameInput, Layer},
    math::{limit, remap, Bounds},
    render::{Canvas, Color},
};

/// A point mass living on the torus of the frame. Size and top speed are
/// fixed at creation; particles are never destroyed, only wrapped.
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub position: Vec2,
    pub velocity: Vec2,
    pub acceleration: Vec2,
    pub size: f32,
    pub max_speed: f32,
    /// Hue in degrees, cycling modulo 360.
    pub hue: f32,
}

impl Particle {
    pub fn new(position: Vec2, size: f32, max_speed: f32, hue: f32) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            acceleration: Vec2::ZERO,
            size,
            max_speed,
            hue: hue.rem_euclid(360.0),
        }
    }

    /// Random particle drawn from a swarm description; bigger means slower.
    pub fn spawn(swarm: &SwarmConfig, bounds: Bounds, rng: &mut SmallRng) -> Self {
        let size = if swarm.max_size > swarm.min_size {
            rng.gen_range(swarm.min_size..swarm.max_size)
        } else {
            swarm.min_size
        };
        let max_speed = remap(
            size,
            swarm.min_size,
            swarm.max_size,
            swarm.fast_speed,
            swarm.slow_speed,
        );
        Self::new(
            bounds.random_point(rng),
            size,
            max_speed,
            rng.gen_range(0.0..360.0),
        )
    }

    pub fn update(&mut self, force: Vec2, bounds: Bounds, hue_step: f32) {
        self.acceleration = force;
        self.velocity = limit(self.velocity + self.acceleration, self.max_speed);
        self.position = bounds.wrap(self.position + self.velocity);
        self.hue = (self.hue + hue_step).rem_euclid(360.0);
    }

    pub fn color(&self) -> Color {
        Color::hsba(self.hue, 80.0, 100.0, 204.0)
    }
}

/// Particles sharing one steering field.
pub struct ParticleSystem {
    particles: Vec<Particle>,
    field: Box<dyn ForceField>,
    hue_step: f32,
}

impl ParticleSystem {
    pub fn new(
        swarm: &SwarmConfig,
        field: Box<dyn ForceField>,
        bounds: Bounds,
        rng: &mut SmallRng,
    ) -> Self {
        let particles = (0..swarm.count)
            .map(|_| Particle::spawn(swarm, bounds, rng))
            .collect();
        Self {
            particles,
            field,
            hue_step: swarm.hue_step,
        }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }
}

impl std::fmt::Debug for ParticleSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParticleSystem")
            .field("particles", &self.particles.len())
            .field("hue_step", &self.hue_step)
            .finish()
    }
}

impl Layer for ParticleSystem {
    fn name(&self) -> &'static str {
        "particles"
    }

    fn update(&mut self, input: &FrameInput<'_>, rng: &mut SmallRng) {
        for particle in &mut self.particles {
            let force = self
                .field
                .acceleration(particle.position, input.skeleton, rng);
            particle.update(force, input.bounds, self.hue_step);
        }
    }

    fn draw(&self, _input: &FrameInput<'_>, canvas: &mut dyn Canvas) {
        for particle in &self.particles {
            canvas.fill_circle(particle.position, particle.size, particle.color());
        }
    }

    fn resize(&mut self, bounds: Bounds, _rng: &mut SmallRng) {
        for particle in &mut self.particles {
            particle.position = bounds.wrap(particle.position);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::ParticleConfig, field::BoneOrbit, render::DrawList};
    use rand::SeedableRng;

    #[test]
    fn update_clamps_speed_and_wraps() {
        let bounds = Bounds::new(100.0, 50.0);
        let mut particle = Particle::new(Vec2::new(99.0, 1.0), 5.0, 4.0, 359.8);
        particle.update(Vec2::new(10.0, -10.0), bounds, 0.5);

        assert!((particle.velocity.length() - 4.0).abs() < 1e-5);
        assert!((0.0..100.0).contains(&particle.position.x));
        assert!((0.0..50.0).contains(&particle.position.y));
        assert!(particle.position.x < 10.0, "exited right, re-entered left");
        assert!(particle.position.y > 40.0, "exited top, re-entered bottom");
        assert!((particle.hue - 0.3).abs() < 1e-3);
    }

    #[test]
    fn wraps_even_when_speed_exceeds_frame() {
        let bounds = Bounds::new(10.0, 10.0);
        let mut particle = Particle::new(Vec2::new(5.0, 5.0), 1.0, 1000.0, 0.0);
        for _ in 0..50 {
            particle.update(Vec2::new(333.3, -777.7), bounds, 0.5);
            assert!((0.0..10.0).contains(&particle.position.x));
            assert!((0.0..10.0).contains(&particle.position.y));
        }
    }

    #[test]
    fn bigger_particles_are_slower() {
        let swarm = ParticleConfig::default().orbit;
        let mut rng = SmallRng::seed_from_u64(4);
        let bounds = Bounds::new(640.0, 480.0);
        let mut spawned: Vec<Particle> = (0..200)
            .map(|_| Particle::spawn(&swarm, bounds, &mut rng))
            .collect();
        spawned.sort_by(|a, b| a.size.total_cmp(&b.size));
        for pair in spawned.windows(2) {
            assert!(pair[0].max_speed >= pair[1].max_speed);
        }
        assert!(spawned.iter().all(|p| (2.0..=6.0).contains(&p.max_speed)));
    }

    #[test]
    fn system_draws_one_circle_per_particle() {
        let mut swarm = ParticleConfig::default().orbit;
        swarm.count = 25;
        let bounds = Bounds::new(320.0, 240.0);
        let mut rng = SmallRng::seed_from_u64(2);
        let mut system =
            ParticleSystem::new(&swarm, Box::new(BoneOrbit::default()), bounds, &mut rng);

        let input = FrameInput::new(bounds, 0);
        system.update(&input, &mut rng);
        let mut list = DrawList::new(bounds);
        system.draw(&input, &mut list);
        assert_eq!(list.commands().len(), 25);
    }
}
