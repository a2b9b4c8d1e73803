//! Action painting: the body leaves brush trails, flings paint when it moves
//! fast, and drips watercolour. The canvas is never cleared in this scene,
//! so every mark accumulates.

use std::{collections::VecDeque, f32::consts::FRAC_PI_3};

use glam::Vec2;
use rand::{rngs::SmallRng, seq::SliceRandom, Rng};

use super::{FrameInput, Layer};
use crate::{
    config::PaintingConfig,
    math::{remap, Bounds},
    pose::{BodyPart, Skeleton, BODY_PART_COUNT, LIMB_BONES},
    render::{Canvas, Color},
    timeline::Countdown,
};

const OFFSCREEN_MARGIN: f32 = 100.0;

/// An HSB paint colour; alpha lives on the mark that carries it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Paint {
    pub hue: f32,
    pub saturation: f32,
    pub brightness: f32,
}

impl Paint {
    fn random(rng: &mut SmallRng, hue: (f32, f32), sat: (f32, f32), bri: (f32, f32)) -> Self {
        Self {
            hue: rng.gen_range(hue.0..hue.1),
            saturation: rng.gen_range(sat.0..sat.1),
            brightness: rng.gen_range(bri.0..bri.1),
        }
    }

    pub fn with_alpha(self, alpha: f32) -> Color {
        Color::hsba(self.hue, self.saturation, self.brightness, alpha)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Splatter {
    pub position: Vec2,
    pub velocity: Vec2,
    pub size: f32,
    pub paint: Paint,
    pub alpha: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Droplet {
    pub position: Vec2,
    pub speed: f32,
    pub size: f32,
    pub paint: Paint,
    pub alpha: f32,
}

#[derive(Debug, Clone, PartialEq)]
struct Blotch {
    position: Vec2,
    size: f32,
    color: Color,
}

/// A mark produced during `update` and rendered by `draw`. Keeping the random
/// choices here lets drawing stay a pure read.
#[derive(Debug, Clone, PartialEq)]
enum Mark {
    Dot { center: Vec2, diameter: f32, color: Color },
    Ellipse { center: Vec2, size: Vec2, color: Color },
    Line { from: Vec2, to: Vec2, weight: f32, color: Color },
    Stroke { points: Vec<Vec2>, weight: f32, color: Color },
}

#[derive(Debug, Clone)]
pub struct Painting {
    config: PaintingConfig,
    trails: Vec<VecDeque<Vec2>>,
    previous: [Option<Vec2>; BODY_PART_COUNT],
    splatters: Vec<Splatter>,
    drops: Vec<Droplet>,
    blotches: Vec<Blotch>,
    blotches_painted: bool,
    spray: Countdown,
    glow: Countdown,
    marks: Vec<Mark>,
}

impl Painting {
    pub fn new(config: PaintingConfig, bounds: Bounds, rng: &mut SmallRng) -> Self {
        let blotches = Self::scatter_blotches(config.blotches, bounds, rng);
        Self {
            trails: vec![VecDeque::with_capacity(config.trail_length + 1); BODY_PART_COUNT],
            previous: [None; BODY_PART_COUNT],
            splatters: Vec::new(),
            drops: Vec::new(),
            blotches,
            blotches_painted: false,
            spray: Countdown::new(config.spray_every),
            glow: Countdown::new(config.glow_every),
            marks: Vec::new(),
            config,
        }
    }

    fn scatter_blotches(count: usize, bounds: Bounds, rng: &mut SmallRng) -> Vec<Blotch> {
        (0..count)
            .map(|_| Blotch {
                position: bounds.random_point(rng),
                size: rng.gen_range(80.0..250.0),
                color: Paint::random(rng, (200.0, 280.0), (20.0, 50.0), (30.0, 60.0))
                    .with_alpha(rng.gen_range(10.0..30.0)),
            })
            .collect()
    }

    pub fn trail(&self, part: BodyPart) -> &VecDeque<Vec2> {
        &self.trails[part.index()]
    }

    pub fn splatters(&self) -> &[Splatter] {
        &self.splatters
    }

    pub fn drops(&self) -> &[Droplet] {
        &self.drops
    }

    fn update_drops(&mut self, bounds: Bounds, rng: &mut SmallRng) {
        let config = &self.config;
        for drop in &mut self.drops {
            drop.position.y += drop.speed;
            drop.speed += config.drop_gravity;
            drop.position.x += rng.gen_range(-0.5..0.5);
            drop.alpha -= config.drop_fade;
            drop.size += config.drop_growth;
        }
        self.drops
            .retain(|drop| drop.position.y <= bounds.height && drop.alpha > 0.0);

        for drop in &self.drops {
            self.marks.push(Mark::Ellipse {
                center: drop.position,
                size: Vec2::new(drop.size * 0.5, drop.size * 1.5),
                color: drop.paint.with_alpha(drop.alpha),
            });
            self.marks.push(Mark::Ellipse {
                center: drop.position - Vec2::new(0.0, 5.0),
                size: Vec2::new(drop.size * 0.3, drop.size),
                color: drop.paint.with_alpha(drop.alpha * 0.3),
            });
        }
    }

    fn update_splatters(&mut self, bounds: Bounds, rng: &mut SmallRng) {
        let config = &self.config;
        for splatter in &mut self.splatters {
            splatter.position += splatter.velocity;
            splatter.velocity.y += config.splatter_gravity;
            splatter.velocity *= config.splatter_drag;
            splatter.alpha -= config.splatter_fade;
        }
        self.splatters.retain(|s| {
            s.alpha > 0.0
                && s.position.y <= bounds.height + OFFSCREEN_MARGIN
                && s.position.x >= -OFFSCREEN_MARGIN
                && s.position.x <= bounds.width + OFFSCREEN_MARGIN
        });

        for splatter in &self.splatters {
            self.marks.push(Mark::Dot {
                center: splatter.position,
                diameter: splatter.size,
                color: splatter.paint.with_alpha(splatter.alpha),
            });
            for _ in 0..3 {
                let offset = Vec2::new(
                    rng.gen_range(-splatter.size..=splatter.size),
                    rng.gen_range(-splatter.size..=splatter.size),
                );
                self.marks.push(Mark::Dot {
                    center: splatter.position + offset,
                    diameter: splatter.size * rng.gen_range(0.2..0.5),
                    color: splatter.paint.with_alpha(splatter.alpha * 0.6),
                });
            }
        }
    }

    /// Flings paint along the direction of a fast-moving landmark.
    fn throw_paint(&mut self, origin: Vec2, motion: Vec2, rng: &mut SmallRng) {
        let config = &self.config;
        let speed = motion.length();
        let count = remap(speed, config.throw_speed, config.max_throw_speed, 2.0, 12.0).floor();
        let launch = remap(speed, config.throw_speed, config.max_throw_speed, 3.0, 15.0);
        let heading = motion.y.atan2(motion.x);

        for _ in 0..count.max(0.0) as usize {
            let angle = heading + rng.gen_range(-FRAC_PI_3..FRAC_PI_3);
            let wobble = Vec2::new(rng.gen_range(-2.0..2.0), rng.gen_range(-2.0..2.0));
            let paint = splatter_paint(rng);
            self.splatters.push(Splatter {
                position: origin,
                velocity: Vec2::from_angle(angle) * launch + wobble,
                size: rng.gen_range(3.0..12.0),
                paint,
                alpha: rng.gen_range(180.0..255.0),
            });
        }
    }

    fn brush(&mut self, skeleton: &Skeleton, rng: &mut SmallRng) {
        let threshold = self.config.trail_confidence;
        let keypoints: Vec<_> = skeleton.confident_keypoints(threshold).copied().collect();

        for keypoint in keypoints {
            let index = keypoint.part.index();
            let position = keypoint.position;

            if let Some(previous) = self.previous[index] {
                let motion = position - previous;
                if motion.length() > self.config.throw_speed {
                    self.throw_paint(position, motion, rng);
                }
            }
            self.previous[index] = Some(position);

            let trail = &mut self.trails[index];
            trail.push_back(position);
            while trail.len() > self.config.trail_length {
                trail.pop_front();
            }
            if trail.len() > 2 {
                self.stroke_trail(keypoint.part, position, rng);
            }
        }
    }

    fn stroke_trail(&mut self, part: BodyPart, head: Vec2, rng: &mut SmallRng) {
        let (paint, alpha, weight) = if part.is_hand() {
            let choice = rng.gen_range(0..5);
            let (hue, sat) = match choice {
                0 | 1 => ((0.0, 40.0), (85.0, 100.0)),
                2 | 3 => ((280.0, 330.0), (80.0, 95.0)),
                _ => ((160.0, 200.0), (75.0, 90.0)),
            };
            let paint = Paint::random(rng, hue, sat, (90.0, 100.0));
            (paint, 200.0, rng.gen_range(8.0..20.0))
        } else if part.is_head() {
            let paint = Paint::random(rng, (240.0, 280.0), (60.0, 80.0), (80.0, 95.0));
            (paint, 120.0, rng.gen_range(15.0..30.0))
        } else {
            let paint = Paint::random(rng, (30.0, 60.0), (75.0, 90.0), (85.0, 100.0));
            (paint, 140.0, rng.gen_range(5.0..12.0))
        };

        if part.is_hand() && rng.gen_bool(self.config.hand_drip_chance.clamp(0.0, 1.0)) {
            self.drops.push(Droplet {
                position: head,
                speed: rng.gen_range(1.0..3.0),
                size: rng.gen_range(8.0..20.0),
                paint,
                alpha: 150.0,
            });
        }

        let points: Vec<Vec2> = self.trails[part.index()].iter().copied().collect();
        let drip = self.config.trail_drip_chance.clamp(0.0, 1.0);
        for point in &points {
            if rng.gen_bool(drip) {
                self.drops.push(Droplet {
                    position: *point,
                    speed: rng.gen_range(0.5..2.0),
                    size: rng.gen_range(5.0..15.0),
                    paint,
                    alpha: alpha * 0.8,
                });
            }
        }
        self.marks.push(Mark::Stroke {
            points,
            weight,
            color: paint.with_alpha(alpha),
        });
    }

    /// Soft golden spray along the limbs.
    fn spray(&mut self, skeleton: &Skeleton, rng: &mut SmallRng) {
        for (from, to) in skeleton.segments(&LIMB_BONES, self.config.spray_confidence) {
            let paint = Paint::random(rng, (30.0, 50.0), (70.0, 85.0), (75.0, 90.0));
            self.marks.push(Mark::Line {
                from,
                to,
                weight: rng.gen_range(10.0..18.0),
                color: paint.with_alpha(60.0),
            });
        }
    }

    fn glow(&mut self, skeleton: &Skeleton, rng: &mut SmallRng) {
        let threshold = self.config.glow_confidence;
        let wrists: Vec<Vec2> = skeleton
            .confident_keypoints(threshold)
            .filter(|kp| kp.part.is_wrist())
            .map(|kp| kp.position)
            .collect();
        for center in wrists {
            let outer = Paint::random(rng, (0.0, 40.0), (85.0, 100.0), (90.0, 100.0));
            self.marks.push(Mark::Dot {
                center,
                diameter: rng.gen_range(15.0..35.0),
                color: outer.with_alpha(180.0),
            });
            let inner = Paint::random(rng, (280.0, 320.0), (80.0, 95.0), (95.0, 100.0));
            self.marks.push(Mark::Dot {
                center,
                diameter: rng.gen_range(8.0..18.0),
                color: inner.with_alpha(150.0),
            });
        }
    }
}

fn splatter_paint(rng: &mut SmallRng) -> Paint {
    const PALETTES: [((f32, f32), (f32, f32), (f32, f32)); 5] = [
        ((0.0, 30.0), (85.0, 100.0), (90.0, 100.0)),
        ((30.0, 60.0), (80.0, 95.0), (85.0, 100.0)),
        ((280.0, 320.0), (75.0, 95.0), (85.0, 100.0)),
        ((160.0, 200.0), (70.0, 90.0), (80.0, 95.0)),
        ((240.0, 280.0), (80.0, 100.0), (85.0, 100.0)),
    ];
    let (hue, sat, bri) = PALETTES.choose(rng).copied().unwrap_or(PALETTES[0]);
    Paint::random(rng, hue, sat, bri)
}

impl Layer for Painting {
    fn name(&self) -> &'static str {
        "painting"
    }

    fn update(&mut self, input: &FrameInput<'_>, rng: &mut SmallRng) {
        self.marks.clear();
        if !self.blotches_painted {
            self.blotches_painted = true;
            for blotch in &self.blotches {
                self.marks.push(Mark::Dot {
                    center: blotch.position,
                    diameter: blotch.size,
                    color: blotch.color,
                });
            }
        }

        self.update_drops(input.bounds, rng);
        self.update_splatters(input.bounds, rng);

        let spray = self.spray.tick();
        let glow = self.glow.tick();
        let Some(skeleton) = input.skeleton else {
            return;
        };
        self.brush(skeleton, rng);
        if spray {
            self.spray(skeleton, rng);
        }
        if glow {
            self.glow(skeleton, rng);
        }
    }

    fn draw(&self, _input: &FrameInput<'_>, canvas: &mut dyn Canvas) {
        for mark in &self.marks {
            match mark {
                Mark::Dot {
                    center,
                    diameter,
                    color,
                } => canvas.fill_circle(*center, *diameter, *color),
                Mark::Ellipse {
                    center,
                    size,
                    color,
                } => canvas.fill_ellipse(*center, *size, *color),
                Mark::Line {
                    from,
                    to,
                    weight,
                    color,
                } => canvas.line(*from, *to, *weight, *color),
                Mark::Stroke {
                    points,
                    weight,
                    color,
                } => canvas.polyline(points, *weight, *color),
            }
        }
    }

    fn resize(&mut self, bounds: Bounds, rng: &mut SmallRng) {
        self.blotches = Self::scatter_blotches(self.config.blotches, bounds, rng);
        self.blotches_painted = false;
    }
}
