//! Small geometric helpers shared by the force field and the geometry layers.

mod noise;

use glam::Vec2;
use serde::{Deserialize, Serialize};

pub use noise::Noise;

/// Visible frame extent. Every entity position is wrapped or clamped into
/// `[0, width) x [0, height)` on update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    pub fn center(&self) -> Vec2 {
        self.size() * 0.5
    }

    /// Torus wrap. The result always satisfies `0 <= x < width` and
    /// `0 <= y < height`, even when the input lies many frames away.
    pub fn wrap(&self, position: Vec2) -> Vec2 {
        Vec2::new(
            wrap_axis(position.x, self.width),
            wrap_axis(position.y, self.height),
        )
    }

    pub fn clamp(&self, position: Vec2) -> Vec2 {
        Vec2::new(
            position.x.clamp(0.0, self.width),
            position.y.clamp(0.0, self.height),
        )
    }

    pub fn contains(&self, position: Vec2) -> bool {
        (0.0..=self.width).contains(&position.x) && (0.0..=self.height).contains(&position.y)
    }

    /// True while any part of the circle overlaps the frame.
    pub fn overlaps_circle(&self, center: Vec2, radius: f32) -> bool {
        center.x + radius >= 0.0
            && center.x - radius <= self.width
            && center.y + radius >= 0.0
            && center.y - radius <= self.height
    }

    /// Uniformly random position inside the frame.
    pub fn random_point<R: rand::Rng + ?Sized>(&self, rng: &mut R) -> Vec2 {
        Vec2::new(
            rng.gen_range(0.0..self.width.max(f32::EPSILON)),
            rng.gen_range(0.0..self.height.max(f32::EPSILON)),
        )
    }
}

fn wrap_axis(value: f32, extent: f32) -> f32 {
    if !value.is_finite() || extent <= 0.0 {
        return 0.0;
    }
    let wrapped = value.rem_euclid(extent);
    // rem_euclid can round up to `extent` for tiny negative inputs.
    if wrapped >= extent {
        0.0
    } else {
        wrapped
    }
}

/// Closest point to `point` on the segment `start..end`, with the projection
/// parameter clamped to `[0, 1]`. A zero-length segment yields `start`.
pub fn closest_point_on_segment(point: Vec2, start: Vec2, end: Vec2) -> Vec2 {
    let line = end - start;
    let len_sq = line.length_squared();
    if len_sq <= f32::EPSILON {
        return start;
    }
    let t = ((point - start).dot(line) / len_sq).clamp(0.0, 1.0);
    start + line * t
}

pub fn distance_to_segment(point: Vec2, start: Vec2, end: Vec2) -> f32 {
    point.distance(closest_point_on_segment(point, start, end))
}

/// Linear remap without clamping, extrapolating outside the input range.
pub fn remap(value: f32, in_lo: f32, in_hi: f32, out_lo: f32, out_hi: f32) -> f32 {
    let span = in_hi - in_lo;
    if span.abs() <= f32::EPSILON {
        return out_lo;
    }
    out_lo + (value - in_lo) / span * (out_hi - out_lo)
}

/// Linear remap clamped to the output range (either orientation).
pub fn remap_clamped(value: f32, in_lo: f32, in_hi: f32, out_lo: f32, out_hi: f32) -> f32 {
    let mapped = remap(value, in_lo, in_hi, out_lo, out_hi);
    mapped.clamp(out_lo.min(out_hi), out_lo.max(out_hi))
}

/// Caps the magnitude of `v` at `max`.
pub fn limit(v: Vec2, max: f32) -> Vec2 {
    let len_sq = v.length_squared();
    if len_sq > max * max && len_sq > 0.0 {
        v * (max / len_sq.sqrt())
    } else {
        v
    }
}

/// Uniform random vector with both components in `[-amount, amount)`.
pub fn jitter<R: rand::Rng + ?Sized>(rng: &mut R, amount: f32) -> Vec2 {
    if amount <= 0.0 {
        return Vec2::ZERO;
    }
    Vec2::new(
        rng.gen_range(-amount..amount),
        rng.gen_range(-amount..amount),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::SmallRng, SeedableRng};

    #[test]
    fn zero_length_segment_reduces_to_point_distance() {
        let p = Vec2::new(3.0, 4.0);
        let d = distance_to_segment(p, Vec2::ZERO, Vec2::ZERO);
        assert!((d - 5.0).abs() < 1e-6);
        assert!(d.is_finite());
    }

    #[test]
    fn projection_is_clamped_to_segment() {
        let start = Vec2::new(0.0, 0.0);
        let end = Vec2::new(10.0, 0.0);
        assert_eq!(
            closest_point_on_segment(Vec2::new(-5.0, 3.0), start, end),
            start
        );
        assert_eq!(
            closest_point_on_segment(Vec2::new(15.0, 3.0), start, end),
            end
        );
        assert_eq!(
            closest_point_on_segment(Vec2::new(4.0, 3.0), start, end),
            Vec2::new(4.0, 0.0)
        );
    }

    #[test]
    fn wrap_handles_velocities_larger_than_the_frame() {
        let bounds = Bounds::new(640.0, 480.0);
        for p in [
            Vec2::new(-5000.3, 99999.0),
            Vec2::new(640.0, 480.0),
            Vec2::new(-1e-9, -1e-9),
            Vec2::new(1e7, -1e7),
        ] {
            let w = bounds.wrap(p);
            assert!((0.0..640.0).contains(&w.x), "{w:?}");
            assert!((0.0..480.0).contains(&w.y), "{w:?}");
        }
    }

    #[test]
    fn remap_clamped_respects_descending_outputs() {
        assert_eq!(remap_clamped(500.0, 0.0, 150.0, 200.0, 40.0), 40.0);
        assert_eq!(remap_clamped(-10.0, 0.0, 150.0, 200.0, 40.0), 200.0);
        assert!((remap(75.0, 0.0, 150.0, 200.0, 40.0) - 120.0).abs() < 1e-4);
    }

    #[test]
    fn limit_caps_magnitude_only_when_exceeded() {
        let v = limit(Vec2::new(30.0, 40.0), 5.0);
        assert!((v.length() - 5.0).abs() < 1e-5);
        assert_eq!(limit(Vec2::new(1.0, 1.0), 5.0), Vec2::new(1.0, 1.0));
    }

    #[test]
    fn jitter_stays_in_range() {
        let mut rng = SmallRng::seed_from_u64(3);
        for _ in 0..1000 {
            let j = jitter(&mut rng, 0.2);
            assert!(j.x.abs() <= 0.2 && j.y.abs() <= 0.2);
        }
    }
}
