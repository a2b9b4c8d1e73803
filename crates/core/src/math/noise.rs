use std::f32::consts::PI;

use rand::Rng;

const TABLE_SIZE: usize = 4096;
const TABLE_MASK: u32 = (TABLE_SIZE - 1) as u32;
const OCTAVES: usize = 4;
const FALLOFF: f32 = 0.5;

/// Smooth 1-D value noise: a seeded lattice of random values blended with
/// cosine interpolation over four octaves. Output lies in `[0, 1)`.
#[derive(Debug, Clone)]
pub struct Noise {
    table: Vec<f32>,
}

impl Noise {
    pub fn new<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let table = (0..TABLE_SIZE).map(|_| rng.gen::<f32>()).collect();
        Self { table }
    }

    pub fn sample(&self, x: f32) -> f32 {
        let x = if x.is_finite() { x.abs() } else { 0.0 };
        let mut xi = x.floor() as u32;
        let mut xf = x - x.floor();
        let mut amplitude = 0.5;
        let mut result = 0.0;

        for _ in 0..OCTAVES {
            let t = 0.5 * (1.0 - (xf * PI).cos());
            let a = self.table[(xi & TABLE_MASK) as usize];
            let b = self.table[(xi.wrapping_add(1) & TABLE_MASK) as usize];
            result += (a + (b - a) * t) * amplitude;

            amplitude *= FALLOFF;
            xi = xi.wrapping_shl(1);
            xf *= 2.0;
            if xf >= 1.0 {
                xi = xi.wrapping_add(1);
                xf -= 1.0;
            }
        }

        result
    }

    /// Sample remapped to `[-1, 1)`.
    pub fn signed(&self, x: f32) -> f32 {
        self.sample(x) * 2.0 - 1.0
    }
}
