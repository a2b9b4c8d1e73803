use rand::Rng;
use serde::{Deserialize, Serialize};

/// Fixed-rate frame clock driven by the host's tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameClock {
    pub frame: u64,
    pub fps: f32,
}

impl FrameClock {
    pub fn new(fps: f32) -> Self {
        Self {
            frame: 0,
            fps: fps.max(1.0),
        }
    }

    pub fn advance(&mut self) {
        self.frame += 1;
    }

    /// Duration of one frame in seconds.
    pub fn delta(&self) -> f32 {
        1.0 / self.fps
    }

    pub fn seconds(&self) -> f32 {
        self.frame as f32 / self.fps
    }
}

/// Per-effect "every N frames" trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Countdown {
    period: u32,
    remaining: u32,
}

impl Countdown {
    pub fn new(period: u32) -> Self {
        let period = period.max(1);
        Self {
            period,
            remaining: period,
        }
    }

    /// Starts part-way through the period so effects sharing a period do
    /// not all fire on the same frame.
    pub fn staggered(period: u32, remaining: u32) -> Self {
        let period = period.max(1);
        Self {
            period,
            remaining: remaining.clamp(1, period),
        }
    }

    pub fn period(&self) -> u32 {
        self.period
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Decrements the counter; returns `true` and reloads on expiry.
    pub fn tick(&mut self) -> bool {
        if self.remaining <= 1 {
            self.remaining = self.period;
            true
        } else {
            self.remaining -= 1;
            false
        }
    }
}

/// Countdown that reloads with a random period in `min..=max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomCountdown {
    min: u32,
    max: u32,
    remaining: u32,
}

impl RandomCountdown {
    pub fn new<R: Rng + ?Sized>(min: u32, max: u32, rng: &mut R) -> Self {
        let min = min.max(1);
        let max = max.max(min);
        Self {
            min,
            max,
            remaining: rng.gen_range(min..=max),
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn tick<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        if self.remaining <= 1 {
            self.remaining = rng.gen_range(self.min..=self.max);
            true
        } else {
            self.remaining -= 1;
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::SmallRng, SeedableRng};

    #[test]
    fn countdown_fires_every_period() {
        let mut timer = Countdown::new(10);
        let frames: Vec<u32> = (1..=30).filter(|_| timer.tick()).collect();
        assert_eq!(frames, vec![10, 20, 30]);
    }

    #[test]
    fn zero_period_fires_every_tick() {
        let mut timer = Countdown::new(0);
        assert!((0..5).all(|_| timer.tick()));
    }

    #[test]
    fn staggered_start_fires_early_once() {
        let mut timer = Countdown::staggered(30, 3);
        let frames: Vec<u32> = (1..=40).filter(|_| timer.tick()).collect();
        assert_eq!(frames, vec![3, 33]);
    }

    #[test]
    fn random_countdown_reloads_within_range() {
        let mut rng = SmallRng::seed_from_u64(9);
        let mut timer = RandomCountdown::new(30, 120, &mut rng);
        let mut last = 0;
        let mut gaps = Vec::new();
        for frame in 1..=2000 {
            if timer.tick(&mut rng) {
                gaps.push(frame - last);
                last = frame;
            }
        }
        assert!(gaps.iter().skip(1).all(|gap| (30..=120).contains(gap)));
    }

    #[test]
    fn clock_reports_seconds() {
        let mut clock = FrameClock::new(60.0);
        for _ in 0..90 {
            clock.advance();
        }
        assert!((clock.seconds() - 1.5).abs() < 1e-6);
    }
}
