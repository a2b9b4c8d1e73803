use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{math::Bounds, MappingRange, Result, SketchError};

/// Top-level configuration structure for the application.
///
/// Every section falls back to its defaults, so a config file only needs the
/// values it overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Seed for every random stream. `None` draws one from the OS.
    pub seed: Option<u64>,
    pub canvas: CanvasConfig,
    pub pose: PoseConfig,
    pub particles: ParticleConfig,
    pub field: FieldConfig,
    pub constellation: ConstellationConfig,
    pub mosaic: MosaicConfig,
    pub portals: PortalConfig,
    pub painting: PaintingConfig,
    pub audio: AudioConfig,
}

impl AppConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        tracing::debug!(?path, "loading configuration");
        Self::from_json(&text)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.canvas.width, self.canvas.height)
    }

    pub fn validate(&self) -> Result<()> {
        let canvas = &self.canvas;
        if !(canvas.width > 0.0 && canvas.height > 0.0) {
            return Err(SketchError::invalid_config("canvas must have a positive size"));
        }
        if canvas.fps == 0 {
            return Err(SketchError::invalid_config("canvas.fps must be positive"));
        }
        for (name, swarm) in [
            ("particles.repel", &self.particles.repel),
            ("particles.orbit", &self.particles.orbit),
        ] {
            if !(swarm.min_size > 0.0 && swarm.min_size <= swarm.max_size) {
                return Err(SketchError::invalid_config(format!(
                    "{name} size range is empty"
                )));
            }
        }
        if self.mosaic.cell_size <= 0.0 {
            return Err(SketchError::invalid_config("mosaic.cell_size must be positive"));
        }
        if !(0.0..=1.0).contains(&self.mosaic.density) {
            return Err(SketchError::invalid_config("mosaic.density must lie in [0, 1]"));
        }
        let portals = &self.portals;
        if portals.min_count > portals.max_count {
            return Err(SketchError::invalid_config(
                "portals.min_count exceeds portals.max_count",
            ));
        }
        if portals.initial_count > portals.max_count {
            return Err(SketchError::invalid_config(
                "portals.initial_count exceeds portals.max_count",
            ));
        }
        if !(portals.max_spin.is_finite() && portals.max_spin >= 0.0) {
            return Err(SketchError::invalid_config(
                "portals.max_spin must be finite and non-negative",
            ));
        }
        if !(0.0..=1.0).contains(&portals.spawn_probability) {
            return Err(SketchError::invalid_config(
                "portals.spawn_probability must lie in [0, 1]",
            ));
        }
        if !(portals.min_radius > 0.0 && portals.min_radius <= portals.max_radius) {
            return Err(SketchError::invalid_config("portals radius range is empty"));
        }
        if portals.population_interval == 0 {
            return Err(SketchError::invalid_config(
                "portals.population_interval must be positive",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: f32,
    pub height: f32,
    pub fps: u32,
    /// Flip detections horizontally so the display behaves like a mirror.
    pub mirror: bool,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
            fps: 60,
            mirror: true,
        }
    }
}

/// Detection-side settings shared by every scene.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseConfig {
    /// Threshold for drawing the skeleton overlay.
    pub overlay_confidence: f32,
    /// Pause between detections when the detector runs on its own thread.
    pub detect_interval_ms: u64,
}

impl Default for PoseConfig {
    fn default() -> Self {
        Self {
            overlay_confidence: 0.2,
            detect_interval_ms: 33,
        }
    }
}

/// A particle swarm: size range and the speed assigned at either end of it.
/// Bigger particles get speeds closer to `slow_speed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwarmConfig {
    pub count: usize,
    pub min_size: f32,
    pub max_size: f32,
    pub fast_speed: f32,
    pub slow_speed: f32,
    pub hue_step: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleConfig {
    pub repel: SwarmConfig,
    pub orbit: SwarmConfig,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            repel: SwarmConfig {
                count: 100,
                min_size: 3.0,
                max_size: 8.0,
                fast_speed: 4.0,
                slow_speed: 4.0,
                hue_step: 0.5,
            },
            orbit: SwarmConfig {
                count: 2100,
                min_size: 3.0,
                max_size: 15.0,
                fast_speed: 6.0,
                slow_speed: 2.0,
                hue_step: 0.5,
            },
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    pub orbit: BoneOrbitConfig,
    pub repel: KeypointRepelConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BoneOrbitConfig {
    pub target_distance: f32,
    pub tolerance: f32,
    pub radial_strength: f32,
    pub tangential_strength: f32,
    pub jitter: f32,
    /// Jitter applied when nobody is in view.
    pub idle_jitter: f32,
    pub confidence: f32,
}

impl Default for BoneOrbitConfig {
    fn default() -> Self {
        Self {
            target_distance: 30.0,
            tolerance: 10.0,
            radial_strength: 0.5,
            tangential_strength: 0.3,
            jitter: 0.3,
            idle_jitter: 0.2,
            confidence: 0.2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeypointRepelConfig {
    pub radius: f32,
    pub strength: f32,
    pub jitter: f32,
    pub confidence: f32,
}

impl Default for KeypointRepelConfig {
    fn default() -> Self {
        Self {
            radius: 150.0,
            strength: 1.0,
            jitter: 0.1,
            confidence: 0.2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstellationConfig {
    pub points: usize,
    pub initial_speed: f32,
    pub noise_gain: f32,
    pub min_noise_speed: f32,
    pub max_noise_speed: f32,
    pub attraction_range: f32,
    pub near_attraction: f32,
    pub far_attraction: f32,
    pub damping: f32,
    pub max_speed: f32,
    pub link_distance: f32,
    pub tether_range: f32,
    pub confidence: f32,
    pub tether_confidence: f32,
}

impl Default for ConstellationConfig {
    fn default() -> Self {
        Self {
            points: 50,
            initial_speed: 1.0,
            noise_gain: 0.1,
            min_noise_speed: 0.002,
            max_noise_speed: 0.005,
            attraction_range: 200.0,
            near_attraction: 0.5,
            far_attraction: 0.05,
            damping: 0.95,
            max_speed: 3.0,
            link_distance: 250.0,
            tether_range: 200.0,
            confidence: 0.2,
            tether_confidence: 0.3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MosaicConfig {
    pub cell_size: f32,
    /// Share of grid positions that become cells.
    pub density: f32,
    pub falloff_distance: f32,
    pub near_alpha: f32,
    pub far_alpha: f32,
    /// Frames between colour refreshes of one cell.
    pub refresh_interval: u32,
    /// Upper bound of the random initial stagger counter. Has no effect
    /// while `refresh_interval` is 1.
    pub stagger: u32,
    pub confidence: f32,
    /// Gate each cell on and off with its own randomised countdown.
    pub toggle: bool,
    pub min_toggle_frames: u32,
    pub max_toggle_frames: u32,
}

impl Default for MosaicConfig {
    fn default() -> Self {
        Self {
            cell_size: 20.0,
            density: 0.15,
            falloff_distance: 150.0,
            near_alpha: 200.0,
            far_alpha: 40.0,
            refresh_interval: 1,
            stagger: 60,
            confidence: 0.2,
            toggle: false,
            min_toggle_frames: 30,
            max_toggle_frames: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    pub initial_count: usize,
    pub min_count: usize,
    pub max_count: usize,
    pub min_radius: f32,
    pub max_radius: f32,
    pub min_layers: u32,
    pub max_layers: u32,
    pub drift_speed: f32,
    pub max_spin: f32,
    /// Fraction of the current radius within which a strike lands.
    pub hit_ratio: f32,
    pub confidence: f32,
    pub launch_speed: f32,
    pub gravity: f32,
    pub friction: f32,
    pub ease: f32,
    pub min_pulse_frames: u32,
    pub max_pulse_frames: u32,
    pub population_interval: u32,
    pub spawn_probability: f64,
    pub lightning_range: f32,
    pub lightning_frames: u32,
    pub min_lightning_interval: u32,
    pub max_lightning_interval: u32,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            initial_count: 3,
            min_count: 1,
            max_count: 6,
            min_radius: 40.0,
            max_radius: 90.0,
            min_layers: 3,
            max_layers: 6,
            drift_speed: 1.0,
            max_spin: 0.03,
            hit_ratio: 0.6,
            confidence: 0.3,
            launch_speed: 14.0,
            gravity: 0.4,
            friction: 0.99,
            ease: 0.05,
            min_pulse_frames: 60,
            max_pulse_frames: 180,
            population_interval: 300,
            spawn_probability: 0.5,
            lightning_range: 300.0,
            lightning_frames: 6,
            min_lightning_interval: 45,
            max_lightning_interval: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaintingConfig {
    pub trail_length: usize,
    pub trail_confidence: f32,
    pub spray_confidence: f32,
    pub glow_confidence: f32,
    pub throw_speed: f32,
    pub max_throw_speed: f32,
    pub splatter_gravity: f32,
    pub splatter_drag: f32,
    pub splatter_fade: f32,
    pub drop_gravity: f32,
    pub drop_fade: f32,
    pub drop_growth: f32,
    pub hand_drip_chance: f64,
    pub trail_drip_chance: f64,
    pub spray_every: u32,
    pub glow_every: u32,
    pub blotches: usize,
}

impl Default for PaintingConfig {
    fn default() -> Self {
        Self {
            trail_length: 30,
            trail_confidence: 0.4,
            spray_confidence: 0.3,
            glow_confidence: 0.5,
            throw_speed: 15.0,
            max_throw_speed: 50.0,
            splatter_gravity: 0.15,
            splatter_drag: 0.98,
            splatter_fade: 1.5,
            drop_gravity: 0.1,
            drop_fade: 0.5,
            drop_growth: 0.1,
            hand_drip_chance: 0.15,
            trail_drip_chance: 0.02,
            spray_every: 2,
            glow_every: 4,
            blotches: 15,
        }
    }
}

/// Pose-to-sound mappings. Heights are expressed as a fraction of the canvas
/// height so the same config works at any resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub confidence: f32,
    pub movement_tempo: MappingRange,
    pub hand_tempo: MappingRange,
    pub arp_interval: MappingRange,
    pub arp_degree: MappingRange,
    pub arp_volume: MappingRange,
    pub melody_arp_step: MappingRange,
    pub reverb_wet: MappingRange,
    pub brightness: MappingRange,
    pub bass_movement: f32,
    pub bass_every: u32,
    pub arp_every: u32,
    pub melody_arp_every: u32,
    pub arp_spacing: f32,
    pub melody_bpm: f32,
    pub swan_bpm: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            confidence: 0.3,
            movement_tempo: MappingRange::new([0.0, 30.0], [60.0, 180.0]),
            hand_tempo: MappingRange::new([50.0, 500.0], [60.0, 180.0]),
            arp_interval: MappingRange::new([50.0, 500.0], [1.0, 12.0]),
            arp_degree: MappingRange::new([0.0, 1.0], [7.0, 0.0]),
            arp_volume: MappingRange::new([50.0, 500.0], [-30.0, -8.0]),
            melody_arp_step: MappingRange::new([50.0, 500.0], [0.0, 15.0]),
            reverb_wet: MappingRange::new([0.5, 3.0], [0.1, 0.95]),
            brightness: MappingRange::new([0.0, 1.0], [5.0, 0.1]),
            bass_movement: 5.0,
            bass_every: 10,
            arp_every: 8,
            melody_arp_every: 10,
            arp_spacing: 0.05,
            melody_bpm: 120.0,
            swan_bpm: 100.0,
        }
    }
}
