//! Scene composition: which layers a sketch stacks, what it paints behind
//! them and which audio reactor (if any) listens to the body.

use std::{fmt, str::FromStr};

use rand::{rngs::SmallRng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::{
    audio::{AudioGate, AudioReactor, AudioSink, Flavour},
    config::AppConfig,
    field::{BoneOrbit, KeypointRepel},
    layers::{
        Constellation, FrameInput, Layer, Mosaic, Painting, PortalField, SkeletonOverlay,
    },
    math::Bounds,
    particles::ParticleSystem,
    pose::Skeleton,
    render::{Canvas, Color},
    timeline::FrameClock,
    video::VideoFrame,
    Result, SketchError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneKind {
    /// Particles repelled by the body over a faded camera image.
    Drift,
    /// Video mosaic, drifting point graph and orbiting particles with a
    /// hand-driven melody.
    Constellation,
    /// Accumulating brush strokes and a ballet theme following the body.
    Painting,
    /// Pulsating portals to knock out of the frame.
    Portals,
}

impl SceneKind {
    pub const ALL: [SceneKind; 4] = [
        SceneKind::Drift,
        SceneKind::Constellation,
        SceneKind::Painting,
        SceneKind::Portals,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SceneKind::Drift => "drift",
            SceneKind::Constellation => "constellation",
            SceneKind::Painting => "painting",
            SceneKind::Portals => "portals",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            SceneKind::Drift => "particles flee the body over the camera image",
            SceneKind::Constellation => "mosaic, point graph and orbiting swarm with melody",
            SceneKind::Painting => "brush trails, splatters and drips with a ballet theme",
            SceneKind::Portals => "strike the portals out of the frame",
        }
    }
}

impl fmt::Display for SceneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SceneKind {
    type Err = SketchError;

    fn from_str(s: &str) -> Result<Self> {
        SceneKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| SketchError::msg(format!("unknown scene `{s}`")))
    }
}

/// What gets painted before the layers each frame.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Backdrop {
    /// Opaque clear.
    Solid(Color),
    /// Translucent wash that leaves trails, with the camera image on top.
    Fade { wash: Color, video_alpha: u8 },
    /// Painted on the first frame only; afterwards marks accumulate.
    Once { color: Color, painted: bool },
}

impl Backdrop {
    fn paint(&mut self, canvas: &mut dyn Canvas, video: Option<&VideoFrame>, mirror: bool) {
        match self {
            Backdrop::Solid(color) => canvas.background(*color),
            Backdrop::Fade { wash, video_alpha } => {
                canvas.background(*wash);
                if let Some(frame) = video {
                    canvas.video(frame, *video_alpha, mirror);
                }
            }
            Backdrop::Once { color, painted } => {
                if !*painted {
                    canvas.background(*color);
                    *painted = true;
                }
            }
        }
    }

    fn repaint(&mut self) {
        if let Backdrop::Once { painted, .. } = self {
            *painted = false;
        }
    }
}

/// A running sketch: owns the frame size, the random stream, the clock, the
/// layer stack and the audio reactor.
pub struct Sketch {
    kind: SceneKind,
    bounds: Bounds,
    mirror: bool,
    rng: SmallRng,
    clock: FrameClock,
    backdrop: Backdrop,
    layers: Vec<Box<dyn Layer>>,
    audio: Option<AudioReactor>,
    gate: AudioGate,
}

impl Sketch {
    pub fn new(kind: SceneKind, config: &AppConfig) -> Result<Self> {
        config.validate()?;
        let bounds = config.bounds();
        let mut rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        let overlay = config.pose.overlay_confidence;

        let (backdrop, layers, audio): (Backdrop, Vec<Box<dyn Layer>>, Option<Flavour>) =
            match kind {
                SceneKind::Drift => (
                    Backdrop::Fade {
                        wash: Color::rgba(0, 0, 0, 20),
                        video_alpha: 50,
                    },
                    vec![
                        Box::new(SkeletonOverlay::new(overlay)),
                        Box::new(ParticleSystem::new(
                            &config.particles.repel,
                            Box::new(KeypointRepel::new(config.field.repel.clone())),
                            bounds,
                            &mut rng,
                        )),
                    ],
                    None,
                ),
                SceneKind::Constellation => (
                    Backdrop::Solid(Color::BLACK),
                    vec![
                        Box::new(Mosaic::new(config.mosaic.clone(), bounds, &mut rng)),
                        Box::new(Constellation::new(
                            config.constellation.clone(),
                            bounds,
                            &mut rng,
                        )),
                        Box::new(SkeletonOverlay::new(overlay)),
                        Box::new(ParticleSystem::new(
                            &config.particles.orbit,
                            Box::new(BoneOrbit::new(config.field.orbit.clone())),
                            bounds,
                            &mut rng,
                        )),
                    ],
                    Some(Flavour::Melody),
                ),
                SceneKind::Painting => (
                    Backdrop::Once {
                        color: Color::rgb(15, 10, 35),
                        painted: false,
                    },
                    vec![Box::new(Painting::new(
                        config.painting.clone(),
                        bounds,
                        &mut rng,
                    ))],
                    Some(Flavour::Swan),
                ),
                SceneKind::Portals => {
                    let mosaic = crate::config::MosaicConfig {
                        toggle: true,
                        ..config.mosaic.clone()
                    };
                    (
                        Backdrop::Solid(Color::BLACK),
                        vec![
                            Box::new(Mosaic::new(mosaic, bounds, &mut rng)),
                            Box::new(PortalField::new(config.portals.clone(), bounds, &mut rng)),
                            Box::new(ParticleSystem::new(
                                &config.particles.orbit,
                                Box::new(BoneOrbit::new(config.field.orbit.clone())),
                                bounds,
                                &mut rng,
                            )),
                        ],
                        None,
                    )
                }
            };

        let audio = audio
            .map(|flavour| AudioReactor::new(flavour, config.audio.clone()))
            .transpose()?;

        tracing::info!(
            scene = %kind,
            width = bounds.width,
            height = bounds.height,
            layers = layers.len(),
            "sketch ready"
        );

        Ok(Self {
            kind,
            bounds,
            mirror: config.canvas.mirror,
            rng,
            clock: FrameClock::new(config.canvas.fps as f32),
            backdrop,
            layers,
            audio,
            gate: AudioGate::default(),
        })
    }

    pub fn kind(&self) -> SceneKind {
        self.kind
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn frame(&self) -> u64 {
        self.clock.frame
    }

    pub fn layer_names(&self) -> Vec<&'static str> {
        self.layers.iter().map(|layer| layer.name()).collect()
    }

    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }

    pub fn audio_started(&self) -> bool {
        self.gate.is_open()
    }

    pub fn tempo(&self) -> Option<f32> {
        self.audio.as_ref().map(AudioReactor::tempo)
    }

    /// Advances every layer by one frame and draws the result.
    ///
    /// `skeleton` is the detector's latest snapshot in camera coordinates.
    /// It is mirrored once here when the display is mirrored, and every
    /// layer sees that same snapshot for the whole tick.
    pub fn tick(
        &mut self,
        skeleton: Option<&Skeleton>,
        video: Option<&VideoFrame>,
        canvas: &mut dyn Canvas,
        audio: &mut dyn AudioSink,
    ) -> Result<()> {
        let display = skeleton.map(|s| {
            if self.mirror {
                s.mirrored(self.bounds.width)
            } else {
                s.clone()
            }
        });
        let input = FrameInput::new(self.bounds, self.clock.frame)
            .with_skeleton(display.as_ref())
            .with_video(video);

        self.backdrop.paint(canvas, video, self.mirror);
        for layer in &mut self.layers {
            layer.update(&input, &mut self.rng);
            layer.draw(&input, canvas);
        }

        if let Some(reactor) = self.audio.as_mut().filter(|_| self.gate.is_open()) {
            reactor.tick(
                skeleton,
                self.bounds.height,
                self.clock.delta(),
                &mut self.rng,
                audio,
            )?;
        }

        self.clock.advance();
        Ok(())
    }

    /// First pointer press unlocks audio. Returns whether audio started.
    pub fn pointer_pressed(&mut self, audio: &mut dyn AudioSink) -> Result<bool> {
        if self.audio.is_none() {
            return Ok(false);
        }
        self.gate.start(audio)
    }

    pub fn resize(&mut self, bounds: Bounds) {
        self.bounds = bounds;
        self.backdrop.repaint();
        for layer in &mut self.layers {
            layer.resize(bounds, &mut self.rng);
        }
        tracing::info!(width = bounds.width, height = bounds.height, "sketch resized");
    }
}

impl fmt::Debug for Sketch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sketch")
            .field("kind", &self.kind)
            .field("bounds", &self.bounds)
            .field("frame", &self.clock.frame)
            .field("layers", &self.layer_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        audio::{AudioCommand, CommandLog},
        pose::{BodyPart, Keypoint},
        render::{DrawCommand, DrawList},
    };

    fn config() -> AppConfig {
        let mut config = AppConfig {
            seed: Some(42),
            ..Default::default()
        };
        config.canvas.width = 320.0;
        config.canvas.height = 240.0;
        config.particles.orbit.count = 50;
        config
    }

    #[test]
    fn parses_scene_names() {
        for kind in SceneKind::ALL {
            assert_eq!(kind.to_string().parse::<SceneKind>().unwrap(), kind);
        }
        assert_eq!("Portals".parse::<SceneKind>().unwrap(), SceneKind::Portals);
        assert!("disco".parse::<SceneKind>().is_err());
    }

    #[test]
    fn scenes_stack_their_layers() {
        let names = |kind| Sketch::new(kind, &config()).unwrap().layer_names();
        assert_eq!(names(SceneKind::Drift), ["skeleton", "particles"]);
        assert_eq!(
            names(SceneKind::Constellation),
            ["mosaic", "constellation", "skeleton", "particles"]
        );
        assert_eq!(names(SceneKind::Painting), ["painting"]);
        assert_eq!(names(SceneKind::Portals), ["mosaic", "portals", "particles"]);
    }

    #[test]
    fn audio_waits_for_the_pointer() {
        let mut sketch = Sketch::new(SceneKind::Painting, &config()).unwrap();
        let mut canvas = DrawList::new(sketch.bounds());
        let mut log = CommandLog::new();
        for _ in 0..10 {
            sketch.tick(None, None, &mut canvas, &mut log).unwrap();
        }
        assert!(log.is_empty());

        assert!(sketch.pointer_pressed(&mut log).unwrap());
        assert!(!sketch.pointer_pressed(&mut log).unwrap());
        sketch.tick(None, None, &mut canvas, &mut log).unwrap();
        assert_eq!(log.commands()[0], AudioCommand::Start);
        assert!(log.len() > 1);
    }

    #[test]
    fn silent_scenes_ignore_the_pointer() {
        let mut sketch = Sketch::new(SceneKind::Portals, &config()).unwrap();
        let mut log = CommandLog::new();
        assert!(!sketch.pointer_pressed(&mut log).unwrap());
        assert!(log.is_empty());
        assert_eq!(sketch.tempo(), None);
    }

    #[test]
    fn painting_backdrop_is_laid_once() {
        let mut sketch = Sketch::new(SceneKind::Painting, &config()).unwrap();
        let mut log = CommandLog::new();
        let backgrounds = |list: &DrawList| {
            list.count(|c| matches!(c, DrawCommand::Background { .. }))
        };

        let mut first = DrawList::new(sketch.bounds());
        sketch.tick(None, None, &mut first, &mut log).unwrap();
        assert_eq!(backgrounds(&first), 1);

        let mut second = DrawList::new(sketch.bounds());
        sketch.tick(None, None, &mut second, &mut log).unwrap();
        assert_eq!(backgrounds(&second), 0);

        sketch.resize(Bounds::new(160.0, 120.0));
        let mut third = DrawList::new(sketch.bounds());
        sketch.tick(None, None, &mut third, &mut log).unwrap();
        assert_eq!(backgrounds(&third), 1);
    }

    #[test]
    fn layers_see_the_mirrored_skeleton() {
        let mut sketch = Sketch::new(SceneKind::Drift, &config()).unwrap();
        let skeleton =
            Skeleton::from_keypoints([Keypoint::new(BodyPart::Nose, 20.0, 100.0, 0.9)]);
        let mut canvas = DrawList::new(sketch.bounds());
        sketch
            .tick(Some(&skeleton), None, &mut canvas, &mut CommandLog::new())
            .unwrap();
        let overlay_centres: Vec<_> = canvas
            .commands()
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Circle {
                    center, diameter, ..
                } if *diameter == 20.0 => Some(*center),
                _ => None,
            })
            .collect();
        assert!(overlay_centres.contains(&glam::Vec2::new(300.0, 100.0)));
        assert_eq!(sketch.frame(), 1);
    }

    #[test]
    fn same_seed_same_frames() {
        let render = || {
            let mut sketch = Sketch::new(SceneKind::Constellation, &config()).unwrap();
            let mut canvas = DrawList::new(sketch.bounds());
            for _ in 0..5 {
                canvas.clear();
                sketch
                    .tick(None, None, &mut canvas, &mut CommandLog::new())
                    .unwrap();
            }
            canvas.to_json().unwrap()
        };
        assert_eq!(render(), render());
    }
}
