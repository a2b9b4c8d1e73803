use rand::{rngs::SmallRng, seq::SliceRandom};
use serde::{Deserialize, Serialize};

use super::{notes, AudioCommand, AudioSink, Note, NoteValue, Sequencer, Voice};
use crate::{
    config::AudioConfig,
    mapping::{MotionTracker, PoseFeatures},
    pose::Skeleton,
    timeline::Countdown,
    Result,
};

const MELODY: [&str; 16] = [
    "E4", "F#4", "G4", "A4", "B4", "C5", "B4", "A4", "G4", "F#4", "E4", "D4", "E4", "F#4", "G4",
    "A4",
];

const SWAN_LAKE: [(&str, NoteValue); 23] = [
    ("B4", NoteValue::Quarter),
    ("A4", NoteValue::Eighth),
    ("G4", NoteValue::Eighth),
    ("A4", NoteValue::Quarter),
    ("G4", NoteValue::Eighth),
    ("F#4", NoteValue::Eighth),
    ("G4", NoteValue::Quarter),
    ("E4", NoteValue::Quarter),
    ("G4", NoteValue::Quarter),
    ("F#4", NoteValue::Eighth),
    ("E4", NoteValue::Eighth),
    ("F#4", NoteValue::Quarter),
    ("E4", NoteValue::Eighth),
    ("D4", NoteValue::Eighth),
    ("E4", NoteValue::Quarter),
    ("C4", NoteValue::Quarter),
    ("B4", NoteValue::Quarter),
    ("A4", NoteValue::Eighth),
    ("G4", NoteValue::Eighth),
    ("A4", NoteValue::Quarter),
    ("G4", NoteValue::Eighth),
    ("F#4", NoteValue::Eighth),
    ("G4", NoteValue::Half),
];

const BASS_NOTES: [&str; 5] = ["G1", "C2", "D2", "E2", "F2"];
const ARP_SCALE: [&str; 8] = ["C4", "D4", "E4", "F#4", "G4", "A4", "B4", "C5"];
const ARP_LENGTH: usize = 4;

/// Which of the two musical behaviours a reactor follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flavour {
    /// Hand spread sets the tempo of a looping melody with a bass line and a
    /// hand-picked arpeggio note.
    Melody,
    /// A sequenced ballet theme whose tempo, envelope, arpeggio and reverb
    /// follow the whole body.
    Swan,
}

/// Only forwards a continuous parameter when it has moved noticeably.
#[derive(Debug, Clone, Copy)]
struct Control {
    last: Option<f32>,
    step: f32,
}

impl Control {
    fn new(step: f32) -> Self {
        Self { last: None, step }
    }

    fn update(&mut self, value: f32) -> Option<f32> {
        match self.last {
            Some(last) if (last - value).abs() < self.step => None,
            _ => {
                self.last = Some(value);
                Some(value)
            }
        }
    }
}

/// Maps per-frame pose features onto audio commands.
#[derive(Debug, Clone)]
pub struct AudioReactor {
    flavour: Flavour,
    config: AudioConfig,
    sequencer: Sequencer,
    melody: Vec<Note>,
    bass_notes: Vec<Note>,
    scale: Vec<Note>,
    tracker: MotionTracker,
    tempo: f32,
    bass: Countdown,
    arp: Countdown,
    tempo_control: Control,
    volume_control: Control,
    reverb_control: Control,
    envelope_control: Control,
}

impl AudioReactor {
    pub fn new(flavour: Flavour, config: AudioConfig) -> Result<Self> {
        let melody = notes(&MELODY)?;
        let (sequencer, tempo, arp_every) = match flavour {
            Flavour::Melody => {
                let phrase = melody.iter().map(|n| (*n, NoteValue::Eighth)).collect();
                (
                    Sequencer::new(phrase, NoteValue::Quarter),
                    config.melody_bpm,
                    config.melody_arp_every,
                )
            }
            Flavour::Swan => {
                let phrase = SWAN_LAKE
                    .iter()
                    .map(|(name, value)| Ok((name.parse::<Note>()?, *value)))
                    .collect::<Result<Vec<_>>>()?;
                (
                    Sequencer::new(phrase, NoteValue::Eighth),
                    config.swan_bpm,
                    config.arp_every,
                )
            }
        };

        Ok(Self {
            flavour,
            sequencer,
            melody,
            bass_notes: notes(&BASS_NOTES)?,
            scale: notes(&ARP_SCALE)?,
            tracker: MotionTracker::new(config.confidence),
            tempo,
            bass: Countdown::new(config.bass_every),
            arp: Countdown::new(arp_every),
            tempo_control: Control::new(1.0),
            volume_control: Control::new(0.5),
            reverb_control: Control::new(0.01),
            envelope_control: Control::new(0.05),
            config,
        })
    }

    pub fn flavour(&self) -> Flavour {
        self.flavour
    }

    pub fn tempo(&self) -> f32 {
        self.tempo
    }

    /// Runs one frame. `skeleton` is in camera coordinates; `dt` is the frame
    /// duration in seconds.
    pub fn tick(
        &mut self,
        skeleton: Option<&Skeleton>,
        frame_height: f32,
        dt: f32,
        rng: &mut SmallRng,
        sink: &mut dyn AudioSink,
    ) -> Result<()> {
        match self.flavour {
            Flavour::Melody => self.tick_melody(skeleton, frame_height, dt, sink),
            Flavour::Swan => self.tick_swan(skeleton, frame_height, dt, rng, sink),
        }
    }

    fn tick_melody(
        &mut self,
        skeleton: Option<&Skeleton>,
        frame_height: f32,
        dt: f32,
        sink: &mut dyn AudioSink,
    ) -> Result<()> {
        let config = &self.config;
        let arp_due = self.arp.tick();
        let hands = skeleton
            .map(|s| PoseFeatures::measure(s, config.confidence, frame_height, None))
            .and_then(|features| features.hand_distance);

        self.tempo = match hands {
            Some(distance) => config.hand_tempo.apply(distance),
            None => config.melody_bpm,
        };
        if let Some(distance) = hands.filter(|_| arp_due) {
            let last = self.melody.len().saturating_sub(1);
            let index = (config.melody_arp_step.apply(distance).floor().max(0.0) as usize).min(last);
            if let Some(note) = self.melody.get(index) {
                sink.send(AudioCommand::trigger(Voice::Arp, *note, NoteValue::Sixteenth))?;
            }
        }
        self.send_tempo(sink)?;

        for step in self.sequencer.advance(dt, self.tempo) {
            sink.send(AudioCommand::trigger(Voice::Melody, step.note, NoteValue::Eighth))?;
            if step.index % 4 == 0 {
                sink.send(AudioCommand::trigger(
                    Voice::Bass,
                    step.note.with_octave(2),
                    NoteValue::Quarter,
                ))?;
            }
        }
        Ok(())
    }

    fn tick_swan(
        &mut self,
        skeleton: Option<&Skeleton>,
        frame_height: f32,
        dt: f32,
        rng: &mut SmallRng,
        sink: &mut dyn AudioSink,
    ) -> Result<()> {
        let bass_due = self.bass.tick();
        let arp_due = self.arp.tick();

        if let Some(skeleton) = skeleton {
            let movement = self.tracker.update(skeleton);
            let features =
                PoseFeatures::measure(skeleton, self.config.confidence, frame_height, movement);
            self.follow_body(&features, bass_due, rng, sink)?;
            self.follow_hands(&features, arp_due, sink)?;
            if let Some(ratio) = features.spread_ratio {
                if let Some(wet) = self.reverb_control.update(self.config.reverb_wet.apply(ratio)) {
                    sink.send(AudioCommand::SetReverbWet { wet })?;
                }
            }
        }

        for step in self.sequencer.advance(dt, self.tempo) {
            sink.send(AudioCommand::trigger(Voice::Melody, step.note, step.value))?;
        }
        Ok(())
    }

    /// Movement drives tempo and bass hits; mean height drives the envelope.
    fn follow_body(
        &mut self,
        features: &PoseFeatures,
        bass_due: bool,
        rng: &mut SmallRng,
        sink: &mut dyn AudioSink,
    ) -> Result<()> {
        let Some(movement) = features.movement else {
            return Ok(());
        };
        self.tempo = self.config.movement_tempo.apply(movement);
        self.send_tempo(sink)?;

        if bass_due && movement > self.config.bass_movement {
            if let Some(note) = self.bass_notes.choose(rng) {
                sink.send(AudioCommand::trigger(Voice::Bass, *note, NoteValue::Sixteenth))?;
            }
        }

        if let Some(height) = features.body_height {
            let decay = self.config.brightness.apply(height);
            if self.envelope_control.update(decay).is_some() {
                sink.send(AudioCommand::SetEnvelope {
                    voice: Voice::Melody,
                    decay,
                    release: decay * 2.0,
                })?;
            }
        }
        Ok(())
    }

    /// Hand spread picks the arpeggio interval and volume; hand height picks
    /// its root on the scale.
    fn follow_hands(
        &mut self,
        features: &PoseFeatures,
        arp_due: bool,
        sink: &mut dyn AudioSink,
    ) -> Result<()> {
        let (Some(distance), Some(height)) = (features.hand_distance, features.hand_height) else {
            return Ok(());
        };
        let config = &self.config;
        if arp_due {
            let interval = config.arp_interval.apply(distance).floor().clamp(1.0, 12.0) as usize;
            let len = self.scale.len();
            let root = (config.arp_degree.apply(height).floor().max(0.0) as usize).min(len - 1);
            for i in 0..ARP_LENGTH {
                let note = self.scale[(root + i * interval) % len];
                sink.send(AudioCommand::Trigger {
                    voice: Voice::Arp,
                    note,
                    value: NoteValue::ThirtySecond,
                    offset: i as f32 * config.arp_spacing,
                })?;
            }
        }
        if let Some(db) = self.volume_control.update(config.arp_volume.apply(distance)) {
            sink.send(AudioCommand::SetVolume {
                voice: Voice::Arp,
                db,
            })?;
        }
        Ok(())
    }

    fn send_tempo(&mut self, sink: &mut dyn AudioSink) -> Result<()> {
        if let Some(bpm) = self.tempo_control.update(self.tempo) {
            tracing::trace!(bpm, "tempo changed");
            sink.send(AudioCommand::SetTempo { bpm })?;
        }
        Ok(())
    }
}
