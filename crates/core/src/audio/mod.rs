//! Pose-driven music control.
//!
//! Nothing here synthesises sound. The reactors turn skeleton features into
//! [`AudioCommand`]s and hand them to an [`AudioSink`]; a synth backend, a
//! log file or a test can sit behind the sink.

mod note;
mod reactor;

use serde::{Deserialize, Serialize};

use crate::Result;

pub use note::{notes, Note, NoteValue};
pub use reactor::{AudioReactor, Flavour};

/// Instrument a command is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Voice {
    Melody,
    Bass,
    Arp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AudioCommand {
    /// Audio context unlocked by a user gesture.
    Start,
    Trigger {
        voice: Voice,
        note: Note,
        value: NoteValue,
        /// Delay in seconds relative to now.
        offset: f32,
    },
    SetTempo {
        bpm: f32,
    },
    SetVolume {
        voice: Voice,
        db: f32,
    },
    SetReverbWet {
        wet: f32,
    },
    SetEnvelope {
        voice: Voice,
        decay: f32,
        release: f32,
    },
}

impl AudioCommand {
    pub fn trigger(voice: Voice, note: Note, value: NoteValue) -> Self {
        AudioCommand::Trigger {
            voice,
            note,
            value,
            offset: 0.0,
        }
    }
}

/// Destination for audio commands.
pub trait AudioSink {
    fn send(&mut self, command: AudioCommand) -> Result<()>;
}

/// Sink that keeps every command in memory.
#[derive(Debug, Clone, Default)]
pub struct CommandLog {
    commands: Vec<AudioCommand>,
}

impl CommandLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[AudioCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Drains the log, leaving it empty.
    pub fn take(&mut self) -> Vec<AudioCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Notes triggered on `voice`, in order.
    pub fn triggered(&self, voice: Voice) -> Vec<Note> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                AudioCommand::Trigger { voice: v, note, .. } if *v == voice => Some(*note),
                _ => None,
            })
            .collect()
    }
}

impl AudioSink for CommandLog {
    fn send(&mut self, command: AudioCommand) -> Result<()> {
        self.commands.push(command);
        Ok(())
    }
}

/// Audio stays silent until a user gesture opens the gate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AudioGate {
    open: bool,
}

impl AudioGate {
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Opens the gate, emitting `Start` the first time only. Returns whether
    /// this call opened it.
    pub fn start(&mut self, sink: &mut dyn AudioSink) -> Result<bool> {
        if self.open {
            return Ok(false);
        }
        sink.send(AudioCommand::Start)?;
        self.open = true;
        tracing::info!("audio started");
        Ok(true)
    }
}

/// One note fired by the sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    /// Position in the phrase.
    pub index: usize,
    pub note: Note,
    pub value: NoteValue,
}

/// Looping phrase advanced on a fixed rhythmic grid. The first note sounds
/// as soon as the sequencer starts.
#[derive(Debug, Clone)]
pub struct Sequencer {
    phrase: Vec<(Note, NoteValue)>,
    grid: NoteValue,
    index: usize,
    until_next: f32,
}

impl Sequencer {
    pub fn new(phrase: Vec<(Note, NoteValue)>, grid: NoteValue) -> Self {
        Self {
            phrase,
            grid,
            index: 0,
            until_next: 0.0,
        }
    }

    pub fn len(&self) -> usize {
        self.phrase.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phrase.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Advances by `dt` seconds at `bpm`, returning the notes that fell due.
    pub fn advance(&mut self, dt: f32, bpm: f32) -> Vec<Step> {
        let mut fired = Vec::new();
        if self.phrase.is_empty() {
            return fired;
        }
        let step = self.grid.seconds(bpm);
        while self.until_next <= 0.0 {
            let (note, value) = self.phrase[self.index];
            fired.push(Step {
                index: self.index,
                note,
                value,
            });
            self.index = (self.index + 1) % self.phrase.len();
            self.until_next += step;
        }
        self.until_next -= dt;
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phrase() -> Vec<(Note, NoteValue)> {
        notes(&["C4", "D4", "E4"])
            .unwrap()
            .into_iter()
            .map(|n| (n, NoteValue::Quarter))
            .collect()
    }

    #[test]
    fn gate_emits_start_once() {
        let mut gate = AudioGate::default();
        let mut log = CommandLog::new();
        assert!(!gate.is_open());
        assert!(gate.start(&mut log).unwrap());
        assert!(!gate.start(&mut log).unwrap());
        assert!(gate.is_open());
        assert_eq!(log.commands(), &[AudioCommand::Start]);
    }

    #[test]
    fn sequencer_fires_on_the_grid() {
        let mut sequencer = Sequencer::new(phrase(), NoteValue::Quarter);
        // 120 BPM quarter notes are 0.5 s apart; eight frames of 0.125 s.
        let fired: Vec<usize> = (0..9)
            .flat_map(|_| sequencer.advance(0.125, 120.0))
            .map(|step| step.index)
            .collect();
        assert_eq!(fired, vec![0, 1, 2]);
        assert_eq!(sequencer.index(), 0);
    }

    #[test]
    fn long_frames_catch_up() {
        let mut sequencer = Sequencer::new(phrase(), NoteValue::Eighth);
        sequencer.advance(0.0, 120.0);
        // A one second hitch at 120 BPM spans four eighth notes.
        let fired = sequencer.advance(1.0, 120.0);
        assert!(fired.is_empty());
        let fired = sequencer.advance(0.0, 120.0);
        assert_eq!(fired.len(), 4);
    }

    #[test]
    fn empty_phrase_is_silent() {
        let mut sequencer = Sequencer::new(Vec::new(), NoteValue::Quarter);
        assert!(sequencer.advance(10.0, 120.0).is_empty());
    }

    #[test]
    fn commands_serialise_tagged() {
        let command = AudioCommand::Trigger {
            voice: Voice::Arp,
            note: "C5".parse().unwrap(),
            value: NoteValue::ThirtySecond,
            offset: 0.05,
        };
        let json = serde_json::to_string(&command).unwrap();
        assert_eq!(
            json,
            r#"{"type":"trigger","voice":"arp","note":"C5","value":"32n","offset":0.05}"#
        );
        assert_eq!(
            serde_json::to_string(&AudioCommand::Start).unwrap(),
            r#"{"type":"start"}"#
        );
    }
}
