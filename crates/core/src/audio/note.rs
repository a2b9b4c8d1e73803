use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Result, SketchError};

const NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// A pitch in scientific notation, e.g. `F#4`. Flats are accepted on input
/// and normalised to sharps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Note {
    pitch_class: u8,
    octave: i8,
}

impl Note {
    pub fn new(pitch_class: u8, octave: i8) -> Self {
        Self {
            pitch_class: pitch_class % 12,
            octave,
        }
    }

    pub fn pitch_class(self) -> u8 {
        self.pitch_class
    }

    pub fn octave(self) -> i8 {
        self.octave
    }

    /// MIDI note number; `C4` is 60.
    pub fn midi(self) -> i32 {
        (self.octave as i32 + 1) * 12 + self.pitch_class as i32
    }

    pub fn with_octave(self, octave: i8) -> Self {
        Self { octave, ..self }
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", NAMES[self.pitch_class as usize], self.octave)
    }
}

impl FromStr for Note {
    type Err = SketchError;

    fn from_str(s: &str) -> Result<Self> {
        let unknown = || SketchError::UnknownNote(s.to_string());
        let mut chars = s.chars();
        let letter = chars.next().ok_or_else(unknown)?;
        let base: i8 = match letter.to_ascii_uppercase() {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            _ => return Err(unknown()),
        };
        let rest = chars.as_str();
        let (shift, octave) = if let Some(octave) = rest.strip_prefix('#') {
            (1, octave)
        } else if let Some(octave) = rest.strip_prefix('b') {
            (-1, octave)
        } else {
            (0, rest)
        };
        let mut octave: i8 = octave.parse().map_err(|_| unknown())?;
        let mut pitch = base + shift;
        if pitch < 0 {
            pitch += 12;
            octave = octave.checked_sub(1).ok_or_else(unknown)?;
        } else if pitch > 11 {
            pitch -= 12;
            octave = octave.checked_add(1).ok_or_else(unknown)?;
        }
        Ok(Self::new(pitch as u8, octave))
    }
}

impl TryFrom<String> for Note {
    type Error = SketchError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Note> for String {
    fn from(note: Note) -> Self {
        note.to_string()
    }
}

/// Tempo-relative note length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoteValue {
    #[serde(rename = "2n")]
    Half,
    #[serde(rename = "4n")]
    Quarter,
    #[serde(rename = "8n")]
    Eighth,
    #[serde(rename = "16n")]
    Sixteenth,
    #[serde(rename = "32n")]
    ThirtySecond,
}

impl NoteValue {
    fn divisions(self) -> f32 {
        match self {
            NoteValue::Half => 2.0,
            NoteValue::Quarter => 4.0,
            NoteValue::Eighth => 8.0,
            NoteValue::Sixteenth => 16.0,
            NoteValue::ThirtySecond => 32.0,
        }
    }

    /// Length in seconds at `bpm` quarter notes per minute.
    pub fn seconds(self, bpm: f32) -> f32 {
        60.0 / bpm.max(1.0) * 4.0 / self.divisions()
    }
}

impl fmt::Display for NoteValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}n", self.divisions() as u32)
    }
}

/// Parses a list of note names, e.g. `["E4", "F#4"]`.
pub fn notes(names: &[&str]) -> Result<Vec<Note>> {
    names.iter().map(|name| name.parse()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scientific_pitch() {
        let note: Note = "F#4".parse().unwrap();
        assert_eq!(note.midi(), 66);
        assert_eq!(note.to_string(), "F#4");
        assert_eq!("C4".parse::<Note>().unwrap().midi(), 60);
        assert_eq!("A4".parse::<Note>().unwrap().midi(), 69);
        assert_eq!("G1".parse::<Note>().unwrap().midi(), 31);
    }

    #[test]
    fn flats_normalise_to_sharps() {
        assert_eq!("Bb3".parse::<Note>().unwrap().to_string(), "A#3");
        assert_eq!("Cb4".parse::<Note>().unwrap().to_string(), "B3");
        assert_eq!("B#3".parse::<Note>().unwrap().to_string(), "C4");
    }

    #[test]
    fn rejects_garbage() {
        for bad in ["", "H4", "C", "C#", "E#x", "C128"] {
            assert!(matches!(bad.parse::<Note>(), Err(SketchError::UnknownNote(_))), "{bad}");
        }
    }

    #[test]
    fn accidentals_at_the_octave_limits_are_rejected() {
        for bad in ["Cb-128", "B#127"] {
            assert!(matches!(bad.parse::<Note>(), Err(SketchError::UnknownNote(_))), "{bad}");
        }
        assert_eq!("Cb127".parse::<Note>().unwrap().to_string(), "B126");
        assert_eq!("B#-128".parse::<Note>().unwrap().to_string(), "C-127");
        assert!(serde_json::from_str::<Note>(r#""B#127""#).is_err());
    }

    #[test]
    fn octave_shifts() {
        let note: Note = "E4".parse().unwrap();
        assert_eq!(note.with_octave(2).to_string(), "E2");
        assert_eq!(note.with_octave(3).midi(), note.midi() - 12);
    }

    #[test]
    fn note_values_scale_with_tempo() {
        assert_eq!(NoteValue::Quarter.seconds(120.0), 0.5);
        assert!((NoteValue::Eighth.seconds(100.0) - 0.3).abs() < 1e-6);
        assert_eq!(NoteValue::Half.seconds(60.0), 2.0);
        assert_eq!(NoteValue::ThirtySecond.to_string(), "32n");
    }

    #[test]
    fn serialises_as_names() {
        let json = serde_json::to_string(&("G4".parse::<Note>().unwrap(), NoteValue::Sixteenth))
            .unwrap();
        assert_eq!(json, r#"["G4","16n"]"#);
        let back: (Note, NoteValue) = serde_json::from_str(&json).unwrap();
        assert_eq!(back.1, NoteValue::Sixteenth);
        assert!(serde_json::from_str::<Note>(r#""Q9""#).is_err());
    }
}
