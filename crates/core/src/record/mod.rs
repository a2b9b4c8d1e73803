use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    audio::{AudioCommand, AudioSink},
    render::Raster,
    Result,
};

/// Configuration options for the recording subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingSettings {
    pub output_dir: PathBuf,
    /// Write one PNG every `every` frames.
    pub every: u32,
    /// Also write the audio command stream as JSON lines.
    pub audio_log: bool,
}

impl Default for RecordingSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("frames"),
            every: 1,
            audio_log: true,
        }
    }
}

#[derive(Serialize)]
struct AudioLine<'a> {
    frame: u64,
    #[serde(flatten)]
    command: &'a AudioCommand,
}

/// Dumps rendered frames as numbered PNG files and audio commands as JSON
/// lines into one output directory.
#[derive(Debug)]
pub struct Recorder {
    settings: RecordingSettings,
    is_recording: bool,
    frame: u64,
    frames_written: u64,
    audio: Option<BufWriter<File>>,
}

impl Recorder {
    pub const AUDIO_LOG: &'static str = "audio.jsonl";

    pub fn new(settings: RecordingSettings) -> Self {
        Self {
            settings,
            is_recording: false,
            frame: 0,
            frames_written: 0,
            audio: None,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.settings.output_dir
    }

    pub fn start(&mut self) -> Result<()> {
        let dir = &self.settings.output_dir;
        std::fs::create_dir_all(dir)?;
        if self.settings.audio_log {
            let file = File::create(dir.join(Self::AUDIO_LOG))?;
            self.audio = Some(BufWriter::new(file));
        }
        self.is_recording = true;
        tracing::info!(dir = ?dir, every = self.settings.every, "recording started");
        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        if let Some(mut audio) = self.audio.take() {
            audio.flush()?;
        }
        if self.is_recording {
            tracing::info!(frames = self.frames_written, "recording stopped");
        }
        self.is_recording = false;
        Ok(())
    }

    pub fn is_recording(&self) -> bool {
        self.is_recording
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Frame that subsequent audio commands are stamped with.
    pub fn set_frame(&mut self, frame: u64) {
        self.frame = frame;
    }

    pub fn frame_path(&self, frame: u64) -> PathBuf {
        self.settings
            .output_dir
            .join(format!("frame_{frame:05}.png"))
    }

    /// Writes `raster` when `frame` falls on the capture interval. Returns
    /// the written path.
    pub fn capture(&mut self, frame: u64, raster: &Raster) -> Result<Option<PathBuf>> {
        let every = u64::from(self.settings.every.max(1));
        if !self.is_recording || frame % every != 0 {
            return Ok(None);
        }
        let path = self.frame_path(frame);
        raster.save_png(&path)?;
        self.frames_written += 1;
        tracing::debug!(?path, "frame written");
        Ok(Some(path))
    }
}

impl AudioSink for Recorder {
    fn send(&mut self, command: AudioCommand) -> Result<()> {
        let Some(audio) = self.audio.as_mut() else {
            return Ok(());
        };
        let line = AudioLine {
            frame: self.frame,
            command: &command,
        };
        serde_json::to_writer(&mut *audio, &line)?;
        audio.write_all(b"\n")?;
        Ok(())
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            tracing::warn!(%err, "failed to finish recording");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::Voice;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("posefield-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn writes_every_nth_frame() {
        let dir = scratch("frames");
        let mut recorder = Recorder::new(RecordingSettings {
            output_dir: dir.clone(),
            every: 3,
            audio_log: false,
        });
        let raster = Raster::new(8, 6);
        assert_eq!(recorder.capture(0, &raster).unwrap(), None);

        recorder.start().unwrap();
        let written: Vec<_> = (0..7)
            .filter_map(|frame| recorder.capture(frame, &raster).unwrap())
            .collect();
        recorder.stop().unwrap();

        assert_eq!(written.len(), 3);
        assert_eq!(written[1], dir.join("frame_00003.png"));
        assert!(written.iter().all(|path| path.exists()));
        assert!(!dir.join(Recorder::AUDIO_LOG).exists());
        assert_eq!(recorder.frames_written(), 3);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn audio_commands_become_json_lines() {
        let dir = scratch("audio");
        let mut recorder = Recorder::new(RecordingSettings {
            output_dir: dir.clone(),
            ..Default::default()
        });
        recorder.start().unwrap();
        recorder.send(AudioCommand::Start).unwrap();
        recorder.set_frame(12);
        recorder
            .send(AudioCommand::SetVolume {
                voice: Voice::Arp,
                db: -12.0,
            })
            .unwrap();
        recorder.stop().unwrap();

        let text = std::fs::read_to_string(dir.join(Recorder::AUDIO_LOG)).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], r#"{"frame":0,"type":"start"}"#);
        assert_eq!(
            lines[1],
            r#"{"frame":12,"type":"set_volume","voice":"arp","db":-12.0}"#
        );
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
