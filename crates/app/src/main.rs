use std::{path::PathBuf, time::Duration};

use clap::{Parser, Subcommand};
use posefield_core::{
    pose::{NoPose, RecordedPoses, SyntheticDancer},
    AppConfig, AudioSink, CommandLog, Detector, LatestSkeleton, PoseRecording, PoseSource, Raster,
    Recorder, RecordingSettings, SceneKind, Sketch, VideoFrame,
};
use tracing_subscriber::EnvFilter;

fn main() -> posefield_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => run(args),
        Commands::Scenes => {
            for kind in SceneKind::ALL {
                println!("{:<14} {}", kind.name(), kind.description());
            }
            Ok(())
        }
        Commands::Config => {
            println!("{}", AppConfig::default().to_json_pretty()?);
            Ok(())
        }
    }
}

fn run(args: RunArgs) -> posefield_core::Result<()> {
    let mut config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    let bounds = config.bounds();
    tracing::info!(scene = %args.scene, frames = args.frames, poses = %args.poses, "starting run");

    let mut sketch = Sketch::new(args.scene, &config)?;
    let video = args.video.as_ref().map(VideoFrame::from_path).transpose()?;
    let mut raster = Raster::new(bounds.width as u32, bounds.height as u32);

    let mut recorder = Recorder::new(RecordingSettings {
        output_dir: args.output.clone().unwrap_or_default(),
        every: args.every,
        audio_log: true,
    });
    if args.output.is_some() {
        recorder.start()?;
    }
    let mut audio = CommandLog::new();
    let mut audio_commands = 0usize;

    let source = open_source(&args.poses, &config)?;
    let slot = LatestSkeleton::new();
    let (mut inline, detector) = if args.threaded {
        let interval = Duration::from_millis(config.pose.detect_interval_ms);
        (None, Some(Detector::spawn(source, slot.clone(), interval)))
    } else {
        (Some(source), None)
    };

    for frame in 0..args.frames {
        if let Some(source) = inline.as_mut() {
            match source.detect() {
                Some(batch) => slot.publish_batch(batch)?,
                None => slot.publish(None)?,
            }
        }

        if frame == 0 && args.audio && sketch.pointer_pressed(&mut audio)? {
            tracing::info!("pointer pressed, audio unlocked");
        }

        let snapshot = slot.snapshot();
        sketch.tick(snapshot.as_deref(), video.as_ref(), &mut raster, &mut audio)?;

        recorder.set_frame(frame);
        audio_commands += drain_audio(&mut audio, &mut recorder)?;
        recorder.capture(frame, &raster)?;
    }

    if let Some(detector) = detector {
        let detections = detector.stop()?;
        tracing::info!(detections, "detector finished");
    }
    recorder.stop()?;
    tracing::info!(
        frames = args.frames,
        written = recorder.frames_written(),
        audio_commands,
        "run complete"
    );
    Ok(())
}

/// Moves this frame's audio commands into the recorder's log when one is
/// open. Returns how many commands the frame produced.
fn drain_audio(audio: &mut CommandLog, recorder: &mut Recorder) -> posefield_core::Result<usize> {
    let commands = audio.take();
    let count = commands.len();
    if recorder.is_recording() {
        for command in commands {
            recorder.send(command)?;
        }
    }
    Ok(count)
}

/// `none`, `synthetic`, or a path to a JSON pose recording.
fn open_source(input: &str, config: &AppConfig) -> posefield_core::Result<Box<dyn PoseSource>> {
    let bounds = config.bounds();
    Ok(match input {
        "none" => Box::new(NoPose),
        "synthetic" => Box::new(SyntheticDancer::new(bounds, config.canvas.fps as f32)),
        path => {
            let recording = PoseRecording::load(path)?;
            tracing::info!(path, frames = recording.frames.len(), "pose recording loaded");
            Box::new(RecordedPoses::new(&recording, bounds, true))
        }
    })
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Pose-reactive generative sketches", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a scene headless for a number of frames.
    Run(RunArgs),
    /// List the available scenes.
    Scenes,
    /// Print the default configuration as JSON.
    Config,
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Scene to run.
    #[arg(short, long, default_value = "constellation", value_parser = parse_scene)]
    scene: SceneKind,
    /// Number of frames to simulate.
    #[arg(short, long, default_value_t = 300)]
    frames: u64,
    /// JSON configuration file; missing values fall back to defaults.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Pose input: `none`, `synthetic`, or a JSON pose recording.
    #[arg(short, long, default_value = "synthetic")]
    poses: String,
    /// Still image used as the camera frame.
    #[arg(long)]
    video: Option<PathBuf>,
    /// Directory for PNG frames and the audio command log.
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Write every Nth frame.
    #[arg(long, default_value_t = 1)]
    every: u32,
    /// Press the pointer on the first frame so audio starts.
    #[arg(long)]
    audio: bool,
    /// Run pose detection on a background thread.
    #[arg(long)]
    threaded: bool,
    /// Override the configured random seed.
    #[arg(long)]
    seed: Option<u64>,
}

fn parse_scene(value: &str) -> Result<SceneKind, String> {
    value.parse().map_err(|err: posefield_core::SketchError| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use posefield_core::AudioCommand;

    #[test]
    fn audio_is_counted_whether_or_not_it_is_recorded() {
        let dir = std::env::temp_dir().join(format!("posefield-app-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let mut recorder = Recorder::new(RecordingSettings {
            output_dir: dir.clone(),
            ..Default::default()
        });
        let mut audio = CommandLog::new();

        audio.send(AudioCommand::Start).unwrap();
        assert_eq!(drain_audio(&mut audio, &mut recorder).unwrap(), 1);
        assert!(audio.is_empty());

        recorder.start().unwrap();
        audio.send(AudioCommand::Start).unwrap();
        audio.send(AudioCommand::SetTempo { bpm: 90.0 }).unwrap();
        assert_eq!(drain_audio(&mut audio, &mut recorder).unwrap(), 2);
        recorder.stop().unwrap();

        let log = std::fs::read_to_string(dir.join(Recorder::AUDIO_LOG)).unwrap();
        assert_eq!(log.lines().count(), 2);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
