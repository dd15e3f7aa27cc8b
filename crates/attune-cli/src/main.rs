use std::error::Error;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use attune_core::{
    now_us, AttentionSnapshot, AttuneConfig, EventPayload, InteractionAttentionScorer,
    InteractionEvent, InteractionKind, SharedScorer,
};
use attune_runtime::MultimodalOrchestrator;
use attune_signals::{
    AnalyzerError, AudioChunk, AudioState, Emotion, FacialExpression, HeadPose, VideoFrame,
    VideoState,
};

#[derive(Parser)]
#[command(name = "attune", about = "Attention scoring and multimodal fusion for media playback")]
struct Cli {
    /// Base config file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// User config file, replaces the base file when present
    #[arg(long, global = true)]
    user_config: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the threaded pipeline against synthetic camera and microphone input
    Demo {
        #[arg(long, default_value_t = 12)]
        seconds: u64,
        #[arg(long, default_value_t = 10)]
        fps: u32,
    },
    /// Feed a JSON-lines file of interaction events through a scorer
    Replay {
        file: PathBuf,
        /// Evaluate decay at this many seconds after the last event
        #[arg(long, default_value_t = 0)]
        idle_after: u64,
    },
    /// Print the effective configuration as TOML
    Config {},
}

/// One replay line. `kind` stays a string so unknown kinds can be rejected per line.
#[derive(Deserialize)]
struct ReplayLine {
    kind: String,
    #[serde(default)]
    timestamp_us: Option<i64>,
    #[serde(default)]
    payload: Option<EventPayload>,
}

fn load_config(cli: &Cli) -> Result<AttuneConfig, Box<dyn Error>> {
    Ok(AttuneConfig::load_layered(
        cli.config.as_deref(),
        cli.user_config.as_deref(),
    )?)
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.cmd {
        Commands::Demo { seconds, fps } => run_demo(&config, seconds, fps)?,
        Commands::Replay { ref file, idle_after } => run_replay(&config, file, idle_after)?,
        Commands::Config {} => print!("{}", config.to_toml_string()?),
    }
    Ok(())
}

// ============================================================================
// demo
// ============================================================================

/// Synthetic scene: the viewer watches, looks around, steps away, comes back.
fn scene_phase(elapsed_sec: f32) -> (&'static str, bool) {
    match elapsed_sec as u32 % 12 {
        0..=3 => ("watching", true),
        4..=7 => ("moving", true),
        8..=9 => ("away", false),
        _ => ("back", true),
    }
}

fn synthetic_video(started_us: i64) -> impl FnMut(&VideoFrame) -> Result<VideoState, AnalyzerError> {
    move |frame| {
        if frame.is_empty() {
            return Err(AnalyzerError::EmptySample);
        }
        let t = (frame.timestamp_us - started_us) as f32 / 1_000_000.0;
        let (phase, present) = scene_phase(t);
        if !present {
            return Ok(VideoState::no_face());
        }
        let swing = if phase == "moving" { 25.0 } else { 0.3 };
        let pose = HeadPose::new(swing * (t * 3.0).sin(), 0.5 * swing * (t * 2.0).cos(), 0.0);
        Ok(VideoState::with_face(
            pose,
            70.0,
            FacialExpression {
                emotion: Emotion::Focused,
                confidence: 0.7,
            },
        ))
    }
}

fn rms_audio(chunk: &AudioChunk) -> Result<AudioState, AnalyzerError> {
    if chunk.is_empty() {
        return Err(AnalyzerError::EmptySample);
    }
    let rms = (chunk.samples.iter().map(|s| s * s).sum::<f32>() / chunk.samples.len() as f32).sqrt();
    let energy = (rms * 200.0).min(100.0);
    if energy > 10.0 {
        Ok(AudioState::speech(energy, 160.0, Emotion::Calm))
    } else {
        Ok(AudioState::silence())
    }
}

fn synthetic_chunk(elapsed_sec: f32, sample_rate: u32, block: usize, ts: i64) -> AudioChunk {
    let (phase, _) = scene_phase(elapsed_sec);
    let amplitude = if phase == "back" { 0.3 } else { 0.01 };
    let samples = (0..block)
        .map(|i| amplitude * ((i as f32) * 0.3).sin())
        .collect();
    AudioChunk {
        samples,
        sample_rate,
        timestamp_us: ts,
    }
}

fn run_demo(config: &AttuneConfig, seconds: u64, fps: u32) -> Result<(), Box<dyn Error>> {
    let scorer = SharedScorer::new(config.scorer.clone());
    let started_us = now_us();
    let orch = MultimodalOrchestrator::new(config, synthetic_video(started_us), rms_audio, scorer)?;
    orch.track(InteractionKind::SessionStart, None);
    orch.start()?;

    let frame_period = Duration::from_secs_f32(1.0 / fps.max(1) as f32);
    let started = Instant::now();
    let mut next_decay = Duration::from_secs(1);

    while started.elapsed() < Duration::from_secs(seconds) {
        let elapsed = started.elapsed();
        let ts = now_us();

        orch.add_video_frame(VideoFrame {
            data: vec![0; 64 * 48 * 3],
            width: 64,
            height: 48,
            channels: 3,
            timestamp_us: ts,
        });
        orch.add_audio_chunk(synthetic_chunk(elapsed.as_secs_f32(), 16_000, 1_600, ts));

        // Decay is driven externally
        if elapsed >= next_decay {
            next_decay += Duration::from_secs(1);
            let snap = orch.check_and_update();
            let (phase, _) = scene_phase(elapsed.as_secs_f32());
            let unified = orch.latest_unified();
            tracing::info!(
                phase,
                score = snap.attention_score,
                level = %snap.attention_level,
                volume = snap.adaptations.volume,
                sensor = unified.as_ref().map(|u| u.attention_score),
                pattern = ?unified.as_ref().map(|u| u.pattern),
                both_active = unified.as_ref().map_or(false, |u| u.both_active),
                "tick"
            );
        }

        thread::sleep(frame_period);
    }

    let joined = orch.stop();
    if !joined {
        tracing::warn!("some workers were detached on stop");
    }

    println!("{}", serde_json::to_string_pretty(&orch.get_state())?);
    println!("{}", serde_json::to_string_pretty(&orch.metrics())?);
    Ok(())
}

// ============================================================================
// replay
// ============================================================================

/// Replay a JSON-lines event file; returns the scorer and its state
/// `idle_after` seconds past the last event.
fn replay(
    config: &AttuneConfig,
    file: &Path,
    idle_after: u64,
) -> Result<(InteractionAttentionScorer, AttentionSnapshot), Box<dyn Error>> {
    let reader = BufReader::new(File::open(file)?);
    let mut scorer: Option<InteractionAttentionScorer> = None;
    let mut last_ts = 0i64;
    let mut rejected = 0usize;

    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: ReplayLine = serde_json::from_str(&line)
            .map_err(|e| format!("{}:{}: {}", file.display(), lineno + 1, e))?;

        let kind = match entry.kind.parse::<InteractionKind>() {
            Ok(kind) => kind,
            Err(e) => {
                tracing::warn!(line = lineno + 1, "{}", e);
                rejected += 1;
                continue;
            }
        };

        let ts = entry.timestamp_us.unwrap_or(last_ts).max(last_ts);
        let scorer = scorer
            .get_or_insert_with(|| InteractionAttentionScorer::new(config.scorer.clone(), ts));
        let event = InteractionEvent::new(kind, ts).with_payload(entry.payload.unwrap_or_default());
        let snap = scorer.track(&event);
        tracing::debug!(kind = %kind, ts, score = snap.attention_score, "replayed");
        last_ts = ts;
    }

    if rejected > 0 {
        tracing::warn!(rejected, "unknown interaction kinds skipped");
    }

    let mut scorer =
        scorer.unwrap_or_else(|| InteractionAttentionScorer::new(config.scorer.clone(), last_ts));
    let idle_us = i64::try_from(idle_after)
        .unwrap_or(i64::MAX)
        .saturating_mul(1_000_000);
    let snap = scorer.check_and_update_at(last_ts.saturating_add(idle_us));
    Ok((scorer, snap))
}

fn run_replay(config: &AttuneConfig, file: &Path, idle_after: u64) -> Result<(), Box<dyn Error>> {
    let (scorer, snap) = replay(config, file, idle_after)?;
    println!("{}", serde_json::to_string_pretty(&snap)?);
    let actions: Vec<_> = scorer.adaptive_actions().collect();
    println!("{}", serde_json::to_string_pretty(&actions)?);
    Ok(())
}
