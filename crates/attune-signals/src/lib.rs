//! # attune-signals
//!
//! Sensor-side building blocks for attune.
//!
//! This crate provides:
//! - **Modality records**: typed per-sample outputs of the video and audio analyzers
//! - **Analyzer seams**: `VideoAnalyzer` / `AudioAnalyzer` traits for pluggable backends
//! - **Head movement**: time-windowed variance detector over head-pose samples
//! - **Fusion**: branch-based combination of video, audio and movement into one state
//!
//! ## Example
//!
//! ```ignore
//! use attune_signals::{FusionEngine, HeadMovementTracker};
//!
//! let mut tracker = HeadMovementTracker::new();
//! let mut fusion = FusionEngine::new();
//!
//! tracker.record_pose(&video_state);
//! let unified = fusion.fuse(
//!     &video_state,
//!     &audio_state,
//!     tracker.is_significant(),
//!     tracker.movement_quality(),
//!     now_us,
//! );
//! println!("attention {} ({:?})", unified.attention_score, unified.pattern);
//! ```

pub mod fusion;
pub mod modality;
pub mod movement;

pub use fusion::{
    AttentionPattern, FusionConfig, FusionEngine, UnifiedAttentionState, IDLE_FACE_SCORE,
    IDLE_NO_FACE_SCORE,
};
pub use modality::{
    AnalyzerError, AudioAnalyzer, AudioChunk, AudioState, Emotion, FacialExpression, HeadPose,
    VideoAnalyzer, VideoFrame, VideoState,
};
pub use movement::{HeadMovementSample, HeadMovementTracker, MovementConfig, MovementStats};
