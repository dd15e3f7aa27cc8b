//! # attune-runtime
//!
//! Threaded multimodal pipeline.
//!
//! ```text
//! add_video_frame ─► [bounded queue] ─► video worker ─► latest video ─┐
//!                                            │                        ├─► fusion tick ─► SharedScorer
//! add_audio_chunk ─► [bounded queue] ─► audio worker ─► latest audio ─┘        ▲
//!                                            └──► head movement tracker ───────┘
//! ```
//!
//! Producers never block: a full queue drops the incoming sample. Only the
//! most recent analyzer output per modality is kept. Fusion is best-effort
//! and does not pair video with audio.

use thiserror::Error;

pub mod metrics;
pub mod orchestrator;
pub mod slot;
mod worker;

pub use metrics::{HealthSnapshot, MetricsSnapshot, PipelineMetrics, WorkerKind};
pub use orchestrator::MultimodalOrchestrator;
pub use slot::LatestSlot;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error(transparent)]
    Config(#[from] attune_core::ConfigError),
}
