//! Pipeline counters and worker liveness.
//!
//! Counters are relaxed atomics bumped from the worker threads and read as a
//! point-in-time `MetricsSnapshot`.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Pipeline metrics tracked atomically
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    pub frames_accepted: AtomicU64,
    pub frames_dropped: AtomicU64,
    pub frames_analyzed: AtomicU64,
    pub chunks_accepted: AtomicU64,
    pub chunks_dropped: AtomicU64,
    pub chunks_analyzed: AtomicU64,
    pub analyzer_failures: AtomicU64,
    pub analyzer_panics: AtomicU64,
    /// Fusion ticks that panicked and were contained
    pub tick_panics: AtomicU64,
    pub fusion_ticks: AtomicU64,
    /// Ticks that found no video or no audio state yet
    pub fusion_skipped: AtomicU64,
    pub absent_events: AtomicU64,
}

impl PipelineMetrics {
    pub(crate) fn bump(counter: &AtomicU64) -> u64 {
        counter.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            frames_accepted: self.frames_accepted.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            frames_analyzed: self.frames_analyzed.load(Ordering::Relaxed),
            chunks_accepted: self.chunks_accepted.load(Ordering::Relaxed),
            chunks_dropped: self.chunks_dropped.load(Ordering::Relaxed),
            chunks_analyzed: self.chunks_analyzed.load(Ordering::Relaxed),
            analyzer_failures: self.analyzer_failures.load(Ordering::Relaxed),
            analyzer_panics: self.analyzer_panics.load(Ordering::Relaxed),
            tick_panics: self.tick_panics.load(Ordering::Relaxed),
            fusion_ticks: self.fusion_ticks.load(Ordering::Relaxed),
            fusion_skipped: self.fusion_skipped.load(Ordering::Relaxed),
            absent_events: self.absent_events.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub frames_accepted: u64,
    pub frames_dropped: u64,
    pub frames_analyzed: u64,
    pub chunks_accepted: u64,
    pub chunks_dropped: u64,
    pub chunks_analyzed: u64,
    pub analyzer_failures: u64,
    pub analyzer_panics: u64,
    pub tick_panics: u64,
    pub fusion_ticks: u64,
    pub fusion_skipped: u64,
    pub absent_events: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerKind {
    Video,
    Audio,
    Fusion,
}

impl WorkerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Fusion => "fusion",
        }
    }
}

/// Alive flags, one per worker
#[derive(Debug, Default)]
pub struct WorkerHealth {
    video: Arc<AtomicBool>,
    audio: Arc<AtomicBool>,
    fusion: Arc<AtomicBool>,
}

impl WorkerHealth {
    pub(crate) fn flag(&self, kind: WorkerKind) -> Arc<AtomicBool> {
        match kind {
            WorkerKind::Video => Arc::clone(&self.video),
            WorkerKind::Audio => Arc::clone(&self.audio),
            WorkerKind::Fusion => Arc::clone(&self.fusion),
        }
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        HealthSnapshot {
            video: self.video.load(Ordering::Acquire),
            audio: self.audio.load(Ordering::Acquire),
            fusion: self.fusion.load(Ordering::Acquire),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HealthSnapshot {
    pub video: bool,
    pub audio: bool,
    pub fusion: bool,
}

impl HealthSnapshot {
    pub fn all_alive(&self) -> bool {
        self.video && self.audio && self.fusion
    }

    pub fn any_alive(&self) -> bool {
        self.video || self.audio || self.fusion
    }
}

/// Marks a worker alive for as long as it is held.
pub(crate) struct AliveGuard(Arc<AtomicBool>);

impl AliveGuard {
    pub(crate) fn new(flag: Arc<AtomicBool>) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for AliveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
