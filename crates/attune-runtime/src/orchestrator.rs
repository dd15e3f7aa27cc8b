//! Multimodal Orchestrator
//!
//! Owns the ingestion queues, the analyzers, the movement tracker, the fusion
//! engine and a handle to the shared scorer. `start` spawns one worker per
//! modality plus the fusion ticker; `stop` closes the shutdown channel and
//! joins within `join_timeout_ms`.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use attune_core::{
    now_us, AttentionSnapshot, AttuneConfig, EventPayload, InteractionEvent, InteractionKind,
    PipelineConfig, SharedScorer, UnknownInteraction,
};
use attune_signals::{
    AttentionPattern, AudioAnalyzer, AudioChunk, AudioState, FusionEngine, HeadMovementTracker,
    UnifiedAttentionState, VideoAnalyzer, VideoFrame, VideoState,
};

use crate::metrics::{HealthSnapshot, MetricsSnapshot, PipelineMetrics, WorkerHealth, WorkerKind};
use crate::slot::LatestSlot;
use crate::worker;
use crate::RuntimeError;

/// State shared with the worker threads
struct Shared {
    video_analyzer: Mutex<Box<dyn VideoAnalyzer>>,
    audio_analyzer: Mutex<Box<dyn AudioAnalyzer>>,
    latest_video: LatestSlot<VideoState>,
    latest_audio: LatestSlot<AudioState>,
    tracker: Mutex<HeadMovementTracker>,
    fusion: Mutex<FusionEngine>,
    scorer: SharedScorer,
    metrics: PipelineMetrics,
    health: WorkerHealth,
}

impl Shared {
    fn process_video(&self, frame: VideoFrame) {
        let result = self.video_analyzer.lock().analyze(&frame);
        match result {
            Ok(mut state) => {
                state.timestamp_us = frame.timestamp_us;
                self.tracker.lock().record_pose(&state);
                self.latest_video.publish(state);
                PipelineMetrics::bump(&self.metrics.frames_analyzed);
            }
            Err(e) => {
                let total = PipelineMetrics::bump(&self.metrics.analyzer_failures);
                log::warn!(
                    "video worker: analyzer failed ({}), keeping previous state [failures={}]",
                    e,
                    total
                );
            }
        }
    }

    fn process_audio(&self, chunk: AudioChunk) {
        let result = self.audio_analyzer.lock().analyze(&chunk);
        match result {
            Ok(mut state) => {
                state.timestamp_us = chunk.timestamp_us;
                self.latest_audio.publish(state);
                PipelineMetrics::bump(&self.metrics.chunks_analyzed);
            }
            Err(e) => {
                let total = PipelineMetrics::bump(&self.metrics.analyzer_failures);
                log::warn!(
                    "audio worker: analyzer failed ({}), keeping previous state [failures={}]",
                    e,
                    total
                );
            }
        }
    }

    fn fusion_tick(&self, now_us: i64) -> Option<UnifiedAttentionState> {
        let (video, audio) = match (self.latest_video.get(), self.latest_audio.get()) {
            (Some(v), Some(a)) => (v, a),
            _ => {
                PipelineMetrics::bump(&self.metrics.fusion_skipped);
                return None;
            }
        };

        let (significant, quality) = {
            let tracker = self.tracker.lock();
            (tracker.is_significant(), tracker.movement_quality())
        };

        let unified = self
            .fusion
            .lock()
            .fuse(&video, &audio, significant, quality, now_us);

        let absent = unified.pattern == AttentionPattern::Absent;
        let snapshot = self.scorer.with_scorer(|scorer| {
            if absent {
                scorer.track(&InteractionEvent::new(InteractionKind::Absent, now_us));
            }
            scorer.blend_sensor_score(unified.attention_score, now_us)
        });

        if absent {
            PipelineMetrics::bump(&self.metrics.absent_events);
        }
        PipelineMetrics::bump(&self.metrics.fusion_ticks);

        log::debug!(
            "fusion: sensor={} pattern={:?} emotion={} both_active={} -> blended={} ({})",
            unified.attention_score,
            unified.pattern,
            unified.emotion,
            unified.both_active,
            snapshot.attention_score,
            snapshot.attention_level
        );

        Some(unified)
    }
}

/// Worker handles for one start/stop cycle
struct Running {
    shutdown_tx: Sender<()>,
    handles: Vec<(WorkerKind, JoinHandle<()>)>,
}

pub struct MultimodalOrchestrator {
    config: PipelineConfig,
    video_tx: Sender<VideoFrame>,
    video_rx: Receiver<VideoFrame>,
    audio_tx: Sender<AudioChunk>,
    audio_rx: Receiver<AudioChunk>,
    shared: Arc<Shared>,
    running: Mutex<Option<Running>>,
}

impl MultimodalOrchestrator {
    /// Build a stopped pipeline around the given analyzers and scorer.
    pub fn new<V, A>(
        config: &AttuneConfig,
        video_analyzer: V,
        audio_analyzer: A,
        scorer: SharedScorer,
    ) -> Result<Self, RuntimeError>
    where
        V: VideoAnalyzer + 'static,
        A: AudioAnalyzer + 'static,
    {
        config.validate()?;

        let (video_tx, video_rx) = bounded(config.pipeline.queue_capacity);
        let (audio_tx, audio_rx) = bounded(config.pipeline.queue_capacity);

        let shared = Shared {
            video_analyzer: Mutex::new(Box::new(video_analyzer)),
            audio_analyzer: Mutex::new(Box::new(audio_analyzer)),
            latest_video: LatestSlot::new(),
            latest_audio: LatestSlot::new(),
            tracker: Mutex::new(HeadMovementTracker::with_config(config.movement.clone())),
            fusion: Mutex::new(FusionEngine::with_config(config.fusion.clone())),
            scorer,
            metrics: PipelineMetrics::default(),
            health: WorkerHealth::default(),
        };

        Ok(Self {
            config: config.pipeline.clone(),
            video_tx,
            video_rx,
            audio_tx,
            audio_rx,
            shared: Arc::new(shared),
            running: Mutex::new(None),
        })
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Spawn the video, audio and fusion workers. No-op if already running.
    pub fn start(&self) -> Result<(), RuntimeError> {
        let mut running = self.running.lock();
        if running.is_some() {
            log::debug!("orchestrator: start ignored, already running");
            return Ok(());
        }

        self.shared.fusion.lock().begin(now_us());

        let (shutdown_tx, shutdown_rx) = bounded::<()>(0);
        let poll_timeout = Duration::from_millis(self.config.poll_timeout_ms);
        let interval = Duration::from_millis(self.config.fusion_interval_ms);
        let mut handles = Vec::with_capacity(3);

        // If a spawn fails, dropping `shutdown_tx` on return stops the ones already started
        let shared = Arc::clone(&self.shared);
        let samples = self.video_rx.clone();
        let shutdown = shutdown_rx.clone();
        handles.push((
            WorkerKind::Video,
            worker::spawn_named(
                WorkerKind::Video.as_str(),
                self.shared.health.flag(WorkerKind::Video),
                move || {
                    worker::modality_loop(
                        "video",
                        samples,
                        shutdown,
                        poll_timeout,
                        &shared.metrics,
                        |frame| shared.process_video(frame),
                    )
                },
            )?,
        ));

        let shared = Arc::clone(&self.shared);
        let samples = self.audio_rx.clone();
        let shutdown = shutdown_rx.clone();
        handles.push((
            WorkerKind::Audio,
            worker::spawn_named(
                WorkerKind::Audio.as_str(),
                self.shared.health.flag(WorkerKind::Audio),
                move || {
                    worker::modality_loop(
                        "audio",
                        samples,
                        shutdown,
                        poll_timeout,
                        &shared.metrics,
                        |chunk| shared.process_audio(chunk),
                    )
                },
            )?,
        ));

        let shared = Arc::clone(&self.shared);
        handles.push((
            WorkerKind::Fusion,
            worker::spawn_named(
                WorkerKind::Fusion.as_str(),
                self.shared.health.flag(WorkerKind::Fusion),
                move || {
                    worker::ticker_loop("fusion", shutdown_rx, interval, &shared.metrics, || {
                        shared.fusion_tick(now_us());
                    })
                },
            )?,
        ));

        log::info!(
            "orchestrator: started (queue_capacity={}, fusion_interval={}ms)",
            self.config.queue_capacity,
            self.config.fusion_interval_ms
        );
        *running = Some(Running {
            shutdown_tx,
            handles,
        });
        Ok(())
    }

    /// Signal shutdown and join every worker within `join_timeout_ms`.
    ///
    /// Workers still running at the deadline are detached. Returns `true` if
    /// every worker was joined. No-op (returns `true`) if not running.
    pub fn stop(&self) -> bool {
        let Running {
            shutdown_tx,
            handles,
        } = match self.running.lock().take() {
            Some(r) => r,
            None => return true,
        };

        drop(shutdown_tx);

        let deadline = Instant::now() + Duration::from_millis(self.config.join_timeout_ms);
        let mut all_joined = true;

        for (kind, handle) in handles {
            while !handle.is_finished() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(5));
            }

            if handle.is_finished() {
                if let Err(payload) = handle.join() {
                    log::error!(
                        "orchestrator: {} worker died: {}",
                        kind.as_str(),
                        worker::panic_message(payload.as_ref())
                    );
                }
            } else {
                log::warn!(
                    "orchestrator: {} worker did not stop within {}ms, detaching",
                    kind.as_str(),
                    self.config.join_timeout_ms
                );
                all_joined = false;
            }
        }

        log::info!("orchestrator: stopped");
        all_joined
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    // ------------------------------------------------------------------
    // Ingestion
    // ------------------------------------------------------------------

    /// Enqueue a frame without blocking. Returns `false` if it was dropped.
    pub fn add_video_frame(&self, frame: VideoFrame) -> bool {
        match self.video_tx.try_send(frame) {
            Ok(()) => {
                PipelineMetrics::bump(&self.shared.metrics.frames_accepted);
                true
            }
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                let dropped = PipelineMetrics::bump(&self.shared.metrics.frames_dropped);
                log::debug!("video queue full, frame dropped [dropped={}]", dropped);
                false
            }
        }
    }

    /// Enqueue an audio chunk without blocking. Returns `false` if it was dropped.
    pub fn add_audio_chunk(&self, chunk: AudioChunk) -> bool {
        match self.audio_tx.try_send(chunk) {
            Ok(()) => {
                PipelineMetrics::bump(&self.shared.metrics.chunks_accepted);
                true
            }
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                let dropped = PipelineMetrics::bump(&self.shared.metrics.chunks_dropped);
                log::debug!("audio queue full, chunk dropped [dropped={}]", dropped);
                false
            }
        }
    }

    pub fn video_queue_len(&self) -> usize {
        self.video_tx.len()
    }

    pub fn audio_queue_len(&self) -> usize {
        self.audio_tx.len()
    }

    // ------------------------------------------------------------------
    // Fusion
    // ------------------------------------------------------------------

    /// Run one fusion tick at `now_us` on the calling thread.
    ///
    /// `None` until both modalities have published a state.
    pub fn fusion_tick_at(&self, now_us: i64) -> Option<UnifiedAttentionState> {
        self.shared.fusion_tick(now_us)
    }

    pub fn latest_video(&self) -> Option<VideoState> {
        self.shared.latest_video.get()
    }

    pub fn latest_audio(&self) -> Option<AudioState> {
        self.shared.latest_audio.get()
    }

    pub fn latest_unified(&self) -> Option<UnifiedAttentionState> {
        self.shared.fusion.lock().latest().cloned()
    }

    /// Last fused states, oldest first
    pub fn fusion_history(&self) -> Vec<UnifiedAttentionState> {
        self.shared.fusion.lock().history().cloned().collect()
    }

    // ------------------------------------------------------------------
    // Scorer facade
    // ------------------------------------------------------------------

    pub fn scorer(&self) -> &SharedScorer {
        &self.shared.scorer
    }

    pub fn track(&self, kind: InteractionKind, payload: Option<EventPayload>) -> AttentionSnapshot {
        self.shared.scorer.track(kind, payload)
    }

    pub fn track_kind(
        &self,
        kind: &str,
        payload: Option<EventPayload>,
    ) -> Result<AttentionSnapshot, UnknownInteraction> {
        self.shared.scorer.track_kind(kind, payload)
    }

    pub fn get_state(&self) -> AttentionSnapshot {
        self.shared.scorer.get_state()
    }

    pub fn check_and_update(&self) -> AttentionSnapshot {
        self.shared.scorer.check_and_update()
    }

    /// Clear scorer histories, movement buffer, fusion latches and latest states.
    ///
    /// When running, the warm-up period restarts now.
    pub fn reset(&self) {
        let running = self.running.lock();
        self.shared.scorer.reset();
        self.shared.tracker.lock().reset();
        {
            let mut fusion = self.shared.fusion.lock();
            fusion.reset();
            if running.is_some() {
                fusion.begin(now_us());
            }
        }
        self.shared.latest_video.clear();
        self.shared.latest_audio.clear();
        log::info!("orchestrator: reset");
    }

    // ------------------------------------------------------------------
    // Observability
    // ------------------------------------------------------------------

    pub fn metrics(&self) -> MetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    pub fn worker_health(&self) -> HealthSnapshot {
        let health = self.shared.health.snapshot();
        if self.is_running() && !health.all_alive() {
            log::error!("orchestrator: dead worker detected {:?}", health);
        }
        health
    }

    pub fn movement_samples(&self) -> usize {
        self.shared.tracker.lock().len()
    }
}

impl Drop for MultimodalOrchestrator {
    fn drop(&mut self) {
        self.stop();
    }
}
