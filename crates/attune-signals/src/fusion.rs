//! Multimodal Fusion
//!
//! Combines the latest video state, audio state and head-movement reading into
//! a single `UnifiedAttentionState`:
//! - Branch-based attention score (idle / single modality / both active)
//! - Emotion resolution (confident face expression, then speech hint)
//! - Behaviour pattern (normal, drowsy, absent)
//! - Sticky movement/speech latches gated by a warm-up period

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::modality::{AudioState, Emotion, VideoState};

/// Score when neither movement nor speech is active but a face is visible.
pub const IDLE_FACE_SCORE: f32 = 20.0;
/// Score when neither movement nor speech is active and nobody is in view.
pub const IDLE_NO_FACE_SCORE: f32 = 5.0;
/// Base score when movement and speech are both active.
pub const BOTH_ACTIVE_BASE: f32 = 80.0;
/// Max bonus from movement quality when both are active.
pub const BOTH_QUALITY_BONUS: f32 = 10.0;
/// Max bonus from audio energy when both are active.
pub const BOTH_ENERGY_BONUS: f32 = 10.0;
/// Base score when exactly one of movement/speech is active.
pub const SINGLE_ACTIVE_BASE: f32 = 50.0;
/// Max modifier from the active modality's intensity.
pub const SINGLE_ACTIVE_MODIFIER: f32 = 20.0;
/// Bonus for a well-centered face in the single-modality branch.
pub const CENTERED_FACE_BONUS: f32 = 5.0;

/// Fusion configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionConfig {
    /// Grace period after pipeline start during which detections are ignored
    pub warmup_ms: u64,
    /// Face expression must exceed this confidence to win emotion resolution
    pub expression_confidence_threshold: f32,
    /// |pitch| above this classifies as drowsy (degrees)
    pub drowsy_pitch_deg: f32,
    /// |yaw| and |pitch| at or below this count as centered (degrees)
    pub centered_max_angle_deg: f32,
    /// Number of unified states kept for inspection
    pub history_capacity: usize,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            warmup_ms: 3_000,
            expression_confidence_threshold: 0.5,
            drowsy_pitch_deg: 30.0,
            centered_max_angle_deg: 15.0,
            history_capacity: 10,
        }
    }
}

/// Behaviour pattern classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttentionPattern {
    #[default]
    Normal,
    Drowsy,
    Absent,
}

/// Fused attention estimate for one fusion tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedAttentionState {
    /// Sensor-derived attention (0-100)
    pub attention_score: u8,
    pub emotion: Emotion,
    pub pattern: AttentionPattern,
    /// Latched: significant head movement seen since warm-up
    pub movement_detected: bool,
    /// Latched: speech seen since warm-up
    pub speech_detected: bool,
    /// Latched: conjunction of the two latches above
    pub both_active: bool,
    /// Movement intensity used for this tick (0-1)
    pub movement_quality: f32,
    pub video: VideoState,
    pub audio: AudioState,
    pub timestamp_us: i64,
}

/// Fusion engine with sticky detection latches and a bounded history
#[derive(Debug, Clone)]
pub struct FusionEngine {
    config: FusionConfig,
    started_at_us: Option<i64>,
    movement_latch: bool,
    speech_latch: bool,
    history: VecDeque<UnifiedAttentionState>,
}

impl FusionEngine {
    pub fn new() -> Self {
        Self::with_config(FusionConfig::default())
    }

    pub fn with_config(config: FusionConfig) -> Self {
        Self {
            history: VecDeque::with_capacity(config.history_capacity),
            config,
            started_at_us: None,
            movement_latch: false,
            speech_latch: false,
        }
    }

    /// Mark pipeline start; the warm-up period counts from here.
    ///
    /// Only the first call after construction or `reset` has an effect.
    pub fn begin(&mut self, now_us: i64) {
        if self.started_at_us.is_none() {
            self.started_at_us = Some(now_us);
        }
    }

    /// Whether `now_us` still falls inside the warm-up period.
    pub fn in_warmup(&self, now_us: i64) -> bool {
        match self.started_at_us {
            Some(start) => now_us.saturating_sub(start) < (self.config.warmup_ms as i64) * 1_000,
            None => self.config.warmup_ms > 0,
        }
    }

    /// Fuse one tick worth of modality states.
    ///
    /// # Arguments
    /// * `video` - Latest video state
    /// * `audio` - Latest audio state
    /// * `movement_significant` - Head movement tracker verdict
    /// * `movement_quality` - Head movement intensity (0-1)
    /// * `now_us` - Tick timestamp
    pub fn fuse(
        &mut self,
        video: &VideoState,
        audio: &AudioState,
        movement_significant: bool,
        movement_quality: f32,
        now_us: i64,
    ) -> UnifiedAttentionState {
        self.begin(now_us);
        let warming_up = self.in_warmup(now_us);

        let movement = movement_significant && !warming_up;
        let speech = audio.speech_detected && !warming_up;
        let quality = movement_quality.clamp(0.0, 1.0);

        if movement && !self.movement_latch {
            log::info!("FusionEngine: movement latch set");
            self.movement_latch = true;
        }
        if speech && !self.speech_latch {
            log::info!("FusionEngine: speech latch set");
            self.speech_latch = true;
        }

        let unified = UnifiedAttentionState {
            attention_score: self.compute_score(video, audio, movement, speech, quality),
            emotion: self.resolve_emotion(video, audio),
            pattern: self.classify_pattern(video, audio),
            movement_detected: self.movement_latch,
            speech_detected: self.speech_latch,
            both_active: self.movement_latch && self.speech_latch,
            movement_quality: quality,
            video: video.clone(),
            audio: audio.clone(),
            timestamp_us: now_us,
        };

        self.history.push_back(unified.clone());
        while self.history.len() > self.config.history_capacity {
            self.history.pop_front();
        }

        unified
    }

    fn compute_score(
        &self,
        video: &VideoState,
        audio: &AudioState,
        movement: bool,
        speech: bool,
        quality: f32,
    ) -> u8 {
        let energy = (audio.energy_level / 100.0).clamp(0.0, 1.0);

        let score = match (movement, speech) {
            (false, false) => {
                if video.face_detected {
                    IDLE_FACE_SCORE
                } else {
                    IDLE_NO_FACE_SCORE
                }
            }
            (true, true) => {
                BOTH_ACTIVE_BASE + quality * BOTH_QUALITY_BONUS + energy * BOTH_ENERGY_BONUS
            }
            (true, false) | (false, true) => {
                let modifier = if movement {
                    quality * SINGLE_ACTIVE_MODIFIER
                } else {
                    energy * SINGLE_ACTIVE_MODIFIER
                };
                let centered = if self.is_centered(video) {
                    CENTERED_FACE_BONUS
                } else {
                    0.0
                };
                SINGLE_ACTIVE_BASE + modifier + centered
            }
        };

        score.round().clamp(0.0, 100.0) as u8
    }

    fn is_centered(&self, video: &VideoState) -> bool {
        let max = self.config.centered_max_angle_deg;
        video.face_detected && video.head_pose.yaw.abs() <= max && video.head_pose.pitch.abs() <= max
    }

    fn resolve_emotion(&self, video: &VideoState, audio: &AudioState) -> Emotion {
        if video.face_detected
            && video.facial_expression.confidence > self.config.expression_confidence_threshold
        {
            video.facial_expression.emotion
        } else if audio.speech_detected {
            audio.emotion_hint
        } else {
            Emotion::Neutral
        }
    }

    fn classify_pattern(&self, video: &VideoState, audio: &AudioState) -> AttentionPattern {
        if !video.face_detected && !audio.speech_detected {
            AttentionPattern::Absent
        } else if video.face_detected && video.head_pose.pitch.abs() > self.config.drowsy_pitch_deg {
            AttentionPattern::Drowsy
        } else {
            AttentionPattern::Normal
        }
    }

    pub fn movement_detected(&self) -> bool {
        self.movement_latch
    }

    pub fn speech_detected(&self) -> bool {
        self.speech_latch
    }

    pub fn both_active(&self) -> bool {
        self.movement_latch && self.speech_latch
    }

    /// Most recent unified state, if any tick has run
    pub fn latest(&self) -> Option<&UnifiedAttentionState> {
        self.history.back()
    }

    /// Last `history_capacity` unified states, oldest first
    pub fn history(&self) -> impl Iterator<Item = &UnifiedAttentionState> {
        self.history.iter()
    }

    /// Clear latches, history and the warm-up anchor.
    pub fn reset(&mut self) {
        self.started_at_us = None;
        self.movement_latch = false;
        self.speech_latch = false;
        self.history.clear();
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }
}

impl Default for FusionEngine {
    fn default() -> Self {
        Self::new()
    }
}
