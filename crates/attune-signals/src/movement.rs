//! Head Movement Tracking
//!
//! Keeps a trailing time window of head-pose samples and answers two questions:
//! is the head moving significantly (variance test), and how intense is the
//! recent movement (normalized frame-to-frame displacement).
//!
//! # Usage
//!
//! ```ignore
//! let mut tracker = HeadMovementTracker::new();
//!
//! // Feed every analyzed frame; faceless frames only advance the clock
//! tracker.record_pose(&video_state);
//!
//! if tracker.is_significant() {
//!     // Head is moving beyond tracking jitter
//! }
//! let intensity = tracker.movement_quality(); // 0..1
//! ```
//!
//! Variance over a sample window smooths out per-frame jitter. The price is
//! roughly `min_samples` frames of latency before the detector can fire.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::modality::VideoState;

/// Hard cap on buffered samples, independent of frame rate.
const MAX_BUFFERED_SAMPLES: usize = 512;

/// Head movement tracker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementConfig {
    /// Trailing window kept in the buffer (seconds)
    pub window_sec: f32,
    /// Cold-start guard: samples required before `is_significant` may fire
    pub min_samples: usize,
    /// Number of trailing samples used for the standard deviation
    pub std_window_samples: usize,
    /// Yaw or pitch standard deviation above this is significant (degrees)
    pub std_threshold_deg: f32,
    /// Sub-window used for movement quality (seconds)
    pub quality_window_sec: f32,
    /// Accumulated |Δyaw|+|Δpitch| that maps to full intensity (degrees)
    pub quality_calibration_deg: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            window_sec: 4.0,
            min_samples: 10,
            std_window_samples: 10,
            std_threshold_deg: 0.8,
            quality_window_sec: 1.0,
            quality_calibration_deg: 20.0,
        }
    }
}

/// One head-pose observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeadMovementSample {
    pub timestamp_us: i64,
    pub yaw: f32,
    pub pitch: f32,
}

/// Population statistics over the variance window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementStats {
    pub yaw_std: f32,
    pub pitch_std: f32,
    pub samples: usize,
}

/// Time-windowed head movement detector
#[derive(Debug, Clone)]
pub struct HeadMovementTracker {
    config: MovementConfig,
    samples: VecDeque<HeadMovementSample>,
    /// Newest time observed, with or without a face
    clock_us: Option<i64>,
}

impl HeadMovementTracker {
    /// Create with default config
    pub fn new() -> Self {
        Self::with_config(MovementConfig::default())
    }

    /// Create with custom config
    pub fn with_config(config: MovementConfig) -> Self {
        Self {
            samples: VecDeque::with_capacity(config.std_window_samples.max(16)),
            config,
            clock_us: None,
        }
    }

    /// Append a sample and prune everything older than the trailing window.
    ///
    /// Samples older than the newest buffered one are rejected.
    ///
    /// # Returns
    /// `true` if the sample was buffered
    pub fn record(&mut self, sample: HeadMovementSample) -> bool {
        if let Some(last) = self.samples.back() {
            if sample.timestamp_us < last.timestamp_us {
                log::debug!(
                    "HeadMovementTracker: out-of-order sample at {}us (newest {}us)",
                    sample.timestamp_us,
                    last.timestamp_us
                );
                return false;
            }
        }

        self.samples.push_back(sample);
        self.prune_to(sample.timestamp_us);
        true
    }

    /// Record the head pose of an analyzed frame.
    ///
    /// A frame without a face buffers nothing but still ages the window, so
    /// movement seen before the face left expires on schedule.
    pub fn record_pose(&mut self, video: &VideoState) -> bool {
        if !video.face_detected {
            self.prune_to(video.timestamp_us);
            return false;
        }
        self.record(HeadMovementSample {
            timestamp_us: video.timestamp_us,
            yaw: video.head_pose.yaw,
            pitch: video.head_pose.pitch,
        })
    }

    /// Advance the clock to `now_us` and drop samples outside the trailing window.
    ///
    /// The clock never moves backwards.
    pub fn prune_to(&mut self, now_us: i64) {
        let now_us = self.clock_us.map_or(now_us, |c| c.max(now_us));
        self.clock_us = Some(now_us);

        let window_us = (self.config.window_sec * 1_000_000.0) as i64;
        let cutoff = now_us.saturating_sub(window_us);
        while let Some(front) = self.samples.front() {
            if front.timestamp_us < cutoff || self.samples.len() > MAX_BUFFERED_SAMPLES {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    /// Yaw/pitch standard deviation over the trailing `std_window_samples`.
    ///
    /// `None` until the cold-start guard is satisfied.
    pub fn stats(&self) -> Option<MovementStats> {
        if self.samples.len() < self.config.min_samples.max(1) {
            return None;
        }

        let n = self.config.std_window_samples.max(1).min(self.samples.len());
        let recent = self.samples.iter().skip(self.samples.len() - n);
        let (yaw, pitch): (Vec<f32>, Vec<f32>) = recent.map(|s| (s.yaw, s.pitch)).unzip();

        Some(MovementStats {
            yaw_std: population_std(&yaw),
            pitch_std: population_std(&pitch),
            samples: n,
        })
    }

    /// Whether the head is moving beyond tracking jitter.
    pub fn is_significant(&self) -> bool {
        match self.stats() {
            Some(stats) => {
                stats.yaw_std > self.config.std_threshold_deg
                    || stats.pitch_std > self.config.std_threshold_deg
            }
            None => false,
        }
    }

    /// Movement intensity over the quality sub-window ending at the clock (0-1).
    pub fn movement_quality(&self) -> f32 {
        let now = match self.clock_us {
            Some(now) if !self.samples.is_empty() => now,
            _ => return 0.0,
        };
        let cutoff = now.saturating_sub((self.config.quality_window_sec * 1_000_000.0) as i64);

        let mut total = 0.0;
        let mut prev: Option<&HeadMovementSample> = None;
        for sample in self.samples.iter().filter(|s| s.timestamp_us >= cutoff) {
            if let Some(p) = prev {
                total += (sample.yaw - p.yaw).abs() + (sample.pitch - p.pitch).abs();
            }
            prev = Some(sample);
        }

        (total / self.config.quality_calibration_deg.max(1e-6)).clamp(0.0, 1.0)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Reset to initial state
    pub fn reset(&mut self) {
        self.samples.clear();
        self.clock_us = None;
    }

    /// Get configuration
    pub fn config(&self) -> &MovementConfig {
        &self.config
    }
}

impl Default for HeadMovementTracker {
    fn default() -> Self {
        Self::new()
    }
}

fn population_std(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f32;
    let mean = values.iter().sum::<f32>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;
    variance.sqrt()
}
