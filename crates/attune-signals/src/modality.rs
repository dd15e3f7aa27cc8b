//! Modality Records and Analyzer Traits
//!
//! Typed per-sample states produced by the external video and audio analyzers,
//! plus the pluggable traits those analyzers implement.
//!
//! Feature extraction itself (face cascades, RMS energy, pitch tracking) lives
//! outside this crate. Backends only have to honour the output contract below.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Coarse emotion label shared by the video expression and the audio hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    #[default]
    Neutral,
    Happy,
    Sad,
    Surprised,
    Focused,
    Tired,
    Absent,
    Excited,
    Calm,
}

impl Emotion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::Happy => "happy",
            Self::Sad => "sad",
            Self::Surprised => "surprised",
            Self::Focused => "focused",
            Self::Tired => "tired",
            Self::Absent => "absent",
            Self::Excited => "excited",
            Self::Calm => "calm",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Head orientation relative to the camera, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HeadPose {
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}

impl HeadPose {
    pub fn new(yaw: f32, pitch: f32, roll: f32) -> Self {
        Self { yaw, pitch, roll }
    }
}

/// Facial expression estimate attached to a video state.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FacialExpression {
    pub emotion: Emotion,
    /// Classifier confidence (0-1)
    pub confidence: f32,
}

/// Output of one video analysis pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoState {
    pub face_detected: bool,
    pub head_pose: HeadPose,
    /// Face position/size/stability quality (0-100)
    pub engagement_score: f32,
    pub facial_expression: FacialExpression,
    /// Capture timestamp of the source frame
    pub timestamp_us: i64,
}

impl Default for VideoState {
    fn default() -> Self {
        Self {
            face_detected: false,
            head_pose: HeadPose::default(),
            engagement_score: 0.0,
            facial_expression: FacialExpression::default(),
            timestamp_us: 0,
        }
    }
}

impl VideoState {
    /// State for a frame in which a face was found.
    pub fn with_face(head_pose: HeadPose, engagement_score: f32, expression: FacialExpression) -> Self {
        Self {
            face_detected: true,
            head_pose,
            engagement_score: engagement_score.clamp(0.0, 100.0),
            facial_expression: expression,
            timestamp_us: 0,
        }
    }

    /// State for a frame with nobody in view.
    pub fn no_face() -> Self {
        Self {
            facial_expression: FacialExpression {
                emotion: Emotion::Absent,
                confidence: 0.0,
            },
            ..Self::default()
        }
    }
}

/// Output of one audio analysis pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioState {
    pub speech_detected: bool,
    /// Normalized energy (0-100)
    pub energy_level: f32,
    pub pitch_hz: f32,
    pub emotion_hint: Emotion,
    pub timestamp_us: i64,
}

impl Default for AudioState {
    fn default() -> Self {
        Self {
            speech_detected: false,
            energy_level: 0.0,
            pitch_hz: 0.0,
            emotion_hint: Emotion::Neutral,
            timestamp_us: 0,
        }
    }
}

impl AudioState {
    pub fn speech(energy_level: f32, pitch_hz: f32, emotion_hint: Emotion) -> Self {
        Self {
            speech_detected: true,
            energy_level: energy_level.clamp(0.0, 100.0),
            pitch_hz,
            emotion_hint,
            timestamp_us: 0,
        }
    }

    pub fn silence() -> Self {
        Self::default()
    }
}

/// One raw camera frame as handed to the pipeline.
#[derive(Debug, Clone, Default)]
pub struct VideoFrame {
    /// Raw pixel bytes (RGB888 or RGBA8888)
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub timestamp_us: i64,
}

impl VideoFrame {
    pub fn is_empty(&self) -> bool {
        self.data.is_empty() || self.width == 0 || self.height == 0
    }
}

/// One raw microphone block as handed to the pipeline.
#[derive(Debug, Clone, Default)]
pub struct AudioChunk {
    /// Mono PCM samples in [-1, 1]
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub timestamp_us: i64,
}

impl AudioChunk {
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Analyzer failure for a single sample. Never fatal to the pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyzerError {
    #[error("empty sample")]
    EmptySample,
    #[error("malformed sample: {0}")]
    Malformed(String),
    #[error("analyzer unavailable: {0}")]
    Unavailable(String),
}

/// Pluggable video analysis backend.
///
/// Implementations may be stateful (frame skipping, smoothing) and are only
/// ever invoked by one caller at a time.
pub trait VideoAnalyzer: Send {
    /// Analyze one frame.
    ///
    /// The returned state's `timestamp_us` is overwritten with the frame's
    /// capture time by the caller.
    fn analyze(&mut self, frame: &VideoFrame) -> Result<VideoState, AnalyzerError>;
}

/// Pluggable audio analysis backend.
pub trait AudioAnalyzer: Send {
    fn analyze(&mut self, chunk: &AudioChunk) -> Result<AudioState, AnalyzerError>;
}

impl<F> VideoAnalyzer for F
where
    F: FnMut(&VideoFrame) -> Result<VideoState, AnalyzerError> + Send,
{
    fn analyze(&mut self, frame: &VideoFrame) -> Result<VideoState, AnalyzerError> {
        self(frame)
    }
}

impl<F> AudioAnalyzer for F
where
    F: FnMut(&AudioChunk) -> Result<AudioState, AnalyzerError> + Send,
{
    fn analyze(&mut self, chunk: &AudioChunk) -> Result<AudioState, AnalyzerError> {
        self(chunk)
    }
}
