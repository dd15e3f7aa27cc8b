use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// TIME HELPERS
// ============================================================================

/// Compute time delta with saturating subtraction.
/// If clocks go backwards (now < last), returns 0 instead of wrapping.
#[inline]
pub fn dt_us(now_us: i64, last_us: i64) -> u64 {
    if now_us >= last_us {
        (now_us - last_us) as u64
    } else {
        0
    }
}

/// Time delta in seconds, see `dt_us`.
#[inline]
pub fn dt_sec(now_us: i64, last_us: i64) -> f32 {
    (dt_us(now_us, last_us) as f32) / 1_000_000.0
}

/// Wall-clock time in microseconds since the Unix epoch.
#[inline]
pub fn now_us() -> i64 {
    chrono::Utc::now().timestamp_micros()
}

// ============================================================================
// INTERACTIONS
// ============================================================================

/// Kind of UI interaction reported by the player front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Play,
    Pause,
    Skip,
    Volume,
    Seek,
    Playlist,
    TabVisible,
    TabHidden,
    SessionStart,
    /// Synthetic event raised by the sensor pipeline when nobody is present.
    /// Not accepted at ingress.
    #[serde(rename = "multimodal_absent")]
    Absent,
}

impl InteractionKind {
    /// Kinds accepted from the front-end.
    pub const EXTERNAL: [InteractionKind; 9] = [
        Self::Play,
        Self::Pause,
        Self::Skip,
        Self::Volume,
        Self::Seek,
        Self::Playlist,
        Self::TabVisible,
        Self::TabHidden,
        Self::SessionStart,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Skip => "skip",
            Self::Volume => "volume",
            Self::Seek => "seek",
            Self::Playlist => "playlist",
            Self::TabVisible => "tab_visible",
            Self::TabHidden => "tab_hidden",
            Self::SessionStart => "session_start",
            Self::Absent => "multimodal_absent",
        }
    }

    /// Whether this event counts as the user touching the player.
    pub fn is_user_interaction(&self) -> bool {
        !matches!(self, Self::Absent)
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ingress rejected an event kind outside the accepted set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown interaction kind: {0:?}")]
pub struct UnknownInteraction(pub String);

impl FromStr for InteractionKind {
    type Err = UnknownInteraction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::EXTERNAL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| UnknownInteraction(s.to_string()))
    }
}

/// Optional data attached to an interaction.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EventPayload {
    /// New volume (0-100) for `volume` events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<u8>,
    /// Playback position for `seek` events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_sec: Option<f32>,
}

impl EventPayload {
    pub fn volume(value: u8) -> Self {
        Self {
            volume: Some(value.min(100)),
            ..Self::default()
        }
    }
}

/// One interaction, immutable once created at ingress.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InteractionEvent {
    pub kind: InteractionKind,
    pub timestamp_us: i64,
    #[serde(default)]
    pub payload: EventPayload,
}

impl InteractionEvent {
    pub fn new(kind: InteractionKind, timestamp_us: i64) -> Self {
        Self {
            kind,
            timestamp_us,
            payload: EventPayload::default(),
        }
    }

    pub fn with_payload(mut self, payload: EventPayload) -> Self {
        self.payload = payload;
        self
    }
}

// ============================================================================
// ATTENTION LEVELS AND ADAPTATIONS
// ============================================================================

/// Discrete attention level derived from the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttentionLevel {
    #[default]
    Attentive,
    SemiAttentive,
    LowAttentive,
    Inattentive,
}

impl AttentionLevel {
    /// Step function over the 75/50/25 breakpoints.
    pub fn from_score(score: u8) -> Self {
        match score {
            75..=u8::MAX => Self::Attentive,
            50..=74 => Self::SemiAttentive,
            25..=49 => Self::LowAttentive,
            _ => Self::Inattentive,
        }
    }

    /// Static preset for this level.
    pub fn adaptations(&self) -> Adaptations {
        match self {
            Self::Attentive => Adaptations {
                volume: 100,
                music_style: MusicStyle::Engaging,
                ui_intensity: UiIntensity::High,
            },
            Self::SemiAttentive => Adaptations {
                volume: 90,
                music_style: MusicStyle::Comfortable,
                ui_intensity: UiIntensity::Medium,
            },
            Self::LowAttentive => Adaptations {
                volume: 70,
                music_style: MusicStyle::Discrete,
                ui_intensity: UiIntensity::Low,
            },
            Self::Inattentive => Adaptations {
                volume: 40,
                music_style: MusicStyle::Pause,
                ui_intensity: UiIntensity::Minimal,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Attentive => "attentive",
            Self::SemiAttentive => "semi-attentive",
            Self::LowAttentive => "low-attentive",
            Self::Inattentive => "inattentive",
        }
    }
}

impl fmt::Display for AttentionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MusicStyle {
    Engaging,
    Comfortable,
    Discrete,
    Pause,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UiIntensity {
    High,
    Medium,
    Low,
    Minimal,
}

/// Playback adaptation preset applied by the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Adaptations {
    /// Target volume (0-100)
    pub volume: u8,
    pub music_style: MusicStyle,
    pub ui_intensity: UiIntensity,
}

impl Default for Adaptations {
    fn default() -> Self {
        AttentionLevel::default().adaptations()
    }
}
