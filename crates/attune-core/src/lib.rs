//! # attune-core
//!
//! Interaction-side attention scoring for attune.
//!
//! - **domain**: interaction events, attention levels, adaptation presets, time helpers
//! - **scorer**: rule-based, time-decaying `InteractionAttentionScorer`
//! - **session**: `SharedScorer`, the single critical section all writers go through
//! - **config**: layered `AttuneConfig` (defaults, TOML, `ATTUNE_*` env)

pub mod config;
pub mod domain;
pub mod scorer;
pub mod session;

#[cfg(test)]
pub mod tests_config;

#[cfg(test)]
pub mod tests_proptest;

pub use config::{AttuneConfig, ConfigError, PipelineConfig, ScorerConfig};
pub use domain::{
    dt_sec, dt_us, now_us, Adaptations, AttentionLevel, EventPayload, InteractionEvent,
    InteractionKind, MusicStyle, UiIntensity, UnknownInteraction,
};
pub use scorer::{AdaptiveAction, AttentionSnapshot, InteractionAttentionScorer};
pub use session::SharedScorer;

// Sensor-side types, re-exported so downstream crates need one import path
pub use attune_signals::{FusionConfig, MovementConfig};
