//! Shared, lock-guarded scorer handle.
//!
//! UI tracking, the decay tick and the sensor blend all go through one
//! `parking_lot::Mutex`, so a reader never sees a half-updated
//! score/level/adaptations triple.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::config::ScorerConfig;
use crate::domain::{now_us, EventPayload, InteractionEvent, InteractionKind, UnknownInteraction};
use crate::scorer::{AdaptiveAction, AttentionSnapshot, InteractionAttentionScorer};

#[derive(Debug, Clone)]
pub struct SharedScorer {
    inner: Arc<Mutex<InteractionAttentionScorer>>,
}

impl SharedScorer {
    pub fn new(config: ScorerConfig) -> Self {
        Self::from_scorer(InteractionAttentionScorer::new(config, now_us()))
    }

    pub fn from_scorer(scorer: InteractionAttentionScorer) -> Self {
        Self {
            inner: Arc::new(Mutex::new(scorer)),
        }
    }

    /// Track an interaction stamped with the current wall clock.
    pub fn track(&self, kind: InteractionKind, payload: Option<EventPayload>) -> AttentionSnapshot {
        let event = InteractionEvent::new(kind, now_us()).with_payload(payload.unwrap_or_default());
        self.track_event(&event)
    }

    /// Track a pre-stamped event.
    pub fn track_event(&self, event: &InteractionEvent) -> AttentionSnapshot {
        self.inner.lock().track(event)
    }

    /// Ingress from an untyped kind string. Unknown kinds mutate nothing.
    pub fn track_kind(
        &self,
        kind: &str,
        payload: Option<EventPayload>,
    ) -> Result<AttentionSnapshot, UnknownInteraction> {
        match kind.parse::<InteractionKind>() {
            Ok(kind) => Ok(self.track(kind, payload)),
            Err(e) => {
                log::debug!("scorer: rejected interaction: {}", e);
                Err(e)
            }
        }
    }

    /// Pure read.
    pub fn get_state(&self) -> AttentionSnapshot {
        self.state_at(now_us())
    }

    pub fn state_at(&self, now_us: i64) -> AttentionSnapshot {
        self.inner.lock().state_at(now_us)
    }

    /// Forced decay recompute; call on an external cadence.
    pub fn check_and_update(&self) -> AttentionSnapshot {
        self.check_and_update_at(now_us())
    }

    pub fn check_and_update_at(&self, now_us: i64) -> AttentionSnapshot {
        self.inner.lock().check_and_update_at(now_us)
    }

    pub fn blend_sensor_score(&self, sensor_score: u8, now_us: i64) -> AttentionSnapshot {
        self.inner.lock().blend_sensor_score(sensor_score, now_us)
    }

    pub fn reset(&self) {
        self.inner.lock().reset(now_us());
    }

    pub fn adaptive_actions(&self) -> Vec<AdaptiveAction> {
        self.inner.lock().adaptive_actions().cloned().collect()
    }

    /// Run `f` under the scorer lock.
    pub fn with_scorer<R>(&self, f: impl FnOnce(&mut InteractionAttentionScorer) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

impl Default for SharedScorer {
    fn default() -> Self {
        Self::new(ScorerConfig::default())
    }
}
