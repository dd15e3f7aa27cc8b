//! Interaction Attention Scorer
//!
//! Rule-based attention estimate driven by discrete UI events. Every
//! recomputation starts from 100 and applies fixed-tier adjustments:
//!
//! | signal                         | tiers                        |
//! |--------------------------------|------------------------------|
//! | time since last interaction    | >600s −40, >300s −30, >120s −15, >30s −5 |
//! | skips in burst window          | ≥5 −25, ≥3 −15, ≥1 −5        |
//! | volume changes in window       | ≥3 +10, ≥1 +5                |
//! | pauses in window               | ≥5 −10, ≥3 −5                |
//! | tab switches (session)         | >10 −10, >5 −5               |
//!
//! The result is clamped to [0, 100] and mapped to an `AttentionLevel`, whose
//! static preset becomes the current `Adaptations`.
//!
//! Decay is never self-triggered: callers drive `check_and_update_at` on an
//! external cadence.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

use crate::config::ScorerConfig;
use crate::domain::{
    dt_sec, dt_us, Adaptations, AttentionLevel, InteractionEvent, InteractionKind,
};

/// Starting score for every recomputation.
pub const INITIAL_SCORE: i32 = 100;

/// (elapsed seconds strictly exceeded, penalty), checked in order.
pub const DECAY_TIERS: [(f32, i32); 4] = [(600.0, 40), (300.0, 30), (120.0, 15), (30.0, 5)];
/// (minimum skip count, penalty)
pub const SKIP_TIERS: [(usize, i32); 3] = [(5, 25), (3, 15), (1, 5)];
/// (minimum volume-change count, bonus)
pub const VOLUME_TIERS: [(usize, i32); 2] = [(3, 10), (1, 5)];
/// (minimum pause count, penalty)
pub const PAUSE_TIERS: [(usize, i32); 2] = [(5, 10), (3, 5)];
/// (tab switches strictly exceeded, penalty)
pub const TAB_TIERS: [(u32, i32); 2] = [(10, 10), (5, 5)];

fn tier_at_least<T: PartialOrd + Copy>(tiers: &[(T, i32)], value: T) -> i32 {
    tiers
        .iter()
        .find(|(edge, _)| value >= *edge)
        .map_or(0, |(_, points)| *points)
}

fn tier_above<T: PartialOrd + Copy>(tiers: &[(T, i32)], value: T) -> i32 {
    tiers
        .iter()
        .find(|(edge, _)| value > *edge)
        .map_or(0, |(_, points)| *points)
}

/// Recorded whenever the adaptation preset changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveAction {
    pub timestamp_us: i64,
    pub level: AttentionLevel,
    pub adaptations: Adaptations,
}

/// Read-only view of the scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttentionSnapshot {
    pub attention_score: u8,
    pub attention_level: AttentionLevel,
    pub adaptations: Adaptations,
    /// Live elapsed time since the last user interaction
    pub time_since_interaction_sec: f32,
    pub recent_skips: usize,
    pub tab_switches: u32,
    pub total_interactions: u64,
    pub interactions_by_kind: BTreeMap<InteractionKind, u64>,
    pub timestamp_us: i64,
}

/// Canonical interaction-driven attention state.
#[derive(Debug, Clone)]
pub struct InteractionAttentionScorer {
    config: ScorerConfig,
    score: u8,
    level: AttentionLevel,
    adaptations: Adaptations,
    last_interaction_us: i64,
    skips: VecDeque<i64>,
    volume_changes: VecDeque<i64>,
    pauses: VecDeque<i64>,
    tab_switches: u32,
    total_interactions: u64,
    by_kind: BTreeMap<InteractionKind, u64>,
    adaptive_log: VecDeque<AdaptiveAction>,
}

impl InteractionAttentionScorer {
    /// Fresh session starting at `now_us`.
    pub fn new(config: ScorerConfig, now_us: i64) -> Self {
        let level = AttentionLevel::Attentive;
        Self {
            config,
            score: INITIAL_SCORE as u8,
            level,
            adaptations: level.adaptations(),
            last_interaction_us: now_us,
            skips: VecDeque::new(),
            volume_changes: VecDeque::new(),
            pauses: VecDeque::new(),
            tab_switches: 0,
            total_interactions: 0,
            by_kind: BTreeMap::new(),
            adaptive_log: VecDeque::new(),
        }
    }

    /// Record one event and recompute at the event's timestamp.
    pub fn track(&mut self, event: &InteractionEvent) -> AttentionSnapshot {
        let ts = event.timestamp_us;
        self.total_interactions += 1;
        *self.by_kind.entry(event.kind).or_insert(0) += 1;

        if event.kind.is_user_interaction() {
            self.last_interaction_us = self.last_interaction_us.max(ts);
        }

        match event.kind {
            InteractionKind::Skip => self.skips.push_back(ts),
            InteractionKind::Volume => self.volume_changes.push_back(ts),
            InteractionKind::Pause => self.pauses.push_back(ts),
            InteractionKind::TabHidden => self.tab_switches = self.tab_switches.saturating_add(1),
            _ => {}
        }

        log::debug!("scorer: tracked {} at {}us", event.kind, ts);
        self.recompute(ts);
        self.snapshot(ts)
    }

    /// Forced recompute at `now_us`, so inactivity decays the score.
    pub fn check_and_update_at(&mut self, now_us: i64) -> AttentionSnapshot {
        self.recompute(now_us);
        self.snapshot(now_us)
    }

    /// Pure read at `now_us`.
    pub fn state_at(&self, now_us: i64) -> AttentionSnapshot {
        self.snapshot(now_us)
    }

    /// Average a sensor-derived score into the current score.
    ///
    /// Histories are untouched; the next recompute starts from 100 again.
    pub fn blend_sensor_score(&mut self, sensor_score: u8, now_us: i64) -> AttentionSnapshot {
        let blended = ((self.score as u16 + sensor_score.min(100) as u16) / 2) as u8;
        log::debug!(
            "scorer: blend interaction={} sensor={} -> {}",
            self.score,
            sensor_score,
            blended
        );
        self.apply_score(blended, now_us);
        self.snapshot(now_us)
    }

    /// Reinitialize all histories, counters and the score.
    pub fn reset(&mut self, now_us: i64) {
        log::info!("scorer: session reset");
        *self = Self::new(self.config.clone(), now_us);
    }

    fn recompute(&mut self, now_us: i64) {
        self.prune(now_us);

        let idle_sec = dt_sec(now_us, self.last_interaction_us);
        let mut score = INITIAL_SCORE;
        score -= tier_above(&DECAY_TIERS, idle_sec);
        score -= tier_at_least(&SKIP_TIERS, self.skips.len());
        score += tier_at_least(&VOLUME_TIERS, self.volume_changes.len());
        score -= tier_at_least(&PAUSE_TIERS, self.pauses.len());
        score -= tier_above(&TAB_TIERS, self.tab_switches);

        self.apply_score(score.clamp(0, 100) as u8, now_us);
    }

    fn apply_score(&mut self, score: u8, now_us: i64) {
        let score = score.min(100);
        let level = AttentionLevel::from_score(score);
        if level != self.level {
            log::info!(
                "scorer: level {} -> {} (score {})",
                self.level,
                level,
                score
            );
        }

        let adaptations = level.adaptations();
        if adaptations != self.adaptations {
            self.adaptive_log.push_back(AdaptiveAction {
                timestamp_us: now_us,
                level,
                adaptations,
            });
            while self.adaptive_log.len() > self.config.adaptive_log_capacity {
                self.adaptive_log.pop_front();
            }
        }

        self.score = score;
        self.level = level;
        self.adaptations = adaptations;
    }

    fn prune(&mut self, now_us: i64) {
        let skip_us = self.config.skip_burst_window_sec * 1_000_000;
        let volume_us = self.config.volume_window_sec * 1_000_000;
        let pause_us = self.config.pause_window_sec * 1_000_000;

        self.skips.retain(|&t| dt_us(now_us, t) < skip_us);
        self.volume_changes.retain(|&t| dt_us(now_us, t) < volume_us);
        self.pauses.retain(|&t| dt_us(now_us, t) < pause_us);
    }

    fn snapshot(&self, now_us: i64) -> AttentionSnapshot {
        let skip_us = self.config.skip_burst_window_sec * 1_000_000;
        AttentionSnapshot {
            attention_score: self.score,
            attention_level: self.level,
            adaptations: self.adaptations,
            time_since_interaction_sec: dt_sec(now_us, self.last_interaction_us),
            recent_skips: self
                .skips
                .iter()
                .filter(|&&t| dt_us(now_us, t) < skip_us)
                .count(),
            tab_switches: self.tab_switches,
            total_interactions: self.total_interactions,
            interactions_by_kind: self.by_kind.clone(),
            timestamp_us: now_us,
        }
    }

    pub fn score(&self) -> u8 {
        self.score
    }

    pub fn level(&self) -> AttentionLevel {
        self.level
    }

    pub fn adaptations(&self) -> Adaptations {
        self.adaptations
    }

    /// Preset changes, oldest first.
    pub fn adaptive_actions(&self) -> impl Iterator<Item = &AdaptiveAction> {
        self.adaptive_log.iter()
    }

    pub fn config(&self) -> &ScorerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EventPayload, MusicStyle};

    const SEC: i64 = 1_000_000;

    fn scorer() -> InteractionAttentionScorer {
        InteractionAttentionScorer::new(ScorerConfig::default(), 0)
    }

    fn event(kind: InteractionKind, ts: i64) -> InteractionEvent {
        InteractionEvent::new(kind, ts)
    }

    #[test]
    fn test_fresh_session() {
        let s = scorer();
        let snap = s.state_at(0);
        assert_eq!(snap.attention_score, 100);
        assert_eq!(snap.attention_level, AttentionLevel::Attentive);
        assert_eq!(snap.adaptations.volume, 100);
        assert_eq!(s.adaptive_actions().count(), 0);
    }

    #[test]
    fn test_skip_tiers() {
        let expected = [(1, 95), (2, 95), (3, 85), (4, 85), (5, 75), (6, 75)];
        for (count, score) in expected {
            let mut s = scorer();
            let mut last = None;
            for i in 0..count {
                last = Some(s.track(&event(InteractionKind::Skip, i * SEC)));
            }
            let snap = last.unwrap();
            assert_eq!(snap.attention_score, score, "{} skips", count);
            assert_eq!(snap.recent_skips, count as usize);
        }
    }

    #[test]
    fn test_skips_expire_from_burst_window() {
        let mut s = scorer();
        for i in 0..5 {
            s.track(&event(InteractionKind::Skip, i * SEC));
        }
        assert_eq!(s.score(), 75);

        // Play at 70s: all skips older than 60s
        let snap = s.track(&event(InteractionKind::Play, 70 * SEC));
        assert_eq!(snap.attention_score, 100);
        assert_eq!(snap.recent_skips, 0);
    }

    #[test]
    fn test_volume_bonus_clamped() {
        let mut s = scorer();
        for i in 0..3 {
            s.track(&event(InteractionKind::Volume, i * SEC).with_payload(EventPayload::volume(60)));
        }
        assert_eq!(s.score(), 100);

        // Bonus offsets a skip penalty
        let snap = s.track(&event(InteractionKind::Skip, 4 * SEC));
        assert_eq!(snap.attention_score, 100);
    }

    #[test]
    fn test_pause_tiers() {
        let mut s = scorer();
        for i in 0..3 {
            s.track(&event(InteractionKind::Pause, i * SEC));
        }
        assert_eq!(s.score(), 95);
        for i in 3..5 {
            s.track(&event(InteractionKind::Pause, i * SEC));
        }
        assert_eq!(s.score(), 90);
    }

    #[test]
    fn test_tab_switch_tiers() {
        let mut s = scorer();
        for i in 0..5 {
            s.track(&event(InteractionKind::TabHidden, i * SEC));
        }
        assert_eq!(s.score(), 100);

        s.track(&event(InteractionKind::TabHidden, 5 * SEC));
        assert_eq!(s.score(), 95);

        for i in 6..11 {
            s.track(&event(InteractionKind::TabHidden, i * SEC));
        }
        assert_eq!(s.state_at(11 * SEC).tab_switches, 11);
        assert_eq!(s.score(), 90);
    }

    #[test]
    fn test_decay_tiers_non_cumulative() {
        let mut s = scorer();
        let cases = [
            (30, 100),
            (31, 95),
            (121, 85),
            (301, 70),
            (601, 60),
            (3_600, 60),
        ];
        for (elapsed, score) in cases {
            let snap = s.check_and_update_at(elapsed * SEC);
            assert_eq!(snap.attention_score, score, "after {}s", elapsed);
        }

        // Repeating the same tick does not compound the penalty
        assert_eq!(s.check_and_update_at(3_600 * SEC).attention_score, 60);
    }

    #[test]
    fn test_interaction_resets_decay() {
        let mut s = scorer();
        s.check_and_update_at(400 * SEC);
        assert_eq!(s.score(), 70);

        let snap = s.track(&event(InteractionKind::Play, 401 * SEC));
        assert_eq!(snap.attention_score, 100);
        assert_eq!(snap.time_since_interaction_sec, 0.0);
    }

    #[test]
    fn test_absent_event_does_not_refresh_interaction() {
        let mut s = scorer();
        let snap = s.track(&event(InteractionKind::Absent, 200 * SEC));
        assert_eq!(snap.attention_score, 85);
        assert_eq!(snap.time_since_interaction_sec, 200.0);
        assert_eq!(snap.interactions_by_kind[&InteractionKind::Absent], 1);
    }

    #[test]
    fn test_state_at_is_pure() {
        let mut s = scorer();
        s.track(&event(InteractionKind::Skip, 0));
        let a = s.state_at(500 * SEC);
        let b = s.state_at(500 * SEC);
        assert_eq!(a, b);
        assert_eq!(a.attention_score, 95);
        // Skip outside window is not counted but also not pruned
        assert_eq!(a.recent_skips, 0);
        assert_eq!(s.state_at(10 * SEC).recent_skips, 1);
    }

    #[test]
    fn test_blend_sensor_score() {
        let mut s = scorer();
        let snap = s.blend_sensor_score(20, 0);
        assert_eq!(snap.attention_score, 60);
        assert_eq!(snap.attention_level, AttentionLevel::SemiAttentive);
        assert_eq!(snap.adaptations.music_style, MusicStyle::Comfortable);

        // Integer average rounds down
        let snap = s.blend_sensor_score(5, SEC);
        assert_eq!(snap.attention_score, 32);
        assert_eq!(snap.attention_level, AttentionLevel::LowAttentive);
    }

    #[test]
    fn test_adaptive_log_records_preset_changes() {
        let mut s = scorer();
        s.blend_sensor_score(20, 0); // attentive -> semi
        s.blend_sensor_score(40, SEC); // 50, still semi
        s.blend_sensor_score(0, 2 * SEC); // 25 -> low

        let levels: Vec<_> = s.adaptive_actions().map(|a| a.level).collect();
        assert_eq!(
            levels,
            vec![AttentionLevel::SemiAttentive, AttentionLevel::LowAttentive]
        );
    }

    #[test]
    fn test_adaptive_log_bounded() {
        let mut s = InteractionAttentionScorer::new(
            ScorerConfig {
                adaptive_log_capacity: 3,
                ..ScorerConfig::default()
            },
            0,
        );
        for i in 0..10 {
            let sensor = if i % 2 == 0 { 0 } else { 100 };
            s.blend_sensor_score(sensor, i * SEC);
            s.check_and_update_at(i * SEC);
        }
        assert_eq!(s.adaptive_actions().count(), 3);
    }

    #[test]
    fn test_reset() {
        let mut s = scorer();
        for i in 0..6 {
            s.track(&event(InteractionKind::Skip, i * SEC));
        }
        s.track(&event(InteractionKind::TabHidden, 7 * SEC));
        s.blend_sensor_score(0, 8 * SEC);

        s.reset(100 * SEC);
        let snap = s.state_at(100 * SEC);
        assert_eq!(snap.attention_score, 100);
        assert_eq!(snap.recent_skips, 0);
        assert_eq!(snap.tab_switches, 0);
        assert_eq!(snap.total_interactions, 0);
        assert!(snap.interactions_by_kind.is_empty());
        assert_eq!(s.adaptive_actions().count(), 0);
    }
}
