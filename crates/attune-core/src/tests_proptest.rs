use proptest::prelude::*;

/// Property-based checks for the scorer invariants

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScorerConfig;
    use crate::domain::{AttentionLevel, InteractionEvent, InteractionKind};
    use crate::scorer::InteractionAttentionScorer;

    #[derive(Debug, Clone)]
    enum Op {
        Track(InteractionKind, i64),
        Tick(i64),
        Blend(u8, i64),
    }

    fn kind_strategy() -> impl Strategy<Value = InteractionKind> {
        prop_oneof![
            Just(InteractionKind::Play),
            Just(InteractionKind::Pause),
            Just(InteractionKind::Skip),
            Just(InteractionKind::Volume),
            Just(InteractionKind::Seek),
            Just(InteractionKind::Playlist),
            Just(InteractionKind::TabVisible),
            Just(InteractionKind::TabHidden),
            Just(InteractionKind::SessionStart),
            Just(InteractionKind::Absent),
        ]
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        // Time deltas up to 15 minutes between operations
        let delta = 0i64..900_000_000i64;
        prop_oneof![
            4 => (kind_strategy(), delta.clone()).prop_map(|(k, d)| Op::Track(k, d)),
            1 => delta.clone().prop_map(Op::Tick),
            1 => (any::<u8>(), delta).prop_map(|(s, d)| Op::Blend(s, d)),
        ]
    }

    // =========================================================================
    // Score stays in range, level/adaptations stay consistent
    // =========================================================================
    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn test_score_always_in_range(ops in prop::collection::vec(op_strategy(), 1..80)) {
            let mut scorer = InteractionAttentionScorer::new(ScorerConfig::default(), 0);
            let mut now = 0i64;

            for op in ops {
                let snap = match op {
                    Op::Track(kind, d) => {
                        now += d;
                        scorer.track(&InteractionEvent::new(kind, now))
                    }
                    Op::Tick(d) => {
                        now += d;
                        scorer.check_and_update_at(now)
                    }
                    Op::Blend(s, d) => {
                        now += d;
                        scorer.blend_sensor_score(s, now)
                    }
                };

                prop_assert!(snap.attention_score <= 100);
                prop_assert_eq!(snap.attention_level, AttentionLevel::from_score(snap.attention_score));
                prop_assert_eq!(snap.adaptations, snap.attention_level.adaptations());
            }
        }
    }

    // =========================================================================
    // Level is a step function of the 75/50/25 breakpoints
    // =========================================================================
    proptest! {
        #[test]
        fn test_level_step_function(score in 0u8..=100u8) {
            let expected = if score >= 75 {
                AttentionLevel::Attentive
            } else if score >= 50 {
                AttentionLevel::SemiAttentive
            } else if score >= 25 {
                AttentionLevel::LowAttentive
            } else {
                AttentionLevel::Inattentive
            };
            prop_assert_eq!(AttentionLevel::from_score(score), expected);
        }

        #[test]
        fn test_level_monotone(a in 0u8..=100u8, b in 0u8..=100u8) {
            let rank = |l: AttentionLevel| match l {
                AttentionLevel::Inattentive => 0,
                AttentionLevel::LowAttentive => 1,
                AttentionLevel::SemiAttentive => 2,
                AttentionLevel::Attentive => 3,
            };
            if a <= b {
                prop_assert!(rank(AttentionLevel::from_score(a)) <= rank(AttentionLevel::from_score(b)));
            }
        }
    }

    // =========================================================================
    // Reads never mutate
    // =========================================================================
    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn test_state_read_is_pure(
            ops in prop::collection::vec(op_strategy(), 0..30),
            read_at in 0i64..3_600_000_000i64,
        ) {
            let mut scorer = InteractionAttentionScorer::new(ScorerConfig::default(), 0);
            let mut now = 0i64;
            for op in ops {
                match op {
                    Op::Track(kind, d) => { now += d; scorer.track(&InteractionEvent::new(kind, now)); }
                    Op::Tick(d) => { now += d; scorer.check_and_update_at(now); }
                    Op::Blend(s, d) => { now += d; scorer.blend_sensor_score(s, now); }
                }
            }

            let first = scorer.state_at(read_at);
            let second = scorer.state_at(read_at);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn test_idle_decay_not_cumulative(ticks in prop::collection::vec(0i64..1_200_000_000i64, 1..20)) {
            let mut scorer = InteractionAttentionScorer::new(ScorerConfig::default(), 0);
            for t in ticks {
                let snap = scorer.check_and_update_at(t);
                let idle = t as f32 / 1_000_000.0;
                let expected = if idle > 600.0 {
                    60
                } else if idle > 300.0 {
                    70
                } else if idle > 120.0 {
                    85
                } else if idle > 30.0 {
                    95
                } else {
                    100
                };
                prop_assert_eq!(snap.attention_score, expected);
            }
        }
    }
}
