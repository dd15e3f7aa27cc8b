#[cfg(test)]
mod tests {
    use crate::config::*;
    use parking_lot::Mutex;
    use std::env;
    use std::fs;
    use tempfile::NamedTempFile;

    // Env overrides are process-global
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_default_config_valid() {
        let config = AttuneConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_values() {
        let config = AttuneConfig::default();

        assert_eq!(config.scorer.skip_burst_window_sec, 60);
        assert_eq!(config.scorer.volume_window_sec, 120);
        assert_eq!(config.scorer.pause_window_sec, 300);
        assert_eq!(config.movement.std_threshold_deg, 0.8);
        assert_eq!(config.movement.quality_calibration_deg, 20.0);
        assert_eq!(config.fusion.warmup_ms, 3_000);
        assert_eq!(config.fusion.history_capacity, 10);
        assert_eq!(config.pipeline.queue_capacity, 10);
        assert_eq!(config.pipeline.fusion_interval_ms, 1_000);
    }

    #[test]
    fn test_config_validation_movement() {
        let mut config = AttuneConfig::default();

        config.movement.min_samples = 1;
        assert!(config.validate().is_err());

        config.movement.min_samples = 10;
        config.movement.quality_window_sec = 5.0; // longer than the 4s window
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_fusion() {
        let mut config = AttuneConfig::default();

        config.fusion.expression_confidence_threshold = 1.5;
        assert!(config.validate().is_err());

        config.fusion.expression_confidence_threshold = 0.5;
        config.fusion.history_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_pipeline() {
        let mut config = AttuneConfig::default();

        config.pipeline.queue_capacity = 0;
        assert!(config.validate().is_err());

        // join timeout shorter than one poll cannot be honoured
        config.pipeline.queue_capacity = 10;
        config.pipeline.join_timeout_ms = 50;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_to_toml_string() {
        let config = AttuneConfig::default();
        let toml_str = config.to_toml_string().unwrap();

        assert!(toml_str.contains("[scorer]"));
        assert!(toml_str.contains("[movement]"));
        assert!(toml_str.contains("[fusion]"));
        assert!(toml_str.contains("[pipeline]"));
        assert!(toml_str.contains("skip_burst_window_sec"));
    }

    #[test]
    fn test_config_from_toml_string() {
        let toml_str = r#"
            [scorer]
            skip_burst_window_sec = 45
            volume_window_sec = 120
            pause_window_sec = 300
            adaptive_log_capacity = 20

            [movement]
            window_sec = 3.0
            min_samples = 8
            std_window_samples = 8
            std_threshold_deg = 1.0
            quality_window_sec = 1.0
            quality_calibration_deg = 20.0

            [fusion]
            warmup_ms = 1000
            expression_confidence_threshold = 0.6
            drowsy_pitch_deg = 25.0
            centered_max_angle_deg = 15.0
            history_capacity = 5

            [pipeline]
            queue_capacity = 4
            poll_timeout_ms = 50
            fusion_interval_ms = 500
            join_timeout_ms = 1000
        "#;

        let config: AttuneConfig = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_ok());

        assert_eq!(config.scorer.skip_burst_window_sec, 45);
        assert_eq!(config.movement.min_samples, 8);
        assert_eq!(config.fusion.drowsy_pitch_deg, 25.0);
        assert_eq!(config.pipeline.queue_capacity, 4);
    }

    #[test]
    fn test_config_save_and_load() {
        let mut config = AttuneConfig::default();
        config.fusion.warmup_ms = 500;

        let temp_file = NamedTempFile::new().unwrap();
        config.save_to_file(temp_file.path()).unwrap();

        let loaded = AttuneConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_env_overrides() {
        let _guard = ENV_LOCK.lock();
        env::set_var("ATTUNE_FUSION_WARMUP_MS", "250");
        env::set_var("ATTUNE_MOVEMENT_STD_THRESHOLD_DEG", "1.2");
        env::set_var("ATTUNE_PIPELINE_QUEUE_CAPACITY", "32");

        let mut config = AttuneConfig::default();
        let result = config.apply_env_overrides();

        env::remove_var("ATTUNE_FUSION_WARMUP_MS");
        env::remove_var("ATTUNE_MOVEMENT_STD_THRESHOLD_DEG");
        env::remove_var("ATTUNE_PIPELINE_QUEUE_CAPACITY");

        result.unwrap();
        assert_eq!(config.fusion.warmup_ms, 250);
        assert_eq!(config.movement.std_threshold_deg, 1.2);
        assert_eq!(config.pipeline.queue_capacity, 32);
    }

    #[test]
    fn test_invalid_env_var_handling() {
        let _guard = ENV_LOCK.lock();
        env::set_var("ATTUNE_PIPELINE_FUSION_INTERVAL_MS", "soon");

        let mut config = AttuneConfig::default();
        let result = config.apply_env_overrides();

        env::remove_var("ATTUNE_PIPELINE_FUSION_INTERVAL_MS");

        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_config_layered_loading() {
        let _guard = ENV_LOCK.lock();
        let default_file = NamedTempFile::new().unwrap();
        let user_file = NamedTempFile::new().unwrap();

        AttuneConfig::default()
            .save_to_file(default_file.path())
            .unwrap();

        let mut user_config = AttuneConfig::default();
        user_config.scorer.skip_burst_window_sec = 90;
        user_config.fusion.drowsy_pitch_deg = 35.0;
        user_config.save_to_file(user_file.path()).unwrap();

        let loaded =
            AttuneConfig::load_layered(Some(default_file.path()), Some(user_file.path())).unwrap();

        assert_eq!(loaded.scorer.skip_burst_window_sec, 90);
        assert_eq!(loaded.fusion.drowsy_pitch_deg, 35.0);
    }

    #[test]
    fn test_layered_missing_files_fall_back_to_defaults() {
        let _guard = ENV_LOCK.lock();
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("attune.toml");

        let loaded = AttuneConfig::load_layered(Some(missing.as_path()), None).unwrap();
        assert_eq!(loaded, AttuneConfig::default());
    }

    #[test]
    fn test_config_file_not_found() {
        let result = AttuneConfig::from_file("nonexistent.toml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_invalid_toml_syntax() {
        let temp_file = NamedTempFile::new().unwrap();
        fs::write(temp_file.path(), "invalid toml: syntax").unwrap();

        let result = AttuneConfig::from_file(temp_file.path());
        assert!(matches!(result, Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn test_partial_config_rejected() {
        let toml_str = r#"
            [scorer]
            skip_burst_window_sec = 30
        "#;

        let result: Result<AttuneConfig, _> = toml::from_str(toml_str);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_file_fails_validation() {
        let mut config = AttuneConfig::default();
        config.pipeline.poll_timeout_ms = 0;
        let temp_file = NamedTempFile::new().unwrap();
        config.save_to_file(temp_file.path()).unwrap();

        let result = AttuneConfig::from_file(temp_file.path());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }
}
