use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use attune_signals::{FusionConfig, MovementConfig};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttuneConfig {
    pub scorer: ScorerConfig,
    pub movement: MovementConfig,
    pub fusion: FusionConfig,
    pub pipeline: PipelineConfig,
}

/// Rolling-history windows for the interaction scorer.
/// Tier thresholds and penalties are fixed constants in `scorer`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScorerConfig {
    /// Skips inside this window count toward the burst penalty
    pub skip_burst_window_sec: u64,
    /// Volume changes inside this window count toward the engagement bonus
    pub volume_window_sec: u64,
    /// Pauses inside this window count toward the pause penalty
    pub pause_window_sec: u64,
    /// Max entries kept in the adaptive-action log
    pub adaptive_log_capacity: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Capacity of each modality ingestion queue
    pub queue_capacity: usize,
    /// Bounded receive timeout in modality workers (also the shutdown check)
    pub poll_timeout_ms: u64,
    /// Fusion tick period
    pub fusion_interval_ms: u64,
    /// Max wait for workers to exit on stop
    pub join_timeout_ms: u64,
}

impl Default for AttuneConfig {
    fn default() -> Self {
        Self {
            scorer: ScorerConfig::default(),
            movement: MovementConfig::default(),
            fusion: FusionConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            skip_burst_window_sec: 60,
            volume_window_sec: 120,
            pause_window_sec: 300,
            adaptive_log_capacity: 50,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 10,
            poll_timeout_ms: 100,
            fusion_interval_ms: 1_000,
            join_timeout_ms: 2_000,
        }
    }
}

fn env_override<T: FromStr>(key: &str, target: &mut T) -> Result<(), ConfigError> {
    match std::env::var(key) {
        Ok(val) => {
            *target = val
                .trim()
                .parse()
                .map_err(|_| ConfigError::Validation(format!("Invalid {}", key)))?;
            log::debug!("config: {} overridden from environment", key);
            Ok(())
        }
        Err(std::env::VarError::NotPresent) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

impl AttuneConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: AttuneConfig = toml::from_str(&content)?;
        config.validate()?;
        log::info!("config: loaded {}", path.as_ref().display());
        Ok(config)
    }

    /// Load configuration with environment variable overrides.
    /// Variables are prefixed with ATTUNE_, e.g. ATTUNE_FUSION_WARMUP_MS=5000
    pub fn from_file_with_env<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from multiple sources with priority:
    /// 1. Environment variables (highest priority)
    /// 2. User config file (if exists)
    /// 3. Default config file
    /// 4. Built-in defaults (lowest priority)
    ///
    /// A file layer replaces the layer below it as a whole.
    pub fn load_layered(
        default_path: Option<&Path>,
        user_path: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let mut config = AttuneConfig::default();

        if let Some(path) = default_path {
            if path.exists() {
                config = Self::from_file(path)?;
            }
        }

        if let Some(path) = user_path {
            if path.exists() {
                config = Self::from_file(path)?;
            }
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        // Scorer
        env_override(
            "ATTUNE_SCORER_SKIP_BURST_WINDOW_SEC",
            &mut self.scorer.skip_burst_window_sec,
        )?;
        env_override(
            "ATTUNE_SCORER_VOLUME_WINDOW_SEC",
            &mut self.scorer.volume_window_sec,
        )?;
        env_override(
            "ATTUNE_SCORER_PAUSE_WINDOW_SEC",
            &mut self.scorer.pause_window_sec,
        )?;

        // Movement
        env_override("ATTUNE_MOVEMENT_WINDOW_SEC", &mut self.movement.window_sec)?;
        env_override(
            "ATTUNE_MOVEMENT_STD_THRESHOLD_DEG",
            &mut self.movement.std_threshold_deg,
        )?;

        // Fusion
        env_override("ATTUNE_FUSION_WARMUP_MS", &mut self.fusion.warmup_ms)?;
        env_override(
            "ATTUNE_FUSION_DROWSY_PITCH_DEG",
            &mut self.fusion.drowsy_pitch_deg,
        )?;

        // Pipeline
        env_override(
            "ATTUNE_PIPELINE_QUEUE_CAPACITY",
            &mut self.pipeline.queue_capacity,
        )?;
        env_override(
            "ATTUNE_PIPELINE_POLL_TIMEOUT_MS",
            &mut self.pipeline.poll_timeout_ms,
        )?;
        env_override(
            "ATTUNE_PIPELINE_FUSION_INTERVAL_MS",
            &mut self.pipeline.fusion_interval_ms,
        )?;
        env_override(
            "ATTUNE_PIPELINE_JOIN_TIMEOUT_MS",
            &mut self.pipeline.join_timeout_ms,
        )?;

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Validation(msg.to_string()));

        // Scorer validation
        if self.scorer.skip_burst_window_sec == 0
            || self.scorer.volume_window_sec == 0
            || self.scorer.pause_window_sec == 0
        {
            return invalid("scorer windows must be > 0");
        }
        if self.scorer.adaptive_log_capacity == 0 {
            return invalid("scorer.adaptive_log_capacity must be > 0");
        }

        // Movement validation
        let m = &self.movement;
        if m.window_sec <= 0.0 {
            return invalid("movement.window_sec must be positive");
        }
        if m.min_samples < 2 || m.std_window_samples < 2 {
            return invalid("movement.min_samples and std_window_samples must be >= 2");
        }
        if m.std_threshold_deg <= 0.0 {
            return invalid("movement.std_threshold_deg must be positive");
        }
        if m.quality_window_sec <= 0.0 || m.quality_window_sec > m.window_sec {
            return invalid("movement.quality_window_sec must be in (0, window_sec]");
        }
        if m.quality_calibration_deg <= 0.0 {
            return invalid("movement.quality_calibration_deg must be positive");
        }

        // Fusion validation
        let f = &self.fusion;
        if !(0.0..=1.0).contains(&f.expression_confidence_threshold) {
            return invalid("fusion.expression_confidence_threshold must be in [0, 1]");
        }
        if f.drowsy_pitch_deg <= 0.0 || f.drowsy_pitch_deg > 90.0 {
            return invalid("fusion.drowsy_pitch_deg must be in (0, 90]");
        }
        if f.centered_max_angle_deg <= 0.0 {
            return invalid("fusion.centered_max_angle_deg must be positive");
        }
        if f.history_capacity == 0 {
            return invalid("fusion.history_capacity must be > 0");
        }

        // Pipeline validation
        let p = &self.pipeline;
        if p.queue_capacity == 0 {
            return invalid("pipeline.queue_capacity must be > 0");
        }
        if p.poll_timeout_ms == 0 || p.fusion_interval_ms == 0 {
            return invalid("pipeline.poll_timeout_ms and fusion_interval_ms must be > 0");
        }
        if p.join_timeout_ms < p.poll_timeout_ms {
            return invalid("pipeline.join_timeout_ms must be >= poll_timeout_ms");
        }

        Ok(())
    }

    /// Export configuration to TOML string
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = self
            .to_toml_string()
            .map_err(|e| ConfigError::Validation(format!("TOML serialization error: {}", e)))?;
        fs::write(path, content)?;
        Ok(())
    }
}
