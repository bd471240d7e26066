//! Configuration file support for Stride.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/stride/config.toml`.
//! Training-science constants that the literature leaves open (ACWR windows,
//! readiness weights, trigger thresholds) live here as tunables rather than
//! hardcoded assumptions.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,

    #[serde(default)]
    pub triggers: TriggerConfig,

    #[serde(default)]
    pub volume: VolumeConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Metrics engine constants
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// CTL exponential time constant in days
    #[serde(default = "default_ctl_days")]
    pub ctl_time_constant_days: f64,

    /// ATL exponential time constant in days
    #[serde(default = "default_atl_days")]
    pub atl_time_constant_days: f64,

    /// ACWR acute rolling-average window in days
    #[serde(default = "default_acute_window")]
    pub acute_window_days: usize,

    /// ACWR chronic rolling-average window in days; ACWR is unavailable
    /// until this much history exists
    #[serde(default = "default_chronic_window")]
    pub chronic_window_days: usize,

    /// Readiness points per unit of TSB (clamped to +/-25)
    #[serde(default = "default_tsb_weight")]
    pub readiness_tsb_weight: f64,

    /// Readiness points per unit of (1 - ATL/CTL) (clamped to +/-25)
    #[serde(default = "default_trend_weight")]
    pub readiness_trend_weight: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            ctl_time_constant_days: default_ctl_days(),
            atl_time_constant_days: default_atl_days(),
            acute_window_days: default_acute_window(),
            chronic_window_days: default_chronic_window(),
            readiness_tsb_weight: default_tsb_weight(),
            readiness_trend_weight: default_trend_weight(),
        }
    }
}

/// Adaptation trigger thresholds
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TriggerConfig {
    #[serde(default = "default_acwr_elevated")]
    pub acwr_elevated_threshold: f64,

    #[serde(default = "default_acwr_high")]
    pub acwr_high_threshold: f64,

    #[serde(default = "default_readiness_low")]
    pub readiness_low_threshold: f64,

    #[serde(default = "default_readiness_very_low")]
    pub readiness_very_low_threshold: f64,

    /// Default trailing-7-day lower-body load gate when the profile has none
    #[serde(default = "default_lower_body_threshold")]
    pub lower_body_weekly_threshold_au: f64,

    /// RPE at or above which a session counts as hard for density checks
    #[serde(default = "default_hard_rpe")]
    pub hard_session_rpe: u8,

    /// Minimum spacing between hard sessions in hours
    #[serde(default = "default_spacing_hours")]
    pub quality_spacing_hours: i64,

    /// Note keywords that fire the injury safety override
    #[serde(default = "default_injury_keywords")]
    pub injury_keywords: Vec<String>,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            acwr_elevated_threshold: default_acwr_elevated(),
            acwr_high_threshold: default_acwr_high(),
            readiness_low_threshold: default_readiness_low(),
            readiness_very_low_threshold: default_readiness_very_low(),
            lower_body_weekly_threshold_au: default_lower_body_threshold(),
            hard_session_rpe: default_hard_rpe(),
            quality_spacing_hours: default_spacing_hours(),
            injury_keywords: default_injury_keywords(),
        }
    }
}

/// Volume recommendation constants
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VolumeConfig {
    /// Weekly km of running capacity implied per CTL point
    #[serde(default = "default_km_per_ctl")]
    pub km_per_ctl_point: f64,

    /// Half-width of the CTL capacity band, as a fraction
    #[serde(default = "default_capacity_band")]
    pub capacity_band_fraction: f64,

    /// Cap on start volume relative to recent actual volume (10% rule)
    #[serde(default = "default_recent_cap")]
    pub recent_volume_cap_factor: f64,

    /// Recovery week reduction relative to the un-reduced trend
    #[serde(default = "default_recovery_factor")]
    pub recovery_week_factor: f64,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            km_per_ctl_point: default_km_per_ctl(),
            capacity_band_fraction: default_capacity_band(),
            recent_volume_cap_factor: default_recent_cap(),
            recovery_week_factor: default_recovery_factor(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        let home = std::env::var("HOME").expect("HOME environment variable not set");
        PathBuf::from(home).join(".local/share")
    });
    base.join("stride")
}

fn default_ctl_days() -> f64 {
    42.0
}

fn default_atl_days() -> f64 {
    7.0
}

fn default_acute_window() -> usize {
    7
}

fn default_chronic_window() -> usize {
    28
}

fn default_tsb_weight() -> f64 {
    1.5
}

fn default_trend_weight() -> f64 {
    50.0
}

fn default_acwr_elevated() -> f64 {
    1.3
}

fn default_acwr_high() -> f64 {
    1.5
}

fn default_readiness_low() -> f64 {
    50.0
}

fn default_readiness_very_low() -> f64 {
    35.0
}

fn default_lower_body_threshold() -> f64 {
    1800.0
}

fn default_hard_rpe() -> u8 {
    7
}

fn default_spacing_hours() -> i64 {
    48
}

fn default_injury_keywords() -> Vec<String> {
    vec![
        "pain".into(),
        "injury".into(),
        "injured".into(),
        "strain".into(),
        "sharp".into(),
        "limping".into(),
    ]
}

fn default_km_per_ctl() -> f64 {
    0.9
}

fn default_capacity_band() -> f64 {
    0.2
}

fn default_recent_cap() -> f64 {
    1.1
}

fn default_recovery_factor() -> f64 {
    0.7
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            let home = std::env::var("HOME").expect("HOME environment variable not set");
            PathBuf::from(home).join(".config")
        });
        base.join("stride").join("config.toml")
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Reject constants that would make the engines meaningless
    fn validate(&self) -> Result<()> {
        if self.metrics.ctl_time_constant_days <= 0.0 || self.metrics.atl_time_constant_days <= 0.0
        {
            return Err(Error::Config(
                "Metric time constants must be positive".into(),
            ));
        }
        if self.metrics.acute_window_days == 0
            || self.metrics.chronic_window_days <= self.metrics.acute_window_days
        {
            return Err(Error::Config(
                "Chronic ACWR window must exceed the acute window".into(),
            ));
        }
        if self.triggers.acwr_high_threshold <= self.triggers.acwr_elevated_threshold {
            return Err(Error::Config(
                "ACWR high threshold must exceed the elevated threshold".into(),
            ));
        }
        Ok(())
    }
}
