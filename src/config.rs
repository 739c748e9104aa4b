/// Analysis tuning, persisted as TOML (`analysis.toml`) in a config directory.
///
/// Every value here is a fight-mechanic calibration: rune timings, drift
/// penalty, the post-dead-zone exclusion buffer, the melee swing gap. They
/// live in config so they can be recalibrated without touching the
/// simulators. Every field has a serde default, so a partial file only
/// overrides what it names.
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const CONFIG_FILE: &str = "analysis.toml";

// ---------------------------------------------------------------------------
// AnalysisConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// How long a ready rune may sit unspent before it counts as drift.
    #[serde(default = "default_rune_grace_ms")]
    pub rune_grace_ms: i64,

    #[serde(default = "default_rune_cooldown_ms")]
    pub rune_cooldown_ms: i64,

    /// Score lost per millisecond of rune drift (the linear penalty K).
    #[serde(default = "default_drift_penalty_per_ms")]
    pub drift_penalty_per_ms: f64,

    /// Drift is not counted this long after a dead zone ends.
    #[serde(default = "default_dead_zone_drift_buffer_ms")]
    pub dead_zone_drift_buffer_ms: i64,

    /// A melee window closes once no swing lands for this long.
    #[serde(default = "default_melee_swing_gap_ms")]
    pub melee_swing_gap_ms: i64,

    #[serde(default = "default_gcd_ms")]
    pub gcd_ms: i64,

    #[serde(default = "default_gcd_latency_penalty_per_ms")]
    pub gcd_latency_penalty_per_ms: f64,

    /// Casts landing up to this early relative to the GCD still count
    /// (as zero latency); earlier ones are treated as off-GCD noise.
    #[serde(default = "default_gcd_early_tolerance_ms")]
    pub gcd_early_tolerance_ms: i64,

    /// Force a spec profile ("Default", "Frost", "Unholy") instead of
    /// detecting it from the casts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_override: Option<String>,
}

fn default_rune_grace_ms() -> i64 { 2_471 }
fn default_rune_cooldown_ms() -> i64 { 10_000 }
fn default_drift_penalty_per_ms() -> f64 { 0.000_025 }
fn default_dead_zone_drift_buffer_ms() -> i64 { 7_500 }
fn default_melee_swing_gap_ms() -> i64 { 2_500 }
fn default_gcd_ms() -> i64 { 1_500 }
fn default_gcd_latency_penalty_per_ms() -> f64 { 0.0017 }
fn default_gcd_early_tolerance_ms() -> i64 { 50 }

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            rune_grace_ms:              default_rune_grace_ms(),
            rune_cooldown_ms:           default_rune_cooldown_ms(),
            drift_penalty_per_ms:       default_drift_penalty_per_ms(),
            dead_zone_drift_buffer_ms:  default_dead_zone_drift_buffer_ms(),
            melee_swing_gap_ms:         default_melee_swing_gap_ms(),
            gcd_ms:                     default_gcd_ms(),
            gcd_latency_penalty_per_ms: default_gcd_latency_penalty_per_ms(),
            gcd_early_tolerance_ms:     default_gcd_early_tolerance_ms(),
            profile_override:           None,
        }
    }
}

// ---------------------------------------------------------------------------
// Load / save
// ---------------------------------------------------------------------------

pub fn load_or_default(config_dir: &Path) -> Result<AnalysisConfig> {
    let path = config_dir.join(CONFIG_FILE);
    if path.exists() {
        let raw = std::fs::read_to_string(&path)?;
        let cfg: AnalysisConfig = toml::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("Config parse error in {}: {}", path.display(), e))?;
        tracing::debug!("Loaded analysis config from {}", path.display());
        Ok(cfg)
    } else {
        Ok(AnalysisConfig::default())
    }
}

pub fn save(config: &AnalysisConfig, config_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(config_dir)?;
    let raw = toml::to_string_pretty(config)
        .map_err(|e| anyhow::anyhow!("Config serialize error: {}", e))?;
    std::fs::write(config_dir.join(CONFIG_FILE), raw)?;
    Ok(())
}
