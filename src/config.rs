use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::{
    load::LoadSettings,
    progression::{ModelRegistry, ProgressionSettings},
    readiness::ReadinessWeights,
};

pub const DEFAULT_DB_PATH: &str = "./ironplan.db";

/// Flat `key = "value"` pairs persisted as TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Config {
    pub map: BTreeMap<String, String>,
}

impl Config {
    /// `<config_dir>/ironplan/config.toml`
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|d| d.join("ironplan").join("config.toml"))
            .context("Could not determine config directory")
    }

    /// A missing file is an empty config.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        let text = toml::to_string(self).context("Failed to serialize config")?;
        fs::write(path, text).with_context(|| format!("Failed to write config to {}", path.display()))
    }

    fn parsed<T: FromStr>(&self, key: &str) -> Result<Option<T>> {
        self.map
            .get(key)
            .map(|raw| {
                raw.trim()
                    .parse::<T>()
                    .map_err(|_| anyhow!("config key `{}` has an invalid value `{}`", key, raw))
            })
            .transpose()
    }

    /// Typed settings; unset keys keep their defaults and unknown keys are ignored.
    pub fn settings(&self) -> Result<EngineSettings> {
        let mut s = EngineSettings::default();

        if let Some(path) = self.map.get("db.path") {
            s.db_path = path.clone();
        }

        macro_rules! apply {
            ($($key:literal => $field:expr),* $(,)?) => {
                $(
                    if let Some(v) = self.parsed($key)? {
                        $field = v;
                    }
                )*
            };
        }

        apply! {
            "load.atl_days" => s.load.atl_days,
            "load.ctl_days" => s.load.ctl_days,
            "load.default_intensity" => s.load.default_intensity,
            "linear.base" => s.progression.linear_base,
            "linear.increment" => s.progression.linear_increment,
            "linear.max" => s.progression.linear_max,
            "linear.rep_step" => s.progression.linear_rep_step,
            "wave.rep_step" => s.progression.wave_rep_step,
            "step.block_weeks" => s.progression.step_block_weeks,
            "step.rep_step" => s.progression.step_rep_step,
        }

        if let Some(raw) = self.map.get("readiness.weights") {
            s.readiness = ReadinessWeights::from_csv(raw)
                .map_err(|e| anyhow!("config key `readiness.weights`: {}", e))?;
        }

        if s.load.atl_days <= 0.0 || s.load.ctl_days <= 0.0 {
            return Err(anyhow!("config keys `load.atl_days` and `load.ctl_days` must be positive"));
        }
        ModelRegistry::new(&s.progression).context("config keys for progression models are inconsistent")?;

        Ok(s)
    }
}

/// Every tunable the engine and storage read.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub db_path: String,
    pub load: LoadSettings,
    pub progression: ProgressionSettings,
    pub readiness: ReadinessWeights,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            db_path: DEFAULT_DB_PATH.to_string(),
            load: LoadSettings::default(),
            progression: ProgressionSettings::default(),
            readiness: ReadinessWeights::default(),
        }
    }
}
