use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::engine::EngineSettings;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub engine: EngineConfig,
    pub universe: UniverseConfig,
    pub feed: FeedConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    pub floor_cl: f64,
    pub cap_cl: f64,
    pub formation_window: usize,
    pub lookback_window: usize,
    pub leg_weight: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UniverseConfig {
    pub candidates: Vec<[String; 2]>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    pub data_dir: String,
    pub journal_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl EngineConfig {
    pub fn settings(&self) -> EngineSettings {
        EngineSettings {
            floor_cl: self.floor_cl,
            cap_cl: self.cap_cl,
            formation_window: self.formation_window,
            lookback_window: self.lookback_window,
            leg_weight: self.leg_weight,
        }
    }

    fn validate(&self) -> Result<()> {
        if !(self.floor_cl > 0.0 && self.floor_cl < 0.5) {
            bail!("engine.floor_cl must lie in (0, 0.5), got {}", self.floor_cl);
        }
        if !(self.cap_cl > 0.5 && self.cap_cl < 1.0) {
            bail!("engine.cap_cl must lie in (0.5, 1), got {}", self.cap_cl);
        }
        if self.formation_window <= 30 {
            bail!(
                "engine.formation_window must be > 30, got {}",
                self.formation_window
            );
        }
        if self.lookback_window <= 30 {
            bail!(
                "engine.lookback_window must be > 30, got {}",
                self.lookback_window
            );
        }
        if !(self.leg_weight > 0.0 && self.leg_weight <= 1.0) {
            bail!("engine.leg_weight must lie in (0, 1], got {}", self.leg_weight);
        }
        Ok(())
    }
}

impl UniverseConfig {
    /// Candidate pairs with trimmed, uppercased legs.
    pub fn candidate_pairs(&self) -> Vec<(String, String)> {
        self.candidates
            .iter()
            .map(|[a, b]| {
                (
                    a.trim().to_ascii_uppercase(),
                    b.trim().to_ascii_uppercase(),
                )
            })
            .collect()
    }

    /// Every distinct symbol appearing in the candidate universe.
    pub fn symbols(&self) -> Vec<String> {
        let mut out = Vec::new();
        for (a, b) in self.candidate_pairs() {
            for symbol in [a, b] {
                if !out.contains(&symbol) {
                    out.push(symbol);
                }
            }
        }
        out
    }

    fn validate(&self) -> Result<()> {
        if self.candidates.is_empty() {
            bail!("universe.candidates must not be empty");
        }
        for (a, b) in self.candidate_pairs() {
            if a.is_empty() || b.is_empty() {
                bail!("universe.candidates contains an empty symbol");
            }
            if a == b {
                bail!("candidate pair {a}/{b} uses the same symbol for both legs");
            }
        }
        Ok(())
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config_path = Path::new("config/default.toml");
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;

        let mut config: Config =
            toml::from_str(&config_str).context("failed to parse config/default.toml")?;

        if let Ok(data_dir) = std::env::var("COPULA_PAIRS_DATA_DIR") {
            config.feed.data_dir = data_dir;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.engine.validate()?;
        self.universe.validate()?;
        if self.feed.data_dir.trim().is_empty() {
            bail!("feed.data_dir must not be empty");
        }
        Ok(())
    }
}
