//! Configuration loading and output folder resolution

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};

use crate::decimal;
use crate::error::{Result, SotbError};

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct SotbConfig {
    pub output_dir: Option<PathBuf>,
    pub splits: SplitRates,
}

/// Top-level split fractions of every category.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SplitRates {
    #[serde(deserialize_with = "decimal_str")]
    pub developers: Decimal,
    #[serde(deserialize_with = "decimal_str")]
    pub charity: Decimal,
    #[serde(deserialize_with = "decimal_str")]
    pub house_tip: Decimal,
    pub house_class: String,
    pub house_name: String,
    pub partner: PartnerRates,
}

impl Default for SplitRates {
    fn default() -> Self {
        Self {
            developers: Decimal::new(65, 2),
            charity: Decimal::new(15, 2),
            house_tip: Decimal::new(20, 2),
            house_class: "house".to_owned(),
            house_name: "House Tip".to_owned(),
            partner: PartnerRates::default(),
        }
    }
}

/// `partner_split` fractions applied when a bundle partner takes a cut.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct PartnerRates {
    #[serde(deserialize_with = "decimal_str")]
    pub developers: Decimal,
    #[serde(deserialize_with = "decimal_str")]
    pub charity: Decimal,
    #[serde(deserialize_with = "decimal_str")]
    pub house_tip: Decimal,
    #[serde(deserialize_with = "decimal_str")]
    pub partner: Decimal,
}

impl Default for PartnerRates {
    fn default() -> Self {
        Self {
            developers: Decimal::new(60, 2),
            charity: Decimal::new(10, 2),
            house_tip: Decimal::new(15, 2),
            partner: Decimal::new(15, 2),
        }
    }
}

/// Fractions are written as strings (`"0.65"`) so they stay exact.
fn decimal_str<'de, D>(deserializer: D) -> std::result::Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let s: String = String::deserialize(deserializer)?;
    decimal::parse(&s)
        .ok_or_else(|| serde::de::Error::custom(format!("'{s}' is not a decimal number")))
}

impl SotbConfig {
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| SotbError::Config(e.to_string()))
    }

    /// Loads the explicit config file if given, else the per-user one if it
    /// exists, else the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match default_config_path() {
                Some(path) if path.exists() => path,
                _ => {
                    tracing::debug!("no config file found, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let content = std::fs::read_to_string(&path)
            .map_err(|e| SotbError::Config(format!("cannot read {}: {e}", path.display())))?;
        tracing::debug!(path = %path.display(), "loaded config file");
        Self::from_toml(&content)
    }

    /// Output folder priority:
    /// 1. Command-line argument or environment variable
    /// 2. `output_dir` in the config file
    /// 3. The user's desktop
    /// 4. The current directory
    pub fn resolve_output_dir(&self, cli_arg: Option<&Path>) -> PathBuf {
        if let Some(dir) = cli_arg {
            return dir.to_path_buf();
        }
        if let Some(dir) = &self.output_dir {
            return dir.clone();
        }
        dirs::desktop_dir().unwrap_or_else(|| PathBuf::from("."))
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("sotb").join("config.toml"))
}
