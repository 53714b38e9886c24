use crate::error::{FeedRankingError, Result};
use crate::services::filter_mode::TagDefaults;
use crate::services::filter_settings::{FilterTag, SuggestedTag};
use crate::services::scoring::GlobalScoreModifier;
use crate::services::time_decay::{ActivityParams, DecayParams};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub service: ServiceConfig,
    pub feed: FeedConfig,
    pub decay: DecayConfig,
    pub inflation: InflationConfig,
    pub site_config_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub service_name: String,
}

#[derive(Debug, Clone, Copy)]
pub struct FeedConfig {
    pub default_limit: usize,
    /// Upper bound on documents per request
    pub max_limit: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            default_limit: 20,
            max_limit: 5000,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DecayConfig {
    pub starting_age_hours: f64,
    pub decay_factor_slowest: f64,
    pub decay_factor_fastest: f64,
    pub activity_enabled: bool,
    pub activity_half_life_hours: f64,
    pub activity_weight: f64,
}

impl Default for DecayConfig {
    fn default() -> Self {
        let params = DecayParams::default();
        Self {
            starting_age_hours: params.starting_age_hours,
            decay_factor_slowest: params.decay_factor_slowest,
            decay_factor_fastest: params.decay_factor_fastest,
            activity_enabled: false,
            activity_half_life_hours: 24.0,
            activity_weight: 0.5,
        }
    }
}

impl DecayConfig {
    pub fn activity(&self) -> ActivityParams {
        ActivityParams {
            half_life_hours: self.activity_half_life_hours,
            weight: self.activity_weight,
            factor_override: None,
        }
    }

    pub fn params(&self) -> DecayParams {
        DecayParams {
            starting_age_hours: self.starting_age_hours,
            decay_factor_slowest: self.decay_factor_slowest,
            decay_factor_fastest: self.decay_factor_fastest,
            activity: self.activity_enabled.then(|| self.activity()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InflationConfig {
    pub series_path: Option<PathBuf>,
    pub refresh_interval: Duration,
}

impl Default for InflationConfig {
    fn default() -> Self {
        Self {
            series_path: None,
            refresh_interval: Duration::from_secs(3600),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: &str) -> Result<T> {
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    raw.parse()
        .map_err(|_| FeedRankingError::configuration(format!("{key} has invalid value {raw:?}")))
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var(key).ok().filter(|v| !v.is_empty()).map(PathBuf::from)
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Config {
            service: ServiceConfig {
                service_name: env::var("SERVICE_NAME")
                    .unwrap_or_else(|_| "feed-ranking".to_string()),
            },
            feed: FeedConfig {
                default_limit: env_or("FEED_DEFAULT_LIMIT", "20")?,
                max_limit: env_or("FEED_MAX_LIMIT", "5000")?,
            },
            decay: DecayConfig {
                starting_age_hours: env_or("DECAY_STARTING_AGE_HOURS", "2")?,
                decay_factor_slowest: env_or("DECAY_FACTOR_SLOWEST", "1.15")?,
                decay_factor_fastest: env_or("DECAY_FACTOR_FASTEST", "1.5")?,
                activity_enabled: env_or("DECAY_ACTIVITY_ENABLED", "false")?,
                activity_half_life_hours: env_or("DECAY_ACTIVITY_HALF_LIFE_HOURS", "24")?,
                activity_weight: env_or("DECAY_ACTIVITY_WEIGHT", "0.5")?,
            },
            inflation: InflationConfig {
                series_path: env_path("KARMA_INFLATION_SERIES_PATH"),
                refresh_interval: Duration::from_secs(env_or(
                    "KARMA_INFLATION_REFRESH_SECS",
                    "3600",
                )?),
            },
            site_config_path: env_path("SITE_CONFIG_PATH"),
        })
    }
}

/// Deployment-specific ranking configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteConfig {
    #[serde(default)]
    pub default_visibility_tags: Vec<FilterTag>,
    #[serde(default)]
    pub suggested_tags: Vec<SuggestedTag>,
    #[serde(default)]
    pub global_score_modifiers: Vec<GlobalScoreModifier>,
}

impl SiteConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            FeedRankingError::configuration(format!(
                "cannot read site config {}: {e}",
                path.display()
            ))
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Site config from `path`, or the empty default when no path is configured.
    pub fn load_optional(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn tag_defaults(&self) -> TagDefaults {
        TagDefaults::new(
            self.default_visibility_tags
                .iter()
                .map(|t| (t.tag_id.clone(), t.filter_mode)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::filter_mode::FilterMode;
    use std::io::Write;

    #[test]
    fn test_load_site_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "defaultVisibilityTags": [{{"tagId": "r", "tagName": "Rationality", "filterMode": 10}}],
                "suggestedTags": [{{"tagId": "ai", "tagName": "AI"}}],
                "globalScoreModifiers": [{{"name": "curated", "bonus": 5, "appliesTo": "curated"}}]
            }}"#
        )
        .unwrap();

        let site = SiteConfig::load(file.path()).unwrap();
        assert_eq!(site.suggested_tags.len(), 1);
        assert_eq!(site.global_score_modifiers[0].bonus, 5.0);
        assert_eq!(
            site.tag_defaults().resolve("r", FilterMode::TagDefault),
            FilterMode::Additive(10.0)
        );
    }

    #[test]
    fn test_missing_site_config_is_an_error() {
        let err = SiteConfig::load(Path::new("/nonexistent/site.json")).unwrap_err();
        assert!(matches!(err, FeedRankingError::Configuration(_)));
        assert!(SiteConfig::load_optional(None).unwrap().suggested_tags.is_empty());
    }

    #[test]
    fn test_decay_config_params() {
        let mut decay = DecayConfig::default();
        assert!(decay.params().activity.is_none());
        decay.activity_enabled = true;
        assert_eq!(decay.params().activity.unwrap().half_life_hours, 24.0);
    }
}
