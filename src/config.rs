use anyhow::{ensure, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub system: SystemConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub estimator: EstimatorConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SystemConfig {
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default)]
    pub offline: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_estimate_limit")]
    pub estimate_limit: usize,
    #[serde(default = "default_trends_limit")]
    pub trends_limit: usize,
    #[serde(default = "default_comparison_limit")]
    pub comparison_limit: usize,
    /// No limit when unset
    #[serde(default)]
    pub map_limit: Option<usize>,
    #[serde(default = "default_sync_limit")]
    pub sync_limit: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_ttl_estimate")]
    pub ttl_estimate_secs: u64,
    #[serde(default = "default_ttl_trends")]
    pub ttl_trends_secs: u64,
    #[serde(default = "default_ttl_comparison")]
    pub ttl_comparison_secs: u64,
    #[serde(default = "default_ttl_map")]
    pub ttl_map_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ComparableSelection {
    /// First listings in store order that satisfy any single criterion
    #[default]
    FirstMatch,
    /// Listings satisfying the most criteria, ties in store order
    Ranked,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EstimatorConfig {
    #[serde(default = "default_comparable_limit")]
    pub comparable_limit: usize,
    #[serde(default = "default_area_tolerance")]
    pub area_tolerance_sq_m: f64,
    #[serde(default = "default_fallback_price_per_sqm")]
    pub fallback_price_per_sqm: f64,
    #[serde(default = "default_range_spread")]
    pub range_spread: f64,
    #[serde(default = "default_recent_build_year")]
    pub recent_build_year: i32,
    #[serde(default)]
    pub selection: ComparableSelection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    #[serde(default = "default_true")]
    pub csv_logging: bool,
    #[serde(default = "default_csv_log_path")]
    pub csv_log_path: String,
}

fn default_database_path() -> String { "listings.db".to_string() }
fn default_table() -> String { "realestatelistings".to_string() }
fn default_timeout() -> u64 { 15 }
fn default_estimate_limit() -> usize { 200 }
fn default_trends_limit() -> usize { 500 }
fn default_comparison_limit() -> usize { 100 }
fn default_sync_limit() -> usize { 1000 }
fn default_ttl_estimate() -> u64 { 300 }
fn default_ttl_trends() -> u64 { 600 }
fn default_ttl_comparison() -> u64 { 300 }
fn default_ttl_map() -> u64 { 120 }
fn default_comparable_limit() -> usize { 10 }
fn default_area_tolerance() -> f64 { 100.0 }
fn default_fallback_price_per_sqm() -> f64 { 50_000.0 }
fn default_range_spread() -> f64 { 0.15 }
fn default_recent_build_year() -> i32 { 2020 }
fn default_true() -> bool { true }
fn default_csv_log_path() -> String { "estimates.csv".to_string() }

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            offline: false,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            table: default_table(),
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            estimate_limit: default_estimate_limit(),
            trends_limit: default_trends_limit(),
            comparison_limit: default_comparison_limit(),
            map_limit: None,
            sync_limit: default_sync_limit(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_estimate_secs: default_ttl_estimate(),
            ttl_trends_secs: default_ttl_trends(),
            ttl_comparison_secs: default_ttl_comparison(),
            ttl_map_secs: default_ttl_map(),
        }
    }
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            comparable_limit: default_comparable_limit(),
            area_tolerance_sq_m: default_area_tolerance(),
            fallback_price_per_sqm: default_fallback_price_per_sqm(),
            range_spread: default_range_spread(),
            recent_build_year: default_recent_build_year(),
            selection: ComparableSelection::default(),
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            csv_logging: default_true(),
            csv_log_path: default_csv_log_path(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    pub offline: Option<bool>,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path))?;

        Ok(config)
    }

    /// Values serde accepts but the estimator cannot use
    pub fn validate(&self) -> Result<()> {
        let spread = self.estimator.range_spread;
        ensure!(
            spread.is_finite() && (0.0..1.0).contains(&spread),
            "estimator.range_spread must be in [0, 1), got {}",
            spread
        );
        Ok(())
    }

    /// Load `path` if it exists, defaults otherwise
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            info!("No config file at {}, using defaults", path);
            Ok(Self::default())
        }
    }
}

impl EnvConfig {
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        Ok(Self {
            supabase_url: std::env::var("SUPABASE_URL").ok(),
            supabase_anon_key: std::env::var("SUPABASE_ANON_KEY").ok(),
            offline: std::env::var("BAAN_OFFLINE")
                .ok()
                .and_then(|v| v.parse().ok()),
        })
    }

    /// Credentials for the hosted listings store
    pub fn store_credentials(&self) -> Result<(String, String)> {
        let url = self.supabase_url.clone().context("SUPABASE_URL not set")?;
        let key = self.supabase_anon_key.clone().context("SUPABASE_ANON_KEY not set")?;
        Ok((url, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.fetch.estimate_limit, 200);
        assert_eq!(config.estimator.comparable_limit, 10);
        assert_eq!(config.estimator.fallback_price_per_sqm, 50_000.0);
        assert_eq!(config.estimator.selection, ComparableSelection::FirstMatch);
        assert!(config.fetch.map_limit.is_none());
    }

    #[test]
    fn test_partial_sections() {
        let config: Config = toml::from_str(
            r#"
            [system]
            offline = true

            [estimator]
            selection = "ranked"
            area_tolerance_sq_m = 50.0
            "#,
        )
        .unwrap();

        assert!(config.system.offline);
        assert_eq!(config.system.database_path, "listings.db");
        assert_eq!(config.estimator.selection, ComparableSelection::Ranked);
        assert_eq!(config.estimator.area_tolerance_sq_m, 50.0);
        assert_eq!(config.estimator.range_spread, 0.15);
    }

    #[test]
    fn test_range_spread_bounds() {
        assert!(Config::default().validate().is_ok());

        for bad in [-0.1, 1.0, 1.5, f64::NAN] {
            let mut config = Config::default();
            config.estimator.range_spread = bad;
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("range_spread"));
        }
    }

    #[test]
    fn test_load_rejects_negative_spread() {
        let path = std::env::temp_dir().join(format!("baan-config-{}.toml", std::process::id()));
        fs::write(&path, "[estimator]\nrange_spread = -0.2\n").unwrap();

        let err = Config::load(path.to_str().unwrap()).unwrap_err();
        assert!(format!("{:#}", err).contains("range_spread"));

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_missing_credentials_are_reported() {
        let env = EnvConfig {
            supabase_url: Some("https://x.supabase.co".to_string()),
            supabase_anon_key: None,
            offline: None,
        };
        let err = env.store_credentials().unwrap_err();
        assert!(err.to_string().contains("SUPABASE_ANON_KEY"));
    }
}
