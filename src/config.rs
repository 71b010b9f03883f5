//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MBOXNAV_CONFIG` (environment variable)
//! 2. `~/.config/mboxnav/config.toml` (Linux/macOS)
//!    `%APPDATA%\mboxnav\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Interactive browsing defaults.
    pub browse: BrowseConfig,
    /// Date normalization settings.
    pub dates: DatesConfig,
    /// Performance tuning.
    pub performance: PerformanceConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// `strftime` format string for dates in listings.
    pub date_format: String,
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

/// Interactive browsing defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowseConfig {
    /// Records per page for `ls`, `next` and `prev`.
    pub page_size: usize,
    /// Columns shown on startup.
    pub columns: Vec<String>,
    /// Maximum display width of the From column.
    pub from_width: usize,
    /// Maximum display width of the Subject column.
    pub subject_width: usize,
}

/// Date normalization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatesConfig {
    /// Earliest year accepted by the loose free-text strategy.
    pub min_year: i32,
    /// Years past the current one still accepted by the loose strategy.
    pub years_ahead: i32,
}

/// Performance tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Read buffer size in bytes for the sequential scan (default: 1 MB).
    pub read_buffer_size: usize,
    /// Maximum header block kept per message (default: 64 KB).
    pub max_header_size: usize,
    /// Number of raw messages kept in the `show` cache.
    pub lru_cache_size: usize,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            date_format: "%Y-%m-%d".to_string(),
            cache_dir: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Default for BrowseConfig {
    fn default() -> Self {
        Self {
            page_size: 20,
            columns: vec!["date".into(), "from".into(), "subject".into()],
            from_width: 30,
            subject_width: 60,
        }
    }
}

impl Default for DatesConfig {
    fn default() -> Self {
        Self {
            min_year: 1970,
            years_ahead: 1,
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: 1024 * 1024, // 1 MB
            max_header_size: 64 * 1024,    // 64 KB
            lru_cache_size: 32,
        }
    }
}

// ── Load ────────────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("MBOXNAV_CONFIG") {
        return Some(PathBuf::from(env_path));
    }
    dirs::config_dir().map(|d| d.join("mboxnav").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mboxnav")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.browse.page_size, 20);
        assert_eq!(cfg.browse.columns, vec!["date", "from", "subject"]);
        assert_eq!(cfg.dates.min_year, 1970);
        assert_eq!(cfg.performance.max_header_size, 64 * 1024);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let partial = r#"
[browse]
page_size = 50

[dates]
min_year = 1990
"#;
        let cfg: Config = toml::from_str(partial).expect("parse partial");
        assert_eq!(cfg.browse.page_size, 50);
        assert_eq!(cfg.dates.min_year, 1990);
        assert_eq!(cfg.dates.years_ahead, 1);
        assert_eq!(cfg.general.log_level, "warn");
        assert_eq!(cfg.browse.columns.len(), 3);
    }

    #[test]
    fn test_serialize_deserialize_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let parsed: Config = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.general.date_format, cfg.general.date_format);
        assert_eq!(
            parsed.performance.read_buffer_size,
            cfg.performance.read_buffer_size
        );
    }
}
