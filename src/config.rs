//! Application configuration
//!
//! Settings are read from `tunebox.json` (or the file named by `TUNEBOX_CONFIG`).
//! Every field has a default, so a missing file or a partial file is fine.
//! `TUNEBOX_ASSET_BASE_URL` and `TUNEBOX_LIBRARY` override the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const CONFIG_FILE: &str = "tunebox.json";
const CONFIG_ENV: &str = "TUNEBOX_CONFIG";
const ASSET_BASE_URL_ENV: &str = "TUNEBOX_ASSET_BASE_URL";
const LIBRARY_ENV: &str = "TUNEBOX_LIBRARY";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Prefix for the image/audio proxy endpoints
    pub asset_base_url: String,
    pub library_path: PathBuf,
    /// How many tracks the home feed grows by
    pub page_size: usize,
    pub default_volume: f32,
    pub playback: PlaybackTuning,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            asset_base_url: "http://localhost:3000".to_string(),
            library_path: PathBuf::from(".cache/library.json"),
            page_size: 15,
            default_volume: 0.75,
            playback: PlaybackTuning::default(),
        }
    }
}

/// Timing knobs for the playback session
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlaybackTuning {
    pub seek_debounce_ms: u64,
    pub time_update_threshold_secs: f64,
    pub metadata_retry_ms: u64,
    /// `None` retries forever
    pub metadata_max_attempts: Option<u32>,
}

impl Default for PlaybackTuning {
    fn default() -> Self {
        Self {
            seek_debounce_ms: 200,
            time_update_threshold_secs: 0.25,
            metadata_retry_ms: 100,
            metadata_max_attempts: Some(600),
        }
    }
}

impl PlaybackTuning {
    pub fn seek_debounce(&self) -> Duration {
        Duration::from_millis(self.seek_debounce_ms)
    }

    pub fn metadata_retry_interval(&self) -> Duration {
        Duration::from_millis(self.metadata_retry_ms)
    }
}

impl AppConfig {
    /// Load from the default location and apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(CONFIG_FILE));

        let mut config = Self::from_file(&path)?;

        if let Ok(url) = std::env::var(ASSET_BASE_URL_ENV) {
            config.asset_base_url = url;
        }
        if let Ok(library) = std::env::var(LIBRARY_ENV) {
            config.library_path = PathBuf::from(library);
        }

        config.normalize();
        tracing::debug!(?config, "Configuration loaded");
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    fn normalize(&mut self) {
        self.asset_base_url = self.asset_base_url.trim_end_matches('/').to_string();
        self.page_size = self.page_size.max(1);
        self.default_volume = self.default_volume.clamp(0.0, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::from_file(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.playback.seek_debounce(), Duration::from_millis(200));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "page_size": 30, "playback": {{ "metadata_max_attempts": null }} }}"#
        )
        .unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.page_size, 30);
        assert_eq!(config.playback.metadata_max_attempts, None);
        assert_eq!(config.playback.metadata_retry_ms, 100);
        assert_eq!(config.asset_base_url, "http://localhost:3000");
    }

    #[test]
    fn normalize_clamps_values() {
        let mut config = AppConfig {
            asset_base_url: "http://music.local/".to_string(),
            page_size: 0,
            default_volume: 3.0,
            ..AppConfig::default()
        };
        config.normalize();
        assert_eq!(config.asset_base_url, "http://music.local");
        assert_eq!(config.page_size, 1);
        assert_eq!(config.default_volume, 1.0);
    }
}
