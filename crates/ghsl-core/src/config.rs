use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Public JRC open-data mirror hosting the GHSL releases.
pub const DEFAULT_BASE_URL: &str = "https://jeodpp.jrc.ec.europa.eu/ftp/jrc-opendata/GHSL/";

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per archive (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.5 = 500ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_secs: 0.5,
            max_delay_secs: 60,
        }
    }
}

impl RetryConfig {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            base_delay: Duration::from_secs_f64(self.base_delay_secs.max(0.0)),
            max_delay: Duration::from_secs(self.max_delay_secs),
        }
    }
}

/// Transfer timeouts and limits handed to libcurl.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub connect_timeout_secs: u64,
    /// Abort when throughput stays below `low_speed_limit` bytes/s for `low_speed_time_secs`.
    pub low_speed_limit: u32,
    pub low_speed_time_secs: u64,
    /// Hard wall-clock limit per attempt. Global 100 m archives are several GiB.
    pub timeout_secs: u64,
    /// Optional receive cap in bytes per second.
    #[serde(default)]
    pub max_recv_speed: Option<u64>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            low_speed_limit: 1024,
            low_speed_time_secs: 60,
            timeout_secs: 6 * 3600,
            max_recv_speed: None,
        }
    }
}

/// Archive cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Keep downloaded zip archives so later runs can skip the download.
    pub enabled: bool,
    /// Archive directory; defaults to `$XDG_CACHE_HOME/ghsl/archives`.
    #[serde(default)]
    pub dir: Option<PathBuf>,
    /// Recompute SHA-256 of a cached archive before reusing it.
    pub verify_on_reuse: bool,
    /// HEAD the remote and drop the entry when ETag/Last-Modified/size changed.
    pub revalidate_remote: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
            verify_on_reuse: true,
            revalidate_remote: false,
        }
    }
}

/// Global configuration loaded from `~/.config/ghsl/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GhslConfig {
    /// Root of the GHSL repository (product folders live directly below).
    pub base_url: String,
    /// Maximum number of tile archives fetched at the same time.
    pub max_parallel_downloads: usize,
    /// GeoJSON tile index (tile_id + region per feature). Needed for `regions`.
    #[serde(default)]
    pub tile_index: Option<PathBuf>,
    /// GTiff creation options used when mosaicking tiles.
    #[serde(default = "default_creation_options")]
    pub creation_options: Vec<String>,
    #[serde(default)]
    pub cache: Option<CacheConfig>,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
    #[serde(default)]
    pub http: Option<HttpConfig>,
}

fn default_creation_options() -> Vec<String> {
    vec!["COMPRESS=LZW".to_string(), "TILED=YES".to_string()]
}

impl Default for GhslConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            max_parallel_downloads: 4,
            tile_index: None,
            creation_options: default_creation_options(),
            cache: None,
            retry: None,
            http: None,
        }
    }
}

impl GhslConfig {
    pub fn cache(&self) -> CacheConfig {
        self.cache.clone().unwrap_or_default()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry.clone().unwrap_or_default().to_policy()
    }

    pub fn http(&self) -> HttpConfig {
        self.http.clone().unwrap_or_default()
    }

    /// Directory holding cached archives (configured or XDG default).
    pub fn archive_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = self.cache().dir {
            return Ok(dir);
        }
        let xdg_dirs = xdg::BaseDirectories::with_prefix("ghsl")?;
        Ok(xdg_dirs.get_cache_home().join("archives"))
    }

    /// Creation options split into `(key, value)` pairs; entries without `=` are skipped.
    pub fn creation_option_pairs(&self) -> Vec<(String, String)> {
        self.creation_options
            .iter()
            .filter_map(|opt| {
                let (k, v) = opt.split_once('=')?;
                Some((k.trim().to_string(), v.trim().to_string()))
            })
            .collect()
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("ghsl")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<GhslConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = GhslConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: GhslConfig = toml::from_str(&data)?;
    Ok(cfg)
}
