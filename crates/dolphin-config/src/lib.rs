use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

const APP_DIR: &str = "dolphin";
const CONFIG_FILE: &str = "config.toml";
const MAX_RECENT_FILES: usize = 10;

pub const DEFAULT_OVERSCAN: usize = 10;
pub const DEFAULT_FALLBACK_LINE_HEIGHT: f64 = 15.0;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
pub const DEFAULT_MAX_CACHED_LINES: usize = 20_000;

/// User-tunable settings for the line viewer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ViewerConfig {
    /// Rows rendered above and below the visible viewport.
    #[serde(default = "default_overscan")]
    pub overscan: usize,
    /// Row height used when the front end cannot measure one.
    #[serde(default = "default_fallback_line_height")]
    pub fallback_line_height: f64,
    /// Interval between indexing status polls, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Reuse line-offset indices persisted by earlier runs.
    #[serde(default = "default_use_index_cache")]
    pub use_index_cache: bool,
    /// Upper bound on fetched lines kept in memory. Lines far from the
    /// viewport are evicted once it is exceeded.
    #[serde(default = "default_max_cached_lines")]
    pub max_cached_lines: usize,
    #[serde(default)]
    recent_files: VecDeque<String>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            overscan: DEFAULT_OVERSCAN,
            fallback_line_height: DEFAULT_FALLBACK_LINE_HEIGHT,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            use_index_cache: true,
            max_cached_lines: DEFAULT_MAX_CACHED_LINES,
            recent_files: VecDeque::new(),
        }
    }
}

impl ViewerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        let mut config: Self = toml::from_str(&contents)?;
        config.normalize();
        Ok(config)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(ConfigError::Io(err)) if err.kind() == io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            Err(err) => Err(err),
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    pub fn recent_files(&self) -> impl Iterator<Item = &str> {
        self.recent_files.iter().map(|entry| entry.as_str())
    }

    pub fn record_recent_file(&mut self, file: impl AsRef<Path>) -> bool {
        let file = file.as_ref();
        if file.as_os_str().is_empty() {
            return false;
        }
        let display = normalize_path(file);
        if display.trim().is_empty() {
            return false;
        }

        if let Some(pos) = self.recent_files.iter().position(|entry| entry == &display) {
            if pos == 0 {
                return false;
            }
            self.recent_files.remove(pos);
        }

        self.recent_files.push_front(display);
        while self.recent_files.len() > MAX_RECENT_FILES {
            self.recent_files.pop_back();
        }
        true
    }

    fn normalize(&mut self) {
        if !self.fallback_line_height.is_finite() || self.fallback_line_height <= 0.0 {
            self.fallback_line_height = DEFAULT_FALLBACK_LINE_HEIGHT;
        }
        if self.poll_interval_ms == 0 {
            self.poll_interval_ms = DEFAULT_POLL_INTERVAL_MS;
        }
        if self.max_cached_lines == 0 {
            self.max_cached_lines = DEFAULT_MAX_CACHED_LINES;
        }

        let mut deduped = VecDeque::new();
        for entry in self.recent_files.drain(..) {
            if !entry.trim().is_empty() && !deduped.contains(&entry) {
                deduped.push_back(entry);
            }
        }
        deduped.truncate(MAX_RECENT_FILES);
        self.recent_files = deduped;
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to parse viewer configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize viewer configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// `<config dir>/dolphin/config.toml`, when the platform has a config directory.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}

/// Directory holding persisted line-offset indices.
pub fn index_cache_dir() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join(APP_DIR))
}

fn default_overscan() -> usize {
    DEFAULT_OVERSCAN
}

fn default_fallback_line_height() -> f64 {
    DEFAULT_FALLBACK_LINE_HEIGHT
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_use_index_cache() -> bool {
    true
}

fn default_max_cached_lines() -> usize {
    DEFAULT_MAX_CACHED_LINES
}

fn normalize_path(path: &Path) -> String {
    let display = path.to_string_lossy().to_string();
    if cfg!(windows) {
        display.replace('\\', "/")
    } else {
        display
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn record_recent_file_promotes_and_limits() {
        let mut config = ViewerConfig::default();
        for idx in 0..12 {
            config.record_recent_file(format!("file{}.jsonl", idx));
        }

        assert_eq!(config.recent_files().count(), MAX_RECENT_FILES);
        assert_eq!(config.recent_files().next().unwrap(), "file11.jsonl");

        assert!(config.record_recent_file("file5.jsonl"));
        assert_eq!(config.recent_files().next().unwrap(), "file5.jsonl");
        assert!(!config.record_recent_file("file5.jsonl"));
    }

    #[test]
    fn load_and_save_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);

        let mut config = ViewerConfig::default();
        config.overscan = 25;
        config.use_index_cache = false;
        config.record_recent_file("/data/events.jsonl");
        config.save(&path).unwrap();

        let loaded = ViewerConfig::load(&path).unwrap();
        assert_eq!(loaded.overscan, 25);
        assert!(!loaded.use_index_cache);
        assert_eq!(loaded.recent_files().next().unwrap(), "/data/events.jsonl");
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = ViewerConfig::load_or_default(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, ViewerConfig::default());
    }

    #[test]
    fn partial_file_fills_defaults_and_repairs_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(
            &path,
            "fallback_line_height = 0.0\npoll_interval_ms = 0\nmax_cached_lines = 0\n",
        )
        .unwrap();

        let config = ViewerConfig::load(&path).unwrap();
        assert_eq!(config.overscan, DEFAULT_OVERSCAN);
        assert_eq!(config.fallback_line_height, DEFAULT_FALLBACK_LINE_HEIGHT);
        assert_eq!(config.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
        assert_eq!(config.max_cached_lines, DEFAULT_MAX_CACHED_LINES);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "overscan = \"lots\"").unwrap();

        assert!(matches!(
            ViewerConfig::load_or_default(&path),
            Err(ConfigError::Parse(_))
        ));
    }
}
