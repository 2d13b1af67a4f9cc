//! Configuration management

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Unknown option: {0}")]
    UnknownKey(String),
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Default configuration file, relative to the user config dir
const DEFAULT_CONFIG_PATH: &str = "statusbar-modules/config.toml";

const DEFAULT_INSYNC_BINARY: &str = "/usr/bin/insync";
const DEFAULT_PLAYING_FORMAT: &str = "♪ {artist} - {title} - {position}/{length}";

/// Expand ~ to home directory
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

/// Get the default config file path
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join(DEFAULT_CONFIG_PATH))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Resolve an optional user-supplied path, falling back to the default
pub fn resolve_path(path: Option<&str>) -> PathBuf {
    match path {
        Some(p) => expand_path(p),
        None => default_config_path(),
    }
}

/// Options that can be changed one `key = value` pair at a time
pub trait SetOption {
    fn set_option(&mut self, key: &str, value: &str) -> Result<(), ConfigError>;
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Host colours for good / degraded / bad states
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Palette {
    pub good: String,
    pub degraded: String,
    pub bad: String,
}

impl Default for Palette {
    fn default() -> Self {
        Palette {
            good: "#00FF00".to_string(),
            degraded: "#FFFF00".to_string(),
            bad: "#FF0000".to_string(),
        }
    }
}

impl SetOption for Palette {
    fn set_option(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "color_good" => self.good = value.to_string(),
            "color_degraded" => self.degraded = value.to_string(),
            "color_bad" => self.bad = value.to_string(),
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }
}

/// Insync module configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InsyncConfig {
    pub binary: PathBuf,
    pub format: String,
    pub cache_timeout: u64,
    pub format_down: String,
    pub cache_timeout_down: u64,
}

impl Default for InsyncConfig {
    fn default() -> Self {
        InsyncConfig {
            binary: PathBuf::from(DEFAULT_INSYNC_BINARY),
            format: "{status} {queued}".to_string(),
            cache_timeout: 1,
            format_down: "Insync: down".to_string(),
            cache_timeout_down: 5,
        }
    }
}

impl SetOption for InsyncConfig {
    fn set_option(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "binary" => self.binary = expand_path(value),
            "format" => self.format = value.to_string(),
            "cache_timeout" => self.cache_timeout = parse(key, value)?,
            "format_down" => self.format_down = value.to_string(),
            "cache_timeout_down" => self.cache_timeout_down = parse(key, value)?,
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }
}

/// Music module configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MusicConfig {
    /// Player to control; empty means the first MPRIS player on the bus
    pub player_name: String,

    pub format_down: String,
    pub color_down: String,
    pub cache_timeout_down: u64,

    pub format_paused: String,
    pub color_paused: String,
    pub cache_timeout_paused: u64,

    pub format_stopped: String,
    pub color_stopped: String,
    pub cache_timeout_stopped: u64,

    pub format: String,
    pub color: String,
    pub cache_timeout: u64,

    pub length_format: String,
    pub position_format: String,

    pub button_left: String,
    pub button_right: String,
    pub button_middle: String,
    pub button_wheel_up: String,
    pub button_wheel_down: String,
    pub button_wheel_left: String,
    pub button_wheel_right: String,
    pub button_previous: String,
    pub button_next: String,

    /// Seconds
    pub seek_offset: i64,
    pub volume_offset: f64,
}

impl Default for MusicConfig {
    fn default() -> Self {
        MusicConfig {
            player_name: String::new(),

            format_down: String::new(),
            color_down: "#ff0000".to_string(),
            cache_timeout_down: 3,

            format_paused: DEFAULT_PLAYING_FORMAT.to_string(),
            color_paused: "#ffcc00".to_string(),
            cache_timeout_paused: 3,

            format_stopped: "♪ Stopped".to_string(),
            color_stopped: "#ff0000".to_string(),
            cache_timeout_stopped: 3,

            format: DEFAULT_PLAYING_FORMAT.to_string(),
            color: "#00ff00".to_string(),
            cache_timeout: 1,

            length_format: "{adapted}".to_string(),
            position_format: "{adapted}".to_string(),

            button_left: "toggle".to_string(),
            button_right: "stop".to_string(),
            button_middle: String::new(),
            button_wheel_up: "volume_up".to_string(),
            button_wheel_down: "volume_down".to_string(),
            button_wheel_left: "backward".to_string(),
            button_wheel_right: "forward".to_string(),
            button_previous: "previous".to_string(),
            button_next: "next".to_string(),

            seek_offset: 5,
            volume_offset: 0.05,
        }
    }
}

impl SetOption for MusicConfig {
    fn set_option(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let text = value.to_string();
        match key {
            "player_name" => self.player_name = text,
            "format_down" => self.format_down = text,
            "color_down" => self.color_down = text,
            "cache_timeout_down" => self.cache_timeout_down = parse(key, value)?,
            "format_paused" => self.format_paused = text,
            "color_paused" => self.color_paused = text,
            "cache_timeout_paused" => self.cache_timeout_paused = parse(key, value)?,
            "format_stopped" => self.format_stopped = text,
            "color_stopped" => self.color_stopped = text,
            "cache_timeout_stopped" => self.cache_timeout_stopped = parse(key, value)?,
            "format" => self.format = text,
            "color" => self.color = text,
            "cache_timeout" => self.cache_timeout = parse(key, value)?,
            "length_format" => self.length_format = text,
            "position_format" => self.position_format = text,
            "button_left" => self.button_left = text,
            "button_right" => self.button_right = text,
            "button_middle" => self.button_middle = text,
            "button_wheel_up" => self.button_wheel_up = text,
            "button_wheel_down" => self.button_wheel_down = text,
            "button_wheel_left" => self.button_wheel_left = text,
            "button_wheel_right" => self.button_wheel_right = text,
            "button_previous" => self.button_previous = text,
            "button_next" => self.button_next = text,
            "seek_offset" => self.seek_offset = parse(key, value)?,
            "volume_offset" => self.volume_offset = parse(key, value)?,
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }
}

/// Contents of the config file
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub palette: Palette,
    pub insync: InsyncConfig,
    pub music: MusicConfig,
}

impl Settings {
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }
}

/// A module's slice of [`Settings`]
pub trait ModuleConfig: SetOption + Default {
    fn from_settings(settings: Settings) -> Self;
}

impl ModuleConfig for InsyncConfig {
    fn from_settings(settings: Settings) -> Self {
        settings.insync
    }
}

impl ModuleConfig for MusicConfig {
    fn from_settings(settings: Settings) -> Self {
        settings.music
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_expand_path_tilde() {
        let expanded = expand_path("~/bin/insync");
        assert!(expanded.to_string_lossy().ends_with("bin/insync"));
        assert!(!expanded.to_string_lossy().starts_with('~'));
    }

    #[test]
    fn test_expand_path_absolute() {
        assert_eq!(expand_path("/usr/bin/insync"), PathBuf::from("/usr/bin/insync"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let settings = Settings::from_toml(
            r##"
            [palette]
            good = "#5faf5f"

            [music]
            player_name = "spotify"
            seek_offset = 10
            "##,
        )
        .unwrap();

        assert_eq!(settings.palette.good, "#5faf5f");
        assert_eq!(settings.palette.bad, Palette::default().bad);
        assert_eq!(settings.music.player_name, "spotify");
        assert_eq!(settings.music.seek_offset, 10);
        assert_eq!(settings.music.button_left, "toggle");
        assert_eq!(settings.insync, InsyncConfig::default());
    }

    #[test]
    fn test_unknown_file_key_is_rejected() {
        let err = Settings::from_toml("[insync]\nbogus = 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[insync]\nformat = \"{{status}}\"\ncache_timeout = 10").unwrap();

        let settings = Settings::load_from(file.path()).unwrap();
        assert_eq!(settings.insync.format, "{status}");
        assert_eq!(settings.insync.cache_timeout, 10);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load_from(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }

    #[test]
    fn test_set_option_parses_numbers() {
        let mut music = MusicConfig::default();
        music.set_option("volume_offset", "0.1").unwrap();
        music.set_option("cache_timeout", " 2 ").unwrap();
        assert_eq!(music.volume_offset, 0.1);
        assert_eq!(music.cache_timeout, 2);

        let err = music.set_option("seek_offset", "fast").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_set_option_unknown_key() {
        let mut insync = InsyncConfig::default();
        assert!(matches!(
            insync.set_option("volume_offset", "1"),
            Err(ConfigError::UnknownKey(_))
        ));

        let mut palette = Palette::default();
        palette.set_option("color_bad", "#d75f5f").unwrap();
        assert_eq!(palette.bad, "#d75f5f");
    }
}
