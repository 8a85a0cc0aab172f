use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::Context;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_false")]
    pub file_logging_enabled: bool,
    #[serde(default = "default_true")]
    pub console_logging_enabled: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_prefix")]
    pub file_name_prefix: String,
    #[serde(default = "default_false")]
    pub show_file_line: bool,
    #[serde(default = "default_false")]
    pub show_thread_ids: bool,
    #[serde(default = "default_true")]
    pub show_target: bool,
    #[serde(default = "default_true")]
    pub ansi_colors: bool,
    #[serde(default = "default_rotation")]
    pub rotation: String, // "daily", "hourly", "minutely", "never"
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            file_logging_enabled: default_false(),
            console_logging_enabled: default_true(),
            log_dir: default_log_dir(),
            file_name_prefix: default_prefix(),
            show_file_line: default_false(),
            show_thread_ids: default_false(),
            show_target: default_true(),
            ansi_colors: default_true(),
            rotation: default_rotation(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_log_dir() -> String {
    "logs".to_string()
}
fn default_prefix() -> String {
    "emg_mouse".to_string()
}
fn default_rotation() -> String {
    "daily".to_string()
}

/// Runtime tunables. Every default equals the compiled-in behaviour, so a
/// missing settings file changes nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub log_settings: LogSettings,

    // Discovery
    #[serde(default = "default_scan_duration_ms")]
    pub scan_duration_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    // Actuation
    #[serde(default = "default_sensitivity_x")]
    pub pointer_sensitivity_x: f64,
    #[serde(default = "default_sensitivity_y")]
    pub pointer_sensitivity_y: f64,
    #[serde(default = "default_click_threshold")]
    pub emg_click_threshold: i32,
    #[serde(default = "default_click_debounce_ms")]
    pub click_debounce_ms: u64,

    // Streaming
    #[serde(default = "default_queue_depth")]
    pub notification_queue_depth: usize,
    #[serde(default = "default_false")]
    pub debug_raw_frame_logging: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_settings: LogSettings::default(),
            scan_duration_ms: default_scan_duration_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            pointer_sensitivity_x: default_sensitivity_x(),
            pointer_sensitivity_y: default_sensitivity_y(),
            emg_click_threshold: default_click_threshold(),
            click_debounce_ms: default_click_debounce_ms(),
            notification_queue_depth: default_queue_depth(),
            debug_raw_frame_logging: false,
        }
    }
}

impl Settings {
    pub fn scan_duration(&self) -> Duration {
        Duration::from_millis(self.scan_duration_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn click_debounce(&self) -> Duration {
        Duration::from_millis(self.click_debounce_ms)
    }
}

fn default_scan_duration_ms() -> u64 {
    5000
}
fn default_connect_timeout_ms() -> u64 {
    10_000
}
fn default_sensitivity_x() -> f64 {
    20.0
}
fn default_sensitivity_y() -> f64 {
    -40.0
}
fn default_click_threshold() -> i32 {
    1900
}
fn default_click_debounce_ms() -> u64 {
    1000
}
fn default_queue_depth() -> usize {
    64
}

/// Read-only settings loader. Nothing is ever written back.
pub struct SettingsService {
    settings: Settings,
    settings_path: Option<PathBuf>,
    load_error: Option<anyhow::Error>,
}

impl SettingsService {
    /// Load settings before logging exists. A rejected file is kept in
    /// [`SettingsService::load_error`] for the caller to report.
    pub fn new() -> Self {
        let settings_path = Self::get_settings_path();
        let (settings, load_error) = match settings_path.as_deref() {
            Some(path) => Self::load_or_default(path),
            None => (Settings::default(), None),
        };

        Self {
            settings,
            settings_path,
            load_error,
        }
    }

    pub fn from_settings(settings: Settings) -> Self {
        Self {
            settings,
            settings_path: None,
            load_error: None,
        }
    }

    fn get_settings_path() -> Option<PathBuf> {
        let mut path = dirs::config_dir()?;
        path.push("EmgMouse");
        path.push("settings.json");
        Some(path)
    }

    fn load_or_default(path: &Path) -> (Settings, Option<anyhow::Error>) {
        if !path.exists() {
            return (Settings::default(), None);
        }
        match Self::load_from_file(path)
            .with_context(|| format!("Ignoring settings file {}", path.display()))
        {
            Ok(settings) => (settings, None),
            Err(e) => (Settings::default(), Some(e)),
        }
    }

    fn load_from_file(path: &Path) -> anyhow::Result<Settings> {
        let contents = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    pub fn path(&self) -> Option<&Path> {
        self.settings_path.as_deref()
    }

    /// Why the settings file was rejected, if it was
    pub fn load_error(&self) -> Option<&anyhow::Error> {
        self.load_error.as_ref()
    }
}

impl Default for SettingsService {
    fn default() -> Self {
        Self::new()
    }
}
