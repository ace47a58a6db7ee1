//! Configuration management for Casement
//!
//! Loads and validates the TOML file that tunes monitor discovery and the
//! default-size heuristics used when a window is first shown.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Main configuration struct containing all Casement settings
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CasementConfig {
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,

    /// Monitor discovery settings
    #[serde(default)]
    pub display: DisplayConfig,

    /// Toplevel window sizing settings
    #[serde(default)]
    pub window: WindowConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct GeneralConfig {
    /// Enable debug logging
    pub debug: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    /// Split the screen into a 2x2 grid of fake monitors
    pub fake_multihead: bool,

    /// Output name prefix treated as the built-in laptop panel when no primary is reported
    #[serde(default = "DisplayConfig::default_builtin_panel_prefix")]
    pub builtin_panel_prefix: String,

    /// Output name reported by old drivers without real per-output data
    #[serde(default = "DisplayConfig::default_legacy_output_name")]
    pub legacy_default_output_name: String,
}

/// How geometry changes are scheduled
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResizeMode {
    /// Defer to the next idle pass of the event loop
    Queue,
    /// Run the check-resize pass as soon as geometry becomes dirty
    Immediate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    /// Upper bound on a guessed default width (landscape screens)
    pub max_default_width: i32,

    /// Upper bound on a guessed default height (landscape screens)
    pub max_default_height: i32,

    /// Size used when a window with no content guesses 0x0
    pub empty_window_size: i32,

    /// Sentinel size forced onto a geometry widget to measure the surrounding chrome
    #[serde(default = "WindowConfig::default_probe_size")]
    pub geometry_widget_probe_size: i32,

    /// Move focus into the first focusable child when a window is shown
    pub focus_on_show: bool,

    /// Scheduling of check-resize passes
    pub resize_mode: ResizeMode,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            fake_multihead: false,
            builtin_panel_prefix: Self::default_builtin_panel_prefix(),
            legacy_default_output_name: Self::default_legacy_output_name(),
        }
    }
}

impl DisplayConfig {
    fn default_builtin_panel_prefix() -> String {
        "LVDS".to_string()
    }

    fn default_legacy_output_name() -> String {
        "default".to_string()
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            max_default_width: 640,
            max_default_height: 480,
            empty_window_size: 200,
            geometry_widget_probe_size: Self::default_probe_size(),
            focus_on_show: true,
            resize_mode: ResizeMode::Queue,
        }
    }
}

impl WindowConfig {
    fn default_probe_size() -> i32 {
        10000
    }
}

impl CasementConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        // Expand ~ to home directory
        let expanded_path = match path.strip_prefix("~") {
            Ok(rest) => {
                let home =
                    std::env::var("HOME").context("Failed to get HOME environment variable")?;
                Path::new(&home).join(rest)
            }
            Err(_) => path.to_path_buf(),
        };

        let contents = fs::read_to_string(&expanded_path)
            .with_context(|| format!("Failed to read config file: {}", expanded_path.display()))?;

        let config: CasementConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", expanded_path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.window.max_default_width <= 0 || self.window.max_default_height <= 0 {
            anyhow::bail!(
                "Invalid default size limits: {}x{} must be positive",
                self.window.max_default_width,
                self.window.max_default_height
            );
        }

        if self.window.empty_window_size <= 0 {
            anyhow::bail!("Invalid empty_window_size: must be positive");
        }

        if self.window.geometry_widget_probe_size < 1000 {
            anyhow::bail!(
                "Invalid geometry_widget_probe_size: {} is too small to dominate real content",
                self.window.geometry_widget_probe_size
            );
        }

        if self.display.builtin_panel_prefix.is_empty() {
            anyhow::bail!("Invalid builtin_panel_prefix: must not be empty");
        }

        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        fs::write(path, contents).context("Failed to write configuration file")?;

        Ok(())
    }

    /// Merge a partial configuration into this one
    /// Sections of the partial config that differ from defaults replace ours
    pub fn merge_partial(mut self, partial: CasementConfig) -> Self {
        let defaults = CasementConfig::default();

        if partial.general != defaults.general {
            self.general = partial.general;
        }
        if partial.display != defaults.display {
            self.display = partial.display;
        }
        if partial.window != defaults.window {
            self.window = partial.window;
        }

        self
    }
}


#[cfg(test)]
mod property_tests;
