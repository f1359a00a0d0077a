//! Session-scoped settings
//!
//! Small key/value state that outlives a session but is not part of any layout:
//! which layout was selected last, and per-device snapping overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::constants::{input, layout, paths};
use crate::geometry::snap_grid_for_screen;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_layout_name")]
    pub last_layout: String,

    /// Snap grid in pixels; derived from the screen when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snap_grid: Option<f32>,

    /// Where layouts live; platform data dir when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layouts_root: Option<PathBuf>,

    #[serde(default = "default_deadzone")]
    pub dpad_deadzone: f32,
}

fn default_layout_name() -> String {
    layout::DEFAULT_LAYOUT_NAME.to_string()
}

fn default_deadzone() -> f32 {
    input::DEFAULT_DEADZONE
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            last_layout: default_layout_name(),
            snap_grid: None,
            layouts_root: None,
            dpad_deadzone: default_deadzone(),
        }
    }
}

impl Settings {
    pub fn path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(paths::APP_DIR);
        path.push(paths::SETTINGS_FILENAME);
        path
    }

    /// Load settings from the platform config dir, creating defaults if absent
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "Settings file not found, writing defaults");
            let settings = Settings::default();
            settings.save_to(path)?;
            return Ok(settings);
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {:?}", path))?;
        let settings: Settings = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings JSON from {:?}", path))?;

        info!(last_layout = %settings.last_layout, "Loaded settings");
        Ok(settings)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create settings directory {:?}", parent))?;
        }

        let json = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        fs::write(path, json).with_context(|| format!("Failed to write settings to {:?}", path))?;
        Ok(())
    }

    /// Layouts root: explicit override, else `<data dir>/touch-layout/layouts`
    pub fn layouts_root(&self) -> PathBuf {
        if let Some(root) = &self.layouts_root {
            return root.clone();
        }
        let mut path = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(paths::APP_DIR);
        path.push(paths::LAYOUTS_DIR);
        path
    }

    /// Snap grid for a screen of the given size, honoring the override
    pub fn snap_grid_for(&self, screen_width: f32, screen_height: f32) -> f32 {
        match self.snap_grid {
            Some(grid) if grid >= 1.0 => grid,
            _ => snap_grid_for_screen(screen_width, screen_height),
        }
    }
}
