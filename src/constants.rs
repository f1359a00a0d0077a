//! Application-wide constants
//!
//! This module contains all magic numbers and string literals used throughout
//! the crate, providing a single source of truth for constant values.

/// File-system locations and naming
pub mod paths {
    /// Directory under the platform config/data dirs
    pub const APP_DIR: &str = "touch-layout";

    /// Settings filename inside the config directory
    pub const SETTINGS_FILENAME: &str = "settings.json";

    /// Layouts root inside the data directory
    pub const LAYOUTS_DIR: &str = "layouts";

    /// Per-layout folder holding custom textures
    pub const TEXTURES_DIR: &str = "textures";

    /// Extension of layout manifests
    pub const LAYOUT_EXTENSION: &str = "json";

    /// Extension of exported bundles
    pub const BUNDLE_EXTENSION: &str = "zip";
}

/// Layout-wide defaults and limits
pub mod layout {
    /// Name of the built-in layout that must always exist
    pub const DEFAULT_LAYOUT_NAME: &str = "default-layout";

    /// Lowest overlay alpha a layout may use
    pub const MIN_ALPHA: f32 = 0.15;

    /// Highest overlay alpha
    pub const MAX_ALPHA: f32 = 1.0;

    /// Separator used by `buttonsInDrawer`
    pub const DRAWER_SEPARATOR: char = ',';

    /// Joystick sensitivity bounds
    pub const MIN_SENSITIVITY: f32 = 0.1;
    pub const MAX_SENSITIVITY: f32 = 10.0;
    pub const DEFAULT_SENSITIVITY: f32 = 1.0;
}

/// Drag/resize snapping
pub mod snap {
    /// Snap grid in pixels on a 1080p screen
    pub const GRID_AT_1080P: f32 = 20.0;

    /// Reference screen height for the grid
    pub const REFERENCE_HEIGHT: f32 = 1080.0;

    /// Resize limits relative to the default size
    pub const MIN_SCALE: f32 = 0.5;
    pub const MAX_SCALE: f32 = 5.0;
}

/// Joystick / D-pad input shaping
pub mod input {
    /// tan(67.5°): above this axis ratio the smaller axis is dropped
    pub const SOFT_SNAP_RATIO: f32 = 2.4142;

    /// Components smaller than this are zeroed after an 8-way snap
    pub const AXIS_EPSILON: f32 = 0.01;

    /// Default D-pad deadzone
    pub const DEFAULT_DEADZONE: f32 = 0.08;
}
