//! Configuration model
//!
//! - **button**: per-widget configuration and its on-disk shape
//! - **layout**: a named set of widgets plus layout-wide switches
//! - **settings**: session-scoped settings kept outside any layout

pub mod button;
pub mod layout;
pub mod settings;

pub use button::{ButtonConfig, TextureSource};
pub use layout::{is_valid_layout_name, is_valid_widget_name, LayoutConfig};
pub use settings::Settings;
