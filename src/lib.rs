#![forbid(unsafe_code)]

//! Touchscreen control layouts
//!
//! Widget configuration, the directory-per-layout store, zip bundles for
//! sharing layouts, a recycled widget pool and the geometry used while
//! editing a layout on screen.

pub mod bindings;
pub mod bundle;
pub mod config;
pub mod constants;
pub mod error;
pub mod geometry;
pub mod pool;
pub mod session;
pub mod store;
pub mod textures;
pub mod types;

pub use bindings::{ActionBindings, StaticBindings};
pub use bundle::{export, import, stage_import, ImportOutcome, StagedImport};
pub use config::{ButtonConfig, LayoutConfig, Settings, TextureSource};
pub use error::{LayoutError, LayoutResult};
pub use geometry::{Rect, Viewport};
pub use pool::{Widget, WidgetId, WidgetPool};
pub use session::{EditSession, LayoutContext, StickMode};
pub use store::LayoutStore;
pub use textures::{MemoryAtlas, Sprite, SpriteAtlas, TextureResolver};
pub use types::{Action, Anchor, KeyCode, StickSide, WidgetKind};
