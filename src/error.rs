use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced by the layout store and bundler
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("layout '{layout}' not found")]
    NotFound { layout: String },

    #[error("widget '{widget}' not found in layout '{layout}'")]
    WidgetNotFound { layout: String, widget: String },

    #[error("a layout named '{0}' already exists")]
    NameConflict(String),

    #[error("'{0}' is not a valid layout or widget name")]
    InvalidName(String),

    #[error("layout '{layout}' is corrupt: {reason}")]
    Corrupt { layout: String, reason: String },

    #[error("widget '{widget}' cannot be {operation}")]
    Locked { widget: String, operation: &'static str },

    #[error("no widget is selected")]
    NoSelection,

    #[error("{value} is not a usable {field}")]
    InvalidValue { field: &'static str, value: f32 },

    #[error("invalid layout bundle {}: {reason}", path.display())]
    InvalidBundle { path: PathBuf, reason: String },

    #[error("I/O failure at {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("archive failure at {}", path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("failed to serialize layout '{layout}'")]
    Serialize {
        layout: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type LayoutResult<T> = Result<T, LayoutError>;

impl LayoutError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub(crate) fn corrupt(layout: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Corrupt { layout: layout.into(), reason: reason.into() }
    }

    /// True for the errors after which the caller should fall back to the default layout
    pub fn is_recoverable_by_default(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::Corrupt { .. })
    }
}
