//! Directory-per-layout persistence
//!
//! Every layout lives in `<root>/<name>/` with its manifest at
//! `<root>/<name>/<name>.json` and custom textures under `textures/`.
//! Manifests are always replaced atomically (temp file + rename).

use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::config::layout::{is_valid_layout_name, LayoutConfig};
use crate::constants::layout::DEFAULT_LAYOUT_NAME;
use crate::constants::paths::{LAYOUT_EXTENSION, TEXTURES_DIR};
use crate::error::{LayoutError, LayoutResult};

/// Durable mapping from layout name to `LayoutConfig`
#[derive(Debug)]
pub struct LayoutStore {
    root: PathBuf,
    index: BTreeSet<String>,
}

impl LayoutStore {
    /// Open (and create if needed) a store rooted at `root`
    pub fn open(root: impl Into<PathBuf>) -> LayoutResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| LayoutError::io(&root, e))?;

        let mut store = Self {
            root,
            index: BTreeSet::new(),
        };
        let names = store.list()?;
        info!(root = %store.root.display(), layouts = names.len(), "Opened layout store");
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn layout_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn manifest_path(&self, name: &str) -> PathBuf {
        self.layout_dir(name).join(manifest_file_name(name))
    }

    pub fn textures_dir(&self, name: &str) -> PathBuf {
        self.layout_dir(name).join(TEXTURES_DIR)
    }

    /// Names seen by the last `list`, `load` or `save`
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.index.iter().map(String::as_str)
    }

    /// Whether a layout with this name exists on disk
    pub fn contains(&self, name: &str) -> bool {
        is_valid_layout_name(name) && self.manifest_path(name).is_file()
    }

    /// Rescan the root. The default layout is regenerated first if it went missing.
    pub fn list(&mut self) -> LayoutResult<Vec<String>> {
        self.ensure_default()?;

        let entries = fs::read_dir(&self.root).map_err(|e| LayoutError::io(&self.root, e))?;
        let mut names = BTreeSet::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(root = %self.root.display(), error = %e, "Skipping unreadable directory entry");
                    continue;
                }
            };
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !is_valid_layout_name(name) {
                debug!(path = %path.display(), "Skipping directory with an invalid layout name");
                continue;
            }
            if path.join(manifest_file_name(name)).is_file() {
                names.insert(name.to_string());
            } else {
                debug!(path = %path.display(), "Skipping directory without a manifest");
            }
        }

        self.index = names;
        Ok(self.index.iter().cloned().collect())
    }

    /// Load a layout by name. A missing default layout is regenerated rather than reported.
    pub fn load(&mut self, name: &str) -> LayoutResult<LayoutConfig> {
        if !is_valid_layout_name(name) {
            return Err(LayoutError::InvalidName(name.to_string()));
        }

        let path = self.manifest_path(name);
        if !path.is_file() {
            if name != DEFAULT_LAYOUT_NAME {
                self.index.remove(name);
                return Err(LayoutError::NotFound { layout: name.to_string() });
            }
            self.ensure_default()?;
        }

        let json = fs::read_to_string(&path).map_err(|e| LayoutError::io(&path, e))?;
        let mut layout = LayoutConfig::from_json(name, &json)?;
        if layout.name != name {
            warn!(directory = %name, manifest = %layout.name, "Manifest name differs from its directory, using the directory name");
            layout.set_name(name);
        }

        self.index.insert(name.to_string());
        debug!(layout = %name, widgets = layout.buttons.len(), "Loaded layout");
        Ok(layout)
    }

    /// Validate and persist a layout, creating its directory if needed
    pub fn save(&mut self, layout: &LayoutConfig) -> LayoutResult<()> {
        if !is_valid_layout_name(&layout.name) {
            return Err(LayoutError::InvalidName(layout.name.clone()));
        }

        let mut layout = layout.clone();
        layout.normalize();
        layout.validate()?;
        let json = layout.to_json()?;

        let textures = self.textures_dir(&layout.name);
        fs::create_dir_all(&textures).map_err(|e| LayoutError::io(&textures, e))?;
        write_atomically(&self.manifest_path(&layout.name), json.as_bytes())?;

        self.index.insert(layout.name.clone());
        info!(layout = %layout.name, widgets = layout.buttons.len(), "Saved layout");
        Ok(())
    }

    /// Move a layout to a new name; returns the renamed layout
    pub fn rename(&mut self, old_name: &str, new_name: &str) -> LayoutResult<LayoutConfig> {
        if !is_valid_layout_name(new_name) {
            return Err(LayoutError::InvalidName(new_name.to_string()));
        }

        let mut layout = self.load(old_name)?;
        let old_dir = self.layout_dir(old_name);
        let new_dir = self.layout_dir(new_name);
        if new_dir.exists() {
            return Err(LayoutError::NameConflict(new_name.to_string()));
        }

        fs::rename(&old_dir, &new_dir).map_err(|e| LayoutError::io(&old_dir, e))?;

        layout.set_name(new_name);
        let rewritten = layout
            .to_json()
            .and_then(|json| write_atomically(&self.manifest_path(new_name), json.as_bytes()));
        if let Err(e) = rewritten {
            if let Err(undo) = fs::rename(&new_dir, &old_dir) {
                warn!(from = %new_dir.display(), to = %old_dir.display(), error = %undo, "Failed to move layout back after a failed rename");
            }
            return Err(e);
        }

        let stale = new_dir.join(manifest_file_name(old_name));
        if let Err(e) = fs::remove_file(&stale) {
            warn!(path = %stale.display(), error = %e, "Failed to remove the old manifest after rename");
        }

        self.index.remove(old_name);
        self.index.insert(new_name.to_string());
        info!(from = %old_name, to = %new_name, "Renamed layout");
        Ok(layout)
    }

    /// Remove a layout and its textures. Deleting the default is allowed;
    /// it comes back from the template on the next `list` or `load`.
    pub fn delete(&mut self, name: &str) -> LayoutResult<()> {
        if !self.contains(name) {
            return Err(LayoutError::NotFound { layout: name.to_string() });
        }

        let dir = self.layout_dir(name);
        fs::remove_dir_all(&dir).map_err(|e| LayoutError::io(&dir, e))?;
        self.index.remove(name);

        if name == DEFAULT_LAYOUT_NAME {
            info!("Deleted the default layout, it will be regenerated on next use");
        } else {
            info!(layout = %name, "Deleted layout");
        }
        Ok(())
    }

    /// Load, flip one widget's `enabled` flag, save
    pub fn set_widget_enabled(&mut self, layout_name: &str, widget: &str, enabled: bool) -> LayoutResult<LayoutConfig> {
        let mut layout = self.load(layout_name)?;
        let button = layout.find_mut(widget).ok_or_else(|| LayoutError::WidgetNotFound {
            layout: layout_name.to_string(),
            widget: widget.to_string(),
        })?;
        button.enabled = enabled;

        self.save(&layout)?;
        info!(layout = %layout_name, widget = %widget, enabled, "Updated widget visibility");
        Ok(layout)
    }

    fn ensure_default(&mut self) -> LayoutResult<()> {
        if self.manifest_path(DEFAULT_LAYOUT_NAME).is_file() {
            return Ok(());
        }
        info!(root = %self.root.display(), "Default layout missing, regenerating from template");
        self.save(&LayoutConfig::default_template())
    }
}

pub(crate) fn manifest_file_name(name: &str) -> String {
    format!("{name}.{LAYOUT_EXTENSION}")
}

/// Write `bytes` to `path` so readers see either the old or the new content
pub(crate) fn write_atomically(path: &Path, bytes: &[u8]) -> LayoutResult<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| LayoutError::io(dir, e))?;
    tmp.write_all(bytes).map_err(|e| LayoutError::io(tmp.path(), e))?;
    tmp.as_file().sync_all().map_err(|e| LayoutError::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| LayoutError::io(path, e.error))?;
    Ok(())
}
