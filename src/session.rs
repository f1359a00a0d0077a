//! Layout context and edit sessions
//!
//! `LayoutContext` owns everything a running overlay needs: the store, the
//! current layout, the widget pool and the host collaborators. Editing goes
//! through an `EditSession`, which holds the one widget being edited and
//! writes the layout back when it finishes.

use std::fs;
use std::path::{Path, PathBuf};

use glam::Vec2;
use tracing::{debug, info, warn};

use crate::bindings::ActionBindings;
use crate::bundle::{self, ImportOutcome};
use crate::config::button::ButtonConfig;
use crate::config::layout::LayoutConfig;
use crate::config::settings::Settings;
use crate::constants::layout::{DEFAULT_LAYOUT_NAME, MAX_ALPHA, MAX_SENSITIVITY, MIN_ALPHA, MIN_SENSITIVITY};
use crate::error::{LayoutError, LayoutResult};
use crate::geometry::{self, Viewport, WidgetTransform};
use crate::pool::{Widget, WidgetPool};
use crate::store::LayoutStore;
use crate::textures::{external_texture_path, SpriteAtlas, TextureResolver};
use crate::types::{Action, Anchor, KeyCode, StickSide, WidgetKind};

/// How a stick widget's input is used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StickMode {
    /// Directional input, shaped toward the 8 directions
    Stick,
    /// The stick is switched off in the layout and drags the camera instead
    MouseLook,
}

pub struct LayoutContext {
    store: LayoutStore,
    pool: WidgetPool,
    settings: Settings,
    settings_path: Option<PathBuf>,
    bindings: Box<dyn ActionBindings>,
    textures: TextureResolver,
    viewport: Viewport,
    current: LayoutConfig,
}

impl std::fmt::Debug for LayoutContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutContext")
            .field("store", &self.store)
            .field("current", &self.current.name)
            .field("viewport", &self.viewport)
            .finish_non_exhaustive()
    }
}

impl LayoutContext {
    /// Open the store named by `settings` and bind the last selected layout
    pub fn open(
        settings: Settings,
        bindings: impl ActionBindings + 'static,
        atlas: impl SpriteAtlas + 'static,
        viewport: Viewport,
    ) -> LayoutResult<Self> {
        let root = settings.layouts_root();
        Self::open_in(root, settings, bindings, atlas, viewport)
    }

    /// Like `open`, but with the layouts directory given for this run only
    pub fn open_in(
        root: impl Into<PathBuf>,
        settings: Settings,
        bindings: impl ActionBindings + 'static,
        atlas: impl SpriteAtlas + 'static,
        viewport: Viewport,
    ) -> LayoutResult<Self> {
        let root = root.into();
        let store = LayoutStore::open(&root)?;
        let last = settings.last_layout.clone();

        let mut ctx = Self {
            store,
            pool: WidgetPool::new(),
            settings,
            settings_path: None,
            bindings: Box::new(bindings),
            textures: TextureResolver::new(root, atlas),
            viewport,
            current: LayoutConfig::default_template(),
        };
        ctx.switch_layout(&last)?;
        Ok(ctx)
    }

    /// Persist the selected layout to this settings file on every switch
    pub fn with_settings_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_path = Some(path.into());
        self
    }

    pub fn current(&self) -> &LayoutConfig {
        &self.current
    }

    pub fn store(&self) -> &LayoutStore {
        &self.store
    }

    pub fn pool(&self) -> &WidgetPool {
        &self.pool
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn snap_grid(&self) -> f32 {
        self.settings.snap_grid_for(self.viewport.width, self.viewport.height)
    }

    /// Runtime widget bound to `name` in the current layout
    pub fn widget(&self, name: &str) -> Option<&Widget> {
        self.pool.find(name).and_then(|id| self.pool.get(id))
    }

    pub fn stick_mode(&self, widget: &str) -> Option<StickMode> {
        let side = self.current.find(widget)?.kind.stick_side()?;
        Some(if self.current.joystick_enabled(side) {
            StickMode::Stick
        } else {
            StickMode::MouseLook
        })
    }

    /// Shape raw axis input for a stick widget. `None` for widgets without axis input.
    ///
    /// A stick switched off in the layout passes its input through unshaped as a look delta.
    pub fn shape_input(&self, widget: &str, input: Vec2) -> Option<Vec2> {
        let mode = self.stick_mode(widget)?;
        let button = self.current.find(widget)?;
        let shaped = if mode == StickMode::MouseLook {
            input
        } else if button.kind.is_dpad() {
            geometry::snap_to_8_directions(input, self.settings.dpad_deadzone)
        } else {
            geometry::snap_softly_to_8_directions(input)
        };
        Some(shaped * button.joystick_sensitivity)
    }

    /// Make `name` the current layout. A missing or corrupt layout falls back to the default.
    pub fn switch_layout(&mut self, name: &str) -> LayoutResult<&LayoutConfig> {
        let layout = match self.store.load(name) {
            Ok(layout) => layout,
            Err(e) if e.is_recoverable_by_default() => {
                warn!(layout = %name, error = %e, "Falling back to the default layout");
                self.load_default()?
            }
            Err(e) => return Err(e),
        };

        self.current = layout;
        self.rebuild_widgets();
        self.remember_selection();
        info!(layout = %self.current.name, widgets = self.current.buttons.len(), "Switched layout");
        Ok(&self.current)
    }

    fn load_default(&mut self) -> LayoutResult<LayoutConfig> {
        match self.store.load(DEFAULT_LAYOUT_NAME) {
            Ok(layout) => Ok(layout),
            Err(e @ LayoutError::Corrupt { .. }) => {
                warn!(error = %e, "Default layout is corrupt, using the built-in template until it is saved");
                Ok(LayoutConfig::default_template())
            }
            Err(e) => Err(e),
        }
    }

    fn remember_selection(&mut self) {
        if self.settings.last_layout == self.current.name {
            return;
        }
        self.settings.last_layout.clone_from(&self.current.name);
        if let Some(path) = &self.settings_path {
            if let Err(e) = self.settings.save_to(path) {
                warn!(path = %path.display(), error = %format!("{e:#}"), "Failed to remember selected layout");
            }
        }
    }

    /// Rebind the pool to the current layout
    pub fn rebuild_widgets(&mut self) {
        self.pool.load_layout(&self.current, &*self.bindings, &self.textures);
    }

    fn refresh_widget(&mut self, name: &str) {
        let (Some(id), Some(config)) = (self.pool.find(name), self.current.find(name)) else {
            return;
        };
        self.pool.rebind(id, config, &*self.bindings, &self.textures);
    }

    pub fn save_current(&mut self) -> LayoutResult<()> {
        self.current.attach_buttons();
        self.store.save(&self.current)
    }

    /// Layout names on disk
    pub fn list_layouts(&mut self) -> LayoutResult<Vec<String>> {
        self.store.list()
    }

    /// Store a copy of the current layout under a new name and switch to it
    pub fn save_current_as(&mut self, name: &str) -> LayoutResult<()> {
        if self.store.contains(name) {
            return Err(LayoutError::NameConflict(name.to_string()));
        }
        let mut copy = self.current.clone();
        copy.set_name(name);
        self.store.save(&copy)?;

        for relative in copy.referenced_textures() {
            let (Some(from), Some(to)) = (
                external_texture_path(self.store.root(), &self.current.name, &relative),
                external_texture_path(self.store.root(), name, &relative),
            ) else {
                continue;
            };
            let copied = to
                .parent()
                .map_or(Ok(()), fs::create_dir_all)
                .and_then(|()| fs::copy(&from, &to));
            if let Err(e) = copied {
                warn!(from = %from.display(), to = %to.display(), error = %e, "Failed to copy texture to the new layout");
            }
        }

        self.current = copy;
        self.rebuild_widgets();
        self.remember_selection();
        Ok(())
    }

    pub fn rename_layout(&mut self, old_name: &str, new_name: &str) -> LayoutResult<()> {
        let renamed = self.store.rename(old_name, new_name)?;
        if self.current.name == old_name {
            self.current = renamed;
            self.rebuild_widgets();
            self.remember_selection();
        }
        Ok(())
    }

    /// Delete a layout; deleting the current one switches back to the default
    pub fn delete_layout(&mut self, name: &str) -> LayoutResult<()> {
        self.store.delete(name)?;
        if self.current.name == name {
            self.switch_layout(DEFAULT_LAYOUT_NAME)?;
        }
        Ok(())
    }

    pub fn set_widget_enabled(&mut self, layout: &str, widget: &str, enabled: bool) -> LayoutResult<()> {
        let updated = self.store.set_widget_enabled(layout, widget, enabled)?;
        if self.current.name == layout {
            self.current = updated;
            self.refresh_widget(widget);
        }
        Ok(())
    }

    pub fn export_current(&self, dest: &Path) -> LayoutResult<PathBuf> {
        bundle::export(&self.store, &self.current, dest)
    }

    /// Import a bundle; an imported layout replacing the current one is rebound
    pub fn import_bundle(
        &mut self,
        archive: &Path,
        confirm: impl FnOnce(&str) -> bool,
    ) -> LayoutResult<ImportOutcome> {
        let outcome = bundle::import(&mut self.store, archive, confirm)?;
        if let ImportOutcome::Imported(layout) = &outcome {
            if layout.name == self.current.name {
                self.current = layout.clone();
                self.rebuild_widgets();
            }
        }
        Ok(outcome)
    }

    pub fn begin_edit(&mut self) -> EditSession<'_> {
        debug!(layout = %self.current.name, "Entering edit mode");
        EditSession {
            ctx: self,
            selected: None,
            drag_start: None,
            resize_start: None,
            dirty: false,
        }
    }
}

/// Edit mode over the current layout. Changes are saved by `finish`.
pub struct EditSession<'a> {
    ctx: &'a mut LayoutContext,
    selected: Option<String>,
    drag_start: Option<Vec2>,
    resize_start: Option<Vec2>,
    dirty: bool,
}

impl EditSession<'_> {
    pub fn layout(&self) -> &LayoutConfig {
        &self.ctx.current
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn selected(&self) -> Option<&ButtonConfig> {
        self.selected.as_deref().and_then(|name| self.ctx.current.find(name))
    }

    /// Make `widget` the one being edited, ending any drag or resize in progress
    pub fn select(&mut self, widget: &str) -> LayoutResult<()> {
        if self.ctx.current.find(widget).is_none() {
            return Err(self.not_found(widget));
        }
        self.end_gesture();
        self.selected = Some(widget.to_string());
        Ok(())
    }

    pub fn deselect(&mut self) {
        self.end_gesture();
        self.selected = None;
    }

    /// Move the selected widget by `delta` measured from where the drag started
    pub fn drag(&mut self, delta: Vec2) -> LayoutResult<Vec2> {
        finite_delta(delta)?;
        let grid = self.ctx.snap_grid();
        let viewport = self.ctx.viewport;
        let mut start = self.drag_start;

        let position = self.edit_selected(|button| {
            let start = *start.get_or_insert(button.position);
            button.position = geometry::drag_position(&WidgetTransform::from(&*button), start, delta, grid, viewport);
            Ok(button.position)
        })?;
        self.drag_start = start;
        Ok(position)
    }

    /// Grow or shrink the selected widget by `delta` measured from where the resize started
    pub fn resize(&mut self, delta: Vec2) -> LayoutResult<Vec2> {
        finite_delta(delta)?;
        let grid = self.ctx.snap_grid();
        let mut start = self.resize_start;

        let size = self.edit_selected(|button| {
            if !button.resizable {
                return Err(locked(button, "resized"));
            }
            let start = *start.get_or_insert(button.size);
            button.size = geometry::resize(&WidgetTransform::from(&*button), start, delta, grid);
            Ok(button.size)
        })?;
        self.resize_start = start;
        Ok(size)
    }

    /// Pointer released: the next drag or resize starts from the current transform
    pub fn end_gesture(&mut self) {
        self.drag_start = None;
        self.resize_start = None;
    }

    pub fn set_action(&mut self, action: Action) -> LayoutResult<()> {
        self.edit_editable(|button| button.action = action)
    }

    pub fn set_key(&mut self, key: KeyCode) -> LayoutResult<()> {
        self.edit_editable(|button| button.key = key)
    }

    pub fn set_anchor(&mut self, anchor: Anchor) -> LayoutResult<()> {
        self.edit_editable(|button| button.anchor = anchor)
    }

    pub fn set_label_anchor(&mut self, anchor: Anchor) -> LayoutResult<()> {
        self.edit_editable(|button| button.label_anchor = anchor)
    }

    pub fn set_label(&mut self, label: &str) -> LayoutResult<()> {
        self.edit_editable(|button| button.label = label.to_string())
    }

    /// Returns the sensitivity actually stored, clamped to the allowed range
    pub fn set_sensitivity(&mut self, sensitivity: f32) -> LayoutResult<f32> {
        if !sensitivity.is_finite() {
            return Err(LayoutError::InvalidValue {
                field: "joystick sensitivity",
                value: sensitivity,
            });
        }
        let sensitivity = sensitivity.clamp(MIN_SENSITIVITY, MAX_SENSITIVITY);
        self.edit_editable(|button| button.joystick_sensitivity = sensitivity)?;
        Ok(sensitivity)
    }

    /// Overlay alpha for the whole layout, clamped to the allowed range
    pub fn set_global_alpha(&mut self, alpha: f32) -> LayoutResult<f32> {
        if !alpha.is_finite() {
            return Err(LayoutError::InvalidValue {
                field: "overlay alpha",
                value: alpha,
            });
        }
        self.ctx.current.global_alpha = alpha.clamp(MIN_ALPHA, MAX_ALPHA);
        self.dirty = true;
        Ok(self.ctx.current.global_alpha)
    }

    /// Switch a stick between directional input and mouse look
    pub fn set_joystick_enabled(&mut self, side: StickSide, enabled: bool) {
        self.ctx.current.set_joystick_enabled(side, enabled);
        self.dirty = true;
    }

    pub fn set_tap_activates_center_object(&mut self, enabled: bool) {
        self.ctx.current.tap_activates_center_object = enabled;
        self.dirty = true;
    }

    /// Change the widget kind. A drawer turned into anything else loses its members.
    pub fn set_kind(&mut self, kind: WidgetKind) -> LayoutResult<()> {
        self.edit_editable(|button| {
            button.kind = kind;
            if !kind.is_drawer() {
                button.drawer_members.clear();
            }
        })?;
        self.ctx.rebuild_widgets();
        Ok(())
    }

    /// Show or hide any widget. Only removable widgets can be hidden.
    pub fn set_enabled(&mut self, widget: &str, enabled: bool) -> LayoutResult<()> {
        let button = self.find_mut(widget)?;
        if !enabled && !button.removable {
            return Err(locked(button, "hidden"));
        }
        button.enabled = enabled;
        self.touch(widget);
        Ok(())
    }

    /// Put `member` into `drawer`. Returns false if it was already there.
    pub fn add_to_drawer(&mut self, drawer: &str, member: &str) -> LayoutResult<bool> {
        if self.ctx.current.find(member).is_none() {
            return Err(self.not_found(member));
        }
        let target = self.find_mut(drawer)?;
        if !target.kind.is_drawer() {
            return Err(locked(target, "given drawer members"));
        }
        if !target.add_to_drawer(member) {
            return Ok(false);
        }

        if let Err(e) = self.ctx.current.validate() {
            if let Some(target) = self.ctx.current.find_mut(drawer) {
                target.remove_from_drawer(member);
            }
            return Err(e);
        }
        self.dirty = true;
        self.ctx.rebuild_widgets();
        Ok(true)
    }

    pub fn remove_from_drawer(&mut self, drawer: &str, member: &str) -> LayoutResult<bool> {
        let removed = self.find_mut(drawer)?.remove_from_drawer(member);
        if removed {
            self.dirty = true;
            self.ctx.rebuild_widgets();
        }
        Ok(removed)
    }

    /// Selected widget back to its default transform and bindings
    pub fn reset_selected(&mut self) -> LayoutResult<()> {
        self.edit_selected(|button| {
            button.reset_transform();
            button.reset_action();
            Ok(())
        })
    }

    pub fn reset_all_transforms(&mut self) {
        self.reset_all(ButtonConfig::reset_transform);
    }

    pub fn reset_all_actions(&mut self) {
        self.reset_all(ButtonConfig::reset_action);
    }

    fn reset_all(&mut self, reset: fn(&mut ButtonConfig)) {
        self.end_gesture();
        self.ctx.current.buttons.iter_mut().for_each(reset);
        self.dirty = true;
        self.ctx.rebuild_widgets();
    }

    /// Leave edit mode and save the layout
    pub fn finish(self) -> LayoutResult<()> {
        self.ctx.save_current()?;
        debug!(layout = %self.ctx.current.name, changed = self.dirty, "Leaving edit mode");
        Ok(())
    }

    /// Leave edit mode, throwing away unsaved changes
    pub fn discard(self) -> LayoutResult<()> {
        if self.dirty {
            let name = self.ctx.current.name.clone();
            self.ctx.switch_layout(&name)?;
        }
        Ok(())
    }

    fn not_found(&self, widget: &str) -> LayoutError {
        LayoutError::WidgetNotFound {
            layout: self.ctx.current.name.clone(),
            widget: widget.to_string(),
        }
    }

    fn find_mut(&mut self, widget: &str) -> LayoutResult<&mut ButtonConfig> {
        let layout = &mut self.ctx.current;
        let name = layout.name.clone();
        layout.find_mut(widget).ok_or_else(|| LayoutError::WidgetNotFound {
            layout: name,
            widget: widget.to_string(),
        })
    }

    fn touch(&mut self, widget: &str) {
        self.dirty = true;
        self.ctx.refresh_widget(widget);
    }

    fn edit_selected<T>(&mut self, edit: impl FnOnce(&mut ButtonConfig) -> LayoutResult<T>) -> LayoutResult<T> {
        let name = self.selected.clone().ok_or(LayoutError::NoSelection)?;
        let value = edit(self.find_mut(&name)?)?;
        self.touch(&name);
        Ok(value)
    }

    fn edit_editable(&mut self, edit: impl FnOnce(&mut ButtonConfig)) -> LayoutResult<()> {
        self.edit_selected(|button| {
            if !button.editable {
                return Err(locked(button, "edited"));
            }
            edit(button);
            Ok(())
        })
    }
}

fn finite_delta(delta: Vec2) -> LayoutResult<()> {
    match [delta.x, delta.y].into_iter().find(|v| !v.is_finite()) {
        Some(value) => Err(LayoutError::InvalidValue { field: "pointer delta", value }),
        None => Ok(()),
    }
}

fn locked(button: &ButtonConfig, operation: &'static str) -> LayoutError {
    LayoutError::Locked {
        widget: button.name.clone(),
        operation,
    }
}
