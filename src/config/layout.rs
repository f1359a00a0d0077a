//! Layout-level configuration
//!
//! A layout is a named control scheme: a list of widget configs plus a few
//! layout-wide switches. Layouts are validated whenever they cross the disk
//! boundary and are sorted deterministically before being written.

use std::collections::HashSet;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::button::{ButtonConfig, TextureSource};
use crate::constants::layout::{DEFAULT_LAYOUT_NAME, MAX_ALPHA, MAX_SENSITIVITY, MIN_ALPHA, MIN_SENSITIVITY};
use crate::error::{LayoutError, LayoutResult};
use crate::types::{Action, Anchor, KeyCode, StickSide, WidgetKind};

/// Longest accepted layout or widget name
const MAX_NAME_LEN: usize = 64;

/// One complete control scheme
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub name: String,
    #[serde(rename = "defaultUIAlpha", default = "default_alpha")]
    pub global_alpha: f32,
    #[serde(rename = "leftJoystickEnabled", default = "default_true")]
    pub left_joystick_enabled: bool,
    #[serde(rename = "rightJoystickEnabled", default = "default_true")]
    pub right_joystick_enabled: bool,
    #[serde(rename = "screenTapsActivateCenterObject", default = "default_true")]
    pub tap_activates_center_object: bool,
    #[serde(default)]
    pub buttons: Vec<ButtonConfig>,
}

fn default_alpha() -> f32 {
    MAX_ALPHA
}

fn default_true() -> bool {
    true
}

/// Layout names double as directory names
pub fn is_valid_layout_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && name.trim() == name
        && !name.starts_with('.')
        && !name.chars().any(|c| c.is_control() || matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
}

/// Widget names are IDs inside a layout and appear in comma-separated drawer lists
pub fn is_valid_widget_name(name: &str) -> bool {
    is_valid_layout_name(name) && !name.chars().any(|c| c == ',' || c.is_whitespace())
}

impl LayoutConfig {
    /// Empty layout with default layout-wide settings
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            global_alpha: default_alpha(),
            left_joystick_enabled: true,
            right_joystick_enabled: true,
            tap_activates_center_object: true,
            buttons: Vec::new(),
        }
    }

    /// Whether the stick on `side` works as a stick. A disabled stick is used for mouse look.
    pub fn joystick_enabled(&self, side: StickSide) -> bool {
        match side {
            StickSide::Left => self.left_joystick_enabled,
            StickSide::Right => self.right_joystick_enabled,
        }
    }

    pub fn set_joystick_enabled(&mut self, side: StickSide, enabled: bool) {
        match side {
            StickSide::Left => self.left_joystick_enabled = enabled,
            StickSide::Right => self.right_joystick_enabled = enabled,
        }
    }

    /// The built-in layout used on first run and whenever the default goes missing
    pub fn default_template() -> Self {
        fn atlas(sprite: &str) -> TextureSource {
            TextureSource::BuiltIn {
                texture: "touchscreen_atlas".to_string(),
                sprite: Some(sprite.to_string()),
                knob_texture: None,
                knob_sprite: None,
            }
        }

        fn stick() -> TextureSource {
            TextureSource::BuiltIn {
                texture: "joystick".to_string(),
                sprite: Some("background".to_string()),
                knob_texture: Some("joystick".to_string()),
                knob_sprite: Some("knob".to_string()),
            }
        }

        let small = Vec2::splat(90.0);
        let medium = Vec2::splat(110.0);
        let stick_size = Vec2::splat(300.0);

        let mut buttons = vec![
            ButtonConfig::new("LeftJoystick", WidgetKind::Joystick, Vec2::new(250.0, 250.0), stick_size)
                .with_anchor(Anchor::BottomLeft)
                .with_textures(stick())
                .fixed(),
            ButtonConfig::new("RightJoystick", WidgetKind::CameraJoystick, Vec2::new(-250.0, 250.0), stick_size)
                .with_anchor(Anchor::BottomRight)
                .with_textures(stick())
                .fixed(),
            ButtonConfig::new("EditControls", WidgetKind::Button, Vec2::new(-80.0, -80.0), small)
                .with_anchor(Anchor::TopRight)
                .with_textures(atlas("gear"))
                .controls_toggle()
                .fixed(),
            ButtonConfig::new("Escape", WidgetKind::Button, Vec2::new(80.0, -80.0), small)
                .with_anchor(Anchor::TopLeft)
                .with_action(Action::Escape)
                .with_key(KeyCode::Escape)
                .with_textures(atlas("escape")),
        ];

        let right_cluster = [
            ("Jump", Action::Jump, Vec2::new(-520.0, 140.0)),
            ("Crouch", Action::Crouch, Vec2::new(-520.0, 280.0)),
            ("ReadyWeapon", Action::ReadyWeapon, Vec2::new(-660.0, 140.0)),
            ("CastSpell", Action::CastSpell, Vec2::new(-660.0, 280.0)),
            ("Activate", Action::ActivateCenterObject, Vec2::new(-420.0, 460.0)),
        ];
        for (name, action, position) in right_cluster {
            buttons.push(
                ButtonConfig::new(name, WidgetKind::Button, position, medium)
                    .with_anchor(Anchor::BottomRight)
                    .with_action(action)
                    .with_textures(atlas(&name.to_lowercase())),
            );
        }

        buttons.push(
            ButtonConfig::new("Run", WidgetKind::Button, Vec2::new(520.0, 140.0), medium)
                .with_anchor(Anchor::BottomLeft)
                .with_action(Action::Run)
                .with_textures(atlas("run")),
        );

        let menu_entries = [
            ("Inventory", Action::Inventory),
            ("CharacterSheet", Action::CharacterSheet),
            ("AutoMap", Action::AutoMap),
            ("TravelMap", Action::TravelMap),
            ("LogBook", Action::LogBook),
            ("Rest", Action::Rest),
        ];
        for (i, (name, action)) in menu_entries.iter().enumerate() {
            buttons.push(
                ButtonConfig::new(*name, WidgetKind::Button, Vec2::new(200.0, -200.0 - 100.0 * i as f32), small)
                    .with_anchor(Anchor::TopLeft)
                    .with_action(*action)
                    .with_textures(atlas(&name.to_lowercase())),
            );
        }
        buttons.push(
            ButtonConfig::new("MenuDrawer", WidgetKind::Drawer, Vec2::new(200.0, -80.0), small)
                .with_anchor(Anchor::TopLeft)
                .with_textures(atlas("menu"))
                .with_members(menu_entries.iter().map(|(name, _)| *name)),
        );

        for (name, action, x) in [("QuickSave", Action::QuickSave, -60.0), ("QuickLoad", Action::QuickLoad, 60.0)] {
            buttons.push(
                ButtonConfig::new(name, WidgetKind::Button, Vec2::new(x, -80.0), small)
                    .with_anchor(Anchor::TopMiddle)
                    .with_action(action)
                    .with_textures(atlas(&name.to_lowercase()))
                    .disabled_by_default(),
            );
        }

        let mut layout = Self {
            buttons,
            ..Self::new(DEFAULT_LAYOUT_NAME)
        };
        layout.attach_buttons();
        layout.sort_for_persistence();
        layout
    }

    pub fn find(&self, widget: &str) -> Option<&ButtonConfig> {
        self.buttons.iter().find(|b| b.name == widget)
    }

    pub fn find_mut(&mut self, widget: &str) -> Option<&mut ButtonConfig> {
        self.buttons.iter_mut().find(|b| b.name == widget)
    }

    /// Point every button's back-reference at this layout
    pub fn attach_buttons(&mut self) {
        for button in &mut self.buttons {
            button.parent_layout.clone_from(&self.name);
        }
    }

    /// Rename in memory, keeping back-references in sync
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.attach_buttons();
    }

    /// Drop `widget` from every drawer that lists it
    pub fn remove_from_all_drawers(&mut self, widget: &str) {
        for button in &mut self.buttons {
            button.remove_from_drawer(widget);
        }
    }

    /// Clamp soft limits, warning about every value that had to change
    pub fn normalize(&mut self) {
        if self.global_alpha.is_finite() && !(MIN_ALPHA..=MAX_ALPHA).contains(&self.global_alpha) {
            warn!(layout = %self.name, alpha = self.global_alpha, min = MIN_ALPHA, max = MAX_ALPHA, "defaultUIAlpha out of range, clamping");
            self.global_alpha = self.global_alpha.clamp(MIN_ALPHA, MAX_ALPHA);
        }

        for button in &mut self.buttons {
            let sensitivity = button.joystick_sensitivity;
            if sensitivity.is_finite() && !(MIN_SENSITIVITY..=MAX_SENSITIVITY).contains(&sensitivity) {
                warn!(layout = %self.name, widget = %button.name, sensitivity, "joystickSensitivity out of range, clamping");
                button.joystick_sensitivity = sensitivity.clamp(MIN_SENSITIVITY, MAX_SENSITIVITY);
            }
        }
    }

    /// Check every structural invariant; violations are reported as `Corrupt`
    pub fn validate(&self) -> LayoutResult<()> {
        let corrupt = |reason: String| LayoutError::corrupt(self.name.clone(), reason);

        if !is_valid_layout_name(&self.name) {
            return Err(corrupt(format!("invalid layout name '{}'", self.name)));
        }
        if !self.global_alpha.is_finite() {
            return Err(corrupt("defaultUIAlpha is not a finite number".to_string()));
        }

        let mut names = HashSet::new();
        for button in &self.buttons {
            if !is_valid_widget_name(&button.name) {
                return Err(corrupt(format!("invalid widget name '{}'", button.name)));
            }
            if !names.insert(button.name.as_str()) {
                return Err(corrupt(format!("duplicate widget name '{}'", button.name)));
            }
            let numbers = [button.position, button.default_position, button.size, button.default_size];
            if !numbers.iter().all(|v| v.is_finite()) || !button.joystick_sensitivity.is_finite() {
                return Err(corrupt(format!("widget '{}' has a non-finite number", button.name)));
            }
            if button.size.min_element() <= 0.0 || button.default_size.min_element() <= 0.0 {
                return Err(corrupt(format!("widget '{}' has a non-positive size", button.name)));
            }
            if !button.kind.is_drawer() && !button.drawer_members.is_empty() {
                return Err(corrupt(format!("widget '{}' lists drawer members but is a {}", button.name, button.kind)));
            }
            if button.drawer_members.iter().any(|m| *m == button.name) {
                return Err(corrupt(format!("drawer '{}' contains itself", button.name)));
            }
        }

        for button in &self.buttons {
            if let Some(missing) = button.drawer_members.iter().find(|m| !names.contains(m.as_str())) {
                return Err(corrupt(format!("drawer '{}' lists unknown widget '{}'", button.name, missing)));
            }
        }

        let (_, stuck) = drawer_order(&self.buttons);
        if !stuck.is_empty() {
            let stuck: Vec<&str> = stuck.iter().map(|&i| self.buttons[i].name.as_str()).collect();
            return Err(corrupt(format!("drawers contain each other in a cycle: {}", stuck.join(", "))));
        }

        Ok(())
    }

    /// Non-drawers first, then drawers with contained drawers ahead of their containers
    pub fn sort_for_persistence(&mut self) {
        let (mut drawers, stuck) = drawer_order(&self.buttons);
        drawers.extend(stuck);

        let mut slots: Vec<Option<ButtonConfig>> = std::mem::take(&mut self.buttons).into_iter().map(Some).collect();
        let mut sorted = Vec::with_capacity(slots.len());
        for slot in slots.iter_mut() {
            if slot.as_ref().is_some_and(|b| !b.kind.is_drawer()) {
                sorted.extend(slot.take());
            }
        }
        for i in drawers {
            sorted.extend(slots[i].take());
        }
        self.buttons = sorted;
    }

    /// Distinct external texture paths referenced by any widget, in first-use order
    pub fn referenced_textures(&self) -> Vec<String> {
        let mut paths: Vec<String> = Vec::new();
        for button in &self.buttons {
            for path in button.textures.external_paths() {
                if !paths.iter().any(|p| p == path) {
                    paths.push(path.to_string());
                }
            }
        }
        paths
    }

    /// Parse, normalize and validate a layout read from disk
    pub fn from_json(source_name: &str, json: &str) -> LayoutResult<Self> {
        let mut layout: LayoutConfig =
            serde_json::from_str(json).map_err(|e| LayoutError::corrupt(source_name, e.to_string()))?;
        layout.normalize();
        layout.validate()?;
        layout.attach_buttons();
        Ok(layout)
    }

    /// Serialize a sorted copy; the receiver is left untouched
    pub fn to_json(&self) -> LayoutResult<String> {
        let mut sorted = self.clone();
        sorted.sort_for_persistence();
        serde_json::to_string_pretty(&sorted).map_err(|source| LayoutError::Serialize {
            layout: self.name.clone(),
            source,
        })
    }
}

/// Order of drawer indices such that every drawer comes after the drawers it contains,
/// plus the drawers left over because they sit in a containment cycle.
fn drawer_order(buttons: &[ButtonConfig]) -> (Vec<usize>, Vec<usize>) {
    let drawer_names: HashSet<&str> = buttons
        .iter()
        .filter(|b| b.kind.is_drawer())
        .map(|b| b.name.as_str())
        .collect();
    let mut pending: Vec<usize> = (0..buttons.len()).filter(|&i| buttons[i].kind.is_drawer()).collect();
    let mut placed: HashSet<&str> = HashSet::new();
    let mut order = Vec::with_capacity(pending.len());

    loop {
        let before = pending.len();
        pending.retain(|&i| {
            let ready = buttons[i]
                .drawer_members
                .iter()
                .filter(|m| drawer_names.contains(m.as_str()))
                .all(|m| placed.contains(m.as_str()));
            if ready {
                placed.insert(buttons[i].name.as_str());
                order.push(i);
            }
            !ready
        });
        if pending.is_empty() || pending.len() == before {
            return (order, pending);
        }
    }
}
