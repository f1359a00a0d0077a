//! Per-widget configuration
//!
//! `ButtonConfig` is the typed model used everywhere in the crate. On disk it
//! goes through `ButtonConfigRepr`, which keeps the flat camelCase field
//! layout existing layout files use.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::constants::layout::{DEFAULT_SENSITIVITY, DRAWER_SEPARATOR};
use crate::types::{Action, Anchor, KeyCode, WidgetKind};

/// Where a widget's textures come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextureSource {
    /// Resources from the built-in atlas, optionally a named sub-sprite
    BuiltIn {
        texture: String,
        sprite: Option<String>,
        knob_texture: Option<String>,
        knob_sprite: Option<String>,
    },
    /// Files relative to the owning layout's `textures/` folder
    External {
        texture: String,
        knob_texture: Option<String>,
    },
}

impl TextureSource {
    pub fn built_in(texture: impl Into<String>) -> Self {
        Self::BuiltIn {
            texture: texture.into(),
            sprite: None,
            knob_texture: None,
            knob_sprite: None,
        }
    }

    pub fn external(texture: impl Into<String>) -> Self {
        Self::External {
            texture: texture.into(),
            knob_texture: None,
        }
    }

    pub fn is_built_in(&self) -> bool {
        matches!(self, Self::BuiltIn { .. })
    }

    /// External texture paths in (main, knob) order, skipping empty ones
    pub fn external_paths(&self) -> Vec<&str> {
        match self {
            Self::BuiltIn { .. } => Vec::new(),
            Self::External { texture, knob_texture } => std::iter::once(texture.as_str())
                .chain(knob_texture.as_deref())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// Rewrite every external path through `f`
    pub fn map_external_paths(&mut self, mut f: impl FnMut(&str) -> String) {
        if let Self::External { texture, knob_texture } = self {
            if !texture.is_empty() {
                *texture = f(texture);
            }
            if let Some(knob) = knob_texture.as_mut().filter(|k| !k.is_empty()) {
                *knob = f(knob);
            }
        }
    }
}

impl Default for TextureSource {
    fn default() -> Self {
        Self::built_in("knob")
    }
}

/// Full configuration of one on-screen widget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ButtonConfigRepr", into = "ButtonConfigRepr")]
pub struct ButtonConfig {
    pub name: String,
    pub kind: WidgetKind,
    pub enabled: bool,
    pub default_enabled: bool,
    pub position: Vec2,
    pub default_position: Vec2,
    pub size: Vec2,
    pub default_size: Vec2,
    pub anchor: Anchor,
    pub label_anchor: Anchor,
    pub action: Action,
    pub default_action: Action,
    pub key: KeyCode,
    pub default_key: KeyCode,
    pub editable: bool,
    pub removable: bool,
    pub resizable: bool,
    pub textures: TextureSource,
    pub drawer_members: Vec<String>,
    pub label: String,
    pub is_controls_toggle: bool,
    pub joystick_sensitivity: f32,
    /// Owning layout, only used to locate external textures. Not persisted.
    pub parent_layout: String,
}

impl ButtonConfig {
    pub fn new(name: impl Into<String>, kind: WidgetKind, default_position: Vec2, default_size: Vec2) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            kind,
            enabled: true,
            default_enabled: true,
            position: default_position,
            default_position,
            size: default_size,
            default_size,
            anchor: Anchor::MiddleMiddle,
            label_anchor: Anchor::TopMiddle,
            action: Action::Unknown,
            default_action: Action::Unknown,
            key: KeyCode::None,
            default_key: KeyCode::None,
            editable: true,
            removable: true,
            resizable: true,
            textures: TextureSource::default(),
            drawer_members: Vec::new(),
            is_controls_toggle: false,
            joystick_sensitivity: DEFAULT_SENSITIVITY,
            parent_layout: String::new(),
        }
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.action = action;
        self.default_action = action;
        self
    }

    pub fn with_key(mut self, key: KeyCode) -> Self {
        self.key = key;
        self.default_key = key;
        self
    }

    pub fn with_anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn with_textures(mut self, textures: TextureSource) -> Self {
        self.textures = textures;
        self
    }

    pub fn with_members<I, S>(mut self, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.drawer_members = members.into_iter().map(Into::into).collect();
        self
    }

    pub fn disabled_by_default(mut self) -> Self {
        self.enabled = false;
        self.default_enabled = false;
        self
    }

    pub fn fixed(mut self) -> Self {
        self.editable = false;
        self.removable = false;
        self
    }

    pub fn controls_toggle(mut self) -> Self {
        self.is_controls_toggle = true;
        self
    }

    /// Position, size and visibility back to their defaults
    pub fn reset_transform(&mut self) {
        self.position = self.default_position;
        self.size = self.default_size;
        self.enabled = self.default_enabled;
    }

    /// Action and key bindings back to their defaults
    pub fn reset_action(&mut self) {
        self.action = self.default_action;
        self.key = self.default_key;
    }

    /// Add `member` to this drawer. Returns false when nothing changed.
    pub fn add_to_drawer(&mut self, member: &str) -> bool {
        if !self.kind.is_drawer() || member == self.name || self.drawer_members.iter().any(|m| m == member) {
            return false;
        }
        self.drawer_members.push(member.to_string());
        true
    }

    pub fn remove_from_drawer(&mut self, member: &str) -> bool {
        let before = self.drawer_members.len();
        self.drawer_members.retain(|m| m != member);
        self.drawer_members.len() != before
    }
}

/// On-disk shape of a button
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ButtonConfigRepr {
    name: String,
    button_type: WidgetKind,
    #[serde(default = "default_true")]
    enabled: bool,
    #[serde(default = "default_true")]
    default_enabled: bool,
    can_button_be_edited: bool,
    can_button_be_removed: bool,
    can_button_be_resized: bool,
    default_position_x: f32,
    default_position_y: f32,
    position_x: f32,
    position_y: f32,
    default_scale_x: f32,
    default_scale_y: f32,
    scale_x: f32,
    scale_y: f32,
    anchor: Anchor,
    label_anchor: Anchor,
    default_action_mapping: Action,
    default_key_code_mapping: KeyCode,
    action_mapping: Action,
    key_code_mapping: KeyCode,
    uses_built_in_textures: bool,
    #[serde(default)]
    texture_path: String,
    #[serde(default)]
    sprite_name: String,
    #[serde(default)]
    knob_texture_path: String,
    #[serde(default)]
    knob_sprite_name: String,
    #[serde(default)]
    buttons_in_drawer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label_text: Option<String>,
    #[serde(default)]
    is_controls_toggle: bool,
    #[serde(default = "default_sensitivity")]
    joystick_sensitivity: f32,
}

fn default_true() -> bool {
    true
}

fn default_sensitivity() -> f32 {
    DEFAULT_SENSITIVITY
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

fn split_members(raw: &str) -> Vec<String> {
    let mut members: Vec<String> = Vec::new();
    for member in raw.split([DRAWER_SEPARATOR, ' ']).map(str::trim).filter(|m| !m.is_empty()) {
        if !members.iter().any(|m| m == member) {
            members.push(member.to_string());
        }
    }
    members
}

impl From<ButtonConfigRepr> for ButtonConfig {
    fn from(repr: ButtonConfigRepr) -> Self {
        let textures = if repr.uses_built_in_textures {
            TextureSource::BuiltIn {
                texture: repr.texture_path,
                sprite: non_empty(repr.sprite_name),
                knob_texture: non_empty(repr.knob_texture_path),
                knob_sprite: non_empty(repr.knob_sprite_name),
            }
        } else {
            TextureSource::External {
                texture: repr.texture_path,
                knob_texture: non_empty(repr.knob_texture_path),
            }
        };

        Self {
            label: repr.label_text.unwrap_or_else(|| repr.name.clone()),
            drawer_members: split_members(&repr.buttons_in_drawer),
            name: repr.name,
            kind: repr.button_type,
            enabled: repr.enabled,
            default_enabled: repr.default_enabled,
            position: Vec2::new(repr.position_x, repr.position_y),
            default_position: Vec2::new(repr.default_position_x, repr.default_position_y),
            size: Vec2::new(repr.scale_x, repr.scale_y),
            default_size: Vec2::new(repr.default_scale_x, repr.default_scale_y),
            anchor: repr.anchor,
            label_anchor: repr.label_anchor,
            action: repr.action_mapping,
            default_action: repr.default_action_mapping,
            key: repr.key_code_mapping,
            default_key: repr.default_key_code_mapping,
            editable: repr.can_button_be_edited,
            removable: repr.can_button_be_removed,
            resizable: repr.can_button_be_resized,
            textures,
            is_controls_toggle: repr.is_controls_toggle,
            joystick_sensitivity: repr.joystick_sensitivity,
            parent_layout: String::new(),
        }
    }
}

impl From<ButtonConfig> for ButtonConfigRepr {
    fn from(config: ButtonConfig) -> Self {
        let (uses_built_in_textures, texture_path, sprite_name, knob_texture_path, knob_sprite_name) =
            match config.textures {
                TextureSource::BuiltIn { texture, sprite, knob_texture, knob_sprite } => (
                    true,
                    texture,
                    sprite.unwrap_or_default(),
                    knob_texture.unwrap_or_default(),
                    knob_sprite.unwrap_or_default(),
                ),
                TextureSource::External { texture, knob_texture } => {
                    (false, texture, String::new(), knob_texture.unwrap_or_default(), String::new())
                }
            };

        let label_text = (config.label != config.name).then_some(config.label);

        Self {
            name: config.name,
            button_type: config.kind,
            enabled: config.enabled,
            default_enabled: config.default_enabled,
            can_button_be_edited: config.editable,
            can_button_be_removed: config.removable,
            can_button_be_resized: config.resizable,
            default_position_x: config.default_position.x,
            default_position_y: config.default_position.y,
            position_x: config.position.x,
            position_y: config.position.y,
            default_scale_x: config.default_size.x,
            default_scale_y: config.default_size.y,
            scale_x: config.size.x,
            scale_y: config.size.y,
            anchor: config.anchor,
            label_anchor: config.label_anchor,
            default_action_mapping: config.default_action,
            default_key_code_mapping: config.default_key,
            action_mapping: config.action,
            key_code_mapping: config.key,
            uses_built_in_textures,
            texture_path,
            sprite_name,
            knob_texture_path,
            knob_sprite_name,
            buttons_in_drawer: config.drawer_members.join(","),
            label_text,
            is_controls_toggle: config.is_controls_toggle,
            joystick_sensitivity: config.joystick_sensitivity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drawer() -> ButtonConfig {
        ButtonConfig::new("Menu", WidgetKind::Drawer, Vec2::ZERO, Vec2::splat(100.0))
    }

    #[test]
    fn test_reads_original_field_layout() {
        let json = r#"{
            "name": "Jump",
            "buttonType": "Button",
            "canButtonBeEdited": true,
            "canButtonBeRemoved": false,
            "canButtonBeResized": true,
            "defaultPositionX": -120.0,
            "defaultPositionY": 80.0,
            "positionX": -100.0,
            "positionY": 80.0,
            "defaultScaleX": 90.0,
            "defaultScaleY": 90.0,
            "scaleX": 110.0,
            "scaleY": 110.0,
            "anchor": "BottomRight",
            "labelAnchor": "TopMiddle",
            "defaultActionMapping": "Jump",
            "defaultKeyCodeMapping": "None",
            "actionMapping": "Jump",
            "keyCodeMapping": "Space",
            "usesBuiltInTextures": true,
            "texturePath": "UI/buttons",
            "spriteName": "jump",
            "knobTexturePath": "",
            "knobSpriteName": "",
            "buttonsInDrawer": ""
        }"#;

        let button: ButtonConfig = serde_json::from_str(json).unwrap();
        assert_eq!(button.name, "Jump");
        assert_eq!(button.anchor, Anchor::BottomRight);
        assert_eq!(button.key, KeyCode::Space);
        assert_eq!(button.position, Vec2::new(-100.0, 80.0));
        assert_eq!(button.default_size, Vec2::splat(90.0));
        assert!(!button.removable);
        assert!(button.enabled, "missing enabled flag defaults to true");
        assert_eq!(button.label, "Jump");
        assert_eq!(
            button.textures,
            TextureSource::BuiltIn {
                texture: "UI/buttons".to_string(),
                sprite: Some("jump".to_string()),
                knob_texture: None,
                knob_sprite: None,
            }
        );
    }

    #[test]
    fn test_unknown_action_name_fails_to_parse() {
        let mut value = serde_json::to_value(ButtonConfig::new("A", WidgetKind::Button, Vec2::ZERO, Vec2::ONE)).unwrap();
        value["actionMapping"] = serde_json::Value::String("Teleport".to_string());
        let err = serde_json::from_value::<ButtonConfig>(value).unwrap_err();
        assert!(err.to_string().contains("Teleport"));
    }

    #[test]
    fn test_external_textures_round_trip() {
        let button = ButtonConfig::new("Stick", WidgetKind::Joystick, Vec2::ZERO, Vec2::splat(200.0)).with_textures(
            TextureSource::External {
                texture: "ring.png".to_string(),
                knob_texture: Some("nub.png".to_string()),
            },
        );
        let json = serde_json::to_value(&button).unwrap();
        assert_eq!(json["usesBuiltInTextures"], false);
        assert_eq!(json["knobTexturePath"], "nub.png");

        let back: ButtonConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, button);
    }

    #[test]
    fn test_drawer_members_serialize_comma_separated() {
        let menu = drawer().with_members(["Inventory", "AutoMap"]);
        let json = serde_json::to_value(&menu).unwrap();
        assert_eq!(json["buttonsInDrawer"], "Inventory,AutoMap");

        assert_eq!(split_members("Inventory, AutoMap,,Inventory"), vec!["Inventory", "AutoMap"]);
    }

    #[test]
    fn test_add_to_drawer_rejects_self_and_duplicates() {
        let mut menu = drawer();
        assert!(menu.add_to_drawer("Inventory"));
        assert!(!menu.add_to_drawer("Inventory"));
        assert!(!menu.add_to_drawer("Menu"));
        assert_eq!(menu.drawer_members, vec!["Inventory"]);

        assert!(menu.remove_from_drawer("Inventory"));
        assert!(!menu.remove_from_drawer("Inventory"));
    }

    #[test]
    fn test_only_drawers_accept_members() {
        let mut button = ButtonConfig::new("Jump", WidgetKind::Button, Vec2::ZERO, Vec2::ONE);
        assert!(!button.add_to_drawer("Inventory"));
    }

    #[test]
    fn test_resets_restore_defaults() {
        let mut button = ButtonConfig::new("Jump", WidgetKind::Button, Vec2::new(10.0, 20.0), Vec2::splat(50.0))
            .with_action(Action::Jump);
        button.position = Vec2::new(300.0, 300.0);
        button.size = Vec2::splat(80.0);
        button.enabled = false;
        button.action = Action::Crouch;
        button.key = KeyCode::C;

        button.reset_transform();
        assert_eq!(button.position, Vec2::new(10.0, 20.0));
        assert_eq!(button.size, Vec2::splat(50.0));
        assert!(button.enabled);
        assert_eq!(button.action, Action::Crouch, "transform reset leaves bindings alone");

        button.reset_action();
        assert_eq!(button.action, Action::Jump);
        assert_eq!(button.key, KeyCode::None);
    }
}
