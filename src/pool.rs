//! Recycled runtime widgets
//!
//! The host draws one widget per enabled button. Switching layouts rebinds the
//! existing widgets instead of tearing them down, so the pool only grows to the
//! largest layout seen.

use std::collections::VecDeque;

use glam::Vec2;
use tracing::{debug, warn};

use crate::bindings::{effective_key, ActionBindings};
use crate::config::button::ButtonConfig;
use crate::config::layout::LayoutConfig;
use crate::textures::{ResolvedTextures, TextureResolver};
use crate::types::{Action, Anchor, KeyCode, WidgetKind};

/// Handle to a pool slot. Stays valid until the slot is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WidgetId(usize);

impl WidgetId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Runtime state of a widget bound to a `ButtonConfig`
#[derive(Debug, Clone, PartialEq)]
pub struct Widget {
    pub name: String,
    pub kind: WidgetKind,
    pub enabled: bool,
    pub anchor: Anchor,
    pub position: Vec2,
    pub size: Vec2,
    pub label: String,
    pub label_anchor: Anchor,
    pub action: Action,
    pub key: KeyCode,
    /// Key actually sent when pressed
    pub resolved_key: Option<KeyCode>,
    pub textures: ResolvedTextures,
    pub joystick_sensitivity: f32,
    pub is_controls_toggle: bool,
    /// Drawer this widget is listed in
    pub drawer: Option<WidgetId>,
    /// Widgets listed in this drawer
    pub members: Vec<WidgetId>,
}

impl Widget {
    fn bind(config: &ButtonConfig, bindings: &dyn ActionBindings, textures: &TextureResolver) -> Self {
        Self {
            name: config.name.clone(),
            kind: config.kind,
            enabled: config.enabled,
            anchor: config.anchor,
            position: config.position,
            size: config.size,
            label: config.label.clone(),
            label_anchor: config.label_anchor,
            action: config.action,
            key: config.key,
            resolved_key: effective_key(config.action, config.key, bindings),
            textures: textures.resolve(config),
            joystick_sensitivity: config.joystick_sensitivity,
            is_controls_toggle: config.is_controls_toggle,
            drawer: None,
            members: Vec::new(),
        }
    }

    /// Overwrite the bound state from `config` in place. Drawer links are left alone.
    fn assign(&mut self, config: &ButtonConfig, bindings: &dyn ActionBindings, textures: &TextureResolver) {
        self.name.clone_from(&config.name);
        self.kind = config.kind;
        self.enabled = config.enabled;
        self.anchor = config.anchor;
        self.position = config.position;
        self.size = config.size;
        self.label.clone_from(&config.label);
        self.label_anchor = config.label_anchor;
        self.action = config.action;
        self.key = config.key;
        self.resolved_key = effective_key(config.action, config.key, bindings);
        self.textures = textures.resolve(config);
        self.joystick_sensitivity = config.joystick_sensitivity;
        self.is_controls_toggle = config.is_controls_toggle;
    }

    fn unbind(&mut self) {
        self.textures = ResolvedTextures::default();
        self.resolved_key = None;
        self.drawer = None;
        self.members.clear();
    }
}

#[derive(Debug)]
struct Slot {
    widget: Widget,
    bound: bool,
}

#[derive(Debug, Default)]
pub struct WidgetPool {
    slots: Vec<Slot>,
    idle: VecDeque<WidgetId>,
}

impl WidgetPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `config` to the oldest idle widget, or allocate a new one
    pub fn acquire(&mut self, config: &ButtonConfig, bindings: &dyn ActionBindings, textures: &TextureResolver) -> WidgetId {
        while let Some(id) = self.idle.pop_front() {
            match self.slots.get_mut(id.0) {
                Some(slot) if !slot.bound => {
                    slot.widget.unbind();
                    slot.widget.assign(config, bindings, textures);
                    slot.bound = true;
                    return id;
                }
                _ => warn!(slot = id.0, "Idle queue held a slot that is in use, dropping it"),
            }
        }

        self.slots.push(Slot {
            widget: Widget::bind(config, bindings, textures),
            bound: true,
        });
        let id = WidgetId(self.slots.len() - 1);
        debug!(slot = id.0, widget = %config.name, "Allocated widget");
        id
    }

    /// Re-read `config` into an already bound widget, keeping its drawer links
    pub fn rebind(&mut self, id: WidgetId, config: &ButtonConfig, bindings: &dyn ActionBindings, textures: &TextureResolver) -> bool {
        let Some(widget) = self.get_mut(id) else {
            return false;
        };
        widget.assign(config, bindings, textures);
        true
    }

    /// Unbind a widget and drop its sprites; the instance stays in the pool.
    /// Returns false if it was not bound.
    pub fn release(&mut self, id: WidgetId) -> bool {
        match self.slots.get_mut(id.0) {
            Some(slot) if slot.bound => {
                slot.widget.unbind();
                slot.bound = false;
                self.idle.push_back(id);
                true
            }
            _ => false,
        }
    }

    pub fn release_all(&mut self) {
        for index in 0..self.slots.len() {
            self.release(WidgetId(index));
        }
    }

    /// Rebind the pool to every button in `layout`, then link drawers to their members
    pub fn load_layout(&mut self, layout: &LayoutConfig, bindings: &dyn ActionBindings, textures: &TextureResolver) -> Vec<WidgetId> {
        self.release_all();
        let ids: Vec<WidgetId> = layout
            .buttons
            .iter()
            .map(|button| self.acquire(button, bindings, textures))
            .collect();
        self.link_drawers(layout, &ids);

        debug!(layout = %layout.name, widgets = ids.len(), allocated = self.allocated(), "Bound layout to widget pool");
        ids
    }

    fn link_drawers(&mut self, layout: &LayoutConfig, ids: &[WidgetId]) {
        for (button, &drawer_id) in layout.buttons.iter().zip(ids) {
            if !button.kind.is_drawer() {
                continue;
            }
            let mut members = self
                .get_mut(drawer_id)
                .map(|drawer| std::mem::take(&mut drawer.members))
                .unwrap_or_default();
            members.clear();
            for member in &button.drawer_members {
                let Some(member_id) = self.find(member) else {
                    warn!(layout = %layout.name, drawer = %button.name, member = %member, "Drawer member has no widget");
                    continue;
                };
                if let Some(widget) = self.get_mut(member_id) {
                    widget.drawer = Some(drawer_id);
                }
                members.push(member_id);
            }
            if let Some(drawer) = self.get_mut(drawer_id) {
                drawer.members = members;
            }
        }
    }

    pub fn get(&self, id: WidgetId) -> Option<&Widget> {
        self.slots.get(id.0).filter(|slot| slot.bound).map(|slot| &slot.widget)
    }

    pub fn get_mut(&mut self, id: WidgetId) -> Option<&mut Widget> {
        self.slots
            .get_mut(id.0)
            .filter(|slot| slot.bound)
            .map(|slot| &mut slot.widget)
    }

    /// Bound widget with this name
    pub fn find(&self, name: &str) -> Option<WidgetId> {
        self.active().find(|(_, w)| w.name == name).map(|(id, _)| id)
    }

    /// Bound widgets in slot order
    pub fn active(&self) -> impl Iterator<Item = (WidgetId, &Widget)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.bound)
            .map(|(i, slot)| (WidgetId(i), &slot.widget))
    }

    /// Widgets ever allocated, bound or idle
    pub fn allocated(&self) -> usize {
        self.slots.len()
    }

    pub fn idle_count(&self) -> usize {
        self.idle.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::StaticBindings;
    use crate::config::button::TextureSource;
    use crate::textures::{MemoryAtlas, Sprite};

    fn resolver() -> TextureResolver {
        let mut atlas = MemoryAtlas::new();
        atlas.insert("knob", None, Sprite { width: 1, height: 1, rgba: vec![0; 4] });
        TextureResolver::new("/nonexistent", atlas)
    }

    fn button(name: &str) -> ButtonConfig {
        ButtonConfig::new(name, WidgetKind::Button, Vec2::ZERO, Vec2::splat(80.0))
    }

    #[test]
    fn test_acquire_binds_config() {
        let mut pool = WidgetPool::new();
        let bindings: StaticBindings = [(Action::Jump, KeyCode::Space)].into_iter().collect();
        let config = button("Jump").with_action(Action::Jump);

        let id = pool.acquire(&config, &bindings, &resolver());
        let widget = pool.get(id).unwrap();
        assert_eq!(widget.name, "Jump");
        assert_eq!(widget.resolved_key, Some(KeyCode::Space));
        assert!(widget.textures.main.is_some());
    }

    #[test]
    fn test_release_reuses_oldest_idle_first() {
        let mut pool = WidgetPool::new();
        let (bindings, textures) = (StaticBindings::new(), resolver());
        let a = pool.acquire(&button("A"), &bindings, &textures);
        let b = pool.acquire(&button("B"), &bindings, &textures);

        assert!(pool.release(b));
        assert!(pool.release(a));
        assert!(!pool.release(a));
        assert_eq!(pool.idle_count(), 2);
        assert!(pool.get(a).is_none());

        assert_eq!(pool.acquire(&button("C"), &bindings, &textures), b);
        assert_eq!(pool.acquire(&button("D"), &bindings, &textures), a);
        assert_eq!(pool.allocated(), 2);
    }

    #[test]
    fn test_reload_does_not_allocate() {
        let mut pool = WidgetPool::new();
        let (bindings, textures) = (StaticBindings::new(), resolver());
        let layout = LayoutConfig::default_template();

        pool.load_layout(&layout, &bindings, &textures);
        let allocated = pool.allocated();
        assert_eq!(allocated, layout.buttons.len());

        pool.release_all();
        assert_eq!(pool.idle_count(), allocated);
        assert_eq!(pool.active().count(), 0);

        pool.load_layout(&layout, &bindings, &textures);
        assert_eq!(pool.allocated(), allocated);
        assert_eq!(pool.idle_count(), 0);
    }

    #[test]
    fn test_released_instance_is_reused_in_place() {
        let mut pool = WidgetPool::new();
        let (bindings, textures) = (StaticBindings::new(), resolver());
        let drawer = ButtonConfig::new("InventoryDrawer", WidgetKind::Drawer, Vec2::ZERO, Vec2::splat(80.0))
            .with_members(["A", "B"])
            .with_textures(TextureSource::built_in("knob"));
        let layout = LayoutConfig {
            buttons: vec![drawer, button("A"), button("B")],
            ..LayoutConfig::new("reuse")
        };
        let ids = pool.load_layout(&layout, &bindings, &textures);
        let first = ids[0];
        let name_buffer = pool.get(first).unwrap().name.as_ptr();

        assert!(pool.release(first));
        let idle = &pool.slots[first.index()].widget;
        assert!(idle.textures.main.is_none());
        assert!(idle.members.is_empty());
        assert!(idle.members.capacity() >= 2);
        assert_eq!(idle.name, "InventoryDrawer");

        let id = pool.acquire(&button("Jump").with_action(Action::Jump), &bindings, &textures);
        assert_eq!(id, first);
        let widget = pool.get(id).unwrap();
        assert_eq!(widget.name, "Jump");
        assert_eq!(widget.name.as_ptr(), name_buffer);
        assert_eq!(widget.kind, WidgetKind::Button);
        assert_eq!(widget.action, Action::Jump);
        assert!(widget.members.is_empty());
        assert_eq!(widget.drawer, None);
    }

    #[test]
    fn test_drawer_links_do_not_depend_on_order() {
        let mut pool = WidgetPool::new();
        let (bindings, textures) = (StaticBindings::new(), resolver());
        let drawer = ButtonConfig::new("Menu", WidgetKind::Drawer, Vec2::ZERO, Vec2::splat(80.0)).with_members(["B", "A"]);
        let layout = LayoutConfig {
            buttons: vec![drawer, button("A"), button("B")],
            ..LayoutConfig::new("order")
        };

        pool.load_layout(&layout, &bindings, &textures);
        let menu = pool.find("Menu").unwrap();
        let (a, b) = (pool.find("A").unwrap(), pool.find("B").unwrap());
        assert_eq!(pool.get(menu).unwrap().members, vec![b, a]);
        assert_eq!(pool.get(a).unwrap().drawer, Some(menu));
    }

    #[test]
    fn test_rebind_keeps_drawer_links() {
        let mut pool = WidgetPool::new();
        let (bindings, textures) = (StaticBindings::new(), resolver());
        let drawer = ButtonConfig::new("Menu", WidgetKind::Drawer, Vec2::ZERO, Vec2::splat(80.0)).with_members(["A"]);
        let layout = LayoutConfig {
            buttons: vec![button("A"), drawer],
            ..LayoutConfig::new("rebind")
        };
        pool.load_layout(&layout, &bindings, &textures);
        let a = pool.find("A").unwrap();

        let mut moved = button("A");
        moved.position = Vec2::new(40.0, 20.0);
        assert!(pool.rebind(a, &moved, &bindings, &textures));

        let widget = pool.get(a).unwrap();
        assert_eq!(widget.position, Vec2::new(40.0, 20.0));
        assert_eq!(widget.drawer, pool.find("Menu"));
    }
}
