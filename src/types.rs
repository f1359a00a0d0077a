//! String-named enums shared by the layout model
//!
//! Every enum here is persisted as its variant name. Parsing an unknown name is
//! an error, never a silent fallback.

use glam::Vec2;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownName {
    pub kind: &'static str,
    pub value: String,
}

/// Declares a fieldless enum together with its name table, `FromStr`,
/// `Display` and string-based serde impls.
macro_rules! string_enum {
    ($(#[$meta:meta])* $vis:vis enum $name:ident { $($variant:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => stringify!($variant)),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.pad(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = UnknownName;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $(
                    if s == stringify!($variant) {
                        return Ok($name::$variant);
                    }
                )+
                Err(UnknownName {
                    kind: stringify!($name),
                    value: s.to_string(),
                })
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = <String as serde::Deserialize>::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

string_enum! {
    /// What kind of on-screen widget a button config describes
    pub enum WidgetKind {
        Button,
        Drawer,
        Joystick,
        DPad,
        CameraJoystick,
        CameraDPad,
    }
}

impl WidgetKind {
    pub fn is_drawer(self) -> bool {
        self == WidgetKind::Drawer
    }

    /// Kinds that produce axis input and honor `joystick_sensitivity`
    pub fn is_stick(self) -> bool {
        matches!(
            self,
            WidgetKind::Joystick | WidgetKind::DPad | WidgetKind::CameraJoystick | WidgetKind::CameraDPad
        )
    }

    /// D-pads snap to 8 discrete directions, joysticks only bias toward them
    pub fn is_dpad(self) -> bool {
        matches!(self, WidgetKind::DPad | WidgetKind::CameraDPad)
    }

    /// Movement sticks are the left stick, camera sticks the right one
    pub fn stick_side(self) -> Option<StickSide> {
        match self {
            WidgetKind::Joystick | WidgetKind::DPad => Some(StickSide::Left),
            WidgetKind::CameraJoystick | WidgetKind::CameraDPad => Some(StickSide::Right),
            WidgetKind::Button | WidgetKind::Drawer => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StickSide {
    Left,
    Right,
}

string_enum! {
    /// Screen-relative anchor point for a widget or its label
    pub enum Anchor {
        TopLeft,
        TopMiddle,
        TopRight,
        MiddleLeft,
        MiddleMiddle,
        MiddleRight,
        BottomLeft,
        BottomMiddle,
        BottomRight,
    }
}

impl Anchor {
    /// Anchor as a fraction of the viewport, origin bottom-left, y up
    pub fn fraction(self) -> Vec2 {
        match self {
            Anchor::TopLeft => Vec2::new(0.0, 1.0),
            Anchor::TopMiddle => Vec2::new(0.5, 1.0),
            Anchor::TopRight => Vec2::new(1.0, 1.0),
            Anchor::MiddleLeft => Vec2::new(0.0, 0.5),
            Anchor::MiddleMiddle => Vec2::new(0.5, 0.5),
            Anchor::MiddleRight => Vec2::new(1.0, 0.5),
            Anchor::BottomLeft => Vec2::new(0.0, 0.0),
            Anchor::BottomMiddle => Vec2::new(0.5, 0.0),
            Anchor::BottomRight => Vec2::new(1.0, 0.0),
        }
    }
}

string_enum! {
    /// Logical game actions a widget can trigger. `Unknown` means unbound.
    pub enum Action {
        Unknown,
        Escape,
        ToggleConsole,
        MoveForwards,
        MoveBackwards,
        MoveLeft,
        MoveRight,
        TurnLeft,
        TurnRight,
        FloatUp,
        FloatDown,
        Jump,
        Crouch,
        Slide,
        Run,
        AutoRun,
        Rest,
        Transport,
        StealMode,
        GreetMode,
        HaggleMode,
        CastSpell,
        RecastSpell,
        AbortSpell,
        UseMagicItem,
        ReadyWeapon,
        SwingWeapon,
        SwitchHand,
        Status,
        CharacterSheet,
        Inventory,
        ActivateCenterObject,
        ActivateCursor,
        LookUp,
        LookDown,
        CenterView,
        Sneak,
        LogBook,
        NoteBook,
        AutoMap,
        TravelMap,
        QuickSave,
        QuickLoad,
        PrintScreen,
        Custom1,
        Custom2,
        Custom3,
        Custom4,
        Custom5,
        Custom6,
        Custom7,
        Custom8,
        Custom9,
        Custom10,
    }
}

impl Action {
    pub fn is_bound(self) -> bool {
        self != Action::Unknown
    }
}

string_enum! {
    /// Raw platform keys a widget can press directly. `None` means unbound.
    pub enum KeyCode {
        None,
        Backspace,
        Tab,
        Return,
        Escape,
        Space,
        Alpha0,
        Alpha1,
        Alpha2,
        Alpha3,
        Alpha4,
        Alpha5,
        Alpha6,
        Alpha7,
        Alpha8,
        Alpha9,
        A,
        B,
        C,
        D,
        E,
        F,
        G,
        H,
        I,
        J,
        K,
        L,
        M,
        N,
        O,
        P,
        Q,
        R,
        S,
        T,
        U,
        V,
        W,
        X,
        Y,
        Z,
        UpArrow,
        DownArrow,
        LeftArrow,
        RightArrow,
        Insert,
        Delete,
        Home,
        End,
        PageUp,
        PageDown,
        F1,
        F2,
        F3,
        F4,
        F5,
        F6,
        F7,
        F8,
        F9,
        F10,
        F11,
        F12,
        Keypad0,
        Keypad1,
        Keypad2,
        Keypad3,
        Keypad4,
        Keypad5,
        Keypad6,
        Keypad7,
        Keypad8,
        Keypad9,
        KeypadEnter,
        LeftShift,
        RightShift,
        LeftControl,
        RightControl,
        LeftAlt,
        RightAlt,
        CapsLock,
        BackQuote,
        Minus,
        Equals,
        LeftBracket,
        RightBracket,
        Semicolon,
        Quote,
        Comma,
        Period,
        Slash,
        Backslash,
        Mouse0,
        Mouse1,
        Mouse2,
        Mouse3,
        Mouse4,
        Mouse5,
        Mouse6,
    }
}

impl KeyCode {
    pub fn is_bound(self) -> bool {
        self != KeyCode::None
    }
}
