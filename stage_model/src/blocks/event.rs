//! Event block variants: the triggers at the root of every script.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::args::{self, normalize_kind, RawArgs};
use crate::entities::EntityId;
use crate::error::GraphError;

/// Default tick interval in milliseconds.
pub const DEFAULT_TICK_INTERVAL_MS: f64 = 1000.0;

/// Mouse buttons a click can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MouseButton {
    #[default]
    Left,
    Middle,
    Right,
}

impl MouseButton {
    /// Accepts DOM-style button indices (0, 1, 2) or names.
    pub fn from_raw(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => match normalize_kind(s).as_str() {
                "left" | "0" => Some(MouseButton::Left),
                "middle" | "1" => Some(MouseButton::Middle),
                "right" | "2" => Some(MouseButton::Right),
                _ => None,
            },
            Value::Number(n) => match n.as_u64()? {
                0 => Some(MouseButton::Left),
                1 => Some(MouseButton::Middle),
                2 => Some(MouseButton::Right),
                _ => None,
            },
            _ => None,
        }
    }
}

/// What makes a script root fire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    /// Once, when play begins.
    Start,
    /// Every `interval_ms`, at most once per tick.
    Tick { interval_ms: f64 },
    /// Every tick while `key` is held.
    KeyDown { key: String },
    /// On a press of `button` inside the entity's hit area.
    Mouse { button: MouseButton },
    /// Every tick the entity touches a stage edge.
    EdgeTouch,
    /// When an entity variable becomes equal to `target`.
    VarChange { name: String, target: f64 },
    /// When a global variable becomes equal to `target`.
    GlobalVarChange { name: String, target: f64 },
    /// Every tick the entity overlaps another one (or `target`, if set).
    Collide { target: Option<EntityId> },
}

impl EventKind {
    /// Build an event from the editor's kind name and loose arguments.
    pub fn from_raw(kind: &str, args: &RawArgs) -> Result<Self, GraphError> {
        Self::parse(kind, args).ok_or_else(|| GraphError::UnknownKind {
            category: "event",
            kind: kind.to_string(),
        })
    }

    pub(crate) fn parse(kind: &str, a: &RawArgs) -> Option<Self> {
        let event = match normalize_kind(kind).as_str() {
            "start" => EventKind::Start,
            "tick" | "timer" => {
                let interval = args::number(a, "interval", DEFAULT_TICK_INTERVAL_MS);
                EventKind::Tick {
                    interval_ms: if interval > 0.0 {
                        interval
                    } else {
                        DEFAULT_TICK_INTERVAL_MS
                    },
                }
            }
            "keydown" | "key" => EventKind::KeyDown {
                key: args::text(a, "key", " "),
            },
            "mouse" | "click" => EventKind::Mouse {
                button: a
                    .get("button")
                    .and_then(MouseButton::from_raw)
                    .unwrap_or_default(),
            },
            "edgetouch" | "edge" => EventKind::EdgeTouch,
            "varchange" => EventKind::VarChange {
                name: args::text(a, "name", ""),
                target: args::number(a, "target", 0.0),
            },
            "globalvarchange" => EventKind::GlobalVarChange {
                name: args::text(a, "name", ""),
                target: args::number(a, "target", 0.0),
            },
            "collide" | "collision" => EventKind::Collide {
                target: args::entity_id(a, "target"),
            },
            _ => return None,
        };
        Some(event)
    }
}
