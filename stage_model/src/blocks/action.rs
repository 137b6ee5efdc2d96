//! Action block variants: the primitive operations a chain performs.

use serde::{Deserialize, Serialize};

use super::args::{self, normalize_kind, RawArgs};
use crate::entities::EntityId;
use crate::error::GraphError;

/// A primitive action with its typed arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionKind {
    MoveBy { dx: f64, dy: f64 },
    SetColor { color: String },
    Say { text: String, seconds: f64 },
    SetVar { name: String, value: f64 },
    ChangeVar { name: String, delta: f64 },
    SetGlobalVar { name: String, value: f64 },
    ChangeGlobalVar { name: String, delta: f64 },
    /// Suspends the chain; the rest resumes after `seconds`.
    Wait { seconds: f64 },
    RotateBy { degrees: f64 },
    RotateTo { degrees: f64 },
    ScaleBy { factor: f64 },
    SetSize { width: f64, height: f64 },
    ChangeOpacity { delta: f64 },
    /// Clone `template` (or the acting entity when unresolved) onto the stage.
    SpawnEntity { template: Option<EntityId> },
    /// Remove `target` (or the acting entity when unresolved) from the stage.
    DeleteEntity { target: Option<EntityId> },
}

impl ActionKind {
    /// Build an action from the editor's kind name and loose arguments.
    pub fn from_raw(kind: &str, args: &RawArgs) -> Result<Self, GraphError> {
        Self::parse(kind, args).ok_or_else(|| GraphError::UnknownKind {
            category: "action",
            kind: kind.to_string(),
        })
    }

    pub(crate) fn parse(kind: &str, a: &RawArgs) -> Option<Self> {
        let action = match normalize_kind(kind).as_str() {
            "moveby" | "move" => ActionKind::MoveBy {
                dx: args::number(a, "dx", 10.0),
                dy: args::number(a, "dy", 0.0),
            },
            "setcolor" | "color" => ActionKind::SetColor {
                color: args::text(a, "color", "#000000"),
            },
            "say" => ActionKind::Say {
                text: args::text(a, "text", "Hello!"),
                seconds: args::non_negative(a, "seconds", 2.0),
            },
            "setvar" => ActionKind::SetVar {
                name: args::text(a, "name", ""),
                value: args::number(a, "value", 0.0),
            },
            "changevar" => ActionKind::ChangeVar {
                name: args::text(a, "name", ""),
                delta: args::number(a, "delta", 1.0),
            },
            "setglobalvar" => ActionKind::SetGlobalVar {
                name: args::text(a, "name", ""),
                value: args::number(a, "value", 0.0),
            },
            "changeglobalvar" => ActionKind::ChangeGlobalVar {
                name: args::text(a, "name", ""),
                delta: args::number(a, "delta", 1.0),
            },
            "wait" => ActionKind::Wait {
                seconds: args::non_negative(a, "seconds", 1.0),
            },
            "rotateby" | "rotate" => ActionKind::RotateBy {
                degrees: args::number(a, "degrees", 15.0),
            },
            "rotateto" => ActionKind::RotateTo {
                degrees: args::number(a, "degrees", 0.0),
            },
            "scaleby" | "scale" => ActionKind::ScaleBy {
                factor: args::number(a, "factor", 1.0),
            },
            "setsize" => ActionKind::SetSize {
                width: args::non_negative(a, "width", 50.0),
                height: args::non_negative(a, "height", 50.0),
            },
            "changeopacity" | "opacity" => ActionKind::ChangeOpacity {
                delta: args::number(a, "delta", -0.1),
            },
            "spawnentity" | "spawn" => ActionKind::SpawnEntity {
                template: args::entity_id(a, "template"),
            },
            "deleteentity" | "delete" => ActionKind::DeleteEntity {
                target: args::entity_id(a, "target"),
            },
            _ => return None,
        };
        Some(action)
    }
}
