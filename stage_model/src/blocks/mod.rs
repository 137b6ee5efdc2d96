//! Block definitions - the nodes of a script graph.
//!
//! A script is a small graph per entity:
//! - **Event** blocks are roots; they fan out into one or more chains
//! - **Action** blocks perform one primitive operation
//! - **IfElse** / **While** blocks branch or loop on an entity variable

mod action;
pub mod args;
mod event;
mod graph;

pub use action::*;
pub use event::*;
pub use graph::*;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{Point, VariableMap};
use crate::error::GraphError;
use args::{normalize_kind, RawArgs};

/// Unique identifier for blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockId(pub Uuid);

impl BlockId {
    /// Create a new random block ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BlockId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `variable > threshold`, evaluated against the acting entity's variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub variable: String,
    pub threshold: f64,
}

impl Condition {
    pub fn new(variable: impl Into<String>, threshold: f64) -> Self {
        Self {
            variable: variable.into(),
            threshold,
        }
    }

    pub fn holds(&self, variables: &VariableMap) -> bool {
        variables.get(&self.variable) > self.threshold
    }

    fn from_raw(a: &RawArgs) -> Self {
        Self {
            variable: args::text(a, "name", ""),
            threshold: args::number(a, "threshold", 0.0),
        }
    }
}

/// A block placed on an entity's script canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    /// Canvas position, kept so clones lay out identically in the editor.
    pub position: Point,
    pub kind: BlockKind,
}

/// The closed set of block shapes, each with its own outgoing links.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BlockKind {
    Event {
        event: EventKind,
        next: Option<BlockId>,
        /// Additional chains fired together with `next`, in order.
        extra_next: Vec<BlockId>,
    },
    Action {
        action: ActionKind,
        next: Option<BlockId>,
    },
    IfElse {
        condition: Condition,
        then_branch: Option<BlockId>,
        else_branch: Option<BlockId>,
        next: Option<BlockId>,
    },
    While {
        condition: Condition,
        body: Option<BlockId>,
        next: Option<BlockId>,
    },
}

impl BlockKind {
    pub fn event(event: EventKind) -> Self {
        BlockKind::Event {
            event,
            next: None,
            extra_next: Vec::new(),
        }
    }

    pub fn action(action: ActionKind) -> Self {
        BlockKind::Action { action, next: None }
    }

    pub fn if_else(condition: Condition) -> Self {
        BlockKind::IfElse {
            condition,
            then_branch: None,
            else_branch: None,
            next: None,
        }
    }

    pub fn while_loop(condition: Condition) -> Self {
        BlockKind::While {
            condition,
            body: None,
            next: None,
        }
    }

    /// Build any block from the editor's kind name and loose arguments.
    pub fn from_raw(kind: &str, a: &RawArgs) -> Result<Self, GraphError> {
        if let Some(event) = EventKind::parse(kind, a) {
            return Ok(Self::event(event));
        }
        match normalize_kind(kind).as_str() {
            "ifelse" | "if" => return Ok(Self::if_else(Condition::from_raw(a))),
            "while" | "repeatwhile" => return Ok(Self::while_loop(Condition::from_raw(a))),
            _ => {}
        }
        ActionKind::parse(kind, a)
            .map(Self::action)
            .ok_or_else(|| GraphError::UnknownKind {
                category: "block",
                kind: kind.to_string(),
            })
    }

    pub fn is_event(&self) -> bool {
        matches!(self, BlockKind::Event { .. })
    }

    pub fn next(&self) -> Option<BlockId> {
        match self {
            BlockKind::Event { next, .. }
            | BlockKind::Action { next, .. }
            | BlockKind::IfElse { next, .. }
            | BlockKind::While { next, .. } => *next,
        }
    }

    /// Every outgoing link, for graph-wide rewrites.
    fn links_mut(&mut self) -> Vec<&mut BlockId> {
        match self {
            BlockKind::Event {
                next, extra_next, ..
            } => next.iter_mut().chain(extra_next.iter_mut()).collect(),
            BlockKind::Action { next, .. } => next.iter_mut().collect(),
            BlockKind::IfElse {
                then_branch,
                else_branch,
                next,
                ..
            } => then_branch
                .iter_mut()
                .chain(else_branch.iter_mut())
                .chain(next.iter_mut())
                .collect(),
            BlockKind::While { body, next, .. } => body.iter_mut().chain(next.iter_mut()).collect(),
        }
    }
}
