//! Script graphs - the block arena owned by one entity.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{Block, BlockId, BlockKind, EventKind};
use crate::entities::{EntityId, Point};
use crate::error::GraphError;

/// Outgoing link slots a block may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    Next,
    /// Appends another independent chain to an event.
    ExtraNext,
    Then,
    Else,
    Body,
}

impl Link {
    fn name(self) -> &'static str {
        match self {
            Link::Next => "next",
            Link::ExtraNext => "extra_next",
            Link::Then => "then",
            Link::Else => "else",
            Link::Body => "body",
        }
    }
}

/// All blocks of one entity's script.
///
/// Event blocks are always roots and nothing links to them; this is checked
/// whenever blocks are linked, so the interpreter never has to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScriptGraph {
    blocks: IndexMap<BlockId, Block>,
    /// Root events in declaration order.
    roots: Vec<BlockId>,
}

impl ScriptGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a block. Event blocks become roots.
    pub fn add(&mut self, kind: BlockKind, position: Point) -> BlockId {
        let id = BlockId::new();
        if kind.is_event() {
            self.roots.push(id);
        }
        self.blocks.insert(id, Block { id, position, kind });
        id
    }

    pub fn add_event(&mut self, event: EventKind) -> BlockId {
        self.add(BlockKind::event(event), Point::default())
    }

    /// Add a non-event block; events must go through [`ScriptGraph::add_event`].
    pub fn add_block(&mut self, kind: BlockKind) -> Result<BlockId, GraphError> {
        if kind.is_event() {
            return Err(GraphError::EventAsBlock);
        }
        Ok(self.add(kind, Point::default()))
    }

    /// Point `from`'s `link` slot at `to`.
    pub fn link(&mut self, from: BlockId, link: Link, to: BlockId) -> Result<(), GraphError> {
        match self.blocks.get(&to) {
            None => return Err(GraphError::MissingBlock(to)),
            Some(target) if target.kind.is_event() => return Err(GraphError::EventNotRoot(to)),
            Some(_) => {}
        }
        let block = self
            .blocks
            .get_mut(&from)
            .ok_or(GraphError::MissingBlock(from))?;

        let slot = match (&mut block.kind, link) {
            (BlockKind::Event { extra_next, .. }, Link::ExtraNext) => {
                extra_next.push(to);
                return Ok(());
            }
            (BlockKind::Event { next, .. }, Link::Next)
            | (BlockKind::Action { next, .. }, Link::Next)
            | (BlockKind::IfElse { next, .. }, Link::Next)
            | (BlockKind::While { next, .. }, Link::Next) => next,
            (BlockKind::IfElse { then_branch, .. }, Link::Then) => then_branch,
            (BlockKind::IfElse { else_branch, .. }, Link::Else) => else_branch,
            (BlockKind::While { body, .. }, Link::Body) => body,
            _ => {
                return Err(GraphError::NoSuchLink {
                    block: from,
                    link: link.name(),
                })
            }
        };
        *slot = Some(to);
        Ok(())
    }

    /// Link blocks one after another through their `next` slots.
    pub fn chain(&mut self, ids: &[BlockId]) -> Result<(), GraphError> {
        for pair in ids.windows(2) {
            self.link(pair[0], Link::Next, pair[1])?;
        }
        Ok(())
    }

    pub fn get(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(&id)
    }

    pub fn get_mut(&mut self, id: BlockId) -> Option<&mut Block> {
        self.blocks.get_mut(&id)
    }

    pub fn roots(&self) -> &[BlockId] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Block> {
        self.blocks.values()
    }

    /// Copy the graph with fresh block identities, same topology and layout.
    pub fn deep_clone(&self) -> ScriptGraph {
        let fresh: HashMap<BlockId, BlockId> =
            self.blocks.keys().map(|id| (*id, BlockId::new())).collect();

        let blocks = self
            .blocks
            .values()
            .map(|block| {
                let mut copy = block.clone();
                copy.id = fresh[&block.id];
                for link in copy.kind.links_mut() {
                    // Dangling links stay dangling; the interpreter treats them as chain ends.
                    if let Some(mapped) = fresh.get(&*link) {
                        *link = *mapped;
                    }
                }
                (copy.id, copy)
            })
            .collect();

        ScriptGraph {
            blocks,
            roots: self.roots.iter().filter_map(|id| fresh.get(id).copied()).collect(),
        }
    }
}

/// Entity identity -> script graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScriptStore {
    graphs: HashMap<EntityId, ScriptGraph>,
}

impl ScriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: EntityId) -> Option<&ScriptGraph> {
        self.graphs.get(&id)
    }

    pub fn insert(&mut self, id: EntityId, graph: ScriptGraph) {
        self.graphs.insert(id, graph);
    }

    pub fn remove(&mut self, id: EntityId) -> Option<ScriptGraph> {
        self.graphs.remove(&id)
    }

    pub fn clear(&mut self) {
        self.graphs.clear();
    }

    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }
}
