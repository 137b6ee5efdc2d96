//! Deferred continuations: the rest of a chain waiting to resume.
//!
//! A continuation holds a resume stack rather than a single block. The last
//! entry is where walking picks up; each entry below it is where an enclosing
//! `IfElse` or `While` continues once the level above it runs out. A `Wait`
//! three levels deep in nested loops therefore resumes the innermost body and
//! then returns to each loop in turn.

use stage_model::{BlockId, EntityId};
use tracing::trace;

/// A chain remainder to run for `entity` once `due_ms` is reached.
#[derive(Debug, Clone, PartialEq)]
pub struct Continuation {
    pub entity: EntityId,
    /// Generation of `entity` when scheduled; a mismatch at resume time means
    /// the entity was removed and the continuation is dropped.
    pub generation: u64,
    /// Blocks to walk from, innermost last.
    pub resume: Vec<BlockId>,
    pub due_ms: f64,
    carry_over: bool,
    session: u64,
    seq: u64,
}

impl Continuation {
    /// The block walking resumes at.
    pub fn head(&self) -> Option<BlockId> {
        self.resume.last().copied()
    }
}

/// Pending continuations for the current play session.
#[derive(Debug, Default)]
pub struct Scheduler {
    pending: Vec<Continuation>,
    session: u64,
    next_seq: u64,
}

impl Scheduler {
    /// Create a new empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `resume` for `entity` at `due_ms`.
    pub fn schedule(&mut self, entity: EntityId, generation: u64, resume: Vec<BlockId>, due_ms: f64) {
        self.push(entity, generation, resume, due_ms, false);
    }

    /// Queue the remainder of a walk that ran out of step budget. At most one
    /// such remainder is kept per entity and resume point; returns false when
    /// an identical one is already pending.
    pub fn carry_over(&mut self, entity: EntityId, generation: u64, resume: Vec<BlockId>, due_ms: f64) -> bool {
        let duplicate = self.pending.iter().any(|c| {
            c.carry_over && c.entity == entity && c.generation == generation && c.resume == resume
        });
        if duplicate {
            return false;
        }
        self.push(entity, generation, resume, due_ms, true);
        true
    }

    fn push(&mut self, entity: EntityId, generation: u64, resume: Vec<BlockId>, due_ms: f64, carry_over: bool) {
        trace!(entity = %entity, depth = resume.len(), due_ms, carry_over, "scheduled continuation");
        self.pending.push(Continuation {
            entity,
            generation,
            resume,
            due_ms,
            carry_over,
            session: self.session,
            seq: self.next_seq,
        });
        self.next_seq += 1;
    }

    /// Remove and return everything due at `now_ms`, earliest first and in
    /// scheduling order among equal due times.
    pub fn take_due(&mut self, now_ms: f64) -> Vec<Continuation> {
        let (mut due, rest): (Vec<_>, Vec<_>) = self
            .pending
            .drain(..)
            .partition(|c| c.due_ms <= now_ms);
        self.pending = rest;
        due.sort_by(|a, b| a.due_ms.total_cmp(&b.due_ms).then(a.seq.cmp(&b.seq)));
        due
    }

    /// Whether `continuation` was scheduled in the current session.
    pub fn is_current(&self, continuation: &Continuation) -> bool {
        continuation.session == self.session
    }

    /// Drop every pending continuation and invalidate any already taken out.
    pub fn cancel_all(&mut self) {
        self.pending.clear();
        self.session += 1;
    }

    /// Drop pending continuations belonging to `entity`.
    pub fn cancel_entity(&mut self, entity: EntityId) {
        self.pending.retain(|c| c.entity != entity);
    }

    /// Number of pending continuations.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
