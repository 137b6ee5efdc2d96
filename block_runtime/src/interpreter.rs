//! Chain Interpreter - walks block chains for one actor.
//!
//! A walk follows `next` links from a head block:
//! - **Action**: hand to the executor; `Suspend`/`Halt` end the walk
//! - **IfElse**: walk one branch, then continue at `next`
//! - **While**: walk `body` and come back to the loop block while the
//!   condition holds, then continue at `next`
//!
//! Entering a branch or body pushes the point the enclosing walk continues
//! from onto the context's frames. A `Wait` or an exhausted step budget
//! captures those frames in its continuation, so the enclosing `IfElse` or
//! `While` only moves on once the nested remainder has finished. `Suspend` and
//! `Halt` both propagate outward; only `Halt` also stops sibling chains.
//!
//! Every block visited costs one step of the tick's shared [`StepBudget`], so
//! a loop whose condition never clears, or a chain linked back onto itself,
//! spreads over many ticks instead of stalling one.
//!
//! [`StepBudget`]: crate::executor::StepBudget

use stage_model::{BlockId, BlockKind};
use tracing::{debug, trace, warn};

use crate::detector::Trigger;
use crate::executor::{execute, Actor, ExecContext, Flow};

/// Run every chain attached to a fired event: `next` first, then each of
/// `extra_next` in order. A suspended chain does not hold back its siblings.
pub fn fire(ctx: &mut ExecContext<'_>, trigger: Trigger) {
    let actor = Actor::new(trigger.entity, trigger.generation);
    if !actor.is_live(ctx.stage) {
        trace!(entity = %trigger.entity, "trigger for removed entity skipped");
        return;
    }

    let heads: Vec<BlockId> = match ctx
        .stage
        .script(actor.id)
        .and_then(|script| script.get(trigger.event))
        .map(|block| &block.kind)
    {
        Some(BlockKind::Event {
            next, extra_next, ..
        }) => next.iter().chain(extra_next.iter()).copied().collect(),
        _ => return,
    };

    for head in heads {
        if walk(ctx, actor, vec![head]) == Flow::Halt {
            break;
        }
    }
}

/// Walk a resume stack to completion: the last entry first, then each entry
/// below it as the level above runs out.
pub fn walk(ctx: &mut ExecContext<'_>, actor: Actor, resume: Vec<BlockId>) -> Flow {
    ctx.frames = resume;
    while let Some(head) = ctx.frames.pop() {
        let flow = run_chain(ctx, actor, Some(head));
        if flow != Flow::Continue {
            ctx.frames.clear();
            return flow;
        }
    }
    Flow::Continue
}

/// Walk one chain starting at `head`. Frames pushed on the way down are
/// popped again before returning.
fn run_chain(ctx: &mut ExecContext<'_>, actor: Actor, head: Option<BlockId>) -> Flow {
    let mut cursor = head;

    while let Some(id) = cursor {
        if !actor.is_live(ctx.stage) {
            return Flow::Halt;
        }
        if !ctx.budget.take() {
            carry_over(ctx, actor, id);
            return Flow::Suspend;
        }
        let Some(kind) = ctx
            .stage
            .script(actor.id)
            .and_then(|script| script.get(id))
            .map(|block| block.kind.clone())
        else {
            // Dangling link: treat as the end of the chain.
            return Flow::Continue;
        };

        cursor = match kind {
            // Never linked into a chain by construction; pass through.
            BlockKind::Event { next, .. } => next,
            BlockKind::Action { action, next } => match execute(ctx, actor, &action, next) {
                Flow::Continue => next,
                flow => return flow,
            },
            BlockKind::IfElse {
                condition,
                then_branch,
                else_branch,
                next,
            } => {
                let Some(entity) = ctx.stage.instance(actor.id) else {
                    return Flow::Halt;
                };
                let branch = if condition.holds(&entity.variables) {
                    then_branch
                } else {
                    else_branch
                };
                match nested(ctx, actor, branch, next) {
                    Flow::Continue => next,
                    flow => return flow,
                }
            }
            BlockKind::While {
                condition,
                body,
                next,
            } => {
                let Some(entity) = ctx.stage.instance(actor.id) else {
                    return Flow::Halt;
                };
                if !condition.holds(&entity.variables) {
                    next
                } else {
                    match nested(ctx, actor, body, Some(id)) {
                        Flow::Continue => Some(id),
                        flow => return flow,
                    }
                }
            }
        };
    }

    Flow::Continue
}

/// Walk a branch or loop body with `resume` recorded as where the enclosing
/// walk continues.
fn nested(ctx: &mut ExecContext<'_>, actor: Actor, head: Option<BlockId>, resume: Option<BlockId>) -> Flow {
    ctx.frames.extend(resume);
    let flow = run_chain(ctx, actor, head);
    if resume.is_some() {
        ctx.frames.pop();
    }
    flow
}

/// Queue the rest of a walk that ran out of budget just before `head`.
fn carry_over(ctx: &mut ExecContext<'_>, actor: Actor, head: BlockId) {
    let resume = ctx.resume_stack(Some(head));
    if ctx
        .scheduler
        .carry_over(actor.id, actor.generation, resume, ctx.now_ms)
    {
        warn!(entity = %actor.id, block = %head, "step budget exhausted, continuing next tick");
    } else {
        debug!(entity = %actor.id, block = %head, "walk already carried over, dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::StepBudget;
    use crate::scheduler::Scheduler;
    use stage_model::{
        ActionKind, Condition, Entity, EntityId, EventKind, Link, ScriptGraph, Stage, StageSize,
    };

    fn action(graph: &mut ScriptGraph, action: ActionKind) -> BlockId {
        graph.add_block(BlockKind::action(action)).unwrap()
    }

    fn change(name: &str, delta: f64) -> ActionKind {
        ActionKind::ChangeVar {
            name: name.to_string(),
            delta,
        }
    }

    fn while_loop(graph: &mut ScriptGraph, variable: &str) -> BlockId {
        graph
            .add_block(BlockKind::while_loop(Condition::new(variable, 0.0)))
            .unwrap()
    }

    struct Harness {
        stage: Stage,
        scheduler: Scheduler,
        actor: Actor,
        event: BlockId,
    }

    impl Harness {
        /// One instance whose script is a Start event built by `build`.
        fn new(entity: Entity, build: impl FnOnce(&mut ScriptGraph, BlockId)) -> Self {
            let mut script = ScriptGraph::new();
            let event = script.add_event(EventKind::Start);
            build(&mut script, event);

            let mut stage = Stage::new(StageSize { width: 100.0, height: 100.0 });
            stage.add_template(entity, script);
            let id = stage.instantiate_all()[0];
            let generation = stage.instance(id).unwrap().generation;
            let event = stage.script(id).unwrap().roots()[0];

            Self {
                stage,
                scheduler: Scheduler::new(),
                actor: Actor::new(id, generation),
                event,
            }
        }

        /// Fire the Start event with a fresh budget of `steps`.
        fn fire(&mut self, steps: u32) {
            let mut budget = StepBudget::new(steps);
            let mut ctx = ExecContext::new(&mut self.stage, &mut self.scheduler, &mut budget, 0.0);
            let trigger = Trigger {
                entity: self.actor.id,
                generation: self.actor.generation,
                event: self.event,
            };
            fire(&mut ctx, trigger);
        }

        /// Resume everything pending with a fresh budget of `steps`; returns
        /// how many continuations ran.
        fn resume(&mut self, steps: u32) -> usize {
            let due = self.scheduler.take_due(f64::MAX);
            let count = due.len();
            let mut budget = StepBudget::new(steps);
            let mut ctx = ExecContext::new(&mut self.stage, &mut self.scheduler, &mut budget, 0.0);
            for continuation in due {
                walk(&mut ctx, self.actor, continuation.resume);
            }
            count
        }

        fn var(&self, name: &str) -> f64 {
            self.stage.instance(self.actor.id).unwrap().variables.get(name)
        }
    }

    #[test]
    fn test_sequence_runs_in_order() {
        let mut h = Harness::new(Entity::new("A"), |g, start| {
            let a = action(g, ActionKind::SetVar { name: "x".to_string(), value: 2.0 });
            let b = action(g, ActionKind::ChangeVar { name: "x".to_string(), delta: 3.0 });
            g.chain(&[start, a, b]).unwrap();
        });

        h.fire(100);
        assert_eq!(h.var("x"), 5.0);
    }

    #[test]
    fn test_if_else_picks_one_branch_then_continues() {
        let mut h = Harness::new(Entity::new("A").with_variable("hp", 5.0), |g, start| {
            let branch = g.add_block(BlockKind::if_else(Condition::new("hp", 3.0))).unwrap();
            let then = action(g, change("then", 1.0));
            let otherwise = action(g, change("else", 1.0));
            let after = action(g, change("after", 1.0));
            g.link(start, Link::Next, branch).unwrap();
            g.link(branch, Link::Then, then).unwrap();
            g.link(branch, Link::Else, otherwise).unwrap();
            g.link(branch, Link::Next, after).unwrap();
        });

        h.fire(100);
        assert_eq!(h.var("then"), 1.0);
        assert_eq!(h.var("else"), 0.0);
        assert_eq!(h.var("after"), 1.0);
    }

    #[test]
    fn test_if_without_matching_branch_still_continues() {
        let mut h = Harness::new(Entity::new("A"), |g, start| {
            let branch = g.add_block(BlockKind::if_else(Condition::new("hp", 0.0))).unwrap();
            let then = action(g, change("then", 1.0));
            let after = action(g, change("after", 1.0));
            g.link(start, Link::Next, branch).unwrap();
            g.link(branch, Link::Then, then).unwrap();
            g.link(branch, Link::Next, after).unwrap();
        });

        h.fire(100);
        assert_eq!(h.var("then"), 0.0);
        assert_eq!(h.var("after"), 1.0);
    }

    #[test]
    fn test_while_counts_down() {
        let mut h = Harness::new(Entity::new("A").with_variable("n", 5.0), |g, start| {
            let lp = while_loop(g, "n");
            let dec = action(g, change("n", -1.0));
            let count = action(g, change("count", 1.0));
            let after = action(g, change("after", 1.0));
            g.link(start, Link::Next, lp).unwrap();
            g.link(lp, Link::Body, dec).unwrap();
            g.link(dec, Link::Next, count).unwrap();
            g.link(lp, Link::Next, after).unwrap();
        });

        h.fire(100);
        assert_eq!(h.var("n"), 0.0);
        assert_eq!(h.var("count"), 5.0);
        assert_eq!(h.var("after"), 1.0);
        assert!(h.scheduler.is_empty());
    }

    #[test]
    fn test_runaway_while_is_bounded_by_steps() {
        let mut h = Harness::new(Entity::new("A").with_variable("n", 1.0), |g, start| {
            let lp = while_loop(g, "n");
            let count = action(g, change("count", 1.0));
            let after = action(g, change("after", 1.0));
            g.link(start, Link::Next, lp).unwrap();
            g.link(lp, Link::Body, count).unwrap();
            g.link(lp, Link::Next, after).unwrap();
        });

        // Each iteration visits the loop block and its one-block body.
        h.fire(10);
        assert_eq!(h.var("count"), 5.0);
        assert_eq!(h.var("after"), 0.0);

        // The loop itself is queued to carry on next tick.
        let due = h.scheduler.take_due(0.0);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].entity, h.actor.id);
        assert_eq!(due[0].resume.len(), 1);
    }

    #[test]
    fn test_retriggered_runaway_keeps_one_carry_over() {
        let mut h = Harness::new(Entity::new("A").with_variable("n", 1.0), |g, start| {
            let lp = while_loop(g, "n");
            let count = action(g, change("count", 1.0));
            g.link(start, Link::Next, lp).unwrap();
            g.link(lp, Link::Body, count).unwrap();
        });

        h.fire(10);
        for tick in 1..=20 {
            // A tick resumes the carried-over loop, then the event fires again.
            let mut budget = StepBudget::new(10);
            let due = h.scheduler.take_due(f64::MAX);
            let mut ctx = ExecContext::new(&mut h.stage, &mut h.scheduler, &mut budget, 0.0);
            for continuation in due {
                walk(&mut ctx, h.actor, continuation.resume);
            }
            fire(
                &mut ctx,
                Trigger {
                    entity: h.actor.id,
                    generation: h.actor.generation,
                    event: h.event,
                },
            );

            assert_eq!(h.scheduler.len(), 1);
            assert_eq!(h.var("count"), 5.0 * (tick + 1) as f64);
        }
    }

    #[test]
    fn test_nested_loops_share_the_budget() {
        let mut h = Harness::new(Entity::new("A").with_variable("n", 1.0), |g, start| {
            let outer = while_loop(g, "n");
            let inner = while_loop(g, "n");
            let count = action(g, change("count", 1.0));
            g.link(start, Link::Next, outer).unwrap();
            g.link(outer, Link::Body, inner).unwrap();
            g.link(inner, Link::Body, count).unwrap();
        });

        // outer, then (inner, count) pairs until ten steps are spent.
        h.fire(10);
        assert_eq!(h.var("count"), 4.0);

        let due = h.scheduler.take_due(0.0);
        assert_eq!(due.len(), 1);
        // Resumes at the body action, then the inner loop, then the outer one.
        assert_eq!(due[0].resume.len(), 3);
    }

    #[test]
    fn test_wait_in_loop_body_paces_the_loop() {
        let mut h = Harness::new(Entity::new("A").with_variable("n", 3.0), |g, start| {
            let lp = while_loop(g, "n");
            let wait = action(g, ActionKind::Wait { seconds: 1.0 });
            let dec = action(g, change("n", -1.0));
            let after = action(g, change("after", 1.0));
            g.link(start, Link::Next, lp).unwrap();
            g.link(lp, Link::Body, wait).unwrap();
            g.link(wait, Link::Next, dec).unwrap();
            g.link(lp, Link::Next, after).unwrap();
        });

        h.fire(100);
        assert_eq!(h.var("n"), 3.0);
        assert_eq!(h.scheduler.len(), 1);

        let mut resumes = 0;
        while !h.scheduler.is_empty() {
            resumes += h.resume(100);
            assert!(h.scheduler.len() <= 1);
        }
        assert_eq!(resumes, 3);
        assert_eq!(h.var("n"), 0.0);
        assert_eq!(h.var("after"), 1.0);
    }

    #[test]
    fn test_wait_in_branch_defers_rest_of_chain() {
        let mut h = Harness::new(Entity::new("A").with_variable("hp", 1.0), |g, start| {
            let branch = g.add_block(BlockKind::if_else(Condition::new("hp", 0.0))).unwrap();
            let wait = action(g, ActionKind::Wait { seconds: 1.0 });
            let later = action(g, change("later", 1.0));
            let after = action(g, change("after", 1.0));
            g.link(start, Link::Next, branch).unwrap();
            g.link(branch, Link::Then, wait).unwrap();
            g.link(wait, Link::Next, later).unwrap();
            g.link(branch, Link::Next, after).unwrap();
        });

        h.fire(100);
        assert_eq!(h.var("later"), 0.0);
        assert_eq!(h.var("after"), 0.0);
        assert_eq!(h.scheduler.len(), 1);

        assert_eq!(h.resume(100), 1);
        assert_eq!(h.var("later"), 1.0);
        assert_eq!(h.var("after"), 1.0);
    }

    #[test]
    fn test_extra_chains_run_even_if_first_waits() {
        let mut h = Harness::new(Entity::new("A"), |g, start| {
            let wait = action(g, ActionKind::Wait { seconds: 1.0 });
            let later = action(g, change("later", 1.0));
            let sibling = action(g, change("sibling", 1.0));
            g.chain(&[start, wait, later]).unwrap();
            g.link(start, Link::ExtraNext, sibling).unwrap();
        });

        h.fire(100);
        assert_eq!(h.var("later"), 0.0);
        assert_eq!(h.var("sibling"), 1.0);
    }

    #[test]
    fn test_chain_linked_onto_itself_is_bounded() {
        let mut h = Harness::new(Entity::new("A"), |g, start| {
            let a = action(g, change("count", 1.0));
            let b = action(g, change("count", 1.0));
            g.chain(&[start, a, b]).unwrap();
            g.link(b, Link::Next, a).unwrap();
        });

        h.fire(7);
        assert_eq!(h.var("count"), 7.0);
        assert_eq!(h.scheduler.len(), 1);
    }

    #[test]
    fn test_self_delete_halts_everything() {
        let mut h = Harness::new(Entity::new("A").with_variable("n", 3.0), |g, start| {
            let lp = while_loop(g, "n");
            let delete = action(g, ActionKind::DeleteEntity { target: None });
            let after = action(g, ActionKind::SpawnEntity { template: Some(EntityId::nil()) });
            let sibling = action(g, ActionKind::SpawnEntity { template: None });
            g.link(start, Link::Next, lp).unwrap();
            g.link(lp, Link::Body, delete).unwrap();
            g.link(lp, Link::Next, after).unwrap();
            g.link(start, Link::ExtraNext, sibling).unwrap();
        });

        h.fire(100);
        // Neither the rest of the chain nor the sibling chain spawned anything.
        assert_eq!(h.stage.instance_count(), 0);
        assert!(h.scheduler.is_empty());
    }
}
