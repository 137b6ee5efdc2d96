//! Action Executor - the semantics of each primitive action.

use stage_model::{ActionKind, BlockId, Entity, EntityId, Stage, StageSize};
use tracing::{debug, trace};

use crate::scheduler::Scheduler;

/// Blocks the interpreter may still visit before remaining walks are
/// carried over to a later tick. One budget is shared by every walk in a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepBudget {
    remaining: u32,
}

impl StepBudget {
    /// Create a budget of `steps` block visits.
    pub fn new(steps: u32) -> Self {
        Self { remaining: steps }
    }

    /// Spend one step; false once the budget is used up.
    pub fn take(&mut self) -> bool {
        match self.remaining.checked_sub(1) {
            Some(rest) => {
                self.remaining = rest;
                true
            }
            None => false,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }
}

/// Everything a chain may touch while it runs, passed explicitly rather than
/// held globally so independent runtimes never share state.
pub struct ExecContext<'a> {
    pub stage: &'a mut Stage,
    pub scheduler: &'a mut Scheduler,
    pub budget: &'a mut StepBudget,
    pub now_ms: f64,
    /// Where enclosing `IfElse`/`While` blocks of the current walk pick up,
    /// innermost last.
    pub(crate) frames: Vec<BlockId>,
}

impl<'a> ExecContext<'a> {
    /// Create a context for walks running at `now_ms`.
    pub fn new(stage: &'a mut Stage, scheduler: &'a mut Scheduler, budget: &'a mut StepBudget, now_ms: f64) -> Self {
        Self {
            stage,
            scheduler,
            budget,
            now_ms,
            frames: Vec::new(),
        }
    }

    /// The resume stack for a walk suspended just before `head`.
    pub(crate) fn resume_stack(&self, head: Option<BlockId>) -> Vec<BlockId> {
        let mut resume = self.frames.clone();
        resume.extend(head);
        resume
    }
}

/// The instance a chain runs on, pinned to the generation it had when the
/// chain started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: EntityId,
    pub generation: u64,
}

impl Actor {
    pub fn new(id: EntityId, generation: u64) -> Self {
        Self { id, generation }
    }

    pub fn is_live(&self, stage: &Stage) -> bool {
        stage.is_live(self.id, self.generation)
    }
}

/// How the calling walk proceeds after a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Follow `next`.
    Continue,
    /// Stop this walk and every enclosing one; the rest, if any, has been
    /// scheduled. Sibling chains of the same event still run.
    Suspend,
    /// The actor is gone; every enclosing walk stops too.
    Halt,
}

/// Apply `action` for `actor`. `next` is the block after it, which `Wait`
/// defers together with the enclosing frames.
pub fn execute(ctx: &mut ExecContext<'_>, actor: Actor, action: &ActionKind, next: Option<BlockId>) -> Flow {
    match action {
        ActionKind::MoveBy { dx, dy } => {
            with_actor(ctx, actor, |entity, size, _| entity.move_by(*dx, *dy, size.width, size.height))
        }
        ActionKind::SetColor { color } => {
            with_actor(ctx, actor, |entity, _, _| entity.appearance.color = color.clone())
        }
        ActionKind::Say { text, seconds } => {
            with_actor(ctx, actor, |entity, _, now| entity.say(text.clone(), now, *seconds))
        }
        ActionKind::SetVar { name, value } => {
            with_actor(ctx, actor, |entity, _, _| entity.variables.set(name.clone(), *value))
        }
        ActionKind::ChangeVar { name, delta } => {
            with_actor(ctx, actor, |entity, _, _| entity.variables.change(name, *delta))
        }
        ActionKind::SetGlobalVar { name, value } => {
            ctx.stage.globals.set(name.clone(), *value);
            Flow::Continue
        }
        ActionKind::ChangeGlobalVar { name, delta } => {
            ctx.stage.globals.change(name, *delta);
            Flow::Continue
        }
        ActionKind::Wait { seconds } => {
            let resume = ctx.resume_stack(next);
            if !resume.is_empty() {
                let due = ctx.now_ms + seconds * 1000.0;
                ctx.scheduler.schedule(actor.id, actor.generation, resume, due);
            }
            Flow::Suspend
        }
        ActionKind::RotateBy { degrees } => {
            with_actor(ctx, actor, |entity, _, _| entity.transform.rotation += *degrees)
        }
        ActionKind::RotateTo { degrees } => {
            with_actor(ctx, actor, |entity, _, _| entity.transform.rotation = *degrees)
        }
        ActionKind::ScaleBy { factor } => {
            with_actor(ctx, actor, |entity, _, _| entity.appearance.scale_by(*factor))
        }
        ActionKind::SetSize { width, height } => {
            with_actor(ctx, actor, |entity, _, _| entity.appearance.set_size(*width, *height))
        }
        ActionKind::ChangeOpacity { delta } => {
            with_actor(ctx, actor, |entity, _, _| entity.appearance.change_opacity(*delta))
        }
        ActionKind::SpawnEntity { template } => spawn(ctx, actor, *template),
        ActionKind::DeleteEntity { target } => delete(ctx, actor, *target),
    }
}

/// Run `apply` on the actor's entity, or halt if it is gone.
fn with_actor(
    ctx: &mut ExecContext<'_>,
    actor: Actor,
    apply: impl FnOnce(&mut Entity, StageSize, f64),
) -> Flow {
    let size = ctx.stage.size;
    let now_ms = ctx.now_ms;
    match ctx.stage.instance_mut(actor.id) {
        Some(entity) => {
            apply(entity, size, now_ms);
            Flow::Continue
        }
        None => Flow::Halt,
    }
}

fn spawn(ctx: &mut ExecContext<'_>, actor: Actor, template: Option<EntityId>) -> Flow {
    let source = template
        .filter(|id| ctx.stage.template(*id).is_some())
        .unwrap_or_else(|| {
            if let Some(id) = template {
                debug!(template = %id, "spawn template not found, cloning actor");
            }
            actor.id
        });

    match ctx.stage.spawn(source) {
        Some(spawned) => trace!(actor = %actor.id, spawned = %spawned, "spawn"),
        None => debug!(actor = %actor.id, "spawn source vanished"),
    }
    Flow::Continue
}

fn delete(ctx: &mut ExecContext<'_>, actor: Actor, target: Option<EntityId>) -> Flow {
    let victim = target
        .and_then(|id| ctx.stage.resolve_instance(id))
        .unwrap_or(actor.id);

    if ctx.stage.despawn(victim).is_some() {
        ctx.scheduler.cancel_entity(victim);
    }

    if victim == actor.id {
        Flow::Halt
    } else {
        Flow::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stage_model::{Appearance, ScriptGraph, Shape};

    struct Fixture {
        stage: Stage,
        scheduler: Scheduler,
        budget: StepBudget,
    }

    impl Fixture {
        fn new() -> (Self, EntityId) {
            let mut stage = Stage::new(StageSize { width: 100.0, height: 100.0 });
            let template = Entity::new("Box")
                .with_appearance(Appearance::new(Shape::Rect, "blue", 10.0, 10.0))
                .with_position(50.0, 50.0)
                .with_variable("hp", 3.0);
            let template = stage.add_template(template, ScriptGraph::new());
            (
                Self {
                    stage,
                    scheduler: Scheduler::new(),
                    budget: StepBudget::new(10),
                },
                template,
            )
        }

        fn run(&mut self, actor: Actor, action: ActionKind, next: Option<BlockId>) -> Flow {
            self.run_in(actor, action, next, Vec::new())
        }

        fn run_in(&mut self, actor: Actor, action: ActionKind, next: Option<BlockId>, frames: Vec<BlockId>) -> Flow {
            let mut ctx = ExecContext::new(&mut self.stage, &mut self.scheduler, &mut self.budget, 1000.0);
            ctx.frames = frames;
            execute(&mut ctx, actor, &action, next)
        }

        fn actor(&mut self, template: EntityId) -> Actor {
            let id = self.stage.spawn(template).unwrap();
            Actor::new(id, self.stage.instance(id).unwrap().generation)
        }
    }

    #[test]
    fn test_move_by_clamps() {
        let (mut fx, template) = Fixture::new();
        let actor = fx.actor(template);

        fx.run(actor, ActionKind::MoveBy { dx: 500.0, dy: -500.0 }, None);
        let entity = fx.stage.instance(actor.id).unwrap();
        assert_eq!(entity.transform.x, 90.0);
        assert_eq!(entity.transform.y, 0.0);
    }

    #[test]
    fn test_appearance_actions() {
        let (mut fx, template) = Fixture::new();
        let actor = fx.actor(template);

        fx.run(actor, ActionKind::SetColor { color: "red".to_string() }, None);
        fx.run(actor, ActionKind::ScaleBy { factor: 2.0 }, None);
        fx.run(actor, ActionKind::ChangeOpacity { delta: -2.0 }, None);
        fx.run(actor, ActionKind::RotateBy { degrees: 30.0 }, None);
        fx.run(actor, ActionKind::RotateBy { degrees: 30.0 }, None);

        let entity = fx.stage.instance(actor.id).unwrap();
        assert_eq!(entity.appearance.color, "red");
        assert_eq!(entity.appearance.width(), 20.0);
        assert_eq!(entity.appearance.opacity(), 0.0);
        assert_eq!(entity.transform.rotation, 60.0);

        fx.run(actor, ActionKind::RotateTo { degrees: 5.0 }, None);
        fx.run(actor, ActionKind::SetSize { width: 7.0, height: 8.0 }, None);
        let entity = fx.stage.instance(actor.id).unwrap();
        assert_eq!(entity.transform.rotation, 5.0);
        assert_eq!(entity.appearance.height(), 8.0);
    }

    #[test]
    fn test_variables_local_and_global() {
        let (mut fx, template) = Fixture::new();
        let actor = fx.actor(template);

        fx.run(actor, ActionKind::ChangeVar { name: "hp".to_string(), delta: -1.0 }, None);
        fx.run(actor, ActionKind::ChangeVar { name: "coins".to_string(), delta: 2.0 }, None);
        fx.run(actor, ActionKind::SetGlobalVar { name: "level".to_string(), value: 4.0 }, None);
        fx.run(actor, ActionKind::ChangeGlobalVar { name: "level".to_string(), delta: 1.0 }, None);

        let entity = fx.stage.instance(actor.id).unwrap();
        assert_eq!(entity.variables.get("hp"), 2.0);
        assert_eq!(entity.variables.get("coins"), 2.0);
        assert_eq!(fx.stage.globals.get("level"), 5.0);
    }

    #[test]
    fn test_say_sets_expiry() {
        let (mut fx, template) = Fixture::new();
        let actor = fx.actor(template);

        fx.run(actor, ActionKind::Say { text: "hi".to_string(), seconds: 1.5 }, None);
        let bubble = fx.stage.instance(actor.id).unwrap().speech.clone().unwrap();
        assert_eq!(bubble.text, "hi");
        assert_eq!(bubble.expires_at_ms, 2500.0);
    }

    #[test]
    fn test_wait_schedules_next_and_suspends() {
        let (mut fx, template) = Fixture::new();
        let actor = fx.actor(template);
        let next = BlockId::new();

        assert_eq!(fx.run(actor, ActionKind::Wait { seconds: 0.5 }, Some(next)), Flow::Suspend);
        let due = fx.scheduler.take_due(1500.0);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].resume, vec![next]);
        assert_eq!(due[0].generation, actor.generation);

        // Nothing left to resume: still suspends, schedules nothing.
        assert_eq!(fx.run(actor, ActionKind::Wait { seconds: 0.5 }, None), Flow::Suspend);
        assert!(fx.scheduler.is_empty());
    }

    #[test]
    fn test_wait_keeps_enclosing_frames() {
        let (mut fx, template) = Fixture::new();
        let actor = fx.actor(template);
        let (outer, next) = (BlockId::new(), BlockId::new());

        fx.run_in(actor, ActionKind::Wait { seconds: 0.0 }, Some(next), vec![outer]);
        fx.run_in(actor, ActionKind::Wait { seconds: 0.0 }, None, vec![outer]);

        let due = fx.scheduler.take_due(1000.0);
        assert_eq!(due[0].resume, vec![outer, next]);
        assert_eq!(due[1].resume, vec![outer]);
    }

    #[test]
    fn test_step_budget_runs_out() {
        let mut budget = StepBudget::new(2);
        assert!(budget.take());
        assert!(budget.take());
        assert!(!budget.take());
        assert_eq!(budget.remaining(), 0);
    }

    #[test]
    fn test_spawn_falls_back_to_self() {
        let (mut fx, template) = Fixture::new();
        let actor = fx.actor(template);
        fx.stage.instance_mut(actor.id).unwrap().variables.set("hp", 9.0);

        fx.run(actor, ActionKind::SpawnEntity { template: Some(EntityId::new()) }, None);
        assert_eq!(fx.stage.instance_count(), 2);
        let clone = fx.stage.instances().last().unwrap();
        assert_eq!(clone.variables.get("hp"), 9.0);

        fx.run(actor, ActionKind::SpawnEntity { template: Some(template) }, None);
        let fresh = fx.stage.instances().last().unwrap();
        assert_eq!(fresh.variables.get("hp"), 3.0);
    }

    #[test]
    fn test_delete_other_continues() {
        let (mut fx, template) = Fixture::new();
        let actor = fx.actor(template);
        let other = fx.actor(template);
        fx.scheduler.schedule(other.id, other.generation, vec![BlockId::new()], 0.0);

        let flow = fx.run(actor, ActionKind::DeleteEntity { target: Some(other.id) }, None);
        assert_eq!(flow, Flow::Continue);
        assert!(fx.stage.instance(other.id).is_none());
        assert!(fx.scheduler.is_empty());
    }

    #[test]
    fn test_delete_self_halts() {
        let (mut fx, template) = Fixture::new();
        let actor = fx.actor(template);

        let flow = fx.run(actor, ActionKind::DeleteEntity { target: None }, None);
        assert_eq!(flow, Flow::Halt);
        assert!(!actor.is_live(&fx.stage));

        // Acting on a removed entity halts instead of touching anything.
        let flow = fx.run(actor, ActionKind::MoveBy { dx: 1.0, dy: 0.0 }, None);
        assert_eq!(flow, Flow::Halt);
    }

    #[test]
    fn test_delete_unresolved_target_removes_self() {
        let (mut fx, template) = Fixture::new();
        let actor = fx.actor(template);

        let flow = fx.run(actor, ActionKind::DeleteEntity { target: Some(EntityId::new()) }, None);
        assert_eq!(flow, Flow::Halt);
        assert_eq!(fx.stage.instance_count(), 0);
    }
}
