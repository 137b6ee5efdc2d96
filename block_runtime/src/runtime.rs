//! The runtime facade: play mode, the tick, clicks and render snapshots.

use serde::Serialize;
use stage_model::{Appearance, EntityId, MouseButton, Point, Stage, Transform};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use crate::clock::{Clock, SystemClock};
use crate::config::RuntimeConfig;
use crate::detector::{self, Trigger, TriggerState};
use crate::executor::{Actor, ExecContext, StepBudget};
use crate::input::KeyState;
use crate::interpreter::{fire, walk};
use crate::scheduler::Scheduler;

/// What one call to [`Runtime::update`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    /// Ticks since play began, including this one.
    pub tick: u64,
    /// Events that fired this tick.
    pub fired: usize,
    /// Deferred continuations that resumed this tick.
    pub resumed: usize,
}

/// Everything a renderer needs to draw one instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityView {
    pub id: EntityId,
    pub name: String,
    pub transform: Transform,
    pub appearance: Appearance,
    pub speech: Option<String>,
}

/// Owns the stage while it plays and drives it one tick at a time.
pub struct Runtime {
    config: RuntimeConfig,
    stage: Stage,
    clock: Box<dyn Clock>,
    keys: KeyState,
    triggers: TriggerState,
    scheduler: Scheduler,
    budget: StepBudget,
    playing: bool,
    tick: u64,
}

impl Runtime {
    /// A runtime with an empty stage sized from `config`.
    pub fn new(config: RuntimeConfig) -> Self {
        let stage = Stage::new(config.stage_size());
        Self::with_stage(stage, config)
    }

    /// A runtime over an existing stage; the stage keeps its own size.
    pub fn with_stage(stage: Stage, config: RuntimeConfig) -> Self {
        Self {
            stage,
            clock: Box::new(SystemClock::new()),
            keys: KeyState::new(),
            triggers: TriggerState::new(),
            scheduler: Scheduler::new(),
            budget: StepBudget::new(config.max_steps_per_tick),
            config,
            playing: false,
            tick: 0,
        }
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// The configuration this runtime was built with.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// The stage: templates, instances and globals.
    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    /// Mutable stage access for the editor or host.
    pub fn stage_mut(&mut self) -> &mut Stage {
        &mut self.stage
    }

    pub fn keys(&self) -> &KeyState {
        &self.keys
    }

    /// Held-key state, fed by the host's input layer.
    pub fn keys_mut(&mut self) -> &mut KeyState {
        &mut self.keys
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Number of chain remainders waiting to resume.
    pub fn pending_continuations(&self) -> usize {
        self.scheduler.len()
    }

    /// Enter play mode: clone every template onto the stage, reset trigger
    /// state and fire `Start` events.
    pub fn play(&mut self) {
        if self.playing {
            self.stop();
        }

        self.triggers.clear();
        self.scheduler.cancel_all();
        let instances = self.stage.instantiate_all();
        detector::seed(&self.stage, &mut self.triggers);
        self.playing = true;
        self.tick = 0;

        let starts = detector::start_triggers(&self.stage);
        debug!(instances = instances.len(), starts = starts.len(), "play started");
        let now_ms = self.clock.now_ms();
        self.refill_budget();
        self.fire_all(starts, now_ms);
    }

    /// Leave play mode: cancel pending continuations and purge instances.
    pub fn stop(&mut self) {
        if !self.playing {
            return;
        }
        self.playing = false;
        self.scheduler.cancel_all();
        self.triggers.clear();
        self.stage.purge_instances();
        debug!(ticks = self.tick, "play stopped");
    }

    /// Advance exactly one tick. Does nothing while stopped.
    pub fn update(&mut self) -> TickReport {
        if !self.playing {
            return TickReport {
                tick: self.tick,
                ..TickReport::default()
            };
        }

        let now_ms = self.clock.now_ms();
        self.tick += 1;
        self.refill_budget();
        self.expire_speech(now_ms);

        let resumed = self.resume_due(now_ms);

        let fired = detector::detect(&self.stage, &self.keys, &mut self.triggers, now_ms);
        let fired_count = fired.len();
        self.fire_all(fired, now_ms);

        let stage = &self.stage;
        self.triggers
            .retain_entities(|id| stage.instance(id).is_some());

        trace!(
            tick = self.tick,
            fired = fired_count,
            resumed,
            steps_left = self.budget.remaining(),
            "tick"
        );
        TickReport {
            tick: self.tick,
            fired: fired_count,
            resumed,
        }
    }

    /// Deliver a mouse press; returns how many `Mouse` events fired.
    pub fn handle_click(&mut self, point: Point, button: MouseButton) -> usize {
        if !self.playing {
            return 0;
        }
        let triggers = detector::click_triggers(&self.stage, point, button);
        let count = triggers.len();
        let now_ms = self.clock.now_ms();
        self.refill_budget();
        self.fire_all(triggers, now_ms);
        count
    }

    /// Post-tick state for the renderer, in stage order.
    pub fn snapshot(&self) -> Vec<EntityView> {
        let now_ms = self.clock.now_ms();
        self.stage
            .instances()
            .map(|entity| EntityView {
                id: entity.id,
                name: entity.name.clone(),
                transform: entity.transform,
                appearance: entity.appearance.clone(),
                speech: entity.visible_speech(now_ms).map(str::to_string),
            })
            .collect()
    }

    /// Drive the fixed-period tick loop until play stops. `frame` runs after
    /// every tick on the same thread; it may feed input, draw, or call `stop`.
    pub fn run(&mut self, mut frame: impl FnMut(&mut Runtime)) {
        let period = Duration::from_millis(self.config.tick_period_ms);
        while self.playing {
            let started = Instant::now();
            self.update();
            frame(self);
            if let Some(rest) = period.checked_sub(started.elapsed()) {
                std::thread::sleep(rest);
            }
        }
    }

    fn context(&mut self, now_ms: f64) -> ExecContext<'_> {
        ExecContext::new(&mut self.stage, &mut self.scheduler, &mut self.budget, now_ms)
    }

    fn refill_budget(&mut self) {
        self.budget = StepBudget::new(self.config.max_steps_per_tick);
    }

    fn fire_all(&mut self, triggers: Vec<Trigger>, now_ms: f64) {
        let mut ctx = self.context(now_ms);
        for trigger in triggers {
            fire(&mut ctx, trigger);
        }
    }

    /// Resume continuations that were due when this tick started. Ones
    /// scheduled while resuming wait for a later tick.
    fn resume_due(&mut self, now_ms: f64) -> usize {
        let due = self.scheduler.take_due(now_ms);
        let mut ctx = self.context(now_ms);
        let mut resumed = 0;

        for continuation in due {
            let actor = Actor::new(continuation.entity, continuation.generation);
            if !ctx.scheduler.is_current(&continuation) || !actor.is_live(ctx.stage) {
                trace!(entity = %continuation.entity, "dropped stale continuation");
                continue;
            }
            walk(&mut ctx, actor, continuation.resume);
            resumed += 1;
        }
        resumed
    }

    fn expire_speech(&mut self, now_ms: f64) {
        for id in self.stage.instance_ids() {
            if let Some(entity) = self.stage.instance_mut(id) {
                if entity.visible_speech(now_ms).is_none() {
                    entity.speech = None;
                }
            }
        }
    }
}
