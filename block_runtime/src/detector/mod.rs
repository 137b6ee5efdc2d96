//! Event Detector - decides, once per tick, which root events fire.
//!
//! Detection is a read-only pass over the stage: it borrows the stage
//! immutably and returns the list of triggers, so every event in a tick sees
//! the same pre-tick snapshot. Spawns and deletions made by the chains that
//! run afterwards are only visible from the next tick on.
//!
//! | Event | Semantics |
//! |---|---|
//! | Start | fired by `play`, never by detection |
//! | Tick | interval since last fire, at most once per tick |
//! | KeyDown | level: every tick the key is held |
//! | Mouse | delivered by clicks, never by detection |
//! | EdgeTouch | level: every tick the box touches a stage edge |
//! | VarChange / GlobalVarChange | edge: only on the transition into the target |
//! | Collide | level: every tick the box overlaps another instance |

mod trigger_state;

pub use trigger_state::*;

use stage_model::{BlockId, BlockKind, Entity, EntityId, EventKind, MouseButton, Point, Stage};
use tracing::trace;

use crate::input::KeyState;

/// One event that fired on one instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trigger {
    pub entity: EntityId,
    pub generation: u64,
    pub event: BlockId,
}

impl Trigger {
    fn new(entity: &Entity, event: BlockId) -> Self {
        Self {
            entity: entity.id,
            generation: entity.generation,
            event,
        }
    }
}

/// Root events of an instance's script, in declaration order.
fn root_events<'a>(stage: &'a Stage, entity: EntityId) -> impl Iterator<Item = (BlockId, &'a EventKind)> {
    stage.script(entity).into_iter().flat_map(|script| {
        script.roots().iter().filter_map(move |root| match &script.get(*root)?.kind {
            BlockKind::Event { event, .. } => Some((*root, event)),
            _ => None,
        })
    })
}

/// Run detection for one tick.
pub fn detect(stage: &Stage, keys: &KeyState, state: &mut TriggerState, now_ms: f64) -> Vec<Trigger> {
    let mut fired = Vec::new();

    for entity in stage.instances() {
        for (root, event) in root_events(stage, entity.id) {
            let trigger_key = TriggerKey::new(entity.id, root);
            let fires = match event {
                EventKind::Start | EventKind::Mouse { .. } => false,
                EventKind::Tick { interval_ms } => state.interval_elapsed(trigger_key, *interval_ms, now_ms),
                EventKind::KeyDown { key } => keys.is_down(key),
                EventKind::EdgeTouch => entity
                    .bounds()
                    .touches_edge(stage.size.width, stage.size.height),
                EventKind::VarChange { name, target } => {
                    state.crossed_into(trigger_key, entity.variables.get(name), *target)
                }
                EventKind::GlobalVarChange { name, target } => {
                    state.crossed_into(trigger_key, stage.globals.get(name), *target)
                }
                EventKind::Collide { target } => collides(stage, entity, *target),
            };

            if fires {
                trace!(entity = %entity.id, event = ?event, "event fired");
                fired.push(Trigger::new(entity, root));
            }
        }
    }

    fired
}

/// Every `Start` root on the stage.
pub fn start_triggers(stage: &Stage) -> Vec<Trigger> {
    stage
        .instances()
        .flat_map(|entity| {
            root_events(stage, entity.id)
                .filter(|(_, event)| matches!(event, EventKind::Start))
                .map(move |(root, _)| Trigger::new(entity, root))
        })
        .collect()
}

/// `Mouse` roots matching `button` on every instance whose hit area contains `point`.
pub fn click_triggers(stage: &Stage, point: Point, button: MouseButton) -> Vec<Trigger> {
    stage
        .instances()
        .filter(|entity| entity.hit_test(point))
        .flat_map(|entity| {
            root_events(stage, entity.id)
                .filter(move |(_, event)| matches!(event, EventKind::Mouse { button: b } if *b == button))
                .map(move |(root, _)| Trigger::new(entity, root))
        })
        .collect()
}

/// Seed variable-event memory with current values so nothing fires spuriously
/// on the first tick.
pub fn seed(stage: &Stage, state: &mut TriggerState) {
    for entity in stage.instances() {
        for (root, event) in root_events(stage, entity.id) {
            let value = match event {
                EventKind::VarChange { name, .. } => entity.variables.get(name),
                EventKind::GlobalVarChange { name, .. } => stage.globals.get(name),
                _ => continue,
            };
            state.seed(TriggerKey::new(entity.id, root), value);
        }
    }
}

/// First instance other than `entity` (matching `target`, if set) whose box
/// overlaps `entity`'s.
pub fn collision_partner(stage: &Stage, entity: &Entity, target: Option<EntityId>) -> Option<EntityId> {
    let bounds = entity.bounds();
    stage
        .instances()
        .filter(|other| other.id != entity.id)
        .filter(|other| target.map_or(true, |t| other.answers_to(t)))
        .find(|other| other.bounds().intersects(&bounds))
        .map(|other| other.id)
}

fn collides(stage: &Stage, entity: &Entity, target: Option<EntityId>) -> bool {
    collision_partner(stage, entity, target).is_some()
}
