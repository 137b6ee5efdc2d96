//! Per-(entity, event) memory used to decide when events fire.

use std::collections::HashMap;

use stage_model::{BlockId, EntityId};

/// Tolerance for "value equals target" on accumulated floats.
const VALUE_EPSILON: f64 = 1e-9;

/// Identifies one root event on one stage instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TriggerKey {
    pub entity: EntityId,
    pub event: BlockId,
}

impl TriggerKey {
    /// Create a key for `event` on `entity`.
    pub fn new(entity: EntityId, event: BlockId) -> Self {
        Self { entity, event }
    }
}

/// Last-fire times for `Tick` and last observed values for variable events.
#[derive(Debug, Clone, Default)]
pub struct TriggerState {
    last_fire: HashMap<TriggerKey, f64>,
    observed: HashMap<TriggerKey, f64>,
}

impl TriggerState {
    /// Create a new empty trigger state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Interval check for `Tick`. Fires at most once per call and never
    /// catches up on missed intervals; a key that never fired fires at once.
    pub fn interval_elapsed(&mut self, key: TriggerKey, interval_ms: f64, now_ms: f64) -> bool {
        let due = self
            .last_fire
            .get(&key)
            .map_or(true, |last| now_ms - last >= interval_ms);
        if due {
            self.last_fire.insert(key, now_ms);
        }
        due
    }

    /// Record `value` as already seen so the next observation cannot fire on it.
    pub fn seed(&mut self, key: TriggerKey, value: f64) {
        self.observed.insert(key, value);
    }

    /// Edge check for variable events: true only when the previous observation
    /// differed from `target` and this one equals it. The first observation of
    /// a key only seeds it.
    pub fn crossed_into(&mut self, key: TriggerKey, value: f64, target: f64) -> bool {
        let previous = self.observed.insert(key, value);
        match previous {
            Some(previous) => !approx_eq(previous, target) && approx_eq(value, target),
            None => false,
        }
    }

    /// Forget everything about entities for which `keep` returns false.
    pub fn retain_entities(&mut self, mut keep: impl FnMut(EntityId) -> bool) {
        self.last_fire.retain(|key, _| keep(key.entity));
        self.observed.retain(|key, _| keep(key.entity));
    }

    /// Forget everything, as when play restarts.
    pub fn clear(&mut self) {
        self.last_fire.clear();
        self.observed.clear();
    }
}

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < VALUE_EPSILON
}
