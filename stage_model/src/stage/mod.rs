//! Stage state - templates, live instances, their scripts and the global variables.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::blocks::{ScriptGraph, ScriptStore};
use crate::entities::{Entity, EntityId, VariableMap};

/// Size of the play area in stage units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageSize {
    pub width: f64,
    pub height: f64,
}

impl Default for StageSize {
    fn default() -> Self {
        Self {
            width: 480.0,
            height: 360.0,
        }
    }
}

/// Everything the runtime reads and mutates.
///
/// Templates are authoring-time definitions. Stage instances are deep clones
/// of templates that live only while the stage is playing; each owns an
/// independent copy of its template's script graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Stage {
    pub size: StageSize,

    /// Shared by every entity, no namespacing.
    pub globals: VariableMap,

    templates: IndexMap<EntityId, Entity>,
    template_scripts: ScriptStore,

    /// Live instances in spawn order.
    instances: IndexMap<EntityId, Entity>,
    instance_scripts: ScriptStore,

    next_generation: u64,
}

impl Stage {
    /// Create a new empty stage.
    pub fn new(size: StageSize) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }

    /// Add a template with its script.
    pub fn add_template(&mut self, entity: Entity, script: ScriptGraph) -> EntityId {
        let id = entity.id;
        self.templates.insert(id, entity);
        self.template_scripts.insert(id, script);
        id
    }

    /// Remove a template and its script. Instances already on stage stay.
    pub fn remove_template(&mut self, id: EntityId) -> Option<Entity> {
        self.template_scripts.remove(id);
        self.templates.shift_remove(&id)
    }

    /// Look up a template by ID.
    pub fn template(&self, id: EntityId) -> Option<&Entity> {
        self.templates.get(&id)
    }

    /// Mutable access to a template; edits reach only future instances.
    pub fn template_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.templates.get_mut(&id)
    }

    /// Templates in authoring order.
    pub fn templates(&self) -> impl Iterator<Item = &Entity> {
        self.templates.values()
    }

    /// Replace all instances with fresh clones of every template.
    pub fn instantiate_all(&mut self) -> Vec<EntityId> {
        self.purge_instances();
        let ids: Vec<EntityId> = self.templates.keys().copied().collect();
        ids.into_iter()
            .filter_map(|template| self.spawn(template))
            .collect()
    }

    /// Clone `source` onto the stage. `source` may name a template or a live
    /// instance; templates win when both exist.
    pub fn spawn(&mut self, source: EntityId) -> Option<EntityId> {
        let (entity, script) = match self.templates.get(&source) {
            Some(template) => (template, self.template_scripts.get(source)),
            None => {
                let instance = self.instances.get(&source)?;
                (instance, self.instance_scripts.get(source))
            }
        };

        let mut instance = entity.clone_as_instance();
        let script = script.map(ScriptGraph::deep_clone).unwrap_or_default();

        self.next_generation += 1;
        instance.generation = self.next_generation;

        let id = instance.id;
        debug!(instance = %id, source = %source, generation = instance.generation, "spawned instance");
        self.instance_scripts.insert(id, script);
        self.instances.insert(id, instance);
        Some(id)
    }

    /// Remove an instance and its script.
    pub fn despawn(&mut self, id: EntityId) -> Option<Entity> {
        self.instance_scripts.remove(id);
        let removed = self.instances.shift_remove(&id);
        if removed.is_some() {
            debug!(instance = %id, "despawned instance");
        }
        removed
    }

    /// Drop every instance, as when play ends.
    pub fn purge_instances(&mut self) {
        self.instances.clear();
        self.instance_scripts.clear();
    }

    /// Look up a live instance by ID.
    pub fn instance(&self, id: EntityId) -> Option<&Entity> {
        self.instances.get(&id)
    }

    /// Mutable access to a live instance.
    pub fn instance_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.instances.get_mut(&id)
    }

    /// Live instances in stage order.
    pub fn instances(&self) -> impl Iterator<Item = &Entity> {
        self.instances.values()
    }

    /// Instance IDs in stage order, detached from the collection.
    pub fn instance_ids(&self) -> Vec<EntityId> {
        self.instances.keys().copied().collect()
    }

    /// Number of live instances.
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// The script owned by an instance.
    pub fn script(&self, id: EntityId) -> Option<&ScriptGraph> {
        self.instance_scripts.get(id)
    }

    /// Live instances cloned from `template`.
    pub fn instances_of(&self, template: EntityId) -> Vec<EntityId> {
        self.instances
            .values()
            .filter(|e| e.template == Some(template))
            .map(|e| e.id)
            .collect()
    }

    /// Resolve an instance ID or a template ID to a live instance.
    pub fn resolve_instance(&self, id: EntityId) -> Option<EntityId> {
        if self.instances.contains_key(&id) {
            return Some(id);
        }
        self.instances
            .values()
            .find(|e| e.template == Some(id))
            .map(|e| e.id)
    }

    /// Whether `id` is still on stage and has not been replaced since `generation`.
    pub fn is_live(&self, id: EntityId, generation: u64) -> bool {
        self.instances
            .get(&id)
            .is_some_and(|e| e.generation == generation)
    }
}
