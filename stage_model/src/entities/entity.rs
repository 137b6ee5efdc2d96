//! Entity definitions.

use serde::{Deserialize, Serialize};

use super::{Appearance, Bounds, EntityId, Point, SpeechBubble, Transform, VariableMap};

/// A template or stage instance with all of its runtime state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,

    /// Template this instance was cloned from. `None` for templates themselves.
    pub template: Option<EntityId>,

    /// Liveness generation assigned when the entity enters the stage.
    #[serde(default)]
    pub generation: u64,

    pub transform: Transform,
    pub appearance: Appearance,
    pub variables: VariableMap,

    #[serde(skip)]
    pub speech: Option<SpeechBubble>,
}

impl Entity {
    /// Create a new entity with the given name and default appearance.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(),
            name: name.into(),
            template: None,
            generation: 0,
            transform: Transform::default(),
            appearance: Appearance::default(),
            variables: VariableMap::new(),
            speech: None,
        }
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.transform.x = x;
        self.transform.y = y;
        self
    }

    pub fn with_appearance(mut self, appearance: Appearance) -> Self {
        self.appearance = appearance;
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: f64) -> Self {
        self.variables.set(name, value);
        self
    }

    pub fn bounds(&self) -> Bounds {
        Bounds {
            x: self.transform.x,
            y: self.transform.y,
            width: self.appearance.width(),
            height: self.appearance.height(),
        }
    }

    pub fn hit_test(&self, point: Point) -> bool {
        self.bounds().contains(self.appearance.shape, point)
    }

    /// Translate, then clamp into `[0, stage - size]` on both axes.
    pub fn move_by(&mut self, dx: f64, dy: f64, stage_width: f64, stage_height: f64) {
        let max_x = (stage_width - self.appearance.width()).max(0.0);
        let max_y = (stage_height - self.appearance.height()).max(0.0);
        self.transform.x = (self.transform.x + dx).clamp(0.0, max_x);
        self.transform.y = (self.transform.y + dy).clamp(0.0, max_y);
    }

    pub fn say(&mut self, text: impl Into<String>, now_ms: f64, seconds: f64) {
        self.speech = Some(SpeechBubble {
            text: text.into(),
            expires_at_ms: now_ms + seconds * 1000.0,
        });
    }

    /// Speech text, if the bubble has not expired yet.
    pub fn visible_speech(&self, now_ms: f64) -> Option<&str> {
        self.speech
            .as_ref()
            .filter(|bubble| now_ms < bubble.expires_at_ms)
            .map(|bubble| bubble.text.as_str())
    }

    /// Independent copy with a fresh identity, remembering its source.
    pub fn clone_as_instance(&self) -> Self {
        let mut instance = self.clone();
        instance.id = EntityId::new();
        instance.template = Some(self.template.unwrap_or(self.id));
        instance.speech = None;
        instance
    }

    /// Whether this entity is `id` or was cloned from it.
    pub fn answers_to(&self, id: EntityId) -> bool {
        self.id == id || self.template == Some(id)
    }
}
