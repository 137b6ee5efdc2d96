//! Component definitions for entities.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A point in stage coordinates (origin top-left, y grows downward).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Position and rotation of an entity. `x`/`y` is the top-left corner of its box.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Transform {
    pub x: f64,
    pub y: f64,
    /// Degrees, unbounded.
    pub rotation: f64,
}

/// Drawable shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Shape {
    #[default]
    Rect,
    Circle,
}

/// Visual state of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appearance {
    pub shape: Shape,
    pub color: String,
    width: f64,
    height: f64,
    opacity: f64,
}

impl Default for Appearance {
    fn default() -> Self {
        Self {
            shape: Shape::Rect,
            color: "#4a90d9".to_string(),
            width: 50.0,
            height: 50.0,
            opacity: 1.0,
        }
    }
}

impl Appearance {
    pub fn new(shape: Shape, color: impl Into<String>, width: f64, height: f64) -> Self {
        let mut appearance = Self {
            shape,
            color: color.into(),
            ..Self::default()
        };
        appearance.set_size(width, height);
        appearance
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    /// Replace both dimensions; negative values clamp to zero.
    pub fn set_size(&mut self, width: f64, height: f64) {
        if width.is_finite() {
            self.width = width.max(0.0);
        }
        if height.is_finite() {
            self.height = height.max(0.0);
        }
    }

    pub fn scale_by(&mut self, factor: f64) {
        self.set_size(self.width * factor, self.height * factor);
    }

    /// Set opacity, clamped to `[0, 1]`.
    pub fn set_opacity(&mut self, opacity: f64) {
        if opacity.is_finite() {
            self.opacity = opacity.clamp(0.0, 1.0);
        }
    }

    pub fn change_opacity(&mut self, delta: f64) {
        self.set_opacity(self.opacity + delta);
    }
}

/// Axis-aligned bounding box. Rotation is not taken into account.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    /// Strict overlap; boxes that only share an edge do not intersect.
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.x < other.x + other.width
            && self.x + self.width > other.x
            && self.y < other.y + other.height
            && self.y + self.height > other.y
    }

    /// True when the box touches or crosses any side of a `width × height` stage.
    pub fn touches_edge(&self, stage_width: f64, stage_height: f64) -> bool {
        self.x <= 0.0
            || self.y <= 0.0
            || self.x + self.width >= stage_width
            || self.y + self.height >= stage_height
    }

    /// Hit test against the shape drawn inside this box.
    pub fn contains(&self, shape: Shape, point: Point) -> bool {
        match shape {
            Shape::Rect => {
                point.x >= self.x
                    && point.x <= self.x + self.width
                    && point.y >= self.y
                    && point.y <= self.y + self.height
            }
            Shape::Circle => {
                let rx = self.width / 2.0;
                let ry = self.height / 2.0;
                if rx <= 0.0 || ry <= 0.0 {
                    return false;
                }
                let dx = (point.x - (self.x + rx)) / rx;
                let dy = (point.y - (self.y + ry)) / ry;
                dx * dx + dy * dy <= 1.0
            }
        }
    }
}

/// Transient speech bubble, display only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechBubble {
    pub text: String,
    /// Runtime clock milliseconds after which the bubble is hidden.
    pub expires_at_ms: f64,
}

/// Numeric variables keyed by name. Missing names read as zero.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VariableMap {
    values: HashMap<String, f64>,
}

impl VariableMap {
    /// Create a new empty variable map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of `name`, or zero if it was never set.
    pub fn get(&self, name: &str) -> f64 {
        self.values.get(name).copied().unwrap_or(0.0)
    }

    /// Overwrite a variable, creating it if needed.
    pub fn set(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    /// Add `delta` to a variable, starting from zero if it is missing.
    pub fn change(&mut self, name: &str, delta: f64) {
        let current = self.values.entry(name.to_string()).or_insert(0.0);
        *current += delta;
    }
}
