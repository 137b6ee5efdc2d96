//! Coercion of loosely-typed editor arguments into typed block fields.
//!
//! The editor stores block arguments as JSON values typed in by users, so a
//! number may arrive as `3`, `"3"`, `" 3.5 "` or garbage. Every helper here
//! falls back to the caller's default instead of failing.

use serde_json::{Map, Value};
use tracing::debug;

use crate::entities::EntityId;

/// Raw argument bag attached to a block by the editor.
pub type RawArgs = Map<String, Value>;

/// Read a finite number, accepting numeric strings.
pub fn number(args: &RawArgs, key: &str, default: f64) -> f64 {
    let Some(value) = args.get(key) else {
        return default;
    };
    match coerce_number(value) {
        Some(n) => n,
        None => {
            debug!(key, ?value, default, "argument is not a number, using default");
            default
        }
    }
}

/// Like [`number`], but negative values also fall back to the default.
pub fn non_negative(args: &RawArgs, key: &str, default: f64) -> f64 {
    let n = number(args, key, default);
    if n < 0.0 {
        debug!(key, n, default, "negative argument, using default");
        default
    } else {
        n
    }
}

/// Read text; numbers and booleans are rendered as text.
pub fn text(args: &RawArgs, key: &str, default: &str) -> String {
    match args.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => default.to_string(),
    }
}

/// Read an optional entity reference. Empty or malformed IDs mean "none".
pub fn entity_id(args: &RawArgs, key: &str) -> Option<EntityId> {
    match args.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => {
            let parsed = EntityId::parse(s);
            if parsed.is_none() {
                debug!(key, value = %s, "unparseable entity reference, ignoring");
            }
            parsed
        }
        _ => None,
    }
}

pub fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Normalise a kind name so `var_change`, `VarChange` and `var-change` match.
pub(crate) fn normalize_kind(kind: &str) -> String {
    kind.chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}
