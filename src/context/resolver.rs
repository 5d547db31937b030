//! Dotted-path resolution against the scope stack
//!
//! Lookup walks three layers: `get` for one segment against one container,
//! `deep_get` for a dotted path against one scope, and `get_from_stack` for
//! a path against the whole stack, innermost first. Innermost-defined keys
//! always shadow outer ones.

use crate::context::value::Value;

/// Why a lookup failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The path is not defined in the searched scope(s)
    Missing(String),
    /// A custom accessor failed while being queried; distinct from the
    /// value being legitimately absent, and never absorbed by handlers
    Access { path: String, message: String },
}

/// Fetch one path segment from a container: keyed access on mappings,
/// integer-index access on sequences (negative counts from the end),
/// named-field access on objects.
pub fn get(container: &Value, key: &str) -> Result<Value, ResolveError> {
    let missing = || ResolveError::Missing(key.to_string());

    match container {
        Value::Map(entries) => entries.get(key).cloned().ok_or_else(missing),
        Value::List(items) => {
            let index: i64 = key.parse().map_err(|_| missing())?;
            let index = if index < 0 {
                index + items.len() as i64
            } else {
                index
            };
            usize::try_from(index)
                .ok()
                .and_then(|at| items.get(at))
                .cloned()
                .ok_or_else(missing)
        }
        Value::Object(object) => match object.field(key) {
            Ok(Some(value)) => Ok(value),
            Ok(None) => Err(missing()),
            Err(source) => Err(ResolveError::Access {
                path: key.to_string(),
                message: source.to_string(),
            }),
        },
        _ => Err(missing()),
    }
}

/// Walk a dotted path down one scope.
///
/// The path `.` is the implicit iterator: it returns the scope unchanged,
/// bypassing `get`. A missing first segment propagates; a missing later
/// segment after at least one success degrades to `Null` instead of an
/// error, so deep paths fail softly once their head resolves.
pub fn deep_get(scope: &Value, path: &str) -> Result<Value, ResolveError> {
    if path == "." {
        return Ok(scope.clone());
    }

    let mut value = scope.clone();
    let mut matched = false;
    for segment in path.split('.') {
        match get(&value, segment) {
            Ok(next) => {
                value = next;
                matched = true;
            }
            Err(ResolveError::Missing(_)) if matched => return Ok(Value::Null),
            Err(err) => return Err(err),
        }
    }
    Ok(value)
}

/// Resolve a path against the stack, innermost scope first. The first scope
/// whose `deep_get` succeeds wins; if every scope misses, the whole path is
/// missing. Accessor failures propagate immediately.
pub fn get_from_stack(stack: &[Value], path: &str) -> Result<Value, ResolveError> {
    for scope in stack.iter().rev() {
        match deep_get(scope, path) {
            Ok(value) => return Ok(value),
            Err(ResolveError::Missing(_)) => continue,
            Err(err) => return Err(err),
        }
    }
    Err(ResolveError::Missing(path.to_string()))
}
