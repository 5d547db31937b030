//! Polymorphic context values
//!
//! Template data is polymorphic over mappings, sequences, scalars, and
//! callables. Rather than duck typing, `Value` is an explicit tagged union
//! with capability queries implemented per concrete kind: the engine only
//! ever asks "is this iterable as a sequence", "is this callable", and
//! "is this truthy".

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Boxed error returned by lambdas and custom accessors
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result of invoking a lambda context value.
///
/// The returned value must be text or a number; anything else is a lambda
/// error at the call site.
pub type LambdaResult = Result<Value, BoxError>;

/// A callable context value. Invoked with `None` in variable position and
/// with `Some(raw_section_body)` in section position.
pub type LambdaFn = Arc<dyn Fn(Option<&str>) -> LambdaResult + Send + Sync>;

/// Caller-defined context value with named-field access.
///
/// This is the explicit interface behind attribute fallback: when a path
/// segment reaches an object, the resolver asks it for the field by name.
pub trait ContextObject: Send + Sync {
    /// Look up a named field.
    ///
    /// `Ok(None)` means the field is legitimately absent (the lookup falls
    /// through to outer scopes); `Err` means the accessor itself misbehaved
    /// and aborts the render.
    fn field(&self, name: &str) -> Result<Option<Value>, BoxError>;

    /// Textual form used by the default serializer
    fn to_text(&self) -> String {
        String::new()
    }
}

/// A context value: mapping, sequence, scalar, callable, or absent.
#[derive(Clone)]
pub enum Value {
    /// Absent / no value; falsy, serializes to empty text
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(HashMap<String, Value>),
    /// Text-producing hook; see [`LambdaFn`]
    Lambda(LambdaFn),
    /// Caller-defined accessor; see [`ContextObject`]
    Object(Arc<dyn ContextObject>),
}

impl Value {
    /// Truthiness decides whether sections fire. Empty strings, empty
    /// sequences, empty mappings, zero, and `Null` are falsy; lambdas and
    /// objects are always truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Integer(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Map(entries) => !entries.is_empty(),
            Value::Lambda(_) | Value::Object(_) => true,
        }
    }

    /// Only sequences iterate in section position; text and mappings are
    /// used as a single scope instead
    pub fn is_sequence(&self) -> bool {
        matches!(self, Value::List(_))
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Lambda(_))
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    /// Wrap a callable as a context value
    pub fn lambda<F>(function: F) -> Value
    where
        F: Fn(Option<&str>) -> LambdaResult + Send + Sync + 'static,
    {
        Value::Lambda(Arc::new(function))
    }

    /// Wrap a custom accessor as a context value
    pub fn object<T: ContextObject + 'static>(object: T) -> Value {
        Value::Object(Arc::new(object))
    }

    /// Convert any serializable type into a context value
    pub fn from_serialize<T: serde::Serialize>(value: &T) -> Result<Value, serde_json::Error> {
        Ok(serde_json::to_value(value)?.into())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Integer(n) => write!(f, "Integer({n})"),
            Value::Float(n) => write!(f, "Float({n})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::List(items) => f.debug_tuple("List").field(items).finish(),
            Value::Map(entries) => f.debug_tuple("Map").field(entries).finish(),
            Value::Lambda(_) => write!(f, "Lambda(..)"),
            Value::Object(_) => write!(f, "Object(..)"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            // Callables and objects compare by identity
            (Value::Lambda(a), Value::Lambda(b)) => {
                std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
            }
            (Value::Object(a), Value::Object(b)) => {
                std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
            }
            _ => false,
        }
    }
}

/// Stringification used by the default serializer: scalars print bare,
/// `Null` prints nothing, containers print their elements recursively.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Float(n) => write!(f, "{n}"),
            Value::Str(s) => f.write_str(s),
            Value::List(items) => {
                f.write_str("[")?;
                for (position, item) in items.iter().enumerate() {
                    if position > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Map(entries) => {
                let mut keys: Vec<&String> = entries.keys().collect();
                keys.sort();
                f.write_str("{")?;
                for (position, key) in keys.into_iter().enumerate() {
                    if position > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {}", entries[key])?;
                }
                f.write_str("}")
            }
            Value::Lambda(_) => f.write_str("<lambda>"),
            Value::Object(object) => f.write_str(&object.to_text()),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(value as i64)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl<V: Into<Value>> From<Vec<V>> for Value {
    fn from(items: Vec<V>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<V: Into<Value>> From<HashMap<String, V>> for Value {
    fn from(entries: HashMap<String, V>) -> Self {
        Value::Map(entries.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl<V: Into<Value>> From<Option<V>> for Value {
    fn from(value: Option<V>) -> Self {
        match value {
            Some(inner) => inner.into(),
            None => Value::Null,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(integer) => Value::Integer(integer),
                None => Value::Float(n.as_f64().unwrap_or(0.0)),
            },
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Into::into).collect())
            }
            serde_json::Value::Object(entries) => Value::Map(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, value.into()))
                    .collect(),
            ),
        }
    }
}
