//! Caller-supplied hooks threaded through a render call
//!
//! The serializer and the two missing-value handlers are pure functions,
//! read-only for the duration of a render, and passed unchanged into every
//! recursive sub-render (partials, lambdas, parent blocks). A handler's
//! returned text substitutes for the missing value; a handler that returns
//! an error aborts the whole render.

use std::sync::Arc;

use crate::context::Value;
use crate::error::RenderError;

/// Serializes a resolved value to output text
pub type Serializer = Arc<dyn Fn(&Value) -> String + Send + Sync>;

/// Invoked with `(bare_name, original_tag_spelling)` when a variable or
/// partial lookup misses everywhere
pub type MissingHandler = Arc<dyn Fn(&str, &str) -> Result<String, RenderError> + Send + Sync>;

/// Stringify values with [`Value`]'s own display form
pub fn default_serializer() -> Serializer {
    Arc::new(|value| value.to_string())
}

/// Missing variables render as empty text (the default policy)
pub fn missing_variable_empty() -> MissingHandler {
    Arc::new(|_, _| Ok(String::new()))
}

/// Missing variables keep their tag spelling in the output
pub fn missing_variable_keep() -> MissingHandler {
    Arc::new(|_, tag| Ok(tag.to_string()))
}

/// Missing variables abort the render
pub fn missing_variable_error() -> MissingHandler {
    Arc::new(|name, _| Err(RenderError::MissingVariable(name.to_string())))
}

/// Missing partials render as empty text (the default policy)
pub fn missing_partial_empty() -> MissingHandler {
    Arc::new(|_, _| Ok(String::new()))
}

/// Missing partials keep their tag spelling in the output
pub fn missing_partial_keep() -> MissingHandler {
    Arc::new(|_, tag| Ok(tag.to_string()))
}

/// Missing partials abort the render
pub fn missing_partial_error() -> MissingHandler {
    Arc::new(|name, _| Err(RenderError::MissingPartial(name.to_string())))
}
