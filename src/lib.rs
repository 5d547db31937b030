//! antlers - a logic-less text templating engine
//!
//! This library renders templates by substituting values from a layered
//! data context, with conditional and repeating sections, inverted
//! sections, sub-template inclusion (partials), lambdas, comments,
//! mid-template delimiter redefinition, and configurable output escaping.
//!
//! # Example
//!
//! ```rust
//! use antlers::render;
//! use serde_json::json;
//!
//! let out = render("Hello, {{name}}!", json!({"name": "world"})).unwrap();
//! assert_eq!(out, "Hello, world!");
//! ```
//!
//! Sections repeat over sequences and scope into mappings:
//!
//! ```rust
//! use antlers::render;
//! use serde_json::json;
//!
//! let out = render(
//!     "{{#items}}{{.}},{{/items}}",
//!     json!({"items": [1, 2, 3]}),
//! ).unwrap();
//! assert_eq!(out, "1,2,3,");
//! ```

pub mod context;
pub mod error;
pub mod handlers;
pub mod renderer;
pub mod tokenizer;

pub use context::{BoxError, ContextObject, LambdaResult, Value};
pub use error::{RenderError, SyntaxError};
pub use handlers::{MissingHandler, Serializer};
pub use tokenizer::{Delimiters, Token, Tokenizer};

use std::collections::HashMap;
use std::fmt;

/// Configuration for a render call
///
/// Everything here is read-only for the duration of a render and threaded
/// unchanged through recursive sub-renders (partials, lambdas, parent
/// blocks); the delimiter pair alone is reset to the default inside
/// included partials.
#[derive(Clone)]
pub struct RenderOptions {
    /// Converts resolved values to output text
    pub serializer: Serializer,
    /// Named sub-templates for `{{>name}}` inclusion
    pub partials: HashMap<String, String>,
    /// Invoked when a variable path resolves in no scope
    pub missing_variable: MissingHandler,
    /// Invoked when a partial name has no table entry
    pub missing_partial: MissingHandler,
    /// Initial delimiter pair; a set-delimiter tag can change it mid-render
    pub delimiters: Delimiters,
    /// Escape `&`, `<`, `>`, `"`, `'` in variable-tag output
    pub escape_output: bool,
    /// Tokenize the whole template up front; a pure caching hint that
    /// never changes output
    pub precompute_tokens: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            serializer: handlers::default_serializer(),
            partials: HashMap::new(),
            missing_variable: handlers::missing_variable_empty(),
            missing_partial: handlers::missing_partial_empty(),
            delimiters: Delimiters::default(),
            escape_output: true,
            precompute_tokens: false,
        }
    }
}

impl fmt::Debug for RenderOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderOptions")
            .field("partials", &self.partials.keys())
            .field("delimiters", &self.delimiters)
            .field("escape_output", &self.escape_output)
            .field("precompute_tokens", &self.precompute_tokens)
            .finish_non_exhaustive()
    }
}

impl RenderOptions {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the value serializer
    pub fn with_serializer(mut self, serializer: Serializer) -> Self {
        self.serializer = serializer;
        self
    }

    /// Replace the partial table
    pub fn with_partials(mut self, partials: HashMap<String, String>) -> Self {
        self.partials = partials;
        self
    }

    /// Register a single named partial
    pub fn with_partial(mut self, name: impl Into<String>, template: impl Into<String>) -> Self {
        self.partials.insert(name.into(), template.into());
        self
    }

    /// Set the missing-variable handler
    pub fn with_missing_variable(mut self, handler: MissingHandler) -> Self {
        self.missing_variable = handler;
        self
    }

    /// Set the missing-partial handler
    pub fn with_missing_partial(mut self, handler: MissingHandler) -> Self {
        self.missing_partial = handler;
        self
    }

    /// Override the initial delimiter pair
    pub fn with_delimiters(mut self, left: impl Into<String>, right: impl Into<String>) -> Self {
        self.delimiters = Delimiters::new(left, right);
        self
    }

    /// Enable or disable output escaping for variable tags
    pub fn with_escape_output(mut self, escape: bool) -> Self {
        self.escape_output = escape;
        self
    }

    /// Tokenize the whole template up front instead of lazily
    pub fn with_precompute_tokens(mut self, precompute: bool) -> Self {
        self.precompute_tokens = precompute;
        self
    }
}

/// Render a template against a context with default options
///
/// This is the main entry point for the library. Missing variables render
/// as empty text, output escaping is on, and there are no partials; use
/// [`render_with_options`] to change any of that.
///
/// # Example
///
/// ```rust
/// use antlers::render;
/// use serde_json::json;
///
/// let out = render(
///     "{{#tasks}}- {{title}}\n{{/tasks}}",
///     json!({"tasks": [{"title": "write"}, {"title": "ship"}]}),
/// ).unwrap();
/// assert_eq!(out, "- write\n- ship\n");
/// ```
pub fn render(template: &str, context: impl Into<Value>) -> Result<String, RenderError> {
    render_with_options(template, context, &RenderOptions::default())
}

/// Render a template with custom options
///
/// # Example
///
/// ```rust
/// use antlers::{render_with_options, RenderOptions};
/// use serde_json::json;
///
/// let options = RenderOptions::new()
///     .with_partial("greeting", "Hello, {{name}}")
///     .with_escape_output(false);
///
/// let out = render_with_options(
///     "{{>greeting}} & goodbye",
///     json!({"name": "world"}),
///     &options,
/// ).unwrap();
/// assert_eq!(out, "Hello, world & goodbye");
/// ```
pub fn render_with_options(
    template: &str,
    context: impl Into<Value>,
    options: &RenderOptions,
) -> Result<String, RenderError> {
    renderer::render_template(template, context.into(), options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_simple_variable() {
        let out = render("Hello, {{name}}!", json!({"name": "moose"})).unwrap();
        assert_eq!(out, "Hello, moose!");
    }

    #[test]
    fn test_render_empty_context() {
        let out = render("{{ missing }} text", json!({})).unwrap();
        assert_eq!(out, " text");
    }

    #[test]
    fn test_render_with_partials() {
        let options = RenderOptions::new().with_partial("user", "{{name}} <{{email}}>");
        let out = render_with_options(
            "{{>user}}",
            json!({"name": "Ada", "email": "ada@example.com"}),
            &options,
        )
        .unwrap();
        assert_eq!(out, "Ada <ada@example.com>");
    }

    #[test]
    fn test_render_custom_delimiters() {
        let options = RenderOptions::new().with_delimiters("<%", "%>");
        let out = render_with_options("<% x %>", json!({"x": 5}), &options).unwrap();
        assert_eq!(out, "5");
    }

    #[test]
    fn test_render_syntax_error() {
        let result = render("{{ broken", json!({}));
        assert!(matches!(result, Err(RenderError::Syntax(_))));
    }

    #[test]
    fn test_options_are_reusable_across_renders() {
        let options = RenderOptions::new().with_escape_output(false);
        assert_eq!(
            render_with_options("{{x}}", json!({"x": "<a>"}), &options).unwrap(),
            "<a>"
        );
        assert_eq!(
            render_with_options("{{x}}", json!({"x": "<b>"}), &options).unwrap(),
            "<b>"
        );
    }
}
