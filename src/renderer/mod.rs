//! Render engine for producing output text from templates
//!
//! This module consumes the token stream, maintains the context and
//! environment stacks, and dispatches each token kind; see
//! [`crate::render_with_options`] for the public entry point.

mod engine;

pub(crate) use engine::render_template;
