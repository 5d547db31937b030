//! Integration tests for the handler bundle: missing-value policies,
//! custom serialization, and error propagation

use antlers::{
    handlers, render, render_with_options, BoxError, ContextObject, RenderError, RenderOptions,
    Value,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

#[test]
fn test_missing_variable_default_is_empty() {
    assert_eq!(render("{{ variable }}", json!({})).unwrap(), "");
}

#[test]
fn test_missing_variable_keep() {
    let options = RenderOptions::new().with_missing_variable(handlers::missing_variable_keep());
    assert_eq!(
        render_with_options("{{ variable }}", json!({}), &options).unwrap(),
        "{{ variable }}"
    );
}

#[test]
fn test_missing_variable_error_aborts() {
    let options = RenderOptions::new().with_missing_variable(handlers::missing_variable_error());
    let err = render_with_options("{{ variable }}", json!({}), &options).unwrap_err();
    assert!(matches!(err, RenderError::MissingVariable(name) if name == "variable"));
}

#[test]
fn test_handler_receives_bare_name_and_spelling() {
    let options = RenderOptions::new().with_missing_variable(Arc::new(|name, tag| {
        Ok(format!("<{name}|{tag}>"))
    }));
    assert_eq!(
        render_with_options("{{ghost}}", json!({}), &options).unwrap(),
        "&lt;ghost|{{ ghost }}&gt;"
    );
}

#[test]
fn test_handler_text_feeds_section_truthiness() {
    // A non-empty substitution makes the section fire
    let options = RenderOptions::new().with_missing_variable(handlers::missing_variable_keep());
    assert_eq!(
        render_with_options("{{#ghost}}on{{/ghost}}", json!({}), &options).unwrap(),
        "on"
    );
}

#[test]
fn test_custom_serializer_applies_to_every_variable() {
    let options = RenderOptions::new().with_serializer(Arc::new(|value: &Value| {
        format!("[{value}]")
    }));
    assert_eq!(
        render_with_options("{{a}} {{b}}", json!({"a": 1, "b": "x"}), &options).unwrap(),
        "[1] [x]"
    );
}

#[test]
fn test_failing_render_returns_no_partial_output() {
    // The first variable resolves, the second aborts; the call yields only
    // the error
    let options = RenderOptions::new().with_missing_variable(handlers::missing_variable_error());
    let result = render_with_options("{{a}} then {{ghost}}", json!({"a": 1}), &options);
    assert!(matches!(result, Err(RenderError::MissingVariable(_))));
}

#[test]
fn test_lambda_failure_aborts() {
    let context = Value::Map(
        [(
            "boom".to_string(),
            Value::lambda(|_| Err("exploded".into())),
        )]
        .into_iter()
        .collect(),
    );
    let err = render("{{boom}}", context).unwrap_err();
    let RenderError::Lambda { name, message } = err else {
        panic!("expected a lambda error");
    };
    assert_eq!(name, "boom");
    assert_eq!(message, "exploded");
}

#[test]
fn test_lambda_bad_return_type_aborts() {
    let context = Value::Map(
        [(
            "func".to_string(),
            Value::lambda(|_| Ok(Value::from(vec![1, 2]))),
        )]
        .into_iter()
        .collect(),
    );
    let err = render("{{ func }}", context).unwrap_err();
    assert!(matches!(err, RenderError::Lambda { name, .. } if name == "func"));
}

struct Flaky;

impl ContextObject for Flaky {
    fn field(&self, _name: &str) -> Result<Option<Value>, BoxError> {
        Err("connection reset".into())
    }
}

#[test]
fn test_accessor_failure_is_not_a_missing_variable() {
    // A misbehaving accessor aborts instead of falling back to the handler
    let context = Value::Map(
        [("flaky".to_string(), Value::object(Flaky))]
            .into_iter()
            .collect(),
    );
    let err = render("{{flaky.field}}", context).unwrap_err();
    let RenderError::ContextAccess { message, .. } = err else {
        panic!("expected a context access error");
    };
    assert_eq!(message, "connection reset");
}

#[test]
fn test_errors_cross_partial_boundaries_unchanged() {
    let options = RenderOptions::new()
        .with_partial("inner", "{{ghost}}")
        .with_missing_variable(handlers::missing_variable_error());
    let err = render_with_options("{{>inner}}", json!({}), &options).unwrap_err();
    assert!(matches!(err, RenderError::MissingVariable(name) if name == "ghost"));
}

#[test]
fn test_errors_cross_lambda_boundaries_unchanged() {
    let context = Value::Map(
        [(
            "outer".to_string(),
            Value::lambda(|_| Ok(Value::from("{{#oops}}{{/mismatch}}"))),
        )]
        .into_iter()
        .collect(),
    );
    let err = render("{{outer}}", context).unwrap_err();
    assert!(matches!(err, RenderError::Syntax(_)));
}
