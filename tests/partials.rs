//! Integration tests for partial inclusion, re-indentation, and
//! inheritance tags (parent blocks and substitution placeholders)

use antlers::{handlers, render, render_with_options, RenderError, RenderOptions};
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn test_partial_renders_against_current_scope() {
    let options = RenderOptions::new().with_partial("user", "{{name}}");
    assert_eq!(
        render_with_options("{{>user}}", json!({"name": "Ada"}), &options).unwrap(),
        "Ada"
    );
}

#[test]
fn test_partial_inside_section_sees_element_scope() {
    let options = RenderOptions::new().with_partial("item", "({{label}})");
    assert_eq!(
        render_with_options(
            "{{#items}}{{>item}}{{/items}}",
            json!({"items": [{"label": "a"}, {"label": "b"}]}),
            &options,
        )
        .unwrap(),
        "(a)(b)"
    );
}

#[test]
fn test_standalone_partial_reindents_every_line() {
    let options = RenderOptions::new().with_partial("steps", "one\ntwo\n");
    assert_eq!(
        render_with_options("plan:\n  {{>steps}}\n", json!({}), &options).unwrap(),
        "plan:\n  one\n  two\n"
    );
}

#[test]
fn test_trailing_newline_final_line_is_not_indented() {
    let options = RenderOptions::new().with_partial("body", "a\nb\n");
    let out = render_with_options("  {{>body}}\n", json!({}), &options).unwrap();
    // Every content line gains the two-space indent; the empty line the
    // trailing newline produces does not
    assert_eq!(out, "  a\n  b\n");
}

#[test]
fn test_partial_without_trailing_newline() {
    let options = RenderOptions::new().with_partial("body", "a\nb");
    assert_eq!(
        render_with_options("  {{>body}}\n", json!({}), &options).unwrap(),
        "  a\n  b"
    );
}

#[test]
fn test_inline_partial_is_not_indented() {
    let options = RenderOptions::new().with_partial("word", "x\ny");
    assert_eq!(
        render_with_options("a {{>word}} b", json!({}), &options).unwrap(),
        "a x\ny b"
    );
}

#[test]
fn test_recursive_partial_with_section_guard() {
    let options = RenderOptions::new()
        .with_partial("node", "{{value}}{{#child}}-{{>node}}{{/child}}");
    assert_eq!(
        render_with_options(
            "{{>node}}",
            json!({"value": 1, "child": {"value": 2, "child": {"value": 3}}}),
            &options,
        )
        .unwrap(),
        "1-2-3"
    );
}

#[test]
fn test_partial_resets_delimiters_to_default() {
    // The including template switched delimiters; the partial still uses
    // the stock pair
    let options = RenderOptions::new().with_partial("p", "{{x}}");
    assert_eq!(
        render_with_options("{{=[[ ]]=}}[[>p]]", json!({"x": 9}), &options).unwrap(),
        "9"
    );
}

#[test]
fn test_missing_partial_renders_empty_by_default() {
    assert_eq!(render("a{{>ghost}}b", json!({})).unwrap(), "ab");
}

#[test]
fn test_missing_partial_keep_handler() {
    let options = RenderOptions::new().with_missing_partial(handlers::missing_partial_keep());
    assert_eq!(
        render_with_options("{{>ghost}}", json!({}), &options).unwrap(),
        "{{ ghost }}"
    );
}

#[test]
fn test_missing_partial_error_handler() {
    let options = RenderOptions::new().with_missing_partial(handlers::missing_partial_error());
    let err = render_with_options("{{>ghost}}", json!({}), &options).unwrap_err();
    assert!(matches!(err, RenderError::MissingPartial(name) if name == "ghost"));
}

#[test]
fn test_handlers_thread_into_partials() {
    // A missing variable inside an included partial still reaches the
    // caller's handler
    let options = RenderOptions::new()
        .with_partial("inner", "[{{ghost}}]")
        .with_missing_variable(handlers::missing_variable_keep());
    assert_eq!(
        render_with_options("{{>inner}}", json!({}), &options).unwrap(),
        "[{{ ghost }}]"
    );
}

#[test]
fn test_parent_block_includes_parent_and_skips_body() {
    let options = RenderOptions::new().with_partial("base", "BASE");
    assert_eq!(
        render_with_options(
            "a{{<base}}override text{{/base}}b",
            json!({}),
            &options,
        )
        .unwrap(),
        "aBASEb"
    );
}

#[test]
fn test_parent_block_body_may_contain_tags() {
    // The skipped body is never evaluated, tags included
    let options = RenderOptions::new().with_partial("base", "B");
    assert_eq!(
        render_with_options(
            "{{<base}}{{$slot}}x{{/slot}}{{/base}}",
            json!({}),
            &options,
        )
        .unwrap(),
        "B"
    );
}

#[test]
fn test_substitution_block_renders_in_place() {
    assert_eq!(
        render("{{$title}}Untitled {{n}}{{/title}}", json!({"n": 4})).unwrap(),
        "Untitled 4"
    );
}
