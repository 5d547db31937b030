//! Error types for tokenizing and rendering

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

/// Byte range in template source text
pub type Span = std::ops::Range<usize>;

/// Compute the 1-based line number of a byte offset in a template.
pub(crate) fn line_number(template: &str, offset: usize) -> usize {
    let offset = offset.min(template.len());
    template[..offset].matches('\n').count() + 1
}

/// Errors raised while lexing or balancing tags.
///
/// Every variant carries the 1-based line number of the offending tag and
/// its byte offset in the source.
#[derive(Debug, Error)]
pub enum SyntaxError {
    /// A tag was opened but its right delimiter never appeared
    #[error("unclosed tag on line {line}")]
    UnclosedTag { line: usize, offset: usize },

    /// A section close did not match the innermost open section
    #[error("unexpected section end tag on line {line}: expected \"{expected}\", got \"{found}\"")]
    MismatchedSectionEnd {
        expected: String,
        found: String,
        line: usize,
        offset: usize,
    },

    /// A section close appeared with no section open
    #[error("unexpected section end tag \"{found}\" on line {line}")]
    UnexpectedSectionEnd {
        found: String,
        line: usize,
        offset: usize,
    },

    /// A section was opened but its end tag never appeared
    #[error("unclosed section \"{name}\" beginning on line {line}")]
    UnclosedSection {
        name: String,
        line: usize,
        offset: usize,
    },
}

impl SyntaxError {
    /// Byte offset of the offending tag
    pub fn offset(&self) -> usize {
        match self {
            SyntaxError::UnclosedTag { offset, .. }
            | SyntaxError::MismatchedSectionEnd { offset, .. }
            | SyntaxError::UnexpectedSectionEnd { offset, .. }
            | SyntaxError::UnclosedSection { offset, .. } => *offset,
        }
    }

    /// 1-based line number of the offending tag
    pub fn line(&self) -> usize {
        match self {
            SyntaxError::UnclosedTag { line, .. }
            | SyntaxError::MismatchedSectionEnd { line, .. }
            | SyntaxError::UnexpectedSectionEnd { line, .. }
            | SyntaxError::UnclosedSection { line, .. } => *line,
        }
    }

    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        let start = self.offset().min(source.len());
        let end = (start + 1).min(source.len());
        let span = start..end.max(start);

        let mut buf = Vec::new();
        Report::build(ReportKind::Error, filename, span.start)
            .with_message(self.to_string())
            .with_label(
                Label::new((filename, span))
                    .with_message(self.to_string())
                    .with_color(Color::Red),
            )
            .finish()
            .write((filename, Source::from(source)), &mut buf)
            .unwrap();
        String::from_utf8(buf).unwrap()
    }
}

/// Errors that can abort a render call.
///
/// Per-lookup misses are absorbed by the configured missing-variable and
/// missing-partial handlers before they can escape the engine; the variants
/// here surface only when a handler chooses to raise, or for failures that
/// have no local recovery. A render that fails produces no partial output.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Malformed template text
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    /// A variable path resolved in no scope and the handler raised
    #[error("missing variable \"{0}\"")]
    MissingVariable(String),

    /// A partial name had no entry and the handler raised
    #[error("missing partial \"{0}\"")]
    MissingPartial(String),

    /// A custom accessor failed while being queried, as opposed to the
    /// value being legitimately absent
    #[error("error accessing \"{path}\": {message}")]
    ContextAccess { path: String, message: String },

    /// A bound callable failed or returned a value that is not text or a number
    #[error("lambda \"{name}\" failed: {message}")]
    Lambda { name: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_number() {
        assert_eq!(line_number("no newlines", 5), 1);
        assert_eq!(line_number("a\nb\nc", 0), 1);
        assert_eq!(line_number("a\nb\nc", 2), 2);
        assert_eq!(line_number("a\nb\nc", 4), 3);
        // Offsets past the end clamp to the last line
        assert_eq!(line_number("a\nb", 100), 2);
    }

    #[test]
    fn test_syntax_error_messages() {
        let err = SyntaxError::UnclosedTag { line: 3, offset: 17 };
        assert_eq!(err.to_string(), "unclosed tag on line 3");

        let err = SyntaxError::MismatchedSectionEnd {
            expected: "outer".to_string(),
            found: "inner".to_string(),
            line: 1,
            offset: 13,
        };
        assert_eq!(
            err.to_string(),
            "unexpected section end tag on line 1: expected \"outer\", got \"inner\""
        );

        let err = SyntaxError::UnclosedSection {
            name: "items".to_string(),
            line: 2,
            offset: 8,
        };
        assert_eq!(
            err.to_string(),
            "unclosed section \"items\" beginning on line 2"
        );
    }

    #[test]
    fn test_format_includes_source_context() {
        let source = "hello {{ world";
        let err = SyntaxError::UnclosedTag { line: 1, offset: 6 };
        let report = err.format(source, "template.tpl");
        assert!(report.contains("unclosed tag on line 1"));
        assert!(report.contains("template.tpl"));
    }

    #[test]
    fn test_render_error_wraps_syntax_error() {
        let err: RenderError = SyntaxError::UnclosedTag { line: 1, offset: 0 }.into();
        assert!(matches!(err, RenderError::Syntax(_)));
        assert_eq!(err.to_string(), "unclosed tag on line 1");
    }
}
