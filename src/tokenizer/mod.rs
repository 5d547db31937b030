//! Tokenizer for the templating language
//!
//! Lexes raw template text into a forward-only sequence of typed tags and
//! literal spans. The lexer is restartable from any byte offset, which the
//! render engine relies on to replay section bodies per sequence element.
//! The delimiter pair is part of lexer state: a set-delimiter tag takes
//! effect immediately for all subsequent tokenization, which is why tags
//! cannot be recognized by a static pattern.

use crate::error::{line_number, Span, SyntaxError};

/// The left/right tag boundary markers, changeable mid-template.
///
/// Delimiter state is render-local; it is threaded by value through the
/// tokenizer and engine and never persisted back into the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delimiters {
    pub left: String,
    pub right: String,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            left: "{{".to_string(),
            right: "}}".to_string(),
        }
    }
}

impl Delimiters {
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
        }
    }

    /// Original tag spelling reported to missing-value handlers
    pub(crate) fn spell(&self, name: &str) -> String {
        format!("{} {} {}", self.left, name, self.right)
    }
}

/// A lexed template token.
///
/// Comments are consumed during lexing (they still participate in
/// standalone-whitespace trimming) and never appear in the stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Verbatim text between tags
    Literal(String),
    /// `{{name}}` — interpolation through the escaping policy
    Variable(String),
    /// `{{{name}}}` / `{{&name}}` — raw interpolation, never escaped
    Unescaped(String),
    /// `{{#name}}` — section open
    Section(String),
    /// `{{^name}}` — inverted section open
    Inverted(String),
    /// `{{/name}}` — section close
    End(String),
    /// `{{>name}}` — partial inclusion; `indent` is the whitespace captured
    /// at standalone detection, re-applied per line of the partial body
    Partial { name: String, indent: String },
    /// `{{<name}}` — parent block, same indentation contract as a partial
    ParentBlock { name: String, indent: String },
    /// `{{$name}}` — substitution block placeholder
    Substitution(String),
    /// `{{=<% %>=}}` — delimiter redefinition
    SetDelimiters(Delimiters),
}

/// Tag classification read from the marker character after the left delimiter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Comment,
    Section,
    Inverted,
    End,
    Partial,
    ParentBlock,
    Substitution,
    SetDelimiters,
    Raw,
    RawBrace,
    Variable,
}

impl TagKind {
    fn from_marker(marker: char) -> Option<TagKind> {
        match marker {
            '!' => Some(TagKind::Comment),
            '#' => Some(TagKind::Section),
            '^' => Some(TagKind::Inverted),
            '/' => Some(TagKind::End),
            '>' => Some(TagKind::Partial),
            '<' => Some(TagKind::ParentBlock),
            '$' => Some(TagKind::Substitution),
            '=' => Some(TagKind::SetDelimiters),
            '{' => Some(TagKind::RawBrace),
            '&' => Some(TagKind::Raw),
            _ => None,
        }
    }

    /// Variable interpolation tags are never standalone
    fn standalone_eligible(self) -> bool {
        !matches!(self, TagKind::Variable | TagKind::Raw | TagKind::RawBrace)
    }
}

/// Lazy, finite, forward-only lexer over template text.
///
/// Yields `(Token, Span)` pairs where the span runs from the token's start
/// offset to the offset tokenization resumes at (past the trailing newline
/// for standalone tags). The final literal covers any trailing text.
pub struct Tokenizer<'a> {
    template: &'a str,
    cursor: usize,
    delimiters: Delimiters,
    pending: Option<(Token, Span)>,
}

impl<'a> Tokenizer<'a> {
    /// Start lexing `template` at byte offset `start` with the given delimiters
    pub fn new(template: &'a str, start: usize, delimiters: Delimiters) -> Self {
        Self {
            template,
            cursor: start,
            delimiters,
            pending: None,
        }
    }

    /// The currently active delimiter pair
    pub fn delimiters(&self) -> &Delimiters {
        &self.delimiters
    }

    /// Lex one tag starting at `tag_start`, returning the token (None for
    /// comments), the tag kind, and the offset just past the right delimiter.
    fn parse_tag(&mut self, tag_start: usize) -> Result<(Option<Token>, TagKind, usize), SyntaxError> {
        let mut content_start = tag_start + self.delimiters.left.len();
        let marker = self.template[content_start.min(self.template.len())..]
            .chars()
            .next();
        let kind = marker.and_then(TagKind::from_marker).unwrap_or(TagKind::Variable);
        if kind != TagKind::Variable {
            content_start += marker.map(char::len_utf8).unwrap_or(0);
        }

        // Raw-brace tags close with `}` + right delimiter, set-delimiter
        // tags with `=` + right delimiter
        let closer = match kind {
            TagKind::RawBrace => format!("}}{}", self.delimiters.right),
            TagKind::SetDelimiters => format!("={}", self.delimiters.right),
            _ => self.delimiters.right.clone(),
        };

        let content_start = content_start.min(self.template.len());
        let close_at = match self.template[content_start..].find(&closer) {
            Some(position) => content_start + position,
            None => {
                return Err(SyntaxError::UnclosedTag {
                    line: line_number(self.template, tag_start),
                    offset: tag_start,
                })
            }
        };
        let content = self.template[content_start..close_at].trim();
        let tag_end = close_at + closer.len();

        let token = match kind {
            TagKind::Comment => None,
            TagKind::Section => Some(Token::Section(content.to_string())),
            TagKind::Inverted => Some(Token::Inverted(content.to_string())),
            TagKind::End => Some(Token::End(content.to_string())),
            TagKind::Partial => Some(Token::Partial {
                name: content.to_string(),
                indent: String::new(),
            }),
            TagKind::ParentBlock => Some(Token::ParentBlock {
                name: content.to_string(),
                indent: String::new(),
            }),
            TagKind::Substitution => Some(Token::Substitution(content.to_string())),
            TagKind::SetDelimiters => {
                let pair = parse_delimiter_pair(content).unwrap_or_else(|| self.delimiters.clone());
                self.delimiters = pair.clone();
                Some(Token::SetDelimiters(pair))
            }
            TagKind::Raw | TagKind::RawBrace => Some(Token::Unescaped(content.to_string())),
            TagKind::Variable => Some(Token::Variable(content.to_string())),
        };

        Ok((token, kind, tag_end))
    }

    /// Decide whether the tag occupying `tag_start..tag_end` stands alone on
    /// its line. Returns `(standalone, resume_offset, indent_start)`; for a
    /// standalone tag the resume offset skips the trailing newline and
    /// `indent_start..tag_start` is the leading whitespace to strip.
    fn standalone(&self, tag_start: usize, tag_end: usize) -> (bool, usize, usize) {
        let indent_start = match self.template[..tag_start].rfind('\n') {
            Some(newline) => newline + 1,
            None => 0,
        };
        let line_end = self.template[tag_end..]
            .find('\n')
            .map(|relative| tag_end + relative);

        let before = &self.template[indent_start..tag_start];
        let after = &self.template[tag_end..line_end.unwrap_or(self.template.len())];
        let is_standalone = before.chars().all(char::is_whitespace)
            && after.chars().all(char::is_whitespace);

        if is_standalone {
            // Skip the newline character
            let resume = line_end.map(|at| at + 1).unwrap_or(self.template.len());
            (true, resume, indent_start)
        } else {
            (false, tag_end, tag_start)
        }
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Result<(Token, Span), SyntaxError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(item) = self.pending.take() {
            return Some(Ok(item));
        }

        while self.cursor < self.template.len() {
            let literal_start = self.cursor;
            let tag_start = match self.template[literal_start..].find(&self.delimiters.left) {
                Some(relative) => literal_start + relative,
                None => {
                    // Trailing text: final literal, then the stream ends
                    self.cursor = self.template.len();
                    let text = self.template[literal_start..].to_string();
                    return Some(Ok((Token::Literal(text), literal_start..self.template.len())));
                }
            };

            let (token, kind, tag_end) = match self.parse_tag(tag_start) {
                Ok(parsed) => parsed,
                Err(err) => return Some(Err(err)),
            };

            let mut literal = self.template[literal_start..tag_start].to_string();
            let mut indent = String::new();

            let resume = if kind.standalone_eligible() {
                let (is_standalone, resume, indent_start) = self.standalone(tag_start, tag_end);
                if is_standalone {
                    literal.truncate(literal.len().saturating_sub(tag_start - indent_start));
                    indent = self.template[indent_start..tag_start].to_string();
                }
                resume
            } else {
                tag_end
            };
            self.cursor = resume;

            let token = token.map(|token| match token {
                Token::Partial { name, .. } => Token::Partial { name, indent },
                Token::ParentBlock { name, .. } => Token::ParentBlock { name, indent },
                other => other,
            });

            match (literal.is_empty(), token) {
                (false, Some(token)) => {
                    self.pending = Some((token, tag_start..resume));
                    return Some(Ok((Token::Literal(literal), literal_start..tag_start)));
                }
                (false, None) => {
                    return Some(Ok((Token::Literal(literal), literal_start..tag_start)));
                }
                (true, Some(token)) => {
                    return Some(Ok((token, tag_start..resume)));
                }
                // Comment with no preceding literal: nothing to emit
                (true, None) => continue,
            }
        }

        None
    }
}

/// Split set-delimiter tag content into the new pair: the first and last
/// whitespace-separated words.
fn parse_delimiter_pair(content: &str) -> Option<Delimiters> {
    let mut words = content.split_whitespace();
    let left = words.next()?;
    let right = words.last().unwrap_or(left);
    Some(Delimiters::new(left, right))
}

/// Tokenize a whole template up front.
///
/// The resulting list is immutable and may be shared read-only across
/// concurrent renders of the same template text; using it instead of the
/// lazy lexer never changes output.
pub fn tokenize_all(template: &str, delimiters: Delimiters) -> Result<Vec<(Token, Span)>, SyntaxError> {
    Tokenizer::new(template, 0, delimiters).collect()
}
