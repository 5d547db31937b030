//! The render engine
//!
//! A cursor-driven interpreter over the token stream. Section iteration is
//! replay, not recursion: opening a section pushes an environment frame
//! holding the cursor to rewind to, and each End either rewinds with the
//! next sequence element or retires the frame. Partials, lambdas, and
//! parent blocks render through recursive sub-renders with their own
//! stacks; only the handler bundle, partial table, and escaping/delimiter
//! configuration are threaded through.

use crate::context::{get_from_stack, LambdaFn, ResolveError, Value};
use crate::error::{line_number, RenderError, Span, SyntaxError};
use crate::tokenizer::{tokenize_all, Delimiters, Token, Tokenizer};
use crate::RenderOptions;

/// Render `template` against a root context. The entry point behind
/// [`crate::render_with_options`] and every recursive sub-render.
pub(crate) fn render_template(
    template: &str,
    root: Value,
    options: &RenderOptions,
) -> Result<String, RenderError> {
    let delimiters = options.delimiters.clone();
    let source = if options.precompute_tokens {
        TokenSource::Cached {
            tokens: tokenize_all(template, delimiters.clone())?,
            cursor: 0,
        }
    } else {
        TokenSource::Streaming { cursor: 0 }
    };

    let mut engine = Engine {
        template,
        options,
        output: String::new(),
        context_stack: vec![root],
        env_stack: Vec::new(),
        delimiters,
        source,
    };
    engine.run()?;
    Ok(engine.output)
}

/// Where the engine pulls tokens from. The cursor is a byte offset when
/// streaming and a token index when precomputed; frames store whichever
/// the active mode uses. The choice never alters output.
enum TokenSource {
    Streaming { cursor: usize },
    Cached { tokens: Vec<(Token, Span)>, cursor: usize },
}

/// One frame per currently open section-like tag
struct Frame {
    name: String,
    /// Cursor to rewind to when replaying the body for the next element
    return_cursor: usize,
    /// The value the section was opened with; sequences drive iteration
    bound: Value,
    /// Current position within a bound sequence
    index: usize,
    /// Delimiters active at open time, restored on each replay so every
    /// iteration tokenizes the body identically
    delimiters: Delimiters,
}

struct Engine<'a> {
    template: &'a str,
    options: &'a RenderOptions,
    output: String,
    context_stack: Vec<Value>,
    env_stack: Vec<Frame>,
    delimiters: Delimiters,
    source: TokenSource,
}

impl<'a> Engine<'a> {
    fn run(&mut self) -> Result<(), RenderError> {
        loop {
            let Some((token, span)) = self.next_token()? else {
                break;
            };

            // Applied before the dead-branch check: a delimiter change
            // inside a dead branch still affects subsequent tokenization
            if let Token::SetDelimiters(pair) = &token {
                self.delimiters = pair.clone();
            }

            if let Token::End(name) = &token {
                self.close_section(name, &span)?;
                continue;
            }

            // Dead branch: under a falsy scope only section bookkeeping
            // runs, so End balancing survives; no value is ever touched
            if self.in_dead_branch() {
                if let Token::Section(name) | Token::Inverted(name) = &token {
                    self.context_stack.push(Value::Bool(false));
                    let return_cursor = self.cursor();
                    self.env_stack.push(Frame {
                        name: name.clone(),
                        return_cursor,
                        bound: Value::Bool(false),
                        index: 0,
                        delimiters: self.delimiters.clone(),
                    });
                }
                continue;
            }

            match token {
                Token::Literal(text) => self.output.push_str(&text),

                Token::Variable(path) => {
                    let text = self.variable_text(&path)?;
                    if self.options.escape_output {
                        self.output.push_str(&escape_text(&text));
                    } else {
                        self.output.push_str(&text);
                    }
                }

                Token::Unescaped(path) => {
                    let text = self.variable_text(&path)?;
                    self.output.push_str(&text);
                }

                Token::Section(name) => self.open_section(name, false, span)?,
                Token::Inverted(name) => self.open_section(name, true, span)?,

                Token::Partial { name, indent } => {
                    self.include_partial(&name, &indent)?;
                }

                Token::ParentBlock { name, indent } => {
                    // Best-effort verbatim inclusion: the parent renders like
                    // a partial and the block body here is skipped; block
                    // substitution is not wired to caller overrides
                    self.include_partial(&name, &indent)?;
                    self.skip_section(&name, &span)?;
                }

                Token::Substitution(name) => {
                    // Neutral always-truthy scope: the body renders in place
                    self.context_stack.push(Value::Bool(true));
                    let return_cursor = self.cursor();
                    self.env_stack.push(Frame {
                        name,
                        return_cursor,
                        bound: Value::Bool(true),
                        index: 0,
                        delimiters: self.delimiters.clone(),
                    });
                }

                Token::End(_) | Token::SetDelimiters(_) => {}
            }
        }
        Ok(())
    }

    fn next_token(&mut self) -> Result<Option<(Token, Span)>, RenderError> {
        match &mut self.source {
            TokenSource::Streaming { cursor } => {
                let mut lexer = Tokenizer::new(self.template, *cursor, self.delimiters.clone());
                match lexer.next() {
                    None => Ok(None),
                    Some(Ok((token, span))) => {
                        *cursor = span.end;
                        Ok(Some((token, span)))
                    }
                    Some(Err(err)) => Err(err.into()),
                }
            }
            TokenSource::Cached { tokens, cursor } => match tokens.get(*cursor) {
                Some(item) => {
                    *cursor += 1;
                    Ok(Some(item.clone()))
                }
                None => Ok(None),
            },
        }
    }

    fn cursor(&self) -> usize {
        match &self.source {
            TokenSource::Streaming { cursor } | TokenSource::Cached { cursor, .. } => *cursor,
        }
    }

    fn set_cursor(&mut self, cursor: usize) {
        match &mut self.source {
            TokenSource::Streaming { cursor: current }
            | TokenSource::Cached { cursor: current, .. } => *current = cursor,
        }
    }

    fn current_scope(&self) -> &Value {
        self.context_stack
            .last()
            .expect("context stack always holds the root scope")
    }

    fn in_dead_branch(&self) -> bool {
        self.context_stack.len() > 1 && !self.current_scope().is_truthy()
    }

    /// Resolve a path through the scope stack, routing "not found anywhere"
    /// through the missing-variable handler
    fn resolve(&self, path: &str) -> Result<Value, RenderError> {
        match get_from_stack(&self.context_stack, path) {
            Ok(value) => Ok(value),
            Err(ResolveError::Missing(_)) => {
                let spelled = self.delimiters.spell(path);
                let substituted = (self.options.missing_variable)(path, &spelled)?;
                Ok(Value::Str(substituted))
            }
            Err(ResolveError::Access { path, message }) => {
                Err(RenderError::ContextAccess { path, message })
            }
        }
    }

    /// Produce the interpolation text for a variable tag: callables expand
    /// and re-render against the innermost scope before serialization
    fn variable_text(&mut self, path: &str) -> Result<String, RenderError> {
        let value = self.resolve(path)?;
        let value = if let Value::Lambda(function) = &value {
            let expansion = invoke_lambda(path, function, None)?;
            let scope = self.current_scope().clone();
            Value::Str(self.sub_render(&expansion, scope, Delimiters::default())?)
        } else {
            value
        };
        Ok((self.options.serializer)(&value))
    }

    fn open_section(&mut self, name: String, inverted: bool, span: Span) -> Result<(), RenderError> {
        let resolved = self.resolve(&name)?;

        let value = if inverted {
            // A callable bound in inverted position is always false
            Value::Bool(!resolved.is_callable() && !resolved.is_truthy())
        } else {
            resolved
        };

        if !value.is_truthy() {
            self.skip_section(&name, &span)?;
            return Ok(());
        }

        if let Value::Lambda(function) = &value {
            // Section lambda: hand it the raw body text, re-render what it
            // returns against the current scope with the delimiters active
            // at the open tag
            let open_delimiters = self.delimiters.clone();
            let body_start = span.end;
            let body_end = self.skip_section(&name, &span)?;
            let raw_body = self.template[body_start..body_end].to_string();
            let expansion = invoke_lambda(&name, function, Some(&raw_body))?;
            let scope = self.current_scope().clone();
            let rendered = self.sub_render(&expansion, scope, open_delimiters)?;
            self.output.push_str(&rendered);
            return Ok(());
        }

        let scope = match &value {
            Value::List(items) => items.first().cloned().unwrap_or(Value::Bool(false)),
            other => other.clone(),
        };
        self.context_stack.push(scope);
        let return_cursor = self.cursor();
        self.env_stack.push(Frame {
            name,
            return_cursor,
            bound: value,
            index: 0,
            delimiters: self.delimiters.clone(),
        });
        Ok(())
    }

    fn close_section(&mut self, name: &str, span: &Span) -> Result<(), RenderError> {
        if self.env_stack.is_empty() {
            return Err(SyntaxError::UnexpectedSectionEnd {
                found: name.to_string(),
                line: line_number(self.template, span.start),
                offset: span.start,
            }
            .into());
        }
        self.context_stack.pop();

        // Unexhausted sequence: rewind and replay the body with the next
        // element instead of recursing
        let replay = {
            let frame = self.env_stack.last_mut().expect("frame checked above");
            if let Value::List(items) = &frame.bound {
                frame.index += 1;
                items
                    .get(frame.index)
                    .cloned()
                    .map(|item| (item, frame.return_cursor, frame.delimiters.clone()))
            } else {
                None
            }
        };
        if let Some((item, return_cursor, delimiters)) = replay {
            self.context_stack.push(item);
            self.set_cursor(return_cursor);
            self.delimiters = delimiters;
            return Ok(());
        }

        let frame = self.env_stack.last().expect("frame checked above");
        if frame.name != name {
            return Err(SyntaxError::MismatchedSectionEnd {
                expected: frame.name.clone(),
                found: name.to_string(),
                line: line_number(self.template, span.start),
                offset: span.start,
            }
            .into());
        }
        self.env_stack.pop();
        Ok(())
    }

    /// Scan forward from the cursor counting same-named opens against End
    /// closes; leave the cursor just past the matching End. Returns the byte
    /// offset where the section body ends (the End tag's start). Delimiter
    /// changes inside the skipped region are adopted so subsequent
    /// tokenization agrees with the precomputed mode.
    fn skip_section(&mut self, name: &str, open_span: &Span) -> Result<usize, RenderError> {
        match &mut self.source {
            TokenSource::Cached { tokens, cursor } => {
                let mut depth = 1usize;
                let mut adopted = None;
                let mut index = *cursor;
                while index < tokens.len() {
                    let (token, span) = &tokens[index];
                    match token {
                        Token::Section(n) | Token::Inverted(n) if n == name => depth += 1,
                        Token::End(n) if n == name => {
                            depth -= 1;
                            if depth == 0 {
                                let body_end = span.start;
                                *cursor = index + 1;
                                if let Some(pair) = adopted {
                                    self.delimiters = pair;
                                }
                                return Ok(body_end);
                            }
                        }
                        Token::SetDelimiters(pair) => adopted = Some(pair.clone()),
                        _ => {}
                    }
                    index += 1;
                }
                Err(SyntaxError::UnclosedSection {
                    name: name.to_string(),
                    line: line_number(self.template, open_span.start),
                    offset: open_span.start,
                }
                .into())
            }
            TokenSource::Streaming { cursor } => {
                let mut lexer = Tokenizer::new(self.template, *cursor, self.delimiters.clone());
                let mut depth = 1usize;
                loop {
                    let Some(item) = lexer.next() else {
                        return Err(SyntaxError::UnclosedSection {
                            name: name.to_string(),
                            line: line_number(self.template, open_span.start),
                            offset: open_span.start,
                        }
                        .into());
                    };
                    let (token, span) = item?;
                    match &token {
                        Token::Section(n) | Token::Inverted(n) if n == name => depth += 1,
                        Token::End(n) if n == name => {
                            depth -= 1;
                            if depth == 0 {
                                *cursor = span.end;
                                self.delimiters = lexer.delimiters().clone();
                                return Ok(span.start);
                            }
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    fn include_partial(&mut self, name: &str, indent: &str) -> Result<(), RenderError> {
        let text = match self.options.partials.get(name) {
            Some(text) => text.clone(),
            None => {
                let spelled = self.delimiters.spell(name);
                (self.options.missing_partial)(name, &spelled)?
            }
        };
        if text.is_empty() {
            return Ok(());
        }

        let indented = indent_lines(&text, indent);
        let scope = self.current_scope().clone();
        let rendered = self.sub_render(&indented, scope, Delimiters::default())?;
        self.output.push_str(&rendered);
        Ok(())
    }

    /// Recursive sub-render: an independent activation with its own stacks
    /// and cursor; handlers, partials, and the escaping policy carry over
    fn sub_render(
        &self,
        template: &str,
        scope: Value,
        delimiters: Delimiters,
    ) -> Result<String, RenderError> {
        let options = RenderOptions {
            delimiters,
            precompute_tokens: false,
            ..self.options.clone()
        };
        render_template(template, scope, &options)
    }
}

/// Invoke a bound callable; the result must be text or a number
fn invoke_lambda(
    name: &str,
    function: &LambdaFn,
    input: Option<&str>,
) -> Result<String, RenderError> {
    match function(input) {
        Ok(Value::Str(text)) => Ok(text),
        Ok(Value::Integer(n)) => Ok(n.to_string()),
        Ok(Value::Float(n)) => Ok(n.to_string()),
        Ok(_) => Err(RenderError::Lambda {
            name: name.to_string(),
            message: "unexpected return type".to_string(),
        }),
        Err(source) => Err(RenderError::Lambda {
            name: name.to_string(),
            message: source.to_string(),
        }),
    }
}

/// Default escaping policy for variable tags
fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Prefix every line of a partial body with the inclusion tag's
/// indentation; a trailing newline's final empty line stays unindented.
fn indent_lines(text: &str, indent: &str) -> String {
    if indent.is_empty() {
        return text.to_string();
    }
    let mut result = String::with_capacity(text.len() + indent.len());
    result.push_str(indent);
    result.push_str(&text.replace('\n', &format!("\n{indent}")));
    if text.ends_with('\n') {
        result.truncate(result.len() - indent.len());
    }
    result
}
