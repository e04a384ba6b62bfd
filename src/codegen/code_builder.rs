//! Indentation-aware text accumulator for generated shader code.

use std::ops::{Deref, DerefMut};

/// Indentation is four spaces per level.
const INDENT: &str = "    ";

#[derive(Debug, Clone)]
struct Line {
    indent: usize,
    content: Option<String>,
}

/// Accumulates lines of shader code.
///
/// Indentation is only changed through [`IndentScope`] guards, so it is
/// always restored when a scope ends, including on early returns.
#[derive(Debug, Default, Clone)]
pub struct ShaderStringBuilder {
    lines: Vec<Line>,
    indent: usize,
}

impl ShaderStringBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_new_line(&mut self) {
        self.lines.push(Line {
            indent: self.indent,
            content: None,
        });
    }

    /// Append one line at the current indentation. An empty string is an empty line.
    pub fn append_line<S: AsRef<str>>(&mut self, line: S) {
        let line = line.as_ref();
        if line.is_empty() {
            self.append_new_line();
            return;
        }
        self.lines.push(Line {
            indent: self.indent,
            content: Some(line.to_owned()),
        });
    }

    pub fn append_lines<S: AsRef<str>>(&mut self, lines: &[S]) {
        for line in lines {
            self.append_line(line);
        }
    }

    /// Append pre-built text, one line per `\n`, at the current indentation.
    pub fn append_text(&mut self, text: &str) {
        for line in text.lines() {
            self.append_line(line);
        }
    }

    /// Increase indentation until the returned guard is dropped.
    pub fn indent_scope(&mut self) -> IndentScope<'_> {
        IndentScope::new(self, None)
    }

    /// Write `open`, indent, and write `close` when the guard is dropped.
    pub fn block_scope(&mut self, open: &str, close: &str) -> IndentScope<'_> {
        self.append_line(open);
        IndentScope::new(self, Some(close.to_owned()))
    }

    pub fn current_indent(&self) -> usize {
        self.indent
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Flatten to text, every line terminated with `\n`.
    pub fn build(&self) -> String {
        let mut result = String::new();
        for line in &self.lines {
            if let Some(content) = &line.content {
                for _ in 0..line.indent {
                    result.push_str(INDENT);
                }
                result.push_str(content);
            }
            result.push('\n');
        }
        result
    }
}

/// Guard returned by [`ShaderStringBuilder::indent_scope`].
pub struct IndentScope<'w> {
    builder: &'w mut ShaderStringBuilder,
    close: Option<String>,
}

impl<'w> IndentScope<'w> {
    fn new(builder: &'w mut ShaderStringBuilder, close: Option<String>) -> Self {
        builder.indent += 1;
        Self { builder, close }
    }
}

impl Drop for IndentScope<'_> {
    fn drop(&mut self) {
        self.builder.indent -= 1;
        if let Some(close) = self.close.take() {
            self.builder.append_line(close);
        }
    }
}

impl Deref for IndentScope<'_> {
    type Target = ShaderStringBuilder;

    fn deref(&self) -> &Self::Target {
        self.builder
    }
}

impl DerefMut for IndentScope<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.builder
    }
}
