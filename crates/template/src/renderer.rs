//! Template rendering

use crate::context::ExecutionContext;
use crate::escape::Escape;
use crate::expression::{find_unquoted, value_to_string, Expression};
use crate::{Result, TemplateError};
use serde::{Deserialize, Serialize};

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Whether a rendered document is returned as-is or needs conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputCategory {
    /// Returned directly (e.g. HTML)
    Markup,
    /// Converted by an external engine (e.g. PDF)
    Binary,
}

/// Output of the renderer, consumed by the conversion dispatcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub category: OutputCategory,
    pub content: Vec<u8>,
}

/// Template renderer
pub struct TemplateRenderer<'a> {
    /// Records and data visible to expressions
    context: &'a ExecutionContext,
    /// Escaping applied to substituted values
    escape: Escape,
}

impl<'a> TemplateRenderer<'a> {
    /// Create a renderer over a context, escaping for HTML
    pub fn new(context: &'a ExecutionContext) -> Self {
        Self {
            context,
            escape: Escape::Html,
        }
    }

    /// Set the escaping used for substituted values
    pub fn with_escape(mut self, escape: Escape) -> Self {
        self.escape = escape;
        self
    }

    /// Render template bytes to text
    ///
    /// The bytes must be UTF-8; there is no lossy fallback. Rendering is
    /// all-or-nothing: on any error no partial output is returned.
    pub fn render(&self, template: &[u8]) -> Result<String> {
        let source = std::str::from_utf8(template).map_err(|e| TemplateError::Encoding {
            offset: e.valid_up_to(),
        })?;
        self.render_str(source)
    }

    /// Render template text
    pub fn render_str(&self, source: &str) -> Result<String> {
        let mut out = String::with_capacity(source.len());
        let mut rest = source;
        let mut line = 1;
        let mut substitutions = 0usize;

        while let Some(open) = rest.find(OPEN) {
            let (literal, after) = rest.split_at(open);
            let after = &after[OPEN.len()..];
            line += count_lines(literal);

            // `\{{` is a literal `{{`
            if let Some(literal) = literal.strip_suffix('\\') {
                out.push_str(literal);
                out.push_str(OPEN);
                rest = after;
                continue;
            }
            out.push_str(literal);

            let close = find_unquoted(after, CLOSE)
                .ok_or_else(|| TemplateError::syntax(line, "unterminated `{{`"))?;
            let body = &after[..close];

            let expression = Expression::parse_on_line(body, line)?;
            let value = expression.resolve(self.context)?;
            self.escape.push_escaped(&mut out, &value_to_string(&value));

            substitutions += 1;
            line += count_lines(body);
            rest = &after[close + CLOSE.len()..];
        }
        out.push_str(rest);

        tracing::debug!(substitutions, escape = ?self.escape, "Template rendered");
        Ok(out)
    }
}

fn count_lines(text: &str) -> usize {
    text.bytes().filter(|b| *b == b'\n').count()
}

/// Render template bytes against a context
pub fn render(template: &[u8], context: &ExecutionContext, escape: Escape) -> Result<String> {
    TemplateRenderer::new(context)
        .with_escape(escape)
        .render(template)
}

/// Render template bytes into a document of the given output category
pub fn render_document(
    template: &[u8],
    context: &ExecutionContext,
    category: OutputCategory,
    escape: Escape,
) -> Result<RenderedDocument> {
    let text = render(template, context, escape)?;
    Ok(RenderedDocument {
        category,
        content: text.into_bytes(),
    })
}
