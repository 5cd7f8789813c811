//! Output escaping for substituted values

use serde::{Deserialize, Serialize};

/// Escaping applied to every substituted value
///
/// Chosen by the output format, never by template content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Escape {
    /// `& < > " '` replaced by entities
    #[default]
    Html,
    /// Values substituted verbatim
    None,
}

impl Escape {
    /// Apply this escaping to `value`, appending to `out`
    pub fn push_escaped(self, out: &mut String, value: &str) {
        match self {
            Escape::Html => push_html_escaped(out, value),
            Escape::None => out.push_str(value),
        }
    }
}

/// Escape HTML special characters
pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    push_html_escaped(&mut out, value);
    out
}

fn push_html_escaped(out: &mut String, value: &str) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
}
