//! Variable substitution for task definition templates
//!
//! Placeholders are `$NAME` or `${NAME}`, where a name is an ASCII letter or
//! underscore followed by letters, digits or underscores. `$$` produces a
//! literal `$`. Every placeholder must resolve; anything else after a `$` is
//! rejected.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from loading and rendering a task definition template
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Template file could not be read
    #[error("failed to read template {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Placeholder with no value in the environment
    #[error("undefined variable '{name}' on line {line}")]
    UndefinedVariable { name: String, line: usize },

    /// `$` not followed by a name, `{name}` or another `$`
    #[error("invalid placeholder on line {line}")]
    InvalidPlaceholder { line: usize },

    /// Rendered document is not a valid task definition
    #[error("rendered task definition is not valid JSON")]
    InvalidJson(#[source] serde_json::Error),

    /// Rendered document has no container definitions
    #[error("task definition has no container definitions")]
    NoContainers,
}

/// Read a template file and substitute variables from `vars`
pub fn load_template(path: &Path, vars: &HashMap<String, String>) -> Result<String, TemplateError> {
    let text = std::fs::read_to_string(path).map_err(|source| TemplateError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    render_template(&text, |name| vars.get(name).cloned())
}

/// Substitute every placeholder in `text` using `lookup`
pub fn render_template<F>(text: &str, lookup: F) -> Result<String, TemplateError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(text.len());
    let mut line = 1;
    let mut chars = text.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if c == '\n' {
            line += 1;
        }
        if c != '$' {
            out.push(c);
            continue;
        }

        let name = match chars.peek() {
            Some((_, '$')) => {
                chars.next();
                out.push('$');
                continue;
            }
            Some((_, '{')) => {
                chars.next();
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some((_, '}')) => break,
                        Some((_, ch)) if is_name_char(ch, name.is_empty()) => name.push(ch),
                        _ => return Err(TemplateError::InvalidPlaceholder { line }),
                    }
                }
                if name.is_empty() {
                    return Err(TemplateError::InvalidPlaceholder { line });
                }
                name
            }
            Some((_, ch)) if is_name_char(*ch, true) => {
                let mut name = String::new();
                while let Some((_, ch)) = chars.peek() {
                    if !is_name_char(*ch, name.is_empty()) {
                        break;
                    }
                    name.push(*ch);
                    chars.next();
                }
                name
            }
            _ => return Err(TemplateError::InvalidPlaceholder { line }),
        };

        match lookup(&name) {
            Some(value) => out.push_str(&value),
            None => return Err(TemplateError::UndefinedVariable { name, line }),
        }
    }

    Ok(out)
}

fn is_name_char(c: char, first: bool) -> bool {
    c == '_' || c.is_ascii_alphabetic() || (!first && c.is_ascii_digit())
}
