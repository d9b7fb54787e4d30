//! Minimal URI templates for resource addressing (`greeting://{name}`).
//!
//! Only simple `{var}` expansion is supported. A variable matches up to the
//! next literal of the template and never crosses a `/`.

use std::fmt;

use serde_json::{Map, Value};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum UriTemplateError {
    #[error("Unclosed '{{' in template: {0}")]
    Unclosed(String),

    #[error("Unexpected '}}' in template: {0}")]
    UnexpectedBrace(String),

    #[error("Empty variable name in template: {0}")]
    EmptyVariable(String),

    #[error("Adjacent variables cannot be matched unambiguously: {0}")]
    AdjacentVariables(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Var(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriTemplate {
    raw: String,
    parts: Vec<Part>,
}

impl UriTemplate {
    pub fn parse(raw: &str) -> Result<Self, UriTemplateError> {
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut chars = raw.chars();

        while let Some(c) = chars.next() {
            match c {
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        name.push(c);
                    }
                    if !closed {
                        return Err(UriTemplateError::Unclosed(raw.to_string()));
                    }
                    let name = name.trim().to_string();
                    if name.is_empty() {
                        return Err(UriTemplateError::EmptyVariable(raw.to_string()));
                    }
                    if !literal.is_empty() {
                        parts.push(Part::Literal(std::mem::take(&mut literal)));
                    } else if matches!(parts.last(), Some(Part::Var(_))) {
                        return Err(UriTemplateError::AdjacentVariables(raw.to_string()));
                    }
                    parts.push(Part::Var(name));
                }
                '}' => return Err(UriTemplateError::UnexpectedBrace(raw.to_string())),
                c => literal.push(c),
            }
        }
        if !literal.is_empty() {
            parts.push(Part::Literal(literal));
        }

        Ok(Self {
            raw: raw.to_string(),
            parts,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether the template has any variables. A template without variables
    /// addresses exactly one URI.
    pub fn is_template(&self) -> bool {
        self.parts.iter().any(|p| matches!(p, Part::Var(_)))
    }

    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().filter_map(|p| match p {
            Part::Var(name) => Some(name.as_str()),
            Part::Literal(_) => None,
        })
    }

    /// Match `uri`, returning the extracted variables as a string-valued
    /// object in template order.
    pub fn matches(&self, uri: &str) -> Option<Map<String, Value>> {
        let mut vars = Map::new();
        let mut rest = uri;

        for (i, part) in self.parts.iter().enumerate() {
            match part {
                Part::Literal(lit) => {
                    rest = rest.strip_prefix(lit.as_str())?;
                }
                Part::Var(name) => {
                    let end = match self.parts.get(i + 1) {
                        Some(Part::Literal(next)) => rest.find(next.as_str())?,
                        _ => rest.len(),
                    };
                    let raw_value = &rest[..end];
                    if raw_value.is_empty() || raw_value.contains('/') {
                        return None;
                    }
                    let value = urlencoding::decode(raw_value)
                        .map(|v| v.into_owned())
                        .unwrap_or_else(|_| raw_value.to_string());
                    vars.insert(name.clone(), Value::String(value));
                    rest = &rest[end..];
                }
            }
        }

        rest.is_empty().then_some(vars)
    }

    /// Substitute `vars` into the template, percent-encoding each value.
    /// Missing variables expand to the empty string.
    pub fn expand(&self, vars: &Map<String, Value>) -> String {
        let mut uri = String::with_capacity(self.raw.len());
        for part in &self.parts {
            match part {
                Part::Literal(lit) => uri.push_str(lit),
                Part::Var(name) => match vars.get(name) {
                    Some(Value::String(s)) => uri.push_str(&urlencoding::encode(s)),
                    Some(Value::Null) | None => {}
                    Some(other) => uri.push_str(&urlencoding::encode(&other.to_string())),
                },
            }
        }
        uri
    }
}

impl fmt::Display for UriTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
