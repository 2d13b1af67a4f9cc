//! `{placeholder}` rendering for the user-supplied format strings

use std::fmt;

/// A value substituted into a format string
#[derive(Debug, Clone, PartialEq)]
pub enum FormatValue {
    Text(String),
    Int(i64),
    Float(f64),
}

impl fmt::Display for FormatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatValue::Text(s) => f.write_str(s),
            FormatValue::Int(n) => write!(f, "{}", n),
            FormatValue::Float(x) if x.is_finite() && x.fract() == 0.0 => write!(f, "{:.1}", x),
            FormatValue::Float(x) => write!(f, "{}", x),
        }
    }
}

/// Result of looking up a placeholder name
pub enum Lookup {
    /// The name is known and has a value
    Value(FormatValue),
    /// The name is known but has no value; renders empty
    Empty,
    /// The name is not a placeholder of this template kind
    Unknown,
}

/// Render `template`, replacing `{name}` using `lookup`
///
/// `{{` and `}}` produce literal braces. Unknown names and an unterminated
/// `{` are copied through unchanged.
pub fn render<F>(template: &str, lookup: F) -> String
where
    F: Fn(&str) -> Lookup,
{
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(idx) = rest.find(['{', '}']) {
        out.push_str(&rest[..idx]);
        let tail = &rest[idx..];

        if tail.starts_with("{{") {
            out.push('{');
            rest = &tail[2..];
            continue;
        }
        if tail.starts_with("}}") {
            out.push('}');
            rest = &tail[2..];
            continue;
        }
        if tail.starts_with('}') {
            out.push('}');
            rest = &tail[1..];
            continue;
        }

        match tail[1..].find(['{', '}']) {
            Some(end) if tail.as_bytes()[end + 1] == b'}' => {
                let name = &tail[1..end + 1];
                match lookup(name) {
                    Lookup::Value(value) => out.push_str(&value.to_string()),
                    Lookup::Empty => {}
                    Lookup::Unknown => out.push_str(&tail[..end + 2]),
                }
                rest = &tail[end + 2..];
            }
            _ => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}
