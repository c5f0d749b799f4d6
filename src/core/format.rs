//! Brace-style format strings for record messages and formatter templates
//!
//! Supported syntax:
//! - `{}` automatically numbered positional argument
//! - `{0}` explicit positional argument
//! - `{name}` / `{record.channel}` / `{record.extra[ip]}` named lookups
//! - `{{` and `}}` for literal braces
//! - an optional `:spec` of the form `[[fill]align][width][.precision]`
//!   where align is one of `<`, `>`, `^`

use super::error::{LoggerError, Result};
use super::fields::FieldValue;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
enum FieldName {
    Auto,
    Index(usize),
    Key(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Align {
    Left,
    Right,
    Center,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Spec {
    fill: Option<char>,
    align: Option<Align>,
    width: Option<usize>,
    precision: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Field { name: FieldName, spec: Spec },
}

/// A parsed format string, reusable across renders
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    /// Parse a format string
    ///
    /// # Errors
    ///
    /// Returns `FormatSyntax` for unbalanced braces, malformed specs or
    /// mixed automatic and manual numbering.
    pub fn parse(source: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars().peekable();
        let mut numbering: Option<bool> = None;

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '}' => {
                    return Err(LoggerError::format_syntax(
                        source,
                        "single '}' encountered in format string",
                    ));
                }
                '{' => {
                    let mut field = String::new();
                    let mut closed = false;
                    let mut depth = 0usize;
                    for c in chars.by_ref() {
                        match c {
                            '[' => depth += 1,
                            ']' => depth = depth.saturating_sub(1),
                            '}' if depth == 0 => {
                                closed = true;
                                break;
                            }
                            '{' if depth == 0 => {
                                return Err(LoggerError::format_syntax(
                                    source,
                                    "unexpected '{' in field name",
                                ));
                            }
                            _ => {}
                        }
                        field.push(c);
                    }
                    if !closed {
                        return Err(LoggerError::format_syntax(
                            source,
                            "expected '}' before end of string",
                        ));
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }

                    let (name, spec) = split_field(&field);
                    let name = parse_name(name);
                    let manual = match name {
                        FieldName::Auto => Some(false),
                        FieldName::Index(_) => Some(true),
                        FieldName::Key(_) => None,
                    };
                    if let Some(manual) = manual {
                        match numbering {
                            Some(previous) if previous != manual => {
                                return Err(LoggerError::format_syntax(
                                    source,
                                    "cannot switch between automatic field numbering \
                                     and manual field specification",
                                ));
                            }
                            _ => numbering = Some(manual),
                        }
                    }
                    let spec = parse_spec(spec).map_err(|m| LoggerError::format_syntax(source, m))?;
                    segments.push(Segment::Field { name, spec });
                }
                other => literal.push(other),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Names of all keyword fields, in order of appearance
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Field {
                name: FieldName::Key(k),
                ..
            } => Some(k.as_str()),
            _ => None,
        })
    }

    /// Render with positional `args` and a lookup for named fields.
    ///
    /// The error string describes the first missing field.
    pub fn render<F>(&self, args: &[FieldValue], lookup: F) -> std::result::Result<String, String>
    where
        F: Fn(&str) -> Option<FieldValue>,
    {
        let mut out = String::with_capacity(self.source.len());
        let mut next_auto = 0usize;

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field { name, spec } => {
                    let value = match name {
                        FieldName::Auto => {
                            let index = next_auto;
                            next_auto += 1;
                            args.get(index)
                                .cloned()
                                .ok_or_else(|| format!("tuple index {} out of range", index))?
                        }
                        FieldName::Index(index) => args
                            .get(*index)
                            .cloned()
                            .ok_or_else(|| format!("tuple index {} out of range", index))?,
                        FieldName::Key(key) => {
                            lookup(key).ok_or_else(|| format!("KeyError: '{}'", key))?
                        }
                    };
                    apply_spec(&mut out, &value, spec);
                }
            }
        }

        Ok(out)
    }
}

/// Format a record message with positional and keyword arguments.
///
/// The error string is the cause only; callers wrap it with record context.
pub fn format_message(
    msg: &str,
    args: &[FieldValue],
    kwargs: &BTreeMap<String, FieldValue>,
) -> std::result::Result<String, String> {
    let template = Template::parse(msg).map_err(|e| e.to_string())?;
    template.render(args, |key| kwargs.get(key).cloned())
}

fn split_field(field: &str) -> (&str, &str) {
    let mut depth = 0usize;
    for (i, c) in field.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            ':' if depth == 0 => return (&field[..i], &field[i + 1..]),
            _ => {}
        }
    }
    (field, "")
}

fn parse_name(name: &str) -> FieldName {
    let name = name.trim();
    if name.is_empty() {
        FieldName::Auto
    } else if let Ok(index) = name.parse::<usize>() {
        FieldName::Index(index)
    } else {
        FieldName::Key(name.to_string())
    }
}

fn align_of(c: char) -> Option<Align> {
    match c {
        '<' => Some(Align::Left),
        '>' => Some(Align::Right),
        '^' => Some(Align::Center),
        _ => None,
    }
}

fn parse_spec(spec: &str) -> std::result::Result<Spec, String> {
    let mut result = Spec::default();
    if spec.is_empty() {
        return Ok(result);
    }

    let chars: Vec<char> = spec.chars().collect();
    let mut pos = 0;
    if chars.len() >= 2 && align_of(chars[1]).is_some() {
        result.fill = Some(chars[0]);
        result.align = align_of(chars[1]);
        pos = 2;
    } else if let Some(align) = align_of(chars[0]) {
        result.align = Some(align);
        pos = 1;
    }

    let width: String = chars[pos..].iter().take_while(|c| c.is_ascii_digit()).collect();
    pos += width.len();
    if !width.is_empty() {
        result.width = Some(width.parse().map_err(|_| format!("invalid width '{}'", width))?);
    }

    if pos < chars.len() && chars[pos] == '.' {
        pos += 1;
        let precision: String = chars[pos..].iter().take_while(|c| c.is_ascii_digit()).collect();
        if precision.is_empty() {
            return Err("format specifier missing precision".to_string());
        }
        pos += precision.len();
        result.precision = Some(
            precision
                .parse()
                .map_err(|_| format!("invalid precision '{}'", precision))?,
        );
    }

    if pos != chars.len() {
        return Err(format!("invalid format specifier '{}'", spec));
    }
    Ok(result)
}

fn apply_spec(out: &mut String, value: &FieldValue, spec: &Spec) {
    let body = match (value, spec.precision) {
        (FieldValue::Float(f), Some(p)) => format!("{:.*}", p, f),
        (FieldValue::String(s), Some(p)) => s.chars().take(p).collect(),
        (other, _) => other.to_string(),
    };

    let Some(width) = spec.width else {
        out.push_str(&body);
        return;
    };
    let len = body.chars().count();
    if len >= width {
        out.push_str(&body);
        return;
    }

    let numeric = matches!(value, FieldValue::Int(_) | FieldValue::Float(_));
    let align = spec
        .align
        .unwrap_or(if numeric { Align::Right } else { Align::Left });
    let fill = spec.fill.unwrap_or(' ');
    let padding = width - len;
    let (before, after) = match align {
        Align::Left => (0, padding),
        Align::Right => (padding, 0),
        Align::Center => (padding / 2, padding - padding / 2),
    };
    out.extend(std::iter::repeat(fill).take(before));
    out.push_str(&body);
    out.extend(std::iter::repeat(fill).take(after));
}
