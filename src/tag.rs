use std::fmt::Write;

use crate::{
    error::{CompileError, CompileErrorKind, CompileResult, WyrmResult},
    expression::{
        AttrDict, Expression,
        parser::{Position, describe, parse_expression, split_commas},
    },
    scope::Scope,
    token::{Token, TokenKind},
    value::Value,
};

/// Elements rendered without a closing tag. They cannot take children.
pub const VOID_TAGS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Doctype declarations keyed by the version written after `html`.
const DOCTYPES: [(&str, &str); 8] = [
    ("5", "<!doctype html>"),
    (
        "4 strict",
        r#"<!doctype html PUBLIC "-//W3C//DTD HTML 4.01//EN" "http://www.w3.org/TR/html4/strict.dtd">"#,
    ),
    (
        "4 transitional",
        r#"<!doctype html PUBLIC "-//W3C//DTD HTML 4.01 Transitional//EN" "http://www.w3.org/TR/html4/loose.dtd">"#,
    ),
    (
        "4 frameset",
        r#"<!doctype html PUBLIC "-//W3C//DTD HTML 4.01 Frameset//EN" "http://www.w3.org/TR/html4/frameset.dtd">"#,
    ),
    (
        "1 strict",
        r#"<!doctype html PUBLIC "-//W3C//DTD XHTML 1.0 Strict//EN" "http://www.w3.org/TR/xhtml1/DTD/xhtml1-strict.dtd">"#,
    ),
    (
        "1 transitional",
        r#"<!doctype html PUBLIC "-//W3C//DTD XHTML 1.0 Transitional//EN" "http://www.w3.org/TR/xhtml1/DTD/xhtml1-transitional.dtd">"#,
    ),
    (
        "1 frameset",
        r#"<!doctype html PUBLIC "-//W3C//DTD XHTML 1.0 Frameset//EN" "http://www.w3.org/TR/xhtml1/DTD/xhtml1-frameset.dtd">"#,
    ),
    (
        "1.1",
        r#"<!doctype html PUBLIC "-//W3C//DTD XHTML 1.1//EN" "http://www.w3.org/TR/xhtml11/DTD/xhtml11.dtd">"#,
    ),
];

/// Look up the declaration for a doctype version. A bare `4` or `1` means
/// the strict variant.
pub fn doctype_declaration(version: &str) -> Option<&'static str> {
    let key = match version.trim() {
        "4" => "4 strict",
        "1" => "1 strict",
        other => other,
    };
    DOCTYPES
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, declaration)| *declaration)
}

/// Characters that may not appear in an attribute name.
const FORBIDDEN_IN_NAME: [char; 6] = ['"', '\'', '<', '>', '/', '='];

/// The parsed form of a `%` line: `name#id.class attr=expr, ...`.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub name: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attributes: AttrDict,
}

impl Default for Tag {
    fn default() -> Self {
        Self {
            name: "div".to_string(),
            id: None,
            classes: Vec::new(),
            attributes: AttrDict::default(),
        }
    }
}

/// Escape a value for use inside a double-quoted attribute.
pub fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    out
}

fn valid_attribute_name(name: &str) -> bool {
    !name.is_empty()
        && !name
            .chars()
            .any(|c| c.is_whitespace() || FORBIDDEN_IN_NAME.contains(&c))
}

/// Append ` name="value"` to `out`, a bare ` name` for `True`, nothing for
/// falsy values.
fn write_attribute(out: &mut String, name: &str, value: &Value) {
    match value {
        Value::Bool(true) => {
            let _ = write!(out, " {name}");
        }
        value if value.is_truthy() => {
            let _ = write!(out, " {name}=\"{}\"", escape_attribute(&value.to_output()));
        }
        _ => {}
    }
}

impl Tag {
    /// A bare tag with no shortcuts or attributes.
    pub fn named<T: Into<String>>(name: T) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn is_void(&self) -> bool {
        VOID_TAGS.contains(&self.name.as_str())
    }

    /// Parse the tokens following a `%` indicator.
    pub(crate) fn parse(tokens: &[Token], end: Position) -> CompileResult<Self> {
        let mut tag = Self::default();
        let mut rest = tokens;

        // Shortcuts are only part of the head while they stay contiguous.
        let mut head_end = None;
        if let Some((first, tail)) = rest.split_first() {
            if first.kind == TokenKind::Identifier {
                tag.name.clone_from(&first.text);
                head_end = Some(first.end_column());
                rest = tail;
            }
        }
        while let [marker, name, tail @ ..] = rest {
            let contiguous = head_end.is_none_or(|end| end == marker.column);
            if !contiguous || !(marker.is_operator("#") || marker.is_operator(".")) {
                break;
            }
            if name.kind != TokenKind::Identifier || name.column != marker.end_column() {
                return Err(CompileError::new(
                    name.line,
                    name.column,
                    CompileErrorKind::unexpected(format!("name after `{}`", marker.text), name.to_string()),
                ));
            }
            if marker.text == "#" {
                tag.id = Some(name.text.clone());
            } else {
                tag.classes.push(name.text.clone());
            }
            head_end = Some(name.end_column());
            rest = tail;
        }

        tag.attributes = parse_attributes(rest, end)?;
        Ok(tag)
    }

    /// Render the opening tag, plus the closing tag for non-void elements.
    pub(crate) fn render(&self, scopes: &[&Scope]) -> WyrmResult<(String, Option<String>)> {
        let mut open = format!("<{}", self.name);

        if let Some(id) = &self.id {
            let _ = write!(open, " id=\"{}\"", escape_attribute(id));
        } else if let Some(Some(expr)) = self.attributes.get("id") {
            write_attribute(&mut open, "id", &expr.evaluate(scopes)?);
        }

        let mut classes = Vec::new();
        if let Some(Some(expr)) = self.attributes.get("class") {
            match expr.evaluate(scopes)? {
                Value::List(items) | Value::Tuple(items) => classes.extend(
                    items
                        .iter()
                        .filter(|item| item.is_truthy())
                        .map(Value::to_output),
                ),
                value if value.is_truthy() => classes.push(value.to_output()),
                _ => {}
            }
        }
        classes.extend(self.classes.iter().cloned());
        if !classes.is_empty() {
            let _ = write!(open, " class=\"{}\"", escape_attribute(&classes.join(" ")));
        }

        for (name, expr) in &self.attributes.0 {
            if name == "id" || name == "class" {
                continue;
            }
            let value = match expr {
                Some(expr) => expr.evaluate(scopes)?,
                None => Value::Bool(true),
            };
            write_attribute(&mut open, name, &value);
        }
        open.push('>');

        if self.is_void() {
            Ok((open, None))
        } else {
            Ok((open, Some(format!("</{}>", self.name))))
        }
    }
}

/// Parse `name`, `name=expr` and `"name"=expr` entries separated by commas.
pub(crate) fn parse_attributes(tokens: &[Token], end: Position) -> CompileResult<AttrDict> {
    let mut attributes = AttrDict::default();
    if tokens.is_empty() {
        return Ok(attributes);
    }
    for (piece, piece_end) in split_commas(tokens, end)? {
        let split = piece.iter().position(|t| t.is_operator("="));
        let (name_tokens, value) = match split {
            Some(at) => {
                let (name_tokens, rest) = piece.split_at(at);
                let value_tokens = rest.get(1..).unwrap_or_default();
                (name_tokens, Some(parse_expression(value_tokens, piece_end)?))
            }
            None => (piece, None),
        };
        let name = attribute_name(name_tokens, piece_end)?;
        attributes.0.push((name, value));
    }
    Ok(attributes)
}

/// Join contiguous tokens such as `data` `-` `id` into one attribute name.
fn attribute_name(tokens: &[Token], end: Position) -> CompileResult<String> {
    let Some(first) = tokens.first() else {
        return Err(CompileError::new(
            end.0,
            end.1,
            CompileErrorKind::unexpected_end("attribute name"),
        ));
    };
    let invalid = |name: String| {
        CompileError::new(
            first.line,
            first.column,
            CompileErrorKind::InvalidAttributeName { name },
        )
    };

    let name = match tokens {
        [token] if token.kind == TokenKind::String => match parse_expression(tokens, end)? {
            Expression::String(s) => s.as_literal().ok_or_else(|| invalid(token.text.clone()))?,
            _ => return Err(invalid(token.text.clone())),
        },
        _ => joined_name(tokens).ok_or_else(|| invalid(describe(tokens)))?,
    };

    if valid_attribute_name(&name) {
        Ok(name)
    } else {
        Err(invalid(name))
    }
}

fn joined_name(tokens: &[Token]) -> Option<String> {
    let mut name = String::new();
    let mut expected_column = tokens.first()?.column;
    for token in tokens {
        let joinable = matches!(
            token.kind,
            TokenKind::Identifier | TokenKind::Keyword | TokenKind::Number
        ) || token.is_operator("-");
        if !joinable || token.column != expected_column {
            return None;
        }
        name.push_str(&token.text);
        expected_column = token.end_column();
    }
    Some(name)
}
