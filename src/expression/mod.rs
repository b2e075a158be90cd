//! The expression sub-language: AST, parsing and evaluation.

pub(crate) mod lexer;
mod ops;
pub(crate) mod parser;

use std::collections::BTreeMap;

use crate::{
    error::{CompileError, CompileErrorKind, CompileResult, WyrmError, WyrmResult},
    scope::{Scope, lookup},
    value::Value,
};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Pos,
    Neg,
    Invert,
    Not,
}

impl UnaryOp {
    pub(crate) fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "+" => Some(Self::Pos),
            "-" => Some(Self::Neg),
            "~" => Some(Self::Invert),
            "not" => Some(Self::Not),
            _ => None,
        }
    }

    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Pos => "+",
            Self::Neg => "-",
            Self::Invert => "~",
            Self::Not => "not",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Pow,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Add,
    Sub,
    Shl,
    Shr,
    BitAnd,
    BitXor,
    BitOr,
    In,
    NotIn,
    Is,
    IsNot,
    Lt,
    Le,
    Gt,
    Ge,
    Ne,
    Eq,
    And,
    Or,
}

impl BinaryOp {
    pub(crate) fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "**" => Self::Pow,
            "*" => Self::Mul,
            "/" => Self::Div,
            "//" => Self::FloorDiv,
            "%" => Self::Mod,
            "+" => Self::Add,
            "-" => Self::Sub,
            "<<" => Self::Shl,
            ">>" => Self::Shr,
            "&" => Self::BitAnd,
            "^" => Self::BitXor,
            "|" => Self::BitOr,
            "in" => Self::In,
            "not in" => Self::NotIn,
            "is" => Self::Is,
            "is not" => Self::IsNot,
            "<" => Self::Lt,
            "<=" => Self::Le,
            ">" => Self::Gt,
            ">=" => Self::Ge,
            "!=" => Self::Ne,
            "==" => Self::Eq,
            "and" => Self::And,
            "or" => Self::Or,
            _ => return None,
        })
    }

    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Pow => "**",
            Self::Mul => "*",
            Self::Div => "/",
            Self::FloorDiv => "//",
            Self::Mod => "%",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::BitAnd => "&",
            Self::BitXor => "^",
            Self::BitOr => "|",
            Self::In => "in",
            Self::NotIn => "not in",
            Self::Is => "is",
            Self::IsNot => "is not",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Ne => "!=",
            Self::Eq => "==",
            Self::And => "and",
            Self::Or => "or",
        }
    }
}

/// An expression tree. Every variant evaluates to a [`Value`] against an
/// ordered list of scopes.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Identifier(String),
    String(Interpolated),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    None,
    List(Vec<Expression>),
    Tuple(Vec<Expression>),
    Dict(Vec<(Expression, Expression)>),
    Dotted {
        target: Box<Expression>,
        name: String,
    },
    Subscript {
        target: Box<Expression>,
        index: Box<Expression>,
    },
    Call {
        target: Box<Expression>,
        args: Vec<Expression>,
        kwargs: VarDict,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
}

impl Expression {
    pub fn evaluate(&self, scopes: &[&Scope]) -> WyrmResult<Value> {
        match self {
            Self::Identifier(name) => Ok(lookup(scopes, name).cloned().unwrap_or_default()),
            Self::String(string) => string.evaluate(scopes).map(Value::Str),
            Self::Integer(i) => Ok(Value::Int(*i)),
            Self::Float(f) => Ok(Value::Float(*f)),
            Self::Boolean(b) => Ok(Value::Bool(*b)),
            Self::None => Ok(Value::None),
            Self::List(items) => items
                .iter()
                .map(|item| item.evaluate(scopes))
                .collect::<WyrmResult<_>>()
                .map(Value::List),
            Self::Tuple(items) => items
                .iter()
                .map(|item| item.evaluate(scopes))
                .collect::<WyrmResult<_>>()
                .map(Value::Tuple),
            Self::Dict(entries) => {
                let mut map = BTreeMap::new();
                for (key, value) in entries {
                    let key = match key.evaluate(scopes)? {
                        Value::Str(s) => s,
                        other => other.to_string(),
                    };
                    map.insert(key, value.evaluate(scopes)?);
                }
                Ok(Value::Dict(map))
            }
            Self::Dotted { target, name } => ops::attribute(target.evaluate(scopes)?, name),
            Self::Subscript { target, index } => {
                ops::subscript(target.evaluate(scopes)?, index.evaluate(scopes)?)
            }
            Self::Call {
                target,
                args,
                kwargs,
            } => match target.evaluate(scopes)? {
                Value::Function(func) => {
                    let args = args
                        .iter()
                        .map(|arg| arg.evaluate(scopes))
                        .collect::<WyrmResult<Vec<_>>>()?;
                    let kwargs = kwargs.evaluate_map(scopes)?;
                    func.call(&args, &kwargs)
                }
                other => Err(WyrmError::NotCallable {
                    found: other.type_name(),
                }),
            },
            Self::Unary { op, operand } => ops::unary(*op, operand.evaluate(scopes)?),
            Self::Binary {
                op: BinaryOp::And,
                left,
                right,
            } => {
                let left = left.evaluate(scopes)?;
                if left.is_truthy() {
                    right.evaluate(scopes)
                } else {
                    Ok(left)
                }
            }
            Self::Binary {
                op: BinaryOp::Or,
                left,
                right,
            } => {
                let left = left.evaluate(scopes)?;
                if left.is_truthy() {
                    Ok(left)
                } else {
                    right.evaluate(scopes)
                }
            }
            Self::Binary { op, left, right } => {
                ops::binary(*op, left.evaluate(scopes)?, right.evaluate(scopes)?)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Literal(String),
    Expr(Expression),
}

/// A string with `{expr}` holes, parsed once at compile time.
///
/// `\{` and `\}` produce literal braces.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Interpolated {
    segments: Vec<Segment>,
}

impl Interpolated {
    pub fn literal<T: Into<String>>(text: T) -> Self {
        let text = text.into();
        if text.is_empty() {
            return Self::default();
        }
        Self {
            segments: vec![Segment::Literal(text)],
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The text of a string with no interpolation holes.
    pub fn as_literal(&self) -> Option<String> {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Literal(text) => Some(text.as_str()),
                Segment::Expr(_) => None,
            })
            .collect()
    }

    /// Parse `text`, whose first character sits at (`line`, `column`).
    ///
    /// With `decode_escapes` the usual backslash escapes of string literals
    /// (`\n`, `\t`, `\\`, quotes) are decoded too; otherwise only brace
    /// escapes are recognised.
    pub(crate) fn parse(
        text: &str,
        line: usize,
        column: usize,
        decode_escapes: bool,
    ) -> CompileResult<Self> {
        let chars: Vec<char> = text.chars().collect();
        let mut segments = Vec::new();
        let mut buffer = String::new();
        let mut pos = 0;

        while let Some(&c) = chars.get(pos) {
            match c {
                '\\' => {
                    let next = chars.get(pos.saturating_add(1)).copied();
                    match next {
                        Some(brace @ ('{' | '}')) => buffer.push(brace),
                        Some(escaped) if decode_escapes => match escaped {
                            'n' => buffer.push('\n'),
                            't' => buffer.push('\t'),
                            'r' => buffer.push('\r'),
                            '0' => buffer.push('\0'),
                            '\\' | '\'' | '"' => buffer.push(escaped),
                            other => {
                                buffer.push('\\');
                                buffer.push(other);
                            }
                        },
                        Some(_) | None => {
                            buffer.push('\\');
                            pos = pos.saturating_add(1);
                            continue;
                        }
                    }
                    pos = pos.saturating_add(2);
                }
                '{' => {
                    if !buffer.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut buffer)));
                    }
                    let (tokens, end) =
                        lexer::ExprLexer::new(&chars, pos.saturating_add(1), line, column).lex_interpolation()?;
                    if tokens.is_empty() {
                        return Err(CompileError::new(
                            line,
                            column.saturating_add(end),
                            CompileErrorKind::unexpected("expression", "`}`"),
                        ));
                    }
                    let expr =
                        parser::parse_expression(&tokens, (line, column.saturating_add(end)))?;
                    segments.push(Segment::Expr(expr));
                    pos = end.saturating_add(1);
                }
                _ => {
                    buffer.push(c);
                    pos = pos.saturating_add(1);
                }
            }
        }
        if !buffer.is_empty() {
            segments.push(Segment::Literal(buffer));
        }
        Ok(Self { segments })
    }

    pub fn evaluate(&self, scopes: &[&Scope]) -> WyrmResult<String> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Expr(expr) => out.push_str(&expr.evaluate(scopes)?.to_output()),
            }
        }
        Ok(out)
    }
}

/// A bare, comma separated list of names, e.g. the targets of a `for`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VarList(pub Vec<String>);

impl VarList {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }
}

/// Ordered `name=expr` bindings, as used by `with`, `include` and keyword
/// arguments.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VarDict(pub Vec<(String, Expression)>);

impl VarDict {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn evaluate(&self, scopes: &[&Scope]) -> WyrmResult<Scope> {
        let mut scope = Scope::new();
        for (name, expr) in &self.0 {
            scope.insert(name, expr.evaluate(scopes)?);
        }
        Ok(scope)
    }

    fn evaluate_map(&self, scopes: &[&Scope]) -> WyrmResult<BTreeMap<String, Value>> {
        self.0
            .iter()
            .map(|(name, expr)| Ok((name.clone(), expr.evaluate(scopes)?)))
            .collect()
    }
}

/// HTML attributes in source order. A `None` value marks a bare boolean
/// attribute.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AttrDict(pub Vec<(String, Option<Expression>)>);

impl AttrDict {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Option<Expression>> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, e)| e)
    }
}
