//! Expression parser.
//!
//! A single left to right scan turns a token slice into a flat list of
//! operands and operator symbols, resolving brackets, calls, subscripts and
//! dotted access on the way. The list is then folded one precedence level at
//! a time.

use super::{BinaryOp, Expression, Interpolated, UnaryOp, VarDict, VarList};
use crate::{
    error::{CompileError, CompileErrorKind, CompileResult},
    token::{Token, TokenKind},
};

/// A `(line, column)` pair used to report errors past the last token.
pub(crate) type Position = (usize, usize);

/// Binary precedence levels below `**`, tightest first.
const LEVELS: [&[BinaryOp]; 9] = [
    &[BinaryOp::Mul, BinaryOp::Div, BinaryOp::FloorDiv, BinaryOp::Mod],
    &[BinaryOp::Add, BinaryOp::Sub],
    &[BinaryOp::Shl, BinaryOp::Shr],
    &[BinaryOp::BitAnd],
    &[BinaryOp::BitXor],
    &[BinaryOp::BitOr],
    &[
        BinaryOp::In,
        BinaryOp::NotIn,
        BinaryOp::Is,
        BinaryOp::IsNot,
        BinaryOp::Lt,
        BinaryOp::Le,
        BinaryOp::Gt,
        BinaryOp::Ge,
        BinaryOp::Ne,
        BinaryOp::Eq,
    ],
    &[BinaryOp::And],
    &[BinaryOp::Or],
];

/// The result of parsing one comma-free item.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Parsed {
    Expr(Expression),
    /// `name=expr`
    Assign(String, Expression),
    /// `key: value`, only meaningful inside a dict literal.
    Pair(Expression, Expression),
}

enum Partial {
    Operand(Expression),
    Operator(String, Position),
}

const fn position(token: &Token) -> Position {
    (token.line, token.column)
}

fn error_at((line, column): Position, kind: CompileErrorKind) -> CompileError {
    CompileError::new(line, column, kind)
}

fn unexpected(token: &Token, expected: &str) -> CompileError {
    error_at(
        position(token),
        CompileErrorKind::unexpected(expected, token.to_string()),
    )
}

/// Source text of a token run, for error messages.
pub(crate) fn describe(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(|t| t.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Index of the bracket closing the one opened at `open`.
fn closing_index(tokens: &[Token], open: usize) -> CompileResult<usize> {
    let mut depth = 0_usize;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        match token.kind {
            TokenKind::LBracket => depth = depth.saturating_add(1),
            TokenKind::RBracket => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Ok(i);
                }
            }
            _ => {}
        }
    }
    let token = tokens.get(open).map_or((0, 0), position);
    let bracket = tokens
        .get(open)
        .and_then(|t| t.text.chars().next())
        .unwrap_or('(');
    Err(error_at(token, CompileErrorKind::UnclosedBracket { bracket }))
}

/// Split on commas outside any bracket, returning each piece with the
/// position just past it. One trailing comma is allowed.
pub(crate) fn split_commas(
    tokens: &[Token],
    end: Position,
) -> CompileResult<Vec<(&[Token], Position)>> {
    let mut pieces = Vec::new();
    let mut depth = 0_usize;
    let mut start = 0;
    for (i, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::LBracket => depth = depth.saturating_add(1),
            TokenKind::RBracket => depth = depth.saturating_sub(1),
            TokenKind::Separator if depth == 0 && token.text == "," => {
                let piece = tokens.get(start..i).unwrap_or_default();
                if piece.is_empty() {
                    return Err(unexpected(token, "expression"));
                }
                pieces.push((piece, position(token)));
                start = i.saturating_add(1);
            }
            _ => {}
        }
    }
    let rest = tokens.get(start..).unwrap_or_default();
    if !rest.is_empty() || pieces.is_empty() {
        pieces.push((rest, end));
    }
    Ok(pieces)
}

pub(crate) fn has_top_level_comma(tokens: &[Token]) -> bool {
    let mut depth = 0_usize;
    tokens.iter().any(|token| {
        match token.kind {
            TokenKind::LBracket => depth = depth.saturating_add(1),
            TokenKind::RBracket => depth = depth.saturating_sub(1),
            _ => return depth == 0 && token.is(TokenKind::Separator, ","),
        }
        false
    })
}

/// Parse a single expression. Top level commas build a tuple.
pub(crate) fn parse_expression(tokens: &[Token], end: Position) -> CompileResult<Expression> {
    if has_top_level_comma(tokens) {
        let items = split_commas(tokens, end)?
            .into_iter()
            .map(|(piece, end)| parse_expression(piece, end))
            .collect::<CompileResult<_>>()?;
        return Ok(Expression::Tuple(items));
    }
    match parse(tokens, end)? {
        Parsed::Expr(expr) => Ok(expr),
        Parsed::Assign(..) | Parsed::Pair(..) => {
            let token = tokens
                .iter()
                .find(|t| t.is_operator("=") || t.is(TokenKind::Separator, ":"));
            Err(match token {
                Some(token) => unexpected(token, "expression"),
                None => error_at(end, CompileErrorKind::unexpected_end("expression")),
            })
        }
    }
}

/// Parse one comma-free item, which may be an assignment or a dict pair.
pub(crate) fn parse(tokens: &[Token], end: Position) -> CompileResult<Parsed> {
    let mut depth = 0_usize;
    let mut split = None;
    for (i, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::LBracket => depth = depth.saturating_add(1),
            TokenKind::RBracket => depth = depth.saturating_sub(1),
            TokenKind::Operator | TokenKind::Separator
                if depth == 0 && (token.text == "=" || token.text == ":") =>
            {
                if split.is_some() {
                    return Err(unexpected(token, "expression"));
                }
                split = Some(i);
            }
            _ => {}
        }
    }

    let Some(at) = split else {
        return parse_chain(tokens, end).map(Parsed::Expr);
    };
    let (left, rest) = tokens.split_at(at);
    let Some((marker, right)) = rest.split_first() else {
        return Err(error_at(end, CompileErrorKind::unexpected_end("expression")));
    };
    if left.is_empty() {
        return Err(unexpected(marker, "expression"));
    }
    let value = parse_chain(right, end)?;

    if marker.text == ":" {
        return Ok(Parsed::Pair(parse_chain(left, position(marker))?, value));
    }
    let name = match left {
        [token] if token.kind == TokenKind::Identifier => token.text.clone(),
        [token] if token.kind == TokenKind::String => {
            let literal = match parse_chain(left, position(marker))? {
                Expression::String(s) => s.as_literal(),
                _ => None,
            };
            literal.ok_or_else(|| unexpected(token, "a plain name"))?
        }
        _ => {
            return Err(error_at(
                left.first().map_or(end, position),
                CompileErrorKind::NotAnAssignment {
                    found: describe(tokens),
                },
            ));
        }
    };
    Ok(Parsed::Assign(name, value))
}

/// Parse comma separated call arguments into positional and keyword parts.
pub(crate) fn parse_arguments(
    tokens: &[Token],
    end: Position,
) -> CompileResult<(Vec<Expression>, VarDict)> {
    let mut args = Vec::new();
    let mut kwargs = VarDict::default();
    if tokens.is_empty() {
        return Ok((args, kwargs));
    }
    for (piece, piece_end) in split_commas(tokens, end)? {
        match parse(piece, piece_end)? {
            Parsed::Expr(expr) => {
                if !kwargs.is_empty() {
                    return Err(error_at(
                        piece.first().map_or(piece_end, position),
                        CompileErrorKind::PositionalAfterKeyword,
                    ));
                }
                args.push(expr);
            }
            Parsed::Assign(name, expr) => kwargs.0.push((name, expr)),
            Parsed::Pair(..) => {
                return Err(error_at(
                    piece.first().map_or(piece_end, position),
                    CompileErrorKind::unexpected("argument", describe(piece)),
                ));
            }
        }
    }
    Ok((args, kwargs))
}

/// Parse `a, b, c` where every item is a bare identifier.
pub(crate) fn parse_var_list(tokens: &[Token], end: Position) -> CompileResult<VarList> {
    let mut names = Vec::new();
    for (piece, piece_end) in split_commas(tokens, end)? {
        match piece {
            [token] if token.kind == TokenKind::Identifier => names.push(token.text.clone()),
            [] => return Err(error_at(piece_end, CompileErrorKind::unexpected_end("name"))),
            [token, ..] => return Err(unexpected(token, "name")),
        }
    }
    Ok(VarList(names))
}

/// Parse `a=1, b=x + 1` into ordered bindings.
pub(crate) fn parse_var_dict(tokens: &[Token], end: Position) -> CompileResult<VarDict> {
    let mut bindings = VarDict::default();
    for (piece, piece_end) in split_commas(tokens, end)? {
        match parse(piece, piece_end)? {
            Parsed::Assign(name, expr) => bindings.0.push((name, expr)),
            Parsed::Expr(_) | Parsed::Pair(..) => {
                return Err(error_at(
                    piece.first().map_or(piece_end, position),
                    CompileErrorKind::NotAnAssignment {
                        found: describe(piece),
                    },
                ));
            }
        }
    }
    Ok(bindings)
}

fn parse_number(token: &Token) -> CompileResult<Expression> {
    let invalid = || {
        error_at(
            position(token),
            CompileErrorKind::InvalidNumber {
                literal: token.text.clone(),
            },
        )
    };
    if token.text.contains('.') {
        token
            .text
            .parse::<f64>()
            .map(Expression::Float)
            .map_err(|_| invalid())
    } else {
        token
            .text
            .parse::<i64>()
            .map(Expression::Integer)
            .map_err(|_| invalid())
    }
}

fn parse_string(token: &Token) -> CompileResult<Expression> {
    let mut body = token.text.chars();
    body.next();
    body.next_back();
    Interpolated::parse(
        body.as_str(),
        token.line,
        token.column.saturating_add(1),
        true,
    )
    .map(Expression::String)
}

/// Scan tokens into partials and fold them into one expression.
fn parse_chain(tokens: &[Token], end: Position) -> CompileResult<Expression> {
    let mut partials: Vec<Partial> = Vec::new();
    let mut i = 0;

    while let Some(token) = tokens.get(i) {
        let after_operand = matches!(partials.last(), Some(Partial::Operand(_)));
        let mut next = i.saturating_add(1);

        let operand = match token.kind {
            TokenKind::Identifier => Some(Expression::Identifier(token.text.clone())),
            TokenKind::Number => Some(parse_number(token)?),
            TokenKind::String => Some(parse_string(token)?),
            TokenKind::Keyword => match token.text.as_str() {
                "True" => Some(Expression::Boolean(true)),
                "False" => Some(Expression::Boolean(false)),
                "None" => Some(Expression::None),
                "not" => {
                    let fused = after_operand
                        && tokens.get(next).is_some_and(|t| t.is_keyword("in"));
                    if fused {
                        next = next.saturating_add(1);
                    }
                    let symbol = if fused { "not in" } else { "not" };
                    partials.push(Partial::Operator(symbol.to_string(), position(token)));
                    None
                }
                "is" => {
                    let symbol = if tokens.get(next).is_some_and(|t| t.is_keyword("not")) {
                        next = next.saturating_add(1);
                        "is not"
                    } else {
                        "is"
                    };
                    partials.push(Partial::Operator(symbol.to_string(), position(token)));
                    None
                }
                "and" | "or" | "in" => {
                    partials.push(Partial::Operator(token.text.clone(), position(token)));
                    None
                }
                _ => return Err(unexpected(token, "expression")),
            },
            TokenKind::Operator if token.text == "." => {
                let name = match tokens.get(next) {
                    Some(t) if t.kind == TokenKind::Identifier && after_operand => t,
                    Some(t) if after_operand => return Err(unexpected(t, "attribute name")),
                    None if after_operand => {
                        return Err(error_at(end, CompileErrorKind::unexpected_end("attribute name")));
                    }
                    _ => return Err(unexpected(token, "expression")),
                };
                let Some(Partial::Operand(target)) = partials.pop() else {
                    return Err(unexpected(token, "expression"));
                };
                partials.push(Partial::Operand(Expression::Dotted {
                    target: Box::new(target),
                    name: name.text.clone(),
                }));
                i = next.saturating_add(1);
                continue;
            }
            TokenKind::Operator if token.text == "=" || token.text == "#" => {
                return Err(unexpected(token, "expression"));
            }
            TokenKind::Operator => {
                partials.push(Partial::Operator(token.text.clone(), position(token)));
                None
            }
            TokenKind::LBracket => {
                let close = closing_index(tokens, i)?;
                let inner = tokens.get(i.saturating_add(1)..close).unwrap_or_default();
                let inner_end = tokens.get(close).map_or(end, position);
                next = close.saturating_add(1);

                if after_operand {
                    let Some(Partial::Operand(target)) = partials.pop() else {
                        return Err(unexpected(token, "expression"));
                    };
                    let target = Box::new(target);
                    let expr = match token.text.as_str() {
                        "(" => {
                            let (args, kwargs) = parse_arguments(inner, inner_end)?;
                            Expression::Call {
                                target,
                                args,
                                kwargs,
                            }
                        }
                        "[" => Expression::Subscript {
                            target,
                            index: Box::new(parse_expression(inner, inner_end)?),
                        },
                        _ => return Err(unexpected(token, "operator")),
                    };
                    partials.push(Partial::Operand(expr));
                    i = next;
                    continue;
                }
                Some(parse_literal(token, inner, inner_end)?)
            }
            TokenKind::RBracket
            | TokenKind::Separator
            | TokenKind::Indent
            | TokenKind::Indicator
            | TokenKind::Text
            | TokenKind::Raw
            | TokenKind::Inline
            | TokenKind::Newline => return Err(unexpected(token, "expression")),
        };

        if let Some(expr) = operand {
            if after_operand {
                return Err(unexpected(token, "operator"));
            }
            partials.push(Partial::Operand(expr));
        }
        i = next;
    }

    reduce(partials, end)
}

/// A bracket at expression start: grouping, tuple, list or dict.
fn parse_literal(open: &Token, inner: &[Token], end: Position) -> CompileResult<Expression> {
    match open.text.as_str() {
        "(" if inner.is_empty() => Ok(Expression::Tuple(Vec::new())),
        "(" if has_top_level_comma(inner) => split_commas(inner, end)?
            .into_iter()
            .map(|(piece, end)| parse_expression(piece, end))
            .collect::<CompileResult<_>>()
            .map(Expression::Tuple),
        "(" => parse_expression(inner, end),
        "[" if inner.is_empty() => Ok(Expression::List(Vec::new())),
        "[" => split_commas(inner, end)?
            .into_iter()
            .map(|(piece, end)| parse_expression(piece, end))
            .collect::<CompileResult<_>>()
            .map(Expression::List),
        _ if inner.is_empty() => Ok(Expression::Dict(Vec::new())),
        _ => {
            let mut entries = Vec::new();
            for (piece, piece_end) in split_commas(inner, end)? {
                match parse(piece, piece_end)? {
                    Parsed::Pair(key, value) => entries.push((key, value)),
                    Parsed::Expr(_) | Parsed::Assign(..) => {
                        return Err(error_at(
                            piece.first().map_or(piece_end, position),
                            CompileErrorKind::unexpected("`key: value`", describe(piece)),
                        ));
                    }
                }
            }
            Ok(Expression::Dict(entries))
        }
    }
}

/// Operands and the binary operators between them.
#[derive(Default)]
struct Chain {
    operands: Vec<Expression>,
    ops: Vec<BinaryOp>,
}

fn combine(op: BinaryOp, left: Expression, right: Expression) -> Expression {
    Expression::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

impl Chain {
    fn fold_left(self, level: &[BinaryOp]) -> Self {
        let mut out = Self::default();
        let mut operands = self.operands.into_iter();
        let Some(mut acc) = operands.next() else {
            return out;
        };
        for (op, right) in self.ops.into_iter().zip(operands) {
            if level.contains(&op) {
                acc = combine(op, acc, right);
            } else {
                out.operands.push(acc);
                out.ops.push(op);
                acc = right;
            }
        }
        out.operands.push(acc);
        out
    }

    fn fold_right(self, level: &[BinaryOp]) -> Self {
        let mut out = Self::default();
        let mut operands = self.operands.into_iter().rev();
        let Some(mut acc) = operands.next() else {
            return out;
        };
        for (op, left) in self.ops.into_iter().rev().zip(operands) {
            if level.contains(&op) {
                acc = combine(op, left, acc);
            } else {
                out.operands.push(acc);
                out.ops.push(op);
                acc = left;
            }
        }
        out.operands.push(acc);
        out.operands.reverse();
        out.ops.reverse();
        out
    }
}

fn reduce(partials: Vec<Partial>, end: Position) -> CompileResult<Expression> {
    let mut chain = Chain::default();
    let mut unary: Vec<UnaryOp> = Vec::new();
    let mut expect_operand = true;

    for partial in partials {
        match partial {
            Partial::Operand(mut expr) => {
                while let Some(op) = unary.pop() {
                    expr = Expression::Unary {
                        op,
                        operand: Box::new(expr),
                    };
                }
                chain.operands.push(expr);
                expect_operand = false;
            }
            Partial::Operator(symbol, at) => {
                let found = || CompileErrorKind::unexpected("operand", format!("`{symbol}`"));
                if expect_operand {
                    unary.push(UnaryOp::from_symbol(&symbol).ok_or_else(|| error_at(at, found()))?);
                } else {
                    chain.ops.push(BinaryOp::from_symbol(&symbol).ok_or_else(|| {
                        error_at(at, CompileErrorKind::unexpected("operator", format!("`{symbol}`")))
                    })?);
                    expect_operand = true;
                }
            }
        }
    }
    if expect_operand {
        let expected = if chain.operands.is_empty() && unary.is_empty() {
            "expression"
        } else {
            "operand"
        };
        return Err(error_at(end, CompileErrorKind::unexpected_end(expected)));
    }

    let mut chain = chain.fold_right(&[BinaryOp::Pow]);
    for level in LEVELS {
        chain = chain.fold_left(level);
    }
    chain
        .operands
        .pop()
        .ok_or_else(|| error_at(end, CompileErrorKind::unexpected_end("expression")))
}
