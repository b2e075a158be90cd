//! Turns the token stream into a node tree.
//!
//! Lines are placed by indentation using a stack of open nodes. A node is
//! attached to its parent only when it is popped, which happens once a line
//! at the same or a shallower indentation arrives (or at the end of input).

use crate::{
    error::{CompileError, CompileErrorKind, CompileResult},
    expression::{
        Expression, Interpolated, VarDict,
        parser::{Position, parse_expression, parse_var_dict, parse_var_list},
    },
    node::{Clause, Node},
    tag::{Tag, doctype_declaration, parse_attributes},
    token::{Token, TokenKind},
};

const DOCTYPE_VARIANTS: [&str; 3] = ["strict", "transitional", "frameset"];

/// An open node and where it came from.
struct Entry {
    /// Indentation plus one; the root sits at zero.
    depth: usize,
    line: usize,
    column: usize,
    node: Node,
}

struct Builder {
    stack: Vec<Entry>,
}

/// Build the node tree for a token stream produced by [`crate::lexer::tokenize`].
pub fn build(tokens: &[Token]) -> CompileResult<Node> {
    let mut builder = Builder {
        stack: vec![Entry {
            depth: 0,
            line: 0,
            column: 0,
            node: Node::root(),
        }],
    };

    for line in tokens.split_inclusive(|t| t.kind == TokenKind::Newline) {
        let (content, end) = match line.split_last() {
            Some((last, content)) if last.kind == TokenKind::Newline => {
                (content, (last.line, last.column))
            }
            _ => (line, line.last().map_or((0, 0), |t| (t.line, t.end_column()))),
        };
        match content.split_first() {
            None => builder.blank_line()?,
            Some((indent, rest)) => {
                let depth = indent.text.len().saturating_add(1);
                let nodes = match rest {
                    [raw] if raw.kind == TokenKind::Raw => vec![Node::Text {
                        text: Interpolated::literal(raw.text.clone()),
                    }],
                    _ => compile_line(rest, end)?,
                };
                let (line, column) = rest.first().map_or(end, |t| (t.line, t.column));
                builder.place(depth, line, column, nodes)?;
            }
        }
    }

    while builder.stack.len() > 1 {
        builder.pop()?;
    }
    builder
        .stack
        .pop()
        .map(|entry| entry.node)
        .ok_or_else(|| CompileError::new(0, 0, CompileErrorKind::unexpected_end("template")))
}

impl Builder {
    fn top(&self) -> Option<&Entry> {
        self.stack.last()
    }

    /// Pop the top entry into its parent. The root is never popped here.
    fn pop(&mut self) -> CompileResult<()> {
        if self.stack.len() <= 1 {
            return Ok(());
        }
        let Some(entry) = self.stack.pop() else {
            return Ok(());
        };
        if let Some(parent) = self.stack.last_mut() {
            parent
                .node
                .append(entry.node)
                .map_err(|kind| CompileError::new(entry.line, entry.column, kind))?;
        }
        Ok(())
    }

    fn blank_line(&mut self) -> CompileResult<()> {
        if let [root] = self.stack.as_slice() {
            if root.node.children().is_empty() {
                return Ok(());
            }
        }
        while self.top().is_some_and(|top| !top.node.accepts_children()) {
            self.pop()?;
        }
        if let Some(top) = self.stack.last_mut() {
            top.node
                .append(Node::blank())
                .map_err(|kind| CompileError::new(top.line, top.column, kind))?;
        }
        Ok(())
    }

    fn place(
        &mut self,
        depth: usize,
        line: usize,
        column: usize,
        nodes: Vec<Node>,
    ) -> CompileResult<()> {
        while self.top().is_some_and(|top| top.depth > depth) {
            self.pop()?;
        }

        match nodes.first().and_then(Node::continuation) {
            Some(clause) => loop {
                let construct = match clause {
                    "elif" => "if",
                    "empty" => "for",
                    _ => "if` or `for",
                };
                let Some(top) = self.top() else {
                    break;
                };
                let found = match (&top.node, clause) {
                    (Node::If { .. }, "elif" | "else") | (Node::For { .. }, "empty" | "else") => {
                        true
                    }
                    _ => false,
                };
                if found {
                    break;
                }
                if top.depth != depth {
                    return Err(CompileError::new(
                        line,
                        column,
                        CompileErrorKind::OrphanClause {
                            clause: clause.to_string(),
                            construct,
                        },
                    ));
                }
                self.pop()?;
            },
            None => {
                while self.top().is_some_and(|top| top.depth >= depth) {
                    self.pop()?;
                }
            }
        }

        if let Some(top) = self.top() {
            if !top.node.accepts_children() {
                return Err(CompileError::new(
                    line,
                    column,
                    CompileErrorKind::CannotTakeChildren {
                        node: top.node.kind_name(),
                    },
                ));
            }
        }
        self.stack.extend(nodes.into_iter().map(|node| Entry {
            depth,
            line,
            column,
            node,
        }));
        Ok(())
    }
}

fn error_at(token: &Token, kind: CompileErrorKind) -> CompileError {
    CompileError::new(token.line, token.column, kind)
}

/// Compile the tokens of one line, starting at its indicator, into sibling
/// nodes. An inline chain adds its nodes after the line's own.
pub(crate) fn compile_line(tokens: &[Token], end: Position) -> CompileResult<Vec<Node>> {
    let Some((indicator, rest)) = tokens.split_first() else {
        return Err(CompileError::new(
            end.0,
            end.1,
            CompileErrorKind::unexpected_end("line content"),
        ));
    };
    let (own, inline, own_end) = match rest.iter().position(|t| t.kind == TokenKind::Inline) {
        Some(at) => {
            let (own, tail) = rest.split_at(at);
            let inline_end = tail.first().map_or(end, |t| (t.line, t.column));
            (own, tail.get(1..), inline_end)
        }
        None => (rest, None, end),
    };

    let mut nodes = match indicator.text.as_str() {
        "" | "\\" => vec![Node::Text {
            text: text_of(own)?,
        }],
        "//" => vec![Node::Comment {
            children: Vec::new(),
        }],
        "/!" => vec![Node::HtmlComment {
            text: text_of(own)?,
            children: Vec::new(),
        }],
        "%" => vec![Node::HtmlTag {
            tag: Tag::parse(own, own_end)?,
            children: Vec::new(),
        }],
        "=" => vec![Node::Expression {
            expr: parse_expression(own, own_end)?,
        }],
        "-" | ":" => compile_keyword(own, own_end)?,
        other => {
            return Err(error_at(
                indicator,
                CompileErrorKind::UnknownIndicator {
                    indicator: other.to_string(),
                },
            ));
        }
    };

    if let Some(inline) = inline {
        nodes.extend(compile_line(inline, end)?);
    }
    Ok(nodes)
}

fn text_of(tokens: &[Token]) -> CompileResult<Interpolated> {
    match tokens {
        [] => Ok(Interpolated::default()),
        [text] => Interpolated::parse(&text.text, text.line, text.column, false),
        [_, extra, ..] => Err(error_at(
            extra,
            CompileErrorKind::unexpected("end of line", extra.to_string()),
        )),
    }
}

/// Index of the first top-level keyword token `word`.
fn find_keyword(tokens: &[Token], word: &str) -> Option<usize> {
    let mut depth = 0_usize;
    tokens.iter().position(|token| {
        match token.kind {
            TokenKind::LBracket => depth = depth.saturating_add(1),
            TokenKind::RBracket => depth = depth.saturating_sub(1),
            _ => return depth == 0 && token.is_keyword(word),
        }
        false
    })
}

/// Split off a leading `only` keyword.
fn strip_only(tokens: &[Token]) -> (bool, &[Token]) {
    match tokens.split_first() {
        Some((first, rest)) if first.is_keyword("only") => (true, rest),
        _ => (false, tokens),
    }
}

fn no_arguments(word: &Token, args: &[Token]) -> CompileResult<()> {
    match args.first() {
        Some(_) => Err(error_at(
            word,
            CompileErrorKind::ClauseTakesNoArguments {
                clause: word.text.clone(),
            },
        )),
        None => Ok(()),
    }
}

fn compile_keyword(tokens: &[Token], end: Position) -> CompileResult<Vec<Node>> {
    let Some((word, args)) = tokens.split_first() else {
        return Err(CompileError::new(
            end.0,
            end.1,
            CompileErrorKind::unexpected_end("keyword"),
        ));
    };
    if !matches!(word.kind, TokenKind::Keyword | TokenKind::Identifier) {
        return Err(error_at(
            word,
            CompileErrorKind::UnknownKeyword {
                keyword: word.text.clone(),
            },
        ));
    }

    let node = match word.text.as_str() {
        "if" => {
            return Ok(vec![
                Node::If {
                    children: Vec::new(),
                },
                Node::Condition {
                    clause: Clause::If,
                    guard: parse_expression(args, end)?,
                    children: Vec::new(),
                },
            ]);
        }
        "elif" => Node::Condition {
            clause: Clause::Elif,
            guard: parse_expression(args, end)?,
            children: Vec::new(),
        },
        "else" => {
            no_arguments(word, args)?;
            Node::Condition {
                clause: Clause::Else,
                guard: Expression::Boolean(true),
                children: Vec::new(),
            }
        }
        "for" => {
            let Some(at) = find_keyword(args, "in") else {
                return Err(CompileError::new(
                    end.0,
                    end.1,
                    CompileErrorKind::unexpected_end("`in`"),
                ));
            };
            let (targets, rest) = args.split_at(at);
            let in_token = rest.first().map_or(end, |t| (t.line, t.column));
            if targets.is_empty() {
                return Err(CompileError::new(
                    in_token.0,
                    in_token.1,
                    CompileErrorKind::unexpected("loop variable", "keyword `in`"),
                ));
            }
            let targets = parse_var_list(targets, in_token)?;
            return Ok(vec![
                Node::For {
                    targets,
                    container: parse_expression(rest.get(1..).unwrap_or_default(), end)?,
                    children: Vec::new(),
                },
                Node::Loop {
                    children: Vec::new(),
                },
            ]);
        }
        "empty" => {
            no_arguments(word, args)?;
            Node::Empty {
                children: Vec::new(),
            }
        }
        "with" => {
            let (only, bindings) = strip_only(args);
            Node::With {
                bindings: parse_var_dict(bindings, end)?,
                only,
                children: Vec::new(),
            }
        }
        "require" => Node::Require {
            names: parse_var_list(args, end)?,
        },
        "include" => {
            let (path, bindings, only) = match find_keyword(args, "with") {
                Some(at) => {
                    let (path, rest) = args.split_at(at);
                    let with_at = rest.first().map_or(end, |t| (t.line, t.column));
                    let (only, bindings) = strip_only(rest.get(1..).unwrap_or_default());
                    (
                        parse_expression(path, with_at)?,
                        parse_var_dict(bindings, end)?,
                        only,
                    )
                }
                None => (parse_expression(args, end)?, VarDict::default(), false),
            };
            Node::Include {
                path,
                bindings,
                only,
                children: Vec::new(),
            }
        }
        "block" => match args {
            [name] if name.kind == TokenKind::Identifier => Node::Block {
                name: name.text.clone(),
                children: Vec::new(),
            },
            [] => {
                return Err(CompileError::new(
                    end.0,
                    end.1,
                    CompileErrorKind::unexpected_end("block name"),
                ));
            }
            [first, ..] => {
                return Err(error_at(
                    first,
                    CompileErrorKind::unexpected("a single block name", first.to_string()),
                ));
            }
        },
        "html" => compile_html(args, end)?,
        "css" | "js" | "md" => {
            let src = match args.first() {
                Some(_) => Some(parse_expression(args, end)?),
                None => None,
            };
            let children = Vec::new();
            match word.text.as_str() {
                "css" => Node::Css { src, children },
                "js" => Node::Js { src, children },
                _ => Node::Markdown { src, children },
            }
        }
        other => {
            return Err(error_at(
                word,
                CompileErrorKind::UnknownKeyword {
                    keyword: other.to_string(),
                },
            ));
        }
    };
    Ok(vec![node])
}

/// `html [version [variant]] [attributes]`
fn compile_html(args: &[Token], end: Position) -> CompileResult<Node> {
    let mut doctype = None;
    let mut rest = args;
    if let Some((version, tail)) = args.split_first() {
        if version.kind == TokenKind::Number {
            let mut key = version.text.clone();
            rest = tail;
            if let Some((variant, tail)) = tail.split_first() {
                if variant.kind == TokenKind::Identifier
                    && DOCTYPE_VARIANTS.contains(&variant.text.as_str())
                {
                    key = format!("{key} {}", variant.text);
                    rest = tail;
                }
            }
            if doctype_declaration(&key).is_none() {
                return Err(error_at(
                    version,
                    CompileErrorKind::UnknownDoctype { doctype: key },
                ));
            }
            doctype = Some(key);
        }
    }
    Ok(Node::Html {
        doctype,
        tag: Tag {
            attributes: parse_attributes(rest, end)?,
            ..Tag::named("html")
        },
        children: Vec::new(),
    })
}
