use crate::{
    error::{CompileError, CompileErrorKind, CompileResult},
    expression::lexer::{ExprLexer, Stop},
    token::{Token, TokenKind},
};

/// Keywords whose argument-less form captures the indented lines below
/// verbatim.
const RAW_KEYWORDS: [&str; 3] = ["css", "js", "md"];

/// A multi-line capture started by an earlier line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    /// A plain text line; deeper lines continue it at `indent`.
    Text { indent: usize },
    /// Lines deeper than `indent` are emitted as [`TokenKind::Raw`]. `baseline`
    /// is fixed by the first captured line.
    Raw {
        indent: usize,
        baseline: Option<usize>,
    },
}

struct Lexer {
    tokens: Vec<Token>,
    block: Option<Block>,
    line: usize,
}

/// Split template source into tokens.
///
/// Every non-blank line yields an `Indent` token, then an `Indicator` (or a
/// `Raw` token inside a verbatim block), the line's content and a `Newline`.
/// Blank lines yield only the `Newline`.
pub fn tokenize(source: &str) -> CompileResult<Vec<Token>> {
    let mut lexer = Lexer {
        tokens: Vec::new(),
        block: None,
        line: 0,
    };
    let body = source.strip_suffix('\n').unwrap_or(source);
    if source.is_empty() {
        return Ok(lexer.tokens);
    }
    for line in body.split('\n') {
        lexer.line = lexer.line.saturating_add(1);
        let line = line.strip_suffix('\r').unwrap_or(line);
        lexer.lex_line(&line.chars().collect::<Vec<_>>())?;
    }
    Ok(lexer.tokens)
}

fn slice(chars: &[char], from: usize) -> String {
    chars.get(from..).unwrap_or_default().iter().collect()
}

impl Lexer {
    fn push(&mut self, kind: TokenKind, text: impl Into<String>, pos: usize) {
        self.tokens
            .push(Token::new(kind, text, self.line, pos.saturating_add(1)));
    }

    fn error(&self, pos: usize, kind: CompileErrorKind) -> CompileError {
        CompileError::new(self.line, pos.saturating_add(1), kind)
    }

    fn lex_line(&mut self, chars: &[char]) -> CompileResult<()> {
        if chars.iter().all(|c| c.is_whitespace()) {
            self.push(TokenKind::Newline, "", chars.len());
            return Ok(());
        }
        let indent = chars.iter().take_while(|&&c| c == ' ').count();
        if chars.get(indent) == Some(&'\t') {
            return Err(self.error(indent, CompileErrorKind::TabIndentation));
        }

        match self.block {
            Some(Block::Text { indent: base }) if indent > base => {
                self.push(TokenKind::Indent, " ".repeat(base), 0);
                self.push(TokenKind::Indicator, "", base);
                self.push(TokenKind::Text, slice(chars, base), base);
                self.push(TokenKind::Newline, "", chars.len());
                return Ok(());
            }
            Some(Block::Raw {
                indent: parent,
                baseline,
            }) if indent > parent => {
                let baseline = baseline.unwrap_or(indent);
                self.block = Some(Block::Raw {
                    indent: parent,
                    baseline: Some(baseline),
                });
                let at = indent.min(baseline);
                self.push(TokenKind::Indent, " ".repeat(at), 0);
                self.push(TokenKind::Raw, slice(chars, at), at);
                self.push(TokenKind::Newline, "", chars.len());
                return Ok(());
            }
            _ => self.block = None,
        }

        self.push(TokenKind::Indent, " ".repeat(indent), 0);
        self.lex_indicator(chars, indent, Some(indent))?;
        self.push(TokenKind::Newline, "", chars.len());
        Ok(())
    }

    /// Dispatch on the indicator at `pos`. `line_indent` is set for the first
    /// indicator on a line and `None` for an inline chain.
    fn lex_indicator(
        &mut self,
        chars: &[char],
        pos: usize,
        line_indent: Option<usize>,
    ) -> CompileResult<()> {
        let skip_space = |pos: usize| {
            if chars.get(pos) == Some(&' ') {
                pos.saturating_add(1)
            } else {
                pos
            }
        };
        let next = pos.saturating_add(1);
        match chars.get(pos) {
            None => Err(self.error(pos, CompileErrorKind::unexpected_end("content after `:`"))),
            Some('\\') => {
                self.push(TokenKind::Indicator, "\\", pos);
                self.push_text(chars, next);
                Ok(())
            }
            Some('/') => {
                let indicator = match chars.get(next) {
                    Some('/') => "//",
                    Some('!') => "/!",
                    other => {
                        return Err(self.error(
                            pos,
                            CompileErrorKind::UnknownIndicator {
                                indicator: other.map_or_else(|| "/".to_string(), |c| format!("/{c}")),
                            },
                        ));
                    }
                };
                self.push(TokenKind::Indicator, indicator, pos);
                self.push_text(chars, skip_space(pos.saturating_add(2)));
                if indicator == "//" {
                    if let Some(indent) = line_indent {
                        self.block = Some(Block::Raw {
                            indent,
                            baseline: None,
                        });
                    }
                }
                Ok(())
            }
            Some('%') => {
                self.push(TokenKind::Indicator, "%", pos);
                let pos = self.lex_tag_head(chars, skip_space(next))?;
                self.lex_expression(chars, pos)
            }
            Some('=') => {
                self.push(TokenKind::Indicator, "=", pos);
                self.lex_expression(chars, skip_space(next))
            }
            Some(&indicator @ ('-' | ':')) => {
                self.push(TokenKind::Indicator, indicator.to_string(), pos);
                let start = self.tokens.len();
                self.lex_expression(chars, next)?;
                let raw = match self.tokens.get(start..) {
                    Some([word]) => RAW_KEYWORDS.contains(&word.text.as_str()),
                    _ => false,
                };
                if raw {
                    if let Some(indent) = line_indent {
                        self.block = Some(Block::Raw {
                            indent,
                            baseline: None,
                        });
                    }
                }
                Ok(())
            }
            Some(_) => {
                self.push(TokenKind::Indicator, "", pos);
                self.push_text(chars, pos);
                if let Some(indent) = line_indent {
                    self.block = Some(Block::Text { indent });
                }
                Ok(())
            }
        }
    }

    fn push_text(&mut self, chars: &[char], pos: usize) {
        let text = slice(chars, pos);
        if !text.is_empty() {
            self.push(TokenKind::Text, text, pos);
        }
    }

    /// Lex `name#id.class`; returns the position after the head.
    fn lex_tag_head(&mut self, chars: &[char], mut pos: usize) -> CompileResult<usize> {
        let is_name = |c: &char| c.is_alphanumeric() || *c == '_' || *c == '-';
        let take_name = |lexer: &mut Self, pos: usize| {
            let len = chars
                .get(pos..)
                .unwrap_or_default()
                .iter()
                .take_while(|&&c| is_name(&c))
                .count();
            if len > 0 {
                let end = pos.saturating_add(len);
                let name: String = chars.get(pos..end).unwrap_or_default().iter().collect();
                lexer.push(TokenKind::Identifier, name, pos);
            }
            pos.saturating_add(len)
        };

        pos = take_name(self, pos);
        while let Some(&marker @ ('#' | '.')) = chars.get(pos) {
            self.push(TokenKind::Operator, marker.to_string(), pos);
            let after = pos.saturating_add(1);
            pos = take_name(self, after);
            if pos == after {
                let found = chars
                    .get(pos)
                    .map_or_else(|| "end of line".to_string(), |c| format!("`{c}`"));
                return Err(self.error(
                    pos,
                    CompileErrorKind::unexpected(format!("name after `{marker}`"), found),
                ));
            }
        }
        Ok(pos)
    }

    /// Lex expression tokens from `pos`, following any inline chain.
    fn lex_expression(&mut self, chars: &[char], pos: usize) -> CompileResult<()> {
        let (tokens, stop) = ExprLexer::new(chars, pos, self.line, 1).lex_line()?;
        self.tokens.extend(tokens);
        if let Stop::Inline(at) = stop {
            self.push(TokenKind::Inline, ":", at);
            let rest = chars
                .get(at.saturating_add(1)..)
                .unwrap_or_default()
                .iter()
                .take_while(|c| c.is_whitespace())
                .count();
            self.lex_indicator(chars, at.saturating_add(1).saturating_add(rest), None)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<(TokenKind, String)> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| (t.kind, t.text))
            .collect()
    }

    fn tok(kind: TokenKind, text: &str) -> (TokenKind, String) {
        (kind, text.to_string())
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_text_line() {
        assert_eq!(
            kinds("Hello {name}\n"),
            vec![
                tok(TokenKind::Indent, ""),
                tok(TokenKind::Indicator, ""),
                tok(TokenKind::Text, "Hello {name}"),
                tok(TokenKind::Newline, ""),
            ]
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_tag_head_and_inline_chain() {
        assert_eq!(
            kinds("% a#top.nav-link.x href=url: Home"),
            vec![
                tok(TokenKind::Indent, ""),
                tok(TokenKind::Indicator, "%"),
                tok(TokenKind::Identifier, "a"),
                tok(TokenKind::Operator, "#"),
                tok(TokenKind::Identifier, "top"),
                tok(TokenKind::Operator, "."),
                tok(TokenKind::Identifier, "nav-link"),
                tok(TokenKind::Operator, "."),
                tok(TokenKind::Identifier, "x"),
                tok(TokenKind::Identifier, "href"),
                tok(TokenKind::Operator, "="),
                tok(TokenKind::Identifier, "url"),
                tok(TokenKind::Inline, ":"),
                tok(TokenKind::Indicator, ""),
                tok(TokenKind::Text, "Home"),
                tok(TokenKind::Newline, ""),
            ]
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_keyword_line() {
        let tokens = tokenize("- for x in items").unwrap();
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, ["", "-", "for", "x", "in", "items", ""]);
        assert_eq!(tokens.get(2).unwrap().column, 3);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_blank_lines_emit_only_newline() {
        let tokens = kinds("a\n   \nb");
        assert_eq!(tokens.get(4).unwrap(), &tok(TokenKind::Newline, ""));
        assert_eq!(tokens.get(5).unwrap(), &tok(TokenKind::Indent, ""));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_text_continuation_keeps_extra_indent() {
        let tokens = kinds("  first\n      second %not a tag\n  - if x");
        assert!(tokens.contains(&tok(TokenKind::Text, "    second %not a tag")));
        // the continuation is emitted at the block's indentation
        assert_eq!(tokens.get(4).unwrap(), &tok(TokenKind::Indent, "  "));
        // a line back at the baseline is dispatched normally
        assert!(tokens.contains(&tok(TokenKind::Keyword, "if")));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_raw_block() {
        let tokens = kinds("- css\n    p { color: red; }\n        em {}\n\n    b {}\n%p");
        assert!(tokens.contains(&tok(TokenKind::Raw, "p { color: red; }")));
        assert!(tokens.contains(&tok(TokenKind::Raw, "    em {}")));
        assert!(tokens.contains(&tok(TokenKind::Raw, "b {}")));
        assert!(tokens.contains(&tok(TokenKind::Identifier, "p")));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_comment_opens_raw_block() {
        let tokens = kinds("// note\n  - if broken(\n%p");
        assert!(tokens.contains(&tok(TokenKind::Text, "note")));
        assert!(tokens.contains(&tok(TokenKind::Raw, "- if broken(")));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_escaped_text() {
        let tokens = kinds("\\%not a tag");
        assert_eq!(tokens.get(1).unwrap(), &tok(TokenKind::Indicator, "\\"));
        assert_eq!(tokens.get(2).unwrap(), &tok(TokenKind::Text, "%not a tag"));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_crlf() {
        let tokens = kinds("a\r\nb\r\n");
        assert!(tokens.contains(&tok(TokenKind::Text, "a")));
        assert!(tokens.contains(&tok(TokenKind::Text, "b")));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_tab_indentation_rejected() {
        let err = tokenize("%div\n  \tp").unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::TabIndentation);
        assert_eq!((err.line, err.column), (2, 3));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_unknown_indicator() {
        let err = tokenize("/x").unwrap_err();
        assert_eq!(
            err.kind,
            CompileErrorKind::UnknownIndicator {
                indicator: "/x".to_string()
            }
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_brackets_must_close_on_the_line() {
        let err = tokenize("= foo(1,\n  2)").unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::UnclosedBracket { bracket: '(' });
        assert_eq!((err.line, err.column), (1, 6));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_empty_inline_chain() {
        let err = tokenize("%p:").unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::unexpected_end("content after `:`"));
    }
}
