use crate::{
    error::{CompileError, CompileErrorKind, CompileResult},
    token::{Token, TokenKind},
};

/// Words that lex as keywords rather than identifiers.
const RESERVED: [&str; 14] = [
    "True", "False", "None", "if", "elif", "else", "for", "only", "with", "and", "or", "not",
    "in", "is",
];

/// Multi-character operators, longest first so `**` wins over `*`.
const OPERATORS_2: [&str; 8] = ["**", "//", "<<", ">>", "<=", ">=", "!=", "=="];
const OPERATORS_1: &str = "*/%+-~&|^<>=#.";

/// Where the expression lexer stopped.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Stop {
    /// Reached the end of the input.
    End,
    /// Hit an un-bracketed `:` at this index.
    Inline(usize),
}

/// Tokenizer for the expression sub-language.
///
/// Works on one line of characters at a time; `column_base` is the 1-indexed
/// column of `chars[0]`.
pub(crate) struct ExprLexer<'a> {
    chars: &'a [char],
    pos: usize,
    line: usize,
    column_base: usize,
    /// Open brackets with the column they were opened at.
    brackets: Vec<(char, usize)>,
    tokens: Vec<Token>,
}

impl<'a> ExprLexer<'a> {
    pub(crate) const fn new(chars: &'a [char], pos: usize, line: usize, column_base: usize) -> Self {
        Self {
            chars,
            pos,
            line,
            column_base,
            brackets: Vec::new(),
            tokens: Vec::new(),
        }
    }

    #[inline]
    const fn column(&self, pos: usize) -> usize {
        self.column_base.saturating_add(pos)
    }

    #[inline]
    const fn advance(&mut self, n: usize) {
        self.pos = self.pos.saturating_add(n);
    }

    #[inline]
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    #[inline]
    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos.saturating_add(offset)).copied()
    }

    fn error_at(&self, pos: usize, kind: CompileErrorKind) -> CompileError {
        CompileError::new(self.line, self.column(pos), kind)
    }

    fn skip_spaces(&mut self) {
        while self.peek() == Some(' ') {
            self.advance(1);
        }
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        let text: String = self.chars.get(start..self.pos).unwrap_or_default().iter().collect();
        self.tokens.push(Token::new(kind, text, self.line, self.column(start)));
    }

    /// Lex to the end of the line or the first un-bracketed `:`.
    ///
    /// Every bracket opened must also close before the end of the line.
    pub(crate) fn lex_line(mut self) -> CompileResult<(Vec<Token>, Stop)> {
        loop {
            self.skip_spaces();
            let Some(c) = self.peek() else {
                if let Some(&(bracket, column)) = self.brackets.last() {
                    return Err(CompileError::new(
                        self.line,
                        column,
                        CompileErrorKind::UnclosedBracket { bracket },
                    ));
                }
                return Ok((self.tokens, Stop::End));
            };
            if c == ':' && self.brackets.is_empty() {
                return Ok((self.tokens, Stop::Inline(self.pos)));
            }
            self.lex_token(c)?;
        }
    }

    /// Lex the inside of a `{...}` interpolation. `self.pos` must sit just
    /// after the opening brace; returns the index of the closing brace.
    pub(crate) fn lex_interpolation(mut self) -> CompileResult<(Vec<Token>, usize)> {
        let open = self.pos.saturating_sub(1);
        self.brackets.push(('{', self.column(open)));
        loop {
            self.skip_spaces();
            let Some(c) = self.peek() else {
                return Err(self.error_at(open, CompileErrorKind::UnclosedBracket { bracket: '{' }));
            };
            if c == '}' && self.brackets.len() == 1 {
                return Ok((self.tokens, self.pos));
            }
            self.lex_token(c)?;
        }
    }

    fn lex_token(&mut self, c: char) -> CompileResult<()> {
        let start = self.pos;
        match c {
            'a'..='z' | 'A'..='Z' | '_' => {
                while self
                    .peek()
                    .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
                {
                    self.advance(1);
                }
                let word: String = self.chars.get(start..self.pos).unwrap_or_default().iter().collect();
                let kind = if RESERVED.contains(&word.as_str()) {
                    TokenKind::Keyword
                } else {
                    TokenKind::Identifier
                };
                self.tokens
                    .push(Token::new(kind, word, self.line, self.column(start)));
            }
            '0'..='9' => {
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.advance(1);
                }
                if self.peek() == Some('.')
                    && self
                        .peek_at(1)
                        .is_none_or(|c| !c.is_ascii_alphabetic() && c != '_')
                {
                    self.advance(1);
                    while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                        self.advance(1);
                    }
                }
                self.push(TokenKind::Number, start);
            }
            '"' | '\'' => {
                self.advance(1);
                loop {
                    match self.peek() {
                        None => {
                            return Err(self.error_at(start, CompileErrorKind::UnterminatedString));
                        }
                        Some('\\') => self.advance(2),
                        Some(q) if q == c => {
                            self.advance(1);
                            break;
                        }
                        Some(_) => self.advance(1),
                    }
                }
                self.push(TokenKind::String, start);
            }
            '(' | '[' | '{' => {
                self.brackets.push((c, self.column(start)));
                self.advance(1);
                self.push(TokenKind::LBracket, start);
            }
            ')' | ']' | '}' => {
                let Some((open, _)) = self.brackets.pop() else {
                    return Err(self.error_at(start, CompileErrorKind::UnmatchedBracket { bracket: c }));
                };
                if closing_for(open) != c {
                    return Err(self.error_at(
                        start,
                        CompileErrorKind::MismatchedBracket { open, close: c },
                    ));
                }
                self.advance(1);
                self.push(TokenKind::RBracket, start);
            }
            ',' | ':' => {
                self.advance(1);
                self.push(TokenKind::Separator, start);
            }
            _ => {
                let two: String = [Some(c), self.peek_at(1)].into_iter().flatten().collect();
                if OPERATORS_2.contains(&two.as_str()) {
                    self.advance(2);
                } else if OPERATORS_1.contains(c) {
                    self.advance(1);
                } else {
                    return Err(self.error_at(start, CompileErrorKind::UnknownCharacter { character: c }));
                }
                self.push(TokenKind::Operator, start);
            }
        }
        Ok(())
    }
}

pub(crate) const fn closing_for(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

/// Tokenize a standalone expression. An un-bracketed `:` is rejected since
/// there is no line to chain onto.
#[cfg(test)]
pub(crate) fn tokenize_expression(source: &str) -> CompileResult<Vec<Token>> {
    let chars: Vec<char> = source.chars().collect();
    let (tokens, stop) = ExprLexer::new(&chars, 0, 1, 1).lex_line()?;
    match stop {
        Stop::End => Ok(tokens),
        Stop::Inline(pos) => Err(CompileError::new(
            1,
            pos.saturating_add(1),
            CompileErrorKind::unexpected("end of expression", "`:`"),
        )),
    }
}
