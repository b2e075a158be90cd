use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Leading spaces of a line. The token text is the indentation itself.
    Indent,
    /// The symbol selecting what kind of node a line compiles to.
    Indicator,
    /// Text captured to the end of the line, subject to `{expr}` interpolation.
    Text,
    /// Text captured verbatim, never interpolated.
    Raw,
    /// An un-bracketed `:` chaining another indicator onto the same line.
    Inline,
    Newline,
    Operator,
    /// `,` anywhere or `:` inside brackets.
    Separator,
    LBracket,
    RBracket,
    Identifier,
    /// Reserved words and keyword operators (`and`, `or`, `not`, `in`, `is`).
    Keyword,
    /// A quoted string literal, quotes included.
    String,
    Number,
}

impl TokenKind {
    pub const fn describe(self) -> &'static str {
        match self {
            Self::Indent => "indentation",
            Self::Indicator => "indicator",
            Self::Text => "text",
            Self::Raw => "raw text",
            Self::Inline => "`:`",
            Self::Newline => "end of line",
            Self::Operator => "operator",
            Self::Separator => "separator",
            Self::LBracket => "opening bracket",
            Self::RBracket => "closing bracket",
            Self::Identifier => "identifier",
            Self::Keyword => "keyword",
            Self::String => "string",
            Self::Number => "number",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// 1-indexed line number.
    pub line: usize,
    /// 1-indexed column, counted in characters.
    pub column: usize,
}

impl Token {
    pub fn new<T: Into<String>>(kind: TokenKind, text: T, line: usize, column: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            line,
            column,
        }
    }

    /// True for a token of `kind` whose text is exactly `text`.
    pub fn is(&self, kind: TokenKind, text: &str) -> bool {
        self.kind == kind && self.text == text
    }

    pub fn is_keyword(&self, word: &str) -> bool {
        self.is(TokenKind::Keyword, word)
    }

    pub fn is_operator(&self, op: &str) -> bool {
        self.is(TokenKind::Operator, op)
    }

    /// The column just past the end of this token.
    pub fn end_column(&self) -> usize {
        self.column.saturating_add(self.text.chars().count())
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Newline => f.write_str("end of line"),
            TokenKind::Indent
            | TokenKind::Indicator
            | TokenKind::Text
            | TokenKind::Raw
            | TokenKind::Inline
            | TokenKind::Operator
            | TokenKind::Separator
            | TokenKind::LBracket
            | TokenKind::RBracket
            | TokenKind::Identifier
            | TokenKind::Keyword
            | TokenKind::String
            | TokenKind::Number => write!(f, "{} `{}`", self.kind.describe(), self.text),
        }
    }
}
