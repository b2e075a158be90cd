pub type WyrmResult<T> = std::result::Result<T, WyrmError>;
pub type CompileResult<T> = std::result::Result<T, CompileError>;

/// The broad class a compile error falls into.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Bad characters, unbalanced brackets, broken indentation.
    Lexical,
    /// Malformed expressions or clause arguments.
    Syntax,
    /// A node placed where the tree does not allow it.
    Structural,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, thiserror::Error)]
pub enum CompileErrorKind {
    #[error("unmatched bracket `{bracket}`")]
    UnmatchedBracket { bracket: char },
    #[error("mismatched brackets `{open}` and `{close}`")]
    MismatchedBracket { open: char, close: char },
    #[error("bracket `{bracket}` is never closed")]
    UnclosedBracket { bracket: char },
    #[error("unknown character `{character}`")]
    UnknownCharacter { character: char },
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("tabs are not allowed in indentation")]
    TabIndentation,
    #[error("unknown line indicator `{indicator}`")]
    UnknownIndicator { indicator: String },
    #[error("expected {expected}, found {found}")]
    UnexpectedToken { expected: String, found: String },
    #[error("unexpected end of line (expected {expected})")]
    UnexpectedEnd { expected: String },
    #[error("unknown keyword `{keyword}`")]
    UnknownKeyword { keyword: String },
    #[error("`{clause}` clause takes no arguments")]
    ClauseTakesNoArguments { clause: String },
    #[error("invalid attribute name `{name}`")]
    InvalidAttributeName { name: String },
    #[error("invalid number literal `{literal}`")]
    InvalidNumber { literal: String },
    #[error("expected `name=value`, found `{found}`")]
    NotAnAssignment { found: String },
    #[error("positional argument follows keyword argument")]
    PositionalAfterKeyword,
    #[error("unknown doctype `{doctype}`")]
    UnknownDoctype { doctype: String },
    #[error("{node} nodes cannot take children")]
    CannotTakeChildren { node: &'static str },
    #[error("`{clause}` clause without a matching `{construct}`")]
    OrphanClause {
        clause: String,
        construct: &'static str,
    },
    #[error("`{clause}` clause is not allowed here")]
    MisplacedClause { clause: String },
}

impl CompileErrorKind {
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::UnmatchedBracket { .. }
            | Self::MismatchedBracket { .. }
            | Self::UnclosedBracket { .. }
            | Self::UnknownCharacter { .. }
            | Self::UnterminatedString
            | Self::TabIndentation
            | Self::UnknownIndicator { .. } => ErrorCategory::Lexical,
            Self::UnexpectedToken { .. }
            | Self::UnexpectedEnd { .. }
            | Self::UnknownKeyword { .. }
            | Self::ClauseTakesNoArguments { .. }
            | Self::InvalidAttributeName { .. }
            | Self::InvalidNumber { .. }
            | Self::NotAnAssignment { .. }
            | Self::PositionalAfterKeyword
            | Self::UnknownDoctype { .. } => ErrorCategory::Syntax,
            Self::CannotTakeChildren { .. }
            | Self::OrphanClause { .. }
            | Self::MisplacedClause { .. } => ErrorCategory::Structural,
        }
    }

    pub fn unexpected<E: Into<String>, F: Into<String>>(expected: E, found: F) -> Self {
        Self::UnexpectedToken {
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn unexpected_end<E: Into<String>>(expected: E) -> Self {
        Self::UnexpectedEnd {
            expected: expected.into(),
        }
    }
}

/// An error raised while turning template source into a node tree.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, thiserror::Error)]
#[error("Compile error at line {line}, column {column}: {kind}")]
pub struct CompileError {
    pub line: usize,
    pub column: usize,
    #[source]
    pub kind: CompileErrorKind,
}

impl CompileError {
    pub const fn new(line: usize, column: usize, kind: CompileErrorKind) -> Self {
        Self { line, column, kind }
    }

    pub const fn category(&self) -> ErrorCategory {
        self.kind.category()
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, thiserror::Error)]
pub enum WyrmError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error("Template already exists: {template_name}")]
    TemplateExists { template_name: String },
    #[error("Template not found: {template_name}")]
    MissingTemplate { template_name: String },
    #[error("No loader available to resolve `{path}`")]
    NoLoader { path: String },
    #[error("Cannot load `{path}`: {message}")]
    Io { path: String, message: String },
    #[error("Including `{path}` exceeds the include depth limit of {limit}")]
    IncludeDepth { path: String, limit: usize },
    #[error("Invalid template path `{path}`: {reason}")]
    InvalidPath { path: String, reason: String },
    #[error("Variable not in scope: {variable_name}")]
    MissingVariable { variable_name: String },
    #[error("`{found}` value is not callable")]
    NotCallable { found: &'static str },
    #[error("`{found}` value is not subscriptable")]
    NotSubscriptable { found: &'static str },
    #[error("`{found}` value is not iterable")]
    NotIterable { found: &'static str },
    #[error("`{found}` value has no attribute `{attribute}`")]
    MissingAttribute {
        attribute: String,
        found: &'static str,
    },
    #[error("Key not found: {key}")]
    MissingKey { key: String },
    #[error("Index {index} out of range for length {length}")]
    IndexOutOfRange { index: i64, length: usize },
    #[error("Unsupported operand types for `{op}`: `{left}` and `{right}`")]
    UnsupportedOperands {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },
    #[error("Unsupported operand type for `{op}`: `{operand}`")]
    UnsupportedOperand {
        op: &'static str,
        operand: &'static str,
    },
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Integer overflow in `{op}`")]
    Overflow { op: &'static str },
    #[error("Cannot unpack {found} values into {expected} loop variables")]
    Unpack { expected: usize, found: usize },
    #[error("Unknown doctype `{doctype}`")]
    UnknownDoctype { doctype: String },
    #[error("Error in function `{name}`: {message}")]
    Function { name: String, message: String },
}

impl WyrmError {
    /// Convenience constructor for errors raised by host functions.
    pub fn function<N: Into<String>, M: Into<String>>(name: N, message: M) -> Self {
        Self::Function {
            name: name.into(),
            message: message.into(),
        }
    }
}
