//! An indentation-sensitive HTML template language.
//!
//! Templates are plain text where each line's leading indicator decides what
//! it becomes: `%tag` for elements, `=` for expression output, `-` for control
//! keywords, `//` for comments. Nesting follows indentation.
//!
//! ```
//! use wyrm::{Scope, Value};
//!
//! let template = wyrm::compile(
//!     "% div#main.page\n    = 1 + 2\n    - for x in items\n        = x * 10\n    - empty\n        no items",
//! )
//! .unwrap();
//!
//! let mut scope = Scope::new();
//! scope.insert("items", vec![1, 2]);
//! assert_eq!(
//!     template.render(&[&scope]).unwrap(),
//!     "<div id=\"main\" class=\"page\">\n    3\n    10\n    20\n</div>"
//! );
//!
//! scope.insert("items", Value::List(Vec::new()));
//! assert_eq!(
//!     template.render(&[&scope]).unwrap(),
//!     "<div id=\"main\" class=\"page\">\n    3\n    no items\n</div>"
//! );
//! ```

mod builder;
mod engine;
mod error;
mod expression;
mod lexer;
mod loader;
mod node;
mod options;
mod render;
mod scope;
mod tag;
mod template;
mod token;
mod value;

// Public exports.
pub use engine::Engine;
pub use error::{CompileError, CompileErrorKind, CompileResult, ErrorCategory, WyrmError, WyrmResult};
pub use expression::{AttrDict, BinaryOp, Expression, Interpolated, Segment, UnaryOp, VarDict, VarList};
pub use lexer::tokenize;
pub use loader::{FileSystemLoader, Loader, NoLoader};
pub use node::{Clause, Node};
pub use options::RenderOptions;
pub use scope::Scope;
pub use tag::{Tag, VOID_TAGS, doctype_declaration};
pub use template::Template;
pub use token::{Token, TokenKind};
pub use value::{Function, NativeFn, Value};

/// Compile template source. Shorthand for [`Template::new`].
pub fn compile<T: Into<String>>(source: T) -> WyrmResult<Template> {
    Template::new(source)
}
