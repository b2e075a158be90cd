use crate::{scope::Scope, value::Value};

/// Settings that shape rendered output.
///
/// Options travel as ordinary variables in the outermost scope, so they can
/// also be set by hand under `_doctype` and `_indentlength`.
///
/// ```
/// use wyrm::{RenderOptions, Template};
///
/// let options = RenderOptions {
///     indent: 2,
///     ..RenderOptions::default()
/// };
/// let template = Template::new("%ul\n    %li: a\n    %li: b").unwrap();
/// let html = template.render(&[&options.scope()]).unwrap();
/// assert_eq!(html, "<ul>\n  <li>a</li>\n  <li>b</li>\n</ul>");
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RenderOptions {
    /// Doctype used by `html` nodes that do not name one, e.g. `5` or
    /// `4 transitional`.
    pub doctype: String,
    /// Spaces added per nesting level.
    pub indent: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            doctype: "5".to_string(),
            indent: 4,
        }
    }
}

impl RenderOptions {
    /// A scope holding these options, meant to be passed last.
    pub fn scope(&self) -> Scope {
        let mut scope = Scope::new();
        scope
            .insert("_doctype", self.doctype.as_str())
            .insert("_indentlength", Value::from(self.indent));
        scope
    }
}
