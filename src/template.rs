use crate::{
    builder::build,
    error::WyrmResult,
    lexer::tokenize,
    loader::{Loader, NoLoader},
    node::Node,
    render::{Renderer, join_lines},
    scope::Scope,
};

/// A compiled template.
///
/// Compiling runs the lexer and tree builder once; the resulting tree is
/// immutable and can be rendered any number of times, from any thread.
///
/// # Example
///
/// ```rust
/// use wyrm::{Scope, Template};
///
/// let template = Template::new("%p.greeting: Hello, {name}!").unwrap();
///
/// let mut scope = Scope::new();
/// scope.insert("name", "World");
///
/// let html = template.render(&[&scope]).unwrap();
/// assert_eq!(html, r#"<p class="greeting">Hello, World!</p>"#);
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    source: String,
    #[cfg_attr(feature = "serde", serde(skip))]
    root: Node,
    #[cfg_attr(feature = "serde", serde(skip))]
    trailing_newline: bool,
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Template {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(serde::Deserialize)]
        struct TemplateHelper {
            source: String,
        }

        let helper = TemplateHelper::deserialize(deserializer)?;
        Self::new(helper.source)
            .map_err(|e| serde::de::Error::custom(format!("Failed to compile template: {e}")))
    }
}

impl Template {
    /// Compile `source` into a template.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::WyrmError::Compile`] error carrying the line and
    /// column of the first lexical, syntax or structural problem.
    pub fn new<T: Into<String>>(source: T) -> WyrmResult<Self> {
        let source = source.into();
        let tokens = tokenize(&source)?;
        let root = build(&tokens)?;
        tracing::debug!(
            tokens = tokens.len(),
            nodes = root.children().len(),
            "compiled template"
        );
        Ok(Self {
            trailing_newline: source.ends_with('\n'),
            source,
            root,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// The root of the compiled node tree.
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Render without a loader. `include` and sourced `md` nodes fail with
    /// [`crate::WyrmError::NoLoader`].
    ///
    /// `scopes` are searched innermost first; render options such as
    /// `_indentlength` are read from the last one.
    pub fn render(&self, scopes: &[&Scope]) -> WyrmResult<String> {
        self.render_with(&NoLoader, scopes)
    }

    /// Render, resolving includes and resource files through `loader`.
    pub fn render_with(&self, loader: &dyn Loader, scopes: &[&Scope]) -> WyrmResult<String> {
        let renderer = Renderer::new(loader, scopes);
        let lines = renderer.render(&self.root, scopes)?;
        Ok(join_lines(&lines, self.trailing_newline))
    }
}
