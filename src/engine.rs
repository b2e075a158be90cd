use std::{collections::HashMap, sync::Arc};

use crate::{
    error::{WyrmError, WyrmResult},
    loader::Loader,
    scope::Scope,
    template::Template,
};

/// An in-memory collection of named templates and resource files.
///
/// The engine is itself a [`Loader`]: `include` paths resolve against the
/// template names and `md` sources against the file names.
///
/// # Examples
///
/// ```
/// use wyrm::{Engine, Scope};
///
/// let mut engine = Engine::new();
/// engine.add_template("layout", "%main\n    - block content").unwrap();
/// engine
///     .add_template("page", "- include 'layout'\n    - block content: Hello, {name}!")
///     .unwrap();
///
/// let mut scope = Scope::new();
/// scope.insert("name", "World");
///
/// let output = engine.render("page", &[&scope]).unwrap();
/// assert_eq!(output, "<main>Hello, World!</main>");
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default)]
pub struct Engine {
    templates: HashMap<String, Arc<Template>>,
    files: HashMap<String, String>,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile `source` and register it under `name`.
    ///
    /// # Errors
    ///
    /// * [`WyrmError::TemplateExists`] if `name` is already taken.
    /// * [`WyrmError::Compile`] if the source does not compile.
    pub fn add_template<N: AsRef<str>, S: Into<String>>(
        &mut self,
        name: N,
        source: S,
    ) -> WyrmResult<()> {
        let name = name.as_ref();
        if self.templates.contains_key(name) {
            return Err(WyrmError::TemplateExists {
                template_name: name.to_string(),
            });
        }
        let template = Template::new(source)?;
        tracing::debug!(name, "registered template");
        self.templates.insert(name.to_string(), Arc::new(template));
        Ok(())
    }

    /// Register a resource file. The name includes its extension, e.g.
    /// `notes.md`. An existing file of the same name is replaced.
    pub fn add_file<N: Into<String>, C: Into<String>>(&mut self, name: N, contents: C) {
        self.files.insert(name.into(), contents.into());
    }

    pub fn get_template(&self, name: &str) -> Option<&Arc<Template>> {
        self.templates.get(name)
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Render the template registered under `name`.
    pub fn render(&self, name: &str, scopes: &[&Scope]) -> WyrmResult<String> {
        let template = self
            .templates
            .get(name)
            .ok_or_else(|| WyrmError::MissingTemplate {
                template_name: name.to_string(),
            })?;
        template.render_with(self, scopes)
    }
}

impl Loader for Engine {
    fn load_template(&self, path: &str) -> WyrmResult<Arc<Template>> {
        tracing::trace!(path, "loading template");
        self.templates
            .get(path)
            .cloned()
            .ok_or_else(|| WyrmError::MissingTemplate {
                template_name: path.to_string(),
            })
    }

    fn load_file(&self, path: &str, extension: &str) -> WyrmResult<String> {
        let name = format!("{path}{extension}");
        match self.files.get(&name) {
            Some(contents) => Ok(contents.clone()),
            None => Err(WyrmError::Io {
                path: name,
                message: "no such file".to_string(),
            }),
        }
    }
}
