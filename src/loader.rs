//! Resolution of included templates and resource files.

use std::{
    collections::HashMap,
    fs,
    path::{Component, Path, PathBuf},
    sync::Arc,
};

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use pulldown_cmark::{Options, Parser, html};

use crate::{
    error::{WyrmError, WyrmResult},
    scope::Scope,
    template::Template,
};

/// Supplies templates and files to a render.
///
/// Implementations are shared between threads rendering at the same time.
pub trait Loader: Send + Sync {
    /// Resolve an `include` path to a compiled template.
    fn load_template(&self, path: &str) -> WyrmResult<Arc<Template>>;

    /// Read a resource file such as the source of an `md` node.
    /// `extension` includes the leading dot.
    fn load_file(&self, path: &str, extension: &str) -> WyrmResult<String>;

    /// Convert Markdown to HTML.
    fn markdown(&self, text: &str) -> WyrmResult<String> {
        let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
        let mut out = String::with_capacity(text.len());
        html::push_html(&mut out, Parser::new_ext(text, options));
        Ok(out)
    }
}

/// A loader that resolves nothing. Used by [`Template::render`].
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLoader;

impl Loader for NoLoader {
    fn load_template(&self, path: &str) -> WyrmResult<Arc<Template>> {
        Err(WyrmError::NoLoader {
            path: path.to_string(),
        })
    }

    fn load_file(&self, path: &str, extension: &str) -> WyrmResult<String> {
        Err(WyrmError::NoLoader {
            path: format!("{path}{extension}"),
        })
    }
}

type Cache = RwLock<HashMap<PathBuf, Arc<OnceCell<Arc<Template>>>>>;

/// Loads templates from a directory tree.
///
/// Paths are relative to the base directory; `..` components and absolute
/// paths are rejected. Compiled templates are cached by path.
///
/// ```no_run
/// use wyrm::{FileSystemLoader, Scope};
///
/// let loader = FileSystemLoader::new("templates");
/// let mut scope = Scope::new();
/// scope.insert("title", "Home");
/// let html = loader.render("index", &[&scope]).unwrap();
/// ```
#[derive(Debug)]
pub struct FileSystemLoader {
    base_dir: PathBuf,
    extension: String,
    cache: Cache,
}

impl FileSystemLoader {
    /// Template paths get the `wyrm` extension unless changed with
    /// [`FileSystemLoader::with_extension`].
    pub fn new<P: Into<PathBuf>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.into(),
            extension: "wyrm".to_string(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_extension<E: Into<String>>(mut self, extension: E) -> Self {
        self.extension = extension.into().trim_start_matches('.').to_string();
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Load and render the template at `path`.
    pub fn render(&self, path: &str, scopes: &[&Scope]) -> WyrmResult<String> {
        self.load_template(path)?.render_with(self, scopes)
    }

    /// Drop every cached template.
    pub fn clear_cache(&self) {
        self.cache.write().clear();
    }

    fn resolve(&self, path: &str) -> WyrmResult<PathBuf> {
        let invalid = |reason: &str| WyrmError::InvalidPath {
            path: path.to_string(),
            reason: reason.to_string(),
        };
        if path.is_empty() {
            return Err(invalid("empty path"));
        }
        for component in Path::new(path).components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                Component::ParentDir => {
                    return Err(invalid("parent directory references are not allowed"));
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(invalid("absolute paths are not allowed"));
                }
            }
        }
        Ok(self.base_dir.join(path))
    }

    fn read(&self, path: &str, full_path: &Path) -> WyrmResult<String> {
        tracing::trace!(path = %full_path.display(), "reading file");
        fs::read_to_string(full_path).map_err(|err| WyrmError::Io {
            path: path.to_string(),
            message: err.to_string(),
        })
    }

    fn cell(&self, full_path: &Path) -> Arc<OnceCell<Arc<Template>>> {
        let cached = self.cache.read().get(full_path).map(Arc::clone);
        if let Some(cell) = cached {
            return cell;
        }
        Arc::clone(
            self.cache
                .write()
                .entry(full_path.to_path_buf())
                .or_default(),
        )
    }
}

impl Loader for FileSystemLoader {
    fn load_template(&self, path: &str) -> WyrmResult<Arc<Template>> {
        let mut full_path = self.resolve(path)?;
        if full_path.extension().is_none() && !self.extension.is_empty() {
            full_path.set_extension(&self.extension);
        }
        let cell = self.cell(&full_path);
        cell.get_or_try_init(|| {
            let source = self.read(path, &full_path)?;
            tracing::debug!(path = %full_path.display(), "caching template");
            Template::new(source).map(Arc::new)
        })
        .cloned()
    }

    fn load_file(&self, path: &str, extension: &str) -> WyrmResult<String> {
        let full_path = self.resolve(&format!("{path}{extension}"))?;
        self.read(path, &full_path)
    }
}
