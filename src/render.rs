use std::collections::BTreeMap;

use crate::{
    error::{WyrmError, WyrmResult},
    expression::{Expression, Interpolated, VarDict, VarList},
    loader::Loader,
    node::Node,
    scope::{Scope, lookup, option},
    tag::{Tag, doctype_declaration, escape_attribute},
    value::Value,
};

const DEFAULT_INDENT: usize = 4;
const DEFAULT_DOCTYPE: &str = "5";
/// How many includes may be open at once. Guards against templates that
/// include themselves, directly or through a cycle.
pub(crate) const MAX_INCLUDE_DEPTH: usize = 64;

/// One output line, indented relative to its enclosing container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Line {
    pub text: String,
    pub indent: usize,
}

impl Line {
    pub fn new<T: Into<String>>(text: T) -> Self {
        Self {
            text: text.into(),
            indent: 0,
        }
    }

    fn write_to(&self, out: &mut String) {
        if !self.text.is_empty() {
            out.extend(std::iter::repeat_n(' ', self.indent));
            out.push_str(&self.text);
        }
    }
}

/// Join rendered lines into the final output text.
pub(crate) fn join_lines(lines: &[Line], trailing_newline: bool) -> String {
    let mut out = String::new();
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        line.write_to(&mut out);
    }
    if trailing_newline {
        out.push('\n');
    }
    out
}

fn split_lines(text: &str) -> impl Iterator<Item = Line> + '_ {
    text.split('\n').map(Line::new)
}

/// Build a scope chain with `first` in front of `rest`.
fn chain<'s>(first: &'s Scope, rest: &[&'s Scope]) -> Vec<&'s Scope> {
    let mut scopes = Vec::with_capacity(rest.len().saturating_add(1));
    scopes.push(first);
    scopes.extend_from_slice(rest);
    scopes
}

/// `[first, outermost]` for `only`, otherwise `[first, ...rest]`.
fn bind<'s>(first: &'s Scope, rest: &[&'s Scope], only: bool) -> Vec<&'s Scope> {
    if only {
        chain(first, rest.last().map(std::slice::from_ref).unwrap_or_default())
    } else {
        chain(first, rest)
    }
}

fn to_len(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Walks a node tree and produces output lines.
///
/// Render options are read from the outermost scope once, when the renderer
/// is created.
pub(crate) struct Renderer<'a> {
    loader: &'a dyn Loader,
    indent: usize,
    doctype: String,
    /// Includes currently being rendered above this renderer.
    depth: usize,
}

impl<'a> Renderer<'a> {
    pub fn new(loader: &'a dyn Loader, scopes: &[&Scope]) -> Self {
        let indent = match option(scopes, "_indentlength") {
            Some(Value::Int(n)) => usize::try_from(*n).unwrap_or(DEFAULT_INDENT),
            _ => DEFAULT_INDENT,
        };
        let doctype = match option(scopes, "_doctype") {
            Some(value) if !value.is_none() => value.to_output(),
            _ => DEFAULT_DOCTYPE.to_string(),
        };
        Self {
            loader,
            indent,
            doctype,
            depth: 0,
        }
    }

    pub fn render(&self, node: &Node, scopes: &[&Scope]) -> WyrmResult<Vec<Line>> {
        match node {
            Node::Root { children }
            | Node::Loop { children }
            | Node::Empty { children }
            | Node::Condition { children, .. } => self.render_all(children, scopes),
            Node::Block { name, children } => match self.block_override(name, scopes) {
                Some(lines) => Ok(lines),
                None => self.render_all(children, scopes),
            },
            Node::Text { text } => Ok(split_lines(&text.evaluate(scopes)?).collect()),
            Node::Comment { .. } => Ok(Vec::new()),
            Node::Require { names } => check_required(names, scopes).map(|()| Vec::new()),
            Node::HtmlComment { text, children } => self.html_comment(text, children, scopes),
            Node::HtmlTag { tag, children } => self.element(tag, children, scopes),
            Node::Expression { expr } => {
                let text = expr.evaluate(scopes)?.to_output();
                if text.is_empty() {
                    Ok(Vec::new())
                } else {
                    Ok(split_lines(&text).collect())
                }
            }
            Node::If { children } => {
                for clause in children {
                    if let Node::Condition {
                        guard, children, ..
                    } = clause
                    {
                        if guard.evaluate(scopes)?.is_truthy() {
                            return self.render_all(children, scopes);
                        }
                    }
                }
                Ok(Vec::new())
            }
            Node::For {
                targets,
                container,
                children,
            } => self.for_loop(targets, container, children, scopes),
            Node::With {
                bindings,
                only,
                children,
            } => {
                let scope = bindings.evaluate(scopes)?;
                self.render_all(children, &bind(&scope, scopes, *only))
            }
            Node::Include {
                path,
                bindings,
                only,
                children,
            } => self.include(path, bindings, *only, children, scopes),
            Node::Html {
                doctype,
                tag,
                children,
            } => {
                let version = doctype.as_deref().unwrap_or(&self.doctype);
                let declaration =
                    doctype_declaration(version).ok_or_else(|| WyrmError::UnknownDoctype {
                        doctype: version.to_string(),
                    })?;
                let mut lines = vec![Line::new(declaration)];
                lines.extend(self.element(tag, children, scopes)?);
                Ok(lines)
            }
            Node::Css { src, children } => match src {
                Some(src) => {
                    let href = escape_attribute(&src.evaluate(scopes)?.to_output());
                    Ok(vec![Line::new(format!(
                        r#"<link rel="stylesheet" type="text/css" href="{href}.css">"#
                    ))])
                }
                None => self.wrapped("<style>", "</style>", children, scopes),
            },
            Node::Js { src, children } => match src {
                Some(src) => {
                    let href = escape_attribute(&src.evaluate(scopes)?.to_output());
                    Ok(vec![Line::new(format!(r#"<script src="{href}.js"></script>"#))])
                }
                None => self.wrapped("<script>", "</script>", children, scopes),
            },
            Node::Markdown { src, children } => self.markdown(src.as_ref(), children, scopes),
        }
    }

    fn render_all(&self, children: &[Node], scopes: &[&Scope]) -> WyrmResult<Vec<Line>> {
        let mut lines = Vec::new();
        for child in children {
            lines.extend(self.render(child, scopes)?);
        }
        Ok(lines)
    }

    /// Render `children` one indentation level deeper.
    fn indented(&self, children: &[Node], scopes: &[&Scope]) -> WyrmResult<Vec<Line>> {
        let mut lines = self.render_all(children, scopes)?;
        for line in &mut lines {
            line.indent = line.indent.saturating_add(self.indent);
        }
        Ok(lines)
    }

    fn wrapped(
        &self,
        open: &str,
        close: &str,
        children: &[Node],
        scopes: &[&Scope],
    ) -> WyrmResult<Vec<Line>> {
        let mut lines = vec![Line::new(open)];
        lines.extend(self.indented(children, scopes)?);
        lines.push(Line::new(close));
        Ok(lines)
    }

    fn html_comment(
        &self,
        text: &Interpolated,
        children: &[Node],
        scopes: &[&Scope],
    ) -> WyrmResult<Vec<Line>> {
        if text.is_empty() {
            self.wrapped("<!--", "-->", children, scopes)
        } else {
            Ok(vec![Line::new(format!("<!-- {} -->", text.evaluate(scopes)?))])
        }
    }

    /// Render an element. A single content line collapses onto the tag's own
    /// line, and a trailing blank line is moved after the closing tag.
    fn element(&self, tag: &Tag, children: &[Node], scopes: &[&Scope]) -> WyrmResult<Vec<Line>> {
        let (open, close) = tag.render(scopes)?;
        let Some(close) = close else {
            return Ok(vec![Line::new(open)]);
        };
        let mut contents = self.indented(children, scopes)?;
        let trailing = match contents.last() {
            Some(last) if last.text.is_empty() => contents.pop(),
            _ => None,
        };

        let mut lines = match contents.as_slice() {
            [] => vec![Line::new(format!("{open}{close}"))],
            [only] => vec![Line::new(format!("{open}{}{close}", only.text))],
            _ => {
                let mut lines = Vec::with_capacity(contents.len().saturating_add(2));
                lines.push(Line::new(open));
                lines.append(&mut contents);
                lines.push(Line::new(close));
                lines
            }
        };
        lines.extend(trailing);
        Ok(lines)
    }

    fn for_loop(
        &self,
        targets: &VarList,
        container: &Expression,
        children: &[Node],
        scopes: &[&Scope],
    ) -> WyrmResult<Vec<Line>> {
        let items = iterate(container.evaluate(scopes)?)?;
        let mut lines = Vec::new();

        if items.is_empty() {
            for child in children {
                if let Node::Empty { .. } = child {
                    lines.extend(self.render(child, scopes)?);
                }
            }
            return Ok(lines);
        }

        let parent = lookup(scopes, "loop").cloned().unwrap_or_default();
        let length = items.len();
        let body = children.first();
        for (index, item) in items.into_iter().enumerate() {
            let mut scope = unpack(targets, item)?;
            scope.insert("loop", loop_info(index, length, &parent));
            if let Some(body) = body {
                lines.extend(self.render(body, &chain(&scope, scopes))?);
            }
        }
        for child in children {
            if let Node::Condition { .. } = child {
                lines.extend(self.render(child, scopes)?);
            }
        }
        Ok(lines)
    }

    fn include(
        &self,
        path: &Expression,
        bindings: &VarDict,
        only: bool,
        children: &[Node],
        scopes: &[&Scope],
    ) -> WyrmResult<Vec<Line>> {
        let path = match path.evaluate(scopes)? {
            Value::Str(path) => path,
            other => {
                return Err(WyrmError::InvalidPath {
                    path: other.to_string(),
                    reason: format!("expected a string, found {}", other.type_name()),
                });
            }
        };
        if self.depth >= MAX_INCLUDE_DEPTH {
            return Err(WyrmError::IncludeDepth {
                path,
                limit: MAX_INCLUDE_DEPTH,
            });
        }
        tracing::trace!(path = %path, depth = self.depth, "resolving include");
        let template = self.loader.load_template(&path)?;

        let mut blocks = BTreeMap::new();
        for child in children {
            if let Node::Block { name, .. } = child {
                let lines = self.render(child, scopes)?;
                let mut text = String::new();
                for (i, line) in lines.iter().enumerate() {
                    if i > 0 {
                        text.push('\n');
                    }
                    line.write_to(&mut text);
                }
                blocks.insert(name.clone(), Value::Str(text));
            }
        }

        let mut scope = bindings.evaluate(scopes)?;
        scope.insert("_blocks", Value::Dict(blocks));
        let nested = Renderer {
            loader: self.loader,
            indent: self.indent,
            doctype: self.doctype.clone(),
            depth: self.depth.saturating_add(1),
        };
        nested.render(template.root(), &bind(&scope, scopes, only))
    }

    /// Lines supplied for block `name` by an enclosing include, if any.
    fn block_override(&self, name: &str, scopes: &[&Scope]) -> Option<Vec<Line>> {
        let text = scopes.iter().find_map(|scope| match scope.get("_blocks") {
            Some(Value::Dict(blocks)) => blocks.get(name),
            _ => None,
        })?;
        let text = text.to_output();
        if text.is_empty() {
            Some(Vec::new())
        } else {
            Some(split_lines(&text).collect())
        }
    }

    fn markdown(
        &self,
        src: Option<&Expression>,
        children: &[Node],
        scopes: &[&Scope],
    ) -> WyrmResult<Vec<Line>> {
        let text = match src {
            Some(src) => match src.evaluate(scopes)? {
                Value::Str(path) => self.loader.load_file(&path, ".md")?,
                other => {
                    return Err(WyrmError::InvalidPath {
                        path: other.to_string(),
                        reason: format!("expected a string, found {}", other.type_name()),
                    });
                }
            },
            None => join_lines(&self.render_all(children, scopes)?, false),
        };
        let html = self.loader.markdown(&text)?;
        let html = html.strip_suffix('\n').unwrap_or(&html);
        if html.is_empty() {
            return Ok(Vec::new());
        }
        Ok(split_lines(html).collect())
    }
}

fn check_required(names: &VarList, scopes: &[&Scope]) -> WyrmResult<()> {
    for name in names.iter() {
        if !scopes.iter().any(|scope| scope.contains(name)) {
            return Err(WyrmError::MissingVariable {
                variable_name: name.clone(),
            });
        }
    }
    Ok(())
}

/// The items a `for` loop walks over.
fn iterate(value: Value) -> WyrmResult<Vec<Value>> {
    match value {
        Value::None => Ok(Vec::new()),
        Value::List(items) | Value::Tuple(items) => Ok(items),
        Value::Str(s) => Ok(s.chars().map(|c| Value::Str(c.to_string())).collect()),
        Value::Dict(map) => Ok(map
            .into_iter()
            .map(|(key, value)| Value::Tuple(vec![Value::Str(key), value]))
            .collect()),
        other @ (Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Function(_)) => {
            Err(WyrmError::NotIterable {
                found: other.type_name(),
            })
        }
    }
}

/// Bind one loop item to the loop variables.
fn unpack(targets: &VarList, item: Value) -> WyrmResult<Scope> {
    let mut scope = Scope::new();
    match targets.0.as_slice() {
        [single] => {
            scope.insert(single, item);
        }
        names => {
            let values = match item {
                Value::List(values) | Value::Tuple(values) => values,
                _ => {
                    return Err(WyrmError::Unpack {
                        expected: names.len(),
                        found: 1,
                    });
                }
            };
            if values.len() != names.len() {
                return Err(WyrmError::Unpack {
                    expected: names.len(),
                    found: values.len(),
                });
            }
            for (name, value) in names.iter().zip(values) {
                scope.insert(name, value);
            }
        }
    }
    Ok(scope)
}

fn loop_info(index: usize, length: usize, parent: &Value) -> Value {
    let counter1 = index.saturating_add(1);
    Value::dict([
        ("counter", Value::Int(to_len(index))),
        ("counter1", Value::Int(to_len(counter1))),
        ("revcounter", Value::Int(to_len(length.saturating_sub(counter1)))),
        ("revcounter1", Value::Int(to_len(length.saturating_sub(index)))),
        ("first", Value::Bool(index == 0)),
        ("last", Value::Bool(counter1 == length)),
        ("length", Value::Int(to_len(length))),
        ("parent", parent.clone()),
    ])
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{builder::build, lexer::tokenize, loader::NoLoader, template::Template};

    fn render(source: &str, scope: &Scope) -> WyrmResult<String> {
        let root = build(&tokenize(source)?)?;
        let scopes = [scope];
        let renderer = Renderer::new(&NoLoader, &scopes);
        Ok(join_lines(&renderer.render(&root, &scopes)?, false))
    }

    /// Serves a fixed set of templates by name.
    struct MapLoader(BTreeMap<&'static str, &'static str>);

    impl Loader for MapLoader {
        fn load_template(&self, path: &str) -> WyrmResult<Arc<Template>> {
            let source = self.0.get(path).ok_or_else(|| WyrmError::MissingTemplate {
                template_name: path.to_string(),
            })?;
            Ok(Arc::new(Template::new(*source)?))
        }

        fn load_file(&self, path: &str, extension: &str) -> WyrmResult<String> {
            self.0
                .get(format!("{path}{extension}").as_str())
                .map(|s| s.to_string())
                .ok_or_else(|| WyrmError::MissingTemplate {
                    template_name: path.to_string(),
                })
        }
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_element_layouts() {
        let empty = Scope::new();
        assert_eq!(render("%p", &empty).unwrap(), "<p></p>");
        assert_eq!(render("%p hidden", &empty).unwrap(), "<p hidden></p>");
        assert_eq!(render("%p: hi", &empty).unwrap(), "<p>hi</p>");
        assert_eq!(render("%p\n    hi", &empty).unwrap(), "<p>hi</p>");
        assert_eq!(
            render("%ul\n    %li: a\n    %li: b", &empty).unwrap(),
            "<ul>\n    <li>a</li>\n    <li>b</li>\n</ul>"
        );
        assert_eq!(render("%br", &empty).unwrap(), "<br>");
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_trailing_blank_moves_after_close() {
        let empty = Scope::new();
        assert_eq!(
            render("%div\n    %p: x\n\n%span", &empty).unwrap(),
            "<div><p>x</p></div>\n\n<span></span>"
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_indent_option() {
        let mut scope = Scope::new();
        scope.insert("_indentlength", 2);
        assert_eq!(
            render("%div\n    a\n    b", &scope).unwrap(),
            "<div>\n  a\n  b\n</div>"
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_if_chain() {
        let mut scope = Scope::new();
        scope.insert("a", false).insert("b", false);
        let source = "- if a\n    A\n- elif b\n    B\n- else\n    C";
        assert_eq!(render(source, &scope).unwrap(), "C");
        scope.insert("b", true);
        assert_eq!(render(source, &scope).unwrap(), "B");
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_loop_metadata() {
        let mut scope = Scope::new();
        scope.insert(
            "xs",
            Value::List(vec![Value::from("a"), Value::from("b"), Value::from("c")]),
        );
        let source = "- for x in xs\n    {x} {loop.counter} {loop.first} {loop.last} {loop.revcounter} {loop.length}";
        assert_eq!(
            render(source, &scope).unwrap(),
            "a 0 True False 2 3\nb 1 False False 1 3\nc 2 False True 0 3"
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_nested_loop_parent() {
        let mut scope = Scope::new();
        scope.insert("rows", Value::List(vec![Value::List(vec![Value::Int(1)])]));
        let source = "- for row in rows\n    - for cell in row\n        {loop.parent.counter1}.{loop.counter1}";
        assert_eq!(render(source, &scope).unwrap(), "1.1");
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_loop_empty_and_else() {
        let source = "- for k, v in items\n    {k}={v}\n- empty\n    none\n- else\n    done";
        let mut scope = Scope::new();
        scope.insert("items", Value::dict([("a", 1), ("b", 2)]));
        assert_eq!(render(source, &scope).unwrap(), "a=1\nb=2\ndone");
        scope.insert("items", Value::List(Vec::new()));
        assert_eq!(render(source, &scope).unwrap(), "none");
        scope.insert("items", Value::None);
        assert_eq!(render(source, &scope).unwrap(), "none");
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_loop_errors() {
        let mut scope = Scope::new();
        scope.insert("n", 3);
        assert_eq!(
            render("- for x in n\n    x", &scope).unwrap_err(),
            WyrmError::NotIterable { found: "int" }
        );
        scope.insert("pairs", Value::List(vec![Value::List(vec![Value::Int(1)])]));
        assert_eq!(
            render("- for a, b in pairs\n    x", &scope).unwrap_err(),
            WyrmError::Unpack {
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_with_only() {
        let mut scope = Scope::new();
        scope.insert("x", 1).insert("y", 2);
        assert_eq!(render("- with z=x + y\n    {z}{x}", &scope).unwrap(), "31");
        // only keeps the outermost scope, which is the caller's scope here
        assert_eq!(render("- with only z=1\n    {z}{y}", &scope).unwrap(), "12");
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_require() {
        let mut scope = Scope::new();
        scope.insert("present", Value::None);
        assert_eq!(render("- require present\nok", &scope).unwrap(), "ok");
        assert_eq!(
            render("- require present, missing", &scope).unwrap_err(),
            WyrmError::MissingVariable {
                variable_name: "missing".to_string()
            }
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_expression_output() {
        let mut scope = Scope::new();
        scope.insert("nothing", Value::None).insert("text", "a\nb");
        assert_eq!(render("= nothing\n= 1 + 2", &scope).unwrap(), "3");
        assert_eq!(render("%div\n    = text", &scope).unwrap(), "<div>\n    a\n    b\n</div>");
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_comments() {
        let empty = Scope::new();
        assert_eq!(render("// hidden\n    also hidden\nshown", &empty).unwrap(), "shown");
        assert_eq!(render("/! note", &empty).unwrap(), "<!-- note -->");
        assert_eq!(
            render("/!\n    %p: x", &empty).unwrap(),
            "<!--\n    <p>x</p>\n-->"
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_html_doctype() {
        let empty = Scope::new();
        assert_eq!(
            render("- html lang='en'", &empty).unwrap(),
            "<!doctype html>\n<html lang=\"en\"></html>"
        );
        let mut scope = Scope::new();
        scope.insert("_doctype", "1.1");
        assert!(render("- html", &scope).unwrap().contains("XHTML 1.1"));
        scope.insert("_doctype", "7");
        assert_eq!(
            render("- html", &scope).unwrap_err(),
            WyrmError::UnknownDoctype {
                doctype: "7".to_string()
            }
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_resources() {
        let mut scope = Scope::new();
        scope.insert("theme", "dark");
        assert_eq!(
            render("- css theme", &scope).unwrap(),
            r#"<link rel="stylesheet" type="text/css" href="dark.css">"#
        );
        assert_eq!(
            render("- js 'app'", &scope).unwrap(),
            r#"<script src="app.js"></script>"#
        );
        assert_eq!(
            render("- css\n    p { margin: {0} }", &scope).unwrap(),
            "<style>\n    p { margin: {0} }\n</style>"
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_markdown() {
        let empty = Scope::new();
        assert_eq!(
            render("- md\n    # Title\n\n    some *text*", &empty).unwrap(),
            "<h1>Title</h1>\n<p>some <em>text</em></p>"
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_include_without_loader() {
        let empty = Scope::new();
        assert_eq!(
            render("- include 'base'", &empty).unwrap_err(),
            WyrmError::NoLoader {
                path: "base".to_string()
            }
        );
        assert!(matches!(
            render("- include 3", &empty).unwrap_err(),
            WyrmError::InvalidPath { .. }
        ));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_include_overrides_blocks() {
        let loader = MapLoader(BTreeMap::from([
            ("base", "%main\n    - block content\n        A\n    - block footer: F"),
            ("readme.md", "*hi*"),
        ]));
        let template =
            Template::new("- include 'base'\n    - block content\n        B").unwrap();
        assert_eq!(
            template.render_with(&loader, &[]).unwrap(),
            "<main>\n    B\n    F\n</main>"
        );

        let template = Template::new("- md 'readme'").unwrap();
        assert_eq!(
            template.render_with(&loader, &[]).unwrap(),
            "<p><em>hi</em></p>"
        );
    }

    #[test]
    #[ntest::timeout(1000)]
    fn test_include_depth_is_limited() {
        let loader = MapLoader(BTreeMap::from([
            ("self", "- include 'self'"),
            ("ping", "- include 'pong'"),
            ("pong", "- include 'ping'"),
        ]));
        let template = Template::new("- include 'self'").unwrap();
        assert_eq!(
            template.render_with(&loader, &[]).unwrap_err(),
            WyrmError::IncludeDepth {
                path: "self".to_string(),
                limit: MAX_INCLUDE_DEPTH
            }
        );
        let template = Template::new("- include 'ping'").unwrap();
        assert!(matches!(
            template.render_with(&loader, &[]).unwrap_err(),
            WyrmError::IncludeDepth { .. }
        ));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_include_bindings() {
        let loader = MapLoader(BTreeMap::from([("greet", "Hello {name}{suffix}")]));
        let mut scope = Scope::new();
        scope.insert("suffix", "!");
        let template = Template::new("- include 'greet' with name='Ann'").unwrap();
        assert_eq!(
            template.render_with(&loader, &[&scope]).unwrap(),
            "Hello Ann!"
        );
        let template = Template::new("- include 'greet' with only name='Ann'").unwrap();
        assert_eq!(
            template.render_with(&loader, &[&Scope::new(), &scope]).unwrap(),
            "Hello Ann!"
        );
    }
}
