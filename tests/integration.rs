
use std::{collections::BTreeMap, sync::Arc};

use fixtures::{generate_random_indent_width, generate_random_whitespace, get_engine, reindent};
use wyrm::{
    CompileErrorKind, ErrorCategory, FileSystemLoader, Function, Loader, RenderOptions, Scope,
    Template, Value, WyrmError, compile,
};

fn render(source: &str, scope: &Scope) -> String {
    compile(source).unwrap().render(&[scope]).unwrap()
}

fn compile_category(source: &str) -> ErrorCategory {
    match compile(source).unwrap_err() {
        WyrmError::Compile(err) => err.category(),
        other => panic!("expected a compile error, got {other:?}"),
    }
}

#[test]
#[ntest::timeout(100)]
fn test_end_to_end() {
    let template = compile(
        "% div#main.page\n    = 1+2\n    - for x in items\n        = x * 10\n    - empty\n        no items\n",
    )
    .unwrap();

    let mut scope = Scope::new();
    scope.insert("items", vec![1, 2]);
    assert_eq!(
        template.render(&[&scope]).unwrap(),
        "<div id=\"main\" class=\"page\">\n    3\n    10\n    20\n</div>\n"
    );

    scope.insert("items", Vec::<Value>::new());
    assert_eq!(
        template.render(&[&scope]).unwrap(),
        "<div id=\"main\" class=\"page\">\n    3\n    no items\n</div>\n"
    );
}

#[test]
#[ntest::timeout(100)]
fn test_text_is_identity() {
    let source = "Dear reader,\n\n  this is plain text.\n    It keeps its spacing.\n";
    assert_eq!(render(source, &Scope::new()), source);
}

#[test]
#[ntest::timeout(100)]
fn test_indentation_law() {
    let source = "%section\n    %h1: Title\n    - for x in xs\n        %p\n            = x\n            %span: tail\n    - else\n        done";
    let expected = "<section>\n    <h1>Title</h1>\n    <p>\n        1\n        <span>tail</span>\n    </p>\n    <p>\n        2\n        <span>tail</span>\n    </p>\n    done\n</section>";

    let mut scope = Scope::new();
    scope.insert("xs", vec![1, 2]);
    assert_eq!(render(source, &scope), expected);

    let width = generate_random_indent_width();
    let reindented = reindent(source, width);
    assert_eq!(
        render(&reindented, &scope),
        expected,
        "source indented by {width} should render the same"
    );
}

#[test]
#[ntest::timeout(100)]
fn test_expression_whitespace() {
    let source = format!(
        "={}1{}+{}2{}*{}3",
        generate_random_whitespace(),
        generate_random_whitespace(),
        generate_random_whitespace(),
        generate_random_whitespace(),
        generate_random_whitespace(),
    );
    assert_eq!(render(&source, &Scope::new()), "7");
}

#[test]
#[ntest::timeout(100)]
fn test_precedence() {
    let mut scope = Scope::new();
    scope.insert("a", false).insert("b", true);
    assert_eq!(render("= 1 + 2 * 3", &scope), "7");
    assert_eq!(render("= 2 ** 3 ** 2", &scope), "512");
    assert_eq!(render("= not a and b", &scope), "True");
    assert_eq!(render("= -7 // 2", &scope), "-4");
    assert_eq!(render("= 7 / 2", &scope), "3.5");
    assert_eq!(render("= 1 < 2 and 'b' in 'abc'", &scope), "True");
}

#[test]
#[ntest::timeout(100)]
fn test_scoping() {
    let template = compile("= x").unwrap();
    let mut inner = Scope::new();
    inner.insert("x", 1);
    let mut outer = Scope::new();
    outer.insert("x", 2);
    assert_eq!(template.render(&[&inner, &outer]).unwrap(), "1");
    assert_eq!(template.render(&[&outer]).unwrap(), "2");
    assert_eq!(template.render(&[]).unwrap(), "");
}

#[test]
#[ntest::timeout(100)]
fn test_loop_metadata() {
    let mut scope = Scope::new();
    scope.insert("xs", vec!["a", "b", "c"]);
    let source = "- for x in xs\n    - if loop.counter == 1\n        {x} {loop.counter} {loop.first} {loop.last} {loop.length}";
    assert_eq!(render(source, &scope), "b 1 False False 3");
}

#[test]
#[ntest::timeout(100)]
fn test_if_chain() {
    let source = "- if False\n    one\n- elif False\n    two\n- else\n    three";
    assert_eq!(render(source, &Scope::new()), "three");
    assert_eq!(render("- if 0: zero\n- elif 2: two", &Scope::new()), "two");
}

#[test]
#[ntest::timeout(100)]
fn test_block_override() {
    let mut engine = get_engine();
    engine
        .add_template("base", "- block content\n    A")
        .unwrap();
    engine
        .add_template("page", "- include 'base'\n    - block content\n        B")
        .unwrap();
    assert_eq!(engine.render("base", &[]).unwrap(), "A");
    assert_eq!(engine.render("page", &[]).unwrap(), "B");
}

#[test]
#[ntest::timeout(100)]
fn test_layered_includes() {
    let mut engine = get_engine();
    engine
        .add_template(
            "base",
            "- html\n    %head: %title: = title\n    %body\n        - block body",
        )
        .unwrap();
    engine
        .add_template(
            "layout",
            "- include 'base' with title=title + ' | Site'\n    - block body\n        %main\n            - block content",
        )
        .unwrap();
    engine
        .add_template(
            "page",
            "- include 'layout'\n    - block content\n        %p: Hello\n        %p: World",
        )
        .unwrap();

    let mut scope = Scope::new();
    scope.insert("title", "Home");
    assert_eq!(
        engine.render("page", &[&scope]).unwrap(),
        "<!doctype html>\n<html>\n    <head><title>Home | Site</title></head>\n    <body>\n        <main>\n            <p>Hello</p>\n            <p>World</p>\n        </main>\n    </body>\n</html>"
    );
}

#[test]
#[ntest::timeout(1000)]
fn test_runaway_includes_fail() {
    let mut engine = get_engine();
    engine.add_template("loop", "- include 'loop'").unwrap();
    engine.add_template("a", "%p: a\n- include 'b'").unwrap();
    engine.add_template("b", "%p: b\n- include 'a'").unwrap();

    assert_eq!(
        engine.render("loop", &[]).unwrap_err(),
        WyrmError::IncludeDepth {
            path: "loop".to_string(),
            limit: 64
        }
    );
    let err = engine.render("a", &[]).unwrap_err();
    assert!(matches!(err, WyrmError::IncludeDepth { .. }), "{err:?}");
    assert!(err.to_string().contains("include depth limit of 64"));

    // Bounded recursion through includes still renders.
    engine
        .add_template(
            "countdown",
            "= n\n- if n > 0\n    - include 'countdown' with n=n - 1",
        )
        .unwrap();
    let mut scope = Scope::new();
    scope.insert("n", 3);
    assert_eq!(engine.render("countdown", &[&scope]).unwrap(), "3\n2\n1\n0");
}

#[test]
#[ntest::timeout(100)]
fn test_render_options() {
    let options = RenderOptions {
        doctype: "4 transitional".to_string(),
        indent: 2,
    };
    let template = compile("- html\n    %body\n        %p: a\n        %p: b").unwrap();
    assert_eq!(
        template.render(&[&options.scope()]).unwrap(),
        "<!doctype html PUBLIC \"-//W3C//DTD HTML 4.01 Transitional//EN\" \"http://www.w3.org/TR/html4/loose.dtd\">\n<html>\n  <body>\n    <p>a</p>\n    <p>b</p>\n  </body>\n</html>"
    );
}

#[test]
#[ntest::timeout(100)]
fn test_attributes() {
    let mut scope = Scope::new();
    scope
        .insert("url", "/home")
        .insert(
            "extra",
            Value::List(vec![Value::from("primary"), Value::None, Value::from("big")]),
        );
    assert_eq!(
        render(
            "%a.btn href=url, class=extra, disabled=False, hidden, title='x < y'",
            &scope
        ),
        r#"<a class="primary big btn" href="/home" hidden title="x &lt; y"></a>"#
    );
    assert_eq!(
        render("%input#q type='text', 'data-x'=1", &scope),
        r#"<input id="q" type="text" data-x="1">"#
    );
}

#[test]
#[ntest::timeout(100)]
fn test_host_functions() {
    let shout = Function::new("shout", |args, kwargs| {
        let text = args.first().map(Value::to_output).unwrap_or_default();
        let times = match kwargs.get("times") {
            Some(Value::Int(n)) => usize::try_from(*n).unwrap_or(1),
            _ => 1,
        };
        Ok(Value::from(text.to_uppercase().repeat(times)))
    });
    let fail = Function::new("fail", |_, _| Err(WyrmError::function("fail", "boom")));

    let mut scope = Scope::new();
    scope.insert("shout", shout).insert("fail", fail);
    assert_eq!(render("= shout('hi', times=2)", &scope), "HIHI");
    assert_eq!(render("%p: {shout(name)}!", &scope), "<p>!</p>");
    assert_eq!(
        compile("= fail()").unwrap().render(&[&scope]).unwrap_err(),
        WyrmError::function("fail", "boom")
    );
}

#[test]
#[ntest::timeout(100)]
fn test_data_access() {
    let mut user = BTreeMap::new();
    user.insert("name".to_string(), Value::from("Ann"));
    user.insert("tags".to_string(), Value::from(vec!["a", "b"]));
    let mut scope = Scope::new();
    scope.insert("user", user);
    assert_eq!(render("= user.name", &scope), "Ann");
    assert_eq!(render("= user['tags'][-1]", &scope), "b");
    assert_eq!(render("= {'k': [1, (2, 3)]}['k'][1]", &scope), "(2, 3)");
}

#[test]
#[ntest::timeout(100)]
fn test_bracket_balance() {
    for source in ["= (1 + 2", "= 1 + 2)", "= [1, 2)", "%a href=f(x", "x {y"] {
        assert_eq!(
            compile_category(source),
            ErrorCategory::Lexical,
            "{source:?} should be a lexical error"
        );
    }
}

#[test]
#[ntest::timeout(100)]
fn test_compile_errors() {
    assert_eq!(compile_category("\t%p"), ErrorCategory::Lexical);
    assert_eq!(compile_category("/x"), ErrorCategory::Lexical);
    assert_eq!(compile_category("- bogus"), ErrorCategory::Syntax);
    assert_eq!(compile_category("= 1 +"), ErrorCategory::Syntax);
    assert_eq!(compile_category("%p a b"), ErrorCategory::Syntax);
    assert_eq!(compile_category("= x\n    y"), ErrorCategory::Structural);
    assert_eq!(compile_category("%img\n    x"), ErrorCategory::Structural);
    assert_eq!(compile_category("%div\n    - else"), ErrorCategory::Structural);

    match compile("%div\n    %p\n        - empty").unwrap_err() {
        WyrmError::Compile(err) => {
            assert_eq!(err.line, 3);
            assert!(matches!(err.kind, CompileErrorKind::OrphanClause { .. }));
        }
        other => panic!("expected compile error, got {other:?}"),
    }
}

#[test]
#[ntest::timeout(100)]
fn test_runtime_errors() {
    let mut scope = Scope::new();
    scope.insert("n", 1);
    let err = |source: &str| compile(source).unwrap().render(&[&scope]).unwrap_err();
    assert_eq!(err("= 1 / 0"), WyrmError::DivisionByZero);
    assert_eq!(err("= n()"), WyrmError::NotCallable { found: "int" });
    assert!(matches!(err("= n.x"), WyrmError::MissingAttribute { .. }));
    assert!(matches!(err("= [1][3]"), WyrmError::IndexOutOfRange { .. }));
    assert!(matches!(err("= 'a' - 1"), WyrmError::UnsupportedOperands { .. }));
    assert!(matches!(err("- require missing"), WyrmError::MissingVariable { .. }));
}

#[test]
#[ntest::timeout(100)]
fn test_trailing_newline_follows_source() {
    assert_eq!(render("%p: x", &Scope::new()), "<p>x</p>");
    assert_eq!(render("%p: x\n", &Scope::new()), "<p>x</p>\n");
}

#[test]
#[ntest::timeout(100)]
fn test_concurrent_renders() {
    let template = Arc::new(compile("- for x in xs\n    %li: = x * n").unwrap());
    std::thread::scope(|s| {
        for n in 1..=4_i64 {
            let template = Arc::clone(&template);
            s.spawn(move || {
                let mut scope = Scope::new();
                scope.insert("xs", vec![1, 2]).insert("n", n);
                let expected = format!("<li>{n}</li>\n<li>{}</li>", n * 2);
                assert_eq!(template.render(&[&scope]).unwrap(), expected);
            });
        }
    });
}

fn write(dir: &std::path::Path, name: &str, contents: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}

#[test]
#[ntest::timeout(1000)]
fn test_filesystem_loader() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "base.wyrm",
        "- html\n    %body\n        - block content\n            default",
    );
    write(
        dir.path(),
        "page.wyrm",
        "- include 'base'\n    - block content\n        - include 'partials/nav' with title='Home'\n        - md 'notes'\n",
    );
    write(dir.path(), "partials/nav.wyrm", "%nav: = title");
    write(dir.path(), "notes.md", "*hi*");

    let loader = FileSystemLoader::new(dir.path());
    assert_eq!(
        loader.render("page", &[]).unwrap(),
        "<!doctype html>\n<html>\n    <body>\n        <nav>Home</nav>\n        <p><em>hi</em></p>\n    </body>\n</html>\n"
    );
    assert_eq!(
        loader.render("base", &[]).unwrap(),
        "<!doctype html>\n<html><body>default</body></html>"
    );

    assert!(matches!(
        loader.render("missing", &[]).unwrap_err(),
        WyrmError::Io { .. }
    ));
    assert!(matches!(
        loader.render("../page", &[]).unwrap_err(),
        WyrmError::InvalidPath { .. }
    ));
}

#[test]
#[ntest::timeout(1000)]
fn test_filesystem_cache() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.html", "first");
    let loader = FileSystemLoader::new(dir.path()).with_extension("html");

    let first = loader.load_template("a").unwrap();
    assert!(Arc::ptr_eq(&first, &loader.load_template("a").unwrap()));

    write(dir.path(), "a.html", "second");
    assert_eq!(loader.render("a", &[]).unwrap(), "first");
    loader.clear_cache();
    assert_eq!(loader.render("a", &[]).unwrap(), "second");

    // a template that fails to compile is not cached
    write(dir.path(), "b.html", "= (");
    assert!(loader.load_template("b").is_err());
    write(dir.path(), "b.html", "= 1");
    assert_eq!(loader.render("b", &[]).unwrap(), "1");
}

#[test]
#[ntest::timeout(100)]
fn test_template_accessors() {
    let template = Template::new("%p: hi").unwrap();
    assert_eq!(template.source(), "%p: hi");
    assert_eq!(template.root().children().len(), 1);
}
