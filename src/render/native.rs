//! An in-process [`Renderer`]: Markdown is converted with
//! [`crate::markdown`] and pages are laid out with Go-style templates
//! ([`gtmpl`]). Templates see the following values:
//!
//! * `title`: the page title
//! * `menu`: the sorted category names
//! * `body`: the rendered Markdown body
//! * `meta`: the document's front matter (for index pages, `meta.list`
//!   holds the year buckets)
//! * every context variable (e.g. `build_msg`, `category`)

use super::{read, Document, Error, RenderContext, Renderer, Result, Template};
use crate::{frontmatter, markdown};
use gtmpl::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Renders pages in-process from template sources.
#[derive(Clone, Debug)]
pub struct NativeRenderer {
    article: String,
    index: String,
}

impl NativeRenderer {
    /// Loads `article.html` and `index.html` from `templates_directory`.
    pub fn from_directory(templates_directory: &Path) -> Result<NativeRenderer> {
        let load = |template: Template| read(&templates_directory.join(format!("{}.html", template)));
        Ok(NativeRenderer::from_sources(
            load(Template::Article)?,
            load(Template::Index)?,
        ))
    }

    pub fn from_sources<S: Into<String>>(article: S, index: S) -> NativeRenderer {
        NativeRenderer {
            article: article.into(),
            index: index.into(),
        }
    }

    fn source(&self, template: Template) -> &str {
        match template {
            Template::Article => &self.article,
            Template::Index => &self.index,
        }
    }
}

impl Renderer for NativeRenderer {
    fn fragment(&self, source: &Path) -> Result<String> {
        let contents = read(source)?;
        let (_, body) = frontmatter::parse(&contents).map_err(|err| Error::Frontmatter {
            path: source.to_owned(),
            err,
        })?;
        Ok(markdown::to_html(body))
    }

    fn page(&self, document: &Document, context: &RenderContext) -> Result<String> {
        let contents = match document {
            Document::File(path) => read(path)?,
            Document::Synthetic(body) => body.to_string(),
        };
        let (meta, body) = frontmatter::parse(&contents).map_err(|err| Error::Frontmatter {
            path: match document {
                Document::File(path) => path.to_path_buf(),
                Document::Synthetic(_) => PathBuf::from(document.describe()),
            },
            err,
        })?;

        let mut m: HashMap<String, Value> = HashMap::new();
        for (key, value) in &context.variables {
            m.insert(key.clone(), Value::String(value.clone()));
        }
        m.insert("title".to_owned(), Value::String(context.title.clone()));
        m.insert(
            "menu".to_owned(),
            Value::Array(context.menu.iter().cloned().map(Value::String).collect()),
        );
        m.insert("body".to_owned(), Value::String(markdown::to_html(body)));
        m.insert("meta".to_owned(), yaml_to_value(&meta));

        execute(context.template, self.source(context.template), Value::Object(m))
    }
}

fn execute(template: Template, source: &str, value: Value) -> Result<String> {
    let template_error = |message: String| Error::Template {
        template: template.name().to_owned(),
        message,
    };

    let mut tmpl = gtmpl::Template::default();
    tmpl.parse(source).map_err(|e| template_error(e.to_string()))?;
    let context = gtmpl::Context::from(value).map_err(|e| template_error(e.to_string()))?;

    let mut out: Vec<u8> = Vec::new();
    tmpl.execute(&mut out, &context)
        .map_err(|e| template_error(e.to_string()))?;
    String::from_utf8(out).map_err(|_| template_error(String::from("output is not valid UTF-8")))
}

/// Converts front matter into a template value. Non-scalar mapping keys are
/// dropped.
fn yaml_to_value(yaml: &serde_yaml::Value) -> Value {
    use serde_yaml::Value as Yaml;
    match yaml {
        Yaml::Null => Value::Nil,
        Yaml::Bool(b) => Value::Bool(*b),
        Yaml::Number(n) => Value::String(n.to_string()),
        Yaml::String(s) => Value::String(s.clone()),
        Yaml::Sequence(items) => Value::Array(items.iter().map(yaml_to_value).collect()),
        Yaml::Mapping(mapping) => Value::Object(
            mapping
                .iter()
                .filter_map(|(k, v)| {
                    let key = match k {
                        Yaml::String(s) => s.clone(),
                        Yaml::Number(n) => n.to_string(),
                        Yaml::Bool(b) => b.to_string(),
                        _ => return None,
                    };
                    Some((key, yaml_to_value(v)))
                })
                .collect(),
        ),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use indoc::indoc;

    const ARTICLE: &str =
        "<title>{{.title}}</title><nav>{{range .menu}}[{{.}}]{{end}}</nav><main>{{.body}}</main><footer>{{.build_msg}}</footer>";
    const INDEX: &str =
        "<h1>{{.category}}</h1>{{range .meta.list}}<h2>{{.year}}</h2>{{range .posts}}<a href=\"{{.url}}\">{{.title}}</a>{{end}}{{end}}";

    fn renderer() -> NativeRenderer {
        NativeRenderer::from_sources(ARTICLE, INDEX)
    }

    #[test]
    fn test_article_page() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("hello.md");
        std::fs::write(&path, "---\ntitle: Hello\ndate: 2024/01/10\n---\nSome *text*.\n")?;
        let menu = vec![String::from("blog"), String::from("notes")];
        let context = RenderContext::new(Template::Article, "Hello", &menu, "built today", "blog");

        let html = renderer().page(&Document::File(&path), &context)?;
        assert_eq!(
            "<title>Hello</title><nav>[blog][notes]</nav><main><p>Some <em>text</em>.</p>\n</main><footer>built today</footer>",
            html
        );
        Ok(())
    }

    #[test]
    fn test_synthetic_index_page() -> Result<()> {
        let document = indoc! {"
            ---
            list:
              - year: \"2024\"
                posts:
                  - title: A
                    url: /2024/01/10/blog/a.html
            ---
        "};
        let context = RenderContext::new(Template::Index, "blog", &[], "", "blog");
        let html = renderer().page(&Document::Synthetic(document), &context)?;
        assert_eq!(
            "<h1>blog</h1><h2>2024</h2><a href=\"/2024/01/10/blog/a.html\">A</a>",
            html
        );
        Ok(())
    }

    #[test]
    fn test_fragment_drops_front_matter() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("hello.md");
        std::fs::write(&path, "---\ntitle: Hello\n---\nbody\n")?;
        assert_eq!("<p>body</p>\n", renderer().fragment(&path)?);
        Ok(())
    }

    #[test]
    fn test_template_error() {
        let renderer = NativeRenderer::from_sources("{{.title", "");
        let context = RenderContext::new(Template::Article, "x", &[], "", "");
        assert!(matches!(
            renderer.page(&Document::Synthetic("---\n---\n"), &context),
            Err(Error::Template { .. })
        ));
    }
}
