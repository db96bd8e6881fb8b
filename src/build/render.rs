use std::path::Path;

use tera::{Context, Tera};

#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("template error: {0}")]
    Template(#[from] tera::Error),

    #[error("layout '{0}' not found in the layouts directory")]
    LayoutNotFound(String),
}

/// The layout renderer, wrapping Tera.
pub struct Renderer {
    tera: Tera,
}

impl Renderer {
    /// Load every `*.html` template under the layouts directory.
    ///
    /// A missing directory yields an empty renderer: builds that never ask
    /// for a layout still succeed.
    pub fn new(layouts_dir: &Path) -> Result<Self, RenderError> {
        if !layouts_dir.is_dir() {
            tracing::debug!(dir = %layouts_dir.display(), "no layouts directory");
            return Ok(Self {
                tera: Tera::default(),
            });
        }

        let glob = layouts_dir.join("**/*.html");
        let glob_str = glob.to_string_lossy();
        let tera = Tera::new(&glob_str)?;

        Ok(Self { tera })
    }

    /// Render a layout with the given context.
    pub fn render(&self, layout: &str, context: &Context) -> Result<String, RenderError> {
        if !self.tera.get_template_names().any(|name| name == layout) {
            return Err(RenderError::LayoutNotFound(layout.to_string()));
        }
        Ok(self.tera.render(layout, context)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_layout() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("post.html"),
            "<h1>{{ title }}</h1>{{ contents | safe }}",
        )
        .unwrap();

        let renderer = Renderer::new(dir.path()).unwrap();
        let mut context = Context::new();
        context.insert("title", "Hello");
        context.insert("contents", "<p>Body</p>");

        let html = renderer.render("post.html", &context).unwrap();
        assert_eq!(html, "<h1>Hello</h1><p>Body</p>");
    }

    #[test]
    fn test_nested_layout_names() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("partials")).unwrap();
        std::fs::write(dir.path().join("partials/footer.html"), "footer").unwrap();
        std::fs::write(
            dir.path().join("page.html"),
            "{% include \"partials/footer.html\" %}",
        )
        .unwrap();

        let renderer = Renderer::new(dir.path()).unwrap();
        let html = renderer.render("page.html", &Context::new()).unwrap();
        assert_eq!(html, "footer");
    }

    #[test]
    fn test_missing_layout() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = Renderer::new(&dir.path().join("missing")).unwrap();
        let err = renderer.render("post.html", &Context::new()).unwrap_err();
        assert!(matches!(err, RenderError::LayoutNotFound(name) if name == "post.html"));
    }
}
