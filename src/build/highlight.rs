use std::sync::LazyLock;

use autumnus::{HtmlLinkedBuilder, formatter::Formatter, languages::Language, themes};
use regex::{Captures, Regex};

/// Fenced code blocks as emitted by pulldown-cmark.
static CODE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<pre><code class="language-([^"]+)">(.*?)</code></pre>"#).unwrap()
});

/// A syntax highlighter using autumnus (tree-sitter based).
pub struct SyntaxHighlighter {
    /// Theme name for CSS generation (used by generate_css).
    theme_name: String,
}

impl SyntaxHighlighter {
    /// Create a new syntax highlighter with the given theme.
    pub fn new(theme_name: &str) -> Self {
        Self {
            theme_name: theme_name.to_string(),
        }
    }

    /// Highlight code and return HTML with CSS classes.
    /// Returns the original code wrapped in a plain `<code>` if the language is not supported.
    pub fn highlight(&self, code: &str, language: &str) -> String {
        // Use Language::guess which handles language detection from name or extension
        let lang = Language::guess(language, code);

        // Check if it's the Plaintext/unknown fallback
        if matches!(lang, Language::PlainText)
            && !language.is_empty()
            && language != "plaintext"
            && language != "text"
        {
            // Language wasn't recognized, use plain code block
            return Self::plain_code_block(code, language);
        }

        let formatter = HtmlLinkedBuilder::new().source(code).lang(lang).build();

        match formatter {
            Ok(f) => {
                let mut output: Vec<u8> = Vec::new();
                if f.format(&mut output).is_ok() {
                    String::from_utf8(output)
                        .unwrap_or_else(|_| Self::plain_code_block(code, language))
                } else {
                    Self::plain_code_block(code, language)
                }
            }
            Err(_) => Self::plain_code_block(code, language),
        }
    }

    /// Rewrite every fenced code block in an HTML fragment.
    ///
    /// Returns `None` when the fragment has no code blocks to highlight.
    pub fn highlight_html(&self, html: &str) -> Option<String> {
        if !CODE_BLOCK.is_match(html) {
            return None;
        }

        let rewritten = CODE_BLOCK.replace_all(html, |caps: &Captures| {
            let language = html_unescape(&caps[1]);
            let code = html_unescape(&caps[2]);
            self.highlight(&code, &language)
        });
        Some(rewritten.into_owned())
    }

    /// Generate CSS for the current theme.
    pub fn generate_css(&self) -> Option<String> {
        let theme = themes::get(&self.theme_name).ok()?;
        Some(theme.css(false)) // false = don't enable italic
    }

    /// Create a plain code block without highlighting.
    fn plain_code_block(code: &str, language: &str) -> String {
        let escaped = html_escape(code);
        if language.is_empty() {
            format!("<pre><code>{}</code></pre>", escaped)
        } else {
            format!(
                "<pre><code class=\"language-{}\">{}</code></pre>",
                html_escape(language),
                escaped
            )
        }
    }
}

impl Default for SyntaxHighlighter {
    fn default() -> Self {
        Self::new("github_dark")
    }
}

/// Escape HTML special characters.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Reverse [`html_escape`] (the escapes pulldown-cmark applies to code text).
fn html_unescape(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highlight_rust() {
        let highlighter = SyntaxHighlighter::default();
        let code = "fn main() {}";
        let result = highlighter.highlight(code, "rust");
        // Should contain highlighted spans
        assert!(result.contains("<pre"));
        assert!(result.contains("</pre>"));
    }

    #[test]
    fn test_highlight_unknown_language() {
        let highlighter = SyntaxHighlighter::default();
        let result = highlighter.highlight("some code", "unknown_lang_xyz");
        // Should fall back to plain code block
        assert!(result.contains("<pre><code"));
        assert!(result.contains("some code"));
    }

    #[test]
    fn test_highlight_html_rewrites_blocks() {
        let highlighter = SyntaxHighlighter::default();
        let html = "<p>before</p>\n<pre><code class=\"language-zzz\">a &lt; b</code></pre>\n";
        let result = highlighter.highlight_html(html).unwrap();
        assert!(result.starts_with("<p>before</p>"));
        // Code is unescaped before highlighting and escaped again exactly once
        assert!(result.contains("&lt;"));
        assert!(!result.contains("&amp;lt;"));
    }

    #[test]
    fn test_highlight_html_without_blocks() {
        let highlighter = SyntaxHighlighter::default();
        assert!(highlighter.highlight_html("<p>no code</p>").is_none());
        assert!(
            highlighter
                .highlight_html("<pre><code>plain</code></pre>")
                .is_none()
        );
    }

    #[test]
    fn test_html_escape_round_trip() {
        assert_eq!(html_escape("<div>&</div>"), "&lt;div&gt;&amp;&lt;/div&gt;");
        assert_eq!(html_unescape("&lt;div&gt;&amp;lt;"), "<div>&lt;");
    }

    #[test]
    fn test_default_theme_exists() {
        let css = SyntaxHighlighter::default().generate_css();
        assert!(css.is_some_and(|css| !css.is_empty()));
    }

    #[test]
    fn test_generate_css() {
        let highlighter = SyntaxHighlighter::new("dracula");
        let css = highlighter.generate_css();
        assert!(css.is_some_and(|css| !css.is_empty()));
    }
}
