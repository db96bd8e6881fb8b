use serde_json::Value;

use super::files::Metadata;

#[derive(thiserror::Error, Debug)]
pub enum FrontMatterError {
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("front matter must be a mapping of keys to values")]
    NotAMapping,
}

/// Result of splitting front matter from file content.
#[derive(Debug)]
pub struct ParsedContent<'a> {
    /// The parsed front matter (empty if none found)
    pub metadata: Metadata,
    /// The content without the front matter block
    pub content: &'a str,
}

/// Parse front matter from the start of a file.
///
/// Front matter is a YAML block delimited by `---` lines at the very start
/// of the file:
///
/// ```markdown
/// ---
/// title: My Post
/// date: 2024-06-01
/// draft: true
/// ---
///
/// # Content starts here
/// ```
///
/// Files without an opening delimiter, or without a closing one, are returned
/// unchanged with empty metadata.
pub fn parse_front_matter(content: &str) -> Result<ParsedContent<'_>, FrontMatterError> {
    let unchanged = || ParsedContent {
        metadata: Metadata::new(),
        content,
    };

    // The opening delimiter must sit alone on the first line
    let Some(after_opening) = content.strip_prefix("---") else {
        return Ok(unchanged());
    };
    if !(after_opening.starts_with('\n') || after_opening.starts_with("\r\n")) {
        return Ok(unchanged());
    }

    let Some(closing_pos) = after_opening.find("\n---") else {
        return Ok(unchanged());
    };

    let yaml_content = &after_opening[..closing_pos];

    // Skip the rest of the closing delimiter line
    let after_closing = &after_opening[closing_pos + 4..];
    let body = match after_closing.find('\n') {
        Some(newline) => &after_closing[newline + 1..],
        None => "",
    };

    if yaml_content.trim().is_empty() {
        return Ok(ParsedContent {
            metadata: Metadata::new(),
            content: body.trim_start_matches(['\r', '\n']),
        });
    }

    let metadata = match serde_yaml::from_str::<Value>(yaml_content)? {
        Value::Object(map) => map,
        Value::Null => Metadata::new(),
        _ => return Err(FrontMatterError::NotAMapping),
    };

    Ok(ParsedContent {
        metadata,
        content: body.trim_start_matches(['\r', '\n']),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_front_matter_basic() {
        let content = r#"---
title: My Post
date: 2024-06-01
---

# Hello World
"#;
        let parsed = parse_front_matter(content).unwrap();
        assert_eq!(parsed.metadata["title"], json!("My Post"));
        assert_eq!(parsed.metadata["date"], json!("2024-06-01"));
        assert_eq!(parsed.content.trim(), "# Hello World");
    }

    #[test]
    fn test_parse_front_matter_flags_and_lists() {
        let content = "---\ndraft: true\ntags:\n  - rust\n  - notes\n---\nBody\n";
        let parsed = parse_front_matter(content).unwrap();
        assert_eq!(parsed.metadata["draft"], json!(true));
        assert_eq!(parsed.metadata["tags"], json!(["rust", "notes"]));
        assert_eq!(parsed.content, "Body\n");
    }

    #[test]
    fn test_parse_front_matter_no_front_matter() {
        let content = "# Just Markdown\n\nNo front matter here.";
        let parsed = parse_front_matter(content).unwrap();
        assert!(parsed.metadata.is_empty());
        assert_eq!(parsed.content, content);
    }

    #[test]
    fn test_parse_front_matter_empty_front_matter() {
        let content = "---\n---\n\n# Content";
        let parsed = parse_front_matter(content).unwrap();
        assert!(parsed.metadata.is_empty());
        assert_eq!(parsed.content, "# Content");
    }

    #[test]
    fn test_parse_front_matter_unclosed() {
        let content = "---\ntitle: nope\n\n# Content";
        let parsed = parse_front_matter(content).unwrap();
        assert!(parsed.metadata.is_empty());
        assert_eq!(parsed.content, content);
    }

    #[test]
    fn test_horizontal_rule_is_not_front_matter() {
        let content = "----\nnot yaml\n---\n";
        let parsed = parse_front_matter(content).unwrap();
        assert!(parsed.metadata.is_empty());
    }

    #[test]
    fn test_parse_front_matter_invalid_yaml() {
        let content = "---\ntitle: [unclosed\n---\nBody";
        assert!(matches!(
            parse_front_matter(content),
            Err(FrontMatterError::Yaml(_))
        ));
    }

    #[test]
    fn test_parse_front_matter_scalar() {
        let content = "---\njust a string\n---\nBody";
        assert!(matches!(
            parse_front_matter(content),
            Err(FrontMatterError::NotAMapping)
        ));
    }
}
