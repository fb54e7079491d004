//! Front matter handling
//!
//! Pages open with a `---` fenced YAML block carrying `category` and `tags`.
//! Tags are accepted as either a comma-joined string or a YAML list; rewrites
//! always emit the list form.

use crate::errors::Result;
use serde::{Deserialize, Serialize};

/// Listing entry used by the index and the admin API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageMeta {
    pub file: String,
    pub category: String,
    pub tags: Vec<String>,
}

pub struct ParsedPage<'a> {
    pub category: String,
    pub tags: Vec<String>,
    pub body: &'a str,
    pub warning: Option<String>,
}

/// Split into (yaml, body) when the text opens with a front matter fence
pub fn split(text: &str) -> Option<(&str, &str)> {
    let rest = text.strip_prefix("---")?;
    let rest = rest
        .strip_prefix('\n')
        .or_else(|| rest.strip_prefix("\r\n"))?;
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            return Some((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

/// Parse a page. Broken YAML demotes to defaults with a warning instead of
/// failing the build.
pub fn parse<'a>(text: &'a str, default_category: &str) -> ParsedPage<'a> {
    let (yaml, body) = match split(text) {
        Some(pair) => pair,
        None => {
            return ParsedPage {
                category: default_category.to_string(),
                tags: vec![],
                body: text,
                warning: None,
            }
        }
    };

    match serde_yaml::from_str::<serde_yaml::Value>(yaml) {
        Ok(value) => {
            let category = value
                .get("category")
                .and_then(|v| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(default_category)
                .to_string();
            let tags = match value.get("tags") {
                Some(serde_yaml::Value::String(s)) => s
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(String::from)
                    .collect(),
                Some(serde_yaml::Value::Sequence(seq)) => seq
                    .iter()
                    .filter_map(|v| v.as_str())
                    .map(|s| s.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect(),
                _ => vec![],
            };
            ParsedPage {
                category,
                tags,
                body,
                warning: None,
            }
        }
        Err(e) => ParsedPage {
            category: default_category.to_string(),
            tags: vec![],
            body,
            warning: Some(format!("front matter ignored: {}", e)),
        },
    }
}

#[derive(Serialize)]
struct FrontMatter<'a> {
    category: &'a str,
    tags: &'a [String],
}

/// Prepend a fresh front matter block to `body`
pub fn compose(category: &str, tags: &[String], body: &str) -> Result<String> {
    let yaml = serde_yaml::to_string(&FrontMatter { category, tags })?;
    Ok(format!("---\n{}---\n{}", yaml, body))
}

/// Replace (or add) the front matter, leaving the body alone apart from
/// guaranteeing one blank line after the fence.
pub fn rewrite(text: &str, category: &str, tags: &[String]) -> Result<String> {
    let body = match split(text) {
        Some((_, body)) => body,
        None => text,
    };
    if body.is_empty() || body.starts_with('\n') || body.starts_with("\r\n") {
        compose(category, tags, body)
    } else {
        compose(category, tags, &format!("\n{}", body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_requires_fence() {
        assert!(split("# Just a title").is_none());
        assert!(split("--- not a fence").is_none());
    }

    #[test]
    fn test_split_returns_yaml_and_body() {
        let (yaml, body) = split("---\ncategory: Ops\n---\n\n# Hi\n").unwrap();
        assert_eq!(yaml, "category: Ops\n");
        assert_eq!(body, "\n# Hi\n");
    }

    #[test]
    fn test_parse_tags_from_string() {
        let page = parse("---\ntags: a, b , ,c\n---\nbody", "Misc");
        assert_eq!(page.tags, vec!["a", "b", "c"]);
        assert_eq!(page.category, "Misc");
    }

    #[test]
    fn test_parse_tags_from_sequence() {
        let page = parse("---\ncategory: Ops\ntags:\n- x\n- y\n---\nbody", "Misc");
        assert_eq!(page.category, "Ops");
        assert_eq!(page.tags, vec!["x", "y"]);
    }

    #[test]
    fn test_bad_yaml_warns_and_defaults() {
        let page = parse("---\ncategory: [unclosed\n---\nbody", "Misc");
        assert!(page.warning.is_some());
        assert_eq!(page.category, "Misc");
        assert_eq!(page.body, "body");
    }

    #[test]
    fn test_compose_empty_tags_uses_flow_list() {
        let text = compose("Ops", &[], "\nbody\n").unwrap();
        assert!(text.starts_with("---\ncategory: Ops\ntags: []\n---\n"));
    }

    #[test]
    fn test_rewrite_preserves_body() {
        let original = "---\ncategory: Old\ntags: a\n---\n\n# Title\n\ntext\n";
        let updated = rewrite(original, "New", &["x".to_string()]).unwrap();
        assert!(updated.ends_with("---\n\n# Title\n\ntext\n"));
        assert!(updated.contains("category: New\n"));
        assert!(updated.contains("tags:\n- x\n"));
    }

    #[test]
    fn test_rewrite_adds_block_when_missing() {
        let updated = rewrite("# Title\n", "Ops", &[]).unwrap();
        assert_eq!(updated, "---\ncategory: Ops\ntags: []\n---\n\n# Title\n");
    }
}
