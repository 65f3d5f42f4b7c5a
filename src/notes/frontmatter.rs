use anyhow::{Context, Result};
use serde_json::{Map, Value};

const FENCE: &str = "---";

/// Splits a markdown document into its raw YAML frontmatter block and body.
pub(super) fn split(content: &str) -> (Option<&str>, &str) {
    let Some(rest) = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))
    else {
        return (None, content);
    };

    let mut offset = 0usize;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == FENCE {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return (Some(yaml), body);
        }
        offset += line.len();
    }

    (None, content)
}

pub(super) fn parse(yaml: &str) -> Result<Map<String, Value>> {
    if yaml.trim().is_empty() {
        return Ok(Map::new());
    }

    let parsed: serde_yaml::Value =
        serde_yaml::from_str(yaml).context("frontmatter is not valid YAML")?;
    let value = serde_json::to_value(parsed).context("frontmatter is not representable as JSON")?;
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        _ => anyhow::bail!("frontmatter is not a mapping"),
    }
}

/// Reads the frontmatter of a document; malformed frontmatter yields an empty map.
pub(super) fn read(content: &str, path: &str) -> Map<String, Value> {
    let (yaml, _body) = split(content);
    let Some(yaml) = yaml else {
        return Map::new();
    };

    match parse(yaml) {
        Ok(map) => map,
        Err(error) => {
            tracing::warn!(path = %path, error = %error, "skipping malformed frontmatter");
            Map::new()
        }
    }
}

/// Renders a document with the given frontmatter and body.
pub(super) fn render(properties: &Map<String, Value>, body: &str) -> Result<String> {
    if properties.is_empty() {
        return Ok(body.to_owned());
    }

    let yaml = serde_yaml::to_string(properties).context("failed to encode frontmatter")?;
    let mut document = String::with_capacity(yaml.len() + body.len() + 8);
    document.push_str("---\n");
    document.push_str(&yaml);
    if !yaml.ends_with('\n') {
        document.push('\n');
    }
    document.push_str("---\n");
    document.push_str(body);
    Ok(document)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{parse, read, render, split};

    #[test]
    fn splits_frontmatter_and_body() {
        let (yaml, body) = split("---\ndue: 2024-01-01\n---\n# Title\n");
        assert_eq!(yaml, Some("due: 2024-01-01\n"));
        assert_eq!(body, "# Title\n");
    }

    #[test]
    fn documents_without_fence_have_no_frontmatter() {
        let (yaml, body) = split("# Title\n---\n");
        assert_eq!(yaml, None);
        assert_eq!(body, "# Title\n---\n");
    }

    #[test]
    fn unterminated_fence_is_body() {
        let content = "---\ndue: 2024\n";
        assert_eq!(split(content), (None, content));
    }

    #[test]
    fn fence_at_end_of_file() {
        assert_eq!(split("---\na: 1\n---"), (Some("a: 1\n"), ""));
    }

    #[test]
    fn malformed_yaml_reads_as_empty() {
        assert!(read("---\n: : :\n  - [\n---\n", "bad.md").is_empty());
        assert!(parse("- a\n- b\n").is_err());
    }

    #[test]
    fn render_round_trips_properties() {
        let properties = json!({ "rank": 3, "due": "2024-01-01" })
            .as_object()
            .cloned()
            .unwrap_or_default();
        let document = render(&properties, "body\n").expect("render");
        assert!(document.starts_with("---\n"));
        assert!(document.ends_with("---\nbody\n"));
        assert_eq!(read(&document, "x.md"), properties);
    }
}
