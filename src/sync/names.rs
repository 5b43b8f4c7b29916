//! Deterministic name resolution — output filenames from asset display
//! names and filesystem-safe path components for screen/project names.
//!
//! Display names may carry bracketed tags, e.g. `Icon[id:home][scale:2x]`.
//! Tags are the primary filename scheme: a `id:` tag wins, otherwise the
//! asset falls back to a positional name derived from its owning layer.

use serde_json::{Map, Value};

/// Parse bracketed `key:value` tags embedded in a display name.
///
/// The text before the first `[` is the base name and carries no tags.
/// Fragments between `[`/`]` delimiters are folded left-to-right into one
/// flat object: `key:value` fragments map the key to the string after the
/// first `:`, fragments without a `:` become boolean-true flags. Later
/// duplicate keys overwrite earlier ones.
///
/// Returns `None` when the display name carries no tag at all.
pub fn parse_display_name_params(display_name: &str) -> Option<Map<String, Value>> {
    let start = display_name.find('[')?;
    let mut params = Map::new();

    for fragment in display_name[start..]
        .split(['[', ']'])
        .filter(|f| !f.is_empty())
    {
        match fragment.split_once(':') {
            Some((key, value)) => {
                params.insert(key.to_string(), Value::String(value.to_string()))
            }
            None => params.insert(fragment.to_string(), Value::Bool(true)),
        };
    }

    if params.is_empty() {
        None
    } else {
        Some(params)
    }
}

/// Resolve the output filename for an asset variant.
///
/// An `id` tag names the file directly (`home.png`); untagged assets fall
/// back to `asset<N>.<format>` where `N` is the 1-based position of the
/// owning layer within its screen, so untagged assets under different
/// layers of the same screen do not collide.
pub fn resolve_filename(params: Option<&Map<String, Value>>, format: &str, layer_index: usize) -> String {
    match params.and_then(|p| p.get("id")).and_then(Value::as_str) {
        Some(id) => format!("{}.{}", id, format),
        None => format!("asset{}.{}", layer_index + 1, format),
    }
}

/// Make a screen or project name safe to use as a single path component
/// by replacing path separators with hyphens.
pub fn sanitize_path_component(name: &str) -> String {
    name.chars()
        .map(|c| if c == '/' || c == '\\' { '-' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_tags() {
        let params = parse_display_name_params("Icon[id:home][scale:2x]").unwrap();
        assert_eq!(params.get("id"), Some(&json!("home")));
        assert_eq!(params.get("scale"), Some(&json!("2x")));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_parse_no_tags_is_none() {
        assert!(parse_display_name_params("Icon").is_none());
        assert!(parse_display_name_params("").is_none());
    }

    #[test]
    fn test_parse_flag_without_colon() {
        let params = parse_display_name_params("Icon[primary]").unwrap();
        assert_eq!(params.get("primary"), Some(&json!(true)));
    }

    #[test]
    fn test_parse_value_keeps_later_colons() {
        let params = parse_display_name_params("Icon[url:https://a/b]").unwrap();
        assert_eq!(params.get("url"), Some(&json!("https://a/b")));
    }

    #[test]
    fn test_parse_duplicate_keys_overwrite() {
        let params = parse_display_name_params("Icon[id:a][id:b]").unwrap();
        assert_eq!(params.get("id"), Some(&json!("b")));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_parse_dangling_bracket_is_none() {
        assert!(parse_display_name_params("Icon[").is_none());
    }

    #[test]
    fn test_resolve_with_id_tag() {
        let params = parse_display_name_params("Icon[id:home]").unwrap();
        assert_eq!(resolve_filename(Some(&params), "png", 3), "home.png");
    }

    #[test]
    fn test_resolve_fallback_is_one_based() {
        assert_eq!(resolve_filename(None, "png", 3), "asset4.png");
        assert_eq!(resolve_filename(None, "svg", 0), "asset1.svg");
    }

    #[test]
    fn test_resolve_fallback_when_tags_lack_id() {
        let params = parse_display_name_params("Icon[scale:2x]").unwrap();
        assert_eq!(resolve_filename(Some(&params), "png", 0), "asset1.png");
    }

    #[test]
    fn test_sanitize_path_component() {
        assert_eq!(sanitize_path_component("Home / Landing"), "Home - Landing");
        assert_eq!(sanitize_path_component("a\\b"), "a-b");
        assert_eq!(sanitize_path_component("plain"), "plain");
    }
}
