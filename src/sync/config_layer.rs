//! Per-screen config extraction.
//!
//! Designers drop a text layer named "Config box" on each screen whose
//! content is a JSON object with per-screen presentation settings. The
//! text arrives with design-tool artifacts (smart quotes, hard line
//! breaks) that a strict JSON parser rejects, so the content is
//! normalized before parsing.

use serde_json::Value;

use crate::sync::log::ActivityLog;
use crate::sync::tree::MetadataTree;

pub const CONFIG_LAYER_NAME: &str = "Config box";

/// Find each screen's config layer among its top-level layers, parse its
/// text content and attach the result to the screen node. Every screen
/// is expected to carry one; a missing layer, missing content or
/// unparseable content is logged against the screen and leaves its
/// `config` as `None`.
pub fn apply_config_pass(tree: &mut MetadataTree, log: &mut ActivityLog) {
    for screen in &mut tree.screens {
        let content = screen
            .layers
            .iter()
            .find(|l| l.name == CONFIG_LAYER_NAME)
            .map(|l| l.content.clone());

        let Some(content) = content else {
            log.error(
                Some(&screen.name),
                format!("Error: Unable to find config layer for screen {}", screen.name),
            );
            continue;
        };

        let Some(text) = content else {
            log.error(
                Some(&screen.name),
                format!("Error parsing JSON for screen {}", screen.name),
            );
            continue;
        };

        match parse_relaxed_json(&text) {
            Ok(value) => screen.config = Some(value),
            Err(e) => {
                log.error_with_detail(
                    Some(&screen.name),
                    format!("Error parsing JSON for screen {}", screen.name),
                    e.to_string(),
                );
            }
        }
    }
}

/// Parse JSON after stripping line breaks and straightening typographic
/// quotes. Idempotent for text that is already clean.
pub fn parse_relaxed_json(text: &str) -> Result<Value, serde_json::Error> {
    let normalized: String = text
        .chars()
        .filter(|c| *c != '\n' && *c != '\r')
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' => '"',
            other => other,
        })
        .collect();
    serde_json::from_str(&normalized)
}
