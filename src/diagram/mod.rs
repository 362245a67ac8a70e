// Entity discovery from an already-rendered diagram

use crate::snapshot::EntityId;
use anyhow::{Context, Result};
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

/// Opening `<g ...>` tags
static GROUP_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<g\s[^>]*>").expect("valid group tag regex"));

/// `name="value"` attribute pairs
static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_:][-\w:.]*)\s*=\s*"([^"]*)""#).expect("valid attribute regex")
});

/// IDs of every node group (`<g class="node" id="...">`) in document order.
///
/// Duplicate IDs are reported once; groups without an `id` are skipped.
pub fn entity_ids_from_svg(svg: &str) -> Vec<EntityId> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();

    for tag in GROUP_TAG.find_iter(svg) {
        let mut id = None;
        let mut is_node = false;
        for attr in ATTRIBUTE.captures_iter(tag.as_str()) {
            match &attr[1] {
                "id" => id = Some(attr[2].to_string()),
                "class" => is_node = attr[2].split_whitespace().any(|c| c == "node"),
                _ => {}
            }
        }
        if let (true, Some(id)) = (is_node, id) {
            if seen.insert(id.clone()) {
                ids.push(id);
            }
        }
    }

    ids
}

/// Read an SVG file and extract its node IDs
pub fn load_entity_ids(path: &Path) -> Result<Vec<EntityId>> {
    let svg = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read diagram {}", path.display()))?;
    Ok(entity_ids_from_svg(&svg))
}
