//! Metadata tree builder — the reconciliation engine.
//!
//! Merges independently-fetched screens, layer trees and asset variants
//! into one nested ownership tree: assets belong to the layer they were
//! exported from (matched by `sourceId`), layers belong to their screen
//! (matched by `screenId`), screens belong to the project of the run.
//! An entity that cannot be matched to its parent is recorded in the
//! activity log and excluded — never silently dropped.
//!
//! Processing order is fetch order; no sorting happens here. Lookups are
//! linear scans, which is fine at the scale of tens of screens and low
//! hundreds of assets per project.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::sync::log::ActivityLog;
use crate::sync::names::{parse_display_name_params, resolve_filename};
use crate::zeplin::models::{Project, RawLayer, Screen};

/// Allowed absolute drift (design units vs. decoded pixels) per axis
/// before a downloaded asset is flagged as mismatched.
pub const DIMENSION_TOLERANCE: f64 = 3.0;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataTree {
    pub source: &'static str,
    pub project: ProjectNode,
    pub screens: Vec<ScreenNode>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectNode {
    pub id: String,
    pub name: String,
    pub screen_count: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenNode {
    pub id: String,
    pub name: String,
    pub config: Option<Value>,
    pub layers: Vec<LayerNode>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerNode {
    pub id: String,
    pub source_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub layer_type: String,
    pub rect: Rect,
    pub content: Option<String>,
    pub assets: Vec<AssetNode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub layers: Vec<LayerNode>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Rect {
    pub width: f64,
    pub height: f64,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetNode {
    pub display_name: String,
    pub filename: String,
    pub format: String,
    pub density: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Map<String, Value>>,
    pub actual_size: Option<Size>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

/// Layer tree fetched for one screen, pre-correlated by the version fetch.
#[derive(Debug)]
pub struct ScreenLayers {
    pub screen_id: String,
    pub layers: Vec<RawLayer>,
}

/// One flattened, format/density-filtered asset variant awaiting merge.
#[derive(Debug, Clone)]
pub struct AssetVariant {
    pub screen_id: String,
    pub screen_name: String,
    pub display_name: String,
    pub layer_source_id: String,
    pub url: String,
    pub format: String,
    pub density: String,
}

/// Download work produced by a successful asset merge. The tree itself
/// does not store URLs, so `ingest_assets` hands them back to the caller.
#[derive(Debug, Clone)]
pub struct PlannedDownload {
    pub screen_name: String,
    pub filename: String,
    pub url: String,
}

impl LayerNode {
    /// Build a tree node from the raw payload, keeping only the declared
    /// schema and recursing into nested layers. Negative rect dimensions
    /// are clamped to zero.
    fn from_raw(raw: RawLayer) -> Self {
        Self {
            id: raw.id,
            source_id: raw.source_id,
            name: raw.name,
            layer_type: raw.layer_type,
            rect: Rect {
                width: raw.rect.width.max(0.0),
                height: raw.rect.height.max(0.0),
                x: raw.rect.x,
                y: raw.rect.y,
            },
            content: raw.content,
            assets: Vec::new(),
            layers: raw.layers.into_iter().map(LayerNode::from_raw).collect(),
        }
    }
}

impl MetadataTree {
    pub fn new(project: Project) -> Self {
        Self {
            source: "zeplin",
            project: ProjectNode {
                id: project.id,
                name: project.name,
                screen_count: project.screen_count,
            },
            screens: Vec::new(),
        }
    }

    /// Append one node per screen, in fetch order. No deduplication: a
    /// screen id appearing twice is a caller error and produces two nodes.
    pub fn ingest_screens(&mut self, screens: &[Screen]) {
        for screen in screens {
            self.screens.push(ScreenNode {
                id: screen.id.clone(),
                name: screen.name.clone(),
                config: None,
                layers: Vec::new(),
            });
        }
    }

    /// Attach each screen's fetched layer tree to its owning screen node.
    /// A layer batch whose screen id matches nothing is logged per layer
    /// to the `unknown` bucket and skipped.
    pub fn ingest_layers(&mut self, batches: Vec<ScreenLayers>, log: &mut ActivityLog) {
        for batch in batches {
            match self.screens.iter_mut().find(|s| s.id == batch.screen_id) {
                Some(screen) => {
                    screen
                        .layers
                        .extend(batch.layers.into_iter().map(LayerNode::from_raw));
                }
                None => {
                    for layer in &batch.layers {
                        log.error(
                            None,
                            format!("Error: Unable to identify screen for layer {}", layer.name),
                        );
                    }
                }
            }
        }
    }

    /// Merge asset variants under the layer they were exported from,
    /// resolving each variant's output filename. Returns the download
    /// work list for the batch. Screen or layer misses are logged against
    /// the variant's screen name and the variant is excluded.
    pub fn ingest_assets(
        &mut self,
        variants: Vec<AssetVariant>,
        log: &mut ActivityLog,
    ) -> Vec<PlannedDownload> {
        let mut planned = Vec::new();

        for variant in variants {
            let Some(screen) = self.screens.iter_mut().find(|s| s.id == variant.screen_id)
            else {
                log.error(
                    Some(&variant.screen_name),
                    format!(
                        "Error: Unable to identify screen for asset {}",
                        variant.display_name
                    ),
                );
                continue;
            };

            let Some((ordinal, layer)) =
                find_layer_mut(&mut screen.layers, &variant.layer_source_id)
            else {
                log.error(
                    Some(&variant.screen_name),
                    format!(
                        "Error: Unable to identify layer for asset {}",
                        variant.display_name
                    ),
                );
                continue;
            };

            let params = parse_display_name_params(&variant.display_name);
            let filename = resolve_filename(params.as_ref(), &variant.format, ordinal);

            layer.assets.push(AssetNode {
                display_name: variant.display_name,
                filename: filename.clone(),
                format: variant.format,
                density: variant.density,
                params,
                actual_size: None,
            });

            planned.push(PlannedDownload {
                screen_name: variant.screen_name,
                filename,
                url: variant.url,
            });
        }

        planned
    }

    /// Store the decoded pixel size of a downloaded asset and compare it
    /// against the owning layer's declared rect. Any lookup miss is
    /// logged and the call returns without mutating the tree. A mismatch
    /// beyond [`DIMENSION_TOLERANCE`] on either axis logs a warning;
    /// the check is advisory and never fails the download.
    pub fn record_actual_size(
        &mut self,
        screen_name: &str,
        filename: &str,
        width: u32,
        height: u32,
        log: &mut ActivityLog,
    ) {
        let Some(screen) = self.screens.iter_mut().find(|s| s.name == screen_name) else {
            log.error(
                Some(screen_name),
                format!(
                    "Error: Unable to identify screen for asset with filename {}",
                    filename
                ),
            );
            return;
        };

        let Some(layer) = find_layer_with_asset(&mut screen.layers, filename) else {
            log.error(
                Some(screen_name),
                format!(
                    "Error: Unable to identify layer for asset with filename {}",
                    filename
                ),
            );
            return;
        };

        let rect = layer.rect;
        let Some(asset) = layer.assets.iter_mut().find(|a| a.filename == filename) else {
            // Unreachable in practice: the layer was found through this filename.
            log.error(
                Some(screen_name),
                format!("Error: Unable to identify asset for filename {}", filename),
            );
            return;
        };

        asset.actual_size = Some(Size { width, height });

        if (rect.width - f64::from(width)).abs() > DIMENSION_TOLERANCE
            || (rect.height - f64::from(height)).abs() > DIMENSION_TOLERANCE
        {
            log.warning(
                Some(screen_name),
                format!(
                    "Warning: rect dimensions for {} do not match actual file dimensions. Rect: {}x{} Actual: {}x{}",
                    filename, rect.width, rect.height, width, height
                ),
            );
        }
    }
}

/// Depth-first search for the layer with the given `sourceId`, returning
/// its 0-based DFS ordinal within the screen alongside the node.
fn find_layer_mut<'a>(
    layers: &'a mut [LayerNode],
    source_id: &str,
) -> Option<(usize, &'a mut LayerNode)> {
    fn walk<'a>(
        layers: &'a mut [LayerNode],
        source_id: &str,
        ordinal: &mut usize,
    ) -> Option<&'a mut LayerNode> {
        for layer in layers {
            if layer.source_id == source_id {
                return Some(layer);
            }
            *ordinal += 1;
            if let Some(found) = walk(&mut layer.layers, source_id, ordinal) {
                return Some(found);
            }
        }
        None
    }

    let mut ordinal = 0;
    let found = walk(layers, source_id, &mut ordinal)?;
    Some((ordinal, found))
}

/// Depth-first search for the layer whose asset list contains `filename`.
fn find_layer_with_asset<'a>(
    layers: &'a mut [LayerNode],
    filename: &str,
) -> Option<&'a mut LayerNode> {
    for layer in layers {
        if layer.assets.iter().any(|a| a.filename == filename) {
            return Some(layer);
        }
        if let Some(found) = find_layer_with_asset(&mut layer.layers, filename) {
            return Some(found);
        }
    }
    None
}
