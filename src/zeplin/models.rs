//! Raw payload models for the Zeplin REST API.
//!
//! These mirror the wire format (snake_case JSON). The reconciliation
//! tree has its own node types; conversion happens through explicit
//! constructors so only the declared schema survives, recursively.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(rename = "number_of_screens", default)]
    pub screen_count: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Screen {
    pub id: String,
    pub name: String,
}

/// Latest version of a screen: the layer tree, exported asset groups and
/// the rendered snapshot image.
#[derive(Debug, Clone, Deserialize)]
pub struct ScreenVersion {
    #[serde(default)]
    pub layers: Vec<RawLayer>,
    #[serde(default)]
    pub assets: Vec<RawAsset>,
    #[serde(default)]
    pub image: Option<ScreenImage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScreenImage {
    pub original_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawLayer {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub source_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub layer_type: String,
    #[serde(default)]
    pub rect: RawRect,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub layers: Vec<RawLayer>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct RawRect {
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

/// One exported display-name group; `contents` holds the concrete
/// (format, density) variants that were actually exported.
#[derive(Debug, Clone, Deserialize)]
pub struct RawAsset {
    pub display_name: String,
    #[serde(default)]
    pub layer_source_id: String,
    #[serde(default)]
    pub contents: Vec<AssetContent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetContent {
    pub url: String,
    pub format: String,
    #[serde(default = "default_density")]
    pub density: f64,
}

fn default_density() -> f64 {
    1.0
}

impl AssetContent {
    /// Render the density the way the design tool writes it: `1`, `1.5`,
    /// `2`... — integral multipliers drop the fractional part.
    pub fn density_label(&self) -> String {
        if self.density.fract() == 0.0 {
            format!("{}", self.density as i64)
        } else {
            self.density.to_string()
        }
    }
}
