use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Geometry of the callout layout, in PDF points.
///
/// The defaults reproduce the annotator's fixed layout; a config file can
/// override them, but callers normally rely on [`LayoutConfig::default`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Width of a label box.
    pub label_width: f32,
    /// Height of a label box.
    pub label_height: f32,
    /// Distance between a label box and the nearest page edge.
    pub label_inset: f32,
    /// Distance between the connector gutter and the nearest page edge.
    pub gutter_inset: f32,
    /// Downward shift applied while a candidate label collides.
    pub nudge_step: f32,
    /// Radius of the terminal marker dot at the target.
    pub marker_radius: f32,
    /// Stroke width for highlight boxes.
    pub highlight_stroke_width: f32,
    /// Stroke width for connector polylines.
    pub connector_stroke_width: f32,
    /// Inner padding between a label box edge and its caption text.
    pub caption_padding: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            label_width: 60.0,
            label_height: 30.0,
            label_inset: 10.0,
            gutter_inset: 40.0,
            nudge_step: 35.0,
            marker_radius: 1.5,
            highlight_stroke_width: 1.0,
            connector_stroke_width: 0.75,
            caption_padding: 2.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub layout: LayoutConfig,
    pub theme: Theme,
}

/// Load a JSON config file, falling back to defaults when no path is given.
/// Missing fields take their default values.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&contents)?;
    Ok(config)
}
