use serde::{Deserialize, Serialize};

/// Presentational constants for annotation markup.
///
/// This is a default theme, not a per-call option: all markup shares one
/// stroke/fill color, captions sit on an opaque background and use a bold
/// serif base font.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    /// Stroke and fill color for highlight boxes, connectors, markers and
    /// caption text, as RGB in the 0..=1 range.
    pub markup_color: (f32, f32, f32),
    /// Opaque fill painted behind caption text.
    pub caption_background: (f32, f32, f32),
    /// One of the base-14 PDF font names.
    pub caption_font: String,
    pub caption_font_size: f32,
    /// Line height multiplier for wrapped caption lines.
    pub caption_line_height: f32,
}

impl Theme {
    pub fn markup_default() -> Self {
        Self {
            markup_color: (1.0, 0.0, 0.0),
            caption_background: (1.0, 1.0, 1.0),
            caption_font: "Times-Bold".to_string(),
            caption_font_size: 6.0,
            caption_line_height: 1.2,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::markup_default()
    }
}
