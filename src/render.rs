//! Draws planned placements onto the canvas.
//!
//! Per placement the order is fixed: opaque label background, caption
//! text, then the connector polyline and its marker dot, so the connector
//! visibly attaches to the finished label. Highlight boxes are drawn
//! earlier, by the driver, as matches are found.

use crate::canvas::PdfCanvas;
use crate::config::Config;
use crate::layout::{Placement, snake_connector};

/// Average glyph width of the bold serif caption font, as a fraction of
/// the font size. Good enough for wrapping short fixed captions.
const AVG_CHAR_WIDTH_EM: f32 = 0.5;

pub fn draw_placement(canvas: &mut PdfCanvas, placement: &Placement, config: &Config) {
    let layout = &config.layout;
    let theme = &config.theme;

    canvas.fill_rect(&placement.label, theme.caption_background);

    let usable_width = layout.label_width - 2.0 * layout.caption_padding;
    let lines = wrap_caption(&placement.caption, usable_width, theme.caption_font_size);
    canvas.text_lines(
        placement.label.x0 + layout.caption_padding,
        placement.label.y1 - layout.caption_padding,
        &lines,
        &theme.caption_font,
        theme.caption_font_size,
        theme.caption_font_size * theme.caption_line_height,
        theme.markup_color,
    );

    let connector = snake_connector(
        &placement.label,
        &placement.target,
        placement.side,
        canvas.page_width(),
        layout.gutter_inset,
    );
    canvas.polyline(
        &connector.points,
        theme.markup_color,
        layout.connector_stroke_width,
    );
    canvas.fill_circle(connector.marker, layout.marker_radius, theme.markup_color);
}

/// Greedy word wrap by estimated width. A word longer than a full line
/// gets its own overflowing line rather than being split.
fn wrap_caption(caption: &str, usable_width: f32, font_size: f32) -> Vec<String> {
    let max_chars = ((usable_width / (AVG_CHAR_WIDTH_EM * font_size)) as usize).max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in caption.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
        } else if current.chars().count() + 1 + word.chars().count() <= max_chars {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
