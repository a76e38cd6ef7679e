//! Stage three: route a connector from a committed label to its target
//! through the margin gutter. Pure geometry, mirrored for the two sides.

use crate::job::Side;
use crate::layout::Rect;

/// A three-segment connector plus its terminal marker position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Connector {
    /// Polyline vertices: label edge, gutter at label height, gutter at
    /// target height, target edge.
    pub points: [(f32, f32); 4],
    /// Center of the filled dot, always the last vertex.
    pub marker: (f32, f32),
}

/// Build the snake connector for one placement.
///
/// p1 leaves the label through the edge facing the page body, runs to the
/// vertical gutter, drops (or rises) to the target's midline, then enters
/// the target through its near edge.
pub fn snake_connector(
    label: &Rect,
    target: &Rect,
    side: Side,
    page_width: f32,
    gutter_inset: f32,
) -> Connector {
    let target_y = target.mid_y();
    let (p1, gutter_x, target_x) = match side {
        Side::Left => ((label.x1, label.mid_y()), gutter_inset, target.x0),
        Side::Right => (
            (label.x0, label.mid_y()),
            page_width - gutter_inset,
            target.x1,
        ),
    };
    let p4 = (target_x, target_y);
    Connector {
        points: [p1, (gutter_x, p1.1), (gutter_x, target_y), p4],
        marker: p4,
    }
}
