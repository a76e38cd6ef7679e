//! Callout layout: geometry types and the three-stage planning pipeline.
//!
//! Locating, placing and routing are kept as separate passes so each can be
//! tested on plain rectangles without a document in hand. The planner here
//! only decides *where* things go; drawing is `render`'s job.

use crate::config::LayoutConfig;
use crate::job::Side;

pub mod locate;
pub mod place;
pub mod route;

pub use locate::{LocatedTarget, locate_targets};
pub use place::LabelPlacer;
pub use route::{Connector, snake_connector};

/// Axis-aligned rectangle in PDF user space. Y grows upward, so the top
/// edge is `y1` and shifting a box down means decreasing its y values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    pub fn mid_y(&self) -> f32 {
        (self.y0 + self.y1) / 2.0
    }

    /// Strict overlap test. Edge-touching rectangles do not intersect,
    /// so a label may sit flush against a committed neighbor.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x0 < other.x1 && other.x0 < self.x1 && self.y0 < other.y1 && other.y0 < self.y1
    }

    /// Smallest rectangle containing both.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    pub fn translate(&self, dx: f32, dy: f32) -> Rect {
        Rect {
            x0: self.x0 + dx,
            y0: self.y0 + dy,
            x1: self.x1 + dx,
            y1: self.y1 + dy,
        }
    }
}

/// One fully planned callout, ready to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    /// Committed label box in the margin.
    pub label: Rect,
    /// The matched text on the page.
    pub target: Rect,
    pub side: Side,
    pub caption: String,
}

/// Run the placer over located targets in order and pair each with its
/// label box. Placement is greedy and first-come-first-served: earlier
/// targets claim the preferred slot, later colliders get nudged down.
pub fn plan_annotations(
    located: &[LocatedTarget],
    config: &LayoutConfig,
    page_width: f32,
) -> Vec<Placement> {
    let mut placer = LabelPlacer::new(config.clone(), page_width);
    located
        .iter()
        .map(|t| {
            let label = placer.place(t.side, &t.rect);
            tracing::debug!(
                caption = %t.caption,
                x0 = label.x0,
                y1 = label.y1,
                "placed label"
            );
            Placement {
                label,
                target: t.rect,
                side: t.side,
                caption: t.caption.clone(),
            }
        })
        .collect()
}
