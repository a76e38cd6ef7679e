//! Stage two: claim a margin slot for each label, nudging downward past
//! anything already committed.

use crate::config::LayoutConfig;
use crate::job::Side;
use crate::layout::Rect;

/// Greedy margin slot allocator.
///
/// Owns the obstacle set for one document; build a fresh placer per job.
/// Placement is order-sensitive on purpose: the first target near a given
/// height keeps the slot aligned with its match, later colliders are
/// pushed down in fixed steps. There is no lower bound, so a crowded
/// margin can push labels below the page edge.
pub struct LabelPlacer {
    config: LayoutConfig,
    page_width: f32,
    obstacles: Vec<Rect>,
}

impl LabelPlacer {
    pub fn new(config: LayoutConfig, page_width: f32) -> Self {
        Self {
            config,
            page_width,
            obstacles: Vec::new(),
        }
    }

    /// Place one label for a target rectangle and commit it.
    ///
    /// The candidate starts top-aligned with the target and anchored
    /// horizontally by side, then shifts down by `nudge_step` until it
    /// clears every committed label.
    pub fn place(&mut self, side: Side, target: &Rect) -> Rect {
        let x0 = match side {
            Side::Left => self.config.label_inset,
            Side::Right => self.page_width - self.config.label_inset - self.config.label_width,
        };
        let mut candidate = Rect::new(
            x0,
            target.y1 - self.config.label_height,
            x0 + self.config.label_width,
            target.y1,
        );
        while self.collides(&candidate) {
            candidate = candidate.translate(0.0, -self.config.nudge_step);
        }
        self.obstacles.push(candidate);
        candidate
    }

    fn collides(&self, candidate: &Rect) -> bool {
        self.obstacles.iter().any(|r| r.intersects(candidate))
    }

    #[cfg(test)]
    fn committed(&self) -> &[Rect] {
        &self.obstacles
    }
}
