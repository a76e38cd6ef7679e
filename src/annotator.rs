//! The job driver: open, index, locate, place, render, serialize.

use thiserror::Error;

use crate::canvas::PdfCanvas;
use crate::config::Config;
use crate::job::{AnnotationJob, CriterionResult};
use crate::layout::{locate_targets, plan_annotations};
use crate::render::draw_placement;
use crate::text_index::TextIndex;

/// Fatal annotation failures. Per-target misses are not errors; an
/// unmatched target is dropped and the rest of the job proceeds.
#[derive(Debug, Error)]
pub enum AnnotateError {
    #[error("failed to open document")]
    DocumentOpen(#[source] lopdf::Error),
    #[error("document has no pages")]
    EmptyDocument,
    #[error("failed to render annotations")]
    Render(#[source] lopdf::Error),
    #[error("failed to serialize document")]
    Serialize(#[source] std::io::Error),
}

/// Annotated output: the re-serialized document and the result record
/// tying it back to the criterion it supports.
#[derive(Debug)]
pub struct AnnotatedDocument {
    pub bytes: Vec<u8>,
    pub result: CriterionResult,
}

/// Stateless annotation engine. Construct once, run many jobs; all
/// per-job state (obstacle set, draw queue) lives and dies inside
/// [`Annotator::annotate`].
pub struct Annotator {
    config: Config,
}

impl Annotator {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(Config::default())
    }

    /// Annotate the first page of the job's document.
    ///
    /// Highlights are stroked as soon as a target matches, so they land
    /// on the page even for targets whose labels end up nudged far from
    /// their match. Labels and connectors are drawn afterwards from the
    /// planned placements.
    pub fn annotate(&self, job: &AnnotationJob) -> Result<AnnotatedDocument, AnnotateError> {
        let mut canvas = PdfCanvas::open(&job.document)?;
        let index = TextIndex::from_page(canvas.document(), canvas.page_id())
            .map_err(AnnotateError::Render)?;

        let targets = job.targets();
        let located = locate_targets(&index, &targets);
        tracing::debug!(
            criterion = %job.criterion,
            requested = targets.len(),
            located = located.len(),
            "located targets"
        );

        for target in &located {
            canvas.stroke_rect(
                &target.rect,
                self.config.theme.markup_color,
                self.config.layout.highlight_stroke_width,
            );
        }

        let placements = plan_annotations(&located, &self.config.layout, canvas.page_width());
        for placement in &placements {
            draw_placement(&mut canvas, placement, &self.config);
        }

        let bytes = canvas.save()?;
        Ok(AnnotatedDocument {
            bytes,
            result: CriterionResult {
                criterion_id: job.criterion.clone(),
            },
        })
    }
}
