pub mod annotator;
pub mod canvas;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod job;
pub mod layout;
pub mod render;
pub mod sources;
pub mod text_index;
pub mod theme;

pub use annotator::{AnnotateError, AnnotatedDocument, Annotator};
pub use config::{Config, LayoutConfig, load_config};
pub use job::{AnnotationJob, CriterionResult, MetadataField, Side, SourceMetadata};

#[cfg(feature = "cli")]
pub use cli::run;
