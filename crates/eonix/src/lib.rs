//! Repository-level extraction: dispatch files to language extractors and
//! aggregate their facts.

pub mod manager;
pub mod pipeline;

pub use manager::{ExtractionManager, ExtractorKind};
pub use pipeline::ExtractionPipeline;
