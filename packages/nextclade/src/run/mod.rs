pub mod context;
pub mod pipeline;

pub use context::{AnalysisContext, SequenceAnalysisResult, Warning};
pub use pipeline::{run_pipeline, PipelineRecord};
