//! A viral-genome analysis pipeline: pairwise nucleotide alignment against a reference, mutation and gene
//! translation reporting, quality-control scoring, and phylogenetic clade assignment, driven concurrently
//! over a stream of FASTA records.

pub mod align;
pub mod alphabet;
pub mod analyze;
pub mod error;
pub mod gene;
pub mod io;
pub mod qc;
pub mod run;
pub mod translate;
pub mod tree;
pub mod utils;

pub use align::{AlignPairwiseParams, AlignmentResult, CoordMap};
pub use error::AnalysisError;
pub use qc::{QcConfig, QcResult, QcStatus};
pub use run::{run_pipeline, AnalysisContext, PipelineRecord, SequenceAnalysisResult, Warning};
pub use tree::{CladeAssignment, Tree};
