use serde::{Deserialize, Serialize};

/// Constructs an `Err(eyre::Report)` from a format string, for fatal / contextual error paths.
#[macro_export]
macro_rules! make_error {
  ($($arg:tt)*) => {
    Err(eyre::eyre!($($arg)*))
  };
}

/// As [`make_error`], but flags the message as an internal invariant violation rather than a user-facing one.
#[macro_export]
macro_rules! make_internal_report {
  ($($arg:tt)*) => {
    eyre::eyre!("Internal error (this is a bug): {}", format!($($arg)*))
  };
}

/// The non-fatal, per-sequence failure captured at the pipeline boundary. Unlike the fatal `eyre::Report`
/// path used for CLI/process-level failures, this is a closed, serializable enum: it is attached to an
/// [`crate::run::pipeline::PipelineRecord`] rather than propagated, so the pipeline keeps processing the
/// remaining sequences.
#[derive(Clone, Debug, Serialize, Deserialize, thiserror::Error)]
pub enum AnalysisError {
  #[error("sequence too short to align ({length} nucleotides, minimum is {min_length})")]
  SequenceTooShort { length: usize, min_length: usize },

  #[error("alignment failed to find a path through the band, even after retrying with a doubled band width")]
  AlignmentFailed,

  #[error("gene '{gene_name}' could not be extracted from the alignment: {reason}")]
  GeneExtractionFailed { gene_name: String, reason: String },

  #[error("translation produced no peptides even though a non-empty gene map was supplied")]
  NoPeptidesProduced,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn error_messages_are_human_readable() {
    let err = AnalysisError::GeneExtractionFailed { gene_name: "S".to_owned(), reason: "out of range".to_owned() };
    assert!(err.to_string().contains("'S'"));
  }
}
