use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for seeding and banded alignment: seed geometry plus affine gap-scoring constants.
///
/// Derives `JsonSchema` so a `generate-jsonschema`-style binary could emit a schema for the optional
/// alignment-parameters config file the same way it does for `QcConfig`.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AlignPairwiseParams {
  pub seed_length: usize,
  pub min_seeds: usize,
  pub seed_spacing: usize,
  pub mismatches_allowed: usize,

  pub score_match: i32,
  pub score_mismatch: i32,
  pub gap_open: i32,
  pub gap_extend: i32,
  pub gap_open_in_frame: i32,

  pub max_indel: usize,
}

impl Default for AlignPairwiseParams {
  fn default() -> Self {
    Self {
      seed_length: 21,
      min_seeds: 10,
      seed_spacing: 100,
      mismatches_allowed: 3,

      score_match: 3,
      score_mismatch: -1,
      gap_open: -6,
      gap_extend: 0,
      gap_open_in_frame: -5,

      max_indel: 400,
    }
  }
}
