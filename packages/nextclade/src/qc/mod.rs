use crate::alphabet::letter::Letter;
use crate::alphabet::nuc::Nuc;
use crate::analyze::mutations::NucleotideSubstitution;
use crate::utils::range::Range;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Aggregate and per-rule status: `< 30` good, `[30, 100)` mediocre, `>= 100` bad.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub enum QcStatus {
  Good,
  Mediocre,
  Bad,
}

#[must_use]
pub fn status_for_score(score: f64) -> QcStatus {
  if score < 30.0 {
    QcStatus::Good
  } else if score < 100.0 {
    QcStatus::Mediocre
  } else {
    QcStatus::Bad
  }
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MissingDataConfig {
  pub enabled: bool,
  pub missing_data_threshold: f64,
  pub score_bias: f64,
}

impl Default for MissingDataConfig {
  fn default() -> Self {
    Self { enabled: true, missing_data_threshold: 300.0, score_bias: 5.0 }
  }
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MixedSitesConfig {
  pub enabled: bool,
  pub mixed_sites_threshold: f64,
}

impl Default for MixedSitesConfig {
  fn default() -> Self {
    Self { enabled: true, mixed_sites_threshold: 10.0 }
  }
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrivateMutationsConfig {
  pub enabled: bool,
  pub typical: f64,
  pub cutoff: f64,
}

impl Default for PrivateMutationsConfig {
  fn default() -> Self {
    Self { enabled: true, typical: 8.0, cutoff: 24.0 }
  }
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SnpClustersConfig {
  pub enabled: bool,
  pub window_size: usize,
  pub cluster_cut_off: usize,
  pub score_weight: f64,
}

impl Default for SnpClustersConfig {
  fn default() -> Self {
    Self { enabled: true, window_size: 100, cluster_cut_off: 6, score_weight: 50.0 }
  }
}

/// Immutable, explicitly-passed QC configuration, deserializable from the optional `--input-qc-config`
/// JSON file. The thresholds below are reasonable illustrative defaults, documented here and in
/// DESIGN.md rather than guessed silently into the formulas.
#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QcConfig {
  pub missing_data: MissingDataConfig,
  pub mixed_sites: MixedSitesConfig,
  pub private_mutations: PrivateMutationsConfig,
  pub snp_clusters: SnpClustersConfig,
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingDataResult {
  pub score: f64,
  pub status: QcStatus,
  pub total_missing: usize,
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MixedSitesResult {
  pub score: f64,
  pub status: QcStatus,
  pub total_mixed_sites: usize,
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateMutationsResult {
  pub score: f64,
  pub status: QcStatus,
  pub total_private_mutations: usize,
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnpClustersResult {
  pub score: f64,
  pub status: QcStatus,
  pub clusters: usize,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QcResult {
  pub missing_data: Option<MissingDataResult>,
  pub mixed_sites: Option<MixedSitesResult>,
  pub private_mutations: Option<PrivateMutationsResult>,
  pub snp_clusters: Option<SnpClustersResult>,
  pub overall_score: f64,
  pub overall_status: QcStatus,
}

impl Default for QcStatus {
  fn default() -> Self {
    Self::Good
  }
}

/// `max(0, (m - t + b) * 100 / t - b)`: zero below the threshold, scaling linearly above it.
#[must_use]
pub fn run_missing_data_rule(missing_ranges: &[Range], config: &MissingDataConfig) -> Option<MissingDataResult> {
  if !config.enabled {
    return None;
  }
  let total_missing: usize = missing_ranges.iter().map(Range::len).sum();
  let m = total_missing as f64;
  let t = config.missing_data_threshold;
  let b = config.score_bias;
  let score = (((m - t + b) * 100.0 / t) - b).max(0.0);
  Some(MissingDataResult { score, status: status_for_score(score), total_missing })
}

/// `c * 100 / threshold`, where `c` is the count of ambiguous, non-`N` sites in the aligned query — `N`
/// sites are covered by `missingData` instead, so are excluded here to avoid double-counting.
#[must_use]
pub fn run_mixed_sites_rule(aligned_qry: &[Nuc], config: &MixedSitesConfig) -> Option<MixedSitesResult> {
  if !config.enabled {
    return None;
  }
  let total_mixed_sites = aligned_qry.iter().filter(|n| n.is_ambiguous() && !n.is_missing()).count();
  let score = total_mixed_sites as f64 * 100.0 / config.mixed_sites_threshold;
  Some(MixedSitesResult { score, status: status_for_score(score), total_mixed_sites })
}

/// `p * 100 / cutoff`, clamped from below at zero and from above at `100 * p / typical`.
#[must_use]
pub fn run_private_mutations_rule(total_private_mutations: usize, config: &PrivateMutationsConfig) -> Option<PrivateMutationsResult> {
  if !config.enabled {
    return None;
  }
  let p = total_private_mutations as f64;
  let raw = p * 100.0 / config.cutoff;
  let upper_bound = p * 100.0 / config.typical;
  let score = raw.max(0.0).min(upper_bound);
  Some(PrivateMutationsResult { score, status: status_for_score(score), total_private_mutations })
}

/// Counts maximal, non-overlapping windows of width `window_size` containing at least `cluster_cut_off`
/// substitutions, scanning sorted substitution positions left to right and greedily consuming each cluster
/// once it reaches the cutoff (so two adjacent dense regions are counted as separate clusters rather than
/// one double-wide one).
#[must_use]
fn count_snp_clusters(mut positions: Vec<usize>, window_size: usize, cluster_cut_off: usize) -> usize {
  positions.sort_unstable();
  let mut clusters = 0;
  let mut i = 0;
  while i < positions.len() {
    let mut j = i;
    while j + 1 < positions.len() && positions[j + 1] - positions[i] < window_size {
      j += 1;
    }
    if j - i + 1 >= cluster_cut_off {
      clusters += 1;
      i = j + 1;
    } else {
      i += 1;
    }
  }
  clusters
}

/// `clusters * score_weight`.
#[must_use]
pub fn run_snp_clusters_rule(substitutions: &[NucleotideSubstitution], config: &SnpClustersConfig) -> Option<SnpClustersResult> {
  if !config.enabled {
    return None;
  }
  let positions: Vec<usize> = substitutions.iter().map(|s| s.pos).collect();
  let clusters = count_snp_clusters(positions, config.window_size, config.cluster_cut_off);
  let score = clusters as f64 * config.score_weight;
  Some(SnpClustersResult { score, status: status_for_score(score), clusters })
}

/// Runs all four independently enable-able rules and aggregates their scores as a sum.
#[must_use]
pub fn run_qc(
  missing_ranges: &[Range],
  aligned_qry: &[Nuc],
  total_private_mutations: usize,
  substitutions: &[NucleotideSubstitution],
  config: &QcConfig,
) -> QcResult {
  let missing_data = run_missing_data_rule(missing_ranges, &config.missing_data);
  let mixed_sites = run_mixed_sites_rule(aligned_qry, &config.mixed_sites);
  let private_mutations = run_private_mutations_rule(total_private_mutations, &config.private_mutations);
  let snp_clusters = run_snp_clusters_rule(substitutions, &config.snp_clusters);

  let overall_score = missing_data.map_or(0.0, |r| r.score)
    + mixed_sites.map_or(0.0, |r| r.score)
    + private_mutations.map_or(0.0, |r| r.score)
    + snp_clusters.map_or(0.0, |r| r.score);

  QcResult {
    missing_data,
    mixed_sites,
    private_mutations,
    snp_clusters,
    overall_score,
    overall_status: status_for_score(overall_score),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::alphabet::nuc::Nuc;

  #[test]
  fn status_thresholds_match_spec() {
    assert!(matches!(status_for_score(29.9), QcStatus::Good));
    assert!(matches!(status_for_score(30.0), QcStatus::Mediocre));
    assert!(matches!(status_for_score(99.9), QcStatus::Mediocre));
    assert!(matches!(status_for_score(100.0), QcStatus::Bad));
  }

  #[test]
  fn missing_data_is_zero_below_threshold() {
    let config = MissingDataConfig { enabled: true, missing_data_threshold: 300.0, score_bias: 5.0 };
    let result = run_missing_data_rule(&[Range::new(0, 10)], &config).unwrap();
    assert_eq!(result.score, 0.0);
  }

  #[test]
  fn missing_data_scales_above_threshold() {
    let config = MissingDataConfig { enabled: true, missing_data_threshold: 100.0, score_bias: 0.0 };
    let result = run_missing_data_rule(&[Range::new(0, 200)], &config).unwrap();
    assert_eq!(result.score, 100.0);
  }

  #[test]
  fn disabled_rule_returns_none() {
    let config = MixedSitesConfig { enabled: false, mixed_sites_threshold: 10.0 };
    assert!(run_mixed_sites_rule(&[Nuc::R, Nuc::A], &config).is_none());
  }

  #[test]
  fn counts_disjoint_snp_clusters() {
    // Two dense runs far apart: {0,1,2,3,4} and {500,501,502,503,504}, window=10, cutoff=5.
    let mut positions = vec![];
    for p in 0..5 {
      positions.push(p);
    }
    for p in 500..505 {
      positions.push(p);
    }
    assert_eq!(count_snp_clusters(positions, 10, 5), 2);
  }

  #[test]
  fn no_cluster_when_below_cutoff() {
    assert_eq!(count_snp_clusters(vec![0, 1, 2], 10, 5), 0);
  }
}
