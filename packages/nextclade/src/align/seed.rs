use crate::align::params::AlignPairwiseParams;
use crate::alphabet::nuc::Nuc;

/// One anchor pair: `ref_pos` in the reference and `qry_pos` in the query, marking the start of a
/// `seedLength`-long exact-enough match between the two.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Seed {
  pub ref_pos: usize,
  pub qry_pos: usize,
}

/// Result of seeding: either enough anchors were found to define a band, or seeding fell back to a
/// full-matrix (unseeded) alignment, which the caller surfaces as a warning.
pub enum SeedMatchResult {
  Seeds(Vec<Seed>),
  FullMatrixFallback,
}

/// Finds the half-open `[start, end)` query range with the terminal runs of `N` trimmed off both ends.
fn trim_terminal_n(qry: &[Nuc]) -> (usize, usize) {
  let start = qry.iter().position(|n| *n != Nuc::N).unwrap_or(qry.len());
  let end = qry.iter().rposition(|n| *n != Nuc::N).map_or(start, |p| p + 1);
  (start, end.max(start))
}

/// Hamming distance between two equal-length nucleotide slices, using [`Nuc::matches`] so ambiguous codes
/// count as matches against any base they could stand for (same rule the aligner itself uses for scoring).
fn hamming_mismatches(a: &[Nuc], b: &[Nuc]) -> usize {
  debug_assert_eq!(a.len(), b.len());
  a.iter().zip(b).filter(|(x, y)| !Nuc::matches(**x, **y)).count()
}

/// Finds evenly-spaced seed anchors between `reference` and `query`.
#[must_use]
pub fn seed_alignment(reference: &[Nuc], query: &[Nuc], params: &AlignPairwiseParams) -> SeedMatchResult {
  let (trimmed_start, trimmed_end) = trim_terminal_n(query);
  let trimmed_len = trimmed_end.saturating_sub(trimmed_start);

  if reference.len() < params.seed_length || query.len() < params.seed_length || trimmed_len == 0 {
    return SeedMatchResult::FullMatrixFallback;
  }

  let n_seeds = params.min_seeds.max(trimmed_len / params.seed_spacing.max(1));

  let last_ref_start = reference.len() - params.seed_length;
  let seed_positions: Vec<usize> = if n_seeds <= 1 {
    vec![0]
  } else {
    (0..n_seeds)
      .map(|k| (k * last_ref_start) / (n_seeds - 1))
      .collect()
  };

  let scale = query.len() as f64 / reference.len() as f64;

  let mut seeds = Vec::new();
  for ref_pos in seed_positions {
    let ref_seed = &reference[ref_pos..ref_pos + params.seed_length];
    let expected_qry_pos = (ref_pos as f64 * scale).round() as i64;
    let deviation = (ref_pos as i64 - expected_qry_pos).unsigned_abs() as usize;
    // The search window grows with how far this seed's diagonal has already drifted from the
    // proportional expectation, so seeds near large indels still get a fair chance to match.
    let window_radius = deviation + params.seed_length;

    let window_lo = expected_qry_pos.max(0) as usize;
    let window_lo = window_lo.saturating_sub(window_radius).max(trimmed_start);
    let window_hi = (expected_qry_pos.max(0) as usize + window_radius)
      .min(trimmed_end.saturating_sub(params.seed_length).saturating_add(1));

    if window_lo >= window_hi {
      continue;
    }

    let mut best: Option<(usize, usize, usize)> = None; // (mismatches, deviation_from_expected, qry_pos)
    for qry_pos in window_lo..window_hi {
      let qry_seed = &query[qry_pos..qry_pos + params.seed_length];
      let mismatches = hamming_mismatches(ref_seed, qry_seed);
      if mismatches > params.mismatches_allowed {
        continue;
      }
      let dev = (qry_pos as i64 - expected_qry_pos).unsigned_abs() as usize;
      let candidate = (mismatches, dev, qry_pos);
      best = Some(match best {
        None => candidate,
        Some(current) if candidate < current => candidate,
        Some(current) => current,
      });
    }

    if let Some((_, _, qry_pos)) = best {
      seeds.push(Seed { ref_pos, qry_pos });
    }
  }

  if seeds.len() < params.min_seeds {
    return SeedMatchResult::FullMatrixFallback;
  }

  seeds.sort_by_key(|s| s.ref_pos);
  SeedMatchResult::Seeds(seeds)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::alphabet::nuc::to_nuc_seq;

  fn params_for_short_seqs() -> AlignPairwiseParams {
    AlignPairwiseParams {
      seed_length: 3,
      min_seeds: 2,
      seed_spacing: 5,
      mismatches_allowed: 0,
      ..AlignPairwiseParams::default()
    }
  }

  #[test]
  fn trims_terminal_n_runs() {
    let q = to_nuc_seq("NNNACGTNN");
    assert_eq!(trim_terminal_n(&q), (3, 7));
  }

  #[test]
  fn finds_seeds_for_identical_sequences() {
    let seq = to_nuc_seq("ACGTACGTACGTACGTACGT");
    let params = params_for_short_seqs();
    match seed_alignment(&seq, &seq, &params) {
      SeedMatchResult::Seeds(seeds) => {
        assert!(!seeds.is_empty());
        for seed in &seeds {
          assert_eq!(seed.ref_pos, seed.qry_pos);
        }
      },
      SeedMatchResult::FullMatrixFallback => panic!("expected seeds for identical sequences"),
    }
  }

  #[test]
  fn falls_back_when_too_short_for_a_seed() {
    let reference = to_nuc_seq("ACGT");
    let query = to_nuc_seq("AC");
    let params = AlignPairwiseParams::default();
    assert!(matches!(seed_alignment(&reference, &query, &params), SeedMatchResult::FullMatrixFallback));
  }
}
