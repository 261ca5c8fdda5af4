use crate::align::params::AlignPairwiseParams;
use crate::align::seed::{Seed, SeedMatchResult};
use crate::alphabet::letter::Letter;
use crate::alphabet::nuc::Nuc;
use crate::error::AnalysisError;

const NEG_INF: i32 = i32::MIN / 4;

/// Which of the three Gotoh matrices a cell belongs to.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum Mat {
  M,
  /// gap in the aligned reference (query consumed, reference holds at the same position)
  Ir,
  /// gap in the aligned query (reference consumed, query holds at the same position)
  Iq,
}

/// Tie-break priority used whenever two or more predecessors score equally: continuing the current gap
/// beats everything, then `M` (match/mismatch), then `Iq`, then `Ir`.
fn tie_break_rank(current: Mat, candidate: Mat) -> u8 {
  if candidate == current {
    0
  } else {
    match candidate {
      Mat::M => 1,
      Mat::Iq => 2,
      Mat::Ir => 3,
    }
  }
}

fn best_of(current: Mat, candidates: &[(Mat, i32)]) -> (Mat, i32) {
  let mut best = candidates[0];
  let mut best_rank = tie_break_rank(current, best.0);
  for &(mat, score) in &candidates[1..] {
    let rank = tie_break_rank(current, mat);
    if score > best.1 || (score == best.1 && rank < best_rank) {
      best = (mat, score);
      best_rank = rank;
    }
  }
  best
}

/// Per-reference-position expected query offset and band half-width, derived from seed diagonals.
struct Band {
  /// `center[i]` = expected query position for reference position `i`, for `i` in `0..=ref_len`.
  center: Vec<i64>,
  half_width: usize,
}

impl Band {
  fn from_seeds(ref_len: usize, qry_len: usize, seeds: &[Seed], half_width_override: Option<usize>) -> Self {
    let mut center = vec![0i64; ref_len + 1];

    if seeds.is_empty() {
      let scale = qry_len as f64 / ref_len.max(1) as f64;
      for (i, c) in center.iter_mut().enumerate() {
        *c = (i as f64 * scale).round() as i64;
      }
      return Self { center, half_width: half_width_override.unwrap_or(ref_len.max(qry_len)) };
    }

    let offsets: Vec<i64> = seeds.iter().map(|s| s.qry_pos as i64 - s.ref_pos as i64).collect();
    let min_off = *offsets.iter().min().unwrap();
    let max_off = *offsets.iter().max().unwrap();
    let half_width = half_width_override.unwrap_or_else(|| ((max_off - min_off) as usize / 2 + 16));

    let mut seed_idx = 0usize;
    for (i, c) in center.iter_mut().enumerate() {
      while seed_idx + 1 < seeds.len() && seeds[seed_idx + 1].ref_pos <= i {
        seed_idx += 1;
      }
      let offset = if i <= seeds[0].ref_pos {
        offsets[0]
      } else if i >= seeds[seeds.len() - 1].ref_pos || seed_idx + 1 >= seeds.len() {
        *offsets.last().unwrap()
      } else {
        let a_ref = seeds[seed_idx].ref_pos;
        let b_ref = seeds[seed_idx + 1].ref_pos;
        if b_ref == a_ref {
          offsets[seed_idx]
        } else {
          let t = (i - a_ref) as f64 / (b_ref - a_ref) as f64;
          (offsets[seed_idx] as f64 + t * (offsets[seed_idx + 1] as f64 - offsets[seed_idx] as f64)).round() as i64
        }
      };
      *c = i as i64 + offset;
    }

    Self { center, half_width }
  }

  fn range_for_row(&self, ref_pos: usize, qry_len: usize) -> (usize, usize) {
    let c = self.center[ref_pos];
    let lo = (c - self.half_width as i64).clamp(0, qry_len as i64) as usize;
    let hi = ((c + self.half_width as i64).max(0) as usize + 1).clamp(lo + 1, qry_len + 1);
    (lo, hi)
  }
}

fn score_column(r: Nuc, q: Nuc, params: &AlignPairwiseParams) -> i32 {
  if Nuc::matches(r, q) {
    params.score_match
  } else {
    params.score_mismatch
  }
}

fn gap_open_cost(ref_pos: usize, params: &AlignPairwiseParams) -> i32 {
  if ref_pos % 3 == 0 {
    params.gap_open_in_frame
  } else {
    params.gap_open
  }
}

pub struct AlignmentResult {
  pub aligned_ref: Vec<Nuc>,
  pub aligned_qry: Vec<Nuc>,
  pub score: i32,
}

/// Runs Gotoh affine-gap banded alignment once, at a fixed band half-width. Returns `None` if no path
/// through the band reaches `(ref_len, qry_len)`.
fn align_with_band(reference: &[Nuc], query: &[Nuc], band: &Band, params: &AlignPairwiseParams) -> Option<AlignmentResult> {
  let ref_len = reference.len();
  let qry_len = query.len();

  let ranges: Vec<(usize, usize)> = (0..=ref_len).map(|i| band.range_for_row(i, qry_len)).collect();

  let mut m = vec![Vec::new(); ref_len + 1];
  let mut ir = vec![Vec::new(); ref_len + 1];
  let mut iq = vec![Vec::new(); ref_len + 1];
  // traceback[i][j-lo] = (source matrix for M, for Ir, for Iq) — only the one matching the current matrix
  // is consulted during traceback, but all three are filled so traceback can switch matrices.
  let mut from_m = vec![Vec::new(); ref_len + 1];
  let mut from_ir = vec![Vec::new(); ref_len + 1];
  let mut from_iq = vec![Vec::new(); ref_len + 1];

  for i in 0..=ref_len {
    let (lo, hi) = ranges[i];
    let width = hi - lo;
    m[i] = vec![NEG_INF; width];
    ir[i] = vec![NEG_INF; width];
    iq[i] = vec![NEG_INF; width];
    from_m[i] = vec![Mat::M; width];
    from_ir[i] = vec![Mat::M; width];
    from_iq[i] = vec![Mat::M; width];
  }

  let get = |mat: &[Vec<i32>], i: usize, j: usize| -> i32 {
    let (lo, hi) = ranges[i];
    if j < lo || j >= hi {
      NEG_INF
    } else {
      mat[i][j - lo]
    }
  };

  if ranges[0].0 == 0 {
    m[0][0] = 0;
  }
  for j in ranges[0].0.max(1)..ranges[0].1 {
    let prev_ir = get(&ir, 0, j - 1);
    let prev_m = get(&m, 0, j - 1);
    let open = if prev_m > NEG_INF { prev_m + params.gap_open } else { NEG_INF };
    let extend = if prev_ir > NEG_INF { prev_ir + params.gap_extend } else { NEG_INF };
    let idx = j - ranges[0].0;
    ir[0][idx] = open.max(extend);
    from_ir[0][idx] = if extend > open { Mat::Ir } else { Mat::M };
  }
  for i in 1..=ref_len {
    let (lo, _hi) = ranges[i];
    if lo == 0 {
      let prev_iq = get(&iq, i - 1, 0);
      let prev_m = get(&m, i - 1, 0);
      let open = if prev_m > NEG_INF { prev_m + gap_open_cost(i - 1, params) } else { NEG_INF };
      let extend = if prev_iq > NEG_INF { prev_iq + params.gap_extend } else { NEG_INF };
      iq[i][0] = open.max(extend);
      from_iq[i][0] = if extend > open { Mat::Iq } else { Mat::M };
    }
  }

  for i in 1..=ref_len {
    let (lo, hi) = ranges[i];
    for j in lo.max(1)..hi {
      let col = score_column(reference[i - 1], query[j - 1], params);
      let candidates = [
        (Mat::M, get(&m, i - 1, j - 1)),
        (Mat::Ir, get(&ir, i - 1, j - 1)),
        (Mat::Iq, get(&iq, i - 1, j - 1)),
      ];
      let valid: Vec<_> = candidates.iter().copied().filter(|(_, s)| *s > NEG_INF).collect();
      if !valid.is_empty() {
        let (src, score) = best_of(Mat::M, &valid);
        m[i][j - lo] = score + col;
        from_m[i][j - lo] = src;
      }

      // Ir: gap in reference, came from (i, j-1)
      let ir_m = get(&m, i, j - 1);
      let ir_ir = get(&ir, i, j - 1);
      let ir_iq = get(&iq, i, j - 1);
      let ir_candidates = [
        (Mat::M, if ir_m > NEG_INF { ir_m + params.gap_open } else { NEG_INF }),
        (Mat::Ir, if ir_ir > NEG_INF { ir_ir + params.gap_extend } else { NEG_INF }),
        (Mat::Iq, if ir_iq > NEG_INF { ir_iq + params.gap_open } else { NEG_INF }),
      ];
      let valid: Vec<_> = ir_candidates.iter().copied().filter(|(_, s)| *s > NEG_INF).collect();
      if !valid.is_empty() {
        let (src, score) = best_of(Mat::Ir, &valid);
        ir[i][j - lo] = score;
        from_ir[i][j - lo] = src;
      }

      // Iq: gap in query, came from (i-1, j)
      let iq_m = get(&m, i - 1, j);
      let iq_ir = get(&ir, i - 1, j);
      let iq_iq = get(&iq, i - 1, j);
      let open_cost = gap_open_cost(i - 1, params);
      let iq_candidates = [
        (Mat::M, if iq_m > NEG_INF { iq_m + open_cost } else { NEG_INF }),
        (Mat::Ir, if iq_ir > NEG_INF { iq_ir + open_cost } else { NEG_INF }),
        (Mat::Iq, if iq_iq > NEG_INF { iq_iq + params.gap_extend } else { NEG_INF }),
      ];
      let valid: Vec<_> = iq_candidates.iter().copied().filter(|(_, s)| *s > NEG_INF).collect();
      if !valid.is_empty() {
        let (src, score) = best_of(Mat::Iq, &valid);
        iq[i][j - lo] = score;
        from_iq[i][j - lo] = src;
      }
    }
  }

  let final_candidates = [(Mat::M, get(&m, ref_len, qry_len)), (Mat::Ir, get(&ir, ref_len, qry_len)), (Mat::Iq, get(&iq, ref_len, qry_len))];
  let valid: Vec<_> = final_candidates.iter().copied().filter(|(_, s)| *s > NEG_INF).collect();
  if valid.is_empty() {
    return None;
  }
  let (mut cur_mat, score) = best_of(Mat::M, &valid);

  let mut aligned_ref = Vec::with_capacity(ref_len + qry_len);
  let mut aligned_qry = Vec::with_capacity(ref_len + qry_len);
  let mut i = ref_len;
  let mut j = qry_len;

  while i > 0 || j > 0 {
    match cur_mat {
      Mat::M => {
        aligned_ref.push(reference[i - 1]);
        aligned_qry.push(query[j - 1]);
        let (lo, _) = ranges[i];
        cur_mat = from_m[i][j - lo];
        i -= 1;
        j -= 1;
      },
      Mat::Ir => {
        aligned_ref.push(Nuc::GAP);
        aligned_qry.push(query[j - 1]);
        let (lo, _) = ranges[i];
        cur_mat = from_ir[i][j - lo];
        j -= 1;
      },
      Mat::Iq => {
        aligned_ref.push(reference[i - 1]);
        aligned_qry.push(Nuc::GAP);
        let (lo, _) = ranges[i];
        cur_mat = from_iq[i][j - lo];
        i -= 1;
      },
    }
  }

  aligned_ref.reverse();
  aligned_qry.reverse();

  Some(AlignmentResult { aligned_ref, aligned_qry, score })
}

/// Longest run of consecutive gap characters in `seq`; used to reject indels longer than `maxIndel`.
fn longest_gap_run(seq: &[Nuc]) -> usize {
  let mut longest = 0;
  let mut current = 0;
  for &letter in seq {
    if letter.is_gap() {
      current += 1;
      longest = longest.max(current);
    } else {
      current = 0;
    }
  }
  longest
}

/// Aligns `query` against `reference` with seed-derived banding, retrying once at doubled band width on
/// failure before reporting the sequence as unalignable.
pub fn align_pairwise(reference: &[Nuc], query: &[Nuc], params: &AlignPairwiseParams) -> Result<AlignmentResult, AnalysisError> {
  let seed_result = crate::align::seed::seed_alignment(reference, query, params);
  let seeds = match seed_result {
    SeedMatchResult::Seeds(seeds) => seeds,
    SeedMatchResult::FullMatrixFallback => Vec::new(),
  };

  if seeds.is_empty() && !(reference.is_empty() || query.is_empty()) {
    log::warn!("Seeding fell back to full-matrix alignment: too few seeds matched");
  }

  let band = Band::from_seeds(reference.len(), query.len(), &seeds, None);
  let first_try = align_with_band(reference, query, &band, params);

  let result = match first_try {
    Some(result) if longest_gap_run(&result.aligned_ref).max(longest_gap_run(&result.aligned_qry)) <= params.max_indel => {
      Some(result)
    },
    _ => {
      log::warn!("Retrying alignment with doubled band width");
      let doubled = Band::from_seeds(reference.len(), query.len(), &seeds, Some(band.half_width * 2 + 1));
      align_with_band(reference, query, &doubled, params)
        .filter(|r| longest_gap_run(&r.aligned_ref).max(longest_gap_run(&r.aligned_qry)) <= params.max_indel)
    },
  };

  result.ok_or(AnalysisError::AlignmentFailed)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::alphabet::nuc::{from_nuc_seq, to_nuc_seq};

  fn align(reference: &str, query: &str) -> (String, String) {
    let params = AlignPairwiseParams::default();
    let r = align_pairwise(&to_nuc_seq(reference), &to_nuc_seq(query), &params).unwrap();
    (from_nuc_seq(&r.aligned_ref), from_nuc_seq(&r.aligned_qry))
  }

  #[test]
  fn identity_scenario() {
    let (aligned_ref, aligned_qry) = align("ACGCTCGCT", "ACGCTCGCT");
    assert_eq!(aligned_ref, "ACGCTCGCT");
    assert_eq!(aligned_qry, "ACGCTCGCT");
  }

  #[test]
  fn missing_left_scenario() {
    let (aligned_ref, aligned_qry) = align("ACGCTCGCT", "CTCGCT");
    assert_eq!(aligned_ref, "ACGCTCGCT");
    assert_eq!(aligned_qry, "---CTCGCT");
  }

  #[test]
  fn missing_right_scenario() {
    let (aligned_ref, aligned_qry) = align("ACGCTCGCT", "ACGCTC");
    assert_eq!(aligned_ref, "ACGCTCGCT");
    assert_eq!(aligned_qry, "ACGCTC---");
  }

  #[test]
  fn query_inside_ref_scenario() {
    let (aligned_ref, aligned_qry) = align("GCCACGCTCGCT", "ACGCTC");
    assert_eq!(aligned_ref, "GCCACGCTCGCT");
    assert_eq!(aligned_qry, "---ACGCTC---");
  }
}
