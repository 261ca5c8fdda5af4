use crate::alphabet::letter::Letter;
use crate::alphabet::nuc::Nuc;
use crate::utils::range::Range;
use serde::{Deserialize, Serialize};

#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NucleotideSubstitution {
  pub pos: usize,
  pub reff: Nuc,
  pub qry: Nuc,
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NucleotideDeletion {
  pub start: usize,
  pub length: usize,
}

/// A run of inserted nucleotides. `pos` is the reference coordinate immediately before which the insertion
/// lies; at the very end of the reference (a trailing run of `ref == '-'` columns) that coordinate is `|R|`
/// itself.
#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NucleotideInsertion {
  pub pos: usize,
  pub ins: Vec<Nuc>,
}

/// A contiguous coalesced run of substitutions (supplementing, not replacing, the flat `substitutions`
/// list), grounded on `findSubstitutionRanges.cpp`'s coalescing idea.
#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NucleotideRange {
  pub range: Range,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
  pub substitutions: Vec<NucleotideSubstitution>,
  pub deletions: Vec<NucleotideDeletion>,
  pub insertions: Vec<NucleotideInsertion>,
  pub missing_ranges: Vec<Range>,
  pub alignment_start: usize,
  pub alignment_end: usize,
}

/// Walks an aligned (ref, query) pair and reports substitutions, deletions, insertions, missing ranges, and
/// the alignment bounds.
#[must_use]
pub fn find_mutations(aligned_ref: &[Nuc], aligned_qry: &[Nuc]) -> AnalysisResult {
  debug_assert_eq!(aligned_ref.len(), aligned_qry.len());

  let mut result = AnalysisResult::default();

  let mut ref_pos = 0usize;
  let mut open_insertion: Option<(usize, Vec<Nuc>)> = None;
  let mut open_deletion: Option<(usize, usize)> = None;
  let mut open_missing: Option<(usize, usize)> = None;

  let mut first_non_gap_qry_ref_pos: Option<usize> = None;
  let mut last_non_gap_qry_ref_pos: Option<usize> = None;

  let close_insertion = |open_insertion: &mut Option<(usize, Vec<Nuc>)>, result: &mut AnalysisResult| {
    if let Some((pos, ins)) = open_insertion.take() {
      result.insertions.push(NucleotideInsertion { pos, ins });
    }
  };
  let close_deletion = |open_deletion: &mut Option<(usize, usize)>, result: &mut AnalysisResult| {
    if let Some((start, length)) = open_deletion.take() {
      result.deletions.push(NucleotideDeletion { start, length });
    }
  };
  let close_missing = |open_missing: &mut Option<(usize, usize)>, result: &mut AnalysisResult| {
    if let Some((start, end)) = open_missing.take() {
      result.missing_ranges.push(Range::new(start, end));
    }
  };

  for (&r, &q) in aligned_ref.iter().zip(aligned_qry) {
    if r.is_gap() {
      close_deletion(&mut open_deletion, &mut result);
      close_missing(&mut open_missing, &mut result);
      match &mut open_insertion {
        Some((_, ins)) => ins.push(q),
        None => open_insertion = Some((ref_pos, vec![q])),
      }
    } else {
      close_insertion(&mut open_insertion, &mut result);

      if q.is_gap() {
        close_missing(&mut open_missing, &mut result);
        match &mut open_deletion {
          Some((_, length)) => *length += 1,
          None => open_deletion = Some((ref_pos, 1)),
        }
      } else {
        close_deletion(&mut open_deletion, &mut result);

        first_non_gap_qry_ref_pos.get_or_insert(ref_pos);
        last_non_gap_qry_ref_pos = Some(ref_pos + 1);

        if q.is_missing() {
          match &mut open_missing {
            Some((_, end)) => *end = ref_pos + 1,
            None => open_missing = Some((ref_pos, ref_pos + 1)),
          }
        } else {
          close_missing(&mut open_missing, &mut result);
          if q.is_canonical() && q != r {
            result.substitutions.push(NucleotideSubstitution { pos: ref_pos, reff: r, qry: q });
          }
        }
      }

      ref_pos += 1;
    }
  }

  close_insertion(&mut open_insertion, &mut result);
  close_deletion(&mut open_deletion, &mut result);
  close_missing(&mut open_missing, &mut result);

  result.alignment_start = first_non_gap_qry_ref_pos.unwrap_or(0);
  result.alignment_end = last_non_gap_qry_ref_pos.unwrap_or(result.alignment_start);

  result
}

/// Coalesces sorted substitutions into maximal contiguous-position runs (supplementing convenience view;
/// see [`NucleotideRange`]).
#[must_use]
pub fn substitution_ranges(substitutions: &[NucleotideSubstitution]) -> Vec<NucleotideRange> {
  let mut positions: Vec<usize> = substitutions.iter().map(|s| s.pos).collect();
  positions.sort_unstable();

  let mut ranges = Vec::new();
  let mut iter = positions.into_iter();
  let Some(first) = iter.next() else {
    return ranges;
  };
  let mut start = first;
  let mut prev = first;
  for pos in iter {
    if pos == prev + 1 {
      prev = pos;
    } else {
      ranges.push(NucleotideRange { range: Range::new(start, prev + 1) });
      start = pos;
      prev = pos;
    }
  }
  ranges.push(NucleotideRange { range: Range::new(start, prev + 1) });
  ranges
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::alphabet::nuc::to_nuc_seq;

  #[test]
  fn identity_has_no_mutations() {
    let r = to_nuc_seq("ACGCTCGCT");
    let q = to_nuc_seq("ACGCTCGCT");
    let result = find_mutations(&r, &q);
    assert!(result.substitutions.is_empty());
    assert!(result.deletions.is_empty());
    assert!(result.insertions.is_empty());
    assert_eq!(result.alignment_start, 0);
    assert_eq!(result.alignment_end, 9);
  }

  #[test]
  fn missing_left_sets_alignment_start() {
    let r = to_nuc_seq("ACGCTCGCT");
    let q = to_nuc_seq("---CTCGCT");
    let result = find_mutations(&r, &q);
    assert_eq!(result.alignment_start, 3);
    assert!(result.deletions.is_empty(), "leading query gaps are not deletions");
  }

  #[test]
  fn missing_right_sets_alignment_end() {
    let r = to_nuc_seq("ACGCTCGCT");
    let q = to_nuc_seq("ACGCTC---");
    let result = find_mutations(&r, &q);
    assert_eq!(result.alignment_end, 6);
  }

  #[test]
  fn detects_substitution() {
    let r = to_nuc_seq("ACGT");
    let q = to_nuc_seq("ACCT");
    let result = find_mutations(&r, &q);
    assert_eq!(result.substitutions, vec![NucleotideSubstitution { pos: 2, reff: Nuc::G, qry: Nuc::C }]);
  }

  #[test]
  fn detects_internal_deletion() {
    let r = to_nuc_seq("ACGTACGT");
    let q = to_nuc_seq("AC--ACGT");
    let result = find_mutations(&r, &q);
    assert_eq!(result.deletions, vec![NucleotideDeletion { start: 2, length: 2 }]);
  }

  #[test]
  fn detects_insertion_in_middle() {
    let r = to_nuc_seq("AC--GT");
    let q = to_nuc_seq("ACAAGT");
    let result = find_mutations(&r, &q);
    assert_eq!(result.insertions, vec![NucleotideInsertion { pos: 2, ins: to_nuc_seq("AA") }]);
  }

  #[test]
  fn trailing_insertion_reports_position_at_reference_end() {
    let r = to_nuc_seq("ACGT--");
    let q = to_nuc_seq("ACGTAA");
    let result = find_mutations(&r, &q);
    assert_eq!(result.insertions, vec![NucleotideInsertion { pos: 4, ins: to_nuc_seq("AA") }]);
  }

  #[test]
  fn n_extends_missing_range_not_substitutions() {
    let r = to_nuc_seq("ACGT");
    let q = to_nuc_seq("ANNT");
    let result = find_mutations(&r, &q);
    assert!(result.substitutions.is_empty());
    assert_eq!(result.missing_ranges, vec![Range::new(1, 3)]);
  }

  #[test]
  fn coalesces_adjacent_substitutions_into_ranges() {
    let subs = vec![
      NucleotideSubstitution { pos: 5, reff: Nuc::A, qry: Nuc::T },
      NucleotideSubstitution { pos: 6, reff: Nuc::A, qry: Nuc::T },
      NucleotideSubstitution { pos: 10, reff: Nuc::A, qry: Nuc::T },
    ];
    let ranges = substitution_ranges(&subs);
    assert_eq!(ranges, vec![
      NucleotideRange { range: Range::new(5, 7) },
      NucleotideRange { range: Range::new(10, 11) },
    ]);
  }
}
