pub mod genetic_code;

use crate::align::coord_map::CoordMap;
use crate::alphabet::aa::Aa;
use crate::alphabet::letter::Letter;
use crate::alphabet::nuc::Nuc;
use crate::error::AnalysisError;
use crate::gene::{Gene, GeneMap};
use crate::translate::genetic_code::translate_codon;
use crate::utils::range::Range;
use serde::{Deserialize, Serialize};

#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AminoacidSubstitution {
  pub gene_name: String,
  pub codon: usize,
  pub reff: Aa,
  pub qry: Aa,
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AminoacidDeletion {
  pub gene_name: String,
  pub codon_start: usize,
  pub codon_length: usize,
}

/// An aminoacid insertion, grouped from one contiguous run of reference-gap columns in the gene-local
/// alignment. `codon` is the codon index at which the run occurred, i.e. the reference-relative codon
/// immediately following the insertion (insertions never split a reference codon, since they occur
/// entirely between reference bases).
#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AminoacidInsertion {
  pub gene_name: String,
  pub codon: usize,
  pub ins: Vec<Aa>,
}

/// A contiguous region over which the reading frame is out of sync with the reference, caused by an
/// indel (insertion or deletion) whose length is not a multiple of three. `nuc_range` and `codon_range`
/// are both gene-relative (position 0 = the gene's first nucleotide / first codon).
///
/// `codon_mask` additionally records the leading/trailing runs of query gaps immediately adjacent to the
/// shifted region: useful context when rendering a frame-shifted region (the adjacent deletion is part of
/// why the frame drifted) but additive to, not a replacement for, `nuc_range`/`codon_range`.
#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameShiftRange {
  pub gene_name: String,
  pub nuc_range: Range,
  pub codon_range: Range,
  pub codon_mask: Range,
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Peptide {
  pub gene_name: String,
  pub aa_seq: Vec<Aa>,
  pub insertions: Vec<AminoacidInsertion>,
  pub frame_shifts: Vec<FrameShiftRange>,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationResult {
  pub peptides: Vec<Peptide>,
  pub aa_substitutions: Vec<AminoacidSubstitution>,
  pub aa_deletions: Vec<AminoacidDeletion>,
}

fn nuc_range_to_codon_range(range: Range) -> Range {
  Range::new(range.begin / 3, range.end.div_ceil(3))
}

/// Rewind from `begin - 1` to find the start of the query-gap run immediately preceding a frame-shift range
/// (grounded on `frame_shifts_translate.rs`'s `find_mask_begin`).
fn find_mask_begin(stripped_qry: &[Nuc], begin: usize) -> usize {
  let mut i = begin;
  while i > 0 && stripped_qry[i - 1].is_gap() {
    i -= 1;
  }
  i
}

/// Advance from `end` to find the end of the query-gap run immediately following a frame-shift range
/// (grounded on `frame_shifts_translate.rs`'s `find_mask_end`).
fn find_mask_end(stripped_qry: &[Nuc], end: usize) -> usize {
  let mut i = end;
  while i < stripped_qry.len() && stripped_qry[i].is_gap() {
    i += 1;
  }
  i
}

/// One contiguous indel run encountered while stripping insertions out of a gene-local alignment: either a
/// reference-gap run (insertion) or a query-gap run (deletion), tagged with where it falls in the
/// gene-relative, insertion-stripped coordinate system used for codon numbering.
struct IndelRun {
  /// stripped-coordinate position of the run: for an insertion, the position it is inserted before; for a
  /// deletion, the position the deleted bases occupy.
  stripped_pos: usize,
  length: usize,
  kind: IndelKind,
}

enum IndelKind {
  Insertion(Vec<Nuc>),
  Deletion,
}

/// Strips insertions out of a gene-local `(ref, qry)` alignment slice: returns the insertion-stripped
/// reference (always gap-free, length == `gene.len()`) and query (may contain internal gaps for
/// deletions, same length), plus the list of indel runs encountered, in order.
fn strip_gene_insertions(ref_gene_aln: &[Nuc], qry_gene_aln: &[Nuc]) -> (Vec<Nuc>, Vec<Nuc>, Vec<IndelRun>) {
  let mut stripped_ref = Vec::with_capacity(ref_gene_aln.len());
  let mut stripped_qry = Vec::with_capacity(ref_gene_aln.len());
  let mut runs: Vec<IndelRun> = Vec::new();

  let mut open_ins: Option<Vec<Nuc>> = None;
  let mut open_del: Option<(usize, usize)> = None;

  for (&r, &q) in ref_gene_aln.iter().zip(qry_gene_aln) {
    if r.is_gap() {
      if let Some((stripped_pos, length)) = open_del.take() {
        runs.push(IndelRun { stripped_pos, length, kind: IndelKind::Deletion });
      }
      open_ins.get_or_insert_with(Vec::new).push(q);
    } else {
      if let Some(ins) = open_ins.take() {
        if !ins.is_empty() {
          runs.push(IndelRun { stripped_pos: stripped_qry.len(), length: ins.len(), kind: IndelKind::Insertion(ins) });
        }
      }
      stripped_ref.push(r);
      stripped_qry.push(q);
      if q.is_gap() {
        match &mut open_del {
          Some((_, length)) => *length += 1,
          None => open_del = Some((stripped_qry.len() - 1, 1)),
        }
      } else if let Some((stripped_pos, length)) = open_del.take() {
        runs.push(IndelRun { stripped_pos, length, kind: IndelKind::Deletion });
      }
    }
  }
  if let Some(ins) = open_ins.take() {
    if !ins.is_empty() {
      runs.push(IndelRun { stripped_pos: stripped_qry.len(), length: ins.len(), kind: IndelKind::Insertion(ins) });
    }
  }
  if let Some((stripped_pos, length)) = open_del.take() {
    runs.push(IndelRun { stripped_pos, length, kind: IndelKind::Deletion });
  }

  (stripped_ref, stripped_qry, runs)
}

/// Translates one gene's insertion-stripped, codon-chunked nucleotide sequence into aminoacids, applying
/// gap-aware codon rules.
fn translate_stripped(stripped: &[Nuc]) -> Vec<Aa> {
  stripped
    .chunks(3)
    .map(|codon| {
      let gaps = codon.iter().filter(|n| n.is_gap()).count();
      if gaps == codon.len() {
        Aa::Gap
      } else if gaps > 0 {
        Aa::X
      } else {
        let a = codon[0];
        let b = *codon.get(1).unwrap_or(&Nuc::N);
        let c = *codon.get(2).unwrap_or(&Nuc::N);
        translate_codon(a, b, c)
      }
    })
    .collect()
}

/// Computes frame-shift ranges from the indel runs collected while stripping insertions: a running offset
/// accumulates `length mod 3` for every non-3-multiple run; a range opens when the offset leaves zero and
/// closes when it returns to zero (or the gene ends).
fn compute_frame_shifts(gene_name: &str, stripped_qry: &[Nuc], runs: &[IndelRun]) -> Vec<FrameShiftRange> {
  let mut ranges = Vec::new();
  let mut offset: i64 = 0;
  let mut open_start: Option<usize> = None;

  for run in runs {
    let delta = (run.length % 3) as i64;
    if delta == 0 {
      continue;
    }
    let was_zero = offset == 0;
    offset = (offset + delta).rem_euclid(3);
    if was_zero && offset != 0 {
      open_start = Some(run.stripped_pos);
    } else if !was_zero && offset == 0 {
      if let Some(start) = open_start.take() {
        push_frame_shift_range(gene_name, stripped_qry, start, run.stripped_pos, &mut ranges);
      }
    }
  }

  if let Some(start) = open_start {
    push_frame_shift_range(gene_name, stripped_qry, start, stripped_qry.len(), &mut ranges);
  }

  ranges
}

fn push_frame_shift_range(gene_name: &str, stripped_qry: &[Nuc], start: usize, end: usize, out: &mut Vec<FrameShiftRange>) {
  let nuc_range = Range::new(start, end);
  let codon_range = nuc_range_to_codon_range(nuc_range);
  let mask_begin = find_mask_begin(stripped_qry, start);
  let mask_end = find_mask_end(stripped_qry, end);
  let codon_mask = nuc_range_to_codon_range(Range::new(mask_begin, mask_end));
  out.push(FrameShiftRange {
    gene_name: gene_name.to_owned(),
    nuc_range,
    codon_range,
    codon_mask,
  });
}

/// Extracts, strips, and translates one gene from a completed nucleotide alignment.
fn translate_gene(
  gene: &Gene,
  aligned_ref: &[Nuc],
  aligned_qry: &[Nuc],
  coord_map: &CoordMap,
) -> Result<(Peptide, Vec<AminoacidSubstitution>, Vec<AminoacidDeletion>), AnalysisError> {
  if gene.start() > coord_map.ref_len() || gene.end() > coord_map.ref_len() {
    return Err(AnalysisError::GeneExtractionFailed {
      gene_name: gene.name.clone(),
      reason: "gene's reference range exceeds the length of the reference sequence".to_owned(),
    });
  }

  let aln_start = coord_map.ref_to_aln(gene.start());
  let aln_end = coord_map.ref_to_aln(gene.end());
  if aln_end <= aln_start {
    return Err(AnalysisError::GeneExtractionFailed {
      gene_name: gene.name.clone(),
      reason: "gene's reference range maps to an empty alignment span".to_owned(),
    });
  }

  let ref_gene_aln = &aligned_ref[aln_start..aln_end];
  let qry_gene_aln = &aligned_qry[aln_start..aln_end];

  let (stripped_ref, stripped_qry, runs) = strip_gene_insertions(ref_gene_aln, qry_gene_aln);

  let ref_aa = translate_stripped(&stripped_ref);
  let qry_aa = translate_stripped(&stripped_qry);

  let mut substitutions = Vec::new();
  let mut deletions = Vec::new();
  let mut open_del: Option<(usize, usize)> = None;
  for (codon, (&r, &q)) in ref_aa.iter().zip(&qry_aa).enumerate() {
    if q == Aa::Gap {
      match &mut open_del {
        Some((_, len)) => *len += 1,
        None => open_del = Some((codon, 1)),
      }
      continue;
    }
    if let Some((start, len)) = open_del.take() {
      deletions.push(AminoacidDeletion { gene_name: gene.name.clone(), codon_start: start, codon_length: len });
    }
    if q != r && q != Aa::X {
      substitutions.push(AminoacidSubstitution { gene_name: gene.name.clone(), codon, reff: r, qry: q });
    }
  }
  if let Some((start, len)) = open_del {
    deletions.push(AminoacidDeletion { gene_name: gene.name.clone(), codon_start: start, codon_length: len });
  }

  let mut insertions = Vec::new();
  for run in &runs {
    if let IndelKind::Insertion(letters) = &run.kind {
      let aa_ins: Vec<Aa> = letters
        .chunks(3)
        .map(|c| {
          let a = c[0];
          let b = *c.get(1).unwrap_or(&Nuc::N);
          let d = *c.get(2).unwrap_or(&Nuc::N);
          translate_codon(a, b, d)
        })
        .collect();
      insertions.push(AminoacidInsertion {
        gene_name: gene.name.clone(),
        codon: run.stripped_pos / 3,
        ins: aa_ins,
      });
    }
  }

  let frame_shifts = compute_frame_shifts(&gene.name, &stripped_qry, &runs);

  let peptide = Peptide {
    gene_name: gene.name.clone(),
    aa_seq: qry_aa,
    insertions,
    frame_shifts,
  };

  Ok((peptide, substitutions, deletions))
}

/// Translates every gene in `gene_map` against a completed alignment. A gene that fails to extract is
/// reported via its `Result::Err` rather than aborting the whole translation — the caller decides whether
/// a single failed gene is fatal for the sequence.
pub fn translate_all(
  gene_map: &GeneMap,
  aligned_ref: &[Nuc],
  aligned_qry: &[Nuc],
  coord_map: &CoordMap,
) -> Result<TranslationResult, AnalysisError> {
  let mut result = TranslationResult::default();
  for gene in gene_map.iter() {
    let (peptide, subs, dels) = translate_gene(gene, aligned_ref, aligned_qry, coord_map)?;
    result.peptides.push(peptide);
    result.aa_substitutions.extend(subs);
    result.aa_deletions.extend(dels);
  }
  if !gene_map.is_empty() && result.peptides.is_empty() {
    return Err(AnalysisError::NoPeptidesProduced);
  }
  Ok(result)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::alphabet::nuc::to_nuc_seq;
  use crate::gene::Strand;

  fn aa_seq_to_string(seq: &[Aa]) -> String {
    seq.iter().map(|&a| a.to_char()).collect()
  }

  fn translate(ref_str: &str, qry_str: &str) -> String {
    let aligned_ref = to_nuc_seq(ref_str);
    let aligned_qry = to_nuc_seq(qry_str);
    let coord_map = CoordMap::new(&aligned_ref);
    let gene = Gene::new("g", 0, ref_str.len(), Strand::Forward, 0);
    let (peptide, _, _) = translate_gene(&gene, &aligned_ref, &aligned_qry, &coord_map).unwrap();
    aa_seq_to_string(&peptide.aa_seq)
  }

  #[test]
  fn translates_simple_gene_scenario() {
    // ACG AGG GCG AAT TCG CTC GCT ACA GAA -> TRANSLATE
    let seq = "ACGAGGGCGAATTCGCTCGCTACAGAA";
    assert_eq!(translate(seq, seq), "TRANSLATE");
  }

  #[test]
  fn codon_boundary_gap_translates_to_gap_residue() {
    let reference = "ACGAGGGCGAATTCGCTCGCTACAGAA";
    let query = "ACGAGG---AATTCGCTCGCTACAGAA";
    assert_eq!(translate(reference, query), "TR-NSLATE");
  }

  #[test]
  fn gene_range_past_reference_end_is_reported_not_panicked() {
    let aligned_ref = to_nuc_seq("ACGAGGGCG");
    let aligned_qry = to_nuc_seq("ACGAGGGCG");
    let coord_map = CoordMap::new(&aligned_ref);
    // A gene map built against a longer reference than the one actually supplied.
    let gene = Gene::new("g", 0, 27, Strand::Forward, 0);
    let result = translate_gene(&gene, &aligned_ref, &aligned_qry, &coord_map);
    assert!(matches!(result, Err(AnalysisError::GeneExtractionFailed { .. })));
  }

  #[test]
  fn off_boundary_gap_translates_to_x() {
    let reference = "ACGAGGGCGAATTCGCTCGCTACAGAA";
    // Replace "GC-" + "--T" across the codon 3/4 boundary (off-boundary gaps, scenario 6).
    let query = "ACGAGGGC---TTCGCTCGCTACAGAA";
    assert_eq!(translate(reference, query), "TRXXSLATE");
  }
}
