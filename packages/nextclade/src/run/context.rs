use crate::align::params::AlignPairwiseParams;
use crate::align::{align_pairwise, CoordMap};
use crate::alphabet::nuc::{to_nuc_seq, Nuc};
use crate::analyze::mutations::{find_mutations, AnalysisResult as NucleotideAnalysisResult};
use crate::error::AnalysisError;
use crate::gene::GeneMap;
use crate::qc::{run_qc, QcConfig, QcResult};
use crate::translate::{translate_all, TranslationResult};
use crate::tree::{assign_clade, CladeAssignment, Tree};

/// Warning attached to a successfully-processed sequence: non-fatal, surfaced in JSON/TSV outputs, does
/// not stop processing.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Warning {
  pub text: String,
}

/// The full per-sequence output record: alignment score, all mutation lists, peptide list, QC result, and
/// clade (optional). Named `SequenceAnalysisResult` here to avoid colliding with
/// [`crate::analyze::mutations::AnalysisResult`], the narrower nucleotide-mutation-reporter output.
#[derive(Clone, Debug)]
pub struct SequenceAnalysisResult {
  pub alignment_score: i32,
  pub aligned_ref: Vec<Nuc>,
  pub aligned_qry: Vec<Nuc>,
  pub nuc: NucleotideAnalysisResult,
  pub translation: TranslationResult,
  pub qc: QcResult,
  pub clade_assignment: Option<CladeAssignment>,
  pub warnings: Vec<Warning>,
}

/// Immutable data shared (read-only) by every worker thread of the pipeline: reference sequence, gene
/// map, QC config, preprocessed tree, and alignment parameters. Built once at startup and never mutated
/// afterwards.
pub struct AnalysisContext {
  pub reference: Vec<Nuc>,
  pub gene_map: GeneMap,
  pub qc_config: QcConfig,
  pub align_params: AlignPairwiseParams,
  pub tree: Option<Tree>,
}

impl AnalysisContext {
  #[must_use]
  pub fn new(reference: Vec<Nuc>, gene_map: GeneMap, qc_config: QcConfig, align_params: AlignPairwiseParams, tree: Option<Tree>) -> Self {
    Self { reference, gene_map, qc_config, align_params, tree }
  }

  /// Runs the full per-sequence path: seed and align, analyze mutations, translate, QC, then tree
  /// assignment. A minimum-length guard runs first since an empty or near-empty query cannot produce a
  /// meaningful seed set.
  pub fn analyze(&self, raw_seq: &str) -> Result<SequenceAnalysisResult, AnalysisError> {
    let query = to_nuc_seq(raw_seq);

    const MIN_LENGTH: usize = 3;
    if query.len() < MIN_LENGTH {
      return Err(AnalysisError::SequenceTooShort { length: query.len(), min_length: MIN_LENGTH });
    }

    let mut warnings = Vec::new();

    let alignment = align_pairwise(&self.reference, &query, &self.align_params)?;

    let coord_map = CoordMap::new(&alignment.aligned_ref);
    let nuc = find_mutations(&alignment.aligned_ref, &alignment.aligned_qry);

    let translation = if self.gene_map.is_empty() {
      TranslationResult::default()
    } else {
      translate_all(&self.gene_map, &alignment.aligned_ref, &alignment.aligned_qry, &coord_map)?
    };
    for fs in translation.peptides.iter().flat_map(|p| &p.frame_shifts) {
      warnings.push(Warning {
        text: format!("gene '{}' has a frame shift at codons {}..{}", fs.gene_name, fs.codon_range.begin, fs.codon_range.end),
      });
    }

    let qc = run_qc(&nuc.missing_ranges, &alignment.aligned_qry, 0, &nuc.substitutions, &self.qc_config);

    let clade_assignment = self.tree.as_ref().map(|tree| assign_clade(tree, &nuc.substitutions, &nuc.missing_ranges));

    // Re-run the private-mutations QC rule now that the tree assignment is known, since its input (the
    // private mutation count) only becomes available after clade assignment.
    let qc = if let Some(assignment) = &clade_assignment {
      run_qc(&nuc.missing_ranges, &alignment.aligned_qry, assignment.private_mutations.len(), &nuc.substitutions, &self.qc_config)
    } else {
      qc
    };

    Ok(SequenceAnalysisResult {
      alignment_score: alignment.score,
      aligned_ref: alignment.aligned_ref,
      aligned_qry: alignment.aligned_qry,
      nuc,
      translation,
      qc,
      clade_assignment,
      warnings,
    })
  }
}
