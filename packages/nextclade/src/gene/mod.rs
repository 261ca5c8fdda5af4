use crate::utils::range::Range;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Coding strand. Spec.md §3 only uses this to tag a [`Gene`]; the translator does not currently implement
/// reverse-strand reverse-complementation (no annotation in the corpus's sample gene maps needs it), so this
/// is carried through faithfully but `Strand::Reverse` genes are translated on the forward strand of the
/// alignment, same as `Strand::Forward` — a limitation worth flagging rather than silently "supporting".
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum Strand {
  #[serde(rename = "+")]
  Forward,
  #[serde(rename = "-")]
  Reverse,
}

/// A single annotated gene: reference coordinates, strand, reading frame, and length.
///
/// Invariants: `end > start`, `length == end - start`. `length` divisible by 3 is the expectation for a
/// well-formed CDS, but is not enforced as a hard invariant here — translation still runs and reports
/// frame shifts for malformed genes.
#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub struct Gene {
  pub name: String,
  pub range: Range,
  pub strand: Strand,
  pub frame: u8,
}

impl Gene {
  #[must_use]
  pub fn new(name: impl Into<String>, start: usize, end: usize, strand: Strand, frame: u8) -> Self {
    debug_assert!(end > start, "gene end must be greater than start");
    debug_assert!(frame < 3, "frame must be 0, 1, or 2");
    Self {
      name: name.into(),
      range: Range::new(start, end),
      strand,
      frame,
    }
  }

  #[must_use]
  pub const fn start(&self) -> usize {
    self.range.begin
  }

  #[must_use]
  pub const fn end(&self) -> usize {
    self.range.end
  }

  #[must_use]
  pub const fn len(&self) -> usize {
    self.range.len()
  }

  #[must_use]
  pub const fn is_well_formed_cds(&self) -> bool {
    self.len() % 3 == 0
  }
}

/// An ordered `name -> Gene` map. Iteration order matches insertion order (i.e. file order for a parsed
/// GFF) — backed by `indexmap::IndexMap` rather than a `BTreeMap`, since gene-map file order is frequently
/// meaningful (it usually matches genome order) and a `BTreeMap` would instead reorder by name.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GeneMap {
  genes: IndexMap<String, Gene>,
}

impl GeneMap {
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, gene: Gene) {
    self.genes.insert(gene.name.clone(), gene);
  }

  #[must_use]
  pub fn get(&self, name: &str) -> Option<&Gene> {
    self.genes.get(name)
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.genes.is_empty()
  }

  #[must_use]
  pub fn len(&self) -> usize {
    self.genes.len()
  }

  pub fn iter(&self) -> impl Iterator<Item = &Gene> {
    self.genes.values()
  }

  #[must_use]
  pub fn retain_genes(mut self, names: &[String]) -> Self {
    self.genes.retain(|name, _| names.contains(name));
    self
  }
}

impl FromIterator<Gene> for GeneMap {
  fn from_iter<T: IntoIterator<Item = Gene>>(iter: T) -> Self {
    let mut map = Self::new();
    for gene in iter {
      map.insert(gene);
    }
    map
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn preserves_insertion_order() {
    let map: GeneMap = vec![
      Gene::new("S", 100, 3922, Strand::Forward, 0),
      Gene::new("ORF1a", 0, 100, Strand::Forward, 0),
    ]
    .into_iter()
    .collect();

    let names: Vec<_> = map.iter().map(|g| g.name.clone()).collect();
    assert_eq!(names, vec!["S", "ORF1a"]);
  }

  #[test]
  fn well_formed_cds_length_divisible_by_three() {
    assert!(Gene::new("x", 0, 9, Strand::Forward, 0).is_well_formed_cds());
    assert!(!Gene::new("y", 0, 10, Strand::Forward, 0).is_well_formed_cds());
  }
}
