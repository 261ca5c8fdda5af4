pub mod mutations;

pub use mutations::{
  find_mutations, substitution_ranges, AnalysisResult, NucleotideDeletion, NucleotideInsertion,
  NucleotideRange, NucleotideSubstitution,
};
