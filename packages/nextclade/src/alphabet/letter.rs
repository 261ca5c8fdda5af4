use std::fmt::Debug;
use std::hash::Hash;

/// Common capability shared by [`crate::alphabet::nuc::Nuc`] and [`crate::alphabet::aa::Aa`]: a closed alphabet
/// whose letters can be told apart from gaps, built from and rendered back to plain ASCII characters.
pub trait Letter<L>: Copy + Clone + Debug + Eq + PartialEq + Hash + Send + Sync
where
  L: Letter<L>,
{
  const GAP: L;

  fn is_gap(&self) -> bool {
    self == &Self::GAP
  }

  fn from_char(c: char) -> L;

  fn to_char(self) -> char;
}
