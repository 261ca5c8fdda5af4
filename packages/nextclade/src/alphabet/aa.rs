use crate::alphabet::letter::Letter;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The 20 canonical amino acid residues, plus `Stop`, `Gap`, and `X` (unknown).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum Aa {
  A,
  R,
  N,
  D,
  C,
  Q,
  E,
  G,
  H,
  I,
  L,
  K,
  M,
  F,
  P,
  S,
  T,
  W,
  Y,
  V,
  Stop,
  X,
  Gap,
}

impl Letter<Aa> for Aa {
  const GAP: Aa = Aa::Gap;

  fn from_char(c: char) -> Aa {
    match c.to_ascii_uppercase() {
      'A' => Aa::A,
      'R' => Aa::R,
      'N' => Aa::N,
      'D' => Aa::D,
      'C' => Aa::C,
      'Q' => Aa::Q,
      'E' => Aa::E,
      'G' => Aa::G,
      'H' => Aa::H,
      'I' => Aa::I,
      'L' => Aa::L,
      'K' => Aa::K,
      'M' => Aa::M,
      'F' => Aa::F,
      'P' => Aa::P,
      'S' => Aa::S,
      'T' => Aa::T,
      'W' => Aa::W,
      'Y' => Aa::Y,
      'V' => Aa::V,
      '*' => Aa::Stop,
      '-' => Aa::Gap,
      _ => Aa::X,
    }
  }

  fn to_char(self) -> char {
    match self {
      Aa::A => 'A',
      Aa::R => 'R',
      Aa::N => 'N',
      Aa::D => 'D',
      Aa::C => 'C',
      Aa::Q => 'Q',
      Aa::E => 'E',
      Aa::G => 'G',
      Aa::H => 'H',
      Aa::I => 'I',
      Aa::L => 'L',
      Aa::K => 'K',
      Aa::M => 'M',
      Aa::F => 'F',
      Aa::P => 'P',
      Aa::S => 'S',
      Aa::T => 'T',
      Aa::W => 'W',
      Aa::Y => 'Y',
      Aa::V => 'V',
      Aa::Stop => '*',
      Aa::X => 'X',
      Aa::Gap => '-',
    }
  }
}

impl fmt::Display for Aa {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.to_char())
  }
}

pub fn from_aa_seq(seq: &[Aa]) -> String {
  seq.iter().map(|&aa| aa.to_char()).collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn round_trip_char() {
    for c in "ARNDCQEGHILKMFPSTWYV*X-".chars() {
      assert_eq!(Aa::from_char(c).to_char(), c);
    }
  }
}
