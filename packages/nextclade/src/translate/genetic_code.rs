use crate::alphabet::aa::Aa;
use crate::alphabet::nuc::Nuc;

/// The standard genetic code (NCBI translation table 1), as a total function from canonical codons to
/// residues. Ambiguous-base resolution is layered on top
/// in [`translate_codon`] rather than baked into this table, so the table itself only ever sees
/// `{A, C, G, T}` inputs.
const fn translate_canonical_codon(a: Nuc, b: Nuc, c: Nuc) -> Aa {
  use Nuc::{A, C, G, T};
  match (a, b, c) {
    (T, T, T) | (T, T, C) => Aa::F,
    (T, T, A) | (T, T, G) => Aa::L,
    (C, T, _) => Aa::L,
    (A, T, T) | (A, T, C) | (A, T, A) => Aa::I,
    (A, T, G) => Aa::M,
    (G, T, _) => Aa::V,
    (T, C, _) => Aa::S,
    (C, C, _) => Aa::P,
    (A, C, _) => Aa::T,
    (G, C, _) => Aa::A,
    (T, A, T) | (T, A, C) => Aa::Y,
    (T, A, A) | (T, A, G) => Aa::Stop,
    (C, A, T) | (C, A, C) => Aa::H,
    (C, A, A) | (C, A, G) => Aa::Q,
    (A, A, T) | (A, A, C) => Aa::N,
    (A, A, A) | (A, A, G) => Aa::K,
    (G, A, T) | (G, A, C) => Aa::D,
    (G, A, A) | (G, A, G) => Aa::E,
    (T, G, T) | (T, G, C) => Aa::C,
    (T, G, A) => Aa::Stop,
    (T, G, G) => Aa::W,
    (C, G, _) => Aa::R,
    (A, G, T) | (A, G, C) => Aa::S,
    (A, G, A) | (A, G, G) => Aa::R,
    (G, G, _) => Aa::G,
    // Unreachable for the four canonical bases; kept total rather than partial so callers never need to
    // handle a translation failure for a canonical codon.
    _ => Aa::X,
  }
}

/// The four canonical bases a possibly-ambiguous [`Nuc`] could resolve to.
fn resolutions(n: Nuc) -> [Nuc; 4] {
  // Always length 4 so callers can `.into_iter().filter(...)` without an intermediate Vec; non-candidates
  // are deduplicated away by virtue of `Nuc::matches` being false for them, but we still enumerate by
  // possibility bits directly to avoid quadratic `matches` calls per codon.
  let bases = [Nuc::A, Nuc::C, Nuc::G, Nuc::T];
  let mut out = [Nuc::A; 4];
  let mut i = 0;
  for b in bases {
    if n.possibilities() & b.possibilities() != 0 {
      out[i] = b;
      i += 1;
    }
  }
  // pad remaining slots with the first resolution (harmless duplicate, never read past `i` by callers
  // that track their own count) — simplest way to keep this a fixed-size array.
  while i < 4 {
    out[i] = out[0];
    i += 1;
  }
  out
}

fn resolution_count(n: Nuc) -> usize {
  n.possibilities().count_ones() as usize
}

/// Translates one non-gap codon of (possibly ambiguous) nucleotides to a single residue.
///
/// If all three positions are canonical or ambiguous IUPAC codes, enumerate every
/// resolution of every ambiguous position; if they all translate to the same residue, return it, otherwise
/// return `X`. Gap handling is the caller's responsibility (this function assumes no gaps).
#[must_use]
pub fn translate_codon(a: Nuc, b: Nuc, c: Nuc) -> Aa {
  if a.is_canonical() && b.is_canonical() && c.is_canonical() {
    return translate_canonical_codon(a, b, c);
  }

  let count_a = resolution_count(a);
  let count_b = resolution_count(b);
  let count_c = resolution_count(c);
  if count_a == 0 || count_b == 0 || count_c == 0 {
    // A gap slipped in as a "letter" (shouldn't happen for canonical Nuc::Gap, which callers filter out
    // before calling this), or a degenerate code with no possibilities at all.
    return Aa::X;
  }

  let ra = resolutions(a);
  let rb = resolutions(b);
  let rc = resolutions(c);

  let mut unique: Option<Aa> = None;
  for &x in &ra[..count_a] {
    for &y in &rb[..count_b] {
      for &z in &rc[..count_c] {
        let aa = translate_canonical_codon(x, y, z);
        match unique {
          None => unique = Some(aa),
          Some(prev) if prev == aa => {},
          Some(_) => return Aa::X,
        }
      }
    }
  }
  unique.unwrap_or(Aa::X)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn translates_canonical_codons() {
    assert_eq!(translate_codon(Nuc::A, Nuc::T, Nuc::G), Aa::M);
    assert_eq!(translate_codon(Nuc::T, Nuc::A, Nuc::A), Aa::Stop);
    assert_eq!(translate_codon(Nuc::G, Nuc::G, Nuc::G), Aa::G);
  }

  #[test]
  fn four_fold_degenerate_third_position_ambiguity_resolves_uniquely() {
    // GGN (Gly) is four-fold degenerate at the third position: any base works.
    assert_eq!(translate_codon(Nuc::G, Nuc::G, Nuc::N), Aa::G);
  }

  #[test]
  fn ambiguity_with_multiple_residues_resolves_to_x() {
    // NNN could be almost anything.
    assert_eq!(translate_codon(Nuc::N, Nuc::N, Nuc::N), Aa::X);
    // TTY is Phe (TTT/TTC), TTR is Leu (TTA/TTG) -- but mixing the two here: TTN covers both Phe and Leu.
    assert_eq!(translate_codon(Nuc::T, Nuc::T, Nuc::N), Aa::X);
  }
}
