use eyre::{eyre, Report};

/// Fallible numeric narrowing. The teacher's `zoe`-style corpus leans on `TryFrom`-based helpers rather than
/// `as`-casts for anything that crosses an external boundary (position indices coming out of user-controlled
/// FASTA/GFF input, alignment scores feeding into `i32` accumulators); this is that helper for this crate.
pub fn safe_usize_to_i32(x: usize) -> Result<i32, Report> {
  i32::try_from(x).map_err(|_| eyre!("Value {x} does not fit into i32"))
}

pub fn safe_i32_to_usize(x: i32) -> Result<usize, Report> {
  usize::try_from(x).map_err(|_| eyre!("Value {x} is negative and cannot be converted to usize"))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn round_trips_in_range() {
    assert_eq!(safe_usize_to_i32(42).unwrap(), 42);
    assert_eq!(safe_i32_to_usize(42).unwrap(), 42);
  }

  #[test]
  fn rejects_negative() {
    assert!(safe_i32_to_usize(-1).is_err());
  }
}
