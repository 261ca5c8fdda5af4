use crate::io::fs::ensure_dir;
use eyre::{Report, WrapErr};
use serde::{Deserialize, Serialize};
use serde_json::Deserializer;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Mitigates recursion-limit errors when parsing deeply nested JSON (Auspice trees can nest a node per
/// clade, hundreds deep). See <https://github.com/serde-rs/json/issues/334>.
fn deserialize_without_recursion_limit<'de, R: serde_json::de::Read<'de>, T: Deserialize<'de>>(
  de: &mut Deserializer<R>,
) -> Result<T, Report> {
  de.disable_recursion_limit();
  let de = serde_stacker::Deserializer::new(de);
  T::deserialize(de).wrap_err("When parsing JSON")
}

pub fn json_parse<T: for<'de> Deserialize<'de>>(s: &str) -> Result<T, Report> {
  let mut de = Deserializer::from_str(s);
  deserialize_without_recursion_limit(&mut de)
}

pub fn json_stringify<T: Serialize>(obj: &T) -> Result<String, Report> {
  serde_json::to_string_pretty(obj).wrap_err("When converting an entry to JSON string")
}

pub fn json_write<T: Serialize>(filepath: impl AsRef<Path>, obj: &T) -> Result<(), Report> {
  let filepath = filepath.as_ref();
  ensure_dir(filepath)?;
  let file = File::create(filepath).wrap_err_with(|| format!("When creating file: {filepath:#?}"))?;
  let mut writer = BufWriter::new(file);
  serde_json::to_writer_pretty(&mut writer, &obj).wrap_err_with(|| format!("When writing JSON to file: {filepath:#?}"))?;
  writer.flush().wrap_err_with(|| format!("When flushing file: {filepath:#?}"))
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn round_trips_through_string() {
    let value = json!({ "a": 1, "b": [1, 2, 3] });
    let s = json_stringify(&value).unwrap();
    let parsed: serde_json::Value = json_parse(&s).unwrap();
    assert_eq!(parsed, value);
  }
}
