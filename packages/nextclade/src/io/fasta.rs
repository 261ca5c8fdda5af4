use indexmap::IndexMap;
use std::io::BufRead;

/// A single parsed FASTA record: sanitized uppercase sequence and de-duplicated name, with its zero-based
/// index in the input stream.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FastaRecord {
  pub index: usize,
  pub seq_name: String,
  pub seq: String,
}

/// Capability trait for pulling [`FastaRecord`]s one at a time off a stream, with a single concrete
/// implementor.
pub trait FastaReader {
  fn next(&mut self) -> Option<FastaRecord>;
  fn is_good(&self) -> bool;
}

/// Reads FASTA records out of any [`BufRead`]:
///
/// - the header line (starting with `>`) is trimmed of surrounding whitespace; an empty name becomes
///   `"Untitled"`.
/// - sequence characters are uppercased and anything outside `[A-Z.?*]` is stripped.
/// - duplicate names are de-duplicated by appending ` (k)`, where `k` is the 1-based occurrence count of
///   that name seen so far (first occurrence keeps the bare name).
/// - input with no `>` header at all is accepted as a single record named `"Untitled"`.
pub struct FastaStream<R: BufRead> {
  reader: R,
  pending_header: Option<String>,
  next_index: usize,
  seen_names: IndexMap<String, usize>,
  exhausted: bool,
  saw_any_header: bool,
  started: bool,
}

impl<R: BufRead> FastaStream<R> {
  pub fn new(reader: R) -> Self {
    Self {
      reader,
      pending_header: None,
      next_index: 0,
      seen_names: IndexMap::new(),
      exhausted: false,
      saw_any_header: false,
      started: false,
    }
  }

  fn sanitize_sequence(raw: &str) -> String {
    raw
      .chars()
      .filter(|c| !c.is_whitespace())
      .map(|c| c.to_ascii_uppercase())
      .filter(|c| c.is_ascii_uppercase() || matches!(c, '.' | '?' | '*'))
      .collect()
  }

  fn dedupe_name(&mut self, raw_name: &str) -> String {
    let name = if raw_name.is_empty() { "Untitled".to_owned() } else { raw_name.to_owned() };
    let count = self.seen_names.entry(name.clone()).or_insert(0);
    let occurrence = *count;
    *count += 1;
    if occurrence == 0 {
      name
    } else {
      format!("{name} ({occurrence})")
    }
  }

  fn read_line(&mut self) -> Option<String> {
    let mut buf = String::new();
    match self.reader.read_line(&mut buf) {
      Ok(0) => None,
      Ok(_) => Some(buf.trim_end_matches(['\n', '\r']).to_owned()),
      Err(_) => {
        self.exhausted = true;
        None
      },
    }
  }
}

impl<R: BufRead> FastaReader for FastaStream<R> {
  fn next(&mut self) -> Option<FastaRecord> {
    if self.exhausted {
      return None;
    }

    if !self.started {
      self.started = true;
      self.pending_header = self.read_line();
    }

    let mut header = match self.pending_header.take() {
      Some(h) => h,
      None => {
        self.exhausted = true;
        return None;
      },
    };

    // No leading `>`: treat the whole stream as one unnamed, headerless record.
    if !header.starts_with('>') {
      let mut seq = Self::sanitize_sequence(&header);
      while let Some(line) = self.read_line() {
        seq.push_str(&Self::sanitize_sequence(&line));
      }
      self.exhausted = true;
      let seq_name = self.dedupe_name("");
      let record = FastaRecord { index: self.next_index, seq_name, seq };
      self.next_index += 1;
      return Some(record);
    }

    self.saw_any_header = true;
    header.remove(0);
    let raw_name = header.trim().to_owned();

    let mut seq = String::new();
    loop {
      let Some(line) = self.read_line() else {
        self.exhausted = true;
        break;
      };
      if line.starts_with('>') {
        self.pending_header = Some(line);
        break;
      }
      seq.push_str(&Self::sanitize_sequence(&line));
    }

    let seq_name = self.dedupe_name(&raw_name);
    let record = FastaRecord { index: self.next_index, seq_name, seq };
    self.next_index += 1;
    Some(record)
  }

  fn is_good(&self) -> bool {
    !self.exhausted || self.pending_header.is_some()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Cursor;

  fn read_all(content: &str) -> Vec<FastaRecord> {
    let mut stream = FastaStream::new(Cursor::new(content));
    let mut records = Vec::new();
    while let Some(r) = stream.next() {
      records.push(r);
    }
    records
  }

  #[test]
  fn parses_basic_records() {
    let records = read_all(">seq1\nACGT\n>seq2\nTTTT\nCCCC\n");
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].seq_name, "seq1");
    assert_eq!(records[0].seq, "ACGT");
    assert_eq!(records[1].seq_name, "seq2");
    assert_eq!(records[1].seq, "TTTTCCCC");
  }

  #[test]
  fn empty_name_becomes_untitled() {
    let records = read_all(">\nACGT\n");
    assert_eq!(records[0].seq_name, "Untitled");
  }

  #[test]
  fn sanitizes_sequence_case_and_characters() {
    let records = read_all(">x\nac-gt n*?\n");
    assert_eq!(records[0].seq, "ACGTN*?");
  }

  #[test]
  fn plain_text_with_no_header_is_one_untitled_record() {
    let records = read_all("acgtacgt\nacgt\n");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].seq_name, "Untitled");
    assert_eq!(records[0].seq, "ACGTACGTACGT");
  }

  #[test]
  fn duplicate_names_are_deduplicated_per_spec_scenario() {
    let records = read_all(">Hello\nAA\n>World\nCC\n>Foo\nGG\n>World\nTT\n>Hello\nAC\n");
    let names: Vec<_> = records.iter().map(|r| r.seq_name.clone()).collect();
    assert_eq!(names, vec!["Hello", "World", "Foo", "World (1)", "Hello (1)"]);
  }

  #[test]
  fn records_are_indexed_from_zero_in_input_order() {
    let records = read_all(">a\nAA\n>b\nCC\n");
    assert_eq!(records[0].index, 0);
    assert_eq!(records[1].index, 1);
  }
}
