use crate::gene::{Gene, GeneMap, Strand};
use crate::make_error;
use eyre::{Report, WrapErr};
use once_cell::sync::Lazy;
use regex::Regex;

static GENE_NAME_RE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r#"gene_name\s+"([^"]+)""#).expect("gene_name regex is a valid, hardcoded pattern"));

/// Parses a GFF3-subset gene map:
///
/// tab-separated `seqid, source, feature, start, end, score, strand, frame, attributes`, 1-based inclusive
/// `start`/`end` converted to 0-based half-open, 1-based `frame` converted to 0-based, gene name extracted from
/// the `gene_name "…"` attribute. Lines whose first non-whitespace character is `#` are comments and are
/// skipped, as are blank lines.
pub fn parse_gene_map_gff(content: &str) -> Result<GeneMap, Report> {
  let mut gene_map = GeneMap::new();

  for (line_no, line) in content.lines().enumerate() {
    let trimmed = line.trim_start();
    if trimmed.is_empty() || trimmed.starts_with('#') {
      continue;
    }

    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 9 {
      return make_error!("Gene map line {}: expected 9 tab-separated columns, found {}", line_no + 1, fields.len());
    }

    let [_seqid, _source, feature, start, end, _score, strand, frame, attributes] = fields[..9] else {
      unreachable!("length checked above");
    };

    if feature.eq_ignore_ascii_case("source") || feature.eq_ignore_ascii_case("region") {
      continue;
    }

    let start: usize = start
      .trim()
      .parse()
      .wrap_err_with(|| format!("Gene map line {}: invalid start coordinate '{start}'", line_no + 1))?;
    let end: usize = end
      .trim()
      .parse()
      .wrap_err_with(|| format!("Gene map line {}: invalid end coordinate '{end}'", line_no + 1))?;

    if start == 0 {
      return make_error!("Gene map line {}: 1-based start coordinate must be >= 1", line_no + 1);
    }
    let start_0based = start - 1;

    if end <= start_0based {
      return make_error!(
        "Gene map line {}: end ({end}) must be greater than 0-based start ({start_0based})",
        line_no + 1
      );
    }

    let strand = match strand.trim() {
      "+" => Strand::Forward,
      "-" => Strand::Reverse,
      other => return make_error!("Gene map line {}: unrecognized strand '{other}'", line_no + 1),
    };

    let frame_1based: u8 = match frame.trim() {
      "." | "" => 1,
      other => other
        .parse()
        .wrap_err_with(|| format!("Gene map line {}: invalid frame '{other}'", line_no + 1))?,
    };
    if !(1..=3).contains(&frame_1based) {
      return make_error!("Gene map line {}: frame must be 1, 2, or 3, found {frame_1based}", line_no + 1);
    }
    let frame_0based = frame_1based - 1;

    let Some(captures) = GENE_NAME_RE.captures(attributes) else {
      continue; // not every GFF feature is a gene (e.g. "region"); skip silently
    };
    let gene_name = captures[1].to_owned();

    gene_map.insert(Gene::new(gene_name, start_0based, end, strand, frame_0based));
  }

  Ok(gene_map)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_minimal_gff() {
    let gff = "\
##gff-version 3
# a comment
NC_045512.2\tfeature\tgene\t266\t13468\t.\t+\t1\tgene_name \"ORF1a\"
NC_045512.2\tfeature\tgene\t21563\t25384\t.\t+\t1\tgene_name \"S\"
";
    let map = parse_gene_map_gff(gff).unwrap();
    assert_eq!(map.len(), 2);
    let orf1a = map.get("ORF1a").unwrap();
    assert_eq!(orf1a.start(), 265);
    assert_eq!(orf1a.end(), 13468);
    assert_eq!(orf1a.frame, 0);
    let names: Vec<_> = map.iter().map(|g| g.name.clone()).collect();
    assert_eq!(names, vec!["ORF1a", "S"]);
  }

  #[test]
  fn rejects_missing_columns() {
    assert!(parse_gene_map_gff("a\tb\tc\n").is_err());
  }

  #[test]
  fn skips_non_gene_features_without_a_name() {
    let gff = "seq\tsrc\tregion\t1\t100\t.\t+\t.\tID=region1\n";
    let map = parse_gene_map_gff(gff).unwrap();
    assert!(map.is_empty());
  }
}
