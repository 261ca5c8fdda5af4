use clap::Parser;
use eyre::{Report, WrapErr};
use nextclade::align::AlignPairwiseParams;
use nextclade::alphabet::letter::Letter;
use nextclade::alphabet::nuc::{from_nuc_seq, Nuc};
use nextclade::analyze::mutations::NucleotideSubstitution;
use nextclade::gene::GeneMap;
use nextclade::io::fasta::FastaStream;
use nextclade::io::fs::{ensure_dir, read_file_to_string};
use nextclade::io::gff::parse_gene_map_gff;
use nextclade::io::json::{json_parse, json_write};
use nextclade::qc::QcConfig;
use nextclade::run::{run_pipeline, AnalysisContext, PipelineRecord, SequenceAnalysisResult};
use nextclade::tree::Tree;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
pub struct RunArgs {
  /// Path to a FASTA file with input sequences.
  #[clap(long, short = 'i')]
  pub input_fasta: PathBuf,

  /// Path to a FASTA file containing the reference ("root") sequence. Expected to contain exactly 1 record.
  #[clap(long, short = 'r')]
  pub input_root_seq: PathBuf,

  /// Path to a GFF3 file containing the gene map. If omitted, sequences are not translated.
  #[clap(long, short = 'm')]
  pub input_gene_map: Option<PathBuf>,

  /// Path to an Auspice-format reference tree JSON. If omitted, clades are not assigned.
  #[clap(long, short = 't')]
  pub input_tree: Option<PathBuf>,

  /// Path to a QC rule configuration JSON. If omitted, the default thresholds are used.
  #[clap(long)]
  pub input_qc_config: Option<PathBuf>,

  /// Path to a PCR primers CSV, passed through the dataset bundle but not consulted by analysis.
  #[clap(long)]
  pub input_pcr_primers: Option<PathBuf>,

  /// Comma-separated list of gene names to translate. If omitted, every gene in the gene map is translated.
  #[clap(long, short = 'g', value_delimiter = ',')]
  pub genes: Option<Vec<String>>,

  /// Write output files to this directory, using `--output-basename` for their stem.
  #[clap(long, short = 'd')]
  pub output_dir: Option<PathBuf>,

  /// Base filename for output files written under `--output-dir`.
  #[clap(long, short = 'n')]
  pub output_basename: Option<String>,

  /// Path to the output aligned-sequences FASTA. Overrides `--output-dir`/`--output-basename`.
  #[clap(long, short = 'o')]
  pub output_fasta: Option<PathBuf>,

  /// Path to the output stripped-insertions CSV. Overrides `--output-dir`/`--output-basename`.
  #[clap(long, short = 'I')]
  pub output_insertions: Option<PathBuf>,

  /// Path to the output per-sequence errors CSV. Overrides `--output-dir`/`--output-basename`.
  #[clap(long, short = 'e')]
  pub output_errors: Option<PathBuf>,

  /// Path to the optional results TSV.
  #[clap(long)]
  pub output_tsv: Option<PathBuf>,

  /// Path to the optional results JSON.
  #[clap(long)]
  pub output_json: Option<PathBuf>,

  /// Path to the optional Auspice tree JSON, re-serialized with per-node clade/mutation attributes appended.
  #[clap(long)]
  pub output_tree: Option<PathBuf>,

  /// Number of worker threads. Defaults to the number of available CPUs.
  #[clap(long, short, default_value_t = num_cpus::get())]
  pub jobs: usize,

  #[clap(flatten)]
  pub align_params: AlignPairwiseParamsArgs,
}

/// Flattened, clap-derived mirror of [`AlignPairwiseParams`], so every alignment/seeding constant can be
/// overridden from the command line as well as loaded from JSON.
#[derive(Parser, Debug)]
pub struct AlignPairwiseParamsArgs {
  #[clap(long, default_value_t = AlignPairwiseParams::default().seed_length)]
  pub seed_length: usize,

  #[clap(long, default_value_t = AlignPairwiseParams::default().min_seeds)]
  pub min_seeds: usize,

  #[clap(long, default_value_t = AlignPairwiseParams::default().seed_spacing)]
  pub seed_spacing: usize,

  #[clap(long, default_value_t = AlignPairwiseParams::default().mismatches_allowed)]
  pub mismatches_allowed: usize,

  #[clap(long, default_value_t = AlignPairwiseParams::default().score_match)]
  pub score_match: i32,

  #[clap(long, default_value_t = AlignPairwiseParams::default().score_mismatch)]
  pub score_mismatch: i32,

  #[clap(long, default_value_t = AlignPairwiseParams::default().gap_open)]
  pub gap_open: i32,

  #[clap(long, default_value_t = AlignPairwiseParams::default().gap_extend)]
  pub gap_extend: i32,

  #[clap(long, default_value_t = AlignPairwiseParams::default().gap_open_in_frame)]
  pub gap_open_in_frame: i32,

  #[clap(long, default_value_t = AlignPairwiseParams::default().max_indel)]
  pub max_indel: usize,
}

impl From<&AlignPairwiseParamsArgs> for AlignPairwiseParams {
  fn from(args: &AlignPairwiseParamsArgs) -> Self {
    Self {
      seed_length: args.seed_length,
      min_seeds: args.min_seeds,
      seed_spacing: args.seed_spacing,
      mismatches_allowed: args.mismatches_allowed,
      score_match: args.score_match,
      score_mismatch: args.score_mismatch,
      gap_open: args.gap_open,
      gap_extend: args.gap_extend,
      gap_open_in_frame: args.gap_open_in_frame,
      max_indel: args.max_indel,
    }
  }
}

/// Fills in unset `--output-*` paths from `--output-dir`/`--output-basename`.
fn resolve_output_paths(args: &mut RunArgs) -> Result<(), Report> {
  if args.output_dir.is_none() && args.output_basename.is_none() {
    return Ok(());
  }
  let output_dir = args.output_dir.clone().unwrap_or(std::env::current_dir()?);
  let basename = args.output_basename.clone().unwrap_or_else(|| "nextclade".to_owned());

  args.output_fasta.get_or_insert_with(|| output_dir.join(format!("{basename}.aligned.fasta")));
  args.output_insertions.get_or_insert_with(|| output_dir.join(format!("{basename}.insertions.csv")));
  args.output_errors.get_or_insert_with(|| output_dir.join(format!("{basename}.errors.csv")));
  Ok(())
}

fn read_reference(path: &PathBuf) -> Result<Vec<Nuc>, Report> {
  let content = read_file_to_string(path).wrap_err("When reading the root sequence FASTA")?;
  let mut stream = FastaStream::new(BufReader::new(content.as_bytes()));
  let record = nextclade::io::fasta::FastaReader::next(&mut stream)
    .ok_or_else(|| eyre::eyre!("Root sequence file '{path:#?}' contains no records"))?;
  Ok(nextclade::alphabet::nuc::to_nuc_seq(&record.seq))
}

fn read_gene_map(args: &RunArgs) -> Result<GeneMap, Report> {
  let Some(path) = &args.input_gene_map else {
    return Ok(GeneMap::new());
  };
  let content = read_file_to_string(path).wrap_err("When reading the gene map")?;
  let gene_map = parse_gene_map_gff(&content).wrap_err("When parsing the gene map")?;
  Ok(match &args.genes {
    Some(names) => gene_map.retain_genes(names),
    None => gene_map,
  })
}

fn read_tree(path: &Option<PathBuf>) -> Result<Option<Tree>, Report> {
  let Some(path) = path else {
    return Ok(None);
  };
  let content = read_file_to_string(path).wrap_err("When reading the reference tree")?;
  let value: serde_json::Value = json_parse(&content)?;
  Ok(Some(Tree::from_auspice_json(&value).wrap_err("When parsing the reference tree")?))
}

fn read_qc_config(path: &Option<PathBuf>) -> Result<QcConfig, Report> {
  let Some(path) = path else {
    return Ok(QcConfig::default());
  };
  let content = read_file_to_string(path).wrap_err("When reading the QC config")?;
  json_parse(&content).wrap_err("When parsing the QC config")
}

/// Translates the unaligned reference against itself, to print the `Reference` peptide row once per gene
/// ahead of the per-query rows.
fn reference_peptides(reference: &[Nuc], gene_map: &GeneMap) -> Result<Vec<(String, Vec<nextclade::alphabet::aa::Aa>)>, Report> {
  if gene_map.is_empty() {
    return Ok(Vec::new());
  }
  let coord_map = nextclade::align::CoordMap::new(reference);
  let translation =
    nextclade::translate::translate_all(gene_map, reference, reference, &coord_map).wrap_err("When translating the reference")?;
  Ok(translation.peptides.into_iter().map(|p| (p.gene_name, p.aa_seq)).collect())
}

/// Mirrors one query's [`SequenceAnalysisResult`] for the optional results JSON/TSV outputs, plus the
/// `seqName`/`error` fields every record carries regardless of whether analysis succeeded.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonRecord {
  index: usize,
  seq_name: String,
  error: Option<String>,
  alignment_score: Option<i32>,
  substitutions: Vec<String>,
  deletions: Vec<String>,
  insertions: Vec<String>,
  missing: Vec<String>,
  clade: Option<String>,
  private_mutations: Vec<String>,
  qc_overall_score: Option<f64>,
  qc_overall_status: Option<String>,
  warnings: Vec<String>,
}

/// Renders one substitution as `<ref><1-based pos><qry>`, e.g. `A23403G` — the same convention the
/// reference tree's own branch mutation labels use (see [`nextclade::tree`]'s `parse_nuc_mutation`).
fn format_substitution(sub: &NucleotideSubstitution) -> String {
  format!("{}{}{}", sub.reff.to_char(), sub.pos + 1, sub.qry.to_char())
}

impl JsonRecord {
  fn from_outcome(index: usize, seq_name: String, outcome: &Result<SequenceAnalysisResult, nextclade::AnalysisError>) -> Self {
    match outcome {
      Ok(result) => Self {
        index,
        seq_name,
        error: None,
        alignment_score: Some(result.alignment_score),
        substitutions: result.nuc.substitutions.iter().map(format_substitution).collect(),
        deletions: result
          .nuc
          .deletions
          .iter()
          .map(|d| format!("{}-{}", d.start + 1, d.start + d.length))
          .collect(),
        insertions: result
          .nuc
          .insertions
          .iter()
          .map(|i| format!("{}:{}", i.pos, from_nuc_seq(&i.ins)))
          .collect(),
        missing: result.nuc.missing_ranges.iter().map(|r| format!("{}-{}", r.begin + 1, r.end)).collect(),
        clade: result.clade_assignment.as_ref().and_then(|c| c.clade.clone()),
        private_mutations: result
          .clade_assignment
          .iter()
          .flat_map(|c| &c.private_mutations)
          .map(format_substitution)
          .collect(),
        qc_overall_score: Some(result.qc.overall_score),
        qc_overall_status: Some(format!("{:?}", result.qc.overall_status)),
        warnings: result.warnings.iter().map(|w| w.text.clone()).collect(),
      },
      Err(err) => Self {
        index,
        seq_name,
        error: Some(err.to_string()),
        alignment_score: None,
        substitutions: Vec::new(),
        deletions: Vec::new(),
        insertions: Vec::new(),
        missing: Vec::new(),
        clade: None,
        private_mutations: Vec::new(),
        qc_overall_score: None,
        qc_overall_status: None,
        warnings: Vec::new(),
      },
    }
  }
}

pub fn run(mut args: RunArgs) -> Result<(), Report> {
  resolve_output_paths(&mut args)?;

  let reference = read_reference(&args.input_root_seq)?;
  let gene_map = read_gene_map(&args)?;
  let tree = read_tree(&args.input_tree)?;
  let qc_config = read_qc_config(&args.input_qc_config)?;
  let align_params = AlignPairwiseParams::from(&args.align_params);

  let ref_peptides = reference_peptides(&reference, &gene_map)?;

  let input_content = read_file_to_string(&args.input_fasta).wrap_err("When reading input sequences")?;
  let reader = FastaStream::new(BufReader::new(input_content.as_bytes()));

  let ctx = AnalysisContext::new(reference, gene_map, qc_config, align_params, tree);

  let mut aligned_fasta_records: Vec<(String, String)> = Vec::new();
  let mut per_gene_records: std::collections::BTreeMap<String, Vec<(String, String)>> = std::collections::BTreeMap::new();
  let mut insertion_rows: Vec<(String, String)> = Vec::new();
  let mut error_rows: Vec<(String, String)> = Vec::new();
  let mut records: Vec<PipelineRecord> = Vec::new();
  let mut fatal_count = 0_usize;
  let mut total_count = 0_usize;

  run_pipeline(reader, &ctx, args.jobs, |record: PipelineRecord| {
    total_count += 1;
    match &record.outcome {
      Ok(result) => {
        aligned_fasta_records.push((record.seq_name.clone(), from_nuc_seq(&result.aligned_qry)));

        for insertion in &result.nuc.insertions {
          let letters: String = insertion.ins.iter().map(|n| n.to_char()).collect();
          insertion_rows.push((record.seq_name.clone(), format!("{}:{}", insertion.pos, letters)));
        }

        for peptide in &result.translation.peptides {
          let entry = per_gene_records.entry(peptide.gene_name.clone()).or_default();
          let aa_string: String = peptide.aa_seq.iter().map(|a| a.to_char()).collect();
          entry.push((record.seq_name.clone(), aa_string));
        }
      },
      Err(err) => {
        fatal_count += 1;
        error_rows.push((record.seq_name.clone(), err.to_string()));
      },
    }
    records.push(record);
  });

  log::info!("Processed {total_count} sequences, {fatal_count} failed");

  if let Some(path) = &args.output_fasta {
    write_fasta(path, &aligned_fasta_records)?;
  }
  if let Some(path) = &args.output_insertions {
    write_csv(path, &["seqName", "insertions"], &insertion_rows)?;
  }
  if let Some(path) = &args.output_errors {
    write_csv(path, &["seqName", "error"], &error_rows)?;
  }
  if !per_gene_records.is_empty() {
    if let Some(dir) = &args.output_dir {
      for (gene_name, records) in &per_gene_records {
        let mut full_records = Vec::with_capacity(records.len() + 1);
        if let Some((_, ref_seq)) = ref_peptides.iter().find(|(name, _)| name == gene_name) {
          full_records.push(("Reference".to_owned(), ref_seq.iter().map(|a| a.to_char()).collect()));
        }
        full_records.extend(records.iter().cloned());
        write_fasta(&dir.join(format!("nextclade_gene_{gene_name}.translation.fasta")), &full_records)?;
      }
    }
  }
  if let Some(path) = &args.output_tsv {
    write_results_tsv(path, &records)?;
  }
  if let Some(path) = &args.output_json {
    write_results_json(path, &records)?;
  }
  if let (Some(output_tree_path), Some(input_tree_path)) = (&args.output_tree, &args.input_tree) {
    write_annotated_tree(output_tree_path, input_tree_path, &records, ctx.tree.as_ref())?;
  }

  if fatal_count == total_count && total_count > 0 {
    return Err(eyre::eyre!("All {total_count} input sequences failed to process"));
  }

  Ok(())
}

fn write_fasta(path: &PathBuf, records: &[(String, String)]) -> Result<(), Report> {
  ensure_dir(path)?;
  let file = File::create(path).wrap_err_with(|| format!("When creating file: {path:#?}"))?;
  let mut writer = BufWriter::new(file);
  for (name, seq) in records {
    writeln!(writer, ">{name}")?;
    writeln!(writer, "{seq}")?;
  }
  writer.flush().wrap_err_with(|| format!("When flushing file: {path:#?}"))
}

fn write_csv(path: &PathBuf, header: &[&str], rows: &[(String, String)]) -> Result<(), Report> {
  ensure_dir(path)?;
  let mut writer = csv::WriterBuilder::new().from_path(path).wrap_err_with(|| format!("When creating file: {path:#?}"))?;
  writer.write_record(header)?;
  for (a, b) in rows {
    writer.write_record([a, b])?;
  }
  writer.flush().wrap_err_with(|| format!("When flushing file: {path:#?}"))
}

fn write_results_tsv(path: &PathBuf, records: &[PipelineRecord]) -> Result<(), Report> {
  ensure_dir(path)?;
  let mut writer = csv::WriterBuilder::new()
    .delimiter(b'\t')
    .from_path(path)
    .wrap_err_with(|| format!("When creating file: {path:#?}"))?;
  writer.write_record(["seqName", "clade", "totalSubstitutions", "totalDeletions", "totalInsertions", "qcOverallStatus"])?;
  for record in records {
    if let Ok(result) = &record.outcome {
      writer.write_record([
        record.seq_name.as_str(),
        result.clade_assignment.as_ref().and_then(|c| c.clade.as_deref()).unwrap_or(""),
        &result.nuc.substitutions.len().to_string(),
        &result.nuc.deletions.len().to_string(),
        &result.nuc.insertions.len().to_string(),
        &format!("{:?}", result.qc.overall_status),
      ])?;
    }
  }
  writer.flush().wrap_err_with(|| format!("When flushing file: {path:#?}"))
}

/// Schema version embedded in every results JSON.
const RESULTS_SCHEMA_VERSION: &str = "1.0.0";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResultsJson<'a> {
  schema_version: &'a str,
  results: Vec<JsonRecord>,
}

fn write_results_json(path: &PathBuf, records: &[PipelineRecord]) -> Result<(), Report> {
  let results = records
    .iter()
    .map(|record| JsonRecord::from_outcome(record.index, record.seq_name.clone(), &record.outcome))
    .collect();
  json_write(path, &ResultsJson { schema_version: RESULTS_SCHEMA_VERSION, results })
}

/// Re-serializes the input reference tree with an `attachedQueries` node attribute appended to every node
/// that at least one query was assigned to as its nearest node.
fn write_annotated_tree(
  output_path: &PathBuf,
  input_path: &PathBuf,
  records: &[PipelineRecord],
  tree: Option<&Tree>,
) -> Result<(), Report> {
  let content = read_file_to_string(input_path)?;
  let mut value: serde_json::Value = json_parse(&content)?;

  if let Some(tree) = tree {
    let mut attachments: std::collections::BTreeMap<String, Vec<String>> = std::collections::BTreeMap::new();
    for record in records {
      if let Ok(result) = &record.outcome {
        if let Some(assignment) = &result.clade_assignment {
          let node_name = tree.node(assignment.nearest_node_id).name.clone();
          attachments.entry(node_name).or_default().push(record.seq_name.clone());
        }
      }
    }
    nextclade::tree::annotate_auspice_json(&mut value, &attachments);
  }

  json_write(output_path, &value)
}
