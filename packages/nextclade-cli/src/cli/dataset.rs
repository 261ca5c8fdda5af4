use clap::{Parser, Subcommand};
use eyre::{eyre, Report, WrapErr};
use itertools::Itertools;
use nextclade::io::fs::ensure_dir;
use serde::Deserialize;
use std::fs::File;
use std::io::{Read, Write};
use std::path::PathBuf;

/// Base URL of the dataset index server, overridable so tests and self-hosted mirrors don't have to touch
/// the default.
const DEFAULT_SERVER: &str = "https://data.clades.example.org";

#[derive(Subcommand, Debug)]
pub enum DatasetCommand {
  /// List datasets available on the index server.
  List(DatasetListArgs),

  /// Download one dataset's reference bundle to a local directory.
  Get(DatasetGetArgs),
}

#[derive(Parser, Debug)]
pub struct DatasetListArgs {
  /// Base URL of the dataset index server.
  #[clap(long, default_value = DEFAULT_SERVER)]
  pub server: String,

  /// Only list datasets whose name contains this substring.
  #[clap(long)]
  pub name: Option<String>,

  /// Print the raw index JSON instead of the formatted summary.
  #[clap(long)]
  pub json: bool,
}

#[derive(Parser, Debug)]
pub struct DatasetGetArgs {
  /// Name of the dataset to download, as shown by `dataset list`.
  #[clap(long)]
  pub name: String,

  /// Specific version tag to download. If omitted, the latest enabled version is used.
  #[clap(long)]
  pub tag: Option<String>,

  /// Base URL of the dataset index server.
  #[clap(long, default_value = DEFAULT_SERVER)]
  pub server: String,

  /// Directory to write the dataset's files into. Created if it does not exist.
  #[clap(long, short = 'o')]
  pub output_dir: PathBuf,
}

/// One `files` entry of a dataset version: the remote URLs of `reference.fasta`, `tree.json`,
/// `genemap.gff`, `primers.csv`, and `qc.json`, before they are downloaded and renamed into a local
/// dataset directory.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
struct DatasetFiles {
  reference: String,
  tree: String,
  gene_map: String,
  primers: String,
  qc: String,
  #[serde(default)]
  tag: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
struct DatasetVersion {
  #[serde(default)]
  enabled: bool,
  tag: String,
  #[serde(default)]
  comment: String,
  files: DatasetFiles,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
struct Dataset {
  #[serde(default)]
  enabled: bool,
  name: String,
  #[serde(default)]
  name_friendly: String,
  #[serde(default)]
  description: String,
  #[serde(default)]
  versions: Vec<DatasetVersion>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
struct DatasetsIndexJson {
  #[serde(default)]
  datasets: Vec<Dataset>,
}

/// Resolves a dataset file URL against the index server's base URL: URLs already carrying a scheme are
/// returned unchanged, everything else is joined onto `server`.
fn to_absolute_url(server: &str, url: &str) -> String {
  if url.starts_with("http://") || url.starts_with("https://") {
    url.to_owned()
  } else {
    format!("{}/{}", server.trim_end_matches('/'), url.trim_start_matches('/'))
  }
}

fn fetch_index(server: &str) -> Result<DatasetsIndexJson, Report> {
  let url = format!("{}/index.json", server.trim_end_matches('/'));
  let body = reqwest::blocking::get(&url)
    .wrap_err_with(|| format!("When fetching dataset index from '{url}'"))?
    .error_for_status()
    .wrap_err_with(|| format!("Dataset index server returned an error for '{url}'"))?
    .text()
    .wrap_err("When reading dataset index response body")?;
  serde_json::from_str(&body).wrap_err("When parsing dataset index JSON")
}

/// Picks the dataset version to use: the one matching `tag` if given, otherwise the lexicographically
/// greatest enabled version's tag (dataset tags are timestamp-like strings, so lexicographic order tracks
/// chronological order).
fn select_version<'a>(dataset: &'a Dataset, tag: Option<&str>) -> Result<&'a DatasetVersion, Report> {
  if let Some(tag) = tag {
    return dataset
      .versions
      .iter()
      .find(|v| v.tag == tag)
      .ok_or_else(|| eyre!("Dataset '{}' has no version tagged '{tag}'", dataset.name));
  }
  dataset
    .versions
    .iter()
    .filter(|v| v.enabled)
    .max_by(|a, b| a.tag.cmp(&b.tag))
    .ok_or_else(|| eyre!("Dataset '{}' has no enabled versions", dataset.name))
}

fn download_to_file(url: &str, path: &PathBuf) -> Result<(), Report> {
  ensure_dir(path)?;
  let mut response = reqwest::blocking::get(url)
    .wrap_err_with(|| format!("When fetching '{url}'"))?
    .error_for_status()
    .wrap_err_with(|| format!("Dataset server returned an error for '{url}'"))?;
  let mut body = String::new();
  response.read_to_string(&mut body).wrap_err("When reading response body")?;
  File::create(path)
    .wrap_err_with(|| format!("When creating file: {path:#?}"))?
    .write_all(body.as_bytes())
    .wrap_err_with(|| format!("When writing file: {path:#?}"))
}

fn list(args: &DatasetListArgs) -> Result<(), Report> {
  let index = fetch_index(&args.server)?;

  let datasets: Vec<&Dataset> = index
    .datasets
    .iter()
    .filter(|d| d.enabled)
    .filter(|d| args.name.as_deref().map_or(true, |needle| d.name.contains(needle)))
    .collect();

  if args.json {
    println!("{}", serde_json::to_string_pretty(&datasets.iter().map(|d| d.name.clone()).collect::<Vec<_>>())?);
    return Ok(());
  }

  if datasets.is_empty() {
    println!("No datasets found.");
    return Ok(());
  }

  for dataset in datasets {
    println!("{} (name: {})", dataset.name_friendly, dataset.name);
    println!("{}", dataset.description);
    let tags = dataset.versions.iter().map(|v| v.tag.as_str()).join(", ");
    println!("Versions ({}): {tags}", dataset.versions.len());
    for version in &dataset.versions {
      println!("  tag: {}  comment: {}  enabled: {}", version.tag, version.comment, version.enabled);
    }
    println!();
  }

  Ok(())
}

fn get(args: &DatasetGetArgs) -> Result<(), Report> {
  let index = fetch_index(&args.server)?;

  let dataset = index
    .datasets
    .iter()
    .find(|d| d.name == args.name)
    .ok_or_else(|| eyre!("No dataset named '{}' found on '{}'", args.name, args.server))?;

  let version = select_version(dataset, args.tag.as_deref())?;

  log::info!("Downloading dataset '{}' version '{}' to {:#?}", dataset.name, version.tag, args.output_dir);

  let files = [
    ("reference.fasta", &version.files.reference),
    ("tree.json", &version.files.tree),
    ("genemap.gff", &version.files.gene_map),
    ("primers.csv", &version.files.primers),
    ("qc.json", &version.files.qc),
  ];

  for (filename, url) in files {
    let absolute_url = to_absolute_url(&args.server, url);
    let out_path = args.output_dir.join(filename);
    download_to_file(&absolute_url, &out_path).wrap_err_with(|| format!("When downloading '{filename}'"))?;
  }

  if let Some(tag_url) = &version.files.tag {
    let absolute_url = to_absolute_url(&args.server, tag_url);
    download_to_file(&absolute_url, &args.output_dir.join("tag.json")).wrap_err("When downloading 'tag.json'")?;
  }

  log::info!("Dataset '{}' version '{}' downloaded successfully", dataset.name, version.tag);
  Ok(())
}

pub fn run(command: DatasetCommand) -> Result<(), Report> {
  match command {
    DatasetCommand::List(args) => list(&args),
    DatasetCommand::Get(args) => get(&args),
  }
}
