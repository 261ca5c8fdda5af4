pub mod dataset;
pub mod run;

use clap::{Parser, Subcommand};
use log::LevelFilter;

/// Alignment, mutation calling, translation, clade assignment and quality control checks for viral genetic
/// sequences.
#[derive(Parser, Debug)]
#[clap(name = "nextclade")]
#[clap(author, version)]
pub struct NextcladeArgs {
  #[clap(subcommand)]
  pub command: NextcladeCommands,

  /// Make output more quiet (-q) or more verbose (-v). May be repeated, e.g. `-vv`.
  #[clap(long, short, global = true, action = clap::ArgAction::Count)]
  pub verbose: u8,

  #[clap(long, short, global = true, action = clap::ArgAction::Count)]
  pub quiet: u8,

  /// Set verbosity level explicitly, overriding `-v`/`-q`.
  #[clap(long, global = true, conflicts_with_all = ["verbose", "quiet", "silent"])]
  pub verbosity: Option<LevelFilter>,

  /// Disable all console output. Same as `--verbosity=off`.
  #[clap(long, global = true, conflicts_with_all = ["verbose", "quiet", "verbosity"])]
  pub silent: bool,
}

#[derive(Subcommand, Debug)]
pub enum NextcladeCommands {
  /// Run the analysis pipeline: alignment, mutation calling, translation, QC, clade assignment.
  Run(Box<run::RunArgs>),

  /// Manage reference datasets (fetched from a dataset index server).
  #[clap(subcommand)]
  Dataset(dataset::DatasetCommand),
}

/// Resolves `-v`/`-q`/`--verbosity`/`--silent` into a single `log::LevelFilter` (`--silent` and
/// `--verbosity` both override the repeatable flags).
#[must_use]
pub fn resolve_verbosity(args: &NextcladeArgs) -> LevelFilter {
  if args.silent {
    return LevelFilter::Off;
  }
  if let Some(level) = args.verbosity {
    return level;
  }
  let base = LevelFilter::Warn as i8;
  let level = (base + i8::try_from(args.verbose).unwrap_or(i8::MAX) - i8::try_from(args.quiet).unwrap_or(0)).clamp(0, 5);
  match level {
    0 => LevelFilter::Off,
    1 => LevelFilter::Error,
    2 => LevelFilter::Warn,
    3 => LevelFilter::Info,
    4 => LevelFilter::Debug,
    _ => LevelFilter::Trace,
  }
}
