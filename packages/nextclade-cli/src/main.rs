mod cli;

use clap::Parser;
use cli::dataset;
use cli::{resolve_verbosity, NextcladeArgs, NextcladeCommands};
use eyre::Report;

fn setup_logger(filter_level: log::LevelFilter) {
  env_logger::Builder::new()
    .filter_level(filter_level)
    .format_timestamp(None)
    .format_module_path(false)
    .init();
}

fn main() -> Result<(), Report> {
  let args = NextcladeArgs::parse();
  setup_logger(resolve_verbosity(&args));

  match args.command {
    NextcladeCommands::Run(run_args) => cli::run::run(*run_args),
    NextcladeCommands::Dataset(command) => dataset::run(command),
  }
}
