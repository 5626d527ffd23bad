use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "corescope",
    about = "Substructure filtering and core/R-group analysis of molecule sets",
    version,
    propagate_version = true
)]
pub struct Cli {
    /// Raise log verbosity (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(flatten)]
    pub inputs: InputOptions,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Split molecules into matched and unmatched sets
    Match(MatchArgs),

    /// Count substitution positions and unique substituents per core
    Analyze(AnalyzeArgs),

    /// Print the data table sorted by one column
    Sort(SortArgs),

    /// Print canonical SMILES for every molecule
    Canon,

    /// Write the SMARTS definitions back out
    ExportSmarts {
        /// Destination file
        #[arg(value_name = "FILE")]
        output: PathBuf,
    },
}

/// Input files, optionally taken from a saved session.
#[derive(Args, Default)]
#[command(next_help_heading = "Inputs")]
pub struct InputOptions {
    /// SMILES file, one structure and optional name per line
    #[arg(short, long, value_name = "FILE", global = true)]
    pub molecules: Option<PathBuf>,

    /// SMARTS definition file
    #[arg(short, long, value_name = "FILE", global = true)]
    pub smarts: Option<PathBuf>,

    /// Multi-query MDL file
    #[arg(long, value_name = "FILE", global = true)]
    pub mdl: Option<PathBuf>,

    /// Delimited data table
    #[arg(short, long, value_name = "FILE", global = true)]
    pub data: Option<PathBuf>,

    /// Session settings (JSON) supplying any input not given above
    #[arg(long, value_name = "FILE", global = true)]
    pub session: Option<PathBuf>,

    /// Save the resolved inputs as session settings
    #[arg(long, value_name = "FILE", global = true)]
    pub save_session: Option<PathBuf>,

    /// Name prefix marking core patterns and core molecules
    #[arg(long, value_name = "PREFIX", default_value = "core", global = true)]
    pub core_prefix: String,

    /// Stop loading the data table at the first malformed row
    #[arg(long, global = true)]
    pub strict_table: bool,
}

#[derive(Args)]
pub struct MatchArgs {
    /// Pattern to use, by name (repeatable)
    #[arg(short, long = "pattern", value_name = "NAME", action = clap::ArgAction::Append)]
    pub patterns: Vec<String>,

    /// Use only the first named pattern
    #[arg(long)]
    pub single: bool,

    /// Print the unmatched molecules too
    #[arg(long)]
    pub show_unmatched: bool,
}

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Add the table's CoreSmarts column to the SMARTS definitions first
    #[arg(long)]
    pub import_core_smarts: bool,

    /// Replace existing definitions of the same name when importing
    #[arg(long, requires = "import_core_smarts")]
    pub overwrite: bool,

    /// Where to write the updated table (stdout if omitted)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct SortArgs {
    /// Column name to sort by
    #[arg(short, long, value_name = "NAME")]
    pub column: String,

    /// Sort in descending order
    #[arg(long)]
    pub descending: bool,
}

pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn inputs_are_accepted_after_the_subcommand() {
        let cli = Cli::try_parse_from([
            "corescope", "match", "-m", "mols.smi", "-s", "defs.sma", "-p", "core_phenyl", "-p", "halide",
        ])
        .unwrap();
        assert_eq!(cli.inputs.molecules, Some(PathBuf::from("mols.smi")));
        assert_eq!(cli.inputs.core_prefix, "core");
        match cli.command {
            Command::Match(args) => assert_eq!(args.patterns, vec!["core_phenyl", "halide"]),
            _ => panic!("expected match"),
        }
    }

    #[test]
    fn overwrite_needs_import() {
        assert!(Cli::try_parse_from(["corescope", "analyze", "--overwrite"]).is_err());
    }
}
