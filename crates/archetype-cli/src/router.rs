// Argument parsing and dispatch

use std::path::PathBuf;

use archetype_core::ValuesOptions;
use clap::Parser;

use crate::commands::{Command, CreateCommand};
use crate::error::CliResult;

/// Create a new Helm chart from a templated starter scaffold
#[derive(Parser, Debug)]
#[command(name = "helm-archetype")]
#[command(bin_name = "helm-archetype")]
#[command(about = "create a new Helm chart from a templated starter scaffold")]
#[command(
    long_about = "Create a new Helm chart from a starter, then render the chart's values.yaml and \
templates with (( )) delimited templates against the supplied values.\n\n\
{{ }} expressions are left untouched for Helm to render at install time. \
Templates that render to nothing but whitespace are removed."
)]
#[command(version)]
pub struct Cli {
    /// Chart to create; a path places it under that parent directory
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Starter name in the starters directory, or an absolute path
    #[arg(value_name = "STARTER")]
    pub starter: String,

    /// Specify values in a YAML file (can specify multiple)
    #[arg(short = 'f', long = "values", value_name = "FILE", value_delimiter = ',')]
    pub value_files: Vec<String>,

    /// Set values on the command line (can specify multiple or separate values with commas: key1=val1,key2=val2)
    #[arg(long = "set", value_name = "KEY=VAL")]
    pub values: Vec<String>,

    /// Set STRING values on the command line (can specify multiple or separate values with commas: key1=val1,key2=val2)
    #[arg(long = "set-string", value_name = "KEY=VAL")]
    pub string_values: Vec<String>,

    /// Set values from respective files specified via the command line (can specify multiple or separate values with commas: key1=path1,key2=path2)
    #[arg(long = "set-file", value_name = "KEY=PATH")]
    pub file_values: Vec<String>,

    /// Configuration file to use instead of the default
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory holding named starters
    #[arg(long = "starters-dir", value_name = "DIR")]
    pub starters_dir: Option<PathBuf>,

    /// Fail on references to missing values instead of printing <no value>
    #[arg(long)]
    pub strict: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    pub fn values_options(&self) -> ValuesOptions {
        ValuesOptions {
            value_files: self.value_files.clone(),
            values: self.values.clone(),
            string_values: self.string_values.clone(),
            file_values: self.file_values.clone(),
        }
    }
}

/// Command router
pub struct CommandRouter;

impl CommandRouter {
    /// Parse CLI arguments and run the command
    pub fn route() -> CliResult<()> {
        let cli = Cli::parse();

        crate::logging::init_logging(cli.verbose, cli.quiet);

        Self::execute(&cli)
    }

    /// Execute a parsed command line
    pub fn execute(cli: &Cli) -> CliResult<()> {
        let cmd = CreateCommand::new(cli.name.clone(), cli.starter.clone())
            .with_values(cli.values_options())
            .with_config_path(cli.config.clone())
            .with_starters_dir(cli.starters_dir.clone())
            .with_strict(cli.strict);
        cmd.execute()
    }
}
