use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "querygrade",
    version,
    about = "Run and grade read-only SQL against the exercise dataset"
)]
pub struct Cli {
    /// Service config file
    #[arg(
        long,
        global = true,
        env = "QUERYGRADE_CONFIG",
        default_value = "querygrade.yaml"
    )]
    pub config: PathBuf,

    /// Treat unknown config keys as errors
    #[arg(long, global = true)]
    pub strict: bool,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a query and print its (capped, redacted) rows
    Run(RunArgs),
    /// Grade a submission against an exercise's reference solution
    Grade(GradeArgs),
    /// Browse the exercise catalog
    Exercises(ExercisesArgs),
    /// Run every reference solution and report the ones that fail
    Validate(ValidateArgs),
    /// Write a sample config and exercise catalog
    Init(InitArgs),
    Version,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Text,
    Json,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RowFormat {
    Table,
    Json,
}

#[derive(clap::Args, Clone)]
pub struct RunArgs {
    #[arg(long)]
    pub sql: String,

    #[arg(long, value_enum, default_value = "table")]
    pub format: RowFormat,
}

#[derive(clap::Args, Clone)]
pub struct GradeArgs {
    /// Exercise id
    #[arg(long)]
    pub problem: String,

    #[arg(long)]
    pub sql: String,

    #[arg(long, value_enum, default_value = "text")]
    pub format: Format,
}

#[derive(clap::Args, Clone)]
pub struct ExercisesArgs {
    #[command(subcommand)]
    pub cmd: ExercisesSub,
}

#[derive(Subcommand, Clone)]
pub enum ExercisesSub {
    /// List exercises in catalog order
    List {
        #[arg(long, value_enum, default_value = "text")]
        format: Format,
    },
    /// Show one exercise (without its solution)
    Show { id: String },
    /// SQL constructs the reference solution uses
    Hint { id: String },
    /// Id of the exercise after this one
    Next { id: String },
    /// Reveal the reference solution
    Solution { id: String },
}

#[derive(clap::Args, Clone)]
pub struct ValidateArgs {
    #[arg(long, value_enum, default_value = "text")]
    pub format: Format,
}

#[derive(clap::Args, Clone)]
pub struct InitArgs {
    /// Overwrite existing files
    #[arg(long)]
    pub force: bool,
}
