use querygrade_core::config::load_config;
use querygrade_core::errors::GradeError;
use querygrade_core::Grader;

use super::args::{Cli, Command};

pub mod exercises;
pub mod grade;
pub mod init;
pub mod run;
pub mod validate;

pub mod exit_codes {
    pub const OK: i32 = 0;
    pub const TEST_FAILED: i32 = 1;
    pub const CONFIG_ERROR: i32 = 2;
}

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Init(args) => init::run(&cli.config, args),
        Command::Version => {
            println!("querygrade {}", env!("CARGO_PKG_VERSION"));
            Ok(exit_codes::OK)
        }
        cmd => {
            let grader = match open_grader(&cli.config, cli.strict) {
                Ok(g) => g,
                Err(e) => {
                    eprintln!("{e:#}");
                    return Ok(exit_codes::CONFIG_ERROR);
                }
            };
            match cmd {
                Command::Run(args) => run::run(&grader, args).await,
                Command::Grade(args) => grade::run(&grader, args).await,
                Command::Exercises(args) => exercises::run(&grader, args),
                Command::Validate(args) => validate::run(&grader, args).await,
                Command::Init(_) | Command::Version => unreachable!("handled above"),
            }
        }
    }
}

fn open_grader(config: &std::path::Path, strict: bool) -> anyhow::Result<Grader> {
    let cfg = load_config(config, strict)?;
    Grader::from_config(&cfg)
}

/// Prints a failed operation the way every command reports one and returns
/// the matching exit code.
pub(crate) fn report_error(grader: &Grader, e: &GradeError) -> i32 {
    eprintln!("error[{}]: {}", e.code(), e);
    if let GradeError::NotFound { id } = e {
        if let Some(close) = grader.catalog().closest_id(id) {
            eprintln!("  did you mean `{close}`?");
        }
    }
    exit_codes::CONFIG_ERROR
}
