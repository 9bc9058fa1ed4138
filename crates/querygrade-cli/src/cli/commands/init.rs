use querygrade_core::config::write_sample_config;
use std::path::Path;

use super::exit_codes;
use crate::cli::args::InitArgs;
use crate::templates;

pub fn run(config: &Path, args: InitArgs) -> anyhow::Result<i32> {
    if config.exists() && !args.force {
        eprintln!("{} already exists (use --force to overwrite)", config.display());
    } else {
        write_sample_config(config)?;
        eprintln!("wrote file: {}", config.display());
    }

    let catalog = config
        .parent()
        .unwrap_or(Path::new("."))
        .join(templates::CATALOG_FILE);
    if catalog.exists() && !args.force {
        eprintln!("{} already exists (use --force to overwrite)", catalog.display());
    } else {
        std::fs::write(&catalog, templates::SAMPLE_CATALOG)?;
        eprintln!("wrote file: {}", catalog.display());
    }

    Ok(exit_codes::OK)
}
