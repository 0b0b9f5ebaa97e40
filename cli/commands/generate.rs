use crate::cli_args::GenerateArgs;
use crate::output;
use crate::{load_config_for_command, setup_logging};
use anyhow::{Context, Result};
use log;
use xsnap_core::{self as core, Config, TiktokenCounter, TokenCounter, WordCounter};

pub fn handle_generate_command(args: GenerateArgs, quiet: bool, verbose: u8) -> Result<()> {
    let project_root = Config::determine_project_root(Some(&args.directory_path))
        .context("Failed to determine project root")?;

    let config = load_config_for_command(&project_root, &args.project_config, Some(&args))
        .context("Failed to load configuration")?;

    let log_file = config.logging.enabled.then(|| config.logging.file.clone());
    setup_logging(quiet, verbose, log_file.as_deref());
    log::debug!("Executing 'generate' command...");
    log::info!("Project root determined: {}", project_root.display());

    let run_config = config
        .resolve()
        .context("Failed to resolve run configuration")?;

    let counter: Box<dyn TokenCounter> = match args.tokenizer.as_deref() {
        Some("words") => Box::new(WordCounter),
        Some(_) => Box::new(TiktokenCounter::try_new().context("Failed to load tokenizer")?),
        None => Box::new(TiktokenCounter::new()),
    };

    let report = core::run_snapshot(&project_root, &run_config, counter.as_ref())
        .with_context(|| format!("Failed to snapshot {}", project_root.display()))?;

    output::print_snapshot_report(&report, quiet, verbose);
    Ok(())
}
