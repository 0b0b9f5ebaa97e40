use crate::cli_args::ProfileArgs;
use crate::load_config_for_command;
use crate::output;
use anyhow::{Context, Result};
use log;
use xsnap_core::{Config, detect_project_profile};

pub fn handle_profile_command(args: ProfileArgs, quiet: bool) -> Result<()> {
    let project_root = Config::determine_project_root(args.directory_path.as_ref())
        .context("Failed to determine project root")?;

    let run_config = load_config_for_command(&project_root, &args.project_config, None)
        .context("Failed to load configuration")?
        .resolve()
        .context("Failed to resolve run configuration")?;

    let profile = detect_project_profile(&project_root, &run_config.filters.ignore_patterns)
        .context("Failed to detect project profile")?;
    log::debug!("Profile detected: {:?}", profile);

    match args.format.as_str() {
        "json" => output::write_to_stdout(&profile.to_json()?),
        _ => output::print_profile_pretty(&profile, &project_root, quiet),
    }
}
