mod cli_args;
mod commands;
mod output;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use colored::*;
use log;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process;

use cli_args::{Cli, Commands, GenerateArgs, ProjectConfigOpts};
use xsnap_core::config::SizeSetting;
use xsnap_core::{AppError, Config, OutputFormat};

fn main() {
    let cli_args = Cli::parse();

    let quiet = cli_args.quiet;
    let verbose = cli_args.verbose;

    let exit_code = match run_app(cli_args, quiet, verbose) {
        Ok(_) => {
            log::info!("Application finished successfully.");
            0
        }
        Err(e) => {
            let core_err = e.downcast_ref::<xsnap_core::AppError>();
            let exit_code = match core_err {
                Some(AppError::InvalidRoot { .. }) => 1,
                Some(AppError::Config(_)) => 1,
                Some(AppError::TomlParse(_)) => 1,
                Some(AppError::Regex(_)) => 1,
                Some(AppError::Io(_)) => 2,
                Some(AppError::FileRead { .. }) => 2,
                Some(AppError::FileWrite { .. }) => 2,
                Some(AppError::WalkDir(_)) => 2,
                Some(AppError::Notebook { .. }) => 2,
                Some(AppError::InvalidArgument(_)) => 5,
                Some(AppError::SizeParse(_)) => 5,
                Some(AppError::Json(_)) => 6,
                Some(AppError::TikToken(_)) => 8,
                Some(_) => 1,
                None => 1,
            };

            if !quiet || exit_code == 1 || exit_code == 5 {
                eprintln!("{} {:#}", "Error:".red().bold(), e);
            } else {
                log::error!("Application failed: {:#}", e);
            }

            exit_code
        }
    };
    log::debug!("Exiting with code {}", exit_code);
    process::exit(exit_code);
}

/// Route records to `log_file` at debug level or above when given, otherwise to
/// stderr at a level picked by `-v`/`--quiet`.
pub fn setup_logging(quiet: bool, verbose: u8, log_file: Option<&Path>) {
    let mut builder = env_logger::Builder::new();

    if let Some(path) = log_file {
        match File::create(path) {
            Ok(file) => {
                let level = if verbose >= 2 {
                    log::LevelFilter::Trace
                } else {
                    log::LevelFilter::Debug
                };
                builder
                    .filter_level(level)
                    .format_timestamp_secs()
                    .target(env_logger::Target::Pipe(Box::new(file)));
                if builder.try_init().is_ok() {
                    log::debug!("Logging to {} at level {:?}", path.display(), level);
                }
                return;
            }
            Err(e) => {
                eprintln!(
                    "{} could not open log file {}: {}",
                    "Warning:".yellow().bold(),
                    path.display(),
                    e
                );
            }
        }
    }

    let log_level = if quiet {
        log::LevelFilter::Off
    } else {
        match verbose {
            0 => log::LevelFilter::Error,
            1 => log::LevelFilter::Warn,
            2 => log::LevelFilter::Info,
            3 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };
    builder.filter_level(log_level).format_timestamp(None);
    if builder.try_init().is_ok() {
        log::trace!("Logger initialized with level: {:?}", log_level);
    }
}

fn run_app(cli: Cli, quiet: bool, verbose: u8) -> Result<()> {
    match cli.command {
        None => {
            setup_logging(quiet, verbose, None);
            Cli::command().print_help()?;
        }
        Some(command) => match command {
            Commands::Generate(args) => {
                commands::generate::handle_generate_command(args, quiet, verbose)?;
            }
            Commands::Profile(args) => {
                setup_logging(quiet, verbose, None);
                log::debug!("Executing 'profile' command...");
                commands::profile::handle_profile_command(args, quiet)?;
            }
            Commands::Completion(args) => {
                setup_logging(quiet, verbose, None);
                log::debug!("Executing 'completion' command...");
                commands::completion::handle_completion_command(&args)?;
            }
        },
    }
    Ok(())
}

fn merge_config_with_cli_overrides(mut config: Config, args: &GenerateArgs) -> Config {
    if let Some(format) = &args.format {
        config.output.format = match format.as_str() {
            "tree" => OutputFormat::Tree,
            _ => OutputFormat::Structured,
        };
    }
    if let Some(path) = &args.output {
        config.output.path = Some(path.clone());
    }
    if let Some(threshold) = args.split_threshold {
        config.output.split_threshold = threshold;
    }
    if args.timestamp {
        config.output.include_timestamp = true;
    }

    if let Some(limit) = args.token_limit {
        config.traversal.token_limit = limit;
    }
    if let Some(depth) = args.max_depth {
        config.traversal.max_depth = depth;
        config.traversal.limit_depth = true;
    }
    if args.no_depth_limit {
        config.traversal.limit_depth = false;
    }

    if let Some(size) = &args.json_size_threshold {
        config.filters.json_size_threshold = size_setting(size);
    }
    if let Some(size) = &args.max_file_size {
        config.filters.max_file_size = size_setting(size);
    }
    if !args.exclude_extensions.is_empty() {
        config.filters.exclude_extensions = args.exclude_extensions.clone();
    }
    if !args.ignore_patterns.is_empty() {
        config.filters.ignore_patterns = args.ignore_patterns.clone();
    }
    config
        .filters
        .extra_ignore_patterns
        .extend(args.extra_ignore.iter().cloned());

    if args.enable_logging {
        config.logging.enabled = true;
    }
    if let Some(file) = &args.log_file {
        config.logging.file = PathBuf::from(shellexpand::tilde(&file.to_string_lossy()).as_ref());
    }

    log::trace!("Config after CLI overrides: {:?}", config);
    config
}

fn size_setting(raw: &str) -> SizeSetting {
    match raw.trim().parse::<u64>() {
        Ok(bytes) => SizeSetting::Bytes(bytes),
        Err(_) => SizeSetting::Text(raw.to_string()),
    }
}

pub fn load_config_for_command(
    project_root: &Path,
    project_opts: &ProjectConfigOpts,
    generate_args: Option<&GenerateArgs>,
) -> Result<Config> {
    let config_path = Config::resolve_config_path(
        project_root,
        project_opts.config.as_ref(),
        project_opts.no_config,
    )
    .context("Failed to resolve configuration path")?;

    let config = match &config_path {
        Some(path) => Config::load_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    Ok(match generate_args {
        Some(gen_args) => merge_config_with_cli_overrides(config, gen_args),
        None => config,
    })
}
