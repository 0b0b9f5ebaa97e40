use anyhow::Result;
use clap::CommandFactory;
use clap_complete::{Shell, generate};
use std::io;
use xsnap_core::AppError;

use crate::cli_args::{Cli, CompletionArgs};

pub fn handle_completion_command(args: &CompletionArgs) -> Result<()> {
    let shell_enum: Shell = match args.shell.to_lowercase().as_str() {
        "fish" => Shell::Fish,
        "bash" => Shell::Bash,
        "zsh" => Shell::Zsh,
        "elvish" => Shell::Elvish,
        "powershell" => Shell::PowerShell,
        _ => {
            anyhow::bail!(AppError::InvalidArgument(format!(
                "Unsupported shell for completion: {}",
                args.shell
            )));
        }
    };

    let mut command = Cli::command();
    let bin_name = command.get_name().to_string();
    generate(shell_enum, &mut command, bin_name, &mut io::stdout());
    Ok(())
}
