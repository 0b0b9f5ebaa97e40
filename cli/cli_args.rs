use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Args, Debug, Clone, Default)]
pub struct ProjectConfigOpts {
    #[arg(
        long,
        help = "Path of the TOML config file (default: <DIR>/.xtools/xsnap/xsnap.toml).",
        value_name = "CONFIG_FILE",
        conflicts_with = "no_config",
        help_heading = "Project Setup"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        help = "Disable loading any TOML config file.",
        conflicts_with = "config",
        help_heading = "Project Setup"
    )]
    pub no_config: bool,
}

#[derive(Parser, Debug)]
#[command(
    name = "xsnap",
    author,
    version,
    about = "Serialize a codebase into a single text snapshot.",
    long_about = "xsnap walks a directory tree, filters out ignored and oversized files, converts notebooks \nto markdown, and writes an indented tree or a tagged structured document of the remaining \nsources, splitting it by token budget when it grows too large.",
    help_template = "{about-section}\nUsage: {usage}\n\n{all-args}{after-help}",
    after_help = "EXAMPLES:\n  xsnap generate . \n  xsnap generate ./project --format tree -o snapshot.txt\n  xsnap profile ./project --format json",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Increase message verbosity (-v, -vv).")]
    pub verbose: u8,

    #[arg(
        short,
        long,
        global = true,
        help = "Silence informational messages and warnings."
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    #[command(
        visible_alias = "g",
        visible_alias = "gen",
        about = "Walk a directory and write its snapshot document."
    )]
    Generate(GenerateArgs),

    #[command(
        visible_alias = "p",
        about = "Detect and print the project profile of a directory."
    )]
    Profile(ProfileArgs),

    #[command(about = "Print shell completion scripts.")]
    Completion(CompletionArgs),
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    #[arg(value_name = "DIR", help = "Root directory to snapshot.")]
    pub directory_path: PathBuf,

    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,

    #[arg(short = 'f', long, value_name = "FORMAT", value_parser = ["tree", "structured"], help = "Output shape [default: structured].", help_heading = "Output Control")]
    pub format: Option<String>,

    #[arg(
        short = 'o',
        long,
        value_name = "PATH",
        help = "Output file (default: codebase_structured.txt or codebase_tree.txt).",
        help_heading = "Output Control"
    )]
    pub output: Option<PathBuf>,

    #[arg(
        long,
        value_name = "TOKENS",
        help = "Token threshold above which the document is split into <output>.split<N> files.",
        help_heading = "Output Control"
    )]
    pub split_threshold: Option<usize>,

    #[arg(
        long,
        help = "Add a generation timestamp to the structured document.",
        help_heading = "Output Control"
    )]
    pub timestamp: bool,

    #[arg(
        long,
        value_name = "TOKENS",
        help = "Per-file token limit; larger files are listed without content.",
        help_heading = "Limits"
    )]
    pub token_limit: Option<usize>,

    #[arg(
        long,
        value_name = "SIZE",
        help = "Size above which .json files are excluded (e.g. 1048576, '1MiB').",
        help_heading = "Limits"
    )]
    pub json_size_threshold: Option<String>,

    #[arg(
        long,
        value_name = "SIZE",
        help = "Size above which any file is excluded (e.g. '10MiB').",
        help_heading = "Limits"
    )]
    pub max_file_size: Option<String>,

    #[arg(
        long,
        value_name = "DEPTH",
        conflicts_with = "no_depth_limit",
        help = "Maximum directory depth to descend.",
        help_heading = "Limits"
    )]
    pub max_depth: Option<usize>,

    #[arg(
        long,
        help = "Descend without a depth limit.",
        help_heading = "Limits"
    )]
    pub no_depth_limit: bool,

    #[arg(long = "exclude-extensions", value_name = "EXT", value_delimiter = ',', action = clap::ArgAction::Append, help = "Replace the excluded extension list (e.g. .csv,.bin).", help_heading = "Filtering")]
    pub exclude_extensions: Vec<String>,

    #[arg(long = "ignore-patterns", value_name = "PATTERN", action = clap::ArgAction::Append, help = "Replace the ignore pattern list. A trailing '/' matches a directory name exactly.", help_heading = "Filtering")]
    pub ignore_patterns: Vec<String>,

    #[arg(long = "ignore", value_name = "PATTERN", action = clap::ArgAction::Append, help = "Add an ignore pattern to the configured list.", help_heading = "Filtering")]
    pub extra_ignore: Vec<String>,

    #[arg(long, value_name = "NAME", value_parser = ["cl100k", "words"], help = "Token counting scheme [default: cl100k, estimated from length if it fails to load]. Naming cl100k explicitly makes a load failure fatal.", help_heading = "Limits")]
    pub tokenizer: Option<String>,

    #[arg(
        long,
        help = "Write a detailed log of every decision to the log file.",
        help_heading = "Logging"
    )]
    pub enable_logging: bool,

    #[arg(
        long,
        value_name = "PATH",
        help = "Log file used with --enable-logging [default: directory_processing.log].",
        help_heading = "Logging"
    )]
    pub log_file: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ProfileArgs {
    #[arg(value_name = "DIR", help = "Directory to inspect (default: current dir).")]
    pub directory_path: Option<PathBuf>,

    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,

    #[arg(short = 'f', long, value_name = "FORMAT", value_parser = ["text", "json"], default_value = "text", help = "Output format.")]
    pub format: String,
}

#[derive(Args, Debug, Clone)]
pub struct CompletionArgs {
    #[arg(
        value_name = "SHELL",
        help = "Shell to generate completions for (fish, bash, zsh, elvish, powershell)."
    )]
    pub shell: String,
}
