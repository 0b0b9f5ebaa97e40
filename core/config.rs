use crate::error::{AppError, Result};
use crate::filter::{IgnorePattern, extension_of};
use byte_unit::Byte;
use log;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_CONFIG_DIR: &str = ".xtools/xsnap";
pub const DEFAULT_CONFIG_FILENAME: &str = "xsnap.toml";
pub const DEFAULT_STRUCTURED_OUTPUT: &str = "codebase_structured.txt";
pub const DEFAULT_TREE_OUTPUT: &str = "codebase_tree.txt";
pub const DEFAULT_LOG_FILE: &str = "directory_processing.log";
pub const DEFAULT_TOKEN_LIMIT: usize = 10_000;
pub const DEFAULT_JSON_SIZE_THRESHOLD: u64 = 1024 * 1024;
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;
pub const DEFAULT_MAX_DEPTH: usize = 10;
pub const DEFAULT_SPLIT_THRESHOLD: usize = 1_000_000;

pub const DEFAULT_EXCLUDE_EXTENSIONS: &[&str] = &[
    ".csv",
    ".pt",
    ".pkl",
    ".bin",
    ".h5",
    ".parquet",
    ".gitignore",
    ".zip",
    ".exe",
    ".dll",
    ".so",
];

pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    ".env",
    ".git",
    ".history",
    ".idea",
    ".jest",
    ".pytest_cache",
    ".venv",
    ".vscode",
    "__pycache__",
    "assets",
    "bin",
    "bower_components",
    "build",
    "coverage",
    "dist",
    "document",
    "generated",
    "graphics",
    "images",
    "media",
    "migrations",
    "misc_docs",
    "node_modules",
    "obj",
    "packages",
    "public",
    "staticfiles",
    "tabs",
    "target",
    "test-results/",
    "LEGACY/",
    "/FastAPI",
    "SESSION_HANDOVER/",
    "utility_scripts/",
    "logs/",
    "staticfiles/",
    "vendor",
    "venv",
    "BUGS/",
    "TODO/",
    "TUTORIALS/",
    "QUIZ_COLLECTIONS/",
    "package-lock.json",
    "HTML_OUTPUT",
    "results_2025*",
];

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Tree,
    #[default]
    Structured,
}

impl OutputFormat {
    pub fn default_output_file(&self) -> &'static str {
        match self {
            OutputFormat::Tree => DEFAULT_TREE_OUTPUT,
            OutputFormat::Structured => DEFAULT_STRUCTURED_OUTPUT,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum SizeSetting {
    Bytes(u64),
    Text(String),
}

impl SizeSetting {
    pub fn to_bytes(&self) -> Result<u64> {
        match self {
            SizeSetting::Bytes(n) => Ok(*n),
            SizeSetting::Text(s) => parse_size(s),
        }
    }
}

pub fn parse_size(value: &str) -> Result<u64> {
    let byte = Byte::from_str(value.trim()).map_err(|e| {
        AppError::SizeParse(format!(
            "Invalid size '{}': {}. Use bytes or units like KB, MiB.",
            value, e
        ))
    })?;
    Ok(byte.as_u64())
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub filters: FiltersConfig,
    #[serde(default)]
    pub traversal: TraversalConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub imports: ImportsConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FiltersConfig {
    #[serde(default = "default_exclude_extensions")]
    pub exclude_extensions: Vec<String>,
    #[serde(default = "default_ignore_patterns")]
    pub ignore_patterns: Vec<String>,
    #[serde(default)]
    pub extra_ignore_patterns: Vec<String>,
    #[serde(default = "default_json_size_threshold")]
    pub json_size_threshold: SizeSetting,
    #[serde(default = "default_max_file_size")]
    pub max_file_size: SizeSetting,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TraversalConfig {
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_true")]
    pub limit_depth: bool,
    #[serde(default = "default_token_limit")]
    pub token_limit: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_split_threshold")]
    pub split_threshold: usize,
    #[serde(default = "default_false")]
    pub include_timestamp: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    #[serde(default = "default_false")]
    pub enabled: bool,
    #[serde(default = "default_log_file")]
    pub file: PathBuf,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct ImportsConfig {
    #[serde(flatten, default)]
    pub patterns: BTreeMap<String, Vec<String>>,
}

fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_exclude_extensions() -> Vec<String> {
    DEFAULT_EXCLUDE_EXTENSIONS.iter().map(|s| s.to_string()).collect()
}
fn default_ignore_patterns() -> Vec<String> {
    DEFAULT_IGNORE_PATTERNS.iter().map(|s| s.to_string()).collect()
}
fn default_json_size_threshold() -> SizeSetting {
    SizeSetting::Bytes(DEFAULT_JSON_SIZE_THRESHOLD)
}
fn default_max_file_size() -> SizeSetting {
    SizeSetting::Bytes(DEFAULT_MAX_FILE_SIZE)
}
fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}
fn default_token_limit() -> usize {
    DEFAULT_TOKEN_LIMIT
}
fn default_split_threshold() -> usize {
    DEFAULT_SPLIT_THRESHOLD
}
fn default_log_file() -> PathBuf {
    PathBuf::from(DEFAULT_LOG_FILE)
}

impl Default for FiltersConfig {
    fn default() -> Self {
        Self {
            exclude_extensions: default_exclude_extensions(),
            ignore_patterns: default_ignore_patterns(),
            extra_ignore_patterns: Vec::new(),
            json_size_threshold: default_json_size_threshold(),
            max_file_size: default_max_file_size(),
        }
    }
}
impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            limit_depth: default_true(),
            token_limit: default_token_limit(),
        }
    }
}
impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            path: None,
            split_threshold: default_split_threshold(),
            include_timestamp: default_false(),
        }
    }
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_false(),
            file: default_log_file(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FilterConfig {
    pub exclude_extensions: BTreeSet<String>,
    pub json_size_threshold: u64,
    pub max_file_size: u64,
    pub ignore_patterns: Vec<IgnorePattern>,
    // None disables depth limiting.
    pub max_depth: Option<usize>,
    pub token_limit: usize,
    pub split_threshold: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            exclude_extensions: DEFAULT_EXCLUDE_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            json_size_threshold: DEFAULT_JSON_SIZE_THRESHOLD,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            ignore_patterns: DEFAULT_IGNORE_PATTERNS
                .iter()
                .map(|p| IgnorePattern::new(p))
                .collect(),
            max_depth: Some(DEFAULT_MAX_DEPTH),
            token_limit: DEFAULT_TOKEN_LIMIT,
            split_threshold: DEFAULT_SPLIT_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutputSettings {
    pub format: OutputFormat,
    pub path: PathBuf,
    pub include_timestamp: bool,
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub filters: FilterConfig,
    pub output: OutputSettings,
    pub import_patterns: BTreeMap<String, Vec<String>>,
}

impl Config {
    pub fn determine_project_root(cli_project_root: Option<&PathBuf>) -> Result<PathBuf> {
        let path_to_resolve = match cli_project_root {
            Some(p) => PathBuf::from(shellexpand::tilde(&p.to_string_lossy()).as_ref()),
            None => env::current_dir().map_err(AppError::Io)?,
        };

        if !path_to_resolve.exists() {
            return Err(AppError::InvalidRoot {
                path: path_to_resolve,
                reason: "directory does not exist".to_string(),
            });
        }
        if !path_to_resolve.is_dir() {
            return Err(AppError::InvalidRoot {
                path: path_to_resolve,
                reason: "path is not a directory".to_string(),
            });
        }

        path_to_resolve
            .canonicalize()
            .map_err(|e| AppError::InvalidRoot {
                path: path_to_resolve.clone(),
                reason: format!("failed to canonicalize: {}", e),
            })
    }

    pub fn resolve_config_path(
        project_root: &Path,
        cli_config_file: Option<&PathBuf>,
        cli_disable_config: bool,
    ) -> Result<Option<PathBuf>> {
        if cli_disable_config {
            log::debug!("Config file loading disabled via CLI flag.");
            return Ok(None);
        }

        match cli_config_file {
            Some(p) => {
                let path = PathBuf::from(shellexpand::tilde(&p.to_string_lossy()).as_ref());
                if !path.exists() {
                    return Err(AppError::Config(format!(
                        "Specified config file not found at path: {}",
                        path.display()
                    )));
                }
                log::debug!("Using specified config file path: {}", path.display());
                Ok(Some(path))
            }
            None => {
                let default_path = project_root
                    .join(DEFAULT_CONFIG_DIR)
                    .join(DEFAULT_CONFIG_FILENAME);
                if default_path.exists() {
                    log::debug!("Using default config file path: {}", default_path.display());
                    Ok(Some(default_path))
                } else {
                    log::debug!(
                        "No config file specified and default not found at: {}",
                        default_path.display()
                    );
                    Ok(None)
                }
            }
        }
    }

    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        log::info!("Loading configuration from: {}", config_path.display());
        let toml_content = fs::read_to_string(config_path).map_err(|e| AppError::FileRead {
            path: config_path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml_str(&toml_content).map_err(|e| match e {
            AppError::TomlParse(msg) => AppError::TomlParse(format!(
                "Error parsing config file '{}': {}",
                config_path.display(),
                msg
            )),
            other => other,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str::<Config>(content).map_err(|e| AppError::TomlParse(e.to_string()))
    }

    pub fn output_path(&self) -> PathBuf {
        self.output
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from(self.output.format.default_output_file()))
    }

    // Output file, its split segments and the log file are ignored by exact name.
    pub fn resolve(&self) -> Result<RunConfig> {
        if self.output.split_threshold == 0 {
            return Err(AppError::InvalidArgument(
                "Split threshold must be greater than 0 tokens".to_string(),
            ));
        }

        let output_path = PathBuf::from(
            shellexpand::tilde(&self.output_path().to_string_lossy()).as_ref(),
        );

        let mut ignore_patterns: Vec<IgnorePattern> = self
            .filters
            .ignore_patterns
            .iter()
            .chain(self.filters.extra_ignore_patterns.iter())
            .map(|p| IgnorePattern::new(p))
            .collect();
        let mut artifact_names: Vec<String> = Vec::new();
        for artifact in [output_path.as_path(), self.logging.file.as_path()] {
            if let Some(name) = artifact.file_name().map(|n| n.to_string_lossy().into_owned()) {
                if !artifact_names.contains(&name) {
                    log::trace!("Ignoring run artifact by name: {}", name);
                    ignore_patterns.push(IgnorePattern::artifact(&name));
                    artifact_names.push(name);
                }
            }
        }

        let exclude_extensions = self
            .filters
            .exclude_extensions
            .iter()
            .map(|e| normalize_extension(e))
            .filter(|e| !e.is_empty())
            .collect();

        let filters = FilterConfig {
            exclude_extensions,
            json_size_threshold: self.filters.json_size_threshold.to_bytes()?,
            max_file_size: self.filters.max_file_size.to_bytes()?,
            ignore_patterns,
            max_depth: self.traversal.limit_depth.then_some(self.traversal.max_depth),
            token_limit: self.traversal.token_limit,
            split_threshold: self.output.split_threshold,
        };
        log::debug!(
            "Resolved filters: {} excluded extensions, {} ignore patterns, depth limit {:?}",
            filters.exclude_extensions.len(),
            filters.ignore_patterns.len(),
            filters.max_depth
        );

        Ok(RunConfig {
            filters,
            output: OutputSettings {
                format: self.output.format,
                path: output_path,
                include_timestamp: self.output.include_timestamp,
            },
            import_patterns: self
                .imports
                .patterns
                .iter()
                .map(|(ext, pats)| (normalize_extension(ext), pats.clone()))
                .collect(),
        })
    }
}

pub fn normalize_extension(ext: &str) -> String {
    let trimmed = ext.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.starts_with('.') {
        trimmed.to_lowercase()
    } else {
        extension_of(Path::new(&format!(".{}", trimmed)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let run = Config::default().resolve().unwrap();
        assert_eq!(run.filters.token_limit, 10_000);
        assert_eq!(run.filters.json_size_threshold, 1024 * 1024);
        assert_eq!(run.filters.max_file_size, 10 * 1024 * 1024);
        assert_eq!(run.filters.max_depth, Some(10));
        assert_eq!(run.filters.split_threshold, 1_000_000);
        assert_eq!(run.output.format, OutputFormat::Structured);
        assert_eq!(run.output.path, PathBuf::from(DEFAULT_STRUCTURED_OUTPUT));
        assert!(run.filters.exclude_extensions.contains(".csv"));
    }

    #[test]
    fn test_run_artifacts_are_ignored() {
        let run = Config::default().resolve().unwrap();
        let raw: Vec<&str> = run.filters.ignore_patterns.iter().map(|p| p.as_str()).collect();
        assert!(raw.contains(&DEFAULT_STRUCTURED_OUTPUT));
        assert!(raw.contains(&DEFAULT_LOG_FILE));

        let mut config = Config::default();
        config.output.path = Some(PathBuf::from("out.txt"));
        let run = config.resolve().unwrap();
        let hides = |p: &str| crate::filter::should_ignore_path(Path::new(p), &run.filters.ignore_patterns);
        assert!(hides("out.txt"));
        assert!(hides("out.txt.split1"));
        assert!(!hides("layout.txt"));
        assert!(!hides("checkout.txt"));
    }

    #[test]
    fn test_toml_overrides_and_sizes() {
        let config = Config::from_toml_str(
            r#"
[filters]
exclude_extensions = ["CSV", "log"]
extra_ignore_patterns = ["fixtures/"]
json_size_threshold = "2 KiB"
max_file_size = 4096

[traversal]
limit_depth = false
token_limit = 50

[output]
format = "tree"
split_threshold = 100

[imports]
".kt" = ['^import\s+([\w.]+)']
"#,
        )
        .unwrap();

        let run = config.resolve().unwrap();
        assert_eq!(run.filters.json_size_threshold, 2048);
        assert_eq!(run.filters.max_file_size, 4096);
        assert_eq!(run.filters.max_depth, None);
        assert_eq!(run.filters.token_limit, 50);
        assert_eq!(run.output.format, OutputFormat::Tree);
        assert_eq!(run.output.path, PathBuf::from(DEFAULT_TREE_OUTPUT));
        assert!(run.filters.exclude_extensions.contains(".csv"));
        assert!(run.filters.exclude_extensions.contains(".log"));
        assert!(run.import_patterns.contains_key(".kt"));
        assert!(
            run.filters
                .ignore_patterns
                .iter()
                .any(|p| p.to_string() == "fixtures/")
        );
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let err = Config::from_toml_str("[filters]\nbogus = 1\n").unwrap_err();
        assert!(matches!(err, AppError::TomlParse(_)));
    }

    #[test]
    fn test_zero_split_threshold_rejected() {
        let mut config = Config::default();
        config.output.split_threshold = 0;
        assert!(matches!(
            config.resolve(),
            Err(AppError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_bad_size_string() {
        assert!(matches!(parse_size("lots"), Err(AppError::SizeParse(_))));
        assert_eq!(parse_size("1MB").unwrap(), 1_000_000);
        assert_eq!(parse_size("1 MiB").unwrap(), 1024 * 1024);
    }

    #[test]
    fn test_determine_project_root() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("file.txt");
        fs::write(&file, "x").unwrap();

        assert!(Config::determine_project_root(Some(&dir.path().to_path_buf())).is_ok());
        assert!(matches!(
            Config::determine_project_root(Some(&file)),
            Err(AppError::InvalidRoot { .. })
        ));
        assert!(matches!(
            Config::determine_project_root(Some(&dir.path().join("missing"))),
            Err(AppError::InvalidRoot { .. })
        ));
    }

    #[test]
    fn test_resolve_config_path() {
        let dir = TempDir::new().unwrap();
        assert!(
            Config::resolve_config_path(dir.path(), None, false)
                .unwrap()
                .is_none()
        );

        let config_dir = dir.path().join(DEFAULT_CONFIG_DIR);
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(config_dir.join(DEFAULT_CONFIG_FILENAME), "[traversal]\ntoken_limit = 7\n").unwrap();

        let found = Config::resolve_config_path(dir.path(), None, false)
            .unwrap()
            .unwrap();
        let config = Config::load_from_path(&found).unwrap();
        assert_eq!(config.traversal.token_limit, 7);

        assert!(
            Config::resolve_config_path(dir.path(), None, true)
                .unwrap()
                .is_none()
        );
        assert!(
            Config::resolve_config_path(dir.path(), Some(&dir.path().join("nope.toml")), false)
                .is_err()
        );
    }

    #[test]
    fn test_normalize_extension() {
        assert_eq!(normalize_extension("PY"), ".py");
        assert_eq!(normalize_extension(".Json"), ".json");
        assert_eq!(normalize_extension("  "), "");
    }
}
