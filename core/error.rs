use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AppError {
    #[error("Invalid directory: {path} ({reason})")]
    InvalidRoot { path: PathBuf, reason: String },

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("TOML Parsing Error: {0}")]
    TomlParse(String),

    #[error("JSON Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Filesystem Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File Read Error: Path '{path}', Error: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File Write Error: Path '{path}', Error: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Notebook Conversion Error: Path '{path}': {reason}")]
    Notebook { path: PathBuf, reason: String },

    #[error("WalkDir Error: {0}")]
    WalkDir(String),

    #[error("Regex Error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Invalid Argument: {0}")]
    InvalidArgument(String),

    #[error("Size Parsing Error: {0}")]
    SizeParse(String),

    #[error("TikToken Error: {0}")]
    TikToken(String),
}

impl From<walkdir::Error> for AppError {
    fn from(err: walkdir::Error) -> Self {
        AppError::WalkDir(err.to_string())
    }
}
