use crate::filter::extension_of;
use serde::Serialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Source,
    Config,
    Documentation,
    Script,
}

impl FileKind {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            ".py" | ".js" | ".ts" | ".go" | ".rs" | ".java" => Some(FileKind::Source),
            ".json" | ".yaml" | ".yml" | ".toml" | ".ini" => Some(FileKind::Config),
            ".md" | ".txt" | ".rst" => Some(FileKind::Documentation),
            ".sh" | ".bat" | ".ps1" => Some(FileKind::Script),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Source => "source",
            FileKind::Config => "config",
            FileKind::Documentation => "documentation",
            FileKind::Script => "script",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    // Root-relative, `/`-separated.
    pub rel_path: String,
    pub size: u64,
    pub extension: String,
    pub executable: bool,
    pub kind: Option<FileKind>,
    pub imports: Vec<String>,
    pub content: Option<String>,
}

impl FileRecord {
    pub fn describe(path: &Path, rel_path: String, size: u64) -> Self {
        let extension = extension_of(path);
        let kind = FileKind::from_extension(&extension);
        let executable = kind == Some(FileKind::Script) || has_exec_bit(path);
        FileRecord {
            rel_path,
            size,
            extension,
            executable,
            kind,
            imports: Vec::new(),
            content: None,
        }
    }

    pub fn name(&self) -> &str {
        self.rel_path.rsplit('/').next().unwrap_or(&self.rel_path)
    }
}

#[cfg(unix)]
fn has_exec_bit(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn has_exec_bit(_path: &Path) -> bool {
    false
}
