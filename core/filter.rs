use crate::config::FilterConfig;
use globset::{Glob, GlobMatcher};
use log;
use std::fmt;
use std::path::{Component, Path};

#[derive(Debug, Clone)]
pub enum IgnorePattern {
    // Raw pattern ended with a separator: exact segment match on the stripped name.
    DirName(String),
    // Shell glob or plain substring match against a single segment.
    Segment {
        raw: String,
        glob: Option<GlobMatcher>,
    },
    // A file the run itself writes, plus its `.split<N>` segments.
    Artifact(String),
}

impl IgnorePattern {
    pub fn new(raw: &str) -> Self {
        if let Some(last) = raw.chars().last() {
            if std::path::is_separator(last) {
                let name = raw[..raw.len() - last.len_utf8()].to_string();
                return IgnorePattern::DirName(name);
            }
        }

        let glob = match Glob::new(raw) {
            Ok(glob) => Some(glob.compile_matcher()),
            Err(e) => {
                log::warn!(
                    "Ignore pattern \"{}\" is not a valid glob, using substring matching only: {}",
                    raw,
                    e
                );
                None
            }
        };
        IgnorePattern::Segment {
            raw: raw.to_string(),
            glob,
        }
    }

    pub fn artifact(name: &str) -> Self {
        IgnorePattern::Artifact(name.to_string())
    }

    pub fn as_str(&self) -> &str {
        match self {
            IgnorePattern::DirName(name) | IgnorePattern::Artifact(name) => name,
            IgnorePattern::Segment { raw, .. } => raw,
        }
    }

    pub fn matches_segment(&self, segment: &str) -> bool {
        match self {
            IgnorePattern::DirName(name) => segment == name,
            IgnorePattern::Segment { raw, glob } => {
                glob.as_ref().is_some_and(|g| g.is_match(segment)) || segment.contains(raw.as_str())
            }
            IgnorePattern::Artifact(name) => {
                segment == name
                    || segment
                        .strip_prefix(name.as_str())
                        .and_then(|rest| rest.strip_prefix(".split"))
                        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
            }
        }
    }
}

impl fmt::Display for IgnorePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IgnorePattern::DirName(name) => write!(f, "{}/", name),
            IgnorePattern::Segment { raw, .. } | IgnorePattern::Artifact(raw) => write!(f, "{}", raw),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExclusionReason {
    Extension,
    JsonSize,
    MaxSize,
}

impl ExclusionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExclusionReason::Extension => "extension",
            ExclusionReason::JsonSize => "json_size",
            ExclusionReason::MaxSize => "max_size",
        }
    }
}

pub fn should_ignore_path(path: &Path, patterns: &[IgnorePattern]) -> bool {
    matching_pattern(path, patterns).is_some()
}

pub fn matching_pattern<'a>(path: &Path, patterns: &'a [IgnorePattern]) -> Option<&'a IgnorePattern> {
    let segments: Vec<String> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    patterns
        .iter()
        .find(|pattern| segments.iter().any(|seg| pattern.matches_segment(seg)))
}

// A dotfile without a further dot (`.gitignore`) is its own extension.
pub fn extension_of(path: &Path) -> String {
    let Some(name) = path.file_name().map(|n| n.to_string_lossy()) else {
        return String::new();
    };
    match name.rfind('.') {
        Some(0) => name.to_lowercase(),
        Some(idx) => name[idx..].to_lowercase(),
        None => String::new(),
    }
}

pub fn exclusion_reason(path: &Path, size: u64, config: &FilterConfig) -> Option<ExclusionReason> {
    let ext = extension_of(path);

    if config.exclude_extensions.contains(&ext) {
        log::debug!("Excluded file due to extension: {}", path.display());
        return Some(ExclusionReason::Extension);
    }

    if ext == ".json" && size > config.json_size_threshold {
        log::debug!("Excluded JSON file due to size: {}", path.display());
        return Some(ExclusionReason::JsonSize);
    }

    if size > config.max_file_size {
        log::debug!("Excluded file due to size: {}", path.display());
        return Some(ExclusionReason::MaxSize);
    }

    None
}

pub fn should_include_file(path: &Path, size: u64, config: &FilterConfig) -> bool {
    exclusion_reason(path, size, config).is_none()
}

// The root itself is ".".
pub fn relative_path_string(path: &Path, root: &Path) -> String {
    let rel = pathdiff::diff_paths(path, root).unwrap_or_else(|| path.to_path_buf());
    let joined = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/");
    if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn patterns(raw: &[&str]) -> Vec<IgnorePattern> {
        raw.iter().map(|p| IgnorePattern::new(p)).collect()
    }

    #[test]
    fn test_dir_pattern_requires_exact_segment() {
        let pats = patterns(&["logs/"]);
        assert!(should_ignore_path(Path::new("app/logs/today.txt"), &pats));
        assert!(!should_ignore_path(Path::new("app/logs_old/today.txt"), &pats));
        assert!(!should_ignore_path(Path::new("app/catalogs"), &pats));
    }

    #[test]
    fn test_segment_pattern_matches_substring() {
        let pats = patterns(&["node_modules"]);
        assert!(should_ignore_path(Path::new("web/node_modules/lib.js"), &pats));
        assert!(should_ignore_path(Path::new("old_node_modules_copy"), &pats));
        assert!(!should_ignore_path(Path::new("src/main.py"), &pats));
    }

    #[test]
    fn test_segment_pattern_matches_glob() {
        let pats = patterns(&["results_2025*", "*.log"]);
        assert!(should_ignore_path(Path::new("results_2025_01/out.txt"), &pats));
        assert!(should_ignore_path(Path::new("run.log"), &pats));
        assert!(!should_ignore_path(Path::new("results_2024/out.txt"), &pats));
    }

    #[test]
    fn test_ancestor_segment_hides_subtree() {
        let pats = patterns(&["build"]);
        assert!(should_ignore_path(Path::new("a/b/build/c/d.rs"), &pats));
    }

    #[test]
    fn test_leading_separator_pattern_never_matches_segment() {
        let pats = patterns(&["/FastAPI"]);
        assert!(!should_ignore_path(Path::new("FastAPI/app.py"), &pats));
    }

    #[test]
    fn test_invalid_glob_falls_back_to_substring() {
        let pats = patterns(&["[oops"]);
        assert!(should_ignore_path(Path::new("x[oops].txt"), &pats));
        assert!(!should_ignore_path(Path::new("oops.txt"), &pats));
    }

    #[test]
    fn test_artifact_pattern_is_exact() {
        let pats = vec![IgnorePattern::artifact("out.txt")];
        assert!(should_ignore_path(Path::new("out.txt"), &pats));
        assert!(should_ignore_path(Path::new("out.txt.split2"), &pats));
        assert!(should_ignore_path(Path::new("out.txt.split17"), &pats));
        assert!(!should_ignore_path(Path::new("layout.txt"), &pats));
        assert!(!should_ignore_path(Path::new("checkout.txt"), &pats));
        assert!(!should_ignore_path(Path::new("out.txt.splitx"), &pats));
        assert!(!should_ignore_path(Path::new("out.txt.split"), &pats));
        assert!(!should_ignore_path(Path::new("out.txt.bak"), &pats));
    }

    #[test]
    fn test_matching_pattern_reports_first_hit() {
        let pats = patterns(&["dist", "vendor"]);
        let hit = matching_pattern(Path::new("vendor/dist/a.js"), &pats).unwrap();
        assert_eq!(hit.as_str(), "dist");
        assert_eq!(patterns(&["logs/"])[0].to_string(), "logs/");
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of(Path::new("a/b/Main.PY")), ".py");
        assert_eq!(extension_of(Path::new("archive.tar.gz")), ".gz");
        assert_eq!(extension_of(Path::new("Makefile")), "");
        assert_eq!(extension_of(Path::new(".gitignore")), ".gitignore");
    }

    #[test]
    fn test_inclusion_filter() {
        let config = FilterConfig {
            json_size_threshold: 1024 * 1024,
            max_file_size: 10 * 1024 * 1024,
            ..FilterConfig::default()
        };

        assert!(should_include_file(&PathBuf::from("src/main.py"), 500, &config));
        assert_eq!(
            exclusion_reason(Path::new("data.csv"), 10, &config),
            Some(ExclusionReason::Extension)
        );
        assert_eq!(
            exclusion_reason(Path::new("big.json"), 2 * 1024 * 1024, &config),
            Some(ExclusionReason::JsonSize)
        );
        assert!(should_include_file(Path::new("small.json"), 2048, &config));
        assert_eq!(
            exclusion_reason(Path::new("huge.txt"), 11 * 1024 * 1024, &config),
            Some(ExclusionReason::MaxSize)
        );
        assert_eq!(ExclusionReason::JsonSize.as_str(), "json_size");
    }

    #[test]
    fn test_relative_path_string() {
        let root = Path::new("/work/project");
        assert_eq!(
            relative_path_string(&root.join("src").join("main.py"), root),
            "src/main.py"
        );
        assert_eq!(relative_path_string(root, root), ".");
    }
}
