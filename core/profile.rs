use crate::error::{AppError, Result};
use crate::filter::{IgnorePattern, relative_path_string, should_ignore_path};
use log;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use walkdir::WalkDir;

pub mod markers;

pub const PROFILE_MAX_DIR_DEPTH: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectProfile {
    #[serde(rename = "type")]
    pub project_type: String,
    pub language: String,
    pub framework: Option<String>,
    pub entry_points: Vec<String>,
    pub dependency_files: Vec<String>,
    pub config_files: Vec<String>,
    pub build_files: Vec<String>,
    pub test_directories: Vec<String>,
}

impl Default for ProjectProfile {
    fn default() -> Self {
        Self {
            project_type: "unknown".to_string(),
            language: "mixed".to_string(),
            framework: None,
            entry_points: Vec::new(),
            dependency_files: Vec::new(),
            config_files: Vec::new(),
            build_files: Vec::new(),
            test_directories: Vec::new(),
        }
    }
}

impl ProjectProfile {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(AppError::Json)
    }
}

impl fmt::Display for ProjectProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Type:      {}", self.project_type)?;
        writeln!(f, "Language:  {}", self.language)?;
        writeln!(
            f,
            "Framework: {}",
            self.framework.as_deref().unwrap_or("none")
        )?;
        let sections = [
            ("Entry points", &self.entry_points),
            ("Dependency files", &self.dependency_files),
            ("Config files", &self.config_files),
            ("Build files", &self.build_files),
            ("Test directories", &self.test_directories),
        ];
        for (title, items) in sections {
            if items.is_empty() {
                continue;
            }
            writeln!(f, "{}:", title)?;
            for item in items {
                writeln!(f, "  {}", item)?;
            }
        }
        Ok(())
    }
}

// When several manifests are present the last one visited wins.
pub fn detect_project_profile(root: &Path, ignore: &[IgnorePattern]) -> Result<ProjectProfile> {
    log::debug!("Detecting project profile in: {}", root.display());
    let mut profile = ProjectProfile::default();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .max_depth(PROFILE_MAX_DIR_DEPTH + 1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0 || {
                let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
                !should_ignore_path(rel, ignore)
            }
        });

    for entry_result in walker {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => return Err(e.into()),
            Err(e) => {
                log::warn!("Skipping entry during project profiling: {}", e);
                continue;
            }
        };
        if entry.depth() == 0 {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        let rel = relative_path_string(entry.path(), root);

        if entry.file_type().is_dir() {
            if markers::is_test_dir(&name) {
                log::trace!("Profile: test directory {}", rel);
                profile.test_directories.push(rel);
            }
            continue;
        }

        if let Some((project_type, language)) = markers::manifest_kind(&name) {
            log::trace!("Profile: manifest {} -> {}/{}", rel, project_type, language);
            profile.project_type = project_type.to_string();
            profile.language = language.to_string();
            profile.dependency_files.push(rel.clone());
        }
        if let Some(framework) = markers::framework_marker(&name) {
            profile.framework = Some(framework.to_string());
        }
        if markers::is_config_file(&name) {
            profile.config_files.push(rel.clone());
        }
        if markers::is_entry_point(&name) {
            profile.entry_points.push(rel.clone());
        }
        if markers::is_build_file(&name) {
            profile.build_files.push(rel);
        }
    }

    log::info!(
        "Detected project type '{}' ({})",
        profile.project_type,
        profile.language
    );
    Ok(profile)
}
