use crate::chunking::{SplitPlan, plan_split, remove_stale_segments, write_split};
use crate::config::{OutputFormat, RunConfig};
use crate::error::{AppError, Result};
use crate::imports::ImportTable;
use crate::profile::{ProjectProfile, detect_project_profile};
use crate::render::renderer_for;
use crate::tokens::TokenCounter;
use crate::traverse::{ExcludedFile, Traversal};
use log;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct SnapshotReport {
    pub output_path: PathBuf,
    pub total_tokens: usize,
    pub split_threshold: usize,
    pub split: SplitPlan,
    // Subset of `split` when some writes failed.
    pub split_written: Vec<PathBuf>,
    pub ignored: Vec<String>,
    pub excluded: Vec<ExcludedFile>,
    pub profile: Option<ProjectProfile>,
    pub files_written: usize,
    pub notebooks_converted: usize,
    pub errors: usize,
}

impl SnapshotReport {
    pub fn exceeds_threshold(&self) -> bool {
        self.total_tokens > self.split_threshold
    }
}

#[cfg(feature = "timestamps")]
fn generated_timestamp(enabled: bool) -> Option<String> {
    enabled.then(|| chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
}

#[cfg(not(feature = "timestamps"))]
fn generated_timestamp(enabled: bool) -> Option<String> {
    if enabled {
        log::warn!("Timestamps requested but the 'timestamps' feature is disabled.");
    }
    None
}

pub fn run_snapshot(root: &Path, config: &RunConfig, counter: &dyn TokenCounter) -> Result<SnapshotReport> {
    if !root.is_dir() {
        return Err(AppError::InvalidRoot {
            path: root.to_path_buf(),
            reason: "path is not a directory".to_string(),
        });
    }

    let filters = &config.filters;
    let imports = ImportTable::with_extra(&config.import_patterns)?;
    log::debug!("Counting tokens with {}", counter.name());

    let profile = match config.output.format {
        OutputFormat::Structured => Some(detect_project_profile(root, &filters.ignore_patterns)?),
        OutputFormat::Tree => None,
    };

    let output_path = config.output.path.clone();
    let file = File::create(&output_path).map_err(|e| AppError::FileWrite {
        path: output_path.clone(),
        source: e,
    })?;

    let outcome = {
        let mut renderer = renderer_for(
            config.output.format,
            BufWriter::new(file),
            generated_timestamp(config.output.include_timestamp),
        );
        renderer.begin(profile.as_ref().unwrap_or(&ProjectProfile::default()))?;
        let outcome = Traversal::new(root, filters, counter, &imports).run(renderer.as_mut())?;
        renderer.end()?;
        outcome
    };

    log::info!("Listing excluded files");
    for excluded in &outcome.excluded {
        log::info!(
            "Excluded: {} - {} bytes ({})",
            excluded.rel_path,
            excluded.size,
            excluded.reason.as_str()
        );
    }

    let document = fs::read_to_string(&output_path).map_err(|e| AppError::FileRead {
        path: output_path.clone(),
        source: e,
    })?;
    let total_tokens = counter.count(&document);
    log::info!("{}: {} tokens", output_path.display(), total_tokens);

    let stale = remove_stale_segments(&output_path);
    if stale > 0 {
        log::info!("Removed {} split files from a previous run", stale);
    }

    let mut split = SplitPlan::default();
    let mut split_written = Vec::new();
    if total_tokens > filters.split_threshold {
        log::info!("Output exceeds split threshold. Splitting into multiple files.");
        match plan_split(&document, filters.split_threshold, &output_path, counter) {
            Ok(plan) => {
                split_written = write_split(&plan);
                split = plan;
            }
            Err(e) => log::error!("Failed to split output: {}", e),
        }
    }

    log::info!("Processing complete");
    Ok(SnapshotReport {
        output_path,
        total_tokens,
        split_threshold: filters.split_threshold,
        split,
        split_written,
        ignored: outcome.ignored,
        excluded: outcome.excluded,
        profile,
        files_written: outcome.files_written,
        notebooks_converted: outcome.notebooks_converted,
        errors: outcome.errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::tokens::WordCounter;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn run_config(out: &Path, format: OutputFormat, split_threshold: usize) -> RunConfig {
        let mut config = Config::default();
        config.output.format = format;
        config.output.path = Some(out.to_path_buf());
        config.output.split_threshold = split_threshold;
        config.resolve().unwrap()
    }

    #[test]
    fn test_structured_scenario() {
        let project = TempDir::new().unwrap();
        let out_dir = TempDir::new().unwrap();
        write(project.path(), "src/main.py", "import os\nprint('main')\n");
        write(project.path(), "node_modules/lib.js", "LIB_BODY");
        write(project.path(), "requirements.txt", "requests\n");

        let out = out_dir.path().join("snap.txt");
        let report = run_snapshot(
            project.path(),
            &run_config(&out, OutputFormat::Structured, 1_000_000),
            &WordCounter,
        )
        .unwrap();

        let doc = fs::read_to_string(&out).unwrap();
        assert!(doc.starts_with("<codebase>\n<project type='python' language='python'>\n"));
        assert!(doc.contains(
            "<file path='src/main.py' size='24' ext='.py' kind='source' imports='os'>\n```\nimport os\nprint('main')\n```\n</file>\n"
        ));
        assert!(!doc.contains("LIB_BODY"));
        assert!(doc.ends_with("</files>\n</codebase>\n"));
        assert_eq!(report.ignored, vec!["node_modules"]);
        assert_eq!(report.total_tokens, WordCounter.count(&doc));
        assert!(report.split.is_empty());
        assert!(!crate::chunking::split_path(&out, 1).exists());
    }

    #[test]
    fn test_rerun_is_byte_identical() {
        let project = TempDir::new().unwrap();
        write(project.path(), "a.py", "x = 1\n");
        write(project.path(), "docs/guide.md", "guide\n");
        let out = project.path().join("codebase_tree.txt");
        let config = run_config(&out, OutputFormat::Tree, 1_000_000);

        run_snapshot(project.path(), &config, &WordCounter).unwrap();
        let first = fs::read_to_string(&out).unwrap();
        run_snapshot(project.path(), &config, &WordCounter).unwrap();
        let second = fs::read_to_string(&out).unwrap();
        assert_eq!(first, second);
        assert!(first.contains("├── codebase_tree.txt [Ignored]\n"));
    }

    #[test]
    fn test_split_when_over_threshold() {
        let project = TempDir::new().unwrap();
        let out_dir = TempDir::new().unwrap();
        for i in 0..5 {
            write(project.path(), &format!("f{}.txt", i), &"alpha beta gamma\n".repeat(4));
        }
        let out = out_dir.path().join("snap.txt");
        let report = run_snapshot(
            project.path(),
            &run_config(&out, OutputFormat::Tree, 20),
            &WordCounter,
        )
        .unwrap();

        assert!(report.exceeds_threshold());
        assert!(report.split.len() > 1);
        assert_eq!(report.split_written, report.split.file_names());
        let joined: String = report
            .split
            .file_names()
            .iter()
            .map(|p| fs::read_to_string(p).unwrap())
            .collect();
        assert_eq!(joined, fs::read_to_string(&out).unwrap());
    }

    #[test]
    fn test_rerun_under_threshold_removes_old_segments() {
        let project = TempDir::new().unwrap();
        let out_dir = TempDir::new().unwrap();
        for i in 0..5 {
            write(project.path(), &format!("f{}.txt", i), &"alpha beta gamma\n".repeat(4));
        }
        let out = out_dir.path().join("snap.txt");

        let first = run_snapshot(project.path(), &run_config(&out, OutputFormat::Tree, 10), &WordCounter).unwrap();
        assert!(first.split.len() > 2);

        let second = run_snapshot(project.path(), &run_config(&out, OutputFormat::Tree, 40), &WordCounter).unwrap();
        assert!(second.split.len() < first.split.len());
        assert!(!crate::chunking::split_path(&out, first.split.len()).exists());

        let third = run_snapshot(
            project.path(),
            &run_config(&out, OutputFormat::Tree, 1_000_000),
            &WordCounter,
        )
        .unwrap();
        assert!(third.split.is_empty());
        assert_eq!(fs::read_dir(out_dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_output_name_does_not_hide_similar_files() {
        let project = TempDir::new().unwrap();
        write(project.path(), "layout.txt", "LAYOUT_BODY\n");
        let out = project.path().join("out.txt");

        let report = run_snapshot(project.path(), &run_config(&out, OutputFormat::Tree, 1_000_000), &WordCounter).unwrap();
        let doc = fs::read_to_string(&out).unwrap();
        assert!(doc.contains("├── layout.txt\n  Content:\nLAYOUT_BODY\n"));
        assert_eq!(report.ignored, vec!["out.txt"]);
    }

    #[test]
    fn test_invalid_root() {
        let out_dir = TempDir::new().unwrap();
        let config = run_config(&out_dir.path().join("o.txt"), OutputFormat::Tree, 10);
        let err = run_snapshot(&out_dir.path().join("missing"), &config, &WordCounter).unwrap_err();
        assert!(matches!(err, AppError::InvalidRoot { .. }));
    }
}
