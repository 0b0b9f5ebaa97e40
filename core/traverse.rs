use crate::config::FilterConfig;
use crate::error::Result;
use crate::filter::{ExclusionReason, exclusion_reason, extension_of, matching_pattern, relative_path_string};
use crate::imports::{ImportTable, MAX_RECORDED_IMPORTS};
use crate::metadata::FileRecord;
use crate::notebook::{self, NOTEBOOK_EXTENSION};
use crate::render::{Entry, Marker, OutputStrategy};
use crate::tokens::TokenCounter;
use log;
use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcludedFile {
    pub rel_path: String,
    pub size: u64,
    pub reason: ExclusionReason,
}

#[derive(Debug, Clone, Default)]
pub struct TraversalOutcome {
    // Root-relative, in visit order.
    pub ignored: Vec<String>,
    pub excluded: Vec<ExcludedFile>,
    pub files_written: usize,
    pub token_limited: usize,
    pub notebooks_converted: usize,
    pub errors: usize,
}

pub struct Traversal<'a> {
    root: PathBuf,
    config: &'a FilterConfig,
    counter: &'a dyn TokenCounter,
    imports: &'a ImportTable,
    outcome: TraversalOutcome,
}

struct Candidate {
    path: PathBuf,
    name: String,
    rel_path: String,
    size: u64,
}

impl<'a> Traversal<'a> {
    pub fn new(
        root: &Path,
        config: &'a FilterConfig,
        counter: &'a dyn TokenCounter,
        imports: &'a ImportTable,
    ) -> Self {
        Self {
            root: root.to_path_buf(),
            config,
            counter,
            imports,
            outcome: TraversalOutcome::default(),
        }
    }

    // The caller owns the renderer's begin/end hooks.
    pub fn run(mut self, renderer: &mut dyn OutputStrategy) -> Result<TraversalOutcome> {
        log::info!("Processing directory structure: {}", self.root.display());
        let root = self.root.clone();
        self.walk_dir(&root, 0, renderer)?;
        log::debug!(
            "Traversal finished: {} written, {} excluded, {} ignored, {} errors",
            self.outcome.files_written,
            self.outcome.excluded.len(),
            self.outcome.ignored.len(),
            self.outcome.errors
        );
        Ok(self.outcome)
    }

    fn walk_dir(&mut self, dir: &Path, depth: usize, renderer: &mut dyn OutputStrategy) -> Result<()> {
        if let Some(max_depth) = self.config.max_depth {
            if depth > max_depth {
                log::debug!("Max depth reached: {}", dir.display());
                return Ok(());
            }
        }

        let rel_dir = relative_path_string(dir, &self.root);
        let dir_name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| rel_dir.clone());
        let dir_entry = Entry {
            name: &dir_name,
            rel_path: &rel_dir,
            depth,
            size: None,
        };

        let mut names: Vec<OsString> = match fs::read_dir(dir) {
            Ok(read_dir) => read_dir
                .filter_map(|entry| match entry {
                    Ok(entry) => Some(entry.file_name()),
                    Err(e) => {
                        log::error!("Error reading entry in {}: {}", dir.display(), e);
                        self.outcome.errors += 1;
                        None
                    }
                })
                .collect(),
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                log::error!("Permission denied accessing directory: {}", dir.display());
                self.outcome.errors += 1;
                return renderer.marker(dir_entry, Marker::PermissionDenied);
            }
            Err(e) => {
                log::error!("Error accessing directory {}: {}", dir.display(), e);
                self.outcome.errors += 1;
                return renderer.marker(dir_entry, Marker::DirectoryError);
            }
        };
        names.sort();

        let notebook_stems = self.live_notebook_stems(dir, &names);

        for name in names {
            let path = dir.join(&name);
            let name = name.to_string_lossy().into_owned();
            let rel_path = relative_path_string(&path, &self.root);
            let entry = Entry {
                name: &name,
                rel_path: &rel_path,
                depth,
                size: None,
            };

            let shadowed = extension_of(&path) == ".md" && stem_of(&path).is_some_and(|s| notebook_stems.contains(&s));

            if let Some(pattern) = matching_pattern(Path::new(&rel_path), &self.config.ignore_patterns) {
                if shadowed {
                    // Reported by the sibling notebook.
                    continue;
                }
                log::debug!("Ignored item due to pattern '{}': {}", pattern, path.display());
                renderer.marker(entry, Marker::Ignored)?;
                self.outcome.ignored.push(rel_path);
                continue;
            }

            let metadata = match fs::metadata(&path) {
                Ok(metadata) => metadata,
                Err(e) => {
                    log::error!("Cannot access file {}: {}", path.display(), e);
                    self.outcome.errors += 1;
                    renderer.marker(entry, Marker::AccessError)?;
                    continue;
                }
            };

            if metadata.is_dir() {
                renderer.enter_dir(entry)?;
                if path.is_symlink() {
                    log::debug!("Not following symlinked directory: {}", path.display());
                } else {
                    self.walk_dir(&path, depth + 1, renderer)?;
                }
                renderer.leave_dir(entry)?;
                continue;
            }

            if !metadata.is_file() {
                log::debug!("Skipping non-regular file: {}", path.display());
                renderer.marker(entry, Marker::NotRegularFile)?;
                continue;
            }

            if shadowed {
                log::debug!("Skipping markdown generated from sibling notebook: {}", path.display());
                continue;
            }

            let candidate = Candidate {
                path,
                name,
                rel_path,
                size: metadata.len(),
            };
            self.visit_file(candidate, depth, renderer)?;
        }

        Ok(())
    }

    fn visit_file(&mut self, mut file: Candidate, depth: usize, renderer: &mut dyn OutputStrategy) -> Result<()> {
        if notebook::is_notebook(&file.path) {
            let markdown_path = notebook::markdown_path_for(&file.path);
            let markdown_rel = relative_path_string(&markdown_path, &self.root);
            if let Some(pattern) = matching_pattern(Path::new(&markdown_rel), &self.config.ignore_patterns) {
                log::debug!(
                    "Ignored notebook markdown due to pattern '{}': {}",
                    pattern,
                    markdown_path.display()
                );
                let name = markdown_path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| markdown_rel.clone());
                let entry = Entry {
                    name: &name,
                    rel_path: &markdown_rel,
                    depth,
                    size: None,
                };
                renderer.marker(entry, Marker::Ignored)?;
                self.outcome.ignored.push(markdown_rel);
                return Ok(());
            }

            match notebook::convert_notebook(&file.path) {
                Ok(conversion) => {
                    if !conversion.reused {
                        self.outcome.notebooks_converted += 1;
                    }
                    file.name = conversion
                        .markdown_path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or(file.name);
                    file.rel_path = relative_path_string(&conversion.markdown_path, &self.root);
                    file.path = conversion.markdown_path;
                    file.size = conversion.size;
                }
                Err(e) => {
                    log::error!("Error converting notebook {}: {}", file.path.display(), e);
                    self.outcome.errors += 1;
                    let entry = Entry {
                        name: &file.name,
                        rel_path: &file.rel_path,
                        depth,
                        size: Some(file.size),
                    };
                    return renderer.marker(entry, Marker::ConversionFailed);
                }
            }
        }

        let entry = Entry {
            name: &file.name,
            rel_path: &file.rel_path,
            depth,
            size: Some(file.size),
        };

        if let Some(reason) = exclusion_reason(&file.path, file.size, self.config) {
            renderer.marker(entry, Marker::Excluded(reason))?;
            self.outcome.excluded.push(ExcludedFile {
                rel_path: file.rel_path,
                size: file.size,
                reason,
            });
            return Ok(());
        }

        let content = match fs::read_to_string(&file.path) {
            Ok(content) => content,
            Err(e) => {
                log::error!("Error processing file {}: {}", file.path.display(), e);
                self.outcome.errors += 1;
                return renderer.marker(entry, Marker::ProcessingFailed);
            }
        };

        let tokens = self.counter.count(&content);
        if tokens > self.config.token_limit {
            log::info!(
                "Content excluded due to token limit ({} > {}): {}",
                tokens,
                self.config.token_limit,
                file.path.display()
            );
            self.outcome.token_limited += 1;
            return renderer.marker(entry, Marker::TokenLimit);
        }

        let mut record = FileRecord::describe(&file.path, file.rel_path.clone(), file.size);
        record.imports = self.imports.extract(&content, &record.extension);
        record.imports.truncate(MAX_RECORDED_IMPORTS);
        record.content = Some(content);
        log::trace!("Writing {} ({} tokens)", record.rel_path, tokens);
        renderer.file_entry(&record, depth)?;
        self.outcome.files_written += 1;
        Ok(())
    }

    // Stems of notebooks in `names` that survive the ignore patterns.
    fn live_notebook_stems(&self, dir: &Path, names: &[OsString]) -> HashSet<String> {
        names
            .iter()
            .map(|name| dir.join(name))
            .filter(|path| extension_of(path) == NOTEBOOK_EXTENSION)
            .filter(|path| {
                let rel = relative_path_string(path, &self.root);
                matching_pattern(Path::new(&rel), &self.config.ignore_patterns).is_none()
            })
            .filter_map(|path| stem_of(&path))
            .collect()
    }
}

fn stem_of(path: &Path) -> Option<String> {
    path.file_stem().map(|s| s.to_string_lossy().into_owned())
}
