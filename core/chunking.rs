use crate::error::{AppError, Result};
use crate::tokens::TokenCounter;
use log;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitSegment {
    pub path: PathBuf,
    pub content: String,
    pub tokens: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitPlan {
    pub segments: Vec<SplitSegment>,
}

impl SplitPlan {
    pub fn file_names(&self) -> Vec<PathBuf> {
        self.segments.iter().map(|s| s.path.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }
}

pub fn split_path(output: &Path, part: usize) -> PathBuf {
    let mut name = OsString::from(output.as_os_str());
    name.push(format!(".split{}", part));
    PathBuf::from(name)
}

// A line larger than the threshold gets a segment of its own.
pub fn plan_split(
    document: &str,
    threshold: usize,
    output: &Path,
    counter: &dyn TokenCounter,
) -> Result<SplitPlan> {
    if threshold == 0 {
        return Err(AppError::InvalidArgument(
            "Split threshold must be greater than 0 tokens".to_string(),
        ));
    }

    let mut chunks: Vec<(String, usize)> = Vec::new();
    let mut current = String::new();
    let mut current_tokens: usize = 0;

    for unit in document.split_inclusive('\n') {
        let unit_tokens = counter.count(unit);

        if unit_tokens > threshold {
            log::trace!(
                "Line of {} tokens exceeds split threshold ({}), putting it in its own segment.",
                unit_tokens,
                threshold
            );
            if !current.is_empty() {
                chunks.push((std::mem::take(&mut current), current_tokens));
                current_tokens = 0;
            }
            chunks.push((unit.to_string(), unit_tokens));
            continue;
        }

        if !current.is_empty() && current_tokens.saturating_add(unit_tokens) > threshold {
            chunks.push((std::mem::take(&mut current), current_tokens));
            current_tokens = 0;
        }
        current.push_str(unit);
        current_tokens = current_tokens.saturating_add(unit_tokens);
    }

    if !current.is_empty() {
        chunks.push((current, current_tokens));
    }

    log::info!("Split content into {} segments.", chunks.len());

    let segments = chunks
        .into_iter()
        .enumerate()
        .map(|(i, (content, tokens))| SplitSegment {
            path: split_path(output, i + 1),
            content,
            tokens,
        })
        .collect();
    Ok(SplitPlan { segments })
}

// Stops at the first missing number.
pub fn remove_stale_segments(output: &Path) -> usize {
    let mut removed = 0;
    let mut part = 1;
    loop {
        let path = split_path(output, part);
        if !path.is_file() {
            break;
        }
        match fs::remove_file(&path) {
            Ok(()) => {
                log::debug!("Removed stale split file: {}", path.display());
                removed += 1;
            }
            Err(e) => {
                log::warn!("Failed to remove stale split file {}: {}", path.display(), e);
                break;
            }
        }
        part += 1;
    }
    removed
}

pub fn write_split(plan: &SplitPlan) -> Vec<PathBuf> {
    let mut written = Vec::with_capacity(plan.len());
    for segment in &plan.segments {
        match fs::write(&segment.path, &segment.content) {
            Ok(()) => {
                log::info!(
                    "Created split file: {} ({} tokens)",
                    segment.path.display(),
                    segment.tokens
                );
                written.push(segment.path.clone());
            }
            Err(e) => log::error!(
                "Failed to write split file {}: {}",
                segment.path.display(),
                e
            ),
        }
    }
    log::info!("Output split into {} files", written.len());
    written
}
