use crate::error::{AppError, Result};
use log;
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

pub const NOTEBOOK_EXTENSION: &str = ".ipynb";

#[derive(Debug, Deserialize)]
struct Notebook {
    #[serde(default)]
    cells: Vec<Cell>,
    #[serde(default)]
    metadata: NotebookMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct NotebookMetadata {
    #[serde(default)]
    language_info: Option<LanguageInfo>,
    #[serde(default)]
    kernelspec: Option<KernelSpec>,
}

#[derive(Debug, Deserialize)]
struct LanguageInfo {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KernelSpec {
    language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Cell {
    cell_type: String,
    #[serde(default)]
    source: MultilineText,
    #[serde(default)]
    outputs: Vec<Value>,
}

// nbformat stores text either as one string or as a list of lines.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MultilineText {
    One(String),
    Lines(Vec<String>),
}

impl Default for MultilineText {
    fn default() -> Self {
        MultilineText::One(String::new())
    }
}

impl MultilineText {
    fn joined(&self) -> String {
        match self {
            MultilineText::One(s) => s.clone(),
            MultilineText::Lines(lines) => lines.concat(),
        }
    }
}

fn text_of(value: &Value) -> Option<String> {
    serde_json::from_value::<MultilineText>(value.clone())
        .ok()
        .map(|t| t.joined())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    pub markdown_path: PathBuf,
    pub size: u64,
    pub reused: bool,
}

pub fn is_notebook(path: &Path) -> bool {
    crate::filter::extension_of(path) == NOTEBOOK_EXTENSION
}

pub fn markdown_path_for(notebook: &Path) -> PathBuf {
    notebook.with_extension("md")
}

pub fn notebook_to_markdown(json: &str) -> Result<String> {
    let notebook: Notebook = serde_json::from_str(json)?;
    let language = notebook
        .metadata
        .language_info
        .and_then(|l| l.name)
        .or_else(|| notebook.metadata.kernelspec.and_then(|k| k.language))
        .unwrap_or_default();

    let mut blocks: Vec<String> = Vec::with_capacity(notebook.cells.len());
    for cell in &notebook.cells {
        let source = cell.source.joined();
        match cell.cell_type.as_str() {
            "markdown" | "raw" => blocks.push(source.trim_end_matches('\n').to_string()),
            "code" => {
                let mut block = format!("```{}\n{}", language, source.trim_end_matches('\n'));
                block.push_str("\n```");
                for output in &cell.outputs {
                    if let Some(text) = output_text(output) {
                        block.push_str("\n\n");
                        block.push_str(&indent(&text));
                    }
                }
                blocks.push(block);
            }
            other => log::debug!("Skipping notebook cell of type '{}'", other),
        }
    }

    let mut markdown = blocks.join("\n\n");
    markdown.push('\n');
    Ok(markdown)
}

fn output_text(output: &Value) -> Option<String> {
    let text = match output.get("output_type").and_then(Value::as_str)? {
        "stream" => text_of(output.get("text")?)?,
        "execute_result" | "display_data" => text_of(output.get("data")?.get("text/plain")?)?,
        _ => return None,
    };
    let trimmed = text.trim_end_matches('\n');
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| format!("    {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_fresh(notebook: &Path, markdown: &Path) -> bool {
    let modified = |p: &Path| fs::metadata(p).and_then(|m| m.modified()).ok();
    match (modified(notebook), modified(markdown)) {
        (Some(nb), Some(md)) => md >= nb,
        _ => false,
    }
}

// Markdown not older than its notebook is reused as is.
pub fn convert_notebook(notebook: &Path) -> Result<Conversion> {
    let markdown_path = markdown_path_for(notebook);

    if is_fresh(notebook, &markdown_path) {
        log::debug!(
            "Reusing up-to-date markdown for notebook: {}",
            markdown_path.display()
        );
        let size = fs::metadata(&markdown_path)
            .map_err(|e| AppError::FileRead {
                path: markdown_path.clone(),
                source: e,
            })?
            .len();
        return Ok(Conversion {
            markdown_path,
            size,
            reused: true,
        });
    }

    log::info!("Converting notebook to markdown: {}", notebook.display());
    let json = fs::read_to_string(notebook).map_err(|e| AppError::FileRead {
        path: notebook.to_path_buf(),
        source: e,
    })?;
    let markdown = notebook_to_markdown(&json).map_err(|e| AppError::Notebook {
        path: notebook.to_path_buf(),
        reason: e.to_string(),
    })?;
    fs::write(&markdown_path, &markdown).map_err(|e| AppError::FileWrite {
        path: markdown_path.clone(),
        source: e,
    })?;
    log::info!("Notebook converted: {}", markdown_path.display());

    Ok(Conversion {
        markdown_path,
        size: markdown.len() as u64,
        reused: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const NOTEBOOK: &str = r##"{
  "cells": [
    {"cell_type": "markdown", "metadata": {}, "source": ["# Title\n", "Some text"]},
    {"cell_type": "code", "metadata": {}, "execution_count": 1,
     "source": "print('hi')",
     "outputs": [{"output_type": "stream", "name": "stdout", "text": ["hi\n"]}]},
    {"cell_type": "code", "metadata": {}, "execution_count": 2,
     "source": ["1 + 1"],
     "outputs": [{"output_type": "execute_result", "data": {"text/plain": "2"}, "metadata": {}}]}
  ],
  "metadata": {"language_info": {"name": "python"}},
  "nbformat": 4,
  "nbformat_minor": 5
}"##;

    #[test]
    fn test_notebook_to_markdown() {
        let md = notebook_to_markdown(NOTEBOOK).unwrap();
        assert_eq!(
            md,
            "# Title\nSome text\n\n```python\nprint('hi')\n```\n\n    hi\n\n```python\n1 + 1\n```\n\n    2\n"
        );
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(matches!(
            notebook_to_markdown("{not json"),
            Err(AppError::Json(_))
        ));
    }

    #[test]
    fn test_convert_writes_sibling_and_reuses_it() {
        let dir = TempDir::new().unwrap();
        let nb = dir.path().join("analysis.ipynb");
        fs::write(&nb, NOTEBOOK).unwrap();

        let first = convert_notebook(&nb).unwrap();
        assert_eq!(first.markdown_path, dir.path().join("analysis.md"));
        assert!(!first.reused);
        let written = fs::read_to_string(&first.markdown_path).unwrap();
        assert_eq!(first.size, written.len() as u64);

        let second = convert_notebook(&nb).unwrap();
        assert!(second.reused);
        assert_eq!(second.size, first.size);
        assert_eq!(fs::read_to_string(&second.markdown_path).unwrap(), written);
    }

    #[test]
    fn test_convert_failure_reports_notebook_error() {
        let dir = TempDir::new().unwrap();
        let nb = dir.path().join("broken.ipynb");
        fs::write(&nb, "garbage").unwrap();
        assert!(matches!(
            convert_notebook(&nb),
            Err(AppError::Notebook { .. })
        ));
        assert!(!dir.path().join("broken.md").exists());
    }
}
