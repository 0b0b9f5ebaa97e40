use crate::config::normalize_extension;
use crate::error::Result;
use log;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use std::collections::BTreeMap;

pub const MAX_RECORDED_IMPORTS: usize = 5;

const PYTHON: &[&str] = &[
    r"^import\s+([a-zA-Z_][a-zA-Z0-9_]*(?:\.[a-zA-Z_][a-zA-Z0-9_]*)*)",
    r"^from\s+([a-zA-Z_][a-zA-Z0-9_]*(?:\.[a-zA-Z_][a-zA-Z0-9_]*)*)\s+import",
];
const JAVASCRIPT: &[&str] = &[
    r#"^import.*from\s+['"]([^'"]+)['"]"#,
    r#"^const.*=\s*require\(['"]([^'"]+)['"]\)"#,
];
const GO: &[&str] = &[r#"^import\s+['"]([^'"]+)['"]"#];
const RUST: &[&str] = &[
    r"^\s*(?:pub\s+)?use\s+([^;{\s]+)",
    r"^\s*extern\s+crate\s+([a-zA-Z_][a-zA-Z0-9_]*)",
];
const JAVA: &[&str] = &[r"^import\s+(?:static\s+)?([a-zA-Z_][\w.]*(?:\.\*)?)\s*;"];

static BUILTIN: Lazy<ImportTable> = Lazy::new(|| {
    let mut table = ImportTable::empty();
    let groups: &[(&[&str], &[&str])] = &[
        (&[".py"], PYTHON),
        (&[".js", ".ts", ".jsx", ".tsx", ".mjs"], JAVASCRIPT),
        (&[".go"], GO),
        (&[".rs"], RUST),
        (&[".java"], JAVA),
    ];
    for (exts, patterns) in groups {
        for ext in exts.iter() {
            for pattern in patterns.iter() {
                if let Err(e) = table.add(ext, pattern) {
                    log::error!("Built-in import pattern for {} failed to compile: {}", ext, e);
                }
            }
        }
    }
    table
});

// Group 1 of each pattern is the import.
#[derive(Debug, Clone)]
pub struct ImportTable {
    patterns: BTreeMap<String, Vec<Regex>>,
}

impl Default for ImportTable {
    fn default() -> Self {
        BUILTIN.clone()
    }
}

impl ImportTable {
    pub fn empty() -> Self {
        Self {
            patterns: BTreeMap::new(),
        }
    }

    pub fn with_extra(extra: &BTreeMap<String, Vec<String>>) -> Result<Self> {
        let mut table = Self::default();
        for (ext, patterns) in extra {
            for pattern in patterns {
                table.add(ext, pattern)?;
            }
        }
        Ok(table)
    }

    pub fn add(&mut self, ext: &str, pattern: &str) -> Result<()> {
        let regex = RegexBuilder::new(pattern).multi_line(true).build()?;
        self.patterns
            .entry(normalize_extension(ext))
            .or_default()
            .push(regex);
        Ok(())
    }

    pub fn supports(&self, ext: &str) -> bool {
        self.patterns.contains_key(ext)
    }

    pub fn extract(&self, content: &str, ext: &str) -> Vec<String> {
        let Some(patterns) = self.patterns.get(ext) else {
            return Vec::new();
        };

        let mut found = Vec::new();
        for regex in patterns {
            for caps in regex.captures_iter(content) {
                if let Some(m) = caps.get(1) {
                    found.push(m.as_str().to_string());
                }
            }
        }
        log::trace!("Extracted {} import(s) for extension {}", found.len(), ext);
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_python_imports_pattern_order() {
        let table = ImportTable::default();
        let src = "from os import path\nimport sys\nimport json.decoder\n  import indented\n";
        assert_eq!(
            table.extract(src, ".py"),
            vec!["sys", "json.decoder", "os"]
        );
    }

    #[test]
    fn test_javascript_imports() {
        let table = ImportTable::default();
        let src = "import React from 'react';\nconst fs = require(\"fs\");\n";
        assert_eq!(table.extract(src, ".tsx"), vec!["react", "fs"]);
    }

    #[test]
    fn test_rust_and_go_imports() {
        let table = ImportTable::default();
        let src = "extern crate serde;\nuse std::fs;\npub use crate::config::{Config, OutputFormat};\n";
        assert_eq!(
            table.extract(src, ".rs"),
            vec!["std::fs", "crate::config::", "serde"]
        );
        assert_eq!(table.extract("import \"fmt\"\n", ".go"), vec!["fmt"]);
    }

    #[test]
    fn test_unknown_extension_yields_nothing() {
        let table = ImportTable::default();
        assert!(table.extract("import x", ".txt").is_empty());
        assert!(!table.supports(".txt"));
    }

    #[test]
    fn test_extra_patterns() {
        let mut extra = BTreeMap::new();
        extra.insert("KT".to_string(), vec![r"^import\s+([\w.]+)".to_string()]);
        let table = ImportTable::with_extra(&extra).unwrap();
        assert_eq!(table.extract("import kotlin.math\n", ".kt"), vec!["kotlin.math"]);

        let mut bad = BTreeMap::new();
        bad.insert(".kt".to_string(), vec!["(unclosed".to_string()]);
        assert!(matches!(
            ImportTable::with_extra(&bad),
            Err(crate::error::AppError::Regex(_))
        ));
    }
}
