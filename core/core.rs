pub mod chunking;
pub mod config;
pub mod error;
pub mod filter;
pub mod imports;
pub mod metadata;
pub mod notebook;
pub mod profile;
pub mod render;
pub mod snapshot;
pub mod tokens;
pub mod traverse;

pub use chunking::{SplitPlan, SplitSegment, plan_split, split_path, write_split};
pub use config::{Config, FilterConfig, OutputFormat, OutputSettings, RunConfig};
pub use error::{AppError, Result};
pub use filter::{ExclusionReason, IgnorePattern, should_ignore_path, should_include_file};
pub use imports::ImportTable;
pub use metadata::{FileKind, FileRecord};
pub use notebook::{Conversion, convert_notebook};
pub use profile::{ProjectProfile, detect_project_profile};
pub use render::{Marker, OutputStrategy, StructuredRenderer, TreeRenderer};
pub use snapshot::{SnapshotReport, run_snapshot};
pub use tokens::{TiktokenCounter, TokenCounter, WordCounter};
pub use traverse::{ExcludedFile, Traversal, TraversalOutcome};
