//! Intermediate files passed between pipeline stages.
//!
//! # Submodules
//!
//! - [`raw`]: the raw corpus blob written by `collect` and read by `structure`
//! - [`json`]: the structured record file written by `structure` and read by `load`
//!
//! # Output Structure
//!
//! ```text
//! data_dir/
//! ├── raw_blob.txt       # delimited corpus, see crate::corpus
//! └── structured.json    # JSON array of StructuredRecord
//! ```
//!
//! Both files are overwritten on every run.

pub mod json;
pub mod raw;

use std::path::{Path, PathBuf};

pub const RAW_BLOB_FILE: &str = "raw_blob.txt";
pub const STRUCTURED_FILE: &str = "structured.json";

pub fn raw_blob_path(data_dir: &str) -> PathBuf {
    Path::new(data_dir).join(RAW_BLOB_FILE)
}

pub fn structured_path(data_dir: &str) -> PathBuf {
    Path::new(data_dir).join(STRUCTURED_FILE)
}
