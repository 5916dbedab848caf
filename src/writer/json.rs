//! JSON report
//!
//! The only format where `include_tree` changes the schema: without a tree
//! the `structure` key is absent altogether.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{FileEntry, IssueEntry, ScanResult, StructureEntry};

/// Header block of a JSON report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonMetadata {
    /// RFC 3339 creation timestamp
    pub created_at: String,
    /// Absolute scan root
    pub root: String,
    pub total_files: usize,
    pub total_skipped: usize,
    pub total_errors: usize,
    /// Whether `structure` is present
    pub include_tree: bool,
}

/// A complete JSON report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonReport {
    pub metadata: JsonMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structure: Option<Vec<StructureEntry>>,
    pub files: Vec<FileEntry>,
    pub skipped: Vec<IssueEntry>,
    pub errors: Vec<IssueEntry>,
}

impl JsonReport {
    fn from_scan(scan: &ScanResult, include_tree: bool, generated_at: &DateTime<Local>) -> Self {
        Self {
            metadata: JsonMetadata {
                created_at: generated_at.to_rfc3339(),
                root: scan.root.clone(),
                total_files: scan.files.len(),
                total_skipped: scan.skipped.len(),
                total_errors: scan.errors.len(),
                include_tree,
            },
            structure: include_tree.then(|| scan.structure.clone()),
            files: scan.files.clone(),
            skipped: scan.skipped.clone(),
            errors: scan.errors.clone(),
        }
    }

    /// Rebuild a scan result; `structure` is empty when the report had none
    pub fn into_scan_result(self) -> ScanResult {
        ScanResult {
            root: self.metadata.root,
            structure: self.structure.unwrap_or_default(),
            files: self.files,
            skipped: self.skipped,
            errors: self.errors,
        }
    }
}

pub(super) fn render(
    scan: &ScanResult,
    include_tree: bool,
    generated_at: &DateTime<Local>,
) -> Result<String> {
    let report = JsonReport::from_scan(scan, include_tree, generated_at);
    Ok(serde_json::to_string_pretty(&report)?)
}

/// Parse a report previously written by the JSON writer
pub fn parse_json_report(input: &str) -> Result<JsonReport> {
    Ok(serde_json::from_str(input)?)
}
