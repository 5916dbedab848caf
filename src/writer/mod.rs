/*!
 * Report writers for scan results
 *
 * Every format is a pure serialization of the same [`ScanResult`]; the
 * writers never sort, they rely on the traversal order of `structure`.
 */

mod json;
mod markdown;
mod pdf;
mod text;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Local};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use strum::EnumIter;

use crate::error::{ContextError, Result};
use crate::types::{EntryKind, ScanResult, StructureEntry};

pub use json::{parse_json_report, JsonMetadata, JsonReport};

/// Supported export formats
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, EnumIter, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Plain text
    Txt,
    /// Markdown
    Md,
    /// JSON
    Json,
    /// Paginated PDF
    Pdf,
}

impl Default for ExportFormat {
    fn default() -> Self {
        Self::Txt
    }
}

impl ExportFormat {
    /// File extension, identical to the format name
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Txt => "txt",
            Self::Md => "md",
            Self::Json => "json",
            Self::Pdf => "pdf",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = ContextError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "txt" => Ok(Self::Txt),
            "md" => Ok(Self::Md),
            "json" => Ok(Self::Json),
            "pdf" => Ok(Self::Pdf),
            _ => Err(ContextError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// Renders a scan result in one format
pub struct ReportWriter {
    format: ExportFormat,
    include_tree: bool,
    generated_at: DateTime<Local>,
}

impl ReportWriter {
    /// Create a new writer stamped with the current time
    pub fn new(format: ExportFormat, include_tree: bool) -> Self {
        Self {
            format,
            include_tree,
            generated_at: Local::now(),
        }
    }

    pub fn format(&self) -> ExportFormat {
        self.format
    }

    /// Render the report into memory
    pub fn render(&self, scan: &ScanResult) -> Result<Vec<u8>> {
        match self.format {
            ExportFormat::Txt => {
                Ok(text::render(scan, self.include_tree, &self.generated_at).into_bytes())
            }
            ExportFormat::Md => {
                Ok(markdown::render(scan, self.include_tree, &self.generated_at).into_bytes())
            }
            ExportFormat::Json => {
                Ok(json::render(scan, self.include_tree, &self.generated_at)?.into_bytes())
            }
            ExportFormat::Pdf => pdf::render(scan, self.include_tree, &self.generated_at),
        }
    }

    /// Render the report and write it to `path`
    pub fn write(&self, scan: &ScanResult, path: &Path) -> Result<()> {
        let bytes = self.render(scan)?;
        fs::write(path, bytes)?;
        Ok(())
    }
}

/// Export `scan` to `<output_dir>/<filename>.<ext>` and return the path
///
/// `output_dir` defaults to the scan root and must already exist. An
/// existing file with the same name is overwritten; conflict handling is
/// the caller's job (see [`crate::utils::resolve_filename`]).
pub fn export(
    scan: &ScanResult,
    filename: &str,
    format: ExportFormat,
    output_dir: Option<&Path>,
    include_tree: bool,
) -> Result<PathBuf> {
    let path = output_path(scan, filename, format, output_dir)?;
    ReportWriter::new(format, include_tree).write(scan, &path)?;
    tracing::debug!("Wrote {} report to {}", format, path.display());
    Ok(path)
}

/// Same as [`export`] with the format given by name
pub fn export_named(
    scan: &ScanResult,
    filename: &str,
    format: &str,
    output_dir: Option<&Path>,
    include_tree: bool,
) -> Result<PathBuf> {
    export(scan, filename, format.parse()?, output_dir, include_tree)
}

/// Resolve the target path of a report without writing anything
pub fn output_path(
    scan: &ScanResult,
    filename: &str,
    format: ExportFormat,
    output_dir: Option<&Path>,
) -> Result<PathBuf> {
    crate::ensure!(!filename.trim().is_empty(), InvalidArgument, "empty report file name");
    crate::ensure!(
        !filename.contains(['/', '\\']),
        InvalidArgument,
        "report file name must not contain path separators: {}",
        filename
    );

    let dir = match output_dir {
        Some(dir) => dir.to_path_buf(),
        None => PathBuf::from(&scan.root),
    };
    Ok(dir.join(format!("{}.{}", filename, format.extension())))
}

/// One line per structure entry, indented by depth
fn tree_lines(structure: &[StructureEntry], indent: &str, dir_mark: &str, file_mark: &str) -> Vec<String> {
    structure
        .iter()
        .map(|entry| {
            let pad = indent.repeat(entry.depth());
            match entry.kind {
                EntryKind::Directory => format!("{}{} {}/", pad, dir_mark, entry.name()),
                EntryKind::File => format!("{}{} {}", pad, file_mark, entry.name()),
            }
        })
        .collect()
}

fn timestamp(at: &DateTime<Local>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FileEntry, IssueEntry};
    use tempfile::tempdir;

    pub(crate) fn sample_scan(root: &str) -> ScanResult {
        let mut scan = ScanResult::new(root);
        scan.structure = vec![
            StructureEntry::directory("src"),
            StructureEntry::file("src/main.rs"),
            StructureEntry::file("README.md"),
            StructureEntry::file("logo.png"),
        ];
        scan.files = vec![
            FileEntry {
                path: "src/main.rs".to_string(),
                encoding: "utf-8".to_string(),
                content: "fn main() {\n    println!(\"hi\");\n}".to_string(),
            },
            FileEntry {
                path: "README.md".to_string(),
                encoding: "utf-8".to_string(),
                content: "# Demo\n```sh\ncargo run\n```".to_string(),
            },
        ];
        scan.skipped = vec![IssueEntry::new("logo.png", "Binary file")];
        scan.errors = vec![IssueEntry::new("secret", "Access denied")];
        scan
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("md".parse::<ExportFormat>().unwrap(), ExportFormat::Md);
        assert_eq!("PDF".parse::<ExportFormat>().unwrap(), ExportFormat::Pdf);
        assert!(matches!(
            "xml".parse::<ExportFormat>(),
            Err(ContextError::UnsupportedFormat(f)) if f == "xml"
        ));
        assert_eq!(ExportFormat::Json.to_string(), "json");
    }

    #[test]
    fn test_tree_lines_indent_by_depth() {
        let scan = sample_scan("/p");
        let lines = tree_lines(&scan.structure, "  ", "D", "F");
        assert_eq!(lines, vec!["D src/", "  F main.rs", "F README.md", "F logo.png"]);
    }

    #[test]
    fn test_export_writes_single_file_with_extension() -> Result<()> {
        let dir = tempdir()?;
        let scan = sample_scan("/p");
        for format in [ExportFormat::Txt, ExportFormat::Md, ExportFormat::Json, ExportFormat::Pdf] {
            let path = export(&scan, "report", format, Some(dir.path()), true)?;
            assert_eq!(path, dir.path().join(format!("report.{}", format.extension())));
            assert!(path.exists());
        }
        assert_eq!(fs::read_dir(dir.path())?.count(), 4);
        Ok(())
    }

    #[test]
    fn test_export_named_rejects_unknown_format() -> Result<()> {
        let dir = tempdir()?;
        let err = export_named(&sample_scan("/p"), "r", "docx", Some(dir.path()), true).unwrap_err();
        assert!(matches!(err, ContextError::UnsupportedFormat(_)));
        assert_eq!(fs::read_dir(dir.path())?.count(), 0);
        Ok(())
    }

    #[test]
    fn test_export_does_not_create_output_dir() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        let res = export(&sample_scan("/p"), "r", ExportFormat::Txt, Some(&missing), true);
        assert!(matches!(res, Err(ContextError::Io(_))));
        assert!(!missing.exists());
    }

    #[test]
    fn test_filename_validation() {
        let scan = sample_scan("/p");
        assert!(output_path(&scan, "", ExportFormat::Txt, None).is_err());
        assert!(output_path(&scan, "a/b", ExportFormat::Txt, None).is_err());
        assert_eq!(
            output_path(&scan, "r", ExportFormat::Md, None).unwrap(),
            PathBuf::from("/p/r.md")
        );
    }
}
