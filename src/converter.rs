/*!
 * Re-export of a stored session in another format
 */

use std::path::{Path, PathBuf};

use crate::error::{ContextError, Result};
use crate::redactor::{RedactionFinding, Redactor};
use crate::session::{ModificationStatus, SessionStore};
use crate::writer::{export, ExportFormat};

/// Outcome of [`reconvert`]
#[derive(Debug, Clone)]
pub struct Reconverted {
    /// Newly written report
    pub report_path: PathBuf,
    /// Session record now pointing at the new report
    pub session_path: PathBuf,
    /// State of the previous report when the conversion started
    pub previous_report: Option<(PathBuf, ModificationStatus)>,
    /// Redaction findings for the new report, empty without a redactor
    pub findings: Vec<RedactionFinding>,
}

/// Re-export the scan stored in the session for `target`
///
/// The report lands in `output_dir`, else the session's output directory,
/// else the scan root. With a `redactor`, both the new report and the
/// session record that replaces the old one hold the redacted scan, and
/// later modification checks refer to the new report.
pub fn reconvert(
    store: &SessionStore,
    target: &Path,
    filename: &str,
    format: ExportFormat,
    output_dir: Option<&Path>,
    include_tree: bool,
    redactor: Option<&Redactor>,
) -> Result<Reconverted> {
    let record = store.load(target)?.ok_or_else(|| {
        ContextError::Session(format!("no session found for {}", target.display()))
    })?;

    let previous_report = match &record.report_path {
        Some(report) => {
            let report = PathBuf::from(report);
            let status = store.detect_modification(&report, target)?;
            if status == ModificationStatus::Modified {
                tracing::warn!("{} was edited after it was generated", report.display());
            }
            Some((report, status))
        }
        None => None,
    };

    let output_dir = output_dir
        .map(Path::to_path_buf)
        .or_else(|| record.output_dir.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(&record.scan_data.root));

    let (exported, findings) = match redactor {
        Some(redactor) => redactor.redact(&record.scan_data),
        None => (record.scan_data.clone(), Vec::new()),
    };

    let report_path = export(&exported, filename, format, Some(&output_dir), include_tree)?;
    let session_path = store.save(&exported, Some(&output_dir), Some(&report_path))?;

    Ok(Reconverted {
        report_path,
        session_path,
        previous_report,
        findings,
    })
}
