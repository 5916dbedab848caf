/*!
 * Utility functions for context-builder
 */

use std::path::Path;

use chrono::Local;

/// Format a human-readable file size
pub fn format_file_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}

/// `name` if `<dir>/<name>.<ext>` is still free, `None` on a conflict
pub fn resolve_filename(dir: &Path, name: &str, extension: &str) -> Option<String> {
    let candidate = dir.join(format!("{}.{}", name, extension));
    (!candidate.exists()).then(|| name.to_string())
}

/// First free `<name>_<N>` (N starting at 1) inside `dir`
pub fn unique_filename(dir: &Path, name: &str, extension: &str) -> String {
    (1..)
        .map(|n| format!("{}_{}", name, n))
        .find(|candidate| !dir.join(format!("{}.{}", candidate, extension)).exists())
        .unwrap_or_else(|| name.to_string())
}

/// Report name stamped with the current local time
pub fn default_report_name() -> String {
    Local::now().format("scan_%Y-%m-%d_%H-%M-%S").to_string()
}
