/*!
 * Directory and file scanning functionality
 */

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::encoding::read_text_file;
use crate::error::{ContextError, Result};
use crate::filter::{
    check_access, is_binary_extension, is_excluded_directory, is_within_size_limit,
    DEFAULT_MAX_FILE_SIZE_MB,
};
use crate::types::{FileEntry, IssueEntry, ScanResult, StructureEntry};

/// Reason recorded for directories from the exclusion set
pub const REASON_EXCLUDED: &str = "Excluded directory";
/// Reason recorded for files with a binary extension
pub const REASON_BINARY: &str = "Binary file";
/// Reason recorded for directories that cannot be listed
pub const REASON_ACCESS_DENIED: &str = "Access denied";
/// Reason recorded for symlinks that point at directories
pub const REASON_DIR_SYMLINK: &str = "Symbolic link to directory";
/// Reason recorded for symlinks whose target is missing
pub const REASON_BROKEN_SYMLINK: &str = "Broken symbolic link";

/// Scanner for directory contents
///
/// Traversal is single threaded and depth first. Within a directory,
/// subdirectories come before files and each group is ordered by lower-cased
/// name, so the same file system state always yields the same `structure`.
#[derive(Debug, Clone)]
pub struct Scanner {
    /// Files above this size (in megabytes) are skipped
    max_file_size_mb: u64,
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FILE_SIZE_MB)
    }
}

impl Scanner {
    /// Create a new scanner
    pub fn new(max_file_size_mb: u64) -> Self {
        Self { max_file_size_mb }
    }

    /// Scan `root` and return the resulting snapshot
    pub fn scan(&self, root: impl AsRef<Path>) -> Result<ScanResult> {
        let root = root.as_ref();
        if !root.exists() {
            return Err(ContextError::NotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(ContextError::NotADirectory(root.to_path_buf()));
        }

        let abs_path = fs::canonicalize(root)?;
        let mut result = ScanResult::new(abs_path.to_string_lossy());

        tracing::debug!("Scanning {}", abs_path.display());
        self.scan_directory(&abs_path, "", &mut result);
        tracing::debug!(
            "Scan of {} done: {} files, {} skipped, {} errors",
            abs_path.display(),
            result.files.len(),
            result.skipped.len(),
            result.errors.len()
        );

        Ok(result)
    }

    /// Record the contents of one directory, recursing into subdirectories
    fn scan_directory(&self, abs_path: &Path, rel_path: &str, result: &mut ScanResult) {
        if !check_access(abs_path) {
            result
                .errors
                .push(IssueEntry::new(display_path(rel_path), REASON_ACCESS_DENIED));
            return;
        }

        let mut entries = Vec::new();
        for item in WalkDir::new(abs_path)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
            .sort_by(sibling_order)
        {
            match item {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    let path = e
                        .path()
                        .map(|p| relative_to(p, abs_path, rel_path))
                        .unwrap_or_else(|| display_path(rel_path));
                    result
                        .errors
                        .push(IssueEntry::new(path, format!("Permission error: {}", e)));
                }
            }
        }

        for entry in entries {
            let name = entry.file_name().to_string_lossy().to_string();
            let entry_rel = join_rel(rel_path, &name);
            let file_type = entry.file_type();

            if file_type.is_dir() {
                if is_excluded_directory(&name) {
                    result.skipped.push(IssueEntry::new(entry_rel, REASON_EXCLUDED));
                    continue;
                }
                result
                    .structure
                    .push(StructureEntry::directory(entry_rel.clone()));
                self.scan_directory(entry.path(), &entry_rel, result);
            } else if file_type.is_symlink() {
                match fs::metadata(entry.path()) {
                    Ok(meta) if meta.is_dir() => {
                        result
                            .skipped
                            .push(IssueEntry::new(entry_rel, REASON_DIR_SYMLINK));
                    }
                    Ok(meta) if meta.is_file() => self.scan_file(entry.path(), entry_rel, result),
                    Ok(_) => {}
                    Err(e) => {
                        tracing::debug!("Broken link {}: {}", entry.path().display(), e);
                        result
                            .errors
                            .push(IssueEntry::new(entry_rel, REASON_BROKEN_SYMLINK));
                    }
                }
            } else if file_type.is_file() {
                self.scan_file(entry.path(), entry_rel, result);
            }
        }
    }

    /// Classify and read a single file
    fn scan_file(&self, abs_path: &Path, rel_path: String, result: &mut ScanResult) {
        result.structure.push(StructureEntry::file(rel_path.clone()));

        if is_binary_extension(abs_path) {
            result.skipped.push(IssueEntry::new(rel_path, REASON_BINARY));
            return;
        }

        if !is_within_size_limit(abs_path, self.max_file_size_mb) {
            result.skipped.push(IssueEntry::new(
                rel_path,
                format!("File too large (>{}MB)", self.max_file_size_mb),
            ));
            return;
        }

        match read_file_entry(abs_path, rel_path) {
            Ok(file) => result.files.push(file),
            Err(issue) => result.errors.push(issue),
        }
    }
}

/// Scan `root` with the given per-file size limit
pub fn scan_directory(root: impl AsRef<Path>, max_file_size_mb: u64) -> Result<ScanResult> {
    Scanner::new(max_file_size_mb).scan(root)
}

/// Immediate subdirectories of `path`, minus excluded ones, sorted by name.
/// Returns an empty list when `path` is not a directory.
pub fn list_subdirectories(path: impl AsRef<Path>) -> Vec<PathBuf> {
    let path = path.as_ref();
    if !path.is_dir() {
        return Vec::new();
    }

    WalkDir::new(path)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .filter(|e| !is_excluded_directory(&e.file_name().to_string_lossy()))
        .map(|e| e.into_path())
        .collect()
}

/// Every readable candidate file under `root`: excluded directories are not
/// entered and binary extensions are dropped. Paths are absolute and sorted.
pub fn collect_all_files(root: impl AsRef<Path>) -> Vec<PathBuf> {
    let root = root.as_ref();
    if !root.is_dir() {
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| {
            !(e.file_type().is_dir() && is_excluded_directory(&e.file_name().to_string_lossy()))
        })
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| !is_binary_extension(e.path()))
        .map(|e| e.into_path())
        .collect();

    files.sort();
    files
}

/// Build a result from an explicit set of files below `root`
///
/// Only the given files and their ancestor directories appear in the
/// structure. Files outside `root` or that cannot be read end up in `errors`.
pub fn scan_selected_files(files: &[PathBuf], root: impl AsRef<Path>) -> ScanResult {
    let root = root.as_ref();
    let abs_root = fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
    let mut result = ScanResult::new(abs_root.to_string_lossy());

    let mut selected: Vec<(Vec<String>, PathBuf)> = Vec::new();
    for file in files {
        let abs_file = if file.is_absolute() {
            file.clone()
        } else {
            abs_root.join(file)
        };
        let abs_file = fs::canonicalize(&abs_file).unwrap_or(abs_file);

        match abs_file.strip_prefix(&abs_root) {
            Ok(rel) if rel.components().next().is_some() => {
                let parts = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().to_string())
                    .collect();
                selected.push((parts, abs_file));
            }
            _ => result.errors.push(IssueEntry::new(
                file.to_string_lossy(),
                "Outside of root directory",
            )),
        }
    }

    selected.sort_by(|a, b| selection_order(&a.0, &b.0));
    selected.dedup_by(|a, b| a.0 == b.0);

    let mut seen_dirs: HashSet<String> = HashSet::new();
    for (parts, abs_file) in selected {
        let mut ancestor = String::new();
        for dir in &parts[..parts.len() - 1] {
            ancestor = join_rel(&ancestor, dir);
            if seen_dirs.insert(ancestor.clone()) {
                result.structure.push(StructureEntry::directory(ancestor.clone()));
            }
        }

        let rel_path = parts.join("/");
        result.structure.push(StructureEntry::file(rel_path.clone()));
        match read_file_entry(&abs_file, rel_path) {
            Ok(file) => result.files.push(file),
            Err(issue) => result.errors.push(issue),
        }
    }

    result
}

/// Keep files whose name ends with one of `extensions` (case-insensitive).
/// Extensions may be given with or without the leading dot.
pub fn filter_by_extensions(files: &[PathBuf], extensions: &[String]) -> Vec<PathBuf> {
    let suffixes: Vec<String> = extensions
        .iter()
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .map(|e| if e.starts_with('.') { e } else { format!(".{}", e) })
        .collect();

    files
        .iter()
        .filter(|f| {
            let name = file_name_lower(f);
            suffixes.iter().any(|s| name.ends_with(s.as_str()))
        })
        .cloned()
        .collect()
}

/// Keep files whose name contains `needle` (case-insensitive)
pub fn filter_by_name(files: &[PathBuf], needle: &str) -> Vec<PathBuf> {
    let needle = needle.to_lowercase();
    files
        .iter()
        .filter(|f| file_name_lower(f).contains(&needle))
        .cloned()
        .collect()
}

fn file_name_lower(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

fn read_file_entry(abs_path: &Path, rel_path: String) -> std::result::Result<FileEntry, IssueEntry> {
    match read_text_file(abs_path) {
        Ok(decoded) => Ok(FileEntry {
            path: rel_path,
            encoding: decoded.encoding,
            content: decoded.content,
        }),
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            Err(IssueEntry::new(rel_path, "Permission denied"))
        }
        Err(e) => Err(IssueEntry::new(rel_path, format!("Failed to read file: {}", e))),
    }
}

/// Directories first, then files; each group by lower-cased name
fn sibling_order(a: &DirEntry, b: &DirEntry) -> Ordering {
    let key = |e: &DirEntry| {
        let name = e.file_name().to_string_lossy().to_string();
        (!e.file_type().is_dir(), name.to_lowercase(), name)
    };
    key(a).cmp(&key(b))
}

/// Same ordering as [`sibling_order`] applied to split relative paths, where
/// a component followed by more components is a directory
fn selection_order(a: &[String], b: &[String]) -> Ordering {
    for (i, (x, y)) in a.iter().zip(b).enumerate() {
        if x == y {
            continue;
        }
        let x_file = i + 1 == a.len();
        let y_file = i + 1 == b.len();
        return (x_file, x.to_lowercase(), x).cmp(&(y_file, y.to_lowercase(), y));
    }
    a.len().cmp(&b.len())
}

fn join_rel(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

fn display_path(rel_path: &str) -> String {
    if rel_path.is_empty() {
        ".".to_string()
    } else {
        rel_path.to_string()
    }
}

fn relative_to(path: &Path, abs_dir: &Path, rel_dir: &str) -> String {
    match path.strip_prefix(abs_dir) {
        Ok(rest) if rest.components().next().is_some() => {
            join_rel(rel_dir, &rest.to_string_lossy().replace('\\', "/"))
        }
        _ => display_path(rel_dir),
    }
}
