/*!
 * Core types and data structures for context-builder
 */

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Kind of a structure entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Regular file (or symlink to one)
    File,
    /// Directory that was descended into
    Directory,
}

/// One file or directory encountered during traversal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureEntry {
    /// Relative path from scan root, `/` separated
    pub path: String,
    /// Entry kind
    #[serde(rename = "type")]
    pub kind: EntryKind,
}

impl StructureEntry {
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::File,
        }
    }

    pub fn directory(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::Directory,
        }
    }

    /// Number of path separators, i.e. the nesting depth below the root
    pub fn depth(&self) -> usize {
        self.path.matches('/').count()
    }

    /// Last path component
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// A file whose content was decoded successfully
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Relative path from scan root, `/` separated
    pub path: String,
    /// Name of the encoding the content was decoded with
    pub encoding: String,
    /// Decoded text content
    pub content: String,
}

impl FileEntry {
    /// Size of the content once encoded as UTF-8
    pub fn byte_len(&self) -> usize {
        self.content.len()
    }

    /// Extension of the file without the leading dot, empty if none
    pub fn extension(&self) -> &str {
        Path::new(&self.path)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
    }
}

/// A skipped entry or an error, with a human readable reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueEntry {
    /// Relative path from scan root, `/` separated
    pub path: String,
    /// Why the entry was skipped or failed
    pub reason: String,
}

impl IssueEntry {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// In-memory snapshot of a directory tree
///
/// `structure` is in traversal order and every entry's parent directory
/// appears before it, so renderers can rebuild the tree without sorting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    /// Absolute path of the scanned directory
    pub root: String,
    /// Files and directories in traversal order
    pub structure: Vec<StructureEntry>,
    /// Files that were read successfully
    pub files: Vec<FileEntry>,
    /// Binary, oversized and excluded entries
    pub skipped: Vec<IssueEntry>,
    /// Permission and decode failures
    pub errors: Vec<IssueEntry>,
}

impl ScanResult {
    /// Create an empty result for the given root
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    /// Number of directory entries in the structure
    pub fn directory_count(&self) -> usize {
        self.structure
            .iter()
            .filter(|e| e.kind == EntryKind::Directory)
            .count()
    }

    /// Total UTF-8 size of all file contents
    pub fn total_bytes(&self) -> usize {
        self.files.iter().map(FileEntry::byte_len).sum()
    }

    /// Name of the root directory (last path component)
    pub fn root_name(&self) -> String {
        Path::new(&self.root)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.root.clone())
    }
}
