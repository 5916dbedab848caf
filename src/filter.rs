/*!
 * Path classification: binary extensions, excluded directories and size limits
 */

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;

/// Name of the legacy per-directory session folder
pub const SESSION_DIR_NAME: &str = ".context_builder";

/// Default per-file size limit in megabytes
pub const DEFAULT_MAX_FILE_SIZE_MB: u64 = 10;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Directories that are never descended into
pub static EXCLUDED_DIRECTORIES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // Version Control
        ".git",
        ".svn",
        ".hg",
        // Virtual environments
        ".venv",
        "venv",
        // Dependency caches
        "__pycache__",
        "node_modules",
        // IDEs & Editors
        ".idea",
        ".vs",
        ".vscode",
        // Our own session storage
        SESSION_DIR_NAME,
    ]
    .into_iter()
    .collect()
});

/// Extensions (lower case, without dot) whose files are never read
pub static BINARY_EXTENSIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // Executables & libraries
        "exe", "dll", "so", "dylib",
        // Images
        "png", "jpg", "jpeg", "gif", "bmp", "ico", "webp", "svg",
        // Audio
        "mp3", "wav", "flac", "aac", "ogg",
        // Video
        "mp4", "avi", "mkv", "mov", "wmv",
        // Archives
        "zip", "rar", "7z", "tar", "gz", "bz2",
        // Documents
        "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx",
        // Databases
        "db", "sqlite", "sqlite3",
        // Compiled objects
        "pyc", "pyo", "class", "o", "obj",
        // Fonts
        "woff", "woff2", "ttf", "eot",
    ]
    .into_iter()
    .collect()
});

/// Whether the file's extension is in the binary set (case-insensitive)
pub fn is_binary_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            BINARY_EXTENSIONS.contains(ext.to_string_lossy().to_lowercase().as_str())
        })
        .unwrap_or(false)
}

/// Whether a directory with this name must be skipped
pub fn is_excluded_directory(name: &str) -> bool {
    EXCLUDED_DIRECTORIES.contains(name)
}

/// Whether the file size is at most `max_size_mb` megabytes
///
/// Files whose metadata cannot be read are reported as outside the limit.
pub fn is_within_size_limit(path: &Path, max_size_mb: u64) -> bool {
    match fs::metadata(path) {
        Ok(meta) => meta.len() <= max_size_mb.saturating_mul(BYTES_PER_MB),
        Err(_) => false,
    }
}

/// Whether a path exists and its contents can be listed (directories) or
/// opened (files) by the current process
pub fn check_access(path: &Path) -> bool {
    if path.is_dir() {
        fs::read_dir(path).is_ok()
    } else {
        fs::File::open(path).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_binary_extension_is_case_insensitive() {
        assert!(is_binary_extension(Path::new("logo.PNG")));
        assert!(is_binary_extension(Path::new("dir/archive.tar")));
        assert!(!is_binary_extension(Path::new("main.rs")));
        assert!(!is_binary_extension(Path::new("Makefile")));
    }

    #[test]
    fn test_excluded_directories() {
        assert!(is_excluded_directory("node_modules"));
        assert!(is_excluded_directory(".git"));
        assert!(is_excluded_directory(SESSION_DIR_NAME));
        assert!(!is_excluded_directory("src"));
        // Matching is exact, not case-folded
        assert!(!is_excluded_directory("Node_Modules"));
    }

    #[test]
    fn test_size_limit() -> std::io::Result<()> {
        let dir = tempdir()?;
        let small = dir.path().join("small.txt");
        File::create(&small)?.write_all(b"tiny")?;

        let big = dir.path().join("big.txt");
        let mut f = File::create(&big)?;
        f.write_all(&vec![b'a'; (BYTES_PER_MB + 1) as usize])?;

        assert!(is_within_size_limit(&small, 1));
        assert!(!is_within_size_limit(&big, 1));
        assert!(is_within_size_limit(&big, 2));
        assert!(!is_within_size_limit(&dir.path().join("missing"), 1));
        Ok(())
    }

    #[test]
    fn test_check_access() -> std::io::Result<()> {
        let dir = tempdir()?;
        assert!(check_access(dir.path()));
        assert!(!check_access(&dir.path().join("missing")));
        Ok(())
    }
}
