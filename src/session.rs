/*!
 * Session persistence and report modification detection
 *
 * Sessions live under a configurable sessions root, one directory per scan
 * root named `<root name>_<hash of absolute root path>`, so the scanned tree
 * never has to be writable. The older layout, a `.context_builder` folder
 * next to the scanned tree, is still read but never written.
 */

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use strum::{Display, IntoEnumIterator};

use crate::error::{ContextError, Result};
use crate::filter::SESSION_DIR_NAME;
use crate::types::ScanResult;
use crate::writer::ExportFormat;

/// File name of a session record inside its directory
pub const SESSION_FILE: &str = "session.json";

/// Hex digits of the root path hash used in session directory names
const ROOT_HASH_LEN: usize = 16;

/// Persisted record linking a scan root to its last scan and report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// ISO-8601 creation time
    pub created_at: String,
    /// Absolute scan root; older records only carry it inside `scan_data`
    #[serde(default)]
    pub scan_root: String,
    /// The scan the report was generated from
    pub scan_data: ScanResult,
    /// SHA-256 (hex) of the report bytes at save time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_hash: Option<String>,
    /// Report the hash belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_path: Option<String>,
    /// Directory the report was written to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
}

/// Outcome of comparing a report file against its session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ModificationStatus {
    /// No session could be found
    NoSession,
    /// The session has no report hash
    NoHash,
    /// The report file is gone
    FileMissing,
    /// The report bytes differ from what was written
    Modified,
    /// The report is byte-identical to what was written
    Unchanged,
}

/// Short description of a stored session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    /// Directory holding the session file
    pub session_path: PathBuf,
    pub scan_root: String,
    pub created_at: String,
    pub report_path: Option<String>,
    /// Whether the session uses the per-directory layout
    pub legacy: bool,
}

/// Store for session records under a sessions root
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions_root: PathBuf,
}

impl SessionStore {
    /// Create a store rooted at `sessions_root` (created lazily on save)
    pub fn new(sessions_root: impl Into<PathBuf>) -> Self {
        Self {
            sessions_root: sessions_root.into(),
        }
    }

    pub fn sessions_root(&self) -> &Path {
        &self.sessions_root
    }

    /// Directory where the session for `scan_root` is stored
    pub fn session_dir_for(&self, scan_root: &Path) -> PathBuf {
        let abs_root = fs::canonicalize(scan_root).unwrap_or_else(|_| scan_root.to_path_buf());
        let name = abs_root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "root".to_string());
        let sanitized = name.replace(
            |c: char| !c.is_alphanumeric() && c != '_' && c != '-' && c != '.',
            "_",
        );

        let digest = hash_bytes(abs_root.to_string_lossy().as_bytes());
        self.sessions_root
            .join(format!("{}_{}", sanitized, &digest[..ROOT_HASH_LEN]))
    }

    /// Persist `scan` (and the hash of `report_path`, if any). Returns the
    /// path of the written session file.
    pub fn save(
        &self,
        scan: &ScanResult,
        output_dir: Option<&Path>,
        report_path: Option<&Path>,
    ) -> Result<PathBuf> {
        let report_hash = match report_path {
            Some(path) => match file_hash(path) {
                Ok(hash) => Some(hash),
                Err(e) => {
                    tracing::warn!("Cannot hash report {}: {}", path.display(), e);
                    None
                }
            },
            None => None,
        };

        let record = SessionRecord {
            created_at: Local::now().to_rfc3339(),
            scan_root: scan.root.clone(),
            scan_data: scan.clone(),
            report_hash,
            report_path: report_path.map(|p| p.to_string_lossy().to_string()),
            output_dir: output_dir.map(|p| p.to_string_lossy().to_string()),
        };

        let dir = self.session_dir_for(Path::new(&scan.root));
        fs::create_dir_all(&dir)?;
        let session_file = dir.join(SESSION_FILE);
        fs::write(&session_file, serde_json::to_string_pretty(&record)?)?;
        tracing::debug!("Saved session {}", session_file.display());

        Ok(session_file)
    }

    /// Find the session file for `target`
    ///
    /// `target` may be a session file, a session directory, a scan root
    /// with a centralized session, or a scan root with a legacy
    /// `.context_builder` folder, checked in that order. Candidates that
    /// do not hold a session record are passed over.
    pub fn locate(&self, target: &Path) -> Option<PathBuf> {
        self.find_record(target).map(|(session_file, _)| session_file)
    }

    /// Load the session for `target` (see [`SessionStore::locate`]).
    /// Missing or unreadable records yield `None`.
    pub fn load(&self, target: &Path) -> Result<Option<SessionRecord>> {
        Ok(self.find_record(target).map(|(_, record)| record))
    }

    fn find_record(&self, target: &Path) -> Option<(PathBuf, SessionRecord)> {
        let mut candidates = Vec::with_capacity(4);
        if target.file_name().is_some_and(|n| n == SESSION_FILE) {
            candidates.push(target.to_path_buf());
        }
        candidates.extend([
            target.join(SESSION_FILE),
            self.session_dir_for(target).join(SESSION_FILE),
            target.join(SESSION_DIR_NAME).join(SESSION_FILE),
        ]);

        candidates
            .into_iter()
            .filter(|candidate| candidate.is_file())
            .find_map(|candidate| read_record(&candidate).map(|record| (candidate, record)))
    }

    /// Sessions whose scan root is `under_root` or lies beneath it
    pub fn list_sessions(&self, under_root: &Path) -> Result<Vec<SessionSummary>> {
        let base = fs::canonicalize(under_root).unwrap_or_else(|_| under_root.to_path_buf());
        let mut sessions = Vec::new();

        if self.sessions_root.is_dir() {
            for entry in fs::read_dir(&self.sessions_root)? {
                let dir = entry?.path();
                let session_file = dir.join(SESSION_FILE);
                if !session_file.is_file() {
                    continue;
                }
                if let Some(record) = read_record(&session_file) {
                    if Path::new(&record.scan_root).starts_with(&base) {
                        sessions.push(summarize(dir, record, false));
                    }
                }
            }
        }

        let mut legacy_roots = vec![base.clone()];
        legacy_roots.extend(crate::scanner::list_subdirectories(&base));
        for root in legacy_roots {
            let dir = root.join(SESSION_DIR_NAME);
            if let Some(record) = read_record(&dir.join(SESSION_FILE)) {
                sessions.push(summarize(dir, record, true));
            }
        }

        sessions.sort_by(|a, b| a.session_path.cmp(&b.session_path));
        Ok(sessions)
    }

    /// Delete a session given its directory or its session file
    pub fn delete_session(&self, path: &Path) -> Result<()> {
        let (dir, session_file) = if path.is_file() {
            let dir = path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            (dir, path.to_path_buf())
        } else {
            (path.to_path_buf(), path.join(SESSION_FILE))
        };

        if !session_file.is_file() || session_file.file_name().is_some_and(|n| n != SESSION_FILE) {
            return Err(ContextError::Session(format!(
                "no session found at {}",
                path.display()
            )));
        }

        fs::remove_file(&session_file)?;
        // Only drop the directory once nothing else is left in it
        if fs::read_dir(&dir)?.next().is_none() {
            fs::remove_dir(&dir)?;
        }
        Ok(())
    }

    /// Compare `report_path` against the hash stored in the session for
    /// `session_target`
    pub fn detect_modification(
        &self,
        report_path: &Path,
        session_target: &Path,
    ) -> Result<ModificationStatus> {
        let Some(record) = self.load(session_target)? else {
            return Ok(ModificationStatus::NoSession);
        };
        let Some(stored) = record.report_hash else {
            return Ok(ModificationStatus::NoHash);
        };

        let status = match file_hash(report_path) {
            Err(_) => ModificationStatus::FileMissing,
            Ok(current) if current != stored => ModificationStatus::Modified,
            Ok(_) => ModificationStatus::Unchanged,
        };
        Ok(status)
    }
}

fn read_record(session_file: &Path) -> Option<SessionRecord> {
    let content = fs::read_to_string(session_file).ok()?;
    match serde_json::from_str::<SessionRecord>(&content) {
        Ok(mut record) => {
            if record.scan_root.is_empty() {
                record.scan_root = record.scan_data.root.clone();
            }
            Some(record)
        }
        Err(e) => {
            tracing::debug!("Ignoring unreadable session {}: {}", session_file.display(), e);
            None
        }
    }
}

fn summarize(session_path: PathBuf, record: SessionRecord, legacy: bool) -> SessionSummary {
    SessionSummary {
        session_path,
        scan_root: record.scan_root,
        created_at: record.created_at,
        report_path: record.report_path,
        legacy,
    }
}

/// Hex SHA-256 of a byte slice
pub fn hash_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Hex SHA-256 of a file's contents
pub fn file_hash(path: &Path) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut file = File::open(path)?;
    io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Report files directly inside `dir` (any export extension), sorted by name
pub fn find_report_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let extensions: Vec<&str> = ExportFormat::iter().map(|f| f.extension()).collect();
    let mut reports = Vec::new();

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let matches = path.is_file()
            && path
                .extension()
                .map(|ext| extensions.contains(&ext.to_string_lossy().to_lowercase().as_str()))
                .unwrap_or(false);
        if matches {
            reports.push(path);
        }
    }

    reports.sort();
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FileEntry;
    use std::io::Write;
    use tempfile::{tempdir, TempDir};

    fn fixture() -> io::Result<(TempDir, TempDir, SessionStore, ScanResult)> {
        let project = tempdir()?;
        let sessions = tempdir()?;
        let store = SessionStore::new(sessions.path());

        let root = fs::canonicalize(project.path())?;
        let mut scan = ScanResult::new(root.to_string_lossy());
        scan.files.push(FileEntry {
            path: "a.txt".to_string(),
            encoding: "utf-8".to_string(),
            content: "hello".to_string(),
        });
        Ok((project, sessions, store, scan))
    }

    #[test]
    fn test_session_dir_is_keyed_by_name_and_hash() -> io::Result<()> {
        let (project, sessions, store, _) = fixture()?;
        let dir = store.session_dir_for(project.path());
        assert!(dir.starts_with(sessions.path()));

        let name = dir.file_name().unwrap().to_string_lossy().to_string();
        let (prefix, hash) = name.rsplit_once('_').unwrap();
        assert!(!prefix.is_empty());
        assert_eq!(hash.len(), ROOT_HASH_LEN);
        assert_eq!(dir, store.session_dir_for(project.path()));
        Ok(())
    }

    #[test]
    fn test_save_and_load() -> Result<()> {
        let (project, _sessions, store, scan) = fixture()?;
        let session_file = store.save(&scan, None, None)?;
        assert!(session_file.ends_with(SESSION_FILE));
        // Nothing is written into the scanned tree
        assert!(!project.path().join(SESSION_DIR_NAME).exists());

        let record = store.load(project.path())?.expect("session");
        assert_eq!(record.scan_data, scan);
        assert_eq!(record.scan_root, scan.root);
        assert!(record.report_hash.is_none());

        let by_file = store.load(&session_file)?.expect("session by file");
        assert_eq!(by_file, record);
        Ok(())
    }

    #[test]
    fn test_load_missing_session() -> Result<()> {
        let (project, _sessions, store, _) = fixture()?;
        assert!(store.load(project.path())?.is_none());
        Ok(())
    }

    #[test]
    fn test_modification_detection() -> Result<()> {
        let (project, _sessions, store, scan) = fixture()?;
        let report = project.path().join("report.txt");
        fs::write(&report, "report body")?;

        assert_eq!(
            store.detect_modification(&report, project.path())?,
            ModificationStatus::NoSession
        );

        store.save(&scan, Some(project.path()), None)?;
        assert_eq!(
            store.detect_modification(&report, project.path())?,
            ModificationStatus::NoHash
        );

        store.save(&scan, Some(project.path()), Some(&report))?;
        assert_eq!(
            store.detect_modification(&report, project.path())?,
            ModificationStatus::Unchanged
        );

        File::options().append(true).open(&report)?.write_all(b"!")?;
        assert_eq!(
            store.detect_modification(&report, project.path())?,
            ModificationStatus::Modified
        );

        fs::remove_file(&report)?;
        assert_eq!(
            store.detect_modification(&report, project.path())?,
            ModificationStatus::FileMissing
        );
        Ok(())
    }

    #[test]
    fn test_legacy_layout_is_readable() -> Result<()> {
        let (project, _sessions, store, _) = fixture()?;
        let legacy_dir = project.path().join(SESSION_DIR_NAME);
        fs::create_dir_all(&legacy_dir)?;
        fs::write(
            legacy_dir.join(SESSION_FILE),
            r#"{
                "created_at": "2024-03-01T10:00:00.123456",
                "scan_data": {
                    "root": "/old/project",
                    "structure": [{"path": "a.txt", "type": "file"}],
                    "files": [{"path": "a.txt", "encoding": "utf-8", "content": "hi"}],
                    "skipped": [],
                    "errors": []
                }
            }"#,
        )?;

        let record = store.load(project.path())?.expect("legacy session");
        assert_eq!(record.scan_root, "/old/project");
        assert_eq!(record.scan_data.files[0].content, "hi");

        let listed = store.list_sessions(project.path())?;
        assert_eq!(listed.len(), 1);
        assert!(listed[0].legacy);
        Ok(())
    }

    #[test]
    fn test_corrupt_session_is_absent() -> Result<()> {
        let (project, _sessions, store, _) = fixture()?;
        let dir = store.session_dir_for(project.path());
        fs::create_dir_all(&dir)?;
        fs::write(dir.join(SESSION_FILE), "{ not json")?;
        assert!(store.load(project.path())?.is_none());
        Ok(())
    }

    #[test]
    fn test_project_session_json_does_not_shadow_store() -> Result<()> {
        let (project, _sessions, store, scan) = fixture()?;
        fs::write(project.path().join(SESSION_FILE), r#"{"user": "app config"}"#)?;
        let report = project.path().join("report.txt");
        fs::write(&report, "report body")?;

        let session_file = store.save(&scan, Some(project.path()), Some(&report))?;
        assert_eq!(store.locate(project.path()), Some(session_file));
        assert_eq!(store.load(project.path())?.expect("session").scan_data, scan);
        assert_eq!(
            store.detect_modification(&report, project.path())?,
            ModificationStatus::Unchanged
        );

        // The project's own file is left alone
        assert_eq!(
            fs::read_to_string(project.path().join(SESSION_FILE))?,
            r#"{"user": "app config"}"#
        );
        Ok(())
    }

    #[test]
    fn test_list_and_delete_sessions() -> Result<()> {
        let (project, _sessions, store, scan) = fixture()?;
        let nested = project.path().join("nested");
        fs::create_dir_all(&nested)?;
        let nested_scan = ScanResult::new(fs::canonicalize(&nested)?.to_string_lossy());
        let outside = tempdir()?;
        let outside_scan = ScanResult::new(fs::canonicalize(outside.path())?.to_string_lossy());

        store.save(&scan, None, None)?;
        store.save(&nested_scan, None, None)?;
        store.save(&outside_scan, None, None)?;

        let listed = store.list_sessions(project.path())?;
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|s| !s.legacy));

        store.delete_session(&listed[0].session_path)?;
        assert!(!listed[0].session_path.exists());
        assert_eq!(store.list_sessions(project.path())?.len(), 1);

        assert!(store.delete_session(&listed[0].session_path).is_err());
        Ok(())
    }

    #[test]
    fn test_find_report_files() -> io::Result<()> {
        let dir = tempdir()?;
        for name in ["b.md", "a.txt", "c.json", "d.pdf", "e.rs", "F.TXT"] {
            fs::write(dir.path().join(name), "")?;
        }
        fs::create_dir(dir.path().join("sub.txt"))?;

        let names: Vec<String> = find_report_files(dir.path())?
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["F.TXT", "a.txt", "b.md", "c.json", "d.pdf"]);
        Ok(())
    }

    #[test]
    fn test_status_display() {
        assert_eq!(ModificationStatus::FileMissing.to_string(), "file_missing");
        assert_eq!(ModificationStatus::Unchanged.to_string(), "unchanged");
    }
}
