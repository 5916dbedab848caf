/*!
 * Configuration handling for context-builder
 *
 * Three layers: command-line arguments turned into a validated [`Config`],
 * the user-level [`Settings`] file holding the sessions root, and named
 * [`Profile`]s of pipeline defaults kept in a [`ProfileStore`].
 */

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use clap_complete::Shell;
use serde::{Deserialize, Serialize};

use crate::error::{ContextError, Result, ResultExt};
use crate::filter::DEFAULT_MAX_FILE_SIZE_MB;
use crate::redactor::{RedactionPattern, Redactor};
use crate::writer::ExportFormat;

/// Directory name used under the platform config and data dirs
pub const APP_DIR_NAME: &str = "context-builder";

const SETTINGS_FILE: &str = "settings.json";

/// Command-line arguments for context-builder
#[derive(Parser, Debug, Clone)]
#[clap(
    name = "context-builder",
    version = env!("CARGO_PKG_VERSION"),
    about = "Snapshot a directory tree into a shareable report",
    long_about = "Scans a directory (structure, decoded file contents, skipped and unreadable entries) and exports it as a text, Markdown, JSON or PDF report, optionally redacting secrets and splitting large reports into parts."
)]
pub struct Args {
    /// Directory to scan
    #[clap(long, required_unless_present = "generate")]
    pub path: Option<PathBuf>,

    /// Report file name without extension (default: scan_<timestamp>)
    #[clap(long)]
    pub output: Option<String>,

    /// Report format
    #[clap(long, value_enum, default_value_t = ExportFormat::default())]
    pub format: ExportFormat,

    /// Directory to write the report into (default: the scanned directory)
    #[clap(long)]
    pub output_dir: Option<PathBuf>,

    /// Leave the directory tree out of the report
    #[clap(long)]
    pub no_tree: bool,

    /// Redact sensitive values before exporting
    #[clap(long)]
    pub redact: bool,

    /// Comma-separated redaction patterns to apply (implies --redact)
    #[clap(long, value_delimiter = ',')]
    pub redact_patterns: Vec<String>,

    /// Skip files larger than this many megabytes
    #[clap(long, default_value_t = DEFAULT_MAX_FILE_SIZE_MB)]
    pub max_file_size: u64,

    /// Split the report into parts of at most this many megabytes (0 = off)
    #[clap(long, value_name = "MB", default_value_t = 0)]
    pub split: u64,

    /// Print nothing except errors
    #[clap(long)]
    pub silent: bool,

    /// Show a summary of the scan and exit without exporting
    #[clap(long)]
    pub preview: bool,

    /// Directory holding session records (overrides the settings file)
    #[clap(long)]
    pub sessions_root: Option<PathBuf>,

    /// Do not record a session for the generated report
    #[clap(long)]
    pub no_session: bool,

    /// Enable debug logging
    #[clap(long, conflicts_with = "silent")]
    pub verbose: bool,

    /// Generate shell completions
    #[clap(long = "generate", value_enum)]
    pub generate: Option<Shell>,
}

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    /// Directory to scan
    pub target_dir: PathBuf,

    /// Report file name without extension
    pub output_name: Option<String>,

    /// Report format
    pub format: ExportFormat,

    /// Directory the report is written into
    pub output_dir: Option<PathBuf>,

    /// Whether the report carries the directory tree
    pub include_tree: bool,

    /// Redaction patterns; `None` disables redaction
    pub redact_patterns: Option<Vec<RedactionPattern>>,

    /// Per-file size limit in megabytes
    pub max_file_size_mb: u64,

    /// Chunk size in megabytes; `None` writes a single report
    pub split_mb: Option<u64>,

    pub silent: bool,
    pub preview: bool,
    pub verbose: bool,

    /// Sessions root override
    pub sessions_root: Option<PathBuf>,

    /// Whether to record a session after exporting
    pub save_session: bool,
}

impl Config {
    /// Create configuration from command-line arguments
    ///
    /// Fails on unknown redaction pattern names.
    pub fn from_args(args: Args) -> Result<Self> {
        let redact_patterns = if args.redact || !args.redact_patterns.is_empty() {
            let selected = args
                .redact_patterns
                .iter()
                .map(|name| name.parse::<RedactionPattern>())
                .collect::<Result<Vec<_>>>()?;
            Some(selected)
        } else {
            None
        };

        Ok(Self {
            target_dir: args.path.unwrap_or_else(|| PathBuf::from(".")),
            output_name: args.output,
            format: args.format,
            output_dir: args.output_dir,
            include_tree: !args.no_tree,
            redact_patterns,
            max_file_size_mb: args.max_file_size,
            split_mb: (args.split > 0).then_some(args.split),
            silent: args.silent,
            preview: args.preview,
            verbose: args.verbose,
            sessions_root: args.sessions_root,
            save_session: !args.no_session,
        })
    }

    /// Validate the configuration
    ///
    /// The target directory itself is checked by the scanner so that a
    /// missing root surfaces as a scan failure.
    pub fn validate(&self) -> Result<()> {
        if let Some(dir) = &self.output_dir {
            crate::ensure!(
                dir.is_dir(),
                Config,
                "Output directory not found: {}",
                dir.display()
            );
        }

        if let Some(name) = &self.output_name {
            crate::ensure!(
                !name.trim().is_empty() && !name.contains(['/', '\\']),
                Config,
                "Invalid report name: {:?}",
                name
            );
        }

        crate::ensure!(
            self.max_file_size_mb > 0,
            Config,
            "--max-file-size must be at least 1 MB"
        );

        Ok(())
    }

    /// Redactor for the selected patterns, if redaction is on
    pub fn redactor(&self) -> Option<Redactor> {
        self.redact_patterns
            .as_ref()
            .map(|patterns| Redactor::new(patterns.iter().copied()))
    }
}

/// User-level settings persisted between runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Where session records are stored
    pub sessions_root: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sessions_root: default_sessions_root(),
        }
    }
}

impl Settings {
    /// Default location of the settings file
    pub fn default_path() -> PathBuf {
        app_config_dir().join(SETTINGS_FILE)
    }

    /// Load settings from `path`, falling back to defaults when the file is
    /// missing or unreadable
    pub fn load(path: &Path) -> Self {
        let Ok(content) = fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str(&content) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Ignoring invalid settings {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Write settings to `path`, creating its parent directory
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create {}", parent.display()))?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

fn app_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

/// Per-user default sessions root
pub fn default_sessions_root() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
        .join("sessions")
}

/// How the directories of a profile are picked
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    /// One directory
    Single,
    /// Several sibling directories
    Multi,
    /// A directory and everything beneath it
    Recursive,
}

/// Named bundle of pipeline defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub mode: ScanMode,
    pub root_path: String,
    pub include_tree: bool,
    pub export_format: ExportFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
}

/// One JSON file per profile inside a directory
#[derive(Debug, Clone)]
pub struct ProfileStore {
    dir: PathBuf,
}

impl ProfileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Default profile directory
    pub fn default_dir() -> PathBuf {
        app_config_dir().join("profiles")
    }

    fn profile_path(&self, name: &str) -> Result<PathBuf> {
        validate_profile_name(name)?;
        Ok(self.dir.join(format!("{}.json", name)))
    }

    /// Save (or replace) a profile
    pub fn save(&self, name: &str, profile: &Profile) -> Result<()> {
        let path = self.profile_path(name)?;
        fs::create_dir_all(&self.dir)?;
        fs::write(&path, serde_json::to_string_pretty(profile)?)?;
        tracing::debug!("Saved profile {} to {}", name, path.display());
        Ok(())
    }

    /// Load a profile; missing or unparsable profiles are `None`
    pub fn load(&self, name: &str) -> Result<Option<Profile>> {
        let path = self.profile_path(name)?;
        let Ok(content) = fs::read_to_string(&path) else {
            return Ok(None);
        };
        match serde_json::from_str(&content) {
            Ok(profile) => Ok(Some(profile)),
            Err(e) => {
                tracing::warn!("Ignoring invalid profile {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    /// Names of all stored profiles, sorted
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem() {
                    names.push(stem.to_string_lossy().to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Delete a profile; returns whether it existed
    pub fn delete(&self, name: &str) -> Result<bool> {
        let path = self.profile_path(name)?;
        if !path.is_file() {
            return Ok(false);
        }
        fs::remove_file(&path)?;
        Ok(true)
    }
}

fn validate_profile_name(name: &str) -> Result<()> {
    let trimmed = name.trim();
    if trimmed.is_empty()
        || trimmed != name
        || name.contains(['/', '\\'])
        || name == "."
        || name == ".."
    {
        return Err(ContextError::InvalidArgument(format!(
            "invalid profile name: {:?}",
            name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn parse(args: &[&str]) -> Args {
        let mut argv = vec!["context-builder"];
        argv.extend_from_slice(args);
        Args::parse_from(argv)
    }

    #[test]
    fn test_defaults_from_args() -> Result<()> {
        let config = Config::from_args(parse(&["--path", "/tmp/project"]))?;
        assert_eq!(config.target_dir, PathBuf::from("/tmp/project"));
        assert_eq!(config.format, ExportFormat::Txt);
        assert!(config.include_tree);
        assert!(config.redact_patterns.is_none());
        assert_eq!(config.max_file_size_mb, DEFAULT_MAX_FILE_SIZE_MB);
        assert_eq!(config.split_mb, None);
        assert!(config.save_session);
        Ok(())
    }

    #[test]
    fn test_flags_from_args() -> Result<()> {
        let config = Config::from_args(parse(&[
            "--path",
            ".",
            "--format",
            "md",
            "--no-tree",
            "--split",
            "5",
            "--redact-patterns",
            "password,email",
            "--no-session",
        ]))?;
        assert_eq!(config.format, ExportFormat::Md);
        assert!(!config.include_tree);
        assert_eq!(config.split_mb, Some(5));
        assert_eq!(
            config.redact_patterns,
            Some(vec![RedactionPattern::Password, RedactionPattern::Email])
        );
        assert!(!config.save_session);
        Ok(())
    }

    #[test]
    fn test_redact_flag_selects_all_patterns() -> Result<()> {
        let config = Config::from_args(parse(&["--path", ".", "--redact"]))?;
        let redactor = config.redactor().expect("redaction enabled");
        assert_eq!(redactor.patterns(), RedactionPattern::all());
        Ok(())
    }

    #[test]
    fn test_unknown_redaction_pattern_is_rejected() {
        let result = Config::from_args(parse(&["--path", ".", "--redact-patterns", "nope"]));
        assert!(matches!(result, Err(ContextError::UnknownPattern(_))));
    }

    #[test]
    fn test_path_is_required() {
        assert!(Args::try_parse_from(["context-builder"]).is_err());
        assert!(Args::try_parse_from(["context-builder", "--generate", "bash"]).is_ok());
    }

    #[test]
    fn test_validate_output_dir() -> Result<()> {
        let dir = tempdir()?;
        let mut config = Config::from_args(parse(&["--path", "."]))?;
        config.output_dir = Some(dir.path().to_path_buf());
        assert!(config.validate().is_ok());

        config.output_dir = Some(dir.path().join("missing"));
        assert!(matches!(config.validate(), Err(ContextError::Config(_))));

        config.output_dir = None;
        config.output_name = Some("a/b".to_string());
        assert!(config.validate().is_err());
        Ok(())
    }

    #[test]
    fn test_settings_round_trip() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join(SETTINGS_FILE);

        assert_eq!(Settings::load(&path), Settings::default());

        let settings = Settings {
            sessions_root: dir.path().join("sessions"),
        };
        settings.save(&path)?;
        assert_eq!(Settings::load(&path), settings);

        fs::write(&path, "not json")?;
        assert_eq!(Settings::load(&path), Settings::default());
        Ok(())
    }

    #[test]
    fn test_profile_store() -> Result<()> {
        let dir = tempdir()?;
        let store = ProfileStore::new(dir.path().join("profiles"));
        assert!(store.list()?.is_empty());

        let profile = Profile {
            mode: ScanMode::Recursive,
            root_path: "/work/app".to_string(),
            include_tree: false,
            export_format: ExportFormat::Json,
            output_dir: None,
        };
        store.save("work", &profile)?;
        store.save("alpha", &profile)?;

        assert_eq!(store.list()?, vec!["alpha", "work"]);
        assert_eq!(store.load("work")?, Some(profile));
        assert_eq!(store.load("missing")?, None);

        let raw = fs::read_to_string(dir.path().join("profiles/work.json"))?;
        let value: serde_json::Value = serde_json::from_str(&raw)?;
        assert_eq!(value["mode"], "recursive");
        assert_eq!(value["export_format"], "json");
        assert!(value.get("output_dir").is_none());

        assert!(store.delete("work")?);
        assert!(!store.delete("work")?);
        assert_eq!(store.list()?, vec!["alpha"]);
        Ok(())
    }

    #[test]
    fn test_profile_names_are_validated() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::new(dir.path());
        for bad in ["", " ", "../x", "a/b", ".."] {
            assert!(store.load(bad).is_err(), "{:?} should be rejected", bad);
        }
    }
}
