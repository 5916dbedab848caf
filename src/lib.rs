/*!
 * context-builder - Snapshot directory trees into shareable reports
 *
 * Scans a directory into a [`ScanResult`] (structure, decoded contents,
 * skipped and failed entries), optionally redacts sensitive values, exports
 * the result as text, Markdown, JSON or PDF (whole or split into parts) and
 * records a session so later edits to the report can be detected.
 */

pub mod chunker;
pub mod config;
pub mod converter;
pub mod encoding;
pub mod error;
pub mod filter;
pub mod redactor;
pub mod report;
pub mod scanner;
pub mod session;
pub mod types;
pub mod utils;
pub mod writer;


// Re-export main components for easier access
pub use chunker::{export_chunked, split_scan_result};
pub use config::{Config, Profile, ProfileStore, ScanMode, Settings};
pub use converter::{reconvert, Reconverted};
pub use error::{ContextError, Result};
pub use redactor::{RedactionFinding, RedactionPattern, Redactor};
pub use report::{estimate_tokens, format_token_count, render_tree, scan_tokens, Reporter};
pub use scanner::{scan_directory, Scanner};
pub use session::{ModificationStatus, SessionRecord, SessionStore};
pub use types::{EntryKind, FileEntry, IssueEntry, ScanResult, StructureEntry};
pub use utils::{default_report_name, format_file_size, resolve_filename, unique_filename};
pub use writer::{export, ExportFormat, ReportWriter};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
