/*!
 * Console reporting for scan results
 *
 * Renders the scan preview (summary table plus skipped and error listings),
 * a redaction findings table and a box-drawing tree of the scan structure,
 * using the tabled library for table rendering.
 */

use std::collections::{HashMap, HashSet};

use tabled::{
    settings::{object::Columns, Alignment, Modify, Padding, Style},
    Table, Tabled,
};

use crate::redactor::RedactionFinding;
use crate::types::{EntryKind, ScanResult};
use crate::utils::format_file_size;

/// Token count above which the preview warns about LLM context limits
pub const CONTEXT_WARNING_TOKENS: usize = 128_000;

/// Issue rows listed in full before the listing is cut off
const MAX_LISTED_ISSUES: usize = 15;

/// Rough LLM token estimate: one token per four characters
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / 4
}

/// Token estimate summed over every file of a scan
pub fn scan_tokens(scan: &ScanResult) -> usize {
    scan.files.iter().map(|f| estimate_tokens(&f.content)).sum()
}

/// Format a token count with K/M suffixes
pub fn format_token_count(count: usize) -> String {
    if count < 1_000 {
        count.to_string()
    } else if count < 1_000_000 {
        format!("{:.1}K", count as f64 / 1_000.0)
    } else {
        format!("{:.1}M", count as f64 / 1_000_000.0)
    }
}

/// Aggregate numbers shown in the preview
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSummary {
    pub root: String,
    pub directories: usize,
    pub files: usize,
    pub skipped: usize,
    pub errors: usize,
    /// Total UTF-8 size of the decoded contents
    pub total_bytes: usize,
    pub estimated_tokens: usize,
}

impl ScanSummary {
    pub fn from_scan(scan: &ScanResult) -> Self {
        Self {
            root: scan.root.clone(),
            directories: scan.directory_count(),
            files: scan.files.len(),
            skipped: scan.skipped.len(),
            errors: scan.errors.len(),
            total_bytes: scan.total_bytes(),
            estimated_tokens: scan_tokens(scan),
        }
    }
}

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Metric")]
    key: String,

    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Tabled)]
struct IssueRow {
    #[tabled(rename = "Path")]
    path: String,

    #[tabled(rename = "Reason")]
    reason: String,
}

#[derive(Tabled)]
struct FindingRow {
    #[tabled(rename = "File")]
    file: String,

    #[tabled(rename = "Pattern")]
    pattern: String,

    #[tabled(rename = "Matches")]
    count: usize,
}

fn styled<T: Tabled>(rows: Vec<T>) -> String {
    let mut table = Table::new(rows);
    table
        .with(Style::rounded())
        .with(Padding::new(1, 1, 0, 0))
        .with(Modify::new(Columns::new(..)).with(Alignment::left()));
    table.to_string()
}

/// Report generator for scan results
#[derive(Debug, Default)]
pub struct Reporter;

impl Reporter {
    pub fn new() -> Self {
        Self
    }

    fn summary_table(&self, summary: &ScanSummary) -> String {
        let mut rows = vec![
            SummaryRow {
                key: "📂 Root directory".to_string(),
                value: summary.root.clone(),
            },
            SummaryRow {
                key: "📁 Directories".to_string(),
                value: summary.directories.to_string(),
            },
            SummaryRow {
                key: "📄 Files (readable)".to_string(),
                value: summary.files.to_string(),
            },
            SummaryRow {
                key: "⚠️ Skipped".to_string(),
                value: summary.skipped.to_string(),
            },
            SummaryRow {
                key: "✗ Errors".to_string(),
                value: summary.errors.to_string(),
            },
            SummaryRow {
                key: "📦 Total size".to_string(),
                value: format_file_size(summary.total_bytes as u64),
            },
            SummaryRow {
                key: "🔢 LLM Tokens".to_string(),
                value: format!(
                    "{} tokens (estimated)",
                    format_token_count(summary.estimated_tokens)
                ),
            },
        ];

        if summary.estimated_tokens > CONTEXT_WARNING_TOKENS {
            rows.push(SummaryRow {
                key: "🚨 Context".to_string(),
                value: format!(
                    "exceeds {} tokens, consider --split or a narrower path",
                    format_token_count(CONTEXT_WARNING_TOKENS)
                ),
            });
        }

        styled(rows)
    }

    fn issue_section(&self, title: &str, mark: &str, issues: &[crate::types::IssueEntry]) -> String {
        let rows: Vec<IssueRow> = issues
            .iter()
            .take(MAX_LISTED_ISSUES)
            .map(|item| IssueRow {
                path: format!("{} {}", mark, item.path),
                reason: item.reason.clone(),
            })
            .collect();

        let mut section = format!("{}\n{}", title, styled(rows));
        if issues.len() > MAX_LISTED_ISSUES {
            section.push_str(&format!(
                "\n  ... and {} more",
                issues.len() - MAX_LISTED_ISSUES
            ));
        }
        section
    }

    /// Preview of a scan: summary table, then skipped and error listings
    pub fn generate_preview(&self, scan: &ScanResult) -> String {
        let summary = ScanSummary::from_scan(scan);
        let mut sections = vec![format!("🔍  SCAN PREVIEW\n{}", self.summary_table(&summary))];

        if !scan.skipped.is_empty() {
            sections.push(self.issue_section("⚠️  SKIPPED FILES", "⚠", &scan.skipped));
        }
        if !scan.errors.is_empty() {
            sections.push(self.issue_section("✗  ERRORS", "✗", &scan.errors));
        }

        sections.join("\n\n")
    }

    /// Table of redaction findings, one row per file and pattern
    pub fn generate_findings(&self, findings: &[RedactionFinding]) -> String {
        if findings.is_empty() {
            return "🔒  No sensitive data found".to_string();
        }

        let rows: Vec<FindingRow> = findings
            .iter()
            .flat_map(|finding| {
                finding.matches.iter().map(move |m| FindingRow {
                    file: finding.file_path.clone(),
                    pattern: m.pattern.name().to_string(),
                    count: m.count,
                })
            })
            .collect();
        let total: usize = rows.iter().map(|r| r.count).sum();

        format!(
            "🔒  REDACTED {} VALUES IN {} FILES\n{}",
            total,
            findings.len(),
            styled(rows)
        )
    }

    /// Print the preview to stdout
    pub fn print_preview(&self, scan: &ScanResult) {
        println!("\n{}", self.generate_preview(scan));
    }
}

/// Box-drawing tree of `scan.structure`, headed by the root name
///
/// Relies on parent-before-child ordering and keeps the traversal order.
pub fn render_tree(scan: &ScanResult) -> String {
    let structure = &scan.structure;
    let parent_of = |path: &str| path.rsplit_once('/').map(|(p, _)| p.to_string()).unwrap_or_default();

    // An entry is the last child if no later entry shares its parent
    let mut seen_parents = HashSet::new();
    let mut is_last = vec![false; structure.len()];
    for (i, entry) in structure.iter().enumerate().rev() {
        is_last[i] = seen_parents.insert(parent_of(&entry.path));
    }

    let last_by_path: HashMap<&str, bool> = structure
        .iter()
        .zip(&is_last)
        .map(|(entry, last)| (entry.path.as_str(), *last))
        .collect();

    let mut lines = vec![format!("{}/", scan.root_name())];
    for (entry, last) in structure.iter().zip(&is_last) {
        let mut prefix = String::new();
        let mut ancestor = String::new();
        let components: Vec<&str> = entry.path.split('/').collect();
        for component in &components[..components.len().saturating_sub(1)] {
            if !ancestor.is_empty() {
                ancestor.push('/');
            }
            ancestor.push_str(component);
            let ancestor_last = last_by_path.get(ancestor.as_str()).copied().unwrap_or(true);
            prefix.push_str(if ancestor_last { "    " } else { "│   " });
        }

        let connector = if *last { "└── " } else { "├── " };
        let suffix = match entry.kind {
            EntryKind::Directory => "/",
            EntryKind::File => "",
        };
        lines.push(format!("{}{}{}{}", prefix, connector, entry.name(), suffix));
    }

    lines.join("\n")
}
