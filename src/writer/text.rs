//! Plain text report

use chrono::{DateTime, Local};

use super::{timestamp, tree_lines};
use crate::types::ScanResult;

const WIDTH: usize = 70;

fn banner(lines: &mut Vec<String>, title: &str, ch: char) {
    let rule = ch.to_string().repeat(WIDTH);
    lines.push(rule.clone());
    lines.push(format!("  {}", title));
    lines.push(rule);
}

pub(super) fn render(scan: &ScanResult, include_tree: bool, generated_at: &DateTime<Local>) -> String {
    let heavy = "=".repeat(WIDTH);
    let mut lines = Vec::new();

    lines.push(heavy.clone());
    lines.push("  PROJECT STRUCTURE REPORT".to_string());
    lines.push(format!("  Date: {}", timestamp(generated_at)));
    lines.push(format!("  Root directory: {}", scan.root));
    lines.push(heavy.clone());
    lines.push(String::new());

    if include_tree {
        banner(&mut lines, "DIRECTORY TREE", '-');
        lines.push(String::new());
        lines.extend(tree_lines(&scan.structure, "    ", "📁", "📄"));
        lines.push(String::new());
    }

    banner(&mut lines, "FILE CONTENTS", '-');
    for file in &scan.files {
        lines.push(String::new());
        lines.push(heavy.clone());
        lines.push(format!("  File: {}", file.path));
        lines.push(format!("  Encoding: {}", file.encoding));
        lines.push(heavy.clone());
        lines.push(String::new());
        lines.push(file.content.clone());
        lines.push(String::new());
    }

    if !scan.skipped.is_empty() {
        banner(&mut lines, "SKIPPED FILES", '-');
        lines.push(String::new());
        for item in &scan.skipped {
            lines.push(format!("  ⚠ {} — {}", item.path, item.reason));
        }
        lines.push(String::new());
    }

    if !scan.errors.is_empty() {
        banner(&mut lines, "ERRORS", '-');
        lines.push(String::new());
        for item in &scan.errors {
            lines.push(format!("  ✗ {} — {}", item.path, item.reason));
        }
        lines.push(String::new());
    }

    banner(&mut lines, "End of report", '=');
    lines.join("\n")
}
