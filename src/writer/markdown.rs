//! Markdown report

use chrono::{DateTime, Local};

use super::{timestamp, tree_lines};
use crate::types::ScanResult;

/// A backtick fence longer than any backtick run inside `content`
fn fence_for(content: &str) -> String {
    let mut longest = 0;
    let mut run = 0;
    for ch in content.chars() {
        if ch == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    "`".repeat((longest + 1).max(3))
}

pub(super) fn render(scan: &ScanResult, include_tree: bool, generated_at: &DateTime<Local>) -> String {
    let mut lines = Vec::new();

    lines.push("# Project Structure Report".to_string());
    lines.push(String::new());
    lines.push(format!("- **Date:** {}", timestamp(generated_at)));
    lines.push(format!("- **Root directory:** `{}`", scan.root));
    lines.push(String::new());

    if include_tree {
        lines.push("## Directory Tree".to_string());
        lines.push(String::new());
        lines.push("```".to_string());
        lines.extend(tree_lines(&scan.structure, "  ", "📁", "📄"));
        lines.push("```".to_string());
        lines.push(String::new());
    }

    lines.push("## File Contents".to_string());
    lines.push(String::new());
    for file in &scan.files {
        let fence = fence_for(&file.content);
        lines.push(format!("### `{}`", file.path));
        lines.push(String::new());
        lines.push(format!("{}{}", fence, file.extension()));
        lines.push(file.content.clone());
        lines.push(fence);
        lines.push(String::new());
    }

    if !scan.skipped.is_empty() {
        lines.push("## Skipped Files".to_string());
        lines.push(String::new());
        for item in &scan.skipped {
            lines.push(format!("- ⚠ `{}` — {}", item.path, item.reason));
        }
        lines.push(String::new());
    }

    if !scan.errors.is_empty() {
        lines.push("## Errors".to_string());
        lines.push(String::new());
        for item in &scan.errors {
            lines.push(format!("- ✗ `{}` — {}", item.path, item.reason));
        }
        lines.push(String::new());
    }

    lines.join("\n")
}
