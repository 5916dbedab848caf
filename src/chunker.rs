/*!
 * Size-bounded splitting of scan results into several reports
 */

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::types::ScanResult;
use crate::utils::{resolve_filename, unique_filename};
use crate::writer::{export, output_path, ExportFormat, ReportWriter};

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Split `scan` into consecutive groups of files whose UTF-8 size stays
/// within `max_chunk_mb`. A single file above the budget forms its own chunk.
///
/// Every chunk keeps the root and the full structure; skipped and error
/// entries are only carried by the first chunk.
pub fn split_scan_result(scan: &ScanResult, max_chunk_mb: u64) -> Vec<ScanResult> {
    let budget = max_chunk_mb.saturating_mul(BYTES_PER_MB);
    let empty_chunk = || ScanResult {
        root: scan.root.clone(),
        structure: scan.structure.clone(),
        ..Default::default()
    };

    let mut chunks = Vec::new();
    let mut current = ScanResult {
        skipped: scan.skipped.clone(),
        errors: scan.errors.clone(),
        ..empty_chunk()
    };
    let mut current_size: u64 = 0;

    for file in &scan.files {
        let size = file.byte_len() as u64;
        if current_size + size > budget && !current.files.is_empty() {
            chunks.push(std::mem::replace(&mut current, empty_chunk()));
            current_size = 0;
        }
        current.files.push(file.clone());
        current_size += size;
    }

    if !current.files.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// File names [`export_chunked`] writes for a report split into `parts`
pub fn chunked_file_names(filename: &str, format: ExportFormat, parts: usize) -> Vec<String> {
    let extension = format.extension();
    if parts <= 1 {
        return vec![format!("{}.{}", filename, extension)];
    }

    let mut names: Vec<String> = (1..=parts)
        .map(|n| format!("{}_part{}.{}", filename, n, extension))
        .collect();
    names.push(format!("{}_index.txt", filename));
    names
}

/// First of `name`, `name_1`, `name_2`, ... none of whose report files for
/// `parts` chunks exist yet in `dir`
pub fn available_report_name(dir: &Path, name: &str, format: ExportFormat, parts: usize) -> String {
    if parts <= 1 {
        let extension = format.extension();
        return resolve_filename(dir, name, extension)
            .unwrap_or_else(|| unique_filename(dir, name, extension));
    }

    let is_free = |candidate: &str| {
        chunked_file_names(candidate, format, parts)
            .iter()
            .all(|file| !dir.join(file).exists())
    };
    if is_free(name) {
        return name.to_string();
    }
    (1..)
        .map(|n| format!("{}_{}", name, n))
        .find(|candidate| is_free(candidate))
        .unwrap_or_else(|| name.to_string())
}

/// Export `scan` in size-bounded parts
///
/// When everything fits in one chunk this is a plain [`export`] and the
/// returned list has one element. Otherwise every chunk is written as
/// `<filename>_part<N>` followed by a `<filename>_index.txt` listing the
/// parts; the index path is the last element of the returned list.
pub fn export_chunked(
    scan: &ScanResult,
    filename: &str,
    format: ExportFormat,
    output_dir: Option<&Path>,
    include_tree: bool,
    max_chunk_mb: u64,
) -> Result<Vec<PathBuf>> {
    let chunks = split_scan_result(scan, max_chunk_mb);

    if chunks.len() <= 1 {
        return Ok(vec![export(scan, filename, format, output_dir, include_tree)?]);
    }

    // One writer so every part carries the same generation time
    let writer = ReportWriter::new(format, include_tree);
    let mut outputs = Vec::with_capacity(chunks.len() + 1);
    for (i, chunk) in chunks.iter().enumerate() {
        let part_path = output_path(chunk, &format!("{}_part{}", filename, i + 1), format, output_dir)?;
        writer.write(chunk, &part_path)?;
        outputs.push(part_path);
    }

    let dir = output_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&scan.root));
    let index_path = dir.join(format!("{}_index.txt", filename));
    fs::write(&index_path, render_index(&chunks, &outputs))?;
    tracing::debug!(
        "Split report into {} parts, index at {}",
        chunks.len(),
        index_path.display()
    );

    outputs.push(index_path);
    Ok(outputs)
}

fn render_index(chunks: &[ScanResult], outputs: &[PathBuf]) -> String {
    let mut lines = vec![
        format!("Report split into {} parts:", chunks.len()),
        String::new(),
    ];

    for (i, (chunk, path)) in chunks.iter().zip(outputs).enumerate() {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        lines.push(format!("  Part {}: {} ({} files)", i + 1, name, chunk.files.len()));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FileEntry, IssueEntry, StructureEntry};
    use tempfile::tempdir;

    fn file_of(path: &str, size: usize) -> FileEntry {
        FileEntry {
            path: path.to_string(),
            encoding: "utf-8".to_string(),
            content: "a".repeat(size),
        }
    }

    fn scan_of(sizes: &[usize]) -> ScanResult {
        let mut scan = ScanResult::new("/project");
        for (i, size) in sizes.iter().enumerate() {
            let path = format!("f{}.txt", i);
            scan.structure.push(StructureEntry::file(path.clone()));
            scan.files.push(file_of(&path, *size));
        }
        scan.skipped.push(IssueEntry::new("img.png", "Binary file"));
        scan.errors.push(IssueEntry::new("locked", "Access denied"));
        scan
    }

    const MB: usize = 1024 * 1024;

    #[test]
    fn test_split_preserves_file_order() {
        let scan = scan_of(&[MB / 2, MB / 2, MB / 2, 3 * MB, 10]);
        let chunks = split_scan_result(&scan, 1);

        let rejoined: Vec<FileEntry> = chunks.iter().flat_map(|c| c.files.clone()).collect();
        assert_eq!(rejoined, scan.files);

        for chunk in &chunks {
            let total: usize = chunk.files.iter().map(|f| f.byte_len()).sum();
            assert!(total <= MB || chunk.files.len() == 1);
        }
        assert_eq!(chunks.len(), 4);
    }

    #[test]
    fn test_metadata_only_on_first_chunk() {
        let scan = scan_of(&[MB, MB]);
        let chunks = split_scan_result(&scan, 1);
        assert_eq!(chunks.len(), 2);

        assert_eq!(chunks[0].skipped.len(), 1);
        assert_eq!(chunks[0].errors.len(), 1);
        assert!(chunks[1].skipped.is_empty());
        assert!(chunks[1].errors.is_empty());
        assert_eq!(chunks[1].structure, scan.structure);
        assert_eq!(chunks[1].root, scan.root);
    }

    #[test]
    fn test_no_files_yields_no_chunks() {
        let scan = scan_of(&[]);
        assert!(split_scan_result(&scan, 1).is_empty());
    }

    #[test]
    fn test_export_chunked_single_part() -> Result<()> {
        let dir = tempdir()?;
        let scan = scan_of(&[10, 10]);
        let paths = export_chunked(&scan, "report", ExportFormat::Txt, Some(dir.path()), true, 1)?;
        assert_eq!(paths, vec![dir.path().join("report.txt")]);
        Ok(())
    }

    #[test]
    fn test_export_chunked_writes_parts_and_index() -> Result<()> {
        let dir = tempdir()?;
        let scan = scan_of(&[MB, MB / 2, 10]);
        let paths = export_chunked(&scan, "report", ExportFormat::Md, Some(dir.path()), true, 1)?;

        assert_eq!(
            paths,
            vec![
                dir.path().join("report_part1.md"),
                dir.path().join("report_part2.md"),
                dir.path().join("report_index.txt"),
            ]
        );

        let index = fs::read_to_string(dir.path().join("report_index.txt"))?;
        assert!(index.starts_with("Report split into 2 parts:"));
        assert!(index.contains("  Part 1: report_part1.md (1 files)"));
        assert!(index.contains("  Part 2: report_part2.md (2 files)"));
        Ok(())
    }

    #[test]
    fn test_chunked_file_names_match_export() -> Result<()> {
        let dir = tempdir()?;
        let scan = scan_of(&[MB, MB / 2, 10]);
        let parts = split_scan_result(&scan, 1).len();
        let paths = export_chunked(&scan, "ctx", ExportFormat::Json, Some(dir.path()), true, 1)?;

        let written: Vec<String> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(written, chunked_file_names("ctx", ExportFormat::Json, parts));
        assert_eq!(chunked_file_names("ctx", ExportFormat::Md, 1), vec!["ctx.md"]);
        Ok(())
    }

    #[test]
    fn test_available_name_avoids_existing_parts() -> Result<()> {
        let dir = tempdir()?;
        assert_eq!(available_report_name(dir.path(), "report", ExportFormat::Txt, 3), "report");

        // Only the index is taken; the plain report name is free
        fs::write(dir.path().join("report_index.txt"), "old index")?;
        assert_eq!(available_report_name(dir.path(), "report", ExportFormat::Txt, 3), "report_1");
        assert_eq!(available_report_name(dir.path(), "report", ExportFormat::Txt, 1), "report");

        fs::write(dir.path().join("report_1_part2.txt"), "old part")?;
        assert_eq!(available_report_name(dir.path(), "report", ExportFormat::Txt, 3), "report_2");
        // A single report only needs `<name>.<ext>`
        assert_eq!(available_report_name(dir.path(), "report_1", ExportFormat::Txt, 1), "report_1");
        Ok(())
    }
}
