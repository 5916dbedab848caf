//! Paginated PDF report
//!
//! Uses the built-in Courier fonts, so text is reduced to printable ASCII and
//! every rendered line is cut to [`MAX_LINE_CHARS`]. The other formats carry
//! the full content.

use std::io::BufWriter;

use chrono::{DateTime, Local};
use printpdf::{
    BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
};

use super::{timestamp, tree_lines};
use crate::error::{ContextError, Result};
use crate::types::ScanResult;

/// Characters kept per rendered line
pub const MAX_LINE_CHARS: usize = 100;

const PAGE_WIDTH_MM: f64 = 210.0;
const PAGE_HEIGHT_MM: f64 = 297.0;
const MARGIN_MM: f64 = 12.0;
const LINE_HEIGHT_MM: f64 = 3.8;
const LAYER_NAME: &str = "Layer 1";

fn pdf_error<E: std::fmt::Debug>(err: E) -> ContextError {
    ContextError::Pdf(format!("{:?}", err))
}

/// Printable ASCII version of one line, cut to the line budget
fn printable(line: &str) -> String {
    line.replace('\t', "    ")
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| if c.is_ascii() { c } else { '?' })
        .take(MAX_LINE_CHARS)
        .collect()
}

struct PdfComposer {
    doc: PdfDocumentReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    layer: PdfLayerReference,
    cursor_mm: f64,
}

impl PdfComposer {
    fn new(title: &str) -> Result<Self> {
        let (doc, page, layer) = PdfDocument::new(
            title,
            Mm(PAGE_WIDTH_MM as _),
            Mm(PAGE_HEIGHT_MM as _),
            LAYER_NAME,
        );
        let regular = doc.add_builtin_font(BuiltinFont::Courier).map_err(pdf_error)?;
        let bold = doc
            .add_builtin_font(BuiltinFont::CourierBold)
            .map_err(pdf_error)?;
        let layer = doc.get_page(page).get_layer(layer);

        Ok(Self {
            doc,
            regular,
            bold,
            layer,
            cursor_mm: PAGE_HEIGHT_MM - MARGIN_MM,
        })
    }

    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(
            Mm(PAGE_WIDTH_MM as _),
            Mm(PAGE_HEIGHT_MM as _),
            LAYER_NAME,
        );
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.cursor_mm = PAGE_HEIGHT_MM - MARGIN_MM;
    }

    fn write_line(&mut self, text: &str, bold: bool) {
        if self.cursor_mm < MARGIN_MM {
            self.new_page();
        }
        let line = printable(text);
        if !line.is_empty() {
            let font = if bold { &self.bold } else { &self.regular };
            self.layer.use_text(
                line,
                8.0,
                Mm(MARGIN_MM as _),
                Mm(self.cursor_mm as _),
                font,
            );
        }
        self.cursor_mm -= LINE_HEIGHT_MM;
    }

    fn heading(&mut self, text: &str) {
        self.write_line("", false);
        self.write_line(text, true);
        self.write_line(&"-".repeat(MAX_LINE_CHARS), false);
    }

    fn finish(self) -> Result<Vec<u8>> {
        let mut buffer = BufWriter::new(Vec::new());
        self.doc.save(&mut buffer).map_err(pdf_error)?;
        buffer.into_inner().map_err(|e| ContextError::Io(e.into_error()))
    }
}

pub(super) fn render(
    scan: &ScanResult,
    include_tree: bool,
    generated_at: &DateTime<Local>,
) -> Result<Vec<u8>> {
    let mut pdf = PdfComposer::new("Project Structure Report")?;

    pdf.write_line("PROJECT STRUCTURE REPORT", true);
    pdf.write_line(&format!("Date: {}", timestamp(generated_at)), false);
    pdf.write_line(&format!("Root directory: {}", scan.root), false);

    if include_tree {
        pdf.heading("DIRECTORY TREE");
        for line in tree_lines(&scan.structure, "    ", "+", "-") {
            pdf.write_line(&line, false);
        }
    }

    pdf.heading("FILE CONTENTS");
    for file in &scan.files {
        pdf.write_line("", false);
        pdf.write_line(&format!("File: {} ({})", file.path, file.encoding), true);
        for line in file.content.lines() {
            pdf.write_line(line, false);
        }
    }

    if !scan.skipped.is_empty() {
        pdf.heading("SKIPPED FILES");
        for item in &scan.skipped {
            pdf.write_line(&format!("! {} - {}", item.path, item.reason), false);
        }
    }

    if !scan.errors.is_empty() {
        pdf.heading("ERRORS");
        for item in &scan.errors {
            pdf.write_line(&format!("x {} - {}", item.path, item.reason), false);
        }
    }

    pdf.finish()
}
