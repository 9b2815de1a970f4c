use lopdf::Document as LoDocument;
use lopdf::content::Content;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdfInspectErrorCode {
    PdfParseFailed,
    PdfEncryptedUnsupported,
    PdfEmptyOrNoPages,
    PdfIoError,
}

impl PdfInspectErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PdfInspectErrorCode::PdfParseFailed => "PDF_PARSE_FAILED",
            PdfInspectErrorCode::PdfEncryptedUnsupported => "PDF_ENCRYPTED_UNSUPPORTED",
            PdfInspectErrorCode::PdfEmptyOrNoPages => "PDF_EMPTY_OR_NO_PAGES",
            PdfInspectErrorCode::PdfIoError => "PDF_IO_ERROR",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfInspectError {
    pub code: PdfInspectErrorCode,
    pub message: String,
}

impl std::fmt::Display for PdfInspectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for PdfInspectError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfInspectReport {
    pub pdf_version: String,
    pub page_count: usize,
    pub encrypted: bool,
    pub file_size_bytes: usize,
    pub title: Option<String>,
    pub subject: Option<String>,
}

/// A text-showing operation with the fill colour in effect when it ran.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub page: usize,
    pub text: String,
    pub fill: [f32; 3],
}

fn parse(bytes: &[u8]) -> Result<LoDocument, PdfInspectError> {
    LoDocument::load_mem(bytes).map_err(|err| PdfInspectError {
        code: PdfInspectErrorCode::PdfParseFailed,
        message: err.to_string(),
    })
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

// PDF text strings are either PDFDocEncoding (read as Latin-1) or UTF-16BE behind a BOM.
fn decode_text_string(bytes: &[u8]) -> String {
    match bytes {
        [0xFE, 0xFF, rest @ ..] => {
            let units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        _ => latin1(bytes),
    }
}

fn info_string(pdf: &LoDocument, key: &[u8]) -> Option<String> {
    let info_ref = pdf.trailer.get(b"Info").ok()?.as_reference().ok()?;
    let info = pdf.get_dictionary(info_ref).ok()?;
    info.get(key).ok()?.as_str().ok().map(decode_text_string)
}

pub fn inspect_pdf_bytes(bytes: &[u8]) -> Result<PdfInspectReport, PdfInspectError> {
    let pdf = parse(bytes)?;
    Ok(PdfInspectReport {
        pdf_version: pdf.version.clone(),
        page_count: pdf.get_pages().len(),
        encrypted: pdf.is_encrypted(),
        file_size_bytes: bytes.len(),
        title: info_string(&pdf, b"Title"),
        subject: info_string(&pdf, b"Subject"),
    })
}

pub fn inspect_pdf_path(path: &Path) -> Result<PdfInspectReport, PdfInspectError> {
    let data = std::fs::read(path).map_err(|err| PdfInspectError {
        code: PdfInspectErrorCode::PdfIoError,
        message: err.to_string(),
    })?;
    inspect_pdf_bytes(&data)
}

pub fn require_readable(report: &PdfInspectReport) -> Result<(), PdfInspectError> {
    if report.encrypted {
        return Err(PdfInspectError {
            code: PdfInspectErrorCode::PdfEncryptedUnsupported,
            message: "encrypted pdf output is not supported".to_string(),
        });
    }
    if report.page_count == 0 {
        return Err(PdfInspectError {
            code: PdfInspectErrorCode::PdfEmptyOrNoPages,
            message: "pdf has no pages".to_string(),
        });
    }
    Ok(())
}

/// Decodes every page's content stream and returns the `Tj` strings in drawing order.
pub fn text_runs(bytes: &[u8]) -> Result<Vec<TextRun>, PdfInspectError> {
    let pdf = parse(bytes)?;
    let mut runs = Vec::new();
    for (page_index, (_, page_id)) in pdf.get_pages().into_iter().enumerate() {
        let data = pdf.get_page_content(page_id).map_err(|err| PdfInspectError {
            code: PdfInspectErrorCode::PdfParseFailed,
            message: err.to_string(),
        })?;
        let content = Content::decode(&data).map_err(|err| PdfInspectError {
            code: PdfInspectErrorCode::PdfParseFailed,
            message: err.to_string(),
        })?;
        let mut fill = [0.0f32; 3];
        for op in content.operations {
            match op.operator.as_str() {
                "rg" if op.operands.len() == 3 => {
                    for (slot, operand) in fill.iter_mut().zip(op.operands.iter()) {
                        *slot = operand.as_float().unwrap_or(0.0);
                    }
                }
                "Tj" => {
                    if let Some(text) = op.operands.first().and_then(|o| o.as_str().ok()) {
                        runs.push(TextRun {
                            page: page_index + 1,
                            text: latin1(text),
                            fill,
                        });
                    }
                }
                _ => {}
            }
        }
    }
    Ok(runs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Canvas;
    use crate::pdf::{PdfOptions, document_to_pdf};
    use crate::types::{Color, Pt, Size};
    use std::io::Write;

    fn sample_pdf() -> Vec<u8> {
        let mut canvas = Canvas::new(Size::a4());
        canvas.draw_string(Pt::from_f32(30.0), Pt::from_f32(30.0), "Title");
        canvas.set_fill_color(Color::rgb(0.0, 0.0, 1.0));
        canvas.draw_string(Pt::from_f32(30.0), Pt::from_f32(50.0), "<empty>");
        canvas.show_page();
        canvas.draw_string(Pt::from_f32(30.0), Pt::from_f32(30.0), "Caf\u{e9}");
        let options = PdfOptions {
            title: Some("meta.json".to_string()),
            subject: Some("sha256:00ff".to_string()),
            ..PdfOptions::default()
        };
        document_to_pdf(&canvas.finish(), &options).expect("pdf")
    }

    #[test]
    fn inspect_pdf_bytes_reads_version_page_count_and_info() {
        let bytes = sample_pdf();
        let report = inspect_pdf_bytes(&bytes).expect("inspect");
        assert_eq!(report.page_count, 2);
        assert!(!report.encrypted);
        assert_eq!(report.file_size_bytes, bytes.len());
        assert_eq!(report.pdf_version, "1.7");
        assert_eq!(report.title.as_deref(), Some("meta.json"));
        assert_eq!(report.subject.as_deref(), Some("sha256:00ff"));
        require_readable(&report).expect("readable");
    }

    #[test]
    fn text_runs_track_fill_colour_per_page() {
        let runs = text_runs(&sample_pdf()).expect("runs");
        let texts: Vec<(usize, &str)> = runs.iter().map(|r| (r.page, r.text.as_str())).collect();
        assert_eq!(texts, vec![(1, "Title"), (1, "<empty>"), (2, "Caf\u{e9}")]);
        assert_eq!(runs[0].fill, [0.0, 0.0, 0.0]);
        assert_eq!(runs[1].fill, [0.0, 0.0, 1.0]);
        assert_eq!(runs[2].fill, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn non_latin_titles_survive_the_info_dictionary() {
        let mut canvas = Canvas::new(Size::a4());
        canvas.draw_string(Pt::ZERO, Pt::ZERO, "x");
        let options = PdfOptions {
            title: Some("\"\u{6570}\u{636e}\u{96c6} \u{141}\u{f3}d\u{17a}.json\" metadata".to_string()),
            ..PdfOptions::default()
        };
        let bytes = document_to_pdf(&canvas.finish(), &options).expect("pdf");
        let report = inspect_pdf_bytes(&bytes).expect("inspect");
        assert_eq!(
            report.title.as_deref(),
            Some("\"\u{6570}\u{636e}\u{96c6} \u{141}\u{f3}d\u{17a}.json\" metadata")
        );
    }

    #[test]
    fn inspect_pdf_bytes_rejects_malformed_data() {
        let err = inspect_pdf_bytes(b"not a pdf").expect_err("invalid");
        assert_eq!(err.code, PdfInspectErrorCode::PdfParseFailed);
    }

    #[test]
    fn inspect_pdf_path_reports_io_error_for_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = inspect_pdf_path(&dir.path().join("missing.pdf")).expect_err("missing");
        assert_eq!(err.code, PdfInspectErrorCode::PdfIoError);
    }

    #[test]
    fn readability_rejects_encrypted_and_empty_reports() {
        let mut report = PdfInspectReport {
            pdf_version: "1.7".to_string(),
            page_count: 1,
            encrypted: true,
            file_size_bytes: 0,
            title: None,
            subject: None,
        };
        let err = require_readable(&report).expect_err("must fail");
        assert_eq!(err.code, PdfInspectErrorCode::PdfEncryptedUnsupported);
        report.encrypted = false;
        report.page_count = 0;
        let err = require_readable(&report).expect_err("must fail");
        assert_eq!(err.code, PdfInspectErrorCode::PdfEmptyOrNoPages);
    }

    #[test]
    fn inspect_pdf_path_matches_bytes_report() {
        let bytes = sample_pdf();
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(&bytes).expect("write");
        let from_path = inspect_pdf_path(file.path()).expect("inspect path");
        let from_bytes = inspect_pdf_bytes(&bytes).expect("inspect bytes");
        assert_eq!(from_path, from_bytes);
    }
}
