mod canvas;
mod doc_template;
mod error;
mod flowable;
mod frame;
mod metrics;
mod page_template;
mod pdf;
mod pdfinspect;
mod types;

pub mod report;
pub mod sink;
pub mod summary;

pub use canvas::{Canvas, Command, Document, Page};
pub use doc_template::{DocTemplate, META_PAGE_TEMPLATE_KEY};
pub use error::ReportError;
pub use flowable::{
    BreakInside, Flowable, GRID_COLUMNS, GridCell, GridRow, HorizontalRule, Pagination,
    Paragraph, Spacer, TextStyle,
};
pub use frame::{AddResult, Frame};
pub use metrics::{DocumentMetrics, PageMetrics};
pub use page_template::{DocContext, FrameSpec, OnPageCallback, PageTemplate};
pub use pdf::{PdfOptions, document_to_pdf, document_to_pdf_with_metrics};
pub use pdfinspect::{
    PdfInspectError, PdfInspectErrorCode, PdfInspectReport, TextRun, inspect_pdf_bytes,
    inspect_pdf_path, require_readable, text_runs,
};
pub use readymeta_model::{EncodeMode, Metadata, fingerprint_sha256};
pub use report::{RenderOptions, Report, ReportRow, Section};
pub use sink::{PageDecoration, SinkStyle};
pub use types::{Color, Margins, Pt, Rect, Size};

use chrono::{DateTime, Local};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const DEFAULT_INPUT: &str = "yoda-metadata.json";
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

const FOOTER_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";
const PDF_DATE_FORMAT: &str = "D:%Y%m%d%H%M%S";

#[derive(Debug, Clone)]
pub struct Readymeta {
    style: SinkStyle,
    render_options: RenderOptions,
    tool_version: String,
}

#[derive(Debug, Clone)]
pub struct ReadymetaBuilder {
    page_size: Size,
    margin_mm: f32,
    row_height_mm: f32,
    description_divisor: f32,
    font_size: f32,
    neutral: Color,
    warning: Color,
    attention: Color,
    tool_version: String,
}

/// Everything produced for one metadata document, still in memory.
#[derive(Debug, Clone)]
pub struct RenderedReport {
    pub pdf: Vec<u8>,
    pub markdown: String,
    pub report: Report,
    pub metrics: DocumentMetrics,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Defaults to the input file's directory.
    pub output_dir: Option<PathBuf>,
    pub write_markdown: bool,
    /// Also write `<stem>.normalized.json` with empty fields omitted.
    pub write_normalized_json: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            output_dir: None,
            write_markdown: true,
            write_normalized_json: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionOutcome {
    pub input: PathBuf,
    pub pdf_path: PathBuf,
    pub markdown_path: Option<PathBuf>,
    pub normalized_json_path: Option<PathBuf>,
    pub page_count: usize,
    pub row_count: usize,
    pub warning_count: usize,
    pub fingerprint: String,
}

impl Readymeta {
    pub fn builder() -> ReadymetaBuilder {
        ReadymetaBuilder::new()
    }

    pub fn style(&self) -> &SinkStyle {
        &self.style
    }

    pub fn tool_version(&self) -> &str {
        &self.tool_version
    }

    pub fn render_report(&self, meta: &Metadata) -> Report {
        report::render_with(meta, &self.render_options)
    }

    /// Renders the PDF and the markdown summary for `meta`.
    ///
    /// `source_name` appears in the running header and footer. When a
    /// `fingerprint` is given it is recorded as the PDF subject. The PDF is
    /// parsed back before returning so a malformed file is never handed out.
    pub fn render(
        &self,
        meta: &Metadata,
        source_name: &str,
        generated_at: DateTime<Local>,
        fingerprint: Option<&str>,
    ) -> Result<RenderedReport, ReportError> {
        let report = self.render_report(meta);
        let decoration = PageDecoration::for_source(
            source_name,
            &generated_at.format(FOOTER_TIME_FORMAT).to_string(),
            &self.tool_version,
        );
        let (document, mut metrics) = sink::layout(&report, &self.style, &decoration)?;

        let options = PdfOptions {
            title: Some(decoration.header.clone()),
            subject: fingerprint.map(|hex| format!("sha256:{hex}")),
            producer: Some(format!("readymeta {}", self.tool_version)),
            creation_date: Some(generated_at.format(PDF_DATE_FORMAT).to_string()),
        };
        let pdf = document_to_pdf_with_metrics(&document, &options, Some(&mut metrics))?;
        verify_pdf(&pdf, document.pages.len())?;

        Ok(RenderedReport {
            pdf,
            markdown: summary::to_markdown(meta, source_name),
            report,
            metrics,
        })
    }

    /// Reads, renders and writes one metadata file.
    ///
    /// Nothing is written unless decoding and rendering both succeed. All
    /// outputs are staged as temporary files first and then renamed into
    /// place together; a failed rename removes the outputs already renamed.
    pub fn convert_file(
        &self,
        input: &Path,
        options: &ConvertOptions,
    ) -> Result<ConversionOutcome, ReportError> {
        let raw = std::fs::read(input)?;
        let fingerprint = fingerprint_sha256(&raw);
        log::debug!("read {} ({} bytes, sha256 {})", input.display(), raw.len(), fingerprint);
        let meta = Metadata::from_json_slice(&raw)?;

        let source_name = input
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| input.display().to_string());
        let rendered = self.render(&meta, &source_name, Local::now(), Some(&fingerprint))?;
        let normalized = if options.write_normalized_json {
            Some(encode_normalized(&meta)?)
        } else {
            None
        };

        let out_dir = match &options.output_dir {
            Some(dir) => dir.clone(),
            None => parent_dir(input).to_path_buf(),
        };
        let stem = input
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .filter(|stem| !stem.is_empty())
            .ok_or_else(|| {
                ReportError::InvalidConfiguration(format!(
                    "input path {} has no file name",
                    input.display()
                ))
            })?;

        let pdf_path = out_dir.join(format!("{stem}.pdf"));
        let markdown_path = options
            .write_markdown
            .then(|| out_dir.join(format!("{stem}.md")));
        let normalized_json_path = normalized
            .as_ref()
            .map(|_| out_dir.join(format!("{stem}.normalized.json")));

        let mut staged = vec![stage(&pdf_path, &rendered.pdf)?];
        if let Some(path) = &markdown_path {
            staged.push(stage(path, rendered.markdown.as_bytes())?);
        }
        if let (Some(path), Some(json)) = (&normalized_json_path, &normalized) {
            staged.push(stage(path, json.as_bytes())?);
        }
        commit(staged)?;

        let outcome = ConversionOutcome {
            input: input.to_path_buf(),
            pdf_path,
            markdown_path,
            normalized_json_path,
            page_count: rendered.metrics.page_count(),
            row_count: rendered.report.rows.len(),
            warning_count: rendered.report.warnings,
            fingerprint,
        };
        log::info!(
            "wrote {} ({} pages, {} rows, {} bytes)",
            outcome.pdf_path.display(),
            outcome.page_count,
            outcome.row_count,
            rendered.metrics.total_bytes
        );
        if outcome.warning_count > 0 {
            log::warn!(
                "{}: {} fields are missing or empty",
                source_name,
                outcome.warning_count
            );
        }
        Ok(outcome)
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

fn verify_pdf(pdf: &[u8], expected_pages: usize) -> Result<(), ReportError> {
    let inspected = inspect_pdf_bytes(pdf).map_err(|err| ReportError::InvalidOutput(err.to_string()))?;
    require_readable(&inspected).map_err(|err| ReportError::InvalidOutput(err.to_string()))?;
    if inspected.page_count != expected_pages {
        return Err(ReportError::InvalidOutput(format!(
            "expected {} pages, found {}",
            expected_pages, inspected.page_count
        )));
    }
    Ok(())
}

fn encode_normalized(meta: &Metadata) -> Result<String, ReportError> {
    meta.to_json_pretty(EncodeMode::OmitEmpty).map_err(encode_failure)
}

fn encode_failure(err: serde_json::Error) -> ReportError {
    ReportError::InvalidOutput(format!("normalized json: {err}"))
}

/// A fully written temporary file waiting to be renamed onto `path`.
struct StagedOutput {
    path: PathBuf,
    file: tempfile::NamedTempFile,
}

// The temporary file lives next to the target so the final rename stays on one filesystem.
fn stage(path: &Path, bytes: &[u8]) -> Result<StagedOutput, ReportError> {
    let mut file = tempfile::NamedTempFile::new_in(parent_dir(path))?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    Ok(StagedOutput {
        path: path.to_path_buf(),
        file,
    })
}

/// Renames every staged file into place. If one rename fails, the outputs
/// already renamed are removed and the remaining temporaries are dropped.
fn commit(staged: Vec<StagedOutput>) -> Result<(), ReportError> {
    let mut committed: Vec<PathBuf> = Vec::with_capacity(staged.len());
    for StagedOutput { path, file } in staged {
        let size = file.as_file().metadata().map(|m| m.len()).unwrap_or(0);
        if let Err(err) = file.persist(&path) {
            for done in &committed {
                if let Err(remove_err) = std::fs::remove_file(done) {
                    log::warn!("could not roll back {}: {}", done.display(), remove_err);
                }
            }
            return Err(ReportError::Io(err.error));
        }
        log::debug!("wrote {} ({} bytes)", path.display(), size);
        committed.push(path);
    }
    Ok(())
}

impl ReadymetaBuilder {
    pub fn new() -> Self {
        let defaults = SinkStyle::default();
        let options = RenderOptions::default();
        Self {
            page_size: defaults.page_size,
            margin_mm: 10.0,
            row_height_mm: options.row_height_mm,
            description_divisor: options.description_divisor,
            font_size: defaults.font_size.to_f32(),
            neutral: defaults.neutral,
            warning: defaults.warning,
            attention: defaults.attention,
            tool_version: TOOL_VERSION.to_string(),
        }
    }

    pub fn page_size(mut self, size: Size) -> Self {
        self.page_size = size;
        self
    }

    pub fn margin_mm(mut self, mm: f32) -> Self {
        self.margin_mm = mm;
        self
    }

    pub fn row_height_mm(mut self, mm: f32) -> Self {
        self.row_height_mm = mm;
        self
    }

    // Characters per millimetre of description height.
    pub fn description_divisor(mut self, divisor: f32) -> Self {
        self.description_divisor = divisor;
        self
    }

    pub fn font_size(mut self, size: f32) -> Self {
        self.font_size = size;
        self
    }

    pub fn neutral_color(mut self, color: Color) -> Self {
        self.neutral = color;
        self
    }

    pub fn warning_color(mut self, color: Color) -> Self {
        self.warning = color;
        self
    }

    pub fn attention_color(mut self, color: Color) -> Self {
        self.attention = color;
        self
    }

    pub fn tool_version(mut self, version: impl Into<String>) -> Self {
        self.tool_version = version.into();
        self
    }

    pub fn build(self) -> Result<Readymeta, ReportError> {
        let positive = |name: &str, value: f32| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(ReportError::InvalidConfiguration(format!(
                    "{name} must be a positive number, got {value}"
                )))
            }
        };
        positive("row_height_mm", self.row_height_mm)?;
        positive("description_divisor", self.description_divisor)?;
        positive("font_size", self.font_size)?;
        if !self.margin_mm.is_finite() || self.margin_mm < 0.0 {
            return Err(ReportError::InvalidConfiguration(format!(
                "margin_mm must not be negative, got {}",
                self.margin_mm
            )));
        }
        for (name, color) in [
            ("neutral_color", self.neutral),
            ("warning_color", self.warning),
            ("attention_color", self.attention),
        ] {
            if !color.is_valid() {
                return Err(ReportError::InvalidConfiguration(format!(
                    "{name} components must be within 0..=1"
                )));
            }
        }

        let style = SinkStyle {
            page_size: self.page_size,
            margins: Margins::all_mm(self.margin_mm),
            row_height: Pt::from_mm(self.row_height_mm),
            font_size: Pt::from_f32(self.font_size),
            neutral: self.neutral,
            warning: self.warning,
            attention: self.attention,
        };
        // Surfaces page geometry errors at configuration time.
        sink::page_template(
            &style,
            &PageDecoration::for_source(DEFAULT_INPUT, "", &self.tool_version),
        )?;

        Ok(Readymeta {
            style,
            render_options: RenderOptions {
                row_height_mm: self.row_height_mm,
                description_divisor: self.description_divisor,
            },
            tool_version: self.tool_version,
        })
    }
}

impl Default for ReadymetaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for Readymeta {
    fn default() -> Self {
        let style = SinkStyle::default();
        Self {
            style,
            render_options: RenderOptions::default(),
            tool_version: TOOL_VERSION.to_string(),
        }
    }
}
