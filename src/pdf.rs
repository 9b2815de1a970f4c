use crate::canvas::{Command, Document, Page};
use crate::metrics::{DocumentMetrics, PageMetrics};
use crate::types::{Color, Pt, Size};
use fixed::types::I32F32;
use std::collections::BTreeMap;
use std::io;

const PDF_CATALOG_ID: usize = 1;
const PDF_PAGES_ID: usize = 2;
const PDF_RESOURCES_ID: usize = 3;
const DEFAULT_FONT: &str = "Helvetica";

#[derive(Debug, Clone, Default)]
pub struct PdfOptions {
    pub title: Option<String>,
    pub subject: Option<String>,
    pub producer: Option<String>,
    /// Already formatted as a PDF date string (`D:YYYYMMDDHHmmSS`).
    pub creation_date: Option<String>,
}

pub fn document_to_pdf(document: &Document, options: &PdfOptions) -> io::Result<Vec<u8>> {
    document_to_pdf_with_metrics(document, options, None)
}

pub fn document_to_pdf_with_metrics(
    document: &Document,
    options: &PdfOptions,
    mut metrics: Option<&mut DocumentMetrics>,
) -> io::Result<Vec<u8>> {
    if document.pages.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "document has no pages",
        ));
    }

    let fonts = collect_font_names(document);
    let font_map: BTreeMap<String, String> = fonts
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.clone(), format!("F{}", idx + 1)))
        .collect();

    // 1 catalog, 2 pages, 3 resources, then fonts, then page/content pairs, then info.
    let first_font_id = PDF_RESOURCES_ID + 1;
    let first_page_id = first_font_id + fonts.len();
    let info_id = first_page_id + document.pages.len() * 2;

    let mut objects: Vec<String> = Vec::new();
    objects.push(format!(
        "<< /Type /Catalog /Pages {} 0 R >>",
        PDF_PAGES_ID
    ));
    let kids = (0..document.pages.len())
        .map(|idx| format!("{} 0 R", first_page_id + idx * 2))
        .collect::<Vec<_>>()
        .join(" ");
    objects.push(format!(
        "<< /Type /Pages /Kids [{}] /Count {} >>",
        kids,
        document.pages.len()
    ));
    let font_entries: Vec<(String, usize)> = fonts
        .iter()
        .enumerate()
        .map(|(idx, name)| (font_map[name].clone(), first_font_id + idx))
        .collect();
    objects.push(format!("<< /Font {} >>", font_resources(&font_entries)));
    for name in &fonts {
        objects.push(font_object(name));
    }

    for (page_index, page) in document.pages.iter().enumerate() {
        let content = render_page(page, document.page_size.height, &font_map);
        if let Some(metrics) = metrics.as_deref_mut() {
            if metrics.pages.len() <= page_index {
                metrics
                    .pages
                    .resize_with(page_index + 1, PageMetrics::default);
            }
            let entry = &mut metrics.pages[page_index];
            if entry.page_number == 0 {
                entry.page_number = page_index + 1;
            }
            entry.content_bytes = content.len();
        }
        let content_id = first_page_id + page_index * 2 + 1;
        objects.push(page_object(document.page_size, content_id));
        objects.push(stream_object(&content));
    }
    objects.push(info_object(options));

    let bytes = build_pdf(objects, PDF_CATALOG_ID, Some(info_id));
    if let Some(metrics) = metrics {
        metrics.total_bytes = bytes.len();
    }
    Ok(bytes)
}

fn collect_font_names(document: &Document) -> Vec<String> {
    let mut names = vec![DEFAULT_FONT.to_string()];
    for page in &document.pages {
        for cmd in &page.commands {
            if let Command::SetFontName(name) = cmd {
                let name = sanitize_font_name(name);
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
    }
    names
}

fn font_object(name: &str) -> String {
    format!(
        "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
        sanitize_font_name(name)
    )
}

fn font_resources(fonts: &[(String, usize)]) -> String {
    let mut entries = Vec::new();
    for (resource, font_id) in fonts {
        entries.push(format!("/{} {} 0 R", resource, font_id));
    }
    format!("<< {} >>", entries.join(" "))
}

fn sanitize_font_name(name: &str) -> String {
    let mut out = String::new();
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() || ch == '-' {
            out.push(ch);
        } else if ch == ' ' {
            out.push('-');
        }
    }
    if out.is_empty() {
        DEFAULT_FONT.to_string()
    } else {
        out
    }
}

fn page_object(page_size: Size, content_id: usize) -> String {
    format!(
        "<< /Type /Page /Parent {} 0 R /MediaBox [0 0 {} {}] /Resources {} 0 R /Contents {} 0 R >>",
        PDF_PAGES_ID,
        fmt_pt(page_size.width),
        fmt_pt(page_size.height),
        PDF_RESOURCES_ID,
        content_id
    )
}

// Canvas coordinates are top-left based; text is positioned by the top of its em box.
// Font selection is applied per text object, so it is saved and restored alongside q/Q.
fn render_page(page: &Page, page_height: Pt, font_map: &BTreeMap<String, String>) -> String {
    let mut out = String::new();
    let mut current_font_size = Pt::from_f32(12.0);
    let mut current_font_name = DEFAULT_FONT.to_string();
    let mut replaced = 0usize;
    let mut font_stack: Vec<(String, Pt)> = Vec::new();

    for cmd in &page.commands {
        match cmd {
            Command::SaveState => {
                font_stack.push((current_font_name.clone(), current_font_size));
                out.push_str("q\n");
            }
            Command::RestoreState => {
                if let Some((name, size)) = font_stack.pop() {
                    current_font_name = name;
                    current_font_size = size;
                }
                out.push_str("Q\n");
            }
            Command::Meta { .. } => {}
            Command::SetFillColor(color) => out.push_str(&color_to_pdf_fill(*color)),
            Command::SetStrokeColor(color) => out.push_str(&color_to_pdf_stroke(*color)),
            Command::SetLineWidth(width) => {
                out.push_str(&format!("{} w\n", fmt_pt(*width)));
            }
            Command::SetFontName(name) => {
                current_font_name = sanitize_font_name(name);
            }
            Command::SetFontSize(size) => {
                current_font_size = *size;
            }
            Command::MoveTo { x, y } => {
                out.push_str(&format!("{} {} m\n", fmt_pt(*x), fmt_pt(page_height - *y)));
            }
            Command::LineTo { x, y } => {
                out.push_str(&format!("{} {} l\n", fmt_pt(*x), fmt_pt(page_height - *y)));
            }
            Command::Stroke => out.push_str("S\n"),
            Command::DrawString { x, y, text } => {
                let resource = font_map
                    .get(&current_font_name)
                    .map(String::as_str)
                    .unwrap_or("F1");
                let encoded = encode_winansi_pdf_string(text);
                replaced += encoded.replaced;
                out.push_str("BT\n");
                out.push_str(&format!("/{} {} Tf\n", resource, fmt_pt(current_font_size)));
                out.push_str(&format!(
                    "{} {} Td\n",
                    fmt_pt(*x),
                    fmt_pt(page_height - *y - current_font_size)
                ));
                out.push_str(&format!("({}) Tj\n", encoded.text));
                out.push_str("ET\n");
            }
        }
    }
    if replaced > 0 {
        log::debug!("{} characters outside WinAnsi were replaced with '?'", replaced);
    }
    out
}

fn stream_object(content: &str) -> String {
    let length = content.len();
    format!("<< /Length {} >>\nstream\n{}\nendstream", length, content)
}

fn info_object(options: &PdfOptions) -> String {
    let mut entries: Vec<String> = Vec::new();
    if let Some(title) = options.title.as_deref() {
        entries.push(format!("/Title {}", pdf_text_string(title)));
    }
    if let Some(subject) = options.subject.as_deref() {
        entries.push(format!("/Subject {}", pdf_text_string(subject)));
    }
    let producer = options.producer.as_deref().unwrap_or("readymeta");
    entries.push(format!("/Producer {}", pdf_text_string(producer)));
    if let Some(date) = options.creation_date.as_deref() {
        entries.push(format!("/CreationDate ({})", escape_pdf_string(date)));
    }
    format!("<< {} >>", entries.join(" "))
}

fn build_pdf(objects: Vec<String>, catalog_id: usize, info_id: Option<usize>) -> Vec<u8> {
    let mut out: Vec<u8> = Vec::new();
    out.extend_from_slice(b"%PDF-1.7\n");
    out.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");

    let mut offsets = Vec::new();
    for (index, obj) in objects.iter().enumerate() {
        offsets.push(out.len());
        let obj_id = index + 1;
        out.extend_from_slice(format!("{} 0 obj\n", obj_id).as_bytes());
        out.extend_from_slice(obj.as_bytes());
        out.extend_from_slice(b"\nendobj\n");
    }

    let xref_start = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");
    for offset in offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }

    let mut trailer = format!(
        "trailer\n<< /Size {} /Root {} 0 R",
        objects.len() + 1,
        catalog_id
    );
    if let Some(info_id) = info_id {
        trailer.push_str(&format!(" /Info {} 0 R", info_id));
    }
    trailer.push_str(&format!(" >>\nstartxref\n{}\n%%EOF", xref_start));
    out.extend_from_slice(trailer.as_bytes());

    out
}

/// Info dictionary text: a literal string for ASCII, otherwise UTF-16BE with a byte order mark.
fn pdf_text_string(input: &str) -> String {
    if input.is_ascii() {
        return format!("({})", escape_pdf_string(input));
    }
    let mut out = String::from("<FEFF");
    for unit in input.encode_utf16() {
        out.push_str(&format!("{:04X}", unit));
    }
    out.push('>');
    out
}

fn escape_pdf_string(input: &str) -> String {
    let mut out = String::new();
    for ch in input.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(ch),
        }
    }
    out
}

struct WinAnsiEncoded {
    text: String,
    replaced: usize,
}

fn encode_winansi_pdf_string(input: &str) -> WinAnsiEncoded {
    let mut out = String::new();
    let mut replaced = 0usize;
    for ch in input.chars() {
        let byte = match ch {
            '\u{0000}'..='\u{007F}' => ch as u8,
            '\u{00A0}'..='\u{00FF}' => ch as u8,
            // cp1252 extensions
            '\u{20AC}' => 0x80,
            '\u{201A}' => 0x82,
            '\u{0192}' => 0x83,
            '\u{201E}' => 0x84,
            '\u{2026}' => 0x85,
            '\u{2020}' => 0x86,
            '\u{2021}' => 0x87,
            '\u{02C6}' => 0x88,
            '\u{2030}' => 0x89,
            '\u{0160}' => 0x8A,
            '\u{2039}' => 0x8B,
            '\u{0152}' => 0x8C,
            '\u{017D}' => 0x8E,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{02DC}' => 0x98,
            '\u{2122}' => 0x99,
            '\u{0161}' => 0x9A,
            '\u{203A}' => 0x9B,
            '\u{0153}' => 0x9C,
            '\u{017E}' => 0x9E,
            '\u{0178}' => 0x9F,
            _ => {
                replaced += 1;
                b'?'
            }
        };

        match byte {
            b'\\' => out.push_str("\\\\"),
            b'(' => out.push_str("\\("),
            b')' => out.push_str("\\)"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b if b < 0x20 || b >= 0x7f => out.push_str(&format!("\\{:03o}", b)),
            b => out.push(b as char),
        }
    }

    WinAnsiEncoded {
        text: out,
        replaced,
    }
}

fn fmt(value: f32) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let fixed = I32F32::from_num(value);
    let scaled = (fixed * I32F32::from_num(1000)).round();
    let milli: i64 = scaled.to_num();
    format_milli(milli)
}

fn format_milli(milli: i64) -> String {
    if milli == 0 {
        return "0".to_string();
    }
    let sign = if milli < 0 { "-" } else { "" };
    let abs = milli.abs();
    let int_part = abs / 1000;
    let frac_part = abs % 1000;
    if frac_part == 0 {
        format!("{}{}", sign, int_part)
    } else {
        let mut s = format!("{}{}.{:03}", sign, int_part, frac_part);
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
        s
    }
}

fn fmt_pt(value: Pt) -> String {
    format_milli(value.to_milli_i64())
}

fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}

fn color_to_pdf_fill(color: Color) -> String {
    format!(
        "{} {} {} rg\n",
        fmt(clamp_unit(color.r)),
        fmt(clamp_unit(color.g)),
        fmt(clamp_unit(color.b))
    )
}

fn color_to_pdf_stroke(color: Color) -> String {
    format!(
        "{} {} {} RG\n",
        fmt(clamp_unit(color.r)),
        fmt(clamp_unit(color.g)),
        fmt(clamp_unit(color.b))
    )
}
