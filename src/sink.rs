use crate::canvas::Document;
use crate::doc_template::DocTemplate;
use crate::error::ReportError;
use crate::flowable::{
    Flowable, GRID_COLUMNS, GridCell, GridRow, HorizontalRule, Paragraph, Spacer, TextStyle,
};
use crate::metrics::DocumentMetrics;
use crate::page_template::PageTemplate;
use crate::report::{Emphasis, Report, ReportRow, RowContent, RowHeight, RowKind, Section, Tone};
use crate::types::{Color, Margins, Pt, Rect, Size};

/// Meta marker key recording which report section a drawn row belongs to.
pub const META_SECTION_KEY: &str = "section";
pub const PAGE_TEMPLATE_NAME: &str = "report";

const HEADER_FONT_SIZE: f32 = 12.0;
const FOOTER_FONT_SIZE: f32 = 6.0;
const RULE_THICKNESS: f32 = 0.5;
const RULE_ROW_MM: f32 = 10.0;
const SECTION_GAP_MM: f32 = 2.0;
const DIAGNOSTICS_GAP_MM: f32 = 20.0;
const FOOTER_GAP_MM: f32 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub struct SinkStyle {
    pub page_size: Size,
    pub margins: Margins,
    pub row_height: Pt,
    pub font_size: Pt,
    pub neutral: Color,
    pub warning: Color,
    pub attention: Color,
}

impl Default for SinkStyle {
    fn default() -> Self {
        Self {
            page_size: Size::a4(),
            margins: Margins::all_mm(10.0),
            row_height: Pt::from_mm(4.0),
            font_size: Pt::from_f32(10.0),
            neutral: Color::BLACK,
            warning: Color::from_rgb8(0, 0, 255),
            attention: Color::from_rgb8(255, 165, 0),
        }
    }
}

/// Running header and footer text repeated on every page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageDecoration {
    pub header: String,
    pub footer: String,
}

impl PageDecoration {
    pub fn for_source(source_name: &str, generated_on: &str, tool_version: &str) -> Self {
        Self {
            header: format!("\"{source_name}\" metadata"),
            footer: format!(
                "\"{source_name}\" metadata generated on {generated_on}\nby readYmeta v{tool_version}"
            ),
        }
    }
}

/// Flagged rows take the warning colour; otherwise the renderer's tone decides.
pub fn text_color(row: &ReportRow, style: &SinkStyle) -> Color {
    if row.flagged {
        return style.warning;
    }
    match row.hint.tone {
        Tone::Attention => style.attention,
        Tone::Neutral => style.neutral,
    }
}

fn rule(style: &SinkStyle) -> HorizontalRule {
    let thickness = Pt::from_f32(RULE_THICKNESS);
    let padding = (Pt::from_mm(RULE_ROW_MM) - thickness).mul_ratio(1, 2);
    HorizontalRule::new(thickness, style.neutral).with_padding(padding)
}

fn header_paragraph(style: &SinkStyle, decoration: &PageDecoration) -> Paragraph {
    Paragraph::new(decoration.header.as_str())
        .with_style(TextStyle::sized(Pt::from_f32(HEADER_FONT_SIZE)).with_color(style.neutral))
}

fn footer_paragraph(style: &SinkStyle, decoration: &PageDecoration) -> Paragraph {
    Paragraph::new(decoration.footer.as_str()).with_style(
        TextStyle::sized(Pt::from_f32(FOOTER_FONT_SIZE))
            .with_color(style.neutral)
            .italic(true),
    )
}

struct PageGeometry {
    content: Rect,
    body: Rect,
    header_height: Pt,
    footer_height: Pt,
}

fn page_geometry(style: &SinkStyle, decoration: &PageDecoration) -> Result<PageGeometry, ReportError> {
    let content = style.margins.content_rect(style.page_size);
    if content.width <= Pt::ZERO || content.height <= Pt::ZERO {
        return Err(ReportError::InvalidConfiguration(
            "margins leave no room on the page".to_string(),
        ));
    }
    let header_text = header_paragraph(style, decoration)
        .wrap(content.width, content.height)
        .height;
    let header_height = header_text.max(style.row_height) + rule(style).height();
    let footer_height = footer_paragraph(style, decoration)
        .wrap(content.width, content.height)
        .height;
    let reserved = header_height + footer_height + Pt::from_mm(FOOTER_GAP_MM);
    let body_height = content.height - reserved;
    if body_height < style.row_height {
        return Err(ReportError::InvalidConfiguration(format!(
            "page body is {:.1}mm tall, less than one {:.1}mm row",
            body_height.to_mm(),
            style.row_height.to_mm()
        )));
    }
    Ok(PageGeometry {
        content,
        body: Rect {
            x: content.x,
            y: content.y + header_height,
            width: content.width,
            height: body_height,
        },
        header_height,
        footer_height,
    })
}

/// Single-frame template whose page callback draws the running header and footer.
pub fn page_template(
    style: &SinkStyle,
    decoration: &PageDecoration,
) -> Result<PageTemplate, ReportError> {
    let geometry = page_geometry(style, decoration)?;
    let header = header_paragraph(style, decoration);
    let footer = footer_paragraph(style, decoration);
    let rule = rule(style);
    let PageGeometry {
        content,
        body,
        header_height,
        footer_height,
    } = geometry;
    let rule_y = content.y + header_height - rule.height();
    let footer_y = content.y + content.height - footer_height;

    Ok(PageTemplate::new(PAGE_TEMPLATE_NAME, style.page_size)
        .with_frame(body)
        .set_on_page(move |canvas, _ctx| {
            canvas.save_state();
            header.draw(canvas, content.x, content.y, content.width, header_height);
            rule.draw(canvas, content.x, rule_y, content.width, rule.height());
            footer.draw(canvas, content.x, footer_y, content.width, footer_height);
            canvas.restore_state();
        }))
}

fn paragraph(text: impl Into<String>, style: TextStyle) -> Paragraph {
    Paragraph::new(text).with_style(style)
}

/// Maps one report row onto the twelve-column grid.
pub fn grid_row(row: &ReportRow, style: &SinkStyle) -> GridRow {
    let min_height = match row.hint.height {
        RowHeight::Standard => style.row_height,
        RowHeight::Tall(mm) => Pt::from_mm(mm).max(style.row_height),
    };
    let text_style = |font_size: Pt| {
        TextStyle::sized(font_size)
            .with_color(text_color(row, style))
            .bold(row.emphasis == Emphasis::Bold)
    };
    let grid = GridRow::new(min_height).with_meta(META_SECTION_KEY, row.section.key());

    match &row.content {
        RowContent::Pair { label, value } => grid
            .with_cell(GridCell::blank(1))
            .with_cell(GridCell::text(5, paragraph(label.as_str(), text_style(style.font_size))))
            .with_cell(GridCell::text(6, paragraph(value.as_str(), text_style(style.font_size)))),
        RowContent::Text(text) if row.depth == 0 => grid.with_cell(GridCell::text(
            GRID_COLUMNS,
            paragraph(text.as_str(), text_style(style.font_size)),
        )),
        RowContent::Text(text) => {
            let indented = (style.font_size - Pt::from_i32(1)).max(Pt::from_i32(1));
            grid.with_cell(GridCell::blank(1)).with_cell(GridCell::text(
                GRID_COLUMNS - 1,
                paragraph(text.as_str(), text_style(indented)),
            ))
        }
    }
}

/// Flowables for the whole report: grid rows with a small gap before each heading,
/// and a wide gap plus a rule ahead of the diagnostics block.
pub fn story(report: &Report, style: &SinkStyle) -> Vec<Box<dyn Flowable>> {
    let mut flowables: Vec<Box<dyn Flowable>> = Vec::with_capacity(report.rows.len() * 2);
    for (index, row) in report.rows.iter().enumerate() {
        if row.kind == RowKind::Heading {
            if row.section == Section::Diagnostics {
                flowables.push(Box::new(Spacer::from_mm(DIAGNOSTICS_GAP_MM)));
                flowables.push(Box::new(rule(style)));
            } else if index > 0 {
                flowables.push(Box::new(Spacer::from_mm(SECTION_GAP_MM)));
            }
        }
        flowables.push(Box::new(grid_row(row, style)));
    }
    flowables
}

/// Paginates `report` into a document ready for serialization.
pub fn layout(
    report: &Report,
    style: &SinkStyle,
    decoration: &PageDecoration,
) -> Result<(Document, DocumentMetrics), ReportError> {
    let template = page_template(style, decoration)?;
    let mut doc = DocTemplate::new(vec![template]);
    doc.extend(story(report, style));
    let (document, metrics) = doc.build_with_metrics()?;
    log::debug!(
        "laid out {} rows on {} pages",
        report.rows.len(),
        document.pages.len()
    );
    Ok((document, metrics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Command;
    use crate::report::{self, EMPTY_SENTINEL};
    use readymeta_model::Metadata;

    fn decoration() -> PageDecoration {
        PageDecoration::for_source("meta.json", "2024-05-01 10:00:00", "0.9.0")
    }

    fn colored_runs(document: &Document, page: usize) -> Vec<(String, Color)> {
        let mut fill = Color::BLACK;
        let mut runs = Vec::new();
        for cmd in &document.pages[page].commands {
            match cmd {
                Command::SetFillColor(color) => fill = *color,
                Command::RestoreState => fill = Color::BLACK,
                Command::DrawString { text, .. } => runs.push((text.clone(), fill)),
                _ => {}
            }
        }
        runs
    }

    #[test]
    fn flagged_rows_are_drawn_in_the_warning_colour() {
        let report = report::render(&Metadata::default());
        let style = SinkStyle::default();
        let (document, _) = layout(&report, &style, &decoration()).expect("layout");
        let runs: Vec<(String, Color)> = (0..document.pages.len())
            .flat_map(|page| colored_runs(&document, page))
            .collect();
        let sentinels: Vec<&Color> = runs
            .iter()
            .filter(|(text, _)| text == EMPTY_SENTINEL)
            .map(|(_, color)| color)
            .collect();
        assert!(!sentinels.is_empty());
        assert!(sentinels.iter().all(|color| **color == style.warning));
        let heading = runs.iter().find(|(text, _)| text == "Title").expect("heading");
        assert_eq!(heading.1, style.neutral);
        let summary = runs
            .iter()
            .find(|(text, _)| text.starts_with("21 warnings were generated"))
            .expect("diagnostics row");
        assert_eq!(summary.1, style.neutral);
    }

    #[test]
    fn short_descriptions_use_the_attention_colour() {
        let meta = Metadata {
            description: "Too short.".to_string(),
            ..Metadata::default()
        };
        let report = report::render(&meta);
        let style = SinkStyle::default();
        let row = report
            .rows_in(Section::Description)
            .nth(1)
            .expect("description body");
        assert_eq!(text_color(row, &style), style.attention);
    }

    #[test]
    fn rows_map_to_column_spans_by_shape() {
        let report = report::render(&Metadata::default());
        let style = SinkStyle::default();
        let spans = |row: &ReportRow| -> Vec<u8> {
            grid_row(row, &style).cells().iter().map(|c| c.span).collect()
        };
        let heading = &report.rows[0];
        assert_eq!(spans(heading), vec![12]);
        let pair = report
            .rows_in(Section::Collected)
            .find(|row| row.kind == RowKind::LabelValuePair)
            .expect("date pair");
        assert_eq!(spans(pair), vec![1, 5, 6]);
        let item = report
            .rows_in(Section::Tags)
            .find(|row| row.kind == RowKind::ListItem)
            .expect("tag item");
        assert_eq!(spans(item), vec![1, 11]);
        let cell = grid_row(item, &style);
        let paragraph = cell.cells()[1].content.as_ref().expect("text cell");
        assert_eq!(paragraph.style().font_size, Pt::from_f32(9.0));
        let bold = grid_row(heading, &style);
        assert!(bold.cells()[0].content.as_ref().expect("heading").style().bold);
    }

    #[test]
    fn tall_description_rows_reserve_their_height() {
        let meta = Metadata {
            description: "word ".repeat(60),
            ..Metadata::default()
        };
        let report = report::render(&meta);
        let row = report.rows_in(Section::Description).nth(1).expect("body");
        let grid = grid_row(row, &SinkStyle::default());
        assert_eq!(grid.min_height(), Pt::from_mm(15.0));
    }

    #[test]
    fn every_page_carries_header_and_footer() {
        let meta = Metadata {
            tag: (0..150).map(|i| format!("tag {i}")).collect(),
            ..Metadata::default()
        };
        let report = report::render(&meta);
        let (document, metrics) =
            layout(&report, &SinkStyle::default(), &decoration()).expect("layout");
        assert!(document.pages.len() >= 2);
        assert_eq!(metrics.page_count(), document.pages.len());
        for page in &document.pages {
            let runs: Vec<&str> = page.text_runs().collect();
            assert_eq!(runs[0], "\"meta.json\" metadata");
            assert!(runs.contains(&"\"meta.json\" metadata generated on 2024-05-01 10:00:00"));
            assert!(runs.contains(&"by readYmeta v0.9.0"));
        }
        let first_sections: Vec<&str> = document.pages[0].meta_values(META_SECTION_KEY).collect();
        assert_eq!(first_sections[0], "title");
        let last = document.pages.last().expect("last page");
        assert!(last.meta_values(META_SECTION_KEY).any(|s| s == "diagnostics"));
    }

    #[test]
    fn diagnostics_block_is_preceded_by_a_rule() {
        let report = report::render(&Metadata::default());
        let flowables = story(&report, &SinkStyle::default());
        let names: Vec<&str> = flowables.iter().map(|f| f.debug_name()).collect();
        let n = names.len();
        assert!(names[n - 3].ends_with("HorizontalRule"));
        assert!(names[n - 4].ends_with("Spacer"));
        // every heading but the first is preceded by a gap
        let spacers = names.iter().filter(|name| name.ends_with("Spacer")).count();
        let headings = report.rows.iter().filter(|r| r.kind == RowKind::Heading).count();
        assert_eq!(spacers, headings - 1);
    }

    #[test]
    fn oversized_margins_are_rejected() {
        let style = SinkStyle {
            margins: Margins::all_mm(140.0),
            ..SinkStyle::default()
        };
        let err = page_template(&style, &decoration()).err().expect("invalid");
        assert!(matches!(err, ReportError::InvalidConfiguration(_)));
    }
}
