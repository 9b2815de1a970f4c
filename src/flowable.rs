use crate::canvas::Canvas;
use crate::types::{Color, Pt, Size};
use std::sync::Arc;

pub const GRID_COLUMNS: u8 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakInside {
    Auto,
    Avoid,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pagination {
    pub break_inside: BreakInside,
    pub orphans: usize,
    pub widows: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            break_inside: BreakInside::Auto,
            orphans: 2,
            widows: 2,
        }
    }
}

impl Pagination {
    fn resolved_orphans(self) -> usize {
        self.orphans.max(1)
    }

    fn resolved_widows(self) -> usize {
        self.widows.max(1)
    }
}

pub trait Flowable: FlowableClone + Send + Sync {
    fn wrap(&self, avail_width: Pt, avail_height: Pt) -> Size;
    fn split(
        &self,
        avail_width: Pt,
        avail_height: Pt,
    ) -> Option<(Box<dyn Flowable>, Box<dyn Flowable>)>;
    fn draw(&self, canvas: &mut Canvas, x: Pt, y: Pt, avail_width: Pt, avail_height: Pt);

    fn pagination(&self) -> Pagination {
        Pagination::default()
    }

    fn debug_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

pub trait FlowableClone {
    fn clone_box(&self) -> Box<dyn Flowable>;
}

impl<T> FlowableClone for T
where
    T: 'static + Flowable + Clone,
{
    fn clone_box(&self) -> Box<dyn Flowable> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn Flowable> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub font_size: Pt,
    pub line_height: Pt,
    pub color: Color,
    pub font_name: Arc<str>,
    pub bold: bool,
    pub italic: bool,
}

impl Default for TextStyle {
    fn default() -> Self {
        let font_size = Pt::from_f32(12.0);
        Self {
            font_size,
            line_height: font_size.mul_ratio(6, 5),
            color: Color::BLACK,
            font_name: Arc::<str>::from("Helvetica"),
            bold: false,
            italic: false,
        }
    }
}

impl TextStyle {
    pub fn sized(font_size: Pt) -> Self {
        Self {
            font_size,
            line_height: font_size.mul_ratio(6, 5),
            ..Self::default()
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }

    pub fn italic(mut self, italic: bool) -> Self {
        self.italic = italic;
        self
    }

    pub fn resolved_font_name(&self) -> &str {
        base14_variant_name(&self.font_name, self.bold, self.italic)
            .unwrap_or_else(|| self.font_name.as_ref())
    }
}

pub fn base14_variant_name(base: &str, bold: bool, italic: bool) -> Option<&'static str> {
    let norm = base
        .trim()
        .trim_matches('"')
        .trim_matches('\'')
        .to_ascii_lowercase();
    match norm.as_str() {
        "helvetica" => Some(match (bold, italic) {
            (true, true) => "Helvetica-BoldOblique",
            (true, false) => "Helvetica-Bold",
            (false, true) => "Helvetica-Oblique",
            (false, false) => "Helvetica",
        }),
        "times-roman" => Some(match (bold, italic) {
            (true, true) => "Times-BoldItalic",
            (true, false) => "Times-Bold",
            (false, true) => "Times-Italic",
            (false, false) => "Times-Roman",
        }),
        "courier" => Some(match (bold, italic) {
            (true, true) => "Courier-BoldOblique",
            (true, false) => "Courier-Bold",
            (false, true) => "Courier-Oblique",
            (false, false) => "Courier",
        }),
        _ => None,
    }
}

#[derive(Debug, Clone)]
struct LineLayout {
    text: String,
    width: Pt,
}

#[derive(Debug, Clone)]
pub struct Paragraph {
    text: String,
    style: TextStyle,
    pagination: Pagination,
}

impl Paragraph {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: TextStyle::default(),
            pagination: Pagination::default(),
        }
    }

    pub fn with_style(mut self, style: TextStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn style(&self) -> &TextStyle {
        &self.style
    }

    // Base-14 metrics are not embedded; an average advance of 0.6em is close enough for Helvetica.
    fn measure_text_width(&self, text: &str) -> Pt {
        let char_width = (self.style.font_size * 6 / 10).max(Pt::from_f32(1.0));
        char_width * (text.chars().count() as i32)
    }

    fn line_height(&self) -> Pt {
        self.style.line_height
    }

    fn layout_lines(&self, avail_width: Pt) -> Vec<LineLayout> {
        let max_width = avail_width.max(Pt::from_f32(1.0));
        let space_width = self.measure_text_width(" ");
        let mut lines = Vec::new();
        for segment in self.text.split('\n') {
            if segment.trim().is_empty() {
                lines.push(String::new());
                continue;
            }
            let mut current = String::new();
            let mut current_width = Pt::ZERO;
            for word in segment.split_whitespace() {
                let word_width = self.measure_text_width(word);
                if current.is_empty() {
                    if word_width > max_width {
                        lines.extend(self.split_long_word(word, max_width));
                    } else {
                        current.push_str(word);
                        current_width = word_width;
                    }
                    continue;
                }
                let next_width = current_width + space_width + word_width;
                if next_width <= max_width {
                    current.push(' ');
                    current.push_str(word);
                    current_width = next_width;
                } else {
                    lines.push(std::mem::take(&mut current));
                    if word_width > max_width {
                        lines.extend(self.split_long_word(word, max_width));
                    } else {
                        current.push_str(word);
                        current_width = word_width;
                    }
                }
            }
            if !current.is_empty() {
                lines.push(current);
            }
        }
        if lines.is_empty() {
            lines.push(String::new());
        }
        lines
            .into_iter()
            .map(|text| {
                let width = self.measure_text_width(&text);
                LineLayout { text, width }
            })
            .collect()
    }

    fn split_long_word(&self, word: &str, max_width: Pt) -> Vec<String> {
        let mut parts = Vec::new();
        let mut current = String::new();
        let mut current_width = Pt::ZERO;
        for ch in word.chars() {
            let w = self.measure_text_width(ch.encode_utf8(&mut [0u8; 4]));
            let mut next_width = current_width + w;
            if !current.is_empty() && next_width > max_width {
                parts.push(std::mem::take(&mut current));
                next_width = w;
            }
            current.push(ch);
            current_width = next_width;
        }
        if !current.is_empty() {
            parts.push(current);
        }
        parts
    }

    fn split_lines(&self, avail_width: Pt, avail_height: Pt) -> Option<(Paragraph, Paragraph)> {
        let lines = self.layout_lines(avail_width);
        let lh = self.line_height().to_milli_i64();
        let ah = avail_height.to_milli_i64();
        if lh <= 0 || ah <= 0 {
            return None;
        }
        let max_lines = (ah / lh) as usize;
        let total_lines = lines.len();
        if max_lines == 0 || max_lines >= total_lines {
            return None;
        }

        let orphans = self.pagination.resolved_orphans();
        let widows = self.pagination.resolved_widows();
        let mut split_at = max_lines;
        if total_lines - split_at < widows {
            split_at = total_lines.saturating_sub(widows);
        }
        if split_at < orphans {
            return None;
        }

        let join = |slice: &[LineLayout]| {
            slice
                .iter()
                .map(|line| line.text.as_str())
                .collect::<Vec<_>>()
                .join("\n")
        };
        Some((
            self.with_text(join(&lines[..split_at])),
            self.with_text(join(&lines[split_at..])),
        ))
    }

    fn with_text(&self, text: String) -> Paragraph {
        Paragraph {
            text,
            style: self.style.clone(),
            pagination: self.pagination,
        }
    }
}

impl Flowable for Paragraph {
    fn wrap(&self, avail_width: Pt, _avail_height: Pt) -> Size {
        let lines = self.layout_lines(avail_width);
        let height = self.line_height() * (lines.len() as i32);
        let width = lines
            .iter()
            .fold(Pt::ZERO, |acc, line| acc.max(line.width))
            .min(avail_width);
        Size { width, height }
    }

    fn split(
        &self,
        avail_width: Pt,
        avail_height: Pt,
    ) -> Option<(Box<dyn Flowable>, Box<dyn Flowable>)> {
        let (first, second) = self.split_lines(avail_width, avail_height)?;
        Some((Box::new(first), Box::new(second)))
    }

    fn draw(&self, canvas: &mut Canvas, x: Pt, y: Pt, avail_width: Pt, _avail_height: Pt) {
        let lines = self.layout_lines(avail_width);
        canvas.set_fill_color(self.style.color);
        canvas.set_font_name(self.style.resolved_font_name());
        canvas.set_font_size(self.style.font_size);

        let mut cursor_y = y;
        let line_height = self.line_height();
        for line in lines.iter() {
            if !line.text.is_empty() {
                canvas.draw_string(x, cursor_y, line.text.as_str());
            }
            cursor_y += line_height;
        }
    }

    fn pagination(&self) -> Pagination {
        self.pagination
    }
}

#[derive(Debug, Clone)]
pub struct Spacer {
    height: Pt,
}

impl Spacer {
    pub fn new_pt(height: Pt) -> Self {
        Self { height }
    }

    pub fn from_mm(mm: f32) -> Self {
        Self::new_pt(Pt::from_mm(mm))
    }
}

impl Flowable for Spacer {
    fn wrap(&self, avail_width: Pt, avail_height: Pt) -> Size {
        // A spacer at the bottom of a frame shrinks instead of forcing a page break.
        Size {
            width: avail_width,
            height: self.height.max(Pt::ZERO).min(avail_height.max(Pt::ZERO)),
        }
    }

    fn split(
        &self,
        _avail_width: Pt,
        _avail_height: Pt,
    ) -> Option<(Box<dyn Flowable>, Box<dyn Flowable>)> {
        None
    }

    fn draw(&self, _canvas: &mut Canvas, _x: Pt, _y: Pt, _avail_width: Pt, _avail_height: Pt) {}
}

#[derive(Debug, Clone)]
pub struct HorizontalRule {
    thickness: Pt,
    color: Color,
    padding: Pt,
}

impl HorizontalRule {
    pub fn new(thickness: Pt, color: Color) -> Self {
        Self {
            thickness,
            color,
            padding: Pt::ZERO,
        }
    }

    /// Vertical space kept clear above and below the line.
    pub fn with_padding(mut self, padding: Pt) -> Self {
        self.padding = padding;
        self
    }

    pub fn height(&self) -> Pt {
        self.thickness + self.padding * 2
    }
}

impl Flowable for HorizontalRule {
    fn wrap(&self, avail_width: Pt, _avail_height: Pt) -> Size {
        Size {
            width: avail_width,
            height: self.height(),
        }
    }

    fn split(
        &self,
        _avail_width: Pt,
        _avail_height: Pt,
    ) -> Option<(Box<dyn Flowable>, Box<dyn Flowable>)> {
        None
    }

    fn draw(&self, canvas: &mut Canvas, x: Pt, y: Pt, avail_width: Pt, _avail_height: Pt) {
        let line_y = y + self.padding + self.thickness.mul_ratio(1, 2);
        canvas.set_stroke_color(self.color);
        canvas.set_line_width(self.thickness);
        canvas.move_to(x, line_y);
        canvas.line_to(x + avail_width, line_y);
        canvas.stroke();
    }

    fn pagination(&self) -> Pagination {
        Pagination {
            break_inside: BreakInside::Avoid,
            ..Pagination::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct GridCell {
    pub span: u8,
    pub content: Option<Paragraph>,
}

impl GridCell {
    pub fn text(span: u8, paragraph: Paragraph) -> Self {
        Self {
            span,
            content: Some(paragraph),
        }
    }

    pub fn blank(span: u8) -> Self {
        Self {
            span,
            content: None,
        }
    }
}

/// One row of a twelve-column grid.
///
/// Each cell occupies `span` columns from left to right. The row is at least
/// `min_height` tall and grows to fit the tallest wrapped cell.
#[derive(Debug, Clone)]
pub struct GridRow {
    cells: Vec<GridCell>,
    min_height: Pt,
    meta: Option<(String, String)>,
}

impl GridRow {
    pub fn new(min_height: Pt) -> Self {
        Self {
            cells: Vec::new(),
            min_height,
            meta: None,
        }
    }

    pub fn with_cell(mut self, cell: GridCell) -> Self {
        self.cells.push(cell);
        self
    }

    /// Attaches a non-rendered marker recorded on the page the row lands on.
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta = Some((key.into(), value.into()));
        self
    }

    pub fn cells(&self) -> &[GridCell] {
        &self.cells
    }

    pub fn min_height(&self) -> Pt {
        self.min_height
    }

    pub fn used_columns(&self) -> u32 {
        self.cells.iter().map(|cell| cell.span as u32).sum()
    }

    fn column_layout(&self, avail_width: Pt) -> Vec<(Pt, Pt)> {
        let column = avail_width / GRID_COLUMNS as i32;
        let mut x = Pt::ZERO;
        self.cells
            .iter()
            .map(|cell| {
                let width = column * cell.span as i32;
                let slot = (x, width);
                x += width;
                slot
            })
            .collect()
    }

    fn content_height(&self, avail_width: Pt) -> Pt {
        self.cells
            .iter()
            .zip(self.column_layout(avail_width))
            .filter_map(|(cell, (_, width))| {
                cell.content
                    .as_ref()
                    .map(|p| p.wrap(width, Pt::ZERO).height)
            })
            .fold(Pt::ZERO, Pt::max)
    }
}

impl Flowable for GridRow {
    fn wrap(&self, avail_width: Pt, _avail_height: Pt) -> Size {
        Size {
            width: avail_width,
            height: self.content_height(avail_width).max(self.min_height),
        }
    }

    // Only single-paragraph rows break across pages; multi-cell rows move as a unit.
    fn split(
        &self,
        avail_width: Pt,
        avail_height: Pt,
    ) -> Option<(Box<dyn Flowable>, Box<dyn Flowable>)> {
        let [cell] = self.cells.as_slice() else {
            return None;
        };
        let paragraph = cell.content.as_ref()?;
        let width = self.column_layout(avail_width)[0].1;
        let (first, second) = paragraph.split_lines(width, avail_height)?;
        let first_height = first.wrap(width, avail_height).height;
        let head = GridRow {
            cells: vec![GridCell::text(cell.span, first)],
            min_height: Pt::ZERO,
            meta: self.meta.clone(),
        };
        let tail = GridRow {
            cells: vec![GridCell::text(cell.span, second)],
            min_height: (self.min_height - first_height).max(Pt::ZERO),
            meta: None,
        };
        Some((Box::new(head), Box::new(tail)))
    }

    fn draw(&self, canvas: &mut Canvas, x: Pt, y: Pt, avail_width: Pt, avail_height: Pt) {
        if let Some((key, value)) = &self.meta {
            canvas.meta(key.as_str(), value.as_str());
        }
        for (cell, (offset, width)) in self.cells.iter().zip(self.column_layout(avail_width)) {
            if let Some(paragraph) = &cell.content {
                paragraph.draw(canvas, x + offset, y, width, avail_height);
            }
        }
    }

    fn pagination(&self) -> Pagination {
        Pagination {
            break_inside: if self.cells.len() > 1 {
                BreakInside::Avoid
            } else {
                BreakInside::Auto
            },
            ..Pagination::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ten_point() -> TextStyle {
        TextStyle::sized(Pt::from_f32(10.0))
    }

    #[test]
    fn paragraph_wraps_on_word_boundaries() {
        // 6pt per character at 10pt: a 60pt column holds ten characters.
        let p = Paragraph::new("alpha beta gamma").with_style(ten_point());
        let size = p.wrap(Pt::from_f32(60.0), Pt::from_f32(1000.0));
        assert_eq!(size.height, Pt::from_f32(24.0));
    }

    #[test]
    fn long_words_are_broken_to_fit() {
        let p = Paragraph::new("abcdefghijklmnopqrstuvwxy").with_style(ten_point());
        let size = p.wrap(Pt::from_f32(60.0), Pt::from_f32(1000.0));
        assert_eq!(size.height, Pt::from_f32(36.0));
    }

    #[test]
    fn paragraph_split_respects_orphans_and_widows() {
        let text = (0..6).map(|i| format!("line{i}")).collect::<Vec<_>>().join("\n");
        let p = Paragraph::new(text).with_style(ten_point());
        // Room for five lines would leave a single widow, so the split moves up one line.
        let (first, second) = p
            .split(Pt::from_f32(300.0), Pt::from_f32(60.0))
            .expect("split");
        assert_eq!(first.wrap(Pt::from_f32(300.0), Pt::ZERO).height, Pt::from_f32(48.0));
        assert_eq!(second.wrap(Pt::from_f32(300.0), Pt::ZERO).height, Pt::from_f32(24.0));
        assert!(p.split(Pt::from_f32(300.0), Pt::from_f32(12.0)).is_none());
    }

    #[test]
    fn grid_row_is_at_least_its_minimum_height() {
        let row = GridRow::new(Pt::from_mm(4.0))
            .with_cell(GridCell::blank(1))
            .with_cell(GridCell::text(11, Paragraph::new("x").with_style(ten_point())));
        let size = row.wrap(Pt::from_f32(500.0), Pt::from_f32(800.0));
        assert_eq!(size.height, Pt::from_f32(12.0));
        let tall = GridRow::new(Pt::from_mm(30.0))
            .with_cell(GridCell::text(12, Paragraph::new("x").with_style(ten_point())));
        assert_eq!(tall.wrap(Pt::from_f32(500.0), Pt::ZERO).height, Pt::from_mm(30.0));
        assert_eq!(row.used_columns(), 12);
        assert_eq!(row.pagination().break_inside, BreakInside::Avoid);
    }

    #[test]
    fn grid_cells_are_placed_by_column_span() {
        let row = GridRow::new(Pt::ZERO)
            .with_cell(GridCell::blank(1))
            .with_cell(GridCell::text(5, Paragraph::new("StartDate")))
            .with_cell(GridCell::text(6, Paragraph::new("2021")))
            .with_meta("row", "collected");
        let mut canvas = Canvas::new(Size::a4());
        row.draw(&mut canvas, Pt::ZERO, Pt::ZERO, Pt::from_f32(240.0), Pt::from_f32(100.0));
        let doc = canvas.finish();
        let xs: Vec<Pt> = doc.pages[0]
            .commands
            .iter()
            .filter_map(|cmd| match cmd {
                crate::canvas::Command::DrawString { x, .. } => Some(*x),
                _ => None,
            })
            .collect();
        assert_eq!(xs, vec![Pt::from_f32(20.0), Pt::from_f32(120.0)]);
        assert_eq!(doc.pages[0].meta_values("row").collect::<Vec<_>>(), vec!["collected"]);
    }

    #[test]
    fn single_cell_rows_split_and_keep_style() {
        let text = (0..8).map(|i| format!("w{i}")).collect::<Vec<_>>().join("\n");
        let style = ten_point().bold(true);
        let row = GridRow::new(Pt::from_f32(200.0))
            .with_cell(GridCell::text(12, Paragraph::new(text).with_style(style.clone())));
        let (head, tail) = row
            .split(Pt::from_f32(600.0), Pt::from_f32(48.0))
            .expect("split");
        assert_eq!(head.wrap(Pt::from_f32(600.0), Pt::ZERO).height, Pt::from_f32(48.0));
        assert_eq!(tail.wrap(Pt::from_f32(600.0), Pt::ZERO).height, Pt::from_f32(152.0));

        let mut canvas = Canvas::new(Size::a4());
        tail.draw(&mut canvas, Pt::ZERO, Pt::ZERO, Pt::from_f32(600.0), Pt::from_f32(500.0));
        let doc = canvas.finish();
        assert!(doc.pages[0]
            .commands
            .contains(&crate::canvas::Command::SetFontName("Helvetica-Bold".to_string())));
        assert_eq!(doc.pages[0].text_runs().next(), Some("w4"));
    }

    #[test]
    fn base14_variants_follow_weight_and_slant() {
        assert_eq!(TextStyle::default().resolved_font_name(), "Helvetica");
        assert_eq!(TextStyle::default().bold(true).resolved_font_name(), "Helvetica-Bold");
        assert_eq!(TextStyle::default().italic(true).resolved_font_name(), "Helvetica-Oblique");
        let custom = TextStyle {
            font_name: Arc::from("Symbol"),
            ..TextStyle::default()
        };
        assert_eq!(custom.resolved_font_name(), "Symbol");
    }
}
