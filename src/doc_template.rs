use crate::canvas::{Canvas, Document};
use crate::error::ReportError;
use crate::flowable::Flowable;
use crate::frame::{AddResult, Frame};
use crate::metrics::{DocumentMetrics, PageMetrics};
use crate::page_template::{DocContext, PageTemplate};
use std::collections::VecDeque;
use std::time::Instant;

pub const META_PAGE_TEMPLATE_KEY: &str = "page_template";

pub struct DocTemplate {
    page_templates: Vec<PageTemplate>,
    story: Vec<Box<dyn Flowable>>,
}

fn select_template(page_templates: &[PageTemplate], page_number: usize) -> &PageTemplate {
    // page n uses templates[n-1]; the last template repeats.
    let idx = page_number.saturating_sub(1).min(page_templates.len() - 1);
    &page_templates[idx]
}

struct PageState {
    page_number: usize,
    frames: Vec<Frame>,
    frame_index: usize,
    placed_on_page: bool,
    flowables: usize,
    started: Instant,
}

impl DocTemplate {
    pub fn new(page_templates: Vec<PageTemplate>) -> Self {
        Self {
            page_templates,
            story: Vec::new(),
        }
    }

    pub fn add_flowable(&mut self, flowable: Box<dyn Flowable>) {
        self.story.push(flowable);
    }

    pub fn extend<I>(&mut self, flowables: I)
    where
        I: IntoIterator<Item = Box<dyn Flowable>>,
    {
        self.story.extend(flowables);
    }

    pub fn build(self) -> Result<Document, ReportError> {
        Ok(self.build_with_metrics()?.0)
    }

    pub fn build_with_metrics(self) -> Result<(Document, DocumentMetrics), ReportError> {
        if self.page_templates.is_empty() {
            return Err(ReportError::MissingPageTemplate);
        }
        let templates = self.page_templates;

        let first = select_template(&templates, 1);
        let mut canvas = Canvas::new(first.page_size);
        let mut metrics = DocumentMetrics::default();
        let mut state = begin_page(&templates, &mut canvas, 1);

        let mut story: VecDeque<Box<dyn Flowable>> = self.story.into();
        while let Some(flowable) = story.pop_front() {
            let mut current = flowable;
            loop {
                if state.frame_index >= state.frames.len() {
                    log::debug!(
                        "page break {} -> {}: frames exhausted before {}",
                        state.page_number,
                        state.page_number + 1,
                        current.debug_name()
                    );
                    finish_page(&mut canvas, &mut metrics, &state);
                    state = begin_page(&templates, &mut canvas, state.page_number + 1);
                }
                if state.frames.is_empty() {
                    return Err(ReportError::MissingPageTemplate);
                }

                let is_last_frame = state.frame_index + 1 >= state.frames.len();
                let frame_rect = state.frames[state.frame_index].rect();
                let details = if !state.placed_on_page && is_last_frame {
                    let size = current.wrap(frame_rect.width, frame_rect.height);
                    Some(format!(
                        "{} size={}x{}pt frame={}x{}pt",
                        current.debug_name(),
                        size.width.to_f32(),
                        size.height.to_f32(),
                        frame_rect.width.to_f32(),
                        frame_rect.height.to_f32(),
                    ))
                } else {
                    None
                };

                let frame = &mut state.frames[state.frame_index];
                match frame.add(current, &mut canvas) {
                    AddResult::Placed => {
                        state.placed_on_page = true;
                        state.flowables += 1;
                        break;
                    }
                    AddResult::Split(remaining) => {
                        log::debug!(
                            "{} split at the end of frame {} on page {}",
                            remaining.debug_name(),
                            state.frame_index,
                            state.page_number
                        );
                        state.placed_on_page = true;
                        state.flowables += 1;
                        current = remaining;
                        state.frame_index += 1;
                    }
                    AddResult::Overflow(remaining) => {
                        if !state.placed_on_page && is_last_frame {
                            let details = details.unwrap_or_else(|| "unknown".to_string());
                            return Err(ReportError::UnplaceableFlowable(details));
                        }
                        current = remaining;
                        state.frame_index += 1;
                    }
                }
            }
        }

        finish_page(&mut canvas, &mut metrics, &state);
        log::debug!("laid out {} pages", metrics.page_count());
        Ok((canvas.finish(), metrics))
    }
}

fn begin_page(templates: &[PageTemplate], canvas: &mut Canvas, page_number: usize) -> PageState {
    let template = select_template(templates, page_number);
    if let Some(callback) = template.on_page() {
        callback(canvas, &DocContext::new(page_number, &template.name));
    }
    canvas.meta(META_PAGE_TEMPLATE_KEY, template.name.clone());
    PageState {
        page_number,
        frames: template.instantiate_frames(),
        frame_index: 0,
        placed_on_page: false,
        flowables: 0,
        started: Instant::now(),
    }
}

fn finish_page(canvas: &mut Canvas, metrics: &mut DocumentMetrics, state: &PageState) {
    let elapsed = state.started.elapsed().as_secs_f64() * 1000.0;
    metrics.total_render_ms += elapsed;
    metrics.pages.push(PageMetrics {
        page_number: state.page_number,
        render_ms: elapsed,
        command_count: canvas.current_command_count(),
        flowable_count: state.flowables,
        content_bytes: 0,
    });
    canvas.show_page();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flowable::{GridCell, GridRow, Paragraph, Spacer, TextStyle};
    use crate::types::{Margins, Pt, Size};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn row(text: &str) -> Box<dyn Flowable> {
        Box::new(
            GridRow::new(Pt::from_mm(4.0)).with_cell(GridCell::text(
                12,
                Paragraph::new(text).with_style(TextStyle::sized(Pt::from_f32(10.0))),
            )),
        )
    }

    #[test]
    fn missing_templates_are_an_error() {
        let doc = DocTemplate::new(Vec::new());
        assert!(matches!(doc.build(), Err(ReportError::MissingPageTemplate)));
    }

    #[test]
    fn rows_flow_onto_new_pages_and_run_the_page_callback() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let template = PageTemplate::new("report", Size::a4())
            .with_margins(Margins::all_mm(10.0))
            .set_on_page(move |canvas, ctx| {
                seen.fetch_add(1, Ordering::SeqCst);
                canvas.draw_string(Pt::ZERO, Pt::ZERO, format!("page {}", ctx.page_number));
            });
        let mut doc = DocTemplate::new(vec![template]);
        // 12pt per row; an A4 frame with 10mm margins holds 65 rows.
        for i in 0..100 {
            doc.add_flowable(row(&format!("row {i}")));
        }
        let (document, metrics) = doc.build_with_metrics().expect("layout");
        assert_eq!(document.pages.len(), 2);
        assert_eq!(metrics.page_count(), 2);
        assert_eq!(metrics.flowables_placed(), 100);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let first: Vec<&str> = document.pages[0].text_runs().collect();
        assert_eq!(first[0], "page 1");
        assert_eq!(first[1], "row 0");
        let second: Vec<&str> = document.pages[1].text_runs().collect();
        assert_eq!(second[0], "page 2");
        assert_eq!(
            document.pages[1]
                .meta_values(META_PAGE_TEMPLATE_KEY)
                .collect::<Vec<_>>(),
            vec!["report"]
        );
    }

    #[test]
    fn empty_story_still_produces_one_page() {
        let template = PageTemplate::new("report", Size::a4()).with_margins(Margins::all_mm(10.0));
        let mut doc = DocTemplate::new(vec![template]);
        doc.add_flowable(Box::new(Spacer::from_mm(0.0)));
        let document = doc.build().expect("layout");
        assert_eq!(document.pages.len(), 1);
    }

    #[test]
    fn templates_without_frames_cannot_place_content() {
        let mut doc = DocTemplate::new(vec![PageTemplate::new("bare", Size::a4())]);
        doc.add_flowable(row("x"));
        assert!(matches!(doc.build(), Err(ReportError::MissingPageTemplate)));
    }
}
