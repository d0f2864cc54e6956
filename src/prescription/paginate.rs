//! Flow layout: places story elements top-down on A4 pages, overflowing to a
//! new page when an element does not fit and breaking on `Element::PageBreak`.
//!
//! Coordinates are millimetres with the origin at the bottom-left corner, as
//! printpdf expects. Glyph widths are estimated from the style's average
//! advance; the built-in PDF fonts carry no metrics we can query here.

use std::sync::Arc;

use super::document::{Cell, Element, Logo, LogoImage, Paragraph, Table, LOGO_HEIGHT_MM, LOGO_WIDTH_MM};
use super::styles::{Align, FontFace, ParagraphStyle, StyleTable};

pub const PAGE_WIDTH_MM: f32 = 210.0;
pub const PAGE_HEIGHT_MM: f32 = 297.0;
pub const MARGIN_MM: f32 = 20.0;
pub const CONTENT_WIDTH_MM: f32 = PAGE_WIDTH_MM - 2.0 * MARGIN_MM;

const TOP_MM: f32 = PAGE_HEIGHT_MM - MARGIN_MM;
const EPSILON: f32 = 0.001;

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    /// `y` is the text baseline.
    Text {
        text: String,
        font: FontFace,
        size: f32,
        x: f32,
        y: f32,
    },
    /// `y` is the bottom edge of the image.
    Logo {
        image: Arc<LogoImage>,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLayout {
    pub ops: Vec<DrawOp>,
}

impl PageLayout {
    /// All text drawn on the page, in drawing order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, .. } => Some(text.as_str()),
            DrawOp::Logo { .. } => None,
        })
    }

    pub fn contains_text(&self, needle: &str) -> bool {
        self.texts().any(|t| t.contains(needle))
    }
}

/// Word-wraps `text` to at most `max_chars` characters per line.
/// Always returns at least one (possibly empty) line.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();

    for raw_line in text.lines() {
        let mut current = String::new();
        let mut current_len = 0usize;
        for word in raw_line.split_whitespace() {
            let word_len = word.chars().count();
            if current_len + word_len + 1 > max_chars && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if !current.is_empty() {
                current.push(' ');
                current_len += 1;
            }
            current.push_str(word);
            current_len += word_len;
        }
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

fn aligned_x(style: &ParagraphStyle, line: &str, left: f32, width: f32) -> f32 {
    let line_width = style.text_width_mm(line);
    let x = match style.align {
        Align::Left => left + style.left_indent,
        Align::Center => left + (width - line_width) / 2.0,
        Align::Right => left + width - line_width,
    };
    x.max(left)
}

fn paragraph_lines(paragraph: &Paragraph, style: &ParagraphStyle, width: f32) -> Vec<String> {
    wrap_text(&paragraph.text, style.chars_per_line(width))
}

fn paragraph_height(paragraph: &Paragraph, styles: &StyleTable, width: f32) -> f32 {
    let style = styles.get(paragraph.style);
    let lines = paragraph_lines(paragraph, style, width).len() as f32;
    style.space_before + lines * style.leading_mm() + style.space_after
}

fn cell_height(cell: &Cell, styles: &StyleTable, width: f32) -> f32 {
    match cell {
        Cell::Empty => 0.0,
        Cell::Text(p) | Cell::Logo(Logo::Placeholder(p)) => paragraph_height(p, styles, width),
        Cell::Logo(Logo::Image(_)) => LOGO_HEIGHT_MM,
    }
}

struct Flow<'a> {
    styles: &'a StyleTable,
    pages: Vec<PageLayout>,
    cursor: f32,
}

impl<'a> Flow<'a> {
    fn new(styles: &'a StyleTable) -> Self {
        Self {
            styles,
            pages: vec![PageLayout::default()],
            cursor: TOP_MM,
        }
    }

    fn at_page_top(&self) -> bool {
        (self.cursor - TOP_MM).abs() < EPSILON
    }

    fn fits(&self, height: f32) -> bool {
        self.cursor - height >= MARGIN_MM - EPSILON
    }

    fn new_page(&mut self) {
        self.pages.push(PageLayout::default());
        self.cursor = TOP_MM;
    }

    /// Starts a new page unless `height` fits or the page is still empty.
    fn reserve(&mut self, height: f32) {
        if !self.fits(height) && !self.at_page_top() {
            self.new_page();
        }
    }

    fn push(&mut self, op: DrawOp) {
        if let Some(page) = self.pages.last_mut() {
            page.ops.push(op);
        }
    }

    fn spacer(&mut self, height: f32) {
        if self.at_page_top() {
            return;
        }
        if self.fits(height) {
            self.cursor -= height;
        } else {
            self.new_page();
        }
    }

    fn paragraph(&mut self, paragraph: &Paragraph) {
        let style = *self.styles.get(paragraph.style);
        let leading = style.leading_mm();

        if !self.at_page_top() {
            self.reserve(style.space_before + leading);
            if !self.at_page_top() {
                self.cursor -= style.space_before;
            }
        }

        for line in paragraph_lines(paragraph, &style, CONTENT_WIDTH_MM) {
            self.reserve(leading);
            let x = aligned_x(&style, &line, MARGIN_MM, CONTENT_WIDTH_MM);
            let y = self.cursor - leading * 0.8;
            self.push(DrawOp::Text {
                text: line,
                font: style.font,
                size: style.size,
                x,
                y,
            });
            self.cursor -= leading;
        }

        if self.fits(style.space_after) {
            self.cursor -= style.space_after;
        }
    }

    fn table(&mut self, table: &Table) {
        for row in &table.rows {
            let height = row
                .iter()
                .zip(&table.column_widths)
                .map(|(cell, width)| cell_height(cell, self.styles, *width))
                .fold(0.0f32, f32::max);
            self.reserve(height);

            let top = self.cursor;
            let mut left = MARGIN_MM;
            for (cell, width) in row.iter().zip(&table.column_widths) {
                self.cell(cell, top, left, *width);
                left += width;
            }
            self.cursor = top - height;
        }
    }

    fn cell(&mut self, cell: &Cell, top: f32, left: f32, width: f32) {
        match cell {
            Cell::Empty => {}
            Cell::Logo(Logo::Image(image)) => self.push(DrawOp::Logo {
                image: Arc::clone(image),
                x: left,
                y: top - LOGO_HEIGHT_MM,
                width: LOGO_WIDTH_MM.min(width),
                height: LOGO_HEIGHT_MM,
            }),
            Cell::Text(p) | Cell::Logo(Logo::Placeholder(p)) => {
                let style = *self.styles.get(p.style);
                let leading = style.leading_mm();
                let mut line_top = top - style.space_before;
                for line in paragraph_lines(p, &style, width) {
                    let x = aligned_x(&style, &line, left, width);
                    self.push(DrawOp::Text {
                        text: line,
                        font: style.font,
                        size: style.size,
                        x,
                        y: line_top - leading * 0.8,
                    });
                    line_top -= leading;
                }
            }
        }
    }
}

/// Lays out `story` and returns one `PageLayout` per page.
pub fn paginate(story: &[Element], styles: &StyleTable) -> Vec<PageLayout> {
    let mut flow = Flow::new(styles);
    for element in story {
        match element {
            Element::Paragraph(p) => flow.paragraph(p),
            Element::Spacer(height) => flow.spacer(*height),
            Element::Table(table) => flow.table(table),
            Element::PageBreak => {
                if !flow.at_page_top() {
                    flow.new_page();
                }
            }
        }
    }
    flow.pages
}
