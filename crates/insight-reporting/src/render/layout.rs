//! ---
//! insight_section: "05-reporting"
//! insight_subsection: "module"
//! insight_type: "source"
//! insight_scope: "code"
//! insight_description: "Feedback aggregation, PDF rendering, and the report pipeline."
//! insight_version: "v0.1.0"
//! insight_owner: "tbd"
//! ---
//! Page layout: places encoded text runs on A4 pages top to bottom.
use std::mem;

use tracing::warn;

use super::encoding;
use super::TruncationNote;
use crate::aggregate::DataTable;
use crate::errors::RenderError;

pub(crate) const PAGE_WIDTH: f32 = 595.0;
pub(crate) const PAGE_HEIGHT: f32 = 842.0;
const MARGIN_X: f32 = 56.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN_X;
const TOP: f32 = 786.0;
const BOTTOM: f32 = 64.0;
const HEADER_Y: f32 = 812.0;
const FOOTER_Y: f32 = 32.0;
const DECORATION_SIZE: f32 = 8.0;
const TABLE_SIZE: f32 = 8.5;
const TABLE_GAP: &str = "  ";
const MIN_COLUMN_WIDTH: usize = 4;
const LEADING: f32 = 1.35;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Font {
    Regular,
    Bold,
    Italic,
    Mono,
}

impl Font {
    pub(crate) const ALL: [Font; 4] = [Font::Regular, Font::Bold, Font::Italic, Font::Mono];

    pub(crate) fn resource_name(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
            Font::Italic => "F3",
            Font::Mono => "F4",
        }
    }

    pub(crate) fn base_font(self) -> &'static str {
        match self {
            Font::Regular => "Helvetica",
            Font::Bold => "Helvetica-Bold",
            Font::Italic => "Helvetica-Oblique",
            Font::Mono => "Courier",
        }
    }

    /// Conservative average glyph width as a fraction of the font size.
    fn char_width(self) -> f32 {
        match self {
            Font::Mono | Font::Bold => 0.6,
            Font::Regular | Font::Italic => 0.56,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TextRun {
    pub font: Font,
    pub size: f32,
    pub x: f32,
    pub y: f32,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Page {
    pub runs: Vec<TextRun>,
}

pub(crate) struct Layout {
    max_table_rows: usize,
    pages: Vec<Page>,
    current: Page,
    cursor: f32,
    section: String,
    truncations: Vec<TruncationNote>,
}

impl Layout {
    pub(crate) fn new(max_table_rows: usize, section: &str) -> Self {
        Self {
            max_table_rows,
            pages: Vec::new(),
            current: Page::default(),
            cursor: TOP,
            section: section.to_owned(),
            truncations: Vec::new(),
        }
    }

    /// Start `title` on a fresh page.
    pub(crate) fn begin_section(&mut self, title: &str) {
        self.break_page();
        self.set_section(title);
    }

    /// Name used when reporting encoding failures and truncations.
    pub(crate) fn set_section(&mut self, title: &str) {
        self.section.clear();
        self.section.push_str(title);
    }

    pub(crate) fn space(&mut self, points: f32) {
        self.cursor -= points;
    }

    pub(crate) fn line(
        &mut self,
        font: Font,
        size: f32,
        indent: f32,
        text: &str,
    ) -> Result<(), RenderError> {
        let bytes = encoding::encode(text).map_err(|character| RenderError::UnsupportedCharacter {
            section: self.section.clone(),
            character,
            code: character as u32,
        })?;
        let leading = size * LEADING;
        if self.cursor - leading < BOTTOM && !self.current.runs.is_empty() {
            self.break_page();
        }
        self.cursor -= leading;
        self.current.runs.push(TextRun {
            font,
            size,
            x: MARGIN_X + indent,
            y: self.cursor,
            bytes,
        });
        Ok(())
    }

    /// Word-wrapped text; overlong words are split.
    pub(crate) fn paragraph(
        &mut self,
        font: Font,
        size: f32,
        indent: f32,
        text: &str,
    ) -> Result<(), RenderError> {
        let width = ((CONTENT_WIDTH - indent) / (size * font.char_width())).floor() as usize;
        for line in wrap(text, width) {
            self.line(font, size, indent, &line)?;
        }
        Ok(())
    }

    /// Fixed-width table. Rows past `max_table_rows`, cells wider than their
    /// column budget and cells beyond the declared columns are cut and
    /// recorded as truncations.
    pub(crate) fn table(&mut self, table: &DataTable, indent: f32) -> Result<(), RenderError> {
        if table.is_empty() {
            return Ok(());
        }
        let visible = table.rows.len().min(self.max_table_rows);
        if visible < table.rows.len() {
            self.truncate(format!(
                "table limited to {} of {} rows",
                visible,
                table.rows.len()
            ));
        }

        let header: Vec<String> = table.columns.iter().map(|cell| normalise(cell)).collect();
        let overlong = table.rows[..visible]
            .iter()
            .filter(|row| row.len() > header.len())
            .count();
        if overlong > 0 {
            self.truncate(format!(
                "{} row(s) wider than the {} declared column(s); extra cells dropped",
                overlong,
                header.len()
            ));
        }
        let rows: Vec<Vec<String>> = table.rows[..visible]
            .iter()
            .map(|row| {
                (0..header.len())
                    .map(|col| row.get(col).map(|cell| normalise(cell)).unwrap_or_default())
                    .collect()
            })
            .collect();

        let budget =
            ((CONTENT_WIDTH - indent) / (TABLE_SIZE * Font::Mono.char_width())).floor() as usize;
        let widths = column_widths(&header, &rows, budget);

        let mut cut_per_column = vec![0usize; header.len()];
        let mut format_row = |cells: &[String]| -> String {
            cells
                .iter()
                .zip(&widths)
                .enumerate()
                .map(|(col, (cell, &width))| {
                    let (text, cut) = fit(cell, width);
                    if cut {
                        cut_per_column[col] += 1;
                    }
                    text
                })
                .collect::<Vec<_>>()
                .join(TABLE_GAP)
                .trim_end()
                .to_owned()
        };

        let header_line = format_row(&header);
        let body: Vec<String> = rows.iter().map(|row| format_row(row)).collect();
        let rule = widths
            .iter()
            .map(|&width| "-".repeat(width))
            .collect::<Vec<_>>()
            .join(TABLE_GAP);

        self.line(Font::Mono, TABLE_SIZE, indent, &header_line)?;
        self.line(Font::Mono, TABLE_SIZE, indent, &rule)?;
        for line in &body {
            self.line(Font::Mono, TABLE_SIZE, indent, line)?;
        }

        for (col, count) in cut_per_column.into_iter().enumerate() {
            if count > 0 {
                self.truncate(format!(
                    "{} cell(s) in column '{}' cut to {} characters",
                    count, header[col], widths[col]
                ));
            }
        }
        if visible < table.rows.len() {
            self.line(
                Font::Italic,
                TABLE_SIZE,
                indent,
                &format!("(showing {} of {} rows)", visible, table.rows.len()),
            )?;
        }
        Ok(())
    }

    pub(crate) fn finish(mut self) -> (Vec<Page>, Vec<TruncationNote>) {
        if !self.current.runs.is_empty() || self.pages.is_empty() {
            self.pages.push(mem::take(&mut self.current));
        }
        (self.pages, self.truncations)
    }

    fn break_page(&mut self) {
        if !self.current.runs.is_empty() {
            self.pages.push(mem::take(&mut self.current));
        }
        self.cursor = TOP;
    }

    pub(crate) fn truncate(&mut self, detail: String) {
        warn!(section = %self.section, detail = %detail, "report content truncated");
        self.truncations.push(TruncationNote {
            section: self.section.clone(),
            detail,
        });
    }
}

/// Add the running header (every page but the first) and the `Page i of n` footer.
pub(crate) fn stamp_pages(pages: &mut [Page], header: &[u8]) {
    let total = pages.len();
    for (index, page) in pages.iter_mut().enumerate() {
        if index > 0 {
            page.runs.push(TextRun {
                font: Font::Italic,
                size: DECORATION_SIZE,
                x: MARGIN_X,
                y: HEADER_Y,
                bytes: header.to_vec(),
            });
        }
        let footer = format!("Page {} of {}", index + 1, total);
        let width = footer.len() as f32 * DECORATION_SIZE * Font::Regular.char_width();
        page.runs.push(TextRun {
            font: Font::Regular,
            size: DECORATION_SIZE,
            x: (PAGE_WIDTH - width) / 2.0,
            y: FOOTER_Y,
            bytes: footer.into_bytes(),
        });
    }
}

fn normalise(cell: &str) -> String {
    cell.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Natural column widths, shrinking the widest column until the row fits `budget`.
fn column_widths(header: &[String], rows: &[Vec<String>], budget: usize) -> Vec<usize> {
    let mut widths: Vec<usize> = header.iter().map(|cell| cell.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }
    let gaps = TABLE_GAP.len() * widths.len().saturating_sub(1);
    let available = budget.saturating_sub(gaps);
    while widths.iter().sum::<usize>() > available {
        let Some((index, &widest)) = widths
            .iter()
            .enumerate()
            .max_by(|(a_index, a), (b_index, b)| a.cmp(b).then_with(|| b_index.cmp(a_index)))
        else {
            break;
        };
        if widest <= MIN_COLUMN_WIDTH {
            break;
        }
        widths[index] -= 1;
    }
    widths
}

/// Pad or cut `cell` to exactly `width` characters.
fn fit(cell: &str, width: usize) -> (String, bool) {
    let length = cell.chars().count();
    if length <= width {
        let mut padded = cell.to_owned();
        padded.extend(std::iter::repeat(' ').take(width - length));
        return (padded, false);
    }
    let mut cut: String = cell.chars().take(width.saturating_sub(3)).collect();
    cut.push_str(&".".repeat(width.min(3)));
    (cut, true)
}

fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut length = 0;
    for word in text.split_whitespace() {
        let mut chars: Vec<char> = word.chars().collect();
        while chars.len() > width {
            if length > 0 {
                lines.push(mem::take(&mut current));
                length = 0;
            }
            let rest = chars.split_off(width);
            lines.push(chars.into_iter().collect());
            chars = rest;
        }
        if chars.is_empty() {
            continue;
        }
        if length > 0 && length + 1 + chars.len() > width {
            lines.push(mem::take(&mut current));
            length = 0;
        }
        if length > 0 {
            current.push(' ');
            length += 1;
        }
        length += chars.len();
        current.extend(chars);
    }
    if length > 0 || lines.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_respects_width_and_splits_long_words() {
        assert_eq!(wrap("one two three", 7), vec!["one two", "three"]);
        assert_eq!(wrap("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert_eq!(wrap("", 10), vec![""]);
    }

    #[test]
    fn column_widths_shrink_to_budget() {
        let header = vec!["topic".to_owned(), "records".to_owned()];
        let rows = vec![vec!["x".repeat(60), "2".to_owned()]];
        let widths = column_widths(&header, &rows, 30);
        assert_eq!(widths, vec![21, 7]);
    }

    #[test]
    fn fit_pads_or_cuts() {
        assert_eq!(fit("ab", 4), ("ab  ".to_owned(), false));
        assert_eq!(fit("abcdefgh", 6), ("abc...".to_owned(), true));
    }

    #[test]
    fn oversized_table_is_truncated_and_recorded() {
        let table = DataTable {
            columns: vec!["topic".into(), "records".into()],
            rows: (0..12)
                .map(|index| vec![format!("topic-{index}"), index.to_string()])
                .collect(),
        };
        let mut layout = Layout::new(5, "overall summary");
        layout.table(&table, 0.0).unwrap();
        let (pages, truncations) = layout.finish();
        // header, rule, five rows, note
        assert_eq!(pages[0].runs.len(), 8);
        assert_eq!(truncations.len(), 1);
        assert_eq!(truncations[0].section, "overall summary");
        assert_eq!(truncations[0].detail, "table limited to 5 of 12 rows");
    }

    #[test]
    fn wide_cells_are_cut_and_recorded() {
        let table = DataTable {
            columns: vec!["topic".into()],
            rows: vec![vec!["y".repeat(400)]],
        };
        let mut layout = Layout::new(10, "billing");
        layout.table(&table, 0.0).unwrap();
        let (_, truncations) = layout.finish();
        assert_eq!(truncations.len(), 1);
        assert!(truncations[0].detail.starts_with("1 cell(s) in column 'topic'"));
    }

    #[test]
    fn cells_beyond_declared_columns_are_recorded() {
        let table = DataTable {
            columns: vec!["sentiment".into(), "records".into()],
            rows: vec![
                vec!["positive".into(), "2".into(), "stray".into()],
                vec!["negative".into(), "1".into()],
            ],
        };
        let mut layout = Layout::new(10, "billing");
        layout.table(&table, 0.0).unwrap();
        let (pages, truncations) = layout.finish();
        assert!(pages[0]
            .runs
            .iter()
            .all(|run| !String::from_utf8_lossy(&run.bytes).contains("stray")));
        assert_eq!(
            truncations,
            vec![TruncationNote {
                section: "billing".into(),
                detail: "1 row(s) wider than the 2 declared column(s); extra cells dropped"
                    .into(),
            }]
        );
    }

    #[test]
    fn long_content_flows_onto_new_pages() {
        let mut layout = Layout::new(10, "billing");
        for index in 0..200 {
            layout
                .line(Font::Regular, 10.0, 0.0, &format!("line {index}"))
                .unwrap();
        }
        let (mut pages, _) = layout.finish();
        assert!(pages.len() > 1);
        assert!(pages
            .iter()
            .flat_map(|page| &page.runs)
            .all(|run| run.y >= BOTTOM));
        stamp_pages(&mut pages, b"Weekly");
        let total = pages.len();
        let last = pages.last().unwrap().runs.last().unwrap();
        assert_eq!(last.bytes, format!("Page {total} of {total}").into_bytes());
    }

    #[test]
    fn unsupported_character_names_section() {
        let mut layout = Layout::new(10, "shipping");
        let err = layout
            .line(Font::Regular, 10.0, 0.0, "arrived 📦")
            .unwrap_err();
        assert_eq!(
            err,
            RenderError::UnsupportedCharacter {
                section: "shipping".into(),
                character: '📦',
                code: 0x1F4E6,
            }
        );
    }
}
