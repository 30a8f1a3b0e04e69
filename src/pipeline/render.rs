//! Report rendering: lay out extracted sections on letter pages and write a PDF.
//!
//! Rendering is two steps:
//!
//! 1. **Layout** — a single top-to-bottom pass that places text runs and
//!    table rules on pages. Sections are appended in slot order; when the
//!    cursor reaches the bottom margin a new page starts. Nothing already
//!    placed is ever moved. Text wider than its column wraps onto further
//!    lines; no extracted value is cut.
//! 2. **Serialise** — each page becomes one uncompressed content stream in a
//!    `lopdf` document using the standard Helvetica fonts, so no font files
//!    are embedded.

use crate::error::DocExtractError;
use crate::record::NormalizedRecord;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use serde::Serialize;
use tracing::debug;

/// Download name of the report.
pub const REPORT_FILENAME: &str = "extracted_report.pdf";

/// Media type of the report.
pub const REPORT_MEDIA_TYPE: &str = "application/pdf";

const REPORT_HEADING: &str = "Extracted Document Report";

// Letter, in points.
const PAGE_WIDTH: f32 = 612.0;
const PAGE_HEIGHT: f32 = 792.0;
const MARGIN: f32 = 54.0;

const HEADING_SIZE: f32 = 16.0;
const TITLE_SIZE: f32 = 13.0;
const BODY_SIZE: f32 = 10.0;
const LINE_HEIGHT: f32 = 15.0;
const SECTION_GAP: f32 = 18.0;
const KEY_COLUMN_WIDTH: f32 = 190.0;
const CELL_PADDING: f32 = 4.0;
const VALUE_COLUMN_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN - KEY_COLUMN_WIDTH;
const KEY_X: f32 = MARGIN + CELL_PADDING;
const VALUE_X: f32 = MARGIN + KEY_COLUMN_WIDTH + CELL_PADDING;

/// Average Helvetica glyph width as a fraction of the font size.
const AVG_GLYPH_WIDTH: f32 = 0.5;

/// What one report slot holds.
#[derive(Debug, Clone)]
pub enum SlotContent {
    /// No document was submitted for this slot; the slot is skipped.
    Empty,
    /// Extraction failed; the reason replaces the tables.
    Failed(String),
    Record(NormalizedRecord),
}

/// One titled slot of the report, in submission order.
#[derive(Debug, Clone)]
pub struct ReportSlot {
    pub title: String,
    pub content: SlotContent,
}

impl ReportSlot {
    pub fn new(title: impl Into<String>, content: SlotContent) -> Self {
        Self {
            title: title.into(),
            content,
        }
    }
}

/// Summary of a section that made it into the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RenderedSection {
    Table {
        title: String,
        field_rows: usize,
        subject_rows: Option<usize>,
    },
    Error {
        title: String,
        message: String,
    },
}

impl RenderedSection {
    pub fn title(&self) -> &str {
        match self {
            RenderedSection::Table { title, .. } | RenderedSection::Error { title, .. } => title,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, RenderedSection::Error { .. })
    }
}

/// The rendered report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportArtifact {
    pub sections: Vec<RenderedSection>,
    pub page_count: usize,
    /// The PDF file. Omitted from JSON output.
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl ReportArtifact {
    pub fn filename(&self) -> &'static str {
        REPORT_FILENAME
    }

    pub fn media_type(&self) -> &'static str {
        REPORT_MEDIA_TYPE
    }
}

/// Render `slots` into a paginated PDF report.
pub fn render_report(slots: &[ReportSlot]) -> Result<ReportArtifact, DocExtractError> {
    let (sections, pages) = lay_out(slots);
    let bytes = write_pdf(&pages)?;
    debug!(
        "Rendered {} sections on {} pages ({} bytes)",
        sections.len(),
        pages.len(),
        bytes.len()
    );

    Ok(ReportArtifact {
        sections,
        page_count: pages.len(),
        bytes,
    })
}

// ── Layout ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource_name(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }
}

#[derive(Debug, Clone)]
struct TextRun {
    x: f32,
    y: f32,
    size: f32,
    font: Font,
    text: String,
}

/// Horizontal rule from `x1` to `x2` at height `y`.
#[derive(Debug, Clone, Copy)]
struct Rule {
    x1: f32,
    x2: f32,
    y: f32,
}

#[derive(Debug, Clone, Default)]
struct PageLayout {
    runs: Vec<TextRun>,
    rules: Vec<Rule>,
}

struct Layout {
    pages: Vec<PageLayout>,
    /// Baseline of the next line on the current page.
    cursor: f32,
}

impl Layout {
    fn new() -> Self {
        Self {
            pages: vec![PageLayout::default()],
            cursor: PAGE_HEIGHT - MARGIN,
        }
    }

    fn page(&mut self) -> &mut PageLayout {
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    /// Start a new page unless `height` more points fit on this one.
    fn reserve(&mut self, height: f32) {
        if self.cursor - height < MARGIN {
            self.pages.push(PageLayout::default());
            self.cursor = PAGE_HEIGHT - MARGIN;
        }
    }

    fn text(&mut self, x: f32, size: f32, font: Font, text: String) {
        let y = self.cursor;
        self.page().runs.push(TextRun {
            x,
            y,
            size,
            font,
            text,
        });
    }

    fn rule(&mut self) {
        let y = self.cursor + LINE_HEIGHT - BODY_SIZE * 0.3;
        self.page().rules.push(Rule {
            x1: MARGIN,
            x2: PAGE_WIDTH - MARGIN,
            y,
        });
    }

    fn line(&mut self, size: f32, font: Font, text: &str) {
        let max = max_chars(PAGE_WIDTH - 2.0 * MARGIN, size);
        for piece in wrap(text, max) {
            self.reserve(LINE_HEIGHT);
            self.text(MARGIN, size, font, piece);
            self.cursor -= LINE_HEIGHT;
        }
    }

    /// One two-column table row with a rule above it. Both cells wrap; the
    /// row is as tall as its longer cell.
    fn row(&mut self, key: &str, value: &str, font: Font) {
        let key_max = max_chars(KEY_COLUMN_WIDTH - 2.0 * CELL_PADDING, BODY_SIZE);
        let value_max = max_chars(VALUE_COLUMN_WIDTH - 2.0 * CELL_PADDING, BODY_SIZE);
        let keys = wrap(key, key_max);
        let values = wrap(value, value_max);
        let lines = keys.len().max(values.len());

        // A row taller than a page continues on the next one.
        let height = (lines as f32 * LINE_HEIGHT).min(PAGE_HEIGHT - 2.0 * MARGIN);
        self.reserve(height);
        self.rule();
        for i in 0..lines {
            if i > 0 {
                self.reserve(LINE_HEIGHT);
            }
            if let Some(piece) = keys.get(i) {
                self.text(KEY_X, BODY_SIZE, font, piece.clone());
            }
            if let Some(piece) = values.get(i) {
                self.text(VALUE_X, BODY_SIZE, font, piece.clone());
            }
            self.cursor -= LINE_HEIGHT;
        }
    }

    fn gap(&mut self, height: f32) {
        self.cursor -= height;
    }
}

/// Place every slot; returns the sections that were emitted and the pages.
fn lay_out(slots: &[ReportSlot]) -> (Vec<RenderedSection>, Vec<PageLayout>) {
    let mut layout = Layout::new();
    let mut sections = Vec::new();

    layout.line(HEADING_SIZE, Font::Bold, REPORT_HEADING);
    layout.gap(LINE_HEIGHT / 2.0);

    for slot in slots {
        match &slot.content {
            SlotContent::Empty => continue,
            SlotContent::Failed(message) => {
                layout.reserve(2.0 * LINE_HEIGHT);
                layout.line(TITLE_SIZE, Font::Bold, &slot.title);
                layout.line(BODY_SIZE, Font::Regular, &format!("Error: {message}"));
                sections.push(RenderedSection::Error {
                    title: slot.title.clone(),
                    message: message.clone(),
                });
            }
            SlotContent::Record(record) => {
                // Keep the title together with at least one row.
                layout.reserve(2.0 * LINE_HEIGHT);
                layout.line(TITLE_SIZE, Font::Bold, &slot.title);
                for (field, value) in &record.main {
                    layout.row(field, &value.to_string(), Font::Regular);
                }
                if let Some(subjects) = &record.subjects {
                    layout.gap(LINE_HEIGHT / 2.0);
                    layout.reserve(2.0 * LINE_HEIGHT);
                    layout.row("Subject", "Score", Font::Bold);
                    for (subject, score) in subjects {
                        layout.row(subject, &score.to_string(), Font::Regular);
                    }
                }
                sections.push(RenderedSection::Table {
                    title: slot.title.clone(),
                    field_rows: record.main.len(),
                    subject_rows: record.subjects.as_ref().map(Vec::len),
                });
            }
        }
        layout.gap(SECTION_GAP);
    }

    if sections.is_empty() {
        layout.line(BODY_SIZE, Font::Regular, "No documents were submitted.");
    }

    (sections, layout.pages)
}

fn max_chars(width: f32, size: f32) -> usize {
    (width / (size * AVG_GLYPH_WIDTH)).floor().max(4.0) as usize
}

/// Break `text` into lines of at most `max` characters, at whitespace where
/// possible. Always returns at least one line.
fn wrap(text: &str, max: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut len = 0;

    for word in text.split_whitespace() {
        let mut chars: Vec<char> = word.chars().collect();
        // Words wider than a line are split hard.
        while chars.len() > max {
            if len > 0 {
                lines.push(std::mem::take(&mut line));
                len = 0;
            }
            lines.push(chars.drain(..max).collect());
        }
        if len > 0 && len + 1 + chars.len() > max {
            lines.push(std::mem::take(&mut line));
            len = 0;
        }
        if len > 0 {
            line.push(' ');
            len += 1;
        }
        len += chars.len();
        line.extend(chars);
    }

    if len > 0 || lines.is_empty() {
        lines.push(line);
    }
    lines
}

// ── PDF serialisation ────────────────────────────────────────────────────────

fn write_pdf(pages: &[PageLayout]) -> Result<Vec<u8>, DocExtractError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            Font::Regular.resource_name() => regular_id,
            Font::Bold.resource_name() => bold_id,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for page in pages {
        let content = Content {
            operations: page_operations(page),
        };
        let encoded = content.encode().map_err(|e| DocExtractError::RenderFailed {
            detail: format!("content stream: {e}"),
        })?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_count,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| DocExtractError::RenderFailed {
            detail: format!("serialise: {e}"),
        })?;
    Ok(bytes)
}

fn page_operations(page: &PageLayout) -> Vec<Operation> {
    let mut ops = Vec::with_capacity(page.rules.len() * 3 + page.runs.len() * 5 + 4);

    if !page.rules.is_empty() {
        ops.push(Operation::new("G", vec![0.75f32.into()]));
        ops.push(Operation::new("w", vec![0.5f32.into()]));
        for rule in &page.rules {
            ops.push(Operation::new("m", vec![rule.x1.into(), rule.y.into()]));
            ops.push(Operation::new("l", vec![rule.x2.into(), rule.y.into()]));
        }
        ops.push(Operation::new("S", vec![]));
    }

    for run in &page.runs {
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new(
            "Tf",
            vec![run.font.resource_name().into(), run.size.into()],
        ));
        ops.push(Operation::new("Td", vec![run.x.into(), run.y.into()]));
        ops.push(Operation::new("Tj", vec![Object::string_literal(win_ansi(&run.text))]));
        ops.push(Operation::new("ET", vec![]));
    }

    ops
}

/// Encode text for a WinAnsi Type1 font; characters it cannot show become `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars().map(win_ansi_byte).collect()
}

/// WinAnsi is Latin-1 except for 0x80–0x9F, which hold typographic marks
/// instead of C1 controls.
fn win_ansi_byte(c: char) -> u8 {
    match c {
        '\u{20AC}' => 0x80, // €
        '\u{201A}' => 0x82,
        '\u{0192}' => 0x83,
        '\u{201E}' => 0x84,
        '\u{2026}' => 0x85, // …
        '\u{2020}' => 0x86,
        '\u{2021}' => 0x87,
        '\u{02C6}' => 0x88,
        '\u{2030}' => 0x89,
        '\u{0160}' => 0x8A,
        '\u{2039}' => 0x8B,
        '\u{0152}' => 0x8C,
        '\u{017D}' => 0x8E,
        '\u{2018}' => 0x91, // ‘
        '\u{2019}' => 0x92, // ’
        '\u{201C}' => 0x93, // “
        '\u{201D}' => 0x94, // ”
        '\u{2022}' => 0x95,
        '\u{2013}' => 0x96, // –
        '\u{2014}' => 0x97, // —
        '\u{02DC}' => 0x98,
        '\u{2122}' => 0x99,
        '\u{0161}' => 0x9A,
        '\u{203A}' => 0x9B,
        '\u{0153}' => 0x9C,
        '\u{017E}' => 0x9E,
        '\u{0178}' => 0x9F,
        '\u{0080}'..='\u{009F}' => b'?',
        _ => u8::try_from(u32::from(c)).unwrap_or(b'?'),
    }
}
