use async_trait::async_trait;
use printpdf::{
    BuiltinFont, Color, Greyscale, Line, LinePoint, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions,
    Point, Pt, Rgb, TextItem,
};
use std::path::{Path, PathBuf};

use crate::{
    error::SinkError, models::Submission, services::result_sink::ResultSink,
    utils::time::format_timestamp,
};

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const LEFT_MM: f32 = 20.0;
const TOP_MM: f32 = 275.0;
const BOTTOM_MM: f32 = 20.0;
const PROSE_CHARS_PER_LINE: usize = 95;
const CODE_CHARS_PER_LINE: usize = 88;

/// Writes one PDF report per submission into a directory.
pub struct PdfExporter {
    output_dir: PathBuf,
}

impl PdfExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn file_name(submission: &Submission) -> String {
        format!(
            "submission-{}-{}.pdf",
            submission.submitted_at.format("%Y%m%dT%H%M%S"),
            submission.id
        )
    }

    pub fn build_pdf(submission: &Submission) -> Vec<u8> {
        let mut document = PdfDocument::new("AI Coding Interview Results");

        let accent_color = Color::Rgb(Rgb {
            r: 0.16,
            g: 0.4,
            b: 0.69,
            icc_profile: None,
        });
        let text_color = Color::Greyscale(Greyscale::new(0.08, None));
        let muted_color = Color::Greyscale(Greyscale::new(0.4, None));

        let mut layout = PageLayout::new();
        layout.text(
            "AI Coding Interview Results".into(),
            BuiltinFont::HelveticaBold,
            18.0,
            &accent_color,
        );
        layout.text(
            format!(
                "Submitted: {} UTC",
                format_timestamp(&submission.submitted_at)
            ),
            BuiltinFont::Helvetica,
            10.0,
            &muted_color,
        );
        layout.rule();

        let sections = [
            ("Coding Challenge", submission.question.as_str(), false),
            ("Your Code", submission.user_code.as_str(), true),
            ("AI Feedback", submission.feedback.as_str(), false),
        ];
        for (heading, body, is_code) in sections {
            layout.gap(4.0);
            layout.text(heading.into(), BuiltinFont::HelveticaBold, 13.0, &accent_color);
            let (font, size, width) = if is_code {
                (BuiltinFont::Courier, 9.0, CODE_CHARS_PER_LINE)
            } else {
                (BuiltinFont::Helvetica, 10.5, PROSE_CHARS_PER_LINE)
            };
            for line in wrap_text(body, width) {
                layout.text(line, font, size, &text_color);
            }
        }

        let mut warnings = Vec::new();
        document
            .with_pages(layout.into_pages())
            .save(&PdfSaveOptions::default(), &mut warnings)
    }

    pub async fn export(&self, submission: &Submission) -> Result<PathBuf, SinkError> {
        let bytes = Self::build_pdf(submission);
        if bytes.is_empty() {
            return Err(SinkError::Pdf("renderer produced an empty document".into()));
        }

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let path = self.output_dir.join(Self::file_name(submission));
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }
}

#[async_trait]
impl ResultSink for PdfExporter {
    fn name(&self) -> &'static str {
        "pdf_export"
    }

    async fn record(&self, submission: &Submission) -> Result<(), SinkError> {
        let path = self.export(submission).await?;
        tracing::info!("PDF report written: {}", path.display());
        Ok(())
    }
}

/// Top-down text cursor that starts a new A4 page when it runs out of room.
struct PageLayout {
    pages: Vec<PdfPage>,
    ops: Vec<Op>,
    y: f32,
}

impl PageLayout {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            ops: Vec::new(),
            y: TOP_MM,
        }
    }

    fn line_height_mm(font_size: f32) -> f32 {
        // 1pt = 0.3528mm, plus leading
        font_size * 0.3528 * 1.35
    }

    fn ensure_room(&mut self, height: f32) {
        if self.y - height < BOTTOM_MM {
            self.finish_page();
        }
    }

    fn finish_page(&mut self) {
        let ops = std::mem::take(&mut self.ops);
        self.pages
            .push(PdfPage::new(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), ops));
        self.y = TOP_MM;
    }

    fn gap(&mut self, height: f32) {
        self.y -= height;
    }

    fn text(&mut self, text: String, font: BuiltinFont, font_size: f32, color: &Color) {
        let height = Self::line_height_mm(font_size);
        self.ensure_room(height);
        push_pdf_text(
            &mut self.ops,
            Point::new(Mm(LEFT_MM), Mm(self.y)),
            font,
            font_size,
            font_size * 1.2,
            text,
            color,
        );
        self.y -= height;
    }

    fn rule(&mut self) {
        self.ensure_room(4.0);
        self.ops.push(Op::SetOutlineColor {
            col: Color::Greyscale(Greyscale::new(0.65, None)),
        });
        push_pdf_line(
            &mut self.ops,
            (LEFT_MM, self.y),
            (PAGE_WIDTH_MM - LEFT_MM, self.y),
        );
        self.y -= 4.0;
    }

    fn into_pages(mut self) -> Vec<PdfPage> {
        if !self.ops.is_empty() || self.pages.is_empty() {
            self.finish_page();
        }
        self.pages
    }
}

fn push_pdf_text(
    ops: &mut Vec<Op>,
    pos: Point,
    font: BuiltinFont,
    font_size: f32,
    line_height: f32,
    text: String,
    color: &Color,
) {
    ops.extend([
        Op::StartTextSection,
        Op::SetTextCursor { pos },
        Op::SetFontSizeBuiltinFont {
            size: Pt(font_size),
            font,
        },
        Op::SetLineHeight {
            lh: Pt(line_height),
        },
        Op::SetFillColor { col: color.clone() },
        Op::WriteTextBuiltinFont {
            items: vec![TextItem::Text(text)],
            font,
        },
        Op::EndTextSection,
    ]);
}

fn push_pdf_line(ops: &mut Vec<Op>, from: (f32, f32), to: (f32, f32)) {
    ops.push(Op::DrawLine {
        line: Line {
            points: vec![
                LinePoint {
                    p: Point::new(Mm(from.0), Mm(from.1)),
                    bezier: false,
                },
                LinePoint {
                    p: Point::new(Mm(to.0), Mm(to.1)),
                    bezier: false,
                },
            ],
            is_closed: false,
        },
    });
}

/// Splits `text` into lines of at most `max_chars`, breaking at spaces where possible.
/// Leading indentation survives, tabs become four spaces.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();

    for raw in text.replace("\r\n", "\n").split('\n') {
        let chars: Vec<char> = raw.replace('\t', "    ").chars().collect();
        if chars.is_empty() {
            lines.push(String::new());
            continue;
        }

        let mut start = 0;
        let mut indent = chars.iter().take_while(|c| **c == ' ').count();
        while chars.len() - start > max_chars {
            let break_at = chars[start..=start + max_chars]
                .iter()
                .rposition(|c| *c == ' ')
                .filter(|idx| *idx > indent)
                .unwrap_or(max_chars);
            lines.push(
                chars[start..start + break_at]
                    .iter()
                    .collect::<String>()
                    .trim_end()
                    .to_string(),
            );
            start += break_at;
            while chars.get(start) == Some(&' ') {
                start += 1;
            }
            indent = 0;
        }
        if start < chars.len() {
            lines.push(chars[start..].iter().collect());
        }
    }

    lines
}
