use std::path::Path;

use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};
use textwrap::core::{Fragment, display_width};
use textwrap::wrap_algorithms::wrap_first_fit;

use crate::models::{AnchorPosition, Chapter, Token};
use crate::tokenizer;

const PARAGRAPH_INDENT: u16 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// Index into [`Board::words`].
    Word(usize),
    Text,
    Title,
    Caption,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub col: u16,
    pub width: u16,
    pub kind: SegmentKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardLine {
    pub segments: Vec<Segment>,
}

impl BoardLine {
    fn plain(text: &str, kind: SegmentKind) -> Self {
        Self {
            segments: vec![Segment {
                text: text.to_string(),
                col: 0,
                width: display_width(text) as u16,
                kind,
            }],
        }
    }
}

/// Where a clickable word sits on the laid-out page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordCell {
    pub text: String,
    pub line: usize,
    pub col: u16,
    pub width: u16,
}

/// Whitespace-delimited chunk of a paragraph: a word with the punctuation
/// glued to it.
#[derive(Debug, Default)]
struct Unit<'a> {
    pieces: Vec<(&'a str, bool)>,
    width: usize,
    gap: usize,
}

impl<'a> Unit<'a> {
    fn push(&mut self, text: &'a str, is_word: bool) {
        self.width += display_width(text);
        self.pieces.push((text, is_word));
    }
}

impl Fragment for Unit<'_> {
    fn width(&self) -> f64 {
        self.width as f64
    }

    fn whitespace_width(&self) -> f64 {
        self.gap as f64
    }

    fn penalty_width(&self) -> f64 {
        0.0
    }
}

fn units<'a>(tokens: &[Token<'a>]) -> Vec<Unit<'a>> {
    let mut units = Vec::new();
    let mut current = Unit::default();

    for token in tokens {
        if token.is_word() {
            current.push(token.text, true);
            continue;
        }
        let mut rest = token.text;
        while let Some(first) = rest.chars().next() {
            let blank = first.is_whitespace();
            let end = rest
                .find(|c: char| c.is_whitespace() != blank)
                .unwrap_or(rest.len());
            let (group, tail) = rest.split_at(end);
            if !blank {
                current.push(group, false);
            } else if !current.pieces.is_empty() {
                current.gap = 1;
                units.push(std::mem::take(&mut current));
            }
            rest = tail;
        }
    }
    if !current.pieces.is_empty() {
        units.push(current);
    }
    units
}

/// Chapter page laid out for a given width, with a hit map for its words.
#[derive(Debug, Default)]
pub struct Board {
    lines: Vec<BoardLine>,
    words: Vec<WordCell>,
    line_words: Vec<Vec<usize>>,
    layout_key: Option<(u32, u16)>,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_laid_out_for(&self, chapter_id: u32, width: u16) -> bool {
        self.layout_key == Some((chapter_id, width))
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn layout(&mut self, chapter: &Chapter, illustration: Option<&Path>, width: u16) {
        self.clear();
        self.layout_key = Some((chapter.id, width));
        let width = width.max(PARAGRAPH_INDENT + 8);

        for line in textwrap::wrap(&chapter.title, width as usize) {
            self.push_line(BoardLine::plain(&line, SegmentKind::Title));
        }
        self.push_line(BoardLine::default());

        if let Some(path) = illustration {
            let caption = format!("Illustration: {}", path.display());
            for line in textwrap::wrap(&caption, width as usize) {
                self.push_line(BoardLine::plain(&line, SegmentKind::Caption));
            }
            self.push_line(BoardLine::default());
        }

        for (i, paragraph) in tokenizer::paragraphs(&chapter.content).iter().enumerate() {
            if i > 0 {
                self.push_line(BoardLine::default());
            }
            self.layout_paragraph(&paragraph.tokens, width);
        }
    }

    fn layout_paragraph(&mut self, tokens: &[Token<'_>], width: u16) {
        let units = units(tokens);
        let widths = [(width - PARAGRAPH_INDENT) as f64, width as f64];

        for (row, wrapped) in wrap_first_fit(&units, &widths).into_iter().enumerate() {
            let line_idx = self.lines.len();
            let mut line = BoardLine::default();
            let mut col = if row == 0 { PARAGRAPH_INDENT } else { 0 };

            for (i, unit) in wrapped.iter().enumerate() {
                if i > 0 {
                    col += wrapped[i - 1].gap as u16;
                }
                for &(text, is_word) in &unit.pieces {
                    let piece_width = display_width(text) as u16;
                    let kind = if is_word {
                        self.words.push(WordCell {
                            text: text.to_string(),
                            line: line_idx,
                            col,
                            width: piece_width,
                        });
                        SegmentKind::Word(self.words.len() - 1)
                    } else {
                        SegmentKind::Text
                    };
                    line.segments.push(Segment {
                        text: text.to_string(),
                        col,
                        width: piece_width,
                        kind,
                    });
                    col += piece_width;
                }
            }
            self.push_line(line);
        }
    }

    fn push_line(&mut self, line: BoardLine) {
        let words = line
            .segments
            .iter()
            .filter_map(|segment| match segment.kind {
                SegmentKind::Word(idx) => Some(idx),
                _ => None,
            })
            .collect();
        self.line_words.push(words);
        self.lines.push(line);
    }

    pub fn total_lines(&self) -> usize {
        self.lines.len()
    }

    pub fn lines(&self) -> &[BoardLine] {
        &self.lines
    }

    pub fn words(&self) -> &[WordCell] {
        &self.words
    }

    pub fn word(&self, idx: usize) -> Option<&WordCell> {
        self.words.get(idx)
    }

    pub fn word_at(&self, line: usize, col: u16) -> Option<usize> {
        self.line_words.get(line)?.iter().copied().find(|&idx| {
            let cell = &self.words[idx];
            col >= cell.col && col < cell.col + cell.width
        })
    }

    /// Word under the terminal cell `(x, y)` when the page is drawn in `area`
    /// scrolled down by `scroll` lines.
    pub fn hit_test(&self, area: Rect, scroll: usize, x: u16, y: u16) -> Option<usize> {
        if !area.contains((x, y).into()) {
            return None;
        }
        let line = scroll + (y - area.y) as usize;
        self.word_at(line, x - area.x)
    }

    /// Horizontal centre and line of a word on the page, independent of scrolling.
    pub fn page_anchor(&self, idx: usize) -> Option<AnchorPosition> {
        let cell = self.words.get(idx)?;
        Some(AnchorPosition {
            x: cell.col + cell.width / 2,
            y: u16::try_from(cell.line).unwrap_or(u16::MAX),
        })
    }

    /// Move a page anchor to terminal cells. `None` while its line is off screen.
    pub fn to_screen(anchor: AnchorPosition, area: Rect, scroll: usize) -> Option<AnchorPosition> {
        let line = anchor.y as usize;
        if !Self::line_visible(line, area, scroll) {
            return None;
        }
        Some(AnchorPosition {
            x: area.x + anchor.x,
            y: area.y + (line - scroll) as u16,
        })
    }

    /// Horizontal centre and top row of a visible word, in terminal cells.
    pub fn anchor_for(&self, idx: usize, area: Rect, scroll: usize) -> Option<AnchorPosition> {
        Self::to_screen(self.page_anchor(idx)?, area, scroll)
    }

    fn line_visible(line: usize, area: Rect, scroll: usize) -> bool {
        line >= scroll && line < scroll + area.height as usize
    }

    pub fn is_word_visible(&self, idx: usize, area: Rect, scroll: usize) -> bool {
        self.words
            .get(idx)
            .is_some_and(|cell| Self::line_visible(cell.line, area, scroll))
    }

    pub fn first_visible_word(&self, area: Rect, scroll: usize) -> Option<usize> {
        let end = (scroll + area.height as usize).min(self.line_words.len());
        self.line_words
            .get(scroll..end)?
            .iter()
            .find_map(|words| words.first().copied())
    }

    pub fn max_scroll(&self, height: u16) -> usize {
        self.lines.len().saturating_sub(height as usize)
    }

    /// Draw the visible slice. Words equal to `highlight` (ignoring case) are
    /// emphasised and the keyboard cursor word is reversed.
    pub fn render(
        &self,
        frame: &mut Frame,
        area: Rect,
        scroll: usize,
        highlight: Option<&str>,
        cursor: Option<usize>,
    ) {
        let highlight = highlight.map(str::to_lowercase);
        let end = (scroll + area.height as usize).min(self.lines.len());
        let visible: Vec<Line> = self
            .lines
            .get(scroll..end)
            .unwrap_or(&[])
            .iter()
            .map(|line| {
                let mut spans = Vec::with_capacity(line.segments.len() * 2);
                let mut col = 0;
                for segment in &line.segments {
                    if segment.col > col {
                        spans.push(Span::raw(" ".repeat((segment.col - col) as usize)));
                    }
                    let style = match segment.kind {
                        SegmentKind::Title => Style::default().add_modifier(Modifier::BOLD),
                        SegmentKind::Caption => Style::default()
                            .fg(Color::DarkGray)
                            .add_modifier(Modifier::ITALIC),
                        SegmentKind::Text => Style::default(),
                        SegmentKind::Word(idx) => {
                            let mut style = Style::default();
                            if highlight
                                .as_deref()
                                .is_some_and(|h| segment.text.to_lowercase() == h)
                            {
                                style = style
                                    .fg(Color::Yellow)
                                    .add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
                            }
                            if cursor == Some(idx) {
                                style = style.add_modifier(Modifier::REVERSED);
                            }
                            style
                        }
                    };
                    spans.push(Span::styled(segment.text.clone(), style));
                    col = segment.col + segment.width;
                }
                Line::from(spans)
            })
            .collect();

        frame.render_widget(Paragraph::new(visible), area);
    }
}
