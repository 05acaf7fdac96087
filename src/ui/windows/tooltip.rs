use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
};
use textwrap::core::display_width;

use crate::models::Selection;

pub const TARGET_LABEL: &str = "Ukrainian";
const SPEAK_LABEL: &str = "[Listen]";
const CLOSE_LABEL: &str = "[Close]";
const ACTION_GAP: u16 = 2;
const MAX_INNER_WIDTH: usize = 36;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TooltipAction {
    Speak,
    Close,
}

/// First letter upper-cased, the rest untouched.
pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub struct TooltipWindow;

impl TooltipWindow {
    fn inner_width(selection: &Selection) -> usize {
        let actions = SPEAK_LABEL.len() + ACTION_GAP as usize + CLOSE_LABEL.len();
        [
            display_width(&selection.word),
            TARGET_LABEL.len(),
            actions,
            display_width(selection.display_text()),
        ]
        .into_iter()
        .max()
        .unwrap_or(actions)
        .min(MAX_INNER_WIDTH)
    }

    fn text_lines(selection: &Selection, inner_width: usize) -> Vec<String> {
        textwrap::wrap(selection.display_text(), inner_width)
            .into_iter()
            .map(|line| line.into_owned())
            .collect()
    }

    /// Popup rectangle: centred over the anchor and just above it, or below
    /// when there is no room above. Always kept inside `frame`.
    pub fn area(frame: Rect, selection: &Selection) -> Rect {
        let inner = Self::inner_width(selection);
        let body = Self::text_lines(selection, inner).len() as u16;
        let width = (inner as u16 + 4).min(frame.width);
        let height = (body + 5).min(frame.height);
        let anchor = selection.anchor;

        let max_x = frame.right().saturating_sub(width);
        let x = anchor.x.saturating_sub(width / 2).clamp(frame.x, max_x.max(frame.x));

        let y = if anchor.y >= frame.y + height {
            anchor.y - height
        } else {
            let max_y = frame.bottom().saturating_sub(height);
            (anchor.y + 1).min(max_y.max(frame.y))
        };

        Rect::new(x, y, width, height)
    }

    /// Popup rectangle plus the text lines that fit in it. Text is cut from
    /// the end so the action row stays visible in a short frame.
    fn layout(frame: Rect, selection: &Selection) -> (Rect, Vec<String>) {
        let area = Self::area(frame, selection);
        let mut body = Self::text_lines(selection, Self::inner_width(selection));
        body.truncate(area.height.saturating_sub(5) as usize);
        (area, body)
    }

    /// Row of `[Listen]  [Close]`, or `None` when the frame is too short for it.
    fn action_row(area: Rect, body_lines: usize) -> Option<u16> {
        let row = area.y + 3 + body_lines as u16;
        (row + 1 < area.bottom()).then_some(row)
    }

    pub fn contains(frame: Rect, selection: &Selection, x: u16, y: u16) -> bool {
        Self::area(frame, selection).contains((x, y).into())
    }

    /// Which button, if any, sits under `(x, y)`.
    pub fn action_at(frame: Rect, selection: &Selection, x: u16, y: u16) -> Option<TooltipAction> {
        let (area, body) = Self::layout(frame, selection);
        if Self::action_row(area, body.len()) != Some(y) {
            return None;
        }
        let speak_start = area.x + 2;
        let speak_end = speak_start + SPEAK_LABEL.len() as u16;
        let close_start = speak_end + ACTION_GAP;
        let close_end = close_start + CLOSE_LABEL.len() as u16;

        if (speak_start..speak_end).contains(&x) {
            Some(TooltipAction::Speak)
        } else if (close_start..close_end).contains(&x) {
            Some(TooltipAction::Close)
        } else {
            None
        }
    }

    pub fn render(frame: &mut Frame, selection: &Selection) {
        let (area, body) = Self::layout(frame.area(), selection);

        let text_style = if selection.loading {
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC)
        } else if selection.error.is_some() && selection.translation.is_none() {
            Style::default().fg(Color::Red)
        } else {
            Style::default()
        };

        let mut lines = vec![
            Line::from(Span::styled(
                capitalize(&selection.word),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(TARGET_LABEL, Style::default().fg(Color::DarkGray))),
        ];
        lines.extend(
            body.into_iter()
                .map(|text| Line::from(Span::styled(text, text_style))),
        );
        lines.push(Line::from(vec![
            Span::styled(SPEAK_LABEL, Style::default().fg(Color::Cyan)),
            Span::raw(" ".repeat(ACTION_GAP as usize)),
            Span::styled(CLOSE_LABEL, Style::default().fg(Color::DarkGray)),
        ]));

        frame.render_widget(Clear, area);
        let tooltip = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .padding(ratatui::widgets::Padding::horizontal(1)),
        );
        frame.render_widget(tooltip, area);
    }
}
