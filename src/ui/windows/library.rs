use ratatui::{
    Frame,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};

use crate::content::{EMPTY_LIBRARY, EMPTY_LIBRARY_HINT};
use crate::models::BOOK_TITLE;

/// One row of the table of contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryEntry {
    pub id: u32,
    pub title: String,
    pub preview: String,
    pub has_image: bool,
}

pub struct LibraryWindow;

impl LibraryWindow {
    pub fn render(frame: &mut Frame, area: Rect, entries: &[LibraryEntry], selected_index: usize) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!(" {BOOK_TITLE} ({} chapters) ", entries.len()));

        if entries.is_empty() {
            let empty = Paragraph::new(vec![
                Line::from(EMPTY_LIBRARY),
                Line::default(),
                Line::from(Span::styled(
                    EMPTY_LIBRARY_HINT,
                    Style::default().fg(Color::DarkGray),
                )),
            ])
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(block);
            frame.render_widget(empty, area);
            return;
        }

        let preview_width = area.width.saturating_sub(8) as usize;
        let items: Vec<ListItem> = entries
            .iter()
            .map(|entry| {
                let mut heading = vec![
                    Span::styled(
                        format!("{:>2}. ", entry.id),
                        Style::default().fg(Color::DarkGray),
                    ),
                    Span::styled(
                        entry.title.clone(),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                ];
                if entry.has_image {
                    heading.push(Span::styled(" [image]", Style::default().fg(Color::Cyan)));
                }
                let preview: String = entry.preview.chars().take(preview_width).collect();
                ListItem::new(Text::from(vec![
                    Line::from(heading),
                    Line::from(Span::styled(
                        format!("    {preview}"),
                        Style::default().fg(Color::Gray),
                    )),
                    Line::default(),
                ]))
            })
            .collect();

        let mut state = ListState::default();
        state.select(Some(selected_index.min(entries.len() - 1)));

        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("> ");

        frame.render_stateful_widget(list, area, &mut state);
    }
}
