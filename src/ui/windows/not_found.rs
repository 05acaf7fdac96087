use ratatui::{
    Frame,
    layout::{Alignment, Rect},
    style::{Color, Style},
    text::Line,
    widgets::{Block, Borders, Clear, Paragraph},
};

pub struct NotFoundWindow;

impl NotFoundWindow {
    pub fn render(frame: &mut Frame, area: Rect, chapter_id: u32) {
        let popup_area = super::centered_fixed_area(area, 44, 6);
        frame.render_widget(Clear, popup_area);

        let body = Paragraph::new(vec![
            Line::from(format!("Chapter {chapter_id} not found")),
            Line::default(),
            Line::styled(
                "Enter: back to the chapter list",
                Style::default().fg(Color::DarkGray),
            ),
        ])
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .title("Not found")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red)),
        );
        frame.render_widget(body, popup_area);
    }
}
