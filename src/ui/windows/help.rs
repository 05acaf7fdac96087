use ratatui::{
    Frame,
    layout::Rect,
    text::Line,
    widgets::{Block, Borders, Clear, Paragraph},
};

use crate::settings::CfgDefaultKeymaps;

pub struct HelpWindow;

impl HelpWindow {
    pub fn lines(keys: &CfgDefaultKeymaps) -> Vec<String> {
        let row = |keys: String, what: &str| format!("   {keys:<18}{what}");
        vec![
            " Reading:".to_string(),
            row(format!("{} / Up", keys.scroll_up), "Line Up"),
            row(format!("{} / Down", keys.scroll_down), "Line Down"),
            row(format!("{} / PgUp", keys.page_up), "Page Up"),
            row(format!("{} / PgDn / Space", keys.page_down), "Page Down"),
            row(format!("{} / Home", keys.beginning_of_ch), "Chapter Start"),
            row(format!("{} / End", keys.end_of_ch), "Chapter End"),
            row(keys.next_chapter.clone(), "Next Chapter"),
            row(keys.prev_chapter.clone(), "Previous Chapter"),
            String::new(),
            " Words:".to_string(),
            row("Mouse click".to_string(), "Translate Word"),
            row(format!("{} / Tab", keys.next_word), "Next Word"),
            row(format!("{} / Shift+Tab", keys.prev_word), "Previous Word"),
            row(format!("{} / Enter", keys.lookup), "Translate Word At Cursor"),
            row(keys.speak.clone(), "Pronounce Word"),
            row(keys.yank.clone(), "Copy Word And Translation"),
            row(format!("{} / Esc", keys.close_tooltip), "Close Translation"),
            String::new(),
            " Windows:".to_string(),
            row(keys.library.clone(), "Chapter List"),
            row(keys.help.clone(), "Help"),
            row(keys.quit.clone(), "Quit / Close Window"),
        ]
    }

    pub fn get_total_lines(keys: &CfgDefaultKeymaps) -> usize {
        Self::lines(keys).len()
    }

    pub fn max_scroll_offset(area: Rect, keys: &CfgDefaultKeymaps) -> u16 {
        let visible = area.height.saturating_sub(2) as usize;
        Self::get_total_lines(keys).saturating_sub(visible) as u16
    }

    pub fn render(frame: &mut Frame, area: Rect, keys: &CfgDefaultKeymaps, scroll_offset: u16) {
        let help_content: Vec<Line> = Self::lines(keys).into_iter().map(Line::from).collect();

        let max_width = help_content.iter().map(|l| l.width()).max().unwrap_or(0) as u16;
        let width = (max_width + 4).min(area.width);
        let height = (help_content.len() as u16 + 2).min(area.height);
        let popup_area = super::centered_fixed_area(area, width, height);

        frame.render_widget(Clear, popup_area);

        let help_paragraph = Paragraph::new(help_content)
            .block(Block::default().title("Help").borders(Borders::ALL))
            .scroll((scroll_offset, 0));

        frame.render_widget(help_paragraph, popup_area);
    }
}
