pub mod help;
pub mod library;
pub mod not_found;
pub mod tooltip;

use ratatui::layout::Rect;

/// A popup of fixed size centered in `area`, shrunk to fit.
pub fn centered_fixed_area(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width - width) / 2;
    let y = area.y + (area.height - height) / 2;

    Rect::new(x, y, width, height)
}
