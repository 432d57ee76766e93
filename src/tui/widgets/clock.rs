//! Clock widget.
//!
//! Time and date, centered in the given area.

use chrono::{DateTime, Local};
use ratatui::{prelude::*, widgets::Paragraph};

/// A widget showing the time above the date.
#[derive(Debug)]
pub struct Clock {
    now: DateTime<Local>,
    time_style: Style,
    date_style: Style,
}

impl Clock {
    pub fn new(now: DateTime<Local>) -> Self {
        Self {
            now,
            time_style: Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
            date_style: Style::default().fg(Color::Gray),
        }
    }

    pub fn time_style(mut self, style: Style) -> Self {
        self.time_style = style;
        self
    }

    pub fn date_style(mut self, style: Style) -> Self {
        self.date_style = style;
        self
    }
}

impl Widget for Clock {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let lines = vec![
            Line::from(Span::styled(
                self.now.format("%H:%M").to_string(),
                self.time_style,
            )),
            Line::from(Span::styled(
                self.now.format("%A, %B %-d").to_string(),
                self.date_style,
            )),
        ];

        let top = area.height.saturating_sub(2) / 2;
        let clock_area = Rect::new(area.x, area.y + top, area.width, area.height.min(2));
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .render(clock_area, buf);
    }
}
