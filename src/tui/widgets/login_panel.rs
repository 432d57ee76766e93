//! Login panel widget.
//!
//! A centered box with the user's name, the masked password field, the
//! feedback line and the selected session.

use ratatui::{
    prelude::*,
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
};

const PANEL_WIDTH: u16 = 48;
const PANEL_HEIGHT: u16 = 10;

/// The login box shown while the greeter is uncovered.
#[derive(Debug)]
pub struct LoginPanel<'a> {
    /// Name shown in the greeting
    user: &'a str,
    /// Number of characters typed so far
    input_len: usize,
    /// Echo character for the password
    mask: char,
    /// False while a password is being checked
    input_enabled: bool,
    feedback: &'a str,
    session: Option<&'a str>,
    /// Hotkey summary under the panel
    hint: &'a str,
    block: Option<Block<'a>>,
    feedback_style: Style,
}

impl<'a> LoginPanel<'a> {
    pub fn new(user: &'a str) -> Self {
        Self {
            user,
            input_len: 0,
            mask: '*',
            input_enabled: true,
            feedback: "",
            session: None,
            hint: "",
            block: None,
            feedback_style: Style::default().fg(Color::Yellow),
        }
    }

    /// Set the masked input state.
    pub fn input(mut self, len: usize, mask: char, enabled: bool) -> Self {
        self.input_len = len;
        self.mask = mask;
        self.input_enabled = enabled;
        self
    }

    pub fn feedback(mut self, text: &'a str) -> Self {
        self.feedback = text;
        self
    }

    pub fn session(mut self, name: Option<&'a str>) -> Self {
        self.session = name;
        self
    }

    pub fn hint(mut self, hint: &'a str) -> Self {
        self.hint = hint;
        self
    }

    /// Set the block for this widget.
    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }

    pub fn feedback_style(mut self, style: Style) -> Self {
        self.feedback_style = style;
        self
    }

    fn password_line(&self, width: u16) -> Line<'a> {
        let label = Span::styled("Password: ", Style::default().fg(Color::Gray));
        if !self.input_enabled {
            return Line::from(vec![
                label,
                Span::styled("checking…", Style::default().fg(Color::DarkGray)),
            ]);
        }

        let room = (width as usize).saturating_sub(12);
        let masked: String = std::iter::repeat(self.mask)
            .take(self.input_len.min(room))
            .collect();
        Line::from(vec![
            label,
            Span::styled(masked, Style::default().fg(Color::White)),
            Span::styled("▏", Style::default().fg(Color::Cyan)),
        ])
    }
}

impl Widget for LoginPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let popup_width = PANEL_WIDTH.min(area.width);
        let popup_height = PANEL_HEIGHT.min(area.height);
        let popup_area = Rect::new(
            area.x + area.width.saturating_sub(popup_width) / 2,
            area.y + area.height.saturating_sub(popup_height) / 2,
            popup_width,
            popup_height,
        );

        Clear.render(popup_area, buf);

        let block = self.block.clone().unwrap_or_else(|| {
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(Color::Cyan))
        });
        let inner = block.inner(popup_area);
        block.render(popup_area, buf);

        let session = self.session.unwrap_or("no sessions installed");
        let lines = vec![
            Line::from(vec![
                Span::raw("Welcome, "),
                Span::styled(self.user, Style::default().add_modifier(Modifier::BOLD)),
            ]),
            Line::from(""),
            self.password_line(inner.width),
            Line::from(""),
            Line::from(Span::styled(self.feedback, self.feedback_style)),
            Line::from(""),
            Line::from(vec![
                Span::styled("Session: ", Style::default().fg(Color::Gray)),
                Span::styled(session, Style::default().fg(Color::Cyan)),
            ]),
            Line::from(Span::styled(self.hint, Style::default().fg(Color::DarkGray))),
        ];

        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .render(inner, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(panel: LoginPanel<'_>) -> String {
        let area = Rect::new(0, 0, 80, 24);
        let mut buf = Buffer::empty(area);
        panel.render(area, &mut buf);
        buf.content().iter().map(|cell| cell.symbol()).collect()
    }

    #[test]
    fn test_login_panel_defaults() {
        let panel = LoginPanel::new("alice");
        assert_eq!(panel.user, "alice");
        assert_eq!(panel.mask, '*');
        assert!(panel.input_enabled);
        assert!(panel.block.is_none());
    }

    #[test]
    fn test_password_is_masked() {
        let text = render(
            LoginPanel::new("Alice Liddell")
                .input(6, '#', true)
                .session(Some("Sway")),
        );
        assert!(text.contains("Welcome, Alice Liddell"));
        assert!(text.contains("Password: ######"));
        assert!(text.contains("Session: Sway"));
    }

    #[test]
    fn test_disabled_input_shows_checking() {
        let text = render(LoginPanel::new("alice").input(4, '*', false));
        assert!(text.contains("checking"));
        assert!(!text.contains("****"));
    }

    #[test]
    fn test_feedback_and_empty_ring() {
        let text = render(LoginPanel::new("alice").feedback("Invalid Password"));
        assert!(text.contains("Invalid Password"));
        assert!(text.contains("no sessions installed"));
    }

    #[test]
    fn test_with_block_and_style() {
        let panel = LoginPanel::new("alice")
            .block(Block::default().title("Custom"))
            .feedback_style(Style::default().fg(Color::Red));
        assert!(panel.block.is_some());
        assert_eq!(panel.feedback_style.fg, Some(Color::Red));
    }

    #[test]
    fn test_render_small_area() {
        let area = Rect::new(0, 0, 10, 4);
        let mut buf = Buffer::empty(area);
        LoginPanel::new("alice")
            .input(30, '*', true)
            .render(area, &mut buf);
        // Should not panic
    }
}
