use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};
use crate::app::{App, Focus};
use crate::message::Sender;
use crate::theme::{Palette, Theme};
use crate::transcript::{LineKind, TranscriptLine, TYPING_DOTS};

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();
    let palette = app.palette();

    frame.render_widget(
        Block::default().style(Style::default().bg(palette.background).fg(palette.text)),
        area,
    );

    // Main layout: header, transcript, input, footer
    let [header_area, transcript_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area, &palette);
    render_transcript(app, frame, transcript_area, &palette);
    render_input(app, frame, input_area, &palette);
    render_footer(app, frame, footer_area, &palette);
}

fn render_header(app: &mut App, frame: &mut Frame, area: Rect, palette: &Palette) {
    let header_style = Style::default().bg(palette.header_bg).fg(palette.header_fg);
    frame.render_widget(Block::default().style(header_style), area);

    let title = Line::from(vec![
        Span::styled(" Chat Assistant ", header_style.bold()),
        Span::styled(format!("v{}", env!("CARGO_PKG_VERSION")), header_style),
    ]);
    frame.render_widget(Paragraph::new(title), area);

    app.theme_button_areas.clear();
    if !app.show_theme_selector {
        return;
    }

    // Theme buttons, right aligned
    let labels: Vec<(Theme, String)> = app
        .themes
        .buttons()
        .iter()
        .map(|button| (button.theme, format!(" {} ", button.theme.display_name())))
        .collect();
    let total_width: u16 = labels
        .iter()
        .map(|(_, label)| label.width() as u16 + 1)
        .sum();

    let mut x = area.right().saturating_sub(total_width);
    let mut spans = Vec::new();
    for (i, (theme, label)) in labels.into_iter().enumerate() {
        let width = label.width() as u16;
        let active = app.themes.active() == theme;
        let under_cursor = app.focus == Focus::Themes && app.theme_cursor == i;

        let mut style = if active {
            Style::default().bg(palette.accent).fg(palette.background).add_modifier(Modifier::BOLD)
        } else {
            header_style
        };
        if under_cursor {
            style = style.add_modifier(Modifier::UNDERLINED | Modifier::REVERSED);
        }

        let button_area = Rect::new(x, area.y, width, 1).intersection(area);
        app.theme_button_areas.push((button_area, theme));
        spans.push(Span::styled(label, style));
        spans.push(Span::styled(" ", header_style));
        x = x.saturating_add(width + 1);
    }

    let buttons_area = Rect::new(
        area.right().saturating_sub(total_width),
        area.y,
        total_width.min(area.width),
        1,
    );
    frame.render_widget(Paragraph::new(Line::from(spans)), buttons_area);
}

fn render_transcript(app: &mut App, frame: &mut Frame, area: Rect, palette: &Palette) {
    app.transcript_area = Some(area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.border))
        .title(" Conversation ");
    let inner = block.inner(area);

    let animation_frame = app.animation_frame;
    app.transcript_mut().set_viewport(inner.width, inner.height);
    let transcript = app.transcript();

    let text = if transcript.is_empty() {
        Text::from(Span::styled(
            "Say hello to get started...",
            Style::default().fg(palette.muted),
        ))
    } else {
        let lines: Vec<Line> = transcript
            .layout(inner.width)
            .iter()
            .map(|line| styled_line(line, palette, animation_frame))
            .collect();
        Text::from(lines)
    };

    let scroll = transcript.scroll();
    let content_height = transcript.content_height();
    let max_scroll = transcript.max_scroll();

    // Rows are pre-wrapped, so no Wrap here
    let paragraph = Paragraph::new(text).block(block).scroll((scroll, 0));
    frame.render_widget(paragraph, area);

    if max_scroll > 0 {
        let mut state = ScrollbarState::new(content_height as usize)
            .viewport_content_length(inner.height as usize)
            .position(scroll as usize);
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight),
            area,
            &mut state,
        );
    }
}

fn styled_line(line: &TranscriptLine, palette: &Palette, animation_frame: u8) -> Line<'static> {
    let sender_color = |sender: Sender| match sender {
        Sender::User => palette.user,
        Sender::Bot => palette.bot,
    };

    match line.kind {
        LineKind::Label(sender) => Line::from(Span::styled(
            line.text.clone(),
            Style::default().fg(sender_color(sender)).add_modifier(Modifier::BOLD),
        )),
        // Plain text only; message content is never parsed for markup
        LineKind::Body(_) => Line::from(Span::styled(line.text.clone(), Style::default().fg(palette.text))),
        LineKind::Typing => {
            let spans: Vec<Span> = (0..TYPING_DOTS)
                .map(|i| {
                    let style = if i == animation_frame as usize {
                        Style::default().fg(palette.accent).add_modifier(Modifier::BOLD)
                    } else {
                        Style::default().fg(palette.muted)
                    };
                    Span::styled(if i + 1 < TYPING_DOTS { "• " } else { "•" }, style)
                })
                .collect();
            Line::from(spans)
        }
        LineKind::Spacer => Line::default(),
    }
}

fn render_input(app: &App, frame: &mut Frame, area: Rect, palette: &Palette) {
    let input = app.conversation.input();
    let editing = app.focus == Focus::Input;

    let title = if app.conversation.is_awaiting() {
        " Message (waiting for reply) "
    } else {
        " Message "
    };
    let border_color = if editing { palette.accent } else { palette.border };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Horizontal scrolling by display width keeps the cursor inside the box
    let inner_width = area.width.saturating_sub(2) as usize;
    let (visible_text, cursor_x) = input_window(input.text(), input.cursor(), inner_width);

    let paragraph = Paragraph::new(visible_text)
        .style(Style::default().fg(palette.text))
        .block(block);
    frame.render_widget(paragraph, area);

    if editing && inner_width > 0 {
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

/// The part of `text` that fits in `width` columns with the cursor visible,
/// and the cursor's column within that part. One column is kept free for the
/// cursor cell.
fn input_window(text: &str, cursor: usize, width: usize) -> (String, u16) {
    if width == 0 {
        return (String::new(), 0);
    }

    let chars: Vec<char> = text.chars().collect();
    let cursor = cursor.min(chars.len());

    let mut start = cursor;
    let mut used = 1;
    while start > 0 {
        let char_width = chars[start - 1].width().unwrap_or(0);
        if used + char_width > width {
            break;
        }
        used += char_width;
        start -= 1;
    }

    let mut visible = String::new();
    let mut columns = 0;
    for &c in &chars[start..] {
        let char_width = c.width().unwrap_or(0);
        if columns + char_width > width {
            break;
        }
        visible.push(c);
        columns += char_width;
    }

    (visible, (used - 1) as u16)
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect, palette: &Palette) {
    let key_style = Style::default().bg(palette.accent).fg(palette.background);
    let label_style = Style::default().bg(palette.background).fg(palette.text);

    let mut hints = match app.focus {
        Focus::Input => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" PgUp/PgDn ", key_style),
            Span::styled(" scroll ", label_style),
        ],
        Focus::Themes => vec![
            Span::styled(" ←/→ ", key_style),
            Span::styled(" move ", label_style),
            Span::styled(" Enter ", key_style),
            Span::styled(" apply ", label_style),
            Span::styled(" 1-4 ", key_style),
            Span::styled(" pick ", label_style),
        ],
    };

    if app.show_theme_selector {
        hints.push(Span::styled(" Tab ", key_style));
        hints.push(Span::styled(" themes ", label_style));
    }

    let esc_label = if app.conversation.is_awaiting() && app.focus == Focus::Input {
        " cancel "
    } else if app.focus == Focus::Themes {
        " back "
    } else {
        " quit "
    };
    hints.push(Span::styled(" Esc ", key_style));
    hints.push(Span::styled(esc_label, label_style));

    frame.render_widget(Paragraph::new(Line::from(hints)), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::test_app;
    use crate::config::Settings;
    use crate::transcript::TranscriptSink;
    use ratatui::{backend::TestBackend, buffer::Buffer, Terminal};

    fn buffer_text(buffer: &Buffer) -> String {
        let area = buffer.area;
        let mut text = String::new();
        for y in area.top()..area.bottom() {
            for x in area.left()..area.right() {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    #[test]
    fn test_render_shows_messages_and_theme_buttons() {
        let (mut app, _rx) = test_app(&Settings::default());
        app.transcript_mut().append_message("Hello", Sender::User);
        app.transcript_mut()
            .append_message("Hello there! How can I assist you today?", Sender::Bot);

        let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();

        let text = buffer_text(terminal.backend().buffer());
        assert!(text.contains("You:"));
        assert!(text.contains("Hello there! How can I assist you today?"));
        assert!(text.contains("High Contrast"));
        assert_eq!(app.theme_button_areas.len(), Theme::all().len());
    }

    #[test]
    fn test_newest_message_visible_in_small_viewport() {
        let (mut app, _rx) = test_app(&Settings::default());
        for i in 0..30 {
            app.transcript_mut().append_message(&format!("message number {}", i), Sender::User);
        }

        let mut terminal = Terminal::new(TestBackend::new(60, 12)).unwrap();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();

        let text = buffer_text(terminal.backend().buffer());
        assert!(text.contains("message number 29"));
        assert!(!text.contains("message number 0 "));
    }

    #[test]
    fn test_theme_buttons_hidden_when_disabled() {
        let settings = Settings {
            show_theme_selector: false,
            ..Settings::default()
        };
        let (mut app, _rx) = test_app(&settings);

        let mut terminal = Terminal::new(TestBackend::new(100, 10)).unwrap();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();

        let text = buffer_text(terminal.backend().buffer());
        assert!(!text.contains("High Contrast"));
        assert!(app.theme_button_areas.is_empty());
    }

    #[test]
    fn test_input_window_ascii_fits() {
        assert_eq!(input_window("hello", 5, 18), ("hello".to_string(), 5));
        assert_eq!(input_window("hello", 2, 18), ("hello".to_string(), 2));
    }

    #[test]
    fn test_input_window_scrolls_by_display_width() {
        let text = "日".repeat(40);
        let (visible, cursor_x) = input_window(&text, 40, 18);
        assert!(visible.width() <= 18);
        assert!(cursor_x < 18);
        assert_eq!(visible, "日".repeat(8));
        assert_eq!(cursor_x, 16);

        let (visible, cursor_x) = input_window(&text, 0, 18);
        assert_eq!(visible, "日".repeat(9));
        assert_eq!(cursor_x, 0);
    }

    #[test]
    fn test_wide_input_cursor_stays_in_box() {
        let (mut app, _rx) = test_app(&Settings::default());
        app.conversation.input_mut().set_text(&"日".repeat(40));

        let mut terminal = Terminal::new(TestBackend::new(20, 10)).unwrap();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();

        // Input box spans columns 0..20 on rows 5..8; its inner area is x 1..=18
        let cursor = terminal.get_cursor_position().unwrap();
        assert!(cursor.x >= 1 && cursor.x <= 18, "cursor at {:?}", cursor);
        assert_eq!(cursor.y, 6);

        let buffer = terminal.backend().buffer();
        let row: String = (0..20).map(|x| buffer[(x, 6)].symbol().to_string()).collect();
        assert!(row.starts_with('│'));
        assert!(row.ends_with('│'));
    }

    #[test]
    fn test_typing_dots_highlight_follows_frame() {
        let palette = Theme::Dark.palette();
        let line = TranscriptLine {
            kind: LineKind::Typing,
            text: String::new(),
        };
        let rendered = styled_line(&line, &palette, 1);
        assert_eq!(rendered.spans.len(), TYPING_DOTS);
        assert_eq!(rendered.spans[1].style.fg, Some(palette.accent));
        assert_eq!(rendered.spans[0].style.fg, Some(palette.muted));
    }
}
