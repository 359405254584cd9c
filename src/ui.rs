use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use crate::app::{App, BackendStatus};
use crate::message::{MessageKind, Role};

pub fn render(app: &mut App, frame: &mut Frame) {
    let [chat_area, input_area] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(3)]).areas(frame.area());

    // Inner dimensions (minus borders) feed the scroll calculations.
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    let status = match app.backend_status {
        BackendStatus::Checking => "连接中…",
        BackendStatus::Online => "已连接",
        BackendStatus::Offline => "后端不可用",
    };
    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(" 银行智能客服助手 [{}] ", status));

    let chat = Paragraph::new(Text::from(chat_lines(app)))
        .block(chat_block)
        .wrap(Wrap { trim: false })
        .scroll((app.scroll, 0));
    frame.render_widget(chat, chat_area);

    // Input box: dimmed while a turn is in flight (submissions are ignored).
    let input_border_color = if app.turn_in_flight() {
        Color::DarkGray
    } else {
        Color::Yellow
    };
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(input_border_color))
        .title(" 提问 (Enter 发送, Ctrl-C 退出) ");

    let inner_width = input_area.width.saturating_sub(2) as usize;
    let (scroll_offset, cursor_x) = input_viewport(app.input_cursor, inner_width);

    let input = if app.input.is_empty() {
        Paragraph::new("请输入您的问题...")
            .style(Style::default().fg(Color::DarkGray))
            .block(input_block)
    } else {
        let visible_text: String = app
            .input
            .chars()
            .skip(scroll_offset)
            .take(inner_width)
            .collect();
        Paragraph::new(visible_text)
            .style(Style::default().fg(Color::White))
            .block(input_block)
    };
    frame.render_widget(input, input_area);

    frame.set_cursor_position((input_area.x + cursor_x + 1, input_area.y + 1));
}

/// Horizontal scroll offset and cursor column for the input line. The column
/// stays inside the inner area even when the terminal is degenerately narrow.
fn input_viewport(cursor_pos: usize, inner_width: usize) -> (usize, u16) {
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let cursor_x = cursor_pos
        .saturating_sub(scroll_offset)
        .min(inner_width.saturating_sub(1)) as u16;

    (scroll_offset, cursor_x)
}

/// One label line, the message body, and a trailing blank per message.
/// `App::total_chat_lines` must stay in sync with this layout.
fn chat_lines(app: &App) -> Vec<Line<'static>> {
    let mut lines: Vec<Line> = Vec::new();

    for msg in app.store.list() {
        match msg.role {
            Role::Incoming => {
                lines.push(Line::from(Span::styled(
                    format!("{} 客服", msg.avatar.glyph()),
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )));
            }
            Role::Outgoing => {
                lines.push(
                    Line::from(Span::styled(
                        format!("您 {}", msg.avatar.glyph()),
                        Style::default()
                            .fg(Color::Yellow)
                            .add_modifier(Modifier::BOLD),
                    ))
                    .alignment(Alignment::Right),
                );
            }
        }

        match &msg.kind {
            MessageKind::Text(content) => {
                for line in content.lines() {
                    let rendered = Line::from(line.to_string());
                    match msg.role {
                        Role::Incoming => lines.push(rendered),
                        Role::Outgoing => lines.push(rendered.alignment(Alignment::Right)),
                    }
                }
            }
            MessageKind::Typing => {
                lines.push(typing_dots(app.animation_frame));
            }
        }
        lines.push(Line::default());
    }

    lines
}

/// Three-dot indicator; the active dot cycles with the tick counter.
fn typing_dots(frame: u8) -> Line<'static> {
    let spans: Vec<Span> = (0u8..3)
        .map(|i| {
            let style = if i == frame % 3 {
                Style::default().fg(Color::White)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            Span::styled("● ", style)
        })
        .collect();
    Line::from(spans)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_stays_inside_the_input_area() {
        // Cursor past the visible width scrolls and pins to the last column.
        let (offset, x) = input_viewport(12, 10);
        assert_eq!(offset, 3);
        assert_eq!(x, 9);

        // Short input, no scrolling.
        let (offset, x) = input_viewport(4, 10);
        assert_eq!(offset, 0);
        assert_eq!(x, 4);
    }

    #[test]
    fn zero_width_input_area_clamps_the_cursor() {
        let (offset, x) = input_viewport(7, 0);
        assert_eq!(offset, 0);
        assert_eq!(x, 0);
    }
}
