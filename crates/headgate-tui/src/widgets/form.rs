//! Form building blocks: centered panels, labeled text inputs, and
//! checkbox-style toggles.
//!
//! The sign-in, register, and mapping screens all share this look:
//! a dark panel with rounded borders, one 4-row block per text field
//! (label line + 3-row input box), and single-row toggles.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Clear, Paragraph};

use crate::theme;

/// Height of one labeled text input (label + bordered box).
pub const INPUT_ROWS: u16 = 4;

/// Clears and frames a centered panel, returning the inner area to
/// draw into. Width and height are clamped to the terminal.
pub fn render_centered_panel(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    width: u16,
    height: u16,
) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let panel = Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    };

    frame.render_widget(Clear, panel);
    frame.render_widget(
        Block::default().style(Style::default().bg(theme::BG_DARK)),
        panel,
    );

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(theme::border_focused())
        .title(Line::from(Span::styled(format!(" {title} "), theme::title_style())).centered());
    let inner = block.inner(panel);
    frame.render_widget(block, panel);
    inner
}

/// Renders a labeled single-line text input. The active field gets a
/// purple border, cyan label, and a block cursor; `masked` replaces
/// each character with a dot for secrets.
pub fn render_input_field(
    frame: &mut Frame,
    area: Rect,
    label: &str,
    value: &str,
    masked: bool,
    active: bool,
) {
    if area.height < INPUT_ROWS {
        return;
    }

    let label_style = if active {
        theme::field_label_active()
    } else {
        theme::field_label()
    };
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(label.to_owned(), label_style))),
        Rect { height: 1, ..area },
    );

    let box_area = Rect {
        y: area.y + 1,
        height: 3,
        ..area
    };
    let border_style = if active {
        theme::border_focused()
    } else {
        theme::border_default()
    };
    let display = if masked {
        "\u{25CF}".repeat(value.chars().count())
    } else {
        value.to_owned()
    };
    let text = if active {
        format!("{display}\u{2588}")
    } else {
        display
    };
    frame.render_widget(
        Paragraph::new(text).block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(border_style),
        ),
        box_area,
    );
}

/// Renders a one-row `[✓] label` toggle.
pub fn render_toggle_field(frame: &mut Frame, area: Rect, label: &str, value: bool, active: bool) {
    if area.height < 1 {
        return;
    }

    let marker = if value { "[\u{2713}]" } else { "[ ]" };
    let marker_style = if active {
        Style::default().fg(theme::ELECTRIC_PURPLE)
    } else if value {
        Style::default().fg(theme::SUCCESS_GREEN)
    } else {
        Style::default().fg(theme::BORDER_GRAY)
    };
    let label_style = if active {
        Style::default().fg(theme::NEON_CYAN)
    } else {
        Style::default().fg(theme::DIM_WHITE)
    };

    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(format!("{marker} "), marker_style),
            Span::styled(label.to_owned(), label_style),
        ])),
        area,
    );
}

/// Renders a `key action  key action` hint line, keys in cyan.
pub fn render_key_hints(frame: &mut Frame, area: Rect, hints: &[(&str, &str)]) {
    let mut spans = Vec::with_capacity(hints.len() * 3);
    for (i, (key, action)) in hints.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled("  ", theme::key_hint()));
        }
        spans.push(Span::styled((*key).to_owned(), theme::key_hint_key()));
        spans.push(Span::styled(format!(" {action}"), theme::key_hint()));
    }
    frame.render_widget(Paragraph::new(Line::from(spans).centered()), area);
}
