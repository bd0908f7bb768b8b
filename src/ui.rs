use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::payout::payout_total;
use crate::timer::Currency;
use crate::{App, AppState};

const HISTORY_PANE_WIDTH: u16 = 32;

pub fn ui(app: &mut App, f: &mut Frame) {
    let area = f.area();

    let (history_area, main_area) = if app.show_history {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(HISTORY_PANE_WIDTH), Constraint::Min(0)])
            .split(area);
        (Some(chunks[0]), chunks[1])
    } else {
        (None, area)
    };

    if let Some(history) = history_area {
        render_history(app, f, history);
    }

    match app.state {
        AppState::RateInput => render_rate_input(app, f, main_area),
        AppState::Stopwatch => render_stopwatch(app, f, main_area),
    }
}

fn render_stopwatch(app: &mut App, f: &mut Frame, area: Rect) {
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let green_bold_style = Style::default().patch(bold_style).fg(Color::Green);
    let dim_bold_style = Style::default()
        .patch(bold_style)
        .add_modifier(Modifier::DIM);
    let italic_style = Style::default()
        .fg(Color::Gray)
        .add_modifier(Modifier::ITALIC);
    let caption_style = Style::default().fg(Color::DarkGray);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(2)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(1), // earnings
            Constraint::Length(1),
            Constraint::Length(1), // time
            Constraint::Length(2),
            Constraint::Length(1), // controls
            Constraint::Min(0),
            Constraint::Length(2), // rate footer
        ])
        .split(area);

    let earnings = Paragraph::new(Span::styled(app.timer.display_earnings(), green_bold_style))
        .alignment(Alignment::Center);
    f.render_widget(earnings, chunks[1]);

    let time = Paragraph::new(Span::styled(app.timer.display_time(), dim_bold_style))
        .alignment(Alignment::Center);
    f.render_widget(time, chunks[3]);

    let mut controls: Vec<&str> = vec![
        if app.timer.is_running() {
            "(space) pause"
        } else {
            "(space) start"
        },
        "(r)eset",
        "(p)ayout",
        "(h)istory",
        "(c)urrency",
    ];
    if !app.timer.is_running() {
        controls.push("($) rate");
    }
    controls.push("(q)uit");

    let hint = Paragraph::new(Span::styled(controls.join("  "), italic_style))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    f.render_widget(hint, chunks[5]);

    let mut footer_lines = vec![Line::from(Span::styled(
        format!(
            "Current rate: {}{:.2}/hour",
            app.timer.currency().symbol(),
            app.timer.hourly_rate()
        ),
        caption_style,
    ))];
    if app.timer.currency() == Currency::Cad {
        footer_lines.push(Line::from(Span::styled(
            format!("Exchange rate: 1 USD = {:.4} CAD", app.timer.exchange_rate()),
            caption_style,
        )));
    }

    let footer = Paragraph::new(footer_lines).alignment(Alignment::Center);
    f.render_widget(footer, chunks[7]);
}

fn render_history(app: &mut App, f: &mut Frame, area: Rect) {
    let green_bold_style = Style::default().fg(Color::Green).add_modifier(Modifier::BOLD);
    let caption_style = Style::default().fg(Color::DarkGray);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    // All-time total, always USD
    let total = Paragraph::new(Span::styled(
        format!("USD${:.2}", payout_total(&app.payouts)),
        green_bold_style,
    ))
    .block(Block::default().borders(Borders::ALL).title("Total Earnings"));
    f.render_widget(total, chunks[0]);

    let history_block = Block::default().borders(Borders::ALL).title("Payouts");

    if app.payouts.is_empty() {
        let empty = Paragraph::new(Span::styled("No payouts yet", caption_style))
            .block(history_block)
            .alignment(Alignment::Center);
        f.render_widget(empty, chunks[1]);
        return;
    }

    let items: Vec<ListItem> = app
        .payouts
        .iter()
        .map(|payout| {
            ListItem::new(vec![
                Line::from(Span::styled(
                    format!("+USD${:.2}", payout.amount),
                    green_bold_style,
                )),
                Line::from(Span::styled(payout.formatted_date(), caption_style)),
            ])
        })
        .collect();

    let list = List::new(items)
        .block(history_block)
        .highlight_style(Style::default().bg(Color::DarkGray));

    let mut state = ListState::default();
    state.select(Some(app.selected_payout.min(app.payouts.len() - 1)));
    f.render_stateful_widget(list, chunks[1], &mut state);
}

fn render_rate_input(app: &mut App, f: &mut Frame, area: Rect) {
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let italic_style = Style::default()
        .fg(Color::Gray)
        .add_modifier(Modifier::ITALIC);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(2)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(1), // title
            Constraint::Length(1),
            Constraint::Length(1), // input
            Constraint::Length(2),
            Constraint::Length(1), // hint
            Constraint::Min(0),
        ])
        .split(area);

    let title = Paragraph::new(Span::styled("Set Hourly Pay Rate", bold_style))
        .alignment(Alignment::Center);
    f.render_widget(title, chunks[1]);

    let input = Paragraph::new(Span::styled(
        format!(
            "{}{}_/hour",
            app.timer.currency().symbol(),
            app.rate_input
        ),
        bold_style,
    ))
    .alignment(Alignment::Center);
    f.render_widget(input, chunks[3]);

    let hint = Paragraph::new(Span::styled("(enter) save  (esc) cancel", italic_style))
        .alignment(Alignment::Center);
    f.render_widget(hint, chunks[5]);
}
