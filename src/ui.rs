use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph, Tabs, Wrap},
    Frame,
};

use crate::app::{App, ClickableRegions, InputMode};
use crate::indicators::IndicatorSeries;
use crate::state::{InsightResult, InsightView};

pub const PENDING_TEXT: &str = "Generating insight...";
pub const FAILURE_TEXT: &str = "Insight service unavailable, please try again.";
const EMPTY_INSIGHT_TEXT: &str = "Press / to ask the economist about the data.";

pub fn ui(f: &mut Frame, app: &mut App) {
    // Clear clickable regions before each render
    app.clickable_regions = ClickableRegions::default();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),  // Tabs
            Constraint::Length(3),  // Summary
            Constraint::Min(10),    // Chart
            Constraint::Length(8),  // Insight
            Constraint::Length(3),  // Query
            Constraint::Length(1),  // Footer
        ])
        .split(f.area());

    render_tabs(f, app, chunks[0]);
    render_summary(f, app, chunks[1]);
    render_chart(f, app, chunks[2]);
    render_insight(f, app, chunks[3]);
    render_query(f, app, chunks[4]);
    render_footer(f, app, chunks[5]);
}

fn render_tabs(f: &mut Frame, app: &mut App, area: Rect) {
    let selected = app.selected_index();

    let mut titles: Vec<Line> = Vec::new();
    let mut tab_widths: Vec<usize> = Vec::new();

    for (i, code) in app.store.codes().iter().enumerate() {
        let label = app
            .store
            .series_for(code)
            .map(|s| s.label.clone())
            .unwrap_or_else(|_| code.clone());
        let title = format!(" {}:{} ", i + 1, label);
        tab_widths.push(title.chars().count());
        if selected == Some(i) {
            titles.push(Line::from(title).cyan().bold());
        } else {
            titles.push(Line::from(title).dark_gray());
        }
    }

    // Tabs sit inside the border, separated by a one-column divider
    let mut current_x = area.x + 1;
    let tab_y = area.y + 1;
    for (i, width) in tab_widths.iter().enumerate() {
        let tab_rect = Rect::new(current_x, tab_y, *width as u16, 1);
        app.clickable_regions.indicator_tabs.push((tab_rect, i));
        current_x = current_x.saturating_add(*width as u16 + 1);
    }

    let tabs = Tabs::new(titles)
        .block(Block::default().borders(Borders::ALL).title(" Indicators "))
        .select(selected.unwrap_or(0))
        .padding("", "")
        .divider("|");

    f.render_widget(tabs, area);
}

fn render_summary(f: &mut Frame, app: &App, area: Rect) {
    let loaded = app.loaded_at.format("%Y-%m-%d %H:%M").to_string();

    let line = match app.selected_series() {
        Some(series) => {
            let latest = series
                .latest()
                .map(|(year, value)| format!("Latest ({}): {}", year, format_value(value)))
                .unwrap_or_else(|| "No observations".to_string());
            let change = series.change_over_range();
            let change_span = match change {
                Some(pct) => Span::styled(
                    format!("  |  Change over range: {:+.2}%", pct),
                    Style::default().fg(if pct >= 0.0 { Color::Green } else { Color::Red }),
                ),
                None => Span::raw(""),
            };
            Line::from(vec![
                Span::styled(format!("  {}", latest), Style::default().bold()),
                change_span,
                Span::styled(
                    format!("  |  {}  |  Loaded: {}", app.source_label, loaded),
                    Style::default().fg(Color::DarkGray),
                ),
            ])
        }
        None => Line::from(Span::styled(
            format!("  No data loaded for {}  |  {}", app.source_label, loaded),
            Style::default().fg(Color::DarkGray),
        )),
    };

    let title = app
        .snapshot
        .selection
        .as_deref()
        .map(|code| format!(" {} ", code))
        .unwrap_or_else(|| " Summary ".to_string());

    let paragraph = Paragraph::new(line).block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(paragraph, area);
}

/// Axis bounds with a little headroom so the line does not touch the frame.
pub fn chart_bounds(series: &IndicatorSeries) -> Option<([f64; 2], [f64; 2])> {
    let ((first_year, last_year), (min, max)) = series.bounds()?;
    let pad = if max > min { (max - min) * 0.05 } else { min.abs().max(1.0) * 0.05 };
    let x_max = if last_year > first_year { last_year as f64 } else { first_year as f64 + 1.0 };
    Some(([first_year as f64, x_max], [min - pad, max + pad]))
}

fn render_chart(f: &mut Frame, app: &App, area: Rect) {
    let Some(series) = app.selected_series().filter(|s| !s.is_empty()) else {
        let no_data = Paragraph::new("  No data available for this indicator")
            .block(Block::default().borders(Borders::ALL).title(" History "))
            .style(Style::default().fg(Color::DarkGray));
        f.render_widget(no_data, area);
        return;
    };

    let data: Vec<(f64, f64)> = series
        .points()
        .iter()
        .map(|&(year, value)| (year as f64, value))
        .collect();

    let Some((x_bounds, y_bounds)) = chart_bounds(series) else {
        return;
    };

    let datasets = vec![Dataset::default()
        .name(series.code.clone())
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Cyan))
        .data(&data)];

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", series.label)),
        )
        .x_axis(
            Axis::default()
                .title("Year")
                .style(Style::default().fg(Color::Gray))
                .bounds(x_bounds)
                .labels(vec![
                    Span::raw(format!("{:.0}", x_bounds[0])),
                    Span::raw(format!("{:.0}", x_bounds[1])),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("Value")
                .style(Style::default().fg(Color::Gray))
                .bounds(y_bounds)
                .labels(vec![
                    Span::raw(format_value(y_bounds[0])),
                    Span::raw(format_value(y_bounds[1])),
                ]),
        );

    f.render_widget(chart, area);
}

/// Text shown in the insight panel and its colour.
pub fn insight_text(insight: Option<&InsightView>) -> (String, Color) {
    match insight.map(|view| &view.result) {
        None => (EMPTY_INSIGHT_TEXT.to_string(), Color::DarkGray),
        Some(InsightResult::Pending) => (PENDING_TEXT.to_string(), Color::Yellow),
        Some(InsightResult::Success(text)) => (text.clone(), Color::White),
        Some(InsightResult::Failure(_)) => (FAILURE_TEXT.to_string(), Color::Red),
    }
}

fn render_insight(f: &mut Frame, app: &App, area: Rect) {
    let insight = app.snapshot.insight.as_ref();
    let (text, color) = insight_text(insight);

    let title = match insight {
        Some(view) => format!(
            " Insight #{} ({}): {} ",
            view.request_id,
            view.issued_at.format("%H:%M:%S"),
            truncate(view.prompt.trim(), 40)
        ),
        None => " Insight ".to_string(),
    };

    let paragraph = Paragraph::new(text)
        .style(Style::default().fg(color))
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(paragraph, area);
}

fn render_query(f: &mut Frame, app: &App, area: Rect) {
    let (line, border) = match &app.input_mode {
        InputMode::Query(text) => (
            Line::from(vec![
                Span::raw(" "),
                Span::styled(format!("{}█", text), Style::default().fg(Color::Yellow)),
            ]),
            Style::default().fg(Color::Yellow),
        ),
        InputMode::Normal => (
            Line::from(Span::styled(
                " Press / to type a question",
                Style::default().fg(Color::DarkGray),
            )),
            Style::default(),
        ),
    };

    let paragraph = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Ask ")
            .border_style(border),
    );
    f.render_widget(paragraph, area);
}

fn render_footer(f: &mut Frame, app: &mut App, area: Rect) {
    if let Some(status) = app.active_status() {
        let paragraph = Paragraph::new(Line::from(Span::styled(
            format!(" {} ", status),
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        )));
        f.render_widget(paragraph, area);
        return;
    }

    if matches!(app.input_mode, InputMode::Query(_)) {
        let paragraph = Paragraph::new(Span::styled(
            " Enter=Ask | Esc=Cancel | Backspace=Delete ",
            Style::default().fg(Color::Yellow),
        ));
        f.render_widget(paragraph, area);
        return;
    }

    let keys: [(&str, Option<&'static str>); 5] = [
        (" 1-9/←→=Indicator", None),
        ("/=Ask", Some("ask")),
        ("c=CSV", Some("csv")),
        ("p=PRN", Some("prn")),
        ("q=Quit ", Some("quit")),
    ];

    let mut spans = Vec::new();
    let mut x = area.x;
    for (i, (label, action)) in keys.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" | ", Style::default().fg(Color::Yellow)));
            x = x.saturating_add(3);
        }
        let width = label.chars().count() as u16;
        if let Some(action) = action {
            app.clickable_regions
                .footer_buttons
                .push((Rect::new(x, area.y, width, 1), *action));
        }
        spans.push(Span::styled(*label, Style::default().fg(Color::Yellow)));
        x = x.saturating_add(width);
    }

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Compact number formatting for large currency series.
pub fn format_value(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1e12 {
        format!("{:.2}T", value / 1e12)
    } else if abs >= 1e9 {
        format!("{:.2}B", value / 1e9)
    } else if abs >= 1e6 {
        format!("{:.2}M", value / 1e6)
    } else {
        format!("{:.2}", value)
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let head: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", head)
    }
}
