use crate::app::{App, Panel};
use crate::calendar::{BUCKETS, describe_next_bucket, format_et, now_eastern};
use crate::config;
use crate::features::Feature;
use crate::insights::{self, progress};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Gauge, Paragraph, Row, Table, TableState, Wrap},
};

const UP: Color = Color::Rgb(0x22, 0xC5, 0x5E);
const DOWN: Color = Color::Rgb(0xF8, 0x71, 0x71);
const FLAT: Color = Color::Rgb(0x94, 0xA3, 0xB8);
const HIGHLIGHT: Color = Color::Rgb(0x25, 0x63, 0xEB);

fn pct_color(pct: Option<f64>) -> Color {
    match pct {
        Some(p) if p > 0.0 => UP,
        Some(p) if p < 0.0 => DOWN,
        _ => FLAT,
    }
}

pub fn render(f: &mut Frame, app: &App) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(2),
        ])
        .split(f.area());

    render_header(f, app, layout[0]);

    match app.panel {
        Panel::Grid => render_dashboard(f, app, layout[1]),
        Panel::Features => render_features(f, app, layout[1]),
        Panel::Replay => render_replay(f, app, layout[1]),
    }

    render_footer(f, app, layout[2]);
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let session = app.tracker.engine.session();
    let spans = vec![
        Span::styled(
            format!(" {} ", config::APP_NAME),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::styled(
            session.date().format("%a %b %d, %Y").to_string(),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::styled(format_et(&now_eastern()), Style::default().fg(Color::Yellow)),
        Span::raw(" | "),
        Span::styled(app.tracker.status.as_str(), Style::default().fg(Color::Gray)),
    ];

    let header = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    f.render_widget(header, area);
}

fn render_footer(f: &mut Frame, app: &App, area: Rect) {
    let hint = match app.panel {
        Panel::Grid => {
            "r: refresh | p: pct | a: arrows | f: features | v: replay | +/-: chime | x: dismiss \
             | q: quit"
        }
        Panel::Features => "Up/Down: select | Space: toggle | Esc: back",
        Panel::Replay => "Left/Right: bucket | Esc: back",
    };

    let footer = Paragraph::new(Line::from(vec![
        Span::styled(" Controls: ", Style::default().fg(Color::Gray)),
        Span::styled(hint, Style::default().fg(Color::White)),
    ]));
    f.render_widget(footer, area);
}

fn render_dashboard(f: &mut Frame, app: &App, area: Rect) {
    let flags = &app.tracker.flags;
    let show_pulse = flags.enabled(Feature::MiniDashboard)
        || flags.enabled(Feature::Concentration)
        || flags.enabled(Feature::Confidence);

    let mut constraints = Vec::new();
    if app.tracker.warning.is_some() {
        constraints.push(Constraint::Length(3));
    }
    if show_pulse {
        constraints.push(Constraint::Length(3));
    }
    constraints.push(Constraint::Min(0));

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);
    let mut next = 0;

    if let Some(warning) = &app.tracker.warning {
        let block = Paragraph::new(warning.as_str())
            .style(Style::default().fg(Color::Red))
            .block(Block::default().borders(Borders::ALL).title(" Warning (x to dismiss) "));
        f.render_widget(block, rows[next]);
        next += 1;
    }
    if show_pulse {
        render_pulse(f, app, rows[next]);
        next += 1;
    }

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(75), Constraint::Percentage(25)])
        .split(rows[next]);

    render_grid(f, app, body[0]);
    render_rail(f, app, body[1]);
}

fn render_pulse(f: &mut Frame, app: &App, area: Rect) {
    let flags = &app.tracker.flags;
    let pulse = &app.tracker.pulse;
    let mut spans = Vec::new();

    if flags.enabled(Feature::MiniDashboard) {
        let mood_color = match pulse.mood {
            insights::Mood::Bullish => UP,
            insights::Mood::Bearish => DOWN,
            insights::Mood::Balanced => Color::Yellow,
            insights::Mood::Calm => Color::White,
        };
        spans.push(Span::styled(
            format!("Mood: {} ", pulse.mood.label()),
            Style::default().fg(mood_color).add_modifier(Modifier::BOLD),
        ));
        let breadth = &pulse.breadth;
        spans.push(Span::styled(format!("Adv {} ", breadth.advancers), Style::default().fg(UP)));
        spans.push(Span::styled(format!("Dec {} ", breadth.decliners), Style::default().fg(DOWN)));
        spans.push(Span::styled(format!("Flat {} ", breadth.flat), Style::default().fg(FLAT)));
        let top = match &pulse.top {
            Some(t) => Span::styled(
                format!("| Top {} {:+.2}% ", t.ticker, t.pct),
                Style::default().fg(pct_color(Some(t.pct))),
            ),
            None => Span::raw("| Top -- "),
        };
        spans.push(top);
    }
    if flags.enabled(Feature::Concentration) {
        let text = match pulse.concentration {
            Some(c) => format!("| Top 5 share: {:.1}% ", c),
            None => "| Top 5 share: -- ".to_string(),
        };
        spans.push(Span::raw(text));
    }
    if flags.enabled(Feature::Confidence) {
        let trail: String = app
            .tracker
            .confidence_trail()
            .iter()
            .map(|(_, ratio)| format!("{:.0}%", ratio * 100.0))
            .collect::<Vec<_>>()
            .join(" > ");
        let trail = if trail.is_empty() { "--".to_string() } else { trail };
        spans.push(Span::styled(
            format!("| Confidence {}", trail),
            Style::default().fg(Color::Cyan),
        ));
    }

    let label = pulse.bucket.map(|b| BUCKETS[b].label).unwrap_or("--");
    let block = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).title(format!(" Dow Pulse @ {} ", label)));
    f.render_widget(block, area);
}

fn render_grid(f: &mut Frame, app: &App, area: Rect) {
    let engine = &app.tracker.engine;
    let ghosts = app.tracker.flags.enabled(Feature::CandleGhosts);

    let mut header_cells = vec![Cell::from("Ticker")];
    header_cells.extend(BUCKETS.iter().map(|b| Cell::from(b.label)));
    let header = Row::new(header_cells)
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = engine
        .grid()
        .into_iter()
        .map(|row| {
            let mut label_style = Style::default().add_modifier(Modifier::BOLD);
            if config::is_highlighted(&row.ticker) {
                label_style = label_style.fg(HIGHLIGHT);
            }
            let last_close = engine.last_close(&row.ticker);
            let mut cells = vec![Cell::from(row.label.clone()).style(label_style)];
            cells.extend(row.cells.iter().map(|cell| {
                let mut style = Style::default().fg(pct_color(cell.pct));
                if ghosts {
                    if let (Some(price), Some(close)) = (cell.price, last_close) {
                        let bg = if price > close {
                            Color::Rgb(0x14, 0x3D, 0x24)
                        } else if price < close {
                            Color::Rgb(0x4A, 0x1D, 0x1D)
                        } else {
                            Color::Rgb(0x1F, 0x2A, 0x40)
                        };
                        style = style.bg(bg);
                    }
                }
                Cell::from(cell.text.clone()).style(style)
            }));
            Row::new(cells)
        })
        .collect();

    let mut widths = vec![Constraint::Length(9)];
    widths.extend(BUCKETS.iter().map(|_| Constraint::Min(8)));

    let table = Table::new(rows, widths)
        .header(header)
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .block(Block::default().borders(Borders::ALL).title(format!(
            " {} ",
            engine
                .workbook_path()
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        )));

    let mut state = TableState::default().with_selected(Some(app.selected));
    f.render_stateful_widget(table, area, &mut state);
}

fn render_rail(f: &mut Frame, app: &App, area: Rect) {
    let flags = &app.tracker.flags;
    let mut constraints = Vec::new();
    if flags.enabled(Feature::InsightRail) {
        constraints.push(Constraint::Length(3));
        constraints.push(Constraint::Length(7));
    }
    if flags.enabled(Feature::Sparkline) {
        constraints.push(Constraint::Length(5));
    }
    constraints.push(Constraint::Min(0));

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);
    let mut next = 0;

    if flags.enabled(Feature::InsightRail) {
        let (done, total) = progress(app.tracker.engine.session());
        let gauge = Gauge::default()
            .block(Block::default().title(" Captures ").borders(Borders::ALL))
            .gauge_style(Style::default().fg(Color::Cyan))
            .ratio(done as f64 / total as f64)
            .label(format!("{}/{}", done, total));
        f.render_widget(gauge, chunks[next]);
        next += 1;

        render_insights(f, app, chunks[next]);
        next += 1;
    }
    if flags.enabled(Feature::Sparkline) {
        render_sparkline(f, app, chunks[next]);
        next += 1;
    }
    render_notices(f, app, chunks[next]);
}

fn render_insights(f: &mut Frame, app: &App, area: Rect) {
    let engine = &app.tracker.engine;
    let session = engine.session();
    let last = match session.last_capture() {
        Some((bucket, at)) => format!("{} at {}", BUCKETS[bucket].label, format_et(&at)),
        None => "--".to_string(),
    };
    let folder_ok = engine.data_dir().is_dir();
    let mut lines = vec![
        Line::from(vec![
            Span::styled("Next: ", Style::default().fg(Color::Gray)),
            Span::raw(describe_next_bucket(&now_eastern())),
        ]),
        Line::from(vec![
            Span::styled("Last: ", Style::default().fg(Color::Gray)),
            Span::raw(last),
        ]),
        Line::from(vec![
            Span::styled("Folder: ", Style::default().fg(Color::Gray)),
            Span::styled(
                engine.data_dir().display().to_string(),
                Style::default().fg(if folder_ok { Color::White } else { DOWN }),
            ),
        ]),
    ];
    if let Some(ticker) = app.selected_ticker() {
        let bucket = session.latest_bucket_with_data().unwrap_or(0);
        let base = match engine.baseline(ticker, bucket) {
            Some(b) => format!("{:.2} ({})", b.price, b.source.describe()),
            None => "--".to_string(),
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{} base: ", ticker), Style::default().fg(Color::Gray)),
            Span::raw(base),
        ]));
    }
    if app.tracker.flags.enabled(Feature::MarketSounds) {
        lines.push(Line::from(Span::styled(
            format!("Chime at {:.2}%", app.tracker.settings.effective_sound_threshold()),
            Style::default().fg(Color::Gray),
        )));
    }

    let block = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(" Insights "));
    f.render_widget(block, area);
}

fn render_sparkline(f: &mut Frame, app: &App, area: Rect) {
    let (title, text) = match app.selected_ticker() {
        Some(ticker) => match app.tracker.engine.prices().cached_series(ticker) {
            Some(series) if !series.is_empty() => {
                let shown = series.len().min(64);
                (
                    format!(" {} {}m trail ", ticker, shown),
                    insights::sparkline_for_series(series),
                )
            }
            _ => (format!(" {} sparkline ", ticker), "No minute data yet today.".to_string()),
        },
        None => (" Sparkline ".to_string(), String::new()),
    };
    let block = Paragraph::new(text)
        .style(Style::default().fg(Color::Cyan))
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(block, area);
}

fn render_notices(f: &mut Frame, app: &App, area: Rect) {
    let lines: Vec<Line> = app
        .tracker
        .notices
        .iter()
        .flat_map(|n| {
            let mut out = vec![Line::from(Span::styled(
                n.title.clone(),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ))];
            out.extend(n.body.lines().map(|l| Line::from(l.to_string())));
            out
        })
        .collect();
    let block = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(" Notices "));
    f.render_widget(block, area);
}

fn render_features(f: &mut Frame, app: &App, area: Rect) {
    let rows: Vec<Row> = Feature::ALL
        .iter()
        .map(|feature| {
            let enabled = app.tracker.flags.enabled(*feature);
            let mark = if enabled { "[x]" } else { "[ ]" };
            Row::new(vec![
                Cell::from(mark).style(Style::default().fg(if enabled { UP } else { FLAT })),
                Cell::from(feature.key()),
                Cell::from(feature.description()),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [Constraint::Length(4), Constraint::Length(16), Constraint::Min(0)],
    )
    .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
    .block(Block::default().borders(Borders::ALL).title(" Features "));
    let mut state = TableState::default().with_selected(Some(app.feature_cursor));
    f.render_stateful_widget(table, area, &mut state);
}

fn render_replay(f: &mut Frame, app: &App, area: Rect) {
    let Some(replay) = &app.replay else {
        let text = Paragraph::new("No replay loaded.")
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(text, area);
        return;
    };
    let Some(bucket) = replay.buckets.get(app.replay_cursor) else {
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let title = match replay.date {
        Some(date) => format!(" Replay {} ", date.format("%b %d, %Y")),
        None => " Replay ".to_string(),
    };
    let summary = Paragraph::new(bucket.pulse.headline())
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(summary, chunks[0]);

    let rows: Vec<Row> = bucket
        .records
        .iter()
        .map(|r| {
            let color = pct_color(r.pct);
            Row::new(vec![
                Cell::from(r.ticker.clone()),
                Cell::from(
                    r.price.map(|p| format!("{:.2}", p)).unwrap_or_else(|| "--".to_string()),
                ),
                Cell::from(r.pct.map(|p| format!("{:+.2}%", p)).unwrap_or_else(|| "--".to_string()))
                    .style(Style::default().fg(color)),
            ])
        })
        .collect();
    let table = Table::new(
        rows,
        [Constraint::Length(8), Constraint::Length(12), Constraint::Length(10)],
    )
    .header(Row::new(vec!["Ticker", "Price", "Pct"]).style(Style::default().fg(Color::Cyan)))
    .block(Block::default().borders(Borders::ALL).title(format!(
        " {} ({}/{}) ",
        BUCKETS[bucket.bucket].label,
        app.replay_cursor + 1,
        replay.buckets.len()
    )));
    f.render_widget(table, chunks[1]);
}
