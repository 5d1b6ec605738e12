use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Tabs, Wrap},
    Frame, Terminal,
};
use spendboard_api::{ApiClient, RetryPolicy, UploadState};
use spendboard_core::format::{format_currency, format_date, format_signed, period_label};
use chrono::NaiveDate;
use spendboard_core::{
    today_in, Category, Granularity, RangePreset, Severity, Snapshot, SpendingSeries,
};
use std::io::{self, Stdout};
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

use crate::dashboard_state::{Action, DashboardState, Effect, Load, Screen};
use crate::fetch_worker::{self, WorkerEvent, WorkerRequest};

pub struct DashboardOptions {
    pub preset: RangePreset,
    pub view: Granularity,
    pub today: NaiveDate,
    pub timezone: String,
    pub currency_symbol: String,
}

/// Run the full-screen dashboard. Blocks until the user quits, so call it
/// off the async executor.
pub fn run_dashboard(
    rt: tokio::runtime::Handle,
    client: ApiClient,
    policy: RetryPolicy,
    opts: DashboardOptions,
) -> Result<()> {
    let (req_tx, req_rx) = tokio::sync::mpsc::unbounded_channel();
    let (ev_tx, ev_rx) = std::sync::mpsc::channel();
    rt.spawn(fetch_worker::run_worker(client, policy, req_rx, ev_tx));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = dashboard_loop(&mut terminal, &opts, &req_tx, &ev_rx);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

fn dispatch(tx: &UnboundedSender<WorkerRequest>, effects: Vec<Effect>) -> Result<()> {
    for effect in effects {
        let req = match effect {
            Effect::Fetch { request_id, range } => WorkerRequest::Fetch { request_id, range },
            Effect::Upload(files) => WorkerRequest::Upload { files },
        };
        tx.send(req).ok().context("fetch worker stopped")?;
    }
    Ok(())
}

impl From<WorkerEvent> for Action {
    fn from(ev: WorkerEvent) -> Self {
        match ev {
            WorkerEvent::Fetched { request_id, result } => {
                Action::FetchCompleted { request_id, result }
            }
            WorkerEvent::Uploaded(result) => Action::UploadCompleted(result),
        }
    }
}

fn dashboard_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    opts: &DashboardOptions,
    req_tx: &UnboundedSender<WorkerRequest>,
    ev_rx: &Receiver<WorkerEvent>,
) -> Result<()> {
    let mut state = DashboardState::new(opts.preset, opts.view, opts.today);
    dispatch(req_tx, state.start())?;

    loop {
        terminal.draw(|f| draw(f, &state, &opts.currency_symbol))?;

        while let Ok(ev) = ev_rx.try_recv() {
            let effects = state.reduce(ev.into(), Instant::now());
            dispatch(req_tx, effects)?;
        }

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    let today = match today_in(&opts.timezone) {
                        Ok(d) => d,
                        Err(e) => {
                            warn!("keeping {}: {e}", state.today);
                            state.today
                        }
                    };
                    if let Some(action) = key_action(&state, key, today) {
                        let effects = state.reduce(action, Instant::now());
                        dispatch(req_tx, effects)?;
                    }
                }
            }
        }

        let now = Instant::now();
        state.reduce(Action::Tick(now), now);
        if state.quit {
            break;
        }
    }

    Ok(())
}

/// Translate a key press for the current screen
pub fn key_action(state: &DashboardState, key: KeyEvent, today: NaiveDate) -> Option<Action> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(Action::Quit);
    }

    if state.error_modal().is_some() {
        return match key.code {
            KeyCode::Esc | KeyCode::Enter => Some(Action::Dismiss),
            _ => None,
        };
    }

    match state.screen {
        Screen::Dashboard => match key.code {
            KeyCode::Char('q') => Some(Action::Quit),
            KeyCode::Char('1') => Some(Action::SelectRange {
                preset: RangePreset::ThisMonth,
                today,
            }),
            KeyCode::Char('2') => Some(Action::SelectRange {
                preset: RangePreset::LastMonth,
                today,
            }),
            KeyCode::Char('3') => Some(Action::SelectRange {
                preset: RangePreset::Last3Months,
                today,
            }),
            KeyCode::Char('d') => Some(Action::SetView(Granularity::Daily)),
            KeyCode::Char('w') => Some(Action::SetView(Granularity::Weekly)),
            KeyCode::Char('m') => Some(Action::SetView(Granularity::Monthly)),
            KeyCode::Char('r') => Some(Action::Refetch),
            KeyCode::Char('u') => Some(Action::OpenUpload),
            _ => None,
        },
        Screen::Upload => match key.code {
            KeyCode::Esc => Some(Action::Back),
            KeyCode::Enter => Some(Action::Submit),
            KeyCode::Backspace => Some(Action::Backspace),
            KeyCode::Char(c) => Some(Action::Input(c)),
            _ => None,
        },
    }
}

fn category_color(c: Category) -> Color {
    match c {
        Category::Income => Color::Green,
        Category::FoodDining => Color::LightRed,
        Category::TransportMobility => Color::LightBlue,
        Category::BillsUtilities => Color::Yellow,
        Category::ShoppingEntertainment => Color::Magenta,
        Category::Other => Color::Gray,
    }
}

fn draw(f: &mut Frame, state: &DashboardState, symbol: &str) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(10),
            Constraint::Length(1),
        ])
        .split(f.area());

    draw_header(f, chunks[0], state);
    match state.screen {
        Screen::Dashboard => draw_dashboard(f, chunks[1], state, symbol),
        Screen::Upload => draw_upload(f, chunks[1], state),
    }
    draw_footer(f, chunks[2], state);

    if let Some(fb) = state.error_modal() {
        draw_modal(f, &fb.title, &fb.message, fb.details.as_deref());
    }
}

fn draw_header(f: &mut Frame, area: Rect, state: &DashboardState) {
    let range = state.range();
    let titles: Vec<Line> = RangePreset::ALL
        .iter()
        .enumerate()
        .map(|(i, p)| Line::from(format!("{} {}", i + 1, p.label())))
        .collect();
    let selected = state
        .selector
        .preset()
        .and_then(|p| RangePreset::ALL.iter().position(|x| *x == p))
        .unwrap_or(0);

    let tabs = Tabs::new(titles)
        .select(selected)
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
        .block(Block::default().borders(Borders::ALL).title(format!(
            " Spendboard · {} – {} ",
            format_date(range.start),
            format_date(range.end)
        )));
    f.render_widget(tabs, area);
}

fn draw_footer(f: &mut Frame, area: Rect, state: &DashboardState) {
    let line = if let Some(t) = state.toasts.last() {
        let color = match t.feedback.severity {
            Severity::Success => Color::Green,
            Severity::Warning => Color::Yellow,
            Severity::Error => Color::Red,
        };
        Line::from(vec![
            Span::styled(
                format!("{}: ", t.feedback.title),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
            Span::raw(t.feedback.message.clone()),
        ])
    } else {
        let keys = match state.screen {
            Screen::Dashboard => "1/2/3 range · d/w/m view · r refresh · u upload · q quit",
            Screen::Upload => "Enter upload · Esc back · Ctrl-C quit",
        };
        Line::from(Span::styled(keys, Style::default().fg(Color::Gray)))
    };
    f.render_widget(Paragraph::new(line), area);
}

fn draw_dashboard(f: &mut Frame, area: Rect, state: &DashboardState, symbol: &str) {
    match &state.load {
        Load::Loading => {
            let p = Paragraph::new("Loading transactions…")
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL));
            f.render_widget(p, area);
            return;
        }
        Load::Failed(reason) => {
            let p = Paragraph::new(Text::from(vec![
                Line::from(Span::styled(
                    "Failed to load transactions. Please try again.",
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                )),
                Line::raw(""),
                Line::raw(reason.clone()),
                Line::raw(""),
                Line::from(Span::styled("press r to retry", Style::default().fg(Color::Gray))),
            ]))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL));
            f.render_widget(p, area);
            return;
        }
        Load::Loaded(txns) if txns.is_empty() => {
            let p = Paragraph::new(Text::from(vec![
                Line::from(Span::styled(
                    "No Transactions Found",
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::raw(""),
                Line::raw("Upload a PDF statement (press u) to get started."),
            ]))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
            f.render_widget(p, area);
            return;
        }
        Load::Loaded(_) => {}
    }

    let snap = state.snapshot();
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Percentage(50),
            Constraint::Min(6),
        ])
        .split(area);

    draw_kpis(f, rows[0], &snap, symbol);

    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(62), Constraint::Percentage(38)])
        .split(rows[1]);
    draw_chart(f, middle[0], &snap, state.view, symbol);
    draw_categories(f, middle[1], &snap, symbol);
    draw_transactions(f, rows[2], state, symbol);
}

fn draw_kpis(f: &mut Frame, area: Rect, snap: &Snapshot, symbol: &str) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(area);

    let k = &snap.kpis;
    let net_color = if k.net >= 0.0 { Color::Green } else { Color::Red };
    let cards = [
        (
            "Total Income",
            format_currency(k.total_income, symbol),
            format!("{} transactions", k.income_count),
            Color::Green,
        ),
        (
            "Total Spend",
            format_currency(k.total_spend, symbol),
            format!("{} transactions", k.spend_count),
            Color::Red,
        ),
        (
            "Net",
            format_currency(k.net.abs(), symbol),
            k.balance().label().to_string(),
            net_color,
        ),
    ];

    for (i, (title, value, sub, color)) in cards.into_iter().enumerate() {
        let p = Paragraph::new(Text::from(vec![
            Line::from(Span::styled(
                value,
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(sub, Style::default().fg(Color::Gray))),
        ]))
        .block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(p, cols[i]);
    }
}

/// Horizontal stacked bars, one row per period, newest at the bottom
fn draw_chart(f: &mut Frame, area: Rect, snap: &Snapshot, view: Granularity, symbol: &str) {
    let tabs: Vec<String> = Granularity::ALL
        .iter()
        .map(|g| {
            if *g == view {
                format!("[{}]", g.name())
            } else {
                g.name().to_string()
            }
        })
        .collect();
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Spending · {} ", tabs.join(" ")));

    // legend + one line per bar
    let rows_available = area.height.saturating_sub(3) as usize;
    let limit = view.max_periods().min(rows_available.max(1));
    let series = SpendingSeries::with_limit(&snap.periods, limit);

    let mut lines = vec![Line::from(
        series
            .categories
            .iter()
            .flat_map(|c| {
                [
                    Span::styled("■ ", Style::default().fg(category_color(*c))),
                    Span::raw(format!("{}  ", c.label())),
                ]
            })
            .collect::<Vec<_>>(),
    )];

    if series.is_empty() {
        lines.push(Line::raw("No spending in this period."));
    }

    let label_width = 9usize;
    let value_width = 16usize;
    let bar_width = (area.width as usize).saturating_sub(label_width + value_width + 4);
    let max = series.max_total();

    for p in &series.points {
        let mut spans = vec![Span::raw(format!(
            "{:<label_width$}",
            period_label(series.granularity, &p.period)
        ))];
        for (c, v) in series.categories.iter().zip(&p.values) {
            let w = if max > 0.0 {
                ((v / max) * bar_width as f64).round() as usize
            } else {
                0
            };
            if w > 0 {
                spans.push(Span::styled(
                    "█".repeat(w),
                    Style::default().fg(category_color(*c)),
                ));
            }
        }
        spans.push(Span::styled(
            format!(" {}", format_currency(p.total(), symbol)),
            Style::default().fg(Color::Gray),
        ));
        lines.push(Line::from(spans));
    }

    f.render_widget(Paragraph::new(Text::from(lines)).block(block), area);
}

fn draw_categories(f: &mut Frame, area: Rect, snap: &Snapshot, symbol: &str) {
    let mut lines = Vec::new();
    for share in snap.categories.ranked_by_spend() {
        lines.push(Line::from(vec![
            Span::styled("■ ", Style::default().fg(category_color(share.category))),
            Span::styled(
                share.category.label().to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ]));
        lines.push(Line::from(Span::styled(
            format!(
                "  {}  {:.1}%  {} txn",
                format_currency(share.spend, symbol),
                share.share * 100.0,
                share.count
            ),
            Style::default().fg(Color::Gray),
        )));
    }
    if lines.is_empty() {
        lines.push(Line::raw("No spending in this period."));
    }

    let p = Paragraph::new(Text::from(lines))
        .block(Block::default().borders(Borders::ALL).title(" By category "));
    f.render_widget(p, area);
}

fn draw_transactions(f: &mut Frame, area: Rect, state: &DashboardState, symbol: &str) {
    let header = Row::new(["Date", "Merchant", "Description", "Amount", "Category", "Recurring"])
        .style(Style::default().add_modifier(Modifier::BOLD));

    let rows = state.transactions().iter().map(|t| {
        let amount_color = if t.amount > 0.0 { Color::Green } else { Color::Red };
        Row::new(vec![
            Cell::from(format_date(t.date)),
            Cell::from(t.merchant_canonical.clone()),
            Cell::from(t.description_raw.clone()).style(Style::default().fg(Color::Gray)),
            Cell::from(format_signed(t.amount, symbol)).style(Style::default().fg(amount_color)),
            Cell::from(t.category.label()).style(Style::default().fg(category_color(t.category))),
            Cell::from(if t.is_recurring { "yes" } else { "" }),
        ])
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(10),
            Constraint::Percentage(20),
            Constraint::Percentage(30),
            Constraint::Length(18),
            Constraint::Length(24),
            Constraint::Length(9),
        ],
    )
    .header(header)
    .block(Block::default().borders(Borders::ALL).title(format!(
        " Transactions ({}) ",
        state.transactions().len()
    )));
    f.render_widget(table, area);
}

fn draw_upload(f: &mut Frame, area: Rect, state: &DashboardState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Length(3),
            Constraint::Min(5),
        ])
        .split(area);

    let intro = Paragraph::new(Text::from(vec![
        Line::raw("Upload bank statement PDFs; transactions are extracted and categorized by the backend."),
        Line::from(Span::styled(
            "Enter one or more file paths separated by spaces. Non-PDF files are skipped.",
            Style::default().fg(Color::Gray),
        )),
    ]))
    .wrap(Wrap { trim: true })
    .block(Block::default().borders(Borders::ALL).title(" Upload statements "));
    f.render_widget(intro, chunks[0]);

    let input = Paragraph::new(state.upload_input.as_str())
        .block(Block::default().borders(Borders::ALL).title("files"))
        .style(Style::default().fg(Color::White));
    f.render_widget(input, chunks[1]);

    let status: Vec<Line> = match state.upload.state() {
        UploadState::Idle | UploadState::Error(_) => {
            vec![Line::raw("Waiting for files.")]
        }
        UploadState::Uploading { files } => vec![
            Line::from(Span::styled(
                format!("Uploading {} file(s)…", files.len()),
                Style::default().fg(Color::Cyan),
            )),
            Line::raw(files.join(", ")),
        ],
        UploadState::Success(out) => {
            let mut lines = vec![
                Line::from(Span::styled(
                    out.feedback.title.clone(),
                    Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                )),
                Line::raw(out.feedback.message.clone()),
                Line::raw(format!("Import ID: {}", out.response.import_id)),
                Line::raw(out.response.message.clone()),
                Line::raw(""),
            ];
            if state.upload.redirect_pending() {
                lines.push(Line::from(Span::styled(
                    "Returning to the dashboard shortly; press any key to stay.",
                    Style::default().fg(Color::Gray),
                )));
            } else {
                lines.push(Line::from(Span::styled(
                    "Esc: view dashboard · Enter: upload more files",
                    Style::default().fg(Color::Gray),
                )));
            }
            lines
        }
    };
    let p = Paragraph::new(Text::from(status))
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(" Status "));
    f.render_widget(p, chunks[2]);
}

fn draw_modal(f: &mut Frame, title: &str, message: &str, details: Option<&str>) {
    let area = centered_rect(60, 30, f.area());
    let mut lines = vec![Line::raw(message.to_string())];
    if let Some(d) = details {
        lines.push(Line::raw(""));
        lines.push(Line::from(Span::styled(
            d.to_string(),
            Style::default().fg(Color::Gray),
        )));
    }
    lines.push(Line::raw(""));
    lines.push(Line::from(Span::styled(
        "Esc to close",
        Style::default().fg(Color::Gray),
    )));

    let p = Paragraph::new(Text::from(lines))
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red))
                .title(Span::styled(
                    format!(" {title} "),
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                )),
        );
    f.render_widget(Clear, area);
    f.render_widget(p, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
