//! Ratatui-based dashboard.
//!
//! One screen: period and category controls, status banner, KPIs, a per-date
//! chart, the category distribution, and the filtered rows. Every key press that
//! changes the filter recomputes the view from the current dataset snapshot.

use std::collections::BTreeSet;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Days, NaiveDate};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table},
};
use tracing::{info, warn};

use crate::aggregate::Aggregates;
use crate::app::pipeline::{self, ViewOutput};
use crate::cli::ViewArgs;
use crate::config::Settings;
use crate::dataset::{Dataset, SharedDataset, cell_text};
use crate::error::AppError;
use crate::filter::FilterSpec;
use crate::io::INDEX_COLUMN;
use crate::normalize::parse_day_first_date;
use crate::report::format::truncate;
use crate::report::{UNCATEGORIZED, format_amount, status_banner};

mod plotters_chart;

use plotters_chart::DailyCountChart;

/// Rows moved by PageUp/PageDown.
const PAGE: usize = 10;
/// Widest column in the row table.
const MAX_CELL: usize = 24;

/// Start the dashboard on the store named by `settings`.
pub fn run(settings: Settings, args: &ViewArgs) -> Result<(), AppError> {
    let dataset = pipeline::load(&settings)?;
    let mut app = App::new(settings, dataset, args);

    let _guard = TerminalGuard::new()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;

    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(4, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(4, format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

/// Filter control that has keyboard focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Start,
    End,
    Categories,
}

impl Control {
    fn index(self) -> usize {
        match self {
            Control::Start => 0,
            Control::End => 1,
            Control::Categories => 2,
        }
    }

    fn prev(self) -> Self {
        match self {
            Control::Start | Control::End => Control::Start,
            Control::Categories => Control::End,
        }
    }

    fn next(self) -> Self {
        match self {
            Control::Start => Control::End,
            Control::End | Control::Categories => Control::Categories,
        }
    }
}

struct App {
    settings: Settings,
    store: SharedDataset,
    dataset: Arc<Dataset>,
    spec: FilterSpec,
    /// Category options: distinct non-null categories of the current dataset.
    options: Vec<String>,
    focus: Control,
    cursor: usize,
    editing: bool,
    date_input: String,
    row_offset: usize,
    status: String,
}

impl App {
    fn new(settings: Settings, dataset: Dataset, args: &ViewArgs) -> Self {
        let spec = pipeline::resolve_filter(&dataset, args.from, args.to, &args.categories);
        let options = dataset.categories().into_iter().map(str::to_string).collect();
        let status = format!("{} incident(s) loaded from {}", dataset.len(), settings.db.display());
        let store = SharedDataset::new(dataset);
        Self {
            dataset: store.snapshot(),
            store,
            settings,
            spec,
            options,
            focus: Control::Start,
            cursor: 0,
            editing: false,
            date_input: String::new(),
            row_offset: 0,
            status,
        }
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(4, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(4, format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::new(4, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` when the user asked to quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        if self.editing {
            self.handle_date_edit(code);
            return false;
        }

        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Up | KeyCode::BackTab => self.focus = self.focus.prev(),
            KeyCode::Down | KeyCode::Tab => self.focus = self.focus.next(),
            KeyCode::Left => self.adjust(-1),
            KeyCode::Right => self.adjust(1),
            KeyCode::Enter => match self.focus {
                Control::Start | Control::End => {
                    self.editing = true;
                    self.date_input = self.focused_date().format("%d/%m/%Y").to_string();
                    self.status = "Editing date (dd/mm/yyyy). Enter to apply, Esc to cancel.".to_string();
                }
                Control::Categories => self.toggle_category(),
            },
            KeyCode::Char(' ') if self.focus == Control::Categories => self.toggle_category(),
            KeyCode::Char('a') => {
                self.spec.categories = None;
                self.row_offset = 0;
                self.status = "All categories.".to_string();
            }
            KeyCode::Char('f') => self.reset_period(),
            KeyCode::Char('r') => self.reload(),
            KeyCode::Char('j') => self.row_offset = self.row_offset.saturating_add(1),
            KeyCode::Char('k') => self.row_offset = self.row_offset.saturating_sub(1),
            KeyCode::PageDown => self.row_offset = self.row_offset.saturating_add(PAGE),
            KeyCode::PageUp => self.row_offset = self.row_offset.saturating_sub(PAGE),
            _ => {}
        }
        false
    }

    fn handle_date_edit(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc => {
                self.editing = false;
                self.status = "Date edit canceled.".to_string();
            }
            KeyCode::Enter => {
                self.editing = false;
                self.apply_date_input();
            }
            KeyCode::Backspace => {
                self.date_input.pop();
            }
            KeyCode::Char(c) if c.is_ascii_digit() || matches!(c, '/' | '-' | '.') => {
                self.date_input.push(c);
            }
            _ => {}
        }
    }

    fn apply_date_input(&mut self) {
        let input = self.date_input.trim().to_string();
        let Some(date) = parse_day_first_date(&input) else {
            self.status = format!("Invalid date '{input}'.");
            return;
        };
        self.set_focused_date(date);
        self.status = format!("Period: {} .. {}", self.spec.start, self.spec.end);
    }

    fn focused_date(&self) -> NaiveDate {
        match self.focus {
            Control::End => self.spec.end,
            _ => self.spec.start,
        }
    }

    fn set_focused_date(&mut self, date: NaiveDate) {
        match self.focus {
            Control::Start => self.spec.start = date,
            Control::End => self.spec.end = date,
            Control::Categories => return,
        }
        self.row_offset = 0;
    }

    fn adjust(&mut self, delta: i64) {
        match self.focus {
            Control::Start | Control::End => {
                let date = self.focused_date();
                let moved = if delta >= 0 {
                    date.checked_add_days(Days::new(delta.unsigned_abs()))
                } else {
                    date.checked_sub_days(Days::new(delta.unsigned_abs()))
                };
                if let Some(moved) = moved {
                    self.set_focused_date(moved);
                }
                // Inverted bounds are allowed; they select nothing.
                self.status = format!("Period: {} .. {}", self.spec.start, self.spec.end);
            }
            Control::Categories => {
                if self.options.is_empty() {
                    return;
                }
                let last = self.options.len() - 1;
                self.cursor = if delta >= 0 {
                    (self.cursor + 1).min(last)
                } else {
                    self.cursor.saturating_sub(1)
                };
            }
        }
    }

    fn toggle_category(&mut self) {
        let Some(name) = self.options.get(self.cursor).cloned() else {
            return;
        };
        let set = self.spec.categories.get_or_insert_with(BTreeSet::new);
        if !set.remove(&name) {
            set.insert(name);
        }
        if set.is_empty() {
            self.spec.categories = None;
        }
        self.row_offset = 0;
    }

    fn reset_period(&mut self) {
        if let Some((start, end)) = self.dataset.date_bounds() {
            self.spec.start = start;
            self.spec.end = end;
            self.row_offset = 0;
            self.status = format!("Period: {start} .. {end}");
        }
    }

    /// Reload the store and publish the new dataset. On failure the current one stays.
    fn reload(&mut self) {
        match pipeline::load(&self.settings) {
            Ok(dataset) => {
                let rows = dataset.len();
                self.store.replace(dataset);
                self.dataset = self.store.snapshot();
                self.options = self.dataset.categories().into_iter().map(str::to_string).collect();
                self.cursor = self.cursor.min(self.options.len().saturating_sub(1));
                self.row_offset = 0;
                info!(rows, "reloaded store");
                self.status = format!("Reloaded {rows} incident(s).");
            }
            Err(err) => {
                warn!(error = %err, "reload failed; keeping current dataset");
                self.status = format!("Reload failed: {err}");
            }
        }
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let dataset = Arc::clone(&self.dataset);
        let view = pipeline::run_view(&dataset, &self.spec, &self.settings.critical_label);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Percentage(40),
                Constraint::Min(5),
                Constraint::Length(3),
            ])
            .split(frame.area());

        self.draw_header(frame, chunks[0]);
        self.draw_banner(frame, chunks[1], &view.aggregates);
        self.draw_kpis(frame, chunks[2], &view.aggregates);
        self.draw_body(frame, chunks[3], &view);
        self.draw_rows(frame, chunks[4], &dataset, &view);
        self.draw_footer(frame, chunks[5]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let categories = match &self.spec.categories {
            Some(set) if !set.is_empty() => set.iter().map(String::as_str).collect::<Vec<_>>().join(", "),
            _ => "tous".to_string(),
        };
        let lines = vec![
            Line::from(vec![
                Span::styled("idash", Style::default().fg(Color::Cyan)),
                Span::raw(" - Tableau de bord sécurité"),
                Span::styled(
                    format!("  ({})", self.settings.db.display()),
                    Style::default().fg(Color::Gray),
                ),
            ]),
            Line::from(Span::styled(
                format!("Période : {} .. {} | Types : {categories}", self.spec.start, self.spec.end),
                Style::default().fg(Color::Gray),
            )),
        ];
        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_banner(&self, frame: &mut ratatui::Frame<'_>, area: Rect, agg: &Aggregates) {
        let color = if agg.status.is_alert() { Color::Red } else { Color::Green };
        let p = Paragraph::new(status_banner(agg.status, &self.settings.critical_label))
            .style(Style::default().fg(color).add_modifier(Modifier::BOLD))
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_kpis(&self, frame: &mut ratatui::Frame<'_>, area: Rect, agg: &Aggregates) {
        let cells = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Ratio(1, 3); 3])
            .split(area);

        let kpis = [
            ("Total incidents", agg.total_count.to_string()),
            (self.settings.critical_label.as_str(), agg.critical_count.to_string()),
            ("Valeur totale", format_amount(agg.value_sum)),
        ];
        for ((title, value), rect) in kpis.into_iter().zip(cells.iter()) {
            let p = Paragraph::new(value)
                .style(Style::default().add_modifier(Modifier::BOLD))
                .block(Block::default().title(title).borders(Borders::ALL));
            frame.render_widget(p, *rect);
        }
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect, view: &ViewOutput<'_>) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(area);
        let side = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(columns[1]);

        self.draw_chart(frame, columns[0], &view.aggregates);
        self.draw_filters(frame, side[0]);
        self.draw_distribution(frame, side[1], &view.aggregates);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect, agg: &Aggregates) {
        let block = Block::default().title("Incidents par date").borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        match DailyCountChart::from_series(&agg.time_series) {
            Some(chart) => frame.render_widget(chart, inner),
            None => frame.render_widget(
                Paragraph::new("Aucun incident sur la sélection.").style(Style::default().fg(Color::Yellow)),
                inner,
            ),
        }
    }

    fn draw_filters(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let start = if self.editing && self.focus == Control::Start {
            format!("{}_", self.date_input)
        } else {
            self.spec.start.to_string()
        };
        let end = if self.editing && self.focus == Control::End {
            format!("{}_", self.date_input)
        } else {
            self.spec.end.to_string()
        };

        let mut items = vec![
            ListItem::new(format!("Début : {start}")),
            ListItem::new(format!("Fin   : {end}")),
            ListItem::new("Types :"),
        ];
        let selected = self.spec.categories.as_ref();
        for (idx, name) in self.options.iter().enumerate() {
            let mark = if selected.is_some_and(|s| s.contains(name)) { "[x]" } else { "[ ]" };
            let pointer = if self.focus == Control::Categories && idx == self.cursor { ">" } else { " " };
            items.push(ListItem::new(format!("  {pointer} {mark} {name}")));
        }

        let list = List::new(items)
            .block(Block::default().title("Filtres").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ListState::default();
        let highlighted = match self.focus {
            Control::Categories => 3 + self.cursor,
            other => other.index(),
        };
        state.select(Some(highlighted));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_distribution(&self, frame: &mut ratatui::Frame<'_>, area: Rect, agg: &Aggregates) {
        let items: Vec<ListItem> = agg
            .category_distribution
            .iter()
            .map(|c| {
                let name = c.category.as_deref().unwrap_or(UNCATEGORIZED);
                let share = 100.0 * c.count as f64 / agg.total_count.max(1) as f64;
                ListItem::new(format!("{:<20} {:>5} {:>5.1}%", truncate(name, 20), c.count, share))
            })
            .collect();
        let list = List::new(items).block(Block::default().title("Répartition").borders(Borders::ALL));
        frame.render_widget(list, area);
    }

    fn draw_rows(&mut self, frame: &mut ratatui::Frame<'_>, area: Rect, dataset: &Dataset, view: &ViewOutput<'_>) {
        let visible = area.height.saturating_sub(3) as usize;
        self.row_offset = self.row_offset.min(view.rows.len().saturating_sub(1));

        let mut headers = vec![INDEX_COLUMN.to_string()];
        headers.extend(dataset.columns().into_iter().map(str::to_string));

        let lines: Vec<Vec<String>> = view
            .rows
            .iter()
            .enumerate()
            .skip(self.row_offset)
            .take(visible)
            .map(|(idx, record)| {
                let mut line = vec![(idx + 1).to_string()];
                line.extend(dataset.layout().iter().map(|c| cell_text(record, c.field)));
                line
            })
            .collect();

        let widths: Vec<Constraint> = (0..headers.len())
            .map(|col| {
                let widest = lines
                    .iter()
                    .map(|line| line[col].chars().count())
                    .chain(std::iter::once(headers[col].chars().count()))
                    .max()
                    .unwrap_or(0);
                Constraint::Length(widest.min(MAX_CELL) as u16)
            })
            .collect();

        let header = Row::new(headers.into_iter().map(Cell::from))
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));
        let rows = lines
            .into_iter()
            .map(|line| Row::new(line.into_iter().map(|cell| Cell::from(truncate(&cell, MAX_CELL)))));

        let title = format!(
            "Détails des incidents ({}-{} / {})",
            (self.row_offset + 1).min(view.rows.len()),
            (self.row_offset + visible).min(view.rows.len()),
            view.rows.len()
        );
        let table = Table::new(rows, widths)
            .header(header)
            .column_spacing(1)
            .block(Block::default().title(title).borders(Borders::ALL));
        frame.render_widget(table, area);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "↑/↓ select  ←/→ adjust  Enter edit/toggle  a all types  f full period  j/k PgUp/PgDn scroll  r reload  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}
