use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use roll_explorer::{BucketKey, SelectionOutcome, Session};
use std::collections::HashSet;
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Regions,
    Codes,
    Results,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Regions => Page::Codes,
            Page::Codes => Page::Results,
            Page::Results => Page::Regions,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Regions => Page::Results,
            Page::Codes => Page::Regions,
            Page::Results => Page::Codes,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Regions => "Regions",
            Page::Codes => "CUBF Codes",
            Page::Results => "Results",
        }
    }
}

/// One row of the code checklist: a bucket heading or a checkable code
#[derive(Debug, Clone)]
pub enum CodeRow {
    Bucket(BucketKey),
    Code(String),
}

pub struct App {
    pub session: Session,
    pub current_page: Page,
    pub region_state: TableState,
    pub code_rows: Vec<CodeRow>,
    pub code_state: TableState,
    pub selected_codes: HashSet<String>,
    pub status: String,
}

impl App {
    pub fn new(session: Session) -> Self {
        let mut region_state = TableState::default();
        if !session.regions().is_empty() {
            region_state.select(Some(0));
        }

        Self {
            session,
            current_page: Page::Regions,
            region_state,
            code_rows: Vec::new(),
            code_state: TableState::default(),
            selected_codes: HashSet::new(),
            status: "Select a region and press Enter to load its roll".to_string(),
        }
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
    }

    /// Download the highlighted region's roll and rebuild the code list
    pub fn load_highlighted_region(&mut self) {
        let Some(index) = self.region_state.selected() else {
            self.status = "⚠️  Select a region first".to_string();
            return;
        };
        let Some(region) = self.session.regions().get(index) else {
            return;
        };
        let name = region.name.clone();
        let url = region.source_url.clone();

        self.status = format!("Loading {}...", name);
        match self.session.load_region(&url) {
            Ok(count) => {
                self.selected_codes.clear();
                self.rebuild_code_rows();
                self.status = format!("✅ {} loaded: {} parcel records", name, count);
                self.current_page = Page::Codes;
            }
            Err(e) => {
                // A failed parse cleared the set; a failed download kept it
                self.selected_codes.clear();
                self.rebuild_code_rows();
                self.status = format!("❌ {}: {}", name, e);
            }
        }
    }

    fn rebuild_code_rows(&mut self) {
        self.code_rows.clear();
        for (key, codes) in self.session.code_buckets() {
            self.code_rows.push(CodeRow::Bucket(key));
            for code in codes {
                self.code_rows.push(CodeRow::Code(code));
            }
        }

        self.code_state = TableState::default();
        if !self.code_rows.is_empty() {
            self.code_state.select(Some(0));
        }
    }

    /// Toggle the highlighted code, or a whole bucket at once
    pub fn toggle_highlighted(&mut self) {
        let Some(index) = self.code_state.selected() else {
            return;
        };
        match self.code_rows.get(index).cloned() {
            Some(CodeRow::Code(code)) => {
                if !self.selected_codes.remove(&code) {
                    self.selected_codes.insert(code);
                }
            }
            Some(CodeRow::Bucket(_)) => {
                let bucket_codes: Vec<String> = self
                    .code_rows
                    .iter()
                    .skip(index + 1)
                    .take_while(|row| matches!(row, CodeRow::Code(_)))
                    .filter_map(|row| match row {
                        CodeRow::Code(code) => Some(code.clone()),
                        CodeRow::Bucket(_) => None,
                    })
                    .collect();

                let all_selected = bucket_codes
                    .iter()
                    .all(|code| self.selected_codes.contains(code));
                for code in bucket_codes {
                    if all_selected {
                        self.selected_codes.remove(&code);
                    } else {
                        self.selected_codes.insert(code);
                    }
                }
            }
            None => {}
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected_codes.clear();
    }

    /// Aggregation for the current selection
    pub fn outcome(&self) -> SelectionOutcome {
        self.session.aggregate(&self.selected_codes)
    }

    fn active_list_len(&self) -> usize {
        match self.current_page {
            Page::Regions => self.session.regions().len(),
            Page::Codes => self.code_rows.len(),
            Page::Results => 0,
        }
    }

    fn active_state(&mut self) -> &mut TableState {
        match self.current_page {
            Page::Codes => &mut self.code_state,
            _ => &mut self.region_state,
        }
    }

    pub fn next(&mut self) {
        let len = self.active_list_len();
        if len == 0 {
            return;
        }
        let state = self.active_state();
        let i = match state.selected() {
            Some(i) => {
                if i >= len - 1 {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.active_list_len();
        if len == 0 {
            return;
        }
        let state = self.active_state();
        let i = match state.selected() {
            Some(i) => {
                if i == 0 {
                    len - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        state.select(Some(i));
    }

    pub fn page_down(&mut self) {
        let len = self.active_list_len();
        if len == 0 {
            return;
        }
        let state = self.active_state();
        let i = match state.selected() {
            Some(i) => (i + 20).min(len - 1),
            None => 0,
        };
        state.select(Some(i));
    }

    pub fn page_up(&mut self) {
        let state = self.active_state();
        let i = match state.selected() {
            Some(i) => i.saturating_sub(20),
            None => 0,
        };
        state.select(Some(i));
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Tab => {
                    if key.modifiers.contains(KeyModifiers::SHIFT) {
                        app.previous_page();
                    } else {
                        app.next_page();
                    }
                }
                KeyCode::Enter if app.current_page == Page::Regions => {
                    app.load_highlighted_region();
                }
                KeyCode::Char(' ') | KeyCode::Enter if app.current_page == Page::Codes => {
                    app.toggle_highlighted();
                }
                KeyCode::Char('c') => app.clear_selection(),
                KeyCode::Char('r') => app.current_page = Page::Results,
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::PageDown => app.page_down(),
                KeyCode::PageUp => app.page_up(),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    match app.current_page {
        Page::Regions => render_regions(f, chunks[1], app),
        Page::Codes => render_codes(f, chunks[1], app),
        Page::Results => render_results(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let pages = [Page::Regions, Page::Codes, Page::Results];

    let mut tab_spans = vec![];
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(page.title(), style));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Records: {}", app.session.record_count()),
        Style::default().fg(Color::White),
    ));
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Selected codes: {}", app.selected_codes.len()),
        Style::default().fg(Color::Green),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    f.render_widget(header, area);
}

fn render_regions(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = ["MRC", "Roll URL"].iter().map(|h| {
        Cell::from(*h).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });
    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = app.session.regions().iter().map(|region| {
        Row::new(vec![
            Cell::from(region.name.clone()),
            Cell::from(region.source_url.clone()).style(Style::default().fg(Color::DarkGray)),
        ])
    });

    let table = Table::new(rows, [Constraint::Percentage(40), Constraint::Percentage(60)])
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Choose a region (Enter to load) "),
        )
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .add_modifier(Modifier::BOLD),
        );

    f.render_stateful_widget(table, area, &mut app.region_state);
}

fn render_codes(f: &mut Frame, area: Rect, app: &mut App) {
    if app.code_rows.is_empty() {
        let message = if app.session.has_data() {
            "No usage codes in this roll."
        } else {
            "No roll loaded. Load a region first (Tab to Regions)."
        };
        let paragraph = Paragraph::new(message)
            .style(Style::default().fg(Color::Yellow))
            .block(Block::default().borders(Borders::ALL).title(" CUBF Codes "));
        f.render_widget(paragraph, area);
        return;
    }

    let rows = app.code_rows.iter().map(|row| match row {
        CodeRow::Bucket(key) => Row::new(vec![Cell::from(key.label())]).style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        CodeRow::Code(code) => {
            let marker = if app.selected_codes.contains(code) {
                "[x]"
            } else {
                "[ ]"
            };
            Row::new(vec![Cell::from(format!("  {} {}", marker, code))])
        }
    });

    let table = Table::new(rows, [Constraint::Percentage(100)])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Toggle codes with Space (bucket row toggles all) "),
        )
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .add_modifier(Modifier::BOLD),
        );

    f.render_stateful_widget(table, area, &mut app.code_state);
}

fn render_results(f: &mut Frame, area: Rect, app: &mut App) {
    match app.outcome() {
        SelectionOutcome::NoData => {
            let paragraph = Paragraph::new("⚠️  No data loaded.")
                .style(Style::default().fg(Color::Yellow))
                .block(Block::default().borders(Borders::ALL).title(" Results "));
            f.render_widget(paragraph, area);
        }
        SelectionOutcome::Ready(result) => {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(4), Constraint::Min(0)])
                .split(area);

            let totals = Paragraph::new(vec![
                Line::from(format!("Selected parcels: {}", result.building_count)),
                Line::from(format!("Housing units:    {}", result.unit_total)),
            ])
            .block(Block::default().borders(Borders::ALL).title(" Totals "));
            f.render_widget(totals, chunks[0]);

            let header_cells = ["Code CUBF", "Buildings", "Units"].iter().map(|h| {
                Cell::from(*h).style(
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                )
            });
            let header = Row::new(header_cells)
                .style(Style::default().bg(Color::DarkGray))
                .height(1);

            let rows = result.summary.iter().map(|row| {
                Row::new(vec![
                    Cell::from(row.usage_code.clone()),
                    Cell::from(row.building_count.to_string()),
                    Cell::from(row.unit_total.to_string()),
                ])
            });

            let table = Table::new(
                rows,
                [
                    Constraint::Percentage(40),
                    Constraint::Percentage(30),
                    Constraint::Percentage(30),
                ],
            )
            .header(header)
            .block(Block::default().borders(Borders::ALL).title(" Summary "));

            f.render_widget(table, chunks[1]);
        }
    }
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let hints = "q quit │ Tab pages │ ↑↓ move │ Enter load │ Space toggle │ c clear │ r results";
    let status = Paragraph::new(vec![Line::from(vec![
        Span::styled(app.status.clone(), Style::default().fg(Color::White)),
        Span::raw("   "),
        Span::styled(hints, Style::default().fg(Color::DarkGray)),
    ])])
    .block(Block::default().borders(Borders::ALL));

    f.render_widget(status, area);
}
