use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::stdout;

use crate::board::{self, Column};
use crate::models::{Job, Priority, Stage};
use crate::slots::SlotStore;
use crate::store::Store;

struct BoardState {
    column: usize,
    rows: [usize; 4],
    query: String,
    confirm_delete: bool,
    message: Option<String>,
}

impl BoardState {
    fn new(query: &str) -> Self {
        Self {
            column: 0,
            rows: [0; 4],
            query: query.to_string(),
            confirm_delete: false,
            message: None,
        }
    }

    fn selected<'a>(&self, columns: &[Column<'a>; 4]) -> Option<&'a Job> {
        columns[self.column].jobs.get(self.rows[self.column]).copied()
    }

    fn clamp(&mut self, columns: &[Column<'_>; 4]) {
        for (row, col) in self.rows.iter_mut().zip(columns.iter()) {
            *row = (*row).min(col.jobs.len().saturating_sub(1));
        }
    }

    fn left(&mut self) {
        self.column = self.column.saturating_sub(1);
    }

    fn right(&mut self) {
        self.column = (self.column + 1).min(Stage::ALL.len() - 1);
    }

    fn down(&mut self, len: usize) {
        if len > 0 && self.rows[self.column] < len - 1 {
            self.rows[self.column] += 1;
        }
    }

    fn up(&mut self) {
        self.rows[self.column] = self.rows[self.column].saturating_sub(1);
    }
}

pub fn run_board<S: SlotStore>(store: &mut Store<S>, query: &str) -> Result<()> {
    let mut state = BoardState::new(query);

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state, store);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop<S: SlotStore>(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut BoardState,
    store: &mut Store<S>,
) -> Result<()> {
    loop {
        let (selected_id, column_len) = {
            let columns = board::columns(store.jobs(), &state.query);
            state.clamp(&columns);
            terminal.draw(|frame| draw(frame, &*state, &columns))?;
            (
                state.selected(&columns).map(|j| j.id.clone()),
                columns[state.column].jobs.len(),
            )
        };

        let Event::Key(key) = event::read()? else { continue };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if state.confirm_delete {
            state.confirm_delete = false;
            state.message = None;
            if let (KeyCode::Char('y'), Some(id)) = (key.code, &selected_id) {
                store.delete(id)?;
                state.message = Some("Deleted.".to_string());
            }
            continue;
        }

        state.message = None;
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => break,
            KeyCode::Left | KeyCode::Char('h') => state.left(),
            KeyCode::Right | KeyCode::Char('l') => state.right(),
            KeyCode::Down | KeyCode::Char('j') => state.down(column_len),
            KeyCode::Up | KeyCode::Char('k') => state.up(),
            KeyCode::Char('H') | KeyCode::Char('L') => {
                let step = if key.code == KeyCode::Char('H') { -1 } else { 1 };
                let target = board::neighbour(Stage::ALL[state.column], step);
                if let Some(id) = &selected_id {
                    store.drop_card(id, target.map(|s| s.as_str()))?;
                }
            }
            KeyCode::Char(c @ '1'..='4') => {
                let target = Stage::ALL[(c as u8 - b'1') as usize];
                if let Some(id) = &selected_id {
                    if store.drop_card(id, Some(target.as_str()))? {
                        state.message = Some(format!("Moved to {}.", target.title()));
                    }
                }
            }
            KeyCode::Char('x') if selected_id.is_some() => {
                state.confirm_delete = true;
                state.message = Some("Delete this job? (y/n)".to_string());
            }
            _ => {}
        }
    }
    Ok(())
}

fn draw(frame: &mut Frame, state: &BoardState, columns: &[Column<'_>; 4]) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(9),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let lanes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 4); 4])
        .split(rows[0]);

    for (i, column) in columns.iter().enumerate() {
        let items: Vec<ListItem> = column
            .jobs
            .iter()
            .map(|job| {
                let marker = match job.priority {
                    Some(Priority::High) => "!",
                    Some(Priority::Low) => ".",
                    _ => " ",
                };
                ListItem::new(format!("{} {} | {}", marker, job.company, job.title))
            })
            .collect();

        let active = i == state.column;
        let border_style = if active {
            Style::default().fg(stage_color(column.stage))
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(border_style)
                    .title(format!(" {} ({}) ", column.stage.title(), column.jobs.len())),
            )
            .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
            .highlight_symbol("> ");

        let mut list_state = ListState::default();
        if active && !column.jobs.is_empty() {
            list_state.select(Some(state.rows[i]));
        }
        frame.render_stateful_widget(list, lanes[i], &mut list_state);
    }

    let detail = build_detail(state.selected(columns), rows[1].width.saturating_sub(4));
    let detail_widget = Paragraph::new(detail)
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false });
    frame.render_widget(detail_widget, rows[1]);

    let help = state.message.clone().unwrap_or_else(|| {
        " h/l:column  j/k:card  H/L:move card  1-4:drop on column  x:delete  q:quit".to_string()
    });
    let help = Paragraph::new(help).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, rows[2]);
}

fn stage_color(stage: Stage) -> Color {
    match stage {
        Stage::Todo => Color::Magenta,
        Stage::Applied => Color::Blue,
        Stage::Interview => Color::Yellow,
        Stage::Done => Color::Green,
    }
}

fn build_detail(job: Option<&Job>, width: u16) -> Text<'_> {
    let Some(job) = job else {
        return Text::raw("No job selected");
    };

    let mut lines: Vec<Line> = Vec::new();

    lines.push(Line::from(Span::styled(
        format!("{} at {}", job.title, job.company),
        Style::default().add_modifier(Modifier::BOLD),
    )));

    let mut facts = Vec::new();
    for value in [&job.location, &job.job_type, &job.salary].into_iter().flatten() {
        facts.push(value.as_str());
    }
    if !facts.is_empty() {
        lines.push(Line::from(facts.join("  ·  ")));
    }

    let source = job.source.as_deref().unwrap_or("-");
    let resume = job.resume_used.as_deref().unwrap_or("-");
    lines.push(Line::from(format!("Source: {}   Resume: {}", source, resume)));

    if let Some(url) = &job.url {
        lines.push(Line::from(format!("URL: {}", url)));
    }

    if let Some(notes) = &job.notes {
        for line in textwrap::fill(notes, width.max(20) as usize).lines() {
            lines.push(Line::from(Span::styled(
                line.to_string(),
                Style::default().fg(Color::Gray),
            )));
        }
    }

    Text::from(lines)
}
