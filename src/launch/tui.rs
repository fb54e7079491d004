//! Interactive launcher screen
//!
//! One tab per page, a filterable entry list, and a status line that shows
//! what the last launch did. Launch errors land in the status line; the
//! screen itself never goes down with them.

use super::{describe, LaunchFile, Outcome};
use crate::errors::Result;
use crossterm::event::{poll, read, Event, KeyCode, KeyEvent};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph, Tabs};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    Filter,
}

struct App {
    source: PathBuf,
    file: LaunchFile,
    page_index: usize,
    selected: usize,
    filter: String,
    mode: Mode,
    status: String,
    status_err: bool,
}

impl App {
    fn new(source: PathBuf, file: LaunchFile) -> Self {
        let page_index = file
            .initial_page
            .as_ref()
            .and_then(|name| file.pages.iter().position(|p| &p.name == name))
            .unwrap_or(0);
        Self {
            source,
            file,
            page_index,
            selected: 0,
            filter: String::new(),
            mode: Mode::Normal,
            status: String::from("Enter launches, / filters, q quits"),
            status_err: false,
        }
    }

    /// Indexes of the current page's entries that match the filter
    fn visible(&self) -> Vec<usize> {
        let needle = self.filter.to_lowercase();
        match self.file.pages.get(self.page_index) {
            Some(page) => page
                .entries
                .iter()
                .enumerate()
                .filter(|(_, e)| needle.is_empty() || e.name.to_lowercase().contains(&needle))
                .map(|(i, _)| i)
                .collect(),
            None => Vec::new(),
        }
    }

    fn clamp_selection(&mut self) {
        let len = self.visible().len();
        if len == 0 {
            self.selected = 0;
        } else if self.selected >= len {
            self.selected = len - 1;
        }
    }

    fn next_page(&mut self) {
        if !self.file.pages.is_empty() {
            self.page_index = (self.page_index + 1) % self.file.pages.len();
            self.selected = 0;
        }
    }

    fn prev_page(&mut self) {
        if !self.file.pages.is_empty() {
            self.page_index =
                (self.page_index + self.file.pages.len() - 1) % self.file.pages.len();
            self.selected = 0;
        }
    }

    fn set_status(&mut self, message: String, err: bool) {
        self.status = message;
        self.status_err = err;
    }

    fn show_page(&mut self, name: &str) {
        match self
            .file
            .pages
            .iter()
            .position(|p| p.name.eq_ignore_ascii_case(name))
        {
            Some(i) => {
                self.page_index = i;
                self.selected = 0;
                self.filter.clear();
                let label = self.file.pages[i].name.clone();
                self.set_status(format!("page: {}", label), false);
            }
            None => self.set_status(format!("no page named {:?}", name), true),
        }
    }

    fn launch_selected(&mut self) {
        let visible = self.visible();
        let Some(&entry_index) = visible.get(self.selected) else {
            return;
        };
        let entry = self.file.pages[self.page_index].entries[entry_index].clone();
        match super::execute(&entry, false) {
            Ok(Outcome::Opened(target)) => {
                self.set_status(format!("opened {} ({})", entry.name, target), false);
            }
            Ok(Outcome::Page(target)) => self.show_page(&target),
            Ok(Outcome::WouldOpen(_)) => {}
            Err(e) => self.set_status(format!("error: {}", e), true),
        }
    }

    fn reload(&mut self) {
        match super::load(&self.source) {
            Ok(file) => {
                self.file = file;
                if self.page_index >= self.file.pages.len() {
                    self.page_index = 0;
                }
                self.clamp_selection();
                self.set_status("reloaded".to_string(), false);
            }
            Err(e) => self.set_status(format!("reload failed: {}", e), true),
        }
    }
}

/// Run the launcher screen until the user quits
pub fn run(source: &Path, file: LaunchFile) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, App::new(source.to_path_buf(), file));

    // Teardown must run even when the loop errored
    let _ = disable_raw_mode();
    let _ = execute!(terminal.backend_mut(), LeaveAlternateScreen);
    let _ = terminal.show_cursor();

    result
}

fn event_loop<B: Backend>(terminal: &mut Terminal<B>, mut app: App) -> Result<()> {
    loop {
        terminal.draw(|frame| draw(frame, &app))?;
        if !poll(Duration::from_millis(150))? {
            continue;
        }
        if let Event::Key(key) = read()? {
            if handle_key(&mut app, key) {
                return Ok(());
            }
        }
    }
}

/// Returns true when the app should quit
fn handle_key(app: &mut App, key: KeyEvent) -> bool {
    if app.mode == Mode::Filter {
        match key.code {
            KeyCode::Esc => {
                app.mode = Mode::Normal;
                app.filter.clear();
                app.clamp_selection();
            }
            KeyCode::Enter => app.mode = Mode::Normal,
            KeyCode::Backspace => {
                app.filter.pop();
                app.clamp_selection();
            }
            KeyCode::Char(c) => {
                app.filter.push(c);
                app.selected = 0;
            }
            _ => {}
        }
        return false;
    }

    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Esc => {
            if app.filter.is_empty() {
                return true;
            }
            app.filter.clear();
            app.clamp_selection();
        }
        KeyCode::Tab | KeyCode::Right | KeyCode::Char('l') => app.next_page(),
        KeyCode::BackTab | KeyCode::Left | KeyCode::Char('h') => app.prev_page(),
        KeyCode::Down | KeyCode::Char('j') => {
            let len = app.visible().len();
            if len > 0 && app.selected + 1 < len {
                app.selected += 1;
            }
        }
        KeyCode::Up | KeyCode::Char('k') => {
            app.selected = app.selected.saturating_sub(1);
        }
        KeyCode::Char('/') => {
            app.mode = Mode::Filter;
            app.filter.clear();
            app.selected = 0;
        }
        KeyCode::Char('r') => app.reload(),
        KeyCode::Enter => app.launch_selected(),
        _ => {}
    }
    false
}

fn draw(frame: &mut Frame, app: &App) {
    let layout = Layout::vertical([
        Constraint::Length(1), // Title bar
        Constraint::Length(1), // Page tabs
        Constraint::Min(5),    // Entry list
        Constraint::Length(1), // Filter bar
        Constraint::Length(1), // Status line
    ])
    .split(frame.area());

    let title = Paragraph::new(format!(" {}", app.file.title))
        .style(Style::default().bg(Color::Blue).fg(Color::White).bold());
    frame.render_widget(title, layout[0]);

    let tabs = Tabs::new(
        app.file
            .pages
            .iter()
            .map(|p| p.name.clone())
            .collect::<Vec<_>>(),
    )
    .select(app.page_index)
    .highlight_style(Style::default().fg(Color::Black).bg(Color::Yellow));
    frame.render_widget(tabs, layout[1]);

    draw_entries(frame, app, layout[2]);
    draw_filter_bar(frame, app, layout[3]);

    let status_style = if app.status_err {
        Style::default().fg(Color::Red)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    frame.render_widget(
        Paragraph::new(format!(" {}", app.status)).style(status_style),
        layout[4],
    );
}

fn draw_entries(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(format!(" {} ", page_title(app)))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let visible = app.visible();
    if visible.is_empty() {
        let empty = Paragraph::new("No entries match")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        frame.render_widget(empty, inner);
        return;
    }
    let Some(page) = app.file.pages.get(app.page_index) else {
        return;
    };

    let items: Vec<ListItem> = visible
        .iter()
        .enumerate()
        .map(|(row, &entry_index)| {
            let entry = &page.entries[entry_index];
            let selected = row == app.selected;
            let marker = if selected { "> " } else { "  " };
            let name_style = if selected {
                Style::default().fg(Color::White).bold()
            } else {
                Style::default().fg(Color::White)
            };
            let line = Line::from(vec![
                Span::styled(marker, Style::default().fg(Color::Yellow)),
                Span::styled(format!("{:<24}", entry.name), name_style),
                Span::styled(describe(entry), Style::default().fg(Color::DarkGray)),
            ]);
            let row_style = if selected {
                Style::default().bg(Color::DarkGray)
            } else {
                Style::default()
            };
            ListItem::new(line).style(row_style)
        })
        .collect();
    frame.render_widget(List::new(items), inner);
}

fn page_title(app: &App) -> String {
    app.file
        .pages
        .get(app.page_index)
        .map(|p| p.name.clone())
        .unwrap_or_else(|| "no pages".to_string())
}

fn draw_filter_bar(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![Span::raw(" / ")];
    if app.mode == Mode::Filter {
        spans.push(Span::styled(
            app.filter.clone(),
            Style::default().fg(Color::Cyan),
        ));
        spans.push(Span::styled("_", Style::default().fg(Color::Cyan)));
    } else if !app.filter.is_empty() {
        spans.push(Span::styled(
            app.filter.clone(),
            Style::default().fg(Color::Cyan),
        ));
        spans.push(Span::styled(
            " (Esc clears)",
            Style::default().fg(Color::DarkGray),
        ));
    } else {
        spans.push(Span::styled(
            "filter   Tab pages   j/k move   Enter launch   r reload   q quit",
            Style::default().fg(Color::DarkGray),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
