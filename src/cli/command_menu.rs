//! Command Menu (TUI popup)
//!
//! Displays a visual command menu when the operator types "/". Commands that
//! are unavailable in the current session state are shown dimmed and cannot
//! be selected.

use crate::cli::commands::{ArgShape, Availability, COMMANDS};
use crate::session::holder::SessionHolder;
use ratatui::{
    crossterm::event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use std::io;

/// Command menu item
#[derive(Debug, Clone)]
pub struct CommandItem {
    /// Command name
    pub name: String,
    /// Description
    pub description: String,
    /// Example usage
    pub example: String,
    /// Whether the command takes an argument
    pub takes_argument: bool,
    /// Whether the command can run right now
    pub available: bool,
}

/// Menu items for the current holder state
pub fn menu_items(holder: &SessionHolder) -> Vec<CommandItem> {
    COMMANDS
        .iter()
        .map(|spec| CommandItem {
            name: spec.name.to_string(),
            description: spec.description.to_string(),
            example: spec.usage.to_string(),
            takes_argument: !matches!(spec.arg, ArgShape::None),
            available: spec.availability(holder) == Availability::Available,
        })
        .collect()
}

/// Result of running the command menu
pub enum MenuResult {
    /// User selected a command
    Command(CommandItem),
    /// User cancelled (ESC)
    Cancelled,
    /// User wants to type their own input
    TextInput,
}

/// Display the command menu and return selected command
pub fn show_command_menu(commands: &[CommandItem]) -> io::Result<MenuResult> {
    let mut state = ListState::default();
    state.select(first_available(commands));

    // Setup terminal
    crossterm::terminal::enable_raw_mode()?;
    crossterm::execute!(io::stdout(), EnableMouseCapture)?;

    let stdout = io::stdout();
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let result = run_menu(&mut terminal, commands, &mut state);

    // Restore terminal
    terminal.clear()?;
    crossterm::terminal::disable_raw_mode()?;
    crossterm::execute!(io::stdout(), DisableMouseCapture)?;

    result
}

fn first_available(commands: &[CommandItem]) -> Option<usize> {
    commands.iter().position(|c| c.available)
}

/// Next selectable index moving from `from` in direction `step`
fn step_selection(commands: &[CommandItem], from: usize, forward: bool) -> usize {
    let mut idx = from;
    loop {
        let next = if forward {
            idx.checked_add(1).filter(|n| *n < commands.len())
        } else {
            idx.checked_sub(1)
        };
        match next {
            Some(n) if commands[n].available => return n,
            Some(n) => idx = n,
            None => return from,
        }
    }
}

fn run_menu(
    terminal: &mut ratatui::Terminal<ratatui::backend::CrosstermBackend<std::io::Stdout>>,
    commands: &[CommandItem],
    state: &mut ListState,
) -> io::Result<MenuResult> {
    loop {
        terminal.draw(|f| ui(f, commands, state))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => {
                    return Ok(MenuResult::Cancelled);
                }
                KeyCode::Enter => {
                    if let Some(selected) = state.selected() {
                        return Ok(MenuResult::Command(commands[selected].clone()));
                    }
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    if let Some(selected) = state.selected() {
                        state.select(Some(step_selection(commands, selected, true)));
                    }
                }
                KeyCode::Up | KeyCode::Char('k') => {
                    if let Some(selected) = state.selected() {
                        state.select(Some(step_selection(commands, selected, false)));
                    }
                }
                KeyCode::Char('/') => {
                    return Ok(MenuResult::TextInput);
                }
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, commands: &[CommandItem], state: &mut ListState) {
    let size = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(3),
        ])
        .split(size);

    let header = Paragraph::new(vec![
        Line::from(" evita-shell ").style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Line::from(""),
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    )
    .alignment(Alignment::Center);

    f.render_widget(header, chunks[0]);

    let items: Vec<ListItem> = commands
        .iter()
        .map(|cmd| {
            let item = ListItem::new(format!("  {:<28} - {}", cmd.example, cmd.description));
            if cmd.available {
                item
            } else {
                item.style(Style::default().fg(Color::DarkGray))
            }
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .highlight_style(
            Style::default()
                .add_modifier(Modifier::REVERSED)
                .fg(Color::Black)
                .bg(Color::Cyan),
        );

    f.render_stateful_widget(list, chunks[1], state);

    let help_text = vec![
        Line::from(" ↑/k: Up  ↓/j: Down  Enter: Select  ESC/q: Cancel  /: Type command ")
            .style(Style::default().fg(Color::Gray)),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });

    f.render_widget(help, chunks[2]);
}
