//! REPL implementation
//!
//! This module implements the interactive Read-Eval-Print Loop. The line
//! editor runs on the blocking thread pool so the runtime stays responsive to
//! shutdown signals while the shell waits for input.

use crate::cli::command_menu::{self, MenuResult};
use crate::cli::commands::{self, format_error, Command, CommandKind};
use crate::cli::prompt::Prompt;
use crate::config::ShellConfig;
use crate::error::{Result, ShellError};
use crate::session::bootstrap::catalog_banner;
use crate::session::holder::SharedHolder;
use async_trait::async_trait;
use rustyline::completion::Completer;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::Context;
use rustyline::Helper;
use rustyline::{CompletionType, Config, Editor};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

const PROMPT: &str = "evita> ";

/// Command completer
struct ShellCompleter;

impl Completer for ShellCompleter {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> std::result::Result<(usize, Vec<String>), ReadlineError> {
        let line = &line[..pos];

        // Only the command name is completed
        if line.contains(char::is_whitespace) {
            return Ok((pos, vec![]));
        }

        let (start, prefix) = match line.strip_prefix('/') {
            Some(rest) => (1, rest),
            None => (0, line),
        };

        let matches: Vec<String> = commands::command_names()
            .into_iter()
            .filter(|cmd| cmd.starts_with(prefix))
            .map(|s| s.to_string())
            .collect();
        Ok((start, matches))
    }
}

impl Hinter for ShellCompleter {
    type Hint = String;
}

impl Highlighter for ShellCompleter {}

impl Validator for ShellCompleter {}

impl Helper for ShellCompleter {}

type ShellEditor = Editor<ShellCompleter, DefaultHistory>;

/// Read one line on the blocking pool
async fn read_line(
    editor: &Arc<Mutex<ShellEditor>>,
    prompt: &str,
    initial: Option<String>,
) -> Result<std::result::Result<String, ReadlineError>> {
    let editor = Arc::clone(editor);
    let prompt = prompt.to_string();
    tokio::task::spawn_blocking(move || {
        let mut editor = editor.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match initial {
            Some(initial) => editor.readline_with_initial(&prompt, (&initial, "")),
            None => editor.readline(&prompt),
        }
    })
    .await
    .map_err(|e| ShellError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))
}

/// Prompt backed by the REPL's line editor
struct EditorPrompt {
    editor: Arc<Mutex<ShellEditor>>,
}

#[async_trait]
impl Prompt for EditorPrompt {
    async fn prompt_for_string(&mut self, label: &str) -> Result<String> {
        match read_line(&self.editor, &format!("{} ", label), None).await? {
            Ok(value) => Ok(value),
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                Err(ShellError::PromptCancelled)
            }
            Err(err) => Err(ShellError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                err.to_string(),
            ))),
        }
    }
}

/// Interactive shell
pub struct Repl {
    /// The rustyline editor
    editor: Arc<Mutex<ShellEditor>>,
    /// Whether the REPL should continue running
    running: bool,
    /// Holder of the client and the active session
    holder: SharedHolder,
    /// Where history is loaded from and saved to
    history_path: PathBuf,
}

impl Repl {
    /// Create a new REPL instance
    pub fn new(holder: SharedHolder, config: &ShellConfig) -> Result<Self> {
        let editor_config = Config::builder()
            .history_ignore_space(true)
            .completion_type(CompletionType::List)
            .auto_add_history(false)
            .build();

        let mut editor = ShellEditor::with_config(editor_config).map_err(|e| {
            ShellError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Failed to initialize editor: {}", e),
            ))
        })?;

        editor.set_helper(Some(ShellCompleter));

        let history_path = config.history_path();
        if let Err(e) = editor.load_history(&history_path) {
            // History file doesn't exist or is unreadable, that's fine
            debug!(path = %history_path.display(), error = %e, "could not load history");
        }

        Ok(Self {
            editor: Arc::new(Mutex::new(editor)),
            running: true,
            holder,
            history_path,
        })
    }

    /// Run the REPL loop until `exit` or end of input
    pub async fn run(&mut self) -> Result<()> {
        while self.running {
            match read_line(&self.editor, PROMPT, None).await? {
                Ok(line) => {
                    let line = line.trim();

                    if line.is_empty() {
                        continue;
                    }

                    if line == "/" {
                        self.run_menu().await?;
                        continue;
                    }

                    self.execute_line(line).await;
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!();
                    self.running = false;
                }
                Err(err) => {
                    println!("Error: {:?}", err);
                    self.running = false;
                }
            }
        }

        self.save_history();
        Ok(())
    }

    /// Show the command menu and run what was picked
    async fn run_menu(&mut self) -> Result<()> {
        let items = command_menu::menu_items(&*self.holder.lock().await);

        let selection = tokio::task::spawn_blocking(move || command_menu::show_command_menu(&items))
            .await
            .map_err(|e| ShellError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;

        let initial = match selection {
            Ok(MenuResult::Command(item)) if item.takes_argument => format!("{} ", item.name),
            Ok(MenuResult::Command(item)) => item.name,
            Ok(MenuResult::TextInput) => "/".to_string(),
            Ok(MenuResult::Cancelled) => {
                println!();
                return Ok(());
            }
            Err(e) => {
                println!("Error showing menu: {}", e);
                return Ok(());
            }
        };

        match read_line(&self.editor, PROMPT, Some(initial)).await? {
            Ok(input) => {
                let input = input.trim();
                if !input.is_empty() {
                    self.execute_line(input).await;
                }
            }
            Err(ReadlineError::Interrupted) => println!("^C"),
            Err(ReadlineError::Eof) => {
                println!();
                self.running = false;
            }
            Err(err) => {
                println!("Error: {:?}", err);
                self.running = false;
            }
        }
        Ok(())
    }

    /// Parse and execute one input line, printing its result
    async fn execute_line(&mut self, line: &str) {
        // History failures are not critical
        let _ = self
            .editor
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .add_history_entry(line);

        match Command::parse(line) {
            Ok(command) => {
                println!("{}", self.handle_command(&command).await);
                if command.kind() == CommandKind::Quit {
                    self.running = false;
                }
            }
            Err(e) => println!("{}", format_error(&e)),
        }
    }

    /// Handle a command, turning any failure into printable text
    async fn handle_command(&mut self, command: &Command) -> String {
        let mut prompt = EditorPrompt {
            editor: Arc::clone(&self.editor),
        };
        let mut holder = self.holder.lock().await;
        match commands::handle_command(command, &mut holder, &mut prompt).await {
            Ok(msg) => msg,
            Err(e) => format_error(&e),
        }
    }

    fn save_history(&self) {
        if let Some(parent) = self.history_path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!(path = %parent.display(), error = %e, "could not create history directory");
                return;
            }
        }
        let mut editor = self
            .editor
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Err(e) = editor.save_history(&self.history_path) {
            warn!(path = %self.history_path.display(), error = %e, "could not save history");
        }
    }

    /// Print welcome message with the catalogs reported at startup
    pub fn print_welcome(&self, catalogs: &BTreeSet<String>) {
        println!();
        println!("                _ _              _          _ _ ");
        println!("   _____   __ (_) |_ __ _   ___| |__   ___| | |");
        println!("  / _ \\ \\ / / | | __/ _` | / __| '_ \\ / _ \\ | |");
        println!(" |  __/\\ V /  | | || (_| | \\__ \\ | | |  __/ | |");
        println!("  \\___| \\_/   |_|\\__\\__,_| |___/_| |_|\\___|_|_|");
        println!();
        println!("{}", catalog_banner(catalogs));
        println!("Type `help` for available commands, or / for the command menu.");
        println!();
    }
}
