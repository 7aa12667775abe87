//! CLI module
//!
//! This module provides the command-line interface for evita-shell,
//! including the REPL implementation and command handlers.

pub mod command_menu;
pub mod commands;
pub mod prompt;
pub mod repl;
pub mod terminal;

// Re-exports
pub use commands::{handle_command, Command, CommandKind};
pub use prompt::{Prompt, ScriptedPrompt};
pub use repl::Repl;
pub use terminal::TerminalMode;
