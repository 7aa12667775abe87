//! Command handlers for CLI
//!
//! This module holds the command table (name, argument shape, availability)
//! and implements every shell command against the session holder.

use crate::cli::prompt::Prompt;
use crate::database::schema::example_schemas;
use crate::error::{Result, ShellError};
use crate::session::holder::{CloseOutcome, SessionHolder};
use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, Table};
use std::fmt;

/// Command kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    CreateCatalog,
    OpenCatalog,
    CloseCatalog,
    DeleteCatalog,
    ListCatalogs,
    ListCollections,
    SetupExampleCollections,
    Help,
    Quit,
}

/// Arguments a command accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgShape {
    /// No arguments
    None,
    /// Optional catalog name, asked for interactively when omitted
    OptionalCatalogName { prompt: &'static str },
}

/// Whether a command can run in the current holder state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    Available,
    Unavailable { reason: &'static str },
}

/// Entry of the command table
pub struct CommandSpec {
    pub kind: CommandKind,
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub group: &'static str,
    pub usage: &'static str,
    pub description: &'static str,
    pub arg: ArgShape,
    pub availability: fn(&SessionHolder) -> Availability,
}

impl CommandSpec {
    /// Evaluate the availability predicate against the current holder state
    pub fn availability(&self, holder: &SessionHolder) -> Availability {
        (self.availability)(holder)
    }

    fn matches(&self, name: &str) -> bool {
        self.name == name || self.aliases.contains(&name)
    }
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSpec")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

// Each kind has exactly one table entry
impl PartialEq for CommandSpec {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Eq for CommandSpec {}

fn always(_: &SessionHolder) -> Availability {
    Availability::Available
}

fn when_connected(holder: &SessionHolder) -> Availability {
    if holder.is_connected() {
        Availability::Available
    } else {
        Availability::Unavailable {
            reason: "the shell is not connected to the catalog service",
        }
    }
}

fn when_session_open(holder: &SessionHolder) -> Availability {
    if holder.has_session() {
        Availability::Available
    } else {
        Availability::Unavailable {
            reason: "there is no open session, use `open-catalog` first",
        }
    }
}

const CATALOG_GROUP: &str = "Catalog operations";
const COLLECTION_GROUP: &str = "Collection operations";
const SHELL_GROUP: &str = "Shell";

/// All commands understood by the shell
pub static COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        kind: CommandKind::CreateCatalog,
        name: "create-catalog",
        aliases: &[],
        group: CATALOG_GROUP,
        usage: "create-catalog [name]",
        description: "defines a new catalog",
        arg: ArgShape::OptionalCatalogName { prompt: "Catalog name:" },
        availability: when_connected,
    },
    CommandSpec {
        kind: CommandKind::OpenCatalog,
        name: "open-catalog",
        aliases: &[],
        group: CATALOG_GROUP,
        usage: "open-catalog [name]",
        description: "opens catalog for work with entities",
        arg: ArgShape::OptionalCatalogName { prompt: "Catalog name:" },
        availability: when_connected,
    },
    CommandSpec {
        kind: CommandKind::CloseCatalog,
        name: "close-catalog",
        aliases: &[],
        group: CATALOG_GROUP,
        usage: "close-catalog",
        description: "closes opened session to catalog",
        arg: ArgShape::None,
        availability: when_connected,
    },
    CommandSpec {
        kind: CommandKind::DeleteCatalog,
        name: "delete-catalog",
        aliases: &[],
        group: CATALOG_GROUP,
        usage: "delete-catalog [name]",
        description: "deletes an existing catalog (irreversibly)",
        arg: ArgShape::OptionalCatalogName {
            prompt: "Catalog name to drop:",
        },
        availability: when_connected,
    },
    CommandSpec {
        kind: CommandKind::ListCatalogs,
        name: "list-catalogs",
        aliases: &[],
        group: CATALOG_GROUP,
        usage: "list-catalogs",
        description: "lists all available catalogs",
        arg: ArgShape::None,
        availability: when_connected,
    },
    CommandSpec {
        kind: CommandKind::ListCollections,
        name: "list-collections",
        aliases: &[],
        group: COLLECTION_GROUP,
        usage: "list-collections",
        description: "lists entity collections of the open catalog",
        arg: ArgShape::None,
        availability: when_session_open,
    },
    CommandSpec {
        kind: CommandKind::SetupExampleCollections,
        name: "setup-example-collections",
        aliases: &[],
        group: COLLECTION_GROUP,
        usage: "setup-example-collections",
        description: "creates example entity collections in the open catalog",
        arg: ArgShape::None,
        availability: when_session_open,
    },
    CommandSpec {
        kind: CommandKind::Help,
        name: "help",
        aliases: &[],
        group: SHELL_GROUP,
        usage: "help",
        description: "shows available commands",
        arg: ArgShape::None,
        availability: always,
    },
    CommandSpec {
        kind: CommandKind::Quit,
        name: "exit",
        aliases: &["quit"],
        group: SHELL_GROUP,
        usage: "exit, quit",
        description: "closes the session and leaves the shell",
        arg: ArgShape::None,
        availability: always,
    },
];

/// Look up a command by name or alias
pub fn find_command(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|spec| spec.matches(name))
}

/// Names of all commands and aliases, for completion
pub fn command_names() -> Vec<&'static str> {
    COMMANDS
        .iter()
        .flat_map(|spec| std::iter::once(spec.name).chain(spec.aliases.iter().copied()))
        .collect()
}

/// Parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Table entry of the command
    pub spec: &'static CommandSpec,
    /// Supplied argument, if any
    pub argument: Option<String>,
}

impl Command {
    /// Parse a command from user input
    ///
    /// A leading `/` is accepted. The catalog name is the rest of the line,
    /// with one pair of surrounding quotes or backticks removed.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let input = input.strip_prefix('/').unwrap_or(input);

        let (name, rest) = match input.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (input, ""),
        };

        let spec = find_command(name).ok_or_else(|| ShellError::UnknownCommand(name.to_string()))?;

        let argument = match spec.arg {
            ArgShape::None if !rest.is_empty() => {
                return Err(ShellError::InvalidCommandSyntax {
                    command: spec.name.to_string(),
                    expected: spec.usage.to_string(),
                });
            }
            ArgShape::None => None,
            ArgShape::OptionalCatalogName { .. } => {
                let value = unquote(rest);
                (!value.is_empty()).then(|| value.to_string())
            }
        };

        Ok(Command { spec, argument })
    }

    pub fn kind(&self) -> CommandKind {
        self.spec.kind
    }
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\'', '`'] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner.trim();
        }
    }
    value
}

/// Message shown when a command is not available in the current state
pub fn unavailable_message(spec: &CommandSpec, reason: &str) -> String {
    format!(
        "Command `{}` exists but is not currently available because {}.",
        spec.name, reason
    )
}

/// Handle a command and return the result message
///
/// Availability is evaluated against the holder on every call.
pub async fn handle_command(
    command: &Command,
    holder: &mut SessionHolder,
    prompt: &mut dyn Prompt,
) -> Result<String> {
    let spec = command.spec;
    if let Availability::Unavailable { reason } = spec.availability(holder) {
        return Ok(unavailable_message(spec, reason));
    }

    let name = match spec.arg {
        ArgShape::None => None,
        ArgShape::OptionalCatalogName { prompt: label } => {
            match resolve_catalog_name(command.argument.as_deref(), prompt, label).await {
                Ok(name) => Some(name),
                Err(ShellError::PromptCancelled) => return Ok("Input cancelled.".to_string()),
                Err(ShellError::InvalidCatalogName(_)) => {
                    return Ok("Catalog name must not be empty.".to_string())
                }
                Err(e) => return Err(e),
            }
        }
    };
    let name = name.as_deref().unwrap_or_default();

    match spec.kind {
        CommandKind::CreateCatalog => create_catalog(holder, name).await,
        CommandKind::OpenCatalog => Ok(holder.open_session(name).await?.to_string()),
        CommandKind::CloseCatalog => Ok(holder.close_session().await?.to_string()),
        CommandKind::DeleteCatalog => delete_catalog(holder, name).await,
        CommandKind::ListCatalogs => list_catalogs(holder).await,
        CommandKind::ListCollections => list_collections(holder).await,
        CommandKind::SetupExampleCollections => setup_example_collections(holder).await,
        CommandKind::Help => Ok(help_text(holder)),
        CommandKind::Quit => Ok("Goodbye!".to_string()),
    }
}

async fn resolve_catalog_name(
    supplied: Option<&str>,
    prompt: &mut dyn Prompt,
    label: &str,
) -> Result<String> {
    let name = match supplied {
        Some(name) => name.to_string(),
        None => prompt.prompt_for_string(label).await?,
    };
    let name = unquote(name.trim()).to_string();
    if name.is_empty() {
        return Err(ShellError::InvalidCatalogName(name));
    }
    Ok(name)
}

async fn create_catalog(holder: &SessionHolder, name: &str) -> Result<String> {
    let client = holder.client().ok_or(ShellError::NotConnected)?;
    if client.catalog_exists(name).await? {
        return Ok(format!("Catalog `{}` already exists.", name));
    }
    let descriptor = client.define_catalog(name).await?;
    Ok(format!("Catalog `{}` was created.", descriptor.name))
}

async fn delete_catalog(holder: &mut SessionHolder, name: &str) -> Result<String> {
    let client = holder.client().ok_or(ShellError::NotConnected)?;
    if !client.delete_catalog_if_exists(name).await? {
        return Ok(format!("Catalog `{}` doesn't exist.", name));
    }

    let mut output = String::new();
    // The session goes with its catalog; a failed delete leaves both in place.
    if holder.invalidate_session_for(name).await {
        output.push_str(&CloseOutcome::Closed { catalog: name.to_string() }.to_string());
        output.push('\n');
    }
    output.push_str(&format!("Catalog `{}` was deleted.", name));
    Ok(output)
}

async fn list_catalogs(holder: &SessionHolder) -> Result<String> {
    let client = holder.client().ok_or(ShellError::NotConnected)?;
    let catalogs = client.catalog_names().await?;
    Ok(catalogs
        .iter()
        .enumerate()
        .map(|(idx, name)| format!("   {}. {}\n", idx + 1, name))
        .collect())
}

async fn list_collections(holder: &SessionHolder) -> Result<String> {
    let Some(session) = holder.session() else {
        return Ok(CloseOutcome::NoneOpen.to_string());
    };

    let entity_types = session.entity_types().await?;
    if entity_types.is_empty() {
        return Ok(format!(
            "No entity collections present in catalog `{}`.",
            session.catalog_name()
        ));
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["#", "Entity collection", "Entities"]);

    for (idx, entity_type) in entity_types.iter().enumerate() {
        let size = session.entity_collection_size(entity_type).await?;
        table.add_row(vec![
            Cell::new(idx + 1),
            Cell::new(entity_type),
            Cell::new(size).set_alignment(CellAlignment::Right),
        ]);
    }

    Ok(format!(
        "Entity collections in catalog `{}`:\n{}",
        session.catalog_name(),
        table
    ))
}

async fn setup_example_collections(holder: &SessionHolder) -> Result<String> {
    let Some(session) = holder.session() else {
        return Ok(CloseOutcome::NoneOpen.to_string());
    };

    let existing = session.entity_types().await?;
    let mut lines = Vec::new();
    for schema in example_schemas() {
        if existing.contains(&schema.name) {
            lines.push(format!(
                "Entity collection `{}` already exists, skipped.",
                schema.name
            ));
            continue;
        }
        session.define_entity_schema(&schema).await?;
        lines.push(format!("Entity collection `{}` created.", schema.name));
    }
    Ok(lines.join("\n"))
}

/// Help listing with current availability of each command
pub fn help_text(holder: &SessionHolder) -> String {
    let mut help = String::from("\nevita-shell commands\n");
    let mut group = "";
    for spec in COMMANDS {
        if spec.group != group {
            group = spec.group;
            help.push_str(&format!("\n{}:\n", group));
        }
        help.push_str(&format!("  {:<28} {}", spec.usage, spec.description));
        if let Availability::Unavailable { .. } = spec.availability(holder) {
            help.push_str(" (unavailable)");
        }
        help.push('\n');
    }
    help.push_str("\nCommands may be prefixed with `/`. Type `/` alone to open the command menu.\n");
    help
}

/// Format an error for display
pub fn format_error(error: &ShellError) -> String {
    format!("Error: {}", error)
}
