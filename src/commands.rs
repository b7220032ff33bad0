use crate::cli::{Cli, Commands, ConfigCommand, ListCommand, TodoCommand};
use local_todo_lists::config::{ConfigError, ConfigManager};
use local_todo_lists::logging::init_logging;
use local_todo_lists::notify::Notifier;
use local_todo_lists::storage::Persistence;
use local_todo_lists::{Session, StoreContext, StoreError, TodoChanges};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

const SHORT_ID_LEN: usize = 8;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("No {kind} matches `{id}`")]
    NotFound { kind: &'static str, id: String },
    #[error("`{id}` matches more than one {kind}; use more characters")]
    Ambiguous { kind: &'static str, id: String },
    #[error("{0}")]
    InvalidInput(String),
    #[error("Stored data is corrupted: {0}\nRun `ltodo reset` to delete all data and start over.")]
    Corrupted(String),
}

/// Prints notifications the way the rest of the CLI talks.
struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn success(&self, message: &str) {
        println!("{message}");
    }

    fn warning(&self, message: &str) {
        eprintln!("Warning: {message}");
    }
}

pub fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = ConfigManager::new(cli.config.as_deref())?;

    let level = match cli.verbose {
        0 => config.log_level().to_string(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    };
    if let Err(e) = init_logging(&level, config.log_dir()?.as_deref()) {
        eprintln!("Warning: logging disabled: {e}");
    }

    let command = match cli.command {
        Commands::Config { command } => return run_config(&mut config, command),
        other => other,
    };

    let context = StoreContext::new(Persistence::new(config.create_storage()?))
        .with_notifier(Arc::new(TerminalNotifier));
    let mut session = Session::open(context, config.startup_policy());

    if let Commands::Reset { yes } = command {
        return reset(&mut session, yes);
    }
    if let Some(reason) = session.storage_error() {
        return Err(CliError::Corrupted(reason.to_string()));
    }

    match command {
        Commands::List { command } => run_list(&mut session, command),
        Commands::Todo { command } => run_todo(&mut session, &config, command),
        Commands::Prune => {
            let removed = session.prune_orphans()?;
            println!("Removed {removed} orphaned todo(s)");
            Ok(())
        }
        Commands::Reset { .. } | Commands::Config { .. } => Ok(()),
    }
}

fn reset(session: &mut Session, yes: bool) -> Result<(), CliError> {
    println!("Warning: This will delete all lists and todos");
    if !yes && !confirm("Continue? [y/N] ")? {
        println!("Operation cancelled");
        return Ok(());
    }
    session.reset();
    println!("Storage has been reset");
    Ok(())
}

fn run_list(session: &mut Session, command: ListCommand) -> Result<(), CliError> {
    match command {
        ListCommand::Show => {
            if session.lists().is_empty() {
                println!("No lists yet. Create one with `ltodo list add <name>`.");
            }
            for list in session.lists() {
                let marker = if session.selected_list_id() == Some(list.id) {
                    '*'
                } else {
                    ' '
                };
                let open = session
                    .todos_for_list(list.id)
                    .iter()
                    .filter(|t| !t.completed)
                    .count();
                println!("{marker} {} ({open} open) [{}]", list.name, short_id(list.id));
            }
        }
        ListCommand::Add { name } => match session.create_list(&name)? {
            Some(list) => println!("Selected \"{}\" [{}]", list.name, short_id(list.id)),
            None => return Err(CliError::InvalidInput("List name cannot be empty".to_string())),
        },
        ListCommand::Rename { id, name } => {
            let id = resolve_list(session, &id)?;
            if !session.rename_list(id, &name)? {
                return Err(CliError::InvalidInput("List name cannot be empty".to_string()));
            }
        }
        ListCommand::Delete { id, yes } => {
            let id = resolve_list(session, &id)?;
            let todo_count = session.todos_for_list(id).len();
            let name = session
                .lists()
                .iter()
                .find(|l| l.id == id)
                .map(|l| l.name.clone())
                .unwrap_or_default();
            let prompt = format!("Delete list \"{name}\" and its {todo_count} todo(s)? [y/N] ");
            if !yes && !confirm(&prompt)? {
                println!("Operation cancelled");
                return Ok(());
            }
            session.delete_list(id)?;
            match session.selected_list() {
                Some(list) => println!("Selected \"{}\"", list.name),
                None => println!("No list selected"),
            }
        }
        ListCommand::Select { id } => {
            let id = resolve_list(session, &id)?;
            session.select_list(id)?;
            if let Some(list) = session.selected_list() {
                println!("Selected \"{}\"", list.name);
            }
        }
    }
    Ok(())
}

fn run_todo(
    session: &mut Session,
    config: &ConfigManager,
    command: TodoCommand,
) -> Result<(), CliError> {
    match command {
        TodoCommand::Show { list } => {
            let list_id = target_list(session, list.as_deref())?;
            show_todos(session, list_id);
        }
        TodoCommand::Add {
            title,
            list,
            due,
            priority,
        } => {
            let list_id = target_list(session, list.as_deref())?;
            let priority = priority.unwrap_or_else(|| config.default_priority());
            match session.create_todo(list_id, &title, due, priority)? {
                Some(todo) => println!("[{}] {}", short_id(todo.id), todo.title),
                None => {
                    return Err(CliError::InvalidInput("Todo title cannot be empty".to_string()))
                }
            }
        }
        TodoCommand::Done { id } => {
            let id = resolve_todo(session, &id)?;
            session.update_todo(id, &TodoChanges::new().completed(true))?;
        }
        TodoCommand::Undone { id } => {
            let id = resolve_todo(session, &id)?;
            session.update_todo(id, &TodoChanges::new().completed(false))?;
        }
        TodoCommand::Edit {
            id,
            title,
            due,
            clear_due,
            priority,
        } => {
            let id = resolve_todo(session, &id)?;
            let mut changes = TodoChanges::new();
            if let Some(title) = title {
                changes = changes.title(title);
            }
            if clear_due {
                changes = changes.due_date(None);
            } else if let Some(due) = due {
                changes = changes.due_date(Some(due));
            }
            if let Some(priority) = priority {
                changes = changes.priority(priority);
            }
            if changes.is_empty() {
                return Err(CliError::InvalidInput("Nothing to change".to_string()));
            }
            if !session.update_todo(id, &changes)? {
                return Err(CliError::InvalidInput("Todo title cannot be empty".to_string()));
            }
        }
        TodoCommand::Delete { id, yes } => {
            let id = resolve_todo(session, &id)?;
            let title = session
                .todos()
                .iter()
                .find(|t| t.id == id)
                .map(|t| t.title.clone())
                .unwrap_or_default();
            if !yes && !confirm(&format!("Delete todo \"{title}\"? [y/N] "))? {
                println!("Operation cancelled");
                return Ok(());
            }
            session.delete_todo(id)?;
        }
    }
    Ok(())
}

fn show_todos(session: &Session, list_id: Uuid) {
    let name = session
        .lists()
        .iter()
        .find(|l| l.id == list_id)
        .map(|l| l.name.as_str())
        .unwrap_or_default();
    println!("{name}");

    let view = session.view_for_list(list_id);
    if view.is_empty() {
        println!("  No todos yet");
        return;
    }
    for todo in &view.active {
        let mut line = format!("  [ ] {}", todo.title);
        if let Some(due) = todo.due_date {
            line.push_str(&format!("  due {due}"));
            if view.is_overdue(todo) {
                line.push_str(" (overdue)");
            }
        }
        if todo.priority != local_todo_lists::Priority::None {
            line.push_str(&format!("  !{}", todo.priority));
        }
        println!("{line}  [{}]", short_id(todo.id));
    }
    if !view.completed.is_empty() {
        println!("Completed ({})", view.completed.len());
        for todo in &view.completed {
            println!("  [x] {}  [{}]", todo.title, short_id(todo.id));
        }
    }
}

fn run_config(config: &mut ConfigManager, command: ConfigCommand) -> Result<(), CliError> {
    match command {
        ConfigCommand::Get { key } => match config.get(&key)? {
            Some(value) => println!("{value}"),
            None => println!("null"),
        },
        ConfigCommand::Set { key, value } => {
            config.set(&key, &value)?;
            println!("{key} = {}", config.get(&key)?.unwrap_or_default());
        }
        ConfigCommand::Unset { key } => {
            config.unset(&key)?;
            println!("{key} unset");
        }
        ConfigCommand::List => {
            for (key, value, is_default) in config.list() {
                let suffix = if is_default { " (default)" } else { "" };
                println!("{key} = {value}{suffix}");
            }
        }
    }
    Ok(())
}

/// The given list, or the selected one.
fn target_list(session: &Session, given: Option<&str>) -> Result<Uuid, CliError> {
    match given {
        Some(id) => resolve_list(session, id),
        None => session.selected_list().map(|l| l.id).ok_or_else(|| {
            CliError::InvalidInput(
                "No list selected. Pass --list or run `ltodo list select <id>`.".to_string(),
            )
        }),
    }
}

fn resolve_list(session: &Session, given: &str) -> Result<Uuid, CliError> {
    resolve_id("list", given, session.lists().iter().map(|l| l.id))
}

fn resolve_todo(session: &Session, given: &str) -> Result<Uuid, CliError> {
    resolve_id("todo", given, session.todos().iter().map(|t| t.id))
}

/// Accepts a full id or any unambiguous prefix of one.
fn resolve_id<I>(kind: &'static str, given: &str, ids: I) -> Result<Uuid, CliError>
where
    I: IntoIterator<Item = Uuid>,
{
    let needle = given.trim().to_ascii_lowercase();
    if needle.is_empty() {
        return Err(CliError::NotFound {
            kind,
            id: given.to_string(),
        });
    }

    let mut matches = ids
        .into_iter()
        .filter(|id| id.to_string().starts_with(&needle));
    match (matches.next(), matches.next()) {
        (Some(id), None) => Ok(id),
        (Some(_), Some(_)) => Err(CliError::Ambiguous {
            kind,
            id: given.to_string(),
        }),
        (None, _) => Err(CliError::NotFound {
            kind,
            id: given.to_string(),
        }),
    }
}

fn short_id(id: Uuid) -> String {
    id.to_string()[..SHORT_ID_LEN].to_string()
}

fn confirm(prompt: &str) -> io::Result<bool> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(is_affirmative(&answer))
}

fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
