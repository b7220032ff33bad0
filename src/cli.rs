use chrono::NaiveDate;
use clap::{ArgAction, Parser, Subcommand};
use local_todo_lists::Priority;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ltodo", version, about = "Named todo lists kept on this machine")]
pub struct Cli {
    /// Config file to use instead of $LTODO_CONFIG or the platform default
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log more (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage lists
    List {
        #[command(subcommand)]
        command: ListCommand,
    },
    /// Manage todos
    Todo {
        #[command(subcommand)]
        command: TodoCommand,
    },
    /// Remove todos whose list no longer exists
    Prune,
    /// Delete all lists and todos
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Read or change configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum ListCommand {
    /// Show all lists; the selected one is marked with `*`
    Show,
    /// Create a list and select it
    Add { name: String },
    Rename { id: String, name: String },
    /// Delete a list together with its todos
    Delete {
        id: String,
        #[arg(long)]
        yes: bool,
    },
    Select { id: String },
}

#[derive(Subcommand, Debug)]
pub enum TodoCommand {
    /// Show the todos of a list (default: the selected list)
    Show {
        #[arg(long)]
        list: Option<String>,
    },
    Add {
        title: String,
        /// Target list (default: the selected list)
        #[arg(long)]
        list: Option<String>,
        /// Due date as YYYY-MM-DD
        #[arg(long)]
        due: Option<NaiveDate>,
        /// none, low, medium or high
        #[arg(long)]
        priority: Option<Priority>,
    },
    /// Mark a todo complete
    Done { id: String },
    /// Mark a todo incomplete
    Undone { id: String },
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, conflicts_with = "clear_due")]
        due: Option<NaiveDate>,
        #[arg(long)]
        clear_due: bool,
        #[arg(long)]
        priority: Option<Priority>,
    },
    Delete {
        id: String,
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    Get { key: String },
    Set { key: String, value: String },
    Unset { key: String },
    List,
}
