use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::plan::Slot;

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "respite",
    version,
    about = "Respite: vacation day-planner and slot timer",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "rcfile", global = true)]
    pub rcfile: Option<PathBuf>,

    #[arg(long = "data", global = true)]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Assign a task to a time slot for the viewed date
    Assign { slot: Slot, task: String },

    /// Select the task the next timer run is credited to
    Select {
        /// Task name (palette emoji when known)
        task: Option<String>,

        /// Pick up whatever is assigned to this slot instead
        #[arg(long, conflicts_with = "task")]
        slot: Option<Slot>,
    },

    /// Start the timer for the selected task
    Start,

    /// Pause the timer, crediting elapsed whole minutes
    Pause,

    /// Pause and clear the selection
    Stop,

    /// One-shot view of selection and running timer
    Status,

    /// Live timer display (repaints every second)
    Watch,

    /// Show the five-slot board for the viewed date
    Show,

    /// Daily totals, busy slots and efficiency
    Stats,

    /// Show or change the viewed date (today, prev, next, YYYY-MM-DD)
    Date { expr: Option<String> },

    /// Days left until the end of the vacation
    Countdown,

    /// List palette chips, or add a custom one
    Tasks {
        #[command(subcommand)]
        action: Option<TasksCommand>,
    },

    /// Write the plan blob to a JSON file
    Export {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace the plan blob from a JSON file
    Import { path: PathBuf },

    /// Delete all planner data
    Clear {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum TasksCommand {
    /// Add a custom task chip to the palette
    Add { name: String },
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}
