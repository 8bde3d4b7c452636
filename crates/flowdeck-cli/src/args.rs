use clap::{Parser, Subcommand};

/// A thin, informative CLI over `flowdeck-sdk`: it exists to prove the
/// SDK surface is callable end-to-end, not to be a product in its own
/// right. No TUI, no syntax highlighting, no repo indexing here.
#[derive(Parser)]
#[command(name = "flowdeck", version, about = "Run a task through the flowdeck orchestration core")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Submit a task and drive it to completion, printing each step as
    /// it commits and prompting for any consultation the run raises.
    Run {
        /// The task description handed to the orchestrator.
        task: String,

        /// Refuse to let an LM impersonate the user once a consultation
        /// timeout elapses; the run suspends with a timeout error
        /// instead.
        #[arg(long)]
        no_ai_substitute: bool,
    },

    /// Inspect persisted sessions.
    Session {
        #[command(subcommand)]
        command: SessionCommand,
    },

    /// Manage named checkpoints within a session.
    Checkpoint {
        #[command(subcommand)]
        command: CheckpointCommand,
    },

    /// Workspace configuration.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Telemetry summary: aggregate tokens, cost-saved estimate, run count.
    Stats {
        /// Clear all recorded telemetry instead of printing a summary.
        #[arg(long)]
        reset: bool,
    },
}

#[derive(Subcommand)]
pub enum SessionCommand {
    /// List every session id known to the workspace.
    List,
    /// Print a session's full record as pretty JSON.
    Show {
        session_id: String,
    },
    /// Write a session's full record as JSON to stdout (same shape as
    /// `show`, named separately per the external CLI contract).
    Export {
        session_id: String,
    },
    /// Re-read a session, migrating it in place if it is in the legacy
    /// directory-of-shards layout.
    Migrate {
        session_id: String,
    },
}

#[derive(Subcommand)]
pub enum CheckpointCommand {
    /// Create a labelled checkpoint of a session at its current step.
    Save {
        session_id: String,
        label: String,
    },
    /// List a session's checkpoints.
    List {
        session_id: String,
    },
    /// Print the session state a checkpoint captured.
    Restore {
        session_id: String,
        checkpoint_id: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Load (migrating the legacy `config.json` if present) and re-save
    /// the workspace config in its current form.
    Migrate,
}
