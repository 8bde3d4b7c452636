use std::io::Write;

use flowdeck_engine::StepOutcome;
use flowdeck_sdk::{Client, SessionId, SubmitOptions};

use crate::args::{CheckpointCommand, Command, ConfigCommand, SessionCommand};
use crate::output;

/// Exit codes agreed at the CLI boundary (spec §6): 0 success, 1
/// user-error, 2 orchestration-suspended, 3 configuration-error.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_USER_ERROR: i32 = 1;
pub const EXIT_SUSPENDED: i32 = 2;
pub const EXIT_CONFIG_ERROR: i32 = 3;

pub async fn dispatch(command: Command) -> i32 {
    match command {
        Command::Run { task, no_ai_substitute } => run_task(task, no_ai_substitute).await,
        Command::Session { command } => session_command(command),
        Command::Checkpoint { command } => checkpoint_command(command).await,
        Command::Config { command } => config_command(command),
        Command::Stats { reset } => stats_command(reset),
    }
}

async fn run_task(task: String, no_ai_substitute: bool) -> i32 {
    let client = match connect() {
        Ok(client) => client,
        Err(code) => return code,
    };

    let options = SubmitOptions { allow_ai_substitute: !no_ai_substitute, ..SubmitOptions::default() };
    let mut run = match client.submit(task, options).await {
        Ok(run) => run,
        Err(err) => {
            eprintln!("Error: {err}");
            return EXIT_USER_ERROR;
        }
    };

    println!("session {}", run.id());

    let mut events = run.events();
    let event_printer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            output::print_event(&event);
        }
    });

    loop {
        if let Some(pending) = run.try_next_consultation() {
            answer_consultation(pending);
            continue;
        }

        match run.step().await {
            Ok(StepOutcome::Committed { .. }) => continue,
            Ok(outcome @ StepOutcome::Suspended { .. }) => {
                let session = run.state().await;
                output::print_step_outcome(&outcome, &session);
                event_printer.abort();
                return EXIT_SUSPENDED;
            }
            Ok(outcome @ StepOutcome::Terminated { .. }) => {
                let session = run.state().await;
                output::print_step_outcome(&outcome, &session);
                event_printer.abort();
                return EXIT_SUCCESS;
            }
            Err(err) => {
                eprintln!("Error: {err}");
                event_printer.abort();
                return EXIT_USER_ERROR;
            }
        }
    }
}

fn answer_consultation(pending: flowdeck_runtime::PendingConsultation) {
    println!();
    println!("consultation: {}", pending.request.question);
    if !pending.request.context.is_empty() {
        println!("context: {}", pending.request.context);
    }
    if !pending.request.options.is_empty() {
        println!("options: {}", pending.request.options.join(", "));
    }
    print!("> ");
    let _ = std::io::stdout().flush();

    let mut answer = String::new();
    if std::io::stdin().read_line(&mut answer).is_err() {
        answer.clear();
    }
    pending.answer(answer.trim().to_string());
}

fn session_command(command: SessionCommand) -> i32 {
    let client = match connect() {
        Ok(client) => client,
        Err(code) => return code,
    };
    let sessions = client.sessions();

    match command {
        SessionCommand::List => match sessions.list() {
            Ok(ids) => {
                for id in ids {
                    println!("{id}");
                }
                EXIT_SUCCESS
            }
            Err(err) => user_error(err),
        },
        SessionCommand::Show { session_id } | SessionCommand::Migrate { session_id } => {
            match parse_session_id(&session_id).and_then(|id| sessions.export(id)) {
                Ok(json) => {
                    println!("{json}");
                    EXIT_SUCCESS
                }
                Err(code) => code,
            }
        }
        SessionCommand::Export { session_id } => match parse_session_id(&session_id).and_then(|id| sessions.export(id)) {
            Ok(json) => {
                println!("{json}");
                EXIT_SUCCESS
            }
            Err(code) => code,
        },
    }
}

async fn checkpoint_command(command: CheckpointCommand) -> i32 {
    let client = match connect() {
        Ok(client) => client,
        Err(code) => return code,
    };
    let sessions = client.sessions();

    match command {
        CheckpointCommand::Save { session_id, label } => {
            let id = match parse_session_id_raw(&session_id) {
                Ok(id) => id,
                Err(code) => return code,
            };
            match sessions.save_checkpoint(id, label).await {
                Ok(checkpoint_id) => {
                    println!("{checkpoint_id}");
                    EXIT_SUCCESS
                }
                Err(err) => user_error(err),
            }
        }
        CheckpointCommand::List { session_id } => {
            let id = match parse_session_id_raw(&session_id) {
                Ok(id) => id,
                Err(code) => return code,
            };
            match sessions.list_checkpoints(id) {
                Ok(checkpoints) => {
                    for checkpoint in checkpoints {
                        println!("{}  ({} .. {})", checkpoint.id, checkpoint.step_range.0.value(), checkpoint.step_range.1.value());
                    }
                    EXIT_SUCCESS
                }
                Err(err) => user_error(err),
            }
        }
        CheckpointCommand::Restore { session_id, checkpoint_id } => {
            let id = match parse_session_id_raw(&session_id) {
                Ok(id) => id,
                Err(code) => return code,
            };
            let checkpoint = flowdeck_types::CheckpointId::new(checkpoint_id);
            match sessions.restore_checkpoint(id, &checkpoint) {
                Ok(session) => match serde_json::to_string_pretty(&session) {
                    Ok(json) => {
                        println!("{json}");
                        EXIT_SUCCESS
                    }
                    Err(err) => {
                        eprintln!("Error: {err}");
                        EXIT_USER_ERROR
                    }
                },
                Err(err) => user_error(err),
            }
        }
    }
}

fn config_command(command: ConfigCommand) -> i32 {
    match command {
        ConfigCommand::Migrate => match flowdeck_runtime::Config::default_path().and_then(|path| {
            let config = flowdeck_runtime::Config::load_from(&path)?;
            config.save_to(&path)?;
            Ok(path)
        }) {
            Ok(path) => {
                println!("config migrated at {}", path.display());
                EXIT_SUCCESS
            }
            Err(err) => {
                eprintln!("Error: {err}");
                EXIT_CONFIG_ERROR
            }
        },
    }
}

fn stats_command(reset: bool) -> i32 {
    let client = match connect() {
        Ok(client) => client,
        Err(code) => return code,
    };

    if reset {
        return match client.telemetry().reset() {
            Ok(()) => {
                println!("telemetry reset");
                EXIT_SUCCESS
            }
            Err(err) => user_error(err),
        };
    }

    match client.telemetry().read_all() {
        Ok(records) => {
            let runs = records.len();
            let total_tokens: u64 = records.iter().map(|r| r.total_tokens).sum();
            let total_cost_saved: f64 = records.iter().map(|r| r.estimated_cost_saved).sum();
            let successes = records.iter().filter(|r| r.success).count();
            println!("runs: {runs} (successful: {successes})");
            println!("total tokens: {total_tokens}");
            println!("estimated cost saved: ${total_cost_saved:.2}");
            EXIT_SUCCESS
        }
        Err(err) => user_error(err),
    }
}

fn connect() -> Result<Client, i32> {
    Client::connect_default().map_err(|err| {
        eprintln!("Error: {err}");
        EXIT_CONFIG_ERROR
    })
}

fn parse_session_id(raw: &str) -> Result<SessionId, i32> {
    raw.parse().map_err(|_| {
        eprintln!("Error: '{raw}' is not a valid session id");
        EXIT_USER_ERROR
    })
}

fn parse_session_id_raw(raw: &str) -> Result<SessionId, i32> {
    parse_session_id(raw)
}

fn user_error(err: impl std::fmt::Display) -> i32 {
    eprintln!("Error: {err}");
    EXIT_USER_ERROR
}
