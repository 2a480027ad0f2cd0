use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::Utc;
use hrms_leave::LeaveEngine;
use hrms_leave::clock::FixedClock;
use hrms_leave::csv::{
    DatedCommand, read_commands, read_employees, read_leave_types, write_balances,
};
use hrms_leave::store::MemoryStore;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: hrms-leave <leave_types.csv> <employees.csv> <commands.csv>";

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let [leave_types, employees, commands] = args.as_slice() else {
        eprintln!("{USAGE}");
        return ExitCode::FAILURE;
    };

    let store = Arc::new(MemoryStore::new());

    match read_leave_types(leave_types) {
        Ok(rows) => {
            for row in rows {
                match row {
                    Ok(leave_type) => store.add_leave_type(leave_type),
                    Err(e) => warn!("{e}"),
                }
            }
        }
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    }

    match read_employees(employees) {
        Ok(rows) => {
            for row in rows {
                match row {
                    Ok((employee, active)) => store.add_employee(employee, active),
                    Err(e) => warn!("{e}"),
                }
            }
        }
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    }

    if !commands.ends_with(".csv") {
        warn!(path = commands, "input file seems to not be a csv file");
    }
    let commands = match read_commands(PathBuf::from(commands)) {
        Ok(commands) => commands,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    // every command carries its business date, the clock follows it; rows sharing
    // a date would trip the per-minute submission limit, so there is none
    let clock = Arc::new(FixedClock::new(Utc::now()));
    let engine = LeaveEngine::new(Arc::clone(&store), clock.clone()).without_rate_limiter();
    let (cmd_sender, cmd_receiver) = tokio::sync::mpsc::channel::<DatedCommand>(16);

    tokio::spawn(async move {
        for result in commands {
            match result {
                Ok(dated) => {
                    if cmd_sender.send(dated).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("{e}");
                }
            }
        }
    });

    let stream = ReceiverStream::new(cmd_receiver).map(move |dated| {
        clock.set_date(dated.date);
        dated.command
    });
    engine.run(stream).await;

    if let Err(e) = write_balances(std::io::stdout().lock(), store.balances()) {
        error!("{e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
