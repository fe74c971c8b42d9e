mod cli;
mod commands {
    pub mod job;
    pub mod play;
    pub mod progress;
    pub mod puzzle;
    pub mod shared;
    pub mod sync;
}

use clap::Parser;
use cli::{Cli, Command, JobCmd, PlayCmd, ProgressCmd, PuzzleCmd, SyncCmd};
use ll_core::config::load_config;

fn main() {
    let cli = Cli::parse();
    let config = match load_config(cli.config.as_deref().map(std::path::Path::new)) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}: {}", err.code, err.message);
            std::process::exit(1);
        }
    };
    if let Err(err) = ll_core::telemetry::init(&config.logging) {
        eprintln!("{}: {}", err.code, err.message);
    }
    tracing::debug!(
        local_db = %config.storage.local_db_path.display(),
        server_db = %config.storage.server_db_path.display(),
        "loaded config"
    );

    let result = match cli.cmd {
        Command::Puzzle { cmd } => match cmd {
            PuzzleCmd::Today {
                server_db,
                date,
                identity,
            } => commands::puzzle::run_today(&config, server_db, date, identity),
        },
        Command::Job { cmd } => match cmd {
            JobCmd::DailyPuzzle {
                server_db,
                date,
                run_id,
            } => commands::job::run_daily_puzzle(&config, server_db, date, run_id),
        },
        Command::Progress { cmd } => match cmd {
            ProgressCmd::Save {
                local_db,
                date,
                score,
                time_taken,
                difficulty,
            } => commands::progress::run_save(&config, local_db, &date, score, time_taken, &difficulty),
            ProgressCmd::List { local_db, unsynced } => {
                commands::progress::run_list(&config, local_db, unsynced)
            }
            ProgressCmd::Heatmap { local_db, today } => {
                commands::progress::run_heatmap(&config, local_db, today)
            }
        },
        Command::Play { cmd } => match cmd {
            PlayCmd::Submit {
                local_db,
                server_db,
                date,
                time_taken,
                identity,
                grid,
            } => commands::play::run_submit(
                &config, local_db, server_db, date, time_taken, identity, &grid,
            ),
            PlayCmd::Hint {
                local_db,
                server_db,
                date,
                identity,
            } => commands::play::run_hint(&config, local_db, server_db, date, identity),
        },
        Command::Sync { cmd } => match cmd {
            SyncCmd::Run {
                local_db,
                target,
                identity,
            } => commands::sync::run_sync(&config, local_db, target, identity),
            SyncCmd::Status { local_db } => commands::sync::run_status(&config, local_db),
        },
    };

    if let Err(err) = result {
        eprintln!("{}: {}", err.code, err.message);
        std::process::exit(1);
    }
}
