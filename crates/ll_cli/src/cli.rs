use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "ll_cli")]
#[command(about = "Logic Looper CLI")]
pub struct Cli {
    /// Config file; defaults to ./logic-looper.toml when present.
    #[arg(long, global = true)]
    pub config: Option<String>,
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    Puzzle {
        #[command(subcommand)]
        cmd: PuzzleCmd,
    },
    Job {
        #[command(subcommand)]
        cmd: JobCmd,
    },
    Progress {
        #[command(subcommand)]
        cmd: ProgressCmd,
    },
    Play {
        #[command(subcommand)]
        cmd: PlayCmd,
    },
    Sync {
        #[command(subcommand)]
        cmd: SyncCmd,
    },
}

#[derive(Args, Clone, Default)]
pub struct IdentityArgs {
    #[arg(long = "user-id", requires = "email")]
    pub user_id: Option<String>,
    #[arg(long, requires = "user_id")]
    pub email: Option<String>,
}

#[derive(Subcommand)]
pub enum PuzzleCmd {
    /// Load (creating if needed) the puzzle for a day, as the home view does.
    Today {
        #[arg(long = "server-db")]
        server_db: Option<String>,
        #[arg(long)]
        date: Option<String>,
        #[command(flatten)]
        identity: IdentityArgs,
    },
}

#[derive(Subcommand)]
pub enum JobCmd {
    /// Scheduled daily provisioning; safe to run repeatedly.
    DailyPuzzle {
        #[arg(long = "server-db")]
        server_db: Option<String>,
        #[arg(long)]
        date: Option<String>,
        #[arg(long = "run-id")]
        run_id: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ProgressCmd {
    Save {
        #[arg(long = "local-db")]
        local_db: Option<String>,
        #[arg(long)]
        date: String,
        #[arg(long)]
        score: i64,
        #[arg(long = "time-taken")]
        time_taken: i64,
        #[arg(long)]
        difficulty: String,
    },
    List {
        #[arg(long = "local-db")]
        local_db: Option<String>,
        #[arg(long)]
        unsynced: bool,
    },
    Heatmap {
        #[arg(long = "local-db")]
        local_db: Option<String>,
        #[arg(long)]
        today: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum PlayCmd {
    /// Submit a full grid such as `1234,4321,2143,3412`; a solved grid is recorded.
    Submit {
        #[arg(long = "local-db")]
        local_db: Option<String>,
        #[arg(long = "server-db")]
        server_db: Option<String>,
        #[arg(long)]
        date: Option<String>,
        #[arg(long = "time-taken")]
        time_taken: Option<i64>,
        #[command(flatten)]
        identity: IdentityArgs,
        grid: String,
    },
    /// Reveal one cell of the day's puzzle, spending a hint.
    Hint {
        #[arg(long = "local-db")]
        local_db: Option<String>,
        #[arg(long = "server-db")]
        server_db: Option<String>,
        #[arg(long)]
        date: Option<String>,
        #[command(flatten)]
        identity: IdentityArgs,
    },
}

#[derive(Subcommand)]
pub enum SyncCmd {
    /// Sign in and reconcile unsynced local records with the server.
    Run {
        #[arg(long = "local-db")]
        local_db: Option<String>,
        /// Server target: a sqlite path or `sqlite://<path>`.
        #[arg(long)]
        target: Option<String>,
        #[command(flatten)]
        identity: IdentityArgs,
    },
    Status {
        #[arg(long = "local-db")]
        local_db: Option<String>,
    },
}
