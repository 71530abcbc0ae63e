//! `matchng` — operator CLI over a local matchNG store.
//!
//! # Commands
//!
//! - `recommend`, `match`, `candidates`: run the ranking engine over stored data
//! - `import-users`, `import-jobs`: load JSON arrays into the store
//! - `apply`, `save`: mutate a profile the way the app does (queued if offline)
//! - `queue list|replay|dead`: inspect and drive the offline action queue
//! - `draft put|show|discard`: debounced form drafts
//! - `usage`: storage quota usage
//! - `sync`: run the background sync worker until Ctrl-C

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use matchng_core::{ActionId, JobId, UserId};
use matchng_offline::OfflineConfig;
use matchng_store::StoreConfig;

mod app;
mod commands;

use app::App;
use commands::Mutation;

#[derive(Parser)]
#[command(name = "matchng")]
#[command(version)]
#[command(about = "Job matching and offline-first storage for matchNG")]
#[command(propagate_version = true)]
struct Cli {
    /// SQLite store to use (default: `{data_dir}/matchng/store.db`)
    #[arg(long, global = true, env = "MATCHNG_DB_PATH")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ranked job recommendations for a seeker
    Recommend {
        user_id: UserId,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Score one seeker against one job, with no filtering
    Match { user_id: UserId, job_id: JobId },
    /// Ranked seekers for a job
    Candidates {
        job_id: JobId,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Import a JSON array of user profiles (upsert by id)
    ImportUsers { file: PathBuf },
    /// Import a JSON array of jobs (upsert by id)
    ImportJobs { file: PathBuf },
    /// Apply to a job on behalf of a user
    Apply { user_id: UserId, job_id: JobId },
    /// Toggle a saved job for a user
    Save { user_id: UserId, job_id: JobId },
    /// Offline action queue
    Queue {
        #[command(subcommand)]
        action: QueueCommands,
    },
    /// Form drafts, evicted first when storage runs out
    Draft {
        #[command(subcommand)]
        action: DraftCommands,
    },
    /// Storage quota usage in percent
    Usage,
    /// Replay queued actions periodically until interrupted
    Sync,
}

#[derive(Subcommand)]
enum QueueCommands {
    /// Pending actions in replay order
    List,
    /// Probe connectivity and replay due actions now
    Replay,
    /// Dead-lettered actions
    Dead {
        /// Move this action back into the queue
        #[arg(long, conflicts_with = "clear")]
        requeue: Option<ActionId>,
        /// Drop every dead letter
        #[arg(long)]
        clear: bool,
    },
}

#[derive(Subcommand)]
enum DraftCommands {
    /// Stage a JSON value as a draft (written after the debounce window)
    Put { id: String, value: String },
    /// Print a stored draft
    Show { id: String },
    /// Drop a draft, including a write still waiting
    Discard { id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    matchng_observability::init();
    let cli = Cli::parse();

    let mut store_config = StoreConfig::from_env();
    if cli.db.is_some() {
        store_config.db_path = cli.db;
    }
    let app = App::open(store_config, OfflineConfig::from_env()).await?;

    let result = run(&app, cli.command).await;
    let closed = app.shutdown().await;
    result.and(closed)
}

async fn run(app: &App, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Recommend { user_id, limit } => commands::recommend(app, user_id, limit).await,
        Commands::Match { user_id, job_id } => commands::match_pair(app, user_id, job_id).await,
        Commands::Candidates { job_id, limit } => commands::candidates(app, job_id, limit).await,
        Commands::ImportUsers { file } => commands::import_users(app, &file).await,
        Commands::ImportJobs { file } => commands::import_jobs(app, &file).await,
        Commands::Apply { user_id, job_id } => {
            commands::mutate(app, Mutation::Apply, user_id, job_id).await
        }
        Commands::Save { user_id, job_id } => {
            commands::mutate(app, Mutation::ToggleSave, user_id, job_id).await
        }
        Commands::Queue { action } => match action {
            QueueCommands::List => commands::queue_list(app).await,
            QueueCommands::Replay => commands::queue_replay(app).await,
            QueueCommands::Dead { requeue, clear } => {
                commands::queue_dead(app, requeue, clear).await
            }
        },
        Commands::Draft { action } => match action {
            DraftCommands::Put { id, value } => commands::draft_put(app, &id, &value),
            DraftCommands::Show { id } => commands::draft_show(app, &id).await,
            DraftCommands::Discard { id } => commands::draft_discard(app, &id).await,
        },
        Commands::Usage => commands::usage(app).await,
        Commands::Sync => commands::sync(app).await,
    }
}
