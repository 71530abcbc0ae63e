//! Command handlers. Results go to stdout as JSON; logs go to stderr.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use matchng_core::{ActionId, Job, JobId, Role, UserId, UserProfile};
use matchng_events::Topic;
use matchng_offline::{MutationOutcome, ReplayReport, SyncWorker};
use matchng_store::SessionStore;

use crate::app::App;

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("failed to render output")?;
    println!("{out}");
    Ok(())
}

fn report_json(report: &ReplayReport) -> serde_json::Value {
    json!({
        "applied": report.applied,
        "retried": report.retried,
        "deadLettered": report.dead_lettered,
        "notDue": report.not_due,
        "deferred": report.deferred,
    })
}

async fn require_user(app: &App, id: &UserId) -> anyhow::Result<UserProfile> {
    app.users
        .get_user(id)
        .await?
        .with_context(|| format!("no user with id `{id}`"))
}

async fn require_job(app: &App, id: &JobId) -> anyhow::Result<Job> {
    app.jobs
        .get_job(id)
        .await?
        .with_context(|| format!("no job with id `{id}`"))
}

pub async fn recommend(app: &App, user_id: UserId, limit: Option<usize>) -> anyhow::Result<()> {
    let seeker = require_user(app, &user_id).await?;
    let jobs = app.jobs.list_jobs().await?;

    let mut matches = app.engine.get_recommendations(&seeker, &jobs);
    if let Some(limit) = limit {
        matches.truncate(limit);
    }
    print_json(&matches)
}

pub async fn match_pair(app: &App, user_id: UserId, job_id: JobId) -> anyhow::Result<()> {
    let seeker = require_user(app, &user_id).await?;
    let job = require_job(app, &job_id).await?;
    print_json(&app.engine.compute_match(&seeker, &job))
}

pub async fn candidates(app: &App, job_id: JobId, limit: Option<usize>) -> anyhow::Result<()> {
    let job = require_job(app, &job_id).await?;
    let seekers: Vec<UserProfile> = app
        .users
        .list_users()
        .await?
        .into_iter()
        .filter(|u| u.role == Role::Seeker)
        .collect();

    let mut ranked = app.engine.rank_candidates(&job, &seekers);
    if let Some(limit) = limit {
        ranked.truncate(limit);
    }
    print_json(&ranked)
}

fn read_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

pub async fn import_users(app: &App, path: &Path) -> anyhow::Result<()> {
    let users: Vec<UserProfile> = read_json_file(path)?;
    let count = users.len();
    for user in users {
        app.users.save_user(user).await?;
    }
    info!(count, file = %path.display(), "users imported");
    print_json(&json!({ "imported": count }))
}

pub async fn import_jobs(app: &App, path: &Path) -> anyhow::Result<()> {
    let jobs: Vec<Job> = read_json_file(path)?;
    let count = jobs.len();
    for job in jobs {
        app.jobs.save_job(job).await?;
    }
    info!(count, file = %path.display(), "jobs imported");
    print_json(&json!({ "imported": count }))
}

#[derive(Debug, Clone, Copy)]
pub enum Mutation {
    Apply,
    ToggleSave,
}

pub async fn mutate(
    app: &App,
    mutation: Mutation,
    user_id: UserId,
    job_id: JobId,
) -> anyhow::Result<()> {
    require_user(app, &user_id).await?;
    let session = SessionStore::new(Arc::clone(&app.store)).start(user_id).await?;

    let outcome = match mutation {
        Mutation::Apply => app.actions.apply(&session, job_id).await?,
        Mutation::ToggleSave => app.actions.toggle_save(&session, job_id).await?,
    };

    match outcome {
        MutationOutcome::Applied => print_json(&json!({ "outcome": "applied" })),
        MutationOutcome::Queued(id) => {
            print_json(&json!({ "outcome": "queued", "actionId": id.to_string() }))
        }
    }
}

pub async fn queue_list(app: &App) -> anyhow::Result<()> {
    print_json(&app.queue.list_pending().await?)
}

pub async fn queue_replay(app: &App) -> anyhow::Result<()> {
    let tick = app.coordinator.tick().await?;
    match tick.report {
        Some(report) => print_json(&report_json(&report)),
        None if !app.coordinator.monitor().is_online() => {
            bail!("offline; queued actions were left in place")
        }
        None => print_json(&report_json(&ReplayReport::default())),
    }
}

pub async fn queue_dead(app: &App, requeue: Option<ActionId>, clear: bool) -> anyhow::Result<()> {
    if let Some(id) = requeue {
        let action = app.queue.requeue_dead_letter(id).await?;
        return print_json(&action);
    }
    if clear {
        let cleared = app.queue.clear_dead_letters().await?;
        return print_json(&json!({ "cleared": cleared }));
    }
    print_json(&app.queue.dead_letters().await?)
}

/// Stage `raw` (a JSON document) as draft `id`. The write lands after the
/// debounce window or when the app shuts down, whichever comes first.
pub fn draft_put(app: &App, id: &str, raw: &str) -> anyhow::Result<()> {
    let value: Value =
        serde_json::from_str(raw).with_context(|| format!("draft `{id}` is not valid JSON"))?;
    app.drafts.schedule_draft(id, &value)?;
    print_json(&json!({ "draft": id, "pending": app.drafts.pending_len() }))
}

pub async fn draft_show(app: &App, id: &str) -> anyhow::Result<()> {
    let value: Option<Value> = app.store.get_draft(id).await?;
    print_json(&json!({ "draft": id, "value": value }))
}

pub async fn draft_discard(app: &App, id: &str) -> anyhow::Result<()> {
    app.drafts.discard_draft(id).await?;
    print_json(&json!({ "discarded": id }))
}

pub async fn usage(app: &App) -> anyhow::Result<()> {
    let percent = app.store.get_usage().await?;
    print_json(&json!({ "usagePercent": (percent * 100.0).round() / 100.0 }))
}

/// How often `sync` looks for writes made by other processes.
const REMOTE_CHECK: Duration = Duration::from_millis(500);

/// Run the background sync worker until Ctrl-C. Writes by other processes on
/// the same store (say, an `apply` queued while offline) trigger an extra
/// sync tick instead of waiting for the next interval.
pub async fn sync(app: &App) -> anyhow::Result<()> {
    let handle = SyncWorker::spawn(Arc::clone(&app.coordinator), app.offline.sync_interval);
    let remote = app.store.notifier().subscribe_remote(Topic::StoreChanged);
    let mut check = tokio::time::interval(REMOTE_CHECK);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            res = &mut ctrl_c => {
                res.context("failed to listen for Ctrl-C")?;
                break;
            }
            _ = check.tick() => {
                let Some(remote) = &remote else { continue };
                if remote.drain() == 0 {
                    continue;
                }
                info!("store changed by another process");
                if let Err(err) = app.coordinator.tick().await {
                    warn!(error = %err, "sync after remote change failed");
                }
            }
        }
    }

    handle.shutdown().await;
    Ok(())
}
