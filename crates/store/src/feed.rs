//! Change signals carried between processes through the SQLite file.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::Context;
use sqlx::Row;
use sqlx::sqlite::SqlitePool;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use matchng_core::InstanceId;
use matchng_events::{BusError, ChangeSignal, EventBus, SignalBus, Subscription, Topic};

use crate::backend::SqliteBackend;

/// Rows kept in `change_log`; older ones are pruned after each append.
const RETAINED_SIGNALS: i64 = 1_024;

/// [`SharedChannel`](matchng_events::SharedChannel) for every process that
/// opens the same SQLite store.
///
/// Published signals are appended to a `change_log` table by a writer task.
/// A poller task reads rows past the last one it saw and re-broadcasts them
/// in-process, so each attached process hears every other one at most one
/// poll interval late. Rows written before [`attach`](Self::attach) are not
/// replayed.
pub struct SqliteChangeFeed {
    local: SignalBus,
    outbox: Mutex<Option<mpsc::UnboundedSender<ChangeSignal>>>,
    writer: Mutex<Option<JoinHandle<()>>>,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl SqliteChangeFeed {
    /// Create the `change_log` table if needed and start the writer and
    /// poller tasks. Must be called inside a tokio runtime.
    pub async fn attach(backend: &SqliteBackend, poll_interval: Duration) -> anyhow::Result<Arc<Self>> {
        let pool = backend.pool().clone();

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS change_log (
                seq    INTEGER PRIMARY KEY AUTOINCREMENT,
                topic  TEXT NOT NULL,
                origin TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .context("failed to create change_log table")?;

        let cursor: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(seq), 0) FROM change_log")
            .fetch_one(&pool)
            .await
            .context("failed to read change_log position")?;

        let (tx, rx) = mpsc::unbounded_channel();
        let feed = Arc::new(Self {
            local: SignalBus::new(),
            outbox: Mutex::new(Some(tx)),
            writer: Mutex::new(None),
            poller: Mutex::new(None),
        });

        let writer = tokio::spawn(write_loop(pool.clone(), rx));
        // The poller holds a weak handle so dropping the last feed stops it.
        let poller = tokio::spawn(poll_loop(pool, Arc::downgrade(&feed), cursor, poll_interval));
        *lock(&feed.writer) = Some(writer);
        *lock(&feed.poller) = Some(poller);

        debug!(cursor, ?poll_interval, "change feed attached");
        Ok(feed)
    }

    /// Append every signal published so far, then stop polling. Later
    /// publishes fail with [`BusError::Closed`].
    pub async fn shutdown(&self) {
        drop(lock(&self.outbox).take());

        let writer = lock(&self.writer).take();
        if let Some(writer) = writer {
            if let Err(err) = writer.await {
                warn!(error = %err, "change feed writer stopped abnormally");
            }
        }

        if let Some(poller) = lock(&self.poller).take() {
            poller.abort();
        }
    }
}

impl EventBus<ChangeSignal> for SqliteChangeFeed {
    type Error = BusError;

    fn publish(&self, signal: ChangeSignal) -> Result<(), Self::Error> {
        let outbox = self.outbox.lock().map_err(|_| BusError::Poisoned)?;
        match outbox.as_ref() {
            Some(tx) => tx.send(signal).map_err(|_| BusError::Closed),
            None => Err(BusError::Closed),
        }
    }

    fn subscribe(&self) -> Subscription<ChangeSignal> {
        self.local.subscribe()
    }
}

impl Drop for SqliteChangeFeed {
    fn drop(&mut self) {
        if let Some(poller) = lock(&self.poller).take() {
            poller.abort();
        }
    }
}

impl core::fmt::Debug for SqliteChangeFeed {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SqliteChangeFeed")
            .field("open", &lock(&self.outbox).is_some())
            .field("subscribers", &self.local.subscriber_count())
            .finish()
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn write_loop(pool: SqlitePool, mut outbox: mpsc::UnboundedReceiver<ChangeSignal>) {
    while let Some(signal) = outbox.recv().await {
        if let Err(err) = append(&pool, signal).await {
            warn!(topic = %signal.topic, error = %err, "failed to append change signal");
        }
    }
}

async fn append(pool: &SqlitePool, signal: ChangeSignal) -> Result<(), sqlx::Error> {
    let seq = sqlx::query("INSERT INTO change_log (topic, origin) VALUES (?1, ?2)")
        .bind(signal.topic.name())
        .bind(signal.origin.to_string())
        .execute(pool)
        .await?
        .last_insert_rowid();

    sqlx::query("DELETE FROM change_log WHERE seq <= ?1")
        .bind(seq - RETAINED_SIGNALS)
        .execute(pool)
        .await?;
    Ok(())
}

async fn poll_loop(
    pool: SqlitePool,
    feed: std::sync::Weak<SqliteChangeFeed>,
    mut cursor: i64,
    every: Duration,
) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        let rows = match fetch_since(&pool, cursor).await {
            Ok(rows) => rows,
            Err(err) => {
                warn!(cursor, error = %err, "failed to poll change_log");
                continue;
            }
        };

        let Some(live) = feed.upgrade() else {
            return;
        };
        for (seq, signal) in rows {
            cursor = seq;
            let Some(signal) = signal else {
                continue;
            };
            if let Err(err) = live.local.publish(signal) {
                warn!(topic = %signal.topic, error = ?err, "failed to re-broadcast change signal");
            }
        }
    }
}

async fn fetch_since(
    pool: &SqlitePool,
    cursor: i64,
) -> Result<Vec<(i64, Option<ChangeSignal>)>, sqlx::Error> {
    let rows = sqlx::query("SELECT seq, topic, origin FROM change_log WHERE seq > ?1 ORDER BY seq")
        .bind(cursor)
        .fetch_all(pool)
        .await?;

    rows.into_iter()
        .map(|row| {
            let seq: i64 = row.try_get("seq")?;
            let topic: String = row.try_get("topic")?;
            let origin: String = row.try_get("origin")?;
            Ok((seq, decode(&topic, &origin)))
        })
        .collect()
}

fn decode(topic: &str, origin: &str) -> Option<ChangeSignal> {
    match (topic.parse::<Topic>(), origin.parse::<InstanceId>()) {
        (Ok(topic), Ok(origin)) => Some(ChangeSignal { topic, origin }),
        _ => {
            debug!(topic, origin, "skipping unreadable change_log row");
            None
        }
    }
}
