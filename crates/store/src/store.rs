//! Namespaced, versioned, obfuscating key/value store.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use matchng_events::{SyncNotifier, Topic};

use crate::backend::{StorageBackend, entry_cost};
use crate::codec::FieldCodec;
use crate::config::StoreConfig;
use crate::envelope::StorageEnvelope;
use crate::error::{BackendError, StoreError};
use crate::key::KeySpace;

/// Persistent store shared by the repositories and the action queue.
///
/// Every value goes through the same pipeline:
///
/// 1. wrap in a [`StorageEnvelope`] stamped with the running version;
/// 2. obfuscate sensitive string fields at any depth;
/// 3. write under `<prefix>:v<version>:<key>`;
/// 4. fire [`Topic::StoreChanged`].
///
/// Reads run it backwards and treat anything unreadable as absent.
pub struct PersistentStore {
    backend: Arc<dyn StorageBackend>,
    notifier: Arc<SyncNotifier>,
    keys: KeySpace,
    codec: FieldCodec,
    version: u32,
    quota_bytes: u64,
}

impl PersistentStore {
    pub fn new(
        backend: Arc<dyn StorageBackend>,
        notifier: Arc<SyncNotifier>,
        config: &StoreConfig,
    ) -> Self {
        Self {
            backend,
            notifier,
            keys: KeySpace::new(config.prefix.clone(), config.version),
            codec: FieldCodec::new(config.sensitive_fields.iter().cloned()),
            version: config.version,
            quota_bytes: config.quota_bytes,
        }
    }

    pub fn notifier(&self) -> &Arc<SyncNotifier> {
        &self.notifier
    }

    pub fn key_space(&self) -> &KeySpace {
        &self.keys
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub async fn set_item<T>(&self, key: &str, value: &T) -> Result<(), StoreError>
    where
        T: Serialize + ?Sized,
    {
        let envelope = StorageEnvelope::new(self.version(), value);
        let mut json = serde_json::to_value(&envelope).map_err(|source| StoreError::Serialize {
            key: key.to_string(),
            source,
        })?;
        self.codec.obfuscate(&mut json);

        let raw = serde_json::to_string(&json).map_err(|source| StoreError::Serialize {
            key: key.to_string(),
            source,
        })?;

        let full_key = self.keys.key(key);
        match self.backend.set(&full_key, &raw).await {
            Ok(()) => {}
            Err(source @ BackendError::QuotaExceeded { .. }) => {
                warn!(key, error = %source, "storage quota exceeded, purging drafts");
                match self.purge_drafts().await {
                    Ok(purged) => info!(key, purged, "drafts purged after quota failure"),
                    Err(err) => warn!(key, error = %err, "failed to purge drafts after quota failure"),
                }
                return Err(StoreError::QuotaExceeded {
                    key: key.to_string(),
                    source,
                });
            }
            Err(err) => return Err(err.into()),
        }

        debug!(key, bytes = raw.len(), "stored item");
        self.notifier.notify(Topic::StoreChanged);
        Ok(())
    }

    /// Read `key`. Missing, corrupted and version-mismatched values all read
    /// as `None`; only backend failures are errors.
    pub async fn get_item<T>(&self, key: &str) -> Result<Option<T>, StoreError>
    where
        T: DeserializeOwned,
    {
        let full_key = self.keys.key(key);
        let Some(raw) = self.backend.get(&full_key).await? else {
            return Ok(None);
        };

        let mut json: Value = match serde_json::from_str(&raw) {
            Ok(json) => json,
            Err(err) => {
                warn!(key, error = %err, "storage corruption: value is not JSON");
                return Ok(None);
            }
        };

        let found = json.get("version").and_then(Value::as_u64);
        if found != Some(u64::from(self.version())) {
            debug!(key, ?found, expected = self.version(), "version mismatch, ignoring value");
            return Ok(None);
        }

        if let Err(err) = self.codec.deobfuscate(&mut json) {
            warn!(key, error = %err, "storage corruption: cannot decode sensitive field");
            return Ok(None);
        }

        match serde_json::from_value::<StorageEnvelope<T>>(json) {
            Ok(envelope) => Ok(Some(envelope.data)),
            Err(err) => {
                warn!(key, error = %err, "storage corruption: envelope does not match type");
                Ok(None)
            }
        }
    }

    pub async fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        self.backend.remove(&self.keys.key(key)).await?;
        self.notifier.notify(Topic::StoreChanged);
        Ok(())
    }

    /// Estimated share of the quota in use, in percent, capped at 100.
    ///
    /// Counts every key under this prefix regardless of version, since stale
    /// versions still occupy the medium.
    pub async fn get_usage(&self) -> Result<f64, StoreError> {
        let mut used = 0u64;
        for raw_key in self.backend.keys().await? {
            if !self.keys.owns_any_version(&raw_key) {
                continue;
            }
            if let Some(value) = self.backend.get(&raw_key).await? {
                used += entry_cost(&raw_key, &value);
            }
        }

        if self.quota_bytes == 0 {
            return Ok(if used == 0 { 0.0 } else { 100.0 });
        }
        let percent = used as f64 / self.quota_bytes as f64 * 100.0;
        Ok(percent.min(100.0))
    }

    /// Remove every draft. Returns how many were removed.
    pub async fn purge_drafts(&self) -> Result<usize, StoreError> {
        let drafts: Vec<String> = self
            .backend
            .keys()
            .await?
            .into_iter()
            .filter(|k| self.keys.is_draft(k))
            .collect();

        for key in &drafts {
            self.backend.remove(key).await?;
        }

        if !drafts.is_empty() {
            self.notifier.notify(Topic::StoreChanged);
        }
        Ok(drafts.len())
    }

    pub async fn save_draft<T>(&self, id: &str, value: &T) -> Result<(), StoreError>
    where
        T: Serialize + ?Sized,
    {
        self.set_item(&self.keys.draft(id), value).await
    }

    pub async fn get_draft<T>(&self, id: &str) -> Result<Option<T>, StoreError>
    where
        T: DeserializeOwned,
    {
        self.get_item(&self.keys.draft(id)).await
    }

    pub async fn discard_draft(&self, id: &str) -> Result<(), StoreError> {
        self.remove_item(&self.keys.draft(id)).await
    }

    /// Remove every key under this prefix, all versions included.
    pub async fn clear(&self) -> Result<usize, StoreError> {
        let owned: Vec<String> = self
            .backend
            .keys()
            .await?
            .into_iter()
            .filter(|k| self.keys.owns_any_version(k))
            .collect();

        for key in &owned {
            self.backend.remove(key).await?;
        }

        info!(removed = owned.len(), prefix = %self.keys.namespace(), "store cleared");
        self.notifier.notify(Topic::StoreChanged);
        Ok(owned.len())
    }
}

impl core::fmt::Debug for PersistentStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PersistentStore")
            .field("keys", &self.keys)
            .field("quota_bytes", &self.quota_bytes)
            .field("notifier", &self.notifier)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::key::keys;
    use async_trait::async_trait;
    use matchng_core::{EmployerId, Job, JobId, Location, Role, UserId, UserProfile};
    use proptest::prelude::*;
    use serde::Deserialize;

    fn store_on(backend: MemoryBackend) -> PersistentStore {
        PersistentStore::new(
            Arc::new(backend),
            Arc::new(SyncNotifier::new()),
            &StoreConfig::default(),
        )
    }

    fn ada() -> UserProfile {
        let mut user = UserProfile::new(UserId::from("u-1"), "Ada Obi", Role::Seeker);
        user.email = "ada@example.com".to_string();
        user.bio = Some("Frontend engineer".to_string());
        user
    }

    #[tokio::test]
    async fn round_trips_values_with_sensitive_fields() {
        let backend = MemoryBackend::new();
        let store = store_on(backend.clone());

        store.set_item(keys::USERS, &vec![ada()]).await.unwrap();

        let users: Vec<UserProfile> = store.get_item(keys::USERS).await.unwrap().unwrap();
        assert_eq!(users, vec![ada()]);

        let raw = backend.get_raw("matchNG:v1:users").unwrap();
        assert!(!raw.contains("Ada Obi"));
        assert!(!raw.contains("ada@example.com"));
        assert!(raw.contains("\"version\":1"));
    }

    #[tokio::test]
    async fn coordinates_come_back_bit_for_bit() {
        let store = store_on(MemoryBackend::new());
        let mut user = ada();
        user.location = Location::new("Lagos", "Ikeja").with_coordinates(10.576497081699959, 3.3792);

        store.set_item(keys::USERS, &vec![user.clone()]).await.unwrap();
        let users: Vec<UserProfile> = store.get_item(keys::USERS).await.unwrap().unwrap();
        assert_eq!(users[0].location.lat.map(f64::to_bits), Some(10.576497081699959f64.to_bits()));
        assert_eq!(users, vec![user]);
    }

    fn block_on<F: std::future::Future>(fut: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(fut)
    }

    proptest! {
        #[test]
        fn profiles_and_jobs_round_trip_with_any_coordinates(
            lat in -90.0f64..90.0,
            lon in -180.0f64..180.0,
        ) {
            let mut user = ada();
            user.location = Location::new("Lagos", "Ikeja").with_coordinates(lat, lon);
            let job = Job::new(
                JobId::from("j-1"),
                EmployerId::from("e-1"),
                "Ward nurse",
                "Healthcare",
                Location::new("Oyo", "Ibadan").with_coordinates(lon / 2.0, lat * 2.0),
            );

            let (users, jobs) = block_on(async {
                let store = store_on(MemoryBackend::new());
                store.set_item(keys::USERS, &vec![user.clone()]).await.unwrap();
                store.set_item(keys::JOBS, &vec![job.clone()]).await.unwrap();
                (
                    store.get_item::<Vec<UserProfile>>(keys::USERS).await.unwrap(),
                    store.get_item::<Vec<Job>>(keys::JOBS).await.unwrap(),
                )
            });

            prop_assert_eq!(users, Some(vec![user]));
            prop_assert_eq!(jobs, Some(vec![job]));
        }
    }

    #[tokio::test]
    async fn missing_key_reads_as_none() {
        let store = store_on(MemoryBackend::new());
        let value: Option<Vec<String>> = store.get_item("nothing").await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn corrupted_values_read_as_none() {
        let backend = MemoryBackend::new();
        backend.insert_raw("matchNG:v1:broken", "{not json");
        backend.insert_raw(
            "matchNG:v1:badfield",
            r#"{"version":1,"timestamp":0,"data":{"name":"***"}}"#,
        );
        let store = store_on(backend);

        assert!(store.get_item::<Value>("broken").await.unwrap().is_none());
        assert!(store.get_item::<Value>("badfield").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn version_mismatch_reads_as_none() {
        let backend = MemoryBackend::new();
        backend.insert_raw("matchNG:v1:users", r#"{"version":0,"timestamp":0,"data":[]}"#);
        let store = store_on(backend);

        assert!(store.get_item::<Vec<UserProfile>>(keys::USERS).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn wrong_shape_reads_as_none() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Strict {
            count: u32,
        }

        let store = store_on(MemoryBackend::new());
        store.set_item("shape", &"just a string").await.unwrap();
        assert!(store.get_item::<Strict>("shape").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn writes_and_removes_fire_store_changed() {
        let store = store_on(MemoryBackend::new());
        let sub = store.notifier().subscribe(Topic::StoreChanged);

        store.set_item("a", &1).await.unwrap();
        store.remove_item("a").await.unwrap();
        assert_eq!(sub.drain(), 2);
    }

    #[tokio::test]
    async fn quota_failure_purges_drafts_and_reports() {
        let backend = MemoryBackend::with_quota(1_000);
        let store = store_on(backend.clone());

        store.save_draft("profile-form", &"x".repeat(60)).await.unwrap();
        store.set_item("small", &1).await.unwrap();

        let err = store.set_item("big", &"y".repeat(300)).await.unwrap_err();
        assert!(err.is_quota_exceeded());

        assert!(backend.get_raw("matchNG:v1:drafts:profile-form").is_none());
        assert!(backend.get_raw("matchNG:v1:big").is_none());
        assert!(backend.get_raw("matchNG:v1:small").is_some());
    }

    /// Rejects every write for quota and cannot list keys either.
    struct FullAndBroken;

    #[async_trait]
    impl StorageBackend for FullAndBroken {
        async fn get(&self, _key: &str) -> Result<Option<String>, BackendError> {
            Ok(None)
        }

        async fn set(&self, _key: &str, _value: &str) -> Result<(), BackendError> {
            Err(BackendError::QuotaExceeded { needed: 10, quota: 1 })
        }

        async fn remove(&self, _key: &str) -> Result<(), BackendError> {
            Ok(())
        }

        async fn keys(&self) -> Result<Vec<String>, BackendError> {
            Err(BackendError::Io("listing failed".to_string()))
        }
    }

    #[tokio::test]
    async fn quota_error_survives_a_failed_purge() {
        let store = PersistentStore::new(
            Arc::new(FullAndBroken),
            Arc::new(SyncNotifier::new()),
            &StoreConfig::default(),
        );

        let err = store.set_item("big", &"y").await.unwrap_err();
        match err {
            StoreError::QuotaExceeded { key, source } => {
                assert_eq!(key, "big");
                assert_eq!(source, BackendError::QuotaExceeded { needed: 10, quota: 1 });
            }
            other => panic!("expected quota error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn drafts_round_trip_and_discard() {
        let store = store_on(MemoryBackend::new());
        store.save_draft("bio", &"half-written").await.unwrap();
        assert_eq!(
            store.get_draft::<String>("bio").await.unwrap().as_deref(),
            Some("half-written")
        );

        store.discard_draft("bio").await.unwrap();
        assert!(store.get_draft::<String>("bio").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn purge_drafts_leaves_other_keys() {
        let backend = MemoryBackend::new();
        let store = store_on(backend.clone());
        store.save_draft("a", &1).await.unwrap();
        store.save_draft("b", &2).await.unwrap();
        store.set_item(keys::SESSION, &3).await.unwrap();

        assert_eq!(store.purge_drafts().await.unwrap(), 2);
        assert_eq!(backend.len(), 1);
    }

    #[tokio::test]
    async fn usage_counts_prefixed_keys_and_caps_at_100() {
        let backend = MemoryBackend::new();
        backend.insert_raw("matchNG:v1:k", "v");
        backend.insert_raw("other:v1:k", "ignored-entirely");

        let config = StoreConfig {
            quota_bytes: 100,
            ..StoreConfig::default()
        };
        let store = PersistentStore::new(
            Arc::new(backend.clone()),
            Arc::new(SyncNotifier::new()),
            &config,
        );

        // ("matchNG:v1:k" + "v") = 13 units * 2 bytes.
        assert!((store.get_usage().await.unwrap() - 26.0).abs() < 1e-9);

        backend.insert_raw("matchNG:v0:old", "x".repeat(200));
        assert_eq!(store.get_usage().await.unwrap(), 100.0);
    }

    #[tokio::test]
    async fn clear_removes_all_versions_of_this_prefix_only() {
        let backend = MemoryBackend::new();
        backend.insert_raw("matchNG:v0:users", "old");
        backend.insert_raw("someone-else", "keep");
        let store = store_on(backend.clone());
        store.set_item(keys::JOBS, &Vec::<String>::new()).await.unwrap();

        assert_eq!(store.clear().await.unwrap(), 2);
        assert_eq!(backend.get_raw("someone-else").as_deref(), Some("keep"));
        assert_eq!(backend.len(), 1);
    }
}
