use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use matchng_core::{DomainError, UserId, UserProfile};

use super::{now_millis, position_by_id};
use crate::error::StoreError;
use crate::key::keys;
use crate::store::PersistentStore;

/// How `save_user` treats a stored profile that changed after the incoming
/// copy was read (another instance wrote in between).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// The incoming profile replaces the stored one.
    LastWriterWins,
    /// Union the stored profile's skills, saved and applied job ids into the
    /// incoming one. Concurrent additions converge; a removal racing another
    /// instance's stale copy can come back.
    #[default]
    MergeSets,
}

/// Profiles, persisted as one list under the `users` key.
#[derive(Debug)]
pub struct UserRepository {
    store: Arc<PersistentStore>,
    policy: ConflictPolicy,
    write_lock: Mutex<()>,
}

impl UserRepository {
    pub fn new(store: Arc<PersistentStore>) -> Self {
        Self::with_policy(store, ConflictPolicy::default())
    }

    pub fn with_policy(store: Arc<PersistentStore>, policy: ConflictPolicy) -> Self {
        Self {
            store,
            policy,
            write_lock: Mutex::new(()),
        }
    }

    pub fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    pub async fn list_users(&self) -> Result<Vec<UserProfile>, StoreError> {
        Ok(self
            .store
            .get_item::<Vec<UserProfile>>(keys::USERS)
            .await?
            .unwrap_or_default())
    }

    pub async fn get_user(&self, id: &UserId) -> Result<Option<UserProfile>, StoreError> {
        let mut users = self.list_users().await?;
        Ok(position_by_id(&users, id).map(|idx| users.swap_remove(idx)))
    }

    /// Upsert by id and stamp `updated_at`. Returns the profile as stored.
    pub async fn save_user(&self, mut profile: UserProfile) -> Result<UserProfile, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut users = self.list_users().await?;

        profile.normalize_sets();
        match position_by_id(&users, &profile.id) {
            Some(idx) => {
                let stored = &users[idx];
                if self.policy == ConflictPolicy::MergeSets && stored.updated_at > profile.updated_at
                {
                    debug!(
                        user_id = %profile.id,
                        stored_at = stored.updated_at,
                        incoming_at = profile.updated_at,
                        "stored profile is newer, merging set fields"
                    );
                    profile.merge_sets_from(stored);
                }
                profile.updated_at = now_millis().max(stored.updated_at + 1);
                users[idx] = profile.clone();
            }
            None => {
                profile.updated_at = now_millis();
                users.push(profile.clone());
            }
        }

        self.store.set_item(keys::USERS, &users).await?;
        Ok(profile)
    }

    /// Read-modify-write of one profile under the repository lock.
    pub async fn update_user<F>(&self, id: &UserId, f: F) -> Result<UserProfile, StoreError>
    where
        F: FnOnce(&mut UserProfile),
    {
        let _guard = self.write_lock.lock().await;
        let mut users = self.list_users().await?;

        let idx = position_by_id(&users, id)
            .ok_or_else(|| DomainError::not_found(format!("user {id}")))?;
        let user = &mut users[idx];

        f(user);
        user.normalize_sets();
        user.updated_at = now_millis().max(user.updated_at + 1);
        let updated = user.clone();

        self.store.set_item(keys::USERS, &users).await?;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::config::StoreConfig;
    use matchng_core::{JobId, Role};
    use matchng_events::SyncNotifier;

    fn store_over(backend: &MemoryBackend) -> Arc<PersistentStore> {
        Arc::new(PersistentStore::new(
            Arc::new(backend.clone()),
            Arc::new(SyncNotifier::new()),
            &StoreConfig::default(),
        ))
    }

    fn seeker(id: &str) -> UserProfile {
        UserProfile::new(UserId::from(id), "Seeker", Role::Seeker)
    }

    #[tokio::test]
    async fn save_then_get() {
        let repo = UserRepository::new(store_over(&MemoryBackend::new()));
        let saved = repo.save_user(seeker("u1")).await.unwrap();
        assert!(saved.updated_at > 0);

        let loaded = repo.get_user(&UserId::from("u1")).await.unwrap().unwrap();
        assert_eq!(loaded, saved);
        assert!(repo.get_user(&UserId::from("nobody")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_is_an_upsert() {
        let repo = UserRepository::new(store_over(&MemoryBackend::new()));
        repo.save_user(seeker("u1")).await.unwrap();
        let mut again = repo.get_user(&UserId::from("u1")).await.unwrap().unwrap();
        again.name = "Renamed".to_string();
        repo.save_user(again).await.unwrap();

        let users = repo.list_users().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].name, "Renamed");
    }

    #[tokio::test]
    async fn local_unsave_is_not_undone() {
        let repo = UserRepository::new(store_over(&MemoryBackend::new()));
        let job = JobId::from("j1");

        let mut user = seeker("u1");
        user.toggle_saved(job.clone());
        let mut user = repo.save_user(user).await.unwrap();

        user.toggle_saved(job.clone());
        let user = repo.save_user(user).await.unwrap();
        assert!(!user.has_saved(&job));
    }

    #[tokio::test]
    async fn merge_sets_converges_concurrent_additions() {
        let backend = MemoryBackend::new();
        let tab_a = UserRepository::new(store_over(&backend));
        let tab_b = UserRepository::new(store_over(&backend));

        let base = tab_a.save_user(seeker("u1")).await.unwrap();
        let mut copy_a = base.clone();
        let mut copy_b = base;

        copy_b.toggle_saved(JobId::from("j2"));
        tab_b.save_user(copy_b).await.unwrap();

        copy_a.toggle_saved(JobId::from("j3"));
        let merged = tab_a.save_user(copy_a).await.unwrap();

        assert_eq!(merged.saved_job_ids, vec![JobId::from("j3"), JobId::from("j2")]);
    }

    #[tokio::test]
    async fn last_writer_wins_drops_the_other_addition() {
        let backend = MemoryBackend::new();
        let tab_a = UserRepository::with_policy(store_over(&backend), ConflictPolicy::LastWriterWins);
        let tab_b = UserRepository::new(store_over(&backend));

        let base = tab_a.save_user(seeker("u1")).await.unwrap();
        let mut copy_a = base.clone();
        let mut copy_b = base;

        copy_b.toggle_saved(JobId::from("j2"));
        tab_b.save_user(copy_b).await.unwrap();

        copy_a.toggle_saved(JobId::from("j3"));
        let written = tab_a.save_user(copy_a).await.unwrap();
        assert_eq!(written.saved_job_ids, vec![JobId::from("j3")]);
    }

    #[tokio::test]
    async fn update_user_applies_closure() {
        let repo = UserRepository::new(store_over(&MemoryBackend::new()));
        let before = repo.save_user(seeker("u1")).await.unwrap();

        let after = repo
            .update_user(&UserId::from("u1"), |u| {
                u.apply_to(JobId::from("j9"));
            })
            .await
            .unwrap();

        assert!(after.has_applied(&JobId::from("j9")));
        assert!(after.updated_at > before.updated_at);
    }

    #[tokio::test]
    async fn update_missing_user_is_not_found() {
        let repo = UserRepository::new(store_over(&MemoryBackend::new()));
        let err = repo.update_user(&UserId::from("ghost"), |_| {}).await.unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::NotFound(_))));
    }
}
