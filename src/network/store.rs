//! Score Store
//!
//! Persistence boundary. The server calls the store once per eliminated
//! human with the points they earned; the store returns the refreshed
//! profile.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;

use crate::game::state::{User, UserId};
use crate::network::protocol::Preferences;

/// Persistence failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No profile for this id.
    #[error("user {0} not found")]
    UserNotFound(UserId),
    /// Backend down or refused.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Boxed future returned by store calls.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// User profile persistence.
pub trait ScoreStore: Send + Sync {
    /// Add `delta` points to a user's balance and return the new profile.
    fn add_score<'a>(&'a self, user_id: &'a str, delta: i64) -> StoreFuture<'a, User>;

    /// Notification settings of a user.
    fn get_preferences<'a>(&'a self, user_id: &'a str) -> StoreFuture<'a, Preferences>;
}

/// In-process store. Unknown users are created on first score.
#[derive(Default)]
pub struct MemoryScoreStore {
    users: RwLock<BTreeMap<UserId, User>>,
    preferences: RwLock<BTreeMap<UserId, Preferences>>,
    failing: AtomicBool,
}

impl MemoryScoreStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a profile.
    pub async fn insert(&self, user: User) {
        self.users.write().await.insert(user.id.clone(), user);
    }

    /// Seed notification settings.
    pub async fn set_preferences(&self, user_id: &str, preferences: Preferences) {
        self.preferences.write().await.insert(user_id.to_string(), preferences);
    }

    /// Stored profile.
    pub async fn user(&self, user_id: &str) -> Option<User> {
        self.users.read().await.get(user_id).cloned()
    }

    /// Make every call fail with [`StoreError::Unavailable`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("store is failing".into()))
        } else {
            Ok(())
        }
    }
}

impl ScoreStore for MemoryScoreStore {
    fn add_score<'a>(&'a self, user_id: &'a str, delta: i64) -> StoreFuture<'a, User> {
        Box::pin(async move {
            self.check()?;
            let mut users = self.users.write().await;
            let user = users.entry(user_id.to_string()).or_insert_with(|| User {
                id: user_id.to_string(),
                name: user_id.to_string(),
                picture: String::new(),
                points: 0,
                level: 1,
            });
            user.points += delta;
            Ok(user.clone())
        })
    }

    fn get_preferences<'a>(&'a self, user_id: &'a str) -> StoreFuture<'a, Preferences> {
        Box::pin(async move {
            self.check()?;
            if !self.users.read().await.contains_key(user_id) {
                return Err(StoreError::UserNotFound(user_id.to_string()));
            }
            Ok(self.preferences.read().await.get(user_id).cloned().unwrap_or_default())
        })
    }
}
