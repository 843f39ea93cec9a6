//! In-memory state behind the development backend: the demo identity, the
//! seeded user directory, and the token records that drive 401 behavior.
//!
//! Shared across handlers via an `Extension<Arc<ApiState>>`; interior
//! mutability keeps the router `Clone`.

use crate::auth::backend::{LoginResponse, RefreshResponse, UserProfile};
use crate::auth::tokens::now_ms;
use crate::cli::globals::GlobalArgs;
use rand::{distributions::Alphanumeric, Rng};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};
use tokio::sync::RwLock;
use ulid::Ulid;
use utoipa::ToSchema;

/// How many rows the directory is seeded with.
const SEED_USERS: u64 = 42;

/// Why a bearer token was rejected. `NoToken` covers a missing or malformed
/// header; `Expired` a plausible token with no live record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDenied {
    NoToken,
    Expired,
}

/// Rejections from write operations on the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteError {
    EmailTaken,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
}

pub struct ApiState {
    latency: Duration,
    access_ttl: Duration,
    demo_email: String,
    demo_password: SecretString,
    profile: UserProfile,
    users: RwLock<Vec<UserRecord>>,
    /// Live access tokens and their absolute expiry.
    access_tokens: RwLock<HashMap<String, SystemTime>>,
    /// Refresh tokens handed out by login; long-lived, never rotated.
    refresh_tokens: RwLock<HashSet<String>>,
    refresh_calls: AtomicU64,
}

impl ApiState {
    #[must_use]
    pub fn new(globals: &GlobalArgs) -> Self {
        let profile = UserProfile {
            id: "u_1".to_string(),
            email: globals.demo_email.clone(),
            name: "Panpan Admin".to_string(),
            roles: vec!["admin".to_string()],
        };

        Self {
            latency: Duration::from_millis(globals.latency_ms),
            access_ttl: Duration::from_secs(globals.access_ttl_secs),
            demo_email: globals.demo_email.clone(),
            demo_password: globals.demo_password.clone(),
            profile,
            users: RwLock::new(seed_users()),
            access_tokens: RwLock::new(HashMap::new()),
            refresh_tokens: RwLock::new(HashSet::new()),
            refresh_calls: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn latency(&self) -> Duration {
        self.latency
    }

    #[must_use]
    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    /// Number of `/refresh` calls received so far, valid or not.
    #[must_use]
    pub fn refresh_calls(&self) -> u64 {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// Number of access tokens ever issued.
    pub async fn issued_access_tokens(&self) -> usize {
        self.access_tokens.read().await.len()
    }

    /// Invalidates every refresh token, so the next refresh attempt is
    /// rejected. Simulator control used to exercise forced-logout paths.
    pub async fn revoke_refresh_tokens(&self) {
        self.refresh_tokens.write().await.clear();
    }

    pub async fn issue_login(&self, email: &str, password: &str) -> Option<LoginResponse> {
        if email != self.demo_email || password != self.demo_password.expose_secret() {
            return None;
        }

        let access = make_token("access");
        let refresh = make_token("refresh");
        self.access_tokens
            .write()
            .await
            .insert(access.clone(), SystemTime::now() + self.access_ttl);
        self.refresh_tokens.write().await.insert(refresh.clone());

        Some(LoginResponse {
            access_token: access,
            refresh_token: refresh,
            expires_in_sec: self.access_ttl.as_secs(),
            user: self.profile.clone(),
        })
    }

    pub async fn issue_refresh(&self, refresh_token: &str) -> Option<RefreshResponse> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);

        if !self.refresh_tokens.read().await.contains(refresh_token) {
            return None;
        }

        let access = make_token("access");
        self.access_tokens
            .write()
            .await
            .insert(access.clone(), SystemTime::now() + self.access_ttl);

        Some(RefreshResponse {
            access_token: access,
            expires_in_sec: self.access_ttl.as_secs(),
        })
    }

    /// Validates an `Authorization` header value against the live token
    /// records.
    pub async fn verify_access(&self, header: Option<&str>) -> Result<(), AccessDenied> {
        let token = header
            .and_then(|value| value.strip_prefix("Bearer "))
            .filter(|token| token.contains("access_"))
            .ok_or(AccessDenied::NoToken)?;

        match self.access_tokens.read().await.get(token) {
            Some(expires_at) if *expires_at > SystemTime::now() => Ok(()),
            _ => Err(AccessDenied::Expired),
        }
    }

    /// One page of the directory after case-insensitive filtering over name
    /// and email. `page` and `limit` are assumed pre-clamped by the handler.
    pub async fn page_users(&self, q: &str, page: u64, limit: u64) -> (Vec<UserRecord>, u64) {
        let users = self.users.read().await;
        let needle = q.to_lowercase();

        let filtered: Vec<&UserRecord> = users
            .iter()
            .filter(|user| {
                user.name.to_lowercase().contains(&needle)
                    || user.email.to_lowercase().contains(&needle)
            })
            .collect();

        let total = filtered.len() as u64;
        let start = ((page - 1) * limit) as usize;
        let items = filtered
            .into_iter()
            .skip(start)
            .take(limit as usize)
            .cloned()
            .collect();

        (items, total)
    }

    pub async fn create_user(
        &self,
        name: &str,
        email: &str,
        role: &str,
    ) -> Result<UserRecord, WriteError> {
        let mut users = self.users.write().await;

        if users
            .iter()
            .any(|user| user.email.eq_ignore_ascii_case(email))
        {
            return Err(WriteError::EmailTaken);
        }

        let user = UserRecord {
            id: format!("u_{}", Ulid::new().to_string().to_lowercase()),
            name: name.to_string(),
            email: email.to_string(),
            role: role.to_string(),
        };
        users.push(user.clone());
        Ok(user)
    }

    pub async fn update_user(
        &self,
        id: &str,
        name: &str,
        email: &str,
        role: &str,
    ) -> Result<UserRecord, WriteError> {
        let mut users = self.users.write().await;

        let Some(index) = users.iter().position(|user| user.id == id) else {
            return Err(WriteError::NotFound);
        };

        // A user may keep their own email; only another holder conflicts.
        if users
            .iter()
            .enumerate()
            .any(|(i, user)| i != index && user.email.eq_ignore_ascii_case(email))
        {
            return Err(WriteError::EmailTaken);
        }

        let user = &mut users[index];
        user.name = name.to_string();
        user.email = email.to_string();
        user.role = role.to_string();
        Ok(user.clone())
    }

    pub async fn remove_user(&self, id: &str) -> bool {
        let mut users = self.users.write().await;
        match users.iter().position(|user| user.id == id) {
            Some(index) => {
                users.remove(index);
                true
            }
            None => false,
        }
    }
}

fn seed_users() -> Vec<UserRecord> {
    (1..=SEED_USERS)
        .map(|n| UserRecord {
            id: format!("u_{n}"),
            name: format!("User {n}"),
            email: format!("user{n}@demo.dev"),
            role: if (n - 1) % 3 == 0 { "admin" } else { "staff" }.to_string(),
        })
        .collect()
}

/// Mints a token of the form `<prefix>_<noise>_<ms>`; protected routes only
/// accept bearers carrying the `access_` marker.
fn make_token(prefix: &str) -> String {
    let noise: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect();
    format!("{}_{}_{}", prefix, noise.to_lowercase(), now_ms())
}
