use actix_web::http::header::AUTHORIZATION;
use actix_web::HttpRequest;
use crate::error::{FeedError, Result};
use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use subtle::ConstantTimeEq;
use tracing::warn;
use uuid::Uuid;

pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    let digest = hasher.finalize();
    format!("{:x}", digest)
}

fn constant_time_eq_hex(expected: &str, candidate: &str) -> bool {
    expected.as_bytes().ct_eq(candidate.as_bytes()).into()
}

/// Login and bearer-token bookkeeping for the single operator account.
///
/// Tokens are random UUIDs held in memory until they expire; a restart
/// invalidates all of them.
pub struct SessionStore {
    username: String,
    password_hash: String,
    ttl: Duration,
    sessions: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl SessionStore {
    pub fn new(username: impl Into<String>, password: &str, ttl: Duration) -> Self {
        Self {
            username: username.into(),
            password_hash: hash_password(password),
            ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Issues a token if the credentials match, `None` otherwise.
    ///
    /// # Errors
    /// `FeedError::Storage` if the session table is unusable after a panic.
    pub fn login(&self, username: &str, password: &str) -> Result<Option<String>> {
        let user_ok = constant_time_eq_hex(&hash_password(&self.username), &hash_password(username));
        let password_ok = constant_time_eq_hex(&self.password_hash, &hash_password(password));
        if !(user_ok & password_ok) {
            warn!(username, "rejected login");
            return Ok(None);
        }

        let token = Uuid::new_v4().to_string();
        let mut sessions = self.lock_sessions()?;
        let now = Utc::now();
        sessions.retain(|_, expires| *expires > now);
        sessions.insert(token.clone(), now + self.ttl);
        Ok(Some(token))
    }

    pub fn validate(&self, token: &str) -> Result<bool> {
        let sessions = self.lock_sessions()?;
        Ok(sessions
            .get(token)
            .map_or(false, |expires| *expires > Utc::now()))
    }

    /// Checks the request's `Authorization: Bearer <token>` header.
    pub fn authorize(&self, req: &HttpRequest) -> Result<bool> {
        match bearer_token(req) {
            Some(token) => self.validate(token),
            None => Ok(false),
        }
    }

    fn lock_sessions(&self) -> Result<MutexGuard<'_, HashMap<String, DateTime<Utc>>>> {
        self.sessions
            .lock()
            .map_err(|_| FeedError::Storage("session table mutex poisoned".to_string()))
    }
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}
