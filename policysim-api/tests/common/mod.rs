//! Shared fakes for integration tests
//!
//! Every collaborator counts its calls so tests can assert that a request
//! stopped before reaching it.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header::AUTHORIZATION, Request},
    Router,
};
use policysim_api::services::{
    CompletionRequest, GenerationError, IdentityError, IdentityProvider, TextGenerator,
};
use policysim_api::store::{HistoryStore, StoreError, StoreResult, UserStore};
use policysim_api::{build_router, AppState};
use policysim_common::models::{Exchange, NewExchange, Session, SignUpOutcome, UserIdentity};
use policysim_common::Tier;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const VALID_PASSWORD: &str = "correct horse";
pub const GENERATED_TEXT: &str = "Plastic bag bans reduce litter but raise costs for retailers.";

/// Identity service accepting a fixed token table
#[derive(Default)]
pub struct FakeIdentity {
    tokens: Mutex<HashMap<String, UserIdentity>>,
    pub verify_calls: AtomicUsize,
    pub unavailable: AtomicBool,
}

impl FakeIdentity {
    pub fn with_user(self, token: &str, user_id: &str) -> Self {
        self.tokens.lock().unwrap().insert(
            token.to_string(),
            UserIdentity {
                id: user_id.to_string(),
                email: Some(format!("{}@example.com", user_id)),
            },
        );
        self
    }

    fn session(user: UserIdentity) -> Session {
        Session {
            access_token: format!("token-{}", user.id),
            refresh_token: Some("refresh".to_string()),
            expires_in: Some(3600),
            token_type: Some("bearer".to_string()),
            user,
        }
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn verify(&self, token: &str) -> Result<UserIdentity, IdentityError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(IdentityError::Unavailable("connection refused".to_string()));
        }
        self.tokens
            .lock()
            .unwrap()
            .get(token)
            .cloned()
            .ok_or_else(|| IdentityError::Rejected("invalid JWT".to_string()))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, IdentityError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(IdentityError::Unavailable("connection refused".to_string()));
        }
        if password != VALID_PASSWORD {
            return Err(IdentityError::Rejected("Invalid login credentials".to_string()));
        }
        let user = UserIdentity {
            id: email.split('@').next().unwrap_or(email).to_string(),
            email: Some(email.to_string()),
        };
        Ok(Self::session(user))
    }

    async fn sign_up(&self, email: &str, _password: &str) -> Result<SignUpOutcome, IdentityError> {
        if email.starts_with("taken") {
            return Err(IdentityError::Rejected("User already registered".to_string()));
        }
        Ok(SignUpOutcome {
            user: UserIdentity {
                id: "new-user".to_string(),
                email: Some(email.to_string()),
            },
            session: None,
        })
    }

    async fn sign_out(&self, token: &str) -> Result<(), IdentityError> {
        if self.tokens.lock().unwrap().contains_key(token) {
            Ok(())
        } else {
            Err(IdentityError::Rejected("invalid JWT".to_string()))
        }
    }
}

/// `users` table in memory; stores raw integers so corrupt tiers can be seeded
#[derive(Default)]
pub struct FakeUsers {
    tiers: Mutex<HashMap<String, i64>>,
    pub fetch_calls: AtomicUsize,
    pub write_calls: AtomicUsize,
    pub fail: AtomicBool,
}

impl FakeUsers {
    pub fn with_tier(self, user_id: &str, tier: i64) -> Self {
        self.tiers.lock().unwrap().insert(user_id.to_string(), tier);
        self
    }

    pub fn tier_of(&self, user_id: &str) -> Option<i64> {
        self.tiers.lock().unwrap().get(user_id).copied()
    }

    fn check(&self) -> StoreResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            Err(StoreError::Status {
                status: 503,
                body: "unavailable".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl UserStore for FakeUsers {
    async fn fetch_tier(&self, user_id: &str) -> StoreResult<Option<i64>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.tier_of(user_id))
    }

    async fn insert_default(&self, user_id: &str, tier: Tier) -> StoreResult<()> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.tiers
            .lock()
            .unwrap()
            .entry(user_id.to_string())
            .or_insert(i64::from(tier));
        Ok(())
    }

    async fn set_tier(&self, user_id: &str, tier: Tier) -> StoreResult<()> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.tiers
            .lock()
            .unwrap()
            .insert(user_id.to_string(), i64::from(tier));
        Ok(())
    }
}

/// `chat_history` table in memory, returned in insertion order
#[derive(Default)]
pub struct FakeHistory {
    rows: Mutex<Vec<Exchange>>,
    pub insert_calls: AtomicUsize,
    pub fail_inserts: AtomicBool,
    pub fail_reads: AtomicBool,
}

impl FakeHistory {
    pub fn rows(&self) -> Vec<Exchange> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl HistoryStore for FakeHistory {
    async fn insert_exchange(&self, exchange: &NewExchange) -> StoreResult<()> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::Status {
                status: 500,
                body: "insert failed".to_string(),
            });
        }
        let mut rows = self.rows.lock().unwrap();
        let id = rows.len() as i64 + 1;
        rows.push(Exchange {
            id,
            user_id: exchange.user_id.clone(),
            policy_description: exchange.policy_description.clone(),
            response: exchange.response.clone(),
            tier: exchange.tier,
            created_at: exchange.created_at,
        });
        Ok(())
    }

    async fn list_exchanges(&self, user_id: &str) -> StoreResult<Vec<Exchange>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Corrupt("bad row".to_string()));
        }
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|row| row.user_id == user_id)
            .cloned()
            .collect())
    }
}

/// Text generator recording every request
#[derive(Default)]
pub struct FakeGenerator {
    requests: Mutex<Vec<CompletionRequest>>,
    pub fail: AtomicBool,
}

impl FakeGenerator {
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GenerationError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(GenerationError::Status {
                status: 429,
                body: "rate limited".to_string(),
            });
        }
        Ok(GENERATED_TEXT.to_string())
    }
}

/// All fakes plus the router built on them
pub struct TestApp {
    pub identity: Arc<FakeIdentity>,
    pub users: Arc<FakeUsers>,
    pub history: Arc<FakeHistory>,
    pub generator: Arc<FakeGenerator>,
}

impl TestApp {
    pub fn new(identity: FakeIdentity, users: FakeUsers) -> Self {
        Self {
            identity: Arc::new(identity),
            users: Arc::new(users),
            history: Arc::new(FakeHistory::default()),
            generator: Arc::new(FakeGenerator::default()),
        }
    }

    pub fn router(&self) -> Router {
        build_router(AppState::new(
            self.identity.clone(),
            self.users.clone(),
            self.history.clone(),
            self.generator.clone(),
        ))
    }
}

/// Request with an optional `Authorization` value and optional JSON body
pub fn request(method: &str, uri: &str, auth: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        builder = builder.header(AUTHORIZATION, auth);
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Extract JSON body from response
pub async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}
