//! Identity service client
//!
//! Token verification and session operations are delegated to the hosted
//! auth service (`{supabase_url}/auth/v1`). Nothing is cached locally.

use async_trait::async_trait;
use policysim_common::models::{Session, SignUpOutcome, UserIdentity};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Identity service failure
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The service refused the credential or request (4xx)
    #[error("{0}")]
    Rejected(String),

    /// Transport failure, 5xx, or an unreadable answer
    #[error("Identity service unavailable: {0}")]
    Unavailable(String),
}

/// Hosted identity/session service
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve a bearer token to the user it was issued to
    async fn verify(&self, token: &str) -> Result<UserIdentity, IdentityError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, IdentityError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, IdentityError>;

    /// Revoke the session behind `token`
    async fn sign_out(&self, token: &str) -> Result<(), IdentityError>;
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

/// Supabase-style auth client
#[derive(Clone)]
pub struct SupabaseAuth {
    http_client: Client,
    base_url: String,
    api_key: String,
}

impl SupabaseAuth {
    pub fn new(http_client: Client, service_url: &str, api_key: &str) -> Self {
        Self {
            http_client,
            base_url: format!("{}/auth/v1", service_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http_client
            .request(method, format!("{}/{}", self.base_url, path))
            .header("apikey", &self.api_key)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, IdentityError> {
        let response = request
            .send()
            .await
            .map_err(|e| IdentityError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body).unwrap_or_else(|| status.to_string());
        if status.is_client_error() {
            Err(IdentityError::Rejected(message))
        } else {
            Err(IdentityError::Unavailable(message))
        }
    }

    async fn json(response: Response) -> Result<Value, IdentityError> {
        response
            .json::<Value>()
            .await
            .map_err(|e| IdentityError::Unavailable(format!("unreadable response: {}", e)))
    }
}

/// Pull a human-readable message out of an auth error body
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, IdentityError> {
    serde_json::from_value(value)
        .map_err(|e| IdentityError::Unavailable(format!("unexpected response shape: {}", e)))
}

/// Sign-up answers with a full session when confirmation is disabled and
/// with a bare user object otherwise.
fn sign_up_outcome(value: Value) -> Result<SignUpOutcome, IdentityError> {
    if value.get("access_token").is_some() {
        let session: Session = decode(value)?;
        Ok(SignUpOutcome {
            user: session.user.clone(),
            session: Some(session),
        })
    } else if let Some(user) = value.get("user").cloned() {
        Ok(SignUpOutcome {
            user: decode(user)?,
            session: None,
        })
    } else {
        Ok(SignUpOutcome {
            user: decode(value)?,
            session: None,
        })
    }
}

#[async_trait]
impl IdentityProvider for SupabaseAuth {
    async fn verify(&self, token: &str) -> Result<UserIdentity, IdentityError> {
        let response = self
            .send(self.request(Method::GET, "user").bearer_auth(token))
            .await?;
        let user: UserIdentity = decode(Self::json(response).await?)?;
        debug!(user_id = %user.id, "Token verified");
        Ok(user)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, IdentityError> {
        let request = self
            .request(Method::POST, "token")
            .query(&[("grant_type", "password")])
            .json(&Credentials { email, password });
        let response = self.send(request).await?;
        decode(Self::json(response).await?)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, IdentityError> {
        let request = self
            .request(Method::POST, "signup")
            .json(&Credentials { email, password });
        let response = self.send(request).await?;
        sign_up_outcome(Self::json(response).await?)
    }

    async fn sign_out(&self, token: &str) -> Result<(), IdentityError> {
        let request = self.request(Method::POST, "logout").bearer_auth(token);
        self.send(request).await?;
        Ok(())
    }
}
