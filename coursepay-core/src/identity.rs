//! "Who is calling" oracle.
//!
//! Handlers receive an opaque bearer token and ask an [`IdentityProvider`]
//! to turn it into a [`Caller`]. An unknown or expired token is `Ok(None)`,
//! not an error.

use crate::config::{AuthConfig, StaticToken};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;
use uuid::Uuid;

/// An authenticated end user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Uuid,
    pub email: Option<String>,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("identity provider returned status {0}")]
    Status(u16),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve(&self, bearer: &str) -> Result<Option<Caller>, IdentityError>;
}

/// Resolves tokens against a hosted auth platform's user endpoint.
#[derive(Debug, Clone)]
pub struct HostedAuthIdentity {
    http: reqwest::Client,
    user_endpoint: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct HostedUser {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
}

impl HostedAuthIdentity {
    pub fn new(base_url: &Url, api_key: String) -> Result<Self, IdentityError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            user_endpoint: format!("{}/auth/v1/user", base_url.as_str().trim_end_matches('/')),
            api_key,
        })
    }
}

#[async_trait]
impl IdentityProvider for HostedAuthIdentity {
    #[tracing::instrument(skip_all, err)]
    async fn resolve(&self, bearer: &str) -> Result<Option<Caller>, IdentityError> {
        let response = self
            .http
            .get(&self.user_endpoint)
            .bearer_auth(bearer)
            .header("apikey", &self.api_key)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(IdentityError::Status(status.as_u16()));
        }

        let user: HostedUser = response.json().await?;
        Ok(Some(Caller {
            user_id: user.id,
            email: user.email,
        }))
    }
}

/// Fixed token table.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    tokens: HashMap<String, Uuid>,
}

impl StaticIdentity {
    pub fn new(tokens: impl IntoIterator<Item = StaticToken>) -> Self {
        Self {
            tokens: tokens
                .into_iter()
                .map(|t| (t.token, t.user_id))
                .collect(),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>, user_id: Uuid) -> Self {
        self.tokens.insert(token.into(), user_id);
        self
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn resolve(&self, bearer: &str) -> Result<Option<Caller>, IdentityError> {
        Ok(self.tokens.get(bearer).map(|user_id| Caller {
            user_id: *user_id,
            email: None,
        }))
    }
}

/// Build the provider named by the configuration.
pub fn from_config(config: &AuthConfig) -> Result<Arc<dyn IdentityProvider>, IdentityError> {
    Ok(match config {
        AuthConfig::Hosted { base_url, api_key } => {
            Arc::new(HostedAuthIdentity::new(base_url, api_key.clone())?)
        }
        AuthConfig::Static(tokens) => Arc::new(StaticIdentity::new(tokens.clone())),
    })
}
