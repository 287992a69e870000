//! Identity provider configuration.

use url::Url;
use uuid::Uuid;

/// Where bearer tokens are resolved to users.
#[derive(Debug, Clone)]
pub enum AuthConfig {
    /// Ask the hosted auth platform (`GET {base_url}/auth/v1/user`).
    Hosted { base_url: Url, api_key: String },
    /// A fixed token table, for local development.
    Static(Vec<StaticToken>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticToken {
    pub token: String,
    pub user_id: Uuid,
}
