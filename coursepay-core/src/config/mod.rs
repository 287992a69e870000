//! Configuration types for coursepay.
//!
//! These are the validated runtime sections shared by the core and the
//! server. Loading and parsing the TOML file is the server's job.

mod admin;
mod auth;
mod callback;
mod checkout;
mod gateway;
mod server;
mod sweeper;

pub use admin::AdminConfig;
pub use auth::{AuthConfig, StaticToken};
pub use callback::CallbackConfig;
pub use checkout::CheckoutConfig;
pub use gateway::GatewayConfig;
pub use server::ServerConfig;
pub use sweeper::SweeperConfig;

use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared configuration state with separate locks for each section.
///
/// Only `admin` and `callback` are swapped on reload. The other sections
/// are baked into long-lived clients at startup and only change on restart.
#[derive(Clone)]
pub struct SharedConfig {
    pub server: Arc<RwLock<ServerConfig>>,
    /// Admin configuration (authentication).
    pub admin: Arc<RwLock<AdminConfig>>,
    /// Optional shared secret on the callback endpoint.
    pub callback: Arc<RwLock<CallbackConfig>>,
    pub gateway: Arc<RwLock<GatewayConfig>>,
    pub checkout: Arc<RwLock<CheckoutConfig>>,
    pub auth: Arc<RwLock<AuthConfig>>,
    pub sweeper: Arc<RwLock<SweeperConfig>>,
}
