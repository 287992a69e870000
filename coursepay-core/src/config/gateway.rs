//! Payment gateway credentials and client tuning.

use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// REST API root, e.g. `https://ipay.ge/opay/api/v1`.
    pub base_url: Url,
    pub client_id: String,
    pub client_secret: String,
    /// Subtracted from every token lifetime before it is cached.
    pub token_margin: Duration,
    /// Per-request timeout.
    pub timeout: Duration,
}
