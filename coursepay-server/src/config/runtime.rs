//! Runtime configuration re-exports.
//!
//! The validated config types live in `coursepay-core::config`.

pub use coursepay_core::config::{
    AdminConfig, AuthConfig, CallbackConfig, CheckoutConfig, GatewayConfig, ServerConfig,
    SharedConfig, StaticToken, SweeperConfig,
};
