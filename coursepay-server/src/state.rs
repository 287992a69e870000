//! Application state shared across all request handlers.

use crate::config::runtime::SharedConfig;
use coursepay_core::identity::IdentityProvider;
use coursepay_core::payments::PaymentService;
use std::sync::Arc;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    /// The reconciliation state machine, over the stores and the gateway.
    pub payments: PaymentService,
    /// Resolves bearer tokens to callers.
    pub identity: Arc<dyn IdentityProvider>,
    /// Runtime configuration (admin and callback sections reload on SIGHUP).
    pub config: SharedConfig,
}

impl AppState {
    pub fn new(
        payments: PaymentService,
        identity: Arc<dyn IdentityProvider>,
        config: SharedConfig,
    ) -> Self {
        Self {
            payments,
            identity,
            config,
        }
    }
}
