//! Fixed parameters of every order sent to the gateway.

use crate::entities::PaymentIntent;

#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// ISO 4217 code all courses are priced in.
    pub currency: String,
    /// Hosted page locale used when the request does not name one.
    pub locale: String,
    pub intent: PaymentIntent,
    /// Where the gateway sends the browser after a successful payment.
    pub success_url: String,
    /// Where the gateway sends the browser after a failed or abandoned payment.
    pub fail_url: String,
    /// Server-to-server notification URL handed to the gateway.
    pub callback_url: Option<String>,
}
