//! Custom Axum extractors for request authentication.
//!
//! Provides:
//! - `MaybeCaller` – resolves the `Authorization: Bearer` token through the
//!   identity provider (used by the payments API).
//! - `AdminAuth` – checks the `Coursepay-Admin-Authorization` header against
//!   the argon2 admin hash (used by the admin API).
//! - `CallbackToken` – checks the optional `?token=` shared secret on the
//!   gateway callback.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use coursepay_core::identity::Caller;
use coursepay_sdk::ADMIN_AUTH_HEADER;
use coursepay_sdk::objects::ErrorBody;
use ring::hmac;

use crate::state::AppState;

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.to_owned(),
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// MaybeCaller – bearer token identity
// ---------------------------------------------------------------------------

/// The resolved end user, or `None` when the request carries no usable
/// bearer token. Handlers hand it to the payment service, which decides
/// whether identity is required.
pub struct MaybeCaller(pub Option<Caller>);

/// The identity provider itself failed.
#[derive(Debug)]
pub struct IdentityUnavailable;

impl IntoResponse for IdentityUnavailable {
    fn into_response(self) -> Response {
        error_response(StatusCode::BAD_GATEWAY, "identity provider unavailable")
    }
}

impl FromRequestParts<AppState> for MaybeCaller {
    type Rejection = IdentityUnavailable;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts) else {
            return Ok(MaybeCaller(None));
        };

        match state.identity.resolve(token).await {
            Ok(caller) => Ok(MaybeCaller(caller)),
            Err(e) => {
                tracing::error!(error = %e, "Identity provider request failed");
                Err(IdentityUnavailable)
            }
        }
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

// ---------------------------------------------------------------------------
// AdminAuth – back-office secret
// ---------------------------------------------------------------------------

/// Proof that the request carried the admin secret.
pub struct AdminAuth;

#[derive(Debug)]
pub enum AdminAuthError {
    MissingHeader,
    InvalidSecret,
}

impl IntoResponse for AdminAuthError {
    fn into_response(self) -> Response {
        let message = match self {
            AdminAuthError::MissingHeader => "missing Coursepay-Admin-Authorization header",
            AdminAuthError::InvalidSecret => "invalid admin secret",
        };
        error_response(StatusCode::UNAUTHORIZED, message)
    }
}

impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = AdminAuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let secret = parts
            .headers
            .get(ADMIN_AUTH_HEADER)
            .ok_or(AdminAuthError::MissingHeader)?
            .to_str()
            .map_err(|_| AdminAuthError::InvalidSecret)?;

        let admin = state.config.admin.read().await;
        if admin.verify_secret(secret) {
            Ok(AdminAuth)
        } else {
            tracing::warn!("Rejected admin request with a wrong secret");
            Err(AdminAuthError::InvalidSecret)
        }
    }
}

// ---------------------------------------------------------------------------
// CallbackToken – optional shared secret on the callback URL
// ---------------------------------------------------------------------------

/// Passes when no callback token is configured, or when `?token=` matches it.
pub struct CallbackToken;

#[derive(Debug)]
pub struct CallbackTokenRejected;

impl IntoResponse for CallbackTokenRejected {
    fn into_response(self) -> Response {
        error_response(StatusCode::UNAUTHORIZED, "invalid callback token")
    }
}

impl FromRequestParts<AppState> for CallbackToken {
    type Rejection = CallbackTokenRejected;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let callback = state.config.callback.read().await;
        let Some(expected) = callback.token.as_deref() else {
            return Ok(CallbackToken);
        };

        let presented = parts.uri.query().and_then(|query| {
            url::form_urlencoded::parse(query.as_bytes())
                .find(|(key, _)| key == "token")
                .map(|(_, value)| value.into_owned())
        });

        match presented {
            Some(presented) if tokens_match(expected, &presented) => Ok(CallbackToken),
            _ => {
                tracing::warn!("Rejected callback with a missing or wrong token");
                Err(CallbackTokenRejected)
            }
        }
    }
}

/// Constant-time comparison: both sides are MACed under a key derived from
/// the expected token and the tags compared with `hmac::verify`.
fn tokens_match(expected: &str, presented: &str) -> bool {
    let key = hmac::Key::new(hmac::HMAC_SHA256, expected.as_bytes());
    let expected_tag = hmac::sign(&key, expected.as_bytes());
    hmac::verify(&key, presented.as_bytes(), expected_tag.as_ref()).is_ok()
}
