//! Payments API handlers.
//!
//! # Endpoints
//!
//! - `POST /orders`   – create a payment order for a course (bearer)
//! - `POST /callback` – gateway server-to-server notification (public)
//! - `POST /verify`   – "did my payment go through?" (bearer)

use axum::{Router, routing::post};

use crate::state::AppState;

mod callback;
mod create_order;
mod verify;

/// Build the Payments API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", post(create_order::create_order))
        .route("/callback", post(callback::callback))
        .route("/verify", post(verify::verify))
}
