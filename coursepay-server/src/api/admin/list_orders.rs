use axum::{Json, extract::Query, extract::State, response::IntoResponse};
use coursepay_core::entities::payment_order::ListPaymentOrders;
use coursepay_sdk::objects::admin::ListOrdersQuery;

use crate::api::extractors::AdminAuth;
use crate::state::AppState;

use super::{AdminApiError, clamp_pagination, order_to_admin_response};

/// `GET /orders` – list payment orders, newest first, with pagination and
/// optional filters.
pub async fn list_orders(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Query(query): Query<ListOrdersQuery>,
) -> Result<impl IntoResponse, AdminApiError> {
    let (limit, offset) = clamp_pagination(query.limit, query.offset);

    let orders = state
        .payments
        .orders()
        .list_orders(ListPaymentOrders {
            status: query.status.map(Into::into),
            user_id: query.user_id,
            limit,
            offset,
        })
        .await
        .map_err(AdminApiError::Store)?;

    let response: Vec<_> = orders.iter().map(order_to_admin_response).collect();
    Ok(Json(response))
}
