use axum::{Json, extract::Query, extract::State, response::IntoResponse};
use coursepay_core::entities::enrollment::ListEnrollments;
use coursepay_sdk::objects::admin::ListEnrollmentsQuery;

use crate::api::extractors::AdminAuth;
use crate::state::AppState;

use super::{AdminApiError, enrollment_to_admin_response};

/// `GET /enrollments` – list enrollments, optionally for one user or course.
pub async fn list_enrollments(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Query(query): Query<ListEnrollmentsQuery>,
) -> Result<impl IntoResponse, AdminApiError> {
    let enrollments = state
        .payments
        .enrollments()
        .list_enrollments(ListEnrollments {
            user_id: query.user_id,
            course_id: query.course_id,
        })
        .await
        .map_err(AdminApiError::Store)?;

    let response: Vec<_> = enrollments
        .iter()
        .map(enrollment_to_admin_response)
        .collect();
    Ok(Json(response))
}
