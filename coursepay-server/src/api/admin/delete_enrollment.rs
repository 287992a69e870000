use axum::{extract::Path, extract::State, http::StatusCode};
use coursepay_core::entities::enrollment::DeleteEnrollment;
use uuid::Uuid;

use crate::api::extractors::AdminAuth;
use crate::state::AppState;

use super::AdminApiError;

/// `DELETE /enrollments/{user_id}/{course_id}` – revoke course access.
///
/// This is the only path that removes a paid enrollment. Payment orders
/// are left untouched for the audit trail.
pub async fn delete_enrollment(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Path((user_id, course_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AdminApiError> {
    let deleted = state
        .payments
        .enrollments()
        .delete_enrollment(DeleteEnrollment { user_id, course_id })
        .await
        .map_err(AdminApiError::Store)?;

    if !deleted {
        return Err(AdminApiError::NotFound);
    }

    tracing::info!(%user_id, %course_id, "Enrollment deleted by admin");
    Ok(StatusCode::NO_CONTENT)
}
