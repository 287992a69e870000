//! Admin API client (back office → coursepay server).
//!
//! All requests carry the plaintext admin secret in the
//! `Coursepay-Admin-Authorization` header.

use reqwest::Client;
use url::Url;
use uuid::Uuid;

use super::{ClientError, parse_response};
use crate::ADMIN_AUTH_HEADER;
use crate::objects::admin::{
    AdminEnrollmentResponse, AdminOrderResponse, ListEnrollmentsQuery, ListOrdersQuery,
};

/// Typed HTTP client for the coursepay **Admin API**.
#[derive(Debug, Clone)]
pub struct AdminClient {
    http: Client,
    base_url: Url,
    admin_secret: String,
}

impl AdminClient {
    pub fn new(base_url: Url, admin_secret: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url,
            admin_secret: admin_secret.into(),
        }
    }

    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// `GET /api/v1/admin/orders`
    pub async fn list_orders(
        &self,
        query: &ListOrdersQuery,
    ) -> Result<Vec<AdminOrderResponse>, ClientError> {
        let url = self.base_url.join("/api/v1/admin/orders")?;

        let resp = self
            .http
            .get(url)
            .header(ADMIN_AUTH_HEADER, &self.admin_secret)
            .query(query)
            .send()
            .await?;

        parse_response(resp).await
    }

    /// `GET /api/v1/admin/enrollments`
    pub async fn list_enrollments(
        &self,
        query: &ListEnrollmentsQuery,
    ) -> Result<Vec<AdminEnrollmentResponse>, ClientError> {
        let url = self.base_url.join("/api/v1/admin/enrollments")?;

        let resp = self
            .http
            .get(url)
            .header(ADMIN_AUTH_HEADER, &self.admin_secret)
            .query(query)
            .send()
            .await?;

        parse_response(resp).await
    }

    /// `DELETE /api/v1/admin/enrollments/{user_id}/{course_id}`
    ///
    /// Revokes course access. There is no undo.
    pub async fn delete_enrollment(&self, user_id: Uuid, course_id: Uuid) -> Result<(), ClientError> {
        let url = self
            .base_url
            .join(&format!("/api/v1/admin/enrollments/{user_id}/{course_id}"))?;

        let resp = self
            .http
            .delete(url)
            .header(ADMIN_AUTH_HEADER, &self.admin_secret)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Api { status, body });
        }
        Ok(())
    }
}
