use super::settle::Settlement;
use super::{PaymentError, PaymentService};
use crate::entities::PaymentOrderStatus;
use crate::entities::payment_order::{OrderLookup, PaymentOrder};
use crate::identity::Caller;
use coursepay_sdk::objects::{
    CourseSummary, VerificationStatus, VerifyPaymentRequest, VerifyPaymentResponse,
};

impl PaymentService {
    /// Answer "did my payment go through?" for the caller's own order.
    ///
    /// Business outcomes are all `Ok`; only a missing caller, a request
    /// without identifiers and store failures are errors. Orders of other
    /// users look exactly like absent ones.
    #[tracing::instrument(skip_all, err)]
    pub async fn verify(
        &self,
        caller: Option<&Caller>,
        request: VerifyPaymentRequest,
    ) -> Result<VerifyPaymentResponse, PaymentError> {
        let caller = caller.ok_or(PaymentError::Unauthorized)?;

        let external = request.order_id.filter(|id| !id.trim().is_empty());
        let lookup = match (request.payment_order_id, external) {
            (Some(id), _) => OrderLookup::Internal(id),
            (None, Some(external)) => OrderLookup::External(external),
            (None, None) => {
                return Err(PaymentError::BadRequest(
                    "orderId or paymentOrderId is required".to_owned(),
                ));
            }
        };

        let Some(order) = self.orders.order_for_user(caller.user_id, lookup).await? else {
            return Ok(VerifyPaymentResponse {
                status: VerificationStatus::NotFound,
                message: "payment order not found".to_owned(),
                course: None,
            });
        };

        let settlement = match order.status {
            PaymentOrderStatus::Success => Settlement::Paid(order),
            PaymentOrderStatus::Failed | PaymentOrderStatus::Cancelled => Settlement::Failed {
                reason: order
                    .status_description
                    .clone()
                    .unwrap_or_else(|| "payment failed".to_owned()),
                order,
            },
            PaymentOrderStatus::Pending | PaymentOrderStatus::Redirected => {
                self.settle_from_gateway(&order).await?
            }
        };
        Ok(response_for(settlement))
    }
}

fn response_for(settlement: Settlement) -> VerifyPaymentResponse {
    match settlement {
        Settlement::Paid(order) => VerifyPaymentResponse {
            status: VerificationStatus::Success,
            message: "payment confirmed".to_owned(),
            course: Some(course_summary(&order)),
        },
        Settlement::Failed { order, reason } => VerifyPaymentResponse {
            status: VerificationStatus::Failed,
            message: reason,
            course: Some(course_summary(&order)),
        },
        Settlement::Pending { reason } => VerifyPaymentResponse {
            status: VerificationStatus::Pending,
            message: reason,
            course: None,
        },
    }
}

fn course_summary(order: &PaymentOrder) -> CourseSummary {
    CourseSummary {
        id: order.course_id,
        title: order.course_title.clone(),
    }
}
