use super::{PaymentError, PaymentService, shop_order_id};
use crate::entities::PaymentOrderStatus;
use crate::entities::payment_order::{
    OrderMetadata, OrderRedirect, OrderStatusUpdate, PaymentOrder, PaymentOrderInsert,
};
use crate::gateway::{CreateExternalOrder, GatewayError};
use crate::identity::Caller;
use crate::store::StoreError;
use coursepay_sdk::objects::{CreateOrderRequest, CreateOrderResponse};
use rust_decimal::Decimal;
use tracing::{error, info, warn};
use uuid::Uuid;

impl PaymentService {
    /// Create a payment order for `caller` and hand it to the gateway.
    ///
    /// Once the order row exists, every failure path marks it `failed`
    /// before returning, so no order is left `pending` by this call.
    #[tracing::instrument(skip_all, err, fields(user_id = tracing::field::Empty))]
    pub async fn create_order(
        &self,
        caller: Option<&Caller>,
        request: CreateOrderRequest,
    ) -> Result<CreateOrderResponse, PaymentError> {
        let caller = caller.ok_or(PaymentError::Unauthorized)?;
        tracing::Span::current().record("user_id", tracing::field::display(caller.user_id));

        let course_id = request
            .course_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| PaymentError::BadRequest("courseId is required".to_owned()))?;
        let course_id = Uuid::parse_str(course_id)
            .map_err(|_| PaymentError::BadRequest(format!("invalid courseId: {course_id}")))?;

        let course = self
            .courses
            .course(course_id)
            .await?
            .ok_or_else(|| PaymentError::NotFound(format!("course {course_id}")))?;
        let amount = course
            .price
            .filter(|price| *price > Decimal::ZERO)
            .ok_or_else(|| {
                PaymentError::InvalidState(format!("course {course_id} has no positive price"))
            })?;

        let locale = request
            .locale
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| self.checkout.locale.clone());

        let order = self
            .orders
            .insert_order(PaymentOrderInsert {
                shop_order_id: shop_order_id::generate(course_id),
                user_id: caller.user_id,
                course_id,
                course_title: course.title,
                amount,
                currency_code: self.checkout.currency.clone(),
                locale,
                intent: self.checkout.intent,
                callback_url: self.checkout.callback_url.clone(),
                metadata: OrderMetadata {
                    payment_method: request.payment_method.clone(),
                    installment_months: request.installment_months,
                    discount_code: request.discount_code,
                },
            })
            .await
            .map_err(|e| match e {
                StoreError::Duplicate(key) => {
                    warn!(key = %key, "Shop order id collision");
                    PaymentError::Conflict("duplicate shop order id".to_owned())
                }
                other => PaymentError::Store(other),
            })?;
        info!(
            shop_order_id = %order.shop_order_id,
            amount = %order.amount,
            "Payment order created"
        );

        let external = match self
            .gateway
            .create_order(CreateExternalOrder {
                shop_order_id: order.shop_order_id.clone(),
                amount: order.amount,
                currency_code: order.currency_code.clone(),
                course_id: order.course_id,
                course_title: order.course_title.clone(),
                locale: order.locale.clone(),
                intent: order.intent,
                success_url: self.checkout.success_url.clone(),
                fail_url: self.checkout.fail_url.clone(),
                callback_url: order.callback_url.clone(),
                payment_method: request.payment_method,
                installment_months: request.installment_months,
            })
            .await
        {
            Ok(external) => external,
            Err(e) => {
                error!(shop_order_id = %order.shop_order_id, error = %e, "Gateway order creation failed");
                self.fail_unsent_order(&order, format!("gateway order creation failed: {e}"))
                    .await?;
                return Err(e.into());
            }
        };

        let Some(redirect_url) = external.approve_link().map(str::to_owned) else {
            let reason = "gateway response missing approve link";
            error!(shop_order_id = %order.shop_order_id, "{reason}");
            self.fail_unsent_order(&order, reason.to_owned()).await?;
            return Err(GatewayError::InvalidResponse(reason.to_owned()).into());
        };

        let redirected = self
            .orders
            .mark_redirected(OrderRedirect {
                order_id: order.id,
                external_order_id: external.order_id.clone(),
                redirect_url: redirect_url.clone(),
                payment_hash: external.payment_hash.clone(),
            })
            .await
            .inspect_err(|e| {
                error!(
                    shop_order_id = %order.shop_order_id,
                    external_order_id = %external.order_id,
                    redirect_url = %redirect_url,
                    error = %e,
                    "Gateway order created but redirect not recorded; order needs manual reconciliation"
                );
            })?;
        match redirected {
            Some(_) => info!(
                shop_order_id = %order.shop_order_id,
                external_order_id = %external.order_id,
                "Payment order redirected to gateway"
            ),
            // A callback can beat us here; the order is settled either way.
            None => info!(
                shop_order_id = %order.shop_order_id,
                "Order settled before the redirect was recorded"
            ),
        }

        Ok(CreateOrderResponse {
            redirect_url,
            shop_order_id: order.shop_order_id,
            order_id: external.order_id,
        })
    }

    async fn fail_unsent_order(
        &self,
        order: &PaymentOrder,
        description: String,
    ) -> Result<(), PaymentError> {
        self.transition(OrderStatusUpdate {
            shop_order_id: order.shop_order_id.clone(),
            status: PaymentOrderStatus::Failed,
            description,
            external_order_id: None,
            external_payment_id: None,
            payment_hash: None,
        })
        .await?;
        Ok(())
    }
}
