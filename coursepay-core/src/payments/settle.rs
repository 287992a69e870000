use super::status::{GatewayVerdict, classify_details};
use super::{PaymentError, PaymentService};
use crate::entities::PaymentOrderStatus;
use crate::entities::payment_order::{OrderStatusUpdate, PaymentOrder};
use crate::gateway::PaymentDetails;
use rust_decimal::Decimal;
use tracing::{info, warn};

/// Largest settled-amount deviation still accepted as a match.
const AMOUNT_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Outcome of asking the gateway about an order.
#[derive(Debug, Clone, PartialEq)]
pub enum Settlement {
    /// The order is `success` in the store.
    Paid(PaymentOrder),
    /// The order is `failed` or `cancelled` in the store.
    Failed { order: PaymentOrder, reason: String },
    /// Nothing decided yet; nothing written.
    Pending { reason: String },
}

impl PaymentService {
    /// Reconcile one non-terminal order against the gateway's payment
    /// details. Shared by verification and the stale order sweeper.
    ///
    /// Gateway failures are never errors here: they leave the order as it
    /// is and come back as [`Settlement::Pending`].
    #[tracing::instrument(skip_all, err, fields(shop_order_id = %order.shop_order_id))]
    pub async fn settle_from_gateway(&self, order: &PaymentOrder) -> Result<Settlement, PaymentError> {
        let Some(external_order_id) = order.external_order_id.as_deref() else {
            return Ok(Settlement::Pending {
                reason: "order has not reached the gateway yet".to_owned(),
            });
        };

        let details = match self.gateway.payment_details(external_order_id).await {
            Ok(details) => details,
            Err(e) => {
                warn!(error = %e, "Payment details unavailable, reporting pending");
                return Ok(Settlement::Pending {
                    reason: "payment status is not available yet".to_owned(),
                });
            }
        };

        if let Some(echoed) = details.receipt.shop_order_id.as_deref()
            && echoed != order.shop_order_id
        {
            warn!(echoed, "Gateway receipt belongs to a different order");
            return self.settle_failed(order, &details, "order mismatch").await;
        }

        if !receipt_matches_order(order, &details) {
            warn!(
                expected_amount = %order.amount,
                expected_currency = %order.currency_code,
                settled_amount = ?details.receipt.amount,
                settled_currency = ?details.receipt.currency_code,
                "Gateway receipt does not match order"
            );
            return self
                .settle_failed(order, &details, "amount/currency mismatch")
                .await;
        }

        match classify_details(&details) {
            GatewayVerdict::Settled => {
                let receipt = &details.receipt;
                if receipt.shop_order_id.is_none()
                    || receipt.amount.is_none()
                    || receipt.currency_code.is_none()
                {
                    info!("Gateway reports success with an incomplete receipt");
                    return Ok(Settlement::Pending {
                        reason: "payment receipt is incomplete".to_owned(),
                    });
                }
                let stored = self
                    .apply_details(order, &details, PaymentOrderStatus::Success, "payment confirmed by gateway")
                    .await?;
                Ok(Self::settlement_of(stored))
            }
            GatewayVerdict::Rejected => {
                let reason = format!("gateway reported {}", details.status);
                self.settle_failed(order, &details, &reason).await
            }
            GatewayVerdict::Undecided => Ok(Settlement::Pending {
                reason: format!("payment is {}", details.status.to_lowercase()),
            }),
        }
    }

    async fn settle_failed(
        &self,
        order: &PaymentOrder,
        details: &PaymentDetails,
        reason: &str,
    ) -> Result<Settlement, PaymentError> {
        let stored = self
            .apply_details(order, details, PaymentOrderStatus::Failed, reason)
            .await?;
        Ok(Self::settlement_of(stored))
    }

    async fn apply_details(
        &self,
        order: &PaymentOrder,
        details: &PaymentDetails,
        status: PaymentOrderStatus,
        description: &str,
    ) -> Result<PaymentOrder, PaymentError> {
        self.transition(OrderStatusUpdate {
            shop_order_id: order.shop_order_id.clone(),
            status,
            description: description.to_owned(),
            external_order_id: None,
            external_payment_id: details.payment_id.clone(),
            payment_hash: None,
        })
        .await
    }

    /// Report what the store holds, which may be another path's outcome.
    fn settlement_of(order: PaymentOrder) -> Settlement {
        match order.status {
            PaymentOrderStatus::Success => Settlement::Paid(order),
            PaymentOrderStatus::Failed | PaymentOrderStatus::Cancelled => Settlement::Failed {
                reason: order
                    .status_description
                    .clone()
                    .unwrap_or_else(|| order.status.to_string()),
                order,
            },
            PaymentOrderStatus::Pending | PaymentOrderStatus::Redirected => Settlement::Pending {
                reason: "payment is still in progress".to_owned(),
            },
        }
    }
}

/// Amount within tolerance and currency equal (ignoring case). Missing
/// receipt fields are not a mismatch; they only block success.
fn receipt_matches_order(order: &PaymentOrder, details: &PaymentDetails) -> bool {
    let amount_ok = details
        .receipt
        .amount
        .is_none_or(|settled| (settled - order.amount).abs() <= AMOUNT_TOLERANCE);
    let currency_ok = details
        .receipt
        .currency_code
        .as_deref()
        .is_none_or(|settled| settled.eq_ignore_ascii_case(&order.currency_code));
    amount_ok && currency_ok
}
