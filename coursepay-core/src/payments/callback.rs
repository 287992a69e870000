use super::status::map_callback_status;
use super::{PaymentError, PaymentService};
use crate::entities::PaymentOrderStatus;
use crate::entities::payment_order::OrderStatusUpdate;
use coursepay_sdk::objects::{CallbackAck, CallbackNotice};
use tracing::{info, warn};

impl PaymentService {
    /// Apply a gateway callback.
    ///
    /// Callbacks never create orders. Replays are safe: a terminal order is
    /// never rewritten, and a repeated success only re-runs the idempotent
    /// enrollment upsert.
    #[tracing::instrument(skip_all, err, fields(shop_order_id = ?notice.shop_order_id, status = %notice.status))]
    pub async fn handle_callback(&self, notice: CallbackNotice) -> Result<CallbackAck, PaymentError> {
        let shop_order_id = notice
            .shop_order_id
            .ok_or_else(|| PaymentError::BadRequest("shop_order_id is required".to_owned()))?;

        let order = self
            .orders
            .order_by_shop_order_id(&shop_order_id)
            .await?
            .ok_or_else(|| PaymentError::NotFound(format!("payment order {shop_order_id}")))?;

        if let (Some(stored), Some(received)) = (&order.external_payment_hash, &notice.payment_hash)
            && stored != received
        {
            warn!(
                shop_order_id = %shop_order_id,
                "Callback payment hash does not match stored hash; possible tampering or replay"
            );
            return Err(PaymentError::Conflict("payment hash mismatch".to_owned()));
        }

        let incoming = map_callback_status(&notice.status);

        if order.status.is_terminal() {
            Self::report_late_outcome(&order, incoming);
            if order.status == PaymentOrderStatus::Success && incoming == PaymentOrderStatus::Success {
                info!(shop_order_id = %shop_order_id, "Duplicate success callback, re-applying enrollment");
                self.sync_enrollment(&order).await?;
            }
            return Ok(CallbackAck { received: true });
        }

        let status = match incoming {
            PaymentOrderStatus::Pending | PaymentOrderStatus::Redirected => order.status,
            settled => settled,
        };
        let description = notice
            .status_description
            .unwrap_or_else(|| format!("gateway callback: {}", notice.status));

        self.transition(OrderStatusUpdate {
            shop_order_id,
            status,
            description,
            external_order_id: notice.external_order_id,
            external_payment_id: notice.external_payment_id,
            payment_hash: notice.payment_hash,
        })
        .await?;
        Ok(CallbackAck { received: true })
    }
}
