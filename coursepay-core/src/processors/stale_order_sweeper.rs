//! StaleOrderSweeper processor.
//!
//! Users close the tab on the hosted payment page, and callbacks get lost.
//! The sweeper periodically picks `redirected` orders that have not moved
//! for a while and settles them from the gateway with the same rules as
//! user-triggered verification. Every examined order gets `last_checked_at`
//! stamped, which sends it to the back of the next scan.

use crate::config::SweeperConfig;
use crate::entities::payment_order::{ListStaleRedirectedOrders, MarkOrderChecked};
use crate::payments::{PaymentError, PaymentService, Settlement};
use time::OffsetDateTime;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Orders looked at per sweep.
const SWEEP_BATCH: i64 = 100;

/// Tally of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub examined: usize,
    pub paid: usize,
    pub failed: usize,
    pub pending: usize,
}

pub struct StaleOrderSweeper {
    service: PaymentService,
    config: SweeperConfig,
    shutdown_rx: watch::Receiver<bool>,
}

impl StaleOrderSweeper {
    pub fn new(
        service: PaymentService,
        config: SweeperConfig,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            service,
            config,
            shutdown_rx,
        }
    }

    /// Run until the shutdown channel flips to `true`.
    pub async fn run(mut self) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            min_age_secs = self.config.min_age.as_secs(),
            "StaleOrderSweeper started"
        );

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown_rx.changed() => {
                    if *self.shutdown_rx.borrow() {
                        info!("StaleOrderSweeper received shutdown signal");
                        break;
                    }
                }

                _ = tokio::time::sleep(self.config.interval) => {
                    match self.sweep_once().await {
                        Ok(report) if report.examined > 0 => info!(?report, "Stale orders swept"),
                        Ok(_) => debug!("No stale orders"),
                        Err(e) => error!(error = %e, "Failed to sweep stale orders"),
                    }
                }
            }
        }

        info!("StaleOrderSweeper shutdown complete");
    }

    /// Settle one batch of stale orders.
    ///
    /// A store failure on one order is logged and the batch continues.
    pub async fn sweep_once(&self) -> Result<SweepReport, PaymentError> {
        let older_than = OffsetDateTime::now_utc() - self.config.min_age;
        let stale = self
            .service
            .orders()
            .stale_redirected_orders(ListStaleRedirectedOrders {
                older_than,
                limit: SWEEP_BATCH,
            })
            .await?;

        let mut report = SweepReport::default();
        for order in stale {
            report.examined += 1;
            match self.service.settle_from_gateway(&order).await {
                Ok(Settlement::Paid(_)) => report.paid += 1,
                Ok(Settlement::Failed { .. }) => report.failed += 1,
                Ok(Settlement::Pending { .. }) => report.pending += 1,
                Err(e) => {
                    report.pending += 1;
                    error!(shop_order_id = %order.shop_order_id, error = %e, "Failed to settle stale order");
                }
            }
            // No-op for orders that just settled.
            if let Err(e) = self
                .service
                .orders()
                .mark_checked(MarkOrderChecked { order_id: order.id })
                .await
            {
                warn!(shop_order_id = %order.shop_order_id, error = %e, "Failed to record sweeper check");
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{EnrollmentPaymentStatus, PaymentOrderStatus};
    use crate::gateway::PaymentDetails;
    use crate::identity::Caller;
    use crate::payments::testing::{fixture, settled_details};
    use crate::store::OrderStore;
    use coursepay_sdk::objects::CreateOrderRequest;
    use std::time::Duration;
    use uuid::Uuid;

    fn config() -> SweeperConfig {
        SweeperConfig {
            enabled: true,
            interval: Duration::from_secs(60),
            min_age: Duration::from_secs(900),
        }
    }

    #[tokio::test]
    async fn test_sweep_settles_only_old_orders() {
        let fx = fixture().await;
        let user = Uuid::new_v4();
        let caller = Caller {
            user_id: user,
            email: None,
        };
        let request = CreateOrderRequest {
            course_id: Some(fx.course.id.to_string()),
            ..Default::default()
        };

        let old = fx
            .service
            .create_order(Some(&caller), request.clone())
            .await
            .unwrap();
        let declined = fx
            .service
            .create_order(Some(&caller), request.clone())
            .await
            .unwrap();
        let fresh = fx
            .service
            .create_order(Some(&caller), request)
            .await
            .unwrap();
        for created in [&old, &declined] {
            fx.store
                .backdate_order(&created.shop_order_id, time::Duration::minutes(30))
                .await;
        }
        fx.gateway.script_details(
            &old.order_id,
            settled_details(&old.shop_order_id, fx.course.price.unwrap(), "GEL"),
        );
        fx.gateway.script_details(
            &declined.order_id,
            PaymentDetails {
                status: "declined".to_owned(),
                ..Default::default()
            },
        );

        let (_tx, rx) = watch::channel(false);
        let sweeper = StaleOrderSweeper::new(fx.service.clone(), config(), rx);
        let report = sweeper.sweep_once().await.unwrap();
        assert_eq!(
            report,
            SweepReport {
                examined: 2,
                paid: 1,
                failed: 1,
                pending: 0
            }
        );

        let status = |id: String| {
            let store = fx.store.clone();
            async move {
                store
                    .order_by_shop_order_id(&id)
                    .await
                    .unwrap()
                    .unwrap()
                    .status
            }
        };
        assert_eq!(status(old.shop_order_id).await, PaymentOrderStatus::Success);
        assert_eq!(
            status(declined.shop_order_id).await,
            PaymentOrderStatus::Failed
        );
        assert_eq!(
            status(fresh.shop_order_id).await,
            PaymentOrderStatus::Redirected
        );
        assert_eq!(
            fx.store
                .enrollment(user, fx.course.id)
                .await
                .unwrap()
                .payment_status,
            EnrollmentPaymentStatus::Paid
        );
    }

    #[tokio::test]
    async fn test_unreachable_gateway_leaves_orders_alone() {
        let fx = fixture().await;
        let caller = Caller {
            user_id: Uuid::new_v4(),
            email: None,
        };
        let created = fx
            .service
            .create_order(
                Some(&caller),
                CreateOrderRequest {
                    course_id: Some(fx.course.id.to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        fx.store
            .backdate_order(&created.shop_order_id, time::Duration::hours(2))
            .await;

        let (_tx, rx) = watch::channel(false);
        let report = StaleOrderSweeper::new(fx.service.clone(), config(), rx)
            .sweep_once()
            .await
            .unwrap();
        assert_eq!(report.pending, 1);
        let order = fx
            .store
            .order_by_shop_order_id(&created.shop_order_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(order.status, PaymentOrderStatus::Redirected);
    }

    #[tokio::test]
    async fn test_undecided_orders_do_not_block_later_ones() {
        let fx = fixture().await;
        let payer = Uuid::new_v4();
        let request = CreateOrderRequest {
            course_id: Some(fx.course.id.to_string()),
            ..Default::default()
        };

        let abandoned = usize::try_from(SWEEP_BATCH).unwrap() + 5;
        for _ in 0..abandoned {
            let caller = Caller {
                user_id: Uuid::new_v4(),
                email: None,
            };
            let created = fx
                .service
                .create_order(Some(&caller), request.clone())
                .await
                .unwrap();
            fx.store
                .backdate_order(&created.shop_order_id, time::Duration::hours(10))
                .await;
            fx.gateway.script_details(
                &created.order_id,
                PaymentDetails {
                    status: "CREATED".to_owned(),
                    ..Default::default()
                },
            );
        }

        let paid = fx
            .service
            .create_order(
                Some(&Caller {
                    user_id: payer,
                    email: None,
                }),
                request,
            )
            .await
            .unwrap();
        fx.store
            .backdate_order(&paid.shop_order_id, time::Duration::hours(1))
            .await;
        fx.gateway.script_details(
            &paid.order_id,
            settled_details(&paid.shop_order_id, fx.course.price.unwrap(), "GEL"),
        );

        let (_tx, rx) = watch::channel(false);
        let sweeper = StaleOrderSweeper::new(fx.service.clone(), config(), rx);
        let first = sweeper.sweep_once().await.unwrap();
        assert_eq!(first.examined, 100);
        assert_eq!(first.paid, 0);

        let second = sweeper.sweep_once().await.unwrap();
        assert_eq!(second.paid, 1);
        assert_eq!(second.pending, second.examined - 1);

        let order = fx
            .store
            .order_by_shop_order_id(&paid.shop_order_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(order.status, PaymentOrderStatus::Success);
        assert_eq!(
            fx.store
                .enrollment(payer, fx.course.id)
                .await
                .unwrap()
                .payment_status,
            EnrollmentPaymentStatus::Paid
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_shutdown() {
        let fx = fixture().await;
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(StaleOrderSweeper::new(fx.service.clone(), config(), rx).run());

        tokio::time::advance(Duration::from_secs(125)).await;
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
