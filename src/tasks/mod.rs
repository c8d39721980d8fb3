//! Background jobs started once at boot.

use crate::config::TasksConfig;
use crate::services::PaymentService;
use chrono::Duration;

/// Spawns the pending-payment sweep unless it is disabled.
///
/// Detaches via `tokio::spawn`; it does not block.
pub fn spawn_all(payment_service: PaymentService, config: &TasksConfig) {
    if config.reconcile_interval_secs == 0 {
        log::info!("Pending payment reconciliation disabled");
        return;
    }

    let interval = std::time::Duration::from_secs(config.reconcile_interval_secs);
    let older_than = Duration::seconds(config.reconcile_after_secs);
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            match payment_service.reconcile_pending(older_than).await {
                Ok(0) => {}
                Ok(n) => log::info!("Reconciled {n} pending payments"),
                Err(e) => log::error!("Failed to reconcile pending payments: {e}"),
            }
        }
    });
}
