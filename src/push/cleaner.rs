use std::sync::Arc;
use tracing::info;

use super::SubscriptionStore;
use crate::{error::Error, model::PushSubscription};

/// Removes the user's rows whose endpoint is no longer the live one, so the
/// dispatcher never sends to rotated endpoints.
pub struct StaleSubscriptionCleaner {
    store: Arc<dyn SubscriptionStore>,
}

impl StaleSubscriptionCleaner {
    pub fn new(store: Arc<dyn SubscriptionStore>) -> Self {
        Self { store }
    }

    pub async fn prune(
        &self,
        user_id: &str,
        live_endpoint: &str,
    ) -> Result<u64, Error> {
        let records = self.store.get_by_user(user_id).await?;
        let ids = stale_ids(&records, live_endpoint);

        if ids.is_empty() {
            return Ok(0);
        }

        let deleted = self.store.delete_by_ids(user_id, &ids).await?;
        info!(user_id, deleted, "Pruned stale push subscriptions");

        Ok(deleted)
    }
}

pub fn stale_ids(
    records: &[PushSubscription],
    live_endpoint: &str,
) -> Vec<i64> {
    records
        .iter()
        .filter(|record| record.endpoint != live_endpoint)
        .map(|record| record.id)
        .collect()
}
