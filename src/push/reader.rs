use serde::Serialize;
use std::{sync::Arc, time::Duration};
use tracing::debug;

use super::{platform::wait_ready, PushPlatform, SubscriptionStore};
use crate::{
    error::Error,
    model::PushSubscription,
    types::{BrowserSubscription, PermissionState},
};

/// How the live browser subscription relates to the persisted rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    /// The live endpoint matches a persisted row.
    Consistent,
    /// A live subscription exists without a matching row.
    Drift,
    /// No live subscription.
    Missing,
}

impl SyncState {
    pub fn compare(
        live: Option<&BrowserSubscription>,
        records: &[PushSubscription],
    ) -> SyncState {
        match live {
            None => SyncState::Missing,
            Some(subscription)
                if records
                    .iter()
                    .any(|record| record.endpoint == subscription.endpoint) =>
            {
                SyncState::Consistent
            },
            Some(_) => SyncState::Drift,
        }
    }

    pub fn needs_recovery(&self) -> bool {
        !matches!(self, SyncState::Consistent)
    }
}

#[derive(Debug, Clone)]
pub struct SubscriptionSnapshot {
    pub permission: PermissionState,
    pub subscription: Option<BrowserSubscription>,
    pub records: Vec<PushSubscription>,
    pub state: SyncState,
}

impl SubscriptionSnapshot {
    pub fn is_registered(&self) -> bool {
        self.state == SyncState::Consistent
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.subscription
            .as_ref()
            .map(|subscription| subscription.endpoint.as_str())
    }
}

pub struct SubscriptionStateReader {
    platform: Arc<dyn PushPlatform>,
    store: Arc<dyn SubscriptionStore>,
    ready_timeout: Duration,
}

impl SubscriptionStateReader {
    pub fn new(
        platform: Arc<dyn PushPlatform>,
        store: Arc<dyn SubscriptionStore>,
        ready_timeout: Duration,
    ) -> Self {
        Self {
            platform,
            store,
            ready_timeout,
        }
    }

    /// Pure read of the platform and the store; never writes.
    pub async fn read_state(
        &self,
        user_id: &str,
    ) -> Result<SubscriptionSnapshot, Error> {
        wait_ready(self.platform.as_ref(), self.ready_timeout).await?;

        let subscription = self.platform.get_subscription().await?;
        let permission = self.platform.permission();
        let records = self.store.get_by_user(user_id).await?;
        let state = SyncState::compare(subscription.as_ref(), &records);

        debug!(
            user_id,
            %permission,
            ?state,
            records = records.len(),
            "Read push subscription state"
        );

        Ok(SubscriptionSnapshot {
            permission,
            subscription,
            records,
            state,
        })
    }
}
