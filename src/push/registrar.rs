use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, info};

use super::{
    platform::wait_ready, PlatformCapabilities, PushPlatform,
    SubscriptionStore, VapidKey,
};
use crate::{
    configuration::PushConfig,
    error::Error,
    types::{BrowserSubscription, PermissionState, SubscriptionUpsert},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationMode {
    /// User initiated; may prompt for permission.
    Manual,
    /// Background recovery; never prompts.
    AutoRecovery,
}

/// Creates and destroys browser subscriptions together with their rows.
pub struct SubscriptionRegistrar {
    platform: Arc<dyn PushPlatform>,
    store: Arc<dyn SubscriptionStore>,
    config: PushConfig,
    capabilities: PlatformCapabilities,
    user_agent: Option<String>,
}

impl SubscriptionRegistrar {
    pub fn new(
        platform: Arc<dyn PushPlatform>,
        store: Arc<dyn SubscriptionStore>,
        config: PushConfig,
        capabilities: PlatformCapabilities,
    ) -> Self {
        let user_agent = Some(platform.signals().user_agent)
            .filter(|user_agent| !user_agent.is_empty());

        Self {
            platform,
            store,
            config,
            capabilities,
            user_agent,
        }
    }

    pub fn capabilities(&self) -> PlatformCapabilities {
        self.capabilities
    }

    /// Subscribes this device and upserts its row. Stale rows of the user
    /// are left in place.
    pub async fn subscribe(
        &self,
        user_id: &str,
        mode: RegistrationMode,
    ) -> Result<BrowserSubscription, Error> {
        self.capabilities.check()?;

        let permission = match mode {
            RegistrationMode::Manual => self.request_permission().await?,
            RegistrationMode::AutoRecovery => self.platform.permission(),
        };

        if !permission.is_granted() {
            return Err(Error::PermissionNotGranted(permission));
        }

        wait_ready(self.platform.as_ref(), self.config.ready_timeout).await?;

        let key = VapidKey::parse(self.config.vapid_public_key.as_deref())?;

        if let Some(existing) = self.platform.get_subscription().await? {
            debug!(
                endpoint = %existing.endpoint,
                "Dropping live subscription before subscribing again"
            );
            self.platform.unsubscribe().await?;
        }

        let subscription = self.platform.subscribe(key.as_bytes()).await?;
        let record = SubscriptionUpsert::new(
            user_id,
            &subscription,
            self.user_agent.clone(),
        );
        let row = self.store.upsert(&record).await?;

        info!(
            user_id,
            id = row.id,
            ?mode,
            "Registered push subscription"
        );

        Ok(subscription)
    }

    /// Cancels the live subscription and deletes its row.
    pub async fn unsubscribe(&self, user_id: &str) -> Result<bool, Error> {
        if !self.capabilities.supported {
            return Err(Error::PushUnsupported);
        }

        wait_ready(self.platform.as_ref(), self.config.ready_timeout).await?;

        let subscription = match self.platform.get_subscription().await? {
            Some(subscription) => subscription,
            None => return Ok(false),
        };

        self.platform.unsubscribe().await?;
        let deleted = self
            .store
            .delete_by_endpoint(user_id, &subscription.endpoint)
            .await?;

        info!(user_id, deleted, "Removed push subscription");

        Ok(true)
    }

    /// The prompt can stay open forever; an unanswered prompt counts as
    /// the permission staying at `default`.
    async fn request_permission(&self) -> Result<PermissionState, Error> {
        match timeout(
            self.config.permission_timeout,
            self.platform.request_permission(),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Ok(PermissionState::Default),
        }
    }
}
