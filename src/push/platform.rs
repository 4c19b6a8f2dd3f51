//! Push platform contract and capability probe
//!
//! The browser (or OS) owns the live subscription and the notification
//! permission; this crate only consumes them through [`PushPlatform`].

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tokio::time::timeout;

use crate::{
    error::Error,
    types::{BrowserSubscription, PermissionState},
};

#[async_trait]
pub trait PushPlatform: Send + Sync {
    /// Ambient signals used once per session by the capability probe.
    fn signals(&self) -> PlatformSignals;

    fn permission(&self) -> PermissionState;

    /// May prompt the user and never resolve if the prompt is ignored.
    async fn request_permission(&self) -> Result<PermissionState, Error>;

    /// Resolves once the service worker is active.
    async fn ready(&self) -> Result<(), Error>;

    async fn get_subscription(
        &self,
    ) -> Result<Option<BrowserSubscription>, Error>;

    async fn subscribe(
        &self,
        application_server_key: &[u8],
    ) -> Result<BrowserSubscription, Error>;

    /// Cancels the live subscription; `false` when there was none.
    async fn unsubscribe(&self) -> Result<bool, Error>;
}

/// Waits for the service worker, bounded so a stuck registration surfaces.
pub async fn wait_ready(
    platform: &dyn PushPlatform,
    limit: Duration,
) -> Result<(), Error> {
    match timeout(limit, platform.ready()).await {
        Ok(result) => result,
        Err(_) => Err(Error::ServiceWorkerNotReady),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformSignals {
    pub user_agent: String,
    pub max_touch_points: u32,
    pub has_service_worker: bool,
    pub has_push_manager: bool,
    pub has_notification: bool,
    /// `(display-mode: standalone)` matched.
    pub display_mode_standalone: bool,
    /// Legacy Safari `navigator.standalone`.
    pub navigator_standalone: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlatformCapabilities {
    pub supported: bool,
    pub is_ios: bool,
    pub is_android: bool,
    pub is_mobile: bool,
    pub is_pwa_installed: bool,
}

impl PlatformCapabilities {
    pub fn probe(signals: &PlatformSignals) -> PlatformCapabilities {
        let ua = signals.user_agent.as_str();

        // iPadOS reports a desktop Safari UA but keeps touch input.
        let is_ios = ["iPhone", "iPad", "iPod"]
            .iter()
            .any(|device| ua.contains(device))
            || (ua.contains("Macintosh") && signals.max_touch_points > 1);
        let is_android = ua.contains("Android");
        let is_mobile = is_ios || is_android || ua.contains("Mobi");

        PlatformCapabilities {
            supported: signals.has_service_worker
                && signals.has_push_manager
                && signals.has_notification,
            is_ios,
            is_android,
            is_mobile,
            is_pwa_installed: signals.display_mode_standalone
                || signals.navigator_standalone,
        }
    }

    /// iOS only delivers push to apps launched from the Home Screen.
    pub fn requires_install(&self) -> bool {
        self.is_ios && !self.is_pwa_installed
    }

    /// Gate run before any push API call.
    pub fn check(&self) -> Result<(), Error> {
        if self.requires_install() {
            return Err(Error::InstallRequired);
        }

        if !self.supported {
            return Err(Error::PushUnsupported);
        }

        Ok(())
    }
}
