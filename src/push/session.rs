use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{
    Decision, PlatformCapabilities, PushPlatform, RecoveryController,
    RecoveryStatus, RegistrationMode, SkipReason, StaleSubscriptionCleaner,
    SubscriptionRegistrar, SubscriptionSnapshot, SubscriptionStateReader,
    SubscriptionStore, SyncState,
};
use crate::{
    configuration::PushConfig, error::Error, helpers::Status,
    types::BrowserSubscription,
};

#[derive(Debug, Clone)]
pub struct ReconcileReport {
    pub snapshot: SubscriptionSnapshot,
    pub decision: Decision,
}

#[derive(Debug, Clone)]
pub struct Diagnostics {
    pub capabilities: PlatformCapabilities,
    pub snapshot: SubscriptionSnapshot,
    pub recovery: RecoveryStatus,
}

impl Diagnostics {
    pub fn status(&self) -> Status {
        if self.snapshot.is_registered() {
            Status::Subscribed
        } else {
            Status::Unsubscribed
        }
    }
}

/// Push subscription state of one signed-in user on this device.
///
/// Owns the recovery counter, the background tasks and their cancellation;
/// a new identity gets a new session. Dropping it cancels pending work.
pub struct PushSession {
    inner: Arc<Inner>,
}

struct Inner {
    user_id: String,
    config: PushConfig,
    capabilities: PlatformCapabilities,
    reader: SubscriptionStateReader,
    registrar: SubscriptionRegistrar,
    cleaner: StaleSubscriptionCleaner,
    controller: Mutex<RecoveryController>,
    tasks: Mutex<JoinSet<()>>,
    /// Token of the last scheduled recovery.
    recovery: Mutex<Option<CancellationToken>>,
    shutdown: CancellationToken,
}

impl PushSession {
    pub fn new(
        user_id: impl Into<String>,
        platform: Arc<dyn PushPlatform>,
        store: Arc<dyn SubscriptionStore>,
        config: PushConfig,
    ) -> Self {
        let user_id = user_id.into();
        let capabilities = PlatformCapabilities::probe(&platform.signals());

        info!(
            user_id = %user_id,
            supported = capabilities.supported,
            ios = capabilities.is_ios,
            installed = capabilities.is_pwa_installed,
            "Starting push session"
        );

        let reader = SubscriptionStateReader::new(
            platform.clone(),
            store.clone(),
            config.ready_timeout,
        );
        let registrar = SubscriptionRegistrar::new(
            platform,
            store.clone(),
            config.clone(),
            capabilities,
        );
        let cleaner = StaleSubscriptionCleaner::new(store);
        let controller = Mutex::new(RecoveryController::new(
            config.max_auto_recovery_attempts,
        ));

        let inner = Inner {
            user_id,
            config,
            capabilities,
            reader,
            registrar,
            cleaner,
            controller,
            tasks: Mutex::new(JoinSet::new()),
            recovery: Mutex::new(None),
            shutdown: CancellationToken::new(),
        };

        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.inner.user_id
    }

    pub fn capabilities(&self) -> PlatformCapabilities {
        self.inner.capabilities
    }

    pub fn recovery_status(&self) -> RecoveryStatus {
        self.inner.controller().status()
    }

    /// Reads the current state and schedules an automatic recovery when the
    /// subscription drifted and permission is already granted.
    pub async fn reconcile(&self) -> Result<ReconcileReport, Error> {
        let inner = &self.inner;

        if !inner.capabilities.supported {
            return Err(Error::PushUnsupported);
        }

        let snapshot = inner.reader.read_state(&inner.user_id).await?;

        let decision = if inner.capabilities.requires_install()
            && snapshot.state.needs_recovery()
        {
            Decision::Skip(SkipReason::InstallRequired)
        } else {
            inner
                .controller()
                .observe(snapshot.state, snapshot.permission)
        };

        match decision {
            Decision::Schedule { attempt } => {
                info!(
                    user_id = %inner.user_id,
                    attempt,
                    state = ?snapshot.state,
                    "Scheduling push subscription auto-recovery"
                );
                inner.spawn_recovery(attempt);
            },
            Decision::Skip(reason) => {
                debug!(
                    user_id = %inner.user_id,
                    ?reason,
                    "Auto-recovery skipped"
                );
            },
            Decision::Settled => {},
        }

        Ok(ReconcileReport { snapshot, decision })
    }

    /// User-initiated subscribe. Errors are returned for the caller to show;
    /// stale rows are pruned in the background afterwards. A pending
    /// automatic recovery is dropped in favour of this call.
    pub async fn subscribe(&self) -> Result<BrowserSubscription, Error> {
        let inner = &self.inner;
        inner.cancel_recovery();

        let subscription = inner
            .registrar
            .subscribe(&inner.user_id, RegistrationMode::Manual)
            .await?;

        inner.controller().on_registered();
        inner.spawn_cleanup(subscription.endpoint.to_owned());

        Ok(subscription)
    }

    /// Cancels any pending recovery and waits for it to stop before the
    /// subscription is removed, so it cannot bring the subscription back.
    pub async fn unsubscribe(&self) -> Result<bool, Error> {
        self.inner.cancel_recovery();
        self.settle().await;

        self.inner.registrar.unsubscribe(&self.inner.user_id).await
    }

    pub async fn diagnostics(&self) -> Result<Diagnostics, Error> {
        let inner = &self.inner;
        let snapshot = inner.reader.read_state(&inner.user_id).await?;

        Ok(Diagnostics {
            capabilities: inner.capabilities,
            snapshot,
            recovery: inner.controller().status(),
        })
    }

    /// Waits for every background task spawned so far.
    pub async fn settle(&self) {
        loop {
            let mut tasks = std::mem::take(&mut *self.inner.tasks());
            if tasks.is_empty() {
                return;
            }

            while let Some(result) = tasks.join_next().await {
                if let Err(e) = result {
                    error!("Push session task failed: {}", e);
                }
            }
        }
    }

    /// Cancels pending recovery and cleanup, then waits for them to stop.
    pub async fn shutdown(&self) {
        self.inner.shutdown.cancel();
        self.settle().await;
    }
}

impl Drop for PushSession {
    fn drop(&mut self) {
        self.inner.shutdown.cancel();
    }
}

impl Inner {
    fn controller(&self) -> MutexGuard<'_, RecoveryController> {
        self.controller.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn tasks(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn recovery(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.recovery.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stops the scheduled recovery, if any, and leaves `Recovering`.
    fn cancel_recovery(&self) {
        let token = self.recovery().take();
        if let Some(token) = token {
            token.cancel();
            self.controller().release(SyncState::Missing);
        }
    }

    fn spawn_recovery(self: &Arc<Self>, attempt: u32) {
        let inner = self.clone();
        let token = self.shutdown.child_token();
        *self.recovery() = Some(token.clone());
        let mut tasks = self.tasks();
        while tasks.try_join_next().is_some() {}
        tasks.spawn(inner.run_recovery(attempt, token));
    }

    fn spawn_cleanup(self: &Arc<Self>, live_endpoint: String) {
        let inner = self.clone();
        let token = self.shutdown.child_token();
        let mut tasks = self.tasks();
        while tasks.try_join_next().is_some() {}
        tasks.spawn(async move {
            let prune = inner.cleaner.prune(&inner.user_id, &live_endpoint);
            tokio::select! {
                _ = token.cancelled() => {
                    debug!(
                        user_id = %inner.user_id,
                        "Stale subscription cleanup cancelled"
                    );
                },
                result = prune => {
                    if let Err(e) = result {
                        error!(
                            user_id = %inner.user_id,
                            "Stale subscription cleanup failed: {}",
                            e
                        );
                    }
                },
            }
        });
    }

    /// Fixed-delay attempts until recovered, released or out of attempts.
    /// Failures are only logged.
    async fn run_recovery(
        self: Arc<Self>,
        mut attempt: u32,
        token: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!(
                        user_id = %self.user_id,
                        attempt,
                        "Auto-recovery cancelled"
                    );
                    self.controller().release(SyncState::Missing);
                    return;
                },
                _ = tokio::time::sleep(self.config.recovery_delay) => {},
            }

            let failure = match self.reader.read_state(&self.user_id).await {
                Ok(snapshot)
                    if !snapshot.state.needs_recovery()
                        || !snapshot.permission.is_granted() =>
                {
                    debug!(
                        user_id = %self.user_id,
                        state = ?snapshot.state,
                        permission = %snapshot.permission,
                        "Auto-recovery no longer applicable"
                    );
                    self.controller().release(snapshot.state);
                    return;
                },
                Ok(_) if token.is_cancelled() => {
                    self.controller().release(SyncState::Missing);
                    return;
                },
                Ok(_) => {
                    match self
                        .registrar
                        .subscribe(
                            &self.user_id,
                            RegistrationMode::AutoRecovery,
                        )
                        .await
                    {
                        Ok(_) => {
                            info!(
                                user_id = %self.user_id,
                                attempt,
                                "Auto-recovery restored push subscription"
                            );
                            self.controller().on_recovered();
                            return;
                        },
                        Err(e) => e,
                    }
                },
                Err(e) => e,
            };

            warn!(
                user_id = %self.user_id,
                attempt,
                "Auto-recovery attempt failed: {}",
                failure
            );

            let decision = self.controller().on_failure(failure.kind());
            match decision {
                Decision::Schedule { attempt: next } => attempt = next,
                _ => {
                    warn!(
                        user_id = %self.user_id,
                        ?decision,
                        "Auto-recovery stopped"
                    );
                    return;
                },
            }
        }
    }
}
