#![allow(dead_code)]

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;

use campaign_push::{
    configuration::PushConfig,
    error::Error,
    helpers::encode_key,
    model::PushSubscription,
    push::{PlatformSignals, PushPlatform, PushSession, SubscriptionStore},
    types::{
        BrowserSubscription, PermissionState, SubscriptionKeys,
        SubscriptionUpsert,
    },
};

pub const USER: &str = "user-1";
pub const ANDROID_CHROME: &str = "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Mobile Safari/537.36";
pub const IPHONE_SAFARI: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1";

pub fn vapid_public_key() -> String {
    let mut key = vec![0x04];
    key.extend((1..=64).map(|i| i as u8));
    encode_key(&key)
}

pub fn push_config() -> PushConfig {
    PushConfig::default().with_vapid_public_key(vapid_public_key())
}

pub fn browser_subscription(endpoint: &str) -> BrowserSubscription {
    BrowserSubscription {
        endpoint: endpoint.to_owned(),
        expiration_time: None,
        keys: SubscriptionKeys {
            p256dh: vec![4; 65],
            auth: vec![9; 16],
        },
    }
}

// =============================================================================
// Fake Platform
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    Resolves(PermissionState),
    /// The user never answers.
    Ignored,
}

#[derive(Debug)]
pub struct PlatformState {
    pub signals: PlatformSignals,
    pub permission: PermissionState,
    pub prompt: Prompt,
    pub ready: bool,
    pub subscription: Option<BrowserSubscription>,
    /// Number of upcoming subscribe calls that fail.
    pub failing_subscribes: u32,
    pub next_endpoint: u32,
    pub permission_requests: u32,
    pub subscribe_calls: u32,
    pub unsubscribe_calls: u32,
    pub get_subscription_calls: u32,
}

pub struct FakePlatform {
    pub state: Mutex<PlatformState>,
}

impl FakePlatform {
    pub fn new(user_agent: &str, permission: PermissionState) -> Arc<Self> {
        let signals = PlatformSignals {
            user_agent: user_agent.to_owned(),
            has_service_worker: true,
            has_push_manager: true,
            has_notification: true,
            ..PlatformSignals::default()
        };

        Arc::new(FakePlatform {
            state: Mutex::new(PlatformState {
                signals,
                permission,
                prompt: Prompt::Resolves(PermissionState::Granted),
                ready: true,
                subscription: None,
                failing_subscribes: 0,
                next_endpoint: 1,
                permission_requests: 0,
                subscribe_calls: 0,
                unsubscribe_calls: 0,
                get_subscription_calls: 0,
            }),
        })
    }

    pub fn android(permission: PermissionState) -> Arc<Self> {
        Self::new(ANDROID_CHROME, permission)
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut PlatformState) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    /// Site data cleared: the subscription vanishes without notice.
    pub fn lose_subscription(&self) {
        self.with(|state| state.subscription = None);
    }

    pub fn live_endpoint(&self) -> Option<String> {
        self.with(|state| {
            state
                .subscription
                .as_ref()
                .map(|subscription| subscription.endpoint.to_owned())
        })
    }

    pub fn subscribe_calls(&self) -> u32 {
        self.with(|state| state.subscribe_calls)
    }

    /// Every platform call except reading the signals.
    pub fn api_calls(&self) -> u32 {
        self.with(|state| {
            state.permission_requests
                + state.subscribe_calls
                + state.unsubscribe_calls
                + state.get_subscription_calls
        })
    }
}

#[async_trait]
impl PushPlatform for FakePlatform {
    fn signals(&self) -> PlatformSignals {
        self.with(|state| state.signals.clone())
    }

    fn permission(&self) -> PermissionState {
        self.with(|state| state.permission)
    }

    async fn request_permission(&self) -> Result<PermissionState, Error> {
        let prompt = self.with(|state| {
            state.permission_requests += 1;
            state.prompt
        });

        match prompt {
            Prompt::Resolves(answer) => {
                // Browsers never re-prompt once denied.
                Ok(self.with(|state| {
                    if state.permission == PermissionState::Default {
                        state.permission = answer;
                    }
                    state.permission
                }))
            },
            Prompt::Ignored => std::future::pending().await,
        }
    }

    async fn ready(&self) -> Result<(), Error> {
        if self.with(|state| state.ready) {
            Ok(())
        } else {
            std::future::pending().await
        }
    }

    async fn get_subscription(
        &self,
    ) -> Result<Option<BrowserSubscription>, Error> {
        Ok(self.with(|state| {
            state.get_subscription_calls += 1;
            state.subscription.clone()
        }))
    }

    async fn subscribe(
        &self,
        application_server_key: &[u8],
    ) -> Result<BrowserSubscription, Error> {
        assert_eq!(application_server_key.len(), 65);

        self.with(|state| {
            state.subscribe_calls += 1;

            if state.failing_subscribes > 0 {
                state.failing_subscribes -= 1;
                return Err(Error::Platform(String::from("AbortError")));
            }

            if state.subscription.is_some() {
                return Err(Error::Platform(String::from(
                    "InvalidStateError: subscription already exists",
                )));
            }

            let endpoint = format!(
                "https://fcm.googleapis.com/fcm/send/device-{}",
                state.next_endpoint
            );
            state.next_endpoint += 1;

            let subscription = browser_subscription(&endpoint);
            state.subscription = Some(subscription.clone());
            Ok(subscription)
        })
    }

    async fn unsubscribe(&self) -> Result<bool, Error> {
        Ok(self.with(|state| {
            state.unsubscribe_calls += 1;
            state.subscription.take().is_some()
        }))
    }
}

// =============================================================================
// In-memory Store
// =============================================================================

#[derive(Debug, Default)]
pub struct StoreState {
    pub rows: Vec<PushSubscription>,
    pub next_id: i64,
    pub calls: u32,
    pub batch_deletes: u32,
}

/// Upserts on `(user_id, endpoint)` like the Postgres table.
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub state: Mutex<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(MemoryStore::default())
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut StoreState) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub fn insert(&self, user_id: &str, endpoint: &str) -> PushSubscription {
        let subscription = browser_subscription(endpoint);
        let request = SubscriptionUpsert::new(user_id, &subscription, None);
        self.with(|state| upsert_row(state, &request))
    }

    pub fn endpoints(&self, user_id: &str) -> Vec<String> {
        self.with(|state| {
            state
                .rows
                .iter()
                .filter(|row| row.user_id == user_id)
                .map(|row| row.endpoint.to_owned())
                .collect()
        })
    }

    pub fn calls(&self) -> u32 {
        self.with(|state| state.calls)
    }
}

fn upsert_row(
    state: &mut StoreState,
    subscription: &SubscriptionUpsert,
) -> PushSubscription {
    let now = Utc::now();

    if let Some(row) = state.rows.iter_mut().find(|row| {
        row.user_id == subscription.user_id
            && row.endpoint == subscription.endpoint
    }) {
        row.p256dh = subscription.p256dh.to_owned();
        row.auth = subscription.auth.to_owned();
        row.user_agent = subscription.user_agent.to_owned();
        row.last_used_at = now;
        return row.clone();
    }

    state.next_id += 1;
    let row = PushSubscription {
        id: state.next_id,
        user_id: subscription.user_id.to_owned(),
        endpoint: subscription.endpoint.to_owned(),
        p256dh: subscription.p256dh.to_owned(),
        auth: subscription.auth.to_owned(),
        user_agent: subscription.user_agent.to_owned(),
        created_at: now,
        last_used_at: now,
    };
    state.rows.push(row.clone());
    row
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn upsert(
        &self,
        subscription: &SubscriptionUpsert,
    ) -> Result<PushSubscription, Error> {
        Ok(self.with(|state| {
            state.calls += 1;
            upsert_row(state, subscription)
        }))
    }

    async fn get_by_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<PushSubscription>, Error> {
        Ok(self.with(|state| {
            state.calls += 1;
            state
                .rows
                .iter()
                .filter(|row| row.user_id == user_id)
                .cloned()
                .collect()
        }))
    }

    async fn delete_by_endpoint(
        &self,
        user_id: &str,
        endpoint: &str,
    ) -> Result<u64, Error> {
        Ok(self.with(|state| {
            state.calls += 1;
            let before = state.rows.len();
            state.rows.retain(|row| {
                !(row.user_id == user_id && row.endpoint == endpoint)
            });
            (before - state.rows.len()) as u64
        }))
    }

    async fn delete_by_ids(
        &self,
        user_id: &str,
        ids: &[i64],
    ) -> Result<u64, Error> {
        Ok(self.with(|state| {
            state.calls += 1;
            state.batch_deletes += 1;
            let before = state.rows.len();
            state.rows.retain(|row| {
                !(row.user_id == user_id && ids.contains(&row.id))
            });
            (before - state.rows.len()) as u64
        }))
    }
}

// =============================================================================
// Session Helpers
// =============================================================================

pub fn session(
    platform: &Arc<FakePlatform>,
    store: &Arc<MemoryStore>,
) -> PushSession {
    session_with(platform, store, push_config())
}

pub fn session_with(
    platform: &Arc<FakePlatform>,
    store: &Arc<MemoryStore>,
    config: PushConfig,
) -> PushSession {
    PushSession::new(USER, platform.clone(), store.clone(), config)
}

/// Lets the paused clock run past one recovery delay.
pub async fn advance_past_delay() {
    tokio::time::sleep(Duration::from_secs(6)).await;
}
