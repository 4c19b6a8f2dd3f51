mod common;

use std::{env, time::Duration};

use campaign_push::{
    configuration::get_configuration,
    provider::HTTP,
    push::{Decision, PushSession},
    types::PermissionState,
};
use common::{vapid_public_key, FakePlatform, MemoryStore, USER};

// Single test: the process environment is shared by the whole binary.
#[tokio::test(start_paused = true)]
async fn test_session_and_store_client_from_environment() {
    env::set_var("DATABASE_URL", "postgres://localhost/push");
    env::set_var("SERVER_HOST", "127.0.0.1");
    env::set_var("PORT", "8080");
    env::set_var("ALLOWED_ORIGINS", "https://app.example.com");
    env::set_var("STORE_URL", "https://store.example.com/v1");
    env::set_var("VAPID_PUBLIC_KEY", vapid_public_key());
    env::set_var("RECOVERY_DELAY_IN_SEC", "2");
    env::set_var("MAX_AUTO_RECOVERY_ATTEMPTS", "1");

    let config = get_configuration().unwrap();
    assert_eq!(config.push.recovery_delay, Duration::from_secs(2));
    assert_eq!(config.push.max_auto_recovery_attempts, 1);

    let client = HTTP::new(&config).unwrap();
    assert_eq!(client.base_url.as_str(), "https://store.example.com/v1/");

    let platform = FakePlatform::android(PermissionState::Granted);
    platform.with(|state| state.failing_subscribes = u32::MAX);
    let store = MemoryStore::new();
    let session = PushSession::new(
        USER,
        platform.clone(),
        store.clone(),
        config.push.clone(),
    );

    let report = session.reconcile().await.unwrap();
    assert_eq!(report.decision, Decision::Schedule { attempt: 1 });

    // The configured delay and attempt limit drive the recovery.
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(platform.subscribe_calls(), 0);
    session.settle().await;
    assert_eq!(platform.subscribe_calls(), 1);
    assert_eq!(session.recovery_status().max_attempts, 1);

    // The key from the environment is accepted on subscribe.
    platform.with(|state| state.failing_subscribes = 0);
    session.subscribe().await.unwrap();
    session.settle().await;
    assert_eq!(store.endpoints(USER).len(), 1);
}
