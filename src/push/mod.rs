//! Web-push subscription lifecycle
//!
//! Keeps the browser-held subscription, the persisted row and a bounded
//! automatic recovery consistent with each other.

pub use self::{
    cleaner::{stale_ids, StaleSubscriptionCleaner},
    platform::{PlatformCapabilities, PlatformSignals, PushPlatform},
    reader::{SubscriptionSnapshot, SubscriptionStateReader, SyncState},
    recovery::{
        Decision, RecoveryController, RecoveryState, RecoveryStatus,
        SkipReason,
    },
    registrar::{RegistrationMode, SubscriptionRegistrar},
    session::{Diagnostics, PushSession, ReconcileReport},
    store::SubscriptionStore,
    vapid::VapidKey,
};

mod cleaner;
mod platform;
mod reader;
mod recovery;
mod registrar;
mod session;
mod store;
mod vapid;
