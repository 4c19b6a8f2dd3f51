//! Database models module

mod push_subscription;
mod table;

pub use push_subscription::PushSubscription;
pub use table::Table;
