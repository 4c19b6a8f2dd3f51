pub use self::types::{PoolOption, PoolType, QueryResult};

mod push_subscription;
mod types;
