use crate::{
    configuration::Config,
    dao::{PoolOption, PoolType},
    error::Error,
    model::{PushSubscription, Table},
};

#[derive(Debug)]
pub struct DatabasePool {
    pub push_subscription: Table<PushSubscription>,
    pub pool: PoolType,
}

impl DatabasePool {
    pub async fn new(config: &Config) -> Result<DatabasePool, Error> {
        let pool = PoolOption::new()
            .max_connections(config.max_connections)
            .connect(config.database_url.as_str())
            .await?;

        Ok(DatabasePool {
            push_subscription: Table::new(pool.clone()),
            pool,
        })
    }

    pub fn get_pool(&self) -> &PoolType {
        &self.pool
    }
}
