use async_trait::async_trait;

use crate::{
    error::Error,
    model::{PushSubscription, Table},
    provider::HTTP,
    types::SubscriptionUpsert,
};

/// The persisted subscription table, shared by all of a user's devices.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn upsert(
        &self,
        subscription: &SubscriptionUpsert,
    ) -> Result<PushSubscription, Error>;

    /// Rows are filtered by user only; endpoints are compared by the caller.
    async fn get_by_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<PushSubscription>, Error>;

    async fn delete_by_endpoint(
        &self,
        user_id: &str,
        endpoint: &str,
    ) -> Result<u64, Error>;

    async fn delete_by_ids(
        &self,
        user_id: &str,
        ids: &[i64],
    ) -> Result<u64, Error>;
}

#[async_trait]
impl SubscriptionStore for Table<PushSubscription> {
    async fn upsert(
        &self,
        subscription: &SubscriptionUpsert,
    ) -> Result<PushSubscription, Error> {
        Ok(Table::<PushSubscription>::upsert(self, subscription).await?)
    }

    async fn get_by_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<PushSubscription>, Error> {
        Ok(Table::<PushSubscription>::get_by_user(self, user_id).await?)
    }

    async fn delete_by_endpoint(
        &self,
        user_id: &str,
        endpoint: &str,
    ) -> Result<u64, Error> {
        let result = Table::<PushSubscription>::delete_by_endpoint(
            self, user_id, endpoint,
        )
        .await?;
        Ok(result.rows_affected())
    }

    async fn delete_by_ids(
        &self,
        user_id: &str,
        ids: &[i64],
    ) -> Result<u64, Error> {
        let result =
            Table::<PushSubscription>::delete_by_ids(self, user_id, ids).await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl SubscriptionStore for HTTP {
    async fn upsert(
        &self,
        subscription: &SubscriptionUpsert,
    ) -> Result<PushSubscription, Error> {
        HTTP::upsert(self, subscription).await
    }

    async fn get_by_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<PushSubscription>, Error> {
        HTTP::get_by_user(self, user_id).await
    }

    async fn delete_by_endpoint(
        &self,
        user_id: &str,
        endpoint: &str,
    ) -> Result<u64, Error> {
        HTTP::delete_by_endpoint(self, user_id, endpoint).await
    }

    async fn delete_by_ids(
        &self,
        user_id: &str,
        ids: &[i64],
    ) -> Result<u64, Error> {
        HTTP::delete_by_ids(self, user_id, ids).await
    }
}
