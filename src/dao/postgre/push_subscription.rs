use super::QueryResult;
use crate::{
    model::{PushSubscription, Table},
    types::SubscriptionUpsert,
};
use sqlx::error::Error;

impl Table<PushSubscription> {
    /// Conflicts on `(user_id, endpoint)`; `created_at` survives
    /// re-registration.
    pub async fn upsert(
        &self,
        subscription: &SubscriptionUpsert,
    ) -> Result<PushSubscription, Error> {
        sqlx::query_as(
            r#"
            INSERT INTO push_subscription
                (user_id, endpoint, p256dh, auth, user_agent, last_used_at)
            VALUES($1, $2, $3, $4, $5, now())
            ON CONFLICT (user_id, endpoint)
            DO UPDATE SET
                p256dh = EXCLUDED.p256dh,
                auth = EXCLUDED.auth,
                user_agent = EXCLUDED.user_agent,
                last_used_at = EXCLUDED.last_used_at
            RETURNING *
            "#,
        )
        .bind(&subscription.user_id)
        .bind(&subscription.endpoint)
        .bind(&subscription.p256dh)
        .bind(&subscription.auth)
        .bind(&subscription.user_agent)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn get_by_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<PushSubscription>, Error> {
        let data = sqlx::query_as(
            r#"
            SELECT * FROM push_subscription WHERE user_id=$1 ORDER BY id
            "#,
        )
        .bind(user_id)
        .persistent(true)
        .fetch_all(&self.pool)
        .await?;
        Ok(data)
    }

    pub async fn delete_by_endpoint(
        &self,
        user_id: &str,
        endpoint: &str,
    ) -> Result<QueryResult, Error> {
        sqlx::query(
            r#"
            DELETE FROM push_subscription WHERE user_id=$1 AND endpoint=$2
            "#,
        )
        .bind(user_id)
        .bind(endpoint)
        .execute(&self.pool)
        .await
    }

    pub async fn delete_by_ids(
        &self,
        user_id: &str,
        ids: &[i64],
    ) -> Result<QueryResult, Error> {
        sqlx::query(
            r#"
            DELETE FROM push_subscription WHERE user_id=$1 AND id = ANY($2)
            "#,
        )
        .bind(user_id)
        .bind(ids.to_vec())
        .execute(&self.pool)
        .await
    }
}
