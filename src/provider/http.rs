use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

use crate::{
    configuration::Config,
    error::{self, Error},
    model::PushSubscription,
    types::{
        DeleteResponse, SubscriptionDelete, SubscriptionPrune,
        SubscriptionUpsert,
    },
};

/// Client of the subscription service, for callers without database access.
#[derive(Debug, Clone)]
pub struct HTTP {
    pub base_url: Url,
    pub http: Client,
}

impl HTTP {
    pub fn new(config: &Config) -> Result<HTTP, Error> {
        let store_url = config.store_url.as_ref().ok_or_else(|| {
            Error::ConfigurationError(String::from("STORE_URL is not set"))
        })?;

        Self::from_url(Url::parse(store_url)?, config.timeout)
    }

    pub fn from_url(mut base_url: Url, timeout: u64) -> Result<HTTP, Error> {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = match Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()
        {
            Ok(c) => c,
            Err(e) => {
                return Err(error::Error::ReqwestError(e));
            },
        };

        Ok(HTTP { base_url, http })
    }

    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    pub async fn upsert(
        &self,
        subscription: &SubscriptionUpsert,
    ) -> Result<PushSubscription, Error> {
        let response = self
            .http
            .post(self.url("api/subscriptions")?)
            .json(subscription)
            .send()
            .await?;

        Self::parse(response).await
    }

    pub async fn get_by_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<PushSubscription>, Error> {
        let response = self
            .http
            .get(self.url("api/subscriptions")?)
            .query(&[("user_id", user_id)])
            .send()
            .await?;

        Self::parse(response).await
    }

    pub async fn delete_by_endpoint(
        &self,
        user_id: &str,
        endpoint: &str,
    ) -> Result<u64, Error> {
        let body = SubscriptionDelete {
            user_id: user_id.to_owned(),
            endpoint: endpoint.to_owned(),
        };
        let response = self
            .http
            .delete(self.url("api/subscriptions")?)
            .json(&body)
            .send()
            .await?;

        let DeleteResponse { deleted } = Self::parse(response).await?;
        Ok(deleted)
    }

    pub async fn delete_by_ids(
        &self,
        user_id: &str,
        ids: &[i64],
    ) -> Result<u64, Error> {
        let body = SubscriptionPrune {
            user_id: user_id.to_owned(),
            ids: ids.to_vec(),
        };
        let response = self
            .http
            .post(self.url("api/subscriptions/prune")?)
            .json(&body)
            .send()
            .await?;

        let DeleteResponse { deleted } = Self::parse(response).await?;
        Ok(deleted)
    }

    async fn parse<T: DeserializeOwned>(
        response: Response,
    ) -> Result<T, Error> {
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Store {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<T>().await?)
    }
}
