//! Push subscription types
//!
//! Types exchanged with the push platform and with the subscription store.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use url::Url;

use crate::{
    error::Error,
    helpers::{decode_key, encode_key},
};

/// Length in bytes of an uncompressed P-256 public key.
pub const P256DH_LENGTH: usize = 65;
pub const AUTH_SECRET_LENGTH: usize = 16;

// =============================================================================
// Browser Subscription
// =============================================================================

/// A live subscription as handed out by the push platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserSubscription {
    pub endpoint: String,
    /// Milliseconds since the epoch, when the push service expires it.
    pub expiration_time: Option<i64>,
    pub keys: SubscriptionKeys,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionKeys {
    pub p256dh: Vec<u8>,
    pub auth: Vec<u8>,
}

impl SubscriptionKeys {
    /// Returns `(p256dh, auth)` in the encoding stored next to the endpoint.
    pub fn encode(&self) -> (String, String) {
        (encode_key(&self.p256dh), encode_key(&self.auth))
    }
}

// =============================================================================
// Permission State
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    Default,
    Granted,
    Denied,
}

impl PermissionState {
    pub fn is_granted(&self) -> bool {
        matches!(self, PermissionState::Granted)
    }
}

impl fmt::Display for PermissionState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PermissionState::Default => write!(f, "default"),
            PermissionState::Granted => write!(f, "granted"),
            PermissionState::Denied => write!(f, "denied"),
        }
    }
}

impl FromStr for PermissionState {
    type Err = Error;

    fn from_str(value: &str) -> Result<PermissionState, Self::Err> {
        match value {
            "default" => Ok(PermissionState::Default),
            "granted" => Ok(PermissionState::Granted),
            "denied" => Ok(PermissionState::Denied),
            _ => Err(Error::InvalidOption {
                option: format!("permission {}", value),
            }),
        }
    }
}

// =============================================================================
// Store Requests
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionUpsert {
    pub user_id: String,
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
    pub user_agent: Option<String>,
}

impl SubscriptionUpsert {
    pub fn new(
        user_id: &str,
        subscription: &BrowserSubscription,
        user_agent: Option<String>,
    ) -> Self {
        let (p256dh, auth) = subscription.keys.encode();
        Self {
            user_id: user_id.to_owned(),
            endpoint: subscription.endpoint.to_owned(),
            p256dh,
            auth,
            user_agent,
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        require_user_id(&self.user_id)?;
        validate_endpoint(&self.endpoint)?;

        if decode_key(&self.p256dh)?.len() != P256DH_LENGTH {
            return Err(Error::InvalidOption {
                option: String::from("p256dh"),
            });
        }

        if decode_key(&self.auth)?.len() != AUTH_SECRET_LENGTH {
            return Err(Error::InvalidOption {
                option: String::from("auth"),
            });
        }

        Ok(())
    }
}

/// Endpoint travels in the body: push endpoints can outgrow query limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionDelete {
    pub user_id: String,
    pub endpoint: String,
}

impl SubscriptionDelete {
    pub fn validate(&self) -> Result<(), Error> {
        require_user_id(&self.user_id)?;
        if self.endpoint.is_empty() {
            return Err(Error::MissingParams(String::from("endpoint")));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionPrune {
    pub user_id: String,
    pub ids: Vec<i64>,
}

impl SubscriptionPrune {
    pub fn validate(&self) -> Result<(), Error> {
        require_user_id(&self.user_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub deleted: u64,
}

fn require_user_id(user_id: &str) -> Result<(), Error> {
    if user_id.trim().is_empty() {
        return Err(Error::MissingParams(String::from("user_id")));
    }
    Ok(())
}

fn validate_endpoint(endpoint: &str) -> Result<(), Error> {
    let url = Url::parse(endpoint)?;

    if url.scheme() != "https" || url.host().is_none() {
        return Err(Error::InvalidOption {
            option: String::from("endpoint"),
        });
    }

    Ok(())
}
