use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64_URL, Engine};
use std::fmt;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Subscribed,
    Unsubscribed,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Status::Subscribed => write!(f, "subscribed"),
            Status::Unsubscribed => write!(f, "unsubscribed"),
        }
    }
}

impl From<Status> for String {
    fn from(value: Status) -> Self {
        value.to_string()
    }
}

/// URL-safe base64 without padding, the encoding push services use.
pub fn encode_key(data: &[u8]) -> String {
    BASE64_URL.encode(data)
}

/// Decodes URL-safe base64, tolerating trailing `=` padding.
pub fn decode_key(data: &str) -> Result<Vec<u8>, Error> {
    let trimmed = data.trim().trim_end_matches('=');
    Ok(BASE64_URL.decode(trimmed)?)
}

pub fn parse_list(data: &str) -> Vec<String> {
    data.split(',')
        .map(|item| item.trim().to_owned())
        .filter(|item| !item.is_empty())
        .collect()
}
