use crate::{error::Error, helpers::decode_key, types::P256DH_LENGTH};

/// Unpadded base64url length of a 65-byte key; one `=` may follow.
pub const VAPID_KEY_LENGTH: usize = 87;

/// The application-server key handed to the push service on subscribe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VapidKey(Vec<u8>);

impl VapidKey {
    pub fn parse(value: Option<&str>) -> Result<VapidKey, Error> {
        let value = match value.map(str::trim) {
            Some(v) if !v.is_empty() => v,
            _ => {
                return Err(Error::VapidKey(String::from(
                    "VAPID_PUBLIC_KEY is not configured",
                )))
            },
        };

        if !(VAPID_KEY_LENGTH..=VAPID_KEY_LENGTH + 1).contains(&value.len()) {
            return Err(Error::VapidKey(format!(
                "expected {}-{} base64url characters, got {}",
                VAPID_KEY_LENGTH,
                VAPID_KEY_LENGTH + 1,
                value.len()
            )));
        }

        let body = value.trim_end_matches('=');
        if !body
            .bytes()
            .all(|c| c.is_ascii_alphanumeric() || c == b'-' || c == b'_')
        {
            return Err(Error::VapidKey(String::from(
                "contains characters outside the URL-safe base64 alphabet",
            )));
        }

        let bytes = decode_key(body)
            .map_err(|e| Error::VapidKey(format!("cannot decode: {}", e)))?;

        if bytes.len() != P256DH_LENGTH || bytes[0] != 0x04 {
            return Err(Error::VapidKey(String::from(
                "not an uncompressed P-256 public key",
            )));
        }

        Ok(VapidKey(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}
