use std::time::{SystemTime, UNIX_EPOCH};

use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use hmac::{Hmac, Mac};
use rand::{distributions::Alphanumeric, Rng};
use sha2::Sha256;

use crate::response_writer::Cookie;

type HmacSha256 = Hmac<Sha256>;

pub const XSRF_COOKIE: &str = "_xsrf";
pub const XSRF_FIELD: &str = "_xsrf";
pub const XSRF_HEADERS: [&str; 2] = ["X-Xsrftoken", "X-Csrftoken"];

const TOKEN_LEN: usize = 15;

fn mac(secret: &str, encoded: &str, timestamp: &str) -> HmacSha256 {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(encoded.as_bytes());
    mac.update(timestamp.as_bytes());
    mac
}

/// Encodes `value` as `base64url(value)|timestamp|hex(hmac)`.
pub fn sign_at(secret: &str, value: &str, timestamp: u64) -> String {
    let encoded = URL_SAFE.encode(value);
    let timestamp = timestamp.to_string();
    let sig = hex::encode(mac(secret, &encoded, &timestamp).finalize().into_bytes());
    format!("{}|{}|{}", encoded, timestamp, sig)
}

pub fn sign(secret: &str, value: &str) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    sign_at(secret, value, now)
}

/// Returns the original value if the signature checks out.
pub fn unsign(secret: &str, signed: &str) -> Option<String> {
    let mut parts = signed.splitn(3, '|');
    let (encoded, timestamp, sig) = (parts.next()?, parts.next()?, parts.next()?);

    let sig = hex::decode(sig).ok()?;
    mac(secret, encoded, timestamp).verify_slice(&sig).ok()?;

    let value = URL_SAFE.decode(encoded).ok()?;
    String::from_utf8(value).ok()
}

/// Issues and checks the per-client anti-forgery token kept in the signed
/// `_xsrf` cookie.
#[derive(Debug, Clone)]
pub struct XsrfStore {
    key: String,
    expire: i64,
}

impl XsrfStore {
    pub fn new(key: impl Into<String>, expire: i64) -> Self {
        Self {
            key: key.into(),
            expire,
        }
    }

    pub fn issue(&self) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LEN)
            .map(char::from)
            .collect()
    }

    /// The token carried by a cookie value, if it was signed with our key.
    pub fn decode(&self, cookie: &str) -> Option<String> {
        unsign(&self.key, cookie).filter(|token| !token.is_empty())
    }

    pub fn cookie(&self, token: &str) -> Cookie {
        let cookie = Cookie::new(XSRF_COOKIE, sign(&self.key, token)).path("/");
        if self.expire > 0 {
            cookie.max_age(self.expire)
        } else {
            cookie
        }
    }

    /// Compares the two tokens through their MACs, so the comparison takes
    /// the same time wherever they differ.
    pub fn verify(&self, established: &str, submitted: Option<&str>) -> bool {
        let Some(submitted) = submitted.filter(|s| !s.is_empty()) else {
            return false;
        };
        let expected = mac(&self.key, established, "").finalize().into_bytes();
        mac(&self.key, submitted, "").verify_slice(&expected).is_ok()
    }
}
