//! Request signing for the Tuya OpenAPI (`sign_method: HMAC-SHA256`).
//!
//! The signature covers the access id, the bearer token (empty for the
//! initial token grant), the millisecond timestamp and a four-line
//! string-to-sign:
//!
//! ```text
//! METHOD
//! hex(sha256(body))
//! <empty: no extra signed headers>
//! /path?sorted=query
//! ```

use std::collections::BTreeMap;

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

pub struct Signer {
    access_id: String,
    access_key: String,
}

impl Signer {
    pub fn new(access_id: impl Into<String>, access_key: impl Into<String>) -> Self {
        Self {
            access_id: access_id.into(),
            access_key: access_key.into(),
        }
    }

    pub fn access_id(&self) -> &str {
        &self.access_id
    }

    /// Returns the 64-character uppercase hex signature for one request.
    ///
    /// `path` may carry its own query string; it is merged with `query`
    /// before canonicalization, so `("/a?x=1", [])` and `("/a", [("x", "1")])`
    /// sign identically.
    pub fn sign(
        &self,
        method: &str,
        path: &str,
        query: &[(&str, &str)],
        body: &str,
        timestamp: &str,
        access_token: Option<&str>,
    ) -> String {
        let to_sign = string_to_sign(method, body, &canonical_url(path, query));
        let source = format!(
            "{}{}{}{}",
            self.access_id,
            access_token.unwrap_or(""),
            timestamp,
            to_sign
        );

        let mut mac = HmacSha256::new_from_slice(self.access_key.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(source.as_bytes());
        hex::encode_upper(mac.finalize().into_bytes())
    }
}

pub fn content_hash(body: &str) -> String {
    hex::encode(Sha256::digest(body.as_bytes()))
}

pub fn string_to_sign(method: &str, body: &str, url: &str) -> String {
    format!("{}\n{}\n\n{}", method.to_uppercase(), content_hash(body), url)
}

/// Path plus `?`-joined query sorted by key. Any query embedded in `path`
/// is merged in; embedded entries win over explicit ones on key collision.
pub fn canonical_url(path: &str, query: &[(&str, &str)]) -> String {
    let (base, embedded) = match path.split_once('?') {
        Some((base, q)) => (base, q),
        None => (path, ""),
    };

    let mut merged: BTreeMap<&str, &str> = query.iter().copied().collect();
    for param in embedded.split('&') {
        // The value ends at the next '=': "a=1=2" signs as "a=1".
        let mut parts = param.split('=');
        if let (Some(key), Some(value)) = (parts.next(), parts.next())
            && !key.is_empty()
        {
            merged.insert(key, value);
        }
    }

    let query_string = merged
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    if query_string.is_empty() {
        base.to_string()
    } else {
        format!("{base}?{query_string}")
    }
}
