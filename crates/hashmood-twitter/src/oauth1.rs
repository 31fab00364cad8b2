//! OAuth 1.0a request signing (HMAC-SHA1) for user-context endpoints.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rand::distr::Alphanumeric;
use rand::Rng;
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// RFC 3986 unreserved characters stay as-is; everything else is encoded.
const OAUTH_ENCODE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Consumer and access-token key pairs used to sign a request.
pub(crate) struct OAuthKeys {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub token: String,
    pub token_secret: String,
}

fn encode(raw: &str) -> String {
    utf8_percent_encode(raw, OAUTH_ENCODE).to_string()
}

impl OAuthKeys {
    /// `Authorization` header value for a request, with a fresh nonce and
    /// the current time.
    ///
    /// `url` must not carry a query string; query or form parameters go in
    /// `params`. JSON bodies are not signed.
    pub(crate) fn authorization(&self, method: &str, url: &str, params: &[(&str, &str)]) -> String {
        let nonce: String = rand::rng()
            .sample_iter(Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());
        self.authorization_with(method, url, params, &nonce, timestamp)
    }

    pub(crate) fn authorization_with(
        &self,
        method: &str,
        url: &str,
        params: &[(&str, &str)],
        nonce: &str,
        timestamp: u64,
    ) -> String {
        let timestamp = timestamp.to_string();
        let oauth = [
            ("oauth_consumer_key", self.consumer_key.as_str()),
            ("oauth_nonce", nonce),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", timestamp.as_str()),
            ("oauth_token", self.token.as_str()),
            ("oauth_version", "1.0"),
        ];

        let mut pairs: Vec<(String, String)> = oauth
            .iter()
            .chain(params)
            .map(|(k, v)| (encode(k), encode(v)))
            .collect();
        pairs.sort();
        let param_string = pairs
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");

        let base = format!(
            "{}&{}&{}",
            method.to_ascii_uppercase(),
            encode(url),
            encode(&param_string)
        );
        let key = format!(
            "{}&{}",
            encode(&self.consumer_secret),
            encode(&self.token_secret)
        );

        // HMAC accepts keys of any length.
        let mut mac = HmacSha1::new_from_slice(key.as_bytes())
            .unwrap_or_else(|_| unreachable!("hmac takes any key length"));
        mac.update(base.as_bytes());
        let signature = STANDARD.encode(mac.finalize().into_bytes());

        let mut header: Vec<(&str, &str)> = oauth.to_vec();
        header.push(("oauth_signature", signature.as_str()));
        header.sort_unstable();
        let fields = header
            .iter()
            .map(|(k, v)| format!("{k}=\"{}\"", encode(v)))
            .collect::<Vec<_>>()
            .join(", ");
        format!("OAuth {fields}")
    }
}
