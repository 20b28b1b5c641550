//! Slack request signing (`v0` scheme).

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-slack-signature";
pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";
pub const MAX_CLOCK_SKEW_SECS: u64 = 300;

const VERSION: &str = "v0";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing `{0}` header")]
    MissingHeader(&'static str),
    #[error("malformed request timestamp `{0}`")]
    MalformedTimestamp(String),
    #[error("request timestamp is {skew_secs}s away from now")]
    StaleTimestamp { skew_secs: u64 },
    #[error("signature does not match request body")]
    Mismatch,
    #[error("signing secret cannot be used as an HMAC key")]
    InvalidSecret,
}

pub struct SignatureVerifier {
    secret: SecretString,
    max_skew_secs: u64,
}

impl SignatureVerifier {
    pub fn new(secret: SecretString) -> Self {
        Self { secret, max_skew_secs: MAX_CLOCK_SKEW_SECS }
    }

    /// Checks `X-Slack-Signature` against `v0:{timestamp}:{body}`. Requests
    /// older or newer than five minutes are refused to limit replay.
    pub fn verify(
        &self,
        signature: Option<&str>,
        timestamp: Option<&str>,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> Result<(), SignatureError> {
        let signature = signature.ok_or(SignatureError::MissingHeader(SIGNATURE_HEADER))?;
        let timestamp = timestamp.ok_or(SignatureError::MissingHeader(TIMESTAMP_HEADER))?.trim();

        let sent_at = timestamp
            .parse::<i64>()
            .map_err(|_| SignatureError::MalformedTimestamp(timestamp.to_owned()))?;
        let skew_secs = now.timestamp().abs_diff(sent_at);
        if skew_secs > self.max_skew_secs {
            return Err(SignatureError::StaleTimestamp { skew_secs });
        }

        let provided = signature
            .trim()
            .strip_prefix("v0=")
            .and_then(|hex_digest| hex::decode(hex_digest).ok())
            .ok_or(SignatureError::Mismatch)?;

        self.mac(timestamp, body)?.verify_slice(&provided).map_err(|_| SignatureError::Mismatch)
    }

    /// Produces the header value Slack would send for `body` at `timestamp`.
    pub fn sign(&self, timestamp: i64, body: &[u8]) -> Result<String, SignatureError> {
        let digest = self.mac(&timestamp.to_string(), body)?.finalize().into_bytes();
        Ok(format!("{VERSION}={}", hex::encode(digest)))
    }

    fn mac(&self, timestamp: &str, body: &[u8]) -> Result<HmacSha256, SignatureError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| SignatureError::InvalidSecret)?;
        mac.update(VERSION.as_bytes());
        mac.update(b":");
        mac.update(timestamp.as_bytes());
        mac.update(b":");
        mac.update(body);
        Ok(mac)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use secrecy::SecretString;

    use super::{SignatureError, SignatureVerifier, SIGNATURE_HEADER, TIMESTAMP_HEADER};

    // Example from Slack's "Verifying requests" guide.
    const SECRET: &str = "8f742231b10e8888abcd99yyyzzz85a5";
    const TIMESTAMP: i64 = 1_531_420_618;
    const BODY: &str = "token=xyzz0WbapA4vBCDEFasx0q6G&team_id=T1DC2JH3J&team_domain=testteamnow&channel_id=G8PSS9T3V&channel_name=foobar&user_id=U2CERLKJA&user_name=roadrunner&command=%2Fwebhook-collect&text=&response_url=https%3A%2F%2Fhooks.slack.com%2Fcommands%2FT1DC2JH3J%2F397700885554%2F96rGlfmibIGlgcZRskXaIFfN&trigger_id=398738663015.47445629121.803a0bc887a14d10d2c447fce8b6703c";
    const EXPECTED: &str = "v0=a2114d57b48eac39b9ad189dd8316235a7b4a8d21a10bd27519666489c69b503";

    fn verifier() -> SignatureVerifier {
        SignatureVerifier::new(SecretString::from(SECRET))
    }

    fn at(seconds: i64) -> chrono::DateTime<Utc> {
        Utc.timestamp_opt(seconds, 0).single().expect("instant")
    }

    #[test]
    fn matches_slack_reference_signature() {
        assert_eq!(verifier().sign(TIMESTAMP, BODY.as_bytes()).expect("sign"), EXPECTED);
        verifier()
            .verify(Some(EXPECTED), Some("1531420618"), BODY.as_bytes(), at(TIMESTAMP + 10))
            .expect("valid signature");
    }

    #[test]
    fn rejects_tampered_body() {
        let error = verifier()
            .verify(Some(EXPECTED), Some("1531420618"), b"token=other", at(TIMESTAMP))
            .expect_err("tampered");
        assert_eq!(error, SignatureError::Mismatch);
    }

    #[test]
    fn rejects_stale_and_future_timestamps() {
        let stale = verifier()
            .verify(Some(EXPECTED), Some("1531420618"), BODY.as_bytes(), at(TIMESTAMP + 301))
            .expect_err("stale");
        assert_eq!(stale, SignatureError::StaleTimestamp { skew_secs: 301 });

        let future = verifier()
            .verify(Some(EXPECTED), Some("1531420618"), BODY.as_bytes(), at(TIMESTAMP - 400))
            .expect_err("future");
        assert!(matches!(future, SignatureError::StaleTimestamp { .. }));
    }

    #[test]
    fn extreme_timestamps_are_stale_not_fatal() {
        let body = BODY.as_bytes();
        let earliest = verifier()
            .verify(Some(EXPECTED), Some(&i64::MIN.to_string()), body, at(TIMESTAMP))
            .expect_err("earliest");
        assert_eq!(
            earliest,
            SignatureError::StaleTimestamp { skew_secs: TIMESTAMP.abs_diff(i64::MIN) }
        );

        let latest = verifier()
            .verify(Some(EXPECTED), Some(&i64::MAX.to_string()), body, at(TIMESTAMP))
            .expect_err("latest");
        assert_eq!(
            latest,
            SignatureError::StaleTimestamp { skew_secs: TIMESTAMP.abs_diff(i64::MAX) }
        );
    }

    #[test]
    fn reports_missing_and_malformed_headers() {
        let body = BODY.as_bytes();
        assert_eq!(
            verifier().verify(None, Some("1"), body, at(1)),
            Err(SignatureError::MissingHeader(SIGNATURE_HEADER))
        );
        assert_eq!(
            verifier().verify(Some(EXPECTED), None, body, at(1)),
            Err(SignatureError::MissingHeader(TIMESTAMP_HEADER))
        );
        assert_eq!(
            verifier().verify(Some(EXPECTED), Some("yesterday"), body, at(1)),
            Err(SignatureError::MalformedTimestamp("yesterday".to_owned()))
        );
        assert_eq!(
            verifier().verify(Some("v0=not-hex"), Some("1531420618"), body, at(TIMESTAMP)),
            Err(SignatureError::Mismatch)
        );
    }
}
