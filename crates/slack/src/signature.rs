//! Slack request signing (`v0` scheme).

use std::time::Duration;

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";
pub const SIGNATURE_HEADER: &str = "x-slack-signature";

const VERSION: &str = "v0";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing request header `{0}`")]
    MissingHeader(&'static str),
    #[error("request timestamp `{0}` is not a unix timestamp")]
    InvalidTimestamp(String),
    #[error("request timestamp is {skew_secs}s away from now (tolerance {tolerance_secs}s)")]
    Stale { skew_secs: u64, tolerance_secs: u64 },
    #[error("request signature is malformed")]
    Malformed,
    #[error("request signature does not match")]
    Mismatch,
}

#[derive(Clone, Debug)]
pub struct SignatureVerifier {
    signing_secret: SecretString,
    tolerance: Duration,
}

impl SignatureVerifier {
    pub fn new(signing_secret: SecretString, tolerance: Duration) -> Self {
        Self { signing_secret, tolerance }
    }

    /// Checks a request against the signing secret. `now_unix` is injected so
    /// the replay window can be tested.
    pub fn verify(
        &self,
        timestamp: Option<&str>,
        signature: Option<&str>,
        body: &[u8],
        now_unix: u64,
    ) -> Result<(), SignatureError> {
        let timestamp = timestamp.ok_or(SignatureError::MissingHeader(TIMESTAMP_HEADER))?;
        let signature = signature.ok_or(SignatureError::MissingHeader(SIGNATURE_HEADER))?;

        let sent_at: u64 = timestamp
            .trim()
            .parse()
            .map_err(|_| SignatureError::InvalidTimestamp(timestamp.to_owned()))?;
        let skew_secs = now_unix.abs_diff(sent_at);
        if skew_secs > self.tolerance.as_secs() {
            return Err(SignatureError::Stale { skew_secs, tolerance_secs: self.tolerance.as_secs() });
        }

        let provided = signature
            .strip_prefix("v0=")
            .and_then(|encoded| hex::decode(encoded).ok())
            .ok_or(SignatureError::Malformed)?;

        let mac = self.mac(timestamp.trim(), body)?;
        mac.verify_slice(&provided).map_err(|_| SignatureError::Mismatch)
    }

    /// Produces the header value Slack would send for this body.
    pub fn sign(&self, timestamp: &str, body: &[u8]) -> Result<String, SignatureError> {
        let mac = self.mac(timestamp, body)?;
        Ok(format!("{VERSION}={}", hex::encode(mac.finalize().into_bytes())))
    }

    fn mac(&self, timestamp: &str, body: &[u8]) -> Result<HmacSha256, SignatureError> {
        let mut mac = HmacSha256::new_from_slice(self.signing_secret.expose_secret().as_bytes())
            .map_err(|_| SignatureError::Malformed)?;
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
    use std::time::Duration;

    use super::{SignatureError, SignatureVerifier};

    const NOW: u64 = 1_700_000_000;

    fn verifier() -> SignatureVerifier {
        SignatureVerifier::new("8f742231b10e8888abcd99yyyzzz85a5".to_owned().into(), Duration::from_secs(300))
    }

    #[test]
    fn accepts_correctly_signed_request() {
        let verifier = verifier();
        let body = b"command=%2Fclaim&text=&user_id=U1";
        let signature = verifier.sign("1700000000", body).expect("sign");

        assert!(signature.starts_with("v0="));
        assert_eq!(verifier.verify(Some("1700000000"), Some(&signature), body, NOW), Ok(()));
    }

    #[test]
    fn matches_published_slack_example() {
        let body = "token=xyzz0WbapA4vBCDEFasx0q6G&team_id=T1DC2JH3J&team_domain=testteamnow\
                    &channel_id=G8PSS9T3V&channel_name=foobar&user_id=U2CERLKJA\
                    &user_name=roadrunner&command=%2Fwebhook-collect&text=\
                    &response_url=https%3A%2F%2Fhooks.slack.com%2Fcommands%2FT1DC2JH3J%2F397700885554%2F96rGlfmibIGlgcZRskXaIFfN\
                    &trigger_id=398738663015.47445629121.803a0bc887a14d10d2c447fce8b6703c";
        let expected = "v0=a2114d57b48eac39b9ad189dd8316235a7b4a8d21a10bd27519666489c69b503";

        assert_eq!(verifier().sign("1531420618", body.as_bytes()), Ok(expected.to_owned()));
        assert_eq!(
            verifier().verify(Some("1531420618"), Some(expected), body.as_bytes(), 1_531_420_700),
            Ok(())
        );
    }

    #[test]
    fn rejects_tampered_body() {
        let verifier = verifier();
        let signature = verifier.sign("1700000000", b"text=a").expect("sign");

        assert_eq!(
            verifier.verify(Some("1700000000"), Some(&signature), b"text=b", NOW),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn rejects_requests_outside_tolerance() {
        let verifier = verifier();
        let signature = verifier.sign("1699999000", b"x").expect("sign");

        assert_eq!(
            verifier.verify(Some("1699999000"), Some(&signature), b"x", NOW),
            Err(SignatureError::Stale { skew_secs: 1_000, tolerance_secs: 300 })
        );
    }

    #[test]
    fn rejects_missing_and_malformed_headers() {
        let verifier = verifier();

        assert_eq!(
            verifier.verify(None, Some("v0=00"), b"x", NOW),
            Err(SignatureError::MissingHeader("x-slack-request-timestamp"))
        );
        assert_eq!(
            verifier.verify(Some("1700000000"), None, b"x", NOW),
            Err(SignatureError::MissingHeader("x-slack-signature"))
        );
        assert_eq!(
            verifier.verify(Some("yesterday"), Some("v0=00"), b"x", NOW),
            Err(SignatureError::InvalidTimestamp("yesterday".to_owned()))
        );
        assert_eq!(
            verifier.verify(Some("1700000000"), Some("v1=zz"), b"x", NOW),
            Err(SignatureError::Malformed)
        );
    }
}
