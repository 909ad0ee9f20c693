use crate::error::{AppError, Result};
use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Requests older than this are treated as replays
pub const MAX_CLOCK_SKEW_SECS: i64 = 60 * 5;

pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";
pub const SIGNATURE_HEADER: &str = "x-slack-signature";

/// Verifies the `v0` request signature Slack attaches to every callback
#[derive(Clone)]
pub struct RequestVerifier {
    secret: Vec<u8>,
}

impl RequestVerifier {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    /// `v0=` followed by the hex HMAC-SHA256 of `v0:{timestamp}:{body}`
    pub fn sign(&self, timestamp: &str, body: &[u8]) -> Result<String> {
        let mut mac = self.new_hmac()?;
        mac.update(format!("v0:{}:", timestamp).as_bytes());
        mac.update(body);
        Ok(format!("v0={}", hex::encode(mac.finalize().into_bytes())))
    }

    pub fn verify(&self, timestamp: &str, signature: &str, body: &[u8], now: i64) -> Result<()> {
        let sent: i64 = timestamp
            .parse()
            .map_err(|_| AppError::Authentication("invalid request timestamp".to_string()))?;

        if (now - sent).abs() > MAX_CLOCK_SKEW_SECS {
            return Err(AppError::Authentication("stale request timestamp".to_string()));
        }

        let expected = signature
            .strip_prefix("v0=")
            .and_then(|sig| hex::decode(sig).ok())
            .ok_or_else(|| AppError::Authentication("malformed request signature".to_string()))?;

        let mut mac = self.new_hmac()?;
        mac.update(format!("v0:{}:", timestamp).as_bytes());
        mac.update(body);
        mac.verify_slice(&expected)
            .map_err(|_| AppError::Authentication("request signature mismatch".to_string()))
    }

    fn new_hmac(&self) -> Result<Hmac<Sha256>> {
        Hmac::<Sha256>::new_from_slice(&self.secret)
            .map_err(|e| AppError::Internal(format!("invalid signing key: {}", e)))
    }
}
