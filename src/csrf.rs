use base64::engine::{general_purpose, Engine};
use chrono::Utc;
use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;
use tracing::debug;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

/// Tokens older than this are rejected.
pub const DEFAULT_MAX_AGE_SECS: i64 = 60 * 60 * 12;

/// Signs and checks the hidden token carried by every public form post.
///
/// A token is `{timestamp}.{nonce}.{signature}`, where the signature is the
/// base64 of the hex HMAC-SHA256 over the content id, timestamp and nonce.
#[derive(Clone)]
pub struct CsrfSigner {
    secret: Vec<u8>,
    max_age_secs: i64,
}

impl std::fmt::Debug for CsrfSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsrfSigner")
            .field("max_age_secs", &self.max_age_secs)
            .finish_non_exhaustive()
    }
}

impl CsrfSigner {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
            max_age_secs: DEFAULT_MAX_AGE_SECS,
        }
    }

    /// A signer with a random secret, valid for this process only.
    pub fn ephemeral() -> Self {
        let secret: [u8; 32] = rand::thread_rng().gen();
        Self::new(secret)
    }

    pub fn with_max_age(mut self, max_age_secs: i64) -> Self {
        self.max_age_secs = max_age_secs;
        self
    }

    /// Generate a random nonce for a token
    pub fn generate_nonce() -> String {
        rand::thread_rng().gen_range(10000000..99999999).to_string()
    }

    /// Get current timestamp for a token
    pub fn get_timestamp() -> i64 {
        Utc::now().timestamp()
    }

    fn mac(&self, content_id: u64, timestamp: i64, nonce: &str) -> HmacSha256 {
        let content = format!("{}\n{}\n{}", content_id, timestamp, nonce);
        debug!("Signing CSRF payload for content {}", content_id);

        let mut mac = HmacSha256::new_from_slice(&self.secret).expect("HMAC can take key of any size");
        mac.update(content.as_bytes());
        mac
    }

    pub fn generate_signature(&self, content_id: u64, timestamp: i64, nonce: &str) -> String {
        let hex_hash = hex::encode(self.mac(content_id, timestamp, nonce).finalize().into_bytes());
        general_purpose::STANDARD.encode(hex_hash.as_bytes())
    }

    pub fn issue_at(&self, content_id: u64, timestamp: i64) -> String {
        let nonce = Self::generate_nonce();
        let signature = self.generate_signature(content_id, timestamp, &nonce);
        format!("{}.{}.{}", timestamp, nonce, signature)
    }

    pub fn issue(&self, content_id: u64) -> String {
        self.issue_at(content_id, Self::get_timestamp())
    }

    pub fn verify_at(&self, token: &str, content_id: u64, now: i64) -> bool {
        let mut parts = token.splitn(3, '.');
        let (Some(timestamp), Some(nonce), Some(signature)) = (parts.next(), parts.next(), parts.next()) else {
            return false;
        };
        let Ok(timestamp) = timestamp.parse::<i64>() else {
            return false;
        };
        if now < timestamp || now - timestamp > self.max_age_secs {
            debug!("CSRF token for content {} is expired", content_id);
            return false;
        }

        let Ok(hex_hash) = general_purpose::STANDARD.decode(signature) else {
            return false;
        };
        let Ok(expected) = hex::decode(hex_hash) else {
            return false;
        };
        self.mac(content_id, timestamp, nonce).verify_slice(&expected).is_ok()
    }

    pub fn verify(&self, token: &str, content_id: u64) -> bool {
        self.verify_at(token, content_id, Self::get_timestamp())
    }
}
