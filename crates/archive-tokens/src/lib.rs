use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const ENCODING_CONFIG: base64::Config = base64::URL_SAFE_NO_PAD;

#[derive(Debug, thiserror::Error)]
pub enum ActionTokenError {
    #[error("invalid token format")]
    InvalidFormat,
    #[error("invalid token encoding")]
    InvalidEncoding,
    #[error("invalid token signature")]
    InvalidSignature,
    #[error("invalid token payload")]
    InvalidPayload(#[from] serde_json::Error),
    #[error("token job mismatch")]
    JobMismatch,
    #[error("token action mismatch")]
    ActionMismatch,
    #[error("token expired")]
    Expired,
}

/// The signed payload carried by an action token, per spec §4.7:
/// `{v:1, job_id, action, exp}` serialized with sorted keys and compact
/// separators before signing.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenPayload {
    v: u8,
    job_id: Uuid,
    action: String,
    exp: i64,
}

/// Signs and verifies out-of-band action tokens scoped to one ingest job
/// and one verb (`retry`, `reprocess`, ...), bound to a secret shared with
/// the issuing surface (spec §4.7: HTTP/auth are interface-only
/// collaborators here — this type never touches a request).
#[derive(Clone)]
pub struct ActionTokenSigner {
    secret: Vec<u8>,
}

impl ActionTokenSigner {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self { secret: secret.into() }
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts keys of any length")
    }

    /// Issues a token for `job_id`/`action`, expiring `ttl_seconds` from
    /// `now` (minimum 1 second, matching the original's `max(1, ttl)`
    /// clamp).
    pub fn issue(
        &self,
        job_id: Uuid,
        action: &str,
        now: DateTime<Utc>,
        ttl_seconds: i64,
    ) -> (String, DateTime<Utc>) {
        let exp = now.timestamp() + ttl_seconds.max(1);
        let payload = TokenPayload {
            v: 1,
            job_id,
            action: action.to_owned(),
            exp,
        };
        // Route through `serde_json::Value` before encoding: without the
        // `preserve_order` feature its object map is a `BTreeMap`, so
        // serializing the value (rather than the struct directly) sorts
        // keys lexicographically (`action, exp, job_id, v`) to match the
        // original's `json.dumps(..., sort_keys=True)` wire format.
        let payload_value = serde_json::to_value(&payload).expect("payload always serializes");
        let payload_raw = serde_json::to_vec(&payload_value).expect("payload always serializes");

        let mut mac = self.mac();
        mac.update(&payload_raw);
        let signature = mac.finalize().into_bytes();

        let token = format!(
            "{}.{}",
            base64::encode_config(&payload_raw, ENCODING_CONFIG),
            base64::encode_config(signature, ENCODING_CONFIG)
        );
        let expires_at = DateTime::from_timestamp(exp, 0).unwrap_or(now);
        (token, expires_at)
    }

    /// Verifies `token` was issued by this signer for exactly `job_id` and
    /// `action`, and has not yet expired as of `now`.
    pub fn verify(
        &self,
        token: &str,
        job_id: Uuid,
        action: &str,
        now: DateTime<Utc>,
    ) -> Result<(), ActionTokenError> {
        let (payload_b64, signature_b64) = token.split_once('.').ok_or(ActionTokenError::InvalidFormat)?;

        let payload_raw = base64::decode_config(payload_b64, ENCODING_CONFIG)
            .map_err(|_| ActionTokenError::InvalidEncoding)?;
        let signature = base64::decode_config(signature_b64, ENCODING_CONFIG)
            .map_err(|_| ActionTokenError::InvalidEncoding)?;

        let mut mac = self.mac();
        mac.update(&payload_raw);
        mac.verify_slice(&signature)
            .map_err(|_| ActionTokenError::InvalidSignature)?;

        let payload: TokenPayload = serde_json::from_slice(&payload_raw)?;
        if payload.job_id != job_id {
            return Err(ActionTokenError::JobMismatch);
        }
        if payload.action != action {
            return Err(ActionTokenError::ActionMismatch);
        }
        if now.timestamp() > payload.exp {
            return Err(ActionTokenError::Expired);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn signer() -> ActionTokenSigner {
        ActionTokenSigner::new(b"test-secret".to_vec())
    }

    #[test]
    fn round_trips_a_valid_token() {
        let signer = signer();
        let job_id = Uuid::new_v4();
        let now = Utc::now();
        let (token, _expires_at) = signer.issue(job_id, "retry", now, 3600);
        signer.verify(&token, job_id, "retry", now).unwrap();
    }

    #[test]
    fn rejects_wrong_job_id() {
        let signer = signer();
        let now = Utc::now();
        let (token, _) = signer.issue(Uuid::new_v4(), "retry", now, 3600);
        let err = signer.verify(&token, Uuid::new_v4(), "retry", now).unwrap_err();
        assert!(matches!(err, ActionTokenError::JobMismatch));
    }

    #[test]
    fn rejects_wrong_action() {
        let signer = signer();
        let job_id = Uuid::new_v4();
        let now = Utc::now();
        let (token, _) = signer.issue(job_id, "retry", now, 3600);
        let err = signer.verify(&token, job_id, "reprocess", now).unwrap_err();
        assert!(matches!(err, ActionTokenError::ActionMismatch));
    }

    #[test]
    fn rejects_expired_token() {
        let signer = signer();
        let job_id = Uuid::new_v4();
        let now = Utc::now();
        let (token, _) = signer.issue(job_id, "retry", now, 60);
        let err = signer
            .verify(&token, job_id, "retry", now + Duration::seconds(120))
            .unwrap_err();
        assert!(matches!(err, ActionTokenError::Expired));
    }

    #[test]
    fn rejects_tampered_signature() {
        let signer = signer();
        let job_id = Uuid::new_v4();
        let now = Utc::now();
        let (token, _) = signer.issue(job_id, "retry", now, 3600);
        let mut tampered = token.clone();
        tampered.push('x');
        let err = signer.verify(&tampered, job_id, "retry", now).unwrap_err();
        assert!(matches!(
            err,
            ActionTokenError::InvalidSignature | ActionTokenError::InvalidEncoding
        ));
    }

    #[test]
    fn different_secrets_produce_different_tokens() {
        let signer1 = ActionTokenSigner::new(b"secret-one".to_vec());
        let signer2 = ActionTokenSigner::new(b"secret-two".to_vec());
        let job_id = Uuid::new_v4();
        let now = Utc::now();
        let (token1, _) = signer1.issue(job_id, "retry", now, 3600);
        let (token2, _) = signer2.issue(job_id, "retry", now, 3600);
        assert_ne!(token1, token2);
        assert!(signer2.verify(&token1, job_id, "retry", now).is_err());
    }
}
