use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Trait for verifying webhook signatures
///
/// Verification runs over bytes already in memory, so it is synchronous.
/// Implementations must return `false` for any mismatch instead of failing.
///
/// # Example
///
/// ```rust,ignore
/// use vortex_axum::webhooks::{HmacSha256Verifier, WebhookVerifier};
///
/// let verifier = HmacSha256Verifier::new("whsec_your_secret_here");
///
/// let payload = br#"{"id":"evt_1","type":"invitation.accepted"}"#;
/// let signature = "3f1c..."; // From X-Vortex-Signature
/// let is_valid = verifier.verify_signature(payload, signature);
/// ```
pub trait WebhookVerifier: Send + Sync {
    /// Check `signature` against the raw `payload` bytes.
    fn verify_signature(&self, payload: &[u8], signature: &str) -> bool;
}

/// HMAC-SHA256 verifier for lowercase-hex signatures.
///
/// The secret is held as a [`SecretString`] so it never shows up in debug
/// output.
#[derive(Debug)]
pub struct HmacSha256Verifier {
    secret: SecretString,
}

impl HmacSha256Verifier {
    pub fn new(secret: impl Into<SecretString>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl WebhookVerifier for HmacSha256Verifier {
    fn verify_signature(&self, payload: &[u8], signature: &str) -> bool {
        let is_valid = verify(payload, signature, self.secret.expose_secret().as_bytes());
        if !is_valid {
            tracing::debug!(
                target: "vortex::webhooks",
                payload_len = payload.len(),
                "Webhook signature verification failed"
            );
        }
        is_valid
    }
}

fn compute_digest(payload: &[u8], secret: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

/// Sign `payload` with `secret`, returning the lowercase-hex HMAC-SHA256 digest.
///
/// This is the value a sender puts in `X-Vortex-Signature`.
pub fn sign(payload: &[u8], secret: &[u8]) -> String {
    hex::encode(compute_digest(payload, secret))
}

/// Verify a hex signature over the exact `payload` bytes.
///
/// The provided signature is hex-decoded and compared against the computed
/// digest in constant time. Undecodable or wrong-length signatures are
/// rejected without comparing.
pub fn verify(payload: &[u8], signature: &str, secret: &[u8]) -> bool {
    let provided = match hex::decode(signature.trim()) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    let expected = compute_digest(payload, secret);
    constant_time_compare(&expected, &provided)
}

/// Length check first; a digest length is public, its contents are not.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SECRET: &[u8] = b"whsec_test_secret";

    #[test]
    fn test_sign_is_lowercase_hex_sha256() {
        let signature = sign(b"payload", SECRET);
        assert_eq!(signature.len(), 64);
        assert!(signature.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_known_vector() {
        // RFC 4231 test case 2
        let signature = sign(b"what do ya want for nothing?", b"Jefe");
        assert_eq!(
            signature,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_verify_valid_signature() {
        let payload = br#"{"id":"evt_123","type":"invitation.accepted"}"#;
        let signature = sign(payload, SECRET);
        assert!(verify(payload, &signature, SECRET));
    }

    #[test]
    fn test_verify_wrong_secret() {
        let payload = b"payload";
        let signature = sign(payload, b"secret1");
        assert!(!verify(payload, &signature, b"secret2"));
    }

    #[test]
    fn test_verify_modified_payload() {
        let signature = sign(b"original payload", SECRET);
        assert!(!verify(b"modified payload", &signature, SECRET));
    }

    #[test]
    fn test_verify_empty_payload() {
        let signature = sign(b"", SECRET);
        assert!(verify(b"", &signature, SECRET));
    }

    #[test]
    fn test_verify_binary_payload() {
        let payload: &[u8] = &[0x00, 0x01, 0xff, 0xfe, 0x80];
        let signature = sign(payload, SECRET);
        assert!(verify(payload, &signature, SECRET));
    }

    #[test]
    fn test_verify_uppercase_hex_decodes_to_same_digest() {
        let payload = b"payload";
        let signature = sign(payload, SECRET).to_uppercase();
        assert!(verify(payload, &signature, SECRET));
    }

    #[test]
    fn test_verify_malformed_signatures() {
        let payload = b"payload";
        for sig in ["", "not-hex", "abc", "0g0g0g", "sha256=abcdef"] {
            assert!(!verify(payload, sig, SECRET), "Malformed signature '{}' should fail", sig);
        }
    }

    #[test]
    fn test_verify_truncated_signature() {
        let payload = b"payload";
        let signature = sign(payload, SECRET);
        assert!(!verify(payload, &signature[..62], SECRET));
        assert!(!verify(payload, &signature[..32], SECRET));
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare(&[1, 2, 3], &[1, 2, 3]));
        assert!(!constant_time_compare(&[1, 2, 3], &[1, 2, 4]));
        assert!(!constant_time_compare(&[1, 2], &[1, 2, 3]));
        assert!(constant_time_compare(&[], &[]));
    }

    #[test]
    fn test_hmac_verifier_uses_secret() {
        let verifier = HmacSha256Verifier::new("whsec_test_secret");
        let payload = b"{}";
        assert!(verifier.verify_signature(payload, &sign(payload, SECRET)));
        assert!(!verifier.verify_signature(payload, &sign(payload, b"other")));
    }

    #[test]
    fn test_hmac_verifier_debug_hides_secret() {
        let verifier = HmacSha256Verifier::new("whsec_do_not_print");
        assert!(!format!("{:?}", verifier).contains("whsec_do_not_print"));
    }

    #[test]
    fn test_verifier_as_dyn_trait() {
        let verifier: Box<dyn WebhookVerifier> = Box::new(HmacSha256Verifier::new("s"));
        assert!(verifier.verify_signature(b"x", &sign(b"x", b"s")));
    }

    proptest! {
        #[test]
        fn prop_sign_then_verify(payload in proptest::collection::vec(any::<u8>(), 0..512),
                                 secret in proptest::collection::vec(any::<u8>(), 1..64)) {
            let signature = sign(&payload, &secret);
            prop_assert!(verify(&payload, &signature, &secret));
        }

        #[test]
        fn prop_other_secret_rejected(payload in proptest::collection::vec(any::<u8>(), 0..256),
                                      secret in "[a-zA-Z0-9_]{1,32}",
                                      other in "[a-zA-Z0-9_]{1,32}") {
            prop_assume!(secret != other);
            let signature = sign(&payload, secret.as_bytes());
            prop_assert!(!verify(&payload, &signature, other.as_bytes()));
        }

        #[test]
        fn prop_single_byte_tamper_rejected(payload in proptest::collection::vec(any::<u8>(), 1..256),
                                            index in any::<prop::sample::Index>(),
                                            flip in 1u8..=255) {
            let signature = sign(&payload, SECRET);
            let mut tampered = payload.clone();
            let i = index.index(tampered.len());
            tampered[i] ^= flip;
            prop_assert!(!verify(&tampered, &signature, SECRET));
        }
    }
}
