//! Unsubscribe token codec
//!
//! Encodes a signed, URL-safe token binding exactly one contact to
//! exactly one campaign, for one-click unsubscribe links. The token is
//! `base64url(payload).base64url(hmac-sha256(payload))`: compact and
//! tamper-resistant, not encrypted. Decoding never errors: malformed or
//! tampered input yields `None` so the unsubscribe flow can present a
//! uniform "invalid link" outcome.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Minimum signing secret length accepted at construction
const MIN_SECRET_LEN: usize = 32;

/// Decoded token contents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnsubscribeToken {
    pub contact_id: i64,
    pub campaign_id: i64,
}

/// Signs and verifies unsubscribe tokens with a shared secret
#[derive(Clone)]
pub struct UnsubscribeCodec {
    secret: Vec<u8>,
}

impl UnsubscribeCodec {
    /// Create a codec from the configured signing secret
    ///
    /// # Panics
    ///
    /// Panics when the secret is shorter than 32 bytes; a short secret
    /// makes token forgery feasible and is a deployment error.
    #[must_use]
    pub fn new(secret: &str) -> Self {
        assert!(
            secret.len() >= MIN_SECRET_LEN,
            "unsubscribe token secret too short (len={}), provide at least {MIN_SECRET_LEN} bytes",
            secret.len()
        );
        Self {
            secret: secret.as_bytes().to_vec(),
        }
    }

    /// Encode a token for one (contact, campaign) pair
    #[must_use]
    pub fn encode(&self, token: UnsubscribeToken) -> String {
        let payload = format!("{}.{}", token.contact_id, token.campaign_id);
        let mac = self.sign(payload.as_bytes());
        format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(payload.as_bytes()),
            URL_SAFE_NO_PAD.encode(mac)
        )
    }

    /// Decode and verify a token
    ///
    /// Returns `None` for any malformed, truncated, or tampered input.
    #[must_use]
    pub fn decode(&self, token: &str) -> Option<UnsubscribeToken> {
        let (payload_b64, mac_b64) = token.split_once('.')?;
        let payload = URL_SAFE_NO_PAD.decode(payload_b64).ok()?;
        let mac = URL_SAFE_NO_PAD.decode(mac_b64).ok()?;

        let mut verifier = HmacSha256::new_from_slice(&self.secret).ok()?;
        verifier.update(&payload);
        verifier.verify_slice(&mac).ok()?;

        let payload = String::from_utf8(payload).ok()?;
        let (contact_id, campaign_id) = payload.split_once('.')?;
        Some(UnsubscribeToken {
            contact_id: contact_id.parse().ok()?,
            campaign_id: campaign_id.parse().ok()?,
        })
    }

    fn sign(&self, payload: &[u8]) -> Vec<u8> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .unwrap_or_else(|_| unreachable!("HMAC accepts any key length"));
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }
}

impl std::fmt::Debug for UnsubscribeCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnsubscribeCodec").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-test-secret-test-secret-test";

    fn codec() -> UnsubscribeCodec {
        UnsubscribeCodec::new(SECRET)
    }

    #[test]
    fn test_round_trip() {
        let token = UnsubscribeToken {
            contact_id: 5,
            campaign_id: 9,
        };
        let encoded = codec().encode(token);
        assert_eq!(codec().decode(&encoded), Some(token));
    }

    #[test]
    fn test_round_trip_large_ids() {
        let token = UnsubscribeToken {
            contact_id: i64::MAX,
            campaign_id: 1,
        };
        let encoded = codec().encode(token);
        assert_eq!(codec().decode(&encoded), Some(token));
    }

    #[test]
    fn test_garbage_decodes_to_none() {
        for garbage in ["garbage", "", ".", "a.b.c", "####", "5.9"] {
            assert_eq!(codec().decode(garbage), None, "input: {garbage}");
        }
    }

    #[test]
    fn test_token_is_url_safe() {
        let encoded = codec().encode(UnsubscribeToken {
            contact_id: 12345,
            campaign_id: 67890,
        });
        assert!(encoded
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.'));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let encoded = codec().encode(UnsubscribeToken {
            contact_id: 5,
            campaign_id: 9,
        });
        let (_, mac) = encoded.split_once('.').unwrap();
        let forged_payload = URL_SAFE_NO_PAD.encode(b"6.9");
        let forged = format!("{forged_payload}.{mac}");
        assert_eq!(codec().decode(&forged), None);
    }

    #[test]
    fn test_different_secret_rejects() {
        let encoded = codec().encode(UnsubscribeToken {
            contact_id: 5,
            campaign_id: 9,
        });
        let other = UnsubscribeCodec::new("another-secret-another-secret-another!!!");
        assert_eq!(other.decode(&encoded), None);
    }

    #[test]
    #[should_panic(expected = "secret too short")]
    fn test_short_secret_panics() {
        let _ = UnsubscribeCodec::new("short");
    }

    proptest::proptest! {
        #[test]
        fn prop_any_id_pair_round_trips(contact_id in 0_i64.., campaign_id in 0_i64..) {
            let token = UnsubscribeToken { contact_id, campaign_id };
            let encoded = codec().encode(token);
            proptest::prop_assert_eq!(codec().decode(&encoded), Some(token));
        }

        #[test]
        fn prop_arbitrary_input_never_panics(input in ".*") {
            let _ = codec().decode(&input);
        }
    }
}
