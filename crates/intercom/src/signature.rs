//! Webhook signature verification.
//!
//! Intercom signs each delivery with HMAC-SHA1 over the request body and
//! transmits the digest as `X-Hub-Signature: sha1=<hex>`. Verification runs
//! over the raw received bytes - exactly what the sender signed - and the
//! digest comparison is constant time.

use hmac::{Hmac, Mac};
use sha1::Sha1;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha1 = Hmac<Sha1>;

/// Header carrying the delivery signature.
pub const SIGNATURE_HEADER: &str = "x-hub-signature";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature header is missing")]
    MissingHeader,
    #[error("signature header must be formatted as `sha1=<hex digest>`")]
    MalformedHeader,
    #[error("unsupported signature algorithm `{0}`")]
    UnsupportedAlgorithm(String),
    #[error("signature digest mismatch")]
    DigestMismatch,
}

/// Verify a delivery signature against the raw body bytes.
pub fn verify_signature(
    header: Option<&str>,
    raw_body: &[u8],
    secret: &str,
) -> Result<(), SignatureError> {
    let header = header.ok_or(SignatureError::MissingHeader)?;
    let (algorithm, digest_hex) =
        header.split_once('=').ok_or(SignatureError::MalformedHeader)?;

    if algorithm != "sha1" {
        return Err(SignatureError::UnsupportedAlgorithm(algorithm.to_string()));
    }

    let claimed = hex::decode(digest_hex).map_err(|_| SignatureError::MalformedHeader)?;
    let expected = digest(raw_body, secret);

    if constant_time_compare(&expected, &claimed) {
        Ok(())
    } else {
        Err(SignatureError::DigestMismatch)
    }
}

/// Produce the `sha1=<hex>` header value for a body, as the sender would.
pub fn sign(raw_body: &[u8], secret: &str) -> String {
    format!("sha1={}", hex::encode(digest(raw_body, secret)))
}

fn digest(raw_body: &[u8], secret: &str) -> Vec<u8> {
    let mut mac =
        HmacSha1::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(raw_body);
    mac.finalize().into_bytes().to_vec()
}

fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use crate::signature::{sign, verify_signature, SignatureError};

    const SECRET: &str = "intercom-client-secret";

    #[test]
    fn round_trip_validates() {
        let body = br#"{"delivery_attempts":1,"data":{"item":{"type":"conversation"}}}"#;
        let header = sign(body, SECRET);

        assert_eq!(verify_signature(Some(&header), body, SECRET), Ok(()));
    }

    #[test]
    fn flipping_any_body_byte_invalidates() {
        let body = br#"{"delivery_attempts":1}"#.to_vec();
        let header = sign(&body, SECRET);

        for index in 0..body.len() {
            let mut tampered = body.clone();
            tampered[index] ^= 0x01;
            assert_eq!(
                verify_signature(Some(&header), &tampered, SECRET),
                Err(SignatureError::DigestMismatch),
                "byte {index} flip must invalidate the signature"
            );
        }
    }

    #[test]
    fn wrong_secret_fails() {
        let body = b"payload";
        let header = sign(body, SECRET);

        assert_eq!(
            verify_signature(Some(&header), body, "other-secret"),
            Err(SignatureError::DigestMismatch)
        );
    }

    #[test]
    fn missing_header_fails() {
        assert_eq!(verify_signature(None, b"payload", SECRET), Err(SignatureError::MissingHeader));
    }

    #[test]
    fn non_sha1_algorithm_fails() {
        let body = b"payload";
        let digest = sign(body, SECRET);
        let sha256_header = digest.replace("sha1=", "sha256=");

        assert_eq!(
            verify_signature(Some(&sha256_header), body, SECRET),
            Err(SignatureError::UnsupportedAlgorithm("sha256".to_string()))
        );
    }

    #[test]
    fn header_without_separator_fails() {
        assert_eq!(
            verify_signature(Some("sha1deadbeef"), b"payload", SECRET),
            Err(SignatureError::MalformedHeader)
        );
    }

    #[test]
    fn non_hex_digest_fails() {
        assert_eq!(
            verify_signature(Some("sha1=not-hex"), b"payload", SECRET),
            Err(SignatureError::MalformedHeader)
        );
    }
}
