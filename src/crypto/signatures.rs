//! ECDSA signing and verification over SECP256k1.
//!
//! Wallets store the private key as 64 hex characters and the public key as
//! the base64 of its SEC1 uncompressed point. Signatures cover the SHA-256
//! digest of a date string and travel base64-encoded in compact form.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::Local;
use secp256k1::ecdsa::Signature;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use sha2::{Digest, Sha256};

use crate::error::{NodeError, Result};

/// Generates a fresh keypair: `(private_key_hex, public_key_b64)`.
pub fn generate_keypair() -> (String, String) {
    let secp = Secp256k1::new();
    let (secret, public) = secp.generate_keypair(&mut rand::thread_rng());
    (
        hex::encode(secret.secret_bytes()),
        BASE64.encode(public.serialize_uncompressed()),
    )
}

/// The date string transactions are stamped and signed with:
/// `YYYY-MM-DD HH:MM:SS.ffffff`, local time.
pub fn current_date_string() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

/// Signs the current date string, returning `(signature_b64, date_string)`.
/// The caller embeds the date verbatim in the transaction record; verifiers
/// must see the exact same bytes.
pub fn sign_with_key(private_key_hex: &str) -> Result<(String, String)> {
    let date = current_date_string();
    let signature = sign_date(private_key_hex, &date)?;
    Ok((signature, date))
}

fn sign_date(private_key_hex: &str, date: &str) -> Result<String> {
    let raw = hex::decode(private_key_hex).map_err(|err| NodeError::Crypto(err.to_string()))?;
    let secret = SecretKey::from_slice(&raw).map_err(|err| NodeError::Crypto(err.to_string()))?;

    let message = Message::from_digest(Sha256::digest(date.as_bytes()).into());
    let signature = Secp256k1::new().sign_ecdsa(&message, &secret);

    Ok(BASE64.encode(signature.serialize_compact()))
}

/// Verifies `signature_b64` over `date` with the base64 public key. Every
/// failure mode (bad encoding, bad point, bad signature) is `false`; this
/// never panics or returns an error.
pub fn verify(public_key_b64: &str, signature_b64: &str, date: &str) -> bool {
    let Ok(key_bytes) = BASE64.decode(public_key_b64) else {
        return false;
    };
    let Ok(public) = PublicKey::from_slice(&key_bytes) else {
        return false;
    };
    let Ok(signature_bytes) = BASE64.decode(signature_b64) else {
        return false;
    };
    let Ok(signature) = Signature::from_compact(&signature_bytes) else {
        return false;
    };

    let message = Message::from_digest(Sha256::digest(date.as_bytes()).into());
    Secp256k1::verification_only()
        .verify_ecdsa(&message, &signature, &public)
        .is_ok()
}
