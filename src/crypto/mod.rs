//! Cryptography: ECDSA signing over SECP256k1.

pub mod signatures;

pub use signatures::{current_date_string, generate_keypair, sign_with_key, verify};
