// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Symmetric encryption of record payloads.
//!
//! Payloads are encrypted with AES-256 in CFB mode. The key is the UTF-8
//! password truncated or zero-padded to 32 bytes, and every call draws a
//! fresh 16-byte IV that is prepended to the ciphertext:
//!
//! ```text
//! [ IV (16 bytes) | ciphertext (len(payload) bytes) ]
//! ```
//!
//! ## Security Note
//!
//! There is no authentication tag. Decrypting with the wrong password does
//! NOT fail; it returns bytes of the right length that are garbage. Callers
//! that need to detect a wrong secret must validate the decoded payload
//! themselves (e.g. by parsing it as JSON).

use aes::cipher::{AsyncStreamCipher, KeyIvInit};
use ring::rand::{SecureRandom, SystemRandom};

use crate::error::ErrorKind;

type Aes256CfbEnc = cfb_mode::Encryptor<aes::Aes256>;
type Aes256CfbDec = cfb_mode::Decryptor<aes::Aes256>;

/// AES-256 key length in bytes.
pub const KEY_LEN: usize = 32;

/// AES block size, which is also the IV length for CFB mode.
pub const IV_LEN: usize = 16;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("ciphertext too short: {len} bytes, need at least {IV_LEN}")]
    InputTooShort { len: usize },

    #[error("system random number generator failed")]
    Rng,
}

impl CryptoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CryptoError::InputTooShort { .. } => ErrorKind::InputTooShort,
            CryptoError::Rng => ErrorKind::ExternalCallFailed,
        }
    }
}

/// Derive the cipher key from a password.
///
/// Longer passwords are truncated, shorter ones are zero-padded.
pub fn derive_key(password: &str) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    let bytes = password.as_bytes();
    let n = bytes.len().min(KEY_LEN);
    key[..n].copy_from_slice(&bytes[..n]);
    key
}

/// Encrypt `payload`, returning `IV || ciphertext`.
pub fn encrypt(payload: &[u8], password: &str) -> Result<Vec<u8>, CryptoError> {
    let key = derive_key(password);

    let mut iv = [0u8; IV_LEN];
    SystemRandom::new()
        .fill(&mut iv)
        .map_err(|_| CryptoError::Rng)?;

    let mut out = Vec::with_capacity(IV_LEN + payload.len());
    out.extend_from_slice(&iv);
    out.extend_from_slice(payload);

    Aes256CfbEnc::new(&key.into(), &iv.into()).encrypt(&mut out[IV_LEN..]);
    Ok(out)
}

/// Decrypt `IV || ciphertext` produced by [`encrypt`].
///
/// Only fails when the input cannot even hold an IV.
pub fn decrypt(ciphertext: &[u8], password: &str) -> Result<Vec<u8>, CryptoError> {
    if ciphertext.len() < IV_LEN {
        return Err(CryptoError::InputTooShort {
            len: ciphertext.len(),
        });
    }

    let key = derive_key(password);
    let (iv, body) = ciphertext.split_at(IV_LEN);
    let mut iv_arr = [0u8; IV_LEN];
    iv_arr.copy_from_slice(iv);

    let mut out = body.to_vec();
    Aes256CfbDec::new(&key.into(), &iv_arr.into()).decrypt(&mut out);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_restores_payload() {
        let payloads: [&[u8]; 4] = [
            b"",
            b"x",
            b"{\"description\":\"a lamp\",\"image\":\"lamp.png\"}",
            &[0u8, 255, 1, 254, 2, 253, 3, 252, 4, 251, 5, 250, 6, 249, 7, 248, 9],
        ];

        for payload in payloads {
            let sealed = encrypt(payload, "hunter2").unwrap();
            assert_eq!(sealed.len(), IV_LEN + payload.len());
            assert_eq!(decrypt(&sealed, "hunter2").unwrap(), payload);
        }
    }

    #[test]
    fn empty_payload_roundtrips_to_empty() {
        let sealed = encrypt(b"", "secret").unwrap();
        assert_eq!(sealed.len(), IV_LEN);
        assert!(decrypt(&sealed, "secret").unwrap().is_empty());
    }

    #[test]
    fn short_ciphertext_is_rejected() {
        for len in 0..IV_LEN {
            let input = vec![7u8; len];
            assert_eq!(
                decrypt(&input, "secret"),
                Err(CryptoError::InputTooShort { len })
            );
        }
    }

    #[test]
    fn wrong_password_yields_garbage_not_error() {
        let payload = b"the quick brown fox jumps over the lazy dog";
        let sealed = encrypt(payload, "right-password").unwrap();

        let garbage = decrypt(&sealed, "wrong-password").unwrap();
        assert_eq!(garbage.len(), payload.len());
        assert_ne!(garbage.as_slice(), payload.as_slice());
    }

    #[test]
    fn fresh_iv_per_call() {
        let a = encrypt(b"same payload", "pw").unwrap();
        let b = encrypt(b"same payload", "pw").unwrap();
        assert_ne!(a[..IV_LEN], b[..IV_LEN]);
        assert_ne!(a, b);
    }

    #[test]
    fn derive_key_pads_and_truncates() {
        let short = derive_key("abc");
        assert_eq!(&short[..3], b"abc");
        assert!(short[3..].iter().all(|b| *b == 0));

        let long = "0123456789abcdef0123456789abcdefEXTRA";
        assert_eq!(&derive_key(long), &long.as_bytes()[..KEY_LEN]);

        // Passwords that agree on the first 32 bytes share a key
        let sealed = encrypt(b"payload", long).unwrap();
        let opened = decrypt(&sealed, "0123456789abcdef0123456789abcdef").unwrap();
        assert_eq!(opened, b"payload");
    }
}
