//! Block-cipher primitives used by every pipeline.

use aes::Aes256;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use getrandom::fill as getrandom;

use crate::kdf::DerivedKey;
use crate::types::{Algorithm, TicketCryptError};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// GCM authentication tag length, appended to every GCM ciphertext.
pub const GCM_TAG_LEN: usize = 16;

/// Ciphertext of one chunk together with the IV actually used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkCiphertext {
    pub ciphertext: Vec<u8>,
    pub iv: Vec<u8>,
}

/// Generate a cryptographically secure random IV of the right length for `alg`.
pub fn generate_iv(alg: Algorithm) -> Result<Vec<u8>, TicketCryptError> {
    let mut iv = vec![0u8; alg.iv_len()];
    getrandom(&mut iv).map_err(|_| TicketCryptError::RandomnessUnavailable)?;
    Ok(iv)
}

/// Encrypt one chunk.
///
/// When `iv` is `None` a fresh IV is drawn. Apart from that the call is pure:
/// identical `(bytes, alg, key, iv)` always produce identical ciphertext.
/// For AES-GCM the 16-byte tag is part of the returned ciphertext.
///
/// # Errors
///
/// Returns `TicketCryptError::Cipher` if the key is bound to another algorithm,
/// does not permit encryption, or `iv` has the wrong length.
pub fn encrypt_chunk(
    bytes: &[u8],
    alg: Algorithm,
    key: &DerivedKey,
    iv: Option<&[u8]>,
) -> Result<ChunkCiphertext, TicketCryptError> {
    if key.algorithm() != alg {
        return Err(TicketCryptError::Cipher("key is bound to a different algorithm"));
    }
    if !key.usage().permits_encrypt() {
        return Err(TicketCryptError::Cipher("key usage does not permit encryption"));
    }

    let iv = match iv {
        Some(iv) if iv.len() != alg.iv_len() => {
            return Err(TicketCryptError::Cipher("IV length does not match algorithm"));
        }
        Some(iv) => iv.to_vec(),
        None => generate_iv(alg)?,
    };

    let ciphertext = match alg {
        Algorithm::AesGcm => {
            let cipher = Aes256Gcm::new_from_slice(key.expose())
                .map_err(|_| TicketCryptError::Cipher("invalid key length"))?;
            cipher
                .encrypt(Nonce::from_slice(&iv), bytes)
                .map_err(|_| TicketCryptError::Cipher("AES-GCM encryption failed"))?
        }
        Algorithm::AesCbc => Aes256CbcEnc::new_from_slices(key.expose(), &iv)
            .map_err(|_| TicketCryptError::Cipher("invalid key or IV length"))?
            .encrypt_padded_vec_mut::<Pkcs7>(bytes),
    };

    Ok(ChunkCiphertext { ciphertext, iv })
}

/// Decrypt a whole ciphertext in one call.
///
/// # Errors
///
/// Returns `TicketCryptError::DecryptionFailed` for any data-dependent failure
/// (wrong key, malformed IV, tag mismatch, bad padding).
/// Returns `TicketCryptError::Cipher` only for API misuse (key bound to another
/// algorithm or not permitted to decrypt).
///
/// AES-CBC is not authenticated: a wrong key is only caught by the padding
/// check, which roughly one wrong key in 256 passes. Those calls return `Ok`
/// with garbage of a different length.
pub fn decrypt(
    ciphertext: &[u8],
    alg: Algorithm,
    key: &DerivedKey,
    iv: &[u8],
) -> Result<Vec<u8>, TicketCryptError> {
    if key.algorithm() != alg {
        return Err(TicketCryptError::Cipher("key is bound to a different algorithm"));
    }
    if !key.usage().permits_decrypt() {
        return Err(TicketCryptError::Cipher("key usage does not permit decryption"));
    }
    if iv.len() != alg.iv_len() {
        return Err(TicketCryptError::DecryptionFailed);
    }

    match alg {
        Algorithm::AesGcm => {
            let cipher = Aes256Gcm::new_from_slice(key.expose())
                .map_err(|_| TicketCryptError::DecryptionFailed)?;
            cipher
                .decrypt(Nonce::from_slice(iv), ciphertext)
                .map_err(|_| TicketCryptError::DecryptionFailed)
        }
        Algorithm::AesCbc => Aes256CbcDec::new_from_slices(key.expose(), iv)
            .map_err(|_| TicketCryptError::DecryptionFailed)?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| TicketCryptError::DecryptionFailed),
    }
}
