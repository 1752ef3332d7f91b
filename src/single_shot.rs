//! Whole-buffer encryption without a worker or chunking.
//!
//! Keys on this path come from the unqualified salt and may be used in both
//! directions. Ciphertext is not interchangeable with the chunked pipeline:
//! the salts differ, so the keys differ.

use tracing::debug;

use crate::cipher::{decrypt, encrypt_chunk};
use crate::kdf::derive_key;
use crate::pipeline::EncryptedOutput;
use crate::types::{Algorithm, KeyUsage, PipelineVariant, TicketCryptError};

/// Encrypt `data` in one cipher call with a fresh IV.
pub fn encrypt_bytes(
    data: &[u8],
    algorithm: Algorithm,
    ticket: &str,
    kdf_iterations: u32,
) -> Result<EncryptedOutput, TicketCryptError> {
    if ticket.is_empty() {
        return Err(TicketCryptError::Invalid("ticket must not be empty"));
    }
    let key = derive_key(
        ticket,
        algorithm,
        PipelineVariant::SingleShot,
        KeyUsage::EncryptDecrypt,
        kdf_iterations,
    )?;
    let out = encrypt_chunk(data, algorithm, &key, None)?;
    debug!(algorithm = %algorithm, size = data.len(), "single-shot encryption completed");
    Ok(EncryptedOutput {
        ciphertext: out.ciphertext,
        iv: out.iv,
        total_chunks: 1,
    })
}

/// Decrypt the output of [`encrypt_bytes`].
///
/// # Errors
///
/// Returns `TicketCryptError::DecryptionFailed` for any mismatch.
pub fn decrypt_bytes(
    ciphertext: &[u8],
    iv: &[u8],
    algorithm: Algorithm,
    ticket: &str,
    kdf_iterations: u32,
) -> Result<Vec<u8>, TicketCryptError> {
    let key = derive_key(
        ticket,
        algorithm,
        PipelineVariant::SingleShot,
        KeyUsage::EncryptDecrypt,
        kdf_iterations,
    )?;
    decrypt(ciphertext, algorithm, &key, iv)
}
