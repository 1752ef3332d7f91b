//! Ticket-based key derivation.
//!
//! A ticket is stretched with PBKDF2-HMAC-SHA256 under a fixed salt chosen by
//! `(algorithm, pipeline variant)`. The same ticket therefore yields different
//! keys for AES-GCM and AES-CBC; both the ticket and the algorithm are needed
//! to reproduce a key.
//!
//! Keys are never serialized or logged and are zeroized on drop.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::types::{Algorithm, KEY_LEN, KeyUsage, PipelineVariant, TicketCryptError};

/// Resolve the static salt for a given algorithm and code path.
///
/// This is the one place salts are decided.
pub fn salt_for(algorithm: Algorithm, variant: PipelineVariant) -> &'static [u8] {
    match (variant, algorithm) {
        (PipelineVariant::Chunked, Algorithm::AesGcm) => &b"file-encryption-gcm-salt"[..],
        (PipelineVariant::Chunked, Algorithm::AesCbc) => &b"file-encryption-cbc-salt"[..],
        (PipelineVariant::SingleShot, _) => &b"file-encryption-salt"[..],
    }
}

/// A 256-bit key bound to one algorithm and a set of permitted operations.
pub struct DerivedKey {
    bytes: Zeroizing<[u8; KEY_LEN]>,
    algorithm: Algorithm,
    usage: KeyUsage,
}

impl DerivedKey {
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn usage(&self) -> KeyUsage {
        self.usage
    }

    pub(crate) fn expose(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("algorithm", &self.algorithm)
            .field("usage", &self.usage)
            .finish_non_exhaustive()
    }
}

/// Derive the key for `ticket` under `algorithm` on the given code path.
///
/// Deterministic: the same `(ticket, algorithm, variant, iterations)` always
/// yields the same key bytes.
///
/// # Errors
///
/// Returns `TicketCryptError::KeyDerivation` if `iterations` is zero.
pub fn derive_key(
    ticket: &str,
    algorithm: Algorithm,
    variant: PipelineVariant,
    usage: KeyUsage,
    iterations: u32,
) -> Result<DerivedKey, TicketCryptError> {
    if iterations == 0 {
        return Err(TicketCryptError::KeyDerivation(
            "iteration count must be non-zero",
        ));
    }

    let salt = salt_for(algorithm, variant);
    let mut out = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2_hmac::<Sha256>(ticket.as_bytes(), salt, iterations, &mut out[..]);

    Ok(DerivedKey {
        bytes: out,
        algorithm,
        usage,
    })
}
