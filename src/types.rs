//! Core types, constants and the library error type.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Plaintext bytes handed to one cipher call by the chunked pipeline (10 MiB).
pub const CHUNK_SIZE: usize = 10 * 1024 * 1024;

/// PBKDF2-HMAC-SHA256 iteration count.
pub const KDF_ITERATIONS: u32 = 100_000;

/// Derived key length in bytes (AES-256).
pub const KEY_LEN: usize = 32;

/// AES-GCM IV length (96 bits).
pub const GCM_IV_LEN: usize = 12;

/// AES-CBC IV length (one AES block).
pub const CBC_IV_LEN: usize = 16;

/// Symmetric algorithm chosen once per job.
///
/// The ciphertext is not self-describing, so the algorithm has to be
/// remembered next to the ticket to decrypt later.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum Algorithm {
    /// AES-256-GCM, authenticated, 12-byte IV, tag appended to the ciphertext.
    #[default]
    #[serde(rename = "AES-GCM")]
    AesGcm,
    /// AES-256-CBC with PKCS#7 padding, not authenticated, 16-byte IV.
    #[serde(rename = "AES-CBC")]
    AesCbc,
}

impl Algorithm {
    pub const ALL: [Algorithm; 2] = [Algorithm::AesGcm, Algorithm::AesCbc];

    /// IV length in bytes required by this algorithm.
    pub fn iv_len(self) -> usize {
        match self {
            Algorithm::AesGcm => GCM_IV_LEN,
            Algorithm::AesCbc => CBC_IV_LEN,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Algorithm::AesGcm => "AES-GCM",
            Algorithm::AesCbc => "AES-CBC",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = TicketCryptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AES-GCM" | "GCM" => Ok(Algorithm::AesGcm),
            "AES-CBC" | "CBC" => Ok(Algorithm::AesCbc),
            _ => Err(TicketCryptError::Invalid("unknown algorithm")),
        }
    }
}

/// Which code path a key is derived for. Salt selection depends on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineVariant {
    /// Worker-based chunked pipeline (algorithm-qualified salts).
    Chunked,
    /// Whole-buffer path without a worker (one unqualified salt).
    SingleShot,
}

/// Operations a derived key may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyUsage {
    Encrypt,
    Decrypt,
    EncryptDecrypt,
}

impl KeyUsage {
    pub fn permits_encrypt(self) -> bool {
        matches!(self, KeyUsage::Encrypt | KeyUsage::EncryptDecrypt)
    }

    pub fn permits_decrypt(self) -> bool {
        matches!(self, KeyUsage::Decrypt | KeyUsage::EncryptDecrypt)
    }
}

/// Library error type (no panics for expected failures).
///
/// Decryption never says *why* it failed: a wrong ticket, a wrong algorithm
/// and corrupted ciphertext all surface as [`TicketCryptError::DecryptionFailed`].
#[derive(Error, Debug)]
pub enum TicketCryptError {
    #[error("secure random source unavailable")]
    RandomnessUnavailable,
    #[error("key derivation failed: {0}")]
    KeyDerivation(&'static str),
    #[error("cipher operation failed: {0}")]
    Cipher(&'static str),
    #[error("decryption failed")]
    DecryptionFailed,
    #[error("I/O error")]
    Io(#[from] std::io::Error),
    #[error("serialization error")]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration")]
    Config(#[from] toml::de::Error),
    #[error("malformed input: {0}")]
    Malformed(&'static str),
    #[error("invalid argument: {0}")]
    Invalid(&'static str),
    #[error("worker is no longer running")]
    WorkerGone,
    /// A worker job reported `ERROR` with this message.
    #[error("{0}")]
    Job(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn algorithm_names_match_wire_format() {
        assert_eq!(
            serde_json::to_string(&Algorithm::AesGcm).unwrap(),
            "\"AES-GCM\""
        );
        assert_eq!(
            serde_json::from_str::<Algorithm>("\"AES-CBC\"").unwrap(),
            Algorithm::AesCbc
        );
        assert_eq!("aes-cbc".parse::<Algorithm>().unwrap(), Algorithm::AesCbc);
        assert!("AES-CTR".parse::<Algorithm>().is_err());
    }

    #[test]
    fn iv_lengths() {
        assert_eq!(Algorithm::AesGcm.iv_len(), 12);
        assert_eq!(Algorithm::AesCbc.iv_len(), 16);
    }
}
