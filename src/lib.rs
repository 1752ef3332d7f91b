#![forbid(unsafe_code)]
//! # ticket_crypt — ticket-keyed file encryption.
//!
//! `ticket_crypt` encrypts a file under a key derived from a random per-file
//! *ticket*. The ticket (64 hex characters) plus the chosen algorithm are all
//! that is needed to decrypt later; there is no header in the ciphertext.
//!
//! ## Features
//! - **Tickets**: 256 bits from the OS random source, hex encoded
//! - **Key derivation**: PBKDF2-HMAC-SHA256, 100 000 iterations, fixed salt per
//!   algorithm and code path
//! - **Algorithms**: AES-256-GCM and AES-256-CBC (PKCS#7)
//! - **Chunked pipeline** with start/progress events, run on a background worker
//! - **Single-shot** whole-buffer path
//! - **Sidecar files** (`.encrypted` JSON) and a per-user **history** store
//!
//! ## Example: encrypt and decrypt a buffer
//! ```no_run
//! use ticket_crypt::{Algorithm, ChunkedEncryptionPipeline, DecryptionPipeline, Ticket};
//!
//! let ticket = Ticket::generate().unwrap();
//! let out = ChunkedEncryptionPipeline::default()
//!     .run(b"Hello, world!", Algorithm::AesGcm, ticket.as_str(), |_event| {})
//!     .unwrap();
//!
//! let plaintext = DecryptionPipeline::default()
//!     .run(&out.encrypted_data_base64(), &out.iv_base64(), ticket.as_str(), Algorithm::AesGcm)
//!     .unwrap();
//! assert_eq!(plaintext, b"Hello, world!");
//! ```
//!
//! Only inputs that fit in one chunk (10 MiB by default) decrypt back to the
//! original; see the [`pipeline`] module for the multi-chunk layout.
//!
//! Safety notes
//! - The crate is not audited or reviewed! AES-CBC output is not authenticated.

mod cipher;
mod config;
mod encoding;
mod file;
mod history;
mod kdf;
pub mod pipeline;
mod sidecar;
mod single_shot;
mod ticket;
mod types;
mod worker;

// Re-export public API from modules
pub use cipher::{ChunkCiphertext, GCM_TAG_LEN, decrypt, encrypt_chunk, generate_iv};
pub use config::{Config, HistoryConfig, LogConfig, PipelineConfig};
pub use encoding::{b64_decode, b64_encode};
pub use file::{SIDECAR_EXT, default_decrypt_output_path, default_sidecar_path, write_all_atomic};
pub use history::{EncryptionRecord, HistoryEntry, HistoryStore, Session};
pub use kdf::{DerivedKey, derive_key, salt_for};
pub use pipeline::{
    ChunkedEncryptionPipeline, DecryptionPipeline, EncryptedOutput, PipelineEvent,
    ProgressUpdate, total_chunks,
};
pub use sidecar::EncryptedSidecar;
pub use single_shot::{decrypt_bytes, encrypt_bytes};
pub use ticket::{TICKET_BYTES, TICKET_HEX_LEN, Ticket};
pub use types::*;
pub use worker::{JobOutput, Request, Response, Worker};
