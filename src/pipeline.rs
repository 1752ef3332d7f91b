//! Chunked encryption pipeline and its single-shot decryption counterpart.
//!
//! An encryption job walks `Idle -> Started -> EncryptingChunk(i)* -> Completed`,
//! or drops to `Failed` from any state. Chunks are processed strictly in order.
//!
//! Output format: every chunk is an independent cipher call with its own key
//! derivation and its own fresh IV, and only chunk 0's IV is kept. Decryption
//! runs once over the concatenated ciphertext with that IV, so only
//! single-chunk jobs decrypt back to the original plaintext:
//! - AES-GCM: a multi-chunk ciphertext always fails authentication.
//! - AES-CBC: a multi-chunk ciphertext either fails padding validation or
//!   decrypts to a corrupted plaintext (leftover padding plus one garbled
//!   block per chunk boundary).
//!
//! Existing ciphertext depends on this layout, so it is kept as is.

use tracing::{debug, trace, warn};

use crate::cipher::{decrypt, encrypt_chunk};
use crate::config::PipelineConfig;
use crate::encoding::{b64_decode, b64_encode};
use crate::kdf::derive_key;
use crate::types::{Algorithm, KeyUsage, PipelineVariant, TicketCryptError};

/// Number of chunks a buffer of `len` bytes is split into.
///
/// An empty buffer still counts as one (empty) chunk so every job has an IV.
pub fn total_chunks(len: usize, chunk_size: usize) -> usize {
    if len == 0 { 1 } else { len.div_ceil(chunk_size) }
}

/// Lifecycle of one encryption job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JobState {
    Idle,
    Started,
    /// Zero-based index of the chunk most recently encrypted.
    EncryptingChunk(usize),
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressUpdate {
    /// Percentage in `(0, 100]`.
    pub progress: f64,
    /// One-based index of the chunk just finished.
    pub current_chunk: usize,
    pub total_chunks: usize,
}

/// Non-terminal events emitted while a job runs.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    Started { total_size: usize },
    Progress(ProgressUpdate),
}

/// Result of a completed encryption job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedOutput {
    /// All chunk ciphertexts concatenated in order.
    pub ciphertext: Vec<u8>,
    /// IV of the first chunk.
    pub iv: Vec<u8>,
    pub total_chunks: usize,
}

impl EncryptedOutput {
    pub fn encrypted_data_base64(&self) -> String {
        b64_encode(&self.ciphertext)
    }

    pub fn iv_base64(&self) -> String {
        b64_encode(&self.iv)
    }
}

/// Transient state of one encryption job, discarded once it completes or fails.
pub(crate) struct EncryptionJob<'a> {
    file_bytes: &'a [u8],
    algorithm: Algorithm,
    ticket: &'a str,
    chunk_size: usize,
    total_chunks: usize,
    current_chunk: usize,
    first_chunk_iv: Option<Vec<u8>>,
    accumulated: Vec<u8>,
    state: JobState,
}

impl<'a> EncryptionJob<'a> {
    pub(crate) fn new(
        file_bytes: &'a [u8],
        algorithm: Algorithm,
        ticket: &'a str,
        chunk_size: usize,
    ) -> Self {
        let total_chunks = total_chunks(file_bytes.len(), chunk_size);
        Self {
            file_bytes,
            algorithm,
            ticket,
            chunk_size,
            total_chunks,
            current_chunk: 0,
            first_chunk_iv: None,
            // Each chunk grows by at most one block (CBC padding or GCM tag).
            accumulated: Vec::with_capacity(file_bytes.len() + total_chunks * 16),
            state: JobState::Idle,
        }
    }

    fn start(&mut self, on_event: &mut impl FnMut(PipelineEvent)) -> Result<(), TicketCryptError> {
        if self.state != JobState::Idle {
            return Err(TicketCryptError::Invalid("job already started"));
        }
        if self.ticket.is_empty() {
            return Err(TicketCryptError::Invalid("ticket must not be empty"));
        }
        self.state = JobState::Started;
        debug!(
            algorithm = %self.algorithm,
            total_size = self.file_bytes.len(),
            total_chunks = self.total_chunks,
            "encryption job started"
        );
        on_event(PipelineEvent::Started {
            total_size: self.file_bytes.len(),
        });
        Ok(())
    }

    fn encrypt_next(
        &mut self,
        kdf_iterations: u32,
        on_event: &mut impl FnMut(PipelineEvent),
    ) -> Result<(), TicketCryptError> {
        let i = self.current_chunk;
        let start = (i * self.chunk_size).min(self.file_bytes.len());
        let end = ((i + 1) * self.chunk_size).min(self.file_bytes.len());
        self.state = JobState::EncryptingChunk(i);

        // Fresh derivation and fresh IV for every chunk.
        let key = derive_key(
            self.ticket,
            self.algorithm,
            PipelineVariant::Chunked,
            KeyUsage::Encrypt,
            kdf_iterations,
        )?;
        let chunk = encrypt_chunk(&self.file_bytes[start..end], self.algorithm, &key, None)?;

        if self.first_chunk_iv.is_none() {
            self.first_chunk_iv = Some(chunk.iv);
        }
        self.accumulated.extend_from_slice(&chunk.ciphertext);
        self.current_chunk = i + 1;

        let update = ProgressUpdate {
            progress: self.current_chunk as f64 / self.total_chunks as f64 * 100.0,
            current_chunk: self.current_chunk,
            total_chunks: self.total_chunks,
        };
        trace!(
            current_chunk = update.current_chunk,
            total_chunks = update.total_chunks,
            "chunk encrypted"
        );
        on_event(PipelineEvent::Progress(update));
        Ok(())
    }

    /// Run the job to `Completed`, or leave it in `Failed` on the first error.
    fn drive(
        &mut self,
        kdf_iterations: u32,
        on_event: &mut impl FnMut(PipelineEvent),
    ) -> Result<(), TicketCryptError> {
        if let Err(e) = self.advance_all(kdf_iterations, on_event) {
            self.state = JobState::Failed;
            return Err(e);
        }
        self.state = JobState::Completed;
        Ok(())
    }

    fn advance_all(
        &mut self,
        kdf_iterations: u32,
        on_event: &mut impl FnMut(PipelineEvent),
    ) -> Result<(), TicketCryptError> {
        self.start(on_event)?;
        while self.current_chunk < self.total_chunks {
            self.encrypt_next(kdf_iterations, on_event)?;
        }
        Ok(())
    }

    fn into_output(self) -> Result<EncryptedOutput, TicketCryptError> {
        let iv = self
            .first_chunk_iv
            .ok_or(TicketCryptError::Cipher("no chunk was encrypted"))?;
        Ok(EncryptedOutput {
            ciphertext: self.accumulated,
            iv,
            total_chunks: self.total_chunks,
        })
    }
}

/// Encrypts a whole buffer chunk by chunk, reporting progress after each chunk.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChunkedEncryptionPipeline {
    config: PipelineConfig,
}

impl ChunkedEncryptionPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, TicketCryptError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Encrypt `file_bytes` under `algorithm` with a key derived from `ticket`.
    ///
    /// `on_event` receives one `Started` and then one `Progress` per chunk, in
    /// chunk order. Nothing partial is returned on failure.
    pub fn run(
        &self,
        file_bytes: &[u8],
        algorithm: Algorithm,
        ticket: &str,
        mut on_event: impl FnMut(PipelineEvent),
    ) -> Result<EncryptedOutput, TicketCryptError> {
        let mut job = EncryptionJob::new(file_bytes, algorithm, ticket, self.config.chunk_size);

        if let Err(e) = job.drive(self.config.kdf_iterations, &mut on_event) {
            warn!(
                algorithm = %algorithm,
                failed_chunk = job.current_chunk,
                error = %e,
                "encryption job failed"
            );
            return Err(e);
        }

        debug!(
            algorithm = %algorithm,
            total_chunks = job.total_chunks,
            "encryption job completed"
        );
        job.into_output()
    }
}

/// Reverses [`ChunkedEncryptionPipeline`] in a single cipher call.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecryptionPipeline {
    config: PipelineConfig,
}

impl DecryptionPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, TicketCryptError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Decrypt base64 ciphertext with the base64 IV kept from encryption.
    ///
    /// # Errors
    ///
    /// `TicketCryptError::Malformed` if either input is not base64.
    /// `TicketCryptError::DecryptionFailed` for a wrong ticket, a wrong
    /// algorithm or corrupted data, without telling which. Under AES-CBC a
    /// wrong ticket occasionally passes the padding check and yields `Ok`
    /// with a wrong plaintext; see [`crate::decrypt`].
    pub fn run(
        &self,
        ciphertext_b64: &str,
        iv_b64: &str,
        ticket: &str,
        algorithm: Algorithm,
    ) -> Result<Vec<u8>, TicketCryptError> {
        let ciphertext = b64_decode(ciphertext_b64)?;
        let iv = b64_decode(iv_b64)?;
        self.run_raw(&ciphertext, &iv, ticket, algorithm)
    }

    /// Same as [`DecryptionPipeline::run`] on already-decoded bytes.
    pub fn run_raw(
        &self,
        ciphertext: &[u8],
        iv: &[u8],
        ticket: &str,
        algorithm: Algorithm,
    ) -> Result<Vec<u8>, TicketCryptError> {
        let key = derive_key(
            ticket,
            algorithm,
            PipelineVariant::Chunked,
            KeyUsage::Decrypt,
            self.config.kdf_iterations,
        )?;
        let result = decrypt(ciphertext, algorithm, &key, iv);
        match &result {
            Ok(pt) => debug!(algorithm = %algorithm, size = pt.len(), "decryption completed"),
            Err(e) => warn!(algorithm = %algorithm, error = %e, "decryption failed"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: &str = "abcabcabcabcabcabcabcabcabcabcabcabcabcabcabcabcabcabcabcabcabca";

    fn small() -> PipelineConfig {
        PipelineConfig {
            chunk_size: 64,
            kdf_iterations: 1_000,
        }
    }

    #[test]
    fn chunk_counts() {
        assert_eq!(total_chunks(0, 64), 1);
        assert_eq!(total_chunks(1, 64), 1);
        assert_eq!(total_chunks(64, 64), 1);
        assert_eq!(total_chunks(65, 64), 2);
        assert_eq!(total_chunks(192, 64), 3);
    }

    #[test]
    fn job_walks_states_in_order() {
        let data = [1u8; 130];
        let mut job = EncryptionJob::new(&data, Algorithm::AesGcm, T, 64);
        assert_eq!(job.state, JobState::Idle);

        let mut events = Vec::new();
        let mut sink = |e: PipelineEvent| events.push(e);
        job.start(&mut sink).unwrap();
        assert_eq!(job.state, JobState::Started);

        job.encrypt_next(1_000, &mut sink).unwrap();
        assert_eq!(job.state, JobState::EncryptingChunk(0));
        job.encrypt_next(1_000, &mut sink).unwrap();
        job.encrypt_next(1_000, &mut sink).unwrap();
        assert_eq!(job.state, JobState::EncryptingChunk(2));

        // 64 + 64 + 2 plaintext bytes, one tag each
        assert_eq!(job.accumulated.len(), 130 + 3 * 16);
        let out = job.into_output().unwrap();
        assert_eq!(out.iv.len(), 12);
        assert_eq!(events.len(), 4);
    }

    #[test]
    fn drive_completes_and_failures_land_in_failed() {
        let mut sink = |_e: PipelineEvent| {};

        let mut ok = EncryptionJob::new(&[0u8; 100], Algorithm::AesCbc, T, 64);
        ok.drive(1_000, &mut sink).unwrap();
        assert_eq!(ok.state, JobState::Completed);

        let mut no_ticket = EncryptionJob::new(b"x", Algorithm::AesGcm, "", 64);
        assert!(no_ticket.drive(1_000, &mut sink).is_err());
        assert_eq!(no_ticket.state, JobState::Failed);

        // Key derivation fails on the first chunk.
        let mut bad_kdf = EncryptionJob::new(&[0u8; 100], Algorithm::AesGcm, T, 64);
        let err = bad_kdf.drive(0, &mut sink).unwrap_err();
        assert!(matches!(err, TicketCryptError::KeyDerivation(_)));
        assert_eq!(bad_kdf.state, JobState::Failed);
        assert_eq!(bad_kdf.current_chunk, 0);
        assert!(bad_kdf.into_output().is_err());
    }

    #[test]
    fn job_cannot_start_twice() {
        let mut job = EncryptionJob::new(b"x", Algorithm::AesCbc, T, 64);
        let mut sink = |_e: PipelineEvent| {};
        job.start(&mut sink).unwrap();
        assert!(job.start(&mut sink).is_err());
    }

    #[test]
    fn empty_ticket_fails_without_events() {
        let pipeline = ChunkedEncryptionPipeline::new(small()).unwrap();
        let mut events = Vec::new();
        let err = pipeline
            .run(b"data", Algorithm::AesGcm, "", |e| events.push(e))
            .unwrap_err();
        assert!(matches!(err, TicketCryptError::Invalid(_)));
        assert!(events.is_empty());
    }

    #[test]
    fn single_chunk_round_trip() {
        let enc = ChunkedEncryptionPipeline::new(small()).unwrap();
        let dec = DecryptionPipeline::new(small()).unwrap();
        for alg in Algorithm::ALL {
            let out = enc.run(b"hello chunk", alg, T, |_| {}).unwrap();
            let pt = dec
                .run(&out.encrypted_data_base64(), &out.iv_base64(), T, alg)
                .unwrap();
            assert_eq!(pt, b"hello chunk", "alg={alg}");
        }
    }
}
