//! Background worker running pipeline jobs off the caller's thread.
//!
//! The caller and the worker share no memory: requests go in and responses
//! come out over channels. Per job the worker emits `START`, zero or more
//! `PROGRESS`, then exactly one `COMPLETE` or `ERROR`. A worker runs one job at
//! a time; concurrent files need one worker each.

use std::fmt;
use std::thread;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::config::PipelineConfig;
use crate::encoding::b64_decode;
use crate::pipeline::{ChunkedEncryptionPipeline, DecryptionPipeline, PipelineEvent};
use crate::types::{Algorithm, TicketCryptError};

/// Caller -> worker.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Request {
    #[serde(rename_all = "camelCase")]
    Encrypt {
        file_data: Vec<u8>,
        algorithm: Algorithm,
        ticket: String,
    },
    #[serde(rename_all = "camelCase")]
    Decrypt {
        /// Base64 ciphertext.
        encrypted_data: String,
        /// Base64 IV.
        iv: String,
        ticket: String,
        algorithm: Algorithm,
    },
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Request::Encrypt {
                file_data,
                algorithm,
                ..
            } => f
                .debug_struct("Encrypt")
                .field("file_data_len", &file_data.len())
                .field("algorithm", algorithm)
                .finish_non_exhaustive(),
            Request::Decrypt {
                encrypted_data,
                algorithm,
                ..
            } => f
                .debug_struct("Decrypt")
                .field("encrypted_data_len", &encrypted_data.len())
                .field("algorithm", algorithm)
                .finish_non_exhaustive(),
        }
    }
}

/// Payload of a `COMPLETE` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobOutput {
    #[serde(rename_all = "camelCase")]
    Encrypted {
        /// Base64 ciphertext.
        encrypted_data: String,
        /// Base64 IV of the first chunk.
        iv: String,
    },
    #[serde(rename_all = "camelCase")]
    Decrypted { decrypted_data: Vec<u8> },
}

/// Worker -> caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Response {
    #[serde(rename_all = "camelCase")]
    Start { total_size: usize },
    #[serde(rename_all = "camelCase")]
    Progress {
        progress: f64,
        current_chunk: usize,
        total_chunks: usize,
    },
    Complete {
        #[serde(flatten)]
        output: JobOutput,
    },
    Error { message: String },
}

impl Response {
    /// `COMPLETE` and `ERROR` end a job.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Response::Complete { .. } | Response::Error { .. })
    }
}

impl From<PipelineEvent> for Response {
    fn from(event: PipelineEvent) -> Self {
        match event {
            PipelineEvent::Started { total_size } => Response::Start { total_size },
            PipelineEvent::Progress(p) => Response::Progress {
                progress: p.progress,
                current_chunk: p.current_chunk,
                total_chunks: p.total_chunks,
            },
        }
    }
}

/// Send a response, logging when the caller has gone away.
///
/// This happens after [`Worker::terminate`]; the job's results are dropped.
fn send_message(sender: &mpsc::UnboundedSender<Response>, msg: Response) {
    if sender.send(msg).is_err() {
        debug!("response dropped: caller no longer listening");
    }
}

struct JobRunner {
    encryptor: ChunkedEncryptionPipeline,
    decryptor: DecryptionPipeline,
}

impl JobRunner {
    fn handle(&self, request: Request, tx: &mpsc::UnboundedSender<Response>) {
        match request {
            Request::Encrypt {
                file_data,
                algorithm,
                ticket,
            } => {
                let ticket = Zeroizing::new(ticket);
                info!(algorithm = %algorithm, size = file_data.len(), "encrypt job received");
                let result = self.encryptor.run(&file_data, algorithm, &ticket, |event| {
                    send_message(tx, Response::from(event))
                });
                match result {
                    Ok(out) => send_message(
                        tx,
                        Response::Complete {
                            output: JobOutput::Encrypted {
                                encrypted_data: out.encrypted_data_base64(),
                                iv: out.iv_base64(),
                            },
                        },
                    ),
                    Err(e) => send_message(
                        tx,
                        Response::Error {
                            message: e.to_string(),
                        },
                    ),
                }
            }
            Request::Decrypt {
                encrypted_data,
                iv,
                ticket,
                algorithm,
            } => {
                let ticket = Zeroizing::new(ticket);
                info!(algorithm = %algorithm, "decrypt job received");
                match self.decrypt(&encrypted_data, &iv, &ticket, algorithm, tx) {
                    Ok(decrypted_data) => send_message(
                        tx,
                        Response::Complete {
                            output: JobOutput::Decrypted { decrypted_data },
                        },
                    ),
                    Err(e) => send_message(
                        tx,
                        Response::Error {
                            message: e.to_string(),
                        },
                    ),
                }
            }
        }
    }

    fn decrypt(
        &self,
        encrypted_data: &str,
        iv: &str,
        ticket: &str,
        algorithm: Algorithm,
        tx: &mpsc::UnboundedSender<Response>,
    ) -> Result<Vec<u8>, TicketCryptError> {
        let ciphertext = b64_decode(encrypted_data)?;
        let iv = b64_decode(iv)?;
        send_message(
            tx,
            Response::Start {
                total_size: ciphertext.len(),
            },
        );
        self.decryptor.run_raw(&ciphertext, &iv, ticket, algorithm)
    }
}

/// Handle to one background worker thread.
pub struct Worker {
    requests: mpsc::UnboundedSender<Request>,
    responses: mpsc::UnboundedReceiver<Response>,
    pending: usize,
}

impl Worker {
    /// Start a worker on its own OS thread.
    pub fn spawn(config: PipelineConfig) -> Result<Self, TicketCryptError> {
        let runner = JobRunner {
            encryptor: ChunkedEncryptionPipeline::new(config)?,
            decryptor: DecryptionPipeline::new(config)?,
        };
        let (req_tx, mut req_rx) = mpsc::unbounded_channel::<Request>();
        let (resp_tx, resp_rx) = mpsc::unbounded_channel::<Response>();

        thread::Builder::new()
            .name("ticket-crypt-worker".to_string())
            .spawn(move || {
                while let Some(request) = req_rx.blocking_recv() {
                    runner.handle(request, &resp_tx);
                }
                debug!("worker stopped");
            })?;

        Ok(Self {
            requests: req_tx,
            responses: resp_rx,
            pending: 0,
        })
    }

    /// Queue a request. Jobs run in the order they were posted.
    pub fn post(&mut self, request: Request) -> Result<(), TicketCryptError> {
        self.requests
            .send(request)
            .map_err(|_| TicketCryptError::WorkerGone)?;
        self.pending += 1;
        Ok(())
    }

    /// Jobs posted whose terminal response has not been received yet.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Next response, or `None` once the worker has stopped.
    pub async fn recv(&mut self) -> Option<Response> {
        let response = self.responses.recv().await;
        self.track(response.as_ref());
        response
    }

    /// Blocking variant of [`Worker::recv`] for non-async callers.
    ///
    /// Panics if called from within an async runtime.
    pub fn blocking_recv(&mut self) -> Option<Response> {
        let response = self.responses.blocking_recv();
        self.track(response.as_ref());
        response
    }

    fn track(&mut self, response: Option<&Response>) {
        if response.is_some_and(Response::is_terminal) {
            self.pending = self.pending.saturating_sub(1);
        }
    }

    /// Post `request` and wait for its terminal response.
    ///
    /// `on_update` sees every `START` and `PROGRESS` message in order.
    /// Responses carry no job id, so the worker must be idle: with jobs from
    /// [`Worker::post`] still outstanding this returns
    /// `TicketCryptError::Invalid` without posting.
    pub async fn run_job(
        &mut self,
        request: Request,
        mut on_update: impl FnMut(&Response),
    ) -> Result<JobOutput, TicketCryptError> {
        if self.pending > 0 {
            return Err(TicketCryptError::Invalid(
                "worker has unfinished jobs; drain them before run_job",
            ));
        }
        self.post(request)?;
        while let Some(response) = self.recv().await {
            match response {
                Response::Start { .. } | Response::Progress { .. } => on_update(&response),
                Response::Complete { output } => return Ok(output),
                Response::Error { message } => return Err(TicketCryptError::Job(message)),
            }
        }
        Err(TicketCryptError::WorkerGone)
    }

    /// Stop the worker. A job still running finishes in the background and
    /// its results are discarded.
    pub fn terminate(self) {
        drop(self);
    }
}
