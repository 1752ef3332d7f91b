//! Per-user encryption history.
//!
//! The store is scoped by an explicit [`Session`] passed in by the caller;
//! nothing here reads ambient user state.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::file::write_all_atomic;
use crate::pipeline::EncryptedOutput;
use crate::ticket::Ticket;
use crate::types::{Algorithm, TicketCryptError};

/// Identity of the user on whose behalf history is read or written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    username: String,
}

impl Session {
    pub fn new(username: &str) -> Result<Self, TicketCryptError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(TicketCryptError::Invalid("username must not be empty"));
        }
        Ok(Self {
            username: username.to_owned(),
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

/// Everything produced by one completed encryption. Immutable once created.
#[derive(Debug, Clone)]
pub struct EncryptionRecord {
    id: Uuid,
    encrypted_data_base64: String,
    iv_base64: String,
    file_name: String,
    file_type: String,
    ticket: Ticket,
    algorithm: Algorithm,
    file_size: u64,
    created_at: DateTime<Utc>,
}

impl EncryptionRecord {
    pub fn from_output(
        output: &EncryptedOutput,
        file_name: &str,
        file_type: &str,
        ticket: Ticket,
        algorithm: Algorithm,
        file_size: u64,
    ) -> Self {
        Self::new(
            output.encrypted_data_base64(),
            output.iv_base64(),
            file_name,
            file_type,
            ticket,
            algorithm,
            file_size,
        )
    }

    /// Build a record from the base64 ciphertext and IV a job produced.
    pub fn new(
        encrypted_data_base64: String,
        iv_base64: String,
        file_name: &str,
        file_type: &str,
        ticket: Ticket,
        algorithm: Algorithm,
        file_size: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            encrypted_data_base64,
            iv_base64,
            file_name: file_name.to_owned(),
            file_type: file_type.to_owned(),
            ticket,
            algorithm,
            file_size,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
    pub fn encrypted_data_base64(&self) -> &str {
        &self.encrypted_data_base64
    }
    pub fn iv_base64(&self) -> &str {
        &self.iv_base64
    }
    pub fn file_name(&self) -> &str {
        &self.file_name
    }
    pub fn file_type(&self) -> &str {
        &self.file_type
    }
    pub fn ticket(&self) -> &Ticket {
        &self.ticket
    }
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }
    pub fn file_size(&self) -> u64 {
        self.file_size
    }
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// The persisted subset of an [`EncryptionRecord`] (no ciphertext).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: Uuid,
    pub file_name: String,
    pub file_type: String,
    pub ticket: Ticket,
    pub algorithm: Algorithm,
    pub file_size: u64,
    pub created_at: DateTime<Utc>,
}

impl From<&EncryptionRecord> for HistoryEntry {
    fn from(r: &EncryptionRecord) -> Self {
        Self {
            id: r.id,
            file_name: r.file_name.clone(),
            file_type: r.file_type.clone(),
            ticket: r.ticket.clone(),
            algorithm: r.algorithm,
            file_size: r.file_size,
            created_at: r.created_at,
        }
    }
}

/// JSON file mapping usernames to their history, newest last.
#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
    users: BTreeMap<String, Vec<HistoryEntry>>,
}

impl HistoryStore {
    /// Open the store at `path`; a missing file is an empty store.
    pub fn open(path: &Path) -> Result<Self, TicketCryptError> {
        let users = match std::fs::read_to_string(path) {
            Ok(s) => serde_json::from_str(&s)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path: path.to_path_buf(),
            users,
        })
    }

    /// Add a record for the session's user and persist the store.
    pub fn append(
        &mut self,
        session: &Session,
        record: &EncryptionRecord,
    ) -> Result<HistoryEntry, TicketCryptError> {
        let entry = HistoryEntry::from(record);
        self.users
            .entry(session.username().to_owned())
            .or_default()
            .push(entry.clone());
        self.save()?;
        debug!(user = session.username(), id = %entry.id, "history entry appended");
        Ok(entry)
    }

    pub fn list(&self, session: &Session) -> &[HistoryEntry] {
        self.users
            .get(session.username())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Persist with owner-only permissions; the file contains tickets.
    pub fn save(&self) -> Result<(), TicketCryptError> {
        let json = serde_json::to_vec_pretty(&self.users)?;
        write_all_atomic(&self.path, &json, true, true)
    }
}
