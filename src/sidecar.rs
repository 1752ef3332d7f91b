//! `.encrypted` sidecar files: JSON `{data, iv, fileName, fileType}`.
//!
//! The sidecar does not name the algorithm or carry the ticket; both come
//! from the history record or from the user.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::file::write_all_atomic;
use crate::history::EncryptionRecord;
use crate::pipeline::EncryptedOutput;
use crate::types::TicketCryptError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedSidecar {
    /// Base64 ciphertext.
    pub data: String,
    /// Base64 IV.
    pub iv: String,
    pub file_name: String,
    pub file_type: String,
}

impl EncryptedSidecar {
    pub fn from_record(record: &EncryptionRecord) -> Self {
        Self {
            data: record.encrypted_data_base64().to_owned(),
            iv: record.iv_base64().to_owned(),
            file_name: record.file_name().to_owned(),
            file_type: record.file_type().to_owned(),
        }
    }

    pub fn from_output(output: &EncryptedOutput, file_name: &str, file_type: &str) -> Self {
        Self {
            data: output.encrypted_data_base64(),
            iv: output.iv_base64(),
            file_name: file_name.to_owned(),
            file_type: file_type.to_owned(),
        }
    }

    pub fn to_json(&self) -> Result<String, TicketCryptError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(s: &str) -> Result<Self, TicketCryptError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Write the sidecar atomically. Refuses to overwrite unless `force`.
    pub fn write_atomic(&self, path: &Path, force: bool) -> Result<(), TicketCryptError> {
        write_all_atomic(path, self.to_json()?.as_bytes(), false, force)
    }

    pub fn read(path: &Path) -> Result<Self, TicketCryptError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }
}
