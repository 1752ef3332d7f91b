//! Base64 text encoding for ciphertext and IVs (JSON-safe ASCII).

use base64::{Engine, engine::general_purpose};

use crate::types::TicketCryptError;

pub fn b64_encode(binary: &[u8]) -> String {
    general_purpose::STANDARD.encode(binary)
}

pub fn b64_decode(text: &str) -> Result<Vec<u8>, TicketCryptError> {
    general_purpose::STANDARD
        .decode(text.trim())
        .map_err(|_| TicketCryptError::Malformed("invalid base64"))
}
