//! Per-file tickets: 32 random bytes rendered as 64 lowercase hex characters.

use std::fmt;

use getrandom::fill as getrandom;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::types::TicketCryptError;

/// Raw entropy per ticket.
pub const TICKET_BYTES: usize = 32;

/// Length of the hex rendering.
pub const TICKET_HEX_LEN: usize = TICKET_BYTES * 2;

/// The sole key material for one encrypted file.
///
/// `Debug` is redacted; use [`Ticket::as_str`] when the ticket has to be shown.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ticket(String);

impl Ticket {
    /// Draw a fresh ticket from the OS random source.
    ///
    /// # Errors
    ///
    /// Returns `TicketCryptError::RandomnessUnavailable` if the source fails.
    pub fn generate() -> Result<Self, TicketCryptError> {
        let mut raw = [0u8; TICKET_BYTES];
        getrandom(&mut raw).map_err(|_| TicketCryptError::RandomnessUnavailable)?;
        let ticket = Ticket(hex::encode(raw));
        raw.zeroize();
        Ok(ticket)
    }

    /// Accept a user-supplied ticket: exactly 64 hex characters.
    ///
    /// Surrounding whitespace is trimmed; case is preserved because the
    /// derivation is over the exact text.
    pub fn parse(s: &str) -> Result<Self, TicketCryptError> {
        let s = s.trim();
        if s.len() != TICKET_HEX_LEN || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(TicketCryptError::Invalid(
                "ticket must be 64 hexadecimal characters",
            ));
        }
        Ok(Ticket(s.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Ticket {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Ticket(<redacted>)")
    }
}

impl Drop for Ticket {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}
