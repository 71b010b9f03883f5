//! Mailbox parsing: boundary scanning, header extraction and date normalization.

pub mod date;
pub mod header;
pub mod mbox;
