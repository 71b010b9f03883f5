//! Core data model: per-message records, header values, dates and addresses.

pub mod address;
pub mod mail;
