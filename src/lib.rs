//! `mboxnav`: index, browse, search and split mbox archives of any size.
//!
//! A single forward pass over the file builds an in-memory [`index::MailboxIndex`]
//! of message byte ranges, a handful of headers and a normalized date per
//! message. Queries (pagination, search, sort, statistics) then run against
//! that index; only export and `show` go back to the file.

pub mod config;
pub mod error;
pub mod export;
pub mod index;
pub mod model;
pub mod parser;
pub mod search;
pub mod session;
pub mod shell;
pub mod store;
