//! The in-memory mailbox index: one pass to build, then read-only queries.

pub mod builder;
pub mod mailbox;
pub mod reader;

pub use builder::{build_index, sample_dates, IndexOptions};
pub use mailbox::{DateDiagnostic, MailboxIndex};
pub use reader::MailboxStats;
