//! Random-access reads of individual messages from the source file.

pub mod reader;

pub use reader::MboxStore;
