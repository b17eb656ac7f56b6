//! Data held by the sample backing systems.

pub mod entry;

pub use entry::{Entry, EntryWrite};
