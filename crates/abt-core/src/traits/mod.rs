//! Core trait definitions

mod process_table;

pub use process_table::{ProcessSnapshot, ProcessTable};
