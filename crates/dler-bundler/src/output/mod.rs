//! Emitted-file handling.

pub mod writer;

pub use writer::{OutputFile, write_output_files};
