//! Integration tests for the processor module
//!
//! Exercise the complete pipeline on in-memory record sequences and on
//! small synthetic STDF files written to temporary directories.

pub mod session_processing;
