//! Foundational low-level utilities shared across tfia crates.
//!
//! Provides the atomic file-write helper used for uploaded test tables and
//! the timestamp helpers used to derive unique upload names.

pub mod atomic_io;
pub mod time_utils;

pub use atomic_io::write_bytes_atomic;
pub use time_utils::current_unix_timestamp_ms;
