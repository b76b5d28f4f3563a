//! Repository implementations for database operations

pub mod wallet;

pub use wallet::*;
