//! Persistent archive cache (SQLite via sqlx).
//!
//! One row per downloaded tile archive: where it lives, the remote
//! validators seen when it was fetched, and the SHA-256 recorded when the
//! download completed. Rows in `downloading` state point at a `.part` file
//! that a later run may resume.

pub mod db;
mod entries;
pub mod types;


pub use db::*;
pub use types::*;
