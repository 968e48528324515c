//! Safe resume and reuse: compare a cache entry with a fresh HEAD.
//!
//! Used before continuing a `.part` file and, when `cache.revalidate_remote`
//! is set, before serving a complete archive. A validator missing on either
//! side (mirrors often omit ETag) is not treated as a change.

mod validate;

pub use validate::{validate_against_remote, ChangedFields, ValidationError};
