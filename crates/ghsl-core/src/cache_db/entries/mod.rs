//! Entry CRUD, split by direction.

mod read;
mod write;
