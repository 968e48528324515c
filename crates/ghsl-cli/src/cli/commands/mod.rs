//! CLI command handlers, one file per command.

mod cache;
mod checksum;
mod download;
mod info;
mod tiles;
mod url;

pub use cache::run_cache;
pub use checksum::run_checksum;
pub use download::run_download;
pub use info::run_info;
pub use tiles::run_tiles;
pub use url::run_url;

#[cfg(test)]
pub(crate) use download::build_request;
#[cfg(test)]
pub(crate) use url::layer_url;
