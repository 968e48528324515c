pub mod config;
pub mod logging;

pub mod cache_db;
pub mod checksum;
pub mod downloader;
pub mod error;
pub mod fetch;
pub mod fetch_head;
pub mod pipeline;
pub mod plan;
pub mod product;
pub mod raster;
pub mod request;
pub mod retry;
pub mod safe_resume;
pub mod stage;
pub mod storage;
pub mod tiles;
