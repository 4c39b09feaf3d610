pub mod client;
pub mod config;
pub mod download;
mod error;
pub mod extract;
pub mod feed;
pub mod filename;
pub mod logging;
pub mod materialize;
pub mod metadata;
pub mod paths;
pub mod post;
pub mod sanitize;
pub mod signature;
pub mod weburl;

pub use error::{Result, ScraperError};
