use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("could not read page data: {0}")]
    Extraction(String),

    #[error("post data is missing field: {0}")]
    MissingField(String),

    #[error("unsupported post type: {0}")]
    UnsupportedPostType(String),

    #[error("not a link to an Instagram post: {input}")]
    InvalidPostUrl { input: String, looks_like_profile: bool },

    #[error("not a profile or hashtag: {0}")]
    InvalidFeedTarget(String),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("page is not available (status={status}): {url}")]
    PageUnavailable { url: String, status: u16 },

    #[error("post is removed, private or never existed: {0}")]
    PostUnavailable(String),

    #[error("output directory does not exist: {0}")]
    OutputDirMissing(PathBuf),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("feed browser failed: {0}")]
    Browser(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl ScraperError {
    /// Single terminating message shown to the end user for each failure class.
    pub fn user_message(&self) -> String {
        match self {
            Self::Extraction(_) => "Could not read the page.".to_string(),
            Self::MissingField(field) => format!("Post is missing required data: {field}"),
            Self::UnsupportedPostType(kind) => format!("Unsupported post type: {kind}"),
            Self::InvalidPostUrl {
                looks_like_profile: true,
                ..
            } => "Need to use the -p or --posts flag.".to_string(),
            Self::InvalidPostUrl { .. } => "Not a link to an Instagram post or user".to_string(),
            Self::InvalidFeedTarget(_) => "Not a link to an Instagram profile or hashtag".to_string(),
            Self::InvalidUrl(_) => "Invalid URL".to_string(),
            Self::Connection(_) => "Connection error".to_string(),
            Self::Timeout(_) => "Timeout".to_string(),
            Self::PageUnavailable { .. } | Self::PostUnavailable(_) => {
                "Sorry, this page isn't available.".to_string()
            }
            Self::OutputDirMissing(_) => "Path doesn't exist.".to_string(),
            Self::Config(msg) => format!("Invalid configuration: {msg}"),
            Self::Browser(msg) => format!("Browser error: {msg}"),
            Self::Json(_) => "Could not read the page.".to_string(),
            Self::Io(e) => format!("File error: {e}"),
            Self::Csv(e) => format!("Could not write metadata: {e}"),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScraperError>;
