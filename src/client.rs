use crate::config::ScraperConfig;
use crate::logging::redact_url_for_log;
use crate::paths::AppPaths;
use crate::{Result, ScraperError};
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use url::Url;

const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.5";

const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 6.1; WOW64; rv:54.0) Gecko/20100101 Firefox/69.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.13; rv:61.0) Gecko/20100101 Firefox/69.0",
    "Mozilla/5.0 (X11; Linux i586; rv:31.0) Gecko/20100101 Firefox/69.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/77.0.3865.75 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_13_6) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/77.0.3865.75 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/77.0.3865.75 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_13_6) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/12.1.2 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Trident/7.0; rv:11.0) like Gecko",
];

/// A downloaded media buffer and the response headers that matter downstream.
#[derive(Debug, Clone)]
pub struct MediaAsset {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub last_modified: Option<DateTime<Utc>>,
}

pub trait Fetch {
    fn fetch_html(&self, url: &str) -> Result<String>;
    fn fetch_media(&self, url: &str) -> Result<MediaAsset>;
}

pub struct HttpClient {
    agent: ureq::Agent,
    user_agent: String,
}

impl HttpClient {
    pub fn new(paths: &AppPaths, config: &ScraperConfig) -> Self {
        let user_agent = random_user_agent(&config.user_agent_path(paths));
        Self::with_user_agent(user_agent, config.timeout_secs)
    }

    pub fn with_user_agent(user_agent: String, timeout_secs: u64) -> Self {
        let mut builder = ureq::Agent::config_builder();
        builder = builder
            .http_status_as_error(false)
            .timeout_global(Some(Duration::from_secs(timeout_secs.max(1))))
            .user_agent(user_agent.as_str());
        let agent: ureq::Agent = builder.build().into();
        Self { agent, user_agent }
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// True when the page answers 200; removed, private or never-existing
    /// posts answer with something else.
    pub fn check_post_exists(&self, url: &str) -> Result<bool> {
        let response = self.get(url)?;
        Ok(response.status().as_u16() == 200)
    }

    fn get(&self, url: &str) -> Result<ureq::http::Response<ureq::Body>> {
        validate_http_url(url)?;
        self.agent
            .get(url)
            .header("Accept", ACCEPT)
            .header("Accept-Language", ACCEPT_LANGUAGE)
            .call()
            .map_err(|err| classify_transport_error(url, err))
    }

    fn get_ok(&self, url: &str) -> Result<ureq::http::Response<ureq::Body>> {
        let response = self.get(url)?;
        let status = response.status().as_u16();
        if status != 200 {
            return Err(ScraperError::PageUnavailable {
                url: redact_url_for_log(url),
                status,
            });
        }
        Ok(response)
    }
}

impl Fetch for HttpClient {
    fn fetch_html(&self, url: &str) -> Result<String> {
        let mut response = self.get_ok(url)?;
        let mut buf = Vec::new();
        response
            .body_mut()
            .as_reader()
            .read_to_end(&mut buf)
            .map_err(|e| read_error(url, e))?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    fn fetch_media(&self, url: &str) -> Result<MediaAsset> {
        let mut response = self.get_ok(url)?;
        let content_type = header_string(&response, "content-type");
        let last_modified = parse_http_date(&header_string(&response, "last-modified"));
        let mut bytes = Vec::new();
        response
            .body_mut()
            .as_reader()
            .read_to_end(&mut bytes)
            .map_err(|e| read_error(url, e))?;
        Ok(MediaAsset {
            bytes,
            content_type,
            last_modified,
        })
    }
}

/// Picks one line of `path` at random, or a built-in agent when the file is
/// missing or empty.
pub fn random_user_agent(path: &Path) -> String {
    let mut rng = rand::thread_rng();
    if let Ok(raw) = std::fs::read_to_string(path) {
        let lines: Vec<&str> = raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        if let Some(choice) = lines.choose(&mut rng) {
            return choice.to_string();
        }
    }
    DEFAULT_USER_AGENTS
        .choose(&mut rng)
        .copied()
        .unwrap_or(DEFAULT_USER_AGENTS[0])
        .to_string()
}

pub fn validate_http_url(value: &str) -> Result<Url> {
    let parsed = Url::parse(value.trim())
        .map_err(|_| ScraperError::InvalidUrl(value.trim().to_string()))?;
    match parsed.scheme() {
        "http" | "https" => {}
        _ => return Err(ScraperError::InvalidUrl(redact_url_for_log(value))),
    }
    if parsed.host_str().is_none() {
        return Err(ScraperError::InvalidUrl(redact_url_for_log(value)));
    }
    Ok(parsed)
}

/// Parses an HTTP date such as `Thu, 12 Sep 2019 16:18:07 GMT`.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc2822(trimmed)
        .ok()
        .map(|when| when.with_timezone(&Utc))
}

fn classify_transport_error(url: &str, err: ureq::Error) -> ScraperError {
    let target = redact_url_for_log(url);
    match err {
        ureq::Error::Timeout(_) => ScraperError::Timeout(target),
        ureq::Error::Io(e) if e.kind() == std::io::ErrorKind::TimedOut => {
            ScraperError::Timeout(target)
        }
        ureq::Error::BadUri(_) => ScraperError::InvalidUrl(target),
        other => ScraperError::Connection(format!("{target}: {other}")),
    }
}

fn read_error(url: &str, err: std::io::Error) -> ScraperError {
    if err.kind() == std::io::ErrorKind::TimedOut {
        ScraperError::Timeout(redact_url_for_log(url))
    } else {
        ScraperError::Connection(format!("{}: {err}", redact_url_for_log(url)))
    }
}

fn header_string(response: &ureq::http::Response<ureq::Body>, key: &str) -> String {
    response
        .headers()
        .get(key)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .trim()
        .to_string()
}
