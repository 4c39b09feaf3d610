use crate::{Result, ScraperError};
use regex::Regex;
use std::sync::OnceLock;

pub const INSTAGRAM_ORIGIN: &str = "https://www.instagram.com";

fn post_url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^https?://www\.instagram\.com/p/[A-Za-z0-9_-]{11}").expect("post url regex")
    })
}

fn profile_url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^https?://www\.instagram\.com/([A-Za-z0-9_.]{2,30})/?$")
            .expect("profile url regex")
    })
}

fn hashtag_url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^https?://www\.instagram\.com/explore/tags/([\w]+)/?$")
            .expect("hashtag url regex")
    })
}

fn bare_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_.]{2,30}$").expect("bare name regex"))
}

fn bare_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^#?([\w]+)$").expect("bare tag regex"))
}

/// Returns the canonical post URL, dropping any trailing path or tracking query.
pub fn clean_post_url(text: &str) -> Result<String> {
    let text = text.trim();
    match post_url_re().find(text) {
        Some(found) => Ok(found.as_str().to_string()),
        None => Err(ScraperError::InvalidPostUrl {
            input: text.to_string(),
            looks_like_profile: profile_url_re().is_match(text) || bare_name_re().is_match(text),
        }),
    }
}

pub fn post_url_for(shortcode: &str) -> String {
    format!("{INSTAGRAM_ORIGIN}/p/{shortcode}")
}

/// Canonical feed URL for a profile, or for a hashtag when `hashtag` is set.
pub fn feed_url(text: &str, hashtag: bool) -> Result<String> {
    let text = text.trim();
    let invalid = || ScraperError::InvalidFeedTarget(text.to_string());
    if hashtag {
        let name = hashtag_url_re()
            .captures(text)
            .or_else(|| bare_tag_re().captures(text))
            .and_then(|c| c.get(1))
            .ok_or_else(invalid)?;
        return Ok(format!("{INSTAGRAM_ORIGIN}/explore/tags/{}/", name.as_str()));
    }

    let name = match profile_url_re().captures(text) {
        Some(c) => c.get(1).map(|m| m.as_str()),
        None if bare_name_re().is_match(text) => Some(text),
        None => None,
    }
    .ok_or_else(invalid)?;
    // `/p/...` and `/explore/...` are not usernames.
    if name == "p" || name == "explore" {
        return Err(invalid());
    }
    Ok(format!("{INSTAGRAM_ORIGIN}/{name}/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracking_query_is_stripped() {
        assert_eq!(
            clean_post_url("https://www.instagram.com/p/B2UUzbyAMrD/?utm_source=ig_web_copy_link")
                .expect("clean"),
            "https://www.instagram.com/p/B2UUzbyAMrD"
        );
        assert_eq!(
            clean_post_url("http://www.instagram.com/p/AZaz0_37-9x").expect("clean"),
            "http://www.instagram.com/p/AZaz0_37-9x"
        );
    }

    #[test]
    fn profile_link_asks_for_feed_mode() {
        let err = clean_post_url("https://www.instagram.com/instagram/").unwrap_err();
        assert!(matches!(
            err,
            ScraperError::InvalidPostUrl {
                looks_like_profile: true,
                ..
            }
        ));
        assert_eq!(err.user_message(), "Need to use the -p or --posts flag.");
    }

    #[test]
    fn unrelated_link_is_rejected() {
        let err = clean_post_url("https://example.com/p/B2UUzbyAMrD").unwrap_err();
        assert!(matches!(
            err,
            ScraperError::InvalidPostUrl {
                looks_like_profile: false,
                ..
            }
        ));
        assert!(clean_post_url("https://www.instagram.com/p/short").is_err());
    }

    #[test]
    fn feed_targets_are_canonicalized() {
        assert_eq!(
            feed_url("https://www.instagram.com/instagram", false).expect("profile"),
            "https://www.instagram.com/instagram/"
        );
        assert_eq!(
            feed_url("nat.geo_", false).expect("bare profile"),
            "https://www.instagram.com/nat.geo_/"
        );
        assert_eq!(
            feed_url("#sunset", true).expect("bare tag"),
            "https://www.instagram.com/explore/tags/sunset/"
        );
        assert_eq!(
            feed_url("https://www.instagram.com/explore/tags/sunset/", true).expect("tag url"),
            "https://www.instagram.com/explore/tags/sunset/"
        );
    }

    #[test]
    fn malformed_feed_targets_are_rejected() {
        assert!(matches!(
            feed_url("https://www.instagram.com/p/B2UUzbyAMrD", false),
            Err(ScraperError::InvalidFeedTarget(_))
        ));
        assert!(feed_url("a", false).is_err());
        assert!(feed_url("two words", true).is_err());
    }
}
