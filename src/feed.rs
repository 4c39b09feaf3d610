use crate::client::Fetch;
use crate::extract::{feed_post_count, profile_is_private};
use crate::weburl::post_url_for;
use crate::{Result, ScraperError};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

const NOT_FOUND_TITLE: &str = "Page Not Found";
const POST_THUMBNAIL_SELECTOR: &str = ".SCxLW .eLAPa";
const POST_HREF_PREFIX: &str = "/p/";

/// The headless-browser surface feed enumeration needs.
pub trait FeedBrowser {
    fn title(&mut self) -> Result<String>;
    fn page_source(&mut self) -> Result<String>;
    fn scroll_to(&mut self, y: u64) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct FeedOptions {
    pub limit: usize,
    pub hashtag: bool,
    pub scroll_step: u32,
    pub max_stalled_rounds: usize,
}

/// Collects up to `limit` post URLs from a profile or hashtag feed.
///
/// Shortcodes in `skip` are passed over and do not count toward the limit.
/// A feed that does not exist, or a private profile, yields an empty list.
pub fn collect_post_urls<B, FLog>(
    browser: &mut B,
    options: &FeedOptions,
    skip: &HashSet<String>,
    mut log_line: FLog,
) -> Result<Vec<String>>
where
    B: FeedBrowser + ?Sized,
    FLog: FnMut(&str, &str, serde_json::Value) -> Result<()>,
{
    if browser.title()?.contains(NOT_FOUND_TITLE) {
        log_line("warn", "feed_not_found", serde_json::json!({}))?;
        return Ok(Vec::new());
    }

    let source = browser.page_source()?;
    if !options.hashtag && profile_is_private(&source)? {
        log_line("warn", "feed_profile_private", serde_json::json!({}))?;
        return Ok(Vec::new());
    }

    let total = feed_post_count(&source)?;
    let limit = options.limit.min(usize::try_from(total).unwrap_or(usize::MAX));
    log_line(
        "info",
        "feed_enumeration_started",
        serde_json::json!({ "limit": limit, "total_posts": total }),
    )?;

    let mut urls: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut scroll_pos = 0_u64;
    let mut stalled_rounds = 0_usize;

    while urls.len() < limit {
        let before = urls.len();
        for shortcode in post_shortcodes(&browser.page_source()?)? {
            if urls.len() >= limit {
                break;
            }
            if skip.contains(&shortcode) || !seen.insert(shortcode.clone()) {
                continue;
            }
            urls.push(post_url_for(&shortcode));
        }
        if urls.len() >= limit {
            break;
        }

        if urls.len() == before {
            stalled_rounds += 1;
            if stalled_rounds >= options.max_stalled_rounds {
                log_line(
                    "warn",
                    "feed_enumeration_stalled",
                    serde_json::json!({ "collected": urls.len(), "limit": limit }),
                )?;
                break;
            }
        } else {
            stalled_rounds = 0;
        }

        scroll_pos += u64::from(options.scroll_step);
        browser.scroll_to(scroll_pos)?;
    }

    log_line(
        "info",
        "feed_enumeration_finished",
        serde_json::json!({ "collected": urls.len() }),
    )?;
    Ok(urls)
}

/// Shortcodes of the post thumbnails currently rendered, in page order.
pub fn post_shortcodes(html: &str) -> Result<Vec<String>> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(POST_THUMBNAIL_SELECTOR).map_err(|e| {
        ScraperError::Browser(format!("bad selector {POST_THUMBNAIL_SELECTOR}: {e}"))
    })?;

    let mut out = Vec::new();
    for thumb in document.select(&selector) {
        let Some(anchor) = thumb.parent().and_then(ElementRef::wrap) else {
            continue;
        };
        if anchor.value().name() != "a" {
            continue;
        }
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Some(shortcode) = href
            .strip_prefix(POST_HREF_PREFIX)
            .map(|rest| rest.trim_end_matches('/'))
        else {
            continue;
        };
        if shortcode.is_empty() || shortcode.contains('/') {
            continue;
        }
        out.push(shortcode.to_string());
    }
    Ok(out)
}

/// A feed page fetched once over HTTP. Scrolling does not load more posts.
pub struct StaticFeedPage<'a, F: Fetch + ?Sized> {
    fetcher: &'a F,
    url: String,
    html: Option<String>,
}

impl<'a, F: Fetch + ?Sized> StaticFeedPage<'a, F> {
    pub fn new(fetcher: &'a F, url: impl Into<String>) -> Self {
        Self {
            fetcher,
            url: url.into(),
            html: None,
        }
    }

    fn html(&mut self) -> Result<&str> {
        if self.html.is_none() {
            let html = match self.fetcher.fetch_html(&self.url) {
                Ok(v) => v,
                // A missing feed renders as a "Page Not Found" document.
                Err(ScraperError::PageUnavailable { .. }) => {
                    format!("<html><head><title>{NOT_FOUND_TITLE}</title></head></html>")
                }
                Err(err) => return Err(err),
            };
            self.html = Some(html);
        }
        Ok(self.html.as_deref().unwrap_or_default())
    }
}

impl<F: Fetch + ?Sized> FeedBrowser for StaticFeedPage<'_, F> {
    fn title(&mut self) -> Result<String> {
        let document = Html::parse_document(self.html()?);
        let selector = Selector::parse("title")
            .map_err(|e| ScraperError::Browser(format!("bad selector title: {e}")))?;
        Ok(document
            .select(&selector)
            .next()
            .map(|t| t.text().collect::<String>())
            .unwrap_or_default())
    }

    fn page_source(&mut self) -> Result<String> {
        Ok(self.html()?.to_string())
    }

    fn scroll_to(&mut self, _y: u64) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MediaAsset;
    use std::cell::Cell;

    fn feed_html(shared: &str, shortcodes: &[&str]) -> String {
        let tiles: String = shortcodes
            .iter()
            .map(|sc| format!(r#"<a href="/p/{sc}/"><div class="eLAPa"></div></a>"#))
            .collect();
        format!(
            r#"<html><head><title>Feed</title></head><body><span></span><div></div><div></div><div></div><script></script><script type="text/javascript">window._sharedData = {shared};</script><main><div class="SCxLW">{tiles}</div></main></body></html>"#
        )
    }

    fn profile_json(private: bool, count: u64) -> String {
        format!(
            r#"{{"entry_data":{{"ProfilePage":[{{"graphql":{{"user":{{"is_private":{private},"edge_owner_to_timeline_media":{{"count":{count}}}}}}}}}]}}}}"#
        )
    }

    /// Reveals one more page of thumbnails per scroll.
    struct ScrollingFeed {
        title: String,
        shared: String,
        pages: Vec<Vec<&'static str>>,
        visible: usize,
        scrolls: Vec<u64>,
    }

    impl FeedBrowser for ScrollingFeed {
        fn title(&mut self) -> Result<String> {
            Ok(self.title.clone())
        }

        fn page_source(&mut self) -> Result<String> {
            let shown: Vec<&str> = self.pages[..self.visible.min(self.pages.len())]
                .iter()
                .flatten()
                .copied()
                .collect();
            Ok(feed_html(&self.shared, &shown))
        }

        fn scroll_to(&mut self, y: u64) -> Result<()> {
            self.scrolls.push(y);
            self.visible += 1;
            Ok(())
        }
    }

    fn options(limit: usize) -> FeedOptions {
        FeedOptions {
            limit,
            hashtag: false,
            scroll_step: 500,
            max_stalled_rounds: 3,
        }
    }

    fn no_log(_: &str, _: &str, _: serde_json::Value) -> Result<()> {
        Ok(())
    }

    #[test]
    fn scrolls_until_limit_and_skips_downloaded() {
        let mut feed = ScrollingFeed {
            title: "Profile".to_string(),
            shared: profile_json(false, 100),
            pages: vec![vec!["AAAAAAAAAAA", "BBBBBBBBBBB"], vec!["CCCCCCCCCCC", "DDDDDDDDDDD"]],
            visible: 1,
            scrolls: Vec::new(),
        };
        let skip: HashSet<String> = ["BBBBBBBBBBB".to_string()].into_iter().collect();

        let urls = collect_post_urls(&mut feed, &options(3), &skip, no_log).expect("collect");
        assert_eq!(
            urls,
            vec![
                "https://www.instagram.com/p/AAAAAAAAAAA",
                "https://www.instagram.com/p/CCCCCCCCCCC",
                "https://www.instagram.com/p/DDDDDDDDDDD",
            ]
        );
        assert_eq!(feed.scrolls, vec![500]);
    }

    #[test]
    fn limit_is_clamped_to_post_count() {
        let mut feed = ScrollingFeed {
            title: "Profile".to_string(),
            shared: profile_json(false, 1),
            pages: vec![vec!["AAAAAAAAAAA", "BBBBBBBBBBB"]],
            visible: 1,
            scrolls: Vec::new(),
        };
        let urls = collect_post_urls(&mut feed, &options(10), &HashSet::new(), no_log)
            .expect("collect");
        assert_eq!(urls.len(), 1);
    }

    #[test]
    fn missing_or_private_feeds_yield_nothing() {
        let mut missing = ScrollingFeed {
            title: "Page Not Found \u{2022} Instagram".to_string(),
            shared: profile_json(false, 5),
            pages: vec![vec!["AAAAAAAAAAA"]],
            visible: 1,
            scrolls: Vec::new(),
        };
        assert!(collect_post_urls(&mut missing, &options(5), &HashSet::new(), no_log)
            .expect("collect")
            .is_empty());

        let mut private = ScrollingFeed {
            title: "Profile".to_string(),
            shared: profile_json(true, 5),
            pages: vec![vec!["AAAAAAAAAAA"]],
            visible: 1,
            scrolls: Vec::new(),
        };
        let mut events = Vec::new();
        let urls = collect_post_urls(&mut private, &options(5), &HashSet::new(), |_, event, _| {
            events.push(event.to_string());
            Ok(())
        })
        .expect("collect");
        assert!(urls.is_empty());
        assert_eq!(events, vec!["feed_profile_private"]);
    }

    #[test]
    fn stalled_feed_stops_after_configured_rounds() {
        let mut feed = ScrollingFeed {
            title: "Profile".to_string(),
            shared: profile_json(false, 50),
            pages: vec![vec!["AAAAAAAAAAA"]],
            visible: 1,
            scrolls: Vec::new(),
        };
        let urls = collect_post_urls(&mut feed, &options(5), &HashSet::new(), no_log)
            .expect("collect");
        assert_eq!(urls.len(), 1);
        assert_eq!(feed.scrolls, vec![500, 1000, 1500]);
    }

    #[test]
    fn thumbnails_outside_post_anchors_are_ignored() {
        let html = r#"<div class="SCxLW"><a href="/p/AAAAAAAAAAA/"><div class="eLAPa"></div></a><a href="/explore/"><div class="eLAPa"></div></a><span><div class="eLAPa"></div></span></div><a href="/p/ZZZZZZZZZZZ/"><div class="eLAPa"></div></a>"#;
        assert_eq!(post_shortcodes(html).expect("parse"), vec!["AAAAAAAAAAA"]);
    }

    struct OnePage {
        html: Option<String>,
        calls: Cell<usize>,
    }

    impl Fetch for OnePage {
        fn fetch_html(&self, url: &str) -> Result<String> {
            self.calls.set(self.calls.get() + 1);
            self.html.clone().ok_or_else(|| ScraperError::PageUnavailable {
                url: url.to_string(),
                status: 404,
            })
        }

        fn fetch_media(&self, url: &str) -> Result<MediaAsset> {
            Err(ScraperError::Connection(url.to_string()))
        }
    }

    #[test]
    fn static_page_fetches_once_and_maps_404_to_not_found() {
        let fetcher = OnePage {
            html: Some(feed_html(&profile_json(false, 2), &["AAAAAAAAAAA", "BBBBBBBBBBB"])),
            calls: Cell::new(0),
        };
        let mut page = StaticFeedPage::new(&fetcher, "https://www.instagram.com/instagram/");
        let urls = collect_post_urls(&mut page, &options(2), &HashSet::new(), no_log)
            .expect("collect");
        assert_eq!(urls.len(), 2);
        assert_eq!(fetcher.calls.get(), 1);

        let gone = OnePage {
            html: None,
            calls: Cell::new(0),
        };
        let mut page = StaticFeedPage::new(&gone, "https://www.instagram.com/nobody/");
        assert!(page.title().expect("title").contains(NOT_FOUND_TITLE));
    }
}
