use crate::{Result, ScraperError};
use scraper::{Html, Selector};
use serde_json::Value;

/// Characters of the `window._sharedData = ` assignment that precede the JSON body.
pub const ASSIGNMENT_PREFIX_CHARS: usize = 21;
/// Characters of the trailing statement terminator (`;`).
pub const TERMINATOR_CHARS: usize = 1;

const TYPED_SCRIPT_SELECTOR: &str = r#"script[type="text/javascript"]"#;
const PROFILE_SCRIPT_SELECTOR: &str = "body > script:nth-child(6)";

pub const SHORTCODE_MEDIA_POINTER: &str = "/entry_data/PostPage/0/graphql/shortcode_media";
pub const PROFILE_PRIVATE_POINTER: &str = "/entry_data/ProfilePage/0/graphql/user/is_private";
pub const PROFILE_POST_COUNT_POINTER: &str =
    "/entry_data/ProfilePage/0/graphql/user/edge_owner_to_timeline_media/count";
pub const HASHTAG_POST_COUNT_POINTER: &str =
    "/entry_data/TagPage/0/graphql/hashtag/edge_hashtag_to_media/count";

/// Positional contract with the page markup: which script element holds the data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptLocator {
    /// Zero-based index among `script[type="text/javascript"]` elements.
    TypedScript(usize),
    /// First element matched by a CSS selector.
    Css(String),
}

impl ScriptLocator {
    /// Post pages carry the data in the fourth typed script.
    pub fn post_page() -> Self {
        Self::TypedScript(3)
    }

    /// Profile and hashtag feeds carry it in the sixth child of `body`.
    pub fn feed_page() -> Self {
        Self::Css(PROFILE_SCRIPT_SELECTOR.to_string())
    }

    fn describe(&self) -> String {
        match self {
            Self::TypedScript(index) => format!("{TYPED_SCRIPT_SELECTOR}[{index}]"),
            Self::Css(selector) => selector.clone(),
        }
    }
}

pub type Hook = fn(Value) -> Value;

/// Parses the JSON assigned inside the script element chosen by `locator`.
///
/// The element text must be `<21-char assignment><json>;`. When `hook` is
/// given it runs on the parsed document; hooks return their input unchanged
/// when their path is absent.
pub fn extract(html: &str, locator: &ScriptLocator, hook: Option<Hook>) -> Result<Value> {
    let text = script_text(html, locator)?;
    let body = strip_assignment(&text)?;
    let data: Value = serde_json::from_str(body)
        .map_err(|e| ScraperError::Extraction(format!("embedded data is not valid JSON: {e}")))?;
    if !data.is_object() {
        return Err(ScraperError::Extraction(
            "embedded data is not a JSON object".to_string(),
        ));
    }
    Ok(match hook {
        Some(hook) => hook(data),
        None => data,
    })
}

/// Like [`extract`] but the subtree at `pointer` must exist.
pub fn extract_required(html: &str, locator: &ScriptLocator, pointer: &str) -> Result<Value> {
    let data = extract(html, locator, None)?;
    data.pointer(pointer)
        .cloned()
        .ok_or_else(|| ScraperError::Extraction(format!("page data has no {pointer}")))
}

pub fn shortcode_media(data: Value) -> Value {
    project(data, SHORTCODE_MEDIA_POINTER)
}

pub fn private_profile(data: Value) -> Value {
    project(data, PROFILE_PRIVATE_POINTER)
}

pub fn user_post_count(data: Value) -> Value {
    project(data, PROFILE_POST_COUNT_POINTER)
}

pub fn hashtag_post_count(data: Value) -> Value {
    project(data, HASHTAG_POST_COUNT_POINTER)
}

fn project(data: Value, pointer: &str) -> Value {
    match data.pointer(pointer) {
        Some(found) => found.clone(),
        None => data,
    }
}

pub fn profile_is_private(html: &str) -> Result<bool> {
    extract(html, &ScriptLocator::feed_page(), Some(private_profile))?
        .as_bool()
        .ok_or_else(|| ScraperError::Extraction("profile privacy flag not found".to_string()))
}

/// Total posts on a profile feed, falling back to the hashtag count.
pub fn feed_post_count(html: &str) -> Result<u64> {
    let locator = ScriptLocator::feed_page();
    if let Some(count) = extract(html, &locator, Some(user_post_count))?.as_u64() {
        return Ok(count);
    }
    extract(html, &locator, Some(hashtag_post_count))?
        .as_u64()
        .ok_or_else(|| ScraperError::Extraction("feed post count not found".to_string()))
}

fn script_text(html: &str, locator: &ScriptLocator) -> Result<String> {
    let document = Html::parse_document(html);
    let (selector_src, index) = match locator {
        ScriptLocator::TypedScript(index) => (TYPED_SCRIPT_SELECTOR, *index),
        ScriptLocator::Css(selector) => (selector.as_str(), 0),
    };
    let selector = Selector::parse(selector_src)
        .map_err(|e| ScraperError::Extraction(format!("bad selector {selector_src}: {e}")))?;
    let element = document.select(&selector).nth(index).ok_or_else(|| {
        ScraperError::Extraction(format!("no element matches {}", locator.describe()))
    })?;
    Ok(element.text().collect::<String>())
}

fn strip_assignment(text: &str) -> Result<&str> {
    let too_short =
        || ScraperError::Extraction("script text is shorter than the assignment".to_string());
    let start = text
        .char_indices()
        .nth(ASSIGNMENT_PREFIX_CHARS)
        .map(|(idx, _)| idx)
        .ok_or_else(too_short)?;
    let body = &text[start..];
    let end = body
        .char_indices()
        .rev()
        .nth(TERMINATOR_CHARS - 1)
        .map(|(idx, _)| idx)
        .ok_or_else(too_short)?;
    Ok(&body[..end])
}
