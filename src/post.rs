use crate::extract::{self, ScriptLocator};
use crate::{Result, ScraperError};
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const TYPENAME_IMAGE: &str = "GraphImage";
const TYPENAME_VIDEO: &str = "GraphVideo";
const TYPENAME_SIDECAR: &str = "GraphSidecar";

/// Fixed-width UTC rendering used in filenames.
pub const CREATED_AT_FORMAT: &str = "%Y%m%d%H%M%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostType {
    Image,
    Video,
    Gallery,
}

impl PostType {
    pub fn from_typename(value: &str) -> Option<Self> {
        match value {
            TYPENAME_IMAGE => Some(Self::Image),
            TYPENAME_VIDEO => Some(Self::Video),
            TYPENAME_SIDECAR => Some(Self::Gallery),
            _ => None,
        }
    }

    pub fn typename(self) -> &'static str {
        match self {
            Self::Image => TYPENAME_IMAGE,
            Self::Video => TYPENAME_VIDEO,
            Self::Gallery => TYPENAME_SIDECAR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn typename(self) -> &'static str {
        match self {
            Self::Image => TYPENAME_IMAGE,
            Self::Video => TYPENAME_VIDEO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaRef {
    pub url: String,
    pub kind: MediaKind,
    /// Gallery children carry their own shortcode.
    pub shortcode: Option<String>,
    pub accessibility_caption: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PostDetails {
    pub full_name: Option<String>,
    pub is_private: Option<bool>,
    pub is_verified: Option<bool>,
    pub caption: Option<String>,
    pub caption_is_edited: Option<bool>,
    pub comments_disabled: Option<bool>,
    pub likes: Option<u64>,
    pub comments: Option<u64>,
    pub location_name: Option<String>,
    pub title: Option<String>,
    pub video_duration: Option<f64>,
    pub product_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedPost {
    pub post_type: PostType,
    pub media_refs: Vec<MediaRef>,
    pub owner_handle: Option<String>,
    pub created_at: Option<i64>,
    pub shortcode: Option<String>,
    pub details: PostDetails,
}

impl ParsedPost {
    pub fn owner_handle(&self) -> Result<&str> {
        self.owner_handle
            .as_deref()
            .ok_or_else(|| ScraperError::MissingField("owner.username".to_string()))
    }

    pub fn created_at(&self) -> Result<i64> {
        self.created_at
            .ok_or_else(|| ScraperError::MissingField("taken_at_timestamp".to_string()))
    }

    pub fn shortcode(&self) -> Result<&str> {
        self.shortcode
            .as_deref()
            .ok_or_else(|| ScraperError::MissingField("shortcode".to_string()))
    }

    /// Creation time rendered in UTC as `YYYYmmddHHMMSS`.
    pub fn created_at_utc(&self) -> Result<String> {
        render_utc(self.created_at()?, CREATED_AT_FORMAT)
    }
}

pub fn render_utc(timestamp: i64, format: &str) -> Result<String> {
    let when = DateTime::from_timestamp(timestamp, 0).ok_or_else(|| {
        ScraperError::Extraction(format!("timestamp out of range: {timestamp}"))
    })?;
    Ok(when.format(format).to_string())
}

#[derive(Debug, Default, Deserialize)]
struct RawMedia {
    #[serde(rename = "__typename")]
    typename: Option<String>,
    shortcode: Option<String>,
    display_url: Option<String>,
    video_url: Option<String>,
    taken_at_timestamp: Option<i64>,
    owner: Option<RawOwner>,
    edge_sidecar_to_children: Option<RawEdges<RawMedia>>,
    accessibility_caption: Option<String>,
    title: Option<String>,
    product_type: Option<String>,
    video_duration: Option<f64>,
    caption_is_edited: Option<bool>,
    comments_disabled: Option<bool>,
    edge_media_preview_like: Option<RawCount>,
    edge_media_to_parent_comment: Option<RawCount>,
    edge_media_to_comment: Option<RawCount>,
    edge_media_to_caption: Option<RawEdges<RawCaption>>,
    location: Option<RawLocation>,
}

#[derive(Debug, Default, Deserialize)]
struct RawOwner {
    username: Option<String>,
    full_name: Option<String>,
    is_private: Option<bool>,
    is_verified: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawEdges<T> {
    #[serde(default = "Vec::new")]
    edges: Vec<RawEdge<T>>,
}

#[derive(Debug, Deserialize)]
struct RawEdge<T> {
    node: T,
}

#[derive(Debug, Deserialize)]
struct RawCount {
    count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawCaption {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawLocation {
    name: Option<String>,
}

/// Validates the `shortcode_media` subtree and resolves its media references.
pub fn resolve(tree: &Value) -> Result<ParsedPost> {
    let raw = RawMedia::deserialize(tree)
        .map_err(|e| ScraperError::Extraction(format!("post data has unexpected shape: {e}")))?;

    let typename = raw
        .typename
        .as_deref()
        .ok_or_else(|| ScraperError::MissingField("__typename".to_string()))?;
    let post_type = PostType::from_typename(typename)
        .ok_or_else(|| ScraperError::UnsupportedPostType(typename.to_string()))?;

    let media_refs = match post_type {
        PostType::Image => vec![media_ref(&raw, MediaKind::Image, "")?],
        PostType::Video => vec![media_ref(&raw, MediaKind::Video, "")?],
        PostType::Gallery => gallery_refs(&raw)?,
    };

    let owner = raw.owner.unwrap_or_default();
    let comments = raw
        .edge_media_to_parent_comment
        .or(raw.edge_media_to_comment)
        .and_then(|c| c.count);
    let caption = raw
        .edge_media_to_caption
        .and_then(|c| c.edges.into_iter().next())
        .and_then(|edge| edge.node.text);

    Ok(ParsedPost {
        post_type,
        media_refs,
        owner_handle: owner.username,
        created_at: raw.taken_at_timestamp,
        shortcode: raw.shortcode,
        details: PostDetails {
            full_name: owner.full_name,
            is_private: owner.is_private,
            is_verified: owner.is_verified,
            caption,
            caption_is_edited: raw.caption_is_edited,
            comments_disabled: raw.comments_disabled,
            likes: raw.edge_media_preview_like.and_then(|c| c.count),
            comments,
            location_name: raw.location.and_then(|l| l.name),
            title: raw.title,
            video_duration: raw.video_duration,
            product_type: raw.product_type,
        },
    })
}

/// Extracts the post data from a post page and resolves it.
///
/// A page without `shortcode_media` (login wall, removed post) is an
/// extraction failure, not a malformed post.
pub fn resolve_post(html: &str) -> Result<ParsedPost> {
    let tree = extract::extract_required(
        html,
        &ScriptLocator::post_page(),
        extract::SHORTCODE_MEDIA_POINTER,
    )?;
    resolve(&tree)
}

fn gallery_refs(raw: &RawMedia) -> Result<Vec<MediaRef>> {
    let children = raw
        .edge_sidecar_to_children
        .as_ref()
        .ok_or_else(|| ScraperError::MissingField("edge_sidecar_to_children".to_string()))?;
    if children.edges.is_empty() {
        return Err(ScraperError::MissingField(
            "edge_sidecar_to_children.edges".to_string(),
        ));
    }

    let mut refs = Vec::with_capacity(children.edges.len());
    for (idx, edge) in children.edges.iter().enumerate() {
        let node = &edge.node;
        let field_prefix = format!("edge_sidecar_to_children.edges[{idx}].node.");
        let typename = node
            .typename
            .as_deref()
            .ok_or_else(|| ScraperError::MissingField(format!("{field_prefix}__typename")))?;
        let kind = match PostType::from_typename(typename) {
            Some(PostType::Video) => MediaKind::Video,
            Some(PostType::Image) => MediaKind::Image,
            _ => return Err(ScraperError::UnsupportedPostType(typename.to_string())),
        };
        refs.push(media_ref(node, kind, &field_prefix)?);
    }
    Ok(refs)
}

fn media_ref(raw: &RawMedia, kind: MediaKind, field_prefix: &str) -> Result<MediaRef> {
    let (field, url) = match kind {
        MediaKind::Image => ("display_url", raw.display_url.as_ref()),
        MediaKind::Video => ("video_url", raw.video_url.as_ref()),
    };
    let url = url.ok_or_else(|| ScraperError::MissingField(format!("{field_prefix}{field}")))?;
    Ok(MediaRef {
        url: url.clone(),
        kind,
        shortcode: raw.shortcode.clone(),
        accessibility_caption: match kind {
            MediaKind::Image => raw.accessibility_caption.clone(),
            MediaKind::Video => None,
        },
    })
}
