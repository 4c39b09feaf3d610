use crate::post::{render_utc, MediaKind, ParsedPost, PostType};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

/// One `data.csv` row per saved media file.
#[derive(Debug, Clone, Serialize)]
pub struct MetadataRow {
    pub username: String,
    pub full_name: Option<String>,
    pub shortcode: Option<String>,
    pub sub_shortcode: Option<String>,
    #[serde(rename = "type")]
    pub post_type: String,
    pub sub_type: Option<String>,
    pub data_scraped_at: String,
    pub published: Option<i64>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub location_name: Option<String>,
    pub accessibility_caption: Option<String>,
    pub is_video: bool,
    pub video_duration: Option<f64>,
    pub product_type: Option<String>,
    pub is_verified: Option<bool>,
    pub is_private: Option<bool>,
    pub likes: Option<u64>,
    pub comments: Option<u64>,
    pub comments_disabled: Option<bool>,
    pub caption_is_edited: Option<bool>,
    pub title: Option<String>,
    pub caption: Option<String>,
}

impl MetadataRow {
    /// Builds the row for media item `index` of `post`.
    pub fn for_item(post: &ParsedPost, index: usize, scraped_at: DateTime<Utc>) -> Result<Self> {
        let item = post.media_refs.get(index);
        let (date, time) = match post.created_at {
            Some(ts) => (
                Some(render_utc(ts, "%Y-%m-%d")?),
                Some(render_utc(ts, "%H:%M:%S")?),
            ),
            None => (None, None),
        };
        let is_gallery = post.post_type == PostType::Gallery;
        let details = &post.details;

        Ok(Self {
            username: post.owner_handle()?.to_string(),
            full_name: details.full_name.clone(),
            shortcode: post.shortcode.clone(),
            sub_shortcode: item
                .filter(|_| is_gallery)
                .and_then(|i| i.shortcode.clone()),
            post_type: post.post_type.typename().to_string(),
            sub_type: item
                .filter(|_| is_gallery)
                .map(|i| i.kind.typename().to_string()),
            data_scraped_at: scraped_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            published: post.created_at,
            date,
            time,
            location_name: details.location_name.clone(),
            accessibility_caption: item.and_then(|i| i.accessibility_caption.clone()),
            is_video: item.map(|i| i.kind == MediaKind::Video).unwrap_or(false),
            video_duration: details.video_duration,
            product_type: details.product_type.clone(),
            is_verified: details.is_verified,
            is_private: details.is_private,
            likes: details.likes,
            comments: details.comments,
            comments_disabled: details.comments_disabled,
            caption_is_edited: details.caption_is_edited,
            title: details.title.clone(),
            caption: details.caption.clone(),
        })
    }
}

/// Appends `row` to `csv_path`, writing the header only when the file is new.
pub fn append_row(csv_path: &Path, row: &MetadataRow) -> Result<()> {
    if let Some(parent) = csv_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let is_new = std::fs::metadata(csv_path)
        .map(|m| m.len() == 0)
        .unwrap_or(true);
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(csv_path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(is_new)
        .from_writer(file);
    writer.serialize(row)?;
    writer.flush()?;
    Ok(())
}

pub fn append_post_metadata(
    csv_path: &Path,
    post: &ParsedPost,
    index: usize,
    scraped_at: DateTime<Utc>,
) -> Result<()> {
    let row = MetadataRow::for_item(post, index, scraped_at)?;
    append_row(csv_path, &row)
}
