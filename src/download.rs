use crate::client::Fetch;
use crate::config::ScraperConfig;
use crate::filename::build_filename;
use crate::logging::redact_url_for_log;
use crate::materialize::{save, SaveOutcome};
use crate::metadata::append_post_metadata;
use crate::paths::AppPaths;
use crate::post::resolve_post;
use crate::Result;
use chrono::Utc;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostReport {
    pub shortcode: String,
    pub saved: Vec<PathBuf>,
    pub skipped_unknown: usize,
}

/// Running totals for a batch, owned by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchProgress {
    pub total: usize,
    pub completed: usize,
    pub saved_files: usize,
    pub skipped_unknown: usize,
}

impl BatchProgress {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub fn record(&mut self, report: &PostReport) {
        self.completed += 1;
        self.saved_files += report.saved.len();
        self.skipped_unknown += report.skipped_unknown;
    }
}

pub struct Downloader<F: Fetch> {
    fetcher: F,
    paths: AppPaths,
    config: ScraperConfig,
}

impl<F: Fetch> Downloader<F> {
    pub fn new(fetcher: F, paths: AppPaths, config: ScraperConfig) -> Self {
        Self {
            fetcher,
            paths,
            config,
        }
    }

    /// Saves every media item of the post at `url` in gallery order.
    ///
    /// The first failing item aborts the post; items already written stay on disk.
    pub fn download_post<FLog>(&self, url: &str, mut log_line: FLog) -> Result<PostReport>
    where
        FLog: FnMut(&str, &str, serde_json::Value) -> Result<()>,
    {
        let html = self.fetcher.fetch_html(url)?;
        let post = resolve_post(&html)?;
        let owner = post.owner_handle()?;
        let created_at = post.created_at_utc()?;
        let shortcode = post.shortcode()?;
        let output_dir = self.paths.post_dir(owner, shortcode);
        let scraped_at = Utc::now();

        log_line(
            "info",
            "post_resolved",
            serde_json::json!({
                "shortcode": shortcode,
                "type": post.post_type.typename(),
                "items": post.media_refs.len(),
            }),
        )?;

        let mut report = PostReport {
            shortcode: shortcode.to_string(),
            saved: Vec::new(),
            skipped_unknown: 0,
        };

        for (index, media) in post.media_refs.iter().enumerate() {
            let asset = self.fetcher.fetch_media(&media.url)?;
            let filename = build_filename(owner, &created_at, shortcode, &asset.content_type);
            match save(&asset.bytes, &output_dir, &filename)? {
                SaveOutcome::Saved { path, signature } => {
                    log_line(
                        "info",
                        "media_saved",
                        serde_json::json!({
                            "index": index,
                            "file": filename,
                            "signature": signature.as_str(),
                            "bytes": asset.bytes.len(),
                            "last_modified": asset.last_modified.map(|t| t.to_rfc3339()),
                        }),
                    )?;
                    if self.config.write_metadata {
                        append_post_metadata(
                            &self.paths.metadata_csv_path(),
                            &post,
                            index,
                            scraped_at,
                        )?;
                    }
                    report.saved.push(path);
                }
                SaveOutcome::SkippedUnknown => {
                    log_line(
                        "warn",
                        "media_unknown_signature",
                        serde_json::json!({
                            "index": index,
                            "url": redact_url_for_log(&media.url),
                            "content_type": asset.content_type,
                        }),
                    )?;
                    report.skipped_unknown += 1;
                }
            }
        }

        log_line(
            "info",
            "post_downloaded",
            serde_json::json!({
                "shortcode": shortcode,
                "saved": report.saved.len(),
                "skipped_unknown": report.skipped_unknown,
            }),
        )?;
        Ok(report)
    }

    /// Downloads `urls` in order, stopping at the first error.
    pub fn download_batch<FLog>(
        &self,
        urls: &[String],
        progress: &mut BatchProgress,
        mut log_line: FLog,
    ) -> Result<Vec<PostReport>>
    where
        FLog: FnMut(&str, &str, serde_json::Value) -> Result<()>,
    {
        let mut reports = Vec::with_capacity(urls.len());
        for url in urls {
            let report = self.download_post(url, &mut log_line)?;
            progress.record(&report);
            log_line(
                "info",
                "batch_progress",
                serde_json::json!({
                    "completed": progress.completed,
                    "total": progress.total,
                }),
            )?;
            reports.push(report);
        }
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MediaAsset;
    use crate::ScraperError;
    use std::collections::HashMap;

    fn post_page(media: &str) -> String {
        format!(
            r#"<html><head><script type="text/javascript"></script><script type="text/javascript"></script><script type="text/javascript"></script></head><body><script type="text/javascript">window._sharedData = {{"entry_data":{{"PostPage":[{{"graphql":{{"shortcode_media":{media}}}}}]}}}};</script></body></html>"#
        )
    }

    fn jpeg(len: usize) -> Vec<u8> {
        let mut buf = vec![0x42_u8; len];
        buf[..4].copy_from_slice(&[0xFF, 0xD8, 0xFF, 0xE0]);
        buf
    }

    fn mp4() -> Vec<u8> {
        let mut buf = vec![0x00, 0x00, 0x00, 0x18];
        buf.extend_from_slice(b"ftypisom");
        buf.extend_from_slice(&[0x11; 32]);
        buf
    }

    #[derive(Default)]
    struct FakeFetch {
        pages: HashMap<String, String>,
        media: HashMap<String, (Vec<u8>, &'static str)>,
    }

    impl Fetch for FakeFetch {
        fn fetch_html(&self, url: &str) -> Result<String> {
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| ScraperError::PageUnavailable {
                    url: url.to_string(),
                    status: 404,
                })
        }

        fn fetch_media(&self, url: &str) -> Result<MediaAsset> {
            let (bytes, content_type) = self
                .media
                .get(url)
                .cloned()
                .ok_or_else(|| ScraperError::Connection(url.to_string()))?;
            Ok(MediaAsset {
                bytes,
                content_type: content_type.to_string(),
                last_modified: None,
            })
        }
    }

    fn gallery_fetcher() -> FakeFetch {
        let mut fetcher = FakeFetch::default();
        fetcher.pages.insert(
            "https://www.instagram.com/p/B2UUzbyAMrD".to_string(),
            post_page(
                r#"{"__typename":"GraphSidecar","shortcode":"B2UUzbyAMrD","taken_at_timestamp":1568305087,
                   "owner":{"username":"instagram"},
                   "edge_sidecar_to_children":{"edges":[
                     {"node":{"__typename":"GraphVideo","shortcode":"child000001","video_url":"https://cdn/v.mp4"}},
                     {"node":{"__typename":"GraphImage","shortcode":"child000002","display_url":"https://cdn/i.jpg"}},
                     {"node":{"__typename":"GraphImage","shortcode":"child000003","display_url":"https://cdn/x.webp"}}
                   ]}}"#,
            ),
        );
        fetcher
            .media
            .insert("https://cdn/v.mp4".to_string(), (mp4(), "video/mp4"));
        fetcher
            .media
            .insert("https://cdn/i.jpg".to_string(), (jpeg(200), "image/jpeg"));
        fetcher
            .media
            .insert("https://cdn/x.webp".to_string(), (b"RIFF....WEBPVP8 ".to_vec(), "image/webp"));
        fetcher
    }

    #[test]
    fn gallery_is_saved_in_order_and_unknown_items_are_skipped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = AppPaths::new(dir.path().to_path_buf());
        let downloader = Downloader::new(gallery_fetcher(), paths.clone(), ScraperConfig::default());

        let mut events: Vec<(String, String)> = Vec::new();
        let report = downloader
            .download_post("https://www.instagram.com/p/B2UUzbyAMrD", |level, event, _| {
                events.push((level.to_string(), event.to_string()));
                Ok(())
            })
            .expect("download");

        assert_eq!(report.shortcode, "B2UUzbyAMrD");
        assert_eq!(report.saved.len(), 2);
        assert_eq!(report.skipped_unknown, 1);
        let post_dir = paths.post_dir("instagram", "B2UUzbyAMrD");
        assert!(report.saved.iter().all(|p| p.starts_with(&post_dir)));
        let names: Vec<String> = report
            .saved
            .iter()
            .map(|p| p.file_name().expect("name").to_string_lossy().to_string())
            .collect();
        assert!(names[0].starts_with("instagram_20190912161807_B2UUzbyAMrD_"));
        assert!(names[0].ends_with(".mp4"));
        assert!(names[1].ends_with(".jpg"));
        assert!(events
            .iter()
            .any(|(level, event)| level == "warn" && event == "media_unknown_signature"));

        let csv = std::fs::read_to_string(paths.metadata_csv_path()).expect("csv");
        assert_eq!(csv.lines().count(), 3);
    }

    #[test]
    fn failing_item_aborts_the_post() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = AppPaths::new(dir.path().to_path_buf());
        let mut fetcher = gallery_fetcher();
        fetcher.media.remove("https://cdn/i.jpg");
        let downloader = Downloader::new(fetcher, paths, ScraperConfig::default());

        let err = downloader
            .download_post("https://www.instagram.com/p/B2UUzbyAMrD", |_, _, _| Ok(()))
            .unwrap_err();
        assert!(matches!(err, ScraperError::Connection(_)));
    }

    #[test]
    fn batch_counts_progress_and_stops_at_first_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = AppPaths::new(dir.path().to_path_buf());
        let config = ScraperConfig {
            write_metadata: false,
            ..ScraperConfig::default()
        };
        let downloader = Downloader::new(gallery_fetcher(), paths.clone(), config);
        let urls = vec![
            "https://www.instagram.com/p/B2UUzbyAMrD".to_string(),
            "https://www.instagram.com/p/GoneGoneGon".to_string(),
            "https://www.instagram.com/p/B2UUzbyAMrD".to_string(),
        ];

        let mut progress = BatchProgress::new(urls.len());
        let err = downloader
            .download_batch(&urls, &mut progress, |_, _, _| Ok(()))
            .unwrap_err();
        assert!(matches!(err, ScraperError::PageUnavailable { status: 404, .. }));
        assert_eq!(progress.completed, 1);
        assert_eq!(progress.saved_files, 2);
        assert_eq!(progress.skipped_unknown, 1);
        assert!(!paths.metadata_csv_path().exists());
    }
}
