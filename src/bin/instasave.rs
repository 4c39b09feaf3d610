use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use instasave::client::HttpClient;
use instasave::config::load_config;
use instasave::download::{BatchProgress, Downloader};
use instasave::feed::{collect_post_urls, FeedOptions, StaticFeedPage};
use instasave::filename::downloaded_shortcodes;
use instasave::logging::{redact_url_for_log, RunLog};
use instasave::paths::AppPaths;
use instasave::weburl::{clean_post_url, feed_url};
use instasave::{Result, ScraperError};

/// Save the photos and videos of Instagram posts.
#[derive(Parser, Debug)]
#[command(name = "instasave", version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Link to a post, or to a profile/hashtag with --posts.
    url: String,

    /// Existing directory to save into instead of the base directory.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print download information.
    #[arg(short, long)]
    verbose: bool,

    /// Number of posts to take from the profile or hashtag feed.
    #[arg(short, long)]
    posts: Option<usize>,

    /// Treat URL as a hashtag when used with --posts.
    #[arg(short = 't', long)]
    hashtag: bool,

    /// Directory holding config/, logs/ and downloads/ (default: current directory).
    #[arg(long)]
    base_dir: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", err.user_message());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let paths = match &cli.output {
        Some(output) => AppPaths::from_output_override(output)
            .ok_or_else(|| ScraperError::OutputDirMissing(output.clone()))?,
        None => AppPaths::new(cli.base_dir.clone().unwrap_or_else(AppPaths::default_base_dir)),
    };
    paths.ensure_dirs()?;

    let config = load_config(&paths)?;
    let mut log = RunLog::new(&paths, cli.verbose);
    let client = HttpClient::new(&paths, &config);
    log.log_line(
        "info",
        "run_started",
        serde_json::json!({
            "base_dir": paths.base_dir.to_string_lossy(),
            "feed": cli.posts.is_some(),
        }),
    )?;

    let urls = match cli.posts {
        Some(limit) => {
            let target = feed_url(&cli.url, cli.hashtag)?;
            let skip = downloaded_shortcodes(&paths.downloads_dir())?;
            let options = FeedOptions {
                limit,
                hashtag: cli.hashtag,
                scroll_step: config.feed_scroll_step,
                max_stalled_rounds: config.feed_max_stalled_rounds,
            };
            let mut page = StaticFeedPage::new(&client, target);
            collect_post_urls(&mut page, &options, &skip, |level, event, data| {
                log.log_line(level, event, data)
            })?
        }
        None => vec![cli.url.clone()],
    };

    let mut post_urls = Vec::with_capacity(urls.len());
    for url in &urls {
        let post_url = clean_post_url(url)?;
        if !client.check_post_exists(&post_url)? {
            return Err(ScraperError::PostUnavailable(redact_url_for_log(&post_url)));
        }
        post_urls.push(post_url);
    }

    let downloader = Downloader::new(client, paths, config);
    let mut progress = BatchProgress::new(post_urls.len());
    let result = downloader.download_batch(&post_urls, &mut progress, |level, event, data| {
        log.log_line(level, event, data)
    });

    log.log_line(
        "info",
        "run_finished",
        serde_json::json!({
            "posts": progress.completed,
            "files": progress.saved_files,
            "skipped_unknown": progress.skipped_unknown,
            "ok": result.is_ok(),
        }),
    )?;
    result.map(|_| ())
}
