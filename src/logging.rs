use crate::paths::AppPaths;
use crate::Result;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use url::Url;
use uuid::Uuid;

const RUN_LOG_ROTATE_BYTES: u64 = 10 * 1024 * 1024;
const RUN_LOG_MAX_BACKUPS: usize = 3;

/// JSON-lines log for one CLI run: `logs/<run_id>.jsonl`.
#[derive(Debug, Clone)]
pub struct RunLog {
    run_id: String,
    path: PathBuf,
    echo_info: bool,
}

impl RunLog {
    pub fn new(paths: &AppPaths, echo_info: bool) -> Self {
        let run_id = Uuid::new_v4().to_string();
        let path = paths.run_log_path(&run_id);
        Self {
            run_id,
            path,
            echo_info,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn log_line(&mut self, level: &str, event: &str, data: serde_json::Value) -> Result<()> {
        let line = serde_json::json!({
            "ts_ms": now_ms(),
            "run_id": self.run_id,
            "level": level,
            "event": event,
            "data": data
        })
        .to_string();

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        rotate_log_if_needed(&self.path)?;
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?
            .write_all(format!("{line}\n").as_bytes())?;

        if level != "info" {
            eprintln!("[{level}] {event} {data}");
        } else if self.echo_info {
            println!("{event} {data}");
        }
        Ok(())
    }
}

/// Scheme and host of `value`. Post page links also keep their `/p/<shortcode>` path.
pub fn redact_url_for_log(value: &str) -> String {
    let Ok(parsed) = Url::parse(value.trim()) else {
        return "[invalid-url]".to_string();
    };
    let scheme = parsed.scheme();
    let host = parsed.host_str().unwrap_or("unknown-host");
    let mut segments = parsed.path_segments().into_iter().flatten();
    match (segments.next(), segments.next()) {
        (Some("p"), Some(shortcode)) if !shortcode.is_empty() => {
            format!("{scheme}://{host}/p/{shortcode}")
        }
        _ => format!("{scheme}://{host}/..."),
    }
}

pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

fn rotate_log_if_needed(path: &Path) -> Result<()> {
    let oversized = std::fs::metadata(path)
        .map(|m| m.len() >= RUN_LOG_ROTATE_BYTES)
        .unwrap_or(false);
    if oversized {
        shift_backups(path)?;
    }
    Ok(())
}

/// `x.jsonl` moves to `x.jsonl.1`, each `.n` to `.n+1`; the oldest backup is dropped.
fn shift_backups(path: &Path) -> std::io::Result<()> {
    let oldest = backup_path(path, RUN_LOG_MAX_BACKUPS);
    if oldest.exists() {
        std::fs::remove_file(&oldest)?;
    }
    for n in (1..RUN_LOG_MAX_BACKUPS).rev() {
        let from = backup_path(path, n);
        if from.exists() {
            std::fs::rename(&from, backup_path(path, n + 1))?;
        }
    }
    std::fs::rename(path, backup_path(path, 1))
}

fn backup_path(path: &Path, n: usize) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".{n}"));
    PathBuf::from(name)
}
