use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub base_dir: PathBuf,
}

impl AppPaths {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn config_dir(&self) -> PathBuf {
        self.base_dir.join("config")
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir().join("scraper.json")
    }

    pub fn user_agents_path(&self) -> PathBuf {
        self.config_dir().join("useragents.txt")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    pub fn run_log_path(&self, run_id: &str) -> PathBuf {
        self.logs_dir().join(format!("{run_id}.jsonl"))
    }

    pub fn downloads_dir(&self) -> PathBuf {
        self.base_dir.join("downloads")
    }

    /// One directory per post: `downloads/<owner>/<shortcode>`.
    pub fn post_dir(&self, owner: &str, shortcode: &str) -> PathBuf {
        self.downloads_dir()
            .join(sanitize_segment(owner))
            .join(sanitize_segment(shortcode))
    }

    pub fn metadata_csv_path(&self) -> PathBuf {
        self.base_dir.join("data.csv")
    }

    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.config_dir())?;
        std::fs::create_dir_all(self.logs_dir())?;
        std::fs::create_dir_all(self.downloads_dir())?;
        Ok(())
    }

    pub fn default_base_dir() -> PathBuf {
        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
    }

    /// Custom output locations must already exist; nothing is created for them.
    pub fn from_output_override(output: &Path) -> Option<Self> {
        if output.is_dir() {
            Some(Self::new(output.to_path_buf()))
        } else {
            None
        }
    }
}

fn sanitize_segment(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.trim().chars() {
        if ch.is_ascii_alphanumeric() || ch == '.' || ch == '_' || ch == '-' {
            out.push(ch);
        } else {
            out.push('_');
        }
    }
    let trimmed = out.trim_matches('.').to_string();
    if trimmed.is_empty() {
        "unknown".to_string()
    } else {
        trimmed
    }
}
