use crate::Result;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::Path;
use uuid::Uuid;

/// Bytes of digest kept for the collision-avoidance token (80 bits).
const TOKEN_BYTES: usize = 10;
pub const TOKEN_LEN: usize = TOKEN_BYTES * 2;
pub const SHORTCODE_LEN: usize = 11;

const MP4_CONTENT_TYPE: &str = "video/mp4";

/// `<owner>_<created_at>_<shortcode>_<token>.<ext>`.
///
/// Every call draws a fresh token, so two calls with identical arguments
/// never return the same name. Gallery items must each call this.
pub fn build_filename(owner: &str, created_at: &str, shortcode: &str, content_type: &str) -> String {
    format!(
        "{owner}_{created_at}_{shortcode}_{}{}",
        unique_token(),
        extension_for(content_type)
    )
}

/// `.mp4` only for an exact `video/mp4` content type; everything else is saved as `.jpg`.
pub fn extension_for(content_type: &str) -> &'static str {
    if content_type == MP4_CONTENT_TYPE {
        ".mp4"
    } else {
        ".jpg"
    }
}

fn unique_token() -> String {
    let id = Uuid::new_v4();
    let digest = Sha256::digest(id.as_bytes());
    hex::encode(&digest[..TOKEN_BYTES])
}

/// Recovers the shortcode from a name produced by [`build_filename`].
pub fn shortcode_from_filename(name: &str) -> Option<&str> {
    let stem = name
        .strip_suffix(".jpg")
        .or_else(|| name.strip_suffix(".mp4"))?;
    let (rest, token) = stem.rsplit_once('_')?;
    if token.len() != TOKEN_LEN || !token.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    if rest.len() <= SHORTCODE_LEN || !rest.is_char_boundary(rest.len() - SHORTCODE_LEN) {
        return None;
    }
    let (prefix, shortcode) = rest.split_at(rest.len() - SHORTCODE_LEN);
    if !prefix.ends_with('_') {
        return None;
    }
    if !shortcode
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
    {
        return None;
    }
    Some(shortcode)
}

/// Shortcodes of every file already saved below `dir`.
pub fn downloaded_shortcodes(dir: &Path) -> Result<HashSet<String>> {
    let mut out = HashSet::new();
    if !dir.exists() {
        return Ok(out);
    }
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in std::fs::read_dir(&current)? {
            let entry = match entry {
                Ok(v) => v,
                Err(_) => continue,
            };
            // Symlinked directories are not followed.
            if entry.file_type()?.is_dir() {
                pending.push(entry.path());
                continue;
            }
            let name = entry.file_name();
            if let Some(shortcode) = shortcode_from_filename(&name.to_string_lossy()) {
                out.insert(shortcode.to_string());
            }
        }
    }
    Ok(out)
}
