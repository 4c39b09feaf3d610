use crate::sanitize::sanitize_jpeg;
use crate::signature::{classify, FileSignature};
use crate::Result;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved { path: PathBuf, signature: FileSignature },
    /// The buffer matched no known signature; nothing was written.
    SkippedUnknown,
}

impl SaveOutcome {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Saved { path, .. } => Some(path),
            Self::SkippedUnknown => None,
        }
    }
}

/// Writes `buffer` to `output_dir/filename` according to its sniffed signature.
///
/// JPEGs are sanitized and written without re-encoding, so pixel data keeps
/// its original quantization. MP4s are written byte for byte. Unknown content
/// is not written at all.
pub fn save(buffer: &[u8], output_dir: &Path, filename: &str) -> Result<SaveOutcome> {
    // create_dir_all treats a directory created concurrently as success.
    std::fs::create_dir_all(output_dir)?;
    let signature = classify(buffer);
    let out_path = output_dir.join(filename);
    match signature {
        FileSignature::Jpeg => write_file(&out_path, &sanitize_jpeg(buffer))?,
        FileSignature::Mp4 => write_file(&out_path, buffer)?,
        FileSignature::Unknown => return Ok(SaveOutcome::SkippedUnknown),
    }
    Ok(SaveOutcome::Saved {
        path: out_path,
        signature,
    })
}

fn write_file(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
    file.write_all(data)?;
    file.flush()
}
