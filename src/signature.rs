const JPEG_MAGIC: [u8; 3] = [0xFF, 0xD8, 0xFF];
const FTYP_BOX: &[u8; 4] = b"ftyp";

/// ISO-BMFF major brands accepted as MP4. An allow-list, not full box parsing.
pub const MP4_BRANDS: &[&[u8; 4]] = &[b"isom", b"MSNV"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSignature {
    Jpeg,
    Mp4,
    Unknown,
}

impl FileSignature {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Mp4 => "mp4",
            Self::Unknown => "unknown",
        }
    }
}

/// Classifies `buffer` by its leading bytes.
///
/// JPEG needs `FF D8 FF` followed by any APPn marker byte (`0xE0..=0xFF`
/// under the `0xE0` mask). MP4 needs an `ftyp` box at offset 4 with an
/// allow-listed brand at offset 8. Anything shorter or different is
/// [`FileSignature::Unknown`].
pub fn classify(buffer: &[u8]) -> FileSignature {
    if is_jpeg(buffer) {
        FileSignature::Jpeg
    } else if is_mp4(buffer) {
        FileSignature::Mp4
    } else {
        FileSignature::Unknown
    }
}

fn is_jpeg(buffer: &[u8]) -> bool {
    buffer.len() >= 4 && buffer[..3] == JPEG_MAGIC && (buffer[3] & 0xE0) == 0xE0
}

fn is_mp4(buffer: &[u8]) -> bool {
    if buffer.len() < 12 || buffer[4..8] != *FTYP_BOX {
        return false;
    }
    MP4_BRANDS.iter().any(|brand| buffer[8..12] == **brand)
}
