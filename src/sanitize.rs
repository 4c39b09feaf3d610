use std::ops::Range;

/// Byte window zeroed in every JPEG. It covers the application segment that
/// follows the JFIF/EXIF header in files served by the image CDN, where IPTC
/// special instructions usable for tracking are stored.
pub const REDACTED_RANGE: Range<usize> = 23..146;

/// Returns a copy of `buffer` with [`REDACTED_RANGE`] overwritten by zeros.
///
/// This is a fixed-offset policy; marker lengths are not parsed. Indices past
/// the end of a short buffer are skipped, so the output length always equals
/// the input length.
pub fn sanitize_jpeg(buffer: &[u8]) -> Vec<u8> {
    let mut out = buffer.to_vec();
    sanitize_jpeg_in_place(&mut out);
    out
}

pub fn sanitize_jpeg_in_place(buffer: &mut [u8]) {
    let end = REDACTED_RANGE.end.min(buffer.len());
    if REDACTED_RANGE.start >= end {
        return;
    }
    buffer[REDACTED_RANGE.start..end].fill(0);
}
