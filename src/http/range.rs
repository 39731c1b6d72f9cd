//! HTTP Range request parsing module
//!
//! Single `bytes=start-[end]` ranges only. Anything else is rejected so the
//! caller answers 416 instead of guessing.

use thiserror::Error;

/// Inclusive byte interval inside a file of known size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes covered by the range
    #[inline]
    pub const fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Value for the `Content-Range` header
    pub fn content_range(&self, total_size: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, total_size)
    }
}

/// Why a `Range` header was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    /// Not a single `bytes=<start>-[end]` range with numeric bounds
    #[error("malformed range header: {0}")]
    Malformed(String),
    /// Well-formed but outside the file
    #[error("range {start}-{end} not satisfiable for size {size}")]
    Unsatisfiable { start: u64, end: u64, size: u64 },
}

/// Parse an HTTP `Range` header against a file of `file_size` bytes
///
/// `end` defaults to the last byte when omitted. Suffix ranges
/// (`bytes=-500`), multiple ranges, reversed bounds and bounds past the end
/// of the file are all errors.
///
/// # Examples
/// ```
/// use display_server::http::range::{parse_range_header, ByteRange};
///
/// let range = parse_range_header("bytes=0-99", 1000).unwrap();
/// assert_eq!(range, ByteRange { start: 0, end: 99 });
///
/// let open = parse_range_header("bytes=500-", 1000).unwrap();
/// assert_eq!(open.end, 999);
///
/// assert!(parse_range_header("bytes=900-1000", 1000).is_err());
/// ```
pub fn parse_range_header(header: &str, file_size: u64) -> Result<ByteRange, RangeError> {
    let malformed = || RangeError::Malformed(header.to_string());

    let spec = header.trim().strip_prefix("bytes=").ok_or_else(malformed)?;
    if spec.contains(',') {
        return Err(malformed());
    }

    let (start_str, end_str) = spec.split_once('-').ok_or_else(malformed)?;
    let (start_str, end_str) = (start_str.trim(), end_str.trim());

    // An absent start would be a suffix range, which is not supported
    let start = start_str.parse::<u64>().map_err(|_| malformed())?;

    let end = if end_str.is_empty() {
        match file_size.checked_sub(1) {
            Some(last) => last,
            None => {
                return Err(RangeError::Unsatisfiable {
                    start,
                    end: start,
                    size: file_size,
                })
            }
        }
    } else {
        end_str.parse::<u64>().map_err(|_| malformed())?
    };

    if start > end || end >= file_size {
        return Err(RangeError::Unsatisfiable {
            start,
            end,
            size: file_size,
        });
    }

    Ok(ByteRange { start, end })
}
