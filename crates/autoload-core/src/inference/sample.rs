//! Bounded head reads.

use bytes::Bytes;

use super::InferenceOptions;
use crate::error::InferenceError;
use crate::io::ObjectSource;
use crate::types::ObjectLocator;

/// Decoded head of an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    /// Sampled text. Ends on a line boundary unless the whole object was read or the
    /// window holds a single unterminated line.
    pub text: String,
    /// Whether the object continues past the sampled bytes.
    pub truncated: bool,
    /// Number of bytes fetched by the last read.
    pub bytes_read: usize,
}

impl Sample {
    /// Build a sample from raw bytes. Invalid UTF-8 is replaced rather than rejected.
    #[must_use]
    pub fn from_bytes(bytes: &Bytes, truncated: bool) -> Self {
        let mut text = String::from_utf8_lossy(bytes).into_owned();
        if truncated && !text.ends_with('\n') {
            if let Some(last_newline) = text.rfind('\n') {
                text.truncate(last_newline + 1);
            }
        }
        Self {
            text,
            truncated,
            bytes_read: bytes.len(),
        }
    }

    /// The first `limit` lines of the sample.
    pub fn lines(&self, limit: usize) -> impl Iterator<Item = &str> {
        self.text.lines().take(limit)
    }
}

/// Read the head of an object, doubling the window until it holds `sample_lines` newlines,
/// the object ends, or the window reaches `max_window`.
pub async fn read_sample(
    source: &dyn ObjectSource,
    locator: &ObjectLocator,
    options: &InferenceOptions,
) -> Result<Sample, InferenceError> {
    let max_window = options.max_window.max(1);
    let mut window = options.initial_window.clamp(1, max_window);

    loop {
        let bytes = source
            .read_range(locator, 0..window)
            .await
            .map_err(|source| InferenceError::Read {
                uri: locator.uri(),
                source,
            })?;

        let at_eof = (bytes.len() as u64) < window;
        let newlines = count_newlines(&bytes);
        log::debug!(
            "Sampled {} bytes ({} lines) from {}",
            bytes.len(),
            newlines,
            locator.uri()
        );

        if at_eof {
            return Ok(Sample::from_bytes(&bytes, false));
        }
        if newlines >= options.sample_lines || window >= max_window {
            let truncated = continues_past(source, locator, window).await?;
            return Ok(Sample::from_bytes(&bytes, truncated));
        }
        window = window.saturating_mul(2).min(max_window);
    }
}

/// Whether the object has at least one byte at `offset`. A full window may end exactly
/// at the end of the object.
async fn continues_past(
    source: &dyn ObjectSource,
    locator: &ObjectLocator,
    offset: u64,
) -> Result<bool, InferenceError> {
    let next = source
        .read_range(locator, offset..offset.saturating_add(1))
        .await
        .map_err(|source| InferenceError::Read {
            uri: locator.uri(),
            source,
        })?;
    Ok(!next.is_empty())
}

fn count_newlines(bytes: &[u8]) -> usize {
    bytes.iter().filter(|&&b| b == b'\n').count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncated_sample_drops_partial_line() {
        let bytes = Bytes::from_static(b"a,b\n1,2\n3,");
        let sample = Sample::from_bytes(&bytes, true);
        assert_eq!(sample.text, "a,b\n1,2\n");
        assert_eq!(sample.bytes_read, 10);
    }

    #[test]
    fn test_complete_sample_keeps_last_line() {
        let bytes = Bytes::from_static(b"a,b\n1,2\n3,4");
        let sample = Sample::from_bytes(&bytes, false);
        assert_eq!(sample.text, "a,b\n1,2\n3,4");
        assert_eq!(sample.lines(2).collect::<Vec<_>>(), vec!["a,b", "1,2"]);
    }

    #[test]
    fn test_single_unterminated_line_is_kept() {
        let bytes = Bytes::from_static(b"a,b,c");
        let sample = Sample::from_bytes(&bytes, true);
        assert_eq!(sample.text, "a,b,c");
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let bytes = Bytes::from_static(b"name\n\xffoo\n");
        let sample = Sample::from_bytes(&bytes, false);
        assert_eq!(sample.text, "name\n\u{fffd}oo\n");
    }
}
