//! Delimiter and quote detection.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

/// Delimiters tried by [`sniff`], in order of preference.
pub const CANDIDATE_DELIMITERS: [u8; 5] = [b',', b'\t', b';', b'|', b':'];

static SINGLE_QUOTED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)(?:^|[,\t;|:])\s*'[^'\n]*'\s*(?:[,\t;|:]|$)").unwrap());

/// Field delimiter and quote character of a delimited text file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dialect {
    /// Field delimiter byte.
    pub delimiter: u8,
    /// Quote byte.
    pub quote: u8,
}

impl Default for Dialect {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
        }
    }
}

impl Dialect {
    /// A `csv` reader builder configured for this dialect. The reader yields every record,
    /// header included, and tolerates ragged rows.
    #[must_use]
    pub fn reader_builder(&self) -> csv::ReaderBuilder {
        let mut builder = csv::ReaderBuilder::new();
        builder
            .has_headers(false)
            .flexible(true)
            .delimiter(self.delimiter)
            .quote(self.quote);
        builder
    }
}

/// Detect the dialect of a sample.
///
/// Each candidate delimiter is scored by how many records share the most common field
/// count. A candidate only qualifies when that count is at least two and the header splits
/// into at least as many fields, since short data rows are padded but the header never is.
/// Ties keep the earlier candidate. Returns `None` when no candidate qualifies, in which
/// case callers use [`Dialect::default`].
#[must_use]
pub fn sniff(sample: &str) -> Option<Dialect> {
    let quote = detect_quote(sample);
    let mut best: Option<(u8, usize)> = None;

    for delimiter in CANDIDATE_DELIMITERS {
        let dialect = Dialect { delimiter, quote };
        let Some(score) = consistency(sample, &dialect) else {
            continue;
        };
        if best.is_none_or(|(_, top)| score > top) {
            best = Some((delimiter, score));
        }
    }

    best.map(|(delimiter, _)| Dialect { delimiter, quote })
}

fn detect_quote(sample: &str) -> u8 {
    if !sample.contains('"') && SINGLE_QUOTED_RE.is_match(sample) {
        b'\''
    } else {
        b'"'
    }
}

/// Per-mille share of records whose field count equals the modal count.
///
/// `None` if the modal count is below two, the header has fewer fields than the modal
/// count, or the sample cannot be tokenized.
fn consistency(sample: &str, dialect: &Dialect) -> Option<usize> {
    let mut reader = dialect.reader_builder().from_reader(sample.as_bytes());
    let mut counts: HashMap<usize, usize> = HashMap::new();
    let mut header_fields = None;
    let mut total = 0usize;

    for record in reader.records() {
        let record = record.ok()?;
        header_fields.get_or_insert(record.len());
        *counts.entry(record.len()).or_default() += 1;
        total += 1;
    }

    let (fields, hits) = counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)))?;
    if fields < 2 || header_fields? < fields {
        return None;
    }
    Some(hits * 1000 / total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_comma() {
        let dialect = sniff("id,amount\n1,2\n3,4\n").unwrap();
        assert_eq!(dialect, Dialect::default());
    }

    #[test]
    fn test_sniff_other_delimiters() {
        assert_eq!(sniff("a;b;c\n1;2;3\n").unwrap().delimiter, b';');
        assert_eq!(sniff("a\tb\n1\t2\n").unwrap().delimiter, b'\t');
        assert_eq!(sniff("a|b\n1|2\n").unwrap().delimiter, b'|');
    }

    #[test]
    fn test_sniff_prefers_consistent_delimiter() {
        // Commas inside the free-text column vary per row; semicolons do not.
        let sample = "name;note\nann;a,b\nbob;c\ncat;d,e,f\n";
        assert_eq!(sniff(sample).unwrap().delimiter, b';');
    }

    #[test]
    fn test_sniff_time_column_keeps_comma() {
        let sample = "id,seen_at\n1,10:00:00\n2,11:30:00\n";
        assert_eq!(sniff(sample).unwrap().delimiter, b',');
    }

    #[test]
    fn test_sniff_short_rows_with_timestamps_keep_comma() {
        // Every data row splits evenly on the time separators, but the header does not.
        let sample = "id,seen_at,note\n\
                      1,2024-01-02T10:00:00,a\n\
                      2,2024-01-02T11:00:00\n\
                      3,2024-01-02T12:00:00\n\
                      4,2024-01-02T13:00:00,b\n";
        assert_eq!(sniff(sample).unwrap().delimiter, b',');
    }

    #[test]
    fn test_sniff_short_rows_with_semicolon_values() {
        let sample = "name,note\nann,a;b;c\nbob\ncat,d;e;f\n";
        assert_eq!(sniff(sample).unwrap().delimiter, b',');
    }

    #[test]
    fn test_sniff_single_quotes() {
        let dialect = sniff("name,city\n'Smith, J',NYC\n'Doe, A',LA\n").unwrap();
        assert_eq!(dialect.quote, b'\'');
        assert_eq!(dialect.delimiter, b',');
    }

    #[test]
    fn test_sniff_single_column_fails() {
        assert_eq!(sniff("value\n1\n2\n"), None);
        assert_eq!(sniff(""), None);
    }
}
