//! Citation marker extraction.
//!
//! The generation backend tags tool-sourced claims inline with
//! `[[rec:<record-id>]]` markers. [`extract_claims`] strips the markers and
//! returns byte spans into the cleaned text — the offsets the Citation
//! Tracker binds against, computed only after the reply text is final.

use lantern_core::{RecordId, Span};

const MARKER_OPEN: &str = "[[rec:";
const MARKER_CLOSE: &str = "]]";

/// A tool-sourced claim: the record it came from and its span in the cleaned
/// reply text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Claim {
    /// Cited record.
    pub record_id: RecordId,
    /// Byte span of the claim sentence in the cleaned text.
    pub span: Span,
}

/// Strip citation markers from `text`, returning the cleaned text and one
/// claim per well-formed marker.
///
/// A claim's span covers the text between the previous marker (or the start)
/// and this marker, with leading separators trimmed. Malformed markers — an
/// unterminated open or an empty id — are left for the reader to see rather
/// than silently swallowed.
#[must_use]
pub fn extract_claims(text: &str) -> (String, Vec<Claim>) {
    let mut clean = String::new();
    let mut claims = Vec::new();
    let mut rest = text;
    let mut segment_start = 0_usize;

    while let Some(open) = rest.find(MARKER_OPEN) {
        let after_open = &rest[open + MARKER_OPEN.len()..];
        let Some(close) = after_open.find(MARKER_CLOSE) else {
            break;
        };
        let id = &after_open[..close];

        clean.push_str(&rest[..open]);
        rest = &after_open[close + MARKER_CLOSE.len()..];

        if id.is_empty() {
            continue;
        }
        let end = clean.trim_end().len();
        let start = segment_start
            + leading_separator_len(&clean[segment_start..end.max(segment_start)]);
        if start < end {
            claims.push(Claim {
                record_id: RecordId::from(id),
                span: Span::new(start, end),
            });
            segment_start = end;
        }
    }

    clean.push_str(rest);
    (clean, claims)
}

/// Byte length of leading whitespace/punctuation separating two claims.
fn leading_separator_len(segment: &str) -> usize {
    segment.len()
        - segment
            .trim_start_matches(|c: char| c.is_whitespace() || matches!(c, '.' | ',' | ';' | '!' | '?'))
            .len()
}
