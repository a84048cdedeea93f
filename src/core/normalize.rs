//! Model reply normalization
//!
//! Turns the free-form text returned by the model into a [`BomResult`]:
//! strip an optional markdown code fence, parse JSON, require a top-level
//! array. Elements are accepted without schema checks.
//!
//! The fence checks are independent, not paired: a "```json" prefix and a
//! "```" prefix are each stripped if present, and a trailing "```" is
//! stripped whether or not an opening fence was found.

use std::ops::Range;

use serde_json::Value;
use tracing::debug;

use crate::core::bom::{BomResult, PartRecord};
use crate::core::error::ParseError;

const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

/// Byte range of `raw` left after trimming and fence stripping
pub fn fence_range(raw: &str) -> Range<usize> {
    let mut range = trimmed_range(raw, 0..raw.len());

    if raw[range.clone()].starts_with(JSON_FENCE) {
        range.start += JSON_FENCE.len();
    }
    if raw[range.clone()].starts_with(FENCE) {
        range.start += FENCE.len();
    }
    if raw[range.clone()].ends_with(FENCE) {
        range.end -= FENCE.len();
    }

    trimmed_range(raw, range)
}

/// Remove an optional markdown code fence around the reply
pub fn strip_fences(raw: &str) -> &str {
    &raw[fence_range(raw)]
}

fn trimmed_range(raw: &str, range: Range<usize>) -> Range<usize> {
    let slice = &raw[range.clone()];
    let start = range.start + (slice.len() - slice.trim_start().len());
    let end = range.end - (slice.len() - slice.trim_end().len());
    // Whitespace-only slices collapse to an empty range at `start`
    start..end.max(start)
}

/// Parse a raw model reply into parts.
///
/// An empty array is a valid, empty result. Malformed JSON and non-array
/// values fail with [`ParseError`], which keeps `raw` verbatim.
pub fn normalize(raw: &str) -> Result<BomResult, ParseError> {
    let range = fence_range(raw);
    let text = &raw[range.clone()];
    debug!(
        raw_len = raw.len(),
        stripped_len = text.len(),
        "Normalizing model reply"
    );

    let value: Value = serde_json::from_str(text)
        .map_err(|e| ParseError::malformed(raw, range.start, text, &e))?;

    match value {
        Value::Array(items) => Ok(items.into_iter().map(PartRecord::from_value).collect()),
        other => Err(ParseError::not_a_list(raw, range, &other)),
    }
}
