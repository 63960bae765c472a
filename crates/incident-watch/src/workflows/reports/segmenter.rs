/// Sentence terminator used to cut a narrative into fragments.
pub const SENTENCE_TERMINATOR: char = '.';

/// Split a free-text narrative into trimmed, non-empty fragments in reading order.
///
/// Empty or whitespace-only input produces an empty vector; callers decide whether that
/// is acceptable.
pub fn segment_narrative(narrative: &str) -> Vec<String> {
    narrative
        .split(SENTENCE_TERMINATOR)
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty())
        .map(str::to_string)
        .collect()
}
