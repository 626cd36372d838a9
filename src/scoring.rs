use crate::normalize::{normalize, normalize_partial, word_count};
use serde::Serialize;

/// Characters per word in the standard WPM convention
pub const CHARS_PER_WORD: f64 = 5.0;

#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub enum Outcome {
    Correct,
    Incorrect,
}

/// Metrics for one attempt. Values are unrounded; call [`ScoreResult::rounded`]
/// before showing or storing them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreResult {
    pub correct_count: usize,
    pub error_count: usize,
    pub accuracy_percent: f64,
    pub net_words: f64,
    pub wpm: f64,
    pub reading_wpm: f64,
}

impl ScoreResult {
    pub fn rounded(&self) -> Self {
        Self {
            accuracy_percent: round2(self.accuracy_percent),
            net_words: round2(self.net_words),
            wpm: round2(self.wpm),
            reading_wpm: round2(self.reading_wpm),
            ..*self
        }
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Score a submission against its reference text.
///
/// Both texts are normalized first and compared position by position.
/// Every submitted character that does not match, including any typed past
/// the end of the reference, is an error. Reference characters the user
/// never reached count neither way.
pub fn score(
    reference: &str,
    submitted: &str,
    typing_secs: f64,
    reading_secs: Option<f64>,
) -> ScoreResult {
    let reference = normalize(reference);
    let submitted = normalize(submitted);

    let reference_len = reference.chars().count();
    let submitted_len = submitted.chars().count();

    let correct_count = reference
        .chars()
        .zip(submitted.chars())
        .filter(|(expected, typed)| expected == typed)
        .count();
    let error_count = submitted_len.saturating_sub(correct_count);

    let accuracy_percent = if reference_len > 0 {
        (correct_count as f64 / reference_len as f64 * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    };

    let net_words = ((correct_count as f64 - error_count as f64) / CHARS_PER_WORD).max(0.0);

    let wpm = if typing_secs > 0.0 {
        (net_words / (typing_secs / 60.0)).max(0.0)
    } else {
        0.0
    };

    let reading_wpm = match reading_secs {
        Some(secs) if secs > 0.0 => word_count(&reference) as f64 / (secs / 60.0),
        _ => 0.0,
    };

    ScoreResult {
        correct_count,
        error_count,
        accuracy_percent,
        net_words,
        wpm,
        reading_wpm,
    }
}

/// Per-character outcome of the live submission against the normalized
/// reference. The submission goes through the same whitespace collapse as
/// [`score`], so a stray leading or doubled space does not shift every later
/// character out of place. Returns the characters as they should be shown.
pub fn char_outcomes(reference: &str, submitted: &str) -> Vec<(char, Outcome)> {
    let reference: Vec<char> = normalize(reference).chars().collect();

    normalize_partial(submitted)
        .chars()
        .enumerate()
        .map(|(idx, typed)| match reference.get(idx) {
            Some(expected) if *expected == typed => (typed, Outcome::Correct),
            _ => (typed, Outcome::Incorrect),
        })
        .collect()
}
