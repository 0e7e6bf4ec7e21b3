//! Estimates how long an article takes to read.

use crate::article::Section;

/// Assumed reading speed.
pub const WORDS_PER_MINUTE: usize = 200;

/// Returns the estimated reading time of `sections` in whole minutes,
/// rounded up. Every whitespace-delimited token in a section's heading and
/// in each of its text blocks counts as one word. An article without
/// sections takes zero minutes.
pub fn estimate(sections: &[Section]) -> usize {
    let words = word_count(sections);
    (words + WORDS_PER_MINUTE - 1) / WORDS_PER_MINUTE
}

/// Counts the words in the headings and bodies of `sections`.
pub fn word_count(sections: &[Section]) -> usize {
    sections.iter().fold(0, |total, section| {
        let heading = words(&section.heading);
        let body = section
            .body
            .iter()
            .fold(0, |acc, block| acc + words(&block.text));
        total + heading + body
    })
}

fn words(text: &str) -> usize {
    text.split_whitespace().count()
}
