//! Word-to-syllable time alignment.
//!
//! Sentence boundaries index into the word sequence while audio timestamps
//! index into the syllable sequence. A word like `nǐ hǎo` spans two
//! syllables, so the two index spaces drift apart as a lesson goes on.

use crate::formats::{CrdWord, SyllableTime};

/// Prefix sum of syllable counts: entry `k` is the number of syllables in
/// words `[0, k)`. The result has `words.len() + 1` entries.
pub fn word_to_syllable_map(words: &[CrdWord]) -> Vec<usize> {
    let mut map = Vec::with_capacity(words.len() + 1);
    map.push(0);
    let mut total = 0;
    for word in words {
        total += syllable_count(word);
        map.push(total);
    }
    map
}

fn syllable_count(word: &CrdWord) -> usize {
    word.pinyin().map_or(0, |pinyin| pinyin.split(' ').count())
}

/// Audio start time of the sentence beginning at `word_index`.
///
/// A sentence at syllable 0 starts at 0. Otherwise the timestamp of the
/// preceding syllable is used; out-of-range positions have no time.
pub fn sentence_audio_time(
    word_to_syllable: &[usize],
    syllable_times: &[SyllableTime],
    word_index: usize,
) -> Option<f64> {
    match *word_to_syllable.get(word_index)? {
        0 => Some(0.0),
        syllable => syllable_times.get(syllable - 1)?.start(),
    }
}
