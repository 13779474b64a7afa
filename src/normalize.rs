//! Raw CRD payload → sentences, full text, and vocabulary.
//!
//! The archive written by the scraper and the lessons served to the reader
//! are both derived here. They differ only in [`NormalizeOptions`].

use std::collections::HashSet;

use crate::align::{sentence_audio_time, word_to_syllable_map};
use crate::formats::{CrdData, CrdWord, FullText, LessonMeta, ParsedLesson, SeriesInfo};
use crate::formats::{Sentence, VocabEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// `sentence_translations[0]` translates the title; sentence `i` uses `i + 1`.
    pub title_offset: bool,
    /// Drop sentences whose simplified text is whitespace only (paragraph breaks).
    pub drop_blank_sentences: bool,
}

impl NormalizeOptions {
    /// Scraper artifacts: every boundary becomes a sentence, translations unshifted.
    pub const ARCHIVE: Self = Self {
        title_offset: false,
        drop_blank_sentences: false,
    };

    /// Reader view: translations realigned past the title, blank sentences removed.
    pub const READER: Self = Self {
        title_offset: true,
        drop_blank_sentences: true,
    };
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedText {
    pub full_text: FullText,
    pub sentences: Vec<Sentence>,
    pub vocabulary: Vec<VocabEntry>,
}

/// Builds the archive artifact for one lesson.
pub fn normalize(
    crd: CrdData,
    meta: &LessonMeta,
    total_chapters: Option<u32>,
) -> ParsedLesson {
    let text = normalize_text(&crd, NormalizeOptions::ARCHIVE);

    ParsedLesson {
        id: meta.id,
        title: meta.title.clone(),
        level: meta.level.clone(),
        date: meta.date().to_owned(),
        synopsis: meta.synopsis.clone(),
        audio_url: meta.audio_url.clone(),
        series: series_info(meta, total_chapters),
        full_text: text.full_text,
        sentences: text.sentences,
        vocabulary: text.vocabulary,
        raw: crd,
    }
}

pub fn normalize_text(crd: &CrdData, options: NormalizeOptions) -> NormalizedText {
    NormalizedText {
        full_text: full_text(&crd.words),
        sentences: sentences(crd, options),
        vocabulary: vocabulary(&crd.words),
    }
}

fn series_info(meta: &LessonMeta, total_chapters: Option<u32>) -> Option<SeriesInfo> {
    let course = meta.series_course()?;
    let chapter = meta.course_position?;
    Some(SeriesInfo {
        title: course.title.clone(),
        chapter,
        total_chapters: total_chapters.filter(|n| *n > 0).unwrap_or(chapter),
    })
}

fn full_text(words: &[CrdWord]) -> FullText {
    FullText {
        simplified: words.iter().map(|w| w.hanzi.as_str()).collect(),
        traditional: words.iter().map(CrdWord::traditional).collect(),
    }
}

fn sentences(crd: &CrdData, options: NormalizeOptions) -> Vec<Sentence> {
    let words = &crd.words;
    let bounds = &crd.sentence_indices;
    let word_to_syllable = word_to_syllable_map(words);
    let syllable_times = crd.syllable_times.as_deref();

    let mut out = Vec::with_capacity(bounds.len());
    for (i, &start) in bounds.iter().enumerate() {
        let end = bounds.get(i + 1).copied().unwrap_or(words.len());
        let slice = word_slice(words, start, end);

        let simplified: String = slice.iter().map(|w| w.hanzi.as_str()).collect();
        if options.drop_blank_sentences && simplified.trim().is_empty() {
            continue;
        }

        let translation_index = if options.title_offset { i + 1 } else { i };
        let english = crd
            .sentence_translations
            .get(translation_index)
            .cloned()
            .unwrap_or_default();

        let audio_time = syllable_times
            .and_then(|times| sentence_audio_time(&word_to_syllable, times, start));

        out.push(Sentence {
            index: out.len() + 1,
            simplified,
            traditional: slice.iter().map(CrdWord::traditional).collect(),
            pinyin: sentence_pinyin(slice),
            english,
            audio_time,
        });
    }
    out
}

/// Out-of-range or inverted bounds yield an empty slice.
fn word_slice(words: &[CrdWord], start: usize, end: usize) -> &[CrdWord] {
    let end = end.min(words.len());
    let start = start.min(end);
    &words[start..end]
}

fn sentence_pinyin(words: &[CrdWord]) -> String {
    words
        .iter()
        .filter(|w| !w.is_blank())
        .filter_map(CrdWord::pinyin)
        .collect::<Vec<_>>()
        .join(" ")
}

/// First occurrence per hanzi wins; words without a meaning never enter.
fn vocabulary(words: &[CrdWord]) -> Vec<VocabEntry> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for word in words {
        let Some(meaning) = word.meaning.as_deref().filter(|m| !m.trim().is_empty()) else {
            continue;
        };
        if word.is_blank() || seen.contains(word.hanzi.as_str()) {
            continue;
        }
        seen.insert(word.hanzi.as_str());
        out.push(VocabEntry {
            hanzi: word.hanzi.clone(),
            traditional: word.traditional().to_owned(),
            pinyin: word.pinyin.clone().unwrap_or_default(),
            meaning: meaning.to_owned(),
            hsk: word.hsk,
        });
    }
    out
}
