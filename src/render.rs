use crate::formats::ParsedLesson;
use crate::series::Chapter;

/// Plain-text rendering of a lesson, one section per block.
pub fn format_lesson_text(lesson: &ParsedLesson) -> String {
    let mut lines: Vec<String> = Vec::new();

    lines.push("=== LESSON METADATA ===".to_owned());
    lines.push(format!("Title: {}", lesson.title));
    lines.push(format!("Level: {}", lesson.level));
    if let Some(series) = &lesson.series {
        lines.push(format!(
            "Series: {} (Chapter {} of {})",
            series.title, series.chapter, series.total_chapters
        ));
    }
    lines.push(format!("Date: {}", lesson.date));
    if let Some(audio) = lesson.audio_url.as_deref().filter(|a| !a.is_empty()) {
        lines.push(format!("Audio: {audio}"));
    }
    lines.push(format!("Synopsis: {}", lesson.synopsis));
    lines.push(String::new());

    lines.push("=== FULL TEXT (SIMPLIFIED) ===".to_owned());
    lines.push(lesson.full_text.simplified.clone());
    lines.push(String::new());

    lines.push("=== FULL TEXT (TRADITIONAL) ===".to_owned());
    lines.push(lesson.full_text.traditional.clone());
    lines.push(String::new());

    lines.push("=== SENTENCE BY SENTENCE ===".to_owned());
    lines.push(String::new());
    for sentence in &lesson.sentences {
        lines.push(format!("[{}]", sentence.index));
        lines.push(format!("Simplified: {}", sentence.simplified));
        lines.push(format!("Traditional: {}", sentence.traditional));
        lines.push(format!("Pinyin: {}", sentence.pinyin));
        lines.push(format!("English: {}", sentence.english));
        lines.push(String::new());
    }

    lines.push("=== VOCABULARY ===".to_owned());
    for entry in &lesson.vocabulary {
        let mut line = format!("{} ({}) - {}", entry.hanzi, entry.pinyin, entry.meaning);
        if let Some(hsk) = entry.hsk {
            line.push_str(&format!(" [HSK {hsk}]"));
        }
        lines.push(line);
    }

    lines.join("\n")
}

pub fn format_series_info(title: &str, description: &str, chapters: &[Chapter]) -> String {
    let mut out = format!("=== SERIES: {title} ===\n{description}\n\n=== CHAPTERS ===\n");
    for chapter in chapters {
        out.push_str(&format!("{}. {}\n", chapter.position, chapter.title));
    }
    out
}
