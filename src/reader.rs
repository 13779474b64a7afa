//! Shapes served to the browser reader.

use serde::{Deserialize, Serialize};

use crate::formats::{Course, FullText, LessonMeta, ParsedLesson, Sentence, SeriesInfo};
use crate::level::Level;
use crate::normalize::{NormalizeOptions, normalize_text};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Course,
    ArticleCollection,
    ShortStory,
    Standalone,
}

impl ContentType {
    pub fn from_course_type(raw: Option<&str>) -> Self {
        match raw {
            Some("course" | "multi_lesson") => Self::Course,
            Some("article_collection") => Self::ArticleCollection,
            Some("short_story") => Self::ShortStory,
            _ => Self::Standalone,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseInfo {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub levels: Vec<Level>,
    pub lesson_count: u32,
    pub content_type: ContentType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonSummary {
    pub id: String,
    pub title: String,
    pub level: Level,
    pub synopsis: String,
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series: Option<SeriesInfo>,
    pub content_type: ContentType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_info: Option<CourseInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabWord {
    pub simplified: String,
    pub traditional: String,
    pub pinyin: String,
    pub meaning: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hsk: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: String,
    pub title: String,
    pub level: Level,
    pub synopsis: String,
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series: Option<SeriesInfo>,
    pub content_type: ContentType,
    pub full_text: FullText,
    pub sentences: Vec<Sentence>,
    pub vocabulary: Vec<VocabWord>,
}

pub fn lesson_summary(meta: &LessonMeta) -> LessonSummary {
    let course = meta.course.as_ref();
    let course_type = meta
        .course_type
        .as_deref()
        .or_else(|| course.and_then(|c| c.kind.as_deref()));

    LessonSummary {
        id: meta.id.to_string(),
        title: meta.title.clone(),
        level: Level::normalize(&meta.level),
        synopsis: meta.synopsis.clone(),
        date: meta.date().to_owned(),
        image_url: non_empty(meta.medium_image_url.as_deref()),
        audio_url: non_empty(meta.audio_url.as_deref()),
        series: index_series(meta),
        content_type: ContentType::from_course_type(course_type),
        course_info: course.map(course_info),
    }
}

/// Series as far as the index knows it. Totals are unknown until the lesson
/// body is loaded.
fn index_series(meta: &LessonMeta) -> Option<SeriesInfo> {
    let title = non_empty(meta.course_title.as_deref())
        .or_else(|| meta.series_course().map(|c| c.title.clone()))?;
    Some(SeriesInfo {
        title,
        chapter: meta.course_position.unwrap_or(0),
        total_chapters: 0,
    })
}

fn course_info(course: &Course) -> CourseInfo {
    CourseInfo {
        title: course.title.clone(),
        description: course.description.clone().unwrap_or_default(),
        image_url: non_empty(course.large_image_url.as_deref())
            .or_else(|| non_empty(course.medium_image_url.as_deref())),
        levels: course.levels.iter().map(|l| Level::normalize(l)).collect(),
        lesson_count: course.lesson_count.unwrap_or(0),
        content_type: ContentType::from_course_type(course.kind.as_deref()),
    }
}

/// Re-derives sentences from the embedded raw payload with the reader's rules.
pub fn lesson(parsed: &ParsedLesson) -> Lesson {
    let text = normalize_text(&parsed.raw, NormalizeOptions::READER);

    Lesson {
        id: parsed.id.to_string(),
        title: parsed.title.clone(),
        level: Level::normalize(&parsed.level),
        synopsis: parsed.synopsis.clone(),
        date: parsed.date.clone(),
        audio_url: non_empty(parsed.audio_url.as_deref()),
        series: parsed.series.clone(),
        content_type: if parsed.series.is_some() {
            ContentType::Course
        } else {
            ContentType::Standalone
        },
        full_text: parsed.full_text.clone(),
        sentences: text.sentences,
        vocabulary: parsed
            .vocabulary
            .iter()
            .map(|v| VocabWord {
                simplified: v.hanzi.clone(),
                traditional: v.traditional.clone(),
                pinyin: v.pinyin.clone(),
                meaning: v.meaning.clone(),
                hsk: v.hsk,
            })
            .collect(),
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_owned)
}
