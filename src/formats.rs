use serde::{Deserialize, Deserializer, Serialize};

pub type JsonMap = serde_json::Map<String, serde_json::Value>;

/// Reads `null` as the type's default; the provider sends `null` for unset fields.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Like [`null_as_default`], applied to each element of a list.
fn null_items_as_default<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    let items: Vec<Option<T>> = null_as_default(deserializer)?;
    Ok(items.into_iter().map(Option::unwrap_or_default).collect())
}

/// One page of the provider's lesson index.
#[derive(Debug, Clone, Deserialize)]
pub struct LessonsPage {
    pub lessons: Vec<LessonMeta>,
    #[serde(default)]
    pub next_page_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonMeta {
    pub id: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub level: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub synopsis: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crd_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub has_course: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course: Option<Course>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_position: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_at_formatted: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medium_image_url: Option<String>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

impl LessonMeta {
    /// Display date, preferring the provider's preformatted value.
    pub fn date(&self) -> &str {
        [
            &self.release_at_formatted,
            &self.release_at,
            &self.publication_date,
        ]
        .into_iter()
        .flatten()
        .map(String::as_str)
        .find(|s| !s.is_empty())
        .unwrap_or_default()
    }

    /// The course this lesson belongs to, if the provider marks it as part of one.
    pub fn series_course(&self) -> Option<&Course> {
        if !self.has_course {
            return None;
        }
        self.course.as_ref()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub large_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medium_image_url: Option<String>,
    #[serde(default, deserialize_with = "null_items_as_default")]
    pub levels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lesson_count: Option<u32>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrdWord {
    #[serde(deserialize_with = "null_as_default")]
    pub hanzi: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tc_hanzi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinyin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meaning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hsk: Option<u8>,
}

impl CrdWord {
    pub fn traditional(&self) -> &str {
        match self.tc_hanzi.as_deref() {
            Some(tc) if !tc.is_empty() => tc,
            _ => &self.hanzi,
        }
    }

    /// Whitespace and newline pseudo-words carry layout, not text.
    pub fn is_blank(&self) -> bool {
        self.hanzi.trim().is_empty()
    }

    pub fn pinyin(&self) -> Option<&str> {
        self.pinyin.as_deref().filter(|p| !p.is_empty())
    }
}

/// A syllable timestamp: either a bare start time or a `[start, end]` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SyllableTime {
    Start(f64),
    Span(Vec<f64>),
}

impl SyllableTime {
    pub fn start(&self) -> Option<f64> {
        match self {
            Self::Start(t) => Some(*t),
            Self::Span(span) => span.first().copied(),
        }
    }
}

/// Raw per-lesson content payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrdData {
    pub words: Vec<CrdWord>,
    pub sentence_indices: Vec<usize>,
    #[serde(deserialize_with = "null_items_as_default")]
    pub sentence_translations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub syllable_times: Option<Vec<SyllableTime>>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

impl CrdData {
    const REQUIRED_ARRAYS: [&'static str; 3] = ["words", "sentence_indices", "sentence_translations"];

    /// Decodes a payload after checking that every required field is an array.
    pub fn from_value(value: serde_json::Value) -> anyhow::Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| anyhow::anyhow!("invalid CRD format: payload is not an object"))?;
        for field in Self::REQUIRED_ARRAYS {
            if !obj.get(field).is_some_and(serde_json::Value::is_array) {
                anyhow::bail!("invalid CRD format: missing '{field}' array");
            }
        }
        let crd = serde_json::from_value(value)
            .map_err(|err| anyhow::anyhow!("invalid CRD format: {err}"))?;
        Ok(crd)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesInfo {
    pub title: String,
    pub chapter: u32,
    pub total_chapters: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullText {
    pub simplified: String,
    pub traditional: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sentence {
    pub index: usize,
    pub simplified: String,
    pub traditional: String,
    pub pinyin: String,
    pub english: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_time: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabEntry {
    pub hanzi: String,
    pub traditional: String,
    pub pinyin: String,
    pub meaning: String,
    pub hsk: Option<u8>,
}

/// The normalized per-lesson artifact written to `lessons/{id}.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedLesson {
    pub id: u64,
    pub title: String,
    pub level: String,
    pub date: String,
    pub synopsis: String,
    pub audio_url: Option<String>,
    pub series: Option<SeriesInfo>,
    pub full_text: FullText,
    pub sentences: Vec<Sentence>,
    pub vocabulary: Vec<VocabEntry>,
    pub raw: CrdData,
}
